use std::process::Command;

/// Export the short commit hash as `GIT_HASH`, or "unknown" outside of a repository.
fn export_git_hash() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=../../../.git/HEAD");
}

fn main() {
    export_git_hash();
}
