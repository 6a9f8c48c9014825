//! User-interface components.

pub mod display;
pub mod encoder;
