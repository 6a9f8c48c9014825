//! Screens and menus.

pub mod menu;
pub mod screen;
