//! A Rust library for extracting world maps, sprites and palettes from The
//! 4th Coming game files.
pub mod args;
pub mod assets;
pub mod diagnostics;
pub mod error;
pub mod ext;
pub mod extract;
pub mod locator;
pub mod types;
pub mod utils;
