//! Decoders for the game's binary asset files.
pub mod container;
pub mod palette;
pub mod rtmap;
pub mod sprite;
pub mod sprite_id;
