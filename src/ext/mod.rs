//! Extensions for std io.
pub mod io;
