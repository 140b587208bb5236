pub mod counter;
pub mod files;
pub mod img;
pub mod struct_pack;
pub mod xored_stream;
pub mod zlib;
