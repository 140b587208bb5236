use crate::error::{Error, Result};
use crate::ext::io::MemReaderRef;
use std::io::Read;

/// Inflates a complete zlib stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressed_data = Vec::new();
    flate2::read::ZlibDecoder::new(MemReaderRef::new(data))
        .read_to_end(&mut decompressed_data)
        .map_err(Error::Inflate)?;
    Ok(decompressed_data)
}

/// Compresses data into a zlib stream.
#[cfg(test)]
pub fn deflate(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn test_inflate() {
    let data = b"The 4th Coming".repeat(10);
    assert_eq!(inflate(&deflate(&data)).unwrap(), data);
}

#[test]
fn test_inflate_garbage() {
    assert!(matches!(inflate(b"not zlib"), Err(Error::Inflate(_))));
}
