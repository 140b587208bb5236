//! Pixel codecs of `.dda` sprites, selected by the header type.
use super::header::SpriteHeader;
use super::rle::RleDecoder;
use crate::error::{Error, Result};
use crate::types::{ImageData, Rgb};
use crate::utils::img::resolve_indexed;
use crate::utils::zlib::inflate;
use int_enum::IntEnum;
use tracing::debug;

/// Type 2 sprites with a side above this are zlib-compressed before RLE.
pub const RLE_ZLIB_THRESHOLD: usize = 180;

/// Pixel codec, selected by the header `sprite_type`.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntEnum)]
pub enum SpriteCodec {
    /// Type 1: plain palette indices.
    Raw = 1,
    /// Type 2: run-length coded, zlib-wrapped for large sprites.
    RunLength = 2,
    /// Type 9: zlib, possibly nested in a second zlib stream.
    DoubleZlib = 9,
}

impl SpriteCodec {
    pub fn decode(self, payload: &[u8], header: &SpriteHeader) -> Result<PixelBuffer> {
        let width = header.width as usize;
        let height = header.height as usize;
        match self {
            SpriteCodec::Raw => decode_raw(payload, width, height),
            SpriteCodec::RunLength => decode_run_length(payload, width, height),
            SpriteCodec::DoubleZlib => decode_double_zlib(
                payload,
                width,
                height,
                header.size_uncompressed,
                header.size_compressed,
            ),
        }
    }
}

/// Decoded palette indices of a sprite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    /// Row length in `indices`, at least `width`.
    pub stride: usize,
    pub indices: Vec<u8>,
}

impl PixelBuffer {
    /// Index of the pixel at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices.get(y * self.stride + x).copied()
    }

    pub fn resolve(&self, palette: &[Rgb]) -> Result<ImageData> {
        resolve_indexed(
            &self.indices,
            self.width,
            self.height,
            self.stride,
            palette,
        )
    }
}

pub fn decode_raw(payload: &[u8], width: usize, height: usize) -> Result<PixelBuffer> {
    let expected = width * height;
    if payload.len() < expected {
        return Err(Error::PixelCountMismatch {
            expected,
            actual: payload.len(),
        });
    }
    Ok(PixelBuffer {
        width,
        height,
        stride: width,
        indices: payload[..expected].to_vec(),
    })
}

pub fn decode_run_length(payload: &[u8], width: usize, height: usize) -> Result<PixelBuffer> {
    let inflated;
    let data = if width > RLE_ZLIB_THRESHOLD || height > RLE_ZLIB_THRESHOLD {
        inflated = inflate(payload)?;
        &inflated[..]
    } else {
        payload
    };
    let mut decoder = RleDecoder::new(data, width, height);
    let indices = decoder.decode()?;
    Ok(PixelBuffer {
        width,
        height,
        stride: decoder.stride(),
        indices,
    })
}

fn skip_prefix(data: &[u8]) -> &[u8] {
    data.get(4..).unwrap_or_default()
}

/// Decodes a type 9 sprite.
///
/// The header does not reliably say how the payload is wrapped, so the
/// candidates are tried in order and the first one inflating to exactly
/// `width * height` indices wins:
///
/// 1. `payload[4..]` when both header sizes are equal, `payload` otherwise;
/// 2. the zlib stream nested after 4 bytes of the first result;
/// 3. `payload[4..]`, if step 1 did not already use it.
pub fn decode_double_zlib(
    payload: &[u8],
    width: usize,
    height: usize,
    size_uncompressed: u32,
    size_compressed: u32,
) -> Result<PixelBuffer> {
    let expected = width * height;
    let prefixed = size_compressed == size_uncompressed;
    let check = |candidate: Result<Vec<u8>>| -> Result<Vec<u8>> {
        let data = candidate?;
        if data.len() == expected {
            Ok(data)
        } else {
            Err(Error::PixelCountMismatch {
                expected,
                actual: data.len(),
            })
        }
    };

    let first = if prefixed {
        inflate(skip_prefix(payload))
    } else {
        inflate(payload)
    };
    let mut last_err = match first {
        Ok(first) if first.len() == expected => return Ok(pixels(first, width, height)),
        Ok(first) => {
            debug!(
                "type 9 sprite: first stream gave {} bytes, {} expected",
                first.len(),
                expected
            );
            match check(inflate(skip_prefix(&first))) {
                Ok(nested) => return Ok(pixels(nested, width, height)),
                Err(e) => e,
            }
        }
        Err(e) => e,
    };
    if !prefixed {
        match check(inflate(skip_prefix(payload))) {
            Ok(retry) => return Ok(pixels(retry, width, height)),
            Err(e) => {
                if !matches!(last_err, Error::PixelCountMismatch { .. }) {
                    last_err = e;
                }
            }
        }
    }
    Err(last_err)
}

fn pixels(indices: Vec<u8>, width: usize, height: usize) -> PixelBuffer {
    PixelBuffer {
        width,
        height,
        stride: width,
        indices,
    }
}

#[cfg(test)]
use crate::utils::zlib::deflate;

#[cfg(test)]
fn prefixed(data: Vec<u8>) -> Vec<u8> {
    let mut out = vec![0xde, 0xad, 0xbe, 0xef];
    out.extend_from_slice(&data);
    out
}

#[test]
fn test_codec_dispatch() {
    assert_eq!(SpriteCodec::try_from(1u16), Ok(SpriteCodec::Raw));
    assert_eq!(SpriteCodec::try_from(2u16), Ok(SpriteCodec::RunLength));
    assert_eq!(SpriteCodec::try_from(9u16), Ok(SpriteCodec::DoubleZlib));
    assert_eq!(SpriteCodec::try_from(3u16), Err(3));
    assert_eq!(u16::from(SpriteCodec::DoubleZlib), 9);
}

#[test]
fn test_decode_raw() {
    let buf = decode_raw(&[1, 2, 3, 4, 5, 6, 99], 3, 2).unwrap();
    assert_eq!(buf.indices, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(buf.get(2, 1), Some(6));
    assert!(matches!(
        decode_raw(&[1, 2], 3, 1),
        Err(Error::PixelCountMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn test_decode_run_length_small_is_not_inflated() {
    let src = [0, 0, 0, 2, 0, 7, 8, 0];
    let buf = decode_run_length(&src, 2, 1).unwrap();
    assert_eq!(buf.stride, 4);
    assert_eq!(buf.get(0, 0), Some(7));
    assert_eq!(buf.get(1, 0), Some(8));
    assert_eq!(buf.get(2, 0), None);
}

#[test]
fn test_decode_run_length_large_is_inflated() {
    let src = [0, 0, 0, 2, 0, 7, 8, 0];
    let buf = decode_run_length(&deflate(&src), 181, 1).unwrap();
    assert_eq!(buf.stride, 184);
    assert_eq!(buf.get(1, 0), Some(8));
    assert_eq!(buf.get(180, 0), Some(0));
    assert!(matches!(
        decode_run_length(&src, 1, 200),
        Err(Error::Inflate(_))
    ));
}

#[test]
fn test_double_zlib_equal_sizes_skips_prefix() {
    let pixels = vec![3u8; 6];
    let payload = prefixed(deflate(&pixels));
    let buf = decode_double_zlib(&payload, 3, 2, 10, 10).unwrap();
    assert_eq!(buf.indices, pixels);
}

#[test]
fn test_double_zlib_plain() {
    let pixels: Vec<u8> = (0..12).collect();
    let buf = decode_double_zlib(&deflate(&pixels), 4, 3, 12, 20).unwrap();
    assert_eq!(buf.indices, pixels);
}

#[test]
fn test_double_zlib_nested() {
    let pixels: Vec<u8> = (0..12).collect();
    let payload = deflate(&prefixed(deflate(&pixels)));
    let buf = decode_double_zlib(&payload, 4, 3, 100, 20).unwrap();
    assert_eq!(buf.indices, pixels);
}

#[test]
fn test_double_zlib_retries_prefixed_payload() {
    let pixels: Vec<u8> = (0..12).collect();
    let payload = prefixed(deflate(&pixels));
    let buf = decode_double_zlib(&payload, 4, 3, 100, 20).unwrap();
    assert_eq!(buf.indices, pixels);
}

#[test]
fn test_double_zlib_garbage() {
    assert!(matches!(
        decode_double_zlib(b"garbage!", 2, 2, 8, 8),
        Err(Error::Inflate(_))
    ));
    assert!(matches!(
        decode_double_zlib(b"garbage!", 2, 2, 1, 8),
        Err(Error::Inflate(_))
    ));
}

#[test]
fn test_double_zlib_size_mismatch() {
    let payload = deflate(&prefixed(deflate(&[1, 2, 3])));
    assert!(matches!(
        decode_double_zlib(&payload, 4, 3, 1, 2),
        Err(Error::PixelCountMismatch {
            expected: 12,
            actual: 3
        })
    ));
}
