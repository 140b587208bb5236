//! Run-length coding of type 2 sprites.
//!
//! A stream is a list of runs. Each run is:
//!
//! - `i16` horizontal start,
//! - two bytes `hi, lo` giving the length `hi * 4 + lo`,
//! - a kind byte: `0` literal run followed by its index bytes, `1` shadow
//!   run (checkerboard of index 0), anything else draws nothing,
//! - a marker byte: `0` ends the sprite, `1` ends the shadow layer, `2`
//!   moves to the next row. Markers `1` and `2` are consumed; any other value
//!   is left in place and starts the next run.
//!
//! Rows are padded to a multiple of 4 pixels.
use crate::error::{Error, Result};

const KIND_LITERAL: u8 = 0;
const KIND_SHADOW: u8 = 1;

const MARKER_END: u8 = 0;
const MARKER_END_SHADOW: u8 = 1;
const MARKER_NEXT_ROW: u8 = 2;

/// Row length of a decoded sprite of the given width.
pub fn padded_width(width: usize) -> usize {
    (width + 3) & !3
}

pub struct RleDecoder<'a> {
    src: &'a [u8],
    src_p: usize,
    stride: usize,
    height: usize,
}

impl<'a> RleDecoder<'a> {
    pub fn new(src: &'a [u8], width: usize, height: usize) -> Self {
        RleDecoder {
            src,
            src_p: 0,
            stride: padded_width(width),
            height,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes of input used by the last `decode`.
    pub fn consumed(&self) -> usize {
        self.src_p
    }

    fn byte(&self, at: usize) -> Result<u8> {
        self.src
            .get(at)
            .copied()
            .ok_or(Error::RleTruncated { offset: at })
    }

    fn index(&self, x: i64, y: usize, len: usize) -> Result<usize> {
        let p = (y * self.stride) as i64 + x;
        if p < 0 || p as usize >= len {
            return Err(Error::RleOutOfBounds { x, y });
        }
        Ok(p as usize)
    }

    /// Decodes the whole stream into `stride * height` palette indices,
    /// untouched pixels staying 0.
    pub fn decode(&mut self) -> Result<Vec<u8>> {
        let mut dst = vec![0u8; self.stride * self.height];
        let len = dst.len();
        let mut p = 0usize;
        let mut y = 0usize;
        if self.height == 0 {
            self.src_p = 0;
            return Ok(dst);
        }
        loop {
            let x = i16::from_le_bytes([self.byte(p)?, self.byte(p + 1)?]) as i64;
            p += 2;
            let count = self.byte(p)? as usize * 4 + self.byte(p + 1)? as usize;
            p += 2;

            match self.byte(p)? {
                KIND_SHADOW => {
                    if count > 1 {
                        // Odd columns on even rows, even columns on odd rows.
                        let parity = if y % 2 == 0 { 1 } else { 0 };
                        for i in 0..count as i64 {
                            if (x + i).rem_euclid(2) == parity {
                                let d = self.index(x + i, y, len)?;
                                dst[d] = 0;
                            }
                        }
                    }
                }
                KIND_LITERAL => {
                    for i in 0..count as i64 {
                        p += 1;
                        let value = self.byte(p)?;
                        let d = self.index(x + i, y, len)?;
                        dst[d] = value;
                    }
                }
                _ => {}
            }
            p += 1;

            match self.byte(p)? {
                MARKER_END => {
                    p += 1;
                    break;
                }
                MARKER_END_SHADOW => p += 1,
                MARKER_NEXT_ROW => {
                    y += 1;
                    p += 1;
                }
                _ => {}
            }

            if y == self.height {
                break;
            }
        }
        self.src_p = p;
        Ok(dst)
    }
}

/// Decodes a run-length stream, returning rows of `padded_width(width)`.
pub fn rle_decode(src: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    RleDecoder::new(src, width, height).decode()
}

#[test]
fn test_padded_width() {
    assert_eq!(padded_width(0), 0);
    assert_eq!(padded_width(1), 4);
    assert_eq!(padded_width(4), 4);
    assert_eq!(padded_width(181), 184);
}

#[test]
fn test_single_literal_run() {
    let mut src = vec![0, 0, 1, 0, KIND_LITERAL, 9, 8, 7, 6, MARKER_END];
    src.extend_from_slice(&[0xff, 0xff]);
    let mut decoder = RleDecoder::new(&src, 4, 1);
    assert_eq!(decoder.decode().unwrap(), vec![9, 8, 7, 6]);
    assert_eq!(decoder.consumed(), 10);
}

#[test]
fn test_count_uses_hi_times_four() {
    // hi = 0, lo = 4 gives the same length as hi = 1, lo = 0.
    let src = [0, 0, 0, 4, KIND_LITERAL, 1, 2, 3, 4, MARKER_END];
    assert_eq!(rle_decode(&src, 4, 1).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_rows_and_padding() {
    let src = [
        1, 0, 0, 2, KIND_LITERAL, 5, 6, MARKER_NEXT_ROW, // row 0, x = 1
        0, 0, 0, 1, KIND_LITERAL, 7, MARKER_END, // row 1, x = 0
    ];
    let out = rle_decode(&src, 3, 2).unwrap();
    assert_eq!(out, vec![0, 5, 6, 0, 7, 0, 0, 0]);
}

#[test]
fn test_shadow_checkerboard() {
    let mut src = Vec::new();
    // fill rows 0 and 1 with 9, then cover both with a shadow run
    src.extend_from_slice(&[0, 0, 1, 0, KIND_LITERAL, 9, 9, 9, 9, MARKER_END_SHADOW]);
    src.extend_from_slice(&[0, 0, 1, 0, KIND_SHADOW, MARKER_NEXT_ROW]);
    src.extend_from_slice(&[0, 0, 1, 0, KIND_LITERAL, 9, 9, 9, 9, MARKER_END_SHADOW]);
    src.extend_from_slice(&[0, 0, 1, 0, KIND_SHADOW, MARKER_END]);
    let out = rle_decode(&src, 4, 2).unwrap();
    assert_eq!(out, vec![9, 0, 9, 0, 0, 9, 0, 9]);
}

#[test]
fn test_shadow_parity_follows_absolute_column() {
    let mut src = Vec::new();
    // odd start: columns 3..7, odd columns cleared on row 0, even on row 1
    src.extend_from_slice(&[0, 0, 2, 0, KIND_LITERAL, 9, 9, 9, 9, 9, 9, 9, 9, MARKER_END_SHADOW]);
    src.extend_from_slice(&[3, 0, 1, 0, KIND_SHADOW, MARKER_NEXT_ROW]);
    src.extend_from_slice(&[0, 0, 2, 0, KIND_LITERAL, 9, 9, 9, 9, 9, 9, 9, 9, MARKER_END_SHADOW]);
    src.extend_from_slice(&[3, 0, 1, 0, KIND_SHADOW, MARKER_END]);
    let out = rle_decode(&src, 8, 2).unwrap();
    assert_eq!(
        out,
        vec![9, 9, 9, 0, 9, 0, 9, 9, 9, 9, 9, 9, 0, 9, 0, 9]
    );
}

#[test]
fn test_shadow_parity_with_negative_start() {
    let mut src = Vec::new();
    src.extend_from_slice(&[0, 0, 1, 0, KIND_LITERAL, 9, 9, 9, 9, MARKER_NEXT_ROW]);
    src.extend_from_slice(&[0, 0, 1, 0, KIND_LITERAL, 9, 9, 9, 9, MARKER_END_SHADOW]);
    // columns -2..2 on row 1: -2 and 0 are even, -2 spills back into row 0
    src.extend_from_slice(&[0xfe, 0xff, 1, 0, KIND_SHADOW, MARKER_END]);
    let out = rle_decode(&src, 4, 2).unwrap();
    assert_eq!(out, vec![9, 9, 0, 9, 0, 9, 9, 9]);

    // column -1 is odd, so row 0 clears it and leaves the buffer
    let src = [0xff, 0xff, 0, 2, KIND_SHADOW, MARKER_END];
    assert!(matches!(
        rle_decode(&src, 4, 1),
        Err(Error::RleOutOfBounds { x: -1, y: 0 })
    ));
}

#[test]
fn test_single_pixel_shadow_is_ignored() {
    let src = [
        0, 0, 0, 2, KIND_LITERAL, 4, 4, MARKER_END_SHADOW, 0, 0, 0, 1, KIND_SHADOW, MARKER_END,
    ];
    assert_eq!(rle_decode(&src, 4, 1).unwrap(), vec![4, 4, 0, 0]);
}

#[test]
fn test_unknown_kind_and_marker() {
    // kind 5 draws nothing; marker 7 is not consumed and becomes the low
    // byte of the next run start
    let src = [0, 0, 0, 3, 5, 7, 0, 0, 1, KIND_LITERAL, 3, MARKER_END];
    assert_eq!(rle_decode(&src, 8, 1).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 3]);
}

#[test]
fn test_stops_when_height_reached() {
    let src = [0, 0, 0, 1, KIND_LITERAL, 3, MARKER_NEXT_ROW, 0xde, 0xad];
    let mut decoder = RleDecoder::new(&src, 1, 1);
    assert_eq!(decoder.decode().unwrap(), vec![3, 0, 0, 0]);
    assert_eq!(decoder.consumed(), 7);
}

#[test]
fn test_truncated_stream() {
    let src = [0, 0, 1, 0, KIND_LITERAL, 1, 2];
    assert!(matches!(
        rle_decode(&src, 4, 1),
        Err(Error::RleTruncated { offset: 7 })
    ));
}

#[test]
fn test_out_of_bounds_run() {
    let src = [0xff, 0xff, 0, 1, KIND_LITERAL, 1, MARKER_END];
    assert!(matches!(
        rle_decode(&src, 4, 1),
        Err(Error::RleOutOfBounds { x: -1, y: 0 })
    ));
    let src = [3, 0, 0, 2, KIND_LITERAL, 1, 1, MARKER_END];
    assert!(matches!(
        rle_decode(&src, 4, 1),
        Err(Error::RleOutOfBounds { x: 4, y: 0 })
    ));
}
