use crate::error::{Error, Result};
use crate::types::*;
use std::io::Write;
use std::path::Path;

/// Resolves row-major palette indices into an RGB image.
///
/// `stride` is the length of one row in `indices`; only the first `width`
/// entries of each row are kept.
pub fn resolve_indexed(
    indices: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    palette: &[Rgb],
) -> Result<ImageData> {
    let needed = if height == 0 {
        0
    } else {
        stride * (height - 1) + width
    };
    if stride < width || indices.len() < needed {
        return Err(Error::PixelCountMismatch {
            expected: needed.max(width * height),
            actual: indices.len(),
        });
    }
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for &index in &indices[y * stride..y * stride + width] {
            let Rgb(r, g, b) = *palette
                .get(index as usize)
                .ok_or(Error::PaletteIndexOutOfRange {
                    index,
                    len: palette.len(),
                })?;
            data.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(ImageData {
        width: width as u32,
        height: height as u32,
        color_type: ImageColorType::Rgb,
        depth: 8,
        data,
    })
}

/// Writes an image to `writer` in the requested output format.
pub fn encode_img_to<W: Write>(data: &ImageData, typ: ImageOutputType, writer: W) -> Result<()> {
    match typ {
        ImageOutputType::Png => {
            let color_type = match data.color_type {
                ImageColorType::Rgb => png::ColorType::Rgb,
            };
            if data.depth != 8 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Unsupported bit depth: {}", data.depth),
                )
                .into());
            }
            let mut encoder = png::Encoder::new(writer, data.width, data.height);
            encoder.set_color(color_type);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&data.data)?;
            writer.finish()?;
            Ok(())
        }
    }
}

/// Writes an image file, creating parent directories as needed.
pub fn encode_img<P: AsRef<Path> + ?Sized>(
    data: &ImageData,
    typ: ImageOutputType,
    filename: &P,
) -> Result<()> {
    crate::utils::files::make_sure_dir_exists(filename)?;
    let file = crate::utils::files::write_file(filename)?;
    encode_img_to(data, typ, file)
}

#[test]
fn test_resolve_indexed_crops_stride() {
    let palette = [Rgb(0, 0, 0), Rgb(10, 20, 30), Rgb(1, 1, 1)];
    let indices = [1u8, 0, 2, 2, 0, 1, 2, 2];
    let img = resolve_indexed(&indices, 2, 2, 4, &palette).unwrap();
    assert_eq!(img.data, vec![10, 20, 30, 0, 0, 0, 0, 0, 0, 10, 20, 30]);
}

#[test]
fn test_resolve_indexed_errors() {
    let palette = [Rgb(0, 0, 0)];
    assert!(matches!(
        resolve_indexed(&[0, 1], 2, 1, 2, &palette),
        Err(Error::PaletteIndexOutOfRange { index: 1, len: 1 })
    ));
    assert!(matches!(
        resolve_indexed(&[0, 0, 0], 2, 2, 2, &palette),
        Err(Error::PixelCountMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn test_encode_png_signature() {
    let img = ImageData::from_rgb(2, 2, [Rgb(255, 0, 0); 4]);
    let mut out = Vec::new();
    encode_img_to(&img, ImageOutputType::Png, &mut out).unwrap();
    assert!(out.starts_with(b"\x89PNG\r\n\x1a\n"));
    let decoder = png::Decoder::new(std::io::Cursor::new(out));
    let reader = decoder.read_info().unwrap();
    assert_eq!(reader.info().width, 2);
    assert_eq!(reader.info().height, 2);
}

#[test]
fn test_encode_rejects_other_depths() {
    let mut img = ImageData::from_rgb(1, 1, [Rgb(1, 2, 3)]);
    img.depth = 16;
    let err = encode_img_to(&img, ImageOutputType::Png, Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
