//! Sprite pixel archives (`.dda`).
//!
//! A sprite is found through its [`SpriteRecord`]: the record names the
//! archive and the offset of the encrypted header, the header names the
//! codec and the payload size.
pub mod codec;
pub mod header;
pub mod rle;

use crate::assets::palette::PaletteSet;
use crate::assets::sprite_id::SpriteRecord;
use crate::error::{Error, Result};
use crate::types::ImageData;
use codec::SpriteCodec;
use header::{SpriteHeader, read_sprite};
use std::collections::BTreeMap;
use std::io::{Read, Seek};

#[derive(Clone, Debug)]
pub struct DecodedSprite {
    pub header: SpriteHeader,
    /// Name of the palette the image was resolved with.
    pub palette: String,
    pub image: ImageData,
}

/// Decodes one sprite from its archive and renders it with the palette
/// matching its name.
pub fn decode_sprite<R: Read + Seek>(
    archive: &mut R,
    record: &SpriteRecord,
    palettes: &PaletteSet,
) -> Result<DecodedSprite> {
    let (header, payload) = read_sprite(archive, record.archive_offset)?;
    let codec =
        SpriteCodec::try_from(header.sprite_type).map_err(Error::UnrecognizedSpriteType)?;
    let pixels = codec.decode(&payload, &header)?;
    let palette = palettes.resolve(&record.name);
    let image = pixels.resolve(&palette.colors)?;
    Ok(DecodedSprite {
        header,
        palette: palette.name.clone(),
        image,
    })
}

/// Open archive handles of a run, keyed by archive number.
#[derive(Debug)]
pub struct SpriteArchives<R> {
    archives: BTreeMap<u64, R>,
}

impl<R> Default for SpriteArchives<R> {
    fn default() -> Self {
        SpriteArchives {
            archives: BTreeMap::new(),
        }
    }
}

impl<R: Read + Seek> SpriteArchives<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u64, archive: R) {
        self.archives.insert(index, archive);
    }

    pub fn contains(&self, index: u64) -> bool {
        self.archives.contains_key(&index)
    }

    pub fn get_mut(&mut self, index: u64) -> Result<&mut R> {
        self.archives
            .get_mut(&index)
            .ok_or(Error::MissingArchive(index))
    }

    pub fn indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.archives.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn decode(&mut self, record: &SpriteRecord, palettes: &PaletteSet) -> Result<DecodedSprite> {
        let archive = self.get_mut(record.archive_index)?;
        decode_sprite(archive, record, palettes)
    }
}

/// Builds an archive holding the given sprites, returning it with the offset
/// of each sprite.
#[cfg(test)]
pub(crate) fn build_archive(sprites: &[(SpriteHeader, Vec<u8>)]) -> (Vec<u8>, Vec<u32>) {
    let mut out = b"DDA\0".to_vec();
    let mut offsets = Vec::new();
    for (header, payload) in sprites {
        offsets.push((out.len() - header::ARCHIVE_MARKER_LEN as usize) as u32);
        let header = SpriteHeader {
            size_compressed: payload.len() as u32,
            ..header.clone()
        };
        out.extend_from_slice(&header.encrypt());
        out.extend_from_slice(payload);
    }
    (out, offsets)
}

#[cfg(test)]
fn test_palettes() -> PaletteSet {
    use crate::assets::palette::Palette;
    use crate::types::Rgb;
    let bright = Palette {
        name: "Bright1".into(),
        colors: (0..=255u8).map(|i| Rgb(i, i, i)).collect(),
    };
    let wolf = Palette {
        name: "Wolf".into(),
        colors: (0..=255u8).map(|i| Rgb(i, 0, 0)).collect(),
    };
    PaletteSet::new(vec![bright, wolf]).unwrap()
}

#[cfg(test)]
fn record(name: &str, archive_offset: u32, archive_index: u64) -> SpriteRecord {
    SpriteRecord {
        name: name.into(),
        path: "Test".into(),
        archive_offset,
        archive_index,
    }
}

#[test]
fn test_decode_each_codec() {
    use crate::types::Rgb;
    use crate::utils::zlib::deflate;
    let raw = SpriteHeader {
        sprite_type: 1,
        width: 2,
        height: 2,
        ..Default::default()
    };
    let rle = SpriteHeader {
        sprite_type: 2,
        width: 2,
        height: 1,
        ..Default::default()
    };
    let zlib = SpriteHeader {
        sprite_type: 9,
        width: 3,
        height: 1,
        size_uncompressed: 3,
        ..Default::default()
    };
    let (archive, offsets) = build_archive(&[
        (raw, vec![1, 2, 3, 4]),
        (rle, vec![1, 0, 0, 1, 0, 9, 0]),
        (zlib, deflate(&[5, 6, 7])),
    ]);
    let palettes = test_palettes();
    let mut archive = std::io::Cursor::new(archive);

    let sprite = decode_sprite(&mut archive, &record("Wolf01", offsets[0], 0), &palettes).unwrap();
    assert_eq!(sprite.palette, "Wolf");
    assert_eq!(sprite.image.pixel(1, 1), Some(Rgb(4, 0, 0)));

    let sprite = decode_sprite(&mut archive, &record("Rock", offsets[1], 0), &palettes).unwrap();
    assert_eq!(sprite.palette, "Bright1");
    assert_eq!(sprite.image.data, vec![0, 0, 0, 9, 9, 9]);

    let sprite = decode_sprite(&mut archive, &record("Rock", offsets[2], 0), &palettes).unwrap();
    assert_eq!(sprite.header.sprite_type, 9);
    assert_eq!(sprite.image.pixel(2, 0), Some(Rgb(7, 7, 7)));
}

#[test]
fn test_unrecognized_type() {
    let header = SpriteHeader {
        sprite_type: 4,
        width: 1,
        height: 1,
        ..Default::default()
    };
    let (archive, offsets) = build_archive(&[(header, vec![0])]);
    let err = decode_sprite(
        &mut std::io::Cursor::new(archive),
        &record("Wolf", offsets[0], 0),
        &test_palettes(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnrecognizedSpriteType(4)));
}

#[test]
fn test_archives_by_index() {
    let header = SpriteHeader {
        sprite_type: 1,
        width: 1,
        height: 1,
        ..Default::default()
    };
    let (archive, offsets) = build_archive(&[(header, vec![3])]);
    let mut archives = SpriteArchives::new();
    archives.insert(2, std::io::Cursor::new(archive));
    assert!(archives.contains(2));
    assert_eq!(archives.indices().collect::<Vec<_>>(), vec![2]);
    let palettes = test_palettes();
    assert!(archives.decode(&record("A", offsets[0], 2), &palettes).is_ok());
    assert!(matches!(
        archives.decode(&record("A", offsets[0], 1), &palettes),
        Err(Error::MissingArchive(1))
    ));
}
