//! World atlas (`rt_map.dat`).
//!
//! The file starts with the total decompressed size, then one compressed size
//! and one absolute offset per world. Each world is an independent zlib
//! stream holding a row-major index plane followed by its own RGB palette.
use crate::error::{Error, Result};
use crate::ext::io::*;
use crate::types::{ImageData, Rgb};
use crate::utils::img::resolve_indexed;
use crate::utils::zlib::inflate;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Worlds in current clients.
pub const RTMAP_WORLDS: usize = 8;
/// Worlds in old clients.
pub const RTMAP_WORLDS_LEGACY: usize = 5;
pub const RTMAP_WIDTH: usize = 3072 * 2;
pub const RTMAP_HEIGHT: usize = 3072;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RtMapLayout {
    pub worlds: usize,
    pub width: usize,
    pub height: usize,
}

impl Default for RtMapLayout {
    fn default() -> Self {
        RtMapLayout {
            worlds: RTMAP_WORLDS,
            width: RTMAP_WIDTH,
            height: RTMAP_HEIGHT,
        }
    }
}

impl RtMapLayout {
    /// Current map dimensions with a given world count.
    pub fn with_worlds(worlds: usize) -> Self {
        RtMapLayout {
            worlds,
            ..Default::default()
        }
    }

    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtMapHeader {
    /// Decompressed size of all worlds. Informational only.
    pub size_orig: u32,
    pub sizes: Vec<u32>,
    pub offsets: Vec<u32>,
}

impl RtMapHeader {
    pub fn read<R: Read>(reader: &mut R, worlds: usize) -> Result<Self> {
        let size_orig = reader.read_u32()?;
        let sizes = (0..worlds)
            .map(|_| reader.read_u32())
            .collect::<std::io::Result<Vec<_>>>()?;
        let offsets = (0..worlds)
            .map(|_| reader.read_u32())
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(RtMapHeader {
            size_orig,
            sizes,
            offsets,
        })
    }
}

/// One decoded world.
#[derive(Clone, Debug)]
pub struct RtMapWorld {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<u8>,
    pub palette: Vec<Rgb>,
}

impl RtMapWorld {
    /// Splits an inflated world into its index plane and inline palette.
    ///
    /// Bytes after the last whole RGB triple are ignored.
    pub fn from_inflated(mut data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        let plane_len = width * height;
        if data.len() < plane_len {
            return Err(Error::PixelCountMismatch {
                expected: plane_len,
                actual: data.len(),
            });
        }
        let palette = data[plane_len..]
            .chunks_exact(3)
            .map(|c| Rgb(c[0], c[1], c[2]))
            .collect();
        data.truncate(plane_len);
        Ok(RtMapWorld {
            width,
            height,
            indices: data,
            palette,
        })
    }

    /// Resolves every index through the inline palette.
    pub fn to_image(&self) -> Result<ImageData> {
        resolve_indexed(
            &self.indices,
            self.width,
            self.height,
            self.width,
            &self.palette,
        )
    }
}

/// An opened world atlas. Worlds are decoded on demand and independently.
#[derive(Debug)]
pub struct RtMap<R> {
    reader: R,
    layout: RtMapLayout,
    header: RtMapHeader,
}

impl<R: Read + Seek> RtMap<R> {
    pub fn new(mut reader: R, layout: RtMapLayout) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = RtMapHeader::read(&mut reader, layout.worlds)?;
        debug!(
            "rtmap: {} worlds, {} bytes decompressed",
            layout.worlds, header.size_orig
        );
        Ok(RtMap {
            reader,
            layout,
            header,
        })
    }

    pub fn header(&self) -> &RtMapHeader {
        &self.header
    }

    pub fn world_count(&self) -> usize {
        self.layout.worlds
    }

    pub fn read_world(&mut self, world: usize) -> Result<RtMapWorld> {
        if world >= self.layout.worlds {
            return Err(Error::WorldOutOfRange {
                world,
                count: self.layout.worlds,
            });
        }
        let offset = self.header.offsets[world];
        let size = self.header.sizes[world];
        self.reader.seek(SeekFrom::Start(offset as u64))?;
        let compressed = self.reader.read_exact_vec(size as usize)?;
        let inflated = inflate(&compressed)?;
        RtMapWorld::from_inflated(inflated, self.layout.width, self.layout.height)
    }
}

#[cfg(test)]
pub(crate) fn build_rtmap(worlds: &[Vec<u8>]) -> Vec<u8> {
    let compressed: Vec<Vec<u8>> = worlds
        .iter()
        .map(|w| crate::utils::zlib::deflate(w))
        .collect();
    let header_len = 4 + 8 * worlds.len();
    let mut out = Vec::new();
    let total: usize = worlds.iter().map(Vec::len).sum();
    out.extend_from_slice(&(total as u32).to_le_bytes());
    for c in &compressed {
        out.extend_from_slice(&(c.len() as u32).to_le_bytes());
    }
    let mut offset = header_len;
    for c in &compressed {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += c.len();
    }
    for c in &compressed {
        out.extend_from_slice(c);
    }
    out
}

#[cfg(test)]
fn small_world(width: usize, height: usize, shade: u8) -> Vec<u8> {
    let mut data: Vec<u8> = (0..width * height).map(|i| (i % 2) as u8).collect();
    data.extend_from_slice(&[shade, 0, 0, 0, shade, 0]);
    data
}

#[test]
fn test_read_worlds_independently() {
    let layout = RtMapLayout {
        worlds: 2,
        width: 4,
        height: 2,
    };
    let file = build_rtmap(&[small_world(4, 2, 10), small_world(4, 2, 20)]);
    let mut map = RtMap::new(std::io::Cursor::new(file), layout).unwrap();
    let second = map.read_world(1).unwrap();
    let first = map.read_world(0).unwrap();
    assert_eq!(first.palette, vec![Rgb(10, 0, 0), Rgb(0, 10, 0)]);
    assert_eq!(second.palette, vec![Rgb(20, 0, 0), Rgb(0, 20, 0)]);
    let img = second.to_image().unwrap();
    assert_eq!(img.pixel(0, 0), Some(Rgb(20, 0, 0)));
    assert_eq!(img.pixel(1, 0), Some(Rgb(0, 20, 0)));
    assert!(matches!(
        map.read_world(2),
        Err(Error::WorldOutOfRange { world: 2, count: 2 })
    ));
}

#[test]
fn test_full_size_world() {
    let layout = RtMapLayout::with_worlds(1);
    let plane = layout.plane_len();
    let mut data = vec![0u8; plane];
    data[1] = 1;
    data[plane - 1] = 255;
    let mut palette: Vec<u8> = Vec::with_capacity(768);
    for i in 0..=255u8 {
        palette.extend_from_slice(&[i, 255 - i, 7]);
    }
    data.extend_from_slice(&palette);
    assert_eq!(data.len(), RTMAP_WIDTH * RTMAP_HEIGHT + 768);
    let file = build_rtmap(&[data]);
    let mut map = RtMap::new(std::io::Cursor::new(file), layout).unwrap();
    let world = map.read_world(0).unwrap();
    assert_eq!(world.indices.len(), RTMAP_WIDTH * RTMAP_HEIGHT);
    assert_eq!(world.palette.len(), 256);
    let img = world.to_image().unwrap();
    assert_eq!(img.data.len(), RTMAP_WIDTH * RTMAP_HEIGHT * 3);
    assert_eq!(img.pixel(0, 0), Some(Rgb(0, 255, 7)));
    assert_eq!(img.pixel(1, 0), Some(Rgb(1, 254, 7)));
    assert_eq!(
        img.pixel(RTMAP_WIDTH as u32 - 1, RTMAP_HEIGHT as u32 - 1),
        Some(Rgb(255, 0, 7))
    );
}

#[test]
fn test_short_world_plane() {
    let layout = RtMapLayout {
        worlds: 1,
        width: 4,
        height: 4,
    };
    let file = build_rtmap(&[vec![0u8; 10]]);
    let mut map = RtMap::new(std::io::Cursor::new(file), layout).unwrap();
    assert!(matches!(
        map.read_world(0),
        Err(Error::PixelCountMismatch {
            expected: 16,
            actual: 10
        })
    ));
}

#[test]
fn test_index_outside_inline_palette() {
    let world = RtMapWorld::from_inflated(vec![0, 2, 9, 9, 9, 1], 2, 1).unwrap();
    assert_eq!(world.palette, vec![Rgb(9, 9, 9)]);
    assert!(matches!(
        world.to_image(),
        Err(Error::PaletteIndexOutOfRange { index: 2, len: 1 })
    ));
}
