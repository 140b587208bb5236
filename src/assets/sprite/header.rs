use crate::error::Result;
use crate::ext::io::*;
use crate::utils::struct_pack::StructUnpack;
use crate::utils::xored_stream::XoredKeyStream;
use std::io::{Read, Seek, SeekFrom};

/// Repeating XOR key applied to every sprite header.
pub const HEADER_KEY: [u8; 28] = [
    0xAA, 0xAA, 0x58, 0x14, 0x34, 0x12, 0x42, 0x62, 0x55, 0x23, 0xC3, 0xF6, 0xF3, 0xAA, 0xAA, 0xAA,
    0x21, 0x43, 0x34, 0x12, 0xAA, 0xBB, 0xCC, 0xDD, 0xDD, 0xCC, 0xBB, 0xAA,
];

/// Format marker at the start of every `.dda` archive.
pub const ARCHIVE_MARKER_LEN: u64 = 4;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SpriteHeader {
    pub sprite_type: u16,
    pub shadow_flag: u16,
    pub width: u16,
    pub height: u16,
    pub origin_x: i16,
    pub origin_y: i16,
    pub extent_x: i16,
    pub extent_y: i16,
    pub reserved: u16,
    pub transparent_color: u16,
    pub size_uncompressed: u32,
    pub size_compressed: u32,
}

impl StructUnpack for SpriteHeader {
    const NAME: &'static str = "sprite header";
    const SIZE: usize = 28;

    fn unpack<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(SpriteHeader {
            sprite_type: reader.read_u16()?,
            shadow_flag: reader.read_u16()?,
            width: reader.read_u16()?,
            height: reader.read_u16()?,
            origin_x: reader.read_i16()?,
            origin_y: reader.read_i16()?,
            extent_x: reader.read_i16()?,
            extent_y: reader.read_i16()?,
            reserved: reader.read_u16()?,
            transparent_color: reader.read_u16()?,
            size_uncompressed: reader.read_u32()?,
            size_compressed: reader.read_u32()?,
        })
    }
}

impl SpriteHeader {
    /// Decrypts and parses the 28 header bytes as stored in the archive.
    pub fn decrypt(raw: &[u8; 28]) -> Result<Self> {
        let mut reader = XoredKeyStream::new(MemReaderRef::new(raw), &HEADER_KEY, 0);
        Self::unpack(&mut reader)
    }
}

/// Reads the header and the compressed payload of the sprite at
/// `archive_offset`.
pub fn read_sprite<R: Read + Seek>(
    archive: &mut R,
    archive_offset: u32,
) -> Result<(SpriteHeader, Vec<u8>)> {
    archive.seek(SeekFrom::Start(ARCHIVE_MARKER_LEN + archive_offset as u64))?;
    let raw: [u8; 28] = archive.read_exact_array()?;
    let header = SpriteHeader::decrypt(&raw)?;
    let payload = archive.read_exact_vec(header.size_compressed as usize)?;
    Ok((header, payload))
}

#[cfg(test)]
impl SpriteHeader {
    /// Encrypted on-disk form of the header.
    pub(crate) fn encrypt(&self) -> [u8; 28] {
        let mut out = Vec::with_capacity(28);
        out.extend_from_slice(&self.sprite_type.to_le_bytes());
        out.extend_from_slice(&self.shadow_flag.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.origin_x.to_le_bytes());
        out.extend_from_slice(&self.origin_y.to_le_bytes());
        out.extend_from_slice(&self.extent_x.to_le_bytes());
        out.extend_from_slice(&self.extent_y.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
        out.extend_from_slice(&self.transparent_color.to_le_bytes());
        out.extend_from_slice(&self.size_uncompressed.to_le_bytes());
        out.extend_from_slice(&self.size_compressed.to_le_bytes());
        let mut raw = [0u8; 28];
        for (i, b) in out.into_iter().enumerate() {
            raw[i] = b ^ HEADER_KEY[i];
        }
        raw
    }
}

#[test]
fn test_decrypt_all_zero_plain_header() {
    let header = SpriteHeader::decrypt(&HEADER_KEY).unwrap();
    assert_eq!(header, SpriteHeader::default());
}

#[test]
fn test_decrypt_fields() {
    let header = SpriteHeader {
        sprite_type: 2,
        shadow_flag: 1,
        width: 181,
        height: 12,
        origin_x: -5,
        origin_y: 7,
        extent_x: -1,
        extent_y: 300,
        reserved: 0,
        transparent_color: 0xfe,
        size_uncompressed: 1000,
        size_compressed: 600,
    };
    assert_eq!(SpriteHeader::decrypt(&header.encrypt()).unwrap(), header);
}

#[test]
fn test_read_sprite_skips_marker() {
    let header = SpriteHeader {
        sprite_type: 1,
        width: 2,
        height: 1,
        size_compressed: 2,
        ..Default::default()
    };
    let mut archive = b"DDA\0".to_vec();
    archive.extend_from_slice(&[0xee; 3]);
    archive.extend_from_slice(&header.encrypt());
    archive.extend_from_slice(&[5, 6, 7]);
    let (read, payload) = read_sprite(&mut std::io::Cursor::new(archive), 3).unwrap();
    assert_eq!(read, header);
    assert_eq!(payload, vec![5, 6]);
}

#[test]
fn test_read_sprite_oversized_payload() {
    let header = SpriteHeader {
        sprite_type: 1,
        width: 1,
        height: 1,
        size_compressed: u32::MAX,
        ..Default::default()
    };
    let mut archive = b"DDA\0".to_vec();
    archive.extend_from_slice(&header.encrypt());
    archive.extend_from_slice(&[1, 2, 3]);
    let err = read_sprite(&mut std::io::Cursor::new(archive), 0).unwrap_err();
    assert!(matches!(err, crate::error::Error::Io(_)));
}
