//! Sprite metadata (`.did`): where each sprite lives in the `.dda` archives.
use crate::assets::container::{SPRITE_ID_KEY, read_container};
use crate::error::Result;
use crate::ext::io::*;
use crate::utils::struct_pack::{StructUnpack, unpack_records};
use serde::Serialize;
use std::io::{Read, Seek};

pub const SPRITE_NAME_LEN: usize = 64;
pub const SPRITE_PATH_LEN: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpriteRecord {
    pub name: String,
    /// Logical path of the sprite inside the game, `\` separated.
    pub path: String,
    /// Offset of the sprite header, after the archive's 4 byte marker.
    pub archive_offset: u32,
    /// Number of the `.dda` archive holding the sprite.
    pub archive_index: u64,
}

impl StructUnpack for SpriteRecord {
    const NAME: &'static str = "sprite id";
    const SIZE: usize = SPRITE_NAME_LEN + SPRITE_PATH_LEN + 4 + 8;

    fn unpack<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(SpriteRecord {
            name: reader.read_fstring(SPRITE_NAME_LEN)?,
            path: reader.read_fstring(SPRITE_PATH_LEN)?,
            archive_offset: reader.read_u32()?,
            archive_index: reader.read_u64()?,
        })
    }
}

/// Parses decrypted sprite id container content.
pub fn decode_sprite_ids(data: &[u8]) -> Result<Vec<SpriteRecord>> {
    unpack_records(data)
}

/// Reads, verifies, decrypts and parses a sprite id container.
pub fn read_sprite_ids<R: Read + Seek>(reader: &mut R) -> Result<Vec<SpriteRecord>> {
    let payload = read_container(reader, SPRITE_ID_KEY)?;
    decode_sprite_ids(&payload.data)
}

#[cfg(test)]
pub(crate) fn encode_sprite_record(record: &SpriteRecord) -> Vec<u8> {
    let mut out = record.name.as_bytes().to_vec();
    out.resize(SPRITE_NAME_LEN, 0);
    let mut path = record.path.as_bytes().to_vec();
    path.resize(SPRITE_PATH_LEN, 0);
    out.extend_from_slice(&path);
    out.extend_from_slice(&record.archive_offset.to_le_bytes());
    out.extend_from_slice(&record.archive_index.to_le_bytes());
    out
}

#[test]
fn test_record_size() {
    assert_eq!(SpriteRecord::SIZE, 332);
}

#[test]
fn test_read_sprite_ids() {
    let records = vec![
        SpriteRecord {
            name: "Wolf02-a (shadow)".into(),
            path: "Monsters\\Wolf".into(),
            archive_offset: 0x1234,
            archive_index: 2,
        },
        SpriteRecord {
            name: "Tree".into(),
            path: String::new(),
            archive_offset: 0,
            archive_index: u64::MAX,
        },
    ];
    let data: Vec<u8> = records.iter().flat_map(encode_sprite_record).collect();
    let file = crate::assets::container::build_container(&data, SPRITE_ID_KEY, None);
    assert_eq!(read_sprite_ids(&mut std::io::Cursor::new(file)).unwrap(), records);
}

#[test]
fn test_decode_sprite_ids_remainder() {
    let data = vec![0u8; SpriteRecord::SIZE + 10];
    assert!(matches!(
        decode_sprite_ids(&data),
        Err(crate::error::Error::MalformedRecordStream {
            kind: "sprite id",
            record_size: 332,
            ..
        })
    ));
}

#[cfg(test)]
fn record_strategy() -> impl proptest::strategy::Strategy<Value = SpriteRecord> {
    use proptest::prelude::*;
    (
        "[A-Za-z0-9 ()-]{0,64}",
        "[A-Za-z0-9\\\\]{0,200}",
        any::<u32>(),
        any::<u64>(),
    )
        .prop_map(|(name, path, archive_offset, archive_index)| SpriteRecord {
            name,
            path,
            archive_offset,
            archive_index,
        })
}

#[cfg(test)]
proptest::proptest! {
    #[test]
    fn prop_records_roundtrip(records in proptest::collection::vec(record_strategy(), 0..16)) {
        let data: Vec<u8> = records.iter().flat_map(encode_sprite_record).collect();
        let decoded = decode_sprite_ids(&data).unwrap();
        proptest::prop_assert_eq!(decoded, records);
    }
}
