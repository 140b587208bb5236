//! Checksummed, zlib-compressed and XOR-encrypted container shared by the
//! sprite id (`.did`) and palette (`.dpd`) files.
//!
//! Layout, little-endian:
//!
//! | size | field |
//! |---|---|
//! | 16 | first half of the ASCII MD5 digest |
//! | 4 | decompressed size |
//! | 4 | compressed size |
//! | 17 | second half of the digest, plus one padding byte |
//! | compressed size | zlib stream |
//! | 1 | trailing byte, ignored |
//!
//! The digest covers the inflated bytes before decryption.
use crate::error::{Error, Result};
use crate::ext::io::*;
use crate::utils::xored_stream::XoredStream;
use crate::utils::zlib::inflate;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// XOR key of sprite id containers.
pub const SPRITE_ID_KEY: u8 = 0x99;
/// XOR key of palette containers.
pub const PALETTE_KEY: u8 = 0x66;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerHeader {
    pub expected_digest: String,
    pub decompressed_size: u32,
    pub compressed_size: u32,
}

impl ContainerHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let hash_1: [u8; 16] = reader.read_exact_array()?;
        let decompressed_size = reader.read_u32()?;
        let compressed_size = reader.read_u32()?;
        let hash_2: [u8; 17] = reader.read_exact_array()?;
        let mut digest = Vec::with_capacity(32);
        digest.extend_from_slice(&hash_1);
        digest.extend_from_slice(&hash_2[..16]);
        if !digest.is_ascii() {
            return Err(Error::InvalidDigest);
        }
        let expected_digest = String::from_utf8(digest).map_err(|_| Error::InvalidDigest)?;
        Ok(ContainerHeader {
            expected_digest,
            decompressed_size,
            compressed_size,
        })
    }
}

/// Decrypted content of a container.
#[derive(Clone, Debug)]
pub struct ContainerPayload {
    pub data: Vec<u8>,
    /// Size announced by the header. Not checked against `data`, the digest
    /// already vouches for the content.
    pub decompressed_size: u32,
}

/// Lowercase hex MD5 digest of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Checks `data` against a hex digest, ignoring case.
pub fn verify(data: &[u8], expected_digest: &str) -> Result<()> {
    let actual = md5_hex(data);
    if actual.eq_ignore_ascii_case(expected_digest) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected_digest.to_string(),
            actual,
        })
    }
}

/// Reads a whole container from the start of `reader`, verifies it and
/// decrypts it with `key`.
///
/// On a digest mismatch nothing is decrypted and no data is returned.
pub fn read_container<R: Read + Seek>(reader: &mut R, key: u8) -> Result<ContainerPayload> {
    reader.seek(SeekFrom::Start(0))?;
    let header = ContainerHeader::read(reader)?;
    debug!(
        "container: {} compressed bytes, {} expected after inflate",
        header.compressed_size, header.decompressed_size
    );
    let compressed = reader.read_exact_vec(header.compressed_size as usize)?;
    let inflated = inflate(&compressed)?;
    verify(&inflated, &header.expected_digest)?;

    let mut data = Vec::with_capacity(inflated.len());
    XoredStream::new(MemReaderRef::new(&inflated), key).read_to_end(&mut data)?;

    let mut trailer = [0u8; 1];
    if reader.read(&mut trailer)? == 0 {
        debug!("container has no trailing byte");
    }

    Ok(ContainerPayload {
        data,
        decompressed_size: header.decompressed_size,
    })
}

#[cfg(test)]
pub(crate) fn build_container(plain: &[u8], key: u8, digest: Option<&str>) -> Vec<u8> {
    use std::io::Write;
    let mut encrypted = XoredStream::new(Vec::new(), key);
    encrypted.write_all(plain).unwrap();
    let encrypted = encrypted.into_inner();
    let compressed = crate::utils::zlib::deflate(&encrypted);
    let digest = digest.map_or_else(|| md5_hex(&encrypted), str::to_string);
    let digest = digest.as_bytes();
    let mut out = Vec::new();
    out.extend_from_slice(&digest[..16]);
    out.extend_from_slice(&(encrypted.len() as u32).to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&digest[16..32]);
    out.push(0);
    out.extend_from_slice(&compressed);
    out.push(0x2a);
    out
}

#[test]
fn test_read_container() {
    let plain = b"four palettes and a sprite".to_vec();
    let file = build_container(&plain, PALETTE_KEY, None);
    let payload = read_container(&mut std::io::Cursor::new(file), PALETTE_KEY).unwrap();
    assert_eq!(payload.data, plain);
    assert_eq!(payload.decompressed_size as usize, plain.len());
}

#[test]
fn test_read_container_uppercase_digest() {
    let plain = b"abc".to_vec();
    let encrypted: Vec<u8> = plain.iter().map(|b| b ^ SPRITE_ID_KEY).collect();
    let digest = md5_hex(&encrypted).to_uppercase();
    let file = build_container(&plain, SPRITE_ID_KEY, Some(&digest));
    let payload = read_container(&mut std::io::Cursor::new(file), SPRITE_ID_KEY).unwrap();
    assert_eq!(payload.data, plain);
}

#[test]
fn test_read_container_checksum_mismatch() {
    let bad = "0123456789abcdef0123456789abcdef";
    let file = build_container(b"abc", SPRITE_ID_KEY, Some(bad));
    let err = read_container(&mut std::io::Cursor::new(file), SPRITE_ID_KEY).unwrap_err();
    match err {
        Error::ChecksumMismatch { expected, actual } => {
            assert_eq!(expected, bad);
            assert_eq!(actual.len(), 32);
            assert_ne!(actual, bad);
        }
        e => panic!("unexpected error {e}"),
    }
}

#[test]
fn test_read_container_without_trailer() {
    let mut file = build_container(b"abc", PALETTE_KEY, None);
    file.pop();
    let payload = read_container(&mut std::io::Cursor::new(file), PALETTE_KEY).unwrap();
    assert_eq!(payload.data, b"abc");
}

#[test]
fn test_read_container_truncated_payload() {
    let mut file = build_container(b"abcdef", PALETTE_KEY, None);
    file.truncate(45);
    let err = read_container(&mut std::io::Cursor::new(file), PALETTE_KEY).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_invalid_digest_bytes() {
    let mut file = build_container(b"abc", PALETTE_KEY, None);
    file[3] = 0xff;
    let err = read_container(&mut std::io::Cursor::new(file), PALETTE_KEY).unwrap_err();
    assert!(matches!(err, Error::InvalidDigest));
}

#[cfg(test)]
proptest::proptest! {
    #[test]
    fn prop_verify_accepts_own_digest(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
        proptest::prop_assert!(verify(&data, &md5_hex(&data)).is_ok());
    }

    #[test]
    fn prop_verify_rejects_flipped_digit(
        data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256),
        pos in 0usize..32,
    ) {
        let mut digest: Vec<u8> = md5_hex(&data).into_bytes();
        digest[pos] = if digest[pos] == b'0' { b'1' } else { b'0' };
        let digest = String::from_utf8(digest).unwrap();
        let is_mismatch = matches!(verify(&data, &digest), Err(Error::ChecksumMismatch { .. }));
        proptest::prop_assert!(is_mismatch);
    }
}
