//! Errors raised while decoding game assets.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] png::EncodingError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zlib inflate failed: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("embedded checksum is not a 32 character ASCII digest")]
    InvalidDigest,

    #[error("checksums do not match (expected {expected}, computed {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("{kind} stream of {len} bytes is not a multiple of the {record_size} byte record size")]
    MalformedRecordStream {
        kind: &'static str,
        len: usize,
        record_size: usize,
    },

    #[error("unrecognized sprite type {0}")]
    UnrecognizedSpriteType(u16),

    #[error("run-length stream ends early at offset {offset}")]
    RleTruncated { offset: usize },

    #[error("run-length stream writes outside the sprite at ({x}, {y})")]
    RleOutOfBounds { x: i64, y: usize },

    #[error("expected {expected} pixels, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    #[error("palette index {index} is outside a palette of {len} colors")]
    PaletteIndexOutOfRange { index: u8, len: usize },

    #[error("world {world} does not exist (map holds {count} worlds)")]
    WorldOutOfRange { world: usize, count: usize },

    #[error("file {} does not exist", .0.display())]
    NotFound(std::path::PathBuf),

    #[error("sprite archive {0} is not available")]
    MissingArchive(u64),

    #[error("fallback palette {0:?} is missing, no sprite can be rendered")]
    MissingPaletteFallback(String),
}

impl Error {
    /// Whether the error must halt the whole run instead of one asset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingPaletteFallback(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_only_missing_fallback_is_fatal() {
    assert!(Error::MissingPaletteFallback("Bright1".into()).is_fatal());
    assert!(!Error::UnrecognizedSpriteType(3).is_fatal());
    assert!(
        !Error::ChecksumMismatch {
            expected: "a".into(),
            actual: "b".into(),
        }
        .is_fatal()
    );
}
