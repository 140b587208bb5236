//! Fixed-layout record unpacking.
use crate::error::{Error, Result};
use crate::ext::io::MemReaderRef;
use std::io::Read;

/// A record with a fixed little-endian byte layout.
pub trait StructUnpack: Sized {
    /// Name used in error messages.
    const NAME: &'static str;
    /// Encoded size of one record in bytes.
    const SIZE: usize;

    fn unpack<R: Read>(reader: &mut R) -> Result<Self>;
}

/// Parses a buffer made of back-to-back records.
///
/// The buffer must hold a whole number of records, otherwise nothing is
/// returned.
pub fn unpack_records<T: StructUnpack>(data: &[u8]) -> Result<Vec<T>> {
    if data.len() % T::SIZE != 0 {
        return Err(Error::MalformedRecordStream {
            kind: T::NAME,
            len: data.len(),
            record_size: T::SIZE,
        });
    }
    let count = data.len() / T::SIZE;
    let mut reader = MemReaderRef::new(data);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(T::unpack(&mut reader)?);
    }
    Ok(records)
}

#[cfg(test)]
#[derive(Debug, PartialEq)]
struct Pair(u16, u16);

#[cfg(test)]
impl StructUnpack for Pair {
    const NAME: &'static str = "pair";
    const SIZE: usize = 4;

    fn unpack<R: Read>(reader: &mut R) -> Result<Self> {
        use crate::ext::io::ReadExt;
        Ok(Pair(reader.read_u16()?, reader.read_u16()?))
    }
}

#[test]
fn test_unpack_records() {
    let data = [1u8, 0, 2, 0, 3, 0, 4, 0];
    let pairs: Vec<Pair> = unpack_records(&data).unwrap();
    assert_eq!(pairs, vec![Pair(1, 2), Pair(3, 4)]);
    let empty: Vec<Pair> = unpack_records(&[]).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_unpack_records_rejects_remainder() {
    let data = [1u8, 0, 2, 0, 3];
    let err = unpack_records::<Pair>(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedRecordStream {
            kind: "pair",
            len: 5,
            record_size: 4
        }
    ));
}
