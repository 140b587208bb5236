use std::io::*;

pub trait ReadExt {
    fn read_u8(&mut self) -> Result<u8>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_u64(&mut self) -> Result<u64>;

    /// Reads a fixed-size, NUL-padded UTF-8 string, cut at the first NUL
    /// byte. Invalid UTF-8 sequences are replaced rather than rejected.
    fn read_fstring(&mut self, len: usize) -> Result<String>;

    /// Reads exactly `len` bytes. The buffer only grows as data arrives, so
    /// a bogus length fails at the end of the input.
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>>;
    fn read_exact_array<const N: usize>(&mut self) -> Result<[u8; N]>;
}

impl<T: Read> ReadExt for T {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }
    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
    fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_fstring(&mut self, len: usize) -> Result<String> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        if let Some(pos) = buf.iter().position(|&b| b == 0) {
            buf.truncate(pos);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.by_ref().take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("Expected {} bytes, only {} available", len, buf.len()),
            ));
        }
        Ok(buf)
    }

    fn read_exact_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A seekable reader over a borrowed byte slice.
pub struct MemReaderRef<'a> {
    data: &'a [u8],
    pos: usize,
}

impl std::fmt::Debug for MemReaderRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReaderRef")
            .field("pos", &self.pos)
            .field("data_length", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<'a> MemReaderRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        MemReaderRef { data, pos: 0 }
    }

    /// Bytes left between the cursor and the end of the data.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

impl Read for MemReaderRef<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let bytes_to_read = buf.len().min(self.data.len() - self.pos);
        buf[..bytes_to_read].copy_from_slice(&self.data[self.pos..self.pos + bytes_to_read]);
        self.pos += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl Seek for MemReaderRef<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Seek resulted in negative position",
            ));
        }
        if new_pos as u64 > self.data.len() as u64 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Seek position is beyond the end of the data",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

#[test]
fn test_read_fstring_trims_at_first_nul() {
    let mut data = b"Wolf".to_vec();
    data.resize(8, 0);
    data[6] = b'x';
    let mut reader = MemReaderRef::new(&data);
    assert_eq!(reader.read_fstring(8).unwrap(), "Wolf");
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_mem_reader_seek_bounds() {
    let data = [1u8, 2, 3, 4];
    let mut reader = MemReaderRef::new(&data);
    reader.seek(SeekFrom::Start(2)).unwrap();
    assert_eq!(reader.read_u16().unwrap(), 0x0403);
    assert!(reader.seek(SeekFrom::Start(5)).is_err());
    assert!(reader.seek(SeekFrom::Current(-10)).is_err());
    assert!(reader.read_u8().is_err());
}

#[test]
fn test_read_exact_vec_bounded_by_input() {
    let data = [1u8, 2, 3];
    let mut reader = MemReaderRef::new(&data);
    let err = reader.read_exact_vec(u32::MAX as usize).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    let mut reader = MemReaderRef::new(&data);
    assert_eq!(reader.read_exact_vec(2).unwrap(), vec![1, 2]);
    assert_eq!(reader.remaining(), 1);
}
