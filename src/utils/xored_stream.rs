use std::io::{Read, Seek, Write};

/// A stream that XORs every byte with a single-byte key.
pub struct XoredStream<T> {
    inner: T,
    key: u8,
}

impl<T> XoredStream<T> {
    pub fn new(inner: T, key: u8) -> Self {
        XoredStream { inner, key }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Read for XoredStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read_bytes = self.inner.read(buf)?;
        for byte in &mut buf[..read_bytes] {
            *byte ^= self.key;
        }
        Ok(read_bytes)
    }
}

impl<T: Write> Write for XoredStream<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let encrypted_buf: Vec<u8> = buf.iter().map(|b| b ^ self.key).collect();
        self.inner.write(&encrypted_buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for XoredStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XoredStream")
            .field("inner", &self.inner)
            .field("key", &self.key)
            .finish()
    }
}

/// A stream that XORs data with a repeating key based on the current position.
pub struct XoredKeyStream<'k, T> {
    inner: T,
    key: &'k [u8],
    base_position: u64,
}

impl<'k, T> XoredKeyStream<'k, T> {
    /// `base_position` is the key offset that lines up with stream position 0.
    pub fn new(inner: T, key: &'k [u8], base_position: u64) -> Self {
        XoredKeyStream {
            inner,
            key,
            base_position,
        }
    }
}

impl<T: Read + Seek> Read for XoredKeyStream<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let key_len = self.key.len();
        if key_len == 0 {
            return self.inner.read(buf);
        }
        let start_pos =
            ((self.inner.stream_position()? + self.base_position) % (key_len as u64)) as usize;
        let readed = self.inner.read(buf)?;
        for (i, byte) in buf[..readed].iter_mut().enumerate() {
            *byte ^= self.key[(start_pos + i) % key_len];
        }
        Ok(readed)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for XoredKeyStream<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XoredKeyStream")
            .field("inner", &self.inner)
            .field("base_position", &self.base_position)
            .finish()
    }
}

#[test]
fn test_xored_stream_roundtrip() {
    let mut encrypted = XoredStream::new(Vec::new(), 0x99);
    encrypted.write_all(b"sprite").unwrap();
    let encrypted = encrypted.into_inner();
    assert_ne!(encrypted, b"sprite");
    let mut decrypted = Vec::new();
    XoredStream::new(&encrypted[..], 0x99)
        .read_to_end(&mut decrypted)
        .unwrap();
    assert_eq!(decrypted, b"sprite");
}

#[test]
fn test_xored_key_stream_follows_position() {
    use crate::ext::io::MemReaderRef;
    let key = [0x01u8, 0x02, 0x04];
    let data = [0u8; 5];
    let mut stream = XoredKeyStream::new(MemReaderRef::new(&data), &key, 0);
    let mut first = [0u8; 2];
    stream.read_exact(&mut first).unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert_eq!(first, [0x01, 0x02]);
    assert_eq!(rest, [0x04, 0x01, 0x02]);
}
