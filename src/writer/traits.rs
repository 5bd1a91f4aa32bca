//! Byte sinks the writer can target.
//!
//! [`MdfWrite`] is the small random access interface the writer needs:
//! sequential appends plus seeking back to patch links and counters. It is
//! implemented for an in-memory buffer and for buffered files.

use alloc::vec::Vec;

use crate::Result;

/// Random access byte sink used by [`crate::MdfWriter`].
pub trait MdfWrite {
    /// Writes all of `bytes` at the current position.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Moves to the absolute position `pos`.
    fn seek(&mut self, pos: u64) -> Result<u64>;

    fn position(&self) -> u64;

    /// Pushes buffered bytes to the underlying storage.
    fn flush(&mut self) -> Result<()>;
}

/// In-memory sink, e.g. for building a file before handing it elsewhere or
/// reading it back with [`crate::MdfReader::from_bytes`].
#[derive(Debug, Clone, Default)]
pub struct VecWriter {
    buffer: Vec<u8>,
    position: u64,
}

impl VecWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Continues an existing image; writes start at its end.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        let position = buffer.len() as u64;
        Self { buffer, position }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl MdfWrite for VecWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.position as usize;
        let end = start + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[start..end].copy_from_slice(bytes);
        self.position = end as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<u64> {
        self.position = pos;
        Ok(pos)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

mod file {
    use std::fs::{File, OpenOptions};
    use std::io::{BufWriter, Seek, SeekFrom, Write};
    use std::path::Path;

    use super::MdfWrite;
    use crate::Result;

    /// Default size of the write buffer in front of the file.
    pub const DEFAULT_IO_BUFFER: usize = 1 << 20;

    /// Buffered file sink.
    #[derive(Debug)]
    pub struct FileWriter {
        inner: BufWriter<File>,
        position: u64,
    }

    impl FileWriter {
        /// Creates (or truncates) the file at `path`.
        pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
            Self::with_capacity(path, DEFAULT_IO_BUFFER)
        }

        pub fn with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
            let file = File::create(path)?;
            Ok(Self {
                inner: BufWriter::with_capacity(capacity, file),
                position: 0,
            })
        }

        /// Opens an existing file for appending; writes start at its end and
        /// earlier bytes can still be patched.
        pub fn open_existing<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
            let mut file = OpenOptions::new().read(true).write(true).open(path)?;
            let position = file.seek(SeekFrom::End(0))?;
            Ok(Self {
                inner: BufWriter::with_capacity(capacity, file),
                position,
            })
        }
    }

    impl MdfWrite for FileWriter {
        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.inner.write_all(bytes)?;
            self.position += bytes.len() as u64;
            Ok(())
        }

        fn seek(&mut self, pos: u64) -> Result<u64> {
            self.inner.seek(SeekFrom::Start(pos))?;
            self.position = pos;
            Ok(pos)
        }

        fn position(&self) -> u64 {
            self.position
        }

        fn flush(&mut self) -> Result<()> {
            self.inner.flush()?;
            self.inner.get_ref().sync_data()?;
            Ok(())
        }
    }
}

pub use file::{DEFAULT_IO_BUFFER, FileWriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_writer_patches_in_place() {
        let mut sink = VecWriter::new();
        sink.write_all(&[1, 2, 3, 4]).unwrap();
        sink.seek(1).unwrap();
        sink.write_all(&[9]).unwrap();
        sink.seek(4).unwrap();
        sink.write_all(&[5]).unwrap();
        assert_eq!(sink.as_slice(), &[1, 9, 3, 4, 5]);
    }

    #[test]
    fn from_vec_appends() {
        let mut sink = VecWriter::from_vec(alloc::vec![7, 7]);
        assert_eq!(sink.position(), 2);
        sink.write_all(&[8]).unwrap();
        assert_eq!(sink.into_inner(), alloc::vec![7, 7, 8]);
    }
}
