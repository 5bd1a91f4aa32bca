//! Block placement and in-place patching on top of an [`MdfWrite`] sink.

use alloc::collections::BTreeMap;
use alloc::vec;

use super::MdfWrite;
use crate::Result;

/// Appends blocks at 8 byte aligned addresses and patches already written
/// fields. Addresses of blocks written for model objects are kept by object
/// index.
#[derive(Debug)]
pub(super) struct BlockSink<W: MdfWrite> {
    writer: W,
    offset: u64,
    positions: BTreeMap<u64, u64>,
}

impl<W: MdfWrite> BlockSink<W> {
    /// Sink appending after the current position of `writer`.
    pub fn new(writer: W) -> Self {
        let offset = writer.position();
        Self {
            writer,
            offset,
            positions: BTreeMap::new(),
        }
    }

    /// Writes `bytes` at the next 8 byte boundary and returns their address.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<u64> {
        let align = (8 - self.offset % 8) % 8;
        if align != 0 {
            self.writer.write_all(&vec![0u8; align as usize])?;
            self.offset += align;
        }
        let start = self.offset;
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(start)
    }

    /// Writes the block of the model object `index` and remembers its address.
    pub fn write_object(&mut self, index: u64, bytes: &[u8]) -> Result<u64> {
        let address = self.write_block(bytes)?;
        self.positions.insert(index, address);
        Ok(address)
    }

    /// Address of the block written for object `index`.
    pub fn position_of(&self, index: u64) -> Option<u64> {
        self.positions.get(&index).copied()
    }

    /// Records the address of an object that already exists in the file.
    pub fn register(&mut self, index: u64, address: u64) {
        self.positions.insert(index, address);
    }

    /// Overwrites bytes at `at` and returns to the end of the file.
    pub fn patch(&mut self, at: u64, bytes: &[u8]) -> Result<()> {
        self.writer.seek(at)?;
        self.writer.write_all(bytes)?;
        self.writer.seek(self.offset)?;
        Ok(())
    }

    /// Sets the u64 link at `at` to `address`.
    pub fn update_link(&mut self, at: u64, address: u64) -> Result<()> {
        self.patch(at, &address.to_le_bytes())
    }

    pub fn update_u64(&mut self, at: u64, value: u64) -> Result<()> {
        self.patch(at, &value.to_le_bytes())
    }

    pub fn update_u32(&mut self, at: u64, value: u32) -> Result<()> {
        self.patch(at, &value.to_le_bytes())
    }

    pub fn update_u16(&mut self, at: u64, value: u16) -> Result<()> {
        self.patch(at, &value.to_le_bytes())
    }

    /// Current end of the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}
