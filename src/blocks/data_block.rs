use crate::{
    Error, Result,
    blocks::common::{BlockHeader, padding_to_align_8},
};
use alloc::format;
use alloc::vec::Vec;

/// Plain payload block: DT (records), DV (values), SD (VLSD stream) or RD.
///
/// Borrowed from the file image; the payload is `length - 24` bytes.
#[derive(Debug, Clone)]
pub struct DataBlock<'a> {
    pub header: BlockHeader,
    pub data: &'a [u8],
}

/// Block ids that carry raw payload.
pub const PAYLOAD_BLOCK_IDS: [&str; 4] = ["##DT", "##DV", "##SD", "##RD"];

impl<'a> DataBlock<'a> {
    /// Parses any payload block; `expected` restricts the accepted ids.
    pub fn from_bytes_any(bytes: &'a [u8], expected: &[&str]) -> Result<Self> {
        let header = BlockHeader::from_bytes(bytes)?;
        if !expected.contains(&header.id.as_str()) {
            return Err(Error::BlockIDError {
                actual: header.id,
                expected: expected.join(" / "),
            });
        }
        let len = header.checked_len(bytes.len())?;
        Ok(Self {
            data: &bytes[24..len],
            header,
        })
    }

    /// Parse a block from an unfinalized file whose length field was never
    /// patched: everything up to the end of the file is payload.
    pub fn from_bytes_unfinalized(bytes: &'a [u8]) -> Result<Self> {
        let header = BlockHeader::from_bytes(bytes)?;
        Ok(Self {
            data: &bytes[24..],
            header,
        })
    }

    pub fn records(&self, record_size: usize) -> impl Iterator<Item = &'a [u8]> {
        self.data.chunks_exact(record_size.max(1))
    }
}

/// Serializes a payload block with id `id` (e.g. `"##DT"`) around `data`.
///
/// The block length covers exactly the payload; alignment padding belongs to
/// the writer and is not part of the block.
pub fn payload_block_bytes(id: &str, data: &[u8]) -> Result<Vec<u8>> {
    if !PAYLOAD_BLOCK_IDS.contains(&id) {
        return Err(Error::BlockSerializationError(format!(
            "{id} is not a payload block"
        )));
    }
    let header = BlockHeader::new(id, 24 + data.len() as u64, 0);
    let mut buffer = Vec::with_capacity(24 + data.len() + padding_to_align_8(data.len()));
    buffer.extend_from_slice(&header.to_bytes()?);
    buffer.extend_from_slice(data);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_block_round_trip() {
        let bytes = payload_block_bytes("##DT", &[1, 2, 3, 4, 5, 6]).unwrap();
        let dt = DataBlock::from_bytes_any(&bytes, &["##DT"]).unwrap();
        assert_eq!(dt.data, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(dt.records(3).count(), 2);
    }

    #[test]
    fn wrong_id_is_rejected() {
        let bytes = payload_block_bytes("##SD", &[0; 4]).unwrap();
        assert!(DataBlock::from_bytes_any(&bytes, &["##DT"]).is_err());
        assert!(payload_block_bytes("##XX", &[]).is_err());
    }
}
