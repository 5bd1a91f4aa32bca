//! On-disk MDF3 block structures.
//!
//! MDF3 blocks start with a two character id and a u16 block size; links
//! are u32 file offsets. Only little endian block fields are supported; the
//! byte order flag of the identification block still selects the default
//! byte order of channel values.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::blocks::{read_u16, read_u32, u64_to_usize, validate_buffer_size};
use crate::{Error, Result};

mod channel_block;
mod channel_group_block;
mod conversion_block;
mod data_group_block;
mod extension_block;
mod header_block;
mod text_block;

pub use channel_block::{CN3_TYPE_DATA, CN3_TYPE_TIME, Cn3Block};
pub use channel_group_block::Cg3Block;
pub use conversion_block::{Cc3Block, Cc3Parameters};
pub use data_group_block::Dg3Block;
pub use extension_block::{CE3_TYPE_DIM, CE3_TYPE_VECTOR_CAN, Ce3Block};
pub use header_block::Hd3Block;
pub use text_block::{Tx3Block, read_text3};

/// Offset of the `dg_data` link inside a DG block.
pub const DG3_DATA_LINK: u64 = 16;
/// Offset of the `hd_dg` link inside the HD block.
pub const HD3_FIRST_DG_LINK: u64 = 4;
/// Offset of the number of data groups inside the HD block.
pub const HD3_DG_COUNT: u64 = 16;
/// Offset of the record count inside a CG block.
pub const CG3_RECORD_COUNT: u64 = 22;

/// Validates the block id at the start of `bytes` and returns the block size.
pub(crate) fn parse_block_header(bytes: &[u8], expected: &str) -> Result<usize> {
    validate_buffer_size(bytes, 4)?;
    let id = String::from_utf8_lossy(&bytes[0..2]).into_owned();
    if id != expected {
        return Err(Error::BlockIDError {
            actual: id,
            expected: expected.into(),
        });
    }
    let size = read_u16(bytes, 2) as usize;
    validate_buffer_size(bytes, size.max(4))?;
    Ok(size)
}

pub(crate) fn push_block_header(buffer: &mut Vec<u8>, id: &str, size: usize) -> Result<()> {
    let size = u16::try_from(size).map_err(|_| {
        Error::BlockSerializationError(format!("MDF3 {id} block of {size} bytes is too large"))
    })?;
    buffer.extend_from_slice(id.as_bytes());
    buffer.extend_from_slice(&size.to_le_bytes());
    Ok(())
}

#[inline]
pub(crate) fn read_link(bytes: &[u8], offset: usize) -> u64 {
    read_u32(bytes, offset) as u64
}

/// Appends a u32 link, rejecting addresses beyond 4 GiB.
pub(crate) fn push_link(buffer: &mut Vec<u8>, address: u64) -> Result<()> {
    let link = u32::try_from(address).map_err(|_| {
        Error::BlockLinkError(format!("address {address:#x} does not fit an MDF3 link"))
    })?;
    buffer.extend_from_slice(&link.to_le_bytes());
    Ok(())
}

/// Slice of `file` starting at the MDF3 block at `address`.
pub(crate) fn block3_slice(file: &[u8], address: u64) -> Result<&[u8]> {
    let offset = u64_to_usize(address, "MDF3 block address")?;
    validate_buffer_size(file, offset.saturating_add(4))?;
    Ok(&file[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_must_fit_u32() {
        let mut buf = Vec::new();
        push_link(&mut buf, 0x1000).unwrap();
        assert_eq!(read_link(&buf, 0), 0x1000);
        assert!(matches!(
            push_link(&mut buf, u64::from(u32::MAX) + 1),
            Err(Error::BlockLinkError(_))
        ));
    }

    #[test]
    fn header_checks_id_and_size() {
        let mut buf = Vec::new();
        push_block_header(&mut buf, "TX", 6).unwrap();
        buf.extend_from_slice(b"a\0");
        assert_eq!(parse_block_header(&buf, "TX").unwrap(), 6);
        assert!(matches!(
            parse_block_header(&buf, "CN"),
            Err(Error::BlockIDError { .. })
        ));
        buf.truncate(5);
        assert!(parse_block_header(&buf, "TX").is_err());
    }
}
