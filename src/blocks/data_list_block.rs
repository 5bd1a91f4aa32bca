use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_u8, read_u32, read_u64, u64_to_usize,
        validate_block_id, validate_buffer_size,
    },
};
use alloc::vec::Vec;

pub const DL_NEXT_LINK: u64 = 24;
const DL_FLAG_EQUAL_LENGTH: u8 = 0x01;

/// DLBLOCK: ordered list of DT/DZ/SD fragments, chained through `next`.
#[derive(Debug, Clone)]
pub struct DataListBlock {
    pub header: BlockHeader,
    pub next: u64,
    pub data_links: Vec<u64>,
    pub flags: u8,
    pub equal_length: Option<u64>,
    /// Start of each fragment's payload within the concatenated stream.
    pub offsets: Vec<u64>,
}

impl BlockParse<'_> for DataListBlock {
    const ID: &'static str = "##DL";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let mut off = 24 + links.len() * 8;
        validate_buffer_size(bytes, off + 8)?;

        let flags = read_u8(bytes, off);
        let count = u64_to_usize(read_u32(bytes, off + 4) as u64, "DL count")?;
        off += 8;
        let data_links: Vec<u64> = links.iter().skip(1).take(count).copied().collect();

        let (equal_length, offsets) = if flags & DL_FLAG_EQUAL_LENGTH != 0 {
            validate_buffer_size(bytes, off + 8)?;
            (Some(read_u64(bytes, off)), Vec::new())
        } else {
            let available = (bytes.len().saturating_sub(off)) / 8;
            let n = count.min(available);
            (None, (0..n).map(|i| read_u64(bytes, off + i * 8)).collect())
        };

        Ok(DataListBlock {
            next: link_at(&links, 0),
            data_links,
            flags,
            equal_length,
            offsets,
            header,
        })
    }
}

impl DataListBlock {
    /// List of fragments with explicit stream offsets.
    pub fn new(data_links: Vec<u64>, offsets: Vec<u64>) -> Self {
        let n = data_links.len() as u64;
        Self {
            header: BlockHeader::new("##DL", 24 + (n + 1) * 8 + 8 + n * 8, n + 1),
            next: 0,
            data_links,
            flags: 0,
            equal_length: None,
            offsets,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##DL")?;
        let mut buf = Vec::with_capacity(self.header.length as usize);
        buf.extend_from_slice(&self.header.to_bytes()?);
        buf.extend_from_slice(&self.next.to_le_bytes());
        for link in &self.data_links {
            buf.extend_from_slice(&link.to_le_bytes());
        }
        buf.push(self.flags);
        buf.extend_from_slice(&[0u8; 3]);
        buf.extend_from_slice(&(self.data_links.len() as u32).to_le_bytes());
        match self.equal_length {
            Some(len) if self.flags & DL_FLAG_EQUAL_LENGTH != 0 => {
                buf.extend_from_slice(&len.to_le_bytes())
            }
            _ => {
                for o in &self.offsets {
                    buf.extend_from_slice(&o.to_le_bytes());
                }
            }
        }
        Ok(buf)
    }
}

/// HLBLOCK: header of a DL chain holding compressed fragments.
#[derive(Debug, Clone)]
pub struct HeaderListBlock {
    pub header: BlockHeader,
    pub first_dl: u64,
    pub flags: u16,
    pub zip_type: u8,
}

impl BlockParse<'_> for HeaderListBlock {
    const ID: &'static str = "##HL";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let d = 24 + links.len() * 8;
        validate_buffer_size(bytes, d + 3)?;
        Ok(Self {
            first_dl: link_at(&links, 0),
            flags: crate::blocks::common::read_u16(bytes, d),
            zip_type: read_u8(bytes, d + 2),
            header,
        })
    }
}

impl HeaderListBlock {
    /// HL block in front of a DL chain of deflate-compressed fragments.
    pub fn new(first_dl: u64) -> Self {
        Self {
            header: BlockHeader::new("##HL", 40, 1),
            first_dl,
            flags: 0,
            zip_type: 0,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##HL")?;
        let mut buf = Vec::with_capacity(40);
        buf.extend_from_slice(&self.header.to_bytes()?);
        buf.extend_from_slice(&self.first_dl.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.push(self.zip_type);
        buf.extend_from_slice(&[0u8; 5]);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_list_with_offsets_round_trip() {
        let mut dl = DataListBlock::new(alloc::vec![0x100, 0x200], alloc::vec![0, 64]);
        dl.next = 0x300;
        let bytes = dl.to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, dl.header.length);
        let parsed = DataListBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.next, 0x300);
        assert_eq!(parsed.data_links, alloc::vec![0x100, 0x200]);
        assert_eq!(parsed.offsets, alloc::vec![0, 64]);
    }

    #[test]
    fn header_list_round_trip() {
        let hl = HeaderListBlock::new(0x480);
        let bytes = hl.to_bytes().unwrap();
        assert_eq!(bytes.len(), 40);
        let parsed = HeaderListBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.first_dl, 0x480);
        assert_eq!(parsed.zip_type, 0);
    }
}
