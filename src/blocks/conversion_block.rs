use crate::blocks::common::{
    BlockHeader, BlockParse, link_at, read_f64, read_u8, read_u16, validate_block_id,
    validate_buffer_size,
};
use crate::{Error, Result};

use alloc::format;
use alloc::vec::Vec;

/// `cc_flags` bits.
pub const CC_FLAG_PRECISION_VALID: u16 = 0x0001;
pub const CC_FLAG_RANGE_VALID: u16 = 0x0002;
pub const CC_FLAG_STATUS_STRING: u16 = 0x0004;

/// CCBLOCK as stored on disk.
///
/// `refs` point at TX blocks (text tables, formula) or nested CC blocks; the
/// reader resolves them into the model's conversion tree.
#[derive(Debug, Clone)]
pub struct ConversionBlock {
    pub header: BlockHeader,
    pub name_addr: u64,
    pub unit_addr: u64,
    pub comment_addr: u64,
    pub inverse_addr: u64,
    pub refs: Vec<u64>,
    pub conversion_type: u8,
    pub precision: u8,
    pub flags: u16,
    pub phys_range_min: Option<f64>,
    pub phys_range_max: Option<f64>,
    pub values: Vec<f64>,
}

impl Default for ConversionBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##CC", 24 + 32 + 8, 4),
            name_addr: 0,
            unit_addr: 0,
            comment_addr: 0,
            inverse_addr: 0,
            refs: Vec::new(),
            conversion_type: 0,
            precision: 0,
            flags: 0,
            phys_range_min: None,
            phys_range_max: None,
            values: Vec::new(),
        }
    }
}

impl BlockParse<'_> for ConversionBlock {
    const ID: &'static str = "##CC";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let mut offset = 24 + links.len() * 8;
        validate_buffer_size(bytes, offset + 8)?;

        let conversion_type = read_u8(bytes, offset);
        let precision = read_u8(bytes, offset + 1);
        let flags = read_u16(bytes, offset + 2);
        let value_count = read_u16(bytes, offset + 6) as usize;
        offset += 8;

        // Some writers always emit the physical range, even without the
        // range flag, so presence is decided by the block length.
        let size_without_range = offset + value_count * 8;
        let has_range = header.length as usize >= size_without_range + 16;
        let (phys_range_min, phys_range_max) = if has_range {
            validate_buffer_size(bytes, offset + 16)?;
            let range = (read_f64(bytes, offset), read_f64(bytes, offset + 8));
            offset += 16;
            (Some(range.0), Some(range.1))
        } else {
            (None, None)
        };

        validate_buffer_size(bytes, offset + value_count * 8)?;
        let values = (0..value_count)
            .map(|i| read_f64(bytes, offset + i * 8))
            .collect();

        Ok(Self {
            name_addr: link_at(&links, 0),
            unit_addr: link_at(&links, 1),
            comment_addr: link_at(&links, 2),
            inverse_addr: link_at(&links, 3),
            refs: links.iter().skip(4).copied().collect(),
            conversion_type,
            precision,
            flags,
            phys_range_min,
            phys_range_max,
            values,
            header,
        })
    }
}

impl ConversionBlock {
    /// Recomputes link count and length from the current contents.
    pub fn finish_layout(&mut self) {
        let links = 4 + self.refs.len();
        let mut size = 24 + links * 8 + 8 + self.values.len() * 8;
        if self.phys_range_min.is_some() || self.phys_range_max.is_some() {
            size += 16;
        }
        self.header.link_count = links as u64;
        self.header.length = size as u64;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##CC")?;
        let size = self.header.length as usize;
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.name_addr,
            self.unit_addr,
            self.comment_addr,
            self.inverse_addr,
        ] {
            buf.extend_from_slice(&link.to_le_bytes());
        }
        for l in &self.refs {
            buf.extend_from_slice(&l.to_le_bytes());
        }
        buf.push(self.conversion_type);
        buf.push(self.precision);
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&(self.refs.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.values.len() as u16).to_le_bytes());
        if self.phys_range_min.is_some() || self.phys_range_max.is_some() {
            buf.extend_from_slice(&self.phys_range_min.unwrap_or(0.0).to_le_bytes());
            buf.extend_from_slice(&self.phys_range_max.unwrap_or(0.0).to_le_bytes());
        }
        for v in &self.values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        if buf.len() != size {
            return Err(Error::BlockSerializationError(format!(
                "ConversionBlock expected size {size} but wrote {}",
                buf.len()
            )));
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_block_round_trip() {
        let mut cc = ConversionBlock {
            conversion_type: 1,
            values: alloc::vec![2.0, 0.5],
            ..Default::default()
        };
        cc.finish_layout();
        let parsed = ConversionBlock::from_bytes(&cc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.conversion_type, 1);
        assert_eq!(parsed.values, alloc::vec![2.0, 0.5]);
        assert!(parsed.phys_range_min.is_none());
    }

    #[test]
    fn range_is_detected_from_length() {
        let mut cc = ConversionBlock {
            conversion_type: 7,
            refs: alloc::vec![0x100, 0x200],
            values: alloc::vec![1.0],
            phys_range_min: Some(-5.0),
            phys_range_max: Some(5.0),
            flags: CC_FLAG_RANGE_VALID,
            ..Default::default()
        };
        cc.finish_layout();
        let parsed = ConversionBlock::from_bytes(&cc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.refs, alloc::vec![0x100, 0x200]);
        assert_eq!(parsed.phys_range_min, Some(-5.0));
        assert_eq!(parsed.values, alloc::vec![1.0]);
    }
}
