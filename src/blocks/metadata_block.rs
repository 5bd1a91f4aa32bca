use crate::{
    Result,
    blocks::common::{BlockHeader, BlockParse, validate_block_id},
    blocks::text_block::{parse_text_body, text_block_len, text_body_to_bytes},
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// MDBLOCK: XML comment attached to another block.
#[derive(Debug, Clone)]
pub struct MetadataBlock {
    pub header: BlockHeader,
    pub xml: String,
}

impl BlockParse<'_> for MetadataBlock {
    const ID: &'static str = "##MD";
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let xml = parse_text_body(bytes, &header);
        Ok(Self { header, xml })
    }
}

impl MetadataBlock {
    pub fn new(xml: &str) -> Self {
        MetadataBlock {
            header: BlockHeader::new("##MD", text_block_len(xml), 0),
            xml: xml.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##MD")?;
        text_body_to_bytes(&self.header, &self.xml)
    }
}
