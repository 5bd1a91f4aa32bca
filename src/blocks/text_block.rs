use crate::{
    Result,
    blocks::common::{BlockHeader, BlockParse, padding_to_align_8, validate_block_id},
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// TXBLOCK: NUL terminated UTF-8 text, padded to 8 bytes.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub header: BlockHeader,
    pub text: String,
}

/// Total block length for a TX/MD block carrying `text`.
pub(crate) fn text_block_len(text: &str) -> u64 {
    let unpadded = 24 + text.len() + 1;
    (unpadded + padding_to_align_8(unpadded)) as u64
}

/// Decodes the body of a TX/MD block, dropping the terminator and padding.
pub(crate) fn parse_text_body(bytes: &[u8], header: &BlockHeader) -> String {
    let len = header.length as usize;
    let body = &bytes[24..len];
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    String::from_utf8_lossy(&body[..end]).into_owned()
}

pub(crate) fn text_body_to_bytes(header: &BlockHeader, text: &str) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(header.length as usize);
    buffer.extend_from_slice(&header.to_bytes()?);
    buffer.extend_from_slice(text.as_bytes());
    buffer.resize(header.length as usize, 0);
    Ok(buffer)
}

impl BlockParse<'_> for TextBlock {
    const ID: &'static str = "##TX";
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let text = parse_text_body(bytes, &header);
        Ok(Self { header, text })
    }
}

impl TextBlock {
    /// Creates a TX block whose length is derived from `text`.
    pub fn new(text: &str) -> Self {
        let text = text.trim_end_matches('\0');
        TextBlock {
            header: BlockHeader::new("##TX", text_block_len(text), 0),
            text: text.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##TX")?;
        text_body_to_bytes(&self.header, &self.text)
    }
}
