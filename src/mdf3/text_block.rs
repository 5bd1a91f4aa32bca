use alloc::string::String;
use alloc::vec::Vec;

use super::{block3_slice, parse_block_header, push_block_header};
use crate::Result;

/// MDF3 TX block: NUL terminated Latin-1 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx3Block {
    pub text: String,
}

impl Tx3Block {
    pub fn new(text: &str) -> Self {
        Self { text: text.into() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = parse_block_header(bytes, "TX")?;
        let body = &bytes[4..size.max(4)];
        let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
        let text = body[..end].iter().map(|&b| b as char).collect();
        Ok(Self { text })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body: Vec<u8> = self
            .text
            .chars()
            .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
            .collect();
        let mut buffer = Vec::with_capacity(body.len() + 5);
        push_block_header(&mut buffer, "TX", body.len() + 5)?;
        buffer.extend_from_slice(&body);
        buffer.push(0);
        Ok(buffer)
    }
}

/// Text of the TX block at `address`, or "" for a nil link.
pub fn read_text3(file: &[u8], address: u64) -> Result<String> {
    if address == 0 {
        return Ok(String::new());
    }
    Ok(Tx3Block::from_bytes(block3_slice(file, address)?)?.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let bytes = Tx3Block::new("Motor °C").to_bytes().unwrap();
        assert_eq!(&bytes[0..2], b"TX");
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(Tx3Block::from_bytes(&bytes).unwrap().text, "Motor °C");
    }

    #[test]
    fn nil_link_reads_empty() {
        assert_eq!(read_text3(&[], 0).unwrap(), "");
    }
}
