//! DZ Block: zlib compressed DT or SD payload.
//!
//! Compression and decompression require the `compression` feature.

use crate::{
    Error, Result,
    blocks::common::{
        BlockHeader, BlockParse, padding_to_align_8, read_u8, read_u32, read_u64, u64_to_usize,
        validate_buffer_size,
    },
};
use alloc::format;
use alloc::vec::Vec;

/// Compression algorithm used in a DZ block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DzCompressionType {
    /// Deflate only (zlib).
    Deflate = 0,
    /// Transposition followed by deflate.
    TranspositionDeflate = 1,
}

impl DzCompressionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Deflate),
            1 => Some(Self::TranspositionDeflate),
            _ => None,
        }
    }
}

/// DZ block header size (standard 24 + DZ-specific 24 = 48 bytes).
pub const DZ_HEADER_SIZE: usize = 48;

/// ```text
/// 24  original block type  char[2]  "DT" / "SD"
/// 26  zip type             u8
/// 28  zip parameter        u32      record size for transposition
/// 32  original length      u64
/// 40  compressed length    u64
/// 48  zlib stream
/// ```
#[derive(Debug, Clone)]
pub struct DzBlock<'a> {
    pub header: BlockHeader,
    pub original_block_type: [u8; 2],
    pub zip_type: DzCompressionType,
    pub zip_parameter: u32,
    pub original_data_length: u64,
    pub compressed_data_length: u64,
    pub data: &'a [u8],
}

impl<'a> BlockParse<'a> for DzBlock<'a> {
    const ID: &'static str = "##DZ";

    fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        validate_buffer_size(bytes, DZ_HEADER_SIZE)?;

        let zip_type_raw = read_u8(bytes, 26);
        let zip_type = DzCompressionType::from_u8(zip_type_raw).ok_or_else(|| {
            Error::BlockSerializationError(format!("Unknown DZ compression type: {zip_type_raw}"))
        })?;
        let compressed_data_length = read_u64(bytes, 40);
        let data_end = DZ_HEADER_SIZE + u64_to_usize(compressed_data_length, "DZ length")?;
        validate_buffer_size(bytes, data_end)?;

        Ok(Self {
            original_block_type: [bytes[24], bytes[25]],
            zip_type,
            zip_parameter: read_u32(bytes, 28),
            original_data_length: read_u64(bytes, 32),
            compressed_data_length,
            data: &bytes[DZ_HEADER_SIZE..data_end],
            header,
        })
    }
}

/// Column-major reordering of whole records; a trailing partial record is
/// left in place.
fn transpose(data: &[u8], columns: usize, inverse: bool) -> Vec<u8> {
    if columns <= 1 {
        return data.to_vec();
    }
    let rows = data.len() / columns;
    let body = rows * columns;
    let mut out = alloc::vec![0u8; data.len()];
    for row in 0..rows {
        for col in 0..columns {
            let row_major = row * columns + col;
            let col_major = col * rows + row;
            if inverse {
                out[row_major] = data[col_major];
            } else {
                out[col_major] = data[row_major];
            }
        }
    }
    out[body..].copy_from_slice(&data[body..]);
    out
}

#[cfg(feature = "compression")]
impl DzBlock<'_> {
    /// Returns the original payload, undoing transposition when present.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        use miniz_oxide::inflate::decompress_to_vec_zlib;

        let decompressed = decompress_to_vec_zlib(self.data).map_err(|e| {
            Error::BlockSerializationError(format!("DZ decompression failed: {e:?}"))
        })?;
        if decompressed.len() as u64 != self.original_data_length {
            return Err(Error::BlockSerializationError(format!(
                "DZ decompressed size mismatch: expected {}, got {}",
                self.original_data_length,
                decompressed.len()
            )));
        }
        match self.zip_type {
            DzCompressionType::Deflate => Ok(decompressed),
            DzCompressionType::TranspositionDeflate => Ok(transpose(
                &decompressed,
                self.zip_parameter as usize,
                true,
            )),
        }
    }
}

#[cfg(not(feature = "compression"))]
impl DzBlock<'_> {
    pub fn decompress(&self) -> Result<Vec<u8>> {
        Err(Error::UnsupportedFeature(
            "DZ blocks need the `compression` feature".into(),
        ))
    }
}

/// Builds a complete DZ block wrapping `data` that originally was a
/// `original_type` ("DT" or "SD") block. A non-zero `record_size` selects
/// transposition.
#[cfg(feature = "compression")]
pub fn compress_block_bytes(original_type: &[u8; 2], data: &[u8], record_size: u32) -> Result<Vec<u8>> {
    use miniz_oxide::deflate::compress_to_vec_zlib;

    let transposed = record_size > 1 && data.len() >= 2 * record_size as usize;
    let (zip_type, zip_param, compressed) = if transposed {
        let reordered = transpose(data, record_size as usize, false);
        (1u8, record_size, compress_to_vec_zlib(&reordered, 6))
    } else {
        (0u8, 0u32, compress_to_vec_zlib(data, 6))
    };

    let length = DZ_HEADER_SIZE + compressed.len();
    let header = BlockHeader::new("##DZ", length as u64, 0);
    let mut bytes = Vec::with_capacity(length + padding_to_align_8(length));
    bytes.extend_from_slice(&header.to_bytes()?);
    bytes.extend_from_slice(original_type);
    bytes.push(zip_type);
    bytes.push(0);
    bytes.extend_from_slice(&zip_param.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}
