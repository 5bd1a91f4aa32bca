// src/blocks/mod.rs
//! On-disk MDF4 block structures.
//!
//! Each block type parses from a byte slice starting at its header through
//! [`BlockParse`] and serializes with `to_bytes()`. Links are raw file
//! addresses; resolving them into the object model happens in the reader.

// ============================================================================
// Block Size Constants
// ============================================================================
// Fixed sizes for MDF 4.x block structures. Variable-length blocks (TX, MD,
// DT, SD, DL, CC, EV, AT, CA) derive their size from their contents.

/// Identification block size (64 bytes), shared with MDF3.
pub(crate) const ID_BLOCK_SIZE: usize = 64;

/// Header block size (104 bytes).
pub(crate) const HD_BLOCK_SIZE: usize = 104;

/// Data group block size (64 bytes).
pub(crate) const DG_BLOCK_SIZE: usize = 64;

/// Channel group block size (104 bytes).
pub(crate) const CG_BLOCK_SIZE: usize = 104;

/// Channel block size (160 bytes).
pub(crate) const CN_BLOCK_SIZE: usize = 160;

/// Source block size (56 bytes).
pub(crate) const SI_BLOCK_SIZE: usize = 56;

// ============================================================================
// Submodules
// ============================================================================

pub mod attachment_block;
pub mod channel_array_block;
pub mod channel_block;
pub mod channel_group_block;
mod common;
pub mod conversion_block;
mod data_block;
pub mod data_group_block;
pub mod data_list_block;
pub mod dz_block;
pub mod event_block;
mod file_history_block;
pub mod header_block;
pub mod identification_block;
mod metadata_block;
mod source_block;
mod text_block;

pub use common::{
    BlockHeader, BlockParse, DataType, StringBlock, block_slice, padding_to_align_8,
    read_fixed_str, read_f64, read_i16, read_string_block, read_text, read_u16, read_u32,
    read_u64, read_u8, u64_to_usize, validate_buffer_size, write_fixed_str,
};

pub use attachment_block::AttachmentBlock;
pub use channel_array_block::ChannelArrayBlock;
pub use channel_block::ChannelBlock;
pub use channel_group_block::ChannelGroupBlock;
pub use conversion_block::ConversionBlock;
pub use data_block::{DataBlock, PAYLOAD_BLOCK_IDS, payload_block_bytes};
pub use data_group_block::DataGroupBlock;
pub use data_list_block::{DataListBlock, HeaderListBlock};
pub use dz_block::{DzBlock, DzCompressionType};
#[cfg(feature = "compression")]
pub use dz_block::compress_block_bytes;
pub use event_block::EventBlock;
pub use file_history_block::FileHistoryBlock;
pub use header_block::HeaderBlock;
pub use identification_block::IdentificationBlock;
pub use metadata_block::MetadataBlock;
pub use source_block::SourceBlock;
pub use text_block::TextBlock;
