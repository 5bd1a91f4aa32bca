use super::HD_BLOCK_SIZE;
use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_f64, read_i16, read_u8, read_u64,
        validate_block_id, validate_block_length, validate_buffer_size,
    },
};
use alloc::vec::Vec;

/// Link offsets inside the HD block, used when patching.
pub const HD_FIRST_DG_LINK: u64 = 24;
pub const HD_FILE_HISTORY_LINK: u64 = 32;
pub const HD_ATTACHMENT_LINK: u64 = 48;
pub const HD_EVENT_LINK: u64 = 56;
pub const HD_COMMENT_LINK: u64 = 64;
pub const HD_ABS_TIME: u64 = 72;

/// HD flag: `start_angle` is valid.
pub const HD_FLAG_ANGLE_VALID: u8 = 0x01;
/// HD flag: `start_distance` is valid.
pub const HD_FLAG_DISTANCE_VALID: u8 = 0x02;

#[derive(Debug, Clone)]
pub struct HeaderBlock {
    pub header: BlockHeader,
    pub first_dg_addr: u64,
    pub file_history_addr: u64,
    pub channel_tree_addr: u64,
    pub first_attachment_addr: u64,
    pub first_event_addr: u64,
    pub comment_addr: u64,
    /// Start time in nanoseconds since 1970-01-01 UTC.
    pub abs_time: u64,
    /// Time zone offset in minutes.
    pub tz_offset: i16,
    /// Daylight saving offset in minutes.
    pub daylight_save_time: i16,
    pub time_flags: u8,
    pub time_quality: u8,
    pub flags: u8,
    pub start_angle: f64,
    pub start_distance: f64,
}

impl Default for HeaderBlock {
    fn default() -> Self {
        HeaderBlock {
            header: BlockHeader::new("##HD", HD_BLOCK_SIZE as u64, 6),
            first_dg_addr: 0,
            file_history_addr: 0,
            channel_tree_addr: 0,
            first_attachment_addr: 0,
            first_event_addr: 0,
            comment_addr: 0,
            abs_time: 0,
            tz_offset: 0,
            daylight_save_time: 0,
            time_flags: 0,
            time_quality: 0,
            flags: 0,
            start_angle: 0.0,
            start_distance: 0.0,
        }
    }
}

impl HeaderBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##HD")?;
        validate_block_length(&self.header, HD_BLOCK_SIZE as u64)?;

        let mut buffer = Vec::with_capacity(HD_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.first_dg_addr,
            self.file_history_addr,
            self.channel_tree_addr,
            self.first_attachment_addr,
            self.first_event_addr,
            self.comment_addr,
        ] {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        buffer.extend_from_slice(&self.abs_time.to_le_bytes());
        buffer.extend_from_slice(&self.tz_offset.to_le_bytes());
        buffer.extend_from_slice(&self.daylight_save_time.to_le_bytes());
        buffer.push(self.time_flags);
        buffer.push(self.time_quality);
        buffer.push(self.flags);
        buffer.push(0);
        buffer.extend_from_slice(&self.start_angle.to_le_bytes());
        buffer.extend_from_slice(&self.start_distance.to_le_bytes());
        debug_assert_eq!(buffer.len(), HD_BLOCK_SIZE);
        Ok(buffer)
    }
}

impl BlockParse<'_> for HeaderBlock {
    const ID: &'static str = "##HD";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        validate_buffer_size(bytes, HD_BLOCK_SIZE)?;
        let links = Self::parse_links(bytes, &header)?;
        // Data section follows the six links.
        let data = 24 + 8 * links.len();
        validate_buffer_size(bytes, data + 32)?;
        Ok(Self {
            first_dg_addr: link_at(&links, 0),
            file_history_addr: link_at(&links, 1),
            channel_tree_addr: link_at(&links, 2),
            first_attachment_addr: link_at(&links, 3),
            first_event_addr: link_at(&links, 4),
            comment_addr: link_at(&links, 5),
            abs_time: read_u64(bytes, data),
            tz_offset: read_i16(bytes, data + 8),
            daylight_save_time: read_i16(bytes, data + 10),
            time_flags: read_u8(bytes, data + 12),
            time_quality: read_u8(bytes, data + 13),
            flags: read_u8(bytes, data + 14),
            start_angle: read_f64(bytes, data + 16),
            start_distance: read_f64(bytes, data + 24),
            header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_block_round_trip() {
        let hd = HeaderBlock {
            abs_time: 1_700_000_000_000_000_000,
            tz_offset: 60,
            flags: HD_FLAG_ANGLE_VALID,
            start_angle: 12.5,
            first_dg_addr: 0x200,
            ..Default::default()
        };
        let bytes = hd.to_bytes().unwrap();
        let parsed = HeaderBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.abs_time, hd.abs_time);
        assert_eq!(parsed.tz_offset, 60);
        assert_eq!(parsed.first_dg_addr, 0x200);
        assert_eq!(parsed.start_angle, 12.5);
    }
}
