use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_f64, read_i64, read_u8, read_u16, read_u32,
        validate_block_id, validate_buffer_size,
    },
};
use alloc::vec::Vec;

/// `ev_flags`: the group name link follows the scope and attachment links.
pub const EV_FLAG_GROUP_NAME: u8 = 0x02;

/// EVBLOCK: marker or range boundary on the measurement timeline.
///
/// Links: next, parent, range, name, comment, `scope_count` scope links,
/// `attachment_count` attachment links and an optional group name link.
#[derive(Debug, Clone)]
pub struct EventBlock {
    pub header: BlockHeader,
    pub next_ev_addr: u64,
    pub parent_ev_addr: u64,
    pub range_ev_addr: u64,
    pub name_addr: u64,
    pub comment_addr: u64,
    pub scope_addrs: Vec<u64>,
    pub attachment_addrs: Vec<u64>,
    pub group_name_addr: u64,
    pub event_type: u8,
    pub sync_type: u8,
    pub range_type: u8,
    pub cause: u8,
    pub flags: u8,
    pub creator_index: u16,
    pub sync_base_value: i64,
    pub sync_factor: f64,
}

impl Default for EventBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##EV", 24 + 5 * 8 + 32, 5),
            next_ev_addr: 0,
            parent_ev_addr: 0,
            range_ev_addr: 0,
            name_addr: 0,
            comment_addr: 0,
            scope_addrs: Vec::new(),
            attachment_addrs: Vec::new(),
            group_name_addr: 0,
            event_type: 0,
            sync_type: 1,
            range_type: 0,
            cause: 0,
            flags: 0,
            creator_index: 0,
            sync_base_value: 0,
            sync_factor: 1.0,
        }
    }
}

impl BlockParse<'_> for EventBlock {
    const ID: &'static str = "##EV";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let d = 24 + links.len() * 8;
        validate_buffer_size(bytes, d + 32)?;

        let flags = read_u8(bytes, d + 4);
        let scope_count = read_u32(bytes, d + 8) as usize;
        let attachment_count = read_u16(bytes, d + 12) as usize;
        let scope_end = (5 + scope_count).min(links.len());
        let attachment_end = (scope_end + attachment_count).min(links.len());
        let group_name_addr = if flags & EV_FLAG_GROUP_NAME != 0 {
            link_at(&links, attachment_end)
        } else {
            0
        };

        Ok(Self {
            next_ev_addr: link_at(&links, 0),
            parent_ev_addr: link_at(&links, 1),
            range_ev_addr: link_at(&links, 2),
            name_addr: link_at(&links, 3),
            comment_addr: link_at(&links, 4),
            scope_addrs: links[5.min(links.len())..scope_end].to_vec(),
            attachment_addrs: links[scope_end..attachment_end].to_vec(),
            group_name_addr,
            event_type: read_u8(bytes, d),
            sync_type: read_u8(bytes, d + 1),
            range_type: read_u8(bytes, d + 2),
            cause: read_u8(bytes, d + 3),
            flags,
            creator_index: read_u16(bytes, d + 14),
            sync_base_value: read_i64(bytes, d + 16),
            sync_factor: read_f64(bytes, d + 24),
            header,
        })
    }
}

impl EventBlock {
    /// Updates the header to match the link vectors and group name flag.
    pub fn finish_layout(&mut self) {
        let mut links = 5 + self.scope_addrs.len() + self.attachment_addrs.len();
        if self.flags & EV_FLAG_GROUP_NAME != 0 {
            links += 1;
        }
        self.header.link_count = links as u64;
        self.header.length = (24 + links * 8 + 32) as u64;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##EV")?;
        let mut buffer = Vec::with_capacity(self.header.length as usize);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.next_ev_addr,
            self.parent_ev_addr,
            self.range_ev_addr,
            self.name_addr,
            self.comment_addr,
        ] {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        for link in self.scope_addrs.iter().chain(self.attachment_addrs.iter()) {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        if self.flags & EV_FLAG_GROUP_NAME != 0 {
            buffer.extend_from_slice(&self.group_name_addr.to_le_bytes());
        }
        buffer.push(self.event_type);
        buffer.push(self.sync_type);
        buffer.push(self.range_type);
        buffer.push(self.cause);
        buffer.push(self.flags);
        buffer.extend_from_slice(&[0u8; 3]);
        buffer.extend_from_slice(&(self.scope_addrs.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.attachment_addrs.len() as u16).to_le_bytes());
        buffer.extend_from_slice(&self.creator_index.to_le_bytes());
        buffer.extend_from_slice(&self.sync_base_value.to_le_bytes());
        buffer.extend_from_slice(&self.sync_factor.to_le_bytes());
        Ok(buffer)
    }
}
