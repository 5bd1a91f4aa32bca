//! In-memory object model of an MDF file.
//!
//! ```text
//! MdfFile
//! └── Header
//!     ├── DataGroup*            (ordered, append only)
//!     │   └── ChannelGroup*     (record templates)
//!     │       └── Channel*      (record fields)
//!     │           ├── ChannelConversion
//!     │           ├── SourceInformation
//!     │           └── ChannelArray
//!     ├── FileHistory*
//!     ├── Attachment*
//!     └── Event*
//! ```
//!
//! Parents own their children exclusively. Every object carries an index
//! assigned once at creation: the block address for objects read from a
//! file, the next value of the file's counter for objects created in memory.
//! Indices never repeat within one file and are the only cross references
//! (creator indices, length channels, the channel to data group lookup).

mod attachment;
mod channel;
mod channel_array;
mod channel_group;
mod conversion;
mod data_group;
mod event;
mod file;
mod file_history;
mod header;
mod metadata;
mod source_information;

pub use attachment::Attachment;
pub use channel::Channel;
pub use channel_array::{
    CA_FLAG_AXIS, CA_FLAG_COMPARISON_QUANTITY, CA_FLAG_DYNAMIC_SIZE, CA_FLAG_FIXED_AXIS,
    CA_FLAG_INPUT_QUANTITY, CA_FLAG_INVERSE_LAYOUT, CA_FLAG_LEFT_OPEN_INTERVAL,
    CA_FLAG_OUTPUT_QUANTITY, ChannelArray,
};
pub use channel_group::ChannelGroup;
pub use conversion::{ChannelConversion, ConversionRef};
pub use data_group::DataGroup;
pub use event::Event;
pub use file::MdfFile;
pub use file_history::FileHistory;
pub use header::Header;
pub use source_information::SourceInformation;
pub use metadata::{ETag, ETagDataType, ETagValue, MetaData, xml_escape};
pub(crate) use channel_group::SampleData;
pub(crate) use metadata::Comment;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

/// Per-file source of object indices.
///
/// Clones share the same counter, so every object created anywhere in one
/// file draws from one increasing sequence.
#[derive(Debug, Clone)]
pub(crate) struct IndexSource(Arc<AtomicU64>);

impl Default for IndexSource {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }
}

impl IndexSource {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Makes sure later indices are greater than `value`.
    pub fn bump_past(&self, value: u64) {
        self.0.fetch_max(value.saturating_add(1), Ordering::Relaxed);
    }
}

// The counter is bookkeeping, not content.
impl PartialEq for IndexSource {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_sequence() {
        let source = IndexSource::default();
        let other = source.clone();
        let a = source.next();
        let b = other.next();
        assert!(b > a);
        source.bump_past(1000);
        assert!(other.next() > 1000);
        source.bump_past(5);
        assert!(source.next() > 1000);
    }
}
