use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{ChannelGroup, IndexSource, MetaData};

/// Container of one physical record stream and the channel groups sharing it.
///
/// Channel groups are told apart by a record id prefixed to each record when
/// `record_id_size` is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGroup {
    pub(crate) index: u64,
    pub(crate) description: String,
    pub(crate) record_id_size: u8,
    pub(crate) channel_groups: Vec<ChannelGroup>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) is_read: bool,
    /// `dg_data` link as read from the file.
    pub(crate) data_link: u64,
    pub(crate) persisted: bool,
    pub(crate) index_source: IndexSource,
}

impl DataGroup {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next(), index_source)
    }

    pub(crate) fn with_index(index: u64, index_source: &IndexSource) -> Self {
        Self {
            index,
            description: String::new(),
            record_id_size: 0,
            channel_groups: Vec::new(),
            metadata: None,
            is_read: false,
            data_link: 0,
            persisted: false,
            index_source: index_source.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// Size in bytes of the record id preceding each record (0, 1, 2, 4 or 8).
    pub fn record_id_size(&self) -> u8 {
        self.record_id_size
    }

    pub fn set_record_id_size(&mut self, size: u8) {
        self.record_id_size = size;
    }

    pub fn channel_groups(&self) -> &[ChannelGroup] {
        &self.channel_groups
    }

    pub fn channel_groups_mut(&mut self) -> &mut [ChannelGroup] {
        &mut self.channel_groups
    }

    pub fn channel_group(&self, position: usize) -> Option<&ChannelGroup> {
        self.channel_groups.get(position)
    }

    pub fn channel_group_mut(&mut self, position: usize) -> Option<&mut ChannelGroup> {
        self.channel_groups.get_mut(position)
    }

    /// Appends a new channel group.
    pub fn create_channel_group(&mut self) -> &mut ChannelGroup {
        let cg = ChannelGroup::new(&self.index_source);
        self.channel_groups.push(cg);
        let last = self.channel_groups.len() - 1;
        &mut self.channel_groups[last]
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        self.channel_groups
            .iter()
            .position(|cg| cg.name == name)
            .or_else(|| {
                self.channel_groups
                    .iter()
                    .position(|cg| cg.name.contains(name))
            })
    }

    /// Channel group whose name equals `name`, else the first containing it.
    pub fn channel_group_by_name(&self, name: &str) -> Option<&ChannelGroup> {
        self.position_by_name(name).map(|p| &self.channel_groups[p])
    }

    pub fn channel_group_by_name_mut(&mut self, name: &str) -> Option<&mut ChannelGroup> {
        self.position_by_name(name)
            .map(|p| &mut self.channel_groups[p])
    }

    pub fn channel_group_by_record_id(&self, record_id: u64) -> Option<&ChannelGroup> {
        self.channel_groups
            .iter()
            .find(|cg| cg.record_id == record_id)
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }

    /// True once the sample data of this group is held in memory.
    pub fn is_read(&self) -> bool {
        self.is_read
    }

    /// Drops the in-memory samples of every channel group.
    ///
    /// Channel groups, channels and sample counters are kept; the group can
    /// be read again afterwards.
    pub fn clear_data(&mut self) {
        for cg in &mut self.channel_groups {
            cg.clear_samples();
        }
        self.is_read = false;
    }

    /// Channel group owning the channel with index `channel_index`.
    pub fn find_parent_channel_group(&self, channel_index: u64) -> Option<&ChannelGroup> {
        self.channel_groups
            .iter()
            .find(|cg| cg.channel_by_index(channel_index).is_some())
    }

    pub(crate) fn contains_channel(&self, channel_index: u64) -> bool {
        self.find_parent_channel_group(channel_index).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_groups_append_and_resolve() {
        let mut dg = DataGroup::new(&IndexSource::default());
        let a = dg.create_channel_group();
        a.set_name("CAN_DataFrame");
        a.record_id = 1;
        let first = a.index();
        let b = dg.create_channel_group();
        b.set_name("CAN_ErrorFrame");
        b.record_id = 2;
        assert!(b.index() > first);

        assert_eq!(dg.channel_group_by_name("ErrorFrame").map(|cg| cg.record_id()), Some(2));
        assert_eq!(dg.channel_group_by_record_id(1).map(ChannelGroup::name), Some("CAN_DataFrame"));
        assert!(dg.channel_group_by_record_id(3).is_none());
    }

    #[test]
    fn clear_data_keeps_structure() {
        let mut dg = DataGroup::new(&IndexSource::default());
        let cg = dg.create_channel_group();
        let cn_index = cg.create_channel().index();
        cg.nof_samples = 2;
        cg.samples = super::super::SampleData::new(4);
        cg.samples.push_record(&[1, 2, 3, 4]);
        cg.samples.push_record(&[5, 6, 7, 8]);
        dg.is_read = true;

        dg.clear_data();
        assert!(!dg.is_read());
        let cg = &dg.channel_groups()[0];
        assert_eq!(cg.nof_loaded_samples(), 0);
        assert_eq!(cg.channels().len(), 1);
        assert_eq!(cg.nof_samples(), 2);
        assert!(dg.find_parent_channel_group(cn_index).is_some());
    }
}
