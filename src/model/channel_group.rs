use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{Channel, IndexSource, MetaData, SourceInformation};
use crate::blocks::channel_group_block::{
    CG_FLAG_BUS_EVENT, CG_FLAG_PLAIN_BUS_EVENT, CG_FLAG_REMOTE_MASTER, CG_FLAG_VLSD,
};
use crate::types::MdfBusType;

/// Materialized samples of one channel group.
///
/// Records are stored back to back without their record id, each
/// `record_size` bytes long (data bytes followed by invalidation bytes).
/// Values of variable length channels are resolved per sample and keyed by
/// the channel index; `None` marks a sample whose record points at no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SampleData {
    pub record_size: usize,
    pub records: Vec<u8>,
    pub vlsd: BTreeMap<u64, Vec<Option<Vec<u8>>>>,
}

impl SampleData {
    pub fn new(record_size: usize) -> Self {
        Self {
            record_size,
            ..Default::default()
        }
    }

    pub fn nof_records(&self) -> usize {
        self.records.len().checked_div(self.record_size).unwrap_or(0)
    }

    pub fn record(&self, sample: usize) -> Option<&[u8]> {
        let start = sample.checked_mul(self.record_size)?;
        self.records.get(start..start.checked_add(self.record_size)?)
    }

    pub fn push_record(&mut self, record: &[u8]) {
        let start = self.records.len();
        self.records.extend_from_slice(record);
        self.records.resize(start + self.record_size, 0);
    }

    pub fn vlsd_value(&self, channel_index: u64, sample: usize) -> Option<&[u8]> {
        self.vlsd
            .get(&channel_index)
            .and_then(|values| values.get(sample))
            .and_then(|value| value.as_deref())
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.vlsd.clear();
    }
}

/// Record template: the channels sharing one record layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    pub(crate) index: u64,
    pub(crate) record_id: u64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) nof_samples: u64,
    pub(crate) flags: u16,
    pub(crate) path_separator: u16,
    pub(crate) bus_type: Option<MdfBusType>,
    pub(crate) data_bytes: u32,
    pub(crate) invalidation_bytes: u32,
    /// Offsets were set by the creator; the writer keeps them as they are.
    pub(crate) fixed_layout: bool,
    pub(crate) channels: Vec<Channel>,
    pub(crate) source_information: Option<SourceInformation>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) samples: SampleData,
    pub(crate) index_source: IndexSource,
}

impl ChannelGroup {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next(), index_source)
    }

    pub(crate) fn with_index(index: u64, index_source: &IndexSource) -> Self {
        Self {
            index,
            record_id: 0,
            name: String::new(),
            description: String::new(),
            nof_samples: 0,
            flags: 0,
            path_separator: 0,
            bus_type: None,
            data_bytes: 0,
            invalidation_bytes: 0,
            fixed_layout: false,
            channels: Vec::new(),
            source_information: None,
            metadata: None,
            samples: SampleData::default(),
            index_source: index_source.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Record id distinguishing this group inside its data group.
    pub fn record_id(&self) -> u64 {
        self.record_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn nof_samples(&self) -> u64 {
        self.nof_samples
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    pub fn is_vlsd(&self) -> bool {
        self.flags & CG_FLAG_VLSD != 0
    }

    pub fn is_bus_event(&self) -> bool {
        self.flags & (CG_FLAG_BUS_EVENT | CG_FLAG_PLAIN_BUS_EVENT) != 0
    }

    pub fn is_remote_master(&self) -> bool {
        self.flags & CG_FLAG_REMOTE_MASTER != 0
    }

    pub fn path_separator(&self) -> u16 {
        self.path_separator
    }

    pub fn set_path_separator(&mut self, separator: u16) {
        self.path_separator = separator;
    }

    pub fn bus_type(&self) -> Option<MdfBusType> {
        self.bus_type
    }

    pub fn set_bus_type(&mut self, bus_type: Option<MdfBusType>) {
        self.bus_type = bus_type;
    }

    /// Bytes of a record without record id: data plus invalidation bytes.
    pub fn record_size(&self) -> usize {
        self.data_bytes as usize + self.invalidation_bytes as usize
    }

    pub fn data_bytes(&self) -> u32 {
        self.data_bytes
    }

    pub fn invalidation_bytes(&self) -> u32 {
        self.invalidation_bytes
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    pub fn channel(&self, position: usize) -> Option<&Channel> {
        self.channels.get(position)
    }

    pub fn channel_mut(&mut self, position: usize) -> Option<&mut Channel> {
        self.channels.get_mut(position)
    }

    /// Appends a new channel.
    pub fn create_channel(&mut self) -> &mut Channel {
        let channel = Channel::new(&self.index_source);
        self.channels.push(channel);
        let last = self.channels.len() - 1;
        &mut self.channels[last]
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.channels.iter().position(|c| c.name.contains(name)))
    }

    /// Channel whose name equals `name`, else the first containing it.
    pub fn channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.position_by_name(name).map(|p| &self.channels[p])
    }

    pub fn channel_by_name_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.position_by_name(name).map(|p| &mut self.channels[p])
    }

    pub fn channel_by_index(&self, index: u64) -> Option<&Channel> {
        self.channels.iter().find(|c| c.index == index)
    }

    pub fn master_channel(&self) -> Option<&Channel> {
        self.channels.iter().find(|c| c.channel_type.is_master())
    }

    pub fn source_information(&self) -> Option<&SourceInformation> {
        self.source_information.as_ref()
    }

    pub fn create_source_information(&mut self) -> &mut SourceInformation {
        let source = self.index_source.clone();
        self.source_information
            .get_or_insert_with(|| SourceInformation::new(&source))
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }

    /// Number of samples currently held in memory.
    pub fn nof_loaded_samples(&self) -> usize {
        self.samples.nof_records()
    }

    pub(crate) fn clear_samples(&mut self) {
        self.samples.clear();
        for channel in &mut self.channels {
            channel.staged = None;
            channel.staged_valid = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelType;

    #[test]
    fn create_channel_appends_with_increasing_indices() {
        let mut cg = ChannelGroup::new(&IndexSource::default());
        let first = cg.create_channel().index();
        let second = cg.create_channel().index();
        assert!(second > first);
        assert_eq!(cg.channels().len(), 2);
    }

    #[test]
    fn lookup_by_name_prefers_exact_match() {
        let mut cg = ChannelGroup::new(&IndexSource::default());
        cg.create_channel().set_name("Speed.Raw");
        cg.create_channel().set_name("Speed");
        assert_eq!(cg.channel_by_name("Speed").map(Channel::name), Some("Speed"));
        assert_eq!(cg.channel_by_name("Raw").map(Channel::name), Some("Speed.Raw"));
        assert!(cg.channel_by_name("Torque").is_none());
    }

    #[test]
    fn master_channel_is_found() {
        let mut cg = ChannelGroup::new(&IndexSource::default());
        cg.create_channel().set_name("Signal");
        let time = cg.create_channel();
        time.set_name("Time");
        time.set_channel_type(ChannelType::Master);
        assert_eq!(cg.master_channel().map(Channel::name), Some("Time"));
    }

    #[test]
    fn sample_data_indexes_records() {
        let mut data = SampleData::new(3);
        data.push_record(&[1, 2, 3]);
        data.push_record(&[4]);
        assert_eq!(data.nof_records(), 2);
        assert_eq!(data.record(1), Some(&[4u8, 0, 0][..]));
        assert_eq!(data.record(2), None);
        assert_eq!(SampleData::new(0).nof_records(), 0);
    }
}
