use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{ChannelArray, ChannelConversion, IndexSource, MetaData, SourceInformation};
use crate::blocks::DataType;
use crate::blocks::channel_block::{
    CN_FLAG_EXTENDED_LIMIT_VALID, CN_FLAG_INVAL_BIT_VALID, CN_FLAG_LIMIT_VALID,
    CN_FLAG_PRECISION_VALID, CN_FLAG_VALUE_RANGE_VALID,
};
use crate::codec::{ChannelLayout, DecodedValue};
use crate::types::{ChannelType, SyncType};

/// One field of a channel group record.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub(crate) index: u64,
    pub(crate) name: String,
    pub(crate) display_name: String,
    pub(crate) description: String,
    pub(crate) unit: String,
    pub(crate) flags: u32,
    pub(crate) channel_type: ChannelType,
    pub(crate) sync_type: SyncType,
    pub(crate) data_type: DataType,
    pub(crate) bit_offset: u8,
    pub(crate) byte_offset: u32,
    pub(crate) bit_count: u32,
    /// Width set by the caller rather than implied by the data type.
    pub(crate) explicit_bit_count: bool,
    pub(crate) inval_bit_pos: u32,
    pub(crate) decimals: u8,
    pub(crate) range: (f64, f64),
    pub(crate) limit: (f64, f64),
    pub(crate) extended_limit: (f64, f64),
    pub(crate) sampling_rate: f64,
    pub(crate) vlsd_record_id: u64,
    /// Index of the channel holding the used byte count of a max length channel.
    pub(crate) length_channel: Option<u64>,
    /// Raw `cn_data` link as read from the file.
    pub(crate) data_link: u64,
    pub(crate) conversion: Option<ChannelConversion>,
    pub(crate) source_information: Option<SourceInformation>,
    pub(crate) channel_array: Option<ChannelArray>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) staged: Option<DecodedValue>,
    pub(crate) staged_valid: bool,
    pub(crate) index_source: IndexSource,
}

impl Channel {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next(), index_source)
    }

    pub(crate) fn with_index(index: u64, index_source: &IndexSource) -> Self {
        Self {
            index,
            name: String::new(),
            display_name: String::new(),
            description: String::new(),
            unit: String::new(),
            flags: 0,
            channel_type: ChannelType::FixedLength,
            sync_type: SyncType::None,
            data_type: DataType::UnsignedIntegerLE,
            bit_offset: 0,
            byte_offset: 0,
            bit_count: 0,
            explicit_bit_count: false,
            inval_bit_pos: 0,
            decimals: 0,
            range: (0.0, 0.0),
            limit: (0.0, 0.0),
            extended_limit: (0.0, 0.0),
            sampling_rate: 0.0,
            vlsd_record_id: 0,
            length_channel: None,
            data_link: 0,
            conversion: None,
            source_information: None,
            channel_array: None,
            metadata: None,
            staged: None,
            staged_valid: true,
            index_source: index_source.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, name: &str) {
        self.display_name = name.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// Unit of the channel, falling back to the unit of its conversion.
    pub fn unit(&self) -> &str {
        if self.unit.is_empty()
            && let Some(cc) = &self.conversion
        {
            return cc.unit();
        }
        &self.unit
    }

    pub fn is_unit_used(&self) -> bool {
        !self.unit().is_empty()
    }

    pub fn set_unit(&mut self, unit: &str) {
        self.unit = unit.to_string();
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Replaces the `cn_flags`, e.g. `CN_FLAG_INVAL_BIT_VALID` to give the
    /// channel an invalidation bit.
    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    pub fn set_channel_type(&mut self, channel_type: ChannelType) {
        self.channel_type = channel_type;
    }

    pub fn sync_type(&self) -> SyncType {
        self.sync_type
    }

    pub fn set_sync_type(&mut self, sync_type: SyncType) {
        self.sync_type = sync_type;
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Sets the data type and, when no size was given yet, its usual size.
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        if self.bit_count == 0 {
            self.bit_count = data_type.default_bits();
        }
    }

    /// Bytes occupied in the record (for VLSD channels: the offset slot).
    pub fn data_bytes(&self) -> u32 {
        self.bit_count.div_ceil(8)
    }

    pub fn set_data_bytes(&mut self, bytes: u32) {
        self.bit_count = bytes * 8;
        self.explicit_bit_count = true;
    }

    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    pub fn set_bit_offset(&mut self, offset: u8) {
        self.bit_offset = offset;
    }

    pub fn byte_offset(&self) -> u32 {
        self.byte_offset
    }

    pub fn set_byte_offset(&mut self, offset: u32) {
        self.byte_offset = offset;
    }

    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    pub fn set_bit_count(&mut self, bits: u32) {
        self.bit_count = bits;
        self.explicit_bit_count = true;
    }

    pub fn inval_bit_pos(&self) -> u32 {
        self.inval_bit_pos
    }

    pub fn is_decimal_used(&self) -> bool {
        self.flags & CN_FLAG_PRECISION_VALID != 0
    }

    pub fn decimals(&self) -> Option<u8> {
        if self.is_decimal_used() {
            return Some(self.decimals);
        }
        self.conversion.as_ref().and_then(ChannelConversion::precision)
    }

    pub fn set_decimals(&mut self, decimals: u8) {
        self.decimals = decimals;
        self.flags |= CN_FLAG_PRECISION_VALID;
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        (self.flags & CN_FLAG_VALUE_RANGE_VALID != 0).then_some(self.range)
    }

    pub fn set_range(&mut self, min: f64, max: f64) {
        self.range = (min, max);
        self.flags |= CN_FLAG_VALUE_RANGE_VALID;
    }

    pub fn limit(&self) -> Option<(f64, f64)> {
        (self.flags & CN_FLAG_LIMIT_VALID != 0).then_some(self.limit)
    }

    pub fn set_limit(&mut self, min: f64, max: f64) {
        self.limit = (min, max);
        self.flags |= CN_FLAG_LIMIT_VALID;
    }

    pub fn extended_limit(&self) -> Option<(f64, f64)> {
        (self.flags & CN_FLAG_EXTENDED_LIMIT_VALID != 0).then_some(self.extended_limit)
    }

    pub fn set_extended_limit(&mut self, min: f64, max: f64) {
        self.extended_limit = (min, max);
        self.flags |= CN_FLAG_EXTENDED_LIMIT_VALID;
    }

    /// Sampling rate in seconds; only MDF3 files carry it.
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn set_sampling_rate(&mut self, seconds: f64) {
        self.sampling_rate = seconds;
    }

    /// Record id of the VLSD channel group holding this channel's values.
    pub fn vlsd_record_id(&self) -> u64 {
        self.vlsd_record_id
    }

    /// Index of the channel giving the used length of a max length channel.
    pub fn length_channel(&self) -> Option<u64> {
        self.length_channel
    }

    pub fn set_length_channel(&mut self, channel_index: u64) {
        self.length_channel = Some(channel_index);
    }

    pub fn conversion(&self) -> Option<&ChannelConversion> {
        self.conversion.as_ref()
    }

    pub fn create_conversion(&mut self) -> &mut ChannelConversion {
        let source = self.index_source.clone();
        self.conversion
            .get_or_insert_with(|| ChannelConversion::new(&source))
    }

    pub fn source_information(&self) -> Option<&SourceInformation> {
        self.source_information.as_ref()
    }

    pub fn create_source_information(&mut self) -> &mut SourceInformation {
        let source = self.index_source.clone();
        self.source_information
            .get_or_insert_with(|| SourceInformation::new(&source))
    }

    pub fn channel_array(&self) -> Option<&ChannelArray> {
        self.channel_array.as_ref()
    }

    pub fn create_channel_array(&mut self) -> &mut ChannelArray {
        let source = self.index_source.clone();
        self.channel_array
            .get_or_insert_with(|| ChannelArray::new(&source))
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }

    /// Stages the value written by the next `save_sample` of the group.
    pub fn set_channel_value(&mut self, value: impl Into<DecodedValue>, valid: bool) {
        self.staged = Some(value.into());
        self.staged_valid = valid;
    }

    /// Stages a byte array value.
    pub fn set_channel_value_bytes(&mut self, bytes: &[u8], valid: bool) {
        self.staged = Some(DecodedValue::ByteArray(Vec::from(bytes)));
        self.staged_valid = valid;
    }

    pub(crate) fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(
            self.data_type,
            self.byte_offset,
            self.bit_offset,
            self.bit_count,
        )
    }

    pub(crate) fn has_invalidation_bit(&self) -> bool {
        self.flags & CN_FLAG_INVAL_BIT_VALID != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_properties_follow_flags() {
        let mut cn = Channel::new(&IndexSource::default());
        assert_eq!(cn.range(), None);
        cn.set_range(0.0, 10.0);
        assert_eq!(cn.range(), Some((0.0, 10.0)));
        assert_eq!(cn.decimals(), None);
        cn.create_conversion().set_precision(3);
        assert_eq!(cn.decimals(), Some(3));
        cn.set_decimals(1);
        assert_eq!(cn.decimals(), Some(1));
    }

    #[test]
    fn unit_falls_back_to_conversion() {
        let mut cn = Channel::new(&IndexSource::default());
        assert!(!cn.is_unit_used());
        cn.create_conversion().set_unit("km/h");
        assert_eq!(cn.unit(), "km/h");
        cn.set_unit("m/s");
        assert_eq!(cn.unit(), "m/s");
    }

    #[test]
    fn data_type_sets_default_size() {
        let mut cn = Channel::new(&IndexSource::default());
        cn.set_data_type(DataType::FloatLE);
        assert_eq!(cn.data_bytes(), 8);
        cn.set_data_bytes(2);
        cn.set_data_type(DataType::UnsignedIntegerLE);
        assert_eq!(cn.bit_count(), 16);
    }

    #[test]
    fn children_share_the_index_sequence() {
        let source = IndexSource::default();
        let mut cn = Channel::new(&source);
        let own = cn.index();
        let cc = cn.create_conversion().index();
        let si = cn.create_source_information().index();
        assert!(own < cc && cc < si);
    }
}
