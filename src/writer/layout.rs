// Record layout, record encoding and the per data group record stream.
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::blocks::DataType;
use crate::blocks::channel_block::CN_FLAG_INVAL_BIT_VALID;
use crate::blocks::channel_group_block::CG_FLAG_VLSD;
use crate::codec::{DecodedValue, encode_channel_value, encode_text, set_invalidation_bit};
use crate::logging::mdf_log;
use crate::model::{Channel, ChannelGroup, DataGroup};
use crate::types::ChannelType;
use crate::{Error, Result};

/// Assigns byte offsets, invalidation bits and record ids to a data group
/// that has not been written yet.
///
/// MDF4 groups get one VLSD channel group per variable length channel. MDF3
/// has no variable length storage, so such channels become fixed byte arrays
/// of `max_length` bytes.
pub(super) fn prepare_data_group(dg: &mut DataGroup, is_mdf4: bool, max_length: u32) -> Result<()> {
    let mut vlsd_sources = Vec::new();
    for (cg_pos, cg) in dg.channel_groups.iter_mut().enumerate() {
        if cg.is_vlsd() {
            continue;
        }
        layout_channel_group(cg, is_mdf4, max_length)?;
        if is_mdf4 {
            for cn in &cg.channels {
                if cn.channel_type == ChannelType::VariableLength {
                    vlsd_sources.push((cg_pos, cn.index, cn.name.clone()));
                }
            }
        }
    }

    let mut vlsd_groups = Vec::new();
    for (cg_pos, cn_index, name) in vlsd_sources {
        let cg = dg.create_channel_group();
        cg.name = name;
        cg.flags = CG_FLAG_VLSD;
        vlsd_groups.push((cg_pos, cn_index, cg.index));
    }

    let count = dg.channel_groups.len();
    dg.record_id_size = match count {
        0 | 1 => 0,
        n if n <= usize::from(u8::MAX) => 1,
        _ if is_mdf4 => 2,
        n => {
            return Err(Error::UnsupportedFeature(format!(
                "{n} channel groups in one MDF3 data group"
            )));
        }
    };
    for (pos, cg) in dg.channel_groups.iter_mut().enumerate() {
        cg.record_id = if count > 1 { pos as u64 + 1 } else { 0 };
    }

    for (cg_pos, cn_index, vlsd_index) in vlsd_groups {
        let record_id = dg
            .channel_groups
            .iter()
            .find(|cg| cg.index == vlsd_index)
            .map_or(0, |cg| cg.record_id);
        if let Some(cn) = dg.channel_groups[cg_pos]
            .channels
            .iter_mut()
            .find(|cn| cn.index == cn_index)
        {
            cn.vlsd_record_id = record_id;
        }
    }
    Ok(())
}

fn layout_channel_group(cg: &mut ChannelGroup, is_mdf4: bool, max_length: u32) -> Result<()> {
    let mut next_byte = 0u32;
    let mut data_bytes = 0u32;
    let mut inval_bits = 0u32;
    let fixed = cg.fixed_layout;

    for cn in &mut cg.channels {
        size_channel(cn, is_mdf4, max_length)?;
        if cn.channel_type.is_virtual() {
            cn.byte_offset = 0;
            cn.bit_offset = 0;
            continue;
        }
        if !fixed {
            cn.byte_offset = next_byte;
            cn.bit_offset = 0;
        }
        let end = cn.byte_offset + cn.layout().byte_len() as u32;
        next_byte = next_byte.max(end);
        data_bytes = data_bytes.max(end);

        if cn.has_invalidation_bit() {
            if is_mdf4 {
                cn.inval_bit_pos = inval_bits;
                inval_bits += 1;
            } else {
                mdf_log!(
                    Debug,
                    "prepare_data_group",
                    "MDF3 has no invalidation bits, dropped for '{}'",
                    cn.name
                );
                cn.flags &= !CN_FLAG_INVAL_BIT_VALID;
            }
        }
    }

    if !is_mdf4 && data_bytes > u32::from(u16::MAX) {
        return Err(Error::UnsupportedFeature(format!(
            "MDF3 record of {data_bytes} bytes in group '{}'",
            cg.name
        )));
    }
    cg.data_bytes = data_bytes;
    cg.invalidation_bytes = inval_bits.div_ceil(8);
    mdf_log!(
        Trace,
        "prepare_data_group",
        "group '{}': {} data bytes, {} invalidation bytes",
        cg.name,
        cg.data_bytes,
        cg.invalidation_bytes
    );
    Ok(())
}

fn size_channel(cn: &mut Channel, is_mdf4: bool, max_length: u32) -> Result<()> {
    match cn.channel_type {
        ChannelType::VariableLength if is_mdf4 => {
            // The record only holds the offset into the VLSD stream.
            cn.bit_count = 64;
            return Ok(());
        }
        ChannelType::VariableLength | ChannelType::MaxLength if !is_mdf4 => {
            if cn.channel_type == ChannelType::VariableLength || !cn.explicit_bit_count {
                cn.bit_count = max_length * 8;
            }
            cn.channel_type = ChannelType::FixedLength;
            cn.length_channel = None;
            if !cn.data_type.is_string() {
                cn.data_type = DataType::ByteArray;
            }
        }
        ChannelType::MaxLength if !cn.explicit_bit_count => cn.bit_count = max_length * 8,
        _ => {}
    }
    if cn.bit_count == 0 && !cn.channel_type.is_virtual() {
        cn.bit_count = cn.data_type.default_bits();
        if cn.bit_count == 0 {
            return Err(Error::InvalidState(format!(
                "channel '{}' has no bit count for {:?}",
                cn.name, cn.data_type
            )));
        }
    }
    Ok(())
}

/// Offset stored for a variable length value that was never staged. It
/// points past any real VLSD stream, so readers find no entry.
pub(super) const NO_VLSD_ENTRY: u64 = u64::MAX;

/// One encoded sample of a channel group, VLSD payloads kept apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct EncodedRecord {
    /// Data and invalidation bytes without record id.
    pub data: Vec<u8>,
    /// `(record id of the VLSD group, byte offset of the slot, payload)`.
    pub vlsd: Vec<(u64, u32, Vec<u8>)>,
}

fn payload_bytes(cn: &Channel, value: &DecodedValue) -> Vec<u8> {
    match value {
        DecodedValue::String(text) => encode_text(text, cn.data_type, usize::MAX),
        other => other.as_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// Encodes the staged values of `cg` into one record.
///
/// Unstaged channels stay zero. A max length channel whose length channel
/// has no staged value gets its payload size written there.
pub(super) fn encode_record(cg: &ChannelGroup) -> Result<EncodedRecord> {
    let mut record = EncodedRecord {
        data: vec![0u8; cg.record_size()],
        vlsd: Vec::new(),
    };
    let mut lengths = Vec::new();

    for cn in &cg.channels {
        if cn.channel_type.is_virtual() {
            continue;
        }
        if cn.staged.is_none() && cn.channel_type == ChannelType::VariableLength {
            let start = cn.byte_offset as usize;
            if let Some(slot) = record.data.get_mut(start..start + 8) {
                slot.copy_from_slice(&NO_VLSD_ENTRY.to_le_bytes());
            }
        }
        if let Some(value) = &cn.staged {
            match cn.channel_type {
                ChannelType::VariableLength => {
                    record
                        .vlsd
                        .push((cn.vlsd_record_id, cn.byte_offset, payload_bytes(cn, value)));
                }
                ChannelType::MaxLength => {
                    let payload = payload_bytes(cn, value);
                    let slot = cn.data_bytes() as usize;
                    if payload.len() > slot {
                        return Err(Error::CodecError(format!(
                            "{} byte payload does not fit the {slot} byte slot of '{}'",
                            payload.len(),
                            cn.name
                        )));
                    }
                    let used = payload.len();
                    encode_channel_value(
                        &mut record.data,
                        &cn.layout(),
                        &DecodedValue::ByteArray(payload),
                    )?;
                    if let Some(length_index) = cn.length_channel {
                        lengths.push((length_index, used as u64));
                    }
                }
                _ => encode_channel_value(&mut record.data, &cn.layout(), value)?,
            }
        }
        if cn.has_invalidation_bit() {
            set_invalidation_bit(
                &mut record.data,
                cg.data_bytes,
                cn.inval_bit_pos,
                cn.staged.is_none() || !cn.staged_valid,
            );
        }
    }

    for (length_index, used) in lengths {
        if let Some(length_cn) = cg.channel_by_index(length_index)
            && length_cn.staged.is_none()
        {
            encode_channel_value(
                &mut record.data,
                &length_cn.layout(),
                &DecodedValue::UnsignedInteger(used),
            )?;
        }
    }
    Ok(record)
}

/// Writes the relative time in seconds into the master channel slot.
pub(super) fn stamp_master(cg: &ChannelGroup, data: &mut [u8], seconds: f64) -> Result<()> {
    let Some(master) = cg
        .channels
        .iter()
        .find(|cn| cn.channel_type == ChannelType::Master)
    else {
        return Ok(());
    };
    encode_channel_value(data, &master.layout(), &DecodedValue::Float(seconds))
}

pub(super) fn push_record_id(buffer: &mut Vec<u8>, size: u8, record_id: u64) {
    match size {
        1 => buffer.push(record_id as u8),
        2 => buffer.extend_from_slice(&(record_id as u16).to_le_bytes()),
        4 => buffer.extend_from_slice(&(record_id as u32).to_le_bytes()),
        8 => buffer.extend_from_slice(&record_id.to_le_bytes()),
        _ => {}
    }
}

/// Records of one data group waiting for the next flush.
#[derive(Debug, Default)]
pub(super) struct RecordStream {
    pub id_size: u8,
    pub pending: Vec<u8>,
    /// Bytes of the stream already in data blocks.
    pub flushed: u64,
    /// Address of the last DL block of the data chain, 0 before the first flush.
    pub last_list: u64,
    /// Running size of each VLSD stream, keyed by its record id.
    pub vlsd_totals: BTreeMap<u64, u64>,
}

impl RecordStream {
    pub fn new(id_size: u8) -> Self {
        Self {
            id_size,
            ..Self::default()
        }
    }

    /// Appends the VLSD entries of `record` followed by the record itself and
    /// returns the number of VLSD entries written.
    pub fn push(&mut self, record_id: u64, mut record: EncodedRecord) -> u64 {
        let entries = record.vlsd.len() as u64;
        for (vlsd_id, slot, payload) in record.vlsd.drain(..) {
            let offset = self.vlsd_totals.entry(vlsd_id).or_insert(0);
            let start = slot as usize;
            if let Some(dst) = record.data.get_mut(start..start + 8) {
                dst.copy_from_slice(&offset.to_le_bytes());
            }
            *offset += 4 + payload.len() as u64;
            push_record_id(&mut self.pending, self.id_size, vlsd_id);
            self.pending
                .extend_from_slice(&(payload.len() as u32).to_le_bytes());
            self.pending.extend_from_slice(&payload);
        }
        push_record_id(&mut self.pending, self.id_size, record_id);
        self.pending.extend_from_slice(&record.data);
        entries
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Takes the pending bytes and advances the flushed offset.
    pub fn take_pending(&mut self) -> (u64, Vec<u8>) {
        let start = self.flushed;
        let data = core::mem::take(&mut self.pending);
        self.flushed += data.len() as u64;
        (start, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MdfFile;

    fn two_channel_group(file: &mut MdfFile) -> &mut DataGroup {
        let dg = file.create_data_group();
        let cg = dg.create_channel_group();
        cg.set_name("Group");
        let t = cg.create_channel();
        t.set_name("t");
        t.set_channel_type(ChannelType::Master);
        t.set_data_type(DataType::FloatLE);
        let s = cg.create_channel();
        s.set_name("Signal");
        s.set_data_type(DataType::UnsignedIntegerLE);
        s.set_bit_count(16);
        dg
    }

    #[test]
    fn offsets_are_sequential() {
        let mut file = MdfFile::new_mdf4();
        let dg = two_channel_group(&mut file);
        prepare_data_group(dg, true, 8).unwrap();
        let cg = &dg.channel_groups()[0];
        assert_eq!(cg.data_bytes(), 10);
        assert_eq!(cg.channels()[1].byte_offset(), 8);
        assert_eq!(dg.record_id_size(), 0);
    }

    #[test]
    fn invalidation_bits_follow_data_bytes() {
        let mut file = MdfFile::new_mdf4();
        let dg = two_channel_group(&mut file);
        let flags = dg.channel_groups()[0].channels()[1].flags();
        dg.channel_groups_mut()[0].channels_mut()[1].set_flags(flags | CN_FLAG_INVAL_BIT_VALID);
        prepare_data_group(dg, true, 8).unwrap();

        let cg = &mut dg.channel_groups_mut()[0];
        assert_eq!(cg.invalidation_bytes(), 1);
        cg.channels_mut()[1].set_channel_value(7u16, false);
        let record = encode_record(cg).unwrap();
        assert_eq!(record.data.len(), 11);
        assert_eq!(record.data[10] & 1, 1);
        assert_eq!(&record.data[8..10], &7u16.to_le_bytes());
    }

    #[test]
    fn variable_length_channel_gets_vlsd_group() {
        let mut file = MdfFile::new_mdf4();
        let dg = two_channel_group(&mut file);
        let cn = dg.channel_groups_mut()[0].create_channel();
        cn.set_name("Text");
        cn.set_channel_type(ChannelType::VariableLength);
        cn.set_data_type(DataType::StringUtf8);
        prepare_data_group(dg, true, 8).unwrap();

        assert_eq!(dg.channel_groups().len(), 2);
        assert_eq!(dg.record_id_size(), 1);
        let vlsd = &dg.channel_groups()[1];
        assert!(vlsd.is_vlsd());
        let text = dg.channel_groups()[0].channel_by_name("Text").unwrap();
        assert_eq!(text.vlsd_record_id(), vlsd.record_id());
        assert_eq!(text.bit_count(), 64);
    }

    #[test]
    fn unstaged_variable_length_slot_points_nowhere() {
        let mut file = MdfFile::new_mdf4();
        let dg = two_channel_group(&mut file);
        let cn = dg.channel_groups_mut()[0].create_channel();
        cn.set_name("Text");
        cn.set_channel_type(ChannelType::VariableLength);
        cn.set_data_type(DataType::StringUtf8);
        prepare_data_group(dg, true, 8).unwrap();

        let cg = &dg.channel_groups()[0];
        let record = encode_record(cg).unwrap();
        assert!(record.vlsd.is_empty());
        assert_eq!(&record.data[10..18], &NO_VLSD_ENTRY.to_le_bytes());
    }

    #[test]
    fn max_length_slot_follows_the_writer_setting() {
        let mut file = MdfFile::new_mdf4();
        let dg = two_channel_group(&mut file);
        let cn = dg.channel_groups_mut()[0].create_channel();
        cn.set_data_type(DataType::ByteArray);
        cn.set_channel_type(ChannelType::MaxLength);
        prepare_data_group(dg, true, 16).unwrap();
        assert_eq!(dg.channel_groups()[0].channels()[2].data_bytes(), 16);
    }

    #[test]
    fn mdf3_turns_variable_length_into_fixed_bytes() {
        let mut file = MdfFile::new_mdf3();
        let dg = two_channel_group(&mut file);
        let cn = dg.channel_groups_mut()[0].create_channel();
        cn.set_channel_type(ChannelType::VariableLength);
        cn.set_data_type(DataType::ByteArray);
        prepare_data_group(dg, false, 12).unwrap();
        let cn = &dg.channel_groups()[0].channels()[2];
        assert_eq!(cn.channel_type(), ChannelType::FixedLength);
        assert_eq!(cn.bit_count(), 96);
        assert_eq!(dg.channel_groups().len(), 1);
    }

    #[test]
    fn stream_writes_vlsd_entries_before_the_record() {
        let mut stream = RecordStream::new(1);
        let record = EncodedRecord {
            data: vec![0u8; 8],
            vlsd: vec![(2, 0, b"abc".to_vec())],
        };
        assert_eq!(stream.push(1, record.clone()), 1);
        stream.push(1, record);
        assert_eq!(&stream.pending[..8], &[2, 3, 0, 0, 0, b'a', b'b', b'c']);
        assert_eq!(stream.pending[8], 1);
        // The second record points behind the first entry.
        let second = &stream.pending[17 + 8 + 1..17 + 8 + 1 + 8];
        assert_eq!(second, &7u64.to_le_bytes());
        assert_eq!(stream.vlsd_totals[&2], 14);

        let (start, data) = stream.take_pending();
        assert_eq!((start, data.len()), (0, 34));
        assert!(!stream.has_pending());
        assert_eq!(stream.flushed, 34);
    }
}
