//! Per-channel and per-bus views of the samples of a read data group.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;

use crate::blocks::DataType;
use crate::can::{CanErrorType, CanMessage};
use crate::codec::{
    ChannelLayout, DecodedValue, check_value_validity, decode_channel_value, decode_slice,
};
use crate::conversion::EngValue;
use crate::logging::mdf_log;
use crate::model::{Channel, ChannelConversion, ChannelGroup, DataGroup};
use crate::types::ChannelType;
use crate::{Error, Result};

/// Decoded samples of one channel.
///
/// The observer takes a snapshot of the raw values when created; conversions
/// run on demand. A conversion whose parameters turn out to be unusable
/// yields `NaN` (numeric) or the raw value as text, and is reported once
/// through the log.
#[derive(Debug)]
pub struct ChannelObserver {
    name: String,
    unit: String,
    channel_index: u64,
    channel_type: ChannelType,
    decimals: Option<u8>,
    conversion: Option<ChannelConversion>,
    raw: Vec<Option<DecodedValue>>,
    valid: Vec<bool>,
    conversion_reported: Cell<bool>,
}

impl ChannelObserver {
    /// Snapshots `channel` of `cg`. The data group must have been read.
    pub fn new(dg: &DataGroup, cg: &ChannelGroup, channel: &Channel) -> Result<Self> {
        if !dg.is_read() {
            return Err(Error::InvalidState(format!(
                "data of group {:#x} is not loaded; call read_data first",
                dg.index()
            )));
        }
        if cg.channel_by_index(channel.index()).is_none() {
            return Err(Error::NotFound(format!(
                "channel '{}' in group '{}'",
                channel.name(),
                cg.name()
            )));
        }

        let samples = &cg.samples;
        let nof_samples = samples.nof_records();
        let length_channel = channel
            .length_channel
            .and_then(|index| cg.channel_by_index(index));

        let mut raw = Vec::with_capacity(nof_samples);
        let mut valid = Vec::with_capacity(nof_samples);
        for sample in 0..nof_samples {
            let record = samples.record(sample).unwrap_or_default();
            valid.push(check_value_validity(
                record,
                cg.data_bytes(),
                channel.flags,
                channel.inval_bit_pos,
            ));
            let value = match channel.channel_type {
                ChannelType::VirtualMaster | ChannelType::VirtualData => {
                    Some(DecodedValue::UnsignedInteger(sample as u64))
                }
                ChannelType::VariableLength => samples
                    .vlsd_value(channel.index(), sample)
                    .and_then(|bytes| decode_whole(bytes, channel.data_type)),
                _ => match length_channel {
                    Some(length) => decode_truncated(record, channel, length),
                    None => decode_channel_value(record, &channel.layout()),
                },
            };
            raw.push(value);
        }

        Ok(Self {
            name: channel.name().to_string(),
            unit: channel.unit().to_string(),
            channel_index: channel.index(),
            channel_type: channel.channel_type,
            decimals: channel.decimals(),
            conversion: channel.conversion().cloned(),
            raw,
            valid,
            conversion_reported: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Index of the observed channel.
    pub fn channel_index(&self) -> u64 {
        self.channel_index
    }

    pub fn nof_samples(&self) -> usize {
        self.raw.len()
    }

    pub fn is_master(&self) -> bool {
        self.channel_type.is_master()
    }

    /// False for samples marked invalid and for samples out of range.
    pub fn is_valid(&self, sample: usize) -> bool {
        self.valid.get(sample).copied().unwrap_or(false)
    }

    pub fn valid_list(&self) -> &[bool] {
        &self.valid
    }

    /// Decoded value as stored, regardless of its validity.
    pub fn raw_value(&self, sample: usize) -> Option<DecodedValue> {
        self.raw.get(sample).cloned().flatten()
    }

    /// Numeric raw value of a valid sample.
    pub fn channel_value(&self, sample: usize) -> Option<f64> {
        if !self.is_valid(sample) {
            return None;
        }
        self.raw.get(sample)?.as_ref()?.as_f64()
    }

    /// Numeric engineering value of a valid sample. Text conversions yield
    /// `None`; a failing conversion yields `NaN`.
    pub fn eng_value(&self, sample: usize) -> Option<f64> {
        if !self.is_valid(sample) {
            return None;
        }
        let raw = self.raw.get(sample)?.as_ref()?;
        match &self.conversion {
            None => raw.as_f64(),
            Some(cc) => match cc.convert(raw) {
                Ok(value) => value.as_f64(),
                Err(e) => {
                    self.report(&e);
                    Some(f64::NAN)
                }
            },
        }
    }

    /// Engineering value as text: the conversion's text, a string value, or
    /// the number formatted with the channel's precision.
    pub fn eng_text(&self, sample: usize) -> Option<String> {
        if !self.is_valid(sample) {
            return None;
        }
        let raw = self.raw.get(sample)?.as_ref()?;
        let value = match &self.conversion {
            None => plain_eng_value(raw),
            Some(cc) => match cc.convert(raw) {
                Ok(value) => value,
                Err(e) => {
                    self.report(&e);
                    plain_eng_value(raw)
                }
            },
        };
        let decimals = self
            .conversion
            .as_ref()
            .and_then(ChannelConversion::precision)
            .or(self.decimals);
        Some(match (value, decimals) {
            (EngValue::Float(v), Some(d)) => format!("{v:.prec$}", prec = usize::from(d)),
            (EngValue::Float(v), None) => v.to_string(),
            (EngValue::Text(text), _) => text,
        })
    }

    /// Byte array, MIME and string values as bytes.
    pub fn eng_bytes(&self, sample: usize) -> Option<Vec<u8>> {
        if !self.is_valid(sample) {
            return None;
        }
        match self.raw.get(sample)?.as_ref()? {
            DecodedValue::String(text) => Some(text.as_bytes().to_vec()),
            other => other.as_bytes().map(<[u8]>::to_vec),
        }
    }

    pub fn channel_values(&self) -> Vec<Option<f64>> {
        (0..self.nof_samples()).map(|s| self.channel_value(s)).collect()
    }

    pub fn eng_values(&self) -> Vec<Option<f64>> {
        (0..self.nof_samples()).map(|s| self.eng_value(s)).collect()
    }

    fn report(&self, error: &Error) {
        if !self.conversion_reported.replace(true) {
            mdf_log!(
                Error,
                "ChannelObserver::eng_value",
                "conversion of channel '{}' failed: {error}",
                self.name
            );
        }
    }
}

fn plain_eng_value(raw: &DecodedValue) -> EngValue {
    match raw {
        DecodedValue::String(text) => EngValue::Text(text.clone()),
        other => EngValue::Float(other.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Decodes a variable length value using all of its bytes.
fn decode_whole(bytes: &[u8], data_type: DataType) -> Option<DecodedValue> {
    let layout = ChannelLayout::new(data_type, 0, 0, (bytes.len() * 8) as u32);
    if data_type.is_string() || data_type.is_bytes() {
        decode_slice(bytes, &layout)
    } else {
        decode_channel_value(bytes, &layout)
    }
}

/// Decodes a max-length slot, keeping as many bytes as the length channel says.
fn decode_truncated(record: &[u8], channel: &Channel, length: &Channel) -> Option<DecodedValue> {
    let len = decode_channel_value(record, &length.layout())?.as_f64()? as usize;
    let start = channel.byte_offset as usize;
    let slot = record.get(start..start + channel.layout().byte_len())?;
    decode_whole(&slot[..len.min(slot.len())], channel.data_type)
}

/// One observer per channel of `cg`, in channel order.
pub fn create_channel_observer_for_channel_group(
    dg: &DataGroup,
    cg: &ChannelGroup,
) -> Result<Vec<ChannelObserver>> {
    cg.channels()
        .iter()
        .map(|cn| ChannelObserver::new(dg, cg, cn))
        .collect()
}

/// Rebuilds [`CanMessage`]s from a CAN bus logging group such as
/// `CAN_DataFrame`.
#[derive(Debug)]
pub struct CanBusObserver {
    name: String,
    remote: bool,
    time: Option<ChannelObserver>,
    fields: Vec<(CanField, ChannelObserver)>,
    nof_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanField {
    Id,
    Ide,
    Dlc,
    DataLength,
    DataBytes,
    BusChannel,
    Dir,
    Brs,
    Esi,
    Edl,
    Crc,
    ErrorType,
}

impl CanField {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "ID" => CanField::Id,
            "IDE" => CanField::Ide,
            "DLC" => CanField::Dlc,
            "DataLength" => CanField::DataLength,
            "DataBytes" => CanField::DataBytes,
            "BusChannel" => CanField::BusChannel,
            "Dir" => CanField::Dir,
            "BRS" => CanField::Brs,
            "ESI" => CanField::Esi,
            "EDL" => CanField::Edl,
            "CRC" => CanField::Crc,
            "ErrorType" => CanField::ErrorType,
            _ => return None,
        })
    }
}

impl CanBusObserver {
    pub fn new(dg: &DataGroup, cg: &ChannelGroup) -> Result<Self> {
        let mut time = None;
        let mut fields = Vec::new();
        for cn in cg.channels() {
            if cn.channel_type().is_master() {
                time = Some(ChannelObserver::new(dg, cg, cn)?);
                continue;
            }
            let suffix = cn.name().rsplit('.').next().unwrap_or_default();
            if let Some(field) = CanField::from_suffix(suffix) {
                fields.push((field, ChannelObserver::new(dg, cg, cn)?));
            }
        }
        if !fields.iter().any(|(f, _)| *f == CanField::Id) {
            return Err(Error::NotFound(format!(
                "group '{}' has no CAN identifier channel",
                cg.name()
            )));
        }
        Ok(Self {
            name: cg.name().to_string(),
            remote: cg.name().ends_with("RemoteFrame"),
            time,
            fields,
            nof_samples: cg.samples.nof_records(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nof_samples(&self) -> usize {
        self.nof_samples
    }

    /// Message of `sample`; its timestamp is the master time in ns relative
    /// to the measurement start.
    pub fn can_message(&self, sample: usize) -> Option<CanMessage> {
        if sample >= self.nof_samples {
            return None;
        }
        let mut msg = CanMessage::new();
        msg.set_remote(self.remote);
        if let Some(seconds) = self.time.as_ref().and_then(|t| t.eng_value(sample)) {
            msg.set_timestamp((seconds * 1e9).max(0.0) as u64);
        }

        let number = |field: CanField| {
            self.fields
                .iter()
                .find(|(f, _)| *f == field)
                .and_then(|(_, obs)| obs.channel_value(sample))
        };
        let flag = |field: CanField| number(field).is_some_and(|v| v != 0.0);

        msg.set_message_id(number(CanField::Id)? as u32);
        if number(CanField::Ide).is_some() {
            msg.set_extended_id(flag(CanField::Ide));
        }
        msg.set_edl(flag(CanField::Edl));
        if let Some((_, bytes)) = self.fields.iter().find(|(f, _)| *f == CanField::DataBytes) {
            let mut data = bytes.eng_bytes(sample).unwrap_or_default();
            if let Some(len) = number(CanField::DataLength) {
                data.truncate(len as usize);
            }
            msg.set_data_bytes(&data);
        }
        if let Some(dlc) = number(CanField::Dlc) {
            msg.set_dlc(dlc as u8);
        }
        msg.set_bus_channel(number(CanField::BusChannel).unwrap_or(0.0) as u8);
        msg.set_dir(flag(CanField::Dir));
        msg.set_brs(flag(CanField::Brs));
        msg.set_esi(flag(CanField::Esi));
        msg.set_crc(number(CanField::Crc).unwrap_or(0.0) as u32);
        if let Some(code) = number(CanField::ErrorType) {
            msg.set_error_type(CanErrorType::from_u8(code as u8));
        }
        Some(msg)
    }

    pub fn can_messages(&self) -> Vec<Option<CanMessage>> {
        (0..self.nof_samples).map(|s| self.can_message(s)).collect()
    }
}
