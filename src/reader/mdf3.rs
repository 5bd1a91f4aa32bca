//! MDF3 block tree to object model.

use alloc::string::String;
use alloc::vec::Vec;

use super::{ReadLevel, walk_chain};
use crate::blocks::channel_block::CN_FLAG_VALUE_RANGE_VALID;
use crate::blocks::{DataType, IdentificationBlock};
use crate::conversion::ConversionType;
use crate::logging::mdf_log;
use crate::mdf3::{
    CN3_TYPE_TIME, Cc3Block, Cc3Parameters, Ce3Block, Cg3Block, Cn3Block, Dg3Block, Hd3Block,
    block3_slice, read_text3,
};
use crate::model::{
    Channel, ChannelConversion, ChannelGroup, ConversionRef, DataGroup, Header, IndexSource,
    MdfFile, SourceInformation,
};
use crate::types::{ChannelType, SourceBus, SourceType, SyncType};
use crate::{Error, Result};

const NS_PER_HOUR: i64 = 3_600_000_000_000;

pub(crate) fn parse_file(
    image: &[u8],
    identification: IdentificationBlock,
    level: ReadLevel,
) -> Result<MdfFile> {
    let source = IndexSource::default();
    source.bump_past(image.len() as u64);
    let little_endian = identification.byte_order == 0;

    let hd = Hd3Block::from_bytes(block3_slice(image, 64)?)?;
    let mut header = Header::with_index(64, &source);
    header.author = hd.author.clone();
    header.department = hd.organization.clone();
    header.project = hd.project.clone();
    header.subject = hd.subject.clone();
    header.description = read_text3(image, hd.comment_addr)?;
    let offset_ns = i64::from(hd.utc_offset_hours) * NS_PER_HOUR;
    header.start_time = (hd.timestamp_ns as i64).saturating_sub(offset_ns).max(0) as u64;
    header.tz_offset_min = hd.utc_offset_hours.saturating_mul(60);
    header.time_quality = hd.time_quality.min(u16::from(u8::MAX)) as u8;

    if level >= ReadLevel::MeasurementInfo {
        walk_chain(hd.first_dg_addr, |address| {
            let block = Dg3Block::from_bytes(block3_slice(image, address)?)?;
            let mut dg = DataGroup::with_index(address, &source);
            dg.record_id_size = u8::from(block.record_id_count > 0);
            dg.data_link = block.data_addr;
            dg.persisted = true;
            walk_chain(block.first_cg_addr, |cg_address| {
                let (cg, next) = read_channel_group(image, cg_address, &source, level, little_endian)?;
                dg.channel_groups.push(cg);
                Ok(next)
            })?;
            header.data_groups.push(dg);
            Ok(block.next_dg_addr)
        })?;
    }

    Ok(MdfFile::from_parts(identification, header))
}

fn read_channel_group(
    image: &[u8],
    address: u64,
    source: &IndexSource,
    level: ReadLevel,
    little_endian: bool,
) -> Result<(ChannelGroup, u64)> {
    let block = Cg3Block::from_bytes(block3_slice(image, address)?)?;
    let mut cg = ChannelGroup::with_index(address, source);
    cg.record_id = u64::from(block.record_id);
    // MDF3 groups have no name of their own; the comment stands in for it.
    cg.description = read_text3(image, block.comment_addr)?;
    cg.name = cg.description.clone();
    cg.nof_samples = u64::from(block.record_count);
    cg.data_bytes = u32::from(block.record_size);
    cg.fixed_layout = true;

    walk_chain(block.first_cn_addr, |cn_address| {
        let (cn, next) = read_channel(image, cn_address, source, level, little_endian)?;
        cg.channels.push(cn);
        Ok(next)
    })?;
    Ok((cg, block.next_cg_addr))
}

fn read_channel(
    image: &[u8],
    address: u64,
    source: &IndexSource,
    level: ReadLevel,
    little_endian: bool,
) -> Result<(Channel, u64)> {
    let block = Cn3Block::from_bytes(block3_slice(image, address)?)?;
    let mut cn = Channel::with_index(address, source);
    let long_name = read_text3(image, block.long_name_addr)?;
    cn.name = if long_name.is_empty() {
        block.short_name.clone()
    } else {
        long_name
    };
    cn.display_name = read_text3(image, block.display_name_addr)?;
    let comment = read_text3(image, block.comment_addr)?;
    cn.description = if block.description.is_empty() {
        comment
    } else {
        block.description.clone()
    };

    if block.channel_type == CN3_TYPE_TIME {
        cn.channel_type = ChannelType::Master;
        cn.sync_type = SyncType::Time;
    }
    cn.data_type = DataType::from_mdf3(block.data_type, little_endian);
    cn.byte_offset = block.byte_offset();
    cn.bit_offset = block.bit_offset();
    cn.bit_count = u32::from(block.bit_count);
    cn.sampling_rate = block.sample_rate;
    if block.range_valid {
        cn.flags |= CN_FLAG_VALUE_RANGE_VALID;
        cn.range = (block.min, block.max);
    }

    if block.conversion_addr != 0 {
        let cc = Cc3Block::from_bytes(block3_slice(image, block.conversion_addr)?)?;
        cn.unit = cc.unit.clone();
        if level >= ReadLevel::Everything {
            cn.conversion = Some(to_conversion(image, block.conversion_addr, cc, source)?);
        }
    }
    if level >= ReadLevel::Everything && block.extension_addr != 0 {
        match Ce3Block::from_bytes(block3_slice(image, block.extension_addr)?) {
            Ok(ce) => cn.source_information = Some(to_source(block.extension_addr, ce)),
            Err(Error::UnsupportedFeature(what)) => {
                mdf_log!(Info, "read_channel", "{what} skipped for channel '{}'", cn.name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok((cn, block.next_cn_addr))
}

fn to_conversion(
    image: &[u8],
    address: u64,
    block: Cc3Block,
    source: &IndexSource,
) -> Result<ChannelConversion> {
    let mut cc = ChannelConversion::with_index(address, source);
    cc.unit = block.unit;
    cc.conversion_type = ConversionType::from_mdf3(block.conversion_type);
    if block.range_valid {
        cc.range = Some((block.min, block.max));
    }
    match block.parameters {
        Cc3Parameters::None => {}
        Cc3Parameters::Values(values) => cc.parameters = values,
        Cc3Parameters::Formula(formula) => cc.formula = formula,
        Cc3Parameters::ValueTexts(entries) => {
            let (keys, texts): (Vec<f64>, Vec<String>) = entries.into_iter().unzip();
            cc.parameters = keys;
            cc.references = texts.into_iter().map(ConversionRef::Text).collect();
            cc.references.push(ConversionRef::Empty);
        }
        Cc3Parameters::RangeTexts(entries) => {
            let mut entries = entries.into_iter();
            let default = entries.next();
            for (lower, upper, text_addr) in entries {
                cc.parameters.push(lower);
                cc.parameters.push(upper);
                cc.references
                    .push(ConversionRef::Text(read_text3(image, text_addr)?));
            }
            cc.references.push(match default {
                Some((_, _, text_addr)) if text_addr != 0 => {
                    ConversionRef::Text(read_text3(image, text_addr)?)
                }
                _ => ConversionRef::Empty,
            });
        }
    }
    Ok(cc)
}

fn to_source(address: u64, block: Ce3Block) -> SourceInformation {
    let mut si = SourceInformation::with_index(address);
    match block {
        Ce3Block::Dim {
            module,
            address,
            description,
            ecu_id,
        } => {
            si.name = ecu_id;
            si.description = description;
            si.path = alloc::format!("module {module}, address {address:#x}");
            si.source_type = SourceType::Ecu;
        }
        Ce3Block::VectorCan {
            can_id,
            can_channel,
            message_name,
            sender_name,
        } => {
            si.name = message_name;
            si.path = sender_name;
            si.description = alloc::format!("CAN id {can_id:#x} on channel {can_channel}");
            si.source_type = SourceType::Bus;
            si.bus = SourceBus::Can;
        }
    }
    si
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_text_default_moves_last() {
        let block = Cc3Block {
            conversion_type: 12,
            parameters: Cc3Parameters::RangeTexts(alloc::vec![(0.0, 0.0, 0), (1.0, 5.0, 0)]),
            ..Cc3Block::default()
        };
        let cc = to_conversion(&[], 0x40, block, &IndexSource::default()).unwrap();
        assert_eq!(cc.parameters(), &[1.0, 5.0]);
        assert_eq!(cc.references().len(), 2);
        assert_eq!(cc.references()[1], ConversionRef::Empty);
    }

    #[test]
    fn value_texts_get_an_empty_default() {
        let block = Cc3Block {
            conversion_type: 11,
            parameters: Cc3Parameters::ValueTexts(alloc::vec![(0.0, "off".into()), (1.0, "on".into())]),
            ..Cc3Block::default()
        };
        let cc = to_conversion(&[], 0x40, block, &IndexSource::default()).unwrap();
        assert_eq!(cc.conversion_type(), ConversionType::ValueToText);
        let on = cc.convert(&crate::codec::DecodedValue::UnsignedInteger(1)).unwrap();
        assert_eq!(on.as_text(), Some("on"));
        assert_eq!(cc.references()[2].as_text(), None);
        assert_eq!(cc.references()[0].as_text(), Some("off"));
    }
}
