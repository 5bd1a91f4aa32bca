// MDF 3.30 block emission. MDF3 has no lists beyond DG/CG/CN, no VLSD data
// and no invalidation bits; the layout pass already folded those away.
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::MdfWrite;
use super::io::BlockSink;
use super::layout::RecordStream;
use crate::conversion::ConversionType;
use crate::logging::mdf_log;
use crate::mdf3::{
    CG3_RECORD_COUNT, CN3_TYPE_DATA, CN3_TYPE_TIME, Cc3Block, Cc3Parameters, Ce3Block, Cg3Block,
    Cn3Block, DG3_DATA_LINK, Dg3Block, HD3_DG_COUNT, HD3_FIRST_DG_LINK, Hd3Block, Tx3Block,
};
use crate::model::{Channel, ChannelConversion, ConversionRef, DataGroup, Header, SourceInformation};
use crate::types::{ChannelType, SourceBus};
use crate::{Error, Result};

pub(super) const HD3_ADDRESS: u64 = 64;

const HD3_COMMENT_LINK: u64 = 8;
const DG3_NEXT_LINK: u64 = 4;
/// Date, time and timestamp fields of the HD block.
const HD3_DATE_TIME: core::ops::Range<usize> = 18..36;
const HD3_TIMESTAMP: core::ops::Range<usize> = 164..172;

const SHORT_NAME_WIDTH: usize = 32;
/// Largest start bit that fits the u16 field without an additional byte offset.
const MAX_START_BYTE: u32 = 8192;

const NS_PER_HOUR: i64 = 3_600_000_000_000;

fn write_text3<W: MdfWrite>(sink: &mut BlockSink<W>, text: &str) -> Result<u64> {
    if text.is_empty() {
        return Ok(0);
    }
    sink.write_block(&Tx3Block::new(text).to_bytes()?)
}

fn header_block(header: &Header) -> Hd3Block {
    let offset_hours = header.tz_offset_min / 60;
    let local = header.start_time as i64 + i64::from(offset_hours) * NS_PER_HOUR;
    Hd3Block {
        author: header.author.clone(),
        organization: header.department.clone(),
        project: header.project.clone(),
        subject: header.subject.clone(),
        timestamp_ns: local.max(0) as u64,
        utc_offset_hours: offset_hours,
        time_quality: u16::from(header.time_quality),
        ..Hd3Block::default()
    }
}

pub(super) fn write_header<W: MdfWrite>(sink: &mut BlockSink<W>, header: &Header) -> Result<()> {
    let address = sink.write_object(header.index, &header_block(header).to_bytes()?)?;
    if address != HD3_ADDRESS {
        return Err(Error::BlockSerializationError(format!(
            "header block landed at {address:#x}"
        )));
    }
    let comment = write_text3(sink, &header.description)?;
    sink.update_u32(HD3_ADDRESS + HD3_COMMENT_LINK, link32(comment)?)
}

/// Rewrites the date, time and timestamp fields of the header.
pub(super) fn patch_start_time<W: MdfWrite>(sink: &mut BlockSink<W>, header: &Header) -> Result<()> {
    let bytes = header_block(header).to_bytes()?;
    sink.patch(HD3_ADDRESS + HD3_DATE_TIME.start as u64, &bytes[HD3_DATE_TIME])?;
    sink.patch(HD3_ADDRESS + HD3_TIMESTAMP.start as u64, &bytes[HD3_TIMESTAMP])
}

fn link32(address: u64) -> Result<u32> {
    u32::try_from(address)
        .map_err(|_| Error::BlockLinkError(format!("{address:#x} beyond the 4 GiB MDF3 limit")))
}

pub(super) fn write_data_group<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    previous: &mut Option<u64>,
    dg_count: u16,
) -> Result<u64> {
    let mut next_cg = 0;
    for cg in dg.channel_groups.iter().rev() {
        let mut next_cn = 0;
        for cn in cg.channels.iter().rev() {
            next_cn = write_channel(sink, cn, next_cn)?;
        }
        let comment = write_text3(sink, if cg.description.is_empty() { &cg.name } else { &cg.description })?;
        let block = Cg3Block {
            next_cg_addr: next_cg,
            first_cn_addr: next_cn,
            comment_addr: comment,
            record_id: u16::try_from(cg.record_id).unwrap_or(0),
            cn_count: cg.channels.len() as u16,
            record_size: u16::try_from(cg.data_bytes).map_err(|_| {
                Error::InvalidState(format!("record of '{}' too large for MDF3", cg.name))
            })?,
            record_count: u32::try_from(cg.nof_samples).unwrap_or(u32::MAX),
            ..Cg3Block::default()
        };
        next_cg = sink.write_object(cg.index, &block.to_bytes()?)?;
    }

    let block = Dg3Block {
        first_cg_addr: next_cg,
        cg_count: dg.channel_groups.len() as u16,
        record_id_count: u16::from(dg.record_id_size > 0),
        ..Dg3Block::default()
    };
    let address = sink.write_object(dg.index, &block.to_bytes()?)?;
    match *previous {
        Some(prev) => sink.update_u32(prev + DG3_NEXT_LINK, link32(address)?)?,
        None => sink.update_u32(HD3_ADDRESS + HD3_FIRST_DG_LINK, link32(address)?)?,
    }
    sink.update_u16(HD3_ADDRESS + HD3_DG_COUNT, dg_count)?;
    *previous = Some(address);
    Ok(address)
}

fn write_channel<W: MdfWrite>(sink: &mut BlockSink<W>, cn: &Channel, next: u64) -> Result<u64> {
    let data_type = cn.data_type.to_mdf3(cn.bit_count).ok_or_else(|| {
        Error::UnsupportedFeature(format!("{:?} in MDF3 channel '{}'", cn.data_type, cn.name))
    })?;
    let (start_bit, additional_byte_offset) = if cn.byte_offset < MAX_START_BYTE {
        ((cn.byte_offset * 8 + u32::from(cn.bit_offset)) as u16, 0)
    } else {
        let extra = u16::try_from(cn.byte_offset).map_err(|_| {
            Error::InvalidState(format!("byte offset of '{}' too large for MDF3", cn.name))
        })?;
        (u16::from(cn.bit_offset), extra)
    };

    let long_name = if cn.name.len() >= SHORT_NAME_WIDTH {
        write_text3(sink, &cn.name)?
    } else {
        0
    };
    let display_name = write_text3(sink, &cn.display_name)?;
    let comment = write_text3(sink, &cn.description)?;
    let conversion = if cn.conversion.is_some() || !cn.unit.is_empty() {
        write_conversion(sink, cn.conversion.as_ref(), &cn.unit)?
    } else {
        0
    };
    let extension = match &cn.source_information {
        Some(si) => sink.write_object(si.index, &extension_block(si).to_bytes()?)?,
        None => 0,
    };

    let range = cn.range();
    let block = Cn3Block {
        next_cn_addr: next,
        conversion_addr: conversion,
        extension_addr: extension,
        comment_addr: comment,
        channel_type: if cn.channel_type == ChannelType::Master {
            CN3_TYPE_TIME
        } else {
            CN3_TYPE_DATA
        },
        short_name: cn.name.chars().take(SHORT_NAME_WIDTH - 1).collect(),
        start_bit,
        bit_count: u16::try_from(cn.bit_count).map_err(|_| {
            Error::InvalidState(format!("'{}' wider than an MDF3 channel", cn.name))
        })?,
        data_type,
        range_valid: range.is_some(),
        min: range.map_or(0.0, |r| r.0),
        max: range.map_or(0.0, |r| r.1),
        sample_rate: cn.sampling_rate,
        long_name_addr: long_name,
        display_name_addr: display_name,
        additional_byte_offset,
        ..Cn3Block::default()
    };
    sink.write_object(cn.index, &block.to_bytes()?)
}

fn text_of(reference: Option<&ConversionRef>) -> String {
    reference
        .and_then(ConversionRef::as_text)
        .map(String::from)
        .unwrap_or_default()
}

fn write_conversion<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    cc: Option<&ChannelConversion>,
    channel_unit: &str,
) -> Result<u64> {
    let Some(cc) = cc else {
        let block = Cc3Block {
            unit: String::from(channel_unit),
            conversion_type: 65535,
            ..Cc3Block::default()
        };
        return sink.write_block(&block.to_bytes()?);
    };
    let Some(conversion_type) = cc.conversion_type.to_mdf3() else {
        mdf_log!(
            Warning,
            "write_conversion",
            "{:?} has no MDF3 form, conversion '{}' not written",
            cc.conversion_type,
            cc.name
        );
        return Ok(0);
    };

    let parameters = match cc.conversion_type {
        ConversionType::Algebraic => Cc3Parameters::Formula(cc.formula.clone()),
        ConversionType::ValueToText => Cc3Parameters::ValueTexts(
            cc.parameters
                .iter()
                .enumerate()
                .map(|(n, &key)| (key, text_of(cc.references.get(n))))
                .collect(),
        ),
        ConversionType::ValueRangeToText => {
            let pairs = cc.parameters.len() / 2;
            let default = write_text3(sink, &text_of(cc.references.get(pairs)))?;
            let mut entries = Vec::with_capacity(pairs + 1);
            entries.push((0.0, 0.0, default));
            for n in 0..pairs {
                let text = write_text3(sink, &text_of(cc.references.get(n)))?;
                entries.push((cc.parameters[2 * n], cc.parameters[2 * n + 1], text));
            }
            Cc3Parameters::RangeTexts(entries)
        }
        ConversionType::Identity | ConversionType::Date | ConversionType::Time => Cc3Parameters::None,
        _ => Cc3Parameters::Values(cc.parameters.clone()),
    };

    let unit = if cc.unit.is_empty() { channel_unit } else { &cc.unit };
    let block = Cc3Block {
        range_valid: cc.range.is_some(),
        min: cc.range.map_or(0.0, |r| r.0),
        max: cc.range.map_or(0.0, |r| r.1),
        unit: String::from(unit),
        conversion_type,
        parameters,
    };
    sink.write_object(cc.index, &block.to_bytes()?)
}

fn extension_block(si: &SourceInformation) -> Ce3Block {
    if si.bus == SourceBus::Can {
        Ce3Block::VectorCan {
            can_id: 0,
            can_channel: 0,
            message_name: si.name.clone(),
            sender_name: si.path.clone(),
        }
    } else {
        Ce3Block::Dim {
            module: 0,
            address: 0,
            description: si.description.clone(),
            ecu_id: si.name.clone(),
        }
    }
}

/// Writes all buffered records as the data section of `dg` and stores the
/// record counts. MDF3 data groups hold one contiguous block, so this runs
/// once per group when the measurement stops.
pub(super) fn write_data<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    stream: &mut RecordStream,
) -> Result<()> {
    let dg_address = sink
        .position_of(dg.index)
        .ok_or_else(|| Error::InvalidState(format!("data group {} not written yet", dg.index)))?;
    if stream.has_pending() {
        let (_, data) = stream.take_pending();
        let address = sink.write_block(&data)?;
        sink.update_u32(dg_address + DG3_DATA_LINK, link32(address)?)?;
        mdf_log!(Trace, "write_data", "{} bytes at {address:#x}", data.len());
    }
    for cg in &dg.channel_groups {
        if let Some(address) = sink.position_of(cg.index) {
            let count = u32::try_from(cg.nof_samples).unwrap_or(u32::MAX);
            sink.update_u32(address + CG3_RECORD_COUNT, count)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::IdentificationBlock;
    use crate::mdf3::{block3_slice, read_text3};
    use crate::model::MdfFile;
    use crate::writer::VecWriter;

    fn sink_with_header(file: &MdfFile) -> BlockSink<VecWriter> {
        let mut sink = BlockSink::new(VecWriter::new());
        sink.write_block(&IdentificationBlock::new(330, "test").to_bytes().unwrap())
            .unwrap();
        write_header(&mut sink, file.header()).unwrap();
        sink
    }

    #[test]
    fn header_fields_land_in_hd3() {
        let mut file = MdfFile::new_mdf3();
        file.header_mut().set_author("Ravi");
        file.header_mut().set_description("cold start");
        let sink = sink_with_header(&file);
        let image = sink.into_inner().into_inner();

        let hd = Hd3Block::from_bytes(block3_slice(&image, 64).unwrap()).unwrap();
        assert_eq!(hd.author, "Ravi");
        assert_eq!(read_text3(&image, hd.comment_addr).unwrap(), "cold start");
    }

    #[test]
    fn long_names_get_a_text_block() {
        let mut file = MdfFile::new_mdf3();
        let dg = file.create_data_group();
        let cg = dg.create_channel_group();
        let cn = cg.create_channel();
        cn.set_name("a_rather_long_channel_name_beyond_32_chars");
        cn.set_data_type(crate::DataType::UnsignedIntegerLE);
        cn.set_bit_count(16);

        let mut sink = sink_with_header(&file);
        let mut previous = None;
        let dg = &file.data_groups()[0];
        write_data_group(&mut sink, dg, &mut previous, 1).unwrap();
        let cn_address = sink.position_of(dg.channel_groups()[0].channels()[0].index()).unwrap();
        let image = sink.into_inner().into_inner();

        let cn = Cn3Block::from_bytes(block3_slice(&image, cn_address).unwrap()).unwrap();
        assert_eq!(cn.short_name.len(), SHORT_NAME_WIDTH - 1);
        assert_eq!(
            read_text3(&image, cn.long_name_addr).unwrap(),
            "a_rather_long_channel_name_beyond_32_chars"
        );
        let hd = Hd3Block::from_bytes(block3_slice(&image, 64).unwrap()).unwrap();
        assert_eq!(hd.dg_count, 1);
        assert_ne!(hd.first_dg_addr, 0);
    }
}
