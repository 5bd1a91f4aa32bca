// MDF4 block emission: structure at init, data chains while measuring,
// histories, attachments and events around them.
use alloc::format;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use md5::{Digest, Md5};

use super::MdfWrite;
use super::io::BlockSink;
use super::layout::RecordStream;
use crate::blocks::attachment_block::{AT_FLAG_COMPRESSED, AT_FLAG_EMBEDDED, AT_FLAG_MD5_VALID};
use crate::blocks::channel_block::CN_DATA_LINK;
use crate::blocks::channel_group_block::{CG_CYCLE_COUNT, CG_DATA_BYTES};
use crate::blocks::data_group_block::{DG_DATA_LINK, DG_NEXT_LINK};
use crate::blocks::data_list_block::DL_NEXT_LINK;
use crate::blocks::event_block::EV_FLAG_GROUP_NAME;
use crate::blocks::header_block::{
    HD_ABS_TIME, HD_ATTACHMENT_LINK, HD_COMMENT_LINK, HD_EVENT_LINK, HD_FILE_HISTORY_LINK,
    HD_FIRST_DG_LINK, HD_FLAG_ANGLE_VALID, HD_FLAG_DISTANCE_VALID,
};
use crate::blocks::{
    AttachmentBlock, ChannelArrayBlock, ChannelBlock, ChannelGroupBlock, ConversionBlock,
    DataGroupBlock, DataListBlock, EventBlock, FileHistoryBlock, HeaderBlock, HeaderListBlock,
    MetadataBlock, SourceBlock, TextBlock, payload_block_bytes,
};
use crate::conversion::ConversionType;
use crate::logging::mdf_log;
use crate::model::{
    Attachment, Channel, ChannelArray, ChannelConversion, ChannelGroup, Comment, ConversionRef,
    DataGroup, Event, FileHistory, Header, MetaData, SourceInformation,
};
use crate::reader::mdf4::{
    HD_AUTHOR, HD_DEPARTMENT, HD_MEASUREMENT_ID, HD_PROJECT, HD_RECORDER_ID, HD_RECORDER_INDEX,
    HD_SUBJECT,
};
use crate::types::ChannelType;
use crate::{Error, Result};

/// The header block always follows the identification block.
pub(super) const HD_ADDRESS: u64 = 64;

/// `next` is the first link of every block list (DG, CG, CN, FH, AT, EV).
const NEXT_LINK: u64 = 24;

fn write_text<W: MdfWrite>(sink: &mut BlockSink<W>, text: &str) -> Result<u64> {
    if text.is_empty() {
        return Ok(0);
    }
    sink.write_block(&TextBlock::new(text).to_bytes()?)
}

/// TX block for plain comments, MD block with root element `root` otherwise.
fn write_comment<W: MdfWrite>(sink: &mut BlockSink<W>, comment: &Comment, root: &str) -> Result<u64> {
    if comment.is_plain() {
        return write_text(sink, &comment.text);
    }
    sink.write_block(&MetadataBlock::new(&comment.to_xml(root)).to_bytes()?)
}

fn comment_of(text: &str, metadata: Option<&MetaData>) -> Comment {
    Comment {
        text: text.to_string(),
        fields: Vec::new(),
        metadata: metadata.cloned(),
    }
}

/// Links `address` behind `previous`, or from the header link `head` when
/// the list is still empty.
fn append_to_list<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    previous: &mut Option<u64>,
    head: u64,
    address: u64,
) -> Result<()> {
    match *previous {
        Some(prev) => sink.update_link(prev + NEXT_LINK, address)?,
        None => sink.update_link(HD_ADDRESS + head, address)?,
    }
    *previous = Some(address);
    Ok(())
}

fn header_comment(header: &Header) -> Comment {
    let mut md = header.metadata.clone().unwrap_or_else(MetaData::new);
    for (name, value) in [
        (HD_AUTHOR, header.author.as_str()),
        (HD_DEPARTMENT, header.department.as_str()),
        (HD_PROJECT, header.project.as_str()),
        (HD_SUBJECT, header.subject.as_str()),
        (HD_MEASUREMENT_ID, header.measurement_id.as_str()),
        (HD_RECORDER_ID, header.recorder_id.as_str()),
    ] {
        if !value.is_empty() {
            md.set_property_as_string(name, value);
        }
    }
    if header.recorder_index != 0 {
        md.set_property_as_string(HD_RECORDER_INDEX, &header.recorder_index.to_string());
    }
    Comment {
        text: header.description.clone(),
        fields: Vec::new(),
        metadata: Some(md).filter(|md| !md.is_empty()),
    }
}

/// Writes the header block of a new file right behind the identification.
pub(super) fn write_header<W: MdfWrite>(sink: &mut BlockSink<W>, header: &Header) -> Result<()> {
    let mut flags = 0;
    if header.start_angle.is_some() {
        flags |= HD_FLAG_ANGLE_VALID;
    }
    if header.start_distance.is_some() {
        flags |= HD_FLAG_DISTANCE_VALID;
    }
    let block = HeaderBlock {
        abs_time: header.start_time,
        tz_offset: header.tz_offset_min,
        daylight_save_time: header.dst_offset_min,
        time_flags: if header.tz_offset_min != 0 || header.dst_offset_min != 0 {
            0x02
        } else {
            0
        },
        time_quality: header.time_quality,
        flags,
        start_angle: header.start_angle.unwrap_or(0.0),
        start_distance: header.start_distance.unwrap_or(0.0),
        ..HeaderBlock::default()
    };
    let address = sink.write_object(header.index, &block.to_bytes()?)?;
    if address != HD_ADDRESS {
        return Err(Error::BlockSerializationError(format!(
            "header block landed at {address:#x}"
        )));
    }
    let comment = write_comment(sink, &header_comment(header), "HDcomment")?;
    sink.update_link(HD_ADDRESS + HD_COMMENT_LINK, comment)
}

pub(super) fn patch_start_time<W: MdfWrite>(sink: &mut BlockSink<W>, start_time: u64) -> Result<()> {
    sink.update_u64(HD_ADDRESS + HD_ABS_TIME, start_time)
}

/// Writes the block tree of `dg` and links it behind `previous`.
///
/// Lists are written back to front so every block knows its successor. VLSD
/// groups sit at the end of the group list and therefore exist before the
/// channels pointing at them.
pub(super) fn write_data_group<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    previous: &mut Option<u64>,
) -> Result<u64> {
    let mut next_cg = 0;
    for cg in dg.channel_groups.iter().rev() {
        next_cg = write_channel_group(sink, dg, cg, next_cg)?;
    }
    let comment = write_comment(sink, &comment_of(&dg.description, dg.metadata.as_ref()), "DGcomment")?;
    let block = DataGroupBlock {
        first_cg_addr: next_cg,
        comment_addr: comment,
        record_id_size: dg.record_id_size,
        ..DataGroupBlock::default()
    };
    let address = sink.write_object(dg.index, &block.to_bytes()?)?;
    match *previous {
        Some(prev) => sink.update_link(prev + DG_NEXT_LINK, address)?,
        None => sink.update_link(HD_ADDRESS + HD_FIRST_DG_LINK, address)?,
    }
    *previous = Some(address);
    mdf_log!(
        Debug,
        "write_data_group",
        "data group at {address:#x} with {} channel groups",
        dg.channel_groups.len()
    );
    Ok(address)
}

fn write_channel_group<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    cg: &ChannelGroup,
    next: u64,
) -> Result<u64> {
    let mut next_cn = 0;
    for cn in cg.channels.iter().rev() {
        next_cn = write_channel(sink, dg, cn, next_cn)?;
    }
    for cn in &cg.channels {
        if cn.channel_type != ChannelType::MaxLength {
            continue;
        }
        let length = cn.length_channel.and_then(|index| sink.position_of(index));
        if let (Some(address), Some(length)) = (sink.position_of(cn.index), length) {
            sink.update_link(address + CN_DATA_LINK, length)?;
        }
    }

    let name = write_text(sink, &cg.name)?;
    let source = match &cg.source_information {
        Some(si) => write_source(sink, si)?,
        None => 0,
    };
    let comment = write_comment(sink, &comment_of(&cg.description, cg.metadata.as_ref()), "CGcomment")?;
    let block = ChannelGroupBlock {
        next_cg_addr: next,
        first_ch_addr: next_cn,
        acq_name_addr: name,
        acq_source_addr: source,
        comment_addr: comment,
        record_id: cg.record_id,
        cycle_count: cg.nof_samples,
        flags: cg.flags,
        path_separator: cg.path_separator,
        data_bytes: cg.data_bytes,
        invalidation_bytes: cg.invalidation_bytes,
        ..ChannelGroupBlock::default()
    };
    sink.write_object(cg.index, &block.to_bytes()?)
}

fn write_channel<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    cn: &Channel,
    next: u64,
) -> Result<u64> {
    let name = write_text(sink, &cn.name)?;
    let unit = write_text(sink, &cn.unit)?;
    let mut comment = comment_of(&cn.description, cn.metadata.as_ref());
    comment.set_field("names/display", &cn.display_name);
    let comment = write_comment(sink, &comment, "CNcomment")?;
    let conversion = match &cn.conversion {
        Some(cc) => write_conversion(sink, cc)?,
        None => 0,
    };
    let source = match &cn.source_information {
        Some(si) => write_source(sink, si)?,
        None => 0,
    };
    let component = match &cn.channel_array {
        Some(ca) => write_channel_array(sink, ca)?,
        None => 0,
    };
    let data = if cn.channel_type == ChannelType::VariableLength && cn.vlsd_record_id != 0 {
        dg.channel_group_by_record_id(cn.vlsd_record_id)
            .and_then(|vlsd| sink.position_of(vlsd.index))
            .unwrap_or(0)
    } else {
        0
    };

    let block = ChannelBlock {
        next_ch_addr: next,
        component_addr: component,
        name_addr: name,
        source_addr: source,
        conversion_addr: conversion,
        data_addr: data,
        unit_addr: unit,
        comment_addr: comment,
        channel_type: cn.channel_type.to_u8(),
        sync_type: cn.sync_type.to_u8(),
        data_type: cn.data_type,
        bit_offset: cn.bit_offset,
        byte_offset: cn.byte_offset,
        bit_count: cn.bit_count,
        flags: cn.flags,
        pos_invalidation_bit: cn.inval_bit_pos,
        precision: cn.decimals,
        min_raw_value: cn.range.0,
        max_raw_value: cn.range.1,
        lower_limit: cn.limit.0,
        upper_limit: cn.limit.1,
        lower_ext_limit: cn.extended_limit.0,
        upper_ext_limit: cn.extended_limit.1,
        ..ChannelBlock::default()
    };
    sink.write_object(cn.index, &block.to_bytes()?)
}

fn write_conversion<W: MdfWrite>(sink: &mut BlockSink<W>, cc: &ChannelConversion) -> Result<u64> {
    let Some(conversion_type) = cc.conversion_type.to_mdf4() else {
        mdf_log!(
            Warning,
            "write_conversion",
            "{:?} has no MDF4 form, conversion '{}' not written",
            cc.conversion_type,
            cc.name
        );
        return Ok(0);
    };
    let name = write_text(sink, &cc.name)?;
    let unit = write_text(sink, &cc.unit)?;
    let comment = write_comment(sink, &comment_of(&cc.description, cc.metadata.as_ref()), "CCcomment")?;
    let inverse = match &cc.inverse {
        Some(inverse) => write_conversion(sink, inverse)?,
        None => 0,
    };

    let mut refs = Vec::with_capacity(cc.references.len());
    if cc.conversion_type == ConversionType::Algebraic {
        refs.push(sink.write_block(&TextBlock::new(&cc.formula).to_bytes()?)?);
    } else {
        for reference in &cc.references {
            refs.push(match reference {
                ConversionRef::Text(text) => sink.write_block(&TextBlock::new(text).to_bytes()?)?,
                ConversionRef::Conversion(nested) => write_conversion(sink, nested)?,
                ConversionRef::Empty => 0,
            });
        }
    }

    let mut block = ConversionBlock {
        name_addr: name,
        unit_addr: unit,
        comment_addr: comment,
        inverse_addr: inverse,
        refs,
        conversion_type,
        precision: cc.precision.unwrap_or(0),
        flags: cc.flags(),
        phys_range_min: cc.range.map(|(min, _)| min),
        phys_range_max: cc.range.map(|(_, max)| max),
        values: cc.parameters.clone(),
        ..ConversionBlock::default()
    };
    block.finish_layout();
    sink.write_object(cc.index, &block.to_bytes()?)
}

fn write_source<W: MdfWrite>(sink: &mut BlockSink<W>, si: &SourceInformation) -> Result<u64> {
    let name = write_text(sink, &si.name)?;
    let path = write_text(sink, &si.path)?;
    let comment = write_comment(sink, &comment_of(&si.description, si.metadata.as_ref()), "SIcomment")?;
    let block = SourceBlock {
        name_addr: name,
        path_addr: path,
        comment_addr: comment,
        source_type: si.source_type.to_u8(),
        bus_type: si.bus.to_u8(),
        flags: u8::from(si.simulated),
        ..SourceBlock::default()
    };
    sink.write_object(si.index, &block.to_bytes()?)
}

fn write_channel_array<W: MdfWrite>(sink: &mut BlockSink<W>, ca: &ChannelArray) -> Result<u64> {
    let mut block = ChannelArrayBlock {
        array_type: ca.array_type.to_u8(),
        storage: ca.storage.to_u8(),
        flags: ca.flags,
        byte_offset_base: ca.byte_offset_base,
        inval_bit_pos_base: ca.inval_bit_pos_base,
        dim_sizes: ca.dimensions.clone(),
        ..ChannelArrayBlock::default()
    };
    block.finish_layout();
    sink.write_object(ca.index, &block.to_bytes()?)
}

#[cfg(feature = "compression")]
fn data_block_bytes(data: &[u8], compress: bool, record_size: u32) -> Result<Vec<u8>> {
    if compress {
        crate::blocks::compress_block_bytes(b"DT", data, record_size)
    } else {
        payload_block_bytes("##DT", data)
    }
}

#[cfg(not(feature = "compression"))]
fn data_block_bytes(data: &[u8], _compress: bool, _record_size: u32) -> Result<Vec<u8>> {
    payload_block_bytes("##DT", data)
}

/// Writes the pending records of `dg` as one more fragment of its data chain
/// and brings the sample counters of its channel groups up to date.
///
/// The fragment and its DL block are complete before the previous list
/// links to them, so an interrupted flush leaves the earlier chain intact.
pub(super) fn flush_data_group<W: MdfWrite>(
    sink: &mut BlockSink<W>,
    dg: &DataGroup,
    stream: &mut RecordStream,
    compress: bool,
) -> Result<()> {
    let dg_address = sink
        .position_of(dg.index)
        .ok_or_else(|| Error::InvalidState(format!("data group {} not written yet", dg.index)))?;

    if stream.has_pending() {
        // Transposition only pays off for a plain single group stream.
        let record_size = match dg.channel_groups.as_slice() {
            [cg] if stream.id_size == 0 => cg.record_size() as u32,
            _ => 0,
        };
        let (start, data) = stream.take_pending();
        let data_address = sink.write_block(&data_block_bytes(&data, compress, record_size)?)?;
        let list = DataListBlock::new(vec![data_address], vec![start]);
        let list_address = sink.write_block(&list.to_bytes()?)?;

        if stream.last_list != 0 {
            sink.update_link(stream.last_list + DL_NEXT_LINK, list_address)?;
        } else if compress {
            let hl = HeaderListBlock::new(list_address);
            let hl_address = sink.write_block(&hl.to_bytes()?)?;
            sink.update_link(dg_address + DG_DATA_LINK, hl_address)?;
        } else {
            sink.update_link(dg_address + DG_DATA_LINK, list_address)?;
        }
        stream.last_list = list_address;
        mdf_log!(
            Trace,
            "flush_data_group",
            "{} bytes at stream offset {start} written to {data_address:#x}",
            data.len()
        );
    }

    for cg in &dg.channel_groups {
        let Some(address) = sink.position_of(cg.index) else {
            continue;
        };
        sink.update_u64(address + CG_CYCLE_COUNT, cg.nof_samples)?;
        if cg.is_vlsd() {
            let total = stream.vlsd_totals.get(&cg.record_id).copied().unwrap_or(0);
            sink.update_u64(address + CG_DATA_BYTES, total)?;
        }
    }
    Ok(())
}

/// Address of the last block of a list that is already in the file.
fn list_tail<W: MdfWrite, T>(sink: &BlockSink<W>, items: &[T], persisted: impl Fn(&T) -> Option<u64>) -> Option<u64> {
    items
        .iter()
        .filter_map(persisted)
        .last()
        .and_then(|index| sink.position_of(index))
}

/// Writes file history entries not yet in the file.
pub(super) fn write_file_histories<W: MdfWrite>(sink: &mut BlockSink<W>, header: &mut Header) -> Result<()> {
    let mut previous = list_tail(sink, &header.file_histories, |fh: &FileHistory| {
        fh.persisted.then_some(fh.index)
    });
    for fh in header.file_histories.iter_mut().filter(|fh| !fh.persisted) {
        let mut comment = comment_of(&fh.description, fh.metadata.as_ref());
        comment.set_field("tool_id", &fh.tool_name);
        comment.set_field("tool_vendor", &fh.tool_vendor);
        comment.set_field("tool_version", &fh.tool_version);
        comment.set_field("user_name", &fh.user_name);
        // FH comments are always MD blocks.
        let xml = comment.to_xml("FHcomment");
        let comment = sink.write_block(&MetadataBlock::new(&xml).to_bytes()?)?;
        let block = FileHistoryBlock {
            comment_addr: comment,
            time_ns: fh.time,
            tz_offset_min: header.tz_offset_min,
            dst_offset_min: header.dst_offset_min,
            ..FileHistoryBlock::default()
        };
        let address = sink.write_object(fh.index, &block.to_bytes()?)?;
        append_to_list(sink, &mut previous, HD_FILE_HISTORY_LINK, address)?;
        fh.persisted = true;
    }
    Ok(())
}

#[cfg(feature = "compression")]
fn deflate(data: &[u8]) -> Option<Vec<u8>> {
    Some(miniz_oxide::deflate::compress_to_vec_zlib(data, 6))
}

#[cfg(not(feature = "compression"))]
fn deflate(_data: &[u8]) -> Option<Vec<u8>> {
    None
}

fn write_attachment<W: MdfWrite>(sink: &mut BlockSink<W>, at: &mut Attachment) -> Result<u64> {
    if at.embedded && at.embedded_data.is_empty() && !at.file_name.is_empty() {
        at.embedded_data = std::fs::read(&at.file_name)?;
    }
    let mut flags = 0;
    let mut stored = Vec::new();
    if at.embedded {
        flags |= AT_FLAG_EMBEDDED;
        let digest = Md5::digest(&at.embedded_data);
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&digest);
        at.md5 = Some(md5);
        stored = match at.compressed.then(|| deflate(&at.embedded_data)).flatten() {
            Some(packed) => {
                flags |= AT_FLAG_COMPRESSED;
                packed
            }
            None => {
                if at.compressed {
                    mdf_log!(
                        Warning,
                        "write_attachment",
                        "compression unavailable, '{}' embedded as is",
                        at.file_name
                    );
                    at.compressed = false;
                }
                at.embedded_data.clone()
            }
        };
    }
    if at.md5.is_some() {
        flags |= AT_FLAG_MD5_VALID;
    }

    let file_name = write_text(sink, &at.file_name)?;
    let mime_type = write_text(sink, &at.file_type)?;
    let comment = write_comment(sink, &comment_of(&at.description, at.metadata.as_ref()), "ATcomment")?;
    let mut block = AttachmentBlock {
        filename_addr: file_name,
        mimetype_addr: mime_type,
        comment_addr: comment,
        flags,
        creator_index: at.creator_index,
        md5_checksum: at.md5.unwrap_or_default(),
        original_size: at.embedded_data.len() as u64,
        embedded_data: stored,
        ..AttachmentBlock::default()
    };
    block.finish_layout();
    sink.write_object(at.index, &block.to_bytes()?)
}

/// Writes attachments not yet in the file.
pub(super) fn write_attachments<W: MdfWrite>(sink: &mut BlockSink<W>, header: &mut Header) -> Result<()> {
    let mut previous = list_tail(sink, &header.attachments, |at: &Attachment| {
        at.persisted.then_some(at.index)
    });
    for at in header.attachments.iter_mut().filter(|at| !at.persisted) {
        let address = write_attachment(sink, at)?;
        append_to_list(sink, &mut previous, HD_ATTACHMENT_LINK, address)?;
        at.persisted = true;
    }
    Ok(())
}

fn write_event<W: MdfWrite>(sink: &mut BlockSink<W>, ev: &Event) -> Result<u64> {
    let name = write_text(sink, &ev.name)?;
    let mut comment = comment_of(&ev.description, ev.metadata.as_ref());
    if ev.pre_trig != 0.0 {
        comment.set_field("pre_trigger_interval", &ev.pre_trig.to_string());
    }
    if ev.post_trig != 0.0 {
        comment.set_field("post_trigger_interval", &ev.post_trig.to_string());
    }
    let comment = write_comment(sink, &comment, "EVcomment")?;
    let group_name = write_text(sink, &ev.group_name)?;

    let mut block = EventBlock {
        name_addr: name,
        comment_addr: comment,
        group_name_addr: group_name,
        event_type: ev.event_type.to_u8(),
        sync_type: ev.sync_type.to_u8(),
        range_type: ev.range_type.to_u8(),
        cause: ev.cause.to_u8(),
        flags: if group_name != 0 { EV_FLAG_GROUP_NAME } else { 0 },
        creator_index: ev.creator_index,
        sync_base_value: ev.sync_value,
        sync_factor: ev.sync_factor,
        ..EventBlock::default()
    };
    block.finish_layout();
    sink.write_object(ev.index, &block.to_bytes()?)
}

/// Writes events not yet in the file.
pub(super) fn write_events<W: MdfWrite>(sink: &mut BlockSink<W>, header: &mut Header) -> Result<()> {
    let mut previous = list_tail(sink, &header.events, |ev: &Event| ev.persisted.then_some(ev.index));
    for ev in header.events.iter_mut().filter(|ev| !ev.persisted) {
        let address = write_event(sink, ev)?;
        append_to_list(sink, &mut previous, HD_EVENT_LINK, address)?;
        ev.persisted = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockParse, read_text};
    use crate::blocks::IdentificationBlock;
    use crate::model::MdfFile;
    use crate::reader::mdf4::read_comment;
    use crate::writer::VecWriter;

    fn new_sink() -> BlockSink<VecWriter> {
        let mut sink = BlockSink::new(VecWriter::new());
        let id = IdentificationBlock::new(410, "test");
        sink.write_block(&id.to_bytes().unwrap()).unwrap();
        sink
    }

    #[test]
    fn header_comment_carries_properties() {
        let mut file = MdfFile::new_mdf4();
        file.header_mut().set_author("Ingrid");
        file.header_mut().set_description("bench run");
        let mut sink = new_sink();
        write_header(&mut sink, file.header()).unwrap();
        let image = sink.into_inner().into_inner();

        let hd = HeaderBlock::from_bytes(&image[64..]).unwrap();
        let comment = read_comment(&image, hd.comment_addr).unwrap();
        assert_eq!(comment.text, "bench run");
        let md = comment.metadata.unwrap();
        assert_eq!(md.property_as_string(HD_AUTHOR).as_deref(), Some("Ingrid"));
    }

    #[test]
    fn conversion_references_are_written() {
        let mut cc = ChannelConversion::default();
        cc.set_conversion_type(ConversionType::ValueToText);
        cc.set_parameter(0, 1.0);
        cc.set_text_reference(0, "on");
        cc.set_text_reference(1, "");
        let mut sink = new_sink();
        let address = write_conversion(&mut sink, &cc).unwrap();
        let image = sink.into_inner().into_inner();

        let block = ConversionBlock::from_bytes(&image[address as usize..]).unwrap();
        assert_eq!(block.refs.len(), 2);
        assert_eq!(read_text(&image, block.refs[0]).unwrap(), "on");
        assert_eq!(block.values, vec![1.0]);
    }

    #[test]
    fn file_histories_chain_from_the_header() {
        let mut file = MdfFile::new_mdf4();
        let mut sink = new_sink();
        write_header(&mut sink, file.header()).unwrap();
        for tool in ["first", "second"] {
            let fh = file.header_mut().create_file_history();
            fh.set_tool_name(tool);
        }
        write_file_histories(&mut sink, file.header_mut()).unwrap();
        assert!(file.header().file_histories().iter().all(|fh| fh.persisted));
        let image = sink.into_inner().into_inner();

        let hd = HeaderBlock::from_bytes(&image[64..]).unwrap();
        let first = FileHistoryBlock::from_bytes(&image[hd.file_history_addr as usize..]).unwrap();
        let comment = read_comment(&image, first.comment_addr).unwrap();
        assert_eq!(comment.field("tool_id"), Some("first"));
        assert_ne!(first.next_fh_addr, 0);
    }
}
