//! MDF4 block tree to object model.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{ReadLevel, walk_chain};
use crate::blocks::header_block::{HD_FLAG_ANGLE_VALID, HD_FLAG_DISTANCE_VALID};
use crate::blocks::attachment_block::{AT_FLAG_COMPRESSED, AT_FLAG_EMBEDDED, AT_FLAG_MD5_VALID};
use crate::blocks::conversion_block::{
    CC_FLAG_PRECISION_VALID, CC_FLAG_RANGE_VALID, CC_FLAG_STATUS_STRING,
};
use crate::blocks::{
    AttachmentBlock, BlockHeader, BlockParse, ChannelArrayBlock, ChannelBlock, ChannelGroupBlock,
    ConversionBlock, DataGroupBlock, EventBlock, FileHistoryBlock, HeaderBlock,
    IdentificationBlock, SourceBlock, StringBlock, block_slice, read_string_block, read_text,
};
use crate::conversion::ConversionType;
use crate::logging::mdf_log;
use crate::model::{
    Attachment, Channel, ChannelArray, ChannelConversion, ChannelGroup, Comment, ConversionRef,
    DataGroup, Event, FileHistory, Header, IndexSource, MdfFile, SourceInformation,
};
use crate::types::{
    ArrayStorage, ArrayType, ChannelType, EventCause, EventSyncType, EventType, MdfBusType,
    RangeType, SourceBus, SourceType, SyncType,
};
use crate::{Error, Result};

/// Header properties mapped onto `Header` fields.
pub(crate) const HD_AUTHOR: &str = "author";
pub(crate) const HD_DEPARTMENT: &str = "department";
pub(crate) const HD_PROJECT: &str = "project";
pub(crate) const HD_SUBJECT: &str = "subject";
pub(crate) const HD_MEASUREMENT_ID: &str = "measurement_id";
pub(crate) const HD_RECORDER_ID: &str = "recorder_id";
pub(crate) const HD_RECORDER_INDEX: &str = "recorder_index";

/// Nested conversions deeper than this are not followed.
const MAX_CONVERSION_NESTING: usize = 16;

/// Resolves a comment link: TX text or MD XML.
pub(crate) fn read_comment(image: &[u8], address: u64) -> Result<Comment> {
    Ok(match read_string_block(image, address)? {
        Some(StringBlock::Text(text)) => Comment::parse(&text, false),
        Some(StringBlock::Metadata(xml)) => Comment::parse(&xml, true),
        None => Comment::default(),
    })
}

fn block_id(image: &[u8], address: u64) -> Result<String> {
    Ok(BlockHeader::from_bytes(block_slice(image, address)?)?.id)
}

pub(crate) fn parse_file(
    image: &[u8],
    identification: IdentificationBlock,
    level: ReadLevel,
) -> Result<MdfFile> {
    let source = IndexSource::default();
    source.bump_past(image.len() as u64);

    let hd = HeaderBlock::from_bytes(block_slice(image, 64)?)?;
    let mut header = Header::with_index(64, &source);
    read_header(image, &hd, &mut header)?;

    if level >= ReadLevel::MeasurementInfo {
        walk_chain(hd.first_dg_addr, |address| {
            let (dg, next) = read_data_group(image, address, &source, level)?;
            header.data_groups.push(dg);
            Ok(next)
        })?;
    }

    if level >= ReadLevel::Everything {
        walk_chain(hd.file_history_addr, |address| {
            let (fh, next) = read_file_history(image, address)?;
            header.file_histories.push(fh);
            Ok(next)
        })?;
        walk_chain(hd.first_attachment_addr, |address| {
            let (at, next) = read_attachment(image, address)?;
            header.attachments.push(at);
            Ok(next)
        })?;
        walk_chain(hd.first_event_addr, |address| {
            let (ev, next) = read_event(image, address)?;
            header.events.push(ev);
            Ok(next)
        })?;
    }

    Ok(MdfFile::from_parts(identification, header))
}

fn read_header(image: &[u8], hd: &HeaderBlock, header: &mut Header) -> Result<()> {
    header.start_time = hd.abs_time;
    header.tz_offset_min = hd.tz_offset;
    header.dst_offset_min = hd.daylight_save_time;
    header.time_quality = hd.time_quality;
    if hd.flags & HD_FLAG_ANGLE_VALID != 0 {
        header.start_angle = Some(hd.start_angle);
    }
    if hd.flags & HD_FLAG_DISTANCE_VALID != 0 {
        header.start_distance = Some(hd.start_distance);
    }

    let comment = read_comment(image, hd.comment_addr)?;
    header.description = comment.text;
    if let Some(mut md) = comment.metadata {
        let mut take = |name: &str| {
            md.remove_property(name)
                .map(|tag| tag.value_as_string())
                .unwrap_or_default()
        };
        header.author = take(HD_AUTHOR);
        header.department = take(HD_DEPARTMENT);
        header.project = take(HD_PROJECT);
        header.subject = take(HD_SUBJECT);
        header.measurement_id = take(HD_MEASUREMENT_ID);
        header.recorder_id = take(HD_RECORDER_ID);
        header.recorder_index = take(HD_RECORDER_INDEX).trim().parse().unwrap_or(0);
        if !md.properties().is_empty() {
            header.metadata = Some(md);
        }
    }
    Ok(())
}

fn read_data_group(
    image: &[u8],
    address: u64,
    source: &IndexSource,
    level: ReadLevel,
) -> Result<(DataGroup, u64)> {
    let block = DataGroupBlock::from_bytes(block_slice(image, address)?)?;
    let mut dg = DataGroup::with_index(address, source);
    let comment = read_comment(image, block.comment_addr)?;
    dg.description = comment.text;
    dg.metadata = comment.metadata.filter(|md| !md.is_empty());
    dg.record_id_size = block.record_id_size;
    dg.data_link = block.data_block_addr;
    dg.persisted = true;

    walk_chain(block.first_cg_addr, |cg_address| {
        let (cg, next) = read_channel_group(image, cg_address, source, level)?;
        dg.channel_groups.push(cg);
        Ok(next)
    })?;
    Ok((dg, block.next_dg_addr))
}

fn read_channel_group(
    image: &[u8],
    address: u64,
    source: &IndexSource,
    level: ReadLevel,
) -> Result<(ChannelGroup, u64)> {
    let block = ChannelGroupBlock::from_bytes(block_slice(image, address)?)?;
    let mut cg = ChannelGroup::with_index(address, source);
    cg.record_id = block.record_id;
    cg.name = read_text(image, block.acq_name_addr)?;
    let comment = read_comment(image, block.comment_addr)?;
    cg.description = comment.text;
    cg.metadata = comment.metadata.filter(|md| !md.is_empty());
    cg.nof_samples = block.cycle_count;
    cg.flags = block.flags;
    cg.path_separator = block.path_separator;
    cg.data_bytes = block.data_bytes;
    cg.invalidation_bytes = block.invalidation_bytes;
    cg.fixed_layout = true;

    if level >= ReadLevel::Everything && block.acq_source_addr != 0 {
        cg.source_information = Some(read_source(image, block.acq_source_addr)?);
    }
    cg.bus_type = cg
        .source_information
        .as_ref()
        .and_then(|si| MdfBusType::from_source_bus(si.bus))
        .or_else(|| MdfBusType::from_group_name(&cg.name));

    walk_chain(block.first_ch_addr, |cn_address| {
        let (cn, next) = read_channel(image, cn_address, source, level)?;
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
) -> Result<(Channel, u64)> {
    let block = ChannelBlock::from_bytes(block_slice(image, address)?)?;
    let mut cn = Channel::with_index(address, source);
    cn.name = read_text(image, block.name_addr)?;
    cn.unit = read_comment(image, block.unit_addr)?.text;
    let comment = read_comment(image, block.comment_addr)?;
    if let Some(display) = comment.field("names/display") {
        cn.display_name = display.to_string();
    }
    cn.description = comment.text;
    cn.metadata = comment.metadata.filter(|md| !md.is_empty());

    cn.channel_type = ChannelType::from_u8(block.channel_type);
    cn.sync_type = SyncType::from_u8(block.sync_type);
    cn.data_type = block.data_type;
    cn.bit_offset = block.bit_offset;
    cn.byte_offset = block.byte_offset;
    cn.bit_count = block.bit_count;
    cn.flags = block.flags;
    cn.inval_bit_pos = block.pos_invalidation_bit;
    cn.decimals = block.precision;
    cn.range = (block.min_raw_value, block.max_raw_value);
    cn.limit = (block.lower_limit, block.upper_limit);
    cn.extended_limit = (block.lower_ext_limit, block.upper_ext_limit);
    cn.data_link = block.data_addr;
    if cn.channel_type == ChannelType::MaxLength && block.data_addr != 0 {
        cn.length_channel = Some(block.data_addr);
    }
    if cn.channel_type == ChannelType::VariableLength
        && block.data_addr != 0
        && block_id(image, block.data_addr)? == "##CG"
    {
        cn.vlsd_record_id = ChannelGroupBlock::from_bytes(block_slice(image, block.data_addr)?)?
            .record_id;
    }

    if level >= ReadLevel::Everything {
        if block.conversion_addr != 0 {
            cn.conversion = Some(read_conversion(image, block.conversion_addr, source, 0)?);
        }
        if block.source_addr != 0 {
            cn.source_information = Some(read_source(image, block.source_addr)?);
        }
        if block.component_addr != 0 && block_id(image, block.component_addr)? == "##CA" {
            cn.channel_array = Some(read_channel_array(image, block.component_addr)?);
        }
    }
    Ok((cn, block.next_ch_addr))
}

fn read_conversion(
    image: &[u8],
    address: u64,
    source: &IndexSource,
    depth: usize,
) -> Result<ChannelConversion> {
    if depth > MAX_CONVERSION_NESTING {
        return Err(Error::ConversionChainTooDeep {
            max_depth: MAX_CONVERSION_NESTING,
        });
    }
    let block = ConversionBlock::from_bytes(block_slice(image, address)?)?;
    let mut cc = ChannelConversion::with_index(address, source);
    cc.name = read_text(image, block.name_addr)?;
    cc.unit = read_comment(image, block.unit_addr)?.text;
    let comment = read_comment(image, block.comment_addr)?;
    cc.description = comment.text;
    cc.metadata = comment.metadata.filter(|md| !md.is_empty());
    cc.conversion_type = ConversionType::from_mdf4(block.conversion_type);
    if block.flags & CC_FLAG_PRECISION_VALID != 0 {
        cc.precision = Some(block.precision);
    }
    if block.flags & CC_FLAG_RANGE_VALID != 0 {
        cc.range = block.phys_range_min.zip(block.phys_range_max);
    }
    cc.status_string = block.flags & CC_FLAG_STATUS_STRING != 0;
    cc.parameters = block.values;

    if cc.conversion_type == ConversionType::Algebraic {
        cc.formula = read_text(image, block.refs.first().copied().unwrap_or(0))?;
    } else {
        cc.references = block
            .refs
            .iter()
            .map(|&link| read_conversion_ref(image, link, source, depth))
            .collect::<Result<Vec<_>>>()?;
    }

    // Inverse conversions of nested entries are never evaluated.
    if depth == 0 && block.inverse_addr != 0 && block.inverse_addr != address {
        cc.inverse = Some(Box::new(read_conversion(
            image,
            block.inverse_addr,
            source,
            depth + 1,
        )?));
    }
    Ok(cc)
}

fn read_conversion_ref(
    image: &[u8],
    link: u64,
    source: &IndexSource,
    depth: usize,
) -> Result<ConversionRef> {
    if link == 0 {
        return Ok(ConversionRef::Empty);
    }
    Ok(match block_id(image, link)?.as_str() {
        "##TX" | "##MD" => ConversionRef::Text(read_text(image, link)?),
        "##CC" => ConversionRef::Conversion(Box::new(read_conversion(
            image,
            link,
            source,
            depth + 1,
        )?)),
        other => {
            mdf_log!(
                Warning,
                "read_conversion",
                "conversion reference {link:#x} points to {other}, ignored"
            );
            ConversionRef::Empty
        }
    })
}

fn read_source(image: &[u8], address: u64) -> Result<SourceInformation> {
    let block = SourceBlock::from_bytes(block_slice(image, address)?)?;
    let mut si = SourceInformation::with_index(address);
    si.name = read_text(image, block.name_addr)?;
    si.path = read_text(image, block.path_addr)?;
    let comment = read_comment(image, block.comment_addr)?;
    si.description = comment.text;
    si.metadata = comment.metadata.filter(|md| !md.is_empty());
    si.source_type = SourceType::from_u8(block.source_type);
    si.bus = SourceBus::from_u8(block.bus_type);
    si.simulated = block.flags & 0x01 != 0;
    Ok(si)
}

fn read_channel_array(image: &[u8], address: u64) -> Result<ChannelArray> {
    let block = ChannelArrayBlock::from_bytes(block_slice(image, address)?)?;
    let mut ca = ChannelArray::with_index(address);
    ca.array_type = ArrayType::from_u8(block.array_type);
    ca.storage = ArrayStorage::from_u8(block.storage);
    ca.flags = block.flags;
    ca.byte_offset_base = block.byte_offset_base;
    ca.inval_bit_pos_base = block.inval_bit_pos_base;
    ca.dimensions = block.dim_sizes;
    Ok(ca)
}

fn read_file_history(image: &[u8], address: u64) -> Result<(FileHistory, u64)> {
    let block = FileHistoryBlock::from_bytes(block_slice(image, address)?)?;
    let mut fh = FileHistory::with_index(address);
    fh.time = block.time_ns;
    let comment = read_comment(image, block.comment_addr)?;
    fh.tool_name = comment.field("tool_id").unwrap_or_default().to_string();
    fh.tool_vendor = comment.field("tool_vendor").unwrap_or_default().to_string();
    fh.tool_version = comment.field("tool_version").unwrap_or_default().to_string();
    fh.user_name = comment.field("user_name").unwrap_or_default().to_string();
    fh.description = comment.text;
    fh.metadata = comment.metadata.filter(|md| !md.properties().is_empty());
    fh.persisted = true;
    Ok((fh, block.next_fh_addr))
}

fn read_attachment(image: &[u8], address: u64) -> Result<(Attachment, u64)> {
    let block = AttachmentBlock::from_bytes(block_slice(image, address)?)?;
    let mut at = Attachment::with_index(address);
    at.creator_index = block.creator_index;
    at.file_name = read_text(image, block.filename_addr)?;
    at.file_type = read_text(image, block.mimetype_addr)?;
    let comment = read_comment(image, block.comment_addr)?;
    at.description = comment.text;
    at.metadata = comment.metadata.filter(|md| !md.is_empty());
    if block.flags & AT_FLAG_MD5_VALID != 0 {
        at.md5 = Some(block.md5_checksum);
    }
    at.embedded = block.flags & AT_FLAG_EMBEDDED != 0;
    at.compressed = block.flags & AT_FLAG_COMPRESSED != 0;
    if at.embedded {
        at.embedded_data = if at.compressed {
            inflate(&block.embedded_data)?
        } else {
            block.embedded_data
        };
    }
    at.persisted = true;
    Ok((at, block.next_at_addr))
}

#[cfg(feature = "compression")]
fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    miniz_oxide::inflate::decompress_to_vec_zlib(data).map_err(|e| {
        Error::BlockSerializationError(alloc::format!("attachment decompression failed: {e:?}"))
    })
}

#[cfg(not(feature = "compression"))]
fn inflate(_data: &[u8]) -> Result<Vec<u8>> {
    Err(Error::UnsupportedFeature(
        "compressed attachments need the `compression` feature".into(),
    ))
}

fn read_event(image: &[u8], address: u64) -> Result<(Event, u64)> {
    let block = EventBlock::from_bytes(block_slice(image, address)?)?;
    let mut ev = Event::with_index(address);
    ev.name = read_text(image, block.name_addr)?;
    ev.group_name = read_text(image, block.group_name_addr)?;
    let comment = read_comment(image, block.comment_addr)?;
    let seconds = |field: &str| {
        comment
            .field(field)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    ev.pre_trig = seconds("pre_trigger_interval");
    ev.post_trig = seconds("post_trigger_interval");
    ev.description = comment.text.clone();
    ev.metadata = comment.metadata.filter(|md| !md.properties().is_empty());
    ev.event_type = EventType::from_u8(block.event_type);
    ev.sync_type = EventSyncType::from_u8(block.sync_type);
    ev.range_type = RangeType::from_u8(block.range_type);
    ev.cause = EventCause::from_u8(block.cause);
    ev.creator_index = block.creator_index;
    ev.sync_value = block.sync_base_value;
    ev.sync_factor = block.sync_factor;
    ev.persisted = true;
    Ok((ev, block.next_ev_addr))
}
