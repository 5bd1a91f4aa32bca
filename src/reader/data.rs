//! Sample materialization: payload chains to per-group records.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::blocks::{
    BlockHeader, BlockParse, DataBlock, DataListBlock, DzBlock, HeaderListBlock, block_slice,
    read_u16, read_u32, read_u64, u64_to_usize,
};
use crate::logging::mdf_log;
use crate::model::{DataGroup, SampleData};
use crate::types::ChannelType;
use crate::{Error, Result};

/// HL -> DL -> payload is the deepest legal nesting.
const MAX_LIST_DEPTH: usize = 3;

/// Concatenates the payload of the block chain starting at `address`.
///
/// `accepted` lists the plain payload ids allowed at the leaves (`##DT` for
/// records, `##SD` for signal data). DZ leaves are inflated, DL chains and HL
/// headers are followed. With `open_tail` set, a leaf whose length field was
/// never patched extends to the end of the file.
pub(crate) fn collect_payload(
    image: &[u8],
    address: u64,
    accepted: &[&str],
    open_tail: bool,
) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    let mut visited = BTreeSet::new();
    append_block(image, address, accepted, open_tail, &mut payload, &mut visited, 0)?;
    Ok(payload)
}

fn append_block(
    image: &[u8],
    address: u64,
    accepted: &[&str],
    open_tail: bool,
    payload: &mut Vec<u8>,
    visited: &mut BTreeSet<u64>,
    depth: usize,
) -> Result<()> {
    if address == 0 {
        return Ok(());
    }
    if depth > MAX_LIST_DEPTH || !visited.insert(address) {
        return Err(Error::BlockLinkError(format!(
            "data block chain loops or nests too deep at {address:#x}"
        )));
    }
    let bytes = block_slice(image, address)?;
    let header = BlockHeader::from_bytes(bytes)?;

    match header.id.as_str() {
        "##DL" => {
            let mut next = address;
            while next != 0 {
                if next != address && !visited.insert(next) {
                    return Err(Error::BlockLinkError(format!(
                        "data list chain loops at {next:#x}"
                    )));
                }
                let list = DataListBlock::from_bytes(block_slice(image, next)?)?;
                for &link in &list.data_links {
                    append_block(image, link, accepted, open_tail, payload, visited, depth + 1)?;
                }
                next = list.next;
            }
        }
        "##HL" => {
            let list = HeaderListBlock::from_bytes(bytes)?;
            append_block(image, list.first_dl, accepted, open_tail, payload, visited, depth + 1)?;
        }
        "##DZ" => {
            let block = DzBlock::from_bytes(bytes)?;
            payload.extend_from_slice(&block.decompress()?);
        }
        id if accepted.contains(&id) => {
            let block = match DataBlock::from_bytes_any(bytes, accepted) {
                Ok(block) if !(open_tail && block.header.length == 24) => block,
                Ok(_) | Err(Error::TooShortBuffer { .. }) if open_tail => {
                    mdf_log!(
                        Info,
                        "collect_payload",
                        "reading unfinished {id} block at {address:#x} to end of file"
                    );
                    DataBlock::from_bytes_unfinalized(bytes)?
                }
                Ok(block) => block,
                Err(e) => return Err(e),
            };
            payload.extend_from_slice(block.data);
        }
        unexpected => {
            return Err(Error::BlockIDError {
                actual: unexpected.into(),
                expected: format!("{} / ##DL / ##HL / ##DZ", accepted.join(" / ")),
            });
        }
    }
    Ok(())
}

fn read_record_id(bytes: &[u8], size: u8) -> Option<u64> {
    match size {
        1 => bytes.first().map(|&b| u64::from(b)),
        2 => (bytes.len() >= 2).then(|| u64::from(read_u16(bytes, 0))),
        4 => (bytes.len() >= 4).then(|| u64::from(read_u32(bytes, 0))),
        8 => (bytes.len() >= 8).then(|| read_u64(bytes, 0)),
        _ => None,
    }
}

/// Where the entries of a VLSD channel group end up: group position and
/// channel index of the channel referencing it.
fn vlsd_targets(dg: &DataGroup) -> BTreeMap<u64, (usize, u64)> {
    let mut targets = BTreeMap::new();
    for (position, cg) in dg.channel_groups.iter().enumerate() {
        for cn in &cg.channels {
            if cn.channel_type == ChannelType::VariableLength && cn.data_link != 0 {
                targets.insert(cn.data_link, (position, cn.index));
            }
        }
    }
    targets
}

/// Splits the MDF4 record stream of `dg` into its channel groups.
pub(crate) fn read_data_group4(image: &[u8], dg: &mut DataGroup, open_tail: bool) -> Result<()> {
    let id_size = dg.record_id_size;
    if !matches!(id_size, 0 | 1 | 2 | 4 | 8) {
        return Err(Error::BlockSerializationError(format!(
            "invalid record id size {id_size}"
        )));
    }
    if dg.channel_groups.is_empty() {
        dg.is_read = true;
        return Ok(());
    }
    let record_groups = dg.channel_groups.iter().filter(|cg| !cg.is_vlsd()).count();
    if id_size == 0 && dg.channel_groups.len() > 1 {
        return Err(Error::BlockSerializationError(format!(
            "data group {:#x} holds {} channel groups without record ids",
            dg.index,
            dg.channel_groups.len()
        )));
    }
    mdf_log!(
        Debug,
        "read_data_group4",
        "data group {:#x}: {record_groups} record groups, {id_size} byte ids",
        dg.index
    );

    let payload = collect_payload(image, dg.data_link, &["##DT"], open_tail)?;
    let targets = vlsd_targets(dg);
    let by_record_id: BTreeMap<u64, usize> = dg
        .channel_groups
        .iter()
        .enumerate()
        .map(|(position, cg)| (cg.record_id, position))
        .collect();

    let mut samples: Vec<SampleData> = dg
        .channel_groups
        .iter()
        .map(|cg| SampleData::new(cg.record_size()))
        .collect();
    // Entries of each VLSD group keyed by their offset in that group's stream.
    let mut vlsd_entries: BTreeMap<(usize, u64), BTreeMap<u64, Vec<u8>>> = BTreeMap::new();
    let mut vlsd_offsets = vec![0u64; dg.channel_groups.len()];
    let mut vlsd_counts = vec![0u64; dg.channel_groups.len()];

    let id_len = usize::from(id_size);
    let mut pos = 0usize;
    while pos < payload.len() {
        let (position, body_start) = if id_len == 0 {
            (0, pos)
        } else {
            let Some(record_id) = read_record_id(&payload[pos..], id_size) else {
                mdf_log!(Warning, "read_data_group4", "truncated record id at offset {pos}");
                break;
            };
            match by_record_id.get(&record_id) {
                Some(&position) => (position, pos + id_len),
                None => {
                    mdf_log!(
                        Error,
                        "read_data_group4",
                        "unknown record id {record_id} at offset {pos}, remaining data skipped"
                    );
                    break;
                }
            }
        };

        let cg = &dg.channel_groups[position];
        if cg.is_vlsd() {
            let Some(len_bytes) = payload.get(body_start..body_start + 4) else {
                mdf_log!(Warning, "read_data_group4", "truncated VLSD entry at offset {pos}");
                break;
            };
            let len = read_u32(len_bytes, 0) as usize;
            let Some(value) = payload.get(body_start + 4..body_start + 4 + len) else {
                mdf_log!(Warning, "read_data_group4", "truncated VLSD entry at offset {pos}");
                break;
            };
            if let Some(&target) = targets.get(&cg.index) {
                vlsd_entries
                    .entry(target)
                    .or_default()
                    .insert(vlsd_offsets[position], value.to_vec());
            }
            vlsd_offsets[position] += 4 + len as u64;
            vlsd_counts[position] += 1;
            pos = body_start + 4 + len;
        } else {
            let size = cg.record_size();
            let Some(record) = payload.get(body_start..body_start + size) else {
                mdf_log!(Warning, "read_data_group4", "truncated record at offset {pos}");
                break;
            };
            samples[position].push_record(record);
            pos = body_start + size;
        }
    }

    for ((position, channel_index), entries) in vlsd_entries {
        let Some(cn) = dg.channel_groups[position].channel_by_index(channel_index) else {
            continue;
        };
        let offset_at = cn.byte_offset as usize;
        let data = &mut samples[position];
        let values = (0..data.nof_records())
            .map(|sample| {
                let offset = data
                    .record(sample)
                    .and_then(|r| r.get(offset_at..offset_at.checked_add(8)?))
                    .map(|slot| read_u64(slot, 0))?;
                entries.get(&offset).cloned()
            })
            .collect();
        data.vlsd.insert(channel_index, values);
    }

    for ((cg, mut data), vlsd_count) in dg.channel_groups.iter_mut().zip(samples).zip(vlsd_counts) {
        if cg.is_vlsd() {
            cg.nof_samples = vlsd_count;
            continue;
        }
        // Signal data streams referenced by offset from the record.
        for cn in cg
            .channels
            .iter()
            .filter(|cn| cn.channel_type == ChannelType::VariableLength && cn.data_link != 0)
        {
            let target = BlockHeader::from_bytes(block_slice(image, cn.data_link)?)?;
            if target.id == "##CG" {
                continue;
            }
            let stream = collect_payload(image, cn.data_link, &["##SD"], false)?;
            let offset_at = cn.byte_offset as usize;
            let values = (0..data.nof_records())
                .map(|sample| {
                    data.record(sample)
                        .and_then(|r| r.get(offset_at..offset_at.checked_add(8)?))
                        .and_then(|slot| sd_entry(&stream, read_u64(slot, 0)))
                })
                .collect();
            data.vlsd.insert(cn.index, values);
        }

        let loaded = data.nof_records() as u64;
        if loaded != cg.nof_samples {
            mdf_log!(
                Debug,
                "read_data_group4",
                "group '{}' holds {loaded} records, cycle count says {}",
                cg.name,
                cg.nof_samples
            );
        }
        cg.nof_samples = loaded;
        cg.samples = data;
    }
    dg.is_read = true;
    Ok(())
}

fn sd_entry(stream: &[u8], offset: u64) -> Option<Vec<u8>> {
    let start = u64_to_usize(offset, "signal data offset").ok()?;
    let body = start.checked_add(4)?;
    let len = read_u32(stream.get(start..body)?, 0) as usize;
    stream.get(body..body.checked_add(len)?).map(<[u8]>::to_vec)
}

/// Splits MDF3 raw data (no block header) into its channel groups.
///
/// `record_id_count` is 0, 1 (u8 id before each record) or 2 (u8 id before
/// and after).
pub(crate) fn read_data_group3(image: &[u8], dg: &mut DataGroup, record_id_count: u16) -> Result<()> {
    if dg.data_link == 0 || dg.channel_groups.is_empty() {
        dg.is_read = true;
        for cg in &mut dg.channel_groups {
            cg.samples = SampleData::new(cg.record_size());
            cg.nof_samples = 0;
        }
        return Ok(());
    }
    if record_id_count == 0 && dg.channel_groups.len() > 1 {
        return Err(Error::BlockSerializationError(format!(
            "MDF3 data group {:#x} holds {} channel groups without record ids",
            dg.index,
            dg.channel_groups.len()
        )));
    }
    let id_len = usize::from(record_id_count.min(2));
    let expected: usize = dg
        .channel_groups
        .iter()
        .map(|cg| (cg.record_size() + id_len) * cg.nof_samples as usize)
        .sum();
    let start = u64_to_usize(dg.data_link, "MDF3 data address")?;
    let available = image.len().saturating_sub(start);
    if available < expected {
        mdf_log!(
            Warning,
            "read_data_group3",
            "data group {:#x} expects {expected} bytes, file holds {available}",
            dg.index
        );
    }
    let begin = start.min(image.len());
    let raw = &image[begin..begin + expected.min(available)];

    let by_record_id: BTreeMap<u64, usize> = dg
        .channel_groups
        .iter()
        .enumerate()
        .map(|(position, cg)| (cg.record_id, position))
        .collect();
    let mut samples: Vec<SampleData> = dg
        .channel_groups
        .iter()
        .map(|cg| SampleData::new(cg.record_size()))
        .collect();

    let mut pos = 0usize;
    while pos < raw.len() {
        let position = if id_len == 0 {
            0
        } else {
            let record_id = u64::from(raw[pos]);
            match by_record_id.get(&record_id) {
                Some(&position) => position,
                None => {
                    mdf_log!(
                        Error,
                        "read_data_group3",
                        "unknown record id {record_id} at offset {pos}, remaining data skipped"
                    );
                    break;
                }
            }
        };
        let body_start = pos + usize::from(id_len > 0);
        let size = samples[position].record_size;
        let Some(record) = raw.get(body_start..body_start + size) else {
            break;
        };
        samples[position].push_record(record);
        pos = body_start + size + usize::from(id_len == 2);
    }

    for (cg, data) in dg.channel_groups.iter_mut().zip(samples) {
        cg.nof_samples = data.nof_records() as u64;
        cg.samples = data;
    }
    dg.is_read = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::payload_block_bytes;

    fn place(image: &mut Vec<u8>, block: &[u8]) -> u64 {
        while image.len() % 8 != 0 {
            image.push(0);
        }
        let address = image.len() as u64;
        image.extend_from_slice(block);
        address
    }

    #[test]
    fn follows_data_lists() {
        let mut image = vec![0u8; 64];
        let first = place(&mut image, &payload_block_bytes("##DT", &[1, 2, 3]).unwrap());
        let second = place(&mut image, &payload_block_bytes("##DT", &[4, 5]).unwrap());
        let list = DataListBlock::new(vec![first, second], vec![0, 3]);
        let dl = place(&mut image, &list.to_bytes().unwrap());

        let payload = collect_payload(&image, dl, &["##DT"], false).unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn open_tail_reads_to_end_of_file() {
        let mut image = vec![0u8; 64];
        let mut block = payload_block_bytes("##DT", &[]).unwrap();
        block.extend_from_slice(&[9, 8, 7, 6]);
        let dt = place(&mut image, &block);

        assert!(collect_payload(&image, dt, &["##DT"], false).unwrap().is_empty());
        assert_eq!(collect_payload(&image, dt, &["##DT"], true).unwrap(), vec![9, 8, 7, 6]);
    }

    #[test]
    fn rejects_foreign_leaves() {
        let mut image = vec![0u8; 64];
        let sd = place(&mut image, &payload_block_bytes("##SD", &[1]).unwrap());
        assert!(collect_payload(&image, sd, &["##DT"], false).is_err());
    }

    #[test]
    fn signal_data_entries_by_offset() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&3u32.to_le_bytes());
        stream.extend_from_slice(b"abc");
        stream.extend_from_slice(&1u32.to_le_bytes());
        stream.push(b'z');
        assert_eq!(sd_entry(&stream, 0), Some(b"abc".to_vec()));
        assert_eq!(sd_entry(&stream, 7), Some(b"z".to_vec()));
        assert_eq!(sd_entry(&stream, 100), None);
    }

    #[test]
    fn signal_data_offsets_near_the_limit_are_absent() {
        let stream = vec![0u8; 16];
        assert_eq!(sd_entry(&stream, u64::MAX - 1), None);
        assert_eq!(sd_entry(&stream, u64::MAX), None);
    }
}
