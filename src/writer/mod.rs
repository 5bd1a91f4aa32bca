//! Measurement writer for MDF3 and MDF4 files.
//!
//! [`MdfWriter`] walks through the states of a measurement:
//!
//! ```text
//! Create ──init_measurement──▶ Init ──start_measurement──▶ StartMeas
//!                                │                             │
//!                                │                      stop_measurement
//!                                │                             ▼
//!                                └──────finalize──────▶ Finalize ◀──finalize── StopMeas
//! ```
//!
//! While in `Create` the caller builds data groups, channel groups and
//! channels. `init_measurement` computes record layouts and writes the block
//! tree; from then on the structure is fixed. Samples are staged per channel
//! with [`Channel::set_channel_value`](crate::Channel::set_channel_value) and
//! committed with [`MdfWriter::save_sample`]. Samples saved before
//! `start_measurement` wait in a pre-trigger queue that keeps the last
//! [`MdfWriter::pre_trig_time`] seconds.
//!
//! MDF4 records are flushed as data blocks according to the [`FlushPolicy`];
//! every flush leaves a readable file behind. The file only reads as
//! finalized once [`MdfWriter::finalize`] succeeded.
//!
//! # Example
//!
//! ```no_run
//! use mdf_rs::{ChannelType, DataType, MdfWriter, Result, SyncType, WriterType};
//!
//! fn write_ramp() -> Result<()> {
//!     let mut writer = MdfWriter::new(WriterType::Mdf4Basic);
//!     writer.init("ramp.mf4")?;
//!
//!     let dg = writer.create_data_group()?;
//!     let cg = dg.create_channel_group();
//!     cg.set_name("Ramp");
//!     let time = cg.create_channel();
//!     time.set_name("Time");
//!     time.set_channel_type(ChannelType::Master);
//!     time.set_sync_type(SyncType::Time);
//!     time.set_data_type(DataType::FloatLE);
//!     let value = cg.create_channel();
//!     value.set_name("Value");
//!     value.set_data_type(DataType::UnsignedIntegerLE);
//!     value.set_bit_count(16);
//!     let group = cg.index();
//!
//!     writer.init_measurement()?;
//!     writer.start_measurement(0)?;
//!     for i in 0..100u16 {
//!         if let Some(cn) = writer.channel_group_mut(group).and_then(|cg| cg.channel_by_name_mut("Value")) {
//!             cn.set_channel_value(i, true);
//!         }
//!         writer.save_sample(group, u64::from(i) * 10_000_000)?;
//!     }
//!     writer.stop_measurement(1_000_000_000)?;
//!     writer.finalize()
//! }
//! ```

mod bus;
mod io;
mod layout;
mod mdf3;
mod mdf4;
mod streaming;
mod traits;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::format;
use alloc::string::ToString;
use core::fmt;
use std::path::Path;

use crate::blocks::identification_block::UNFIN_UPDATE_CG_COUNTER;
use crate::logging::mdf_log;
use crate::model::{ChannelGroup, DataGroup, Header, MdfFile};
use crate::reader::MdfReader;
use crate::{Error, Result};

use io::BlockSink;
use layout::{EncodedRecord, RecordStream};
use streaming::FlushState;

pub use streaming::{DEFAULT_FLUSH_BYTES, FlushPolicy, StreamingConfig};
pub use traits::{MdfWrite, VecWriter};
pub use traits::{DEFAULT_IO_BUFFER, FileWriter};

/// Kind of file a writer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WriterType {
    /// MDF 3.30 with plain channel groups.
    Mdf3Basic,
    /// MDF 4.10 with plain channel groups.
    #[default]
    Mdf4Basic,
    /// MDF 4.10 bus logger, see [`MdfWriter::create_bus_log_configuration`].
    BusLogger,
    /// MDF 4.10 holding converted data; records are written when the
    /// measurement stops unless a flush policy is set.
    Converter,
}

impl WriterType {
    pub fn is_mdf4(self) -> bool {
        !matches!(self, WriterType::Mdf3Basic)
    }
}

/// Storage of byte array payloads in bus logging groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageType {
    /// Inline in every record, [`MdfWriter::max_length`] bytes wide.
    #[default]
    FixedLength,
    /// Out of line in a VLSD channel group.
    Vlsd,
    /// Inline slot of `max_length` bytes plus a length channel.
    Mlsd,
}

/// Position in the measurement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WriteState {
    #[default]
    Create,
    Init,
    StartMeas,
    StopMeas,
    Finalize,
}

impl fmt::Display for WriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteState::Create => "create",
            WriteState::Init => "init",
            WriteState::StartMeas => "start measurement",
            WriteState::StopMeas => "stop measurement",
            WriteState::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Options read when the measurement is initialised.
#[derive(Debug, Clone, PartialEq)]
struct WriterSettings {
    compress_data: bool,
    pre_trig_time: f64,
    storage_type: StorageType,
    max_length: u32,
    bus_type: u16,
    flush_policy: Option<FlushPolicy>,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            compress_data: false,
            pre_trig_time: 0.0,
            storage_type: StorageType::FixedLength,
            max_length: 8,
            bus_type: 0,
            flush_policy: None,
        }
    }
}

/// A sample waiting for `start_measurement`.
#[derive(Debug)]
struct PendingSample {
    time: u64,
    cg_index: u64,
    record: EncodedRecord,
}

/// Writer of one measurement file.
///
/// The writer owns the [`MdfFile`] it writes; groups and channels are
/// reached through [`MdfWriter::file_mut`] or the shortcuts on the writer.
/// Structural changes after [`MdfWriter::init_measurement`] are not written.
#[derive(Debug)]
pub struct MdfWriter<W: MdfWrite = FileWriter> {
    writer_type: WriterType,
    file: MdfFile,
    sink: Option<BlockSink<W>>,
    state: WriteState,
    settings: WriterSettings,
    is_file_new: bool,
    /// Channel group index to (data group, channel group) position.
    groups: BTreeMap<u64, (usize, usize)>,
    streams: BTreeMap<usize, RecordStream>,
    pre_trig: VecDeque<PendingSample>,
    flush_state: FlushState,
    start_time: u64,
    stop_time: Option<u64>,
}

fn new_file(writer_type: WriterType) -> MdfFile {
    if writer_type.is_mdf4() {
        MdfFile::new_mdf4()
    } else {
        MdfFile::new_mdf3()
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

impl MdfWriter<FileWriter> {
    /// Writer in state `Create`; [`MdfWriter::init`] binds it to a file.
    pub fn new(writer_type: WriterType) -> Self {
        Self::with_parts(writer_type, new_file(writer_type), None)
    }

    /// Binds the writer to `path`.
    ///
    /// An existing MDF file is read and opened for appending: its structure
    /// becomes visible through [`MdfWriter::file`] and new data groups are
    /// added behind the existing ones. Anything else at `path` is replaced.
    /// Returns [`MdfWriter::is_file_new`].
    pub fn init<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        self.expect_state(WriteState::Create, "init")?;
        let path = path.as_ref();
        let existing = path.exists().then(|| MdfReader::new(path)).filter(MdfReader::is_ok);
        if let Some(mut reader) = existing {
            reader.read_everything_but_data()?;
            let Some(file) = reader.into_file() else {
                return Err(Error::InvalidState(format!("{} not parsed", path.display())));
            };
            self.file = file;
            self.sink = Some(BlockSink::new(FileWriter::open_existing(path, DEFAULT_IO_BUFFER)?));
            self.is_file_new = false;
            mdf_log!(
                Info,
                "MdfWriter::init",
                "appending to {} ({} data groups)",
                path.display(),
                self.file.data_groups().len()
            );
        } else {
            self.file = new_file(self.writer_type);
            self.sink = Some(BlockSink::new(FileWriter::new(path)?));
            self.is_file_new = true;
            mdf_log!(Info, "MdfWriter::init", "creating {}", path.display());
        }
        self.file.set_file_name(&path.to_string_lossy());
        Ok(self.is_file_new)
    }
}

impl MdfWriter<VecWriter> {
    /// Writer building a new file in memory.
    pub fn in_memory(writer_type: WriterType) -> Self {
        Self::with_parts(writer_type, new_file(writer_type), Some(BlockSink::new(VecWriter::new())))
    }
}

impl<W: MdfWrite> MdfWriter<W> {
    fn with_parts(writer_type: WriterType, file: MdfFile, sink: Option<BlockSink<W>>) -> Self {
        Self {
            writer_type,
            file,
            sink,
            state: WriteState::Create,
            settings: WriterSettings::default(),
            is_file_new: true,
            groups: BTreeMap::new(),
            streams: BTreeMap::new(),
            pre_trig: VecDeque::new(),
            flush_state: FlushState::default(),
            start_time: 0,
            stop_time: None,
        }
    }

    /// Writer starting a new file on `writer`.
    pub fn with_writer(writer_type: WriterType, writer: W) -> Self {
        Self::with_parts(writer_type, new_file(writer_type), Some(BlockSink::new(writer)))
    }

    fn expect_state(&self, expected: WriteState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState(format!(
                "{operation} needs state {expected}, writer is in {}",
                self.state
            )));
        }
        Ok(())
    }

    fn sink_mut(&mut self) -> Result<&mut BlockSink<W>> {
        self.sink
            .as_mut()
            .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))
    }

    pub fn writer_type(&self) -> WriterType {
        self.writer_type
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    /// False when the writer appends to a file that already existed.
    pub fn is_file_new(&self) -> bool {
        self.is_file_new
    }

    /// Measurement start in ns since 1970; 0 before `start_measurement`.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<u64> {
        self.stop_time
    }

    pub fn file(&self) -> &MdfFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut MdfFile {
        &mut self.file
    }

    /// Header to fill in before `init_measurement`.
    pub fn header_mut(&mut self) -> &mut Header {
        self.file.header_mut()
    }

    /// Takes the file model out of the writer.
    pub fn into_file(self) -> MdfFile {
        self.file
    }

    /// The underlying byte sink, e.g. the [`VecWriter`] of an in-memory writer.
    pub fn into_inner(self) -> Option<W> {
        self.sink.map(BlockSink::into_inner)
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref().map(BlockSink::get_ref)
    }

    /// Appends a data group. Only allowed before `init_measurement`.
    pub fn create_data_group(&mut self) -> Result<&mut DataGroup> {
        self.expect_state(WriteState::Create, "create_data_group")?;
        Ok(self.file.create_data_group())
    }

    /// Channel group with object index `cg_index`, e.g. to stage values.
    pub fn channel_group_mut(&mut self, cg_index: u64) -> Option<&mut ChannelGroup> {
        if let Some(&(dg, cg)) = self.groups.get(&cg_index) {
            return self.file.header.data_groups.get_mut(dg)?.channel_groups.get_mut(cg);
        }
        self.file
            .header
            .data_groups
            .iter_mut()
            .flat_map(|dg| dg.channel_groups.iter_mut())
            .find(|cg| cg.index == cg_index)
    }

    pub fn compress_data(&self) -> bool {
        self.settings.compress_data
    }

    /// Stores MDF4 data blocks deflated (DZ blocks).
    pub fn set_compress_data(&mut self, compress: bool) {
        self.settings.compress_data = compress;
    }

    pub fn pre_trig_time(&self) -> f64 {
        self.settings.pre_trig_time
    }

    /// Seconds of samples kept from before `start_measurement`.
    pub fn set_pre_trig_time(&mut self, seconds: f64) {
        self.settings.pre_trig_time = seconds.max(0.0);
    }

    pub fn storage_type(&self) -> StorageType {
        self.settings.storage_type
    }

    pub fn set_storage_type(&mut self, storage: StorageType) {
        self.settings.storage_type = storage;
    }

    pub fn max_length(&self) -> u32 {
        self.settings.max_length
    }

    /// Byte width of fixed and max length payload slots.
    pub fn set_max_length(&mut self, bytes: u32) {
        self.settings.max_length = bytes.max(1);
    }

    /// Mask of [`MdfBusType`](crate::MdfBusType) bits.
    pub fn bus_type(&self) -> u16 {
        self.settings.bus_type
    }

    pub fn set_bus_type(&mut self, mask: u16) {
        self.settings.bus_type = mask;
    }

    /// Effective flush policy; MDF3 files always buffer until the
    /// measurement stops.
    pub fn flush_policy(&self) -> FlushPolicy {
        if !self.file.is_mdf4() {
            return FlushPolicy::Manual;
        }
        self.settings.flush_policy.unwrap_or(match self.writer_type {
            WriterType::Converter => FlushPolicy::Manual,
            _ => StreamingConfig::default().policy,
        })
    }

    pub fn set_flush_policy(&mut self, policy: FlushPolicy) {
        self.settings.flush_policy = Some(policy);
    }

    fn effective_compression(&mut self) -> bool {
        if !self.settings.compress_data {
            return false;
        }
        if !self.file.is_mdf4() {
            mdf_log!(Warning, "init_measurement", "MDF3 has no compressed blocks, data stored as is");
            self.settings.compress_data = false;
        } else if cfg!(not(feature = "compression")) {
            mdf_log!(Warning, "init_measurement", "built without compression, data stored as is");
            self.settings.compress_data = false;
        }
        self.settings.compress_data
    }

    /// Locks the structure, lays out the records and writes the block tree.
    pub fn init_measurement(&mut self) -> Result<()> {
        self.expect_state(WriteState::Create, "init_measurement")?;
        self.effective_compression();
        let is_mdf4 = self.file.is_mdf4();
        let max_length = self.settings.max_length;

        if is_mdf4 {
            let is_new = self.is_file_new;
            let fh = self.file.header.create_file_history();
            fh.time = now_ns();
            fh.tool_name = "mdf-rs".to_string();
            fh.tool_version = env!("CARGO_PKG_VERSION").to_string();
            fh.description = if is_new { "created" } else { "appended" }.to_string();
        }

        let Self {
            file,
            sink,
            is_file_new,
            groups,
            streams,
            ..
        } = &mut *self;
        let sink = sink
            .as_mut()
            .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))?;

        file.identification.mark_unfinalized(UNFIN_UPDATE_CG_COUNTER);
        let identification = file.identification.to_bytes()?;
        if *is_file_new {
            sink.write_block(&identification)?;
            if is_mdf4 {
                mdf4::write_header(sink, &file.header)?;
            } else {
                mdf3::write_header(sink, &file.header)?;
            }
        } else {
            sink.patch(0, &identification)?;
            register_existing(sink, file);
        }

        let mut previous = file
            .header
            .data_groups
            .iter()
            .filter(|dg| dg.persisted)
            .last()
            .and_then(|dg| sink.position_of(dg.index));
        let dg_count = file.header.data_groups.len() as u16;
        for (dg_pos, dg) in file.header.data_groups.iter_mut().enumerate() {
            if dg.persisted {
                continue;
            }
            layout::prepare_data_group(dg, is_mdf4, max_length)?;
            if is_mdf4 {
                mdf4::write_data_group(sink, dg, &mut previous)?;
            } else {
                mdf3::write_data_group(sink, dg, &mut previous, dg_count)?;
            }
            dg.persisted = true;
            for (cg_pos, cg) in dg.channel_groups.iter().enumerate() {
                groups.insert(cg.index, (dg_pos, cg_pos));
            }
            streams.insert(dg_pos, RecordStream::new(dg.record_id_size));
        }

        if is_mdf4 {
            mdf4::write_file_histories(sink, &mut file.header)?;
            mdf4::write_attachments(sink, &mut file.header)?;
            mdf4::write_events(sink, &mut file.header)?;
        } else if !file.header.attachments.is_empty() || !file.header.events.is_empty() {
            mdf_log!(Info, "init_measurement", "MDF3 files carry no attachments or events");
        }
        sink.flush()?;

        mdf_log!(
            Debug,
            "MdfWriter::init_measurement",
            "{} channel groups ready, flush policy {:?}",
            self.groups.len(),
            self.flush_policy()
        );
        self.state = WriteState::Init;
        Ok(())
    }

    /// Starts the measurement at `start_time` (ns since 1970, UTC).
    ///
    /// Master channels store the time relative to `start_time` in seconds.
    /// Queued pre-trigger samples within [`MdfWriter::pre_trig_time`] before
    /// the start are written first.
    pub fn start_measurement(&mut self, start_time: u64) -> Result<()> {
        self.expect_state(WriteState::Init, "start_measurement")?;
        self.start_time = start_time;
        if self.is_file_new && start_time >= self.file.header.start_time {
            self.file.header.start_time = start_time;
            let is_mdf4 = self.file.is_mdf4();
            let Self { file, sink, .. } = &mut *self;
            let sink = sink
                .as_mut()
                .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))?;
            if is_mdf4 {
                mdf4::patch_start_time(sink, start_time)?;
            } else {
                mdf3::patch_start_time(sink, &file.header)?;
            }
        }
        self.state = WriteState::StartMeas;

        let window = self.pre_trig_ns();
        let queued = core::mem::take(&mut self.pre_trig);
        let mut committed = 0usize;
        for sample in queued {
            if sample.time.saturating_add(window) >= start_time {
                self.commit(sample)?;
                committed += 1;
            }
        }
        mdf_log!(
            Info,
            "MdfWriter::start_measurement",
            "measurement started at {start_time} ns, {committed} pre-trigger samples"
        );
        Ok(())
    }

    /// Stops sampling and writes all buffered records.
    pub fn stop_measurement(&mut self, stop_time: u64) -> Result<()> {
        self.expect_state(WriteState::StartMeas, "stop_measurement")?;
        self.stop_time = Some(stop_time);
        if self.file.is_mdf4() {
            self.flush()?;
        } else {
            let Self {
                file, sink, streams, ..
            } = &mut *self;
            let sink = sink
                .as_mut()
                .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))?;
            for (&dg_pos, stream) in streams.iter_mut() {
                if let Some(dg) = file.header.data_groups.get(dg_pos) {
                    mdf3::write_data(sink, dg, stream)?;
                }
            }
            sink.flush()?;
        }
        self.state = WriteState::StopMeas;
        mdf_log!(
            Info,
            "MdfWriter::stop_measurement",
            "measurement stopped at {stop_time} ns after {} records",
            self.flush_state.total_records
        );
        Ok(())
    }

    /// Completes the file and marks it finalized.
    ///
    /// The identification block is rewritten last, so a failure on the way
    /// leaves a file that still reads as unfinalized.
    pub fn finalize(&mut self) -> Result<()> {
        if !matches!(self.state, WriteState::Init | WriteState::StopMeas) {
            return Err(Error::InvalidState(format!(
                "finalize needs state init or stop measurement, writer is in {}",
                self.state
            )));
        }
        if !self.pre_trig.is_empty() {
            mdf_log!(
                Debug,
                "MdfWriter::finalize",
                "{} pre-trigger samples dropped",
                self.pre_trig.len()
            );
            self.pre_trig.clear();
        }
        let is_mdf4 = self.file.is_mdf4();
        let Self { file, sink, .. } = &mut *self;
        let sink = sink
            .as_mut()
            .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))?;
        if is_mdf4 {
            mdf4::write_file_histories(sink, &mut file.header)?;
            mdf4::write_attachments(sink, &mut file.header)?;
            mdf4::write_events(sink, &mut file.header)?;
        }
        sink.flush()?;

        let mut identification = file.identification.clone();
        identification.mark_finalized();
        sink.patch(0, &identification.to_bytes()?)?;
        sink.flush()?;
        file.identification = identification;

        self.state = WriteState::Finalize;
        mdf_log!(Info, "MdfWriter::finalize", "{} finalized", self.file.file_name());
        Ok(())
    }

    fn pre_trig_ns(&self) -> u64 {
        (self.settings.pre_trig_time * 1e9) as u64
    }

    /// Encodes the staged values of channel group `cg_index` as one sample
    /// at `time` (ns since 1970).
    ///
    /// Before `start_measurement` the sample goes to the pre-trigger queue.
    pub fn save_sample(&mut self, cg_index: u64, time: u64) -> Result<()> {
        let Some(&(dg_pos, cg_pos)) = self.groups.get(&cg_index) else {
            return Err(Error::NotFound(format!("channel group {cg_index} is not being written")));
        };
        let record = match self.file.header.data_groups[dg_pos].channel_groups.get(cg_pos) {
            Some(cg) => layout::encode_record(cg)?,
            None => return Err(Error::NotFound(format!("channel group {cg_index}"))),
        };
        let sample = PendingSample {
            time,
            cg_index,
            record,
        };
        match self.state {
            WriteState::Init => {
                self.pre_trig.push_back(sample);
                let window = self.pre_trig_ns();
                while self
                    .pre_trig
                    .front()
                    .is_some_and(|s| s.time.saturating_add(window) < time)
                {
                    self.pre_trig.pop_front();
                }
                Ok(())
            }
            WriteState::StartMeas => self.commit(sample),
            other => Err(Error::InvalidState(format!("save_sample in state {other}"))),
        }
    }

    fn commit(&mut self, mut sample: PendingSample) -> Result<()> {
        let Some(&(dg_pos, cg_pos)) = self.groups.get(&sample.cg_index) else {
            return Err(Error::NotFound(format!("channel group {}", sample.cg_index)));
        };
        let seconds = (i128::from(sample.time) - i128::from(self.start_time)) as f64 / 1e9;
        let dg = &mut self.file.header.data_groups[dg_pos];
        let cg = &mut dg.channel_groups[cg_pos];
        layout::stamp_master(cg, &mut sample.record.data, seconds)?;
        cg.nof_samples += 1;
        let record_id = cg.record_id;

        let vlsd_ids: alloc::vec::Vec<u64> = sample.record.vlsd.iter().map(|(id, _, _)| *id).collect();
        for id in vlsd_ids {
            if let Some(vlsd) = dg.channel_groups.iter_mut().find(|c| c.record_id == id && c.is_vlsd()) {
                vlsd.nof_samples += 1;
            }
        }

        let Some(stream) = self.streams.get_mut(&dg_pos) else {
            return Err(Error::InvalidState(format!("no record stream for data group {dg_pos}")));
        };
        let before = stream.pending.len();
        stream.push(record_id, sample.record);
        let bytes = (stream.pending.len() - before) as u64;
        self.flush_state.record_write(1, bytes);

        if self.flush_state.should_flush(&self.flush_policy()) {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes buffered MDF4 records as data blocks and updates the sample
    /// counters. MDF3 records stay buffered until the measurement stops.
    pub fn flush(&mut self) -> Result<()> {
        if !self.file.is_mdf4() {
            return Ok(());
        }
        let compress = self.settings.compress_data;
        let Self {
            file, sink, streams, ..
        } = &mut *self;
        let sink = sink
            .as_mut()
            .ok_or_else(|| Error::InvalidState("writer is not bound to a file".into()))?;
        for (&dg_pos, stream) in streams.iter_mut() {
            if let Some(dg) = file.header.data_groups.get(dg_pos) {
                mdf4::flush_data_group(sink, dg, stream, compress)?;
            }
        }
        sink.flush()?;
        self.flush_state.on_flush();
        mdf_log!(
            Debug,
            "MdfWriter::flush",
            "flush {} done, {} records so far",
            self.flush_state.flush_count,
            self.flush_state.total_records
        );
        Ok(())
    }
}

/// Makes the blocks of an opened file known to the sink; objects read from
/// a file carry their address as index.
fn register_existing<W: MdfWrite>(sink: &mut BlockSink<W>, file: &MdfFile) {
    let header = &file.header;
    sink.register(header.index, header.index);
    for dg in &header.data_groups {
        sink.register(dg.index, dg.index);
        for cg in &dg.channel_groups {
            sink.register(cg.index, cg.index);
        }
    }
    for fh in &header.file_histories {
        sink.register(fh.index, fh.index);
    }
    for at in &header.attachments {
        sink.register(at.index, at.index);
    }
    for ev in &header.events {
        sink.register(ev.index, ev.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;
    use crate::types::{ChannelType, SyncType};

    fn ramp_writer() -> (MdfWriter<VecWriter>, u64) {
        let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
        let dg = writer.create_data_group().unwrap();
        let cg = dg.create_channel_group();
        cg.set_name("Ramp");
        let t = cg.create_channel();
        t.set_name("t");
        t.set_channel_type(ChannelType::Master);
        t.set_sync_type(SyncType::Time);
        t.set_data_type(DataType::FloatLE);
        let v = cg.create_channel();
        v.set_name("v");
        v.set_data_type(DataType::UnsignedIntegerLE);
        v.set_bit_count(8);
        let index = cg.index();
        (writer, index)
    }

    #[test]
    fn states_only_move_forward() {
        let (mut writer, _) = ramp_writer();
        assert!(writer.start_measurement(0).is_err());
        assert!(writer.finalize().is_err());
        writer.init_measurement().unwrap();
        assert!(writer.create_data_group().is_err());
        assert!(writer.init_measurement().is_err());
        writer.start_measurement(0).unwrap();
        assert!(writer.start_measurement(0).is_err());
        writer.stop_measurement(1).unwrap();
        assert!(writer.save_sample(0, 2).is_err());
        writer.finalize().unwrap();
        assert_eq!(writer.state(), WriteState::Finalize);
        assert!(writer.file().is_finalized());
    }

    #[test]
    fn every_init_records_its_own_history_entry() {
        let (mut writer, _) = ramp_writer();
        writer.header_mut().create_file_history().set_tool_name("caller");
        writer.init_measurement().unwrap();
        let tools: Vec<&str> = writer
            .file()
            .header()
            .file_histories()
            .iter()
            .map(|fh| fh.tool_name())
            .collect();
        assert_eq!(tools, ["caller", "mdf-rs"]);
    }

    #[test]
    fn pre_trigger_queue_keeps_the_window() {
        let (mut writer, group) = ramp_writer();
        writer.set_pre_trig_time(1.0);
        writer.init_measurement().unwrap();
        for second in 0..5u64 {
            writer.save_sample(group, second * 1_000_000_000).unwrap();
        }
        // 3 s and 4 s lie within one second of the 4 s sample.
        assert_eq!(writer.pre_trig.len(), 2);
        writer.start_measurement(4_500_000_000).unwrap();
        assert_eq!(writer.channel_group_mut(group).unwrap().nof_samples(), 1);
    }

    #[test]
    fn manual_policy_buffers_until_flush() {
        let (mut writer, group) = ramp_writer();
        writer.set_flush_policy(FlushPolicy::Manual);
        writer.init_measurement().unwrap();
        writer.start_measurement(0).unwrap();
        let before = writer.get_ref().unwrap().len();
        for i in 0..3 {
            writer.save_sample(group, i).unwrap();
        }
        assert_eq!(writer.get_ref().unwrap().len(), before);
        writer.flush().unwrap();
        assert!(writer.get_ref().unwrap().len() > before);
    }

    #[test]
    fn record_count_policy_flushes_on_its_own() {
        let (mut writer, group) = ramp_writer();
        writer.set_flush_policy(FlushPolicy::EveryNRecords(2));
        writer.init_measurement().unwrap();
        writer.start_measurement(0).unwrap();
        for i in 0..4 {
            writer.save_sample(group, i).unwrap();
        }
        assert_eq!(writer.flush_state.flush_count, 2);
        assert!(!writer.streams.values().any(RecordStream::has_pending));
    }

    #[test]
    fn converter_and_mdf3_default_to_manual() {
        let converter = MdfWriter::in_memory(WriterType::Converter);
        assert_eq!(converter.flush_policy(), FlushPolicy::Manual);
        let mdf3 = MdfWriter::in_memory(WriterType::Mdf3Basic);
        assert!(!mdf3.file().is_mdf4());
        assert_eq!(mdf3.flush_policy(), FlushPolicy::Manual);
        let basic = MdfWriter::in_memory(WriterType::Mdf4Basic);
        assert_eq!(basic.flush_policy(), FlushPolicy::EveryNBytes(DEFAULT_FLUSH_BYTES));
    }
}
