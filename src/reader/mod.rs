//! Reading MDF3 and MDF4 files into the object model.
//!
//! [`MdfReader`] reads in levels: the header alone, the measurement structure
//! (data groups, channel groups, channels), everything but the samples, and
//! finally the samples of single data groups. Each level re-parses the block
//! tree from the start, so calling a lower level after a higher one drops the
//! extra information again.
//!
//! ```no_run
//! use mdf_rs::{MdfReader, ChannelObserver, Result};
//!
//! fn dump(path: &str) -> Result<()> {
//!     let mut reader = MdfReader::new(path);
//!     reader.read_everything_but_data()?;
//!     reader.read_data(0)?;
//!     let dg = reader.data_group(0).expect("group 0");
//!     for cg in dg.channel_groups() {
//!         for cn in cg.channels() {
//!             let observer = ChannelObserver::new(dg, cg, cn)?;
//!             println!("{}: {:?}", observer.name(), observer.eng_values());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod data;
mod mdf3;
pub(crate) mod mdf4;
mod observer;

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;
use std::path::{Path, PathBuf};

use crate::blocks::IdentificationBlock;
use crate::blocks::identification_block::UNFIN_UPDATE_LAST_DT_LENGTH;
use crate::logging::mdf_log;
use crate::mdf3::{Dg3Block, block3_slice};
use crate::model::{DataGroup, Header, MdfFile};
use crate::{Error, Result};

pub use observer::{CanBusObserver, ChannelObserver, create_channel_observer_for_channel_group};

/// How much of the block tree a read materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ReadLevel {
    Header,
    MeasurementInfo,
    Everything,
}

/// Calls `visit` for each block of a linked list starting at `first`.
///
/// `visit` returns the address of the next block; 0 ends the list. Lists
/// pointing back to an already visited block are cut there.
pub(crate) fn walk_chain<F>(first: u64, mut visit: F) -> Result<()>
where
    F: FnMut(u64) -> Result<u64>,
{
    let mut visited = BTreeSet::new();
    let mut address = first;
    while address != 0 {
        if !visited.insert(address) {
            mdf_log!(Warning, "walk_chain", "block list loops back to {address:#x}");
            break;
        }
        address = visit(address)?;
    }
    Ok(())
}

#[derive(Debug)]
enum Source {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Reader of one MDF file.
///
/// Construction never fails: it checks that the source starts with an MDF
/// identification block and records the outcome in [`MdfReader::is_ok`].
/// Reads open the file on first use; [`MdfReader::close`] releases the file
/// image and makes reads fail with [`Error::ReaderClosed`] until
/// [`MdfReader::open`] is called again.
#[derive(Debug)]
pub struct MdfReader {
    source: Source,
    image: Vec<u8>,
    is_open: bool,
    closed: bool,
    ok: bool,
    index: i64,
    level: Option<ReadLevel>,
    file: Option<MdfFile>,
}

impl MdfReader {
    /// Reader of the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let ok = match read_identification_from(&path) {
            Ok(_) => true,
            Err(e) => {
                mdf_log!(Error, "MdfReader::new", "{} is not readable as MDF: {e}", path.display());
                false
            }
        };
        Self::with_source(Source::File(path), ok)
    }

    /// Reader of an in-memory file image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let ok = match IdentificationBlock::from_bytes(&bytes) {
            Ok(_) => true,
            Err(e) => {
                mdf_log!(Error, "MdfReader::from_bytes", "not an MDF image: {e}");
                false
            }
        };
        Self::with_source(Source::Memory(bytes), ok)
    }

    fn with_source(source: Source, ok: bool) -> Self {
        Self {
            source,
            image: Vec::new(),
            is_open: false,
            closed: false,
            ok,
            index: 0,
            level: None,
            file: None,
        }
    }

    /// True when the source is an MDF3 or MDF4 file.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Caller-defined sort key, e.g. the position in a list of files.
    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn set_index(&mut self, index: i64) {
        self.index = index;
    }

    /// Path of the file, or `None` for in-memory images.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path),
            Source::Memory(_) => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Loads the file image. Opening an open reader does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open {
            return Ok(());
        }
        self.image = match &self.source {
            Source::File(path) => std::fs::read(path).map_err(Error::IOError)?,
            Source::Memory(bytes) => bytes.clone(),
        };
        self.is_open = true;
        self.closed = false;
        mdf_log!(Trace, "MdfReader::open", "opened {} bytes", self.image.len());
        Ok(())
    }

    /// Releases the file image. The parsed object model is kept.
    pub fn close(&mut self) {
        self.image = Vec::new();
        self.is_open = false;
        self.closed = true;
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ReaderClosed);
        }
        self.open()
    }

    fn parse(&mut self, level: ReadLevel) -> Result<()> {
        self.ensure_open()?;
        let identification = IdentificationBlock::from_bytes(&self.image)?;
        let mut file = if identification.is_mdf4() {
            mdf4::parse_file(&self.image, identification, level)?
        } else {
            mdf3::parse_file(&self.image, identification, level)?
        };
        if let Source::File(path) = &self.source {
            file.set_file_name(&path.to_string_lossy());
        }
        self.file = Some(file);
        self.level = Some(level);
        Ok(())
    }

    /// Reads the identification and header block.
    pub fn read_header(&mut self) -> Result<()> {
        self.parse(ReadLevel::Header)
    }

    /// Reads the header plus data groups, channel groups and channels.
    pub fn read_measurement_info(&mut self) -> Result<()> {
        self.parse(ReadLevel::MeasurementInfo)
    }

    /// Reads every block except the sample data: conversions, sources,
    /// arrays, file history, attachments and events included.
    pub fn read_everything_but_data(&mut self) -> Result<()> {
        self.parse(ReadLevel::Everything)
    }

    /// Loads the samples of the data group at `dg_position`. Reads the rest
    /// of the file first if that has not happened yet.
    pub fn read_data(&mut self, dg_position: usize) -> Result<()> {
        if self.level != Some(ReadLevel::Everything) {
            self.read_everything_but_data()?;
        }
        self.ensure_open()?;
        let Some(file) = self.file.as_mut() else {
            return Err(Error::InvalidState("no file parsed".into()));
        };
        let count = file.data_groups().len();
        let finalized = file.is_finalized();
        let (flags, _) = file.finalized_flags();
        let is_mdf4 = file.is_mdf4();
        let dg = file.data_group_mut(dg_position).ok_or_else(|| {
            Error::NotFound(format!("data group {dg_position} of {count}"))
        })?;

        if is_mdf4 {
            let open_tail = !finalized && flags & UNFIN_UPDATE_LAST_DT_LENGTH != 0;
            data::read_data_group4(&self.image, dg, open_tail)?;
        } else {
            let block = Dg3Block::from_bytes(block3_slice(&self.image, dg.index())?)?;
            data::read_data_group3(&self.image, dg, block.record_id_count)?;
        }
        mdf_log!(
            Debug,
            "MdfReader::read_data",
            "data group {dg_position}: {} records loaded",
            dg.channel_groups().iter().map(|cg| cg.nof_loaded_samples()).sum::<usize>()
        );
        Ok(())
    }

    /// Parsed file, once any read succeeded.
    pub fn file(&self) -> Option<&MdfFile> {
        self.file.as_ref()
    }

    pub fn file_mut(&mut self) -> Option<&mut MdfFile> {
        self.file.as_mut()
    }

    /// Takes the parsed file out of the reader.
    pub fn into_file(self) -> Option<MdfFile> {
        self.file
    }

    pub fn header(&self) -> Option<&Header> {
        self.file.as_ref().map(MdfFile::header)
    }

    pub fn data_group_count(&self) -> usize {
        self.file.as_ref().map_or(0, |f| f.data_groups().len())
    }

    pub fn data_group(&self, position: usize) -> Option<&DataGroup> {
        self.file.as_ref()?.data_group(position)
    }

    pub fn data_group_mut(&mut self, position: usize) -> Option<&mut DataGroup> {
        self.file.as_mut()?.data_group_mut(position)
    }

    /// True when the identification block reads "MDF     ". Only the first
    /// 64 bytes are read; the reader does not have to be open.
    pub fn is_finalized(&self) -> Result<bool> {
        if let Some(file) = &self.file {
            return Ok(file.is_finalized());
        }
        let identification = match &self.source {
            Source::File(path) => read_identification_from(path)?,
            Source::Memory(bytes) => IdentificationBlock::from_bytes(bytes)?,
        };
        Ok(identification.is_finalized())
    }
}

fn read_identification_from(path: &Path) -> Result<IdentificationBlock> {
    use std::io::Read;

    let mut head = [0u8; 64];
    let mut file = std::fs::File::open(path).map_err(Error::IOError)?;
    file.read_exact(&mut head).map_err(Error::IOError)?;
    IdentificationBlock::from_bytes(&head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_not_ok() {
        let reader = MdfReader::from_bytes(alloc::vec![0u8; 128]);
        assert!(!reader.is_ok());
        let missing = MdfReader::new("/nonexistent/file.mf4");
        assert!(!missing.is_ok());
        assert!(missing.is_finalized().is_err());
    }

    #[test]
    fn walk_chain_stops_on_loops() {
        let next = |a: u64| -> Result<u64> { Ok(if a == 3 { 1 } else { a + 1 }) };
        let mut seen = Vec::new();
        walk_chain(1, |a| {
            seen.push(a);
            next(a)
        })
        .unwrap();
        assert_eq!(seen, [1, 2, 3]);
    }

    #[test]
    fn closed_reader_refuses_reads() {
        let mut reader = MdfReader::from_bytes(alloc::vec![0u8; 128]);
        reader.close();
        assert!(matches!(reader.read_header(), Err(Error::ReaderClosed)));
        reader.open().unwrap();
        assert!(reader.is_open());
        assert!(matches!(reader.read_header(), Err(Error::FileIdentifierError(_))));
    }
}
