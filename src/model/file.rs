use alloc::string::{String, ToString};

use super::{Attachment, Channel, DataGroup, Header, IndexSource};
use crate::blocks::IdentificationBlock;

/// An MDF file: identification plus the header tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MdfFile {
    pub(crate) name: String,
    pub(crate) file_name: String,
    pub(crate) identification: IdentificationBlock,
    pub(crate) header: Header,
    pub(crate) index_source: IndexSource,
}

impl MdfFile {
    /// Empty MDF4 file (version 4.10).
    pub fn new_mdf4() -> Self {
        Self::with_version(410)
    }

    /// Empty MDF3 file (version 3.30).
    pub fn new_mdf3() -> Self {
        Self::with_version(330)
    }

    fn with_version(version: u16) -> Self {
        let index_source = IndexSource::default();
        let header = Header::new(&index_source);
        Self {
            name: String::new(),
            file_name: String::new(),
            identification: IdentificationBlock::new(version, "mdf-rs"),
            header,
            index_source,
        }
    }

    pub(crate) fn from_parts(identification: IdentificationBlock, header: Header) -> Self {
        let index_source = header.index_source.clone();
        Self {
            name: String::new(),
            file_name: String::new(),
            identification,
            header,
            index_source,
        }
    }

    /// Display name, by default the file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Path of the file on disk.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sets the path and, if no name was given yet, derives it from the stem.
    pub fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_string();
        if self.name.is_empty() {
            let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
            let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);
            self.name = stem.to_string();
        }
    }

    /// Version text as stored in the file, e.g. "4.10".
    pub fn version(&self) -> &str {
        &self.identification.format_version
    }

    pub fn main_version(&self) -> u16 {
        self.identification.version_number / 100
    }

    pub fn minor_version(&self) -> u16 {
        self.identification.version_number % 100
    }

    /// Changes the minor version, e.g. 20 for MDF 4.20.
    pub fn set_minor_version(&mut self, minor: u16) {
        let version = self.main_version() * 100 + minor % 100;
        let program_id = core::mem::take(&mut self.identification.program_id);
        let mut id = IdentificationBlock::new(version, &program_id);
        id.file_id = core::mem::take(&mut self.identification.file_id);
        id.unfinalized_flags = self.identification.unfinalized_flags;
        id.custom_flags = self.identification.custom_flags;
        self.identification = id;
    }

    pub fn program_id(&self) -> &str {
        &self.identification.program_id
    }

    /// Sets the creating tool id (at most 8 characters are stored).
    pub fn set_program_id(&mut self, program_id: &str) {
        self.identification.program_id = program_id.to_string();
    }

    pub fn is_mdf4(&self) -> bool {
        self.identification.is_mdf4()
    }

    pub fn is_finalized(&self) -> bool {
        self.identification.is_finalized()
    }

    /// Pending `(standard, custom)` unfinalized flags.
    pub fn finalized_flags(&self) -> (u16, u16) {
        (
            self.identification.unfinalized_flags,
            self.identification.custom_flags,
        )
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn data_groups(&self) -> &[DataGroup] {
        self.header.data_groups()
    }

    pub fn data_group(&self, position: usize) -> Option<&DataGroup> {
        self.header.data_group(position)
    }

    pub fn data_group_mut(&mut self, position: usize) -> Option<&mut DataGroup> {
        self.header.data_group_mut(position)
    }

    pub fn create_data_group(&mut self) -> &mut DataGroup {
        self.header.create_data_group()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.header.attachments()
    }

    pub fn create_attachment(&mut self) -> &mut Attachment {
        self.header.create_attachment()
    }

    /// Data group owning the channel with index `channel_index`.
    pub fn find_parent_data_group(&self, channel_index: u64) -> Option<&DataGroup> {
        self.header
            .data_groups
            .iter()
            .find(|dg| dg.contains_channel(channel_index))
    }

    /// Position of the data group owning `channel` in [`MdfFile::data_groups`].
    pub fn data_group_position_of(&self, channel: &Channel) -> Option<usize> {
        self.header
            .data_groups
            .iter()
            .position(|dg| dg.contains_channel(channel.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identification_accessors() {
        let mut file = MdfFile::new_mdf4();
        assert!(file.is_mdf4());
        assert_eq!(file.version(), "4.10");
        file.set_minor_version(20);
        assert_eq!((file.main_version(), file.minor_version()), (4, 20));
        assert_eq!(file.version(), "4.20");
        assert!(file.is_finalized());
        assert_eq!(file.finalized_flags(), (0, 0));

        let mdf3 = MdfFile::new_mdf3();
        assert!(!mdf3.is_mdf4());
        assert_eq!(mdf3.main_version(), 3);
    }

    #[test]
    fn file_name_sets_default_name() {
        let mut file = MdfFile::new_mdf4();
        file.set_file_name("/tmp/logs/drive_01.mf4");
        assert_eq!(file.name(), "drive_01");
        file.set_name("Drive");
        file.set_file_name("other.mf4");
        assert_eq!(file.name(), "Drive");
    }

    #[test]
    fn finds_parent_data_group_by_channel_index() {
        let mut file = MdfFile::new_mdf4();
        file.create_data_group().create_channel_group().create_channel();
        let dg = file.create_data_group();
        let dg_index = dg.index();
        let cn_index = dg.create_channel_group().create_channel().index();

        assert_eq!(file.find_parent_data_group(cn_index).map(DataGroup::index), Some(dg_index));
        assert!(file.find_parent_data_group(u64::MAX).is_none());
    }

    #[test]
    fn create_calls_draw_increasing_indices() {
        let mut file = MdfFile::new_mdf4();
        let a = file.create_data_group().index();
        let b = file.create_data_group().index();
        let at = file.create_attachment().index();
        let ev = file.header_mut().create_event().index();
        assert!(a < b && b < at && at < ev);
        assert_eq!(file.data_groups().len(), 2);
    }
}
