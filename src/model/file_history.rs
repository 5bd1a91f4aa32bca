use alloc::string::{String, ToString};

use super::{IndexSource, MetaData};

/// One entry of the file change log.
///
/// Entries are never generated automatically; tools append one whenever
/// they change a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHistory {
    pub(crate) index: u64,
    pub(crate) time: u64,
    pub(crate) description: String,
    pub(crate) tool_name: String,
    pub(crate) tool_vendor: String,
    pub(crate) tool_version: String,
    pub(crate) user_name: String,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) persisted: bool,
}

impl FileHistory {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next())
    }

    pub(crate) fn with_index(index: u64) -> Self {
        Self {
            index,
            time: 0,
            description: String::new(),
            tool_name: String::new(),
            tool_vendor: String::new(),
            tool_version: String::new(),
            user_name: String::new(),
            metadata: None,
            persisted: false,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Time of the change in nanoseconds since 1970-01-01 UTC.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, ns: u64) {
        self.time = ns;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn set_tool_name(&mut self, name: &str) {
        self.tool_name = name.to_string();
    }

    pub fn tool_vendor(&self) -> &str {
        &self.tool_vendor
    }

    pub fn set_tool_vendor(&mut self, vendor: &str) {
        self.tool_vendor = vendor.to_string();
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    pub fn set_tool_version(&mut self, version: &str) {
        self.tool_version = version.to_string();
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn set_user_name(&mut self, user: &str) {
        self.user_name = user.to_string();
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }
}
