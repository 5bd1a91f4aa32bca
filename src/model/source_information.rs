use alloc::string::{String, ToString};

use super::{IndexSource, MetaData};
use crate::types::{SourceBus, SourceType};

/// Origin of a channel group acquisition or of a channel value.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInformation {
    pub(crate) index: u64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) path: String,
    pub(crate) source_type: SourceType,
    pub(crate) bus: SourceBus,
    pub(crate) simulated: bool,
    pub(crate) metadata: Option<MetaData>,
}

impl SourceInformation {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next())
    }

    pub(crate) fn with_index(index: u64) -> Self {
        Self {
            index,
            name: String::new(),
            description: String::new(),
            path: String::new(),
            source_type: SourceType::Other,
            bus: SourceBus::None,
            simulated: false,
            metadata: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn set_source_type(&mut self, source_type: SourceType) {
        self.source_type = source_type;
    }

    pub fn bus(&self) -> SourceBus {
        self.bus
    }

    pub fn set_bus(&mut self, bus: SourceBus) {
        self.bus = bus;
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn set_simulated(&mut self, simulated: bool) {
        self.simulated = simulated;
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }
}
