use alloc::string::{String, ToString};

use super::{IndexSource, MetaData};
use crate::types::{EventCause, EventSyncType, EventType, RangeType};

/// A point or range marker on the measurement axis.
///
/// The event position is `sync_value * sync_factor` in the unit of the
/// sync type. Pre and post trigger intervals are kept in the event comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) index: u64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) group_name: String,
    pub(crate) event_type: EventType,
    pub(crate) sync_type: EventSyncType,
    pub(crate) range_type: RangeType,
    pub(crate) cause: EventCause,
    pub(crate) creator_index: u16,
    pub(crate) sync_value: i64,
    pub(crate) sync_factor: f64,
    pub(crate) pre_trig: f64,
    pub(crate) post_trig: f64,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) persisted: bool,
}

impl Event {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next())
    }

    pub(crate) fn with_index(index: u64) -> Self {
        Self {
            index,
            name: String::new(),
            description: String::new(),
            group_name: String::new(),
            event_type: EventType::Marker,
            sync_type: EventSyncType::Seconds,
            range_type: RangeType::Point,
            cause: EventCause::Other,
            creator_index: 0,
            sync_value: 0,
            sync_factor: 1.0,
            pre_trig: 0.0,
            post_trig: 0.0,
            metadata: None,
            persisted: false,
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

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn set_group_name(&mut self, group_name: &str) {
        self.group_name = group_name.to_string();
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
    }

    pub fn sync_type(&self) -> EventSyncType {
        self.sync_type
    }

    pub fn set_sync_type(&mut self, sync_type: EventSyncType) {
        self.sync_type = sync_type;
    }

    pub fn range_type(&self) -> RangeType {
        self.range_type
    }

    pub fn set_range_type(&mut self, range_type: RangeType) {
        self.range_type = range_type;
    }

    pub fn cause(&self) -> EventCause {
        self.cause
    }

    pub fn set_cause(&mut self, cause: EventCause) {
        self.cause = cause;
    }

    pub fn creator_index(&self) -> u16 {
        self.creator_index
    }

    pub fn set_creator_index(&mut self, creator: u16) {
        self.creator_index = creator;
    }

    pub fn sync_value(&self) -> i64 {
        self.sync_value
    }

    pub fn set_sync_value(&mut self, value: i64) {
        self.sync_value = value;
    }

    pub fn sync_factor(&self) -> f64 {
        self.sync_factor
    }

    pub fn set_sync_factor(&mut self, factor: f64) {
        self.sync_factor = factor;
    }

    /// Position of the event: `sync_value * sync_factor`.
    pub fn position(&self) -> f64 {
        self.sync_value as f64 * self.sync_factor
    }

    pub fn pre_trig(&self) -> f64 {
        self.pre_trig
    }

    pub fn set_pre_trig(&mut self, seconds: f64) {
        self.pre_trig = seconds;
    }

    pub fn post_trig(&self) -> f64 {
        self.post_trig
    }

    pub fn set_post_trig(&mut self, seconds: f64) {
        self.post_trig = seconds;
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }
}
