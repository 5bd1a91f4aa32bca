use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{Attachment, DataGroup, Event, FileHistory, IndexSource, MetaData};

/// Root block of the measurement: identification fields and the top level
/// lists of data groups, attachments, file histories and events.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub(crate) index: u64,
    pub(crate) measurement_id: String,
    pub(crate) recorder_id: String,
    pub(crate) recorder_index: i64,
    pub(crate) author: String,
    pub(crate) department: String,
    pub(crate) project: String,
    pub(crate) subject: String,
    pub(crate) description: String,
    pub(crate) start_time: u64,
    pub(crate) tz_offset_min: i16,
    pub(crate) dst_offset_min: i16,
    pub(crate) time_quality: u8,
    pub(crate) start_angle: Option<f64>,
    pub(crate) start_distance: Option<f64>,
    pub(crate) data_groups: Vec<DataGroup>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) file_histories: Vec<FileHistory>,
    pub(crate) events: Vec<Event>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) index_source: IndexSource,
}

impl Header {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next(), index_source)
    }

    pub(crate) fn with_index(index: u64, index_source: &IndexSource) -> Self {
        Self {
            index,
            measurement_id: String::new(),
            recorder_id: String::new(),
            recorder_index: 0,
            author: String::new(),
            department: String::new(),
            project: String::new(),
            subject: String::new(),
            description: String::new(),
            start_time: 0,
            tz_offset_min: 0,
            dst_offset_min: 0,
            time_quality: 0,
            start_angle: None,
            start_distance: None,
            data_groups: Vec::new(),
            attachments: Vec::new(),
            file_histories: Vec::new(),
            events: Vec::new(),
            metadata: None,
            index_source: index_source.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    pub fn set_measurement_id(&mut self, id: &str) {
        self.measurement_id = id.to_string();
    }

    pub fn recorder_id(&self) -> &str {
        &self.recorder_id
    }

    pub fn set_recorder_id(&mut self, id: &str) {
        self.recorder_id = id.to_string();
    }

    pub fn recorder_index(&self) -> i64 {
        self.recorder_index
    }

    pub fn set_recorder_index(&mut self, index: i64) {
        self.recorder_index = index;
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: &str) {
        self.author = author.to_string();
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn set_department(&mut self, department: &str) {
        self.department = department.to_string();
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn set_project(&mut self, project: &str) {
        self.project = project.to_string();
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.subject = subject.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// Start of the measurement in nanoseconds since 1970-01-01 UTC.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, ns: u64) {
        self.start_time = ns;
    }

    /// Time zone offset in minutes.
    pub fn tz_offset(&self) -> i16 {
        self.tz_offset_min
    }

    pub fn set_tz_offset(&mut self, minutes: i16) {
        self.tz_offset_min = minutes;
    }

    /// Daylight saving offset in minutes.
    pub fn dst_offset(&self) -> i16 {
        self.dst_offset_min
    }

    pub fn set_dst_offset(&mut self, minutes: i16) {
        self.dst_offset_min = minutes;
    }

    pub fn time_quality(&self) -> u8 {
        self.time_quality
    }

    pub fn start_angle(&self) -> Option<f64> {
        self.start_angle
    }

    /// Start angle in radians.
    pub fn set_start_angle(&mut self, radians: f64) {
        self.start_angle = Some(radians);
    }

    pub fn start_distance(&self) -> Option<f64> {
        self.start_distance
    }

    /// Start distance in meters.
    pub fn set_start_distance(&mut self, meters: f64) {
        self.start_distance = Some(meters);
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }

    pub fn data_groups(&self) -> &[DataGroup] {
        &self.data_groups
    }

    pub fn data_groups_mut(&mut self) -> &mut [DataGroup] {
        &mut self.data_groups
    }

    pub fn data_group(&self, position: usize) -> Option<&DataGroup> {
        self.data_groups.get(position)
    }

    pub fn data_group_mut(&mut self, position: usize) -> Option<&mut DataGroup> {
        self.data_groups.get_mut(position)
    }

    /// Appends a new data group.
    pub fn create_data_group(&mut self) -> &mut DataGroup {
        let dg = DataGroup::new(&self.index_source);
        self.data_groups.push(dg);
        let last = self.data_groups.len() - 1;
        &mut self.data_groups[last]
    }

    pub fn last_data_group(&self) -> Option<&DataGroup> {
        self.data_groups.last()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn create_attachment(&mut self) -> &mut Attachment {
        let at = Attachment::new(&self.index_source);
        self.attachments.push(at);
        let last = self.attachments.len() - 1;
        &mut self.attachments[last]
    }

    pub fn file_histories(&self) -> &[FileHistory] {
        &self.file_histories
    }

    pub fn create_file_history(&mut self) -> &mut FileHistory {
        let fh = FileHistory::new(&self.index_source);
        self.file_histories.push(fh);
        let last = self.file_histories.len() - 1;
        &mut self.file_histories[last]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn create_event(&mut self) -> &mut Event {
        let ev = Event::new(&self.index_source);
        self.events.push(ev);
        let last = self.events.len() - 1;
        &mut self.events[last]
    }
}
