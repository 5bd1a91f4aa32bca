use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{IndexSource, MetaData};

/// An embedded or externally referenced file.
///
/// For embedded attachments the writer reads the content from `file_name`
/// when the file structure is written; the reader keeps the decompressed
/// content in [`Attachment::embedded_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub(crate) index: u64,
    pub(crate) creator_index: u16,
    pub(crate) embedded: bool,
    pub(crate) compressed: bool,
    pub(crate) md5: Option<[u8; 16]>,
    pub(crate) file_name: String,
    pub(crate) file_type: String,
    pub(crate) description: String,
    pub(crate) embedded_data: Vec<u8>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) persisted: bool,
}

impl Attachment {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next())
    }

    pub(crate) fn with_index(index: u64) -> Self {
        Self {
            index,
            creator_index: 0,
            embedded: false,
            compressed: false,
            md5: None,
            file_name: String::new(),
            file_type: String::new(),
            description: String::new(),
            embedded_data: Vec::new(),
            metadata: None,
            persisted: false,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Position of the file history entry that created this attachment.
    pub fn creator_index(&self) -> u16 {
        self.creator_index
    }

    pub fn set_creator_index(&mut self, creator: u16) {
        self.creator_index = creator;
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn set_embedded(&mut self, embedded: bool) {
        self.embedded = embedded;
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// MD5 digest of the original content as lower case hex.
    pub fn md5(&self) -> Option<String> {
        self.md5.map(|digest| {
            digest
                .iter()
                .map(|b| alloc::format!("{b:02x}"))
                .collect::<String>()
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_string();
    }

    /// MIME type of the content.
    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn set_file_type(&mut self, file_type: &str) {
        self.file_type = file_type.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn embedded_data(&self) -> &[u8] {
        &self.embedded_data
    }

    /// Content to embed instead of reading `file_name` at write time.
    pub fn set_embedded_data(&mut self, data: &[u8]) {
        self.embedded = true;
        self.embedded_data = data.to_vec();
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }
}
