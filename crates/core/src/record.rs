//! Chunk records - the retrieved units of document text

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag collection attached to a chunk: tag name to list of values
pub type TagMap = BTreeMap<String, Vec<String>>;

/// Reserved tag carrying the owning document id
pub const TAG_DOCUMENT_ID: &str = "__document_id";

/// One retrieved chunk of a partitioned document.
///
/// Owned by the memory store; the pipeline only reads it. Immutable for
/// the duration of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Store-assigned record id
    pub id: String,

    /// The partition text
    pub text: String,

    /// Partition number within the file
    pub partition_number: i64,

    /// Section number within the file
    pub section_number: i64,

    /// When the source document was last updated
    pub last_update: DateTime<Utc>,

    /// Document this chunk belongs to (a document can span multiple files)
    pub document_id: String,

    /// File this chunk was partitioned from
    pub file_id: String,

    /// MIME type of the source file
    pub content_type: String,

    /// Original file name
    pub file_name: String,

    /// Public URL of the source, when one exists
    pub web_url: Option<String>,

    /// Tags attached at ingestion time
    #[serde(default)]
    pub tags: TagMap,
}

impl ChunkRecord {
    /// Create a new chunk record for a document/file pair
    pub fn new(
        text: impl Into<String>,
        document_id: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        let document_id = document_id.into();
        let mut tags = TagMap::new();
        tags.insert(TAG_DOCUMENT_ID.to_string(), vec![document_id.clone()]);
        Self {
            id: String::new(),
            text: text.into(),
            partition_number: 0,
            section_number: 0,
            last_update: Utc::now(),
            document_id,
            file_id: file_id.into(),
            content_type: "text/plain".to_string(),
            file_name: String::new(),
            web_url: None,
            tags,
        }
    }

    /// Builder: set partition number
    pub fn with_partition(mut self, partition_number: i64) -> Self {
        self.partition_number = partition_number;
        self
    }

    /// Builder: set section number
    pub fn with_section(mut self, section_number: i64) -> Self {
        self.section_number = section_number;
        self
    }

    /// Builder: set content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Builder: set file name
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Builder: set web URL
    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = Some(url.into());
        self
    }

    /// Builder: add a tag value
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.entry(name.into()).or_default().push(value.into());
        self
    }
}
