//! Source-attribution records for chunks consumed during a request

use crate::record::TagMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribution for one (index, document, file) triple.
///
/// Keyed by `link`; holds one partition entry per chunk of that file that
/// was sent to the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Citation {
    /// Index the chunk was retrieved from
    pub index: String,

    /// Document id (a document can be composed of multiple files)
    pub document_id: String,

    /// File id within the document
    pub file_id: String,

    /// Synthetic unique identifier: "{index}/{documentId}/{fileId}"
    pub link: String,

    /// MIME type of the source file
    pub source_content_type: String,

    /// Original file name
    pub source_name: String,

    /// Public URL of the source, when one exists
    pub source_url: Option<String>,

    /// Chunks of this file that were placed into a batch, in consumption order
    pub partitions: Vec<Partition>,
}

/// One consumed chunk within a citation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    /// The chunk text as it was sent to the model
    pub text: String,

    /// Relevance of this partition against the question
    pub relevance: f32,

    /// Partition number within the file
    pub partition_number: i64,

    /// Section number within the file
    pub section_number: i64,

    /// When the source document was last updated
    pub last_update: DateTime<Utc>,

    /// Tags carried by the chunk
    #[serde(default)]
    pub tags: TagMap,
}

impl Citation {
    /// Build the link key for an (index, document, file) triple
    pub fn link_for(index: &str, document_id: &str, file_id: &str) -> String {
        format!("{index}/{document_id}/{file_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_format() {
        assert_eq!(
            Citation::link_for("reports", "doc-1", "file-2"),
            "reports/doc-1/file-2"
        );
    }
}
