//! Tag filters for chunk retrieval

use crate::record::{TagMap, TAG_DOCUMENT_ID};
use serde::{Deserialize, Serialize};

/// A conjunction of required tag/value pairs.
///
/// A record satisfies the filter when every pair is present among its tags.
/// Callers pass a list of filters; a record matches when at least one
/// filter in the list accepts it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryFilter {
    pairs: Vec<(String, String)>,
}

impl MemoryFilter {
    /// Filter on a single tag/value pair
    pub fn by_tag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pairs: vec![(name.into(), value.into())],
        }
    }

    /// Filter for all chunks of one document
    pub fn by_document(document_id: impl Into<String>) -> Self {
        Self::by_tag(TAG_DOCUMENT_ID, document_id)
    }

    /// Builder: require another tag/value pair
    pub fn and_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// The required pairs, in insertion order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// True when every required pair appears in `tags`
    pub fn matches(&self, tags: &TagMap) -> bool {
        self.pairs.iter().all(|(name, value)| {
            tags.get(name)
                .map_or(false, |values| values.iter().any(|v| v == value))
        })
    }
}

/// True when `tags` satisfies at least one filter, or the list is empty
pub fn matches_any(filters: &[MemoryFilter], tags: &TagMap) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ChunkRecord;

    #[test]
    fn test_by_document_matches() {
        let record = ChunkRecord::new("text", "doc-7", "file-1");
        let filter = MemoryFilter::by_document("doc-7");

        assert!(filter.matches(&record.tags));
        assert!(!MemoryFilter::by_document("doc-8").matches(&record.tags));
    }

    #[test]
    fn test_conjunction() {
        let record = ChunkRecord::new("text", "doc-7", "file-1").with_tag("lang", "ru");

        let both = MemoryFilter::by_document("doc-7").and_tag("lang", "ru");
        assert!(both.matches(&record.tags));

        let wrong_lang = MemoryFilter::by_document("doc-7").and_tag("lang", "en");
        assert!(!wrong_lang.matches(&record.tags));
    }

    #[test]
    fn test_matches_any() {
        let record = ChunkRecord::new("text", "doc-7", "file-1");

        assert!(matches_any(&[], &record.tags));
        assert!(matches_any(
            &[
                MemoryFilter::by_document("doc-0"),
                MemoryFilter::by_document("doc-7")
            ],
            &record.tags
        ));
        assert!(!matches_any(
            &[MemoryFilter::by_document("doc-0")],
            &record.tags
        ));
    }
}
