//! Repository pattern for chunk record storage

use crate::{DbConnection, DbError, Result};
use ragner_core::filter::matches_any;
use ragner_core::{ChunkRecord, MemoryFilter, TagMap};
use serde::{Deserialize, Serialize};
use surrealdb::types::{RecordId, SurrealValue, ToSql};
use tracing::instrument;

/// Repository for all chunk record operations
#[derive(Clone)]
pub struct Repository {
    db: DbConnection,
}

/// Stored row shape, id included
#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
struct MemoryRow {
    id: RecordId,
    index_name: String,
    text: String,
    partition_number: i64,
    section_number: i64,
    last_update: chrono::DateTime<chrono::Utc>,
    document_id: String,
    file_id: String,
    content_type: String,
    file_name: String,
    web_url: Option<String>,
    #[serde(default)]
    tags: TagMap,
}

impl MemoryRow {
    fn into_record(self) -> ChunkRecord {
        ChunkRecord {
            id: self.id.to_sql(),
            text: self.text,
            partition_number: self.partition_number,
            section_number: self.section_number,
            last_update: self.last_update,
            document_id: self.document_id,
            file_id: self.file_id,
            content_type: self.content_type,
            file_name: self.file_name,
            web_url: self.web_url,
            tags: self.tags,
        }
    }
}

impl Repository {
    /// Create a new repository
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    // ==========================================
    // RECORD OPERATIONS
    // ==========================================

    /// Store a chunk record under an index.
    ///
    /// Generates a record key when the record carries none. Returns the
    /// stored record with its id set.
    #[instrument(skip(self, record))]
    pub async fn upsert_record(&self, index: &str, record: ChunkRecord) -> Result<ChunkRecord> {
        let key = if record.id.is_empty() {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            // Accept bare keys as well as full "memory:key" ids, with or
            // without SurrealDB's key quoting
            record
                .id
                .rsplit(':')
                .next()
                .unwrap_or(record.id.as_str())
                .trim_matches(|c| c == '⟨' || c == '⟩')
                .to_string()
        };

        let tags = serde_json::to_value(&record.tags)
            .map_err(|e| DbError::QueryFailed(format!("tag serialization: {e}")))?;

        let rows: Vec<MemoryRow> = self
            .db
            .query(
                r#"
                UPSERT type::thing('memory', $key) SET
                    index_name = $index_name,
                    text = $text,
                    partition_number = $partition_number,
                    section_number = $section_number,
                    last_update = <datetime>$last_update,
                    document_id = $document_id,
                    file_id = $file_id,
                    content_type = $content_type,
                    file_name = $file_name,
                    web_url = $web_url,
                    tags = $tags
                "#,
            )
            .bind(("key", key))
            .bind(("index_name", index.to_string()))
            .bind(("text", record.text))
            .bind(("partition_number", record.partition_number))
            .bind(("section_number", record.section_number))
            .bind(("last_update", record.last_update.to_rfc3339()))
            .bind(("document_id", record.document_id))
            .bind(("file_id", record.file_id))
            .bind(("content_type", record.content_type))
            .bind(("file_name", record.file_name))
            .bind(("web_url", record.web_url))
            .bind(("tags", tags))
            .await?
            .take(0)?;

        rows.into_iter()
            .next()
            .map(MemoryRow::into_record)
            .ok_or_else(|| DbError::CreateFailed("memory".into()))
    }

    /// List chunk records for an index, most relevant first.
    ///
    /// Without a similarity score, document order is the relevance order
    /// for whole-document extraction: records come back sorted by
    /// (document_id, partition_number). Tag filters are applied after the
    /// fetch, then the limit.
    #[instrument(skip(self, filters))]
    pub async fn get_list(
        &self,
        index: &str,
        filters: &[MemoryFilter],
        limit: usize,
    ) -> Result<Vec<ChunkRecord>> {
        let rows: Vec<MemoryRow> = self
            .db
            .query("SELECT * FROM memory WHERE index_name = $index_name")
            .bind(("index_name", index.to_string()))
            .await?
            .take(0)?;

        let mut records: Vec<ChunkRecord> = rows
            .into_iter()
            .map(MemoryRow::into_record)
            .filter(|r| matches_any(filters, &r.tags))
            .collect();

        records.sort_by(|a, b| {
            (a.document_id.as_str(), a.partition_number)
                .cmp(&(b.document_id.as_str(), b.partition_number))
        });
        if records.len() > limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    /// Delete all records of a document, returning how many went away
    #[instrument(skip(self))]
    pub async fn delete_document(&self, index: &str, document_id: &str) -> Result<usize> {
        let deleted: Vec<MemoryRow> = self
            .db
            .query(
                "DELETE memory WHERE index_name = $index_name AND document_id = $document_id RETURN BEFORE",
            )
            .bind(("index_name", index.to_string()))
            .bind(("document_id", document_id.to_string()))
            .await?
            .take(0)?;

        Ok(deleted.len())
    }

    /// Count records stored under an index
    #[instrument(skip(self))]
    pub async fn count_records(&self, index: &str) -> Result<i64> {
        #[derive(Deserialize, SurrealValue)]
        struct CountRow {
            count: i64,
        }

        let counts: Vec<CountRow> = self
            .db
            .query("SELECT count() FROM memory WHERE index_name = $index_name GROUP ALL")
            .bind(("index_name", index.to_string()))
            .await?
            .take(0)?;

        Ok(counts.into_iter().next().map(|c| c.count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_memory;

    fn record(doc: &str, partition: i64, text: &str) -> ChunkRecord {
        ChunkRecord::new(text, doc, "file-1").with_partition(partition)
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        let stored = repo
            .upsert_record("reports", record("doc-1", 0, "Partition zero"))
            .await
            .unwrap();
        assert!(!stored.id.is_empty());

        let listed = repo.get_list("reports", &[], 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "Partition zero");
        assert_eq!(listed[0].document_id, "doc-1");
    }

    #[tokio::test]
    async fn test_list_is_document_ordered() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        for (doc, partition) in [("doc-b", 1), ("doc-a", 2), ("doc-a", 0), ("doc-b", 0)] {
            repo.upsert_record("reports", record(doc, partition, "text"))
                .await
                .unwrap();
        }

        let listed = repo.get_list("reports", &[], 10).await.unwrap();
        let order: Vec<(String, i64)> = listed
            .into_iter()
            .map(|r| (r.document_id, r.partition_number))
            .collect();

        assert_eq!(
            order,
            vec![
                ("doc-a".to_string(), 0),
                ("doc-a".to_string(), 2),
                ("doc-b".to_string(), 0),
                ("doc-b".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_document_filter_and_limit() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        for partition in 0..5 {
            repo.upsert_record("reports", record("doc-1", partition, "a"))
                .await
                .unwrap();
        }
        repo.upsert_record("reports", record("doc-2", 0, "b"))
            .await
            .unwrap();

        let filters = [MemoryFilter::by_document("doc-1")];
        let listed = repo.get_list("reports", &filters, 3).await.unwrap();

        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|r| r.document_id == "doc-1"));
    }

    #[tokio::test]
    async fn test_indexes_are_isolated() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        repo.upsert_record("reports", record("doc-1", 0, "a"))
            .await
            .unwrap();
        repo.upsert_record("archive", record("doc-1", 0, "b"))
            .await
            .unwrap();

        assert_eq!(repo.count_records("reports").await.unwrap(), 1);
        assert_eq!(repo.count_records("archive").await.unwrap(), 1);
        assert!(repo.get_list("missing", &[], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        for partition in 0..3 {
            repo.upsert_record("reports", record("doc-1", partition, "a"))
                .await
                .unwrap();
        }

        let deleted = repo.delete_document("reports", "doc-1").await.unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(repo.count_records("reports").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tags_round_trip() {
        let db = init_memory().await.unwrap();
        let repo = Repository::new(db);

        let rec = record("doc-1", 0, "tagged").with_tag("lang", "ru");
        repo.upsert_record("reports", rec).await.unwrap();

        let listed = repo.get_list("reports", &[], 10).await.unwrap();
        assert_eq!(
            listed[0].tags.get("lang"),
            Some(&vec!["ru".to_string()])
        );
    }
}
