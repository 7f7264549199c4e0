//! Memory store seam consumed by the orchestrator

use crate::{ExtractError, Result};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use ragner_core::{ChunkRecord, MemoryFilter};
use ragner_db::Repository;
use tokio_util::sync::CancellationToken;

/// Lazy, relevance-ordered sequence of chunk records
pub type ChunkStream = BoxStream<'static, Result<ChunkRecord>>;

/// The retrieval store the pipeline consumes.
///
/// Implementations return chunks most-relevant-first; the orchestrator
/// pulls them one at a time and stops early on budget or cap limits.
#[async_trait]
pub trait MemoryDb: Send + Sync {
    async fn list_chunks(
        &self,
        index: &str,
        filters: &[MemoryFilter],
        limit: usize,
        with_embeddings: bool,
        cancellation: CancellationToken,
    ) -> Result<ChunkStream>;
}

#[async_trait]
impl MemoryDb for Repository {
    async fn list_chunks(
        &self,
        index: &str,
        filters: &[MemoryFilter],
        limit: usize,
        _with_embeddings: bool,
        cancellation: CancellationToken,
    ) -> Result<ChunkStream> {
        if cancellation.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let records = self.get_list(index, filters, limit).await?;
        Ok(Box::pin(futures_util::stream::iter(
            records.into_iter().map(Ok),
        )))
    }
}
