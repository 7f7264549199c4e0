//! Citation accumulation for consumed chunks

use ragner_core::{ChunkRecord, Citation, Partition};

/// Partitions carry a fixed relevance: the list-based retrieval path has
/// no similarity score to report.
const PARTITION_RELEVANCE: f32 = 1.0;

/// Record one consumed chunk against its citation.
///
/// Citations are keyed by `{index}/{documentId}/{fileId}`; the first chunk
/// of a file creates the citation, every chunk appends a partition entry.
/// Called for each chunk placed into a batch, whether or not that batch's
/// generation later parses.
pub fn record_partition(
    citations: &mut Vec<Citation>,
    index: &str,
    record: &ChunkRecord,
    partition_text: &str,
) {
    let link = Citation::link_for(index, &record.document_id, &record.file_id);

    let position = match citations.iter().position(|c| c.link == link) {
        Some(existing) => existing,
        None => {
            citations.push(Citation::default());
            citations.len() - 1
        }
    };
    let citation = &mut citations[position];

    citation.index = index.to_string();
    citation.document_id = record.document_id.clone();
    citation.file_id = record.file_id.clone();
    citation.link = link;
    citation.source_content_type = record.content_type.clone();
    citation.source_name = record.file_name.clone();
    citation.source_url = record.web_url.clone();

    citation.partitions.push(Partition {
        text: partition_text.to_string(),
        relevance: PARTITION_RELEVANCE,
        partition_number: record.partition_number,
        section_number: record.section_number,
        last_update: record.last_update,
        tags: record.tags.clone(),
    });
}
