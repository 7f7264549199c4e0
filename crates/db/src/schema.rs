//! SurrealDB schema definitions

use crate::{DbConnection, Result};
use tracing::info;

/// Initialize the database schema
pub async fn initialize_schema(db: &DbConnection) -> Result<()> {
    info!("Initializing database schema...");

    db.query(SCHEMA_DEFINITION).await?;

    info!("Schema initialized successfully");
    Ok(())
}

const SCHEMA_DEFINITION: &str = r#"
-- ============================================
-- TABLES
-- ============================================

-- Chunk records, one per document partition
DEFINE TABLE memory SCHEMAFULL;
DEFINE FIELD index_name ON memory TYPE string;
DEFINE FIELD text ON memory TYPE string;
DEFINE FIELD partition_number ON memory TYPE int DEFAULT 0;
DEFINE FIELD section_number ON memory TYPE int DEFAULT 0;
DEFINE FIELD last_update ON memory TYPE datetime DEFAULT time::now();
DEFINE FIELD document_id ON memory TYPE string;
DEFINE FIELD file_id ON memory TYPE string;
DEFINE FIELD content_type ON memory TYPE string DEFAULT 'text/plain';
DEFINE FIELD file_name ON memory TYPE string DEFAULT '';
DEFINE FIELD web_url ON memory TYPE option<string>;
DEFINE FIELD tags ON memory FLEXIBLE TYPE object DEFAULT {};

-- ============================================
-- INDEXES
-- ============================================

-- Per-index listing
DEFINE INDEX idx_memory_index ON memory FIELDS index_name;

-- Document lookups and deletion
DEFINE INDEX idx_memory_document ON memory FIELDS index_name, document_id;
"#;
