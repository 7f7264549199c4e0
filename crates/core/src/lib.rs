//! Core domain types for ragner
//!
//! This crate defines the fundamental data structures used throughout
//! the extraction pipeline: chunk records, extraction records, citations,
//! answers, and memory filters.

pub mod answer;
pub mod citation;
pub mod error;
pub mod extraction;
pub mod filter;
pub mod record;

pub use answer::Answer;
pub use citation::{Citation, Partition};
pub use error::{CoreError, Result};
pub use extraction::{EntityKind, ExtractionRecord};
pub use filter::MemoryFilter;
pub use record::{ChunkRecord, TagMap};
