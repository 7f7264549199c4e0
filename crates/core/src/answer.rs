//! Request-level answers

use crate::citation::Citation;
use serde::{Deserialize, Serialize};

/// The result of one `ask` call.
///
/// Invariant: `no_result == true` iff `result` still holds the configured
/// empty-answer sentinel and no merged record was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The question that was asked
    pub question: String,

    /// True when no extraction could be produced
    pub no_result: bool,

    /// Human-readable reason when `no_result` is set
    pub no_result_reason: Option<String>,

    /// Serialized merged extraction record, or the empty-answer sentinel
    pub result: String,

    /// Citations for every chunk that was sent to the model
    pub relevant_sources: Vec<Citation>,
}

impl Answer {
    /// The sentinel answer returned until an extraction succeeds
    pub fn no_answer_found(question: impl Into<String>, empty_answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            no_result: true,
            no_result_reason: None,
            result: empty_answer.into(),
            relevant_sources: Vec::new(),
        }
    }
}
