//! Token budget arithmetic

use crate::config::SearchConfig;
use crate::generation::TextGenerator;

/// Tokens remaining for chunk text once the template, the question and the
/// reserved answer tokens are accounted for.
///
/// Computed once per request (template and question are batch-invariant)
/// and reset to the initial value at every batch boundary. Signed: a
/// negative value means nothing fits.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    initial: i64,
    remaining: i64,
}

impl TokenBudget {
    /// Compute the per-batch budget for a request
    pub fn initial(
        generator: &dyn TextGenerator,
        template: &str,
        question: &str,
        config: &SearchConfig,
    ) -> Self {
        let max_tokens = if config.max_ask_prompt_size > 0 {
            config.max_ask_prompt_size
        } else {
            generator.max_token_total()
        };

        let initial = max_tokens as i64
            - generator.count_tokens(template) as i64
            - generator.count_tokens(question) as i64
            - config.answer_tokens as i64;

        Self {
            initial,
            remaining: initial,
        }
    }

    /// A chunk fits only while its cost stays strictly below the remainder
    pub fn fits(&self, cost: i64) -> bool {
        cost < self.remaining
    }

    /// Account for an accepted chunk
    pub fn consume(&mut self, cost: i64) {
        self.remaining -= cost;
    }

    /// Start a fresh batch
    pub fn reset(&mut self) {
        self.remaining = self.initial;
    }

    pub fn initial_value(&self) -> i64 {
        self.initial
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }
}
