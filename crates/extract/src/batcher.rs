//! Greedy chunk batching under a token budget

use crate::budget::TokenBudget;

/// What the orchestrator must do with an offered chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Chunk accepted into the open batch
    Accepted,
    /// Budget exhausted: generate from `batch`; the offered chunk went
    /// into the fresh batch that replaced it
    Flushed { batch: String },
    /// Budget exhausted and the chunk also overflows a fresh budget:
    /// generate from `batch`, then stop consuming
    FlushedThenHalted { batch: String },
    /// Oversized chunk with an empty batch: stop consuming entirely
    Halted,
}

/// Single-pass, order-preserving batcher.
///
/// Chunks accumulate into one batch until the next one would overflow the
/// budget; the batch is then handed back for generation and the budget
/// starts over. An oversized chunk arriving while the batch is empty halts
/// all further consumption, even of smaller chunks behind it.
#[derive(Debug)]
pub struct ChunkBatcher {
    budget: TokenBudget,
    facts: String,
    batch_len: usize,
    chunks_seen: usize,
    chunks_used: usize,
    max_matches: usize,
    halted: bool,
}

impl ChunkBatcher {
    pub fn new(budget: TokenBudget, max_matches: usize) -> Self {
        Self {
            budget,
            facts: String::new(),
            batch_len: 0,
            chunks_seen: 0,
            chunks_used: 0,
            max_matches,
            halted: false,
        }
    }

    /// Offer one non-empty chunk with its token cost
    pub fn offer(&mut self, text: &str, cost: i64) -> Offer {
        if self.halted {
            return Offer::Halted;
        }

        self.chunks_seen += 1;

        if self.budget.fits(cost) {
            self.accept(text, cost);
            return Offer::Accepted;
        }

        if self.batch_len == 0 {
            self.halted = true;
            return Offer::Halted;
        }

        let batch = self.take_batch();
        self.budget.reset();

        if self.budget.fits(cost) {
            self.accept(text, cost);
            Offer::Flushed { batch }
        } else {
            self.halted = true;
            Offer::FlushedThenHalted { batch }
        }
    }

    fn accept(&mut self, text: &str, cost: i64) {
        self.facts.push_str(text);
        self.facts.push('\n');
        self.batch_len += 1;
        self.chunks_used += 1;
        self.budget.consume(cost);
    }

    fn take_batch(&mut self) -> String {
        self.batch_len = 0;
        std::mem::take(&mut self.facts)
    }

    /// Hand back the trailing partial batch once the source is exhausted
    pub fn take_final(&mut self) -> Option<String> {
        if self.batch_len == 0 {
            None
        } else {
            Some(self.take_batch())
        }
    }

    /// Non-empty chunks considered so far
    pub fn seen(&self) -> usize {
        self.chunks_seen
    }

    /// Chunks placed into some batch
    pub fn used(&self) -> usize {
        self.chunks_used
    }

    /// True once the configured maximum of used chunks is reached
    pub fn cap_reached(&self) -> bool {
        self.chunks_used >= self.max_matches
    }
}
