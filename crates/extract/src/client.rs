//! The extraction orchestrator

use crate::batcher::{ChunkBatcher, Offer};
use crate::budget::TokenBudget;
use crate::citations::record_partition;
use crate::config::{PromptStrategy, SearchConfig};
use crate::generation::{
    collect_text, render_prompt, FragmentSink, TextGenerationOptions, TextGenerator,
};
use crate::merge::merge_records;
use crate::parser::parse_extraction;
use crate::prompts::{per_entity_prompt, PromptProvider, PROMPT_NER};
use crate::store::MemoryDb;
use crate::{ExtractError, Result};
use futures_util::StreamExt;
use ragner_core::{Answer, Citation, EntityKind, ExtractionRecord, MemoryFilter};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

pub const REASON_NO_MEMORIES: &str = "No memories available";
pub const REASON_UNABLE_TO_USE_MEMORIES: &str = "Unable to use memories";
pub const REASON_EMPTY_RESULT: &str = "Empty result";

/// How one batch's generated output becomes an extraction record
#[derive(Debug, Clone, Copy)]
enum DecodeMode {
    /// Strict JSON decode into the six-field record
    Json,
    /// One entity per output line, assigned to a single kind's field
    Lines(EntityKind),
}

/// Counters collected while consuming one chunk sequence
#[derive(Debug, Clone, Copy)]
struct PassOutcome {
    seen: usize,
    used: usize,
}

/// Drives retrieval, batching, generation, parsing and merging for one
/// `ask` request.
///
/// Holds no per-request state: every invocation of [`Self::ask`] owns its
/// batch, budget, citation list and record list for the duration of the
/// call.
pub struct ExtractionClient {
    store: Arc<dyn MemoryDb>,
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<dyn PromptProvider>,
    config: SearchConfig,
    fragment_sink: Option<Box<FragmentSink>>,
}

impl ExtractionClient {
    pub fn new(
        store: Arc<dyn MemoryDb>,
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<dyn PromptProvider>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            generator,
            prompts,
            config,
            fragment_sink: None,
        }
    }

    /// Builder: observe generated fragments as they stream in
    pub fn with_fragment_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.fragment_sink = Some(Box::new(sink));
        self
    }

    /// Extract entities for a question over the chunks of an index.
    ///
    /// `min_relevance` is part of the caller contract but the list-based
    /// retrieval path has no similarity floor to apply it to.
    #[instrument(skip(self, filters, cancellation))]
    pub async fn ask(
        &self,
        index: &str,
        question: &str,
        filters: &[MemoryFilter],
        min_relevance: f64,
        cancellation: CancellationToken,
    ) -> Result<Answer> {
        let _ = min_relevance;

        match self.config.prompt_strategy {
            PromptStrategy::SingleShot => {
                self.ask_single(index, question, filters, &cancellation).await
            }
            PromptStrategy::PerEntity => {
                self.ask_per_entity(index, question, filters, &cancellation)
                    .await
            }
        }
    }

    async fn ask_single(
        &self,
        index: &str,
        question: &str,
        filters: &[MemoryFilter],
        cancellation: &CancellationToken,
    ) -> Result<Answer> {
        let template = self.prompts.read_prompt(PROMPT_NER)?;
        let answer = Answer::no_answer_found(question, &self.config.empty_answer);

        let mut citations = Vec::new();
        let mut documents = Vec::new();

        let outcome = self
            .run_pass(
                index,
                question,
                filters,
                &template,
                DecodeMode::Json,
                true,
                &mut citations,
                &mut documents,
                cancellation,
            )
            .await?;

        self.finish(answer, outcome, documents, citations)
    }

    async fn ask_per_entity(
        &self,
        index: &str,
        question: &str,
        filters: &[MemoryFilter],
        cancellation: &CancellationToken,
    ) -> Result<Answer> {
        let answer = Answer::no_answer_found(question, &self.config.empty_answer);

        let mut citations = Vec::new();
        let mut documents = Vec::new();
        let mut first_outcome: Option<PassOutcome> = None;

        for (pass, kind) in EntityKind::ALL.into_iter().enumerate() {
            let prompt_name = per_entity_prompt(kind);
            let template = self.prompts.read_prompt(prompt_name)?;

            trace!("Generating result for prompt: {prompt_name}");

            // Citations cover the request, not every pass: the store
            // yields the same sequence within one request, so the first
            // pass records them for all six.
            let outcome = self
                .run_pass(
                    index,
                    question,
                    filters,
                    &template,
                    DecodeMode::Lines(kind),
                    pass == 0,
                    &mut citations,
                    &mut documents,
                    cancellation,
                )
                .await?;

            if first_outcome.is_none() {
                first_outcome = Some(outcome);
            }
        }

        let outcome = first_outcome.unwrap_or(PassOutcome { seen: 0, used: 0 });
        self.finish(answer, outcome, documents, citations)
    }

    /// Consume the chunk sequence once, flushing token-budgeted batches
    /// through generation into `documents`.
    async fn run_pass(
        &self,
        index: &str,
        question: &str,
        filters: &[MemoryFilter],
        template: &str,
        mode: DecodeMode,
        collect_citations: bool,
        citations: &mut Vec<Citation>,
        documents: &mut Vec<ExtractionRecord>,
        cancellation: &CancellationToken,
    ) -> Result<PassOutcome> {
        let options = TextGenerationOptions::from_config(&self.config);
        let budget =
            TokenBudget::initial(self.generator.as_ref(), template, question, &self.config);

        debug!("Tokens available for facts: {}", budget.initial_value());
        trace!("Fetching relevant memories");

        let mut matches = self
            .store
            .list_chunks(
                index,
                filters,
                self.config.max_matches_count,
                false,
                cancellation.clone(),
            )
            .await?;

        let mut batcher = ChunkBatcher::new(budget, self.config.max_matches_count);

        // Memories arrive sorted by relevance, most relevant first
        loop {
            let record = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(ExtractError::Cancelled),
                record = matches.next() => match record {
                    None => break,
                    Some(record) => record?,
                },
            };

            let text = record.text.trim().to_string();
            if text.is_empty() {
                error!("The document partition is empty, doc: {}", record.id);
                continue;
            }

            let cost = self.generator.count_tokens(&text) as i64;

            match batcher.offer(&text, cost) {
                Offer::Accepted => {
                    if collect_citations {
                        record_partition(citations, index, &record, &text);
                    }
                }
                Offer::Flushed { batch } => {
                    self.generate_into(template, question, &batch, &options, mode, documents, cancellation)
                        .await?;
                    if collect_citations {
                        record_partition(citations, index, &record, &text);
                    }
                }
                Offer::FlushedThenHalted { batch } => {
                    self.generate_into(template, question, &batch, &options, mode, documents, cancellation)
                        .await?;
                    break;
                }
                Offer::Halted => break,
            }

            // A buggy storage connector may return unbounded records
            if batcher.cap_reached() {
                break;
            }
        }

        if let Some(batch) = batcher.take_final() {
            self.generate_into(template, question, &batch, &options, mode, documents, cancellation)
                .await?;
        }

        Ok(PassOutcome {
            seen: batcher.seen(),
            used: batcher.used(),
        })
    }

    async fn generate_into(
        &self,
        template: &str,
        question: &str,
        facts: &str,
        options: &TextGenerationOptions,
        mode: DecodeMode,
        documents: &mut Vec<ExtractionRecord>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let output = self
            .generate_answer(template, question, facts, options, cancellation)
            .await?;

        debug!("Generated answer:\n{output}");

        match mode {
            DecodeMode::Json => match parse_extraction(&output) {
                Ok(record) => documents.push(record),
                Err(failure) => {
                    error!("Could not decode generation output: {failure}");
                }
            },
            DecodeMode::Lines(kind) => {
                let entities: Vec<String> = output
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && *line != self.config.empty_answer)
                    .map(String::from)
                    .collect();
                if !entities.is_empty() {
                    documents.push(kind.record_from(entities));
                }
            }
        }

        Ok(())
    }

    async fn generate_answer(
        &self,
        template: &str,
        question: &str,
        facts: &str,
        options: &TextGenerationOptions,
        cancellation: &CancellationToken,
    ) -> Result<String> {
        let prompt = render_prompt(template, question, facts, &self.config.empty_answer);

        debug!(
            "Running extraction prompt, size: {} tokens, requesting max {} tokens",
            self.generator.count_tokens(&prompt),
            self.config.answer_tokens
        );

        let stream = self.generator.generate_text(&prompt, options).await?;

        let started = Instant::now();
        let text = collect_text(stream, cancellation, self.fragment_sink.as_deref()).await?;
        trace!("Answer generated in {} msecs", started.elapsed().as_millis());

        Ok(text)
    }

    /// Apply the terminal-state policy and seal the answer
    fn finish(
        &self,
        mut answer: Answer,
        outcome: PassOutcome,
        documents: Vec<ExtractionRecord>,
        citations: Vec<Citation>,
    ) -> Result<Answer> {
        answer.relevant_sources = citations;

        if outcome.seen > 0 && outcome.used == 0 {
            error!("Unable to inject memories in the prompt, not enough tokens available");
            answer.no_result_reason = Some(REASON_UNABLE_TO_USE_MEMORIES.to_string());
            return Ok(answer);
        }

        if outcome.used == 0 {
            warn!("No memories available");
            answer.no_result_reason = Some(REASON_NO_MEMORIES.to_string());
            return Ok(answer);
        }

        if documents.is_empty() {
            warn!("Unable to get result");
            answer.no_result_reason = Some(REASON_EMPTY_RESULT.to_string());
            return Ok(answer);
        }

        answer.no_result = false;
        answer.result = merge_records(&documents).to_json()?;
        Ok(answer)
    }
}
