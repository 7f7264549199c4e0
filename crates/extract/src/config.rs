//! Search configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_MAX_MATCHES_COUNT: usize = 100;
const DEFAULT_ANSWER_TOKENS: usize = 300;
const DEFAULT_EMPTY_ANSWER: &str = "INFO NOT FOUND";

/// How the orchestrator selects prompts for a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStrategy {
    /// One fixed extraction prompt; batch output is decoded as JSON
    #[default]
    SingleShot,
    /// One prompt per entity kind; each kind runs its own pass and the
    /// output is split into lines
    PerEntity,
}

/// Settings consumed by [`crate::ExtractionClient`].
///
/// The pipeline only reads these; ownership stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound on chunks pulled from the store per request
    pub max_matches_count: usize,

    /// Prompt-size ceiling override; 0 means use the generator's
    /// `max_token_total`
    pub max_ask_prompt_size: usize,

    /// Tokens reserved for the generated answer
    pub answer_tokens: usize,

    /// Sentinel the model is told to emit when nothing is found; also the
    /// `result` payload of a no-result answer
    pub empty_answer: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Nucleus sampling cutoff
    pub top_p: f64,

    /// Presence penalty
    pub presence_penalty: f64,

    /// Frequency penalty
    pub frequency_penalty: f64,

    /// Sequences that stop generation
    pub stop_sequences: Vec<String>,

    /// Per-token logit biases, keyed by token id
    pub token_selection_biases: HashMap<u32, f32>,

    /// Prompt selection strategy
    pub prompt_strategy: PromptStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_matches_count: DEFAULT_MAX_MATCHES_COUNT,
            max_ask_prompt_size: 0,
            answer_tokens: DEFAULT_ANSWER_TOKENS,
            empty_answer: DEFAULT_EMPTY_ANSWER.to_string(),
            temperature: 0.0,
            top_p: 0.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stop_sequences: Vec::new(),
            token_selection_biases: HashMap::new(),
            prompt_strategy: PromptStrategy::default(),
        }
    }
}

impl SearchConfig {
    /// Build a config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_matches_count: env_usize("RAGNER_MAX_MATCHES", defaults.max_matches_count),
            max_ask_prompt_size: env_usize("RAGNER_MAX_ASK_PROMPT_SIZE", 0),
            answer_tokens: env_usize("RAGNER_ANSWER_TOKENS", defaults.answer_tokens),
            empty_answer: env_or_default("RAGNER_EMPTY_ANSWER", DEFAULT_EMPTY_ANSWER),
            temperature: env_f64("RAGNER_TEMPERATURE", 0.0),
            top_p: env_f64("RAGNER_TOP_P", 0.0),
            prompt_strategy: env_strategy("RAGNER_PROMPT_STRATEGY"),
            ..defaults
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_strategy(key: &str) -> PromptStrategy {
    match std::env::var(key) {
        Ok(value) if value.trim().eq_ignore_ascii_case("per_entity") => PromptStrategy::PerEntity,
        _ => PromptStrategy::SingleShot,
    }
}
