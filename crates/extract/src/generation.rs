//! Text generation: collaborator trait, prompt rendering and the Ollama client

use crate::config::SearchConfig;
use crate::{ExtractError, Result};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "phi4-mini:latest";
const DEFAULT_MAX_TOKEN_TOTAL: usize = 4096;

/// Crude length-based token estimate, close enough for budgeting
const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Sampling options forwarded to the generation engine
#[derive(Debug, Clone, Default)]
pub struct TextGenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub max_tokens: usize,
    pub stop_sequences: Vec<String>,
    pub token_selection_biases: HashMap<u32, f32>,
}

impl TextGenerationOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            max_tokens: config.answer_tokens,
            stop_sequences: config.stop_sequences.clone(),
            token_selection_biases: config.token_selection_biases.clone(),
        }
    }
}

/// Stream of generated text fragments, in arrival order
pub type TextStream = BoxStream<'static, Result<String>>;

/// The generation engine the pipeline consumes
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Hard context ceiling of the model
    fn max_token_total(&self) -> usize;

    /// Token count of a text under this model's tokenizer
    fn count_tokens(&self, text: &str) -> usize;

    /// Start generating for a prompt; fragments arrive lazily
    async fn generate_text(
        &self,
        prompt: &str,
        options: &TextGenerationOptions,
    ) -> Result<TextStream>;
}

/// Callback observing fragments as they stream in
pub type FragmentSink = dyn Fn(&str) + Send + Sync;

/// Render an extraction prompt from its template.
///
/// Runs of blank lines in the facts collapse to a single blank line before
/// substitution.
pub fn render_prompt(template: &str, question: &str, facts: &str, not_found: &str) -> String {
    let facts = collapse_blank_runs(facts);
    template
        .replace("{{$facts}}", facts.trim())
        .replace("{{$input}}", question)
        .replace("{{$notFound}}", not_found)
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;

    for ch in text.chars() {
        match ch {
            '\r' => {}
            '\n' => newline_run += 1,
            _ => {
                if newline_run > 0 {
                    out.push_str(if newline_run >= 2 { "\n\n" } else { "\n" });
                    newline_run = 0;
                }
                out.push(ch);
            }
        }
    }
    if newline_run > 0 {
        out.push_str(if newline_run >= 2 { "\n\n" } else { "\n" });
    }

    out
}

/// Concatenate a fragment stream, observing cancellation at every fragment
pub async fn collect_text(
    mut stream: TextStream,
    cancellation: &CancellationToken,
    sink: Option<&FragmentSink>,
) -> Result<String> {
    let mut text = String::new();

    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(ExtractError::Cancelled),
            fragment = stream.next() => match fragment {
                None => break,
                Some(fragment) => {
                    let fragment = fragment?;
                    if let Some(sink) = sink {
                        sink(&fragment);
                    }
                    text.push_str(&fragment);
                }
            }
        }
    }

    Ok(text)
}

/// Streaming client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_token_total: usize,
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: serde_json::Value,
}

#[derive(Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            max_token_total: DEFAULT_MAX_TOKEN_TOTAL,
        }
    }

    /// Client configured from `RAGNER_OLLAMA_URL` / `RAGNER_OLLAMA_MODEL` /
    /// `RAGNER_MAX_TOKEN_TOTAL`, falling back to localhost defaults
    pub fn default_local() -> Self {
        let url = env_or_default("RAGNER_OLLAMA_URL", DEFAULT_OLLAMA_URL);
        let model = env_or_default("RAGNER_OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL);
        let max_total = std::env::var("RAGNER_MAX_TOKEN_TOTAL")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_TOKEN_TOTAL);

        Self::new(url, model).with_max_token_total(max_total)
    }

    pub fn with_max_token_total(mut self, max_token_total: usize) -> Self {
        self.max_token_total = max_token_total;
        self
    }

    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_options(options: &TextGenerationOptions) -> serde_json::Value {
        // Token selection biases have no Ollama surface; the remaining
        // sampling knobs map onto the generate options object.
        let mut body = json!({
            "temperature": options.temperature,
            "top_p": options.top_p,
            "presence_penalty": options.presence_penalty,
            "frequency_penalty": options.frequency_penalty,
            "num_predict": options.max_tokens,
        });
        if !options.stop_sequences.is_empty() {
            body["stop"] = json!(options.stop_sequences);
        }
        body
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn max_token_total(&self) -> usize {
        self.max_token_total
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(APPROX_CHARS_PER_TOKEN)
    }

    async fn generate_text(
        &self,
        prompt: &str,
        options: &TextGenerationOptions,
    ) -> Result<TextStream> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
            options: Self::request_options(options),
        };

        debug!("Requesting generation from Ollama ({})", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let stream = response.bytes_stream().map(|chunk| {
            let bytes =
                chunk.map_err(|e| ExtractError::Generation(format!("stream error: {e}")))?;
            let text = String::from_utf8_lossy(&bytes);

            // Each line is one NDJSON chunk
            let mut fragment = String::new();
            for line in text.lines() {
                if let Ok(chunk) = serde_json::from_str::<OllamaStreamChunk>(line) {
                    fragment.push_str(&chunk.response);
                }
            }

            Ok(fragment)
        });

        Ok(Box::pin(stream))
    }
}
