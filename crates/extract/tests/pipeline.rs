//! End-to-end tests for the extraction pipeline
//!
//! Runs the real orchestrator against the in-memory SurrealDB store with a
//! scripted generator, so batching, citation and merge behavior is
//! exercised the way a live request drives it.

use async_trait::async_trait;
use futures_util::stream;
use ragner_core::{ChunkRecord, ExtractionRecord, MemoryFilter};
use ragner_db::{init_memory, Repository};
use ragner_extract::{
    ExtractionClient, PromptProvider, Result, SearchConfig, TextGenerationOptions, TextGenerator,
    REASON_NO_MEMORIES, REASON_UNABLE_TO_USE_MEMORIES,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One token per whitespace-separated word; scripted responses in order
struct ScriptedGenerator {
    max_token_total: usize,
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new<I, S>(max_token_total: usize, responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            max_token_total,
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn max_token_total(&self) -> usize {
        self.max_token_total
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _options: &TextGenerationOptions,
    ) -> Result<ragner_extract::generation::TextStream> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(stream::iter(vec![Ok(response)])))
    }
}

/// Three tokens under word counting, so the budget stays easy to reason
/// about: ceiling 130 - template 3 - question 1 - answer 6 = 120
struct TinyPrompts;

impl PromptProvider for TinyPrompts {
    fn read_prompt(&self, _name: &str) -> Result<String> {
        Ok("{{$facts}} {{$input}} {{$notFound}}".to_string())
    }
}

fn test_config() -> SearchConfig {
    SearchConfig {
        answer_tokens: 6,
        ..SearchConfig::default()
    }
}

fn words(word: &str, n: usize) -> String {
    vec![word; n].join(" ")
}

async fn seeded_repo(chunks: &[(&str, i64, String)]) -> Repository {
    let db = init_memory().await.expect("init db");
    let repo = Repository::new(db);
    for (doc, partition, text) in chunks {
        repo.upsert_record(
            "reports",
            ChunkRecord::new(text.clone(), *doc, "file-1").with_partition(*partition),
        )
        .await
        .expect("seed chunk");
    }
    repo
}

fn client(repo: Repository, generator: Arc<ScriptedGenerator>) -> ExtractionClient {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    ExtractionClient::new(
        Arc::new(repo),
        generator,
        Arc::new(TinyPrompts),
        test_config(),
    )
}

#[tokio::test]
async fn test_two_batches_for_three_fifty_token_chunks() {
    // budget 120, costs [50, 50, 50]: expect [chunk1, chunk2] then [chunk3]
    let repo = seeded_repo(&[
        ("doc-1", 0, words("one", 50)),
        ("doc-1", 1, words("two", 50)),
        ("doc-1", 2, words("three", 50)),
    ])
    .await;

    let generator = ScriptedGenerator::new(
        130,
        vec![
            r#"{"PERSON": ["Ivan Petrov"]}"#,
            r#"{"PERSON": ["Anna Sidorova"], "DATE": ["01.02.2024"]}"#,
        ],
    );
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "extract", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert!(!answer.no_result);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2, "expected exactly two generation calls");
    assert!(prompts[0].contains("one") && prompts[0].contains("two"));
    assert!(!prompts[0].contains("three"));
    assert!(prompts[1].contains("three") && !prompts[1].contains("one"));

    let merged: ExtractionRecord = serde_json::from_str(&answer.result).unwrap();
    assert_eq!(
        merged.persons,
        Some(vec!["Anna Sidorova".to_string(), "Ivan Petrov".to_string()])
    );
    assert_eq!(merged.dates, Some(vec!["01.02.2024".to_string()]));

    // one file, three partitions, in consumption order
    assert_eq!(answer.relevant_sources.len(), 1);
    let partitions = &answer.relevant_sources[0].partitions;
    assert_eq!(partitions.len(), 3);
    assert_eq!(
        partitions
            .iter()
            .map(|p| p.partition_number)
            .collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn test_zero_chunks_is_starvation() {
    let repo = seeded_repo(&[]).await;
    let generator = ScriptedGenerator::new(130, Vec::<String>::new());
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "who?", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert!(answer.no_result);
    assert_eq!(answer.no_result_reason.as_deref(), Some(REASON_NO_MEMORIES));
    assert_eq!(answer.result, "INFO NOT FOUND");
    assert!(answer.relevant_sources.is_empty());
    assert_eq!(generator.prompts().len(), 0);
}

#[tokio::test]
async fn test_oversized_first_chunk_short_circuits() {
    // 200 > budget 120: the 10-token chunk behind it is never considered
    let repo = seeded_repo(&[
        ("doc-1", 0, words("big", 200)),
        ("doc-1", 1, words("small", 10)),
    ])
    .await;

    let generator = ScriptedGenerator::new(130, Vec::<String>::new());
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "extract", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert!(answer.no_result);
    assert_eq!(
        answer.no_result_reason.as_deref(),
        Some(REASON_UNABLE_TO_USE_MEMORIES)
    );
    assert_eq!(generator.prompts().len(), 0, "no generation call expected");
    assert!(answer.relevant_sources.is_empty());
}

#[tokio::test]
async fn test_parse_failure_in_one_batch_does_not_fail_request() {
    let repo = seeded_repo(&[
        ("doc-1", 0, words("one", 100)),
        ("doc-1", 1, words("two", 100)),
    ])
    .await;

    let generator = ScriptedGenerator::new(
        130,
        vec![r#"{"PERSON": ["Ivan Petrov"]}"#, "INFO NOT FOUND"],
    );
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "extract", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(generator.prompts().len(), 2);
    assert!(!answer.no_result, "one good batch is enough");

    let merged: ExtractionRecord = serde_json::from_str(&answer.result).unwrap();
    assert_eq!(merged.persons, Some(vec!["Ivan Petrov".to_string()]));

    // both chunks were sent, both are cited
    assert_eq!(answer.relevant_sources[0].partitions.len(), 2);
}

#[tokio::test]
async fn test_single_batch_when_everything_fits() {
    let repo = seeded_repo(&[
        ("doc-1", 0, words("one", 40)),
        ("doc-1", 1, words("two", 40)),
    ])
    .await;

    let generator = ScriptedGenerator::new(130, vec![r#"{"RESERVOIR": ["D5"]}"#]);
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "extract", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert!(!answer.no_result);
    assert_eq!(generator.prompts().len(), 1);
    assert!(generator.prompts()[0].contains("one"));
    assert!(generator.prompts()[0].contains("two"));
}

#[tokio::test]
async fn test_document_filter_scopes_the_request() {
    let repo = seeded_repo(&[
        ("doc-1", 0, words("wanted", 10)),
        ("doc-2", 0, words("other", 10)),
    ])
    .await;

    let generator = ScriptedGenerator::new(130, vec![r#"{"NPT": ["W-12"]}"#]);
    let client = client(repo, Arc::clone(&generator));

    let filters = [MemoryFilter::by_document("doc-1")];
    let answer = client
        .ask("reports", "extract", &filters, 0.0, CancellationToken::new())
        .await
        .unwrap();

    assert!(!answer.no_result);
    let prompts = generator.prompts();
    assert!(prompts[0].contains("wanted"));
    assert!(!prompts[0].contains("other"));
    assert_eq!(answer.relevant_sources[0].document_id, "doc-1");
}

#[tokio::test]
async fn test_blank_chunks_are_skipped_not_counted() {
    let repo = seeded_repo(&[("doc-1", 0, "   \n  ".to_string())]).await;

    let generator = ScriptedGenerator::new(130, Vec::<String>::new());
    let client = client(repo, Arc::clone(&generator));

    let answer = client
        .ask("reports", "extract", &[], 0.0, CancellationToken::new())
        .await
        .unwrap();

    // a blank partition does not count as an available memory
    assert!(answer.no_result);
    assert_eq!(answer.no_result_reason.as_deref(), Some(REASON_NO_MEMORIES));
}
