//! End-to-end generation scenarios against a temporary category store

use libopencast::duplicate::normalize;
use libopencast::error::{AttemptFailure, GenerationError, OpenCastError, ValidationError};
use libopencast::generator::mock::ScriptedCompletion;
use libopencast::retry::RecordingSleeper;
use libopencast::validation::{extract_hashtags, validate};
use libopencast::{Category, CategoryStore, Entry, GenerationSettings, Orchestrator};
use std::collections::HashSet;
use std::time::Duration;
use tempfile::TempDir;

const CATEGORY: &str = "cyber-security";
const TOPIC: &str = "Input Validation";
const VALID: &str = "Use input validation to prevent injection attacks in 2025. #Security #OWASP";

struct Harness {
    orchestrator: Orchestrator,
    mock: ScriptedCompletion,
    sleeper: RecordingSleeper,
    _temp_dir: TempDir,
}

impl Harness {
    fn new(mock: ScriptedCompletion) -> Self {
        Self::with_category(mock, default_category())
    }

    fn with_category(mock: ScriptedCompletion, category: Category) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = CategoryStore::new(temp_dir.path().join("categories")).unwrap();
        store.save(&category).unwrap();

        let sleeper = RecordingSleeper::new();
        let orchestrator = Orchestrator::new(store, Box::new(mock.clone()))
            .with_settings(GenerationSettings {
                use_seeds: false,
                ..Default::default()
            })
            .with_sleeper(Box::new(sleeper.clone()));

        Self {
            orchestrator,
            mock,
            sleeper,
            _temp_dir: temp_dir,
        }
    }

    fn stored(&self) -> Vec<Entry> {
        self.orchestrator
            .store()
            .load(CATEGORY)
            .unwrap()
            .topic(TOPIC)
            .unwrap()
            .entries
            .clone()
    }
}

fn default_category() -> Category {
    Category::new(CATEGORY, "Cyber Security", "Practical security tips")
        .with_prompt_template("Write a short security tip about {topic}.")
        .with_topics(&[TOPIC, "Password Hygiene"])
}

#[tokio::test]
async fn test_too_short_then_valid() {
    let h = Harness::new(ScriptedCompletion::texts(&["Check input #a #b", VALID]));

    let entry = h
        .orchestrator
        .generate_and_store(CATEGORY, TOPIC)
        .await
        .unwrap();

    assert_eq!(entry.content, VALID);
    assert_eq!(h.mock.call_count(), 2);
    assert_eq!(h.stored(), vec![entry]);
    assert_eq!(h.sleeper.calls(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_valid_first_attempt_is_stored_with_metadata() {
    let h = Harness::new(ScriptedCompletion::always(VALID));

    let entry = h
        .orchestrator
        .generate_and_store(CATEGORY, "input validation")
        .await
        .unwrap();

    assert_eq!(h.mock.call_count(), 1);
    let length = entry.metadata.length;
    assert!((20..=220).contains(&length));
    assert_eq!(length, VALID.chars().count());
    assert_eq!(entry.metadata.tags, vec!["#Security", "#OWASP"]);
    assert_eq!(h.stored().len(), 1);
}

#[tokio::test]
async fn test_duplicate_is_retried() {
    let mut category = default_category();
    category.topics[0].entries.push(Entry::new(
        VALID.to_string(),
        "openai",
        extract_hashtags(VALID),
    ));
    let other = "Allow-list input formats instead of blocking bad ones. #Security #AppSec";
    let h = Harness::with_category(ScriptedCompletion::texts(&[VALID, other]), category);

    let entry = h
        .orchestrator
        .generate_and_store(CATEGORY, TOPIC)
        .await
        .unwrap();

    assert_eq!(entry.content, other);
    assert_eq!(h.mock.call_count(), 2);
    let stored: Vec<_> = h.stored().into_iter().map(|e| e.content).collect();
    assert_eq!(stored, vec![VALID.to_string(), other.to_string()]);
}

#[tokio::test]
async fn test_case_variant_counts_as_duplicate() {
    let mut category = default_category();
    category.topics[0]
        .entries
        .push(Entry::new(VALID.to_string(), "openai", vec![]));
    let shouted = VALID.to_uppercase();
    let h = Harness::with_category(ScriptedCompletion::always(&shouted), category);

    let result = h.orchestrator.generate_and_store(CATEGORY, TOPIC).await;

    assert!(matches!(
        result,
        Err(OpenCastError::GenerationExhausted {
            attempts: 3,
            last_failure: AttemptFailure::Duplicate,
        })
    ));
    assert_eq!(h.stored().len(), 1);
}

#[tokio::test]
async fn test_transient_failures_exhaust_attempts() {
    let h = Harness::new(ScriptedCompletion::failing(GenerationError::Server(
        "502 Bad Gateway".to_string(),
    )));

    let result = h.orchestrator.generate_and_store(CATEGORY, TOPIC).await;

    match result {
        Err(OpenCastError::GenerationExhausted {
            attempts,
            last_failure,
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(
                last_failure,
                AttemptFailure::Service(GenerationError::Server("502 Bad Gateway".to_string()))
            );
        }
        other => panic!("expected GenerationExhausted, got {:?}", other),
    }
    assert_eq!(h.mock.call_count(), 3);
    assert_eq!(h.sleeper.calls().len(), 2);
    assert!(h.stored().is_empty());
}

#[tokio::test]
async fn test_wrong_hashtag_count_is_reported() {
    let h = Harness::new(ScriptedCompletion::always(
        "Use input validation to prevent injection attacks. #Security",
    ));

    let result = h.orchestrator.generate_and_store(CATEGORY, TOPIC).await;
    assert!(matches!(
        result,
        Err(OpenCastError::GenerationExhausted {
            last_failure: AttemptFailure::Validation(ValidationError::WrongHashtagCount {
                expected: 2,
                found: 1
            }),
            ..
        })
    ));
}

#[tokio::test]
async fn test_category_overrides_apply() {
    let mut category = default_category();
    category.required_hashtags = Some(1);
    category.max_length = Some(80);
    let text = "Reject input that does not match the expected schema. #Security";
    let h = Harness::with_category(ScriptedCompletion::always(text), category);

    let entry = h
        .orchestrator
        .generate_and_store(CATEGORY, TOPIC)
        .await
        .unwrap();
    assert_eq!(entry.metadata.tags, vec!["#Security"]);
}

#[tokio::test]
async fn test_unknown_category_and_topic() {
    let h = Harness::new(ScriptedCompletion::always(VALID));

    assert!(matches!(
        h.orchestrator.generate_and_store("nonexistent", TOPIC).await,
        Err(OpenCastError::NotFound(_))
    ));
    assert!(matches!(
        h.orchestrator.generate_and_store(CATEGORY, "Quantum").await,
        Err(OpenCastError::NotFound(_))
    ));
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_exponential_backoff_delays() {
    let h = Harness::new(ScriptedCompletion::failing(GenerationError::RateLimited(
        "slow down".to_string(),
    )));
    let mut settings = h.orchestrator.settings().clone();
    settings.retry.backoff = libopencast::retry::Backoff::Exponential;
    settings.retry.max_attempts = 4;
    settings.retry.delay = Duration::from_secs(1);
    let sleeper = h.sleeper.clone();
    let orchestrator = Orchestrator::new(h.orchestrator.store().clone(), Box::new(h.mock.clone()))
        .with_settings(settings)
        .with_sleeper(Box::new(sleeper.clone()));

    assert!(orchestrator.generate_and_store(CATEGORY, TOPIC).await.is_err());
    assert_eq!(
        sleeper.calls(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
}

#[tokio::test]
async fn test_repeated_runs_keep_invariants() {
    let texts = [
        VALID,
        "Too short #a #b",
        "Escape output for the context it lands in: HTML, SQL, shell. #Security #OWASP",
        "use input validation to prevent injection attacks in 2025. #security #owasp",
        "Validate on the server even when the client already did. #Security #WebDev",
    ];
    let h = Harness::new(ScriptedCompletion::texts(&texts));

    for _ in 0..3 {
        h.orchestrator
            .generate_and_store(CATEGORY, TOPIC)
            .await
            .unwrap();
    }

    let stored = h.stored();
    assert_eq!(stored.len(), 3);
    let rules = libopencast::ContentRules::default();
    let mut seen = HashSet::new();
    for entry in &stored {
        assert!(validate(&entry.content, &rules).is_ok());
        assert!(seen.insert(normalize(&entry.content)));
    }
}

#[test]
fn test_loads_files_with_naive_timestamps() {
    let temp_dir = TempDir::new().unwrap();
    let store = CategoryStore::new(temp_dir.path()).unwrap();
    let legacy = r##"{
        "category_id": "devops",
        "name": "DevOps",
        "description": "Delivery tips",
        "prompt_template": "Write a DevOps tip about {topic}",
        "language": "en",
        "created_at": "2025-01-15T10:30:00.123456",
        "updated_at": "2025-01-16T08:00:00",
        "topics": [
            {
                "topic": "CI/CD",
                "entries": [
                    {
                        "content": "Keep pipelines under ten minutes to protect flow. #DevOps #CICD",
                        "metadata": {"length": 63, "source": "openai", "tags": ["#DevOps", "#CICD"]},
                        "created_at": "2025-01-16T08:00:00"
                    }
                ]
            }
        ]
    }"##;
    std::fs::write(store.dir().join("devops.json"), legacy).unwrap();

    let category = store.load("devops").unwrap();
    assert_eq!(category.language, "en");
    assert_eq!(category.total_entries(), 1);
    assert_eq!(
        category.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2025-01-15 10:30:00"
    );

    store.save(&category).unwrap();
    assert_eq!(store.load("devops").unwrap(), category);
}
