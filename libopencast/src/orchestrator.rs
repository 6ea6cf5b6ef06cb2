//! Generate, validate, deduplicate and store one entry
//!
//! [`Orchestrator::generate_and_store`] drives the bounded retry loop:
//! each attempt asks the completion service for text, checks it against the
//! category's rules and the topic's existing entries, and either stores it
//! or records why it was rejected. Transient service errors, rule
//! violations and duplicates are retried after the policy delay. Permanent
//! service errors abort at once.

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_PROMPT_TEMPLATE};
use crate::duplicate::DuplicateIndex;
use crate::error::{AttemptFailure, OpenCastError, Result};
use crate::generator::seeds::random_seed;
use crate::generator::{render_prompt, CompletionRequest, CompletionService};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::store::CategoryStore;
use crate::types::{Category, ContentRules, Entry, Topic};
use crate::validation::{extract_hashtags, fit_to_length, validate};

/// Knobs for the generation loop, normally taken from [`Config`]
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub default_rules: ContentRules,
    pub default_template: String,
    pub retry: RetryPolicy,
    pub max_tokens: u32,
    pub temperature: f32,
    pub use_seeds: bool,
    pub auto_trim: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_rules: ContentRules::default(),
            default_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            retry: RetryPolicy::default(),
            max_tokens: 150,
            temperature: 0.7,
            use_seeds: true,
            auto_trim: false,
        }
    }
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_rules: config.content_rules(),
            default_template: config.content.default_prompt_template.clone(),
            retry: config.retry_policy(),
            max_tokens: config.generation.max_tokens,
            temperature: config.generation.temperature,
            use_seeds: config.generation.use_seeds,
            auto_trim: config.content.auto_trim,
        }
    }
}

pub struct Orchestrator {
    store: CategoryStore,
    service: Box<dyn CompletionService>,
    settings: GenerationSettings,
    sleeper: Box<dyn Sleeper>,
}

impl Orchestrator {
    pub fn new(store: CategoryStore, service: Box<dyn CompletionService>) -> Self {
        Self {
            store,
            service,
            settings: GenerationSettings::default(),
            sleeper: Box::new(TokioSleeper),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Produce, validate and persist one new entry for the topic
    ///
    /// # Errors
    ///
    /// - `NotFound` when the category or topic does not exist
    /// - `Generation` on a permanent service error
    /// - `GenerationExhausted` when every attempt was rejected
    pub async fn generate_and_store(&self, category_id: &str, topic_name: &str) -> Result<Entry> {
        self.run_attempts(category_id, topic_name, None).await
    }

    /// Same as [`generate_and_store`](Self::generate_and_store) but gives up
    /// with `DeadlineExceeded` once `deadline` passes
    pub async fn generate_and_store_until(
        &self,
        category_id: &str,
        topic_name: &str,
        deadline: Instant,
    ) -> Result<Entry> {
        self.run_attempts(category_id, topic_name, Some(deadline)).await
    }

    async fn run_attempts(
        &self,
        category_id: &str,
        topic_name: &str,
        deadline: Option<Instant>,
    ) -> Result<Entry> {
        let category = self.store.load(category_id)?;
        let topic = category.topic(topic_name).ok_or_else(|| {
            OpenCastError::NotFound(format!(
                "topic '{}' in category '{}'",
                topic_name, category_id
            ))
        })?;

        let rules = category.rules(&self.settings.default_rules);
        rules.check(category_id)?;
        let template = category.prompt_template_or(&self.settings.default_template);
        let base_prompt = render_prompt(template, &topic.topic);
        let index = DuplicateIndex::from_topic(topic);
        let max_attempts = self.settings.retry.max_attempts.max(1);

        info!(
            category_id,
            topic = %topic.topic,
            existing = index.len(),
            max_attempts,
            "Generating content"
        );

        let mut last_failure: Option<AttemptFailure> = None;
        let mut attempt = 0;
        loop {
            attempt += 1;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(OpenCastError::DeadlineExceeded {
                    attempts: attempt - 1,
                    last_failure,
                });
            }

            let request = CompletionRequest {
                prompt: self.prompt_for_attempt(&base_prompt),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };

            let response = match deadline {
                Some(d) => match tokio::time::timeout_at(d, self.service.complete(&request)).await {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(category_id, attempt, "Deadline passed while waiting for completion");
                        return Err(OpenCastError::DeadlineExceeded {
                            attempts: attempt,
                            last_failure,
                        });
                    }
                },
                None => self.service.complete(&request).await,
            };

            let failure = match response {
                Ok(raw) => {
                    let text = if self.settings.auto_trim {
                        fit_to_length(raw.trim(), rules.max_length)
                    } else {
                        raw.trim().to_string()
                    };

                    match validate(&text, &rules) {
                        Err(violation) => AttemptFailure::Validation(violation),
                        Ok(()) if index.contains(&text) => AttemptFailure::Duplicate,
                        Ok(()) => {
                            let tags = extract_hashtags(&text);
                            let entry = Entry::new(text, self.service.source(), tags);
                            self.store
                                .append_entry(category_id, &topic.topic, entry.clone())?;
                            info!(
                                category_id,
                                topic = %topic.topic,
                                attempt,
                                length = entry.metadata.length,
                                "Entry accepted"
                            );
                            return Ok(entry);
                        }
                    }
                }
                Err(e) if e.is_transient() => AttemptFailure::Service(e),
                Err(e) => {
                    warn!(category_id, attempt, error = %e, "Permanent generation error");
                    return Err(OpenCastError::Generation(e));
                }
            };

            warn!(category_id, topic = %topic.topic, attempt, reason = %failure, "Attempt rejected");

            if attempt >= max_attempts {
                return Err(OpenCastError::GenerationExhausted {
                    attempts: attempt,
                    last_failure: failure,
                });
            }

            let delay = self.settings.retry.delay_for(attempt);
            let past_deadline = deadline.is_some_and(|d| {
                Instant::now()
                    .checked_add(delay)
                    .map_or(true, |wake| wake >= d)
            });
            if past_deadline {
                return Err(OpenCastError::DeadlineExceeded {
                    attempts: attempt,
                    last_failure: Some(failure),
                });
            }
            last_failure = Some(failure);

            debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before retry");
            self.sleeper.sleep(delay).await;
        }
    }

    fn prompt_for_attempt(&self, base_prompt: &str) -> String {
        if self.settings.use_seeds {
            let seed = random_seed(&mut rand::thread_rng());
            debug!(tone = %seed.tone, style = %seed.style, "Applying content seed");
            seed.apply_to_prompt(base_prompt)
        } else {
            base_prompt.to_string()
        }
    }
}

/// Topic with the fewest entries, ties broken at random
pub fn pick_topic(category: &Category) -> Option<&Topic> {
    pick_topic_with(category, &mut rand::thread_rng())
}

pub fn pick_topic_with<'a, R: Rng + ?Sized>(category: &'a Category, rng: &mut R) -> Option<&'a Topic> {
    let fewest = category.topics.iter().map(|t| t.entries.len()).min()?;
    let candidates: Vec<&Topic> = category
        .topics
        .iter()
        .filter(|t| t.entries.len() == fewest)
        .collect();
    candidates.choose(rng).copied()
}
