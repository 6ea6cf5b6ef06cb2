//! Completion service boundary
//!
//! The orchestrator talks to a language model through [`CompletionService`]:
//! a rendered prompt goes in, generated text or a classified
//! [`GenerationError`] comes out. [`openai::OpenAiClient`] is the production
//! implementation; [`mock::ScriptedCompletion`] replays canned responses for
//! tests.
//!
//! # Examples
//!
//! ```no_run
//! use libopencast::generator::{render_prompt, CompletionRequest, CompletionService};
//! use libopencast::generator::openai::OpenAiClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new(
//!     "sk-...".to_string().into(),
//!     "https://api.openai.com/v1",
//!     "gpt-3.5-turbo",
//!     Duration::from_secs(30),
//! )?;
//!
//! let request = CompletionRequest {
//!     prompt: render_prompt("Write a tip about {topic}", "input validation"),
//!     max_tokens: 150,
//!     temperature: 0.7,
//! };
//! let text = client.complete(&request).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::types::TOPIC_PLACEHOLDER;

pub mod mock;
pub mod openai;
pub mod seeds;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produce text for the prompt, classifying failures for the retry loop
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;

    /// Provenance tag stored in each entry's metadata
    fn source(&self) -> &str;
}

/// Substitute the topic into every `{topic}` placeholder of a template
pub fn render_prompt(template: &str, topic: &str) -> String {
    template.replace(TOPIC_PLACEHOLDER, topic)
}
