//! Scripted completion service for testing
//!
//! Responses are replayed in order, one per call. Once the script runs out
//! the last response repeats. Every prompt received is recorded so tests can
//! assert how many attempts were made and what was asked.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::GenerationError;
use crate::generator::{CompletionRequest, CompletionService};

pub type ScriptedResponse = Result<String, GenerationError>;

#[derive(Clone)]
pub struct ScriptedCompletion {
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    last: Arc<Mutex<Option<ScriptedResponse>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    source: String,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into())),
            last: Arc::new(Mutex::new(None)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
            source: "mock".to_string(),
        }
    }

    /// Every call returns the same text
    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Responses given as plain text, all successful
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Every call fails with the same error
    pub fn failing(error: GenerationError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep on the tokio timer before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_response(&self) -> ScriptedResponse {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last.clone().unwrap_or(Err(GenerationError::EmptyResponse)),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.prompt.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.next_response()
    }

    fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_repeats_last() {
        let mock = ScriptedCompletion::new(vec![
            Err(GenerationError::Server("502".to_string())),
            Ok("second".to_string()),
        ]);

        assert!(mock.complete(&request("a")).await.is_err());
        assert_eq!(mock.complete(&request("b")).await.unwrap(), "second");
        assert_eq!(mock.complete(&request("c")).await.unwrap(), "second");
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_script_returns_empty_response() {
        let mock = ScriptedCompletion::new(vec![]);
        assert_eq!(
            mock.complete(&request("a")).await,
            Err(GenerationError::EmptyResponse)
        );
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = ScriptedCompletion::always("same").with_source("scripted");
        let handle = mock.clone();
        mock.complete(&request("x")).await.unwrap();
        assert_eq!(handle.call_count(), 1);
        assert_eq!(handle.source(), "scripted");
    }
}
