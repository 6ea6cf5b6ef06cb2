//! X/Twitter publisher over the v2 API
//!
//! Posts with an OAuth 2.0 user-context access token (scopes `tweet.write`,
//! `tweet.read`, `users.read`).

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TwitterConfig;
use crate::error::{ConfigError, PublishError, Result};
use crate::publishers::{http_client, retry_after_header, transport_error, Publisher};

const PLATFORM: &str = "twitter";

pub struct TwitterPublisher {
    http: Client,
    access_token: SecretString,
    base_url: String,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct Me {
    username: String,
}

/// Problem details returned by the v2 API on failure
#[derive(Deserialize)]
struct Problem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl TwitterPublisher {
    pub fn new(access_token: SecretString, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &TwitterConfig) -> Result<Self> {
        let token = config
            .access_token
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("twitter.access_token".to_string()))?;
        Self::new(
            SecretString::from(token.expose_secret().to_owned()),
            &config.base_url,
            config.timeout,
        )
    }

    async fn check(&self, response: reqwest::Response) -> std::result::Result<reqwest::Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status, &headers, &body))
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    fn name(&self) -> &str {
        PLATFORM
    }

    async fn publish(&self, text: &str) -> std::result::Result<String, PublishError> {
        debug!(platform = PLATFORM, chars = text.chars().count(), "Posting tweet");

        let response = self
            .http
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM, e))?;

        let created: DataEnvelope<CreatedTweet> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(PLATFORM, e))?;

        info!(platform = PLATFORM, post_id = %created.data.id, "Tweet posted");
        Ok(created.data.id)
    }

    async fn test_connection(&self) -> std::result::Result<String, PublishError> {
        let response = self
            .http
            .get(format!("{}/2/users/me", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM, e))?;

        let me: DataEnvelope<Me> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(PLATFORM, e))?;

        Ok(format!("@{}", me.data.username))
    }
}

fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str) -> PublishError {
    let message = serde_json::from_str::<Problem>(body)
        .ok()
        .and_then(|p| p.detail.or(p.title))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status.as_u16() {
        401 | 403 => PublishError::AuthFailure(message),
        429 => PublishError::RateLimited {
            message,
            retry_after: rate_limit_reset(headers).or_else(|| retry_after_header(headers)),
        },
        400 | 413 | 422 => PublishError::PayloadRejected(message),
        _ => PublishError::TransientNetworkError(message),
    }
}

/// Time until `x-rate-limit-reset` (epoch seconds)
fn rate_limit_reset(headers: &HeaderMap) -> Option<Duration> {
    let reset = headers
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;
    let wait = reset - chrono::Utc::now().timestamp();
    Some(Duration::from_secs(wait.max(0) as u64))
}
