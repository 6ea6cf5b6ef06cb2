//! Telegram publisher over the Bot API

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::error::{ConfigError, PublishError, Result};
use crate::publishers::{http_client, transport_error, Publisher};

const PLATFORM: &str = "telegram";

/// Bot API limit for one message
pub const MESSAGE_LIMIT: usize = 4096;

pub struct TelegramPublisher {
    http: Client,
    bot_token: SecretString,
    chat_id: String,
    parse_mode: String,
    base_url: String,
}

/// Every Bot API response is wrapped in this envelope
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
    first_name: String,
}

impl TelegramPublisher {
    pub fn new(
        bot_token: SecretString,
        chat_id: &str,
        parse_mode: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            bot_token,
            chat_id: chat_id.to_string(),
            parse_mode: parse_mode.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("telegram.bot_token".to_string()))?;
        let chat_id = config
            .chat_id
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("telegram.chat_id".to_string()))?;
        Self::new(
            SecretString::from(token.expose_secret().to_owned()),
            chat_id,
            &config.parse_mode,
            &config.base_url,
            config.timeout,
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }

    async fn send_message(&self, text: &str) -> std::result::Result<i64, PublishError> {
        let body = if self.parse_mode.eq_ignore_ascii_case("html") {
            escape_html(text)
        } else {
            text.to_string()
        };

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": body,
                "parse_mode": self.parse_mode,
            }))
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM, e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(PLATFORM, e.without_url()))?;
        let sent: SentMessage = parse_response(status.as_u16(), &text)?;
        Ok(sent.message_id)
    }

    /// Post a failure notice to the chat
    pub async fn send_error_alert(&self, message: &str) -> std::result::Result<String, PublishError> {
        let preview: String = message.chars().take(100).collect();
        info!(platform = PLATFORM, alert = %preview, "Sending error alert");

        match self.send_message(&format_alert(message)).await {
            Ok(id) => Ok(id.to_string()),
            Err(e) => {
                warn!(platform = PLATFORM, error = %e, "Failed to send error alert");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &str {
        PLATFORM
    }

    async fn publish(&self, text: &str) -> std::result::Result<String, PublishError> {
        debug!(platform = PLATFORM, chat_id = %self.chat_id, "Sending message");
        let message_id = self.send_message(text).await?;
        info!(platform = PLATFORM, post_id = message_id, "Message sent");
        Ok(message_id.to_string())
    }

    async fn test_connection(&self) -> std::result::Result<String, PublishError> {
        let response = self
            .http
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM, e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(PLATFORM, e.without_url()))?;
        let bot: BotUser = parse_response(status.as_u16(), &text)?;

        Ok(match bot.username {
            Some(username) => format!("@{}", username),
            None => bot.first_name,
        })
    }
}

/// Alert text, cut to the message limit
pub fn format_alert(message: &str) -> String {
    format!("🚨 OpenCast Bot Error Alert 🚨\n\n{}", message)
        .chars()
        .take(MESSAGE_LIMIT)
        .collect()
}

/// Escape the three characters Telegram's HTML mode treats as markup
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn parse_response<T: serde::de::DeserializeOwned>(
    http_status: u16,
    body: &str,
) -> std::result::Result<T, PublishError> {
    let parsed: ApiResponse<T> = serde_json::from_str(body).map_err(|e| {
        PublishError::TransientNetworkError(format!(
            "telegram: unreadable response (HTTP {}): {}",
            http_status, e
        ))
    })?;

    if parsed.ok {
        if let Some(result) = parsed.result {
            return Ok(result);
        }
    }

    let code = parsed.error_code.unwrap_or(http_status);
    let message = parsed
        .description
        .unwrap_or_else(|| format!("HTTP {}", http_status));
    Err(match code {
        401 | 403 | 404 => PublishError::AuthFailure(message),
        429 => PublishError::RateLimited {
            message,
            retry_after: parsed
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs),
        },
        400 | 413 => PublishError::PayloadRejected(message),
        _ => PublishError::TransientNetworkError(message),
    })
}
