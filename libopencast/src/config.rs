//! Configuration management for OpenCast
//!
//! Configuration is a TOML file. Every section is optional and falls back to
//! the defaults below, so a file only has to carry credentials and the
//! settings it changes. Environment variables prefixed with `OPENCAST_` are
//! layered on top by [`Config::apply_env`].

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::retry::{Backoff, RetryPolicy};
use crate::types::{ContentRules, TOPIC_PLACEHOLDER};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Create a professional development tip about {topic}. \
Keep it concise and actionable. Include exactly 2 relevant hashtags.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub content: ContentConfig,
    pub twitter: Option<TwitterConfig>,
    pub telegram: Option<TelegramConfig>,
    pub defaults: DefaultsConfig,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub categories_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            categories_dir: "~/.local/share/opencast/categories".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    pub max_attempts: u32,
    #[serde(with = "humantime_duration")]
    pub retry_delay: Duration,
    pub backoff: Backoff,
    pub use_seeds: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            use_seeds: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub required_hashtags: usize,
    pub default_prompt_template: String,
    /// Trim over-long text at a word boundary before validating it
    pub auto_trim: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        let rules = ContentRules::default();
        Self {
            min_length: rules.min_length,
            max_length: rules.max_length,
            required_hashtags: rules.required_hashtags,
            default_prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            auto_trim: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OAuth 2.0 user-context access token with `tweet.write`
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub access_token: Option<SecretString>,
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
    #[serde(default = "default_channel_timeout", with = "humantime_duration")]
    pub timeout: Duration,
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub bot_token: Option<SecretString>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
    #[serde(default = "default_channel_timeout", with = "humantime_duration")]
    pub timeout: Duration,
    /// Send a message to the chat when a run fails to generate content
    #[serde(default)]
    pub alert_on_failure: bool,
}

fn default_parse_mode() -> String {
    "HTML".to_string()
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_channel_timeout() -> Duration {
    Duration::from_secs(15)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub dry_run: bool,
}

/// The `[logging]` section; see [`crate::logging::LoggingConfig`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the resolved location
    ///
    /// An explicit path must exist. When the path comes from the default
    /// location and no file is there, built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = resolve_config_path(explicit)?;
        if explicit.is_none() && std::env::var_os("OPENCAST_CONFIG").is_none() && !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Layer environment overrides on top of file values
    ///
    /// `lookup` is normally `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("OPENCAST_CATEGORIES_DIR") {
            self.store.categories_dir = dir;
        }
        if let Some(key) = lookup("OPENCAST_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.generation.api_key = Some(SecretString::from(key));
        }
        if let Some(model) = lookup("OPENCAST_MODEL") {
            self.generation.model = model;
        }
        if let Some(url) = lookup("OPENCAST_OPENAI_BASE_URL") {
            self.generation.base_url = url;
        }
        if let Some(token) = lookup("OPENCAST_TWITTER_ACCESS_TOKEN") {
            self.twitter
                .get_or_insert_with(TwitterConfig::disabled)
                .access_token = Some(SecretString::from(token));
        }
        if let Some(token) = lookup("OPENCAST_TELEGRAM_BOT_TOKEN") {
            self.telegram
                .get_or_insert_with(TelegramConfig::disabled)
                .bot_token = Some(SecretString::from(token));
        }
        if let Some(chat_id) = lookup("OPENCAST_TELEGRAM_CHAT_ID") {
            self.telegram
                .get_or_insert_with(TelegramConfig::disabled)
                .chat_id = Some(chat_id);
        }
        if let Some(dry_run) = lookup("OPENCAST_DRY_RUN") {
            self.defaults.dry_run = matches!(dry_run.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Check everything a generate-and-publish run needs
    pub fn validate(&self) -> Result<()> {
        self.validate_generation()?;

        if let Some(twitter) = self.twitter.as_ref().filter(|t| t.enabled) {
            if !has_secret(&twitter.access_token) {
                return Err(ConfigError::MissingField("twitter.access_token".to_string()).into());
            }
        }
        if let Some(telegram) = self.telegram.as_ref().filter(|t| t.enabled) {
            if !has_secret(&telegram.bot_token) {
                return Err(ConfigError::MissingField("telegram.bot_token".to_string()).into());
            }
            if telegram.chat_id.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err(ConfigError::MissingField("telegram.chat_id".to_string()).into());
            }
        }
        Ok(())
    }

    /// Check only the settings needed to generate content
    pub fn validate_generation(&self) -> Result<()> {
        if !has_secret(&self.generation.api_key) {
            return Err(ConfigError::MissingField("generation.api_key".to_string()).into());
        }
        if self.generation.max_attempts == 0 {
            return Err(invalid("generation.max_attempts must be at least 1"));
        }
        if self.content.min_length >= self.content.max_length {
            return Err(invalid(&format!(
                "content.min_length ({}) must be less than content.max_length ({})",
                self.content.min_length, self.content.max_length
            )));
        }
        if !self.content.default_prompt_template.contains(TOPIC_PLACEHOLDER) {
            return Err(invalid(&format!(
                "content.default_prompt_template must contain {}",
                TOPIC_PLACEHOLDER
            )));
        }
        Ok(())
    }

    /// Names of channels that are enabled and have credentials
    pub fn enabled_platforms(&self) -> Vec<&'static str> {
        let mut platforms = Vec::new();
        if self
            .twitter
            .as_ref()
            .is_some_and(|t| t.enabled && has_secret(&t.access_token))
        {
            platforms.push("twitter");
        }
        if self.telegram.as_ref().is_some_and(|t| {
            t.enabled && has_secret(&t.bot_token) && t.chat_id.as_deref().is_some_and(|c| !c.is_empty())
        }) {
            platforms.push("telegram");
        }
        platforms
    }

    pub fn content_rules(&self) -> ContentRules {
        ContentRules {
            min_length: self.content.min_length,
            max_length: self.content.max_length,
            required_hashtags: self.content.required_hashtags,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation.max_attempts,
            delay: self.generation.retry_delay,
            backoff: self.generation.backoff,
        }
    }

    /// Category directory with `~` expanded
    pub fn categories_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store.categories_dir).to_string())
    }
}

impl TwitterConfig {
    fn disabled() -> Self {
        Self {
            enabled: false,
            access_token: None,
            base_url: default_twitter_base_url(),
            timeout: default_channel_timeout(),
        }
    }
}

impl TelegramConfig {
    fn disabled() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: None,
            parse_mode: default_parse_mode(),
            base_url: default_telegram_base_url(),
            timeout: default_channel_timeout(),
            alert_on_failure: false,
        }
    }
}

fn has_secret(secret: &Option<SecretString>) -> bool {
    secret
        .as_ref()
        .is_some_and(|s| !s.expose_secret().trim().is_empty())
}

fn invalid(message: &str) -> crate::error::OpenCastError {
    ConfigError::Invalid(message.to_string()).into()
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

/// Durations written as humantime strings such as `"5s"` or `"1m 30s"`
mod humantime_duration {
    use serde::{de::Error, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand(path));
    }

    if let Ok(path) = std::env::var("OPENCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("opencast").join("config.toml"))
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).to_string()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenCastError;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.content_rules(), ContentRules::default());
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.max_tokens, 150);
        assert_eq!(config.generation.retry_delay, Duration::from_secs(5));
        assert!(config.generation.use_seeds);
        assert!(!config.content.auto_trim);
        assert!(config.twitter.is_none());
        assert!(config.enabled_platforms().is_empty());
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
            [store]
            categories_dir = "/srv/opencast/categories"

            [generation]
            api_key = "sk-test"
            model = "gpt-4o-mini"
            timeout = "45s"
            max_attempts = 5
            retry_delay = "2s"
            backoff = "exponential"
            use_seeds = false

            [content]
            min_length = 40
            max_length = 280
            required_hashtags = 3

            [twitter]
            enabled = true
            access_token = "tw-token"

            [telegram]
            enabled = true
            bot_token = "123:abc"
            chat_id = "@opencast"
            alert_on_failure = true
        "#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.categories_dir(), PathBuf::from("/srv/opencast/categories"));
        assert_eq!(config.generation.timeout, Duration::from_secs(45));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                max_attempts: 5,
                delay: Duration::from_secs(2),
                backoff: Backoff::Exponential,
            }
        );
        assert_eq!(config.content_rules().required_hashtags, 3);

        let twitter = config.twitter.as_ref().unwrap();
        assert_eq!(twitter.base_url, "https://api.twitter.com");
        assert_eq!(twitter.timeout, Duration::from_secs(15));

        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.parse_mode, "HTML");
        assert!(telegram.alert_on_failure);

        assert_eq!(config.enabled_platforms(), vec!["twitter", "telegram"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_duration_is_parse_error() {
        let result = Config::from_toml("[generation]\ntimeout = \"soon\"\n");
        assert!(matches!(
            result,
            Err(OpenCastError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::from_toml("").unwrap();
        assert!(matches!(
            config.validate(),
            Err(OpenCastError::Config(ConfigError::MissingField(f))) if f == "generation.api_key"
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_lengths() {
        let config = Config::from_toml(
            "[generation]\napi_key = \"sk\"\n[content]\nmin_length = 300\nmax_length = 200\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(OpenCastError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = Config::from_toml(
            "[generation]\napi_key = \"sk\"\n[content]\ndefault_prompt_template = \"Write a tip\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_enabled_telegram_needs_chat_id() {
        let config = Config::from_toml(
            "[generation]\napi_key = \"sk\"\n[telegram]\nenabled = true\nbot_token = \"123:abc\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(OpenCastError::Config(ConfigError::MissingField(f))) if f == "telegram.chat_id"
        ));
        assert!(config.enabled_platforms().is_empty());
    }

    #[test]
    fn test_disabled_channel_is_not_listed() {
        let config =
            Config::from_toml("[twitter]\nenabled = false\naccess_token = \"tw\"\n").unwrap();
        assert!(config.enabled_platforms().is_empty());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::from_toml("[generation]\napi_key = \"from-file\"\n").unwrap();
        config.apply_env(lookup_from(&[
            ("OPENCAST_OPENAI_API_KEY", "from-env"),
            ("OPENCAST_CATEGORIES_DIR", "/tmp/cats"),
            ("OPENCAST_TELEGRAM_BOT_TOKEN", "999:xyz"),
            ("OPENCAST_TELEGRAM_CHAT_ID", "-100123"),
            ("OPENCAST_DRY_RUN", "true"),
        ]));

        assert_eq!(
            config.generation.api_key.as_ref().unwrap().expose_secret(),
            "from-env"
        );
        assert_eq!(config.categories_dir(), PathBuf::from("/tmp/cats"));
        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.chat_id.as_deref(), Some("-100123"));
        assert!(!telegram.enabled);
        assert!(config.defaults.dry_run);
    }

    #[test]
    fn test_apply_env_falls_back_to_openai_api_key() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("OPENAI_API_KEY", "sk-plain")]));
        assert_eq!(
            config.generation.api_key.as_ref().unwrap().expose_secret(),
            "sk-plain"
        );
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let config = Config::from_toml("[generation]\napi_key = \"sk-very-secret\"\n").unwrap();
        assert!(!format!("{:?}", config).contains("sk-very-secret"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_precedence() {
        let explicit = resolve_config_path(Some(Path::new("/etc/opencast.toml"))).unwrap();
        assert_eq!(explicit, PathBuf::from("/etc/opencast.toml"));

        std::env::set_var("OPENCAST_CONFIG", "/tmp/opencast-env.toml");
        let from_env = resolve_config_path(None).unwrap();
        std::env::remove_var("OPENCAST_CONFIG");
        assert_eq!(from_env, PathBuf::from("/tmp/opencast-env.toml"));
    }

    #[test]
    #[serial]
    fn test_load_explicit_missing_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/opencast/config.toml")));
        assert!(matches!(
            result,
            Err(OpenCastError::Config(ConfigError::ReadError(_)))
        ));
    }
}
