//! opencast - Generate short posts from curated topics and publish them

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libopencast::bot::Bot;
use libopencast::config::Config;
use libopencast::duplicate::is_duplicate;
use libopencast::error::{ConfigError, OpenCastError};
use libopencast::generator::openai::OpenAiClient;
use libopencast::logging::LoggingConfig;
use libopencast::poster::PublishReport;
use libopencast::publishers::{build_channels, Publisher, TelegramPublisher};
use libopencast::store::CategoryStore;
use libopencast::validation::{char_length, extract_hashtags, validate};
use libopencast::{Entry, GenerationSettings, Orchestrator};
use serde_json::json;
use std::path::PathBuf;

/// Same code as a validation error
const EXIT_INVALID_CONTENT: i32 = 3;
/// Every enabled channel failed to publish
const EXIT_ALL_CHANNELS_FAILED: i32 = 6;

#[derive(Parser, Debug)]
#[command(name = "opencast")]
#[command(version, about = "Generate short posts from curated topics and publish them")]
#[command(long_about = r#"Generate short social-media posts with a language model, validate and store
them in JSON category files, and publish them to Twitter and Telegram.

EXAMPLES:
    # Generate and store one entry for a topic
    opencast generate cyber-security "Input Validation"

    # Generate for the least-used topic and publish everywhere
    opencast post cyber-security

    # Publish to Telegram only, without actually sending
    opencast post cyber-security --platform telegram --dry-run

    # Check a candidate text against a category's rules
    opencast validate cyber-security "Validate input. #Security #OWASP"

    # JSON output for scripting
    opencast list-topics cyber-security --format json | jq '.[].topic'

EXIT CODES:
    0 - Success (including partial publishing failure)
    1 - Error (configuration, store, network)
    2 - Authentication failed
    3 - Content failed validation
    4 - Category or topic not found
    5 - Generation failed or ran out of attempts
    6 - Every channel failed to publish
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Generate and store but do not publish
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate and store one entry without publishing
    Generate {
        /// Category id (file name without .json)
        category: String,

        /// Topic name (least-used topic if omitted)
        topic: Option<String>,
    },

    /// Generate, store and publish one entry
    Post {
        category: String,

        topic: Option<String>,

        /// Publish only to these channels (comma-separated: twitter,telegram)
        #[arg(short, long, value_delimiter = ',')]
        platform: Vec<String>,
    },

    /// List category ids
    ListCategories,

    /// Show a category's settings and topics
    ShowCategory { category: String },

    /// List a category's topics with entry counts
    ListTopics { category: String },

    /// Show entry counts for a category
    Stats { category: String },

    /// Copy a category file to a timestamped backup
    Backup { category: String },

    /// Check text against a category's rules
    Validate {
        category: String,

        /// Candidate text
        text: String,

        /// Also reject text that duplicates an entry of this topic
        #[arg(long)]
        topic: Option<String>,
    },

    /// Load and check the configuration
    ValidateConfig,

    /// Check credentials of the enabled channels
    TestConnection {
        /// Only this channel (twitter or telegram)
        platform: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<OpenCastError>()
        .map(OpenCastError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env(|key| std::env::var(key).ok());

    LoggingConfig::from_settings(&config.logging, cli.verbose, |key| std::env::var(key).ok()).init();
    tracing::debug!("opencast started with command: {:?}", cli.command);

    let json = cli.format == "json";
    let dry_run = cli.dry_run || config.defaults.dry_run;

    match cli.command {
        Commands::Generate { category, topic } => {
            let bot = build_bot(&config)?;
            let (topic, entry) = bot.generate(&category, topic.as_deref()).await?;
            print_entry(&category, &topic, &entry, json)?;
            Ok(0)
        }
        Commands::Post {
            category,
            topic,
            platform,
        } => {
            config.validate()?;
            let filter = (!platform.is_empty()).then_some(platform.as_slice());
            let channels = build_channels(&config, filter)?;
            if channels.is_empty() {
                let error = ConfigError::Invalid("no publishing channels are enabled".to_string());
                return Err(OpenCastError::from(error).into());
            }

            let bot = build_bot(&config)?;
            let report = bot
                .run(&category, topic.as_deref(), &channels, dry_run)
                .await?;

            print_entry(&report.category_id, &report.topic, &report.entry, json)?;
            print_publish_report(&report.publish, json)?;

            if report.publish.all_failed() {
                Ok(EXIT_ALL_CHANNELS_FAILED)
            } else {
                Ok(0)
            }
        }
        Commands::ListCategories => {
            let store = open_store(&config)?;
            let ids = store.list_categories()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
            Ok(0)
        }
        Commands::ShowCategory { category } => {
            let store = open_store(&config)?;
            let category = store.load(&category)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                let rules = category.rules(&config.content_rules());
                println!("{} ({})", category.name, category.category_id);
                if !category.description.is_empty() {
                    println!("  {}", category.description);
                }
                println!("  language: {}", category.language);
                println!(
                    "  length: {}-{} characters, {} hashtag(s)",
                    rules.min_length, rules.max_length, rules.required_hashtags
                );
                println!(
                    "  prompt: {}",
                    category.prompt_template_or(&config.content.default_prompt_template)
                );
                println!("  topics: {}", category.topics.len());
                for topic in &category.topics {
                    println!("    - {} ({} entries)", topic.topic, topic.entries.len());
                }
            }
            Ok(0)
        }
        Commands::ListTopics { category } => {
            let store = open_store(&config)?;
            let category = store.load(&category)?;
            if json {
                let topics: Vec<_> = category
                    .topics
                    .iter()
                    .map(|t| json!({ "topic": t.topic, "entries": t.entries.len() }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&topics)?);
            } else {
                for topic in &category.topics {
                    println!("{}\t{}", topic.entries.len(), topic.topic);
                }
            }
            Ok(0)
        }
        Commands::Stats { category } => {
            let store = open_store(&config)?;
            let stats = store.stats(&category)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("category: {} ({})", stats.name, stats.category_id);
                println!("language: {}", stats.language);
                println!("topics: {}", stats.topic_count);
                println!("entries: {}", stats.total_entries);
            }
            Ok(0)
        }
        Commands::Backup { category } => {
            let store = open_store(&config)?;
            let path = store.backup(&category)?;
            if json {
                println!("{}", json!({ "backup": path.display().to_string() }));
            } else {
                println!("{}", path.display());
            }
            Ok(0)
        }
        Commands::Validate {
            category,
            text,
            topic,
        } => {
            let store = open_store(&config)?;
            let category = store.load(&category)?;
            let rules = category.rules(&config.content_rules());
            validate(&text, &rules).map_err(OpenCastError::from)?;

            if let Some(topic_name) = topic {
                let topic = category.topic(&topic_name).ok_or_else(|| {
                    OpenCastError::NotFound(format!(
                        "topic '{}' in category '{}'",
                        topic_name, category.category_id
                    ))
                })?;
                if is_duplicate(&text, topic) {
                    eprintln!(
                        "Error: Content duplicates an existing entry of topic '{}'",
                        topic.topic
                    );
                    return Ok(EXIT_INVALID_CONTENT);
                }
            }

            if json {
                println!(
                    "{}",
                    json!({
                        "valid": true,
                        "length": char_length(&text),
                        "hashtags": extract_hashtags(&text),
                    })
                );
            } else {
                println!("Content is valid ({} characters)", char_length(&text));
            }
            Ok(0)
        }
        Commands::ValidateConfig => {
            config.validate()?;
            let platforms = config.enabled_platforms();
            let categories_dir = config.categories_dir();
            if json {
                println!(
                    "{}",
                    json!({
                        "valid": true,
                        "enabled_platforms": platforms,
                        "categories_dir": categories_dir.display().to_string(),
                    })
                );
            } else {
                println!("Configuration is valid");
                println!("  categories: {}", categories_dir.display());
                if platforms.is_empty() {
                    println!("  platforms: none enabled");
                } else {
                    println!("  platforms: {}", platforms.join(", "));
                }
            }
            Ok(0)
        }
        Commands::TestConnection { platform } => {
            let filter = platform.map(|p| vec![p]);
            let channels = build_channels(&config, filter.as_deref())?;

            let mut first_failure = None;
            let mut results = Vec::new();
            for channel in &channels {
                match channel.test_connection().await {
                    Ok(account) => {
                        if !json {
                            println!("✓ {}: {}", channel.name(), account);
                        }
                        results.push(json!({ "platform": channel.name(), "success": true, "account": account }));
                    }
                    Err(e) => {
                        if !json {
                            println!("✗ {}: {}", channel.name(), e);
                        }
                        results.push(json!({ "platform": channel.name(), "success": false, "error": e.to_string() }));
                        first_failure.get_or_insert(e);
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if channels.is_empty() {
                println!("No channels enabled");
            }

            match first_failure {
                Some(e) => Err(OpenCastError::Publish(e).into()),
                None => Ok(0),
            }
        }
    }
}

fn open_store(config: &Config) -> Result<CategoryStore> {
    let dir = config.categories_dir();
    CategoryStore::new(&dir)
        .with_context(|| format!("Failed to open category store at {}", dir.display()))
}

fn build_bot(config: &Config) -> Result<Bot> {
    config.validate_generation()?;
    let store = open_store(config)?;
    let client = OpenAiClient::from_config(&config.generation)?;
    let orchestrator = Orchestrator::new(store, Box::new(client))
        .with_settings(GenerationSettings::from_config(config));

    let mut bot = Bot::new(orchestrator);
    if let Some(telegram) = config.telegram.as_ref().filter(|t| t.alert_on_failure) {
        match TelegramPublisher::from_config(telegram) {
            Ok(alerts) => bot = bot.with_alerts(Box::new(alerts)),
            Err(e) => tracing::warn!(error = %e, "Error alerts disabled"),
        }
    }
    Ok(bot)
}

fn print_entry(category_id: &str, topic: &str, entry: &Entry, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "category_id": category_id,
                "topic": topic,
                "entry": entry,
            }))?
        );
    } else {
        println!("{}", entry.content);
    }
    Ok(())
}

fn print_publish_report(report: &PublishReport, json: bool) -> Result<()> {
    if json {
        let results: Vec<_> = report
            .results
            .iter()
            .map(|r| {
                json!({
                    "platform": r.platform,
                    "success": r.success,
                    "dry_run": r.dry_run,
                    "platform_post_id": r.platform_post_id,
                    "error": r.error.as_ref().map(|e| e.to_string()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &report.results {
        let symbol = if result.success { "✓" } else { "✗" };
        if result.dry_run {
            eprintln!("  {} {}: dry run", symbol, result.platform);
        } else if let Some(post_id) = &result.platform_post_id {
            eprintln!("  {} {}: {}", symbol, result.platform, post_id);
        } else if let Some(error) = &result.error {
            eprintln!("  {} {}: {}", symbol, result.platform, error);
        }
    }
    Ok(())
}
