//! OpenCast - generate short posts with a language model and publish them
//!
//! This library holds the category store, content validation, the
//! generation retry loop and the publishing channels. The `opencast`
//! binary is a thin command-line layer over it.

pub mod bot;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod generator;
pub mod logging;
pub mod orchestrator;
pub mod poster;
pub mod publishers;
pub mod retry;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use bot::{Bot, RunReport};
pub use config::Config;
pub use error::{OpenCastError, Result};
pub use orchestrator::{GenerationSettings, Orchestrator};
pub use poster::{publish_all, PostResult, PublishReport};
pub use store::CategoryStore;
pub use types::{Category, ContentRules, Entry, Topic};
