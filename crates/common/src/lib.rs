//! CardForge Common Library
//!
//! Shared code for the CardForge services including:
//! - Database models and repository patterns
//! - Model client abstraction (local and cloud text-completion backends)
//! - Document storage client abstraction
//! - Spaced-repetition scheduler
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod srs;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use llm::ModelClient;
pub use storage::DocumentStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default local chat model
pub const DEFAULT_CHAT_MODEL: &str = "qwen2.5:7b-instruct";

/// Default local vision-capable model (scanned documents)
pub const DEFAULT_VISION_MODEL: &str = "qwen2.5vl:7b";

/// Default cloud generation model
pub const DEFAULT_CLOUD_MODEL: &str = "gemini-1.5-flash";
