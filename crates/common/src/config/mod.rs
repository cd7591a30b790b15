//! Configuration management for CardForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{DEFAULT_CHAT_MODEL, DEFAULT_CLOUD_MODEL, DEFAULT_VISION_MODEL};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Document storage configuration
    pub storage: StorageConfig,

    /// Model backend configuration
    pub llm: LlmConfig,

    /// Remote worker dispatch configuration
    pub worker: WorkerConfig,

    /// Generation pipeline configuration
    pub generation: GenerationConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible base URL (used to build callback URLs)
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Storage service base URL
    pub base_url: Option<String>,

    /// Service key with read access to the bucket
    pub service_key: Option<String>,

    /// Bucket holding uploaded documents
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Signed URL TTL for the synchronous pipeline, in seconds
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,

    /// Signed URL TTL for remote dispatch, in seconds (workers fetch later)
    #[serde(default = "default_dispatch_url_ttl")]
    pub dispatch_url_ttl_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Default provider: local or cloud
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Local chat completion endpoint
    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,

    /// Local chat model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Local vision-capable model (scanned documents)
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Cloud API key
    pub cloud_api_key: Option<String>,

    /// Cloud API base URL
    #[serde(default = "default_cloud_base_url")]
    pub cloud_base_url: String,

    /// Cloud model
    #[serde(default = "default_cloud_model")]
    pub cloud_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window passed to the local backend
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Remote worker base URL
    pub endpoint: Option<String>,

    /// Bearer token presented to the worker
    pub token: Option<String>,

    /// Shared secret the worker must echo back on the callback
    pub callback_secret: Option<String>,

    /// Dispatch request timeout in seconds
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Pages grouped per chunk
    #[serde(default = "default_window_pages")]
    pub window_pages: usize,

    /// Default number of cards to aim for
    #[serde(default = "default_target_count")]
    pub default_target_count: u32,

    /// Total extracted characters below which a document is treated as
    /// scanned (image-only) and routed to the vision model
    #[serde(default = "default_scanned_threshold")]
    pub scanned_char_threshold: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_public_base_url() -> String { "http://localhost:8080".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_bucket() -> String { "uploads".to_string() }
fn default_signed_url_ttl() -> u64 { 600 }
fn default_dispatch_url_ttl() -> u64 { 1800 }
fn default_storage_timeout() -> u64 { 30 }
fn default_llm_provider() -> String { "local".to_string() }
fn default_local_base_url() -> String { "http://localhost:11434".to_string() }
fn default_chat_model() -> String { DEFAULT_CHAT_MODEL.to_string() }
fn default_vision_model() -> String { DEFAULT_VISION_MODEL.to_string() }
fn default_cloud_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_cloud_model() -> String { DEFAULT_CLOUD_MODEL.to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_num_ctx() -> u32 { 8192 }
fn default_llm_timeout() -> u64 { 120 }
fn default_dispatch_timeout() -> u64 { 30 }
fn default_max_chars() -> usize { 4000 }
fn default_window_pages() -> usize { 2 }
fn default_target_count() -> u32 { 50 }
fn default_scanned_threshold() -> usize { 400 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "cardforge".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Callback URL the remote worker posts results back to
    pub fn callback_url(&self) -> String {
        format!(
            "{}/v1/remote/callback",
            self.server.public_base_url.trim_end_matches('/')
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                public_base_url: default_public_base_url(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/cardforge".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            storage: StorageConfig {
                base_url: None,
                service_key: None,
                bucket: default_bucket(),
                signed_url_ttl_secs: default_signed_url_ttl(),
                dispatch_url_ttl_secs: default_dispatch_url_ttl(),
                timeout_secs: default_storage_timeout(),
            },
            llm: LlmConfig {
                provider: default_llm_provider(),
                local_base_url: default_local_base_url(),
                chat_model: default_chat_model(),
                vision_model: default_vision_model(),
                cloud_api_key: None,
                cloud_base_url: default_cloud_base_url(),
                cloud_model: default_cloud_model(),
                temperature: default_temperature(),
                num_ctx: default_num_ctx(),
                timeout_secs: default_llm_timeout(),
            },
            worker: WorkerConfig {
                endpoint: None,
                token: None,
                callback_secret: None,
                dispatch_timeout_secs: default_dispatch_timeout(),
            },
            generation: GenerationConfig {
                max_chars: default_max_chars(),
                window_pages: default_window_pages(),
                default_target_count: default_target_count(),
                scanned_char_threshold: default_scanned_threshold(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.chat_model, "qwen2.5:7b-instruct");
        assert_eq!(config.generation.max_chars, 4000);
        assert_eq!(config.generation.window_pages, 2);
        assert_eq!(config.generation.scanned_char_threshold, 400);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/cardforge");
    }

    #[test]
    fn test_callback_url_strips_trailing_slash() {
        let mut config = AppConfig::default();
        config.server.public_base_url = "https://cards.example.com/".to_string();
        assert_eq!(
            config.callback_url(),
            "https://cards.example.com/v1/remote/callback"
        );
    }
}
