//! Sub-configuration structs with service defaults.

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum accepted request body in megabytes
    pub max_body_mb: u64,

    /// Value of the Access-Control-Allow-Origin header
    pub cors_allow_origin: String,

    /// Requests handled at once; further connections get 503
    pub max_in_flight: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_mb: 25,
            cors_allow_origin: "*".to_string(),
            max_in_flight: 16,
        }
    }
}

impl ServerConfig {
    /// Socket address string, e.g. `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Target size `[height, width]` used when a request omits `tamanho`
    pub default_size: [u32; 2],

    /// Largest accepted target height or width
    pub max_target_dimension: u32,

    /// JPEG quality (1-100) for the preserved original
    pub original_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            default_size: [64, 64],
            max_target_dimension: 4096,
            original_quality: 90,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum encoded image size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum decoded image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode-to-encode timeout in milliseconds
    pub process_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 20,
            max_image_dimension: 10000,
            process_timeout_ms: 10000,
        }
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Supabase Storage REST API
    Supabase,
    /// In-process store; nothing leaves the process
    Memory,
}

/// How object URLs are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    /// Unauthenticated public bucket URL
    Public,
    /// Time-limited signed URL
    Signed,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend implementation
    pub backend: StorageBackend,

    /// Project base URL (supports ${ENV_VAR} syntax)
    pub url: String,

    /// Service key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Bucket receiving both artifacts
    pub bucket: String,

    /// Path prefix for processed thumbnails
    pub processed_prefix: String,

    /// Path prefix for preserved originals
    pub original_prefix: String,

    /// Public or signed URLs
    pub url_mode: UrlMode,

    /// Lifetime of signed URLs in seconds
    pub signed_url_ttl_secs: u64,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,

    /// Object cap for the memory backend; further uploads are rejected
    pub memory_max_objects: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Supabase,
            url: "${SUPABASE_URL}".to_string(),
            api_key: "${SUPABASE_KEY}".to_string(),
            bucket: "fotos".to_string(),
            processed_prefix: "processadas".to_string(),
            original_prefix: "originais".to_string(),
            url_mode: UrlMode::Public,
            signed_url_ttl_secs: 3600,
            timeout_ms: 30000,
            memory_max_objects: 1000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Plain values pass through; empty values and unset variables yield `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
