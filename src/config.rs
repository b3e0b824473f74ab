//! Configuration Module
//!
//! Handles loading the cache, processor and storage configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// LRU cache parameters. Immutable after construction.
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// When false every cache operation is a no-op
    pub enabled: bool,
    /// Maximum number of entries
    pub capacity: usize,
    /// Maximum total payload size in bytes
    pub max_size_bytes: u64,
    /// Lifetime of an entry after insertion
    pub ttl: Duration,
    /// Interval between background sweeps of expired entries
    pub cleanup_interval: Duration,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1000,
            max_size_bytes: 100 * 1024 * 1024,
            ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Image processor parameters.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Quality used when a caller does not supply one (1-100)
    pub default_quality: u8,
    /// Thumbnail edge lengths the service is willing to generate
    pub thumbnail_sizes: Vec<u32>,
    /// Lower-case format names accepted in processing options
    pub allowed_formats: Vec<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            default_quality: 85,
            thumbnail_sizes: vec![150, 300, 600],
            allowed_formats: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// On-disk storage parameters.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_path: PathBuf,
    /// Public URL prefix; empty means files are not publicly addressable
    pub base_url: String,
    /// Largest accepted file in bytes
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./uploads"),
            base_url: "/uploads".to_string(),
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// Complete service configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: ImageCacheConfig,
    pub processor: ProcessorConfig,
    pub storage: StorageConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Interval between temp directory sweeps
    pub temp_cleanup_interval: Duration,
    /// Temp files older than this are removed by the sweep
    pub temp_max_age: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED`, `CACHE_CAPACITY`, `CACHE_MAX_SIZE_BYTES`,
    ///   `CACHE_TTL_SECS`, `CACHE_CLEANUP_INTERVAL_SECS`
    /// - `PROCESSOR_MAX_WIDTH`, `PROCESSOR_MAX_HEIGHT`, `PROCESSOR_DEFAULT_QUALITY`,
    ///   `PROCESSOR_THUMBNAIL_SIZES` (comma separated), `PROCESSOR_ALLOWED_FORMATS`
    ///   (comma separated)
    /// - `STORAGE_BASE_PATH`, `STORAGE_BASE_URL`, `STORAGE_MAX_FILE_SIZE`
    /// - `SERVER_PORT`, `TEMP_CLEANUP_INTERVAL_SECS`, `TEMP_MAX_AGE_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache = ImageCacheConfig {
            enabled: env_or("CACHE_ENABLED", defaults.cache.enabled),
            capacity: env_or("CACHE_CAPACITY", defaults.cache.capacity),
            max_size_bytes: env_or("CACHE_MAX_SIZE_BYTES", defaults.cache.max_size_bytes),
            ttl: env_secs_or("CACHE_TTL_SECS", defaults.cache.ttl),
            cleanup_interval: env_secs_or(
                "CACHE_CLEANUP_INTERVAL_SECS",
                defaults.cache.cleanup_interval,
            ),
        };

        let processor = ProcessorConfig {
            max_width: env_or("PROCESSOR_MAX_WIDTH", defaults.processor.max_width),
            max_height: env_or("PROCESSOR_MAX_HEIGHT", defaults.processor.max_height),
            default_quality: env_or(
                "PROCESSOR_DEFAULT_QUALITY",
                defaults.processor.default_quality,
            ),
            thumbnail_sizes: env_list_or(
                "PROCESSOR_THUMBNAIL_SIZES",
                defaults.processor.thumbnail_sizes,
            ),
            allowed_formats: env_list_or::<String>(
                "PROCESSOR_ALLOWED_FORMATS",
                defaults.processor.allowed_formats,
            )
            .into_iter()
            .map(|f| f.to_lowercase())
            .collect(),
        };

        let storage = StorageConfig {
            base_path: env::var("STORAGE_BASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage.base_path),
            base_url: env::var("STORAGE_BASE_URL").unwrap_or(defaults.storage.base_url),
            max_file_size: env_or("STORAGE_MAX_FILE_SIZE", defaults.storage.max_file_size),
        };

        Self {
            cache,
            processor,
            storage,
            server_port: env_or("SERVER_PORT", defaults.server_port),
            temp_cleanup_interval: env_secs_or(
                "TEMP_CLEANUP_INTERVAL_SECS",
                defaults.temp_cleanup_interval,
            ),
            temp_max_age: env_secs_or("TEMP_MAX_AGE_SECS", defaults.temp_max_age),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: ImageCacheConfig::default(),
            processor: ProcessorConfig::default(),
            storage: StorageConfig::default(),
            server_port: 3000,
            temp_cleanup_interval: Duration::from_secs(3600),
            temp_max_age: Duration::from_secs(86_400),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

// An unparsable element discards the whole list.
fn env_list_or<T: FromStr>(name: &str, default: Vec<T>) -> Vec<T> {
    env::var(name)
        .ok()
        .and_then(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().ok())
                .collect::<Option<Vec<T>>>()
        })
        .filter(|list| !list.is_empty())
        .unwrap_or(default)
}
