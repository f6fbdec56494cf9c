use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Application directory name under the platform data dir
pub const APP_DIR_NAME: &str = "teach-portal";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub gesture: GestureConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend connection (REST tables + object storage)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Anonymous API key sent as `apikey` and bearer token
    #[serde(default)]
    pub anon_key: String,

    /// Bucket holding interactive apps and cover images
    #[serde(default = "default_apps_bucket")]
    pub apps_bucket: String,

    /// Bucket holding teaching documents
    #[serde(default = "default_teaching_bucket")]
    pub teaching_bucket: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            apps_bucket: default_apps_bucket(),
            teaching_bucket: default_teaching_bucket(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Lifetime of a cached resource listing (0 disables caching)
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,

    /// History file; defaults to `<data_dir>/teach-portal/search_history.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            path: None,
        }
    }
}

impl HistoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir().join("search_history.json"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_host_suffixes")]
    pub allowed_host_suffixes: Vec<String>,

    #[serde(default = "default_path_markers")]
    pub allowed_path_markers: Vec<String>,

    /// `Cache-Control: max-age` for proxied documents
    #[serde(default = "default_proxy_max_age")]
    pub max_age_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_host_suffixes: default_host_suffixes(),
            allowed_path_markers: default_path_markers(),
            max_age_secs: default_proxy_max_age(),
            fetch_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GestureConfig {
    /// Max gap between two clicks before the sequence resets
    #[serde(default = "default_gesture_window_ms")]
    pub window_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window_ms: default_gesture_window_ms(),
        }
    }
}

impl GestureConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AdminConfig {
    /// Shared admin password (admin disabled when unset)
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SearchConfig {
    /// Extra initials table merged over the built-in one
    #[serde(default)]
    pub initials_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily-rolling log files here
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_apps_bucket() -> String {
    "ai-apps".to_string()
}

fn default_teaching_bucket() -> String {
    "teaching".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_ms() -> u64 {
    60_000
}

fn default_history_capacity() -> usize {
    10
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_host_suffixes() -> Vec<String> {
    vec![".supabase.co".to_string()]
}

fn default_path_markers() -> Vec<String> {
    vec![
        "/storage/v1/object/public/ai-apps/".to_string(),
        "/storage/v1/object/public/teaching/".to_string(),
    ]
}

fn default_proxy_max_age() -> u64 {
    300
}

fn default_gesture_window_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `<data_dir>/teach-portal`, falling back to the working directory
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Config {
    /// Load from an explicit file, or the default location when it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => {
                let default_path = data_dir().join("config.json");
                if default_path.exists() {
                    Self::from_json_file(&default_path)?
                } else {
                    debug!("No config file at {:?}, using defaults", default_path);
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {path:?}"))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process env in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PORTAL_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = lookup("PORTAL_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(password) = lookup("PORTAL_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
        if let Some(bind) = lookup("PORTAL_BIND") {
            self.proxy.bind = bind;
        }
    }

    /// Backend settings are only required by commands that talk to it
    pub fn require_backend(&self) -> Result<()> {
        if self.backend.url.trim().is_empty() {
            anyhow::bail!("Backend URL is not configured (set PORTAL_BACKEND_URL)");
        }
        if self.backend.anon_key.trim().is_empty() {
            anyhow::bail!("Backend key is not configured (set PORTAL_ANON_KEY)");
        }
        Ok(())
    }
}
