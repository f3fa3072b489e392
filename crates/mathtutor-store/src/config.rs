//! Tutor configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mathtutor_core::math::DetectionConfig;
use mathtutor_core::traits::MasteryStore;

use crate::file::JsonFileStore;
use crate::memory::MemoryStore;
use crate::postgrest::PostgrestStore;

/// Where mastery records live.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local map. Lost on exit.
    Memory,
    /// A single JSON file holding every record.
    File {
        #[serde(default = "default_store_path")]
        path: PathBuf,
    },
    /// A Supabase/PostgREST table plus an upsert RPC.
    Postgrest {
        base_url: String,
        api_key: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default = "default_upsert_function")]
        upsert_function: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory => f.write_str("Memory"),
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::Postgrest {
                base_url,
                api_key: _,
                table,
                upsert_function,
                timeout_secs,
            } => f
                .debug_struct("Postgrest")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .field("table", table)
                .field("upsert_function", upsert_function)
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./mathtutor-mastery.json")
}
fn default_table() -> String {
    "student_mastery".to_string()
}
fn default_upsert_function() -> String {
    "upsert_mastery_max".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Top-level mathtutor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Mastery store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Math detection thresholds and extra keywords.
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Max concurrent mastery updates.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for grade reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./mathtutor-results")
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            detection: DetectionConfig::default(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Memory => StoreConfig::Memory,
        StoreConfig::File { path } => StoreConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        StoreConfig::Postgrest {
            base_url,
            api_key,
            table,
            upsert_function,
            timeout_secs,
        } => StoreConfig::Postgrest {
            base_url: resolve_env_vars(base_url),
            api_key: resolve_env_vars(api_key),
            table: table.clone(),
            upsert_function: upsert_function.clone(),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mathtutor.toml` in the current directory
/// 2. `~/.config/mathtutor/config.toml`
///
/// Environment variable overrides: `MATHTUTOR_SUPABASE_URL`, `MATHTUTOR_SUPABASE_KEY`.
pub fn load_config() -> Result<TutorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TutorConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("mathtutor.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<TutorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TutorConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.store = resolve_store_config(&config.store);

    Ok(config)
}

/// Supabase env vars switch the store to PostgREST, or patch an existing
/// PostgREST store.
fn apply_env_overrides(config: &mut TutorConfig) {
    let url = std::env::var("MATHTUTOR_SUPABASE_URL").ok();
    let key = std::env::var("MATHTUTOR_SUPABASE_KEY").ok();
    if url.is_none() && key.is_none() {
        return;
    }

    if !matches!(config.store, StoreConfig::Postgrest { .. }) {
        config.store = StoreConfig::Postgrest {
            base_url: String::new(),
            api_key: String::new(),
            table: default_table(),
            upsert_function: default_upsert_function(),
            timeout_secs: default_timeout_secs(),
        };
    }
    if let StoreConfig::Postgrest {
        base_url, api_key, ..
    } = &mut config.store
    {
        if let Some(url) = url {
            *base_url = url;
        }
        if let Some(key) = key {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mathtutor"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn MasteryStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::File { path } => Ok(Arc::new(JsonFileStore::new(path))),
        StoreConfig::Postgrest {
            base_url,
            api_key,
            table,
            upsert_function,
            timeout_secs,
        } => {
            if base_url.is_empty() {
                anyhow::bail!("postgrest store needs a base_url (or MATHTUTOR_SUPABASE_URL)");
            }
            if api_key.is_empty() {
                anyhow::bail!("postgrest store needs an api_key (or MATHTUTOR_SUPABASE_KEY)");
            }
            let store = PostgrestStore::new(base_url, api_key, *timeout_secs)?
                .with_table(table)
                .with_upsert_function(upsert_function);
            Ok(Arc::new(store))
        }
    }
}
