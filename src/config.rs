//! Site configuration.
//!
//! Layered, later sources winning:
//! - sitedb.toml (default configuration)
//! - sitedb.local.toml (git-ignored local overrides)
//! - Environment variables (SITEDB_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # sitedb.toml
//! [engine]
//! site = "Site 1"
//! max_rounds = 100
//!
//! [engine.tables]
//! A = "data/a.csv"
//!
//! [http]
//! port = 8081
//!
//! [sites]
//! "Site 2" = "http://10.0.0.2:8082"
//! ```
//!
//! Any key can be overridden from the environment, `__` separating sections:
//! ```bash
//! SITEDB_ENGINE__MAX_ROUNDS=20
//! SITEDB_HTTP__PORT=9000
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Everything a site process or the CLI needs to start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Base URL of every known site, keyed by site name
    #[serde(default)]
    pub sites: BTreeMap<String, String>,
}

/// Engine and fixpoint-loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the site this process runs
    #[serde(default = "default_site")]
    pub site: String,

    /// Upper bound on centralized rounds before giving up
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// CSV files to host, keyed by relation name
    #[serde(default)]
    pub tables: BTreeMap<String, PathBuf>,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `sitedb=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Site server and outgoing transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address the site server binds to
    #[serde(default = "default_http_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Timeout for fragments sent to other sites
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_site() -> String {
    "Site 1".to_string()
}
fn default_max_rounds() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Config {
    /// Configuration from the working directory and the environment.
    ///
    /// Layers, in order:
    /// 1. built-in defaults
    /// 2. sitedb.toml (base configuration)
    /// 3. sitedb.local.toml (local overrides, git-ignored)
    /// 4. Environment variables (SITEDB_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("sitedb.toml"))
            .merge(Toml::file("sitedb.local.toml"))
            .merge(Env::prefixed("SITEDB_").split("__"))
            .extract()
    }

    /// Configuration from `path` (if it exists) and the environment.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SITEDB_").split("__"))
            .extract()
    }

    /// Configuration for a binary's `--config` option.
    ///
    /// An explicit file must exist and load. Without one, the layers of
    /// [`Config::load`] are tried and a broken setup falls back to defaults.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Config::load().unwrap_or_else(|e| {
                eprintln!("Using default configuration ({e})");
                Config::default()
            }));
        };
        if !path.is_file() {
            anyhow::bail!("configuration file {} not found", path.display());
        }
        Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading configuration from {}", path.display()))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            site: default_site(),
            max_rounds: default_max_rounds(),
            tables: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            host: default_http_host(),
            port: default_http_port(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
