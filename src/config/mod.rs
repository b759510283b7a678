use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub providers: ProvidersConfig,
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the catalog API that `/api/*` is forwarded to.
    pub catalog_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub lrclib_url: String,
    pub lyrics_ovh_url: String,
    pub user_agent: String,
    /// Per-request timeout. A full miss can take 15+ sequential calls.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Allow blind direct lookups when search and suggest both miss.
    pub direct_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Maximum number of cached responses; least recently used go first.
    pub capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            catalog_url: defaults::CATALOG_URL.to_string(),
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            lrclib_url: crate::lyrics::LrclibClient::DEFAULT_BASE_URL.to_string(),
            lyrics_ovh_url: crate::lyrics::OvhClient::DEFAULT_BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            direct_fallback: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::CACHE_TTL_SECS,
            capacity: defaults::CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(raw) = std::env::var(PORT_ENV) {
            self.server.port = parse_port(&raw)?;
        }
        Ok(())
    }
}

fn parse_port(raw: &str) -> anyhow::Result<u16> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {PORT_ENV} value {raw:?}"))
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "lyricsmith", "lyricsmith")
        .context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Read the config file, writing the defaults first when it does not exist yet.
pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        save(&cfg, Some(&path))?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    parse(&raw).with_context(|| format!("parse {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str::<Config>(raw)?)
}
