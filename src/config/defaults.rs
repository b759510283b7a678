use super::Config;

pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 8787;
pub const CATALOG_URL: &str = "https://saavn.dev";
pub const USER_AGENT: &str = "lyricsmith/0.1.0";
pub const TIMEOUT_SECS: u64 = 5;
pub const CACHE_TTL_SECS: u64 = 30;
pub const CACHE_CAPACITY: usize = 1024;

/// Config written to disk on first run.
pub fn defaults() -> Config {
    Config::default()
}
