//! Where the published data comes from and where it is cached.

use std::env;
use std::path::PathBuf;

/// Zipped `gh-pages` branch of the echemdb website.
pub const DEFAULT_REMOTE_URL: &str =
    "https://github.com/echemdb/website/archive/refs/heads/gh-pages.zip";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// URL of the website archive.
    pub remote_url: String,
    /// Directory the archive is downloaded to and extracted in.
    pub cache_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Settings {
    /// Defaults, overridden by these environment variables:
    ///
    /// - `ECHEMDB_REMOTE_URL`
    /// - `ECHEMDB_CACHE_DIR`
    pub fn from_env() -> Self {
        let mut settings = Settings::default();
        if let Ok(url) = env::var("ECHEMDB_REMOTE_URL") {
            settings.remote_url = url;
        }
        if let Ok(dir) = env::var("ECHEMDB_CACHE_DIR") {
            settings.cache_dir = PathBuf::from(dir);
        }
        settings
    }
}

/// `~/.cache/echemdb` where the platform has a cache directory.
pub fn default_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(cache) => cache.join("echemdb"),
        None => PathBuf::from(".echemdb-cache"),
    }
}
