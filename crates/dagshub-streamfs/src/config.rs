// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::Error;
use std::env;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "https://dagshub.com";

/// Process-wide defaults detected from the execution environment. Constructed once and
/// passed to `Mount::new`/the global `CredentialStore`.
pub struct Config {
    pub host: String,
    pub cache_location: PathBuf,
}

impl Config {
    /// Detect configuration from the environment: `DAGSHUB_HOST` for the default host,
    /// `DAGSHUB_CACHE_LOCATION` for the token cache path.
    pub fn detect() -> Result<Self, Error> {
        let host = env::var("DAGSHUB_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let cache_location = find_cache_location()?;
        Ok(Config {
            host,
            cache_location,
        })
    }

    #[cfg(test)]
    pub(crate) fn test(cache_location: PathBuf) -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            cache_location,
        }
    }
}

fn find_cache_location() -> Result<PathBuf, Error> {
    match env::var_os("DAGSHUB_CACHE_LOCATION") {
        Some(val) if !val.is_empty() => Ok(PathBuf::from(val)),
        _ => dirs::cache_dir()
            .map(|dir| dir.join("dagshub").join("tokens.yml"))
            .ok_or(Error::CouldNotDetectCacheDirectory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_used_when_unset() {
        // Safety: test runs single-threaded w.r.t. this env var within this process test binary.
        env::remove_var("DAGSHUB_HOST");
        env::set_var("DAGSHUB_CACHE_LOCATION", "/tmp/dagshub-streamfs-test/tokens.yml");
        let config = Config::detect().unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(
            config.cache_location,
            PathBuf::from("/tmp/dagshub-streamfs-test/tokens.yml")
        );
        env::remove_var("DAGSHUB_CACHE_LOCATION");
    }

    #[test]
    fn host_override_respected() {
        env::set_var("DAGSHUB_HOST", "https://example.com");
        env::set_var("DAGSHUB_CACHE_LOCATION", "/tmp/dagshub-streamfs-test/tokens2.yml");
        let config = Config::detect().unwrap();
        assert_eq!(config.host, "https://example.com");
        env::remove_var("DAGSHUB_HOST");
        env::remove_var("DAGSHUB_CACHE_LOCATION");
    }
}
