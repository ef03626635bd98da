// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide store of bearer tokens keyed by host: validates tokens against the remote
//! identity endpoint, persists a priority-ordered cache per host, and falls back to an
//! interactive [`TokenProvider`] when no cached token is usable.

use crate::errors::CredentialError;
use crate::oauth::{NullProvider, TokenProvider};
use crate::token::{Token, TokenRecord};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const ENV_TOKEN_VAR: &str = "DAGSHUB_USER_TOKEN";
const SCHEMA_VERSION: &str = "1";

pub struct CredentialStore {
    cache_location: PathBuf,
    default_host: String,
    client: Client,
    oauth: Box<dyn TokenProvider>,
    inner: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    loaded: bool,
    by_host: HashMap<String, Vec<Token>>,
    known_good: HashMap<String, HashSet<Token>>,
}

impl CredentialStore {
    pub fn new(cache_location: PathBuf, default_host: String) -> Self {
        Self::with_oauth_provider(cache_location, default_host, Box::new(NullProvider))
    }

    pub fn with_oauth_provider(
        cache_location: PathBuf,
        default_host: String,
        oauth: Box<dyn TokenProvider>,
    ) -> Self {
        CredentialStore {
            cache_location,
            default_host,
            client: Client::builder()
                .user_agent("dagshub-streamfs")
                .build()
                .expect("failed to configure http client"),
            oauth,
            inner: Mutex::new(StoreState::default()),
        }
    }

    pub fn get_token(&self, host: &str, fail_if_no_token: bool) -> Result<String, CredentialError> {
        Ok(self
            .get_token_object(host, fail_if_no_token)?
            .text()
            .to_string())
    }

    /// Implements the retrieval algorithm: an environment-variable token for the default
    /// host always wins and bypasses the cache; otherwise tokens are tried in ascending
    /// priority order, expired ones pruned, already-known-good ones trusted without a
    /// network round trip, and invalid ones evicted. Falls back to the OAuth provider
    /// when nothing survives and `fail_if_no_token` is false.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_token_object(
        &self,
        host: &str,
        fail_if_no_token: bool,
    ) -> Result<Token, CredentialError> {
        if host == self.default_host {
            if let Ok(text) = env::var(ENV_TOKEN_VAR) {
                if !text.is_empty() {
                    tracing::trace!("using token from `{ENV_TOKEN_VAR}`");
                    return Ok(Token::EnvVar { text });
                }
            }
        }

        let mut state = self.inner.lock().unwrap();
        self.ensure_loaded(&mut state)?;

        let mut tokens = state.by_host.remove(host).unwrap_or_default();
        let mut queue = tokens.clone();
        queue.sort_by_key(|t| t.priority());

        let mut had_changes = false;
        let mut good: Option<Token> = None;

        for token in queue {
            if token.is_expired() {
                tokens.retain(|t| t != &token);
                state
                    .known_good
                    .get_mut(host)
                    .map(|set| set.remove(&token));
                had_changes = true;
                continue;
            }

            let already_known_good = state
                .known_good
                .get(host)
                .map(|set| set.contains(&token))
                .unwrap_or(false);

            if already_known_good {
                good = Some(token);
                break;
            }

            if self.is_valid_token(token.text(), host)? {
                state
                    .known_good
                    .entry(host.to_string())
                    .or_default()
                    .insert(token.clone());
                good = Some(token);
                break;
            } else {
                tokens.retain(|t| t != &token);
                had_changes = true;
            }
        }

        state.by_host.insert(host.to_string(), tokens);

        if had_changes {
            self.store_locked(&state)?;
        }

        if let Some(token) = good {
            return Ok(token);
        }

        if fail_if_no_token {
            return Err(CredentialError::NoToken(host.to_string()));
        }

        tracing::debug!("no valid tokens for `{host}`, starting OAuth flow");
        let token = self.oauth.obtain(host)?;
        state
            .by_host
            .entry(host.to_string())
            .or_default()
            .push(token.clone());
        state
            .known_good
            .entry(host.to_string())
            .or_default()
            .insert(token.clone());
        self.store_locked(&state)?;
        Ok(token)
    }

    /// Validates an app token and inserts it into the cache for `host`.
    pub fn add_app_token(&self, text: &str, host: &str) -> Result<(), CredentialError> {
        if !self.is_valid_token(text, host)? {
            return Err(CredentialError::InvalidToken);
        }
        let token = Token::App {
            text: text.to_string(),
            created_at: now_rfc3339(),
        };
        let mut state = self.inner.lock().unwrap();
        self.ensure_loaded(&mut state)?;
        state
            .by_host
            .entry(host.to_string())
            .or_default()
            .push(token);
        self.store_locked(&state)
    }

    /// Runs the OAuth flow and inserts the resulting token without re-validation, matching
    /// the original behavior of trusting a token freshly minted by the provider.
    pub fn add_oauth_token(&self, host: &str) -> Result<(), CredentialError> {
        let token = self.oauth.obtain(host)?;
        let mut state = self.inner.lock().unwrap();
        self.ensure_loaded(&mut state)?;
        state
            .by_host
            .entry(host.to_string())
            .or_default()
            .push(token.clone());
        state
            .known_good
            .entry(host.to_string())
            .or_default()
            .insert(token);
        self.store_locked(&state)
    }

    /// Invalidates `token` for `host` in both the known-good set and the persistent cache;
    /// used after a 401 to force a fresh `get_token_object` call to pick a different token
    /// or re-authenticate.
    pub fn invalidate(&self, host: &str, token_text: &str) -> Result<(), CredentialError> {
        let mut state = self.inner.lock().unwrap();
        self.ensure_loaded(&mut state)?;
        if let Some(known_good) = state.known_good.get_mut(host) {
            known_good.retain(|t| t.text() != token_text);
        }
        if let Some(tokens) = state.by_host.get_mut(host) {
            tokens.retain(|t| t.text() != token_text);
        }
        self.store_locked(&state)
    }

    /// GETs the identity endpoint with bearer auth. A 2xx response with a `login` field is
    /// valid; 4xx is invalid; 5xx is treated as valid since it signals a server problem, not
    /// a bad credential.
    #[tracing::instrument(level = "trace", skip(self, token))]
    pub fn is_valid_token(&self, token: &str, host: &str) -> Result<bool, CredentialError> {
        let url = format!("{}/api/v1/user", host.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .map_err(|e| CredentialError::Remote(e.into()))?;

        if resp.status().is_client_error() {
            return Ok(false);
        }
        if resp.status().is_success() {
            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
            return Ok(body.get("login").is_some());
        }
        // 5xx or anything else unexpected: treat as a server-side issue, not a bad token.
        Ok(true)
    }

    fn ensure_loaded(&self, state: &mut StoreState) -> Result<(), CredentialError> {
        if state.loaded {
            return Ok(());
        }
        state.by_host = load_cache_file(&self.cache_location)?;
        state.loaded = true;
        Ok(())
    }

    fn store_locked(&self, state: &StoreState) -> Result<(), CredentialError> {
        store_cache_file(&self.cache_location, &state.by_host)
    }
}

fn load_cache_file(path: &Path) -> Result<HashMap<String, Vec<Token>>, CredentialError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CredentialError::CacheRead(path.to_path_buf(), e))?;
    let document: serde_yaml::Value = serde_yaml::from_str(&contents)
        .map_err(|e| CredentialError::CacheParse(path.to_path_buf(), e))?;

    let serde_yaml::Value::Mapping(map) = document else {
        return Ok(HashMap::new());
    };

    let version = map
        .get("version")
        .map(|v| match v {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
        .unwrap_or_else(|| SCHEMA_VERSION.to_string());
    if version != SCHEMA_VERSION {
        return Err(CredentialError::UnsupportedCacheVersion(
            path.to_path_buf(),
            version,
        ));
    }

    let mut result = HashMap::new();
    for (key, value) in map {
        let serde_yaml::Value::String(host) = key else {
            continue;
        };
        if host == "version" {
            continue;
        }
        let serde_yaml::Value::Sequence(entries) = value else {
            continue;
        };
        let mut tokens = Vec::new();
        for entry in entries {
            match serde_yaml::from_value::<TokenRecord>(entry.clone()) {
                Ok(record) => match Token::from_record(&record) {
                    Ok(token) => tokens.push(token),
                    Err(reason) => {
                        tracing::warn!("skipping token for `{host}`: {reason}");
                    }
                },
                Err(e) => {
                    tracing::warn!("skipping malformed token entry for `{host}`: {e}");
                }
            }
        }
        result.insert(host, tokens);
    }
    Ok(result)
}

fn store_cache_file(
    path: &Path,
    by_host: &HashMap<String, Vec<Token>>,
) -> Result<(), CredentialError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CredentialError::CacheWrite(path.to_path_buf(), e))?;
    }

    let mut map = serde_yaml::Mapping::new();
    map.insert(
        serde_yaml::Value::String("version".to_string()),
        serde_yaml::Value::String(SCHEMA_VERSION.to_string()),
    );
    for (host, tokens) in by_host {
        if tokens.is_empty() {
            continue;
        }
        let records: Vec<serde_yaml::Value> = tokens
            .iter()
            .filter(|t| !matches!(t, Token::EnvVar { .. }))
            .map(|t| serde_yaml::to_value(t.to_record()).expect("token record is serializable"))
            .collect();
        map.insert(serde_yaml::Value::String(host.clone()), records.into());
    }

    let serialized =
        serde_yaml::to_string(&serde_yaml::Value::Mapping(map)).expect("cache is serializable");
    std::fs::write(path, serialized).map_err(|e| CredentialError::CacheWrite(path.to_path_buf(), e))
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("formattable timestamp")
}

static GLOBAL: OnceCell<CredentialStore> = OnceCell::new();

/// The process-wide credential store, initialized lazily from the detected [`Config`] on
/// first use.
pub fn global() -> &'static CredentialStore {
    GLOBAL.get_or_init(|| {
        let config = crate::config::Config::detect().unwrap_or_else(|_| crate::config::Config {
            host: "https://dagshub.com".to_string(),
            cache_location: PathBuf::from("dagshub-tokens.yml"),
        });
        CredentialStore::new(config.cache_location, config.host)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Expiry;
    use tempfile::tempdir;

    fn store_at(dir: &Path) -> CredentialStore {
        CredentialStore::new(dir.join("tokens.yml"), "https://dagshub.com".to_string())
    }

    #[test]
    fn env_var_token_bypasses_cache_for_default_host() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        env::set_var(ENV_TOKEN_VAR, "from-env");
        let token = store
            .get_token_object("https://dagshub.com", true)
            .unwrap();
        assert_eq!(token.text(), "from-env");
        assert!(matches!(token, Token::EnvVar { .. }));
        env::remove_var(ENV_TOKEN_VAR);
    }

    #[test]
    fn env_var_token_ignored_for_other_hosts() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        env::set_var(ENV_TOKEN_VAR, "from-env");
        let err = store
            .get_token_object("https://other.example", true)
            .unwrap_err();
        assert!(matches!(err, CredentialError::NoToken(_)));
        env::remove_var(ENV_TOKEN_VAR);
    }

    #[test]
    fn expired_tokens_are_pruned_on_load() {
        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("tokens.yml");
        std::fs::write(
            &cache_path,
            "version: \"1\"\nhttps://dagshub.com:\n  - token_type: oauth\n    token_text: dead\n    expiry: \"2000-01-01T00:00:00.000000Z\"\n",
        )
        .unwrap();
        let store = store_at(dir.path());
        let err = store
            .get_token_object("https://dagshub.com", true)
            .unwrap_err();
        assert!(matches!(err, CredentialError::NoToken(_)));

        let remaining = load_cache_file(&cache_path).unwrap();
        assert!(remaining.get("https://dagshub.com").unwrap().is_empty());
    }

    #[test]
    fn unsupported_schema_version_is_fatal() {
        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("tokens.yml");
        std::fs::write(&cache_path, "version: \"2\"\n").unwrap();
        assert!(matches!(
            load_cache_file(&cache_path),
            Err(CredentialError::UnsupportedCacheVersion(_, _))
        ));
    }

    #[test]
    fn record_roundtrip_preserves_never_expiry() {
        let token = Token::App {
            text: "abc".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let record = token.to_record();
        assert_eq!(record.expiry.as_deref(), Some("never"));
    }

    #[test]
    fn invalidate_removes_from_known_good_and_cache() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        {
            let mut state = store.inner.lock().unwrap();
            state.loaded = true;
            let token = Token::OAuth {
                text: "abc".into(),
                expiry: Expiry::Never,
                refresh_metadata: None,
            };
            state
                .by_host
                .entry("https://dagshub.com".into())
                .or_default()
                .push(token.clone());
            state
                .known_good
                .entry("https://dagshub.com".into())
                .or_default()
                .insert(token);
        }
        store.invalidate("https://dagshub.com", "abc").unwrap();
        let state = store.inner.lock().unwrap();
        assert!(state.by_host["https://dagshub.com"].is_empty());
    }
}
