// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tagged token variants making up the credential store's data model.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const APP_TOKEN_TYPE: &str = "app-token";
const OAUTH_TOKEN_TYPE: &str = "oauth";

/// A bearer credential for a single host. Modeled as a sum type (rather than subclassing a
/// base token class) with per-variant priority and expiry rules.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A long-lived token created in the user's DagsHub profile settings.
    App { text: String, created_at: String },
    /// A short-lived token obtained through the OAuth device/browser flow.
    OAuth {
        text: String,
        expiry: Expiry,
        refresh_metadata: Option<String>,
    },
    /// Synthesized on the fly from `DAGSHUB_USER_TOKEN`; never persisted to the cache.
    EnvVar { text: String },
}

impl Token {
    pub fn text(&self) -> &str {
        match self {
            Token::App { text, .. } => text,
            Token::OAuth { text, .. } => text,
            Token::EnvVar { text } => text,
        }
    }

    /// Ascending priority order in which tokens are tried: environment-variable, then app
    /// tokens, then OAuth-obtained tokens. In practice an `EnvVar` token is returned before
    /// the cache is even consulted, so this value only matters for `App` vs. `OAuth`.
    pub fn priority(&self) -> u8 {
        match self {
            Token::EnvVar { .. } => 0,
            Token::App { .. } => 1,
            Token::OAuth { .. } => 2,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self {
            Token::App { .. } => false,
            Token::EnvVar { .. } => false,
            Token::OAuth { expiry, .. } => expiry.is_past(),
        }
    }

    pub(crate) fn token_type(&self) -> &'static str {
        match self {
            Token::App { .. } => APP_TOKEN_TYPE,
            Token::OAuth { .. } => OAUTH_TOKEN_TYPE,
            Token::EnvVar { .. } => "env-var",
        }
    }

    pub(crate) fn to_record(&self) -> TokenRecord {
        match self {
            Token::App { text, created_at } => TokenRecord {
                token_type: APP_TOKEN_TYPE.to_string(),
                token_text: text.clone(),
                expiry: Some("never".to_string()),
                created_at: Some(created_at.clone()),
                refresh_metadata: None,
            },
            Token::OAuth {
                text,
                expiry,
                refresh_metadata,
            } => TokenRecord {
                token_type: OAUTH_TOKEN_TYPE.to_string(),
                token_text: text.clone(),
                expiry: Some(expiry.to_record_string()),
                created_at: None,
                refresh_metadata: refresh_metadata.clone(),
            },
            Token::EnvVar { .. } => {
                unreachable!("environment-variable tokens are never persisted")
            }
        }
    }

    pub(crate) fn from_record(record: &TokenRecord) -> Result<Token, String> {
        match record.token_type.as_str() {
            APP_TOKEN_TYPE => Ok(Token::App {
                text: record.token_text.clone(),
                created_at: record.created_at.clone().unwrap_or_default(),
            }),
            OAUTH_TOKEN_TYPE => {
                let expiry = record
                    .expiry
                    .as_deref()
                    .ok_or_else(|| "missing `expiry` field".to_string())?;
                Ok(Token::OAuth {
                    text: record.token_text.clone(),
                    expiry: Expiry::parse(expiry)?,
                    refresh_metadata: record.refresh_metadata.clone(),
                })
            }
            other => Err(format!("unknown token_type `{other}`")),
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never include the full token text in debug reprs or log messages: this redacts all
        // but the last 3 characters, or redacts entirely when the token is too short for that
        // to be safe.
        const PLAINTEXT_TRAILING_CHARS: usize = 3;
        const REDACT_ALL_WHEN_SHORTER_THAN: usize = 9;

        let text = self.text();
        let redacted = if text.len() < REDACT_ALL_WHEN_SHORTER_THAN {
            text.chars().map(|_| '*').collect::<String>()
        } else {
            text.char_indices()
                .map(|(i, c)| {
                    if text.len() - i > PLAINTEXT_TRAILING_CHARS {
                        '*'
                    } else {
                        c
                    }
                })
                .collect::<String>()
        };
        f.debug_struct("Token")
            .field("token_type", &self.token_type())
            .field("text", &redacted)
            .finish()
    }
}

/// Expiry of an OAuth token: either a fixed instant or the non-expiring sentinel used by
/// app tokens when serialized through the same on-disk shape.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Expiry {
    Never,
    At(i64), // unix seconds; OffsetDateTime isn't Hash/Eq, store seconds instead.
}

impl Expiry {
    pub fn is_past(&self) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(secs) => *secs < OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    fn to_record_string(&self) -> String {
        match self {
            Expiry::Never => "never".to_string(),
            Expiry::At(secs) => OffsetDateTime::from_unix_timestamp(*secs)
                .expect("timestamp in range")
                .format(&Rfc3339)
                .expect("formattable timestamp"),
        }
    }

    /// Parses an ISO-8601 UTC timestamp or the literal `"never"`. Any sub-microsecond
    /// precision is trimmed before parsing, since `time`'s RFC3339 parser (like most
    /// standard parsers) handles at most microsecond resolution in the fractional part.
    fn parse(value: &str) -> Result<Expiry, String> {
        if value == "never" {
            return Ok(Expiry::Never);
        }
        let trimmed = trim_to_microseconds(value);
        let parsed = OffsetDateTime::parse(&trimmed, &Rfc3339)
            .map_err(|e| format!("invalid expiry timestamp `{value}`: {e}"))?;
        Ok(Expiry::At(parsed.unix_timestamp()))
    }
}

fn trim_to_microseconds(value: &str) -> String {
    let Some(dot) = value.find('.') else {
        return value.to_string();
    };
    let Some(suffix_offset) = value[dot..].find(|c: char| c == 'Z' || c == '+' || c == '-') else {
        return value.to_string();
    };
    let suffix_start = dot + suffix_offset;
    let frac_len = suffix_start - dot - 1;
    if frac_len <= 6 {
        return value.to_string();
    }
    let mut trimmed = String::with_capacity(value.len());
    trimmed.push_str(&value[..dot + 1 + 6]);
    trimmed.push_str(&value[suffix_start..]);
    trimmed
}

/// On-disk shape of a single token entry, tolerant of unknown/missing fields so that one
/// corrupt entry doesn't take down the whole cache load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenRecord {
    pub token_type: String,
    pub token_text: String,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub refresh_metadata: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_token_never_expires() {
        let token = Token::App {
            text: "abc".into(),
            created_at: "2020-01-01T00:00:00Z".into(),
        };
        assert!(!token.is_expired());
        assert_eq!(token.priority(), 1);
    }

    #[test]
    fn oauth_token_expiry_in_past_is_expired() {
        let token = Token::OAuth {
            text: "abc".into(),
            expiry: Expiry::At(0),
            refresh_metadata: None,
        };
        assert!(token.is_expired());
    }

    #[test]
    fn expiry_trims_sub_microsecond_precision() {
        let parsed = Expiry::parse("2030-01-01T00:00:00.123456789Z").unwrap();
        assert!(!parsed.is_past());
    }

    #[test]
    fn debug_redacts_short_tokens_entirely() {
        let token = Token::App {
            text: "12345678".into(),
            created_at: String::new(),
        };
        assert_eq!(format!("{:?}", token), "Token { token_type: \"app-token\", text: \"********\" }");
    }

    #[test]
    fn debug_keeps_trailing_chars_for_long_tokens() {
        let token = Token::App {
            text: "1234567890123456789".into(),
            created_at: String::new(),
        };
        let formatted = format!("{:?}", token);
        assert!(formatted.ends_with("789\" }"));
        assert!(!formatted.contains("123456789012"));
    }

    #[test]
    fn round_trips_through_record() {
        let token = Token::OAuth {
            text: "xyz".into(),
            expiry: Expiry::At(1893456000),
            refresh_metadata: Some("refresh-1".into()),
        };
        let record = token.to_record();
        let restored = Token::from_record(&record).unwrap();
        assert_eq!(token, restored);
    }
}
