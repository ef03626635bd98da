// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive OAuth device/browser flow, modeled as a pluggable capability the credential
//! store depends on rather than a concrete implementation. Headless/CI callers should pass
//! `fail_if_no_token = true` instead of relying on a provider; the default provider always
//! fails fast.

use crate::errors::CredentialError;
use crate::token::Token;

pub trait TokenProvider: Send + Sync {
    /// Obtains a new token for `host`, e.g. by opening a browser and waiting for the user to
    /// authorize the application. Must return promptly with an error rather than block
    /// indefinitely when no interactive session is available.
    fn obtain(&self, host: &str) -> Result<Token, CredentialError>;
}

/// The default provider for headless contexts: never succeeds, so `get_token_object` with
/// `fail_if_no_token = false` still surfaces a clear error instead of hanging.
pub struct NullProvider;

impl TokenProvider for NullProvider {
    fn obtain(&self, _host: &str) -> Result<Token, CredentialError> {
        Err(CredentialError::NoInteractiveAuth)
    }
}
