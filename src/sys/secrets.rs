// src/sys/secrets.rs

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// AccessToken is an ephemeral, memory-safe wrapper around a personal or
/// deploy access token supplied with a single clone request.
///
/// 1. It cannot be accidentally logged (`{:?}` prints `[REDACTED ...]`).
/// 2. When it goes out of scope the heap buffer is zeroized.
#[derive(Deserialize)]
#[serde(transparent)]
pub struct AccessToken {
    token: SecretString,
}

impl AccessToken {
    /// Takes ownership of the plaintext so no second copy is left behind.
    pub fn new(raw_token: String) -> Self {
        Self {
            token: SecretString::new(raw_token),
        }
    }

    /// Exposes the token for the duration of `action` only.
    ///
    /// 🛡️ Lexical Scope Confinement: the borrow handed to the closure cannot
    /// outlive this call, so the plaintext cannot be smuggled across an `.await`.
    pub fn use_secret<F, R>(&self, action: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        action(self.token.expose_secret())
    }

    pub fn is_empty(&self) -> bool {
        self.token.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl From<String> for AccessToken {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for AccessToken {
    fn from(raw: &str) -> Self {
        Self::new(raw.to_string())
    }
}
