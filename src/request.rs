// src/request.rs

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CloneError, Result};
use crate::sys::secrets::AccessToken;
use crate::sys::target::ProviderClass;

/// One clone invocation, as supplied by the orchestrating layer.
#[derive(Debug, Default, Deserialize)]
pub struct CloneRequest {
    /// Absolute `https://` repository URL.
    #[serde(alias = "repo_url")]
    pub url: String,
    /// Branch, tag or full commit id to check out. Provider default when absent.
    #[serde(default, alias = "branch")]
    pub reference: Option<String>,
    /// Shallow depth. Zero is rejected at deserialisation.
    #[serde(default)]
    pub depth: Option<NonZeroU32>,
    /// Target directory. An ephemeral unique directory is used when absent.
    #[serde(default, alias = "dest_dir")]
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub token: Option<AccessToken>,
    #[serde(default)]
    pub username_hint: Option<String>,
    /// Caller deadline in seconds; overrides the configured bound when shorter.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CloneRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn depth(mut self, depth: NonZeroU32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn token(mut self, token: impl Into<AccessToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn username_hint(mut self, hint: impl Into<String>) -> Self {
        self.username_hint = Some(hint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// The token, unless it is absent or empty.
    pub(crate) fn usable_token(&self) -> Option<&AccessToken> {
        self.token.as_ref().filter(|t| !t.is_empty())
    }
}

/// What to check out after the clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// Branch or tag, handed to `git clone --branch`.
    Named(String),
    /// Full object id, checked out detached once the clone completes.
    Commit(String),
}

impl GitRef {
    /// Validates `raw` as a ref name. Full 40 or 64 hex-digit ids are commits;
    /// anything else is a branch or tag name.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CloneError::InvalidArgument("ref must not be empty".into()));
        }

        if matches!(raw.len(), 40 | 64) && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(GitRef::Commit(raw.to_ascii_lowercase()));
        }

        // 🛡️ Argument Injection Protection plus git's own ref-format rules.
        let violation = if raw.starts_with('-') {
            Some("must not start with '-'")
        } else if raw.contains("..") || raw.contains("@{") || raw == "@" {
            Some("contains a forbidden sequence")
        } else if raw
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
        {
            Some("contains a forbidden character")
        } else if raw.starts_with('/') || raw.ends_with('/') || raw.ends_with('.') || raw.ends_with(".lock")
        {
            Some("has a forbidden prefix or suffix")
        } else {
            None
        };

        match violation {
            Some(reason) => Err(CloneError::InvalidArgument(format!("ref {reason}"))),
            None => Ok(GitRef::Named(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GitRef::Named(name) | GitRef::Commit(name) => name,
        }
    }
}

impl std::fmt::Display for GitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitRef::Named(name) => write!(f, "{name}"),
            GitRef::Commit(sha) => write!(f, "commit {sha}"),
        }
    }
}

/// A successfully cloned working tree. The caller owns the directory from here on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneResult {
    pub path: PathBuf,
    pub provider: ProviderClass,
    pub shallow: bool,
}
