// src/sys/target.rs

use serde::Serialize;
use url::Url;

use crate::error::{CloneError, Result};

/// Coarse classification of a repository host, used to pick auth conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderClass {
    GithubLike,
    GitlabLike,
    Generic,
}

impl ProviderClass {
    /// Placeholder username the provider expects when a token is the password.
    /// `None` means the provider has no convention.
    pub fn conventional_username(self) -> Option<&'static str> {
        match self {
            ProviderClass::GithubLike => Some("x-access-token"),
            ProviderClass::GitlabLike => Some("oauth2"),
            ProviderClass::Generic => None,
        }
    }
}

/// Host suffix table. Add hosts here, never as branches elsewhere.
/// A suffix matches the host itself or any subdomain of it.
pub const PROVIDER_TABLE: &[(&str, ProviderClass)] = &[
    ("github.com", ProviderClass::GithubLike),
    ("ghe.com", ProviderClass::GithubLike),
    ("gitlab.com", ProviderClass::GitlabLike),
];

/// A validated clone target. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: Url,
    pub provider: ProviderClass,
    pub auth_username: String,
}

impl ResolvedTarget {
    /// `host[:port]` as it appears in a credential-store line.
    pub fn authority(&self) -> String {
        // Url::parse guarantees a host for the https scheme.
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// Classifies `host` against [`PROVIDER_TABLE`].
pub fn classify_host(host: &str) -> ProviderClass {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    PROVIDER_TABLE
        .iter()
        .find(|(suffix, _)| {
            host == *suffix
                || host
                    .strip_suffix(suffix)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, class)| *class)
        .unwrap_or(ProviderClass::Generic)
}

/// Parses and validates `raw_url`, then derives provider class and auth username.
///
/// 🛡️ Only absolute `https://` URLs without embedded userinfo are accepted.
/// Rejection messages never echo the raw URL, since it may carry a secret.
pub fn resolve(
    raw_url: &str,
    username_hint: Option<&str>,
    default_username: &str,
) -> Result<ResolvedTarget> {
    let raw_url = raw_url.trim();
    if raw_url.is_empty() {
        return Err(CloneError::InvalidUrl("repository URL is empty".into()));
    }

    let url = Url::parse(raw_url)
        .map_err(|e| CloneError::InvalidUrl(format!("not an absolute URL ({e})")))?;

    if url.scheme() != "https" {
        return Err(CloneError::InvalidUrl(format!(
            "scheme '{}' is not allowed, only https",
            url.scheme()
        )));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(CloneError::InvalidUrl(
            "credentials embedded in the URL are not allowed".into(),
        ));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| CloneError::InvalidUrl("URL has no host".into()))?;

    let provider = classify_host(host);
    let hint = username_hint.map(str::trim).filter(|h| !h.is_empty());
    let auth_username = hint
        .or(provider.conventional_username())
        .unwrap_or(default_username)
        .to_string();

    Ok(ResolvedTarget {
        url,
        provider,
        auth_username,
    })
}
