// src/config.rs

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SHALLOW_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_FULL_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_USERNAME: &str = "oauth2";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Read-only settings shared by every clone request.
#[derive(Clone, Debug)]
pub struct ClonerConfig {
    // ⚙️ External tool
    pub git_binary: PathBuf,
    pub extra_git_config: Vec<(String, String)>,

    // 📂 Scratch area for credential dirs and ephemeral destinations
    pub scratch_dir: PathBuf,

    // ⏱️ Deadlines: shallow clones get the shorter bound
    pub shallow_timeout: Duration,
    pub full_timeout: Duration,

    pub default_username: String,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            extra_git_config: Vec::new(),
            scratch_dir: env::temp_dir(),
            shallow_timeout: DEFAULT_SHALLOW_TIMEOUT,
            full_timeout: DEFAULT_FULL_TIMEOUT,
            default_username: DEFAULT_USERNAME.to_string(),
        }
    }
}

impl ClonerConfig {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    ///
    /// 🛡️ Timeouts are parsed strictly: a typo must not silently become an
    /// unbounded clone, so malformed values are an error, not a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let git_binary = match lookup("REPO_CLONER_GIT_BIN") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::Empty { var: "REPO_CLONER_GIT_BIN" });
            }
            Some(v) => PathBuf::from(v),
            None => defaults.git_binary,
        };

        let scratch_dir = lookup("REPO_CLONER_SCRATCH_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.scratch_dir);

        let shallow_timeout = parse_secs(
            "REPO_CLONER_SHALLOW_TIMEOUT_SECS",
            lookup("REPO_CLONER_SHALLOW_TIMEOUT_SECS"),
            defaults.shallow_timeout,
        )?;
        let full_timeout = parse_secs(
            "REPO_CLONER_FULL_TIMEOUT_SECS",
            lookup("REPO_CLONER_FULL_TIMEOUT_SECS"),
            defaults.full_timeout,
        )?;

        let default_username = lookup("REPO_CLONER_DEFAULT_USERNAME")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_username);

        Ok(Self {
            git_binary,
            extra_git_config: Vec::new(),
            scratch_dir,
            shallow_timeout,
            full_timeout,
            default_username,
        })
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_timeouts(mut self, shallow: Duration, full: Duration) -> Self {
        self.shallow_timeout = shallow;
        self.full_timeout = full;
        self
    }

    /// Appends a `git -c key=value` style entry for every invocation,
    /// e.g. `http.proxy` or a `url.<base>.insteadOf` rewrite.
    pub fn with_git_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_git_config.push((key.into(), value.into()));
        self
    }

    /// The deadline for a clone: shallow or full bound, tightened by the caller's own.
    pub fn timeout_for(&self, shallow: bool, caller: Option<Duration>) -> Duration {
        let bound = if shallow {
            self.shallow_timeout
        } else {
            self.full_timeout
        };
        caller.map_or(bound, |c| c.min(bound))
    }
}

fn parse_secs(var: &'static str, value: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<ClonerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClonerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.git_binary, PathBuf::from("git"));
        assert_eq!(config.shallow_timeout, DEFAULT_SHALLOW_TIMEOUT);
        assert_eq!(config.full_timeout, DEFAULT_FULL_TIMEOUT);
        assert_eq!(config.default_username, "oauth2");
    }

    #[test]
    fn reads_overrides() {
        let config = from_map(&[
            ("REPO_CLONER_GIT_BIN", "/usr/local/bin/git"),
            ("REPO_CLONER_SCRATCH_DIR", "/var/tmp/cloner"),
            ("REPO_CLONER_SHALLOW_TIMEOUT_SECS", "30"),
            ("REPO_CLONER_FULL_TIMEOUT_SECS", " 900 "),
            ("REPO_CLONER_DEFAULT_USERNAME", "deploy"),
        ])
        .unwrap();
        assert_eq!(config.git_binary, PathBuf::from("/usr/local/bin/git"));
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/cloner"));
        assert_eq!(config.shallow_timeout, Duration::from_secs(30));
        assert_eq!(config.full_timeout, Duration::from_secs(900));
        assert_eq!(config.default_username, "deploy");
    }

    #[test]
    fn malformed_timeouts_are_rejected() {
        let err = from_map(&[("REPO_CLONER_FULL_TIMEOUT_SECS", "ten")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTimeout {
                var: "REPO_CLONER_FULL_TIMEOUT_SECS",
                value: "ten".into()
            }
        );
        assert!(from_map(&[("REPO_CLONER_SHALLOW_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_map(&[("REPO_CLONER_GIT_BIN", " ")]).is_err());
    }

    #[test]
    fn shallow_clones_get_the_shorter_bound() {
        let config = ClonerConfig::default();
        assert_eq!(config.timeout_for(true, None), DEFAULT_SHALLOW_TIMEOUT);
        assert_eq!(config.timeout_for(false, None), DEFAULT_FULL_TIMEOUT);
        assert_eq!(
            config.timeout_for(false, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        // a caller cannot extend the configured bound
        assert_eq!(
            config.timeout_for(true, Some(Duration::from_secs(9999))),
            DEFAULT_SHALLOW_TIMEOUT
        );
    }
}
