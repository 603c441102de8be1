#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use repo_cloner::{CloneService, ClonerConfig};

/// Shell prologue shared by every fake git: `$DEST` is the last argv entry,
/// `$CRED` the credential file named by the store helper (empty if none).
/// argv and a few env values are recorded next to the script on every run.
const PROLOGUE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$0.args"
printf '%s' "$GIT_CONFIG_COUNT" > "$0.config_count"
printf '%s' "$GIT_TERMINAL_PROMPT" > "$0.prompt"
for DEST; do :; done
CRED=""
if [ -n "$GIT_CONFIG_VALUE_2" ]; then
  eval "set -- $GIT_CONFIG_VALUE_2"
  CRED="${2#--file=}"
fi
"#;

/// A throwaway `git` stand-in plus the scratch area the service works in.
pub struct FakeGit {
    pub bin_dir: tempfile::TempDir,
    pub scratch: tempfile::TempDir,
    pub binary: PathBuf,
}

impl FakeGit {
    pub fn new(body: &str) -> Self {
        let bin_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let binary = bin_dir.path().join("git");
        fs::write(&binary, format!("{PROLOGUE}{body}\n")).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        Self {
            bin_dir,
            scratch,
            binary,
        }
    }

    /// A file inside the bin dir the script can write observations to.
    pub fn record(&self, name: &str) -> PathBuf {
        self.bin_dir.path().join(name)
    }

    pub fn config(&self) -> ClonerConfig {
        ClonerConfig::default()
            .with_git_binary(&self.binary)
            .with_scratch_dir(self.scratch.path())
            .with_timeouts(Duration::from_secs(30), Duration::from_secs(60))
    }

    /// argv of the most recent invocation, one entry per line.
    pub fn last_args(&self) -> Vec<String> {
        fs::read_to_string(self.record("git.args"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn was_invoked(&self) -> bool {
        self.record("git.args").exists()
    }

    pub fn service(&self) -> CloneService {
        CloneService::new(self.config())
    }

    /// Entries left in the scratch area (credential dirs, ephemeral clones).
    pub fn scratch_leftovers(&self) -> Vec<String> {
        list(self.scratch.path())
    }
}

pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Script body that behaves like a successful clone.
pub const SUCCEED: &str = r#"mkdir -p "$DEST/.git""#;
