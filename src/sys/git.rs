// src/sys/git.rs

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use regex::Regex;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use zeroize::Zeroizing;

use crate::request::GitRef;
use crate::sys::credentials::{CredentialHandle, percent_encode};
use crate::sys::secrets::AccessToken;
use crate::sys::traits::{ExitOutcome, GitManager, Invocation, InvocationOutcome};

/// Only the last this-many bytes of stderr are kept; git's verdict comes last.
pub const STDERR_CAP_BYTES: usize = 64 * 1024;

const REDACTED: &str = "[REDACTED]";

/// Grace period for the stderr reader once the child is gone.
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);

static URL_USERINFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(://)[^/@\s]+@").expect("static regex"));

// ==============================================================================
// 1. Diagnostic Scrubbing
// ==============================================================================

/// Removes request secrets from anything the child process printed.
///
/// Holds zeroizing copies of the token (raw and percent-encoded) and of the
/// credential artifact paths; also strips any `scheme://userinfo@` it finds.
#[derive(Default)]
pub struct Redactor {
    needles: Vec<Zeroizing<String>>,
}

impl Redactor {
    pub fn new(token: Option<&AccessToken>, credential: Option<&CredentialHandle>) -> Self {
        let mut needles = Vec::new();

        if let Some(token) = token {
            token.use_secret(|secret| {
                if secret.is_empty() {
                    return;
                }
                needles.push(Zeroizing::new(secret.to_string()));
                let encoded = percent_encode(secret);
                if encoded.as_str() != secret {
                    needles.push(encoded);
                }
            });
        }

        if let Some(handle) = credential {
            needles.push(Zeroizing::new(handle.path().display().to_string()));
            if let Some(dir) = handle.path().parent() {
                needles.push(Zeroizing::new(dir.display().to_string()));
            }
        }

        // Longest first, so a path is scrubbed before its parent directory.
        needles.sort_by_key(|n| std::cmp::Reverse(n.len()));
        Self { needles }
    }

    /// Byte length of the longest secret this redactor looks for.
    pub fn longest_needle(&self) -> usize {
        self.needles.iter().map(|n| n.len()).max().unwrap_or(0)
    }

    pub fn scrub(&self, input: &str) -> String {
        let mut out = input.to_string();
        for needle in &self.needles {
            if out.contains(needle.as_str()) {
                out = out.replace(needle.as_str(), REDACTED);
            }
        }
        URL_USERINFO.replace_all(&out, "${1}[REDACTED]@").into_owned()
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor").field("needles", &self.needles.len()).finish()
    }
}

// ==============================================================================
// 2. Process Group Reaper
// ==============================================================================

/// SIGKILLs the child's whole process group unless disarmed.
///
/// `kill_on_drop` only reaches the direct child; git forks `git-remote-https`
/// and friends, which must die with it on timeout or cancellation.
struct GroupReaper {
    pgid: Option<Pid>,
}

impl GroupReaper {
    fn arm(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()).map(Pid::from_raw),
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if let Err(errno) = killpg(pgid, Signal::SIGKILL) {
                tracing::debug!(%errno, "process group already gone");
            }
        }
    }
}

impl Drop for GroupReaper {
    fn drop(&mut self) {
        self.kill();
    }
}

// ==============================================================================
// 3. System Git Manager
// ==============================================================================

pub struct SystemGitManager {
    git_binary: PathBuf,
    extra_config: Vec<(String, String)>,
}

impl SystemGitManager {
    pub fn new(git_binary: impl Into<PathBuf>, extra_config: Vec<(String, String)>) -> Self {
        Self {
            git_binary: git_binary.into(),
            extra_config,
        }
    }

    /// `git clone` argv, one discrete token per value, options closed with `--`.
    pub fn clone_args(invocation: &Invocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["clone".into()];

        if let Some(depth) = invocation.depth {
            args.push("--depth".into());
            args.push(depth.get().to_string().into());
            args.push("--shallow-submodules".into());
            args.push("--no-tags".into());
        }

        if let Some(GitRef::Named(name)) = invocation.reference {
            args.push("--branch".into());
            args.push(name.into());
        }

        args.push("--".into());
        args.push(invocation.target.url.as_str().into());
        args.push(invocation.destination.as_os_str().to_owned());
        args
    }

    /// Config entries passed through `GIT_CONFIG_COUNT` rather than argv, so
    /// the credential path never shows up in a process listing.
    pub fn config_entries(&self, invocation: &Invocation<'_>) -> Vec<(String, String)> {
        let mut entries = vec![
            ("core.hooksPath".to_string(), "/dev/null".to_string()),
            // An empty value resets any helper inherited from system/global config.
            ("credential.helper".to_string(), String::new()),
        ];
        if let Some(handle) = invocation.credential {
            entries.push((
                "credential.helper".to_string(),
                format!("store --file={}", shell_quote(handle.path())),
            ));
        }
        entries.extend(self.extra_config.iter().cloned());
        entries
    }

    fn command(&self, invocation: &Invocation<'_>, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.git_binary);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .env_remove("GIT_ASKPASS")
            .env_remove("SSH_ASKPASS")
            .env_remove("GIT_CONFIG_PARAMETERS");

        let entries = self.config_entries(invocation);
        cmd.env("GIT_CONFIG_COUNT", entries.len().to_string());
        for (i, (key, value)) in entries.into_iter().enumerate() {
            cmd.env(format!("GIT_CONFIG_KEY_{i}"), key);
            cmd.env(format!("GIT_CONFIG_VALUE_{i}"), value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        cmd
    }

    /// Spawns `cmd` and waits at most `limit`, scrubbing whatever it wrote to stderr.
    async fn run(cmd: &mut Command, limit: Duration, redactor: &Redactor) -> InvocationOutcome {
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return InvocationOutcome::new(ExitOutcome::ToolMissing, "");
            }
            Err(e) => return InvocationOutcome::new(ExitOutcome::SpawnFailed(e.kind()), ""),
        };

        let mut reaper = GroupReaper::arm(child.id());
        let stderr_task = child.stderr.take().map(|pipe| tokio::spawn(read_capped(pipe)));

        let exit = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => {
                reaper.disarm();
                if status.success() {
                    ExitOutcome::Success
                } else {
                    ExitOutcome::Failed { code: status.code() }
                }
            }
            Ok(Err(e)) => {
                reaper.kill();
                ExitOutcome::SpawnFailed(e.kind())
            }
            Err(_) => {
                reaper.kill();
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "git already exited");
                }
                ExitOutcome::TimedOut { after: limit }
            }
        };

        let captured = match stderr_task {
            Some(task) => {
                let handle = task.abort_handle();
                match timeout(STDERR_DRAIN_GRACE, task).await {
                    Ok(Ok(captured)) => captured,
                    _ => {
                        handle.abort();
                        CapturedStderr::default()
                    }
                }
            }
            None => CapturedStderr::default(),
        };

        let raw = captured.clean_tail(redactor.longest_needle());
        let stderr = redactor.scrub(String::from_utf8_lossy(raw).trim());
        InvocationOutcome::new(exit, stderr)
    }
}

#[async_trait]
impl GitManager for SystemGitManager {
    async fn clone_repo(&self, invocation: &Invocation<'_>) -> InvocationOutcome {
        let started = Instant::now();
        let args = Self::clone_args(invocation);
        let mut cmd = self.command(invocation, &args);

        tracing::info!(
            provider = ?invocation.target.provider,
            depth = invocation.depth.map(|d| d.get()),
            authenticated = invocation.credential.is_some(),
            "starting git clone"
        );

        let outcome = Self::run(&mut cmd, invocation.timeout, invocation.redactor).await;

        let Some(GitRef::Commit(sha)) = invocation.reference else {
            return outcome;
        };
        if outcome.exit != ExitOutcome::Success {
            return outcome;
        }

        // Commit ids cannot be passed to --branch; pin them once the clone exists.
        let remaining = invocation.timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return InvocationOutcome::new(ExitOutcome::TimedOut { after: invocation.timeout }, "");
        }
        let checkout_args = checkout_args(invocation.destination, sha);
        let mut checkout = self.command(invocation, &checkout_args);
        match Self::run(&mut checkout, remaining, invocation.redactor).await {
            InvocationOutcome {
                exit: ExitOutcome::TimedOut { .. },
                stderr,
            } => InvocationOutcome::new(ExitOutcome::TimedOut { after: invocation.timeout }, stderr),
            other => other,
        }
    }
}

fn checkout_args(destination: &Path, sha: &str) -> Vec<OsString> {
    vec![
        "-C".into(),
        destination.as_os_str().to_owned(),
        "-c".into(),
        "advice.detachedHead=false".into(),
        "checkout".into(),
        "--detach".into(),
        sha.into(),
        "--".into(),
    ]
}

/// The tail of a child's stderr.
#[derive(Default)]
struct CapturedStderr {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CapturedStderr {
    /// The kept bytes, minus whatever leading fragment the cut may have split.
    ///
    /// A secret straddling the cut would survive as a prefix no needle matches,
    /// so after truncation the first `longest_needle` bytes are dropped and the
    /// text resumes at the next line when there is one.
    fn clean_tail(&self, longest_needle: usize) -> &[u8] {
        if !self.truncated {
            return &self.bytes;
        }
        let rest = &self.bytes[longest_needle.min(self.bytes.len())..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        }
    }
}

/// Reads the pipe to the end, keeping only the last [`STDERR_CAP_BYTES`], so
/// the child never blocks on a full pipe and the closing `fatal:` line survives.
async fn read_capped<R: AsyncRead + Unpin>(mut pipe: R) -> CapturedStderr {
    let mut captured = CapturedStderr::default();
    let mut buffer = [0u8; 4096];
    loop {
        match pipe.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                captured.bytes.extend_from_slice(&buffer[..n]);
                if captured.bytes.len() > 2 * STDERR_CAP_BYTES {
                    let excess = captured.bytes.len() - STDERR_CAP_BYTES;
                    captured.bytes.drain(..excess);
                    captured.truncated = true;
                }
            }
        }
    }
    if captured.bytes.len() > STDERR_CAP_BYTES {
        let excess = captured.bytes.len() - STDERR_CAP_BYTES;
        captured.bytes.drain(..excess);
        captured.truncated = true;
    }
    captured
}

/// Single-quotes `path` for the shell git uses to launch credential helpers.
fn shell_quote(path: &Path) -> String {
    let raw = path.display().to_string();
    format!("'{}'", raw.replace('\'', r"'\''"))
}
