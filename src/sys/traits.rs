// src/sys/traits.rs

use async_trait::async_trait;
use std::io;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use crate::request::GitRef;
use crate::sys::credentials::CredentialHandle;
use crate::sys::git::Redactor;
use crate::sys::target::ResolvedTarget;

// ==============================================================================
// 1. Invocation (everything one clone needs, borrowed from the request scope)
// ==============================================================================

/// A single, fully validated clone invocation.
///
/// 🛡️ Zero-Trust: every field has already passed validation. Implementations
/// must hand each value to the child process as a discrete argv token or env
/// value, never through a shell.
pub struct Invocation<'a> {
    pub target: &'a ResolvedTarget,
    pub reference: Option<&'a GitRef>,
    pub depth: Option<NonZeroU32>,
    pub destination: &'a Path,
    pub credential: Option<&'a CredentialHandle>,
    pub redactor: &'a Redactor,
    pub timeout: Duration,
}

// ==============================================================================
// 2. Outcome (raw facts only; mapping to CloneError lives in sys::translate)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
    ToolMissing,
    SpawnFailed(io::ErrorKind),
}

/// What the child process did. `stderr` is already scrubbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub exit: ExitOutcome,
    pub stderr: String,
}

impl InvocationOutcome {
    pub fn new(exit: ExitOutcome, stderr: impl Into<String>) -> Self {
        Self {
            exit,
            stderr: stderr.into(),
        }
    }
}

// ==============================================================================
// 3. GitOps & Source Control (Zero-Leak Auth)
// ==============================================================================

#[async_trait]
pub trait GitManager: Send + Sync {
    /// Runs the clone (plus the detached checkout for commit refs) under
    /// `invocation.timeout`. Dropping the returned future must terminate the child.
    async fn clone_repo(&self, invocation: &Invocation<'_>) -> InvocationOutcome;
}
