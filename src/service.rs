// src/service.rs

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;

use crate::config::ClonerConfig;
use crate::error::{CloneError, ErrorKind, Result};
use crate::request::{CloneRequest, CloneResult, GitRef};
use crate::sys::credentials::CredentialScope;
use crate::sys::destination::Destination;
use crate::sys::git::{Redactor, SystemGitManager};
use crate::sys::target;
use crate::sys::traits::{GitManager, Invocation};
use crate::sys::translate::translate;

/// Uniform reply handed back to the orchestrating layer.
#[derive(Debug, Serialize)]
pub struct CloneResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloned_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl From<&CloneResult> for CloneResponse {
    fn from(result: &CloneResult) -> Self {
        Self {
            success: true,
            message: format!("Repository cloned to {}", result.path.display()),
            cloned_path: Some(result.path.display().to_string()),
            error_kind: None,
        }
    }
}

impl From<&CloneError> for CloneResponse {
    fn from(err: &CloneError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            cloned_path: None,
            error_kind: Some(err.kind()),
        }
    }
}

/// Entry point for clone requests. Holds only read-only state, so one
/// instance can serve any number of concurrent requests.
pub struct CloneService {
    config: Arc<ClonerConfig>,
    git_mgr: Box<dyn GitManager>,
}

impl CloneService {
    pub fn new(config: ClonerConfig) -> Self {
        Self {
            git_mgr: Box::new(SystemGitManager::new(
                config.git_binary.clone(),
                config.extra_git_config.clone(),
            )),
            config: Arc::new(config),
        }
    }

    /// Swaps the invoker, e.g. for a sandboxed git runner.
    pub fn with_git_manager(config: ClonerConfig, git_mgr: Box<dyn GitManager>) -> Self {
        Self {
            config: Arc::new(config),
            git_mgr,
        }
    }

    pub fn config(&self) -> &ClonerConfig {
        &self.config
    }

    /// Clones one repository.
    ///
    /// Order: resolve target and ref, prepare destination, open the credential
    /// scope (only with a token), invoke git, release the credential, then
    /// translate. The credential scope is also released by `Drop`, so a
    /// cancelled future or a panic cannot leave the artifact behind; the
    /// destination rolls itself back the same way unless committed.
    pub async fn clone_repository(&self, request: CloneRequest) -> Result<CloneResult> {
        let started = Instant::now();

        let target = target::resolve(
            &request.url,
            request.username_hint.as_deref(),
            &self.config.default_username,
        )?;
        let reference = request.reference.as_deref().map(GitRef::parse).transpose()?;
        let destination =
            Destination::prepare(request.destination.as_deref(), &self.config.scratch_dir).await?;

        let token = request.usable_token();
        let mut credentials = match token {
            Some(token) => CredentialScope::open(&self.config.scratch_dir, &target, token)?,
            None => CredentialScope::none(),
        };
        let redactor = Redactor::new(token, credentials.handle());

        let timeout = self.config.timeout_for(
            request.depth.is_some(),
            request.timeout_secs.map(Duration::from_secs),
        );

        let outcome = {
            let invocation = Invocation {
                target: &target,
                reference: reference.as_ref(),
                depth: request.depth,
                destination: destination.path(),
                credential: credentials.handle(),
                redactor: &redactor,
                timeout,
            };
            self.git_mgr.clone_repo(&invocation).await
        };

        // 🛡️ Release strictly after the child is gone and before anything is returned.
        credentials.close();

        if let Err(err) = translate(outcome) {
            if err.kind() == ErrorKind::DestinationConflict {
                // Someone else populated the path after validation; leave it be.
                destination.abandon();
            }
            tracing::warn!(
                kind = ?err.kind(),
                provider = ?target.provider,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "clone failed"
            );
            return Err(err);
        }

        if fs::metadata(destination.path().join(".git")).await.is_err() {
            return Err(CloneError::CloneFailed(
                "git reported success but no repository was created".into(),
            ));
        }

        let path = destination.commit();
        tracing::info!(
            provider = ?target.provider,
            shallow = request.depth.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "clone completed"
        );

        Ok(CloneResult {
            path,
            provider: target.provider,
            shallow: request.depth.is_some(),
        })
    }
}
