//! Credential-scoped repository cloning.
//!
//! [`CloneService::clone_repository`] takes a [`CloneRequest`] (an `https://`
//! URL plus optional ref, depth, destination and access token) and produces a
//! working copy on local disk by driving the system `git` binary.
//!
//! A supplied token is written to a single-use, owner-only credential file
//! that git reads through its `store` helper. The file is removed before the
//! call returns on every path, including failures, timeouts and a dropped
//! (cancelled) future. Neither the token nor the file path appears in argv,
//! logs or returned diagnostics.
//!
//! ```no_run
//! use repo_cloner::{CloneRequest, CloneService, ClonerConfig};
//! use std::num::NonZeroU32;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = CloneService::new(ClonerConfig::load()?);
//! let result = service
//!     .clone_repository(
//!         CloneRequest::new("https://github.com/org/private.git")
//!             .depth(NonZeroU32::MIN)
//!             .token("ghp_example"),
//!     )
//!     .await?;
//! println!("cloned into {}", result.path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod service;
pub mod sys;
pub mod telemetry;

pub use crate::config::{ClonerConfig, ConfigError};
pub use crate::error::{CloneError, ErrorKind, Result};
pub use crate::request::{CloneRequest, CloneResult, GitRef};
pub use crate::service::{CloneResponse, CloneService};
pub use crate::sys::secrets::AccessToken;
pub use crate::sys::target::ProviderClass;
