// src/sys/destination.rs

use std::fs as std_fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use crate::error::{CloneError, Result};

const EPHEMERAL_PREFIX: &str = "repo_clone_";
const EPHEMERAL_LEAF: &str = "repo";

/// How the destination came to exist, which decides how a failure is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Unique directory under the scratch area; removed wholesale on failure.
    Ephemeral,
    /// Caller path that we created; removed on failure.
    Created,
    /// Caller path that already existed and was empty; emptied again on failure.
    PreexistingEmpty,
}

/// A validated, prepared clone destination.
///
/// Until [`Destination::commit`] is called, dropping it rolls back whatever
/// the failed clone left behind so a retry is never blocked.
#[derive(Debug)]
pub struct Destination {
    path: PathBuf,
    origin: Origin,
    holder: Option<TempDir>,
    committed: bool,
}

impl Destination {
    /// Validates `requested` (or allocates an ephemeral directory under `scratch_dir`).
    ///
    /// A non-empty directory or a non-directory at the path is a
    /// `DestinationConflict`, raised before anything on disk is touched. An
    /// existing empty directory is accepted, matching git's own rule.
    pub async fn prepare(requested: Option<&Path>, scratch_dir: &Path) -> Result<Self> {
        let Some(requested) = requested else {
            return Self::ephemeral(scratch_dir);
        };

        let path = std::path::absolute(expand_home(requested))
            .map_err(|e| CloneError::Io(format!("cannot resolve destination: {e}")))?;

        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                let mut entries = fs::read_dir(&path)
                    .await
                    .map_err(|e| CloneError::Io(format!("cannot read destination: {e}")))?;
                let occupied = entries
                    .next_entry()
                    .await
                    .map_err(|e| CloneError::Io(format!("cannot read destination: {e}")))?
                    .is_some();
                if occupied {
                    return Err(CloneError::DestinationConflict(format!(
                        "{} already exists and is not empty",
                        path.display()
                    )));
                }
                Ok(Self::explicit(path, Origin::PreexistingEmpty))
            }
            Ok(_) => Err(CloneError::DestinationConflict(format!(
                "{} already exists and is not a directory",
                path.display()
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|e| CloneError::Io(format!("cannot create parent directory: {e}")))?;
                }
                // Non-recursive on purpose: if someone else wins the race we fail loudly.
                match fs::create_dir(&path).await {
                    Ok(()) => Ok(Self::explicit(path, Origin::Created)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        Err(CloneError::DestinationConflict(format!(
                            "{} was created concurrently",
                            path.display()
                        )))
                    }
                    Err(e) => Err(CloneError::Io(format!("cannot create destination: {e}"))),
                }
            }
            Err(e) => Err(CloneError::Io(format!("cannot inspect destination: {e}"))),
        }
    }

    fn ephemeral(scratch_dir: &Path) -> Result<Self> {
        let holder = tempfile::Builder::new()
            .prefix(EPHEMERAL_PREFIX)
            .tempdir_in(scratch_dir)
            .map_err(|e| CloneError::Io(format!("cannot allocate ephemeral destination: {}", e.kind())))?;
        Ok(Self {
            path: holder.path().join(EPHEMERAL_LEAF),
            origin: Origin::Ephemeral,
            holder: Some(holder),
            committed: false,
        })
    }

    fn explicit(path: PathBuf, origin: Origin) -> Self {
        Self {
            path,
            origin,
            holder: None,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ephemeral(&self) -> bool {
        self.origin == Origin::Ephemeral
    }

    /// Marks the clone as successful and hands the directory to the caller.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        if let Some(holder) = self.holder.take() {
            // Keep the unique parent; ownership passes to the caller.
            let _ = holder.keep();
        }
        self.path.clone()
    }

    /// Gives up on a caller-supplied destination without touching it.
    ///
    /// Used when git found content there that it did not write: rolling back
    /// would delete another writer's files. Ephemeral destinations are ours
    /// alone and are still removed.
    pub fn abandon(mut self) {
        if self.origin != Origin::Ephemeral {
            self.committed = true;
        }
    }

    fn rollback(&mut self) {
        let result = match self.origin {
            // TempDir's own drop removes the holder and everything under it.
            Origin::Ephemeral => {
                self.holder.take();
                Ok(())
            }
            Origin::Created => std_fs::remove_dir_all(&self.path),
            Origin::PreexistingEmpty => empty_directory(&self.path),
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "failed to roll back clone destination"),
        }
    }
}

impl Drop for Destination {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

/// Expands a leading `~` or `~/` to the user's home directory. Other paths,
/// including non-UTF-8 ones, pass through unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) if raw.starts_with('~') => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        _ => path.to_path_buf(),
    }
}

fn empty_directory(path: &Path) -> io::Result<()> {
    for entry in std_fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std_fs::remove_dir_all(entry.path())?;
        } else {
            std_fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
