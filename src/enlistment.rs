//! Enlistment resolution for gitbridge.
//!
//! An enlistment is a git working tree plus the `.git` directory that
//! belongs to it. Every [`GitProcess`](crate::git::GitProcess) bound to a
//! repository is created from one.

use crate::error::{GitBridgeError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Resolved paths for one repository.
///
/// All paths are as given or discovered; they are not canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enlistment {
    /// Root of the working tree.
    pub working_directory_root: PathBuf,

    /// `{working_directory_root}/.git`.
    pub dot_git_root: PathBuf,

    /// git executable used for this enlistment.
    pub git_bin_path: PathBuf,
}

impl Enlistment {
    /// Name of the git directory inside a working tree.
    pub const DOT_GIT: &'static str = ".git";

    /// Objects directory name inside `.git`.
    pub const OBJECTS: &'static str = "objects";

    /// Enlistment rooted at `working_directory_root`, which need not exist yet.
    pub fn new(working_directory_root: impl Into<PathBuf>, git_bin_path: impl Into<PathBuf>) -> Self {
        let working_directory_root = working_directory_root.into();
        let dot_git_root = working_directory_root.join(Self::DOT_GIT);
        Self {
            working_directory_root,
            dot_git_root,
            git_bin_path: git_bin_path.into(),
        }
    }

    /// Resolve the enlistment containing the current working directory.
    pub fn resolve(git_bin_path: impl Into<PathBuf>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            GitBridgeError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd, git_bin_path)
    }

    /// Resolve the enlistment containing `path`.
    ///
    /// Walks up from `path` to the first directory holding a `.git` entry.
    /// A `.git` file (linked worktree) counts.
    pub fn resolve_from(path: impl AsRef<Path>, git_bin_path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.as_ref();

        path.ancestors()
            .find(|dir| dir.join(Self::DOT_GIT).exists())
            .map(|root| Self::new(root, git_bin_path))
            .ok_or_else(|| {
                GitBridgeError::UserError(format!(
                    "not inside a git repository: {}",
                    path.display()
                ))
            })
    }

    pub fn working_directory_root(&self) -> &Path {
        &self.working_directory_root
    }

    /// `{dot_git_root}/objects`.
    pub fn git_objects_root(&self) -> PathBuf {
        self.dot_git_root.join(Self::OBJECTS)
    }
}
