//! Filesystem change notifications.
//!
//! The watcher plumbing itself lives outside this crate; whatever delivers
//! events hands them to [`crate::parser::Parser::on_file_change`] as
//! [`FileChange`] values. Invalidation is deliberately conservative: only
//! modify-events on extensions known to never affect rule declarations are
//! ignored, everything else throws the parse cache away.

use std::path::PathBuf;

/// What happened to the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
  Created,
  Modified,
  Deleted,
}

/// A single filesystem change event.
#[derive(Debug, Clone)]
pub struct FileChange {
  pub path: PathBuf,
  pub kind: FileChangeKind,
}

impl FileChange {
  pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
    Self {
      path: path.into(),
      kind,
    }
  }
}
