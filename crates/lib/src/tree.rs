//! Declaration-file layout of a project.
//!
//! A [`DeclTree`] records where declaration files live under a project root.
//! The parse cache rebuilds it on every invalidation; the Lua evaluator uses
//! it for whole-project discovery; factories use it to answer which package
//! owns a source path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::consts::DECL_FILE_NAME;

/// Index of declaration files under one project root.
#[derive(Debug)]
pub struct DeclTree {
  project_root: PathBuf,
  decl_files: BTreeSet<PathBuf>,
}

fn is_visible(entry: &DirEntry) -> bool {
  entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

impl DeclTree {
  /// Scan the project root for declaration files, skipping dot-directories.
  /// Unreadable entries are skipped rather than failing the scan.
  pub fn scan(project_root: &Path) -> Self {
    let mut decl_files = BTreeSet::new();
    for entry in WalkDir::new(project_root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(is_visible)
      .filter_map(|entry| entry.ok())
    {
      if entry.file_type().is_file() && entry.file_name() == DECL_FILE_NAME {
        decl_files.insert(entry.into_path());
      }
    }

    Self {
      project_root: project_root.to_path_buf(),
      decl_files,
    }
  }

  pub fn project_root(&self) -> &Path {
    &self.project_root
  }

  /// All declaration files found by the scan, in path order.
  pub fn decl_files(&self) -> impl Iterator<Item = &Path> {
    self.decl_files.iter().map(PathBuf::as_path)
  }

  pub fn contains(&self, file: &Path) -> bool {
    self.decl_files.contains(file)
  }

  /// The declaration file expected to declare rules for a package, whether
  /// or not it exists on disk.
  pub fn decl_file(&self, base_path: &str) -> PathBuf {
    if base_path.is_empty() {
      self.project_root.join(DECL_FILE_NAME)
    } else {
      self.project_root.join(base_path).join(DECL_FILE_NAME)
    }
  }

  /// The nearest declaration file at or above `path`, bounded by the project
  /// root. This is the package that owns `path`.
  pub fn nearest_decl_file(&self, path: &Path) -> Option<&Path> {
    for dir in path.ancestors() {
      let candidate = dir.join(DECL_FILE_NAME);
      if let Some(found) = self.decl_files.get(&candidate) {
        return Some(found.as_path());
      }
      if dir == self.project_root {
        break;
      }
    }
    None
  }
}
