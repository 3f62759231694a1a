//! Build target identifiers.
//!
//! A [`Target`] names exactly one declared rule: the declaration file that
//! owns it, the slash-separated package path derived from that file's
//! directory, and the short rule name. The canonical string form is
//! `//<base-path>:<name>` (`//:<name>` for project-root declarations).

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::DECL_FILE_NAME;

/// Identifier of a single declared rule.
///
/// Targets are immutable values: two targets parsed independently compare
/// equal when they name the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
  build_file: PathBuf,
  base_path: String,
  name: String,
}

/// Errors from parsing a target string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetParseError {
  /// The string starts with neither `//` nor `:`.
  #[error("target '{0}' must start with '//' (absolute) or ':' (package-relative)")]
  MissingPrefix(String),

  /// No `:` separating the base path from the rule name.
  #[error("target '{0}' is missing a ':<name>' part")]
  MissingName(String),

  /// The rule name after `:` is empty.
  #[error("target '{0}' has an empty rule name")]
  EmptyName(String),
}

impl Target {
  /// Create a target whose declaration file is derived from the base path
  /// (`<root>/<base-path>/RULES.lua`).
  pub fn new(project_root: &Path, base_path: impl Into<String>, name: impl Into<String>) -> Self {
    let base_path = base_path.into();
    let build_file = if base_path.is_empty() {
      project_root.join(DECL_FILE_NAME)
    } else {
      project_root.join(&base_path).join(DECL_FILE_NAME)
    };

    Self {
      build_file,
      base_path,
      name: name.into(),
    }
  }

  /// Create a target owned by a known declaration file.
  pub fn with_build_file(build_file: impl Into<PathBuf>, base_path: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      build_file: build_file.into(),
      base_path: base_path.into(),
      name: name.into(),
    }
  }

  /// Parse an absolute target string (`//base/path:name`).
  pub fn parse(spec: &str, project_root: &Path) -> Result<Self, TargetParseError> {
    let Some(rest) = spec.strip_prefix("//") else {
      return Err(TargetParseError::MissingPrefix(spec.to_string()));
    };
    let Some((base_path, name)) = rest.split_once(':') else {
      return Err(TargetParseError::MissingName(spec.to_string()));
    };
    if name.is_empty() {
      return Err(TargetParseError::EmptyName(spec.to_string()));
    }

    Ok(Self::new(project_root, base_path, name))
  }

  /// Parse a target string appearing inside a declaration: absolute
  /// (`//base/path:name`) or relative to the declaring package (`:name`).
  pub fn parse_with_base(spec: &str, project_root: &Path, base_path: &str) -> Result<Self, TargetParseError> {
    if let Some(name) = spec.strip_prefix(':') {
      if name.is_empty() {
        return Err(TargetParseError::EmptyName(spec.to_string()));
      }
      return Ok(Self::new(project_root, base_path, name));
    }

    Self::parse(spec, project_root)
  }

  /// The declaration file that owns this target.
  pub fn build_file(&self) -> &Path {
    &self.build_file
  }

  /// Slash-separated package path; empty for project-root declarations.
  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  /// Short rule name.
  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "//{}:{}", self.base_path, self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn root() -> PathBuf {
    PathBuf::from("/project")
  }

  #[test]
  fn parse_absolute() {
    let target = Target::parse("//lib/core:core", &root()).unwrap();
    assert_eq!(target.base_path(), "lib/core");
    assert_eq!(target.name(), "core");
    assert_eq!(target.build_file(), Path::new("/project/lib/core/RULES.lua"));
    assert_eq!(target.to_string(), "//lib/core:core");
  }

  #[test]
  fn parse_project_root_target() {
    let target = Target::parse("//:all", &root()).unwrap();
    assert_eq!(target.base_path(), "");
    assert_eq!(target.build_file(), Path::new("/project/RULES.lua"));
    assert_eq!(target.to_string(), "//:all");
  }

  #[test]
  fn parse_relative_uses_base_path() {
    let target = Target::parse_with_base(":util", &root(), "lib").unwrap();
    assert_eq!(target.to_string(), "//lib:util");
    assert_eq!(target.build_file(), Path::new("/project/lib/RULES.lua"));
  }

  #[test]
  fn parse_with_base_accepts_absolute() {
    let target = Target::parse_with_base("//app:main", &root(), "lib").unwrap();
    assert_eq!(target.to_string(), "//app:main");
  }

  #[test]
  fn parse_rejects_bad_specs() {
    assert_eq!(
      Target::parse("lib:core", &root()),
      Err(TargetParseError::MissingPrefix("lib:core".to_string()))
    );
    assert_eq!(
      Target::parse("//lib/core", &root()),
      Err(TargetParseError::MissingName("//lib/core".to_string()))
    );
    assert_eq!(
      Target::parse("//lib:", &root()),
      Err(TargetParseError::EmptyName("//lib:".to_string()))
    );
    assert_eq!(
      Target::parse_with_base(":", &root(), "lib"),
      Err(TargetParseError::EmptyName(":".to_string()))
    );
  }

  #[test]
  fn equal_regardless_of_parse_origin() {
    let parsed = Target::parse("//lib:core", &root()).unwrap();
    let constructed = Target::new(&root(), "lib", "core");
    assert_eq!(parsed, constructed);

    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(parsed);
    assert!(set.contains(&constructed));
  }
}
