//! Declaration-file evaluation.
//!
//! The parse cache drives evaluation through the [`Evaluator`] trait and
//! never reads declaration files itself. The production implementation is
//! [`lua::LuaEvaluator`]; tests substitute in-memory evaluators.

pub mod lua;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::rule::RawRule;

/// Errors from evaluating declaration files.
#[derive(Debug, Error)]
pub enum EvalError {
  /// A declaration or include file could not be read.
  #[error("failed to read {file}: {source}")]
  Io {
    file: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Lua raised while executing a declaration or include file.
  #[error("error evaluating {file}: {source}")]
  Lua {
    file: PathBuf,
    #[source]
    source: mlua::Error,
  },

  /// The declaration file lives outside the project root.
  #[error("{file} is not under the project root")]
  OutsideProjectRoot { file: PathBuf },
}

/// Turns declaration files into raw rules.
///
/// Implementations must be deterministic: identical inputs (project root,
/// file set, includes) yield identical rule lists in identical order.
pub trait Evaluator: Send + Sync {
  /// Evaluate a single declaration file. The includes are evaluated first,
  /// in order, in the same scope.
  fn evaluate_file(&self, project_root: &Path, decl_file: &Path, includes: &[String]) -> Result<Vec<RawRule>, EvalError>;

  /// Evaluate every declaration file under the project root.
  fn evaluate_project(&self, project_root: &Path, includes: &[String]) -> Result<Vec<RawRule>, EvalError>;
}
