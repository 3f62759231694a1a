//! Dependency graph resolution.
//!
//! [`traverse`] holds the reusable acyclic depth-first post-order traversal
//! over targets; [`graph`] holds the resolved DAG. The parse cache drives
//! both from [`crate::parser::Parser::resolve_targets`].

pub mod graph;
pub mod traverse;

use std::path::PathBuf;

use thiserror::Error;

pub use graph::DependencyGraph;
pub use traverse::{TraversalDelegate, TraversalError, depth_first_post_order};

use crate::parser::ParseError;
use crate::target::Target;

/// Errors from resolving a set of targets into a dependency graph.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A requested or referenced target is not declared anywhere in the
  /// known index after all applicable lazy parsing.
  #[error("no such target: {target}")]
  NoSuchTarget { target: Target },

  /// The file that should declare a dependency was parsed without
  /// declaring it.
  #[error("{referencing} depends on {missing}, but {decl_file} does not declare it")]
  MissingDependency {
    referencing: Target,
    missing: Target,
    decl_file: PathBuf,
  },

  /// The dependency relation loops back into itself. No graph is returned.
  #[error("dependency cycle: {}", display_cycle(.members))]
  Cycle { members: Vec<Target> },

  #[error(transparent)]
  Parse(#[from] ParseError),
}

fn display_cycle(members: &[Target]) -> String {
  members.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}
