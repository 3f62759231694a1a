mod graph;
mod targets;

pub use graph::cmd_graph;
pub use targets::cmd_targets;

use std::fmt::Display;
use std::path::Path;

use quarry_lib::eval::lua::LuaEvaluator;
use quarry_lib::parser::Parser;
use quarry_lib::rule::factory::KnownRuleTypes;

/// A parser over the project with the built-in rule types.
pub(crate) fn new_parser(root: &Path) -> Parser {
  Parser::new(root, KnownRuleTypes::with_defaults(), Box::new(LuaEvaluator::new()))
}

/// Convert lib errors to anyhow by message (works around mlua errors not
/// being Send+Sync).
pub(crate) fn to_anyhow<T, E: Display>(result: Result<T, E>) -> anyhow::Result<T> {
  result.map_err(|err| anyhow::anyhow!("{err}"))
}
