//! Implementation of the `quarry graph` command.
//!
//! Resolves the requested targets and prints the dependency graph in
//! topological order, one `target: dep dep ...` line per rule.

use std::path::Path;

use anyhow::Result;

use quarry_lib::target::Target;

use super::{new_parser, to_anyhow};

pub fn cmd_graph(root: &Path, includes: &[String], target_specs: &[String]) -> Result<()> {
  let parser = new_parser(root);

  let targets = target_specs
    .iter()
    .map(|spec| Target::parse(spec, root))
    .collect::<Result<Vec<_>, _>>()?;

  let graph = to_anyhow(parser.resolve_targets(&targets, includes))?;

  for rule in graph.topological_order() {
    let deps = graph.dependencies(rule.target());
    if deps.is_empty() {
      println!("{}", rule.target());
    } else {
      let dep_names: Vec<String> = deps.iter().map(|dep| dep.target().to_string()).collect();
      println!("{}: {}", rule.target(), dep_names.join(" "));
    }
  }

  Ok(())
}
