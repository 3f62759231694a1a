//! Implementation of the `quarry targets` command.
//!
//! Runs a whole-project parse and prints the canonical name of every
//! declared target, optionally filtered by rule type.

use std::path::Path;

use anyhow::Result;

use quarry_lib::rule::RawRule;
use quarry_lib::target::Target;

use super::{new_parser, to_anyhow};

pub fn cmd_targets(root: &Path, includes: &[String], rule_type: Option<&str>) -> Result<()> {
  let parser = new_parser(root);

  let filter = |_: &RawRule, declared_type: &str, _: &Target| rule_type.is_none_or(|want| want == declared_type);
  let targets = to_anyhow(parser.parse_project(root, includes, Some(&filter)))?.unwrap_or_default();

  let mut names: Vec<String> = targets.iter().map(ToString::to_string).collect();
  names.sort();
  for name in names {
    println!("{name}");
  }

  Ok(())
}
