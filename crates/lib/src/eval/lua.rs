//! Lua declaration evaluator.
//!
//! Declaration files are plain Lua executed in a fresh state per file. The
//! evaluator exposes one global, `rule{...}`, which records a raw attribute
//! table; the `base-path` attribute is injected from the file's location so
//! rules stay addressable when the originating file is not otherwise known.
//! Include files run before the declaration file in the same state, so they
//! can define helper functions for declarations to call.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use super::{EvalError, Evaluator};
use crate::rule::{ATTR_BASE_PATH, RawRule, RawValue};
use crate::tree::DeclTree;

/// Evaluates `RULES.lua` declaration files.
pub struct LuaEvaluator;

impl LuaEvaluator {
  pub fn new() -> Self {
    Self
  }

  fn evaluate_decl_file(&self, project_root: &Path, decl_file: &Path, includes: &[String]) -> Result<Vec<RawRule>, EvalError> {
    let source = read_file(decl_file)?;
    let base_path = base_path_of(project_root, decl_file)?;

    let lua = Lua::new();
    let collected: Rc<RefCell<Vec<RawRule>>> = Rc::default();

    let sink = collected.clone();
    let rule_base_path = base_path.clone();
    let rule_fn = lua
      .create_function(move |lua, attrs: LuaTable| {
        let value: RawValue = lua.from_value(LuaValue::Table(attrs))?;
        let RawValue::Table(mut map) = value else {
          return Err(LuaError::external("rule() expects a table of attributes"));
        };
        map.insert(ATTR_BASE_PATH.to_string(), RawValue::String(rule_base_path.clone()));
        sink.borrow_mut().push(RawRule::new(map));
        Ok(())
      })
      .map_err(|source| lua_error(decl_file, source))?;
    lua
      .globals()
      .set("rule", rule_fn)
      .map_err(|source| lua_error(decl_file, source))?;

    for include in includes {
      let include_path = project_root.join(include);
      let include_source = read_file(&include_path)?;
      lua
        .load(&include_source)
        .set_name(include_path.to_string_lossy())
        .exec()
        .map_err(|source| lua_error(&include_path, source))?;
    }

    lua
      .load(&source)
      .set_name(decl_file.to_string_lossy())
      .exec()
      .map_err(|source| lua_error(decl_file, source))?;

    let rules = collected.take();
    debug!(file = %decl_file.display(), count = rules.len(), "evaluated declaration file");
    Ok(rules)
  }
}

impl Default for LuaEvaluator {
  fn default() -> Self {
    Self::new()
  }
}

impl Evaluator for LuaEvaluator {
  fn evaluate_file(&self, project_root: &Path, decl_file: &Path, includes: &[String]) -> Result<Vec<RawRule>, EvalError> {
    self.evaluate_decl_file(project_root, decl_file, includes)
  }

  fn evaluate_project(&self, project_root: &Path, includes: &[String]) -> Result<Vec<RawRule>, EvalError> {
    let tree = DeclTree::scan(project_root);
    let mut rules = Vec::new();
    for decl_file in tree.decl_files() {
      rules.extend(self.evaluate_decl_file(project_root, decl_file, includes)?);
    }
    debug!(count = rules.len(), "evaluated whole project");
    Ok(rules)
  }
}

fn read_file(file: &Path) -> Result<String, EvalError> {
  std::fs::read_to_string(file).map_err(|source| EvalError::Io {
    file: file.to_path_buf(),
    source,
  })
}

fn lua_error(file: &Path, source: mlua::Error) -> EvalError {
  EvalError::Lua {
    file: file.to_path_buf(),
    source,
  }
}

/// Slash-separated path of the file's directory relative to the project
/// root; empty for a root-level declaration file.
fn base_path_of(project_root: &Path, decl_file: &Path) -> Result<String, EvalError> {
  let dir = decl_file.parent().unwrap_or(project_root);
  let relative = dir.strip_prefix(project_root).map_err(|_| EvalError::OutsideProjectRoot {
    file: decl_file.to_path_buf(),
  })?;

  let components: Vec<String> = relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect();
  Ok(components.join("/"))
}
