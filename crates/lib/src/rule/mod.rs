//! Rule data model.
//!
//! A declaration file evaluates to a list of [`RawRule`]s (attribute maps on
//! the evaluator wire format). A type-specific factory turns each raw rule
//! into a [`RuleBuilder`], the unresolved node carrying dependency target
//! references. The graph resolver later materializes [`ResolvedRule`] nodes,
//! at most once per target per traversal.

pub mod factory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::target::Target;

/// Required attribute: rule type name.
pub const ATTR_TYPE: &str = "type";
/// Required attribute: short rule name.
pub const ATTR_NAME: &str = "name";
/// Required attribute: slash-separated package path, injected by the
/// evaluator. Empty for project-root declarations.
pub const ATTR_BASE_PATH: &str = "base-path";
/// Optional attribute: list of dependency target strings.
pub const ATTR_DEPS: &str = "deps";

/// A single attribute value on the evaluator wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
  Bool(bool),
  Integer(i64),
  String(String),
  List(Vec<RawValue>),
  Table(BTreeMap<String, RawValue>),
}

impl RawValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      RawValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[RawValue]> {
    match self {
      RawValue::List(items) => Some(items),
      _ => None,
    }
  }
}

/// Errors from reading attributes off a raw rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RawRuleError {
  #[error("missing required attribute '{0}'")]
  MissingAttribute(&'static str),

  #[error("attribute '{attr}' must be a {expected}")]
  WrongType { attr: String, expected: &'static str },
}

/// An attribute map produced by evaluating a declaration file.
///
/// Always carries `type` and `name`, plus `base-path` injected by the
/// evaluator; everything else is type-specific and consumed only by
/// factories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRule {
  attrs: BTreeMap<String, RawValue>,
}

impl RawRule {
  pub fn new(attrs: BTreeMap<String, RawValue>) -> Self {
    Self { attrs }
  }

  pub fn get(&self, attr: &str) -> Option<&RawValue> {
    self.attrs.get(attr)
  }

  pub fn rule_type(&self) -> Result<&str, RawRuleError> {
    self.required_string(ATTR_TYPE)
  }

  pub fn name(&self) -> Result<&str, RawRuleError> {
    self.required_string(ATTR_NAME)
  }

  pub fn base_path(&self) -> Result<&str, RawRuleError> {
    self.required_string(ATTR_BASE_PATH)
  }

  /// The `deps` attribute as a list of target strings; empty when absent.
  pub fn dep_strings(&self) -> Result<Vec<&str>, RawRuleError> {
    match self.attrs.get(ATTR_DEPS) {
      None => Ok(Vec::new()),
      Some(RawValue::List(items)) => items
        .iter()
        .map(|item| {
          item.as_str().ok_or(RawRuleError::WrongType {
            attr: ATTR_DEPS.to_string(),
            expected: "list of target strings",
          })
        })
        .collect(),
      // Lua cannot distinguish an empty list from an empty table.
      Some(RawValue::Table(map)) if map.is_empty() => Ok(Vec::new()),
      Some(_) => Err(RawRuleError::WrongType {
        attr: ATTR_DEPS.to_string(),
        expected: "list of target strings",
      }),
    }
  }

  fn required_string(&self, attr: &'static str) -> Result<&str, RawRuleError> {
    match self.attrs.get(attr) {
      None => Err(RawRuleError::MissingAttribute(attr)),
      Some(value) => value.as_str().ok_or(RawRuleError::WrongType {
        attr: attr.to_string(),
        expected: "string",
      }),
    }
  }
}

/// An unresolved rule node: the target it defines, its type, the dependency
/// targets it references, and the raw attributes it was built from.
///
/// Immutable once built; exactly one builder may exist per target within a
/// cache generation.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
  target: Target,
  rule_type: String,
  deps: Vec<Target>,
  attrs: RawRule,
}

impl RuleBuilder {
  pub fn new(target: Target, rule_type: impl Into<String>, deps: Vec<Target>, attrs: RawRule) -> Self {
    Self {
      target,
      rule_type: rule_type.into(),
      deps,
      attrs,
    }
  }

  pub fn target(&self) -> &Target {
    &self.target
  }

  pub fn rule_type(&self) -> &str {
    &self.rule_type
  }

  /// Dependency targets in declaration order.
  pub fn deps(&self) -> &[Target] {
    &self.deps
  }

  pub fn attrs(&self) -> &RawRule {
    &self.attrs
  }

  pub(crate) fn resolve(&self) -> ResolvedRule {
    ResolvedRule {
      target: self.target.clone(),
      rule_type: self.rule_type.clone(),
    }
  }
}

/// A fully resolved rule: node payload of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRule {
  target: Target,
  rule_type: String,
}

impl ResolvedRule {
  pub fn target(&self) -> &Target {
    &self.target
  }

  pub fn rule_type(&self) -> &str {
    &self.rule_type
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rule(entries: &[(&str, RawValue)]) -> RawRule {
    RawRule::new(
      entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect(),
    )
  }

  #[test]
  fn required_attributes() {
    let raw = rule(&[
      (ATTR_TYPE, RawValue::String("library".to_string())),
      (ATTR_NAME, RawValue::String("core".to_string())),
      (ATTR_BASE_PATH, RawValue::String("lib".to_string())),
    ]);

    assert_eq!(raw.rule_type().unwrap(), "library");
    assert_eq!(raw.name().unwrap(), "core");
    assert_eq!(raw.base_path().unwrap(), "lib");
  }

  #[test]
  fn missing_attribute_is_named() {
    let raw = rule(&[(ATTR_TYPE, RawValue::String("library".to_string()))]);
    assert_eq!(raw.name(), Err(RawRuleError::MissingAttribute(ATTR_NAME)));
  }

  #[test]
  fn wrong_attribute_type() {
    let raw = rule(&[(ATTR_NAME, RawValue::Integer(7))]);
    assert!(matches!(raw.name(), Err(RawRuleError::WrongType { .. })));
  }

  #[test]
  fn dep_strings_default_to_empty() {
    let raw = rule(&[]);
    assert!(raw.dep_strings().unwrap().is_empty());
  }

  #[test]
  fn dep_strings_in_declaration_order() {
    let raw = rule(&[(
      ATTR_DEPS,
      RawValue::List(vec![
        RawValue::String("//b:b".to_string()),
        RawValue::String(":a".to_string()),
      ]),
    )]);
    assert_eq!(raw.dep_strings().unwrap(), vec!["//b:b", ":a"]);
  }

  #[test]
  fn empty_table_deps_are_empty_list() {
    let raw = rule(&[(ATTR_DEPS, RawValue::Table(BTreeMap::new()))]);
    assert!(raw.dep_strings().unwrap().is_empty());
  }

  #[test]
  fn non_string_dep_rejected() {
    let raw = rule(&[(ATTR_DEPS, RawValue::List(vec![RawValue::Integer(1)]))]);
    assert!(matches!(raw.dep_strings(), Err(RawRuleError::WrongType { .. })));
  }

  #[test]
  fn raw_value_deserializes_from_nested_json() {
    let value: RawValue = serde_json::from_str(r#"{"name": "x", "deps": [":y"], "opts": {"strip": true, "level": 2}}"#).unwrap();

    let RawValue::Table(map) = value else {
      panic!("expected table");
    };
    assert_eq!(map["name"], RawValue::String("x".to_string()));
    assert_eq!(map["deps"], RawValue::List(vec![RawValue::String(":y".to_string())]));
    let RawValue::Table(opts) = &map["opts"] else {
      panic!("expected nested table");
    };
    assert_eq!(opts["strip"], RawValue::Bool(true));
    assert_eq!(opts["level"], RawValue::Integer(2));
  }
}
