//! Rule-type factories.
//!
//! Each declared rule type maps to a [`RuleFactory`] that knows how to turn a
//! raw attribute map into a [`RuleBuilder`]. The [`KnownRuleTypes`] registry
//! owns the type-name dispatch; referencing an unregistered type is a fixed
//! error variant, never a silent fallback.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::rule::{RawRule, RawRuleError, RuleBuilder};
use crate::target::{Target, TargetParseError};
use crate::tree::DeclTree;

/// Context handed to a factory for one raw rule.
pub struct FactoryParams<'a> {
  /// The raw attribute map being built.
  pub rule: &'a RawRule,
  /// The target this rule defines.
  pub target: &'a Target,
  /// Root of the project being parsed.
  pub project_root: &'a Path,
  /// Declaration-file layout of the current cache generation. Factories use
  /// this to answer which package owns a source path.
  pub decl_tree: &'a DeclTree,
}

/// Errors from building a rule or registering a factory.
#[derive(Debug, Error)]
pub enum FactoryError {
  #[error("rule type '{0}' is already registered")]
  DuplicateRuleType(String),

  #[error("{target}: {source}")]
  Attr {
    target: Target,
    #[source]
    source: RawRuleError,
  },

  #[error("{target}: bad dependency reference: {source}")]
  BadDep {
    target: Target,
    #[source]
    source: TargetParseError,
  },
}

/// Builds a [`RuleBuilder`] from one raw rule.
pub trait RuleFactory: Send + Sync {
  fn build(&self, params: FactoryParams<'_>) -> Result<RuleBuilder, FactoryError>;
}

/// Factory for rule types with no special attribute handling: dependencies
/// come from the `deps` list, parsed relative to the declaring package.
pub struct DefaultRuleFactory;

impl RuleFactory for DefaultRuleFactory {
  fn build(&self, params: FactoryParams<'_>) -> Result<RuleBuilder, FactoryError> {
    let FactoryParams {
      rule,
      target,
      project_root,
      ..
    } = params;

    let rule_type = rule
      .rule_type()
      .map_err(|source| FactoryError::Attr {
        target: target.clone(),
        source,
      })?
      .to_string();

    let dep_strings = rule.dep_strings().map_err(|source| FactoryError::Attr {
      target: target.clone(),
      source,
    })?;

    let mut deps = Vec::with_capacity(dep_strings.len());
    for spec in dep_strings {
      let dep = Target::parse_with_base(spec, project_root, target.base_path()).map_err(|source| FactoryError::BadDep {
        target: target.clone(),
        source,
      })?;
      deps.push(dep);
    }

    Ok(RuleBuilder::new(target.clone(), rule_type, deps, rule.clone()))
  }
}

/// Registry from rule type name to factory.
pub struct KnownRuleTypes {
  factories: BTreeMap<String, Box<dyn RuleFactory>>,
}

impl KnownRuleTypes {
  /// An empty registry.
  pub fn new() -> Self {
    Self {
      factories: BTreeMap::new(),
    }
  }

  /// A registry with the built-in rule types (`library`, `binary`,
  /// `genrule`), all backed by [`DefaultRuleFactory`].
  pub fn with_defaults() -> Self {
    let mut known = Self::new();
    for rule_type in ["library", "binary", "genrule"] {
      known
        .factories
        .insert(rule_type.to_string(), Box::new(DefaultRuleFactory));
    }
    known
  }

  /// Register a factory for a rule type. Registering the same type twice is
  /// an error.
  pub fn register(&mut self, rule_type: impl Into<String>, factory: Box<dyn RuleFactory>) -> Result<(), FactoryError> {
    let rule_type = rule_type.into();
    if self.factories.contains_key(&rule_type) {
      return Err(FactoryError::DuplicateRuleType(rule_type));
    }
    self.factories.insert(rule_type, factory);
    Ok(())
  }

  pub fn factory(&self, rule_type: &str) -> Option<&dyn RuleFactory> {
    self.factories.get(rule_type).map(|factory| factory.as_ref())
  }

  pub fn is_known(&self, rule_type: &str) -> bool {
    self.factories.contains_key(rule_type)
  }
}

impl Default for KnownRuleTypes {
  fn default() -> Self {
    Self::new()
  }
}
