//! Rule index and parse cache.
//!
//! The [`Parser`] owns the mapping from declaration file to raw rules and
//! from target to rule builder, decides when that state is stale, and
//! re-invokes the evaluator on demand. All cached state lives in a single
//! [`Generation`] value that is replaced wholesale on invalidation, so
//! "invalidate" is an atomic swap rather than field-by-field clearing.
//!
//! Cache validity, from least to most specific:
//! - *valid for includes*: the recorded includes list equals the one
//!   supplied with the call. A mismatch swaps in a fresh generation and
//!   records the new list.
//! - *file cached*: a file's rules are in the generation (or the whole
//!   project has been parsed) and the includes are valid.
//! - *complete*: the whole project has been parsed and the includes are
//!   valid.
//!
//! A build request is driven by one coordinating thread; the exception is
//! [`Parser::on_file_change`], which a watcher may call concurrently with
//! itself, so all generation access is serialized through a mutex.
//!
//! A failed parse leaves the rules ingested before the failure in place
//! (at-least-once per file, not exactly-once); the one exception is a
//! duplicate definition, which throws the whole generation away because the
//! declaration set itself is broken.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, trace};

use crate::consts::DEFAULT_IGNORED_EXTENSIONS;
use crate::eval::{EvalError, Evaluator};
use crate::resolve::traverse::{TraversalDelegate, TraversalError, depth_first_post_order};
use crate::resolve::{DependencyGraph, ResolveError};
use crate::rule::factory::{FactoryError, FactoryParams, KnownRuleTypes};
use crate::rule::{RawRule, RawRuleError, RuleBuilder};
use crate::target::Target;
use crate::tree::DeclTree;
use crate::watch::{FileChange, FileChangeKind};

/// Errors from parsing declaration files into the rule index.
#[derive(Debug, Error)]
pub enum ParseError {
  /// A declaration references a rule type with no registered factory.
  #[error("unrecognized rule type '{rule_type}' while parsing {file}")]
  UnrecognizedRuleType { rule_type: String, file: PathBuf },

  /// Two raw rules ingested to the same target. The generation is discarded;
  /// nothing advertises the target as resolvable until a fresh parse.
  #[error("duplicate definition for {target}")]
  DuplicateDefinition { target: Target },

  /// A raw rule is missing a required attribute or carries a wrong-typed one.
  #[error("invalid rule in {file}: {source}")]
  InvalidRule {
    file: PathBuf,
    #[source]
    source: RawRuleError,
  },

  /// A whole-project parse was requested against a different root than the
  /// one this parser was constructed for.
  #[error("project root mismatch: this parser was built for {expected}, not {requested}")]
  ProjectRootMismatch { expected: PathBuf, requested: PathBuf },

  #[error(transparent)]
  Factory(#[from] FactoryError),

  #[error(transparent)]
  Eval(#[from] EvalError),
}

/// One cache generation: everything that a changed includes list or a
/// filesystem event invalidates, bundled so invalidation is a single swap.
#[derive(Debug)]
struct Generation {
  /// Every rule builder parsed so far, keyed by target.
  known_targets: HashMap<Target, RuleBuilder>,

  /// Raw rules per declaration file, in ingestion order.
  parsed_files: std::collections::BTreeMap<PathBuf, Vec<RawRule>>,

  /// True only immediately after a whole-project parse.
  all_files_parsed: bool,

  /// The includes the cached state was parsed with. `None` until the first
  /// call records a list.
  includes: Option<Vec<String>>,

  /// Declaration-file layout, rebuilt with the generation.
  decl_tree: DeclTree,
}

impl Generation {
  fn fresh(project_root: &Path) -> Self {
    Self {
      known_targets: HashMap::new(),
      parsed_files: std::collections::BTreeMap::new(),
      all_files_parsed: false,
      includes: None,
      decl_tree: DeclTree::scan(project_root),
    }
  }

  /// Pure comparison; the caller decides whether to invalidate.
  fn includes_match(&self, includes: &[String]) -> bool {
    self.includes.as_deref() == Some(includes)
  }

  fn is_file_cached(&self, decl_file: &Path) -> bool {
    self.all_files_parsed || self.parsed_files.contains_key(decl_file)
  }
}

/// The incremental parser: rule index plus parse cache.
pub struct Parser {
  project_root: PathBuf,
  rule_types: KnownRuleTypes,
  evaluator: Box<dyn Evaluator>,
  ignored_extensions: HashSet<String>,
  state: Mutex<Generation>,
}

impl Parser {
  pub fn new(project_root: impl Into<PathBuf>, rule_types: KnownRuleTypes, evaluator: Box<dyn Evaluator>) -> Self {
    let project_root = project_root.into();
    let state = Mutex::new(Generation::fresh(&project_root));

    Self {
      project_root,
      rule_types,
      evaluator,
      ignored_extensions: DEFAULT_IGNORED_EXTENSIONS.iter().map(ToString::to_string).collect(),
      state,
    }
  }

  /// Replace the set of extensions whose modify-events are ignored.
  pub fn with_ignored_extensions<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.ignored_extensions = extensions.into_iter().map(Into::into).collect();
    self
  }

  pub fn project_root(&self) -> &Path {
    &self.project_root
  }

  /// Parse one declaration file, reusing the cached rules when the file is
  /// already in the current generation.
  ///
  /// On failure, rules ingested before the failing one remain cached for
  /// this generation (at-least-once semantics per file).
  pub fn parse_file(&self, decl_file: &Path, includes: &[String]) -> Result<Vec<RawRule>, ParseError> {
    let mut state = self.lock_state();
    self.ensure_includes(&mut state, includes);
    self.parse_file_locked(&mut state, decl_file, includes)
  }

  /// Parse every declaration file in the project, then filter the parsed
  /// rules. Returns `None` when no filter was supplied, as opposed to
  /// `Some(vec![])` when the filter matched nothing.
  pub fn parse_project(
    &self,
    project_root: &Path,
    includes: &[String],
    filter: Option<&dyn Fn(&RawRule, &str, &Target) -> bool>,
  ) -> Result<Option<Vec<Target>>, ParseError> {
    if project_root != self.project_root {
      return Err(ParseError::ProjectRootMismatch {
        expected: self.project_root.clone(),
        requested: project_root.to_path_buf(),
      });
    }

    let mut state = self.lock_state();
    self.ensure_includes(&mut state, includes);

    if !state.all_files_parsed {
      state.known_targets.clear();
      state.parsed_files.clear();

      debug!("parsing whole project");
      let rules = self.evaluator.evaluate_project(&self.project_root, includes)?;
      self.ingest(&mut state, rules, None)?;
      state.all_files_parsed = true;
    }

    self.filter_targets(&state, filter)
  }

  /// Resolve a set of requested targets into the full dependency graph,
  /// lazily parsing declaration files as unknown dependencies are
  /// discovered. Either the complete graph is returned or nothing is.
  pub fn resolve_targets(&self, targets: &[Target], includes: &[String]) -> Result<DependencyGraph, ResolveError> {
    let mut state = self.lock_state();
    self.ensure_includes(&mut state, includes);

    // Seed the index with the files that own the requested targets. With a
    // complete cache every builder is already known.
    if !state.all_files_parsed {
      let mut seen_files = HashSet::new();
      for target in targets {
        if seen_files.insert(target.build_file().to_path_buf()) {
          self.parse_file_locked(&mut state, target.build_file(), includes)?;
        }
      }
    }

    let mut delegate = ResolveDelegate {
      parser: self,
      state: &mut state,
      includes,
      graph: DependencyGraph::new(),
    };

    if let Err(err) = depth_first_post_order(targets, &mut delegate) {
      return Err(match err {
        TraversalError::Cycle(members) => ResolveError::Cycle { members },
        TraversalError::Delegate(err) => err,
      });
    }

    let graph = delegate.graph;
    debug!(
      requested = targets.len(),
      nodes = graph.len(),
      edges = graph.edge_count(),
      "resolved dependency graph"
    );
    Ok(graph)
  }

  /// Handle a filesystem change event. Safe to call concurrently with
  /// itself; notifications arrive asynchronously from a watcher.
  pub fn on_file_change(&self, change: &FileChange) {
    if change.kind == FileChangeKind::Modified
      && let Some(ext) = change.path.extension().and_then(|e| e.to_str())
      && self.ignored_extensions.contains(ext)
    {
      trace!(path = %change.path.display(), "ignoring modify event on non-declaration source");
      return;
    }

    debug!(path = %change.path.display(), kind = ?change.kind, "file changed, invalidating parse cache");
    let mut state = self.lock_state();
    let includes = state.includes.take();
    *state = Generation::fresh(&self.project_root);
    state.includes = includes;
  }

  fn lock_state(&self) -> MutexGuard<'_, Generation> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Compare the supplied includes against the recorded ones and, when they
  /// differ, swap in a fresh generation recording the new list.
  fn ensure_includes(&self, state: &mut Generation, includes: &[String]) {
    if state.includes_match(includes) {
      return;
    }

    debug!(?includes, "includes changed, invalidating parse cache");
    *state = Generation::fresh(&self.project_root);
    state.includes = Some(includes.to_vec());
  }

  fn parse_file_locked(&self, state: &mut Generation, decl_file: &Path, includes: &[String]) -> Result<Vec<RawRule>, ParseError> {
    if !state.is_file_cached(decl_file) {
      debug!(file = %decl_file.display(), "parsing declaration file");
      let rules = self.evaluator.evaluate_file(&self.project_root, decl_file, includes)?;
      self.ingest(state, rules, Some(decl_file))?;
    }

    Ok(state.parsed_files.get(decl_file).cloned().unwrap_or_default())
  }

  /// Feed raw rules into the index. `source` is the declaration file they
  /// came from, or `None` for a whole-project parse.
  fn ingest(&self, state: &mut Generation, rules: Vec<RawRule>, source: Option<&Path>) -> Result<(), ParseError> {
    for rule in rules {
      let target = self.target_of(state, &rule, source)?;

      let rule_type = rule.rule_type().map_err(|err| ParseError::InvalidRule {
        file: target.build_file().to_path_buf(),
        source: err,
      })?;
      let Some(factory) = self.rule_types.factory(rule_type) else {
        return Err(ParseError::UnrecognizedRuleType {
          rule_type: rule_type.to_string(),
          file: target.build_file().to_path_buf(),
        });
      };

      let builder = factory.build(FactoryParams {
        rule: &rule,
        target: &target,
        project_root: &self.project_root,
        decl_tree: &state.decl_tree,
      })?;

      if state.known_targets.contains_key(&target) {
        // A broken declaration set, not a transient condition. Discard the
        // generation so nothing keeps advertising the target.
        *state = Generation::fresh(&self.project_root);
        return Err(ParseError::DuplicateDefinition { target });
      }

      let build_file = target.build_file().to_path_buf();
      state.known_targets.insert(target, builder);
      state.parsed_files.entry(build_file).or_default().push(rule);
    }

    Ok(())
  }

  fn target_of(&self, state: &Generation, rule: &RawRule, source: Option<&Path>) -> Result<Target, ParseError> {
    let context_file = source
      .map(Path::to_path_buf)
      .unwrap_or_else(|| self.project_root.clone());

    let name = rule.name().map_err(|err| ParseError::InvalidRule {
      file: context_file.clone(),
      source: err,
    })?;
    let base_path = rule.base_path().map_err(|err| ParseError::InvalidRule {
      file: context_file.clone(),
      source: err,
    })?;

    Ok(match source {
      Some(decl_file) => Target::with_build_file(decl_file, base_path, name),
      None => Target::with_build_file(state.decl_tree.decl_file(base_path), base_path, name),
    })
  }

  fn filter_targets(
    &self,
    state: &Generation,
    filter: Option<&dyn Fn(&RawRule, &str, &Target) -> bool>,
  ) -> Result<Option<Vec<Target>>, ParseError> {
    let Some(filter) = filter else {
      return Ok(None);
    };

    let mut matches = Vec::new();
    for (decl_file, rules) in &state.parsed_files {
      for rule in rules {
        let rule_type = rule.rule_type().map_err(|err| ParseError::InvalidRule {
          file: decl_file.clone(),
          source: err,
        })?;
        let target = self.target_of(state, rule, None)?;
        if filter(rule, rule_type, &target) {
          matches.push(target);
        }
      }
    }

    Ok(Some(matches))
  }
}

/// Traversal callbacks binding the resolver to the rule index.
struct ResolveDelegate<'a> {
  parser: &'a Parser,
  state: &'a mut Generation,
  includes: &'a [String],
  graph: DependencyGraph,
}

impl ResolveDelegate<'_> {
  /// Lazily parse the file expected to declare `missing`. With a complete
  /// cache this must never be needed; reaching it then means the dependency
  /// exists nowhere in the project.
  fn ensure_dependency_known(&mut self, missing: &Target, referencing: &Target) -> Result<(), ResolveError> {
    if self.state.all_files_parsed {
      return Err(ResolveError::NoSuchTarget {
        target: missing.clone(),
      });
    }

    let decl_file = missing.build_file().to_path_buf();
    if self.state.is_file_cached(&decl_file) {
      return Err(ResolveError::MissingDependency {
        referencing: referencing.clone(),
        missing: missing.clone(),
        decl_file,
      });
    }

    self.parser.parse_file_locked(self.state, &decl_file, self.includes)?;

    if !self.state.known_targets.contains_key(missing) {
      return Err(ResolveError::MissingDependency {
        referencing: referencing.clone(),
        missing: missing.clone(),
        decl_file,
      });
    }

    Ok(())
  }
}

impl TraversalDelegate for ResolveDelegate<'_> {
  type Error = ResolveError;

  fn expand(&mut self, target: &Target) -> Result<Vec<Target>, ResolveError> {
    let Some(builder) = self.state.known_targets.get(target) else {
      return Err(ResolveError::NoSuchTarget {
        target: target.clone(),
      });
    };
    let deps = builder.deps().to_vec();

    for dep in &deps {
      if !self.state.known_targets.contains_key(dep) {
        self.ensure_dependency_known(dep, target)?;
      }
    }

    Ok(deps)
  }

  fn visit(&mut self, target: &Target) -> Result<(), ResolveError> {
    let Some(builder) = self.state.known_targets.get(target) else {
      return Err(ResolveError::NoSuchTarget {
        target: target.clone(),
      });
    };
    self.graph.add_rule(builder);
    Ok(())
  }
}
