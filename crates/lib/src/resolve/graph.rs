//! The resolved dependency graph.
//!
//! A DAG whose nodes are [`ResolvedRule`]s and whose edges point from a rule
//! to each of its dependencies. Rules with no dependencies still appear as
//! isolated nodes. The graph is rebuilt per resolve call; only the builder
//! index behind it is cached.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::rule::{ResolvedRule, RuleBuilder};
use crate::target::Target;

#[derive(Debug, Default)]
pub struct DependencyGraph {
  /// The underlying graph. Edges point from a rule to its dependencies.
  graph: DiGraph<ResolvedRule, ()>,

  /// Map from target to node index; doubles as the memo that keeps each
  /// rule resolved at most once per traversal.
  nodes: HashMap<Target, NodeIndex>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve a builder into the graph. Re-adding an already resolved target
  /// is a no-op; dependencies that are themselves already resolved get an
  /// edge. With post-order insertion every dependency is present by the
  /// time its dependent arrives.
  pub(crate) fn add_rule(&mut self, builder: &RuleBuilder) {
    if self.nodes.contains_key(builder.target()) {
      return;
    }

    let idx = self.graph.add_node(builder.resolve());
    self.nodes.insert(builder.target().clone(), idx);

    for dep in builder.deps() {
      if let Some(&dep_idx) = self.nodes.get(dep) {
        self.graph.add_edge(idx, dep_idx, ());
      }
    }
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  pub fn contains(&self, target: &Target) -> bool {
    self.nodes.contains_key(target)
  }

  pub fn rule(&self, target: &Target) -> Option<&ResolvedRule> {
    self.nodes.get(target).map(|&idx| &self.graph[idx])
  }

  /// Direct dependencies of a rule, in declaration order.
  pub fn dependencies(&self, target: &Target) -> Vec<&ResolvedRule> {
    let Some(&idx) = self.nodes.get(target) else {
      return Vec::new();
    };

    // petgraph yields neighbors in reverse insertion order.
    let mut deps: Vec<&ResolvedRule> = self
      .graph
      .neighbors_directed(idx, Direction::Outgoing)
      .map(|dep_idx| &self.graph[dep_idx])
      .collect();
    deps.reverse();
    deps
  }

  /// Rules that directly depend on a rule.
  pub fn dependents(&self, target: &Target) -> Vec<&ResolvedRule> {
    let Some(&idx) = self.nodes.get(target) else {
      return Vec::new();
    };

    self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep_idx| &self.graph[dep_idx])
      .collect()
  }

  /// All rules, dependents before their dependencies. Deterministic given
  /// the deterministic construction order.
  pub fn topological_order(&self) -> Vec<&ResolvedRule> {
    // The graph is acyclic by construction (cycles abort the traversal
    // before anything is inserted), so toposort cannot fail.
    toposort(&self.graph, None)
      .map(|order| order.into_iter().map(|idx| &self.graph[idx]).collect())
      .unwrap_or_default()
  }
}
