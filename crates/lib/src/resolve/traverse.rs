//! Acyclic depth-first post-order traversal over targets.
//!
//! The traversal is parameterized by a [`TraversalDelegate`]: `expand`
//! returns a node's children (and may fail, e.g. to lazily parse the file
//! expected to declare them), `visit` runs once per node after all of its
//! children have been visited. Cycle detection uses an explicit recursion
//! stack and a tri-state visit table rather than call-stack recursion, so
//! arbitrarily deep dependency chains traverse in bounded stack space.

use std::collections::HashMap;

use crate::target::Target;

/// Callbacks driving one traversal.
pub trait TraversalDelegate {
  type Error;

  /// Return the children of `target` in the order they should be recursed
  /// into.
  fn expand(&mut self, target: &Target) -> Result<Vec<Target>, Self::Error>;

  /// Called exactly once per reachable node, after all of its children.
  fn visit(&mut self, target: &Target) -> Result<(), Self::Error>;
}

/// Traversal outcome distinguishing cycles from delegate failures.
#[derive(Debug)]
pub enum TraversalError<E> {
  /// A back-edge into the active expansion path. Members are listed in
  /// path order, repeating the entry node to close the loop.
  Cycle(Vec<Target>),
  Delegate(E),
}

impl<E> From<E> for TraversalError<E> {
  fn from(err: E) -> Self {
    TraversalError::Delegate(err)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
  InProgress,
  Done,
}

struct Frame {
  target: Target,
  children: Vec<Target>,
  next: usize,
}

/// Traverse from `roots` in the order supplied, recursing into children in
/// the order `expand` returns them.
pub fn depth_first_post_order<D: TraversalDelegate>(roots: &[Target], delegate: &mut D) -> Result<(), TraversalError<D::Error>> {
  let mut states: HashMap<Target, VisitState> = HashMap::new();
  let mut stack: Vec<Frame> = Vec::new();

  for root in roots {
    if states.contains_key(root) {
      continue;
    }

    let children = delegate.expand(root)?;
    states.insert(root.clone(), VisitState::InProgress);
    stack.push(Frame {
      target: root.clone(),
      children,
      next: 0,
    });

    loop {
      let next_child = match stack.last_mut() {
        None => break,
        Some(frame) => {
          if frame.next < frame.children.len() {
            let child = frame.children[frame.next].clone();
            frame.next += 1;
            Some(child)
          } else {
            None
          }
        }
      };

      match next_child {
        Some(child) => match states.get(&child).copied() {
          Some(VisitState::Done) => {}
          Some(VisitState::InProgress) => {
            return Err(TraversalError::Cycle(cycle_members(&stack, &child)));
          }
          None => {
            let children = delegate.expand(&child)?;
            states.insert(child.clone(), VisitState::InProgress);
            stack.push(Frame {
              target: child,
              children,
              next: 0,
            });
          }
        },
        None => {
          if let Some(frame) = stack.pop() {
            delegate.visit(&frame.target)?;
            states.insert(frame.target, VisitState::Done);
          }
        }
      }
    }
  }

  Ok(())
}

fn cycle_members(stack: &[Frame], back_edge: &Target) -> Vec<Target> {
  let start = stack
    .iter()
    .position(|frame| frame.target == *back_edge)
    .unwrap_or(0);

  let mut members: Vec<Target> = stack[start..].iter().map(|frame| frame.target.clone()).collect();
  members.push(back_edge.clone());
  members
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::path::PathBuf;

  use super::*;

  struct MapDelegate {
    edges: BTreeMap<Target, Vec<Target>>,
    visited: Vec<Target>,
    expand_calls: usize,
  }

  impl MapDelegate {
    fn new(edges: &[(&Target, &[&Target])]) -> Self {
      Self {
        edges: edges
          .iter()
          .map(|(from, to)| ((*from).clone(), to.iter().map(|t| (*t).clone()).collect()))
          .collect(),
        visited: Vec::new(),
        expand_calls: 0,
      }
    }
  }

  impl TraversalDelegate for MapDelegate {
    type Error = String;

    fn expand(&mut self, target: &Target) -> Result<Vec<Target>, String> {
      self.expand_calls += 1;
      self
        .edges
        .get(target)
        .cloned()
        .ok_or_else(|| format!("unknown: {target}"))
    }

    fn visit(&mut self, target: &Target) -> Result<(), String> {
      self.visited.push(target.clone());
      Ok(())
    }
  }

  fn target(name: &str) -> Target {
    Target::new(&PathBuf::from("/project"), "pkg", name)
  }

  #[test]
  fn visits_in_post_order() {
    let (a, b, c, d) = (target("a"), target("b"), target("c"), target("d"));
    let mut delegate = MapDelegate::new(&[
      (&a, &[&b, &c]),
      (&b, &[&d]),
      (&c, &[&d]),
      (&d, &[]),
    ]);

    depth_first_post_order(&[a.clone()], &mut delegate).unwrap();

    assert_eq!(delegate.visited, vec![d, b, c, a]);
  }

  #[test]
  fn expands_each_node_once() {
    let (a, b, c, d) = (target("a"), target("b"), target("c"), target("d"));
    let mut delegate = MapDelegate::new(&[
      (&a, &[&b, &c]),
      (&b, &[&d]),
      (&c, &[&d]),
      (&d, &[]),
    ]);

    depth_first_post_order(&[a], &mut delegate).unwrap();

    assert_eq!(delegate.expand_calls, 4);
  }

  #[test]
  fn repeated_roots_are_visited_once() {
    let a = target("a");
    let mut delegate = MapDelegate::new(&[(&a, &[])]);

    depth_first_post_order(&[a.clone(), a.clone()], &mut delegate).unwrap();

    assert_eq!(delegate.visited, vec![a]);
  }

  #[test]
  fn back_edge_reports_cycle_members() {
    let (a, b) = (target("a"), target("b"));
    let mut delegate = MapDelegate::new(&[(&a, &[&b]), (&b, &[&a])]);

    let err = depth_first_post_order(&[a.clone()], &mut delegate).unwrap_err();
    let TraversalError::Cycle(members) = err else {
      panic!("expected cycle");
    };
    assert_eq!(members, vec![a.clone(), b, a]);
  }

  #[test]
  fn self_edge_is_a_cycle() {
    let a = target("a");
    let mut delegate = MapDelegate::new(&[(&a, &[&a])]);

    let err = depth_first_post_order(&[a.clone()], &mut delegate).unwrap_err();
    assert!(matches!(err, TraversalError::Cycle(members) if members == vec![a.clone(), a]));
  }

  #[test]
  fn delegate_error_aborts() {
    let a = target("a");
    let ghost = target("ghost");
    let mut delegate = MapDelegate::new(&[(&a, &[&ghost])]);

    let err = depth_first_post_order(&[a], &mut delegate).unwrap_err();
    assert!(matches!(err, TraversalError::Delegate(msg) if msg.contains("ghost")));
  }
}
