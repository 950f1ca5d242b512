use std::collections::{HashMap, HashSet, VecDeque};

use crate::{GraphError, Step};

/// Dependency relation between steps.
///
/// Built once from a step list and never modified. Every query returns step
/// names in declaration order, so traversal is deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Step names in declaration order.
  order: Vec<String>,
  index: HashMap<String, usize>,
  /// Adjacency list: step -> steps that depend on it.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step -> steps it depends on.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Validate and freeze the dependency relation of `steps`.
  pub fn build(steps: &[Step]) -> Result<Self, GraphError> {
    let mut order = Vec::with_capacity(steps.len());
    let mut index = HashMap::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
      if index.insert(step.name.clone(), i).is_some() {
        return Err(GraphError::DuplicateStep {
          step: step.name.clone(),
        });
      }
      order.push(step.name.clone());
    }

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for name in &order {
      adjacency.entry(name.clone()).or_default();
      reverse_adjacency.entry(name.clone()).or_default();
    }

    for step in steps {
      let mut seen = HashSet::new();
      for dependency in &step.predecessors {
        if !index.contains_key(dependency) {
          return Err(GraphError::UnknownDependency {
            step: step.name.clone(),
            dependency: dependency.clone(),
          });
        }
        if !seen.insert(dependency.as_str()) {
          continue;
        }
        adjacency
          .entry(dependency.clone())
          .or_default()
          .push(step.name.clone());
        reverse_adjacency
          .entry(step.name.clone())
          .or_default()
          .push(dependency.clone());
      }
    }

    // Keep neighbour lists in declaration order.
    for neighbours in adjacency.values_mut().chain(reverse_adjacency.values_mut()) {
      neighbours.sort_by_key(|n| index.get(n).copied().unwrap_or(usize::MAX));
    }

    let graph = Self {
      order,
      index,
      adjacency,
      reverse_adjacency,
    };
    graph.detect_cycle()?;
    Ok(graph)
  }

  /// DFS with coloring: 0 = unvisited, 1 = in progress, 2 = done.
  fn detect_cycle(&self) -> Result<(), GraphError> {
    fn dfs<'a>(
      node: &'a str,
      graph: &'a Graph,
      color: &mut HashMap<&'a str, u8>,
      stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
      color.insert(node, 1);
      stack.push(node);

      for neighbour in graph.successors(node) {
        match color.get(neighbour.as_str()) {
          Some(1) => {
            // Back edge: the cycle is the stack from `neighbour` onwards.
            let start = stack.iter().position(|n| *n == neighbour.as_str())?;
            let mut path: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
            path.push(neighbour.clone());
            return Some(path);
          }
          Some(0) => {
            if let Some(path) = dfs(neighbour, graph, color, stack) {
              return Some(path);
            }
          }
          _ => {}
        }
      }

      stack.pop();
      color.insert(node, 2);
      None
    }

    let mut color: HashMap<&str, u8> = self.order.iter().map(|n| (n.as_str(), 0u8)).collect();
    let mut stack = Vec::new();
    for name in &self.order {
      if color.get(name.as_str()) == Some(&0) {
        if let Some(path) = dfs(name, self, &mut color, &mut stack) {
          return Err(GraphError::Cycle { path });
        }
      }
    }
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
    self.index.get(name).copied()
  }

  /// Step names in declaration order.
  pub fn names(&self) -> &[String] {
    &self.order
  }

  /// Steps with no predecessors.
  pub fn roots(&self) -> Vec<&str> {
    self
      .order
      .iter()
      .filter(|n| self.predecessors(n).is_empty())
      .map(String::as_str)
      .collect()
  }

  /// Steps not in `completed` whose predecessors all are.
  pub fn ready(&self, completed: &HashSet<String>) -> Vec<&str> {
    self
      .order
      .iter()
      .filter(|n| !completed.contains(*n))
      .filter(|n| self.predecessors(n).iter().all(|p| completed.contains(p)))
      .map(String::as_str)
      .collect()
  }

  /// Steps that directly depend on `name`.
  pub fn successors(&self, name: &str) -> &[String] {
    self
      .adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Steps `name` directly depends on.
  pub fn predecessors(&self, name: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Transitive predecessors of `name`, excluding itself.
  pub fn ancestors(&self, name: &str) -> HashSet<String> {
    self.reachable(name, |n| self.predecessors(n))
  }

  /// Transitive successors of `name`, excluding itself.
  pub fn descendants(&self, name: &str) -> HashSet<String> {
    self.reachable(name, |n| self.successors(n))
  }

  fn reachable<'a, F>(&'a self, name: &str, next: F) -> HashSet<String>
  where
    F: Fn(&str) -> &'a [String],
  {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&str> = next(name).iter().map(String::as_str).collect();
    while let Some(current) = queue.pop_front() {
      if seen.insert(current.to_string()) {
        queue.extend(next(current).iter().map(String::as_str));
      }
    }
    seen
  }

  /// Steps grouped into layers: each layer depends only on earlier layers.
  pub fn layers(&self) -> Vec<Vec<&str>> {
    let mut completed: HashSet<String> = HashSet::new();
    let mut layers = Vec::new();
    while completed.len() < self.order.len() {
      let layer = self.ready(&completed);
      if layer.is_empty() {
        break;
      }
      completed.extend(layer.iter().map(|n| n.to_string()));
      layers.push(layer);
    }
    layers
  }

  /// A topological order of all steps.
  pub fn topological_order(&self) -> Vec<&str> {
    self.layers().into_iter().flatten().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use vigil_step::{StepContext, StepPayload, task_fn};

  fn step(name: &str, after: &[&str]) -> Step {
    let task = task_fn(|_ctx: StepContext| async { Ok(StepPayload::Empty) });
    Step::new(name, task).after(after.iter().copied())
  }

  fn set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
  }

  /// health -> stats -> [pg, mongo] -> cleanup -> disk
  fn backup_graph() -> Graph {
    Graph::build(&[
      step("health", &[]),
      step("stats", &["health"]),
      step("pg", &["stats"]),
      step("mongo", &["stats"]),
      step("cleanup", &["pg", "mongo"]),
      step("disk", &["cleanup"]),
    ])
    .unwrap()
  }

  #[test]
  fn test_ready_of_empty_set_is_roots() {
    let graph = Graph::build(&[
      step("inactive", &[]),
      step("permissions", &[]),
      step("report", &["inactive", "permissions"]),
    ])
    .unwrap();

    assert_eq!(graph.roots(), vec!["inactive", "permissions"]);
    assert_eq!(graph.ready(&HashSet::new()), graph.roots());
  }

  #[test]
  fn test_fan_out_and_fan_in() {
    let graph = backup_graph();

    assert_eq!(graph.successors("stats"), ["pg", "mongo"]);
    assert_eq!(graph.predecessors("cleanup"), ["pg", "mongo"]);
    assert_eq!(graph.ready(&set(&["health", "stats"])), vec!["pg", "mongo"]);
    assert_eq!(graph.ready(&set(&["health", "stats", "pg"])), vec!["mongo"]);
    assert_eq!(
      graph.ready(&set(&["health", "stats", "pg", "mongo"])),
      vec!["cleanup"]
    );
  }

  #[test]
  fn test_ancestors_and_descendants() {
    let graph = backup_graph();

    assert_eq!(graph.ancestors("cleanup"), set(&["health", "stats", "pg", "mongo"]));
    assert_eq!(graph.descendants("pg"), set(&["cleanup", "disk"]));
    assert!(graph.ancestors("health").is_empty());
  }

  #[test]
  fn test_layers() {
    let graph = backup_graph();
    assert_eq!(
      graph.layers(),
      vec![
        vec!["health"],
        vec!["stats"],
        vec!["pg", "mongo"],
        vec!["cleanup"],
        vec!["disk"]
      ]
    );
    assert_eq!(graph.topological_order().len(), 6);
  }

  #[test]
  fn test_unknown_dependency() {
    let err = Graph::build(&[step("a", &["ghost"])]).unwrap_err();
    assert_eq!(
      err,
      GraphError::UnknownDependency {
        step: "a".to_string(),
        dependency: "ghost".to_string()
      }
    );
  }

  #[test]
  fn test_duplicate_step() {
    let err = Graph::build(&[step("a", &[]), step("a", &[])]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateStep { step: "a".to_string() });
  }

  #[test]
  fn test_cycle_reports_path() {
    let err = Graph::build(&[
      step("root", &[]),
      step("a", &["root", "c"]),
      step("b", &["a"]),
      step("c", &["b"]),
    ])
    .unwrap_err();

    let GraphError::Cycle { path } = err else {
      panic!("expected cycle, got {:?}", err);
    };
    assert_eq!(path.first(), path.last());
    assert_eq!(path.len(), 4);
    assert!(path.contains(&"b".to_string()));
  }

  #[test]
  fn test_self_dependency_is_a_cycle() {
    let err = Graph::build(&[step("a", &["a"])]).unwrap_err();
    assert_eq!(
      err,
      GraphError::Cycle {
        path: vec!["a".to_string(), "a".to_string()]
      }
    );
  }

  #[test]
  fn test_duplicate_predecessor_entries_collapse() {
    let graph = Graph::build(&[step("a", &[]), step("b", &["a", "a"])]).unwrap();
    assert_eq!(graph.predecessors("b"), ["a"]);
    assert_eq!(graph.successors("a"), ["b"]);
  }
}
