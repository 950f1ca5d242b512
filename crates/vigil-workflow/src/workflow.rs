use crate::{Graph, GraphError, Step};

/// A validated workflow ready for execution.
///
/// Steps and graph cannot change once built.
#[derive(Debug, Clone)]
pub struct Workflow {
  name: String,
  steps: Vec<Step>,
  graph: Graph,
}

impl Workflow {
  pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, GraphError> {
    let graph = Graph::build(&steps)?;
    Ok(Self {
      name: name.into(),
      steps,
      graph,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Steps in declaration order.
  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn step(&self, name: &str) -> Option<&Step> {
    self.graph.index_of(name).and_then(|i| self.steps.get(i))
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }
}
