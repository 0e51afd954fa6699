use crate::{GraphError, Step};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub type NodeId = String;

/// Sentinel marking the entry of every graph. Carries no step.
pub const START: &str = "__start__";
/// Sentinel marking the exit of every graph. Carries no step.
pub const END: &str = "__end__";

pub(crate) fn is_sentinel(id: &str) -> bool {
    id == START || id == END
}

/// Mutable graph under construction. Node and edge registration is
/// validated eagerly; acyclicity and reachability are checked when the
/// finished definition is compiled into an execution plan.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeId>,
    steps: HashMap<NodeId, Arc<dyn Step>>,
    edges: Vec<(NodeId, NodeId)>,
    edge_set: HashSet<(NodeId, NodeId)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node under a unique name.
    pub fn add_node(&mut self, id: impl Into<NodeId>, step: Arc<dyn Step>) -> Result<(), GraphError> {
        let id = id.into();
        if is_sentinel(&id) || self.steps.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.nodes.push(id.clone());
        self.steps.insert(id, step);
        Ok(())
    }

    /// Adds a dependency edge. Both endpoints must already be
    /// registered (or be a sentinel); duplicate edges collapse to one.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Result<(), GraphError> {
        let from = from.into();
        let to = to.into();

        if from == to {
            return Err(GraphError::SelfLoop(from));
        }
        if to == START || from == END {
            return Err(GraphError::InvalidEdge { from, to });
        }
        for endpoint in [&from, &to] {
            if !is_sentinel(endpoint) && !self.steps.contains_key(endpoint) {
                return Err(GraphError::UnknownNode(endpoint.clone()));
            }
        }

        let key = (from.clone(), to.clone());
        if self.edge_set.insert(key) {
            self.edges.push((from, to));
        }
        Ok(())
    }

    /// Freezes the builder into an immutable definition.
    pub fn build(self) -> GraphDefinition {
        GraphDefinition {
            nodes: self.nodes,
            steps: self.steps,
            edges: self.edges,
        }
    }
}

/// Immutable graph: named nodes with their steps, plus the dependency
/// edges between them and the START/END sentinels.
#[derive(Clone)]
pub struct GraphDefinition {
    nodes: Vec<NodeId>,
    steps: HashMap<NodeId, Arc<dyn Step>>,
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphDefinition {
    /// Node names in registration order, sentinels excluded.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn step(&self, id: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }
}
