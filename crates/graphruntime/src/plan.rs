use graphcore::{GraphDefinition, GraphError, NodeId, END, START};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{HashMap, HashSet};

/// Immutable execution plan derived from a graph definition: per-node
/// predecessor and successor sets, resolved once at compile time and
/// shared read-only across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    predecessors: HashMap<NodeId, HashSet<NodeId>>,
    successors: HashMap<NodeId, HashSet<NodeId>>,
    nodes: Vec<NodeId>,
}

impl ExecutionPlan {
    /// Compiles a definition into a plan. Pure and idempotent: the same
    /// definition always yields the same plan, and the definition is
    /// left untouched.
    ///
    /// Fails with `Cycle` when the edge relation is not acyclic, and
    /// with `Unreachable` when a node is cut off from START or cannot
    /// reach END.
    pub fn compile(graph: &GraphDefinition) -> Result<ExecutionPlan, GraphError> {
        let mut dag: DiGraph<NodeId, ()> = DiGraph::new();
        let mut index_of: HashMap<NodeId, NodeIndex> = HashMap::new();

        for id in [START, END]
            .into_iter()
            .map(str::to_string)
            .chain(graph.node_ids().iter().cloned())
        {
            let idx = dag.add_node(id.clone());
            index_of.insert(id, idx);
        }

        for (from, to) in graph.edges() {
            // Builder guarantees both endpoints exist.
            dag.add_edge(index_of[from], index_of[to], ());
        }

        if toposort(&dag, None).is_err() {
            return Err(GraphError::Cycle);
        }

        let reached = reachable(&dag, index_of[START]);
        let mut coreached = HashSet::new();
        {
            let mut dfs = Dfs::new(Reversed(&dag), index_of[END]);
            while let Some(idx) = dfs.next(Reversed(&dag)) {
                coreached.insert(idx);
            }
        }

        for id in graph.node_ids() {
            let idx = index_of[id];
            if !reached.contains(&idx) {
                return Err(GraphError::Unreachable {
                    node: id.clone(),
                    reason: "not reachable from START".to_string(),
                });
            }
            if !coreached.contains(&idx) {
                return Err(GraphError::Unreachable {
                    node: id.clone(),
                    reason: "does not reach END".to_string(),
                });
            }
        }
        if !reached.contains(&index_of[END]) {
            return Err(GraphError::Unreachable {
                node: END.to_string(),
                reason: "not reachable from START".to_string(),
            });
        }

        let mut predecessors: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        let mut successors: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        for id in graph
            .node_ids()
            .iter()
            .cloned()
            .chain([START.to_string(), END.to_string()])
        {
            predecessors.insert(id.clone(), HashSet::new());
            successors.insert(id, HashSet::new());
        }
        for (from, to) in graph.edges() {
            successors.get_mut(from).expect("endpoint registered").insert(to.clone());
            predecessors.get_mut(to).expect("endpoint registered").insert(from.clone());
        }

        Ok(ExecutionPlan {
            predecessors,
            successors,
            nodes: graph.node_ids().to_vec(),
        })
    }

    /// Non-sentinel nodes in registration order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn predecessors(&self, id: &str) -> &HashSet<NodeId> {
        static EMPTY: std::sync::OnceLock<HashSet<NodeId>> = std::sync::OnceLock::new();
        self.predecessors
            .get(id)
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    pub fn successors(&self, id: &str) -> &HashSet<NodeId> {
        static EMPTY: std::sync::OnceLock<HashSet<NodeId>> = std::sync::OnceLock::new();
        self.successors
            .get(id)
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }
}

fn reachable(dag: &DiGraph<NodeId, ()>, from: NodeIndex) -> HashSet<NodeIndex> {
    let mut seen = HashSet::new();
    let mut dfs = Dfs::new(dag, from);
    while let Some(idx) = dfs.next(dag) {
        seen.insert(idx);
    }
    seen
}
