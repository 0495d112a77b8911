//! Immutable labelled multigraph with index-based identity.
//!
//! Every operation returns a new graph; node and edge identities are plain
//! indices into the `nodes` and `edges` vectors. Removing nodes renumbers
//! the remaining edges.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Write as _};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A directed, labelled edge `(from, relation, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge<E> {
    pub from: usize,
    pub relation: E,
    pub to: usize,
}

impl<E> Edge<E> {
    pub fn new(from: usize, relation: E, to: usize) -> Self {
        Edge { from, relation, to }
    }

    pub fn touches(&self, node: usize) -> bool {
        self.from == node || self.to == node
    }
}

impl<E> From<(usize, E, usize)> for Edge<E> {
    fn from((from, relation, to): (usize, E, usize)) -> Self {
        Edge { from, relation, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<N, E> {
    nodes: Vec<N>,
    edges: Vec<Edge<E>>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Graph {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl<N, E> Graph<N, E>
where
    N: Clone,
    E: Clone + Eq + Hash,
{
    /// Builds a graph and validates it.
    pub fn new(nodes: Vec<N>, edges: Vec<Edge<E>>) -> Result<Self, GraphError> {
        let graph = Graph { nodes, edges };
        graph.validate()?;
        Ok(graph)
    }

    /// Single-node graph without edges.
    pub fn singleton(node: N) -> Self {
        Graph {
            nodes: vec![node],
            edges: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge<E>] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Checks that every endpoint is in range and no triple repeats.
    pub fn validate(&self) -> Result<(), GraphError> {
        let node_count = self.nodes.len();
        let mut seen: HashMap<&Edge<E>, usize> = HashMap::with_capacity(self.edges.len());
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.from >= node_count || edge.to >= node_count {
                return Err(GraphError::EdgeOutOfRange {
                    edge: i,
                    from: edge.from,
                    to: edge.to,
                    node_count,
                });
            }
            if let Some(&first) = seen.get(edge) {
                return Err(GraphError::DuplicateEdge {
                    edge: i,
                    first,
                    from: edge.from,
                    to: edge.to,
                });
            }
            seen.insert(edge, i);
        }
        Ok(())
    }

    /// Index of the edge `(from, relation, to)`, if present.
    pub fn find_edge(&self, from: usize, relation: &E, to: usize) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| e.from == from && e.to == to && &e.relation == relation)
    }

    /// Number of edges ending at `node`.
    pub fn in_degree(&self, node: usize) -> usize {
        self.edges.iter().filter(|e| e.to == node).count()
    }

    /// Indices of all edges touching `node`, in edge order.
    pub fn incident_edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.touches(node))
            .map(|(i, _)| i)
    }

    /// Drops the listed edges. Out-of-range indices are ignored.
    pub fn remove_edges(&self, indices: &[usize]) -> Self {
        let edges = self
            .edges
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, e)| e.clone())
            .collect();
        Graph {
            nodes: self.nodes.clone(),
            edges,
        }
    }

    /// Drops the listed nodes and renumbers the remaining edges.
    ///
    /// Fails if any removed node still has an incident edge. Out-of-range
    /// indices are ignored.
    pub fn remove_nodes(&self, indices: &[usize]) -> Result<Self, GraphError> {
        let mut remap: Vec<Option<usize>> = Vec::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if indices.contains(&i) {
                remap.push(None);
            } else {
                remap.push(Some(nodes.len()));
                nodes.push(node.clone());
            }
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        for (i, edge) in self.edges.iter().enumerate() {
            let from = remap.get(edge.from).copied().flatten();
            let to = remap.get(edge.to).copied().flatten();
            match (from, to) {
                (Some(from), Some(to)) => edges.push(Edge::new(from, edge.relation.clone(), to)),
                (None, _) => return Err(GraphError::ContactCondition { node: edge.from, edge: i }),
                (_, None) => return Err(GraphError::ContactCondition { node: edge.to, edge: i }),
            }
        }

        Ok(Graph { nodes, edges })
    }

    /// Drops the listed nodes together with every edge touching them.
    pub fn remove_nodes_and_incident_edges(&self, indices: &[usize]) -> Self {
        let incident: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| indices.contains(&e.from) || indices.contains(&e.to))
            .map(|(i, _)| i)
            .collect();
        let pruned = self.remove_edges(&incident);
        let mut remap: Vec<usize> = Vec::with_capacity(pruned.nodes.len());
        let mut nodes = Vec::with_capacity(pruned.nodes.len());
        for (i, node) in pruned.nodes.iter().enumerate() {
            remap.push(nodes.len());
            if !indices.contains(&i) {
                nodes.push(node.clone());
            }
        }
        let edges = pruned
            .edges
            .into_iter()
            .map(|e| Edge::new(remap[e.from], e.relation, remap[e.to]))
            .collect();
        Graph { nodes, edges }
    }

    pub fn add_nodes(&self, nodes: impl IntoIterator<Item = N>) -> Self {
        let mut all = self.nodes.clone();
        all.extend(nodes);
        Graph {
            nodes: all,
            edges: self.edges.clone(),
        }
    }

    /// Appends edges; the result is validated.
    pub fn add_edges(&self, edges: impl IntoIterator<Item = Edge<E>>) -> Result<Self, GraphError> {
        let mut all = self.edges.clone();
        all.extend(edges);
        Graph::new(self.nodes.clone(), all)
    }

    /// Groups node indices under every key `hierarchy` yields for the node.
    ///
    /// Indices inside each group stay in node order.
    pub fn group_nodes_by_type<K, I, F>(&self, hierarchy: F) -> BTreeMap<K, Vec<usize>>
    where
        K: Ord,
        I: IntoIterator<Item = K>,
        F: Fn(&N) -> I,
    {
        let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for key in hierarchy(node) {
                groups.entry(key).or_default().push(i);
            }
        }
        groups
    }
}

impl<N: Display, E: Display> Graph<N, E> {
    /// Graphviz body: one node statement per node and a box per edge.
    ///
    /// `node_range` and `edge_range` restrict the output to a slice of the
    /// graph; indices in the statements stay absolute.
    pub(crate) fn write_dot_body(
        &self,
        out: &mut String,
        node_prefix: &str,
        edge_prefix: &str,
        node_range: std::ops::Range<usize>,
        edge_range: std::ops::Range<usize>,
    ) -> fmt::Result {
        let node_end = node_range.end.min(self.nodes.len());
        let edge_end = edge_range.end.min(self.edges.len());
        for i in node_range.start.min(node_end)..node_end {
            writeln!(out, "{node_prefix}{i} [label=\"{}\"]", self.nodes[i])?;
        }
        for i in edge_range.start.min(edge_end)..edge_end {
            let edge = &self.edges[i];
            writeln!(
                out,
                "{edge_prefix}{i} [shape=box; color=gray; label=\"{}\"]",
                edge.relation
            )?;
            writeln!(out, "{node_prefix}{} -> {edge_prefix}{i} [dir=none]", edge.from)?;
            writeln!(out, "{edge_prefix}{i} -> {node_prefix}{}", edge.to)?;
        }
        Ok(())
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        // writing into a String cannot fail
        let _ = self.write_dot_body(&mut out, "", "r", 0..usize::MAX, 0..usize::MAX);
        out.push('}');
        out
    }
}
