//! Scene relationship graphs: string node types, [`Relationship`] edges,
//! type hierarchy and cluster forest.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{ClusteringError, GraphError};
use crate::graph::{Edge, Graph};
use crate::relationship::Relationship;

pub type SceneGraph = Graph<String, Relationship>;

/// Node type that matches any node during rule matching.
pub const WILDCARD: &str = "";

/// `"Path/Full"` groups under `"Path/Full"` and `"Path"`; plain types group
/// under themselves only.
pub fn node_groups(node_type: &String) -> Vec<String> {
    match node_type.split_once('/') {
        Some((head, _)) => vec![node_type.clone(), head.to_string()],
        None => vec![node_type.clone()],
    }
}

/// Builds a scene graph from borrowed labels and edge triples.
pub fn scene_graph(nodes: &[&str], edges: &[(usize, Relationship, usize)]) -> Result<SceneGraph, GraphError> {
    Graph::new(
        nodes.iter().map(|n| n.to_string()).collect(),
        edges.iter().map(|&e| Edge::from(e)).collect(),
    )
}

/// Cluster parent of every node, derived from part-of and on-top-of edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    parents: Vec<Option<usize>>,
}

impl Clustering {
    /// Computes the clustering of `graph`.
    ///
    /// An edge `(a, part-of, b)` makes `b` the cluster parent of `a`. An edge
    /// `(a, on-top-of, b)` puts `a` into the cluster of `b`. A node that ends
    /// up with two different parents, explicit or inferred, is an error.
    /// Iterates to a fixed point.
    pub fn of(graph: &SceneGraph) -> Result<Self, ClusteringError> {
        let n = graph.node_count();
        let mut parents: Vec<Option<usize>> = vec![None; n];

        for edge in graph.edges().iter().filter(|e| e.relation.is_part_of()) {
            match parents[edge.from] {
                Some(first) if first != edge.to => {
                    return Err(ClusteringError::MultipleParents {
                        node: edge.from,
                        first,
                        second: edge.to,
                    })
                }
                _ => parents[edge.from] = Some(edge.to),
            }
        }

        let resting: Vec<&Edge<Relationship>> = graph
            .edges()
            .iter()
            .filter(|e| e.relation.is_part_of_or_on_top_of() && !e.relation.is_part_of())
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for edge in &resting {
                let (a, b) = (edge.from, edge.to);
                let Some(target) = parents[b] else { continue };
                match parents[a] {
                    Some(current) if current == target => {}
                    Some(current) => {
                        return Err(ClusteringError::MultipleParents {
                            node: a,
                            first: current,
                            second: target,
                        })
                    }
                    None => {
                        parents[a] = Some(target);
                        changed = true;
                    }
                }
            }
        }

        let clustering = Clustering { parents };
        clustering.check_acyclic()?;
        Ok(clustering)
    }

    /// Clustering given directly as a parent array.
    pub fn from_parents(parents: Vec<Option<usize>>) -> Result<Self, ClusteringError> {
        let clustering = Clustering { parents };
        clustering.check_acyclic()?;
        Ok(clustering)
    }

    fn check_acyclic(&self) -> Result<(), ClusteringError> {
        let n = self.parents.len();
        for start in 0..n {
            let mut node = start;
            let mut steps = 0;
            while let Some(parent) = self.parents.get(node).copied().flatten() {
                if parent == start || steps > n {
                    return Err(ClusteringError::Cycle { node: start });
                }
                node = parent;
                steps += 1;
            }
        }
        Ok(())
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Direct cluster members of `parent`.
    pub fn children(&self, parent: usize) -> Vec<usize> {
        (0..self.parents.len())
            .filter(|&i| self.parents[i] == Some(parent))
            .collect()
    }

    /// Nodes that are the cluster parent of at least one node, in node order.
    pub fn cluster_parents(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.parents.iter().flatten().copied().collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of cluster ancestors above `node`.
    pub fn depth(&self, node: usize) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Whether `ancestor` lies on the cluster parent chain of `node`.
    pub fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// `root` followed by every transitive member of its cluster.
    pub fn subtree(&self, root: usize) -> Vec<usize> {
        let mut out = vec![root];
        out.extend((0..self.parents.len()).filter(|&i| self.is_descendant(i, root)));
        out
    }
}

/// Graphviz export with a dashed cluster per cluster parent.
pub fn scene_to_dot(graph: &SceneGraph) -> String {
    let mut out = String::from("digraph {\n");
    let _ = graph.write_dot_body(&mut out, "", "r", 0..usize::MAX, 0..usize::MAX);
    if let Ok(clustering) = Clustering::of(graph) {
        for parent in clustering.cluster_parents() {
            let inside = |i: usize| i == parent || clustering.parent(i) == Some(parent);
            let _ = writeln!(out, "subgraph cluster{parent} {{");
            for i in (0..graph.node_count()).filter(|&i| inside(i)) {
                let _ = writeln!(out, "{i}");
            }
            for (j, edge) in graph.edges().iter().enumerate() {
                if inside(edge.from) && inside(edge.to) {
                    let _ = writeln!(out, "r{j}");
                }
            }
            out.push_str("style=dashed\ncolor=\"#565656\"\n}\n");
        }
    }
    out.push('}');
    out
}

/// Persisted form of a scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge<Relationship>>,
}

impl From<&SceneGraph> for GraphFile {
    fn from(graph: &SceneGraph) -> Self {
        GraphFile {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
        }
    }
}

impl TryFrom<GraphFile> for SceneGraph {
    type Error = GraphError;

    fn try_from(file: GraphFile) -> Result<Self, Self::Error> {
        Graph::new(file.nodes, file.edges)
    }
}
