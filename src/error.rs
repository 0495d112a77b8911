//! Error types for graph construction, rewriting and clustering.
//!
//! An invalid layout during optimisation is not an error here; see
//! [`crate::energy::InvalidLayout`].

use thiserror::Error;

/// Structural problems with a graph value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge endpoint does not name an existing node.
    #[error("edge {edge} ({from} -> {to}) is out of range for {node_count} nodes")]
    EdgeOutOfRange {
        edge: usize,
        from: usize,
        to: usize,
        node_count: usize,
    },

    /// The same (from, relation, to) triple appears twice.
    #[error("edge {edge} ({from} -> {to}) duplicates edge {first}")]
    DuplicateEdge {
        edge: usize,
        first: usize,
        from: usize,
        to: usize,
    },

    /// A node scheduled for removal still has an incident edge.
    #[error("removing node {node} violates the contact condition: edge {edge} still touches it")]
    ContactCondition { node: usize, edge: usize },
}

/// Which side of a rule a definition error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSide {
    Pattern,
    Replacement,
}

impl std::fmt::Display for RuleSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSide::Pattern => f.write_str("pattern"),
            RuleSide::Replacement => f.write_str("replacement"),
        }
    }
}

/// A grammar rule that cannot be defined.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("{rule}: {side} graph is malformed: {source}")]
    InvalidFragment {
        rule: String,
        side: RuleSide,
        #[source]
        source: GraphError,
    },

    #[error("{rule}: {side} has not enough nodes and edges for the shared subgraph ({nodes} nodes, {edges} edges)")]
    SharedCountExceeds {
        rule: String,
        side: RuleSide,
        nodes: usize,
        edges: usize,
    },

    #[error("{rule}: shared nodes of pattern and replacement are not identical")]
    SharedNodesMismatch { rule: String },

    #[error("{rule}: shared edges of pattern and replacement are not identical")]
    SharedEdgesMismatch { rule: String },

    #[error("{rule}: probability weight {probability} must be finite and non-negative")]
    InvalidProbability { rule: String, probability: f64 },
}

/// A rewrite step that could not be applied to the live graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("rule {rule} violated the contact condition at host node {node} (edge {edge})")]
    ContactCondition {
        rule: String,
        node: usize,
        edge: usize,
    },

    #[error("rule {rule} produced a malformed graph: {source}")]
    Malformed {
        rule: String,
        #[source]
        source: GraphError,
    },
}

/// The relationship graph does not form a forest of clusters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusteringError {
    #[error("graph is not clusterable, because node {node} would belong to multiple clusters ({first} and {second})")]
    MultipleParents {
        node: usize,
        first: usize,
        second: usize,
    },

    #[error("graph is not clusterable, because node {node} is its own cluster ancestor")]
    Cycle { node: usize },
}

/// A supplied layout that does not fit the graph it is meant to place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout has {objects} objects for {nodes} graph nodes")]
    ObjectCount { objects: usize, nodes: usize },

    #[error("object {object} claims node index {node_index}")]
    NodeIndex { object: usize, node_index: usize },

    #[error("object {object} has type {found:?} but node {object} is {expected:?}")]
    NodeType {
        object: usize,
        expected: String,
        found: String,
    },

    #[error("object {object} has parent {parent}, out of range for {count} objects")]
    ParentOutOfRange { object: usize, parent: usize, count: usize },

    #[error("object {object} is its own ancestor")]
    ParentCycle { object: usize },

    #[error("path {path} has parent path {parent}, out of range for {count} paths")]
    PathParentOutOfRange { path: usize, parent: usize, count: usize },

    #[error("path {path} is its own ancestor")]
    PathParentCycle { path: usize },

    #[error("path {path} is owned by object {owner}, out of range for {count} objects")]
    PathOwnerOutOfRange { path: usize, owner: usize, count: usize },
}

/// Crate-level error for the generation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Clustering(#[from] ClusteringError),

    #[error("invalid initial layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("unknown grammar: {0}")]
    UnknownGrammar(String),

    #[error("unknown relationship: {0}")]
    UnknownRelationship(String),

    #[error("grammar {0} has no start graphs")]
    NoStartGraph(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
