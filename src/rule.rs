//! Double-pushout style rewrite rules over [`Graph`].

use std::fmt::{self, Display, Write as _};
use std::hash::Hash;

use tracing::trace;

use crate::error::{GraphError, RewriteError, RuleError, RuleSide};
use crate::graph::{Edge, Graph};
use crate::morphism::Morphism;

/// A weighted rewrite rule.
///
/// The first `shared_nodes` nodes and `shared_edges` edges of `pattern` and
/// `replacement` are identical; that prefix survives a rewrite untouched.
/// The rest of the pattern is deleted from the host and the rest of the
/// replacement is appended.
#[derive(Debug, Clone)]
pub struct GrammarRule<N, E> {
    name: String,
    probability: f64,
    pattern: Graph<N, E>,
    replacement: Graph<N, E>,
    shared_nodes: usize,
    shared_edges: usize,
    first_node_degree_cap: Option<usize>,
}

impl<N, E> GrammarRule<N, E>
where
    N: Clone + PartialEq,
    E: Clone + Eq + Hash,
{
    pub fn new(
        name: impl Into<String>,
        probability: f64,
        pattern: Graph<N, E>,
        shared_nodes: usize,
        shared_edges: usize,
        replacement: Graph<N, E>,
        first_node_degree_cap: Option<usize>,
    ) -> Result<Self, RuleError> {
        let rule = GrammarRule {
            name: name.into(),
            probability,
            pattern,
            replacement,
            shared_nodes,
            shared_edges,
            first_node_degree_cap,
        };
        rule.check()?;
        Ok(rule)
    }

    fn check(&self) -> Result<(), RuleError> {
        let name = &self.name;
        if !self.probability.is_finite() || self.probability < 0.0 {
            return Err(RuleError::InvalidProbability {
                rule: name.clone(),
                probability: self.probability,
            });
        }
        for (side, graph) in [
            (RuleSide::Pattern, &self.pattern),
            (RuleSide::Replacement, &self.replacement),
        ] {
            graph.validate().map_err(|source| RuleError::InvalidFragment {
                rule: name.clone(),
                side,
                source,
            })?;
            if graph.node_count() < self.shared_nodes || graph.edge_count() < self.shared_edges {
                return Err(RuleError::SharedCountExceeds {
                    rule: name.clone(),
                    side,
                    nodes: self.shared_nodes,
                    edges: self.shared_edges,
                });
            }
        }
        if self.pattern.nodes()[..self.shared_nodes] != self.replacement.nodes()[..self.shared_nodes] {
            return Err(RuleError::SharedNodesMismatch { rule: name.clone() });
        }
        if self.pattern.edges()[..self.shared_edges] != self.replacement.edges()[..self.shared_edges] {
            return Err(RuleError::SharedEdgesMismatch { rule: name.clone() });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn pattern(&self) -> &Graph<N, E> {
        &self.pattern
    }

    pub fn replacement(&self) -> &Graph<N, E> {
        &self.replacement
    }

    pub fn shared_nodes(&self) -> usize {
        self.shared_nodes
    }

    pub fn shared_edges(&self) -> usize {
        self.shared_edges
    }

    pub fn first_node_degree_cap(&self) -> Option<usize> {
        self.first_node_degree_cap
    }

    /// Whether `morphism` respects the first-node degree cap in `host`.
    pub fn within_degree_cap(&self, host: &Graph<N, E>, morphism: &Morphism) -> bool {
        match (self.first_node_degree_cap, morphism.node_map.first()) {
            (Some(cap), Some(&first)) => host.in_degree(first) < cap,
            _ => true,
        }
    }

    /// Rewrites `host` at the site given by `morphism`.
    ///
    /// Replacement edges that already exist in the rewritten graph are
    /// merged rather than duplicated.
    pub fn apply_to(&self, host: &Graph<N, E>, morphism: &Morphism) -> Result<Graph<N, E>, RewriteError> {
        let k = self.shared_nodes;
        let m = self.shared_edges;
        let nodes_to_remove = &morphism.node_map[k..];
        let edges_to_remove = &morphism.edge_map[m..];

        let pruned = host.remove_edges(edges_to_remove);
        let intermediate = pruned.remove_nodes(nodes_to_remove).map_err(|err| match err {
            GraphError::ContactCondition { node, edge } => RewriteError::ContactCondition {
                rule: self.name.clone(),
                node,
                edge: (0..host.edge_count())
                    .filter(|i| !edges_to_remove.contains(i))
                    .nth(edge)
                    .unwrap_or(edge),
            },
            source => RewriteError::Malformed {
                rule: self.name.clone(),
                source,
            },
        })?;

        let shared_map: Vec<usize> = morphism.node_map[..k]
            .iter()
            .map(|&i| i - nodes_to_remove.iter().filter(|&&j| j < i).count())
            .collect();

        let base = intermediate.node_count();
        let translate = |a: usize| if a < k { shared_map[a] } else { a - k + base };

        let grown = intermediate.add_nodes(self.replacement.nodes()[k..].iter().cloned());
        let mut added: Vec<Edge<E>> = Vec::new();
        for edge in &self.replacement.edges()[m..] {
            let edge = Edge::new(translate(edge.from), edge.relation.clone(), translate(edge.to));
            if grown.find_edge(edge.from, &edge.relation, edge.to).is_some() || added.contains(&edge) {
                trace!(rule = %self.name, from = edge.from, to = edge.to, "merged existing edge");
                continue;
            }
            added.push(edge);
        }

        grown.add_edges(added).map_err(|source| RewriteError::Malformed {
            rule: self.name.clone(),
            source,
        })
    }
}

impl<N: Display, E: Display> GrammarRule<N, E> {
    /// Graphviz clusters for both sides, shared parts shaded.
    pub(crate) fn write_dot_body(&self, out: &mut String, prefix: &str) -> fmt::Result {
        let sides = [
            ("Right", "r", "Rule produces", &self.replacement),
            ("Left", "l", "Rule matches", &self.pattern),
        ];
        for (side, tag, label, graph) in sides {
            let node_prefix = format!("{prefix}{tag}");
            let edge_prefix = format!("{prefix}{tag}r");
            writeln!(out, "subgraph cluster{prefix}{side} {{")?;
            writeln!(out, "subgraph cluster{prefix}{side}Shared {{")?;
            graph.write_dot_body(out, &node_prefix, &edge_prefix, 0..self.shared_nodes, 0..self.shared_edges)?;
            writeln!(out, "style=filled")?;
            writeln!(out, "color=\"#dedede\"")?;
            writeln!(out, "}}")?;
            graph.write_dot_body(
                out,
                &node_prefix,
                &edge_prefix,
                self.shared_nodes..usize::MAX,
                self.shared_edges..usize::MAX,
            )?;
            writeln!(out, "label = \"{label}\"")?;
            writeln!(out, "style=dashed")?;
            writeln!(out, "}}")?;
        }
        writeln!(out, "label = \"{} (l = {:.2})\"", self.name, self.probability)
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        let _ = self.write_dot_body(&mut out, "");
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphism::find_morphisms;

    type G = Graph<&'static str, u8>;

    fn graph(nodes: &[&'static str], edges: &[(usize, u8, usize)]) -> G {
        Graph::new(nodes.to_vec(), edges.iter().map(|&e| Edge::from(e)).collect()).unwrap()
    }

    fn flat(node: &&'static str) -> Vec<&'static str> {
        vec![*node]
    }

    fn first_match(rule: &GrammarRule<&'static str, u8>, host: &G) -> Morphism {
        find_morphisms(rule.pattern(), host, &"", flat).next().unwrap()
    }

    #[test]
    fn rejects_mismatched_shared_nodes() {
        let err = GrammarRule::new("bad", 1.0, graph(&["A"], &[]), 1, 0, graph(&["B"], &[]), None).unwrap_err();
        assert_eq!(err, RuleError::SharedNodesMismatch { rule: "bad".into() });
    }

    #[test]
    fn rejects_mismatched_shared_edges() {
        let err = GrammarRule::new(
            "bad",
            1.0,
            graph(&["A", "B"], &[(0, 0, 1)]),
            2,
            1,
            graph(&["A", "B"], &[(0, 1, 1)]),
            None,
        )
        .unwrap_err();
        assert_eq!(err, RuleError::SharedEdgesMismatch { rule: "bad".into() });
    }

    #[test]
    fn rejects_shared_counts_larger_than_a_side() {
        let err = GrammarRule::new("bad", 1.0, graph(&["A"], &[]), 2, 0, graph(&["A", "B"], &[]), None).unwrap_err();
        assert!(matches!(err, RuleError::SharedCountExceeds { side: RuleSide::Pattern, .. }));
        let err = GrammarRule::new("bad", 1.0, graph(&["A"], &[]), 0, 1, graph(&["A"], &[]), None).unwrap_err();
        assert!(matches!(err, RuleError::SharedCountExceeds { .. }));
    }

    #[test]
    fn rejects_negative_probability() {
        let err = GrammarRule::new("bad", -0.5, graph(&["A"], &[]), 1, 0, graph(&["A"], &[]), None).unwrap_err();
        assert!(matches!(err, RuleError::InvalidProbability { .. }));
    }

    #[test]
    fn grow_rule_appends_node_and_edge() {
        let rule = GrammarRule::new(
            "grow",
            1.0,
            graph(&["A"], &[]),
            1,
            0,
            graph(&["A", "A"], &[(0, 0, 1)]),
            None,
        )
        .unwrap();
        let host = graph(&["B", "A"], &[]);
        let m = first_match(&rule, &host);
        assert_eq!(m.node_map, vec![1]);
        let result = rule.apply_to(&host, &m).unwrap();
        assert_eq!(result.nodes(), &["B", "A", "A"]);
        assert_eq!(result.edges(), &[Edge::new(1, 0, 2)]);
    }

    #[test]
    fn deletion_remaps_shared_nodes() {
        // replace X (pattern-only) between shared A and C with a direct edge
        let rule = GrammarRule::new(
            "splice",
            1.0,
            graph(&["A", "C", "X"], &[(0, 0, 2), (2, 0, 1)]),
            2,
            0,
            graph(&["A", "C", "Y"], &[(0, 1, 1), (2, 1, 0)]),
            None,
        )
        .unwrap();
        let host = graph(&["X", "Q", "A", "C"], &[(2, 0, 0), (0, 0, 3), (1, 0, 3)]);
        let m = first_match(&rule, &host);
        assert_eq!(m.node_map, vec![2, 3, 0]);
        let result = rule.apply_to(&host, &m).unwrap();
        assert_eq!(result.nodes(), &["Q", "A", "C", "Y"]);
        assert_eq!(
            result.edges(),
            &[Edge::new(0, 0, 2), Edge::new(1, 1, 2), Edge::new(3, 1, 1)]
        );
        let expected = host.node_count() - (3 - 2) + (3 - 2);
        assert_eq!(result.node_count(), expected);
    }

    #[test]
    fn contact_condition_is_reported_with_rule_name() {
        // X is deleted but keeps an edge the pattern does not cover
        let rule = GrammarRule::new("drop", 1.0, graph(&["A", "X"], &[]), 1, 0, graph(&["A"], &[]), None).unwrap();
        let host = graph(&["A", "X", "B"], &[(2, 0, 1)]);
        let m = first_match(&rule, &host);
        let err = rule.apply_to(&host, &m).unwrap_err();
        assert_eq!(
            err,
            RewriteError::ContactCondition {
                rule: "drop".into(),
                node: 1,
                edge: 0
            }
        );
    }

    #[test]
    fn existing_edges_are_merged() {
        let rule = GrammarRule::new(
            "link",
            1.0,
            graph(&["A", "B"], &[]),
            2,
            0,
            graph(&["A", "B"], &[(0, 0, 1)]),
            None,
        )
        .unwrap();
        let host = graph(&["A", "B"], &[(0, 0, 1)]);
        let m = first_match(&rule, &host);
        let result = rule.apply_to(&host, &m).unwrap();
        assert_eq!(result.edge_count(), 1);
    }

    #[test]
    fn degree_cap_counts_incoming_edges() {
        let rule = GrammarRule::new("cap", 1.0, graph(&["A"], &[]), 1, 0, graph(&["A"], &[]), Some(2)).unwrap();
        let host = graph(&["A", "B", "C"], &[(1, 0, 0), (2, 0, 0)]);
        let m = first_match(&rule, &host);
        assert!(!rule.within_degree_cap(&host, &m));
        let host = graph(&["A", "B"], &[(1, 0, 0), (0, 0, 1)]);
        assert!(rule.within_degree_cap(&host, &m));
    }

    #[test]
    fn dot_export_labels_rule() {
        let rule = GrammarRule::new("grow", 0.5, graph(&["A"], &[]), 1, 0, graph(&["A", "A"], &[(0, 0, 1)]), None).unwrap();
        let dot = rule.to_dot();
        assert!(dot.contains("label = \"grow (l = 0.50)\""));
        assert!(dot.contains("subgraph clusterRightShared {"));
        assert!(dot.contains("rr0 [shape=box"));
    }
}
