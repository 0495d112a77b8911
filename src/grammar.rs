//! Probabilistic graph grammar: weighted rule choice, uniform match choice.

use std::fmt::{Display, Write as _};
use std::hash::Hash;

use tracing::{debug, info};

use crate::error::RewriteError;
use crate::graph::Graph;
use crate::morphism::{find_morphisms, Morphism};
use crate::prng::Pcg32;
use crate::rule::GrammarRule;

/// Maps a node type to every group it belongs to, itself included.
pub type Hierarchy<N> = fn(&N) -> Vec<N>;

/// Index drawn from `weights` with probability proportional to each weight.
///
/// Cumulative sum against a single uniform draw. Returns `None` when the
/// weights are empty or sum to zero.
pub fn weighted_choice(rng: &mut Pcg32, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }
    let threshold = rng.next_float() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if threshold < cumulative {
            return Some(i);
        }
    }
    // float rounding can leave the threshold at the very top
    weights.iter().rposition(|&w| w > 0.0)
}

pub struct Grammar<N, E> {
    name: String,
    start_graphs: Vec<Graph<N, E>>,
    rules: Vec<GrammarRule<N, E>>,
    wildcard: N,
    hierarchy: Hierarchy<N>,
}

impl<N, E> Grammar<N, E>
where
    N: Clone + Ord,
    E: Clone + Eq + Hash,
{
    pub fn new(
        name: impl Into<String>,
        start_graphs: Vec<Graph<N, E>>,
        rules: Vec<GrammarRule<N, E>>,
        wildcard: N,
        hierarchy: Hierarchy<N>,
    ) -> Self {
        Grammar {
            name: name.into(),
            start_graphs,
            rules,
            wildcard,
            hierarchy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[GrammarRule<N, E>] {
        &self.rules
    }

    pub fn start_graphs(&self) -> &[Graph<N, E>] {
        &self.start_graphs
    }

    /// Every match of `rule` in `graph` that respects its degree cap.
    pub fn matches(&self, rule: &GrammarRule<N, E>, graph: &Graph<N, E>) -> Vec<Morphism> {
        find_morphisms(rule.pattern(), graph, &self.wildcard, self.hierarchy)
            .filter(|m| rule.within_degree_cap(graph, m))
            .collect()
    }

    /// Applies one randomly chosen rule at a randomly chosen site.
    ///
    /// Returns `Ok(None)` when no rule with positive weight matches; the
    /// graph is then terminal.
    pub fn derive_one_step(
        &self,
        rng: &mut Pcg32,
        graph: &Graph<N, E>,
    ) -> Result<Option<Graph<N, E>>, RewriteError> {
        let mut applicable: Vec<(&GrammarRule<N, E>, Vec<Morphism>)> = Vec::new();
        for rule in &self.rules {
            let matches = self.matches(rule, graph);
            if !matches.is_empty() {
                applicable.push((rule, matches));
            }
        }

        let weights: Vec<f64> = applicable.iter().map(|(rule, _)| rule.probability()).collect();
        let Some(choice) = weighted_choice(rng, &weights) else {
            return Ok(None);
        };
        let (rule, matches) = &applicable[choice];
        let morphism = &matches[rng.next_index(matches.len())];
        debug!(
            rule = rule.name(),
            sites = matches.len(),
            nodes = graph.node_count(),
            "applying rule"
        );
        rule.apply_to(graph, morphism).map(Some)
    }

    /// Derives up to `max_steps` steps, stopping early at a terminal graph.
    pub fn derive_many_steps(
        &self,
        rng: &mut Pcg32,
        graph: &Graph<N, E>,
        max_steps: usize,
    ) -> Result<Graph<N, E>, RewriteError> {
        let mut current = graph.clone();
        for step in 0..max_steps {
            match self.derive_one_step(rng, &current)? {
                Some(next) => current = next,
                None => {
                    debug!(step, "derivation reached a terminal graph");
                    break;
                }
            }
        }
        Ok(current)
    }

    /// Picks a start graph uniformly and derives from it.
    ///
    /// Returns `Ok(None)` if the grammar has no start graphs.
    pub fn derive(&self, rng: &mut Pcg32, max_steps: usize) -> Result<Option<Graph<N, E>>, RewriteError> {
        if self.start_graphs.is_empty() {
            return Ok(None);
        }
        let start = &self.start_graphs[rng.next_index(self.start_graphs.len())];
        let result = self.derive_many_steps(rng, start, max_steps)?;
        info!(
            grammar = %self.name,
            nodes = result.node_count(),
            edges = result.edge_count(),
            "derived graph"
        );
        Ok(Some(result))
    }
}

impl<N: Display, E: Display> Grammar<N, E> {
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for (i, rule) in self.rules.iter().enumerate() {
            let _ = writeln!(out, "subgraph clusterRule{i} {{");
            let _ = rule.write_dot_body(&mut out, &format!("Rule{i}"));
            out.push_str("}\n");
        }
        out.push('}');
        out
    }
}
