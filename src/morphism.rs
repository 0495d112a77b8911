//! Subgraph matching of a rule pattern into a host graph.
//!
//! Node types are compared through a hierarchy function: a host node of
//! type `Path/Full` belongs to the groups `Path/Full` and `Path`, so a
//! pattern node of type `Path` may map onto it. A pattern node carrying
//! the wildcard type maps onto any host node, and host nodes carrying the
//! wildcard type are candidates for every pattern node.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::graph::Graph;

/// Embedding of a pattern into a host graph.
///
/// `node_map[i]` is the host node for pattern node `i`; `edge_map[j]` is
/// the host edge for pattern edge `j`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Morphism {
    pub node_map: Vec<usize>,
    pub edge_map: Vec<usize>,
}

/// Lazily enumerates every morphism of `pattern` into `host`.
///
/// The enumeration is a pure function of its inputs: calling this again
/// restarts the same sequence.
pub fn find_morphisms<'a, N, E, H>(
    pattern: &'a Graph<N, E>,
    host: &'a Graph<N, E>,
    wildcard: &N,
    hierarchy: H,
) -> Morphisms<'a, N, E>
where
    N: Clone + Ord,
    E: Clone + Eq + Hash,
    H: Fn(&N) -> Vec<N>,
{
    let pattern_groups = pattern.group_nodes_by_type(&hierarchy);
    let host_groups = host.group_nodes_by_type(&hierarchy);

    let candidates = if sizes_fit(pattern, host, &pattern_groups, &host_groups, wildcard) {
        candidate_lists(pattern, host, &host_groups, wildcard)
    } else {
        None
    };

    let mut edge_index = HashMap::with_capacity(host.edge_count());
    for (i, edge) in host.edges().iter().enumerate() {
        edge_index.insert((edge.from, &edge.relation, edge.to), i);
    }

    let exhausted = candidates.is_none();
    Morphisms {
        pattern,
        cursors: vec![0; pattern.node_count()],
        candidates: candidates.unwrap_or_default(),
        edge_index,
        exhausted,
    }
}

/// Cheap necessary condition: every non-wildcard type group of the pattern
/// needs at least as many host candidates, and the host needs enough nodes
/// overall to give each pattern node its own image.
fn sizes_fit<N: Ord, E>(
    pattern: &Graph<N, E>,
    host: &Graph<N, E>,
    pattern_groups: &BTreeMap<N, Vec<usize>>,
    host_groups: &BTreeMap<N, Vec<usize>>,
    wildcard: &N,
) -> bool
where
    N: Clone,
    E: Clone + Eq + Hash,
{
    // Wildcard pattern nodes are only checked against the raw host size,
    // not against the nodes left over once the typed groups are served.
    // This admits some hopeless candidates; the injectivity check in the
    // odometer rejects them.
    if host.node_count() < pattern.node_count() {
        return false;
    }
    let host_wildcards = host_groups.get(wildcard).map_or(0, Vec::len);
    pattern_groups
        .iter()
        .filter(|(key, _)| *key != wildcard)
        .all(|(key, members)| {
            let available = host_groups.get(key).map_or(0, Vec::len) + host_wildcards;
            available >= members.len()
        })
}

/// Host candidates for each pattern node, or `None` if some node has none.
fn candidate_lists<N, E>(
    pattern: &Graph<N, E>,
    host: &Graph<N, E>,
    host_groups: &BTreeMap<N, Vec<usize>>,
    wildcard: &N,
) -> Option<Vec<Vec<usize>>>
where
    N: Clone + Ord,
    E: Clone + Eq + Hash,
{
    let host_wildcards = host_groups.get(wildcard).map_or(&[][..], Vec::as_slice);
    let mut lists = Vec::with_capacity(pattern.node_count());
    for node in pattern.nodes() {
        let list: Vec<usize> = if node == wildcard {
            (0..host.node_count()).collect()
        } else {
            host_groups
                .get(node)
                .map_or(&[][..], Vec::as_slice)
                .iter()
                .chain(host_wildcards)
                .copied()
                .collect()
        };
        if list.is_empty() {
            return None;
        }
        lists.push(list);
    }
    Some(lists)
}

/// Iterator returned by [`find_morphisms`].
///
/// Walks the cartesian product of per-node candidate lists like an
/// odometer, rightmost cursor fastest, skipping non-injective assignments
/// and assignments whose pattern edges have no host counterpart.
pub struct Morphisms<'a, N, E> {
    pattern: &'a Graph<N, E>,
    candidates: Vec<Vec<usize>>,
    cursors: Vec<usize>,
    edge_index: HashMap<(usize, &'a E, usize), usize>,
    exhausted: bool,
}

impl<N, E> Morphisms<'_, N, E>
where
    N: Clone,
    E: Clone + Eq + Hash,
{
    /// Moves to the next assignment. Returns false once every combination
    /// has been produced.
    fn advance(&mut self) -> bool {
        for i in (0..self.cursors.len()).rev() {
            if self.cursors[i] + 1 < self.candidates[i].len() {
                self.cursors[i] += 1;
                return true;
            }
            self.cursors[i] = 0;
        }
        false
    }

    fn edge_map(&self, node_map: &[usize]) -> Option<Vec<usize>> {
        self.pattern
            .edges()
            .iter()
            .map(|e| {
                self.edge_index
                    .get(&(node_map[e.from], &e.relation, node_map[e.to]))
                    .copied()
            })
            .collect()
    }
}

fn is_injective(node_map: &[usize]) -> bool {
    node_map
        .iter()
        .enumerate()
        .all(|(i, a)| !node_map[i + 1..].contains(a))
}

impl<N, E> Iterator for Morphisms<'_, N, E>
where
    N: Clone,
    E: Clone + Eq + Hash,
{
    type Item = Morphism;

    fn next(&mut self) -> Option<Morphism> {
        while !self.exhausted {
            let node_map: Vec<usize> = self
                .cursors
                .iter()
                .zip(&self.candidates)
                .map(|(&c, list)| list[c])
                .collect();
            self.exhausted = !self.advance();

            if !is_injective(&node_map) {
                continue;
            }
            if let Some(edge_map) = self.edge_map(&node_map) {
                return Some(Morphism { node_map, edge_map });
            }
        }
        None
    }
}
