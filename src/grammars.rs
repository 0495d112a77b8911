//! Built-in scene grammars, selectable by name.

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::relationship::Relationship::{
    IsPartOf, NextTo, NextToChooseDirection, OnTopOf, OnTopOfMiddle, PathConnectedTo,
};
use crate::relationship::Relationship;
use crate::rule::GrammarRule;
use crate::scene::{node_groups, scene_graph, SceneGraph, WILDCARD};

mod village;

pub type SceneGrammar = Grammar<String, Relationship>;
pub type SceneRule = GrammarRule<String, Relationship>;

type Fragment<'a> = (&'a [&'a str], &'a [(usize, Relationship, usize)]);

/// Names accepted by [`builtin`].
pub const NAMES: [&str; 3] = ["simple", "chain", "village"];

pub fn builtin(name: &str) -> Result<SceneGrammar> {
    match name {
        "simple" => simple(),
        "chain" => chain(),
        "village" => village::village(),
        other => Err(Error::UnknownGrammar(other.to_string())),
    }
}

fn rule(
    name: &str,
    probability: f64,
    pattern: Fragment<'_>,
    shared_nodes: usize,
    shared_edges: usize,
    replacement: Fragment<'_>,
    cap: Option<usize>,
) -> Result<SceneRule> {
    Ok(GrammarRule::new(
        name,
        probability,
        scene_graph(pattern.0, pattern.1)?,
        shared_nodes,
        shared_edges,
        scene_graph(replacement.0, replacement.1)?,
        cap,
    )?)
}

fn grammar(name: &str, starts: Vec<SceneGraph>, rules: Vec<SceneRule>) -> SceneGrammar {
    Grammar::new(name, starts, rules, WILDCARD.to_string(), node_groups)
}

/// A single node that keeps sprouting linked neighbours. Each step adds one
/// node and one edge ending at it.
fn chain() -> Result<SceneGrammar> {
    let grow = rule(
        "Grow",
        1.0,
        (&["Link"], &[]),
        1,
        0,
        (&["Link", "Link"], &[(0, NextTo, 1)]),
        None,
    )?;
    Ok(grammar("chain", vec![scene_graph(&["Link"], &[])?], vec![grow]))
}

const TERRAIN_WITH_PATH: Fragment<'static> = (&["Path", "SimpleTerrain"], &[(0, OnTopOf, 1)]);
const BOX_GROUP_LARGE: Fragment<'static> = (&["SimpleBoxGroup", "SimpleLargeBox"], &[(1, IsPartOf, 0)]);

/// A full path, a three-way or a four-way crossing on `terrain`. Repeated
/// graphs weight the uniform start choice.
fn path_starts(terrain: &str) -> Result<Vec<SceneGraph>> {
    let full = scene_graph(&[terrain, "Path/Full"], &[(1, OnTopOf, 0)])?;
    let three_way = scene_graph(
        &[terrain, "Path/Intersection3", "Path/Half", "Path/Half", "Path/Half"],
        &[
            (1, OnTopOf, 0),
            (2, OnTopOf, 0),
            (3, OnTopOf, 0),
            (4, OnTopOf, 0),
            (2, PathConnectedTo, 1),
            (3, PathConnectedTo, 1),
            (4, PathConnectedTo, 1),
        ],
    )?;
    let four_way = scene_graph(
        &[terrain, "Path/Intersection4", "Path/Half", "Path/Half", "Path/Half", "Path/Half"],
        &[
            (1, OnTopOf, 0),
            (2, OnTopOf, 0),
            (3, OnTopOf, 0),
            (4, OnTopOf, 0),
            (5, OnTopOf, 0),
            (2, PathConnectedTo, 1),
            (3, PathConnectedTo, 1),
            (4, PathConnectedTo, 1),
            (5, PathConnectedTo, 1),
        ],
    )?;
    Ok(vec![
        full.clone(),
        full.clone(),
        full.clone(),
        full,
        three_way.clone(),
        three_way,
        four_way,
    ])
}

/// Terrain with paths, boxes, towers, box groups and sphere groups.
fn simple() -> Result<SceneGrammar> {
    let starts = path_starts("SimpleTerrain")?;

    let mut rules = Vec::new();
    for (name, object) in [
        ("ConstructBox1", "SimpleLargeBox/Green"),
        ("ConstructBox2", "SimpleSmallBox/Green"),
        ("ConstructSphere", "SimpleSphere/Green"),
    ] {
        rules.push(rule(
            name,
            0.1,
            (&["SimpleTerrain"], &[]),
            1,
            0,
            (&["SimpleTerrain", object], &[(1, OnTopOf, 0)]),
            Some(11),
        )?);
    }

    let tower_edges = [
        (0, OnTopOf, 1),
        (2, OnTopOf, 1),
        (2, NextTo, 0),
        (3, IsPartOf, 2),
        (4, OnTopOfMiddle, 3),
        (5, OnTopOfMiddle, 4),
        (6, OnTopOfMiddle, 5),
        (7, OnTopOfMiddle, 6),
        (8, OnTopOfMiddle, 7),
    ];
    let towers: [(&str, &[&str]); 3] = [
        (
            "ConstructTowerA",
            &["SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox", "SimpleSmallBox"],
        ),
        (
            "ConstructTowerB",
            &["SimpleLargeBox", "SimpleLargeBox", "SimpleSmallBox", "SimpleSmallBox", "SimpleSmallBox", "SimpleSphere"],
        ),
        (
            "ConstructTowerC",
            &["SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox", "SimpleLargeBox"],
        ),
    ];
    for (name, stack) in towers {
        let mut nodes = vec!["Path", "SimpleTerrain", "SimpleTower"];
        nodes.extend_from_slice(stack);
        let edges = &tower_edges[..nodes.len()];
        rules.push(rule(name, 0.1, TERRAIN_WITH_PATH, 2, 1, (&nodes, edges), Some(3))?);
    }

    rules.push(rule(
        "ConstructBoxGroup",
        0.4,
        TERRAIN_WITH_PATH,
        2,
        1,
        (
            &["Path", "SimpleTerrain", "SimpleBoxGroup", "SimpleLargeBox", "SimpleLargeBox"],
            &[
                (0, OnTopOf, 1),
                (2, OnTopOf, 1),
                (2, NextTo, 0),
                (3, IsPartOf, 2),
                (4, IsPartOf, 2),
                (4, NextToChooseDirection, 3),
            ],
        ),
        Some(4),
    )?);
    for (name, added) in [
        ("AddBoxGroupLargeBoxNextTo", "SimpleLargeBox"),
        ("AddBoxGroupSmallBoxNextTo", "SimpleSmallBox"),
    ] {
        rules.push(rule(
            name,
            0.3,
            BOX_GROUP_LARGE,
            2,
            1,
            (
                &["SimpleBoxGroup", "SimpleLargeBox", added],
                &[(1, IsPartOf, 0), (2, IsPartOf, 0), (2, NextToChooseDirection, 1)],
            ),
            Some(8),
        )?);
    }
    for (name, base) in [
        ("AddBoxGroupSmallBoxOnTop1", "SimpleLargeBox"),
        ("AddBoxGroupSmallBoxOnTop2", "SimpleSmallBox"),
    ] {
        rules.push(rule(
            name,
            0.3,
            (&["SimpleBoxGroup", base], &[(1, IsPartOf, 0)]),
            2,
            1,
            (
                &["SimpleBoxGroup", base, "SimpleSmallBox"],
                &[(1, IsPartOf, 0), (2, OnTopOfMiddle, 1)],
            ),
            Some(8),
        )?);
    }

    rules.push(rule(
        "ConstructSphereGroup",
        0.2,
        TERRAIN_WITH_PATH,
        2,
        1,
        (
            &["Path", "SimpleTerrain", "SimpleSphereGroup", "SimpleSphere", "SimpleSphere"],
            &[
                (0, OnTopOf, 1),
                (2, OnTopOf, 1),
                (2, NextTo, 0),
                (3, IsPartOf, 2),
                (4, IsPartOf, 2),
                (4, NextTo, 3),
            ],
        ),
        Some(4),
    )?);
    rules.push(rule(
        "AddSphereGroupSphereNextTo",
        0.9,
        (&["SimpleSphereGroup", "SimpleSphere"], &[(1, IsPartOf, 0)]),
        2,
        1,
        (
            &["SimpleSphereGroup", "SimpleSphere", "SimpleSphere"],
            &[(1, IsPartOf, 0), (2, IsPartOf, 0), (2, NextTo, 1)],
        ),
        Some(8),
    )?);
    rules.push(rule(
        "AddSphereGroupSphere",
        0.9,
        (&["SimpleSphereGroup"], &[]),
        1,
        0,
        (&["SimpleSphereGroup", "SimpleSphere"], &[(1, IsPartOf, 0)]),
        Some(8),
    )?);

    Ok(grammar("simple", starts, rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeCatalog;
    use crate::prng::Pcg32;
    use crate::scene::Clustering;

    #[test]
    fn every_builtin_loads() {
        for name in NAMES {
            let grammar = builtin(name).unwrap();
            assert_eq!(grammar.name(), name);
            assert!(!grammar.start_graphs().is_empty());
        }
        assert_eq!(builtin("simple").unwrap().rules().len(), 14);
        assert_eq!(builtin("village").unwrap().rules().len(), 107);
    }

    #[test]
    fn unknown_grammar_is_an_error() {
        assert!(matches!(builtin("castle"), Err(Error::UnknownGrammar(n)) if n == "castle"));
    }

    // -- Chain ---------------------------------------------------------

    #[test]
    fn chain_grows_one_node_and_edge_per_step() {
        let grammar = builtin("chain").unwrap();
        let graph = grammar.derive(&mut Pcg32::new(3, 0), 6).unwrap().unwrap();
        assert_eq!(graph.node_count(), 7);
        assert_eq!(graph.edge_count(), 6);
        assert!(graph.nodes().iter().all(|n| n == "Link"));
        for (i, edge) in graph.edges().iter().enumerate() {
            assert_eq!(edge.to, i + 1);
            assert!(edge.from <= i);
            assert_eq!(edge.relation, NextTo);
        }

        // edges arrive in node order, so one pass reaches everything
        let mut reached = vec![false; graph.node_count()];
        reached[0] = true;
        for edge in graph.edges() {
            if reached[edge.from] {
                reached[edge.to] = true;
            }
        }
        assert!(reached.iter().all(|&r| r), "disconnected chain: {reached:?}");
    }

    // -- Simple --------------------------------------------------------

    #[test]
    fn simple_derivations_stay_clusterable() {
        let grammar = builtin("simple").unwrap();
        for seed in 0..20 {
            let graph = grammar.derive(&mut Pcg32::new(seed, 0), 12).unwrap().unwrap();
            graph.validate().unwrap();
            assert_eq!(graph.nodes()[0], "SimpleTerrain");
            Clustering::of(&graph).unwrap();
        }
    }

    #[test]
    fn towers_stack_their_boxes() {
        let grammar = builtin("simple").unwrap();
        let tower = grammar.rules().iter().find(|r| r.name() == "ConstructTowerB").unwrap();
        let stack = tower
            .replacement()
            .edges()
            .iter()
            .filter(|e| e.relation == OnTopOfMiddle)
            .count();
        assert_eq!(stack, 5);
        assert_eq!(tower.replacement().node_count(), 9);
    }

    // -- Village -------------------------------------------------------

    #[test]
    fn village_derivations_stay_clusterable() {
        let grammar = builtin("village").unwrap();
        for seed in 0..12 {
            let graph = grammar.derive(&mut Pcg32::new(seed, 0), 40).unwrap().unwrap();
            graph.validate().unwrap();
            assert_eq!(graph.nodes()[0], "TerrainPlains");
            Clustering::of(&graph).unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        }
    }

    #[test]
    fn village_grows_settlements_along_its_paths() {
        let grammar = builtin("village").unwrap();
        let graph = grammar.derive(&mut Pcg32::new(1, 0), 60).unwrap().unwrap();
        assert!(graph.node_count() > 20);
        let props = graph.nodes().iter().filter(|n| n.starts_with("Prop")).count();
        assert!(props > 0);
        assert!(graph.nodes().iter().any(|n| n.starts_with("Path/")));
    }

    #[test]
    fn market_stand_rules_carry_the_stand_name() {
        let grammar = builtin("village").unwrap();
        let names: Vec<&str> = grammar.rules().iter().map(|r| r.name()).collect();
        for expected in [
            "ConstructMarketRuleFood1",
            "ExpandMarketRuleSoup",
            "MarketStandFood1TableFood1",
            "MarketStandSoupPlaceEatingTable",
            "MarketStandToolsPlaceStool",
            "MarketStandBooksPlaceStool",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }

        let expand = grammar.rules().iter().find(|r| r.name() == "ExpandMarketRuleTools").unwrap();
        assert_eq!(expand.shared_nodes(), 3);
        assert_eq!(expand.shared_edges(), 3);
        // three market nodes plus the five stand nodes
        assert_eq!(expand.replacement().node_count(), 8);
        assert!(expand
            .replacement()
            .edges()
            .iter()
            .any(|e| e.from == 4 && e.relation == Relationship::IsPartOfFrontEdge && e.to == 3));
    }

    #[test]
    fn specialization_replaces_the_vague_relation() {
        let grammar = builtin("village").unwrap();
        let right = grammar.rules().iter().find(|r| r.name() == "SpezializeNextToRight").unwrap();
        assert_eq!(right.shared_edges(), 0);
        assert_eq!(right.pattern().edges()[0].relation, NextToChooseDirection);
        assert_eq!(right.replacement().edges()[0].relation, Relationship::NextToRight);

        let host = scene_graph(&["Building", "PropFlowerPot"], &[(1, NextToChooseDirection, 0)]).unwrap();
        let sites = grammar.matches(right, &host);
        assert_eq!(sites.len(), 1);
        let out = right.apply_to(&host, &sites[0]).unwrap();
        assert_eq!(out.edge_count(), 1);
        assert_eq!(out.edges()[0].relation, Relationship::NextToRight);
        assert_eq!((out.edges()[0].from, out.edges()[0].to), (1, 0));
    }

    #[test]
    fn every_generated_village_type_is_catalogued() {
        let catalog = NodeCatalog::builtin();
        let grammar = builtin("village").unwrap();
        let produced = grammar
            .start_graphs()
            .iter()
            .chain(grammar.rules().iter().map(|r| r.replacement()))
            .flat_map(|g| g.nodes().iter())
            .filter(|n| !n.is_empty());
        for node_type in produced {
            let known = catalog.types.contains_key(node_type)
                || node_type
                    .split_once('/')
                    .is_some_and(|(base, _)| catalog.types.contains_key(base));
            assert!(known, "{node_type} has no catalog entry");
        }
    }
}
