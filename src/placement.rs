//! Initial random layout of a derived scene graph.
//!
//! Objects are scattered on the ground, then resting relations stack
//! objects on their supports and path connections pull paths onto their
//! intersections. Paths get a straight polyline and a parent path.

use tracing::debug;

use crate::catalog::{NodeCatalog, PathTraits};
use crate::error::ClusteringError;
use crate::layout::{add, forward, rotate_y, scale, sub, Layout, ObjectPlacement, PathPlacement, Pose, Vec3};
use crate::prng::Pcg32;
use crate::relationship::Relationship;
use crate::scene::{Clustering, SceneGraph};

/// Half width of the square that unplaced objects are scattered over.
const SCATTER_RANGE: f64 = 10.0;

pub fn place_objects(
    graph: &SceneGraph,
    catalog: &NodeCatalog,
    hierarchical: bool,
    path_generation: bool,
    rng: &mut Pcg32,
) -> Result<Layout, ClusteringError> {
    let clustering = if hierarchical {
        Some(Clustering::of(graph)?)
    } else {
        None
    };

    let mut world: Vec<Pose> = (0..graph.node_count())
        .map(|i| {
            if i == 0 {
                return Pose {
                    position: [0.0; 3],
                    yaw_deg: 0.0,
                };
            }
            let yaw_deg = rng.next_range(0.0, 360.0);
            let x = rng.next_range(-SCATTER_RANGE, SCATTER_RANGE);
            let z = rng.next_range(-SCATTER_RANGE, SCATTER_RANGE);
            Pose {
                position: [x, 0.0, z],
                yaw_deg,
            }
        })
        .collect();

    for edge in graph.edges() {
        if !edge.relation.is_part_of_or_on_top_of() {
            continue;
        }
        let (top, bottom) = (edge.from, edge.to);
        let Some(extents) = catalog.get(&graph.nodes()[bottom]).half_extents else {
            continue;
        };
        let offset = [
            rng.next_range(-extents[0], extents[0]),
            0.0,
            rng.next_range(-extents[2], extents[2]),
        ];
        let support = world[bottom];
        let mut target = add(support.position, rotate_y(offset, support.yaw_deg));
        target[1] = support.position[1] + 2.0 * extents[1];
        let delta = sub(target, world[top].position);
        shift(&mut world, clustering.as_ref(), top, delta);
    }

    for edge in graph.edges() {
        if edge.relation == Relationship::PathConnectedTo {
            let delta = sub(world[edge.to].position, world[edge.from].position);
            shift(&mut world, clustering.as_ref(), edge.from, delta);
        }
    }

    let objects = world
        .iter()
        .enumerate()
        .map(|(i, pose)| {
            let parent_index = match &clustering {
                Some(c) if i > 0 => c.parent(i),
                _ => None,
            };
            let local = match parent_index {
                Some(parent) => world[parent].localize(pose),
                None => *pose,
            };
            ObjectPlacement {
                node_type: graph.nodes()[i].clone(),
                node_index: i,
                parent_index,
                position: local.position,
                rotation_y: local.yaw_deg,
            }
        })
        .collect();

    let mut layout = Layout {
        objects,
        paths: Vec::new(),
    };
    if path_generation {
        place_paths(graph, catalog, clustering.as_ref(), &world, &mut layout, rng);
    }
    debug!(
        objects = layout.objects.len(),
        paths = layout.paths.len(),
        hierarchical,
        "placed objects"
    );
    Ok(layout)
}

/// Moves `node` by `delta`, carrying its cluster members along.
fn shift(world: &mut [Pose], clustering: Option<&Clustering>, node: usize, delta: Vec3) {
    let moved = match clustering {
        Some(c) => c.subtree(node),
        None => vec![node],
    };
    for i in moved {
        world[i].position = add(world[i].position, delta);
    }
}

fn path_traits<'a>(graph: &SceneGraph, catalog: &'a NodeCatalog, node: usize) -> Option<&'a PathTraits> {
    catalog.get(&graph.nodes()[node]).path.as_ref()
}

fn place_paths(
    graph: &SceneGraph,
    catalog: &NodeCatalog,
    clustering: Option<&Clustering>,
    world: &[Pose],
    layout: &mut Layout,
    rng: &mut Pcg32,
) {
    let mut path_of: Vec<Option<usize>> = vec![None; graph.node_count()];
    for node in 0..graph.node_count() {
        let Some(traits) = path_traits(graph, catalog, node) else {
            continue;
        };
        let direction = forward(rng.next_range(0.0, 360.0));
        let start = world[node].position;
        let node_positions = (0..traits.vertex_count.max(1))
            .map(|k| add(start, scale(direction, k as f64 * traits.vertex_spacing)))
            .collect();
        path_of[node] = Some(layout.paths.len());
        layout.paths.push(PathPlacement {
            node_positions,
            parent_index: None,
            owner: Some(node),
        });
    }

    let is_root: Vec<bool> = layout
        .paths
        .iter()
        .map(|p| {
            p.owner
                .and_then(|owner| path_traits(graph, catalog, owner))
                .is_some_and(|t| t.is_root)
        })
        .collect();
    let try_attach = |layout: &mut Layout, child: usize, parent: usize| {
        if layout.paths[child].parent_index.is_none()
            && child != parent
            && layout.could_be_parent_path_index(parent, child)
        {
            layout.paths[child].parent_index = Some(parent);
        }
    };

    for edge in graph.edges() {
        if edge.relation != Relationship::PathConnectedTo {
            continue;
        }
        if let (Some(child), Some(parent)) = (path_of[edge.from], path_of[edge.to]) {
            try_attach(layout, child, parent);
        }
    }

    for edge in graph.edges() {
        if edge.relation != Relationship::NextToChooseDirection {
            continue;
        }
        let Some(parent) = path_of[edge.to] else {
            continue;
        };
        let sources = match clustering {
            Some(c) => c.subtree(edge.from),
            None => vec![edge.from],
        };
        for child in sources.into_iter().filter_map(|s| path_of[s]) {
            if !is_root[child] {
                try_attach(layout, child, parent);
            }
        }
    }

    let roots: Vec<usize> = (0..layout.paths.len()).filter(|&p| is_root[p]).collect();
    for child in 0..layout.paths.len() {
        if is_root[child] || layout.paths[child].parent_index.is_some() {
            continue;
        }
        let candidates: Vec<usize> = roots
            .iter()
            .copied()
            .filter(|&r| r != child && layout.could_be_parent_path_index(r, child))
            .collect();
        if !candidates.is_empty() {
            let parent = candidates[rng.next_index(candidates.len())];
            layout.paths[child].parent_index = Some(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeTraits;
    use crate::layout::norm;
    use crate::scene::scene_graph;
    use Relationship::*;

    fn table_catalog() -> NodeCatalog {
        let mut catalog = NodeCatalog::builtin();
        catalog.insert(
            "Table",
            NodeTraits {
                half_extents: Some([1.0, 0.5, 2.0]),
                ..NodeTraits::default()
            },
        );
        catalog
    }

    #[test]
    fn one_object_per_node_with_root_at_origin() {
        let g = scene_graph(&["SimpleTerrain", "SimpleLargeBox", "SimpleSmallBox"], &[]).unwrap();
        let layout = place_objects(&g, &table_catalog(), false, true, &mut Pcg32::new(1, 0)).unwrap();
        assert_eq!(layout.objects.len(), 3);
        for (i, object) in layout.objects.iter().enumerate() {
            assert_eq!(object.node_index, i);
            assert_eq!(object.node_type, g.nodes()[i]);
            assert!(object.parent_index.is_none());
            assert!(object.position[0].abs() <= SCATTER_RANGE);
            assert!(object.position[2].abs() <= SCATTER_RANGE);
        }
        assert_eq!(layout.objects[0].position, [0.0; 3]);
        assert_eq!(layout.objects[0].rotation_y, 0.0);
        assert!(layout.paths.is_empty());
    }

    #[test]
    fn resting_objects_sit_on_the_support_footprint() {
        let g = scene_graph(&["SimpleTerrain", "Table", "Cup"], &[(1, OnTopOf, 0), (2, OnTopOfMiddle, 1)]).unwrap();
        for seed in 0..20 {
            let layout = place_objects(&g, &table_catalog(), false, false, &mut Pcg32::new(seed, 0)).unwrap();
            let table = layout.world_pose(1);
            let cup = layout.world_pose(2);
            assert_eq!(table.position[1], 0.0);
            assert!((cup.position[1] - 1.0).abs() < 1e-9);
            let local = table.localize(&cup).position;
            assert!(local[0].abs() <= 1.0 + 1e-9, "{local:?}");
            assert!(local[2].abs() <= 2.0 + 1e-9, "{local:?}");
        }
    }

    #[test]
    fn hierarchical_members_are_local_to_their_cluster() {
        let g = scene_graph(
            &["SimpleTerrain", "SimpleBoxGroup", "SimpleLargeBox", "SimpleSmallBox"],
            &[(1, OnTopOf, 0), (2, IsPartOf, 1), (3, OnTopOfMiddle, 2)],
        )
        .unwrap();
        let layout = place_objects(&g, &table_catalog(), true, false, &mut Pcg32::new(4, 0)).unwrap();
        let parents: Vec<Option<usize>> = layout.objects.iter().map(|o| o.parent_index).collect();
        assert_eq!(parents, vec![None, None, Some(1), Some(1)]);
        let large = layout.world_position(2);
        let small = layout.world_position(3);
        assert!((small[1] - (large[1] + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn intersection_paths_are_wired_to_the_intersection() {
        let g = scene_graph(
            &["SimpleTerrain", "Path/Intersection3", "Path/Half", "Path/Half", "Path/Half"],
            &[
                (1, OnTopOf, 0),
                (2, OnTopOf, 0),
                (3, OnTopOf, 0),
                (4, OnTopOf, 0),
                (2, PathConnectedTo, 1),
                (3, PathConnectedTo, 1),
                (4, PathConnectedTo, 1),
            ],
        )
        .unwrap();
        let layout = place_objects(&g, &NodeCatalog::builtin(), false, true, &mut Pcg32::new(2, 0)).unwrap();
        assert_eq!(layout.paths.len(), 4);
        assert_eq!(layout.paths[0].owner, Some(1));
        assert_eq!(layout.paths[0].parent_index, None);
        for path in &layout.paths[1..] {
            assert_eq!(path.parent_index, Some(0));
            assert_eq!(path.node_positions.len(), 3);
            let start = path.node_positions[0];
            assert!(norm(sub(start, layout.world_position(1))) < 1e-9);
        }
    }

    #[test]
    fn orphan_paths_attach_to_a_root() {
        let g = scene_graph(&["SimpleTerrain", "Path/Full", "Path/Half"], &[(1, OnTopOf, 0), (2, OnTopOf, 0)]).unwrap();
        let layout = place_objects(&g, &NodeCatalog::builtin(), false, true, &mut Pcg32::new(8, 0)).unwrap();
        assert_eq!(layout.paths.len(), 2);
        assert_eq!(layout.paths[0].node_positions.len(), 5);
        assert_eq!(layout.paths[0].parent_index, None);
        assert_eq!(layout.paths[1].parent_index, Some(0));
    }

    #[test]
    fn placement_is_deterministic_for_a_seed() {
        let g = scene_graph(&["SimpleTerrain", "Path/Full", "SimpleLargeBox"], &[(1, OnTopOf, 0), (2, OnTopOf, 0)]).unwrap();
        let a = place_objects(&g, &NodeCatalog::builtin(), true, true, &mut Pcg32::new(3, 1)).unwrap();
        let b = place_objects(&g, &NodeCatalog::builtin(), true, true, &mut Pcg32::new(3, 1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unclusterable_graphs_fail_only_in_hierarchical_mode() {
        let g = scene_graph(&["A", "B", "C"], &[(0, IsPartOf, 1), (0, IsPartOf, 2)]).unwrap();
        let catalog = NodeCatalog::builtin();
        assert!(place_objects(&g, &catalog, true, false, &mut Pcg32::new(1, 0)).is_err());
        assert!(place_objects(&g, &catalog, false, false, &mut Pcg32::new(1, 0)).is_ok());
    }
}
