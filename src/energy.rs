//! Layout energy: the interface the sampler consumes and a reference
//! implementation built from catalog footprints.
//!
//! Energy is a negative log-likelihood. Each relationship, collision and
//! path constraint contributes a log factor in the style of Yeh et al.
//! (2012); the energy is the negated sum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{NodeCatalog, PathTraits};
use crate::collision::{penetration_depth, segment_penetration, WorldBox};
use crate::layout::{dot, forward, norm, normalize, rotate_y, sub, Layout, Pose, Vec3};
use crate::relationship::Relationship;
use crate::scene::SceneGraph;

/// A layout the energy cannot score; the sampler treats it as `+∞`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid layout: {reason}")]
pub struct InvalidLayout {
    pub reason: String,
}

impl InvalidLayout {
    pub fn new(reason: impl Into<String>) -> Self {
        InvalidLayout { reason: reason.into() }
    }
}

/// Objects and paths an evaluation considers. Relationships count only when
/// both endpoints are in scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvaluationScope {
    objects: Vec<usize>,
    paths: Vec<usize>,
}

impl EvaluationScope {
    pub fn new(mut objects: Vec<usize>, mut paths: Vec<usize>) -> Self {
        objects.sort_unstable();
        objects.dedup();
        paths.sort_unstable();
        paths.dedup();
        EvaluationScope { objects, paths }
    }

    /// Every object and path of `layout`.
    pub fn full(layout: &Layout) -> Self {
        EvaluationScope {
            objects: (0..layout.objects.len()).collect(),
            paths: (0..layout.paths.len()).collect(),
        }
    }

    pub fn objects(&self) -> &[usize] {
        &self.objects
    }

    pub fn paths(&self) -> &[usize] {
        &self.paths
    }

    pub fn contains_object(&self, index: usize) -> bool {
        self.objects.binary_search(&index).is_ok()
    }
}

pub trait Energy: Sync {
    /// Must be deterministic for a given layout and scope.
    fn evaluate(&self, layout: &Layout, scope: &EvaluationScope) -> Result<f64, InvalidLayout>;
}

impl<F> Energy for F
where
    F: Fn(&Layout, &EvaluationScope) -> Result<f64, InvalidLayout> + Sync,
{
    fn evaluate(&self, layout: &Layout, scope: &EvaluationScope) -> Result<f64, InvalidLayout> {
        self(layout, scope)
    }
}

// -- Factors --------------------------------------------------------

const EQUALS_VARIANCE: f64 = 0.1;
const SIGMOID_STEEPNESS: f64 = 3.0;

/// `ln(N(d; 0, σ²) / N(0; 0, σ²))`: 0 at `d = 0`, falling quadratically.
pub fn factor_equals(difference: f64) -> f64 {
    -(difference * difference) / (2.0 * EQUALS_VARIANCE)
}

/// `ln σ(h (x - y))`, close to 0 when `x` clearly exceeds `y`.
pub fn factor_greater(x: f64, y: f64) -> f64 {
    let z = -SIGMOID_STEEPNESS * (x - y);
    // -ln(1 + e^z) without overflow
    if z > 0.0 {
        -(z + (-z).exp().ln_1p())
    } else {
        -z.exp().ln_1p()
    }
}

pub fn factor_less(x: f64, y: f64) -> f64 {
    factor_greater(y, x)
}

pub fn factor_range(x: f64, min: f64, max: f64) -> f64 {
    factor_greater(x, min) + factor_less(x, max)
}

fn angle_between(a: Vec3, b: Vec3) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}

pub fn factor_same_direction(a: Vec3, b: Vec3) -> f64 {
    2.0 * factor_equals(angle_between(a, b))
}

pub fn factor_orthogonal(a: Vec3, b: Vec3) -> f64 {
    2.0 * factor_equals(angle_between(a, b) - std::f64::consts::FRAC_PI_2)
}

// -- Reference energy ----------------------------------------------

fn default_collision_power() -> f64 {
    6.0
}

fn default_next_to_distance() -> f64 {
    2.0
}

fn default_footprint_margin() -> f64 {
    1.1
}

fn default_flat_height() -> f64 {
    0.01
}

fn default_intersection_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyParams {
    #[serde(default = "default_collision_power")]
    pub collision_power: f64,
    /// Gap below which two objects count as next to each other.
    #[serde(default = "default_next_to_distance")]
    pub next_to_distance: f64,
    /// Resting objects are pulled inside the support footprint shrunk by
    /// this factor.
    #[serde(default = "default_footprint_margin")]
    pub footprint_margin: f64,
    /// Objects with a half height at or below this never collide with paths.
    #[serde(default = "default_flat_height")]
    pub flat_height: f64,
    /// Scale of the penalty on paths leaving an intersection too close
    /// together; 0 disables it.
    #[serde(default = "default_intersection_weight")]
    pub intersection_weight: f64,
}

impl Default for EnergyParams {
    fn default() -> Self {
        EnergyParams {
            collision_power: default_collision_power(),
            next_to_distance: default_next_to_distance(),
            footprint_margin: default_footprint_margin(),
            flat_height: default_flat_height(),
            intersection_weight: default_intersection_weight(),
        }
    }
}

/// Negated log factors of one evaluation, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyComponents {
    pub total: f64,
    pub collision: f64,
    pub path_collision: f64,
    pub paths: f64,
    #[serde(default)]
    pub intersections: f64,
    pub relationships: f64,
}

#[derive(Debug, Clone, Copy)]
struct Body {
    pose: Pose,
    world_box: WorldBox,
    collider: bool,
}

pub struct SceneEnergy<'a> {
    graph: &'a SceneGraph,
    catalog: &'a NodeCatalog,
    params: EnergyParams,
}

impl<'a> SceneEnergy<'a> {
    pub fn new(graph: &'a SceneGraph, catalog: &'a NodeCatalog, params: EnergyParams) -> Self {
        SceneEnergy { graph, catalog, params }
    }

    fn body(&self, layout: &Layout, index: usize) -> Body {
        let pose = layout.world_pose(index);
        let traits = self.catalog.get(&layout.objects[index].node_type);
        let extents = traits.extents();
        Body {
            pose,
            world_box: WorldBox {
                center_x: pose.position[0],
                center_z: pose.position[2],
                half_w: extents[0],
                half_d: extents[2],
                rot_rad: pose.yaw_deg.to_radians(),
                bottom: pose.position[1],
                top: pose.position[1] + 2.0 * extents[1],
            },
            collider: traits.half_extents.is_some(),
        }
    }

    pub fn components(&self, layout: &Layout, scope: &EvaluationScope) -> Result<EnergyComponents, InvalidLayout> {
        if layout.objects.len() != self.graph.node_count() {
            return Err(InvalidLayout::new(format!(
                "layout has {} objects for {} graph nodes",
                layout.objects.len(),
                self.graph.node_count()
            )));
        }
        let bodies: Vec<Option<Body>> = (0..layout.objects.len())
            .map(|i| scope.contains_object(i).then(|| self.body(layout, i)))
            .collect();

        let collision = self.collision_factor(&bodies);
        let path_collision = self.path_collision_factor(layout, scope, &bodies);
        let paths = self.path_factor(layout, scope);
        let intersections = self.intersection_factor(layout, scope);
        let relationships = self.relationship_factor(layout, &bodies)?;

        let components = EnergyComponents {
            total: -(collision + path_collision + paths + intersections + relationships),
            collision: -collision,
            path_collision: -path_collision,
            paths: -paths,
            intersections: -intersections,
            relationships: -relationships,
        };
        if !components.total.is_finite() {
            return Err(InvalidLayout::new(format!("non-finite energy {components:?}")));
        }
        Ok(components)
    }

    fn collision_factor(&self, bodies: &[Option<Body>]) -> f64 {
        let power = self.params.collision_power;
        let colliders: Vec<&Body> = bodies.iter().flatten().filter(|b| b.collider).collect();
        let mut factor = 0.0;
        for (i, a) in colliders.iter().enumerate() {
            for b in &colliders[i + 1..] {
                let depth = penetration_depth(&a.world_box, &b.world_box);
                if depth > 0.0 {
                    let (ea, eb) = (&a.world_box, &b.world_box);
                    let combined = norm([
                        ea.half_w + eb.half_w,
                        (ea.top - ea.bottom + eb.top - eb.bottom) / 2.0,
                        ea.half_d + eb.half_d,
                    ]);
                    factor += (1.0 - depth / combined).abs().powf(power).ln();
                }
            }
        }
        factor
    }

    fn path_collision_factor(&self, layout: &Layout, scope: &EvaluationScope, bodies: &[Option<Body>]) -> f64 {
        let power = self.params.collision_power;
        let mut factor = 0.0;
        for (index, body) in bodies.iter().enumerate() {
            let Some(body) = body else { continue };
            let half_height = (body.world_box.top - body.world_box.bottom) / 2.0;
            if !body.collider || half_height <= self.params.flat_height {
                continue;
            }
            let corners = body.world_box.corners();
            for &p in scope.paths() {
                let path = &layout.paths[p];
                let Some(traits) = self.path_traits(path.owner) else {
                    continue;
                };
                if path.owner == Some(index) && traits.ignore_owner_collider {
                    continue;
                }
                let radius = traits.width / 2.0;
                let depth = layout
                    .path_positions_with_parent(p)
                    .windows(2)
                    .map(|w| segment_penetration((w[0][0], w[0][2]), (w[1][0], w[1][2]), radius, &corners))
                    .fold(0.0, f64::max);
                if depth > 0.0 {
                    factor += (1.0 - depth / radius).abs().powf(power).ln();
                }
            }
        }
        factor
    }

    fn path_traits(&self, owner: Option<usize>) -> Option<&PathTraits> {
        let node = owner?;
        self.catalog.get(self.graph.nodes().get(node)?).path.as_ref()
    }

    fn path_factor(&self, layout: &Layout, scope: &EvaluationScope) -> f64 {
        let mut factor = 0.0;
        for &p in scope.paths() {
            let Some(traits) = self.path_traits(layout.paths[p].owner) else {
                continue;
            };
            let limit = traits.angle_limit_deg.to_radians();
            factor += layout
                .path_turning_angles(p)
                .iter()
                .map(|a| factor_less(a.abs(), limit))
                .sum::<f64>();
            factor += factor_less(layout.path_length(p), traits.length_limit);
        }
        factor
    }

    /// Paths hanging off an intersection should leave it spread out: each
    /// gap between neighbouring departure headings should exceed the
    /// intersection's angle limit.
    fn intersection_factor(&self, layout: &Layout, scope: &EvaluationScope) -> f64 {
        if self.params.intersection_weight == 0.0 {
            return 0.0;
        }
        let mut factor = 0.0;
        for &p in scope.paths() {
            let Some(traits) = self.path_traits(layout.paths[p].owner).filter(|t| t.is_intersection) else {
                continue;
            };
            let mut headings: Vec<f64> = scope
                .paths()
                .iter()
                .filter(|&&c| c != p && layout.paths[c].parent_index == Some(p))
                .filter_map(|&c| layout.path_departure(c))
                .filter(|d| d[0] != 0.0 || d[2] != 0.0)
                .map(|d| d[2].atan2(d[0]))
                .collect();
            if headings.len() < 2 {
                continue;
            }
            headings.sort_by(f64::total_cmp);
            let limit = traits.angle_limit_deg.to_radians();
            for (i, &heading) in headings.iter().enumerate() {
                let next = headings[(i + 1) % headings.len()];
                factor += factor_greater(heading_gap(heading, next), limit);
            }
        }
        self.params.intersection_weight * factor
    }

    fn relationship_factor(&self, layout: &Layout, bodies: &[Option<Body>]) -> Result<f64, InvalidLayout> {
        let mut factor = 0.0;
        for edge in self.graph.edges() {
            let (Some(Some(a)), Some(Some(b))) = (bodies.get(edge.from), bodies.get(edge.to)) else {
                continue;
            };
            let value = self.relationship(layout, edge.relation, a, b, edge.to);
            if !value.is_finite() {
                return Err(InvalidLayout::new(format!(
                    "{} {} {} is not finite",
                    edge.from, edge.relation, edge.to
                )));
            }
            factor += value;
        }
        Ok(factor)
    }

    fn relationship(&self, layout: &Layout, relation: Relationship, a: &Body, b: &Body, b_index: usize) -> f64 {
        use Relationship::*;
        let towards = |direction: Vec3| {
            let b_to_a = normalize(sub(a.pose.position, b.pose.position));
            factor_same_direction(direction, b_to_a) + self.next_to(layout, a, b, b_index)
        };
        match relation {
            OnTopOf | IsPartOf => self.on_top_of(a, b),
            OnTopOfMiddle | IsPartOfMiddle => {
                let horizontal = ((a.pose.position[0] - b.pose.position[0]).powi(2)
                    + (a.pose.position[2] - b.pose.position[2]).powi(2))
                .sqrt();
                factor_equals(a.world_box.bottom - b.world_box.top) + factor_equals(horizontal)
            }
            OnTopOfEdge | IsPartOfEdge => self.on_edge(a, b, false),
            OnTopOfFrontEdge | IsPartOfFrontEdge => self.on_edge(a, b, true),
            NextTo | NextToChooseDirection => self.next_to(layout, a, b, b_index),
            NextToNorth => towards([0.0, 0.0, 1.0]),
            NextToSouth => towards([0.0, 0.0, -1.0]),
            NextToEast => towards([1.0, 0.0, 0.0]),
            NextToWest => towards([-1.0, 0.0, 0.0]),
            NextToLeft => towards(rotate_y([-1.0, 0.0, 0.0], b.pose.yaw_deg)),
            NextToRight => towards(rotate_y([1.0, 0.0, 0.0], b.pose.yaw_deg)),
            NextToFront => towards(forward(b.pose.yaw_deg)),
            NextToBehind => towards(rotate_y([0.0, 0.0, -1.0], b.pose.yaw_deg)),
            NextToChooseSide => {
                let b_to_a = normalize(sub(a.pose.position, b.pose.position));
                let left = factor_same_direction(rotate_y([-1.0, 0.0, 0.0], b.pose.yaw_deg), b_to_a);
                let right = factor_same_direction(rotate_y([1.0, 0.0, 0.0], b.pose.yaw_deg), b_to_a);
                left.max(right) + self.next_to(layout, a, b, b_index)
            }
            FacingTowards | ImplicitFacingTowards => {
                let a_to_b = normalize(sub(b.pose.position, a.pose.position));
                factor_same_direction(forward(a.pose.yaw_deg), a_to_b)
            }
            FacingSameDirection | ImplicitFacingSameDirection => {
                factor_same_direction(forward(a.pose.yaw_deg), forward(b.pose.yaw_deg))
            }
            FacingOrthogonalDirection | ImplicitFacingOrthogonalDirection => {
                factor_orthogonal(forward(a.pose.yaw_deg), forward(b.pose.yaw_deg))
            }
            FacingAwayFrom | ImplicitFacingAwayFrom => {
                let a_to_b = normalize(sub(b.pose.position, a.pose.position));
                factor_range(dot(forward(a.pose.yaw_deg), a_to_b), -1.0, 0.0)
            }
            PathConnectedTo => 0.0,
        }
    }

    fn on_top_of(&self, a: &Body, b: &Body) -> f64 {
        let mut factor = factor_equals(a.pose.position[1] - b.world_box.top);
        if b.collider {
            let margin = self.params.footprint_margin;
            let (lx, lz) = b.world_box.to_local(a.pose.position[0], a.pose.position[2]);
            let (hw, hd) = (b.world_box.half_w / margin, b.world_box.half_d / margin);
            factor += factor_range(lx, -hw, hw) + factor_range(lz, -hd, hd);
        }
        factor
    }

    fn on_edge(&self, a: &Body, b: &Body, front_only: bool) -> f64 {
        let (ax, ay, az) = (a.pose.position[0], a.pose.position[1], a.pose.position[2]);
        let (cx, cz) = b.world_box.closest_point(ax, az);
        let cy = ay.clamp(b.world_box.bottom, b.world_box.top);
        let (lx, lz) = b.world_box.to_local(cx, cz);
        let edge_offset = if front_only {
            (lz - b.world_box.half_d).abs()
        } else {
            (lx.abs() - b.world_box.half_w)
                .abs()
                .min((lz.abs() - b.world_box.half_d).abs())
        };
        let distance = norm([ax - cx, ay - cy, az - cz]);
        factor_equals(edge_offset + distance) + factor_equals(a.world_box.bottom - b.world_box.top)
    }

    fn next_to(&self, layout: &Layout, a: &Body, b: &Body, b_index: usize) -> f64 {
        let limit = self.params.next_to_distance;
        let owned_path = layout
            .paths
            .iter()
            .position(|p| p.owner == Some(b_index))
            .filter(|_| !b.collider);
        if let Some(path) = owned_path {
            let width = self.path_traits(Some(b_index)).map_or(0.0, |t| t.width);
            let centre = box_centre(&a.world_box);
            let on_path = layout.closest_point_on_path(path, centre);
            let on_a = closest_point_3d(&a.world_box, on_path);
            return factor_less(norm(sub(on_path, on_a)) - width / 2.0, limit);
        }
        let on_a = closest_point_3d(&a.world_box, box_centre(&b.world_box));
        let on_b = closest_point_3d(&b.world_box, on_a);
        factor_less(norm(sub(on_b, on_a)), limit)
    }
}

/// Unsigned angle between two headings, in `[0, π]`.
fn heading_gap(a: f64, b: f64) -> f64 {
    let d = (b - a).rem_euclid(std::f64::consts::TAU);
    d.min(std::f64::consts::TAU - d)
}

fn box_centre(world_box: &WorldBox) -> Vec3 {
    [
        world_box.center_x,
        (world_box.bottom + world_box.top) / 2.0,
        world_box.center_z,
    ]
}

fn closest_point_3d(world_box: &WorldBox, point: Vec3) -> Vec3 {
    let (x, z) = world_box.closest_point(point[0], point[2]);
    [x, point[1].clamp(world_box.bottom, world_box.top), z]
}

impl Energy for SceneEnergy<'_> {
    fn evaluate(&self, layout: &Layout, scope: &EvaluationScope) -> Result<f64, InvalidLayout> {
        self.components(layout, scope).map(|c| c.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeTraits;
    use crate::layout::{ObjectPlacement, PathPlacement};
    use crate::scene::scene_graph;
    use Relationship::*;

    fn object(node_type: &str, index: usize, position: Vec3, yaw: f64) -> ObjectPlacement {
        ObjectPlacement {
            node_type: node_type.into(),
            node_index: index,
            parent_index: None,
            position,
            rotation_y: yaw,
        }
    }

    fn catalog() -> NodeCatalog {
        let mut catalog = NodeCatalog::builtin();
        catalog.insert(
            "Crate",
            NodeTraits {
                half_extents: Some([1.0, 1.0, 1.0]),
                ..NodeTraits::default()
            },
        );
        catalog
    }

    // -- Factors --------------------------------------------------------

    #[test]
    fn factor_shapes() {
        assert_eq!(factor_equals(0.0), 0.0);
        assert!((factor_equals(1.0) + 5.0).abs() < 1e-12);
        assert!((factor_greater(0.0, 0.0) - 0.5f64.ln()).abs() < 1e-12);
        assert!(factor_greater(10.0, 0.0) > -1e-9);
        assert!(factor_greater(-1000.0, 0.0).is_finite());
        assert_eq!(factor_less(1.0, 2.0), factor_greater(2.0, 1.0));
        assert!(factor_range(0.5, 0.0, 1.0) > factor_range(3.0, 0.0, 1.0));
        assert!(factor_same_direction([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]).abs() < 1e-6);
        assert!(factor_orthogonal([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]).abs() < 1e-12);
        assert!(factor_same_direction([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]) < -50.0);
    }

    #[test]
    fn closures_implement_energy() {
        let constant = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> { Ok(3.0) };
        let layout = Layout::default();
        assert_eq!(constant.evaluate(&layout, &EvaluationScope::full(&layout)), Ok(3.0));
    }

    // -- Reference energy -------------------------------------------

    #[test]
    fn separated_objects_have_finite_energy() {
        let g = scene_graph(&["SimpleTerrain", "Crate", "Crate"], &[(1, OnTopOf, 0), (2, OnTopOf, 0)]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let layout = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Crate", 1, [-5.0, 0.0, 0.0], 0.0),
                object("Crate", 2, [5.0, 0.0, 0.0], 30.0),
            ],
            paths: vec![],
        };
        let c = energy.components(&layout, &EvaluationScope::full(&layout)).unwrap();
        assert_eq!(c.collision, 0.0);
        assert!(c.total.is_finite());
        assert!(c.relationships < 0.1, "{c:?}");
    }

    #[test]
    fn overlap_raises_energy() {
        let g = scene_graph(&["SimpleTerrain", "Crate", "Crate"], &[]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let apart = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Crate", 1, [0.0, 0.0, 0.0], 0.0),
                object("Crate", 2, [5.0, 0.0, 0.0], 0.0),
            ],
            paths: vec![],
        };
        let mut overlapping = apart.clone();
        overlapping.objects[2].position = [1.0, 0.0, 0.0];
        let scope = EvaluationScope::full(&apart);
        let e_apart = energy.evaluate(&apart, &scope).unwrap();
        let e_overlap = energy.evaluate(&overlapping, &scope).unwrap();
        assert!(e_overlap > e_apart + 1.0, "{e_overlap} vs {e_apart}");
    }

    #[test]
    fn stacking_is_rewarded() {
        let g = scene_graph(&["SimpleTerrain", "Crate", "Crate"], &[(2, OnTopOfMiddle, 1)]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let stacked = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Crate", 1, [0.0, 0.0, 0.0], 0.0),
                object("Crate", 2, [0.0, 2.0, 0.0], 0.0),
            ],
            paths: vec![],
        };
        let mut beside = stacked.clone();
        beside.objects[2].position = [3.0, 0.0, 0.0];
        let scope = EvaluationScope::full(&stacked);
        assert!(energy.evaluate(&stacked, &scope).unwrap().abs() < 1e-9);
        assert!(energy.evaluate(&beside, &scope).unwrap() > 10.0);
    }

    #[test]
    fn scope_limits_relationships() {
        let g = scene_graph(&["SimpleTerrain", "Crate", "Crate"], &[(2, OnTopOfMiddle, 1)]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let layout = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Crate", 1, [0.0, 0.0, 0.0], 0.0),
                object("Crate", 2, [9.0, 0.0, 0.0], 0.0),
            ],
            paths: vec![],
        };
        let partial = EvaluationScope::new(vec![0, 1], vec![]);
        assert_eq!(energy.evaluate(&layout, &partial), Ok(0.0));
    }

    #[test]
    fn next_to_a_path_uses_path_distance() {
        let g = scene_graph(&["SimpleTerrain", "Path/Full", "Crate"], &[(2, NextTo, 1)]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let road = PathPlacement {
            node_positions: vec![[-10.0, 0.0, 0.0], [10.0, 0.0, 0.0]],
            parent_index: None,
            owner: Some(1),
        };
        let near = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Path/Full", 1, [0.0; 3], 0.0),
                object("Crate", 2, [0.0, 0.0, 2.5], 0.0),
            ],
            paths: vec![road],
        };
        let mut far = near.clone();
        far.objects[2].position = [0.0, 0.0, 12.0];
        let scope = EvaluationScope::full(&near);
        let near_c = energy.components(&near, &scope).unwrap();
        let far_c = energy.components(&far, &scope).unwrap();
        assert!(near_c.relationships < far_c.relationships);
        assert_eq!(near_c.path_collision, 0.0);

        let mut crossing = near.clone();
        crossing.objects[2].position = [0.0, 0.0, 0.3];
        let crossing_c = energy.components(&crossing, &scope).unwrap();
        assert!(crossing_c.path_collision > 0.0);
    }

    fn crossing(second_heading_deg: f64) -> Layout {
        let (sin, cos) = second_heading_deg.to_radians().sin_cos();
        let leg = |owner: usize, dir: (f64, f64)| PathPlacement {
            node_positions: vec![[5.0 * dir.0, 0.0, 5.0 * dir.1], [10.0 * dir.0, 0.0, 10.0 * dir.1]],
            parent_index: Some(0),
            owner: Some(owner),
        };
        Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Path/Intersection4", 1, [0.0; 3], 0.0),
                object("Path/Half", 2, [0.0; 3], 0.0),
                object("Path/Half", 3, [0.0; 3], 0.0),
            ],
            paths: vec![
                PathPlacement {
                    node_positions: vec![[0.0; 3]],
                    parent_index: None,
                    owner: Some(1),
                },
                leg(2, (1.0, 0.0)),
                leg(3, (cos, sin)),
            ],
        }
    }

    #[test]
    fn right_angle_crossing_beats_acute_one() {
        let g = scene_graph(
            &["SimpleTerrain", "Path/Intersection4", "Path/Half", "Path/Half"],
            &[(2, PathConnectedTo, 1), (3, PathConnectedTo, 1)],
        )
        .unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let right = crossing(90.0);
        let acute = crossing(20.0);
        let scope = EvaluationScope::full(&right);
        let right_c = energy.components(&right, &scope).unwrap();
        let acute_c = energy.components(&acute, &scope).unwrap();
        assert!(right_c.intersections > 0.0);
        assert!(right_c.intersections < acute_c.intersections, "{right_c:?} vs {acute_c:?}");
        assert!(right_c.total < acute_c.total);
        // the legs are identical otherwise
        assert!((right_c.paths - acute_c.paths).abs() < 1e-9);

        let off = SceneEnergy::new(
            &g,
            &catalog,
            EnergyParams {
                intersection_weight: 0.0,
                ..EnergyParams::default()
            },
        );
        assert_eq!(off.components(&acute, &scope).unwrap().intersections, 0.0);
    }

    #[test]
    fn only_intersections_score_departure_angles() {
        let g = scene_graph(&["SimpleTerrain", "Path/Full", "Path/Half", "Path/Half"], &[]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let mut layout = crossing(20.0);
        layout.objects[1].node_type = "Path/Full".into();
        let c = energy.components(&layout, &EvaluationScope::full(&layout)).unwrap();
        assert_eq!(c.intersections, 0.0);
        assert!((heading_gap(0.1, std::f64::consts::TAU - 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn non_finite_positions_are_invalid() {
        let g = scene_graph(&["SimpleTerrain", "Crate"], &[(1, OnTopOf, 0)]).unwrap();
        let catalog = catalog();
        let energy = SceneEnergy::new(&g, &catalog, EnergyParams::default());
        let layout = Layout {
            objects: vec![
                object("SimpleTerrain", 0, [0.0; 3], 0.0),
                object("Crate", 1, [f64::NAN, 0.0, 0.0], 0.0),
            ],
            paths: vec![],
        };
        assert!(energy.evaluate(&layout, &EvaluationScope::full(&layout)).is_err());
        let short = Layout {
            objects: vec![object("SimpleTerrain", 0, [0.0; 3], 0.0)],
            paths: vec![],
        };
        assert!(energy.evaluate(&short, &EvaluationScope::full(&short)).is_err());
    }
}
