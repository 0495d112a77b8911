//! Proposal moves of the layout sampler.
//!
//! One move changes one object or one path of a copied layout. Which moves
//! exist is fixed when the chain is built, from the catalog traits of the
//! objects and paths the chain may touch.

use serde::{Deserialize, Serialize};

use crate::catalog::{NodeCatalog, PathTraits};
use crate::layout::{add, norm, normalize, scale, sub, Layout, Vec3};
use crate::prng::Pcg32;

fn default_position_step() -> Vec3 {
    [0.1, 0.1, 0.1]
}

fn default_angle_step_deg() -> f64 {
    1.0
}

fn default_reparent_probability() -> f64 {
    0.1
}

fn default_vertex_bound() -> f64 {
    30.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveParams {
    /// Standard deviation of position diffusion per axis. A zero vertical
    /// step also keeps heights fixed during swaps.
    #[serde(default = "default_position_step")]
    pub position_step: Vec3,
    #[serde(default = "default_angle_step_deg")]
    pub angle_step_deg: f64,
    #[serde(default = "default_reparent_probability")]
    pub reparent_probability: f64,
    /// Path vertices stay within `[-bound, bound]` on every axis.
    #[serde(default = "default_vertex_bound")]
    pub vertex_bound: f64,
}

impl Default for MoveParams {
    fn default() -> Self {
        MoveParams {
            position_step: default_position_step(),
            angle_step_deg: default_angle_step_deg(),
            reparent_probability: default_reparent_probability(),
            vertex_bound: default_vertex_bound(),
        }
    }
}

impl MoveParams {
    /// Same parameters with position and angle steps multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        MoveParams {
            position_step: scale(self.position_step, factor),
            angle_step_deg: self.angle_step_deg * factor,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    PositionDiffusion(usize),
    RotationDiffusion(usize),
    Swap(usize),
    PathVertexOrReparent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveSet {
    moves: Vec<Move>,
    swap_partners: Vec<usize>,
    paths: Vec<usize>,
    path_traits: Vec<PathTraits>,
}

impl MoveSet {
    /// Moves for `objects` and `paths` of `layout`, as allowed by `catalog`.
    pub fn new(layout: &Layout, catalog: &NodeCatalog, objects: &[usize], paths: &[usize]) -> Self {
        let mut moves = Vec::new();
        let mut swap_partners = Vec::new();
        for &i in objects {
            let traits = catalog.get(&layout.objects[i].node_type);
            if traits.allow_position_move {
                moves.push(Move::PositionDiffusion(i));
            }
            if traits.allow_rotation_move {
                moves.push(Move::RotationDiffusion(i));
            }
            if traits.allow_swap_move {
                moves.push(Move::Swap(i));
                swap_partners.push(i);
            }
        }
        moves.extend(paths.iter().map(|&p| Move::PathVertexOrReparent(p)));

        let path_traits = layout
            .paths
            .iter()
            .map(|p| {
                p.owner
                    .and_then(|o| layout.objects.get(o))
                    .and_then(|o| catalog.get(&o.node_type).path.clone())
                    .unwrap_or_default()
            })
            .collect();

        MoveSet {
            moves,
            swap_partners,
            paths: paths.to_vec(),
            path_traits,
        }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Applies a uniformly chosen move to `layout`. Draws nothing and
    /// returns `None` when the set is empty.
    pub fn propose(&self, layout: &mut Layout, params: &MoveParams, rng: &mut Pcg32) -> Option<Move> {
        if self.moves.is_empty() {
            return None;
        }
        let chosen = self.moves[rng.next_index(self.moves.len())];
        self.apply(chosen, layout, params, rng);
        Some(chosen)
    }

    pub fn apply(&self, chosen: Move, layout: &mut Layout, params: &MoveParams, rng: &mut Pcg32) {
        match chosen {
            Move::PositionDiffusion(i) => {
                let object = &mut layout.objects[i];
                for axis in 0..3 {
                    object.position[axis] = rng.next_gaussian(object.position[axis], params.position_step[axis]);
                }
            }
            Move::RotationDiffusion(i) => {
                let object = &mut layout.objects[i];
                object.rotation_y = rng.next_gaussian(object.rotation_y, params.angle_step_deg);
            }
            Move::Swap(i) => self.swap(i, layout, params, rng),
            Move::PathVertexOrReparent(p) => self.path_move(p, layout, params, rng),
        }
    }

    fn swap(&self, i: usize, layout: &mut Layout, params: &MoveParams, rng: &mut Pcg32) {
        let partners: Vec<usize> = self.swap_partners.iter().copied().filter(|&j| j != i).collect();
        if partners.is_empty() {
            return;
        }
        let j = partners[rng.next_index(partners.len())];
        let (mut pos_i, yaw_i) = (layout.objects[i].position, layout.objects[i].rotation_y);
        let (mut pos_j, yaw_j) = (layout.objects[j].position, layout.objects[j].rotation_y);
        if params.position_step[1] == 0.0 {
            std::mem::swap(&mut pos_i[1], &mut pos_j[1]);
        }
        layout.objects[i].position = pos_j;
        layout.objects[i].rotation_y = yaw_j;
        layout.objects[j].position = pos_i;
        layout.objects[j].rotation_y = yaw_i;
    }

    fn path_move(&self, p: usize, layout: &mut Layout, params: &MoveParams, rng: &mut Pcg32) {
        let default_traits = PathTraits::default();
        let traits = self.path_traits.get(p).unwrap_or(&default_traits);
        let parent = layout.paths[p].parent_index;
        let candidates: Vec<usize> = self
            .paths
            .iter()
            .copied()
            .filter(|&c| Some(c) != parent && layout.could_be_parent_path_index(c, p))
            .collect();

        let draw = rng.next_float();
        if draw < params.reparent_probability && !traits.is_root && parent.is_some() && !candidates.is_empty() {
            layout.paths[p].parent_index = Some(candidates[rng.next_index(candidates.len())]);
            return;
        }

        let vertices = &layout.paths[p].node_positions;
        if vertices.is_empty() {
            return;
        }
        let k = rng.next_index(vertices.len());
        let old = vertices[k];
        let bound = params.vertex_bound;
        let mut new = [0.0; 3];
        for axis in 0..3 {
            new[axis] = rng
                .next_gaussian(old[axis], params.position_step[axis])
                .clamp(-bound, bound);
        }

        let is_first = k == 0;
        let is_last = k + 1 == vertices.len();
        if !is_first && !is_last {
            let (prev, next) = (vertices[k - 1], vertices[k + 1]);
            let from_prev = norm(sub(old, prev));
            let from_next = norm(sub(old, next));
            let towards_next = normalize(sub(next, prev));
            // pull towards the midpoint of the neighbours
            if from_prev > from_next {
                let pull = rng.next_gaussian(0.0, params.position_step[0]).abs();
                new = add(new, scale(towards_next, -pull));
            } else if from_prev < from_next {
                let pull = rng.next_gaussian(0.0, params.position_step[0]).abs();
                new = add(new, scale(towards_next, pull));
            }
            new = new.map(|c| c.clamp(-bound, bound));
        } else {
            if (is_first && traits.fix_start_x) || (is_last && traits.fix_end_x) {
                new[0] = old[0];
            }
            if (is_first && traits.fix_start_z) || (is_last && traits.fix_end_z) {
                new[2] = old[2];
            }
        }
        layout.paths[p].node_positions[k] = new;
    }
}
