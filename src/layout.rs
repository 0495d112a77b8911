//! Concrete placement of a relationship graph.
//!
//! `objects[i]` belongs to graph node `i`. Object poses are local to their
//! parent object when `parent_index` is set; path vertices are always in
//! world coordinates.

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

pub type Vec3 = [f64; 3];

pub(crate) fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Unit vector along `a`, or zero for a zero-length input.
pub(crate) fn normalize(a: Vec3) -> Vec3 {
    let n = norm(a);
    if n > 0.0 {
        scale(a, 1.0 / n)
    } else {
        [0.0; 3]
    }
}

/// Rotates `v` about the vertical axis by `yaw_deg`.
pub(crate) fn rotate_y(v: Vec3, yaw_deg: f64) -> Vec3 {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    [v[0] * cos - v[2] * sin, v[1], v[0] * sin + v[2] * cos]
}

/// Unit forward direction of an object with the given yaw.
pub(crate) fn forward(yaw_deg: f64) -> Vec3 {
    rotate_y([0.0, 0.0, 1.0], yaw_deg)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_deg: f64,
}

impl Pose {
    /// `local` expressed in the frame this pose describes.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: add(self.position, rotate_y(local.position, self.yaw_deg)),
            yaw_deg: self.yaw_deg + local.yaw_deg,
        }
    }

    /// Inverse of [`Pose::compose`]: `world` expressed relative to this pose.
    pub fn localize(&self, world: &Pose) -> Pose {
        Pose {
            position: rotate_y(sub(world.position, self.position), -self.yaw_deg),
            yaw_deg: world.yaw_deg - self.yaw_deg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPlacement {
    pub node_type: String,
    #[serde(rename = "correspondsToNodeIndex")]
    pub node_index: usize,
    pub parent_index: Option<usize>,
    pub position: Vec3,
    pub rotation_y: f64,
}

impl ObjectPlacement {
    pub fn local_pose(&self) -> Pose {
        Pose {
            position: self.position,
            yaw_deg: self.rotation_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPlacement {
    pub node_positions: Vec<Vec3>,
    pub parent_index: Option<usize>,
    /// Object the path belongs to.
    #[serde(default)]
    pub owner: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub objects: Vec<ObjectPlacement>,
    pub paths: Vec<PathPlacement>,
}

impl Layout {
    /// World pose of object `index`, following its parent chain.
    pub fn world_pose(&self, index: usize) -> Pose {
        let mut chain = vec![index];
        let mut current = index;
        while let Some(parent) = self.objects[current].parent_index {
            if chain.contains(&parent) || chain.len() > self.objects.len() {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain.iter().rev().fold(
            Pose {
                position: [0.0; 3],
                yaw_deg: 0.0,
            },
            |frame, &i| frame.compose(&self.objects[i].local_pose()),
        )
    }

    pub fn world_position(&self, index: usize) -> Vec3 {
        self.world_pose(index).position
    }

    /// Moves object `index` so that its world pose becomes `world`.
    pub fn set_world_pose(&mut self, index: usize, world: Pose) {
        let local = match self.objects[index].parent_index {
            Some(parent) => self.world_pose(parent).localize(&world),
            None => world,
        };
        self.objects[index].position = local.position;
        self.objects[index].rotation_y = local.yaw_deg;
    }

    /// Checks that this layout can place `nodes`: one object per node in
    /// node order, and parent links that stay in range and form forests.
    pub fn check_against(&self, nodes: &[String]) -> Result<(), LayoutError> {
        let count = self.objects.len();
        if count != nodes.len() {
            return Err(LayoutError::ObjectCount {
                objects: count,
                nodes: nodes.len(),
            });
        }
        for (i, object) in self.objects.iter().enumerate() {
            if object.node_index != i {
                return Err(LayoutError::NodeIndex {
                    object: i,
                    node_index: object.node_index,
                });
            }
            if object.node_type != nodes[i] {
                return Err(LayoutError::NodeType {
                    object: i,
                    expected: nodes[i].clone(),
                    found: object.node_type.clone(),
                });
            }
            if let Some(parent) = object.parent_index.filter(|&p| p >= count) {
                return Err(LayoutError::ParentOutOfRange { object: i, parent, count });
            }
        }
        if let Some(object) = first_cycle(self.objects.iter().map(|o| o.parent_index)) {
            return Err(LayoutError::ParentCycle { object });
        }

        let path_count = self.paths.len();
        for (i, path) in self.paths.iter().enumerate() {
            if let Some(parent) = path.parent_index.filter(|&p| p >= path_count) {
                return Err(LayoutError::PathParentOutOfRange {
                    path: i,
                    parent,
                    count: path_count,
                });
            }
            if let Some(owner) = path.owner.filter(|&o| o >= count) {
                return Err(LayoutError::PathOwnerOutOfRange { path: i, owner, count });
            }
        }
        if let Some(path) = first_cycle(self.paths.iter().map(|p| p.parent_index)) {
            return Err(LayoutError::PathParentCycle { path });
        }
        Ok(())
    }

    /// Whether path `candidate` may become the parent of path `child`
    /// without closing a cycle.
    pub fn could_be_parent_path_index(&self, candidate: usize, child: usize) -> bool {
        let mut current = candidate;
        for _ in 0..=self.paths.len() {
            if current == child {
                return false;
            }
            match self.paths[current].parent_index {
                Some(parent) => current = parent,
                None => return true,
            }
        }
        // the chain above `candidate` already loops
        false
    }

    /// Closest point on the polyline of path `index` to `point`.
    pub fn closest_point_on_path(&self, index: usize, point: Vec3) -> Vec3 {
        let vertices = &self.paths[index].node_positions;
        let Some(&first) = vertices.first() else {
            return point;
        };
        let mut best = first;
        let mut best_distance = norm(sub(first, point));
        for pair in vertices.windows(2) {
            let candidate = closest_point_on_segment(pair[0], pair[1], point);
            let distance = norm(sub(candidate, point));
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    /// Polyline of path `index`, prefixed with the point where it attaches
    /// to its parent path.
    pub fn path_positions_with_parent(&self, index: usize) -> Vec<Vec3> {
        let path = &self.paths[index];
        let mut out = Vec::with_capacity(path.node_positions.len() + 1);
        if let (Some(parent), Some(&first)) = (path.parent_index, path.node_positions.first()) {
            if parent != index {
                out.push(self.closest_point_on_path(parent, first));
            }
        }
        out.extend_from_slice(&path.node_positions);
        out
    }

    pub fn path_length(&self, index: usize) -> f64 {
        self.path_positions_with_parent(index)
            .windows(2)
            .map(|w| norm(sub(w[1], w[0])))
            .sum()
    }

    /// Turning angle in radians at every interior vertex, measured in the
    /// ground plane; 0 for a straight continuation.
    pub fn path_turning_angles(&self, index: usize) -> Vec<f64> {
        self.path_positions_with_parent(index)
            .windows(3)
            .map(|w| {
                let incoming = [w[1][0] - w[0][0], 0.0, w[1][2] - w[0][2]];
                let outgoing = [w[2][0] - w[1][0], 0.0, w[2][2] - w[1][2]];
                let (a, b) = (norm(incoming), norm(outgoing));
                if a == 0.0 || b == 0.0 {
                    0.0
                } else {
                    (dot(incoming, outgoing) / (a * b)).clamp(-1.0, 1.0).acos()
                }
            })
            .collect()
    }

    /// Direction in which path `index` leaves its parent, if it has one.
    pub fn path_departure(&self, index: usize) -> Option<Vec3> {
        let points = self.path_positions_with_parent(index);
        if points.len() < 2 {
            return None;
        }
        Some(normalize(sub(points[1], points[0])))
    }
}

/// First index whose in-range parent chain returns to itself.
fn first_cycle(parents: impl Iterator<Item = Option<usize>>) -> Option<usize> {
    let parents: Vec<Option<usize>> = parents.collect();
    (0..parents.len()).find(|&start| {
        let mut current = start;
        for _ in 0..parents.len() {
            match parents[current] {
                Some(parent) if parent == start => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    })
}

fn closest_point_on_segment(from: Vec3, to: Vec3, point: Vec3) -> Vec3 {
    let direction = sub(to, from);
    let length_sq = dot(direction, direction);
    if length_sq == 0.0 {
        return from;
    }
    let t = (dot(sub(point, from), direction) / length_sq).clamp(0.0, 1.0);
    add(from, scale(direction, t))
}
