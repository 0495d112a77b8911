//! Oriented box overlap, penetration depth and distances.
//!
//! Footprints are rotated rectangles in the ground (x, z) plane, tested
//! with the Separating Axis Theorem; boxes add a vertical interval.

pub type Corners = [(f64, f64); 4];

pub fn obb_corners(cx: f64, cz: f64, half_w: f64, half_d: f64, rot_rad: f64) -> Corners {
    let cos_r = rot_rad.cos();
    let sin_r = rot_rad.sin();
    const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mut corners = [(0.0, 0.0); 4];
    for (i, &(sx, sz)) in SIGNS.iter().enumerate() {
        let lx = sx * half_w;
        let lz = sz * half_d;
        corners[i] = (cx + lx * cos_r - lz * sin_r, cz + lx * sin_r + lz * cos_r);
    }
    corners
}

fn project(corners: &Corners, ax: f64, az: f64) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(cx, cz) in corners {
        let dot = cx * ax + cz * az;
        if dot < lo {
            lo = dot;
        }
        if dot > hi {
            hi = dot;
        }
    }
    (lo, hi)
}

/// Unit edge normals of both rectangles; two per rectangle suffice since
/// opposite edges are parallel.
fn separating_axes(a: &Corners, b: &Corners) -> impl Iterator<Item = (f64, f64)> {
    let mut axes = Vec::with_capacity(4);
    for corners in [a, b] {
        for i in 0..2 {
            let j = (i + 1) % 4;
            let ex = corners[j].0 - corners[i].0;
            let ez = corners[j].1 - corners[i].1;
            let len = (ex * ex + ez * ez).sqrt();
            if len > 0.0 {
                axes.push((-ez / len, ex / len));
            }
        }
    }
    axes.into_iter()
}

/// Smallest push along any separating axis that pulls the footprints
/// apart; 0 when they do not overlap.
pub fn footprint_penetration(a: &Corners, b: &Corners) -> f64 {
    let mut depth = f64::INFINITY;
    for (ax, az) in separating_axes(a, b) {
        let (min_a, max_a) = project(a, ax, az);
        let (min_b, max_b) = project(b, ax, az);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return 0.0;
        }
        depth = depth.min(overlap);
    }
    if depth.is_finite() {
        depth
    } else {
        // degenerate rectangles have no axes and no area
        0.0
    }
}

/// An oriented box standing on the ground plane at `bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBox {
    pub center_x: f64,
    pub center_z: f64,
    pub half_w: f64,
    pub half_d: f64,
    pub rot_rad: f64,
    pub bottom: f64,
    pub top: f64,
}

impl WorldBox {
    pub fn corners(&self) -> Corners {
        obb_corners(self.center_x, self.center_z, self.half_w, self.half_d, self.rot_rad)
    }

    /// Position of `(x, z)` in the box frame, relative to its centre.
    pub fn to_local(&self, x: f64, z: f64) -> (f64, f64) {
        let (sin, cos) = self.rot_rad.sin_cos();
        let (dx, dz) = (x - self.center_x, z - self.center_z);
        (dx * cos + dz * sin, -dx * sin + dz * cos)
    }

    /// Closest footprint point to `(x, z)`, in world coordinates.
    pub fn closest_point(&self, x: f64, z: f64) -> (f64, f64) {
        let (lx, lz) = self.to_local(x, z);
        let cx = lx.clamp(-self.half_w, self.half_w);
        let cz = lz.clamp(-self.half_d, self.half_d);
        let (sin, cos) = self.rot_rad.sin_cos();
        (
            self.center_x + cx * cos - cz * sin,
            self.center_z + cx * sin + cz * cos,
        )
    }
}

/// Penetration depth of two boxes: the footprint penetration, limited by
/// how far their vertical intervals overlap.
pub fn penetration_depth(a: &WorldBox, b: &WorldBox) -> f64 {
    let vertical = a.top.min(b.top) - a.bottom.max(b.bottom);
    if vertical <= 0.0 {
        return 0.0;
    }
    footprint_penetration(&a.corners(), &b.corners()).min(vertical)
}

/// Penetration depth of a footprint into the ground-plane capsule of
/// `radius` around segment `a`-`b`; 0 when they are apart.
pub fn segment_penetration(a: (f64, f64), b: (f64, f64), radius: f64, corners: &Corners) -> f64 {
    let (dx, dz) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dz * dz).sqrt();
    let mut axes: Vec<(f64, f64)> = separating_axes(corners, corners).take(2).collect();
    if len > 0.0 {
        axes.push((dx / len, dz / len));
        axes.push((-dz / len, dx / len));
    } else {
        let (cx, cz) = corners
            .iter()
            .fold((0.0, 0.0), |acc, c| (acc.0 + c.0 / 4.0, acc.1 + c.1 / 4.0));
        let (ox, oz) = (cx - a.0, cz - a.1);
        let d = (ox * ox + oz * oz).sqrt();
        if d > 0.0 {
            axes.push((ox / d, oz / d));
        }
    }

    let mut depth = f64::INFINITY;
    for (ax, az) in axes {
        let (min_box, max_box) = project(corners, ax, az);
        let pa = a.0 * ax + a.1 * az;
        let pb = b.0 * ax + b.1 * az;
        let (min_seg, max_seg) = (pa.min(pb) - radius, pa.max(pb) + radius);
        let overlap = max_box.min(max_seg) - min_box.max(min_seg);
        if overlap <= 0.0 {
            return 0.0;
        }
        depth = depth.min(overlap);
    }
    if depth.is_finite() {
        depth
    } else {
        0.0
    }
}
