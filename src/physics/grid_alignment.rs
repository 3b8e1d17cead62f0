//! Axis-aligned orientations and the rotation remaining to reach one

use glam::{DMat3, DQuat, DVec3};
use lazy_static::lazy_static;

lazy_static! {
    /// The 24 rotations mapping the world axes onto themselves
    static ref GRID_ORIENTATIONS: Vec<DQuat> = build_grid_orientations();
}

fn build_grid_orientations() -> Vec<DQuat> {
    let axes = [DVec3::X, DVec3::Y, DVec3::Z];
    let mut orientations = Vec::with_capacity(24);
    for (i, a) in axes.iter().enumerate() {
        for (j, b) in axes.iter().enumerate() {
            if i == j {
                continue;
            }
            for sign_a in [1.0, -1.0] {
                for sign_b in [1.0, -1.0] {
                    let x = *a * sign_a;
                    let y = *b * sign_b;
                    // z follows from x and y, so the determinant is always +1
                    let z = x.cross(y);
                    orientations.push(DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize());
                }
            }
        }
    }
    orientations
}

pub fn grid_orientations() -> &'static [DQuat] {
    &GRID_ORIENTATIONS
}

/// Axis-aligned orientation closest to `rotation`
pub fn nearest_grid_orientation(rotation: DQuat) -> DQuat {
    let rotation = rotation.normalize();
    let mut best = DQuat::IDENTITY;
    let mut best_dot = f64::NEG_INFINITY;
    for candidate in GRID_ORIENTATIONS.iter() {
        let dot = candidate.dot(rotation).abs();
        if dot > best_dot {
            best_dot = dot;
            best = *candidate;
        }
    }
    best
}

/// Smallest rotation taking `rotation` to `target`, as a global-frame unit axis and angle
///
/// The angle lies in `[0, π]`. The axis is arbitrary when the angle is zero.
pub fn remaining_rotation(rotation: DQuat, target: DQuat) -> (DVec3, f64) {
    let mut delta = target * rotation.inverse();
    if delta.w < 0.0 {
        delta = -delta;
    }
    let imaginary = DVec3::new(delta.x, delta.y, delta.z);
    let sin_half = imaginary.length();
    if sin_half <= f64::EPSILON {
        return (DVec3::X, 0.0);
    }
    let angle = 2.0 * sin_half.atan2(delta.w);
    (imaginary / sin_half, angle)
}
