//! Plane geometry shared by the scene and the agents.
//!
//! The world uses screen coordinates: x grows to the east, y grows to the
//! south. Rotations are measured from the east axis and increase clockwise,
//! so a heading of `π/2` points south.

pub use glam::Vec2;

use std::f32::consts::{PI, TAU};

/// Wraps any angle into `[0, 2π)`.
#[inline]
pub fn normalize_rotation(radians: f32) -> f32 {
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Heading of a direction vector. The zero vector faces east.
#[inline]
pub fn rotation_of(direction: Vec2) -> f32 {
    if direction == Vec2::ZERO {
        return 0.0;
    }
    normalize_rotation(direction.y.atan2(direction.x))
}

/// Unit vector for a heading.
#[inline]
pub fn heading(rotation: f32) -> Vec2 {
    Vec2::new(rotation.cos(), rotation.sin())
}

/// Smallest absolute difference between two headings, in `[0, π]`.
#[inline]
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let diff = normalize_rotation(a - b);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

/// Axis-aligned world extent anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub size: Vec2,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
        }
    }

    /// Inclusive on both ends: `[0, width] × [0, height]`.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.size.x && point.y >= 0.0 && point.y <= self.size.y
    }

    /// True when `point` is at least `margin` away from every border.
    #[inline]
    pub fn contains_with_margin(&self, point: Vec2, margin: f32) -> bool {
        point.x >= margin
            && point.x <= self.size.x - margin
            && point.y >= margin
            && point.y <= self.size.y - margin
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.size / 2.0
    }
}

/// Shared validation for grids laid over the world (index and pheromone map).
/// Returns `(columns, rows)` when `step` divides both dimensions exactly.
pub(crate) fn grid_dimensions(step: f32, size: Vec2) -> Option<(usize, usize)> {
    if !(step > 0.0) || !(size.x > 0.0) || !(size.y > 0.0) {
        return None;
    }
    let columns = size.x / step;
    let rows = size.y / step;
    if columns.fract() != 0.0 || rows.fract() != 0.0 {
        return None;
    }
    Some((columns as usize, rows as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rotation_follows_screen_axes() {
        assert_eq!(rotation_of(Vec2::new(1.0, 0.0)), 0.0);
        assert!((rotation_of(Vec2::new(0.0, 1.0)) - FRAC_PI_2).abs() < 1e-6);
        assert!((rotation_of(Vec2::new(-1.0, 0.0)) - PI).abs() < 1e-6);
        assert!((rotation_of(Vec2::new(0.0, -1.0)) - 3.0 * FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert!((normalize_rotation(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-6);
        assert!((normalize_rotation(TAU + 1.0) - 1.0).abs() < 1e-5);
        assert!(normalize_rotation(-1e-9) < TAU);
    }

    #[test]
    fn angular_distance_takes_short_way_round() {
        assert!((angular_distance(0.1, TAU - 0.1) - 0.2).abs() < 1e-5);
        assert!((angular_distance(0.0, PI) - PI).abs() < 1e-6);
    }

    #[test]
    fn grid_dimensions_require_exact_multiple() {
        assert_eq!(grid_dimensions(2.0, Vec2::new(10.0, 6.0)), Some((5, 3)));
        assert_eq!(grid_dimensions(3.0, Vec2::new(10.0, 6.0)), None);
        assert_eq!(grid_dimensions(0.0, Vec2::new(10.0, 6.0)), None);
    }
}
