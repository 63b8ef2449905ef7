//! Core freefall math utilities
//!
//! Includes:
//! - Units & conversions (mph/fps/knots, feet/meters)
//! - Compass heading helpers
//! - Wind representation (speed + heading <-> north/east components)
//!
//! Conventions:
//! - Headings are compass degrees: 0° = north, increasing clockwise.
//! - Cartesian wind components are stored as `Vector2 { x: north, y: east }`.
//!   Compared with the unit circle the axes are swapped, which is what makes
//!   `atan(y / x)` come out as a compass bearing.

use std::f64::consts::PI;

use approx::{AbsDiffEq, RelativeEq};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// -------------------------
/// Units & Conversions
/// -------------------------

/// 60 mph is exactly 88 ft/s.
pub const MPH_TO_FPS: f64 = 66.0 / 45.0;
pub const FPS_TO_MPH: f64 = 45.0 / 66.0;
pub const KNOTS_TO_MPH: f64 = 1.150_779_448;
pub const FT_TO_M: f64 = 0.3048;

pub fn mph_to_fps(v: f64) -> f64 { v * MPH_TO_FPS }
pub fn fps_to_mph(v: f64) -> f64 { v * FPS_TO_MPH }

pub fn knots_to_mph(v: f64) -> f64 { v * KNOTS_TO_MPH }
pub fn mph_to_knots(v: f64) -> f64 { v / KNOTS_TO_MPH }

pub fn ft_to_m(ft: f64) -> f64 { ft * FT_TO_M }
pub fn m_to_ft(m: f64) -> f64 { m / FT_TO_M }

/// -------------------------
/// Headings
/// -------------------------

/// Convert a `(north, east)` point into a compass heading in radians.
///
/// Base angle is `atan(y / x)`, quadrant-corrected: `+π` when `x < 0`,
/// `+2π` when `x > 0 && y < 0`. The zero vector has no direction and maps
/// to `0`. Result is in `[0, 2π)`.
pub fn point_to_heading_radians(x: f64, y: f64) -> f64 {
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    // y / ±0 is ±inf, and the sign of a zero x would pick the wrong half-plane
    if x == 0.0 {
        return if y > 0.0 { 0.5 * PI } else { 1.5 * PI };
    }

    let mut heading = (y / x).atan();
    if x < 0.0 {
        heading += PI;
    } else if y < 0.0 {
        heading += 2.0 * PI;
    }

    if heading >= 2.0 * PI { heading - 2.0 * PI } else { heading }
}

/// Degree flavour of [`point_to_heading_radians`], in `[0, 360)`.
pub fn point_to_heading_degrees(x: f64, y: f64) -> f64 {
    let deg = point_to_heading_radians(x, y).to_degrees();
    // a value a hair under 2π can round up to exactly 360.0
    if deg >= 360.0 { deg - 360.0 } else { deg }
}

/// Wrap any heading into `[0, 360)`.
pub fn normalize_heading(deg: f64) -> f64 {
    let h = deg.rem_euclid(360.0);
    if h >= 360.0 { 0.0 } else { h }
}

/// Smallest angle between two headings, in `[0, 180]` degrees.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let d = normalize_heading(a - b);
    if d > 180.0 { 360.0 - d } else { d }
}

/// -------------------------
/// Wind
/// -------------------------

/// A wind observation in polar form.
///
/// `heading` is kept exactly as given (not wrapped) so that a measured
/// sample can be echoed back verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub heading: f64, // compass degrees
}

impl Wind {
    pub fn new(speed: f64, heading: f64) -> Self {
        Self { speed, heading }
    }

    /// Northward component (same unit as `speed`)
    pub fn north(&self) -> f64 {
        self.speed * self.heading.to_radians().cos()
    }

    /// Eastward component (same unit as `speed`)
    pub fn east(&self) -> f64 {
        self.speed * self.heading.to_radians().sin()
    }

    /// `(north, east)` components.
    pub fn components(&self) -> Vector2<f64> {
        Vector2::new(self.north(), self.east())
    }

    /// Back from `(north, east)` components. The heading lands in `[0, 360)`.
    pub fn from_components(v: Vector2<f64>) -> Self {
        Self {
            speed: v.norm(),
            heading: point_to_heading_degrees(v.x, v.y),
        }
    }

    /// Circular (vector) mean: components are averaged, then converted
    /// back to polar form. Opposing winds cancel. `None` for no winds.
    pub fn mean<I>(winds: I) -> Option<Self>
    where
        I: IntoIterator<Item = Wind>,
    {
        let mut sum: Vector2<f64> = Vector2::zeros();
        let mut n = 0usize;
        for w in winds {
            sum += w.components();
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Self::from_components(sum / n as f64))
    }
}

impl AbsDiffEq for Wind {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    /// Headings compare on the circle, so 359.9° is close to 0.1°.
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.speed.abs_diff_eq(&other.speed, epsilon)
            && heading_difference(self.heading, other.heading) <= epsilon
    }
}

impl RelativeEq for Wind {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.speed.relative_eq(&other.speed, epsilon, max_relative)
            && heading_difference(self.heading, other.heading) <= epsilon.max(max_relative * 360.0)
    }
}

/* -------------------------------- tests -------------------------------- */
