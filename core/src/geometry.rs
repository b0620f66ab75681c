//! Shared geometric type aliases.

use nalgebra as na;

pub type Point3 = na::Point3<f64>;
pub type Vector3 = na::Vector3<f64>;

/// RGB color with components in the 0..1 range.
pub type Color = [f64; 3];
