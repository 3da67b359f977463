//! Fit the projected track onto the printer bed.
//!
//! The fit maps planar meters into model millimeters: centre the bounds,
//! scale x/y uniformly into the bed reduced by the ribbon width, apply
//! vertical exaggeration, and lift everything by the base thickness.

use crate::types::{Bounds, Coord3};

/// Uniform scale that fits an extent of `dx` x `dy` meters into the bed,
/// reduced by `2 * buffer` on each axis so the ribbon cannot overhang.
///
/// Degenerate zero extents contribute no candidate; `None` when both extents
/// are degenerate.
pub fn bed_fit_scale(dx: f64, dy: f64, bedx: f64, bedy: f64, buffer: f64) -> Option<f64> {
    let fit_x = bedx - 2.0 * buffer;
    let fit_y = bedy - 2.0 * buffer;
    let mut scale = f64::INFINITY;
    if dx > 0.0 {
        scale = scale.min(fit_x / dx);
    }
    if dy > 0.0 {
        scale = scale.min(fit_y / dy);
    }
    scale.is_finite().then_some(scale)
}

/// The affine mapping from planar meters to model millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub center_x: f64,
    pub center_y: f64,
    /// Vertical shift applied before scaling, so the lowest point sits just
    /// above zero when cutting is requested or elevations dip below sea
    /// level.
    pub z_off: f64,
    pub scale: f64,
    pub z_scale: f64,
    pub vertical: f64,
    pub base: f64,
}

impl FitTransform {
    pub fn new(
        bounds: &Bounds,
        scale: f64,
        z_scale: f64,
        vertical: f64,
        base: f64,
        zcut: bool,
    ) -> Self {
        let z_off = if zcut || bounds.min.z <= 0.0 {
            (bounds.min.z - 1.0).floor()
        } else {
            0.0
        };
        FitTransform {
            center_x: bounds.center_x(),
            center_y: bounds.center_y(),
            z_off,
            scale,
            z_scale,
            vertical,
            base,
        }
    }

    pub fn apply(&self, c: Coord3) -> Coord3 {
        Coord3::new(
            self.scale * (c.x - self.center_x),
            self.scale * (c.y - self.center_y),
            self.z_scale * (c.z - self.z_off) * self.vertical + self.base,
        )
    }
}
