//! Ribbon mesh construction.
//!
//! The builder walks the fitted planar points and extrudes a closed solid:
//! four vertices per accepted station (the lower and upper pair of the
//! cross-section), a start cap, one eight-triangle bridge per segment (top,
//! left, right, bottom strips), and an end cap. All triangles wind
//! counter-clockwise seen from outside the solid.
//!
//! Joints between segments are mitred along the angle bisector; the mitre
//! offset is clamped to twice the ribbon half-width so sharp turns cannot
//! produce unbounded spikes, and oscillating segment pairs are collapsed
//! outright.

use std::f64::consts::FRAC_PI_2;

use log::trace;

use crate::types::Coord3;

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Coord3>,
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Mesh::default()
    }

    /// Bridge the quad starting at vertex `i` to the quad at `i + 4` with
    /// the eight strip triangles, in top/left/right/bottom order.
    ///
    /// Quad layout: `+0` lower-left, `+1` lower-right, `+2` upper-left,
    /// `+3` upper-right.
    fn push_bridge(&mut self, i: usize) {
        self.triangles.extend_from_slice(&[
            [i + 2, i + 6, i + 3],
            [i + 3, i + 6, i + 7],
            [i + 3, i + 7, i + 5],
            [i + 3, i + 5, i + 1],
            [i + 6, i + 2, i],
            [i + 6, i, i + 4],
            [i, i + 5, i + 4],
            [i, i + 1, i + 5],
        ]);
    }
}

/// A turn sharper than a right angle, in either direction.
fn is_acute(rel: f64) -> bool {
    let a = rel.abs();
    a > FRAC_PI_2 && a < 3.0 * FRAC_PI_2
}

/// Build the closed ribbon solid along `path`.
///
/// `path` carries fitted model coordinates; each station's `z` is the ribbon
/// height there, and the lower vertex pair sits on z = 0. `buffer` is the
/// ribbon half-width.
pub fn build_ribbon(path: &[Coord3], buffer: f64) -> Mesh {
    let mut mesh = Mesh::new();
    let n = path.len();
    if n < 2 {
        return mesh;
    }

    // Direction of the outgoing segment at each station; the final station
    // reuses the incoming direction.
    let mut angles = vec![0.0f64; n];
    for i in 0..n {
        angles[i] = if i + 1 < n {
            (path[i + 1].y - path[i].y).atan2(path[i + 1].x - path[i].x)
        } else {
            angles[i - 1]
        };
    }

    let mut accepted = 0usize;
    for i in 0..n {
        let rel = if i == 0 { 0.0 } else { angles[i] - angles[i - 1] };

        // Collapse oscillating pairs: a sharp turn immediately followed by
        // another sharp turn would self-intersect. The last station is never
        // skipped.
        if i + 1 < n && is_acute(rel) && is_acute(angles[i + 1] - angles[i]) {
            trace!("collapsing station {i} (rel {:.3} rad)", rel);
            continue;
        }

        let incoming = if i == 0 { angles[0] } else { angles[i - 1] };
        let joint = incoming + rel / 2.0;
        let mut jointr = buffer / (rel / 2.0).cos();
        if jointr.abs() > 2.0 * buffer {
            jointr = (2.0 * buffer).copysign(jointr);
        }

        let station = path[i];
        let (lx, ly) = (
            station.x + jointr * (joint - FRAC_PI_2).cos(),
            station.y + jointr * (joint - FRAC_PI_2).sin(),
        );
        let (rx, ry) = (
            station.x + jointr * (joint + FRAC_PI_2).cos(),
            station.y + jointr * (joint + FRAC_PI_2).sin(),
        );

        mesh.vertices.extend_from_slice(&[
            Coord3::new(lx, ly, 0.0),
            Coord3::new(rx, ry, 0.0),
            Coord3::new(lx, ly, station.z),
            Coord3::new(rx, ry, station.z),
        ]);

        if accepted == 0 {
            mesh.triangles.extend_from_slice(&[[0, 2, 3], [3, 1, 0]]);
        } else {
            mesh.push_bridge((accepted - 1) * 4);
        }
        accepted += 1;
    }

    let i = (accepted - 1) * 4;
    mesh.triangles
        .extend_from_slice(&[[i + 2, i + 1, i + 3], [i + 2, i, i + 1]]);

    mesh
}
