//! Distance-marker solids.
//!
//! Each marker becomes a slim oriented box across the ribbon: 1 mm along the
//! track, `2 * buffer + 2` across it, reaching 2 mm above the ribbon top at
//! that point. Markers stay separate solids; they are never unioned with the
//! ribbon mesh.

use crate::path::Mesh;
use crate::types::{Coord3, Marker};

/// Tessellate one marker into a 12-triangle box, rotated about z by the
/// marker's orientation and resting on z = 0.
pub fn marker_box(marker: &Marker) -> Mesh {
    let half_x = 0.5;
    let half_y = marker.width / 2.0;
    let height = marker.location.z + 2.0;
    let (sin, cos) = marker.orientation.sin_cos();

    let corner = |lx: f64, ly: f64, z: f64| {
        Coord3::new(
            marker.location.x + lx * cos - ly * sin,
            marker.location.y + lx * sin + ly * cos,
            z,
        )
    };

    // Bottom ring counter-clockwise seen from above, then the top ring.
    let vertices = vec![
        corner(-half_x, -half_y, 0.0),
        corner(half_x, -half_y, 0.0),
        corner(half_x, half_y, 0.0),
        corner(-half_x, half_y, 0.0),
        corner(-half_x, -half_y, height),
        corner(half_x, -half_y, height),
        corner(half_x, half_y, height),
        corner(-half_x, half_y, height),
    ];

    let mut triangles = vec![
        // bottom, facing down
        [0, 3, 2],
        [0, 2, 1],
        // top, facing up
        [4, 5, 6],
        [4, 6, 7],
    ];
    // walls
    for k in 0..4usize {
        let a = k;
        let b = (k + 1) % 4;
        triangles.push([a, b, b + 4]);
        triangles.push([a, b + 4, a + 4]);
    }

    Mesh {
        vertices,
        triangles,
    }
}
