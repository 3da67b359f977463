//! Script-based text emitters: OpenSCAD and OpenJSCAD.
//!
//! Both formats receive the same `polyhedron` with the vertex and face
//! arrays exactly in builder order, followed by the marker boxes as separate
//! solids under a union. Numbers are printed with Rust's shortest
//! round-trip formatting, so the numeric content reconstructs the mesh
//! bit-for-bit; whitespace is not contractual.

use crate::types::{Coord3, Marker};

fn points_list(vertices: &[Coord3], indent: &str) -> String {
    vertices
        .iter()
        .map(|v| format!("{indent}[{}, {}, {}]", v.x, v.y, v.z))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn faces_list(triangles: &[[usize; 3]], indent: &str) -> String {
    triangles
        .iter()
        .map(|t| format!("{indent}[{}, {}, {}]", t[0], t[1], t[2]))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// OpenSCAD source for the artifact.
pub fn openscad(vertices: &[Coord3], triangles: &[[usize; 3]], markers: &[Marker]) -> String {
    let polyhedron = format!(
        "polyhedron(\n  points = [\n{}\n  ],\n  faces = [\n{}\n  ],\n  convexity = 10\n);",
        points_list(vertices, "    "),
        faces_list(triangles, "    ")
    );

    if markers.is_empty() {
        return polyhedron;
    }

    let mut out = String::from("union() {\n");
    for line in polyhedron.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    for m in markers {
        let height = m.location.z + 2.0;
        out.push_str(&format!(
            "  translate([{}, {}, {}]) rotate([0, 0, {}]) cube([1, {}, {}], center = true);\n",
            m.location.x,
            m.location.y,
            height / 2.0,
            m.orientation.to_degrees(),
            m.width,
            height
        ));
    }
    out.push_str("}\n");
    out
}

/// OpenJSCAD source for the artifact. With `preview` set, only the ribbon
/// polyhedron is returned; the full output unions the markers in.
pub fn jscad(
    vertices: &[Coord3],
    triangles: &[[usize; 3]],
    markers: &[Marker],
    preview: bool,
) -> String {
    let mut out = String::from("function main() {\n");
    out.push_str(&format!(
        "  var track = polyhedron({{\n    points: [\n{}\n    ],\n    triangles: [\n{}\n    ]\n  }});\n",
        points_list(vertices, "      "),
        faces_list(triangles, "      ")
    ));

    if preview || markers.is_empty() {
        out.push_str("  return track;\n}\n");
        return out;
    }

    out.push_str("  return union(\n    track");
    for m in markers {
        let height = m.location.z + 2.0;
        out.push_str(&format!(
            ",\n    cube({{size: [1, {}, {}], center: true}}).rotateZ({}).translate([{}, {}, {}])",
            m.width,
            height,
            m.orientation.to_degrees(),
            m.location.x,
            m.location.y,
            height / 2.0
        ));
    }
    out.push_str("\n  );\n}\n");
    out
}
