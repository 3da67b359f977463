//! Binary STL serialization.
//!
//! Layout: an 80-byte zero-padded ASCII header, a little-endian `u32`
//! triangle count, then one 50-byte record per triangle (unit normal, three
//! vertices, zero attribute count). The total size is `84 + 50 * N` bytes,
//! known before writing.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::types::Coord3;

/// Size of one triangle record in bytes.
const TRIANGLE_RECORD: usize = 50;

/// One solid to serialize: its vertices and the triangles indexing them.
pub type Solid<'a> = (&'a [Coord3], &'a [[usize; 3]]);

/// Serialize `solids` as one binary STL body. Multiple solids are emitted
/// back to back, sharing the single triangle list.
pub fn write_stl<W: Write>(mut w: W, header: &str, solids: &[Solid<'_>]) -> io::Result<()> {
    let mut banner = [0u8; 80];
    for (slot, byte) in banner.iter_mut().zip(header.bytes()) {
        *slot = byte;
    }
    w.write_all(&banner)?;

    let count: usize = solids.iter().map(|(_, triangles)| triangles.len()).sum();
    w.write_u32::<LittleEndian>(count as u32)?;

    for (vertices, triangles) in solids {
        for tri in *triangles {
            let v0 = vertices[tri[0]];
            let v1 = vertices[tri[1]];
            let v2 = vertices[tri[2]];
            let (nx, ny, nz) = normal(v0, v1, v2);
            for value in [nx, ny, nz] {
                w.write_f32::<LittleEndian>(value as f32)?;
            }
            for v in [v0, v1, v2] {
                w.write_f32::<LittleEndian>(v.x as f32)?;
                w.write_f32::<LittleEndian>(v.y as f32)?;
                w.write_f32::<LittleEndian>(v.z as f32)?;
            }
            w.write_u16::<LittleEndian>(0)?;
        }
    }

    Ok(())
}

/// Serialize into a fresh buffer of exactly `84 + 50 * N` bytes.
pub fn stl_bytes(header: &str, solids: &[Solid<'_>]) -> Vec<u8> {
    let count: usize = solids.iter().map(|(_, triangles)| triangles.len()).sum();
    let mut buf = Vec::with_capacity(84 + TRIANGLE_RECORD * count);
    write_stl(&mut buf, header, solids).expect("writing to a Vec cannot fail");
    buf
}

/// Unit normal of a triangle, or all zeros for a degenerate one.
fn normal(v0: Coord3, v1: Coord3, v2: Coord3) -> (f64, f64, f64) {
    let u = (v1.x - v0.x, v1.y - v0.y, v1.z - v0.z);
    let v = (v2.x - v0.x, v2.y - v0.y, v2.z - v0.z);
    let n = (
        u.1 * v.2 - u.2 * v.1,
        u.2 * v.0 - u.0 * v.2,
        u.0 * v.1 - u.1 * v.0,
    );
    let len = (n.0 * n.0 + n.1 * n.1 + n.2 * n.2).sqrt();
    if len == 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        (n.0 / len, n.1 / len, n.2 / len)
    }
}
