//! The `tracksolid` crate turns a GPS track into a watertight 3D solid: a
//! raised ribbon standing on a flat base, sized to a printer bed and emitted
//! as binary STL (with OpenSCAD / OpenJSCAD text output for inspection).
//!
//! # Pipeline
//!
//! - **[`gpx`]**: parse a GPX document into an ordered sequence of
//!   [`TrackPoint`]s plus a [`TrackInfo`] summary
//! - **[`geodesy`]**: Vincenty inverse distance on the WGS84 ellipsoid
//! - **[`projection`]**: pluggable planar transform, selectable between a
//!   cartographic map projection (Web Mercator or UTM, from a proj4-style
//!   definition), a linear distance profile, and a circular ring profile
//! - **[`scan`]**: a single forward pass over the raw points accumulating
//!   distance, geographic bounds and distance markers, then thinning the
//!   track with a minimum-spacing filter
//! - **[`fit`]**: centre the projected track and scale it onto the bed
//! - **[`path`]**: build the closed ribbon mesh with mitred joints
//! - **[`generate`]**: drive the phases in order and return the [`Artifact`]
//!
//! # Example
//!
//! ```
//! use tracksolid::{generate, Options, TrackPoint};
//!
//! let points = vec![
//!     TrackPoint::new(9.17, 48.77, 240.0),
//!     TrackPoint::new(9.19, 48.78, 260.0),
//!     TrackPoint::new(9.21, 48.78, 255.0),
//! ];
//! let artifact = generate(&points, &Options::default()).unwrap();
//! let stl = artifact.stl();
//! assert_eq!(stl.len(), 84 + 50 * artifact.triangles.len());
//! ```

pub mod fit;
pub mod generate;
pub mod geodesy;
pub mod gpx;
pub mod marker;
pub mod path;
pub mod projection;
pub mod scad;
pub mod scan;
pub mod stl;
pub mod types;

pub use crate::generate::{
    generate, generate_with_progress, Artifact, Bed, GenerateError, Options, Phase, Region,
    Smoothing,
};
pub use crate::gpx::{parse_gpx, GpxError, TrackInfo};
pub use crate::projection::{ProjSource, ShapeType};
pub use crate::types::{Bounds, Coord3, Marker, TrackPoint};

/// Radius of the WGS84 ellipsoid at the equator, in meters.
pub(crate) const EQUATORIAL_EARTH_RADIUS: f64 = 6_378_137.0;

/// Radius of the WGS84 ellipsoid at the poles, in meters.
pub(crate) const POLAR_EARTH_RADIUS: f64 = 6_356_752.314_245;

/// Flattening of the WGS84 ellipsoid.
pub(crate) const EARTH_FLATTENING: f64 =
    (EQUATORIAL_EARTH_RADIUS - POLAR_EARTH_RADIUS) / EQUATORIAL_EARTH_RADIUS;
