//! Planar projection of geographic coordinates.
//!
//! Three shapes are supported per generation: a cartographic **map**
//! projection compiled from a proj4-style definition string, a straight
//! **linear** profile over cumulative distance, and a closed circular
//! **ring** profile. The map transforms implemented here are the spherical
//! Web Mercator (the `GOOGLE` sentinel of proj4) and the generic UTM /
//! transverse Mercator forward; everything else is rejected as an unknown
//! projection.
//!
//! The projector is an explicit per-generation value. There is no
//! process-wide "current projection".

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use geo_types::Point;
use thiserror::Error;

use crate::types::{Coord3, TrackPoint};
use crate::{EARTH_FLATTENING, EQUATORIAL_EARTH_RADIUS};

/// UTM scale factor on the central meridian.
const UTM_K0: f64 = 0.9996;

/// The projection definition was not recognised.
#[derive(Error, Debug, Eq, PartialEq)]
#[error("projection not recognised: {0}")]
pub struct UnknownProjectionError(pub String);

/// Overall shape of the generated solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeType {
    /// Planimetric ribbon through a cartographic projection.
    #[default]
    Map,
    /// Straight elevation profile over cumulative distance.
    Linear,
    /// Elevation profile bent onto a circle of circumference `totaldist`.
    Ring,
}

impl TryFrom<u8> for ShapeType {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(ShapeType::Map),
            1 => Ok(ShapeType::Linear),
            2 => Ok(ShapeType::Ring),
            other => Err(other),
        }
    }
}

/// Where the map projection definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjSource {
    /// The proj4 `GOOGLE` sentinel: spherical Web Mercator.
    #[default]
    Google,
    /// A caller-supplied proj4-style definition string.
    Custom,
    /// A UTM definition derived from the track's geographic midpoint.
    AutoUtm,
}

impl TryFrom<u8> for ProjSource {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(ProjSource::Google),
            1 => Ok(ProjSource::Custom),
            2 => Ok(ProjSource::AutoUtm),
            other => Err(other),
        }
    }
}

/// A compiled cartographic forward transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapTransform {
    /// Spherical Web Mercator on the WGS84 equatorial radius.
    Mercator,
    /// Transverse Mercator with UTM conventions: `k0` 0.9996, 500 km false
    /// easting, 10 000 km false northing on the southern hemisphere.
    TransverseMercator { lon0: f64, south: bool },
}

impl MapTransform {
    /// Forward-project geographic degrees into planar meters.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            MapTransform::Mercator => {
                let r = EQUATORIAL_EARTH_RADIUS;
                let x = r * lon.to_radians();
                let y = r * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
            MapTransform::TransverseMercator { lon0, south } => {
                tmerc_forward(lon, lat, lon0, south)
            }
        }
    }
}

/// Transverse Mercator forward on WGS84 (series expansion, Snyder 1987,
/// eq. 8-9..8-13). Accurate to well under a millimeter inside a UTM zone.
fn tmerc_forward(lon: f64, lat: f64, lon0: f64, south: bool) -> (f64, f64) {
    let a = EQUATORIAL_EARTH_RADIUS;
    let f = EARTH_FLATTENING;
    let e2 = f * (2.0 - f);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let phi = lat.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = phi.tan() * phi.tan();
    let c = ep2 * cos_phi * cos_phi;
    let aa = (lon - lon0).to_radians() * cos_phi;

    // Meridional arc from the equator.
    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let x = UTM_K0
        * n
        * (aa
            + (1.0 - t + c) * aa.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * aa.powi(5) / 120.0)
        + 500_000.0;

    let mut y = UTM_K0
        * (m + n
            * phi.tan()
            * (aa * aa / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * aa.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * aa.powi(6) / 720.0));
    if south {
        y += 10_000_000.0;
    }

    (x, y)
}

/// 6-degree UTM zone for a longitude.
pub fn utm_zone(lon: f64) -> u32 {
    (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u32
}

/// Synthesise a proj4 UTM definition for the given geographic midpoint.
pub fn utm_definition(midpoint: Point<f64>) -> String {
    let zone = utm_zone(midpoint.x());
    let south = if midpoint.y() < 0.0 { " +south" } else { "" };
    format!("+proj=utm +zone={zone}{south} +ellps=WGS84 +datum=WGS84 +units=m +no_defs")
}

/// Compile a proj4-style definition into a forward transform.
///
/// Recognised inputs: the `GOOGLE` sentinel, `+proj=merc`, and
/// `+proj=utm +zone=<n> [+south]`.
pub fn parse_projection(definition: &str) -> Result<MapTransform, UnknownProjectionError> {
    let definition = definition.trim();
    if definition == "GOOGLE" {
        return Ok(MapTransform::Mercator);
    }

    let mut proj = None;
    let mut zone = None;
    let mut south = false;
    for token in definition.split_whitespace() {
        let Some(token) = token.strip_prefix('+') else {
            continue;
        };
        match token.split_once('=') {
            Some(("proj", v)) => proj = Some(v),
            Some(("zone", v)) => zone = v.parse::<u32>().ok(),
            None if token == "south" => south = true,
            _ => {}
        }
    }

    match proj {
        Some("merc") => Ok(MapTransform::Mercator),
        Some("utm") => {
            let zone = zone
                .filter(|z| (1..=60).contains(z))
                .ok_or_else(|| UnknownProjectionError(definition.to_string()))?;
            // Central meridian of the zone, degrees.
            let lon0 = f64::from(zone) * 6.0 - 183.0;
            Ok(MapTransform::TransverseMercator { lon0, south })
        }
        _ => Err(UnknownProjectionError(definition.to_string())),
    }
}

/// The per-generation projector. Profile shapes stretch over the raw track
/// length in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projector {
    Map(MapTransform),
    Linear { total_distance: f64 },
    Ring { total_distance: f64 },
}

impl Projector {
    /// Project one track point. `t` is the cumulative distance ratio in
    /// `[0, 1]`; it is ignored by the map shape.
    pub fn project(&self, p: &TrackPoint, t: f64) -> Coord3 {
        match *self {
            Projector::Map(transform) => {
                let (x, y) = transform.forward(p.lon(), p.lat());
                Coord3::new(x, y, p.ele)
            }
            Projector::Linear { total_distance } => Coord3::new(0.0, t * total_distance, p.ele),
            Projector::Ring { total_distance } => {
                let r = total_distance / TAU;
                let theta = TAU * t;
                Coord3::new(r * theta.cos(), r * theta.sin(), p.ele)
            }
        }
    }
}

/// Radius of the ring profile for a track of the given length.
pub fn ring_radius(total_distance: f64) -> f64 {
    total_distance / (2.0 * PI)
}
