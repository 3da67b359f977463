//! Generation pipeline: options, phases, and the returned artifact.
//!
//! One call drives the whole conversion: validate the options, scan the raw
//! points, select and apply the projection, fit the track onto the bed,
//! build the ribbon solid, and hand everything back as an [`Artifact`]. The
//! pipeline is single-threaded and synchronous; every intermediate value is
//! owned by the call and dropped when it returns. On error no partial
//! artifact is ever produced.

use std::fmt;
use std::io::{self, Write};

use geo_types::Point;
use log::debug;
use thiserror::Error;

use crate::fit::{bed_fit_scale, FitTransform};
use crate::geodesy::{FailedToConvergeError, VincentyDistance};
use crate::marker::marker_box;
use crate::path::build_ribbon;
use crate::projection::{
    parse_projection, ring_radius, utm_definition, MapTransform, ProjSource, Projector, ShapeType,
    UnknownProjectionError,
};
use crate::scad;
use crate::scan::{self, RawScan};
use crate::stl;
use crate::types::{Bounds, Coord3, Marker, TrackPoint};

/// Why a generation failed. Exactly one kind is reported per failure.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("projection not recognised: {0}")]
    UnknownProjection(String),
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<UnknownProjectionError> for GenerateError {
    fn from(e: UnknownProjectionError) -> Self {
        GenerateError::UnknownProjection(e.0)
    }
}

impl From<FailedToConvergeError> for GenerateError {
    fn from(_: FailedToConvergeError) -> Self {
        GenerateError::InvalidInput(
            "geodesic distance diverged on a segment (near-antipodal points)".to_string(),
        )
    }
}

/// Caller-supplied planar rectangle replacing the natural x/y bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// How the minimum station spacing is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Smoothing {
    /// Derive the spacing from the bed-fit scale so adjacent stations are at
    /// least one ribbon half-width apart on the model.
    #[default]
    Auto,
    /// Fixed spacing in meters. Zero keeps every point.
    Span(f64),
}

/// Options for one generation. Validated before anything else runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Half-width of the ribbon, model millimeters.
    pub buffer: f64,
    /// Vertical exaggeration factor, at least 1.
    pub vertical: f64,
    /// Printable bed size in millimeters.
    pub bedx: f64,
    pub bedy: f64,
    /// Base thickness under the ribbon, millimeters.
    pub base: f64,
    pub shape: ShapeType,
    pub proj_source: ProjSource,
    /// proj4 definition used when `proj_source` is [`ProjSource::Custom`].
    pub projection: String,
    /// Force every elevation to `zconstant`.
    pub zoverride: bool,
    pub zconstant: f64,
    /// Shift elevations so the minimum sits just above zero. Also applied
    /// automatically when elevations reach zero or below.
    pub zcut: bool,
    pub region: Option<Region>,
    /// Geodesic meters between markers; 0 disables markers.
    pub marker_interval: f64,
    pub smoothing: Smoothing,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            buffer: 2.0,
            vertical: 1.0,
            bedx: 200.0,
            bedy: 200.0,
            base: 1.0,
            shape: ShapeType::Map,
            proj_source: ProjSource::Google,
            projection: String::new(),
            zoverride: false,
            zconstant: 1.0,
            zcut: false,
            region: None,
            marker_interval: 0.0,
            smoothing: Smoothing::Auto,
        }
    }
}

impl Options {
    fn validate(&self) -> Result<(), GenerateError> {
        if !(self.buffer >= 0.5) {
            return Err(GenerateError::InvalidOption("buffer must be at least 0.5"));
        }
        if !(self.vertical >= 1.0) {
            return Err(GenerateError::InvalidOption("vertical must be at least 1"));
        }
        if !(self.bedx >= 20.0) {
            return Err(GenerateError::InvalidOption("bedx must be at least 20"));
        }
        if !(self.bedy >= 20.0) {
            return Err(GenerateError::InvalidOption("bedy must be at least 20"));
        }
        if self.proj_source == ProjSource::Custom
            && self.shape == ShapeType::Map
            && self.projection.trim().is_empty()
        {
            return Err(GenerateError::InvalidOption(
                "custom projection definition is empty",
            ));
        }
        if let Smoothing::Span(span) = self.smoothing {
            if !(span >= 0.0) {
                return Err(GenerateError::InvalidOption(
                    "smoothing span must not be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Phase boundaries reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Project,
    Fit,
    Build,
    Done,
}

impl Phase {
    /// Rough completion percentage at this boundary.
    pub fn percent(self) -> u8 {
        match self {
            Phase::Scan => 30,
            Phase::Project => 50,
            Phase::Fit => 70,
            Phase::Build => 90,
            Phase::Done => 100,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Scan => "scan",
            Phase::Project => "project",
            Phase::Fit => "fit",
            Phase::Build => "build",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Target bed size carried along with the artifact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bed {
    pub x: f64,
    pub y: f64,
}

/// Everything a generation produces. Owns its data; holds no references
/// back into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Fitted mesh vertices, millimeters.
    pub vertices: Vec<Coord3>,
    /// Triangles as index triples into `vertices`.
    pub triangles: Vec<[usize; 3]>,
    pub markers: Vec<Marker>,
    /// Planar bounds after projection, before the fit transform.
    pub bounds: Bounds,
    /// Raw geodesic track length, meters.
    pub total_distance: f64,
    /// Millimeters of model per meter of ground.
    pub scale: f64,
    pub bed: Bed,
}

impl Artifact {
    /// Binary STL of the ribbon plus the marker boxes as separate solids.
    pub fn stl(&self) -> Vec<u8> {
        let marker_meshes: Vec<_> = self.markers.iter().map(marker_box).collect();
        let mut solids: Vec<stl::Solid<'_>> = vec![(&self.vertices, &self.triangles)];
        solids.extend(
            marker_meshes
                .iter()
                .map(|m| (m.vertices.as_slice(), m.triangles.as_slice())),
        );
        stl::stl_bytes(concat!("tracksolid ", env!("CARGO_PKG_VERSION")), &solids)
    }

    /// Stream the same STL body into a writer.
    pub fn write_stl<W: Write>(&self, w: W) -> io::Result<()> {
        let marker_meshes: Vec<_> = self.markers.iter().map(marker_box).collect();
        let mut solids: Vec<stl::Solid<'_>> = vec![(&self.vertices, &self.triangles)];
        solids.extend(
            marker_meshes
                .iter()
                .map(|m| (m.vertices.as_slice(), m.triangles.as_slice())),
        );
        stl::write_stl(w, concat!("tracksolid ", env!("CARGO_PKG_VERSION")), &solids)
    }

    /// OpenJSCAD source. With `preview` set only the ribbon is returned.
    pub fn jscad(&self, preview: bool) -> String {
        scad::jscad(&self.vertices, &self.triangles, &self.markers, preview)
    }

    /// OpenSCAD source.
    pub fn openscad(&self) -> String {
        scad::openscad(&self.vertices, &self.triangles, &self.markers)
    }

    /// Vertex positions for a previewer, ready to upload as an indexed
    /// triangle mesh. Normals are the previewer's business.
    pub fn raw_points(&self) -> &[Coord3] {
        &self.vertices
    }

    /// Face indices for a previewer.
    pub fn raw_faces(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}

/// Run the pipeline without progress reporting.
pub fn generate(points: &[TrackPoint], options: &Options) -> Result<Artifact, GenerateError> {
    generate_with_progress(points, options, |_| {})
}

/// Run the pipeline, invoking `progress` at each phase boundary. The
/// callback runs on the calling thread and must be fast; the pipeline never
/// blocks on it.
pub fn generate_with_progress(
    points: &[TrackPoint],
    options: &Options,
    mut progress: impl FnMut(Phase),
) -> Result<Artifact, GenerateError> {
    options.validate()?;
    if points.len() < 2 {
        return Err(GenerateError::InvalidInput(format!(
            "track has {} points, at least 2 are required",
            points.len()
        )));
    }

    // The input is never mutated; elevation override works on a copy.
    let overridden;
    let points: &[TrackPoint] = if options.zoverride {
        overridden = points
            .iter()
            .map(|p| TrackPoint::new(p.lon(), p.lat(), options.zconstant))
            .collect::<Vec<_>>();
        &overridden
    } else {
        points
    };

    let raw = scan::raw_scan(points, options.marker_interval)?;
    progress(Phase::Scan);

    let projector = match options.shape {
        ShapeType::Map => {
            let definition = match options.proj_source {
                ProjSource::Google => "GOOGLE".to_string(),
                ProjSource::Custom => options.projection.clone(),
                ProjSource::AutoUtm => utm_definition(raw.geo_bounds.center().into()),
            };
            debug!("projection: {definition}");
            Projector::Map(parse_projection(&definition)?)
        }
        ShapeType::Linear => Projector::Linear {
            total_distance: raw.total_distance,
        },
        ShapeType::Ring => Projector::Ring {
            total_distance: raw.total_distance,
        },
    };

    let min_distance = match options.smoothing {
        Smoothing::Span(span) => span,
        Smoothing::Auto => auto_min_distance(options, &raw),
    };
    let smoothed = scan::smooth(points, min_distance)?;
    if smoothed.points.len() < 2 {
        return Err(GenerateError::InvalidInput(format!(
            "smoothing left {} of {} points, at least 2 stations are required",
            smoothed.points.len(),
            points.len()
        )));
    }

    let (projected, mut bounds) = scan::project_track(&smoothed, &projector);
    let planar_markers = scan::project_markers(&raw, points, &projector);
    progress(Phase::Project);

    if let Some(region) = options.region {
        bounds.min.x = region.min_x;
        bounds.min.y = region.min_y;
        bounds.max.x = region.max_x;
        bounds.max.y = region.max_y;
    }

    let scale = bed_fit_scale(
        bounds.width(),
        bounds.depth(),
        options.bedx,
        options.bedy,
        options.buffer,
    )
    .ok_or_else(|| {
        GenerateError::InvalidInput("projected track has no planar extent".to_string())
    })?;
    let z_scale = z_scale(options, &raw, scale)?;
    let fit = FitTransform::new(
        &bounds,
        scale,
        z_scale,
        options.vertical,
        options.base,
        options.zcut,
    );
    progress(Phase::Fit);

    let path: Vec<Coord3> = projected.iter().map(|c| fit.apply(*c)).collect();
    let markers: Vec<Marker> = planar_markers
        .iter()
        .map(|m| Marker {
            location: fit.apply(m.location),
            orientation: m.orientation,
            width: 2.0 * options.buffer + 2.0,
        })
        .collect();
    let mesh = build_ribbon(&path, options.buffer);
    debug!(
        "built {} vertices, {} triangles, {} markers",
        mesh.vertices.len(),
        mesh.triangles.len(),
        markers.len()
    );
    progress(Phase::Build);

    let artifact = Artifact {
        vertices: mesh.vertices,
        triangles: mesh.triangles,
        markers,
        bounds,
        total_distance: raw.total_distance,
        scale,
        bed: Bed {
            x: options.bedx,
            y: options.bedy,
        },
    };
    progress(Phase::Done);
    Ok(artifact)
}

/// Preview the bed-fit scale for the selected shape and derive the minimum
/// station spacing from it: at least one ribbon half-width on the model.
fn auto_min_distance(options: &Options, raw: &RawScan) -> f64 {
    let (dx, dy) = match options.shape {
        ShapeType::Map => {
            // The preview always uses the Web Mercator extent, whatever the
            // final map projection.
            let t = MapTransform::Mercator;
            let (x0, y0) = t.forward(raw.geo_bounds.min().x, raw.geo_bounds.min().y);
            let (x1, y1) = t.forward(raw.geo_bounds.max().x, raw.geo_bounds.max().y);
            ((x1 - x0).abs(), (y1 - y0).abs())
        }
        ShapeType::Linear => (raw.total_distance, 0.0),
        ShapeType::Ring => {
            let d = 2.0 * ring_radius(raw.total_distance);
            (d, d)
        }
    };

    match bed_fit_scale(dx, dy, options.bedx, options.bedy, options.buffer) {
        Some(scale) => (options.buffer / scale).floor(),
        None => 0.0,
    }
}

/// Vertical scale. Matches the planar scale except under a custom
/// projection, whose planar units need not be meters: there the
/// north-south ground distance of the geographic bounds calibrates it.
fn z_scale(options: &Options, raw: &RawScan, scale: f64) -> Result<f64, GenerateError> {
    if options.shape != ShapeType::Map || options.proj_source != ProjSource::Custom {
        return Ok(scale);
    }
    let west = raw.geo_bounds.min().x;
    let south = Point::new(west, raw.geo_bounds.min().y);
    let north = Point::new(west, raw.geo_bounds.max().y);
    let height = south.vincenty_distance(&north)?;
    if height > 0.0 {
        Ok((options.bedy - 2.0 * options.buffer) / height)
    } else {
        Ok(scale)
    }
}
