//! End-to-end scenarios: raw points (or GPX text) through the full pipeline.

use approx::assert_relative_eq;

use tracksolid::generate::{Region, Smoothing};
use tracksolid::{
    generate, parse_gpx, Coord3, Options, ProjSource, ShapeType, TrackPoint,
};

fn bbox(vertices: &[Coord3]) -> (Coord3, Coord3) {
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in vertices {
        min.x = min.x.min(v.x);
        min.y = min.y.min(v.y);
        min.z = min.z.min(v.z);
        max.x = max.x.max(v.x);
        max.y = max.y.max(v.y);
        max.z = max.z.max(v.z);
    }
    (min, max)
}

#[test]
fn two_point_line_linear_profile() {
    let points = vec![
        TrackPoint::new(0.0, 0.0, 10.0),
        TrackPoint::new(0.001, 0.0, 10.0),
    ];
    let options = Options {
        buffer: 5.0,
        vertical: 1.0,
        base: 1.0,
        bedx: 100.0,
        bedy: 100.0,
        shape: ShapeType::Linear,
        ..Options::default()
    };
    let artifact = generate(&points, &options).unwrap();

    assert_relative_eq!(artifact.total_distance, 111.32, epsilon = 0.01);
    assert_eq!(artifact.vertices.len(), 8);
    assert_eq!(artifact.triangles.len(), 12);
    assert_eq!(artifact.stl().len(), 684);
    assert!(artifact.markers.is_empty());

    // 90 mm of usable bed over 111.32 m of track.
    assert_relative_eq!(artifact.scale, 90.0 / artifact.total_distance, epsilon = 1.0e-9);

    let (min, max) = bbox(&artifact.vertices);
    assert_relative_eq!(max.x - min.x, 10.0, epsilon = 1.0e-9); // 2 * buffer
    assert_relative_eq!(max.y - min.y, 90.0, epsilon = 1.0e-9);
    assert_eq!(min.z, 0.0);
    assert_relative_eq!(max.z, 10.0 * artifact.scale + 1.0, epsilon = 1.0e-9);
    // centred on the bed
    assert_relative_eq!(min.y + max.y, 0.0, epsilon = 1.0e-9);
}

#[test]
fn right_angle_map_mitre() {
    let points = vec![
        TrackPoint::new(0.0, 0.0, 0.0),
        TrackPoint::new(0.001, 0.0, 0.0),
        TrackPoint::new(0.001, 0.001, 0.0),
    ];
    let options = Options {
        buffer: 1.0,
        shape: ShapeType::Map,
        proj_source: ProjSource::Google,
        ..Options::default()
    };
    let artifact = generate(&points, &options).unwrap();

    assert_eq!(artifact.vertices.len(), 12);
    assert_eq!(artifact.triangles.len(), 2 + 2 + 16);

    // The corner station projects to (max_x, min_y); its four mesh vertices
    // sit buffer * sqrt(2) away along the bisector normal.
    let b = artifact.bounds;
    let corner_x = artifact.scale * (b.max.x - b.center_x());
    let corner_y = artifact.scale * (b.min.y - b.center_y());
    for v in &artifact.vertices[4..8] {
        let d = ((v.x - corner_x).powi(2) + (v.y - corner_y).powi(2)).sqrt();
        assert_relative_eq!(d, 2.0_f64.sqrt(), epsilon = 1.0e-6);
    }
}

#[test]
fn ring_profile_closes_the_loop() {
    // 100 uniform points around a small geographic circle, closed.
    let n = 100;
    let points: Vec<TrackPoint> = (0..=n)
        .map(|i| {
            let theta = std::f64::consts::TAU * f64::from(i) / f64::from(n);
            TrackPoint::new(0.01 * theta.cos(), 0.01 * theta.sin(), 1.0)
        })
        .collect();
    let options = Options {
        shape: ShapeType::Ring,
        smoothing: Smoothing::Span(0.0),
        ..Options::default()
    };
    let artifact = generate(&points, &options).unwrap();

    let r = artifact.total_distance / std::f64::consts::TAU;
    // Projected bounds span the ring diameter on both axes.
    assert_relative_eq!(artifact.bounds.width(), 2.0 * r, max_relative = 1.0e-2);
    assert_relative_eq!(artifact.bounds.depth(), 2.0 * r, max_relative = 1.0e-2);
}

#[test]
fn auto_utm_in_southern_hemisphere() {
    let points = vec![
        TrackPoint::new(-60.001, -30.0, 100.0),
        TrackPoint::new(-60.0, -30.001, 110.0),
        TrackPoint::new(-59.999, -30.0, 105.0),
    ];
    let options = Options {
        shape: ShapeType::Map,
        proj_source: ProjSource::AutoUtm,
        smoothing: Smoothing::Span(0.0),
        ..Options::default()
    };
    let artifact = generate(&points, &options).unwrap();

    // Zone 21 south: false northing keeps coordinates positive and large.
    assert!(artifact.bounds.min.y > 6.0e6, "northing {}", artifact.bounds.min.y);
    assert!(artifact.bounds.min.x > 0.0);
    assert_eq!(artifact.vertices.len() % 4, 0);
}

#[test]
fn markers_every_kilometer() {
    // 45 equatorial segments of ~111.3 m: just over 5 km.
    let points: Vec<TrackPoint> = (0..=45)
        .map(|i| TrackPoint::new(f64::from(i) * 0.001, 0.0, 1.0))
        .collect();
    let options = Options {
        buffer: 2.0,
        shape: ShapeType::Linear,
        marker_interval: 1_000.0,
        smoothing: Smoothing::Span(0.0),
        ..Options::default()
    };
    let artifact = generate(&points, &options).unwrap();

    assert!(artifact.total_distance > 5_000.0);
    assert_eq!(artifact.markers.len(), 5);

    // Under the linear profile the pre-fit y coordinate is the cumulative
    // distance, so the fitted marker positions pin the spacing down.
    let b = artifact.bounds;
    for (k, m) in artifact.markers.iter().enumerate() {
        assert_eq!(m.width, 2.0 * 2.0 + 2.0);
        let expected = artifact.scale * ((k + 1) as f64 * 1_000.0 - b.center_y());
        assert_relative_eq!(m.location.y, expected, epsilon = artifact.scale * 1.0);
        assert_relative_eq!(m.location.x, 0.0, epsilon = 1.0e-9);
    }

    // Marker boxes ride along in the STL as separate solids.
    let stl = artifact.stl();
    assert_eq!(
        stl.len(),
        84 + 50 * (artifact.triangles.len() + 12 * artifact.markers.len())
    );
}

#[test]
fn region_fit_overrides_bounds() {
    let points: Vec<TrackPoint> = (0..=3)
        .map(|i| TrackPoint::new(f64::from(i) * 0.001, 0.0, 10.0))
        .collect();
    let options = Options {
        smoothing: Smoothing::Span(0.0),
        ..Options::default()
    };
    let natural = generate(&points, &options).unwrap();
    let b = natural.bounds;

    // Shift the window east and make it wider: the model is centred on the
    // region's centre, and the scale follows the region's extent.
    let region = Region {
        min_x: b.min.x - 200.0,
        max_x: b.max.x + 100.0,
        min_y: -50.0,
        max_y: 50.0,
    };
    let fitted = generate(
        &points,
        &Options {
            region: Some(region),
            ..options.clone()
        },
    )
    .unwrap();

    assert_relative_eq!(
        fitted.scale,
        (options.bedx - 2.0 * options.buffer) / (b.width() + 300.0),
        epsilon = 1.0e-9
    );

    let region_cx = (region.min_x + region.max_x) / 2.0;
    let (min, max) = bbox(&fitted.vertices);
    assert_relative_eq!(
        (min.x + max.x) / 2.0,
        fitted.scale * (b.center_x() - region_cx),
        epsilon = 1.0e-6
    );
}

#[test]
fn gpx_to_stl() {
    let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="unit">
  <trk>
    <name>Esslingen loop</name>
    <trkseg>
      <trkpt lat="48.74" lon="9.30"><ele>230.0</ele></trkpt>
      <trkpt lat="48.75" lon="9.31"><ele>260.0</ele></trkpt>
      <trkpt lat="48.76" lon="9.30"><ele>245.0</ele></trkpt>
      <trkpt lat="48.75" lon="9.29"><ele>235.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
    let (points, info) = parse_gpx(gpx, 1.0, false).unwrap();
    assert_eq!(info.name, "Esslingen loop");
    assert!(info.has_elevation);
    assert!(info.distance > 3_500.0);

    let artifact = generate(&points, &Options::default()).unwrap();
    assert!(!artifact.vertices.is_empty());
    assert_eq!(artifact.triangles.len() % 2, 0);
    for tri in &artifact.triangles {
        assert!(tri.iter().all(|&i| i < artifact.vertices.len()));
    }
    let stl = artifact.stl();
    assert_eq!(stl.len(), 84 + 50 * artifact.triangles.len());
    let count = u32::from_le_bytes(stl[80..84].try_into().unwrap());
    assert_eq!(count as usize, artifact.triangles.len());
}
