//! Track scanning: one forward pass over the raw points.
//!
//! The scan accumulates total geodesic distance and the geographic bounds,
//! interpolates distance-marker positions along the raw geometry, and then
//! thins the track with a minimum-spacing filter so that adjacent stations on
//! the final model are separated by at least one ribbon half-width.
//!
//! Marker positions intentionally use the *raw* cumulative distance and raw
//! total, while the thinned points carry their own cumulative ratio over the
//! *smoothed* total: markers must not drift when smoothing changes point
//! density.

use geo_types::{coord, Rect};
use log::debug;

use crate::geodesy::{FailedToConvergeError, VincentyDistance};
use crate::projection::Projector;
use crate::types::{Bounds, Coord3, TrackPoint};

/// Tolerance for marker placement at exact interval multiples, in meters.
const MARKER_EPS: f64 = 1.0e-9;

/// A marker interpolated along the raw track, before projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMarker {
    /// Linearly interpolated geographic position (lon, lat, ele).
    pub point: TrackPoint,
    /// Cumulative raw distance at the marker, meters.
    pub distance: f64,
    /// Index of the raw point ending the segment the marker lies on.
    pub segment: usize,
}

/// A marker after projection, before the fit transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarMarker {
    pub location: Coord3,
    /// Heading of the projected segment the marker lies on, radians.
    pub orientation: f64,
}

/// Result of the raw forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScan {
    /// Sum of Vincenty distances between consecutive raw points, meters.
    pub total_distance: f64,
    /// Lon/lat bounds over all raw points.
    pub geo_bounds: Rect<f64>,
    pub markers: Vec<RawMarker>,
    /// Cumulative raw distance at each raw point; `cumulative[0] == 0`.
    pub cumulative: Vec<f64>,
}

/// The thinned track.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    /// Kept points, first raw point always included.
    pub points: Vec<TrackPoint>,
    /// Distances between consecutive kept points, meters; `len() == points.len() - 1`.
    pub distances: Vec<f64>,
    /// Sum of `distances`.
    pub total: f64,
}

/// Walk the raw points once, accumulating distance and bounds and placing a
/// marker every `marker_interval` meters (0 disables markers).
///
/// The residual of each segment carries into the next, so marker spacing is
/// uniform across segment boundaries, and a segment longer than the interval
/// receives several markers.
pub fn raw_scan(
    points: &[TrackPoint],
    marker_interval: f64,
) -> Result<RawScan, FailedToConvergeError> {
    let mut min_lon = f64::INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut max_lat = f64::NEG_INFINITY;

    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0);
    let mut total = 0.0;
    let mut markers = Vec::new();
    // Distance accumulated since the previous marker.
    let mut md = 0.0;

    for (i, p) in points.iter().enumerate() {
        min_lon = min_lon.min(p.lon());
        max_lon = max_lon.max(p.lon());
        min_lat = min_lat.min(p.lat());
        max_lat = max_lat.max(p.lat());

        if i == 0 {
            continue;
        }
        let prev = &points[i - 1];
        let seg = prev.point.vincenty_distance(&p.point)?;

        if marker_interval > 0.0 && seg > 0.0 {
            let mut consumed = 0.0;
            while md + (seg - consumed) >= marker_interval - MARKER_EPS {
                consumed += marker_interval - md;
                let frac = (consumed / seg).min(1.0);
                markers.push(RawMarker {
                    point: lerp(prev, p, frac),
                    distance: total + consumed,
                    segment: i,
                });
                md = 0.0;
            }
            md += seg - consumed;
        } else {
            md += seg;
        }

        total += seg;
        cumulative.push(total);
    }

    debug!(
        "scanned {} points: {:.1} m, {} markers",
        points.len(),
        total,
        markers.len()
    );

    Ok(RawScan {
        total_distance: total,
        geo_bounds: Rect::new(
            coord! { x: min_lon, y: min_lat },
            coord! { x: max_lon, y: max_lat },
        ),
        markers,
        cumulative,
    })
}

fn lerp(a: &TrackPoint, b: &TrackPoint, frac: f64) -> TrackPoint {
    TrackPoint::new(
        a.lon() + (b.lon() - a.lon()) * frac,
        a.lat() + (b.lat() - a.lat()) * frac,
        a.ele + (b.ele - a.ele) * frac,
    )
}

/// Thin the raw points: the first point is kept, each subsequent point is
/// kept iff its distance to the last kept point is at least `min_distance`.
///
/// The trailing raw point is subject to the same test and may be dropped,
/// moving the modelled endpoint by up to `min_distance`.
pub fn smooth(
    points: &[TrackPoint],
    min_distance: f64,
) -> Result<Smoothed, FailedToConvergeError> {
    let mut last = points[0];
    let mut kept = vec![last];
    let mut distances = Vec::new();
    let mut total = 0.0;

    for p in &points[1..] {
        let d = last.point.vincenty_distance(&p.point)?;
        if d >= min_distance {
            kept.push(*p);
            distances.push(d);
            total += d;
            last = *p;
        }
    }

    debug!(
        "smoothing kept {} of {} points (min spacing {:.0} m)",
        kept.len(),
        points.len(),
        min_distance
    );

    Ok(Smoothed {
        points: kept,
        distances,
        total,
    })
}

/// Project the thinned points in order, seeding the planar bounds from the
/// first point and extending them with every subsequent one.
pub fn project_track(smoothed: &Smoothed, projector: &Projector) -> (Vec<Coord3>, Bounds) {
    let mut out = Vec::with_capacity(smoothed.points.len());
    let first = projector.project(&smoothed.points[0], 0.0);
    let mut bounds = Bounds::from_point(first);
    out.push(first);

    let mut cd = 0.0;
    for (i, p) in smoothed.points.iter().enumerate().skip(1) {
        cd += smoothed.distances[i - 1];
        let t = if smoothed.total > 0.0 {
            cd / smoothed.total
        } else {
            0.0
        };
        let c = projector.project(p, t);
        bounds.extend(c);
        out.push(c);
    }

    (out, bounds)
}

/// Project the raw markers. Locations use the raw cumulative ratio; the
/// orientation is the heading of the projected raw segment each marker lies
/// on.
pub fn project_markers(
    raw: &RawScan,
    points: &[TrackPoint],
    projector: &Projector,
) -> Vec<PlanarMarker> {
    let total = raw.total_distance;
    raw.markers
        .iter()
        .map(|m| {
            let t = if total > 0.0 { m.distance / total } else { 0.0 };
            let location = projector.project(&m.point, t);
            let i = m.segment;
            let t0 = if total > 0.0 {
                raw.cumulative[i - 1] / total
            } else {
                0.0
            };
            let t1 = if total > 0.0 {
                raw.cumulative[i] / total
            } else {
                0.0
            };
            let e0 = projector.project(&points[i - 1], t0);
            let e1 = projector.project(&points[i], t1);
            let orientation = (e1.y - e0.y).atan2(e1.x - e0.x);
            PlanarMarker {
                location,
                orientation,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    /// Equatorial track: n segments of 0.01° longitude, ~1113.19 m each.
    fn equator_track(n: usize) -> Vec<TrackPoint> {
        (0..=n)
            .map(|i| TrackPoint::new(i as f64 * 0.01, 0.0, 1.0))
            .collect()
    }

    #[test]
    fn totals_and_bounds() {
        let points = equator_track(5);
        let raw = raw_scan(&points, 0.0).unwrap();
        assert_relative_eq!(raw.total_distance, 5.0 * 1_113.194_9, epsilon = 0.1);
        assert_eq!(raw.cumulative.len(), 6);
        assert_eq!(raw.geo_bounds.min().x, 0.0);
        assert_relative_eq!(raw.geo_bounds.max().x, 0.05, epsilon = 1.0e-12);
        assert!(raw.markers.is_empty());
    }

    #[test]
    fn marker_interval_divides_track() {
        // interval = L/N places exactly N markers at k*L/N
        let points = equator_track(10);
        let total = raw_scan(&points, 0.0).unwrap().total_distance;
        for n in [1usize, 2, 5, 7] {
            let interval = total / n as f64;
            let raw = raw_scan(&points, interval).unwrap();
            assert_eq!(raw.markers.len(), n, "n = {n}");
            for (k, m) in raw.markers.iter().enumerate() {
                assert_relative_eq!(
                    m.distance,
                    (k + 1) as f64 * interval,
                    epsilon = 1.0e-6
                );
            }
        }
    }

    #[test]
    fn long_segment_carries_multiple_markers() {
        // Two points ~11131.9 m apart, interval 2000 m: five markers on one
        // raw segment.
        let points = vec![
            TrackPoint::new(0.0, 0.0, 1.0),
            TrackPoint::new(0.1, 0.0, 1.0),
        ];
        let raw = raw_scan(&points, 2_000.0).unwrap();
        assert_eq!(raw.markers.len(), 5);
        for (k, m) in raw.markers.iter().enumerate() {
            assert_relative_eq!(m.distance, (k + 1) as f64 * 2_000.0, epsilon = 1.0e-6);
            assert_eq!(m.segment, 1);
        }
    }

    #[test]
    fn residual_carries_across_segments() {
        // 3 segments of ~1113 m with a 1500 m interval: markers at 1500 and
        // 3000, not segment-aligned.
        let points = equator_track(3);
        let raw = raw_scan(&points, 1_500.0).unwrap();
        assert_eq!(raw.markers.len(), 2);
        assert_relative_eq!(raw.markers[0].distance, 1_500.0, epsilon = 1.0e-6);
        assert_relative_eq!(raw.markers[1].distance, 3_000.0, epsilon = 1.0e-6);
        assert_eq!(raw.markers[0].segment, 2);
    }

    #[test]
    fn marker_interpolates_elevation() {
        let points = vec![
            TrackPoint::new(0.0, 0.0, 0.0),
            TrackPoint::new(0.02, 0.0, 100.0),
        ];
        let total = raw_scan(&points, 0.0).unwrap().total_distance;
        let raw = raw_scan(&points, total / 2.0).unwrap();
        assert_eq!(raw.markers.len(), 2);
        assert_relative_eq!(raw.markers[0].point.ele, 50.0, epsilon = 1.0e-6);
        assert_relative_eq!(raw.markers[0].point.lon(), 0.01, epsilon = 1.0e-9);
    }

    #[test]
    fn smoothing_enforces_min_spacing() {
        let points = equator_track(10); // ~1113 m spacing
        let smoothed = smooth(&points, 2_000.0).unwrap();
        // every second point survives
        assert_eq!(smoothed.points.len(), 6);
        assert!(smoothed.distances.iter().all(|d| *d >= 2_000.0));
        assert_eq!(smoothed.points[0], points[0]);
    }

    #[test]
    fn smoothing_zero_keeps_everything() {
        let points = equator_track(4);
        let smoothed = smooth(&points, 0.0).unwrap();
        assert_eq!(smoothed.points.len(), 5);
        assert_eq!(smoothed.distances.len(), 4);
        assert_relative_eq!(smoothed.total, 4.0 * 1_113.194_9, epsilon = 0.1);
    }

    #[test]
    fn trailing_point_may_be_dropped() {
        // Last point only 0.001° (~111 m) past the previous one.
        let mut points = equator_track(2);
        points.push(TrackPoint::new(0.021, 0.0, 1.0));
        let smoothed = smooth(&points, 500.0).unwrap();
        assert_eq!(smoothed.points.len(), 3);
        assert_relative_eq!(
            smoothed.points.last().unwrap().lon(),
            0.02,
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn project_track_updates_bounds() {
        let smoothed = Smoothed {
            points: vec![
                TrackPoint::new(0.0, 0.0, 5.0),
                TrackPoint::new(0.0, 0.0, 9.0),
                TrackPoint::new(0.0, 0.0, 2.0),
            ],
            distances: vec![600.0, 400.0],
            total: 1_000.0,
        };
        let projector = Projector::Linear {
            total_distance: 1_000.0,
        };
        let (coords, bounds) = project_track(&smoothed, &projector);
        assert_eq!(coords.len(), 3);
        assert_relative_eq!(coords[1].y, 600.0, epsilon = 1.0e-9);
        assert_eq!(bounds.min.z, 2.0);
        assert_eq!(bounds.max.z, 9.0);
        assert_eq!(bounds.depth(), 1_000.0);
    }

    #[test]
    fn marker_orientation_follows_segment() {
        let points = vec![
            TrackPoint::new(0.0, 0.0, 1.0),
            TrackPoint::new(0.02, 0.0, 1.0),
        ];
        let raw = raw_scan(&points, 1_000.0).unwrap();
        let projector = Projector::Map(crate::projection::MapTransform::Mercator);
        let markers = project_markers(&raw, &points, &projector);
        assert!(!markers.is_empty());
        for m in &markers {
            // due east
            assert_relative_eq!(m.orientation, 0.0, epsilon = 1.0e-9);
        }
    }
}
