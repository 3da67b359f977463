//! GPX parsing.
//!
//! A streaming `quick-xml` reader extracts the first `<trk>` element, its
//! name, and every `<trkseg>/<trkpt>` in document order. Only the subset of
//! GPX the pipeline consumes is read: the `lon`/`lat` attributes and the
//! first `<ele>` child of each point. Numeric ranges are not validated;
//! downstream components tolerate any finite value.

use geo_types::Point;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::geodesy::VincentyDistance;
use crate::types::TrackPoint;

/// Why a GPX document could not be turned into a track.
#[derive(Error, Debug)]
pub enum GpxError {
    #[error("input is not well-formed XML")]
    MalformedXml(#[source] quick_xml::Error),
    #[error("no track element present")]
    NoTrack,
    #[error("track has {0} points, at least 2 are required")]
    TooFewPoints(usize),
}

/// Summary of a parsed track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    /// Number of track points across all segments.
    pub points: usize,
    /// Total geodesic distance in meters. NaN if any segment failed to
    /// converge; the generator rejects such tracks anyway.
    pub distance: f64,
    pub min_ele: f64,
    pub max_ele: f64,
    /// Cumulative elevation gain in meters.
    pub gain: f64,
    /// Cumulative elevation loss in meters, reported as a positive number.
    pub loss: f64,
    /// True iff some point's elevation is neither exactly 0 nor exactly 1.
    /// Both values double as "no elevation data" sentinels in common GPX
    /// exports, so an all-default track reads as flat.
    pub has_elevation: bool,
    pub start: Point<f64>,
    pub end: Point<f64>,
}

/// Parse a GPX document into its track points and a summary.
///
/// `default_ele` is used for points without an `<ele>` child; when
/// `force_ele` is set it replaces every elevation regardless of the document.
///
/// Success and failure are mutually exclusive: on any [`GpxError`] no points
/// are returned.
pub fn parse_gpx(
    xml: &str,
    default_ele: f64,
    force_ele: bool,
) -> Result<(Vec<TrackPoint>, TrackInfo), GpxError> {
    let mut reader = Reader::from_str(xml);

    let mut points: Vec<TrackPoint> = Vec::new();
    let mut name = String::new();

    let mut seen_trk = false;
    let mut in_trk = false;
    let mut in_name = false;
    let mut in_ele = false;
    // lon/lat of the <trkpt> currently open, elevation once its first <ele>
    // child has been read.
    let mut current: Option<(f64, f64)> = None;
    let mut current_ele: Option<f64> = None;

    loop {
        match reader.read_event().map_err(GpxError::MalformedXml)? {
            Event::Start(e) => match e.name().as_ref() {
                b"trk" if !seen_trk => {
                    seen_trk = true;
                    in_trk = true;
                }
                b"name" if in_trk && current.is_none() && name.is_empty() => {
                    in_name = true;
                }
                b"trkpt" if in_trk => {
                    current = read_lon_lat(&e);
                    current_ele = None;
                }
                b"ele" if in_trk && current.is_some() => {
                    in_ele = true;
                }
                _ => {}
            },
            Event::Empty(e) => {
                // Self-closing <trkpt lat=".." lon=".."/> carries no <ele>.
                if in_trk && e.name().as_ref() == b"trkpt" {
                    if let Some((lon, lat)) = read_lon_lat(&e) {
                        points.push(TrackPoint::new(lon, lat, default_ele));
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(GpxError::MalformedXml)?;
                if in_name {
                    name = text.trim().to_string();
                } else if in_ele && current_ele.is_none() {
                    current_ele = text.trim().parse::<f64>().ok();
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"trk" => {
                    // Only the first track is read.
                    in_trk = false;
                }
                b"name" => in_name = false,
                b"ele" => in_ele = false,
                b"trkpt" => {
                    if let Some((lon, lat)) = current.take() {
                        let ele = if force_ele {
                            default_ele
                        } else {
                            current_ele.unwrap_or(default_ele)
                        };
                        points.push(TrackPoint::new(lon, lat, ele));
                    }
                    current_ele = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_trk {
        return Err(GpxError::NoTrack);
    }
    if points.len() < 2 {
        return Err(GpxError::TooFewPoints(points.len()));
    }

    let info = summarize(&name, &points);
    Ok((points, info))
}

fn read_lon_lat(e: &quick_xml::events::BytesStart) -> Option<(f64, f64)> {
    let mut lon = None;
    let mut lat = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok()?;
        match attr.key.as_ref() {
            b"lon" => lon = value.parse::<f64>().ok(),
            b"lat" => lat = value.parse::<f64>().ok(),
            _ => {}
        }
    }
    Some((lon?, lat?))
}

fn summarize(name: &str, points: &[TrackPoint]) -> TrackInfo {
    let mut distance = 0.0;
    let mut min_ele = f64::INFINITY;
    let mut max_ele = f64::NEG_INFINITY;
    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut has_elevation = false;

    for (i, p) in points.iter().enumerate() {
        min_ele = min_ele.min(p.ele);
        max_ele = max_ele.max(p.ele);
        if p.ele != 0.0 && p.ele != 1.0 {
            has_elevation = true;
        }
        if i > 0 {
            let prev = &points[i - 1];
            distance += prev
                .point
                .vincenty_distance(&p.point)
                .map_or(f64::NAN, |d| d);
            let dz = p.ele - prev.ele;
            if dz > 0.0 {
                gain += dz;
            } else {
                loss -= dz;
            }
        }
    }

    TrackInfo {
        name: name.to_string(),
        points: points.len(),
        distance,
        min_ele,
        max_ele,
        gain,
        loss,
        has_elevation,
        start: points[0].point,
        end: points[points.len() - 1].point,
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    const TWO_SEGMENTS: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning loop</name>
    <trkseg>
      <trkpt lat="48.0" lon="9.0"><ele>310.2</ele></trkpt>
      <trkpt lat="48.001" lon="9.0"><ele>311.0</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="48.002" lon="9.001"><ele>309.5</ele></trkpt>
      <trkpt lat="48.003" lon="9.002"/>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn points_in_document_order() {
        let (points, info) = parse_gpx(TWO_SEGMENTS, 1.0, false).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(info.points, 4);
        assert_eq!(info.name, "Morning loop");
        assert_eq!(points[0].lat(), 48.0);
        assert_eq!(points[1].lat(), 48.001);
        assert_eq!(points[2].lon(), 9.001);
        // no <ele> on the last point
        assert_eq!(points[3].ele, 1.0);
        assert!(info.has_elevation);
        assert_eq!(info.start, Point::new(9.0, 48.0));
        assert_eq!(info.end, Point::new(9.002, 48.003));
        assert_relative_eq!(info.gain, 0.8, epsilon = 1.0e-9);
        assert_relative_eq!(info.loss, 1.5, epsilon = 1.0e-9);
    }

    #[test]
    fn elevation_override() {
        let (points, info) = parse_gpx(TWO_SEGMENTS, 5.5, true).unwrap();
        assert!(points.iter().all(|p| p.ele == 5.5));
        assert!(info.has_elevation);
        assert_eq!(info.gain, 0.0);
    }

    #[test]
    fn default_elevation_reads_as_flat() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="1.0" lon="1.0"/>
            <trkpt lat="1.1" lon="1.0"/>
        </trkseg></trk></gpx>"#;
        let (_, info) = parse_gpx(gpx, 1.0, false).unwrap();
        assert!(!info.has_elevation);
        let (_, info) = parse_gpx(gpx, 0.0, false).unwrap();
        assert!(!info.has_elevation);
    }

    #[test]
    fn no_track() {
        let err = parse_gpx("<gpx><wpt lat=\"1\" lon=\"2\"/></gpx>", 1.0, false).unwrap_err();
        assert!(matches!(err, GpxError::NoTrack));
    }

    #[test]
    fn too_few_points() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1.0" lon="1.0"/></trkseg></trk></gpx>"#;
        let err = parse_gpx(gpx, 1.0, false).unwrap_err();
        assert!(matches!(err, GpxError::TooFewPoints(1)));
    }

    #[test]
    fn malformed_xml() {
        let err = parse_gpx("<gpx><trk><trkseg></trk></gpx>", 1.0, false).unwrap_err();
        assert!(matches!(err, GpxError::MalformedXml(_)));
    }

    #[test]
    fn only_first_track_is_read() {
        let gpx = r#"<gpx>
          <trk><name>first</name><trkseg>
            <trkpt lat="1.0" lon="1.0"/><trkpt lat="1.1" lon="1.0"/>
          </trkseg></trk>
          <trk><name>second</name><trkseg>
            <trkpt lat="9.0" lon="9.0"/>
          </trkseg></trk>
        </gpx>"#;
        let (points, info) = parse_gpx(gpx, 1.0, false).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(info.name, "first");
    }
}
