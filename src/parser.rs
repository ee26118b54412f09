use chrono::{DateTime, Utc};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Img2GpxError;
use crate::model::TrackPoint;

type Result<T> = std::result::Result<T, Img2GpxError>;

/// Parse a GPX 1.1 document into the track points of all its tracks,
/// in document order. Waypoints and routes are ignored; only track
/// points feed the extend workflow. A structural problem (no `<gpx>`
/// root, a `<trkpt>` without parseable coordinates) fails the whole
/// document; the caller decides whether to skip the file.
pub fn parse_gpx(xml: &str) -> Result<Vec<TrackPoint>> {
    let mut reader = Reader::from_str(xml);
    let mut points = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"gpx" => saw_root = true,
                b"trk" if saw_root => parse_track(&mut reader, &mut points)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"gpx" {
                    saw_root = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(Img2GpxError::MissingElement { element: "gpx" });
    }
    Ok(points)
}

fn parse_track(reader: &mut Reader<&[u8]>, points: &mut Vec<TrackPoint>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkseg" => parse_segment(reader, points)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }
    Ok(())
}

fn parse_segment(reader: &mut Reader<&[u8]>, points: &mut Vec<TrackPoint>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_trkpt(&e, reader)? {
                        points.push(pt);
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"trkpt" => {
                // Attributes still validate, but without children there
                // is no <time>, so the point cannot be ordered.
                let (lat, lon) = parse_lat_lon(&e)?;
                debug!("Dropping <trkpt> at {lat},{lon}: no <time> child");
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }
    Ok(())
}

/// Parse one `<trkpt>` and its children. Returns `None` when the point
/// carries no usable `<time>` value; such points are dropped because
/// they cannot be ordered or segmented.
fn parse_trkpt<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<TrackPoint>> {
    let (lat, lon) = parse_lat_lon(start)?;
    let end_name = start.name().0.to_vec();

    let mut ele: Option<f64> = None;
    let mut time: Option<DateTime<Utc>> = None;
    let mut heart_rate: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = reader.read_text(e.name())?;
                    if ele.is_none() {
                        ele = text.trim().parse::<f64>().ok();
                    }
                }
                b"time" => {
                    let text = reader.read_text(e.name())?;
                    if time.is_none() {
                        time = DateTime::parse_from_rfc3339(text.trim())
                            .ok()
                            .map(|dt| dt.with_timezone(&Utc));
                    }
                }
                b"extensions" => {
                    let hr = parse_extensions(reader)?;
                    if heart_rate.is_none() {
                        heart_rate = hr;
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }

    let Some(time) = time else {
        debug!("Dropping <trkpt> at {lat},{lon}: no usable <time>");
        return Ok(None);
    };

    Ok(Some(TrackPoint {
        lat,
        lon,
        ele,
        time,
        heart_rate,
        meta: None,
    }))
}

/// Heart rate lives behind an optional structural descent:
/// `<extensions>` → `<gpxtpx:TrackPointExtension>` → `<gpxtpx:hr>`.
/// Absence at any level yields `None`, never an error.
fn parse_extensions(reader: &mut Reader<&[u8]>) -> Result<Option<f64>> {
    let mut heart_rate = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"TrackPointExtension" => {
                    let hr = parse_trackpoint_extension(reader)?;
                    if heart_rate.is_none() {
                        heart_rate = hr;
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"extensions" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(heart_rate)
}

fn parse_trackpoint_extension(reader: &mut Reader<&[u8]>) -> Result<Option<f64>> {
    let mut heart_rate = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"hr" => {
                    let text = reader.read_text(e.name())?;
                    if heart_rate.is_none() {
                        heart_rate = text.trim().parse::<f64>().ok();
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"TrackPointExtension" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Img2GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(heart_rate)
}

/// Parse lat/lon attributes from a `<trkpt>` start tag. Missing or
/// malformed coordinates are a structural error for the document.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| Img2GpxError::XmlParse(e.into()))?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"lat" => {
                lat = Some(val.parse::<f64>().map_err(|_| {
                    Img2GpxError::InvalidAttribute {
                        element: "trkpt",
                        attribute: "lat",
                        value: val.to_string(),
                    }
                })?);
            }
            b"lon" => {
                lon = Some(val.parse::<f64>().map_err(|_| {
                    Img2GpxError::InvalidAttribute {
                        element: "trkpt",
                        attribute: "lon",
                        value: val.to_string(),
                    }
                })?);
            }
            _ => {}
        }
    }

    let lat = lat.ok_or(Img2GpxError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(Img2GpxError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_simple_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Morning Hike</name>
    <trkseg>
      <trkpt lat="48.09" lon="24.72">
        <ele>1450.5</ele>
        <time>2023-08-02T07:15:00Z</time>
      </trkpt>
      <trkpt lat="48.10" lon="24.73">
        <time>2023-08-02T07:20:00Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].lat - 48.09).abs() < 1e-10);
        assert_eq!(points[0].ele, Some(1450.5));
        assert_eq!(
            points[0].time,
            Utc.with_ymd_and_hms(2023, 8, 2, 7, 15, 0).unwrap()
        );
        assert!(points[1].ele.is_none());
    }

    #[test]
    fn flattens_multiple_tracks_and_segments() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><time>2023-08-01T10:00:00Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="2.0" lon="2.0"><time>2023-08-01T11:00:00Z</time></trkpt>
    </trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="3.0" lon="3.0"><time>2023-08-01T12:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        let lats: Vec<f64> = points.iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn drops_point_without_time() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><ele>10</ele></trkpt>
      <trkpt lat="2.0" lon="2.0"><time>2023-08-01T10:00:00Z</time></trkpt>
      <trkpt lat="3.0" lon="3.0"/>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].lat - 2.0).abs() < 1e-10);
    }

    #[test]
    fn heart_rate_extracted_from_garmin_extensions() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="48.09" lon="24.72">
        <time>2023-08-02T07:15:00Z</time>
        <extensions>
          <gpxtpx:TrackPointExtension xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <gpxtpx:hr>150</gpxtpx:hr>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert_eq!(points[0].heart_rate, Some(150.0));
    }

    #[test]
    fn absent_extensions_yield_no_heart_rate() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="48.09" lon="24.72"><time>2023-08-02T07:15:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert!(points[0].heart_rate.is_none());
    }

    #[test]
    fn empty_extensions_yield_no_heart_rate() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="48.09" lon="24.72">
        <time>2023-08-02T07:15:00Z</time>
        <extensions></extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert!(points[0].heart_rate.is_none());
    }

    #[test]
    fn missing_root_is_structural_error() {
        let err = parse_gpx(r#"<?xml version="1.0"?><notgpx></notgpx>"#);
        assert!(matches!(
            err,
            Err(Img2GpxError::MissingElement { element: "gpx" })
        ));
    }

    #[test]
    fn missing_lat_is_structural_error() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lon="24.72"><time>2023-08-02T07:15:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        assert!(matches!(
            parse_gpx(xml),
            Err(Img2GpxError::MissingAttribute {
                element: "trkpt",
                attribute: "lat"
            })
        ));
    }

    #[test]
    fn malformed_lon_is_structural_error() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="48.09" lon="east"><time>2023-08-02T07:15:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        assert!(matches!(
            parse_gpx(xml),
            Err(Img2GpxError::InvalidAttribute {
                element: "trkpt",
                attribute: "lon",
                ..
            })
        ));
    }

    #[test]
    fn waypoints_are_ignored_on_decode() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="48.16" lon="24.50"><name>Summit</name></wpt>
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><time>2023-08-01T10:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn empty_document_has_no_points() {
        let points = parse_gpx(r#"<?xml version="1.0"?><gpx version="1.1"></gpx>"#).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn unparseable_time_drops_the_point() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><time>yesterday</time></trkpt>
      <trkpt lat="2.0" lon="2.0"><time>2023-08-01T10:00:00+02:00</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let points = parse_gpx(xml).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(
            points[0].time,
            Utc.with_ymd_and_hms(2023, 8, 1, 8, 0, 0).unwrap()
        );
    }
}
