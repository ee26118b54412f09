use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Img2GpxError;

/// A single timestamped geographic sample, normalized from image
/// metadata or parsed back from an existing GPX file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: DateTime<Utc>,
    pub heart_rate: Option<f64>,
    /// Free-text annotation, typically the originating file name.
    /// Emitted as sidecar extension data, ignored on parse-back.
    pub meta: Option<String>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64, time: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time,
            heart_rate: None,
            meta: None,
        }
    }
}

/// A named point of interest, independent of the time-ordered track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewPoint {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    #[serde(default)]
    pub ele: Option<f64>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub sym: Option<String>,
}

impl ViewPoint {
    /// Schema-checked decode of one untyped viewpoint entry. A
    /// structural mismatch is a per-item rejection, never fatal for
    /// the surrounding batch.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Img2GpxError> {
        let vp: ViewPoint = serde_json::from_value(value.clone())
            .map_err(|e| Img2GpxError::InvalidViewpoint {
                reason: e.to_string(),
            })?;
        if vp.name.trim().is_empty() {
            return Err(Img2GpxError::InvalidViewpoint {
                reason: "empty name".to_string(),
            });
        }
        Ok(vp)
    }
}

/// A contiguous run of time-ordered points, typically one calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

/// The aggregate unit handed to the GPX writer.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub track_type: Option<String>,
    pub segments: Vec<TrackSegment>,
    pub viewpoints: Vec<ViewPoint>,
    /// Document generation timestamp, metadata only.
    pub time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn viewpoint_accepts_minimal_entry() {
        let vp = ViewPoint::from_value(&json!({"lat": 1, "lon": 2, "name": "A"})).unwrap();
        assert!((vp.lat - 1.0).abs() < 1e-10);
        assert!((vp.lon - 2.0).abs() < 1e-10);
        assert_eq!(vp.name, "A");
        assert!(vp.ele.is_none());
    }

    #[test]
    fn viewpoint_rejects_mistyped_lat() {
        let err = ViewPoint::from_value(&json!({"lat": "bad", "lon": 2, "name": "A"}));
        assert!(matches!(err, Err(Img2GpxError::InvalidViewpoint { .. })));
    }

    #[test]
    fn viewpoint_rejects_missing_name() {
        let err = ViewPoint::from_value(&json!({"lat": 1, "lon": 2}));
        assert!(matches!(err, Err(Img2GpxError::InvalidViewpoint { .. })));
    }

    #[test]
    fn viewpoint_rejects_blank_name() {
        let err = ViewPoint::from_value(&json!({"lat": 1, "lon": 2, "name": "  "}));
        assert!(matches!(err, Err(Img2GpxError::InvalidViewpoint { .. })));
    }

    #[test]
    fn viewpoint_keeps_optional_fields() {
        let vp = ViewPoint::from_value(&json!({
            "lat": 48.16,
            "lon": 24.5,
            "name": "Hoverla summit",
            "ele": 2061.0,
            "desc": "Highest peak of the Ukrainian Carpathians",
            "sym": "Summit"
        }))
        .unwrap();
        assert_eq!(vp.ele, Some(2061.0));
        assert_eq!(vp.sym.as_deref(), Some("Summit"));
    }
}
