use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::Img2GpxError;
use crate::model::TrackPoint;

/// One metadata record as produced by `exiftool -j -n <file>`. Only
/// the fields feeding the track pipeline are kept; everything else in
/// the record is tolerated and dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct ExifMetadata {
    #[serde(rename = "SourceFile")]
    pub source_file: String,
    #[serde(rename = "GPSPosition", default)]
    pub gps_position: Option<String>,
    #[serde(rename = "DateTimeOriginal", default)]
    pub date_time_original: Option<String>,
    #[serde(rename = "OffsetTimeOriginal", default)]
    pub offset_time_original: Option<String>,
    #[serde(rename = "GPSAltitude", default)]
    pub gps_altitude: Option<f64>,
}

impl ExifMetadata {
    /// Normalize this record into a [`TrackPoint`], or fail with the
    /// reason. Failures are per-item: the caller logs and moves on.
    pub fn to_track_point(&self) -> Result<TrackPoint, Img2GpxError> {
        let position = self
            .gps_position
            .as_deref()
            .ok_or(Img2GpxError::MissingField {
                field: "GPSPosition",
            })?;
        let tokens: Vec<&str> = position.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.len() != 2 {
            return Err(Img2GpxError::InvalidGpsPosition {
                value: position.to_string(),
            });
        }
        let lat = parse_coordinate(tokens[0], "lat")?;
        let lon = parse_coordinate(tokens[1], "lon")?;

        let raw_time = self
            .date_time_original
            .as_deref()
            .ok_or(Img2GpxError::MissingField {
                field: "DateTimeOriginal",
            })?;
        let time = parse_capture_time(raw_time, self.offset_time_original.as_deref())?;

        Ok(TrackPoint {
            lat,
            lon,
            ele: self.gps_altitude,
            time,
            heart_rate: None,
            meta: Some(base_name(&self.source_file)),
        })
    }
}

fn parse_coordinate(token: &str, axis: &'static str) -> Result<f64, Img2GpxError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Img2GpxError::InvalidCoordinate {
            axis,
            value: token.to_string(),
        })
}

/// Resolve an exiftool capture timestamp (`YYYY:MM:DD HH:MM:SS`) into
/// an absolute instant. With an offset (`±HH:MM`) the wall-clock time
/// is anchored at that UTC offset; without one it is interpreted in
/// the process-local timezone.
pub fn parse_capture_time(
    raw: &str,
    offset: Option<&str>,
) -> Result<DateTime<Utc>, Img2GpxError> {
    let naive = parse_wall_clock(raw)?;
    let resolved = match offset {
        Some(spec) => {
            let offset: FixedOffset =
                spec.parse().map_err(|_| Img2GpxError::InvalidTimestamp {
                    value: format!("{raw} {spec}"),
                })?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    };
    resolved.ok_or_else(|| Img2GpxError::InvalidTimestamp {
        value: raw.to_string(),
    })
}

fn parse_wall_clock(raw: &str) -> Result<NaiveDateTime, Img2GpxError> {
    let invalid = || Img2GpxError::InvalidTimestamp {
        value: raw.to_string(),
    };

    let (date, time) = raw.split_once(' ').ok_or_else(invalid)?;
    let date_parts: Vec<&str> = date.split(':').collect();
    let time_parts: Vec<&str> = time.split(':').collect();
    if date_parts.len() != 3 || time_parts.len() != 3 {
        return Err(invalid());
    }

    let year: i32 = date_parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = date_parts[1].parse().map_err(|_| invalid())?;
    let day: u32 = date_parts[2].parse().map_err(|_| invalid())?;
    let hour: u32 = time_parts[0].parse().map_err(|_| invalid())?;
    let minute: u32 = time_parts[1].parse().map_err(|_| invalid())?;
    let second: u32 = time_parts[2].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(invalid)
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Run `exiftool -j -n <path>` and decode its one-record JSON output.
/// A process error or anything on stderr rejects this single file.
pub async fn read_exif_metadata(path: &Path) -> Result<ExifMetadata, Img2GpxError> {
    debug!("Running exiftool on {}", path.display());
    let output = Command::new("exiftool")
        .arg("-j")
        .arg("-n")
        .arg(path)
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stderr.trim().is_empty() {
        return Err(Img2GpxError::Exiftool {
            message: stderr.trim().to_string(),
        });
    }

    let mut records: Vec<ExifMetadata> = serde_json::from_slice(&output.stdout)?;
    if records.len() != 1 {
        return Err(Img2GpxError::Exiftool {
            message: format!("expected one metadata record, got {}", records.len()),
        });
    }
    Ok(records.swap_remove(0))
}
