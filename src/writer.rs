use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{Track, TrackPoint, TrackSegment, ViewPoint};

const GPX_OPEN: &str = concat!(
    r#"<gpx version="1.1" creator="img2gpx" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd "#,
    r#"http://www.garmin.com/xmlschemas/GpxExtensions/v3 "#,
    r#"http://www.garmin.com/xmlschemas/TrackPointExtension/v1 "#,
    r#"http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd" "#,
    r#"xmlns="http://www.topografix.com/GPX/1/1" "#,
    r#"xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1" "#,
    r#"xmlns:gpxx="http://www.garmin.com/xmlschemas/GpxExtensions/v3">"#,
);

/// Serialize a [`Track`] as a GPX 1.1 document. Element order is fixed
/// and reproduced exactly for consumers expecting it: declaration, gpx
/// root, optional metadata time, then one `<trk>` holding name, type,
/// viewpoints and segments.
///
/// Numbers use the default float formatting; no precision truncation.
pub fn track_to_gpx(track: &Track) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string());
    lines.push(GPX_OPEN.to_string());

    if let Some(time) = track.time {
        lines.push("<metadata>".to_string());
        lines.push(format!("<time>{}</time>", format_time(time)));
        lines.push("</metadata>".to_string());
    }

    lines.push("<trk>".to_string());
    lines.push(format!("<name>{}</name>", escape_xml(&track.name)));
    if let Some(track_type) = track.track_type.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("<type>{}</type>", escape_xml(track_type)));
    }
    for viewpoint in &track.viewpoints {
        lines.push(viewpoint_to_xml(viewpoint));
    }
    for segment in &track.segments {
        lines.push(segment_to_xml(segment));
    }
    lines.push("</trk>".to_string());
    lines.push("</gpx>".to_string());
    lines.join("\n")
}

fn segment_to_xml(segment: &TrackSegment) -> String {
    let mut lines = vec!["<trkseg>".to_string()];
    for point in &segment.points {
        lines.push(trackpoint_to_xml(point));
    }
    lines.push("</trkseg>".to_string());
    lines.join("\n")
}

fn trackpoint_to_xml(point: &TrackPoint) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(r#"<trkpt lat="{}" lon="{}">"#, point.lat, point.lon));
    // An elevation of exactly 0 is treated as absent. Kept for output
    // compatibility with existing consumers.
    if let Some(ele) = point.ele.filter(|e| *e != 0.0) {
        lines.push(format!("  <ele>{ele}</ele>"));
    }
    lines.push(format!("  <time>{}</time>", format_time(point.time)));

    let heart_rate = point.heart_rate.filter(|hr| *hr != 0.0);
    let meta = point.meta.as_deref().filter(|m| !m.is_empty());
    if heart_rate.is_some() || meta.is_some() {
        lines.push("  <extensions>".to_string());
        if let Some(hr) = heart_rate {
            lines.push("    <gpxtpx:TrackPointExtension>".to_string());
            lines.push(format!("      <gpxtpx:hr>{hr}</gpxtpx:hr>"));
            lines.push("    </gpxtpx:TrackPointExtension>".to_string());
        }
        if let Some(meta) = meta {
            lines.push(format!("    <meta>{}</meta>", escape_xml(meta)));
        }
        lines.push("  </extensions>".to_string());
    }
    lines.push("</trkpt>".to_string());
    lines.join("\n")
}

fn viewpoint_to_xml(viewpoint: &ViewPoint) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        r#"<wpt lat="{}" lon="{}">"#,
        viewpoint.lat, viewpoint.lon
    ));
    lines.push(format!("  <name>{}</name>", escape_xml(&viewpoint.name)));
    if let Some(ele) = viewpoint.ele.filter(|e| *e != 0.0) {
        lines.push(format!("  <ele>{ele}</ele>"));
    }
    if let Some(desc) = viewpoint.desc.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("  <desc>{}</desc>", escape_xml(desc)));
    }
    if let Some(sym) = viewpoint.sym.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("  <sym>{}</sym>", escape_xml(sym)));
    }
    lines.push("</wpt>".to_string());
    lines.join("\n")
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
