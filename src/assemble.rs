use chrono::{Datelike, TimeZone};

use crate::model::{TrackPoint, TrackSegment};

/// Concatenate point collections from several sources. No
/// deduplication: overlapping sources (say a photo and a GPX extension
/// covering the same instant) legitimately contribute duplicates.
pub fn merge(sources: Vec<Vec<TrackPoint>>) -> Vec<TrackPoint> {
    sources.into_iter().flatten().collect()
}

/// Stable ascending sort by instant. Points sharing a timestamp keep
/// their original relative order.
pub fn sort_by_time(points: &mut [TrackPoint]) {
    points.sort_by_key(|p| p.time);
}

/// Partition time-sorted points into segments at day boundaries.
///
/// The boundary compares only the calendar day-of-month in the given
/// zone, not the full date: day 31 followed by day 1 splits, while day
/// 15 of two different months lands in the same segment. The CLI passes
/// [`chrono::Local`]; a fixed zone gives deterministic tests.
pub fn split_segments<Tz: TimeZone>(points: Vec<TrackPoint>, tz: &Tz) -> Vec<TrackSegment> {
    let mut segments: Vec<TrackSegment> = Vec::new();
    let mut current = TrackSegment::default();
    let mut prev_day: Option<u32> = None;

    for point in points {
        let day = point.time.with_timezone(tz).day();
        if prev_day.is_some_and(|d| d != day) {
            segments.push(std::mem::take(&mut current));
        }
        prev_day = Some(day);
        current.points.push(point);
    }
    if !current.points.is_empty() {
        segments.push(current);
    }
    segments
}

/// UTC calendar date of a point, used as the per-day file suffix.
pub fn day_stamp(point: &TrackPoint) -> String {
    point.time.format("%Y-%m-%d").to_string()
}
