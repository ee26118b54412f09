use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{Parser, ValueHint};
use log::{info, warn};

use img2gpx::model::{Track, TrackPoint, TrackSegment, ViewPoint};
use img2gpx::{assemble, exif, parser, viewpoints, writer};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

#[derive(Parser, Debug)]
#[command(
    name = "img2gpx",
    version,
    about = "Build a GPX track from geotagged photos"
)]
struct Cli {
    /// Image files to read GPS metadata from
    #[arg(value_hint = ValueHint::FilePath)]
    images: Vec<PathBuf>,

    /// Also scan a folder (non-recursive) for images
    #[arg(long, value_hint = ValueHint::DirPath)]
    folder: Option<PathBuf>,

    /// Track name
    #[arg(short, long, default_value = "My Track")]
    name: String,

    /// Track type
    #[arg(short = 't', long = "type", default_value = "hiking")]
    track_type: String,

    /// Output file
    #[arg(short, long, default_value = "track.gpx", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Viewpoints JSON file
    #[arg(long, value_hint = ValueHint::FilePath)]
    viewpoints: Option<PathBuf>,

    /// Existing GPX files whose points are merged into the new track
    #[arg(long = "extend", value_hint = ValueHint::FilePath)]
    extend: Vec<PathBuf>,

    /// Write one file per calendar day instead of a single document
    #[arg(long)]
    split_days: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let images = resolve_images(&cli)?;
    if images.is_empty() && cli.extend.is_empty() {
        bail!("no input files");
    }
    info!("{} input files", images.len());

    // Pre-flight: a referenced viewpoints file must be readable before
    // any extraction work starts.
    let viewpoints = match &cli.viewpoints {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read viewpoints file {}", path.display()))?;
            viewpoints::parse_viewpoints(&text)
                .with_context(|| format!("Failed to decode viewpoints file {}", path.display()))?
        }
        None => Vec::new(),
    };

    let mut sources: Vec<Vec<TrackPoint>> = Vec::new();

    let mut image_points = Vec::new();
    for path in &images {
        let normalized = exif::read_exif_metadata(path)
            .await
            .and_then(|meta| meta.to_track_point());
        match normalized {
            Ok(point) => image_points.push(point),
            Err(err) => warn!("Skipping {}: {err}", path.display()),
        }
    }
    info!(
        "{} of {} images produced points",
        image_points.len(),
        images.len()
    );
    sources.push(image_points);

    for path in &cli.extend {
        match read_extend_file(path) {
            Ok(points) => {
                info!(
                    "Extending with {} points from {}",
                    points.len(),
                    path.display()
                );
                sources.push(points);
            }
            Err(err) => warn!("Skipping extend file {}: {err}", path.display()),
        }
    }

    let mut points = assemble::merge(sources);
    assemble::sort_by_time(&mut points);
    let segments = assemble::split_segments(points, &Local);

    if cli.split_days {
        write_per_day(&cli, segments, viewpoints)
    } else {
        let track = Track {
            name: cli.name.clone(),
            track_type: Some(cli.track_type.clone()),
            segments,
            viewpoints,
            time: Some(Utc::now()),
        };
        write_track(&cli.output, &track)
    }
}

fn resolve_images(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut images = cli.images.clone();
    if let Some(folder) = &cli.folder {
        if !folder.is_dir() {
            bail!("Folder {} does not exist", folder.display());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(folder)
            .with_context(|| format!("Failed to read folder {}", folder.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                found.push(path);
            }
        }
        // Directory order is arbitrary; sorted paths keep logs stable.
        // Track order comes from the time sort either way.
        found.sort();
        images.extend(found);
    }
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn read_extend_file(path: &Path) -> Result<Vec<TrackPoint>> {
    let text = fs::read_to_string(path)?;
    Ok(parser::parse_gpx(&text)?)
}

fn write_per_day(cli: &Cli, segments: Vec<TrackSegment>, viewpoints: Vec<ViewPoint>) -> Result<()> {
    if segments.is_empty() {
        warn!("No points resolved; nothing to write in day-split mode");
        return Ok(());
    }
    let stem = cli
        .output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    for segment in segments {
        let Some(first) = segment.points.first() else {
            continue;
        };
        let stamp = assemble::day_stamp(first);
        let path = cli.output.with_file_name(format!("{stem}-{stamp}.gpx"));
        let track = Track {
            name: cli.name.clone(),
            track_type: Some(cli.track_type.clone()),
            segments: vec![segment],
            viewpoints: viewpoints.clone(),
            time: Some(Utc::now()),
        };
        write_track(&path, &track)?;
    }
    Ok(())
}

fn write_track(path: &Path, track: &Track) -> Result<()> {
    let gpx = writer::track_to_gpx(track);
    info!("Saving to file: {}", path.display());
    fs::write(path, gpx).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(has_image_extension(Path::new("/trip/IMG_0001.JPG")));
        assert!(has_image_extension(Path::new("/trip/img_0002.heic")));
        assert!(has_image_extension(Path::new("photo.Jpeg")));
        assert!(!has_image_extension(Path::new("/trip/track.gpx")));
        assert!(!has_image_extension(Path::new("/trip/noext")));
    }

    #[test]
    fn split_file_name_derives_from_output_stem() {
        let output = PathBuf::from("/trips/carpathians.gpx");
        let stem = output.file_stem().and_then(|s| s.to_str()).unwrap();
        let path = output.with_file_name(format!("{stem}-2023-08-02.gpx"));
        assert_eq!(path, PathBuf::from("/trips/carpathians-2023-08-02.gpx"));
    }
}
