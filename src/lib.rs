//! Track-building pipeline: normalize timestamped geographic samples
//! from image metadata and existing GPX files into one canonical point
//! model, order and segment them by day, and serialize the result as
//! GPX 1.1 (with a matching decoder for track extension).

pub mod assemble;
pub mod error;
pub mod exif;
pub mod model;
pub mod parser;
pub mod viewpoints;
pub mod writer;

pub use error::Img2GpxError;
pub use model::{Track, TrackPoint, TrackSegment, ViewPoint};
