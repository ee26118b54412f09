use log::warn;

use crate::error::Img2GpxError;
use crate::model::ViewPoint;

/// Decode a viewpoints document: a JSON array of viewpoint objects,
/// each validated independently. Non-conforming entries are skipped
/// with a warning; one malformed item never aborts the batch.
pub fn parse_viewpoints(json: &str) -> Result<Vec<ViewPoint>, Img2GpxError> {
    let doc: serde_json::Value = serde_json::from_str(json)?;
    let Some(items) = doc.as_array() else {
        return Err(Img2GpxError::ViewpointsNotArray);
    };

    let mut accepted = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match ViewPoint::from_value(item) {
            Ok(vp) => accepted.push(vp),
            Err(err) => warn!("Skipping viewpoint #{index}: {err}"),
        }
    }
    Ok(accepted)
}
