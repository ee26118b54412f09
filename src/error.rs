use std::io;

#[derive(Debug)]
pub enum Img2GpxError {
    XmlParse(quick_xml::Error),
    MissingElement {
        element: &'static str,
    },
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    MissingField {
        field: &'static str,
    },
    InvalidGpsPosition {
        value: String,
    },
    InvalidCoordinate {
        axis: &'static str,
        value: String,
    },
    InvalidTimestamp {
        value: String,
    },
    InvalidViewpoint {
        reason: String,
    },
    ViewpointsNotArray,
    Exiftool {
        message: String,
    },
    Json(serde_json::Error),
    Io(io::Error),
}

impl std::fmt::Display for Img2GpxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlParse(e) => write!(f, "XML parse error: {e}"),
            Self::MissingElement { element } => {
                write!(f, "Missing element <{element}>")
            }
            Self::MissingAttribute { element, attribute } => {
                write!(f, "Missing attribute '{attribute}' on <{element}>")
            }
            Self::InvalidAttribute {
                element,
                attribute,
                value,
            } => write!(
                f,
                "Invalid value '{value}' for attribute '{attribute}' on <{element}>"
            ),
            Self::MissingField { field } => write!(f, "Missing field '{field}'"),
            Self::InvalidGpsPosition { value } => {
                write!(f, "Invalid GPS position '{value}'")
            }
            Self::InvalidCoordinate { axis, value } => {
                write!(f, "Invalid {axis} '{value}'")
            }
            Self::InvalidTimestamp { value } => {
                write!(f, "Invalid timestamp '{value}'")
            }
            Self::InvalidViewpoint { reason } => {
                write!(f, "Invalid viewpoint: {reason}")
            }
            Self::ViewpointsNotArray => {
                write!(f, "Viewpoints document is not a JSON array")
            }
            Self::Exiftool { message } => write!(f, "exiftool failed: {message}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Img2GpxError {}

impl From<quick_xml::Error> for Img2GpxError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e)
    }
}

impl From<serde_json::Error> for Img2GpxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<io::Error> for Img2GpxError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
