//! Error type shared by all generation stages.
//!
//! Generation either produces the complete table collection or fails, so
//! every error here aborts the run.

use super::Float;

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum GeneratorError {
    /// A configuration value is outside its valid range.
    InvalidParameter { name: &'static str, reason: String },
    /// A table handed to the quantizer has no usable range (all zero or constant).
    DegenerateTable,
    /// A value can't be narrowed to a 16 bit sample.
    SampleOutOfRange(Float),
    Io(io::Error),
    Json(serde_json::Error),
}

impl GeneratorError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        GeneratorError::InvalidParameter { name, reason: reason.into() }
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter {}: {}", name, reason)
            }
            GeneratorError::DegenerateTable => write!(f, "Table has no range to scale"),
            GeneratorError::SampleOutOfRange(value) => {
                write!(f, "Sample value {} can't be converted to 16 bit", value)
            }
            GeneratorError::Io(err) => write!(f, "I/O error: {}", err),
            GeneratorError::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeneratorError::Io(err) => Some(err),
            GeneratorError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for GeneratorError {
    fn from(err: io::Error) -> Self {
        GeneratorError::Io(err)
    }
}

impl From<serde_json::Error> for GeneratorError {
    fn from(err: serde_json::Error) -> Self {
        GeneratorError::Json(err)
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn invalid_parameter_names_the_field() {
    let err = GeneratorError::invalid("zone_step", "must be positive");
    assert_eq!(err.to_string(), "Invalid parameter zone_step: must be positive");
}

#[test]
fn io_error_is_kept_as_source() {
    use std::error::Error;
    let err: GeneratorError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(err.source().is_some());
    assert!(GeneratorError::DegenerateTable.source().is_none());
}
