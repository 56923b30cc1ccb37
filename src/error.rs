use std::{io, path::PathBuf};
use thiserror::Error;
#[cfg(feature = "cli")]
extern crate serde_json_path_to_error as serde_json;

/// Errors produced while using the bitfont crate
#[derive(Debug, Error)]
pub enum BitfontError {
    /// The caller supplied conflicting or invalid arguments
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot set property `{property}`: object is frozen")]
    /// A property was set on a property set after it was frozen
    ImmutableState {
        /// The name of the property
        property: String,
    },

    #[error("Unknown property `{name}`")]
    /// An undeclared, non-extension property was requested
    UnknownProperty {
        /// The name of the property requested
        name: String,
    },

    #[error("Invalid value {value:?} for property `{property}`: {reason}")]
    /// A raw property value could not be converted to its declared type
    InvalidValue {
        /// The name of the property
        property: String,
        /// The offending value, as text
        value: String,
        /// Why the conversion failed
        reason: String,
    },

    #[error("Lossy operation: {0}")]
    /// The operation would discard information and was not forced
    LossyOperation(String),

    #[error("No glyph found matching label {label}")]
    /// A glyph was not found
    GlyphNotFound {
        /// The label requested
        label: String,
    },

    #[error("Bad raster geometry: {0}")]
    /// Pixel data did not describe a rectangular raster
    Geometry(String),

    #[error("Unknown file type for file {path:?}")]
    /// The file type is unknown
    UnknownFileType {
        /// The path of the file
        path: PathBuf,
    },

    #[error("IO Error: {0}")]
    /// IO error
    IO(#[from] io::Error),

    #[error("JSON conversion error: {0}")]
    /// JSON conversion error
    JsonSerialize(#[from] serde_json::Error),

    #[error("Filter error: {0}")]
    /// General error when running a filter
    FilterError(String),
}

impl BitfontError {
    pub(crate) fn invalid(
        property: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BitfontError::InvalidValue {
            property: property.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
