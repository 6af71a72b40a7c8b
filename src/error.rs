//! Error types for QRFORGE operations

use std::fmt;
use thiserror::Error;

/// Result type alias using QRFORGE's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback text shown when generation fails without a server message
pub const GENERATE_FAILED: &str = "Failed to generate QR code";

/// Local file operations that can fail on behalf of the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Reading the logo attached to a request
    ReadLogo,
    /// Writing a temp file and handing it to the share mechanism
    Share,
    /// Writing a temp file and importing it into the photo library
    Save,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileOperation::ReadLogo => "read logo",
            FileOperation::Share => "share",
            FileOperation::Save => "save",
        };
        f.write_str(label)
    }
}

/// Photo library capabilities guarded by a permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAccess {
    /// Reading images to pick a logo
    Read,
    /// Writing generated images into the library
    Write,
}

/// Main error type for QRFORGE operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any request is dispatched
    #[error("Validation error: {0}")]
    Validation(String),

    /// Share or save requested before a QR code exists
    #[error("No QR code has been generated yet")]
    NoImage,

    /// Photo library access denied
    #[error("Photo library {0:?} access denied")]
    Permission(PhotoAccess),

    /// Network failure, timeout or non-2xx response
    #[error("Transport error: {}", message.as_deref().unwrap_or("request failed"))]
    Transport {
        /// Server supplied error text, when the response carried one
        message: Option<String>,
    },

    /// Response missing the expected field or carrying a malformed payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local write, share or save failure
    #[error("Failed to {operation}: {source}")]
    FileSystem {
        /// Operation that was being performed
        operation: FileOperation,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an I/O failure with the operation it interrupted.
    pub fn file_system(operation: FileOperation, source: std::io::Error) -> Self {
        Error::FileSystem { operation, source }
    }

    /// Text suitable for a transient user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(message) => message.clone(),
            Error::NoImage => "Generate a QR code first".to_string(),
            Error::Permission(PhotoAccess::Read) => {
                "We need access to your photos to select a logo".to_string()
            }
            Error::Permission(PhotoAccess::Write) => {
                "We need access to your photos to save the QR code".to_string()
            }
            Error::Transport { message } => message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| GENERATE_FAILED.to_string()),
            Error::Decode(_) => GENERATE_FAILED.to_string(),
            Error::FileSystem { operation, .. } => match operation {
                FileOperation::ReadLogo => GENERATE_FAILED.to_string(),
                FileOperation::Share => "Failed to share QR code".to_string(),
                FileOperation::Save => "Failed to save QR code".to_string(),
            },
            Error::Io(_) | Error::Config(_) | Error::Other(_) => self.to_string(),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Decode(format!("Image error: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(format!("JSON error: {}", e))
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Decode(format!("Hex decode error: {}", e))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(format!("Base64 decode error: {}", e))
    }
}
