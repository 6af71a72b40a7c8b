//! QRFORGE - client for a remote QR code generation service
//!
//! The library collects a target URL and an optional logo, posts them as a
//! multipart form to a generation service, and turns the returned hexadecimal
//! PNG into a displayable data URI that can be previewed, shared or saved.
//!
//! # Features
//!
//! - **Request encoding**: multipart form with `url` and optional `logo` fields
//! - **Transport**: single `reqwest` attempt with error normalisation
//! - **Decoding**: strict hex to base64 transcoding into `data:image/png;base64,`
//! - **Output**: unique temp files, share command and photo library import
//!
//! # Example
//!
//! ```no_run
//! use qrforge::{HttpQrService, QrRequest, ServiceOptions, generate_image};
//!
//! #[tokio::main]
//! async fn main() -> qrforge::Result<()> {
//!     let service = HttpQrService::new(&ServiceOptions::default())?;
//!     let request = QrRequest::new("https://example.com", None)?;
//!
//!     let image = generate_image(&service, &request).await?;
//!     println!("{}", image.data_uri());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod preview;
pub mod request;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use error::{Error, Result};

pub use codec::{DATA_URI_PREFIX, DisplayableImage};
pub use config::{
    LogRotation, LoggingOptions, OutputOptions, PhotoOptions, QrforgeConfig, ServiceOptions,
};
pub use output::OutputSink;
pub use request::{LogoAttachment, QrRequest};
pub use session::{LoadingFlag, Notice, NoticeKind, Session, generate_image};
pub use transport::{HttpQrService, QrService, ServiceResponse};
