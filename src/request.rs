//! Generation requests and their multipart encoding

use crate::error::{Error, FileOperation, Result};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};

/// Form field carrying the target URL
pub const URL_FIELD: &str = "url";
/// Form field carrying the optional logo file
pub const LOGO_FIELD: &str = "logo";
/// MIME type used when the logo extension is not recognised
pub const GENERIC_IMAGE_MIME: &str = "image/*";

/// Map a file extension to an image MIME type.
///
/// Matching is case-insensitive; unknown or missing extensions map to
/// [`GENERIC_IMAGE_MIME`].
pub fn mime_for_extension(extension: Option<&str>) -> &'static str {
    let Some(extension) = extension else {
        return GENERIC_IMAGE_MIME;
    };

    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => GENERIC_IMAGE_MIME,
    }
}

/// Reference to a local image attached as the QR logo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAttachment {
    path: PathBuf,
}

impl LogoAttachment {
    /// Reference a local image file; it is only read when the request is encoded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the referenced file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component, used as the multipart filename
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "logo".to_string())
    }

    /// MIME type inferred from the file extension
    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(self.path.extension().and_then(|ext| ext.to_str()))
    }

    async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::file_system(FileOperation::ReadLogo, e))
    }
}

/// One generation request, built fresh for every generate action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrRequest {
    target_url: String,
    logo: Option<LogoAttachment>,
}

impl QrRequest {
    /// Validate the input and build a request.
    ///
    /// An empty URL is a [`Error::Validation`] and never reaches the network.
    pub fn new(target_url: impl Into<String>, logo: Option<LogoAttachment>) -> Result<Self> {
        let target_url = target_url.into();
        if target_url.is_empty() {
            return Err(Error::Validation("Please enter a URL".to_string()));
        }
        Ok(Self { target_url, logo })
    }

    /// URL to encode
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Attached logo, if any
    pub fn logo(&self) -> Option<&LogoAttachment> {
        self.logo.as_ref()
    }

    /// Encode the request as a multipart form, reading the logo from disk.
    pub async fn to_form(&self) -> Result<Form> {
        let form = Form::new().text(URL_FIELD, self.target_url.clone());

        let Some(logo) = &self.logo else {
            tracing::debug!(url = %self.target_url, "Encoded request without logo");
            return Ok(form);
        };

        let bytes = logo.read().await?;
        tracing::debug!(
            url = %self.target_url,
            logo = %logo.path().display(),
            mime = logo.mime_type(),
            bytes = bytes.len(),
            "Encoded request with logo"
        );

        let part = Part::bytes(bytes)
            .file_name(logo.file_name())
            .mime_str(logo.mime_type())
            .map_err(|e| Error::Other(format!("Invalid logo MIME type: {e}")))?;

        Ok(form.part(LOGO_FIELD, part))
    }
}
