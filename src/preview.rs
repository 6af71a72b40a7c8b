//! Inspection of generated images before they are shown

use crate::codec::DisplayableImage;
use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;

/// Basic facts about a generated PNG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded PNG size
    pub byte_len: usize,
}

/// Outcome of reading the QR symbol back out of a generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Content of the first decodable symbol, if any
    pub decoded: Option<String>,
    /// Whether the content equals the requested URL
    pub matches: bool,
}

fn load_png(image: &DisplayableImage) -> Result<(DynamicImage, usize)> {
    let bytes = image.to_bytes()?;
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
    Ok((decoded, bytes.len()))
}

/// Decode the PNG and report its dimensions.
///
/// Payloads that are not valid PNG fail with [`Error::Decode`].
pub fn inspect(image: &DisplayableImage) -> Result<ImageSummary> {
    let (decoded, byte_len) = load_png(image)?;
    Ok(ImageSummary {
        width: decoded.width(),
        height: decoded.height(),
        byte_len,
    })
}

/// Scan the generated image and compare its content with `expected_url`.
pub fn verify(image: &DisplayableImage, expected_url: &str) -> Result<Verification> {
    let (decoded, _) = load_png(image)?;
    let mut prepared = rqrr::PreparedImage::prepare(decoded.to_luma8());

    let decoded = prepared.detect_grids().iter().find_map(|grid| match grid.decode() {
        Ok((meta, content)) => {
            tracing::debug!(
                "Read back QR: version={:?}, ecc_level={:?}, length={}",
                meta.version,
                meta.ecc_level,
                content.len()
            );
            Some(content)
        }
        Err(e) => {
            tracing::debug!("Skipping undecodable grid: {:?}", e);
            None
        }
    });

    let matches = decoded.as_deref() == Some(expected_url);
    if !matches {
        tracing::warn!(expected = expected_url, decoded = decoded.as_deref(), "QR content mismatch");
    }

    Ok(Verification { decoded, matches })
}

/// Same as [`verify`] but turns a mismatch into an error.
pub fn ensure_encodes(image: &DisplayableImage, expected_url: &str) -> Result<()> {
    let verification = verify(image, expected_url)?;
    if verification.matches {
        Ok(())
    } else {
        Err(Error::Decode(format!(
            "QR code content {:?} does not match {expected_url}",
            verification.decoded
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use qrcode::QrCode;
    use std::io::Cursor;

    fn qr_png(content: &str) -> Vec<u8> {
        let code = QrCode::new(content.as_bytes()).unwrap();
        let rendered = code.render::<Luma<u8>>().min_dimensions(200, 200).build();
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(rendered)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn inspect_reports_dimensions() {
        let png = qr_png("https://example.com");
        let image = DisplayableImage::from_bytes(&png);
        let summary = inspect(&image).unwrap();

        assert!(summary.width >= 200);
        assert_eq!(summary.width, summary.height);
        assert_eq!(summary.byte_len, png.len());
    }

    #[test]
    fn inspect_rejects_non_png() {
        let image = DisplayableImage::from_hex("89504e47").unwrap();
        assert!(matches!(inspect(&image), Err(Error::Decode(_))));
    }

    #[test]
    fn verify_reads_back_url() {
        let image = DisplayableImage::from_bytes(&qr_png("https://example.com"));

        let verification = verify(&image, "https://example.com").unwrap();
        assert!(verification.matches);
        assert_eq!(verification.decoded.as_deref(), Some("https://example.com"));

        assert!(ensure_encodes(&image, "https://example.org").is_err());
    }
}
