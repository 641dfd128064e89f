//! QR image rendering backed by the `qrcode` crate.

use qbox_application::{QrEncoder, RenderedQrCode};
use qbox_core::{AppError, AppResult};
use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Byte-mode capacity of a version 40 symbol at error correction level M.
const MAX_PAYLOAD_BYTES: usize = 2_331;

/// Renders QR payloads as SVG documents.
#[derive(Debug, Clone, Copy)]
pub struct SvgQrEncoder {
    min_dimension: u32,
}

impl SvgQrEncoder {
    /// Creates an encoder whose images are at least `min_dimension` pixels wide.
    #[must_use]
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }
}

impl Default for SvgQrEncoder {
    fn default() -> Self {
        Self::new(320)
    }
}

impl QrEncoder for SvgQrEncoder {
    fn render(&self, payload: &serde_json::Value) -> AppResult<RenderedQrCode> {
        let code = QrCode::with_error_correction_level(payload.to_string().as_bytes(), EcLevel::M)
            .map_err(|error| match error {
                QrError::DataTooLong => AppError::Validation(format!(
                    "qr payload exceeds {MAX_PAYLOAD_BYTES} bytes"
                )),
                error => AppError::Internal(format!("failed to encode qr payload: {error}")),
            })?;

        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        Ok(RenderedQrCode {
            content_type: SVG_CONTENT_TYPE.to_owned(),
            bytes: image.into_bytes(),
        })
    }

    fn max_payload_bytes(&self) -> usize {
        MAX_PAYLOAD_BYTES
    }
}
