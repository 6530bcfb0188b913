use crate::pipeline::error::{PipelineError, Result};
use common::model::record::GenerationId;
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

/// Builds the verification URL a document points at: `{base}/{id}`.
pub fn verification_url(base_url: &str, id: &GenerationId) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), id)
}

/// Turns a URL into a QR code bitmap.
#[derive(Debug, Clone)]
pub struct CodeMarkGenerator {
    module_px: u32,
    ec_level: EcLevel,
}

impl Default for CodeMarkGenerator {
    fn default() -> Self {
        Self {
            module_px: 8,
            ec_level: EcLevel::M,
        }
    }
}

impl CodeMarkGenerator {
    pub fn new(module_px: u32, ec_level: EcLevel) -> Self {
        Self {
            module_px: module_px.max(1),
            ec_level,
        }
    }

    /// Renders `url` with a quiet zone, dark modules black on white.
    pub fn generate(&self, url: &str) -> Result<GrayImage> {
        let code = QrCode::with_error_correction_level(url.as_bytes(), self.ec_level)
            .map_err(|e| PipelineError::CodeMark(format!("{} ({} bytes)", e, url.len())))?;
        Ok(code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(self.module_px, self.module_px)
            .build())
    }
}
