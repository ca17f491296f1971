use crate::preprocess::{prepare_captcha, write_png};
use crate::OcrEngine;
use async_trait::async_trait;
use nightshift_common::{NightshiftError, Result};
use nightshift_config::OcrConfig;
use tokio::process::Command;
use tracing::debug;

const TESSERACT_MISSING: &str = "No usable tesseract binary found. Install it (e.g. `apt install tesseract-ocr`) or set ocr.binary.";

/// OCR engine backed by the `tesseract` command-line tool.
pub struct TesseractOcr {
    binary: String,
    language: String,
    page_seg_mode: u8,
    upscale: u32,
}

impl TesseractOcr {
    pub fn new(cfg: &OcrConfig) -> Self {
        Self {
            binary: cfg.binary.clone(),
            language: cfg.language.clone(),
            page_seg_mode: cfg.page_seg_mode,
            upscale: cfg.upscale,
        }
    }

    /// Verify the binary runs before the pipeline starts relying on it.
    pub async fn probe(&self) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|_| NightshiftError::Ocr(TESSERACT_MISSING.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(NightshiftError::Ocr(TESSERACT_MISSING.to_string()))
        }
    }

    fn arguments(&self, whitelist: &str) -> Vec<String> {
        vec![
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.page_seg_mode.to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={whitelist}"),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, png: &[u8], whitelist: &str) -> Result<String> {
        let prepared = prepare_captcha(png, self.upscale)?;
        let input = tempfile::Builder::new()
            .prefix("nightshift-captcha-")
            .suffix(".png")
            .tempfile()?;
        write_png(&prepared, input.path())?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .args(self.arguments(whitelist))
            .output()
            .await
            .map_err(|e| NightshiftError::Ocr(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(NightshiftError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(target: "ocr.tesseract", raw = %text.trim(), "recognized");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_restrict_charset_and_layout() {
        let ocr = TesseractOcr::new(&OcrConfig::default());
        let args = ocr.arguments("0123456789");
        assert_eq!(args[0], "stdout");
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "7"));
        assert!(args.contains(&"tessedit_char_whitelist=0123456789".to_string()));
    }

    #[tokio::test]
    async fn probe_reports_missing_binary() {
        let ocr = TesseractOcr::new(&OcrConfig {
            binary: "nightshift-no-such-tesseract".into(),
            ..OcrConfig::default()
        });
        assert!(matches!(ocr.probe().await, Err(NightshiftError::Ocr(_))));
    }
}
