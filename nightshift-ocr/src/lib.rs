//! OCR collaborator used to read the login captcha.
//!
//! The pipeline only depends on [`OcrEngine`]; [`tesseract::TesseractOcr`]
//! is the production engine. Recognition is best effort and no confidence
//! score is consumed, so callers validate the text with [`readable_captcha`].
pub mod preprocess;
pub mod tesseract;

use async_trait::async_trait;
use nightshift_common::{NightshiftError, Result};

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in a PNG image, restricted to `whitelist` characters.
    async fn recognize(&self, png: &[u8], whitelist: &str) -> Result<String>;
}

/// Strip all whitespace the engine inserts between glyphs.
pub fn normalize_captcha(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalize an OCR read and reject it when it cannot be a full captcha.
///
/// ```
/// use nightshift_ocr::readable_captcha;
///
/// assert_eq!(readable_captcha(" 48 17\n", 4).unwrap(), "4817");
/// assert!(readable_captcha("48", 4).is_err());
/// ```
pub fn readable_captcha(raw: &str, min_len: usize) -> Result<String> {
    let code = normalize_captcha(raw);
    if code.is_empty() || code.chars().count() < min_len {
        return Err(NightshiftError::CaptchaUnreadable(code));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_newlines_are_removed() {
        assert_eq!(normalize_captcha("1 2\t3\n4\n\x0c"), "1234");
    }

    #[test]
    fn empty_and_short_reads_are_unreadable() {
        assert!(matches!(
            readable_captcha("", 4),
            Err(NightshiftError::CaptchaUnreadable(code)) if code.is_empty()
        ));
        assert!(matches!(
            readable_captcha(" 1 2 3 ", 4),
            Err(NightshiftError::CaptchaUnreadable(code)) if code == "123"
        ));
        assert_eq!(readable_captcha("90210", 4).unwrap(), "90210");
    }
}
