use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use nightshift_common::{NightshiftError, Result};
use std::path::Path;

/// Grayscale and upscale a captcha capture; thin digit strokes read far more
/// reliably at 2x.
pub fn prepare_captcha(png: &[u8], upscale: u32) -> Result<DynamicImage> {
    let decoded = image::load_from_memory(png)
        .map_err(|e| NightshiftError::Ocr(format!("captcha image is not decodable: {e}")))?;
    let gray = decoded.grayscale();
    let factor = upscale.max(1);
    if factor == 1 {
        return Ok(gray);
    }
    Ok(gray.resize_exact(
        gray.width() * factor,
        gray.height() * factor,
        FilterType::CatmullRom,
    ))
}

pub fn write_png(image: &DynamicImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| NightshiftError::Ocr(format!("failed to write {}: {e}", path.display())))
}
