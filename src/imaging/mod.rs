//! Raster image operations
//!
//! Two concerns: converting HEIF/HEIC uploads to PNG before OCR, and the
//! cleanup pass that paints over low-confidence (likely handwritten) OCR
//! regions so the image can be reused as a blank worksheet.

use std::io::Cursor;

use image::Rgba;

use crate::error::{AppError, Result};
use crate::ocr::TextRegion;

/// Confidence below which a region is considered handwritten
pub const HANDWRITING_THRESHOLD: f64 = 0.85;

/// Whether a filename's extension indicates a HEIF container
pub fn is_heif(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".heic") || lower.ends_with(".heif")
}

/// Decode a HEIF image and re-encode it as PNG
#[cfg(feature = "heif")]
pub fn convert_heif_to_png(data: &[u8]) -> Result<Vec<u8>> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data)
        .map_err(|e| AppError::Image(format!("HEIF 解析失败: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| AppError::Image(format!("HEIF 解析失败: {}", e)))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| AppError::Image(format!("HEIF 解码失败: {}", e)))?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let interleaved = planes
        .interleaved
        .ok_or_else(|| AppError::Image("HEIF 解码失败: no interleaved plane".to_string()))?;

    // Rows may be padded; copy out stride by stride
    let stride = interleaved.stride;
    let mut rgb = image::RgbImage::new(width, height);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = y * stride + x * 3;
            let pixel = image::Rgb([
                interleaved.data[offset],
                interleaved.data[offset + 1],
                interleaved.data[offset + 2],
            ]);
            rgb.put_pixel(x as u32, y as u32, pixel);
        }
    }

    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| AppError::Image(format!("PNG 编码失败: {}", e)))?;
    Ok(buffer)
}

/// Without libheif the decode step is unavailable and the upload fails the
/// same way an undecodable HEIF file would.
#[cfg(not(feature = "heif"))]
pub fn convert_heif_to_png(_data: &[u8]) -> Result<Vec<u8>> {
    Err(AppError::Image(
        "HEIF 解码失败: server built without the heif feature".to_string(),
    ))
}

/// Paint low-confidence OCR regions solid white and return the edited PNG.
///
/// A degenerate region (outside the image after clamping) is logged and
/// skipped rather than failing the whole image.
pub fn whiteout_low_confidence(image_data: &[u8], regions: &[TextRegion]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| AppError::Image(format!("图片解码失败: {}", e)))?;
    let mut canvas = img.to_rgba8();
    let (width, height) = (canvas.width(), canvas.height());

    for region in regions {
        if region.confidence >= HANDWRITING_THRESHOLD {
            continue;
        }

        let r = region.region;
        let x0 = r.left.min(width);
        let y0 = r.top.min(height);
        let x1 = r.left.saturating_add(r.width).min(width);
        let y1 = r.top.saturating_add(r.height).min(height);

        if x0 >= x1 || y0 >= y1 {
            tracing::warn!(
                words = %region.words,
                left = r.left,
                top = r.top,
                "Skipping degenerate OCR region during whiteout"
            );
            continue;
        }

        for y in y0..y1 {
            for x in x0..x1 {
                canvas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }

    let mut buffer = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| AppError::Image(format!("PNG 编码失败: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Region;

    fn black_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn region(left: u32, top: u32, width: u32, height: u32, confidence: f64) -> TextRegion {
        TextRegion {
            words: "x".to_string(),
            confidence,
            region: Region {
                left,
                top,
                width,
                height,
            },
        }
    }

    #[test]
    fn heif_extension_detection() {
        assert!(is_heif("photo.HEIC"));
        assert!(is_heif("photo.heif"));
        assert!(!is_heif("photo.png"));
        assert!(!is_heif("heic.jpg"));
    }

    #[test]
    fn low_confidence_region_is_whited_out() {
        let input = black_png(20, 20);
        let regions = vec![region(2, 2, 5, 5, 0.4)];

        let output = whiteout_low_confidence(&input, &regions).unwrap();
        let edited = image::load_from_memory(&output).unwrap().to_rgba8();

        assert_eq!(edited.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
        assert_eq!(edited.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn confident_region_is_untouched() {
        let input = black_png(20, 20);
        let regions = vec![region(2, 2, 5, 5, 0.99)];

        let output = whiteout_low_confidence(&input, &regions).unwrap();
        let edited = image::load_from_memory(&output).unwrap().to_rgba8();

        assert_eq!(edited.get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn out_of_bounds_region_is_skipped() {
        let input = black_png(20, 20);
        let regions = vec![region(100, 100, 10, 10, 0.1), region(0, 0, 2, 2, 0.1)];

        let output = whiteout_low_confidence(&input, &regions).unwrap();
        let edited = image::load_from_memory(&output).unwrap().to_rgba8();

        // The in-bounds region still gets painted
        assert_eq!(edited.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn region_overlapping_edge_is_clamped() {
        let input = black_png(20, 20);
        let regions = vec![region(15, 15, 10, 10, 0.1)];

        let output = whiteout_low_confidence(&input, &regions).unwrap();
        let edited = image::load_from_memory(&output).unwrap().to_rgba8();

        assert_eq!(edited.get_pixel(19, 19), &Rgba([255, 255, 255, 255]));
        assert_eq!(edited.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = whiteout_low_confidence(b"not an image", &[]);
        assert!(matches!(result, Err(AppError::Image(_))));
    }
}
