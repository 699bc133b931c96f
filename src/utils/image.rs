//! Image utility functions: annotation drawing and encoding

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::engine::detector::FaceBox;
use crate::error::ProcessingError;

/// Glyph cell size of the built-in bitmap font
pub const GLYPH_SIZE: u32 = 8;

/// Draw a hollow rectangle `thickness` pixels wide, growing inward
pub fn draw_box(canvas: &mut RgbImage, face: &FaceBox, thickness: u32, color: Rgb<u8>) {
    for inset in 0..thickness {
        let w = (face.width() + 1).saturating_sub(2 * inset);
        let h = (face.height() + 1).saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((face.x1 + inset) as i32, (face.y1 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Draw ASCII `text` with its top-left corner at (`x`, `y`), each font
/// pixel blown up to a `scale` x `scale` block. Pixels outside the canvas
/// are dropped.
pub fn draw_label(canvas: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let advance = (GLYPH_SIZE * scale) as i32;

    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let origin_x = x + i as i32 * advance;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + (col * scale) as i32;
                let py = y + (row as u32 * scale) as i32;
                draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

/// Encode image to PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ProcessingError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Encode image as a `data:image/png;base64,...` URI
pub fn png_data_uri(image: &RgbImage) -> Result<String, ProcessingError> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
