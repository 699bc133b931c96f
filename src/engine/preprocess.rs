//! Image preprocessing for the detector and age networks

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::ProcessingError;

use super::detector::FaceBox;

/// Input size of the SSD face detector
pub const DETECTOR_INPUT_SIZE: (u32, u32) = (300, 300);

/// Per-channel mean of the face detector, BGR order
pub const DETECTOR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];

/// Input size of the age classifier
pub const AGE_INPUT_SIZE: (u32, u32) = (227, 227);

/// Per-channel mean of the age classifier, BGR order
pub const AGE_MEAN: [f32; 3] = [78.426_34, 87.768_91, 114.895_85];

/// Resize to `size` and pack as a `[1, 3, h, w]` BGR blob with `mean`
/// subtracted per channel.
pub fn blob_from_image(image: &DynamicImage, size: (u32, u32), mean: [f32; 3]) -> Array4<f32> {
    let (target_w, target_h) = size;
    let resized = image
        .resize_exact(target_w, target_h, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, target_h as usize, target_w as usize));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        tensor[[0, 0, y, x]] = b as f32 - mean[0];
        tensor[[0, 1, y, x]] = g as f32 - mean[1];
        tensor[[0, 2, y, x]] = r as f32 - mean[2];
    }

    tensor
}

/// Detector input blob
pub fn preprocess_for_detection(image: &DynamicImage) -> Array4<f32> {
    blob_from_image(image, DETECTOR_INPUT_SIZE, DETECTOR_MEAN)
}

/// Age classifier input blob
pub fn preprocess_for_age(face: &DynamicImage) -> Array4<f32> {
    blob_from_image(face, AGE_INPUT_SIZE, AGE_MEAN)
}

/// Pixel region to crop, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Grow `face` by `margin` pixels on each side and clamp to the image.
/// Returns `None` when nothing is left after clamping.
pub fn crop_with_margin(face: &FaceBox, margin: u32, width: u32, height: u32) -> Option<CropRect> {
    let x0 = face.x1.saturating_sub(margin);
    let y0 = face.y1.saturating_sub(margin);
    let x_end = face.x2.saturating_add(margin).min(width);
    let y_end = face.y2.saturating_add(margin).min(height);

    if x_end <= x0 || y_end <= y0 {
        return None;
    }

    Some(CropRect {
        x: x0,
        y: y0,
        width: x_end - x0,
        height: y_end - y0,
    })
}

/// Cut the region out of the image
pub fn crop(image: &DynamicImage, rect: CropRect) -> DynamicImage {
    image.crop_imm(rect.x, rect.y, rect.width, rect.height)
}

/// Decode image from bytes with EXIF orientation handling
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, ProcessingError> {
    let image = image::load_from_memory(data)?;

    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(ProcessingError::ZeroDimensions);
    }

    Ok(apply_exif_orientation(data, image))
}

/// Phones often store a rotation tag instead of rotating the pixels
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
