use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, RgbaImage};

use crate::errors::{Result, SegBatchError};

/// Downscale so neither side exceeds `max_dimension`, keeping the aspect ratio.
/// Images already within bounds are returned untouched.
pub fn resize_to_fit(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Multiply the alpha channel of `image` by `mask`.
pub fn apply_alpha_mask(image: &mut RgbaImage, mask: &GrayImage) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        let (iw, ih) = image.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(SegBatchError::engine(
            "alpha mask application",
            format!("image is {iw}x{ih} but mask is {mw}x{mh}"),
        ));
    }

    for (pixel, mask_pixel) in image.pixels_mut().zip(mask.pixels()) {
        let alpha = u16::from(pixel[3]) * u16::from(mask_pixel[0]);
        pixel[3] = ((alpha + 127) / 255) as u8;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn test_resize_to_fit_keeps_aspect_ratio() {
        let image = DynamicImage::new_rgb8(400, 200);
        let resized = resize_to_fit(image, 100);
        assert_eq!(resized.dimensions(), (100, 50));

        let tall = DynamicImage::new_rgb8(30, 90);
        assert_eq!(resize_to_fit(tall, 45).dimensions(), (15, 45));
    }

    #[test]
    fn test_resize_to_fit_never_upscales() {
        let image = DynamicImage::new_rgb8(64, 32);
        assert_eq!(resize_to_fit(image, 1024).dimensions(), (64, 32));
    }

    #[test]
    fn test_apply_alpha_mask() -> Result<()> {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([0]));
        mask.put_pixel(1, 0, Luma([128]));

        apply_alpha_mask(&mut image, &mask)?;

        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([10, 20, 30, 128]));
        Ok(())
    }

    #[test]
    fn test_apply_alpha_mask_dimension_mismatch() {
        let mut image = RgbaImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(apply_alpha_mask(&mut image, &mask).is_err());
    }
}
