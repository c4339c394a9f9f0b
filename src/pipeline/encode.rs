//! Image encoding: `DynamicImage` → base64 `data:` URL.
//!
//! Page rasters are always PNG so text edges stay crisp under the
//! selectable text layer. Embedded image objects are JPEG when they are
//! opaque and PNG when they carry an alpha channel, since JPEG cannot store
//! transparency.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used for opaque embedded images.
const JPEG_QUALITY: u8 = 85;

/// Encode a rasterised page as a PNG data URL.
pub fn png_data_url(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(to_data_url("image/png", &buf))
}

/// Encode an embedded image object, choosing JPEG or PNG by transparency.
pub fn image_data_url(img: &DynamicImage) -> Result<String, image::ImageError> {
    if img.color().has_alpha() {
        return png_data_url(img);
    }

    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut buf), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(to_data_url("image/jpeg", &buf))
}

fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", mime, b64.len());
    format!("data:{mime};base64,{b64}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn decode(url: &str, prefix: &str) -> Vec<u8> {
        let b64 = url.strip_prefix(prefix).expect("data URL prefix");
        STANDARD.decode(b64).expect("valid base64")
    }

    #[test]
    fn page_raster_is_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let url = png_data_url(&img).unwrap();
        let bytes = decode(&url, "data:image/png;base64,");
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn opaque_image_is_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        let url = image_data_url(&img).unwrap();
        let bytes = decode(&url, "data:image/jpeg;base64,");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn transparent_image_is_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128])));
        let url = image_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn grayscale_image_is_jpeg() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([90])));
        assert!(image_data_url(&img).unwrap().starts_with("data:image/jpeg"));
    }
}
