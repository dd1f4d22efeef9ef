// src/services/image_processor.rs
use crate::errors::AnalysisError;
use crate::models::PhotoHandle;
use bytes::Bytes;
use image::{GenericImageView, ImageFormat as ImgFormat};

const MAX_DIMENSION: u32 = 8192;
const UPLOAD_MAX_EDGE: u32 = 2048;
const SAMPLE_EDGE: u32 = 64;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the payload just far enough to learn its dimensions.
    pub fn inspect(&self, data: Bytes) -> Result<PhotoHandle, AnalysisError> {
        if data.is_empty() {
            return Err(AnalysisError::Validation("Photo payload is empty".to_string()));
        }

        let img = image::load_from_memory(&data)
            .map_err(|e| AnalysisError::Validation(format!("Invalid image format: {}", e)))?;
        let (width, height) = img.dimensions();

        Ok(PhotoHandle {
            size_bytes: data.len(),
            bytes: data,
            width,
            height,
        })
    }

    pub fn validate(&self, photo: &PhotoHandle, max_bytes: usize) -> Result<(), AnalysisError> {
        if photo.bytes.is_empty() || photo.size_bytes == 0 {
            return Err(AnalysisError::Validation("Photo payload is empty".to_string()));
        }

        if photo.size_bytes > max_bytes || photo.bytes.len() > max_bytes {
            return Err(AnalysisError::Validation(format!(
                "Photo is {} bytes, exceeding the {} byte limit",
                photo.size_bytes.max(photo.bytes.len()),
                max_bytes
            )));
        }

        if photo.width == 0 || photo.height == 0 {
            return Err(AnalysisError::Validation("Photo has no pixels".to_string()));
        }

        if photo.width > MAX_DIMENSION || photo.height > MAX_DIMENSION {
            return Err(AnalysisError::Validation(format!(
                "Image dimensions exceed {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        image::guess_format(&photo.bytes)
            .map_err(|e| AnalysisError::Validation(format!("Unrecognized image format: {}", e)))?;

        Ok(())
    }

    /// Converts the photo into the JPEG payload sent to the vision model,
    /// downscaling so the long edge is at most 2048 px.
    pub fn prepare_for_upload(&self, data: &[u8]) -> Result<Vec<u8>, AnalysisError> {
        let img = image::load_from_memory(data)
            .map_err(|e| AnalysisError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();
        let img = if width > UPLOAD_MAX_EDGE || height > UPLOAD_MAX_EDGE {
            // resize() keeps the aspect ratio inside the bounding box
            img.resize(
                UPLOAD_MAX_EDGE,
                UPLOAD_MAX_EDGE,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            img
        };

        let mut output = Vec::new();
        img.to_rgb8()
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                AnalysisError::ImageProcessing(format!("Failed to encode upload image: {}", e))
            })?;

        Ok(output)
    }

    /// Decodes real pixels for palette extraction: the photo is shrunk to at
    /// most 64x64 and every remaining pixel becomes a sample.
    pub fn sample_pixels(&self, data: &[u8], max_samples: usize) -> Result<Vec<[u8; 3]>, AnalysisError> {
        let img = image::load_from_memory(data)
            .map_err(|e| AnalysisError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let thumb = img.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgb8();
        let pixels: Vec<[u8; 3]> = thumb.pixels().map(|p| p.0).collect();
        if pixels.is_empty() {
            return Err(AnalysisError::ImageProcessing("Image has no pixels".to_string()));
        }

        let step = pixels.len().div_ceil(max_samples.max(1));
        Ok(pixels.into_iter().step_by(step.max(1)).collect())
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageFormat, Rgb, RgbImage};

    /// PNG bytes for an image split into a left and right color.
    pub fn two_tone_png(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 { Rgb(left) } else { Rgb(right) }
        });
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::two_tone_png;
    use super::*;

    #[test]
    fn inspect_reads_dimensions() {
        let png = two_tone_png(40, 20, [10, 20, 30], [200, 100, 50]);
        let photo = ImageProcessor::new().inspect(Bytes::from(png.clone())).unwrap();
        assert_eq!((photo.width, photo.height), (40, 20));
        assert_eq!(photo.size_bytes, png.len());
    }

    #[test]
    fn inspect_rejects_garbage_and_empty() {
        let processor = ImageProcessor::new();
        assert!(matches!(
            processor.inspect(Bytes::new()),
            Err(AnalysisError::Validation(_))
        ));
        assert!(matches!(
            processor.inspect(Bytes::from_static(b"not an image")),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn validate_enforces_size_bound() {
        let processor = ImageProcessor::new();
        let png = two_tone_png(8, 8, [0, 0, 0], [255, 255, 255]);
        let photo = processor.inspect(Bytes::from(png)).unwrap();
        assert!(processor.validate(&photo, 20 * 1024 * 1024).is_ok());
        assert!(matches!(
            processor.validate(&photo, 10),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn upload_payload_is_downscaled_jpeg() {
        let processor = ImageProcessor::new();
        let png = two_tone_png(3000, 1000, [120, 60, 30], [30, 60, 120]);
        let jpeg = processor.prepare_for_upload(&png).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImgFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions().0, 2048);
    }

    #[test]
    fn samples_come_from_real_pixels() {
        let processor = ImageProcessor::new();
        let png = two_tone_png(128, 128, [200, 40, 40], [40, 90, 200]);
        let samples = processor.sample_pixels(&png, 4096).unwrap();
        assert_eq!(samples.len(), 64 * 64);
        assert!(samples.iter().any(|p| p[0] > 180 && p[2] < 60));
        assert!(samples.iter().any(|p| p[2] > 180 && p[0] < 60));

        let capped = processor.sample_pixels(&png, 100).unwrap();
        assert!(capped.len() <= 100);
    }
}
