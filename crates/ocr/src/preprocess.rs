use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Images narrower or shorter than this are rejected as unusable input.
pub const MIN_DIMENSION: u32 = 8;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to load image {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Image {name} is too small ({width}x{height}, need at least {min}x{min})")]
    TooSmall { name: String, width: u32, height: u32, min: u32 },
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Load an image file, rejecting undecodable or degenerate images.
pub fn load_image(path: &Path) -> Result<DynamicImage, InputError> {
    let name = path.display().to_string();
    let img = image::open(path).map_err(|source| InputError::Load { name: name.clone(), source })?;
    check_dimensions(&img, &name)?;
    Ok(img)
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …); `name` labels errors.
pub fn load_image_from_bytes(data: &[u8], name: &str) -> Result<DynamicImage, InputError> {
    let img = image::load_from_memory(data)
        .map_err(|source| InputError::Load { name: name.to_string(), source })?;
    check_dimensions(&img, name)?;
    Ok(img)
}

pub(crate) fn check_dimensions(img: &DynamicImage, name: &str) -> Result<(), InputError> {
    if img.width() < MIN_DIMENSION || img.height() < MIN_DIMENSION {
        return Err(InputError::TooSmall {
            name: name.to_string(),
            width: img.width(),
            height: img.height(),
            min: MIN_DIMENSION,
        });
    }
    Ok(())
}

/// The opaque cleanup transform applied before recognition.
pub trait Preprocess: Send + Sync {
    fn apply(&self, img: &DynamicImage) -> GrayImage;
}

/// Grayscale + contrast stretch, down-scaling very large images first.
#[derive(Debug, Clone, Copy)]
pub struct ContrastStretch {
    pub max_dimension: u32,
}

impl Default for ContrastStretch {
    fn default() -> Self {
        // Tesseract works best at 300 DPI / ~2000 px.
        Self { max_dimension: 2800 }
    }
}

impl Preprocess for ContrastStretch {
    fn apply(&self, img: &DynamicImage) -> GrayImage {
        let gray = if img.width() > self.max_dimension || img.height() > self.max_dimension {
            img.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3).to_luma8()
        } else {
            img.to_luma8()
        };

        let (min_px, max_px) = gray
            .pixels()
            .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

        if max_px <= min_px {
            return gray;
        }

        let range = (max_px - min_px) as u32;
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            let p = gray.get_pixel(x, y)[0];
            Luma([((p - min_px) as u32 * 255 / range) as u8])
        })
    }
}

/// Resize by `factor` with bicubic interpolation. A factor of 1.0 copies.
pub fn scale_image(img: &GrayImage, factor: f32) -> GrayImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return img.clone();
    }
    let width = ((img.width() as f32 * factor) as u32).max(1);
    let height = ((img.height() as f32 * factor) as u32).max(1);
    image::imageops::resize(img, width, height, FilterType::CatmullRom)
}

/// Polarity-inverted copy.
pub fn invert(img: &GrayImage) -> GrayImage {
    let mut inverted = img.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, InputError> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| InputError::Encode(e.to_string()))?;
    Ok(buf)
}
