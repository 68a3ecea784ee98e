use image::{imageops::FilterType, DynamicImage, GenericImageView};
use log::trace;
use thiserror::Error;

/// A decoded image in RGB565, row-major, one `u16` per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u16>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Cannot decode image: {0}")]
    Image(String),

    #[error("Empty image data")]
    Empty,
}

/// Image codec seam: compressed bytes in, display-ready frame out
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Frame, DecodeError>;
}

/// [`FrameDecoder`] on top of the `image` crate (JPEG and PNG)
///
/// Images larger than the bounding box are scaled down to fit, keeping the
/// aspect ratio. Smaller images are passed through unscaled.
#[derive(Debug, Clone, Copy)]
pub struct ImageFrameDecoder {
    max_width: u32,
    max_height: u32,
}

impl ImageFrameDecoder {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, data: &[u8]) -> Result<Frame, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty);
        }
        let decoded = image::load_from_memory(data).map_err(|e| DecodeError::Image(e.to_string()))?;
        let fitted = fit(decoded, self.max_width, self.max_height);
        Ok(to_rgb565(&fitted))
    }
}

fn fit(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        return image;
    }
    trace!("Scaling {}x{} into {}x{}", width, height, max_width, max_height);
    image.resize(max_width, max_height, FilterType::Triangle)
}

/// Pack 8-bit RGB into RGB565
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3)
}

fn to_rgb565(image: &DynamicImage) -> Frame {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.pixels().map(|p| rgb565(p[0], p[1], p[2])).collect();
    Frame { width, height, pixels }
}
