//! Turning the SVG data URI into pixels.
//!
//! The capture only needs three things from the platform: decode an image
//! from a data URI, paint it onto a canvas of a given size, and read the
//! canvas back as a PNG data URL or bytes. [`ImageCanvasBackend`] provides
//! them on top of the `image` crate for raster sources; rendering
//! `foreignObject` SVG needs a browser-backed implementation of
//! [`RasterBackend`].

mod image_canvas;

pub use image_canvas::{ImageCanvas, ImageCanvasBackend};

use futures::future::BoxFuture;
use image::DynamicImage;
use thiserror::Error;

use crate::Result;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported image type: {0}")]
    Unsupported(String),
    #[error("invalid image data: {0}")]
    Invalid(String),
}

/// A decoded image ready to be drawn.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(image: DynamicImage) -> Self {
        DecodedImage { image }
    }
}

pub trait ImageDecoder: Send + Sync {
    /// Loads the image behind `data_uri`, resolving once it is fully decoded.
    fn decode<'a>(
        &'a self,
        data_uri: &'a str,
    ) -> BoxFuture<'a, std::result::Result<DecodedImage, DecodeError>>;
}

pub trait Canvas: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Paints `image` with its top-left corner at (`x`, `y`), clipped to the
    /// canvas.
    fn draw_image(&mut self, image: &DecodedImage, x: i64, y: i64);

    /// `data:image/png;base64,...` of the current pixels.
    fn to_data_url(&self) -> Result<String>;

    /// PNG bytes straight from the canvas, when the platform can produce
    /// them without going through a data URL.
    fn to_blob(&self) -> Option<Result<Vec<u8>>> {
        None
    }
}

pub trait RasterBackend: ImageDecoder {
    fn new_canvas(&self, width: u32, height: u32) -> Box<dyn Canvas>;
}
