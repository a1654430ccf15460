use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use futures::FutureExt;
use image::{imageops, DynamicImage, ImageOutputFormat, RgbaImage};
use std::io::Cursor;

use super::{Canvas, DecodeError, DecodedImage, ImageDecoder, RasterBackend};
use crate::resource::{data_url, decode_data_url};
use crate::Result;

/// Raster backend built on the `image` crate.
///
/// Decodes PNG, JPEG, GIF, WebP, BMP and TIFF data URIs. SVG documents are
/// reported as [`DecodeError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCanvasBackend;

impl ImageCanvasBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoder for ImageCanvasBackend {
    fn decode<'a>(
        &'a self,
        data_uri: &'a str,
    ) -> BoxFuture<'a, std::result::Result<DecodedImage, DecodeError>> {
        async move {
            let parsed =
                decode_data_url(data_uri).map_err(|e| DecodeError::Invalid(e.to_string()))?;
            if parsed.media_type.contains("svg") {
                return Err(DecodeError::Unsupported(parsed.media_type));
            }
            let image = image::load_from_memory(&parsed.bytes)
                .map_err(|e| DecodeError::Invalid(e.to_string()))?;
            Ok(DecodedImage::from(image))
        }
        .boxed()
    }
}

impl RasterBackend for ImageCanvasBackend {
    fn new_canvas(&self, width: u32, height: u32) -> Box<dyn Canvas> {
        Box::new(ImageCanvas::new(width, height))
    }
}

/// Transparent RGBA canvas.
#[derive(Debug, Clone)]
pub struct ImageCanvas {
    pixels: RgbaImage,
}

impl ImageCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.pixels.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

impl Canvas for ImageCanvas {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn draw_image(&mut self, image: &DecodedImage, x: i64, y: i64) {
        imageops::overlay(&mut self.pixels, &image.image.to_rgba8(), x, y);
    }

    fn to_data_url(&self) -> Result<String> {
        Ok(data_url(&STANDARD.encode(self.encode_png()?), "image/png"))
    }

    fn to_blob(&self) -> Option<Result<Vec<u8>>> {
        Some(self.encode_png())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_data_uri(width: u32, height: u32, color: [u8; 4]) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .expect("encode png");
        data_url(&STANDARD.encode(bytes), "image/png")
    }

    #[tokio::test]
    async fn decodes_png_and_draws_clipped() {
        let backend = ImageCanvasBackend::new();
        let decoded = backend
            .decode(&png_data_uri(4, 4, [255, 0, 0, 255]))
            .await
            .expect("decode png");
        assert_eq!((decoded.width(), decoded.height()), (4, 4));

        let mut canvas = ImageCanvas::new(3, 2);
        canvas.draw_image(&decoded, 1, 0);
        assert_eq!(canvas.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(canvas.pixels().get_pixel(2, 1), &Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn svg_is_unsupported() {
        let backend = ImageCanvasBackend::new();
        let err = backend
            .decode("data:image/svg+xml;charset=utf-8,<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let backend = ImageCanvasBackend::new();
        let err = backend.decode("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(matches!(err, DecodeError::Invalid(_)));
    }

    #[test]
    fn canvas_exports_png() {
        let canvas = ImageCanvas::new(2, 2);
        let url = canvas.to_data_url().expect("data url");
        assert!(url.starts_with("data:image/png;base64,"));
        let blob = canvas.to_blob().expect("native blob").expect("png bytes");
        let reloaded = image::load_from_memory(&blob).expect("reload png");
        assert_eq!((reloaded.width(), reloaded.height()), (2, 2));
    }
}
