//! Owned RGBA raster buffers and the pixel-block operations the engine needs.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Raster errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Invalid data URL")]
    InvalidDataUrl,
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// An integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The part of this rectangle inside a `width` x `height` buffer.
    fn clipped(self, width: u32, height: u32) -> PixelRect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        PixelRect {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

/// An owned, straight-alpha RGBA8 raster.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// A buffer filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Copy out a block of pixels, clipped to the buffer.
    pub fn get_pixels(&self, rect: PixelRect) -> PixelBuffer {
        let r = rect.clipped(self.width(), self.height());
        Self {
            image: imageops::crop_imm(&self.image, r.x, r.y, r.width, r.height).to_image(),
        }
    }

    /// Overwrite a block of pixels with `buffer` at `origin` (no blending).
    pub fn put_pixels(&mut self, buffer: &PixelBuffer, origin: (u32, u32)) {
        imageops::replace(&mut self.image, &buffer.image, origin.0 as i64, origin.1 as i64);
    }

    /// Make a block of pixels fully transparent.
    pub fn clear(&mut self, rect: PixelRect) {
        let r = rect.clipped(self.width(), self.height());
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                self.image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }

    /// Make the whole buffer transparent.
    pub fn clear_all(&mut self) {
        self.fill([0, 0, 0, 0]);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba(rgba);
        }
    }

    /// Paint `src` over this buffer at the origin with source-over alpha blending.
    pub fn draw_over(&mut self, src: &PixelBuffer) {
        imageops::overlay(&mut self.image, &src.image, 0, 0);
    }

    /// A copy stretched to exactly `width` x `height`.
    pub fn stretched(&self, width: u32, height: u32) -> PixelBuffer {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Self {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }

    /// Paint `src` scaled to fit inside this buffer with its aspect ratio
    /// preserved, centered along the slack axis.
    pub fn draw_fitted(&mut self, src: &PixelBuffer) {
        let (cw, ch) = (self.width() as f64, self.height() as f64);
        let (iw, ih) = (src.width() as f64, src.height() as f64);
        if cw <= 0.0 || ch <= 0.0 || iw <= 0.0 || ih <= 0.0 {
            return;
        }

        let canvas_aspect = cw / ch;
        let image_aspect = iw / ih;
        let (w, h, x, y) = if image_aspect > canvas_aspect {
            let h = cw / image_aspect;
            (cw, h, 0.0, (ch - h) / 2.0)
        } else {
            let w = ch * image_aspect;
            (w, ch, (cw - w) / 2.0, 0.0)
        };

        let scaled = src.stretched((w.round() as u32).max(1), (h.round() as u32).max(1));
        imageops::overlay(&mut self.image, &scaled.image, x.round() as i64, y.round() as i64);
    }

    /// Whether any pixel has a non-white color channel (alpha is ignored).
    pub fn has_content(&self) -> bool {
        self.image
            .pixels()
            .any(|p| p.0[0] != 255 || p.0[1] != 255 || p.0[2] != 255)
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> RasterResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| RasterError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Encode as a `data:image/png;base64,...` URL.
    pub fn encode_data_url(&self) -> RasterResult<String> {
        Ok(png_data_url(&self.encode_png()?))
    }
}

/// Wrap PNG bytes in a data URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png))
}

/// Extract the payload bytes of a base64 image data URL.
pub fn data_url_bytes(url: &str) -> RasterResult<Vec<u8>> {
    let (header, payload) = url.split_once(',').ok_or(RasterError::InvalidDataUrl)?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(RasterError::InvalidDataUrl);
    }
    STANDARD.decode(payload.trim()).map_err(|_| RasterError::InvalidDataUrl)
}

/// Decode encoded image bytes (PNG, JPEG or WebP) into a buffer.
pub fn decode_image_blocking(bytes: &[u8]) -> RasterResult<PixelBuffer> {
    let decoded = image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(RasterError::InvalidDimensions {
            width: rgba.width(),
            height: rgba.height(),
        });
    }
    Ok(PixelBuffer::from_image(rgba))
}

/// Decode encoded image bytes as an asynchronous completion.
pub async fn decode_image(bytes: Vec<u8>) -> RasterResult<PixelBuffer> {
    decode_image_blocking(&bytes)
}

/// Decode a base64 image data URL as an asynchronous completion.
pub async fn decode_data_url(url: String) -> RasterResult<PixelBuffer> {
    let bytes = data_url_bytes(&url)?;
    decode_image(bytes).await
}
