//! CPU texture data (RGBA8) handed to the renderer's texture collaborator.

use image::ImageFormat;

use crate::error::TextureError;

const BYTES_PER_PIXEL: u32 = 4;

/// Tightly packed RGBA8 pixels, row-major from the top-left corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureData {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl TextureData {
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, TextureError> {
        let expected = (width * height * BYTES_PER_PIXEL) as usize;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Decode a PNG already in memory.
    pub fn decode_png(bytes: &[u8]) -> Result<Self, TextureError> {
        let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("decoded PNG {}x{}", width, height);
        Self::new_rgba8(width, height, rgba.into_raw())
    }

    /// 1x1 texture of a single color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
        }
    }

    /// Fallback for materials whose main texture was never set.
    pub fn white() -> Self {
        Self::solid([255; 4])
    }

    /// White/gray checkerboard with square cells of `cell` pixels.
    pub fn checkerboard(size: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let mut data = Vec::with_capacity((size * size * BYTES_PER_PIXEL) as usize);
        for y in 0..size {
            for x in 0..size {
                let shade = if ((x / cell) + (y / cell)) % 2 == 0 { 255 } else { 128 };
                data.extend_from_slice(&[shade, shade, shade, 255]);
            }
        }
        Self {
            data,
            width: size,
            height: size,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * BYTES_PER_PIXEL
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * BYTES_PER_PIXEL) as usize;
        self.data.get(i..i + 4)?.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{Rgba, RgbaImage};

    use super::*;

    #[test]
    fn size_is_checked() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            TextureData::new_rgba8(2, 2, vec![0; 15]),
            Err(TextureError::SizeMismatch { expected: 16, actual: 15, .. })
        ));
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let tex = TextureData::checkerboard(16, 8);
        assert_eq!(tex.bytes().len(), 16 * 16 * 4);
        assert_eq!(tex.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(tex.pixel(8, 0), Some([128, 128, 128, 255]));
        assert_eq!(tex.pixel(8, 8), Some([255, 255, 255, 255]));
        assert_eq!(tex.pixel(16, 0), None);
    }

    #[test]
    fn decodes_png_from_memory() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .expect("encode png");

        let tex = TextureData::decode_png(&png).expect("decode png");
        assert_eq!((tex.width(), tex.height()), (3, 2));
        assert_eq!(tex.bytes_per_row(), 12);
        assert_eq!(tex.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            TextureData::decode_png(b"not a png"),
            Err(TextureError::Decode(_))
        ));
    }
}
