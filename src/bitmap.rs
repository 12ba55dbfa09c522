// Bitmap Module - 1-bit packed framebuffer, raster sink and line primitive
use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use std::path::Path;

use crate::types::{Point, Rgb};

/// Pen color for strokes on a 1-bit surface.
/// A set bit is paper (white), a cleared bit is ink (black).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Black,
    White,
}

/// Host drawing primitive: stroke a line between two integer endpoints
pub trait LineSink {
    fn draw_line(&mut self, a: Point, b: Point);
}

/// Mutable byte view of a 1-bit raster: row stride in bytes and pixel height
pub struct RasterSink<'a> {
    pub bytes: &'a mut [u8],
    pub stride: usize,
    pub height: usize,
}

impl<'a> RasterSink<'a> {
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.bytes[start..start + self.stride]
    }
}

/// Packed 1 bit per pixel bitmap.
///
/// Pixel `x` of a row lives in byte `x / 8`, bit `x % 8`, which is the same
/// layout the dither tiles use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    width: usize,
    height: usize,
    stride: usize,
    stroke: Ink,
}

impl Bitmap {
    /// Blank bitmap, every pixel ink
    pub fn new(width: usize, height: usize) -> Self {
        let stride = (width + 7) / 8;
        Bitmap {
            bytes: vec![0u8; stride * height],
            width,
            height,
            stride,
            stroke: Ink::Black,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn raster(&mut self) -> RasterSink<'_> {
        RasterSink {
            bytes: &mut self.bytes,
            stride: self.stride,
            height: self.height,
        }
    }

    pub fn set_stroke(&mut self, ink: Ink) {
        self.stroke = ink;
    }

    pub fn fill(&mut self, ink: Ink) {
        let value = match ink {
            Ink::Black => 0x00,
            Ink::White => 0xFF,
        };
        self.bytes.fill(value);
    }

    /// Copy `src` onto this bitmap at the origin, clipped to both extents
    pub fn blit(&mut self, src: &Bitmap) {
        let rows = self.height.min(src.height);
        let cols = self.width.min(src.width);
        let whole = cols / 8;
        for y in 0..rows {
            let dst_row = y * self.stride;
            let src_row = y * src.stride;
            self.bytes[dst_row..dst_row + whole]
                .copy_from_slice(&src.bytes[src_row..src_row + whole]);
        }
        // Ragged tail columns when the width is not a multiple of 8
        if cols % 8 != 0 {
            for y in 0..rows {
                for x in whole * 8..cols {
                    self.set_pixel(x as i32, y as i32, src.pixel(x, y));
                }
            }
        }
    }

    /// True when the pixel is paper (white)
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        (self.bytes[y * self.stride + x / 8] >> (x % 8)) & 1 == 1
    }

    fn set_pixel(&mut self, x: i32, y: i32, white: bool) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let index = y as usize * self.stride + x as usize / 8;
        let mask = 1u8 << (x as usize % 8);
        if white {
            self.bytes[index] |= mask;
        } else {
            self.bytes[index] &= !mask;
        }
    }

    /// FNV-1a digest of the raw bytes, used to compare frames
    pub fn checksum(&self) -> u64 {
        fnv1a(self.bytes())
    }

    /// Expand to an 8-bit grayscale image using the given ink/paper colors
    pub fn to_gray_image(&self, ink: Rgb, paper: Rgb) -> GrayImage {
        let (ink, paper) = (ink.luma(), paper.luma());
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.pixel(x as usize, y as usize) {
                Luma([paper])
            } else {
                Luma([ink])
            }
        })
    }

    pub fn save_png(&self, path: &Path, ink: Rgb, paper: Rgb) -> Result<()> {
        self.to_gray_image(ink, paper)
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl LineSink for Bitmap {
    // Bresenham's line algorithm, clipped per pixel
    fn draw_line(&mut self, a: Point, b: Point) {
        let white = self.stroke == Ink::White;
        let dx = (b.x - a.x).abs();
        let dy = -(b.y - a.y).abs();
        let sx = if a.x < b.x { 1 } else { -1 };
        let sy = if a.y < b.y { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = a.x;
        let mut y = a.y;

        loop {
            self.set_pixel(x, y, white);
            if x == b.x && y == b.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// 64-bit FNV-1a hash
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_rounds_up() {
        assert_eq!(Bitmap::new(144, 168).stride(), 18);
        assert_eq!(Bitmap::new(9, 2).stride(), 2);
        assert_eq!(Bitmap::new(144, 168).bytes().len(), 18 * 168);
    }

    #[test]
    fn test_horizontal_line_clears_bits() {
        let mut bmp = Bitmap::new(16, 4);
        bmp.fill(Ink::White);
        bmp.draw_line(Point::new(2, 1), Point::new(9, 1));
        for x in 0..16 {
            assert_eq!(bmp.pixel(x, 1), !(2..=9).contains(&x), "x = {}", x);
            assert!(bmp.pixel(x, 0));
            assert!(bmp.pixel(x, 2));
        }
        // bit x % 8 holds pixel x
        assert_eq!(bmp.bytes()[2], 0b0000_0011);
        assert_eq!(bmp.bytes()[3], 0b1111_1100);
    }

    #[test]
    fn test_diagonal_line_hits_both_endpoints() {
        let mut bmp = Bitmap::new(8, 8);
        bmp.set_stroke(Ink::White);
        bmp.draw_line(Point::new(7, 7), Point::new(0, 0));
        for i in 0..8 {
            assert!(bmp.pixel(i, i));
        }
        let lit: u32 = bmp.bytes().iter().map(|b| b.count_ones()).sum();
        assert_eq!(lit, 8);
    }

    #[test]
    fn test_line_is_clipped() {
        let mut bmp = Bitmap::new(8, 8);
        bmp.set_stroke(Ink::White);
        bmp.draw_line(Point::new(-20, 3), Point::new(40, 3));
        assert_eq!(bmp.bytes()[3], 0xFF);
        let lit: u32 = bmp.bytes().iter().map(|b| b.count_ones()).sum();
        assert_eq!(lit, 8);
    }

    #[test]
    fn test_blit_copies_overlap() {
        let mut src = Bitmap::new(16, 2);
        src.fill(Ink::White);
        let mut dst = Bitmap::new(12, 3);
        dst.blit(&src);
        for x in 0..12 {
            assert!(dst.pixel(x, 0));
            assert!(dst.pixel(x, 1));
            assert!(!dst.pixel(x, 2));
        }
    }

    #[test]
    fn test_raster_rows() {
        let mut bmp = Bitmap::new(16, 3);
        {
            let mut raster = bmp.raster();
            assert_eq!(raster.stride, 2);
            assert_eq!(raster.height, 3);
            raster.row_mut(1).copy_from_slice(&[0xAA, 0x55]);
        }
        assert_eq!(bmp.bytes(), &[0, 0, 0xAA, 0x55, 0, 0]);
    }

    #[test]
    fn test_gray_image_uses_colors() {
        let mut bmp = Bitmap::new(2, 1);
        bmp.set_stroke(Ink::White);
        bmp.draw_line(Point::new(1, 0), Point::new(1, 0));
        let img = bmp.to_gray_image(Rgb::BLACK, Rgb::WHITE);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
