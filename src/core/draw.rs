//! Pixel drawing surface
//!
//! A plain RGBA8 image with the three operations frame rendering needs:
//! solid fills, overlapping self-copies (scroll blits), and alpha-mask
//! compositing for glyph coverage bitmaps.

use crate::core::color::Color;
use crate::core::geometry::{Point, Rect};

/// An 8-bit coverage mask positioned in image coordinates.
///
/// `rect` places the mask on the destination image; `pix` holds one
/// coverage byte per pixel, row-major with `stride` bytes per row.
#[derive(Debug, Clone, Default)]
pub struct AlphaMask {
    pub rect: Rect,
    pub stride: usize,
    pub pix: Vec<u8>,
}

impl AlphaMask {
    /// Coverage at an image-space point, 0 outside the mask
    pub fn at(&self, p: Point) -> u8 {
        if !self.rect.contains(p) {
            return 0;
        }
        let x = (p.x - self.rect.min.x) as usize;
        let y = (p.y - self.rect.min.y) as usize;
        self.pix.get(y * self.stride + x).copied().unwrap_or(0)
    }
}

/// An RGBA8 pixel buffer
#[derive(Debug, Clone)]
pub struct Image {
    width: i32,
    height: i32,
    pix: Vec<u8>,
}

impl Image {
    pub fn new(width: i32, height: i32) -> Self {
        let (w, h) = (width.max(0), height.max(0));
        Self {
            width: w,
            height: h,
            pix: vec![0; (w as usize) * (h as usize) * 4],
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pix
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Color of the pixel at (x, y); black outside the image
    pub fn get(&self, x: i32, y: i32) -> Color {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Color::BLACK;
        }
        let o = self.offset(x, y);
        Color {
            r: self.pix[o],
            g: self.pix[o + 1],
            b: self.pix[o + 2],
            a: self.pix[o + 3],
        }
    }

    fn put(&mut self, x: i32, y: i32, c: Color) {
        let o = self.offset(x, y);
        self.pix[o] = c.r;
        self.pix[o + 1] = c.g;
        self.pix[o + 2] = c.b;
        self.pix[o + 3] = c.a;
    }

    /// Fill `r` (clipped to the image) with a solid color
    pub fn fill(&mut self, r: Rect, c: Color) {
        let r = r.intersect(self.bounds());
        for y in r.min.y..r.max.y {
            for x in r.min.x..r.max.x {
                self.put(x, y, c);
            }
        }
    }

    /// Copy `src` (clipped) so that its min corner lands on `dst_min`.
    ///
    /// Source and destination may overlap; rows are walked in the order
    /// that keeps the copy correct for vertical scrolls in either
    /// direction.
    pub fn copy_within(&mut self, dst_min: Point, src: Rect) {
        let src = src.intersect(self.bounds());
        let dst = Rect::new(
            dst_min.x,
            dst_min.y,
            dst_min.x + src.dx(),
            dst_min.y + src.dy(),
        )
        .intersect(self.bounds());
        let h = dst.dy().min(src.dy());
        let w = dst.dx().min(src.dx());
        if h <= 0 || w <= 0 {
            return;
        }

        let row = |img: &Image, x: i32, y: i32| img.offset(x, y);
        let wb = w as usize * 4;
        if dst.min.y <= src.min.y {
            for i in 0..h {
                let s = row(self, src.min.x, src.min.y + i);
                let d = row(self, dst.min.x, dst.min.y + i);
                self.pix.copy_within(s..s + wb, d);
            }
        } else {
            for i in (0..h).rev() {
                let s = row(self, src.min.x, src.min.y + i);
                let d = row(self, dst.min.x, dst.min.y + i);
                self.pix.copy_within(s..s + wb, d);
            }
        }
    }

    /// Composite `color` over `r` (clipped) using `mask` coverage.
    ///
    /// `mask_p` is the mask-space point aligned with `r.min`.
    pub fn draw_mask(&mut self, r: Rect, color: Color, mask: &AlphaMask, mask_p: Point) {
        let r = r.intersect(self.bounds());
        for y in r.min.y..r.max.y {
            for x in r.min.x..r.max.x {
                let mp = Point::new(mask_p.x + (x - r.min.x), mask_p.y + (y - r.min.y));
                let a = mask.at(mp) as u32;
                if a == 0 {
                    continue;
                }
                if a == 255 {
                    self.put(x, y, color);
                    continue;
                }
                let dst = self.get(x, y);
                let blend = |s: u8, d: u8| -> u8 {
                    ((s as u32 * a + d as u32 * (255 - a)) / 255) as u8
                };
                self.put(
                    x,
                    y,
                    Color {
                        r: blend(color.r, dst.r),
                        g: blend(color.g, dst.g),
                        b: blend(color.b, dst.b),
                        a: 0xff,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_clips() {
        let mut img = Image::new(4, 4);
        img.fill(Rect::new(-2, -2, 2, 2), Color::WHITE);
        assert_eq!(img.get(0, 0), Color::WHITE);
        assert_eq!(img.get(1, 1), Color::WHITE);
        assert_eq!(img.get(2, 2), Color { r: 0, g: 0, b: 0, a: 0 });
    }

    #[test]
    fn test_copy_within_scroll_up() {
        let mut img = Image::new(2, 4);
        img.fill(Rect::new(0, 2, 2, 3), Color::WHITE);
        // scroll up by two rows: row 2 lands on row 0
        img.copy_within(Point::new(0, 0), Rect::new(0, 2, 2, 4));
        assert_eq!(img.get(0, 0), Color::WHITE);
        assert_eq!(img.get(0, 1), Color { r: 0, g: 0, b: 0, a: 0 });
    }

    #[test]
    fn test_copy_within_scroll_down_overlapping() {
        let mut img = Image::new(1, 4);
        img.fill(Rect::new(0, 0, 1, 1), Color::WHITE);
        // shift everything down one row; overlapping ranges
        img.copy_within(Point::new(0, 1), Rect::new(0, 0, 1, 3));
        assert_eq!(img.get(0, 1), Color::WHITE);
        assert_eq!(img.get(0, 2), Color { r: 0, g: 0, b: 0, a: 0 });
    }

    #[test]
    fn test_draw_mask_full_coverage() {
        let mut img = Image::new(2, 2);
        let mask = AlphaMask {
            rect: Rect::new(0, 0, 2, 2),
            stride: 2,
            pix: vec![255, 0, 0, 255],
        };
        img.draw_mask(Rect::new(0, 0, 2, 2), Color::WHITE, &mask, Point::new(0, 0));
        assert_eq!(img.get(0, 0), Color::WHITE);
        assert_ne!(img.get(1, 0), Color::WHITE);
        assert_eq!(img.get(1, 1), Color::WHITE);
    }
}
