//! Glyph face abstraction
//!
//! The frame lays out and paints through [`GlyphFace`], which reports
//! integer pixel metrics and produces positioned coverage masks. The
//! shipping implementation rasterizes through fontdue; tests substitute a
//! fixed-advance face.

use thiserror::Error;

use crate::core::draw::AlphaMask;
use crate::core::geometry::{Point, Rect};

/// Vertical font metrics in pixels
#[derive(Debug, Clone, Copy)]
pub struct FaceMetrics {
    /// Distance from baseline to the top of the line
    pub ascent: i32,
    /// Distance from baseline to the bottom of the line
    pub descent: i32,
    /// Baseline-to-baseline line height
    pub height: i32,
}

/// A rasterized glyph: a coverage mask positioned in image coordinates
/// (relative to the baseline origin it was requested at) plus the pen
/// advance.
#[derive(Debug, Clone)]
pub struct RasterGlyph {
    pub mask: AlphaMask,
    pub advance: i32,
}

pub trait GlyphFace: Send + Sync {
    fn metrics(&self) -> FaceMetrics;

    /// Rasterize `ch` with its baseline origin at `origin`. Returns None
    /// when the face has no usable glyph for `ch`.
    fn glyph(&self, origin: Point, ch: char) -> Option<RasterGlyph>;

    /// Pen advance of `ch` without rasterizing
    fn advance(&self, ch: char) -> i32;

    /// Kerning adjustment between `a` and `b`, usually 0
    fn kern(&self, a: char, b: char) -> i32;
}

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("font parse failed: {0}")]
    Parse(&'static str),
    #[error("font has no horizontal metrics")]
    NoLineMetrics,
}

/// A [`GlyphFace`] backed by a fontdue font at a fixed pixel size
pub struct FontdueFace {
    font: fontdue::Font,
    px: f32,
    metrics: FaceMetrics,
}

impl FontdueFace {
    pub fn new(font_data: &[u8], px: f32) -> Result<Self, FaceError> {
        let font = fontdue::Font::from_bytes(font_data, fontdue::FontSettings::default())
            .map_err(FaceError::Parse)?;
        let lm = font
            .horizontal_line_metrics(px)
            .ok_or(FaceError::NoLineMetrics)?;
        let metrics = FaceMetrics {
            ascent: lm.ascent.round() as i32,
            descent: (-lm.descent).round() as i32,
            height: lm.new_line_size.round() as i32,
        };
        Ok(Self { font, px, metrics })
    }
}

impl GlyphFace for FontdueFace {
    fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn glyph(&self, origin: Point, ch: char) -> Option<RasterGlyph> {
        let (m, bitmap) = self.font.rasterize(ch, self.px);
        let x0 = origin.x + m.xmin;
        let y1 = origin.y - m.ymin;
        let y0 = y1 - m.height as i32;
        Some(RasterGlyph {
            mask: AlphaMask {
                rect: Rect::new(x0, y0, x0 + m.width as i32, y1),
                stride: m.width,
                pix: bitmap,
            },
            advance: m.advance_width.round() as i32,
        })
    }

    fn advance(&self, ch: char) -> i32 {
        self.font.metrics(ch, self.px).advance_width.round() as i32
    }

    fn kern(&self, a: char, b: char) -> i32 {
        self.font
            .horizontal_kern(a, b, self.px)
            .map(|k| k.round() as i32)
            .unwrap_or(0)
    }
}
