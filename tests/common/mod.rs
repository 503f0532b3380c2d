//! Shared test fixtures: a deterministic fixed-advance glyph face and a
//! clipboard-recording window backend

use std::sync::{Arc, Mutex};

use limn::core::draw::AlphaMask;
use limn::core::face::{FaceMetrics, GlyphFace, RasterGlyph};
use limn::core::geometry::{Point, Rect};
use limn::core::window::WindowBackend;

/// Monospace face: every glyph is a solid 6x10 block, advance 8, line
/// height 14, no kerning
pub struct TestFace;

impl GlyphFace for TestFace {
    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascent: 11,
            descent: 3,
            height: 14,
        }
    }

    fn glyph(&self, origin: Point, ch: char) -> Option<RasterGlyph> {
        if ch == ' ' {
            return Some(RasterGlyph {
                mask: AlphaMask {
                    rect: Rect::new(origin.x, origin.y, origin.x, origin.y),
                    stride: 0,
                    pix: Vec::new(),
                },
                advance: 8,
            });
        }
        let r = Rect::new(origin.x + 1, origin.y - 10, origin.x + 7, origin.y);
        Some(RasterGlyph {
            mask: AlphaMask {
                rect: r,
                stride: 6,
                pix: vec![0xff; 60],
            },
            advance: 8,
        })
    }

    fn advance(&self, _ch: char) -> i32 {
        8
    }

    fn kern(&self, _a: char, _b: char) -> i32 {
        0
    }
}

/// Backend whose clipboard state the test can observe from outside
#[derive(Default)]
pub struct SharedBackend {
    pub clipboard: Arc<Mutex<String>>,
    pub primary: Arc<Mutex<String>>,
}

impl WindowBackend for SharedBackend {
    fn set_clipboard(&mut self, s: &str) {
        *self.clipboard.lock().unwrap() = s.to_string();
    }

    fn get_clipboard(&mut self) -> String {
        self.clipboard.lock().unwrap().clone()
    }

    fn get_primary_selection(&mut self) -> String {
        self.primary.lock().unwrap().clone()
    }

    fn flush_image(&mut self, _rects: &[Rect]) {}
}
