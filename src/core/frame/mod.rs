//! Text frame: glyph layout and incremental rendering
//!
//! A frame owns a window of laid-out glyphs over a slice of a buffer,
//! starting at rune offset `top`. Layout walks an insertion point left to
//! right, softwrapping before the right margin unless [`TRUNCATE`] is set,
//! expanding tabs against either the fixed tab width or a per-buffer
//! tab-stop array, and applying kerning between adjacent real glyphs.
//! Newlines and tabs become fake glyphs whose pixel form is a blank of a
//! specific width, which keeps the glyph array uniform.
//!
//! Rendering lives in [`redraw`]: a full repaint plus two fast paths
//! (tick move and scroll blit) that must be indistinguishable from the
//! full repaint.

mod redraw;

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::color::ColorMatrix;
use crate::core::draw::Image;
use crate::core::face::GlyphFace;
use crate::core::geometry::{Point, Rect};
use crate::core::input::{MouseDir, MouseInput};
use crate::core::selection::Sel;

/// Draw a 1-px softwrap mark at both margins where a line breaks without
/// a newline
pub const MARK_SOFTWRAP: u32 = 1 << 0;
/// Truncate long lines at the right margin instead of softwrapping
pub const TRUNCATE: u32 = 1 << 1;
/// Keep laying out glyphs past the bottom of the visible rectangle
pub const NO_VERT_STOP: u32 = 1 << 2;

/// Low nibble of a [`ColorRune`] tag selects the column of the color
/// matrix
pub const COLOR_MASK: u16 = 0x0f;

/// A Unicode scalar paired with a color tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRune {
    pub c: u16,
    pub r: char,
}

/// Tag every rune of `s` with the default foreground color
pub fn color_runes(s: &str) -> Vec<ColorRune> {
    s.chars().map(|r| ColorRune { c: 1, r }).collect()
}

/// Autoscroll cadence while dragging a selection outside the frame
const AUTOSCROLL_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub(crate) struct Glyph {
    pub r: char,
    pub fake: bool,
    pub width: i32,
    pub widthy: i32,
    pub p: Point,
    pub color: u8,
}

/// Scroll request callback: `dir` is -1/+1 for line scrolls, 0 to jump to
/// an absolute position `n`
pub type ScrollFn = Box<dyn FnMut(&mut Frame, i32, i32) + Send>;
/// Word/line selection expansion hook: `(kind, start, end) -> (start, end)`
pub type ExpandSelectionFn = Box<dyn Fn(usize, usize, usize) -> (usize, usize) + Send>;
/// Pixel flush callback, handed the invalidated rectangles
pub type FlushFn = Box<dyn FnMut(&[Rect]) + Send>;

/// Snapshot of what the last redraw actually painted; reconciling it with
/// the current state picks the fast path.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RedrawOpt {
    pub drawn_visible_tick: bool,
    pub drawn_sel: Sel,
    pub drawn_pmatch: Sel,
    pub sel_color: usize,
    pub reloaded: bool,
    pub scroll_start: Option<usize>,
    pub scroll_end: Option<usize>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("color matrix needs at least 2 rows, has {0}")]
    NotEnoughColorRows(usize),
    #[error("color matrix row {0} needs at least 2 colors, has {1}")]
    NotEnoughColors(usize, usize),
}

pub struct Frame {
    pub(crate) face: Arc<dyn GlyphFace>,
    pub flags: u32,
    /// The image the text is drawn upon
    pub b: Image,
    /// The rectangle occupied by the frame
    pub r: Rect,
    pub visible_tick: bool,
    pub colors: ColorMatrix,
    pub tab_width: usize,
    pub flush: Option<FlushFn>,
    pub scroll: Option<ScrollFn>,
    pub expand_selection: Option<ExpandSelectionFn>,
    /// Rune offset in the enclosing buffer of the first laid-out glyph
    pub top: usize,
    /// Per-buffer tab stops in pixels from the left margin; when unset
    /// tabs advance to multiples of `tab_width` space widths
    pub tabs: Option<Vec<i32>>,
    pub offset: i32,

    pub sel: Sel,
    pub sel_color: usize,
    pub pmatch: Sel,

    margin: i32,
    min_drag: i32,
    pub(crate) glyphs: Vec<Glyph>,
    ins: Point,
    last_full: usize,
    pub(crate) opt: RedrawOpt,
    pub(crate) left_margin: i32,
    pub(crate) right_margin: i32,
}

impl Frame {
    pub fn new(
        face: Arc<dyn GlyphFace>,
        colors: ColorMatrix,
        r: Rect,
        margin: i32,
    ) -> Result<Self, FrameError> {
        let mut fr = Frame {
            face,
            flags: 0,
            b: Image::new(r.max.x, r.max.y),
            r,
            visible_tick: false,
            colors,
            tab_width: 0,
            flush: None,
            scroll: None,
            expand_selection: None,
            top: 0,
            tabs: None,
            offset: 0,
            sel: Sel::default(),
            sel_color: 0,
            pmatch: Sel::default(),
            margin: 0,
            min_drag: 0,
            glyphs: Vec::new(),
            ins: Point::default(),
            last_full: 0,
            opt: RedrawOpt::default(),
            left_margin: 0,
            right_margin: 0,
        };
        fr.init(margin)?;
        Ok(fr)
    }

    /// (Re)initialize the frame: validates the color matrix, resets the
    /// selection machinery, and clears the glyph array.
    pub fn init(&mut self, margin: i32) -> Result<(), FrameError> {
        self.margin = margin;
        self.glyphs.clear();
        self.offset = 0;
        self.sel_color = 0;

        if self.tab_width == 0 {
            self.tab_width = 8;
        }

        if self.colors.len() < 2 {
            return Err(FrameError::NotEnoughColorRows(self.colors.len()));
        }
        for (i, row) in self.colors.iter().enumerate() {
            if row.len() < 2 {
                return Err(FrameError::NotEnoughColors(i, row.len()));
            }
        }

        self.min_drag = self.face.advance('x').max(5);

        self.clear();
        Ok(())
    }

    /// Force the next redraw onto the slow path (the buffer changed
    /// behind the frame's back)
    pub fn invalidate(&mut self) {
        self.opt.reloaded = true;
    }

    /// Move the frame to a new rectangle, reallocating its backing image
    pub fn reshape(&mut self, r: Rect) {
        self.r = r;
        self.b = Image::new(r.max.x, r.max.y);
        self.clear();
    }

    /// Line height shortcut used by layout code outside the frame
    pub fn face_metrics_height(&self) -> i32 {
        self.face.metrics().height
    }

    /// Pixel advance of `s` under this frame's face, kerning included
    pub fn text_advance(&self, s: &str) -> i32 {
        let mut w = 0;
        let mut prev: Option<char> = None;
        for ch in s.chars() {
            if let Some(p) = prev {
                w += self.face.kern(p, ch);
            }
            w += self.face.advance(ch);
            prev = Some(ch);
        }
        w
    }

    fn initial_ins_point(&self) -> Point {
        Point::new(
            self.r.min.x + self.offset + self.margin,
            self.r.min.y + self.face.metrics().ascent,
        )
    }

    pub fn clear(&mut self) {
        self.ins = self.initial_ins_point();
        self.glyphs.clear();
        self.last_full = 0;
        self.opt.reloaded = true;
        self.opt.scroll_start = None;
        self.opt.scroll_end = None;
    }

    /// Number of laid-out glyphs
    pub fn size(&self) -> usize {
        self.glyphs.len()
    }

    pub fn margin(&self) -> i32 {
        self.margin
    }

    /// Lay out `runes` at the insertion point; returns the maximum X and
    /// Y pixel reached. Stops past the bottom of the visible rectangle
    /// unless [`NO_VERT_STOP`] is set.
    pub fn insert(&mut self, runes: &[ColorRune]) -> Point {
        self.opt.reloaded = true;
        let lh = self.face.metrics().height;

        let mut prev: Option<char> = None;

        self.right_margin = self.r.max.x - self.margin;
        self.left_margin = self.r.min.x + self.margin;
        let bottom = self.r.max.y + lh;

        let space_width = self.face.advance(' ');
        let tab_width = (space_width * self.tab_width as i32).max(1);

        let mut limit = self.ins;

        for crune in runes {
            if self.ins.y > bottom && self.flags & NO_VERT_STOP == 0 {
                return limit;
            }

            if self.ins.y < self.r.max.y {
                self.last_full = self.glyphs.len();
            }

            match crune.r {
                '\n' => {
                    self.glyphs.push(Glyph {
                        r: crune.r,
                        fake: true,
                        p: self.ins,
                        color: (crune.c & COLOR_MASK) as u8,
                        width: self.r.max.x - self.ins.x - self.margin,
                        widthy: lh,
                    });
                    self.ins.x = self.left_margin;
                    self.ins.y += lh;
                    prev = Some(' ');
                }

                '\t' => {
                    let mut to_next_cell = 0;
                    match &self.tabs {
                        Some(tabs) => {
                            for &t0 in tabs {
                                let t = t0 + self.left_margin;
                                if self.ins.x + space_width / 2 < t {
                                    to_next_cell = t - self.ins.x;
                                    break;
                                }
                            }
                        }
                        None => {
                            to_next_cell = tab_width - (self.ins.x - self.left_margin) % tab_width;
                            if to_next_cell <= space_width / 2 {
                                to_next_cell += tab_width;
                            }
                        }
                    }

                    self.glyphs.push(Glyph {
                        r: crune.r,
                        fake: true,
                        p: self.ins,
                        color: (crune.c & COLOR_MASK) as u8,
                        width: to_next_cell,
                        widthy: 0,
                    });
                    self.ins.x += to_next_cell;
                    prev = Some(' ');
                }

                _ => {
                    let width = self.face.advance(crune.r);
                    if let Some(p) = prev {
                        self.ins.x += self.face.kern(p, crune.r);
                    }

                    if self.flags & TRUNCATE == 0 && self.ins.x + width > self.right_margin {
                        self.ins.x = self.left_margin;
                        self.ins.y += lh;
                    }

                    self.glyphs.push(Glyph {
                        r: crune.r,
                        fake: false,
                        p: self.ins,
                        color: (crune.c & COLOR_MASK) as u8,
                        width,
                        widthy: 0,
                    });
                    self.ins.x += width;
                    prev = Some(crune.r);
                }
            }

            limit.x = limit.x.max(self.ins.x);
            limit.y = limit.y.max(self.ins.y);
        }
        if self.ins.y < self.r.max.y {
            self.last_full = self.glyphs.len();
        }
        limit
    }

    /// Reload rune values and color tags in place; `a` and `b` are the
    /// two halves of the backing text (before and after an edit point)
    pub fn refresh_colors(&mut self, a: &[ColorRune], b: &[ColorRune]) {
        for i in 0..self.glyphs.len() {
            let crune = if i < a.len() {
                a[i]
            } else {
                match b.get(i - a.len()) {
                    Some(cr) => *cr,
                    None => break,
                }
            };
            self.glyphs[i].r = crune.r;
            self.glyphs[i].color = (crune.c & COLOR_MASK) as u8;
        }
    }

    /// Set the endpoints of the selection; pass `start == end` for a
    /// caret. `kind` 2 and 3 are expanded to word/line boundaries by the
    /// expansion hook when one is installed.
    pub fn set_select(&mut self, idx: usize, kind: usize, start: usize, end: usize) {
        let idx = if idx >= self.colors.len() { 0 } else { idx };
        self.sel_color = idx;

        let (start, end) = if start >= end {
            (end, start)
        } else {
            (start, end)
        };

        match &self.expand_selection {
            Some(f) => {
                let (ns, ne) = f(kind, start, end);
                self.sel = Sel::new(ns, ne);
            }
            None => self.sel = Sel::new(start, end),
        }
    }

    /// Convert a pixel coordinate to a rune index, `None` outside the
    /// frame rectangle
    pub fn coord_to_point(&self, coord: Point) -> Option<usize> {
        if !self.r.contains(coord) {
            return None;
        }

        let fm = self.face.metrics();
        let lh = fm.height;

        for (i, g) in self.glyphs.iter().enumerate() {
            if g.p.y + fm.descent < coord.y {
                continue;
            } else if g.p.y - lh > coord.y {
                return Some(i + self.top);
            } else if coord.x < g.p.x {
                return Some(i + self.top);
            } else if g.r == '\n' {
                return Some(i + self.top);
            } else if coord.x >= g.p.x && coord.x < g.p.x + g.width {
                return Some(i + self.top);
            }
        }

        Some(self.top + self.glyphs.len())
    }

    /// Convert a rune index to the baseline position of its glyph. One
    /// past the last glyph maps past that glyph's advance; out-of-range
    /// positions map to the frame origin plus a small inset.
    pub fn point_to_coord(&self, p: usize) -> Point {
        let pp = p as isize - self.top as isize;
        if pp < 0 {
            if self.glyphs.is_empty() {
                self.ins
            } else {
                self.glyphs[0].p
            }
        } else if (pp as usize) < self.glyphs.len() {
            self.glyphs[pp as usize].p
        } else if pp as usize == self.glyphs.len() && !self.glyphs.is_empty() {
            let g = &self.glyphs[self.glyphs.len() - 1];
            Point::new(g.p.x + g.width, g.p.y)
        } else {
            Point::new(self.r.min.x + 2, self.r.min.y + 2)
        }
    }

    /// Whether rune index `p` is laid out entirely inside the visible
    /// rectangle
    pub fn inside(&self, p: usize) -> bool {
        let rp = p as isize - self.top as isize;
        rp >= 0 && rp <= self.last_full as isize
    }

    /// Number of whole text lines that fit the frame rectangle
    pub fn line_no(&self) -> i32 {
        (self.r.dy() as f32 / self.face.metrics().height as f32) as i32
    }

    /// Bottom pixel of the last laid-out glyph
    pub fn limit_y(&self) -> i32 {
        let p = self.point_to_coord(self.top + self.glyphs.len().saturating_sub(1));
        p.y + self.face.metrics().descent
    }

    /// Indices of the glyphs that start each physical (on-screen) line;
    /// softwraps count as line starts
    pub(crate) fn physical_lines(&self) -> Vec<usize> {
        let mut r = Vec::new();
        let mut y = 0;
        for (i, g) in self.glyphs.iter().enumerate() {
            if g.p.y != y {
                r.push(i);
                y = g.p.y;
            }
        }
        r
    }

    /// Push the text up by `ln` physical lines, dropping glyphs that
    /// scroll off the top and advancing `top`. When `draw_opt` is set and
    /// no selection is active, the frame bitmap is blitted and the next
    /// redraw paints only the exposed band. Returns the number of glyphs
    /// left.
    pub fn push_up(&mut self, ln: usize, draw_opt: bool) -> usize {
        self.ins = self.initial_ins_point();

        let fm = self.face.metrics();
        let lh = fm.height;

        let mut off: Option<usize> = None;
        for i in 0..self.glyphs.len() {
            self.glyphs[i].p.y -= ln as i32 * lh;
            if off.is_none() && self.glyphs[i].p.y >= self.ins.y {
                off = Some(i);
            }
        }

        match off {
            Some(off) => {
                self.top += off;
                let g = self.glyphs[self.glyphs.len() - 1];
                self.glyphs.drain(..off);
                self.glyphs.pop();
                self.ins.x = g.p.x;
                self.ins.y = g.p.y;
                // re-inserting the last glyph re-triggers layout from its cell
                self.insert(&[ColorRune {
                    c: g.color as u16,
                    r: g.r,
                }]);
            }
            None => {
                self.top += self.glyphs.len();
                self.glyphs.clear();
            }
        }

        self.last_full = self.glyphs.len();

        if self.all_selections_empty() && draw_opt {
            let h = ln as i32 * lh;

            let mut ss: isize = self.glyphs.len() as isize - 1;
            while ss > 0 {
                let g = &self.glyphs[ss as usize];
                if g.p.y + lh < self.r.max.y - h {
                    break;
                }
                ss -= 1;
            }
            self.opt.scroll_start = if ss >= 0 { Some(ss as usize) } else { None };
            self.opt.scroll_end = None;

            self.b.copy_within(
                self.r.min,
                Rect::new(self.r.min.x, self.r.min.y + h, self.r.max.x, self.r.max.y),
            );

            let mut band = self.r;
            band.min.y = match self.opt.scroll_start {
                Some(ss) if ss < self.glyphs.len() => self.glyphs[ss].p.y + fm.descent,
                _ => self.r.max.y - h,
            };
            let band = band.intersect(self.r);
            self.b.fill(band, self.colors[0][0]);
        }

        self.glyphs.len()
    }

    /// Re-lay out `a ++ b ++ old glyphs`, pushing overflow back up until
    /// the inserted prefix fits in `ln` physical lines. This scrolls the
    /// frame down by `ln` lines with `a`/`b` becoming the newly exposed
    /// text.
    pub fn push_down(&mut self, ln: usize, a: &[ColorRune], b: &[ColorRune]) {
        let oldglyphs = self.glyphs.clone();

        self.top = self.top.saturating_sub(a.len() + b.len());
        self.clear();

        let mut a = a;
        let mut b = b;
        loop {
            let ng = self.glyphs.len();

            if !a.is_empty() {
                self.insert(a);
            }
            if !b.is_empty() {
                self.insert(b);
            }

            let pl = self.physical_lines();
            if pl.len() <= ln {
                break;
            }

            let added = self.glyphs.len() - ng;

            self.push_up(pl.len() - ln, false);

            if added == 0 {
                break;
            }

            if a.len() > added {
                a = &a[added..];
            } else {
                let rest = added - a.len();
                a = &[];
                if b.len() > rest {
                    b = &b[rest..];
                } else {
                    b = &[];
                }
            }
        }

        let fm = self.face.metrics();
        let lh = fm.height;

        if self.all_selections_empty() {
            self.opt.scroll_start = Some(0);
            self.opt.scroll_end = Some(self.glyphs.len());

            let h = self.physical_lines().len() as i32 * lh;
            self.b.copy_within(
                Point::new(self.r.min.x, self.r.min.y + h),
                Rect::new(self.r.min.x, self.r.min.y, self.r.max.x, self.r.max.y - h),
            );

            let mut band = self.r;
            band.max.y = band.min.y + h;
            let band = band.intersect(self.r);
            self.b.fill(band, self.colors[0][0]);
        }

        self.left_margin = self.r.min.x + self.margin;
        let bottom = self.r.max.y + lh;

        if self.ins.x != self.left_margin {
            self.ins.x = self.left_margin;
            self.ins.y += lh;
        }

        let mut old_y = 0;
        if let Some(g) = oldglyphs.first() {
            old_y = g.p.y;
        }

        for g in &oldglyphs {
            if self.ins.y > bottom {
                return;
            }

            if self.ins.y < self.r.max.y {
                self.last_full = self.glyphs.len();
            }

            let mut g = *g;
            if g.p.y != old_y {
                self.ins.y += lh;
                old_y = g.p.y;
            }

            g.p.y = self.ins.y;
            self.ins.x = g.p.x;

            self.glyphs.push(g);
        }

        if self.ins.y < self.r.max.y {
            self.last_full = self.glyphs.len();
        }
    }

    /// Track the mouse until release, continuously updating the
    /// selection. `kind` is 1 for character, 2 for word, 3 for line
    /// selection; motion below the drag threshold is ignored. While the
    /// pointer is outside the frame the text autoscrolls one line per
    /// tick, extending the selection to the exposed edge. Returns the
    /// release event, or `None` when the channel closed.
    pub fn select_until_release(
        &mut self,
        idx: usize,
        kind: usize,
        start_pos: Point,
        events: &Receiver<MouseInput>,
    ) -> Option<MouseInput> {
        if idx + 1 >= self.colors.len() {
            // not a selectable color row; swallow events until release
            while let Ok(e) = events.recv() {
                if e.dir == MouseDir::Release {
                    return Some(e);
                }
            }
            return None;
        }

        self.pmatch.e = self.pmatch.s;
        self.sel_color = idx;
        let fix = self.sel.s;

        let mut autoscroll = false;
        let mut last_pos = Point::default();
        let mut started = false;

        let mut r = self.r;
        r.max.y -= 2;

        loop {
            let ev = if autoscroll {
                match events.recv_timeout(AUTOSCROLL_TICK) {
                    Ok(e) => Some(e),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return None,
                }
            } else {
                match events.recv() {
                    Ok(e) => Some(e),
                    Err(_) => return None,
                }
            };

            match ev {
                Some(e) => {
                    if e.dir == MouseDir::Release {
                        return Some(e);
                    }

                    let pos = e.pos;
                    if !started && (pos.x - start_pos.x).abs() < self.min_drag {
                        continue;
                    }
                    started = true;

                    last_pos = pos;
                    if r.contains(pos) {
                        autoscroll = false;
                        if let Some(p) = self.coord_to_point(pos) {
                            self.set_select(idx, kind, fix, p);
                            self.redraw(true, None);
                        }
                    } else {
                        autoscroll = true;
                    }
                }

                None => {
                    // autoscroll tick
                    if last_pos.x >= self.r.min.x && last_pos.x <= self.r.max.x {
                        let mid = (self.r.min.y + self.r.max.y) / 2;
                        let sd = if last_pos.y < mid { -1 } else { 1 };

                        if let Some(mut scroll) = self.scroll.take() {
                            scroll(self, sd, 1);
                            self.scroll = Some(scroll);
                        }
                        if sd < 0 {
                            self.set_select(idx, kind, self.top, fix);
                        } else {
                            self.set_select(idx, kind, self.glyphs.len() + self.top, fix);
                        }
                        self.redraw(true, None);
                    }
                }
            }
        }
    }
}
