//! Frame rendering: full repaint and the two fast paths
//!
//! `redraw` picks the cheapest path whose output is indistinguishable
//! from a full repaint:
//!
//! 1. **Tick move**: nothing was reloaded, the selection color is
//!    unchanged, and both the previously painted selection and the
//!    current one are empty. Erase the old tick, draw the new one,
//!    repaint parenthesis-match bands.
//! 2. **Scroll**: a prior push up/down already blitted the unchanged
//!    region, so only the newly exposed glyph band is painted.
//!
//! Everything else falls through to the full repaint.

use tracing::debug;

use crate::core::color::{Color, PMATCH_ROW};
use crate::core::geometry::{Point, Rect};
use crate::core::selection::Sel;

use super::{Frame, Glyph, MARK_SOFTWRAP};

impl Frame {
    pub(crate) fn all_selections_empty(&self) -> bool {
        self.sel.is_empty() && self.pmatch.is_empty()
    }

    fn really_visible_tick(&self) -> bool {
        if !self.visible_tick || !self.sel.is_empty() {
            return false;
        }
        let rp = self.sel.s as isize - self.top as isize;
        rp >= 0 && rp <= self.glyphs.len() as isize
    }

    /// Paint the selection band covering glyph range `[s, e)` (indices
    /// relative to `top`, possibly out of range) with `color`. A
    /// selection spanning several lines paints three rectangles: first
    /// line tail, middle block, last line head.
    fn redraw_selection(
        &mut self,
        s: isize,
        e: isize,
        color: Color,
        mut invalid: Option<&mut Vec<Rect>>,
    ) {
        let s = s.max(0) as usize;
        if s >= self.glyphs.len() {
            return;
        }
        let fm = self.face.metrics();

        let ss = self.glyphs[s];
        let sp = Point::new(ss.p.x, ss.p.y - fm.ascent);

        let se: Glyph;
        let sep: Point;
        let ep: Point;

        if e >= 0 && (e as usize) < self.glyphs.len() {
            se = self.glyphs[e as usize];
            sep = Point::new(self.left_margin, se.p.y - fm.ascent);
            ep = Point::new(se.p.x, se.p.y + fm.descent);
        } else if e >= 0 && e as usize == self.glyphs.len() {
            se = self.glyphs[self.glyphs.len() - 1];
            sep = Point::new(self.left_margin, se.p.y - fm.ascent);
            ep = Point::new(se.p.x + se.width, se.p.y + fm.descent);
        } else {
            se = self.glyphs[self.glyphs.len() - 1];
            sep = Point::new(self.left_margin, se.p.y - fm.ascent);
            ep = Point::new(self.right_margin, self.r.max.y);
        }

        if ss.p.y == se.p.y {
            let band = self.r.intersect(Rect {
                min: sp,
                max: ep,
            });
            if let Some(inv) = invalid.as_deref_mut() {
                inv.push(band);
            }
            self.b.fill(band, color);
        } else {
            let rs = self.r.intersect(Rect {
                min: sp,
                max: Point::new(self.right_margin, ss.p.y + fm.descent),
            });
            let re = self.r.intersect(Rect { min: sep, max: ep });
            let rb = self.r.intersect(Rect {
                min: Point::new(sep.x, ss.p.y + fm.descent),
                max: Point::new(self.right_margin, sep.y),
            });
            if let Some(inv) = invalid.as_deref_mut() {
                inv.push(rs);
                inv.push(re);
                inv.push(rb);
            }
            self.b.fill(rs, color);
            self.b.fill(re, color);
            self.b.fill(rb, color);
        }
    }

    /// Draw the tick at the selection caret with color column `idx`.
    /// The tick is a 1-px vertical bar from ascent to descent with 3x-wide
    /// horizontal flares at both ends. Returns the invalidated rectangle.
    fn draw_tick(&mut self, idx: usize) -> Rect {
        if !self.really_visible_tick() {
            return Rect {
                min: self.r.min,
                max: self.r.min,
            };
        }

        let (x, y);
        let rp = self.sel.s as isize - self.top as isize;
        if self.glyphs.is_empty() {
            let p = self.initial_ins_point();
            x = p.x;
            y = p.y;
        } else if rp >= 0 && (rp as usize) < self.glyphs.len() {
            let p = self.glyphs[rp as usize].p;
            x = p.x;
            y = p.y;
        } else {
            let g = self.glyphs[self.glyphs.len() - 1];
            if g.widthy > 0 {
                x = self.r.min.x + self.margin;
                y = g.p.y + g.widthy;
            } else {
                x = g.p.x + g.width + 1;
                y = g.p.y;
            }
        }

        let fm = self.face.metrics();

        let basedx = (((fm.height as f64) / 14.0 + 0.5).floor() as i32).max(1);
        let basedxl = basedx / 2;
        let mut basedxr = basedxl;
        if basedxl + basedxr < basedx {
            basedxr += 1;
        }

        let color = self.colors[0][idx];

        let r = Rect::new(x - basedxl, y - fm.ascent, x + basedxr, y + fm.descent + 1);
        self.b.fill(self.r.intersect(r), color);

        let mut r1 = r;
        r1.min.x -= r.dx();
        r1.max.x += r.dx();
        r1.max.y = r1.min.y + r.dx() * 3;
        self.b.fill(self.r.intersect(r1), color);

        let mut r2 = r;
        r2.min.x -= r.dx();
        r2.max.x += r.dx();
        r2.min.y = r2.max.y - r.dx() * 3;
        self.b.fill(self.r.intersect(r2), color);

        let mut rr = r;
        rr.min.x -= r.dx();
        rr.max.x += r.dx();
        rr
    }

    /// Erase the previously drawn tick by repainting its cell(s) with
    /// the background tick color and redrawing the glyphs it overlapped
    fn delete_tick(&mut self) -> Rect {
        let saved = self.sel;
        self.sel = self.opt.drawn_sel;
        let vt = self.visible_tick;
        self.visible_tick = true;
        let r = self.draw_tick(0);
        self.visible_tick = vt;

        if self.glyphs.is_empty() {
            self.sel = saved;
            return Rect {
                min: self.r.min,
                max: self.r.min,
            };
        }
        if self.sel.is_empty() {
            let rp = self.sel.s as isize - self.top as isize;
            if rp >= 0 && (rp as usize) < self.glyphs.len() {
                self.draw_single_glyph(rp as usize, 0);
                if rp >= 1 {
                    self.draw_single_glyph(rp as usize - 1, 0);
                }
            } else if rp >= 1 && ((rp - 1) as usize) < self.glyphs.len() {
                self.draw_single_glyph((rp - 1) as usize, 0);
            }
        }
        self.sel = saved;

        r
    }

    fn update_redraw_opt(&mut self) {
        self.opt.drawn_visible_tick = self.really_visible_tick();
        self.opt.drawn_sel = self.sel;
        self.opt.drawn_pmatch = self.pmatch;
        self.opt.sel_color = self.sel_color;
        self.opt.reloaded = false;
        self.opt.scroll_start = None;
        self.opt.scroll_end = None;
    }

    /// Tick-move fast path. Eligible only when the selection color is
    /// unchanged and both the drawn and current selections are empty.
    fn redraw_opt_tick_moved(&mut self) -> Option<Vec<Rect>> {
        if self.opt.sel_color != self.sel_color {
            return None;
        }

        let fromnil = self.opt.drawn_sel.is_empty();
        let tonil = self.sel.is_empty();
        if !fromnil || !tonil {
            return None;
        }

        debug!(from = ?self.opt.drawn_sel, to = ?self.sel, "tick-move redraw");

        let mut invalid = Vec::with_capacity(3);
        if self.opt.drawn_visible_tick {
            invalid.push(self.delete_tick());
        }
        invalid.push(self.draw_tick(1));

        if self.colors.len() > PMATCH_ROW {
            let drawn = self.opt.drawn_pmatch;
            let cur = self.pmatch;
            self.redraw_selection_logical(drawn, &mut invalid);
            self.redraw_selection_logical(cur, &mut invalid);
        }

        Some(invalid)
    }

    /// Repaint the band under `sel` with whatever color the current
    /// state assigns to it, then repaint the glyphs on top
    fn redraw_selection_logical(&mut self, sel: Sel, invalid: &mut Vec<Rect>) {
        if sel.is_empty() {
            return;
        }

        let color = if sel.s >= self.pmatch.s && sel.e <= self.pmatch.e {
            self.colors[PMATCH_ROW][0]
        } else if sel.s >= self.sel.s && sel.e <= self.sel.e {
            self.colors[self.sel_color + 1][0]
        } else {
            self.colors[0][0]
        };

        let rs = sel.s as isize - self.top as isize;
        let re = sel.e as isize - self.top as isize;

        if re < 0 {
            return;
        }
        if rs >= self.glyphs.len() as isize {
            return;
        }

        self.redraw_selection(rs, re, color, Some(invalid));
        let lo = rs.max(0) as usize;
        let hi = (re.max(0) as usize).min(self.glyphs.len());
        self.redraw_range(lo..hi, false);
    }

    /// Redraw the frame. `flush` forwards the invalidated rectangles to
    /// the flush callback; `predraw_rects` collects them for the caller.
    pub fn redraw(&mut self, flush: bool, mut predraw_rects: Option<&mut Vec<Rect>>) {
        self.right_margin = self.r.max.x - self.margin;
        self.left_margin = self.r.min.x + self.margin;

        // FAST PATH 1
        // Followed only if the frame wasn't reloaded (clear/insert were
        // not called) since the last draw and at most the tick moved
        if !self.opt.reloaded {
            if let Some(invalid) = self.redraw_opt_tick_moved() {
                self.update_redraw_opt();
                if flush {
                    self.run_flush(&invalid);
                }
                if let Some(out) = predraw_rects.as_deref_mut() {
                    out.extend_from_slice(&invalid);
                }
                return;
            }
        }

        // FAST PATH 2
        // Followed only after a scroll operation with no active
        // selections; the bitmap was already blitted, paint the exposed
        // band only
        if let Some(ss) = self.opt.scroll_start {
            debug!(scroll_start = ss, "scroll redraw");
            let se = self.opt.scroll_end.unwrap_or(self.glyphs.len());
            self.redraw_range(ss..se, true);
            let tp = self.sel.s as isize - self.top as isize;
            if tp >= ss as isize && tp <= se as isize {
                self.draw_tick(1);
            }
            self.update_redraw_opt();
            let whole = [self.r];
            if flush {
                self.run_flush(&whole);
            }
            if let Some(out) = predraw_rects.as_deref_mut() {
                out.push(self.r);
            }
            return;
        }

        self.update_redraw_opt();

        // NORMAL PATH
        debug!("full redraw");

        self.b.fill(self.r, self.colors[0][0]);
        self.redraw_range(0..self.glyphs.len(), true);
        self.draw_tick(1);

        let whole = [self.r];
        if flush {
            self.run_flush(&whole);
        }
        if let Some(out) = predraw_rects.as_deref_mut() {
            out.push(self.r);
        }
    }

    fn run_flush(&mut self, rects: &[Rect]) {
        if let Some(mut f) = self.flush.take() {
            f(rects);
            self.flush = Some(f);
        }
    }

    /// Paint the glyphs in `range` (absolute glyph indices), optionally
    /// painting the selection and parenthesis-match bands under them
    fn redraw_range(&mut self, range: std::ops::Range<usize>, draw_sels: bool) {
        let mut ssel = 0usize;
        let mut cury = match self.glyphs.first() {
            Some(g) => g.p.y,
            None => 0,
        };
        let mut newline = true;

        let top = self.top as isize;
        let in_range = |x: usize| -> bool {
            let rel = x as isize - top;
            rel >= range.start as isize && rel < range.end as isize
        };

        if draw_sels {
            if !self.pmatch.is_empty() && self.colors.len() > PMATCH_ROW && in_range(self.pmatch.s) {
                let (ps, pe) = (
                    self.pmatch.s as isize - top,
                    self.pmatch.e as isize - top,
                );
                let c = self.colors[PMATCH_ROW][0];
                self.redraw_selection(ps, pe, c, None);
            }

            let spanning = {
                let rel_s = self.sel.s as isize - top;
                let rel_e = self.sel.e as isize - top;
                (range.start as isize) >= rel_s && (range.start as isize) < rel_e
            };
            if !self.sel.is_empty()
                && (in_range(self.sel.s) || in_range(self.sel.e) || spanning)
            {
                let (ss, se) = (self.sel.s as isize - top, self.sel.e as isize - top);
                let c = self.colors[self.sel_color + 1][0];
                self.redraw_selection(ss, se, c, None);
            }
        }

        let fm = self.face.metrics();
        for i in range {
            let g = match self.glyphs.get(i) {
                Some(g) => *g,
                None => break,
            };
            let reali = i + self.top;

            // selection state tracking
            if ssel != 0 {
                if reali >= self.sel.e {
                    ssel = 0;
                }
            } else if reali >= self.sel.s && reali < self.sel.e {
                ssel = self.sel_color + 1;
            }

            let onpmatch = !self.pmatch.is_empty()
                && reali == self.pmatch.s
                && self.colors.len() > PMATCH_ROW
                && ssel == 0;

            // softwrap marks on line changes that aren't newlines
            if g.p.y != cury && self.flags & MARK_SOFTWRAP != 0 {
                let midline = cury - fm.height / 2;
                if !newline {
                    let r = Rect::new(
                        self.right_margin,
                        midline,
                        self.right_margin + self.margin,
                        midline + 1,
                    );
                    self.b.fill(self.r.intersect(r), self.colors[0][1]);
                }

                cury = g.p.y;
                let midline = cury - fm.height / 2;

                if !newline {
                    let r = Rect::new(
                        self.left_margin - self.margin,
                        midline,
                        self.left_margin,
                        midline + 1,
                    );
                    self.b.fill(self.r.intersect(r), self.colors[0][1]);
                }
            }
            newline = g.r == '\n';

            // glyph drawing
            let ch = if g.fake { ' ' } else { g.r };
            if let Some(rg) = self.face.glyph(g.p, ch) {
                let dr = self.r.intersect(rg.mask.rect);
                if !dr.is_empty() {
                    let mut color = self.colors[1][1];
                    if ssel < self.colors.len()
                        && (g.color as usize) < self.colors[ssel].len()
                    {
                        color = self.colors[ssel][g.color as usize];
                    }
                    if onpmatch {
                        if let Some(c) = self.colors[PMATCH_ROW].get(g.color as usize) {
                            color = *c;
                        }
                    }
                    self.b.draw_mask(dr, color, &rg.mask, dr.min);
                }
            }
        }
    }

    /// Repaint a single glyph cell: background then glyph, used to erase
    /// the tick without repainting the whole line
    fn draw_single_glyph(&mut self, i: usize, ssel: usize) {
        let g = self.glyphs[i];
        let ch = if g.fake { ' ' } else { g.r };
        let Some(rg) = self.face.glyph(g.p, ch) else {
            return;
        };
        let dr = self.r.intersect(rg.mask.rect);
        if dr.is_empty() {
            return;
        }

        let mut color = self.colors[1][1];
        let mut bgcolor = self.colors[1][0];
        if ssel < self.colors.len() && (g.color as usize) < self.colors[ssel].len() {
            color = self.colors[ssel][g.color as usize];
            bgcolor = self.colors[ssel][0];
        }

        // clear the cell, then redraw the glyph
        self.b.fill(dr, bgcolor);
        self.b.draw_mask(dr, color, &rg.mask, dr.min);
    }
}
