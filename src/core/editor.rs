//! Editor: a tag line over a body frame
//!
//! An editor pairs two buffer+frame couples: the one-line tag (buffer
//! path plus standing verbs, then whatever the user types after the `|`)
//! and the body. Refreshing re-lays the frame out from its buffer and
//! installs the word/line expansion and scroll hooks with a snapshot of
//! the text.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use crate::core::buffer::Buffer;
use crate::core::color::ColorMatrix;
use crate::core::face::GlyphFace;
use crate::core::frame::{ColorRune, Frame, FrameError, MARK_SOFTWRAP};
use crate::core::geometry::Rect;
use crate::core::id::EditorId;
use crate::core::input::{route_click, ClickOutcome, MouseInput};
use crate::core::lookfile::LookFileMsg;

pub struct Editor {
    pub id: EditorId,
    pub r: Rect,
    pub tag_buf: Buffer,
    pub body_buf: Buffer,
    pub tag_fr: Frame,
    pub body_fr: Frame,
    /// Set after a Del was refused because of unsaved changes; the next
    /// Del goes through
    pub confirm_del: bool,
    /// When the editor is in special mode (the LookFile window), events
    /// are rerouted to this channel instead of the normal dispatcher
    pub special: Option<Sender<LookFileMsg>>,
}

impl Editor {
    pub fn new(
        id: EditorId,
        face: Arc<dyn GlyphFace>,
        colors: ColorMatrix,
        tag_colors: ColorMatrix,
        r: Rect,
        body_buf: Buffer,
    ) -> Result<Self, FrameError> {
        let tag_h = face.metrics().height + 4;
        let tag_r = Rect::new(r.min.x, r.min.y, r.max.x, (r.min.y + tag_h).min(r.max.y));
        let body_r = Rect::new(r.min.x, tag_r.max.y, r.max.x, r.max.y);

        let tag_fr = Frame::new(face.clone(), tag_colors, tag_r, 4)?;
        let mut body_fr = Frame::new(face, colors, body_r, 4)?;
        body_fr.flags |= MARK_SOFTWRAP;
        body_fr.visible_tick = true;

        let mut tag_buf = Buffer::new(&body_buf.name, &body_buf.dir);

        let mut ed = Editor {
            id,
            r,
            tag_buf: Buffer::default(),
            body_buf,
            tag_fr,
            body_fr,
            confirm_del: false,
            special: None,
        };
        ed.gen_tag_into(&mut tag_buf);
        ed.tag_buf = tag_buf;
        ed.buffer_refresh(true);
        ed.buffer_refresh(false);
        Ok(ed)
    }

    /// Rebuild the fixed part of the tag, preserving whatever the user
    /// typed after the editable marker
    pub fn gen_tag(&mut self) {
        let mut tag = std::mem::take(&mut self.tag_buf);
        self.gen_tag_into(&mut tag);
        self.tag_buf = tag;
        self.buffer_refresh(true);
    }

    fn gen_tag_into(&self, tag: &mut Buffer) {
        let user = if tag.editable_start <= tag.size() {
            tag.to_string_range(tag.editable_start, tag.size())
        } else {
            String::new()
        };
        let fixed = format!("{} Del Look Put | ", self.body_buf.path().display());
        let mut sel = crate::core::selection::Sel::new(0, tag.size());
        tag.replace(
            &format!("{}{}", fixed, user),
            &mut sel,
            crate::core::buffer::ReplaceOrigin::Kbd,
        );
        tag.editable_start = fixed.chars().count();
        tag.name = self.body_buf.name.clone();
        tag.dir = self.body_buf.dir.clone();
        tag.modified = false;
    }

    /// Move the editor to a new rectangle, re-laying out both frames
    pub fn resize(&mut self, r: Rect) {
        if r == self.r {
            return;
        }
        self.r = r;
        let tag_h = self.tag_fr.face_metrics_height() + 4;
        let tag_r = Rect::new(r.min.x, r.min.y, r.max.x, (r.min.y + tag_h).min(r.max.y));
        let body_r = Rect::new(r.min.x, tag_r.max.y, r.max.x, r.max.y);
        self.tag_fr.reshape(tag_r);
        self.body_fr.reshape(body_r);
        self.buffer_refresh(true);
        self.buffer_refresh(false);
    }

    /// Text the user typed into the tag after the editable marker
    pub fn tag_text(&self) -> String {
        self.tag_buf
            .to_string_range(self.tag_buf.editable_start, self.tag_buf.size())
    }

    /// Re-lay the frame out from its buffer, reinstall the text hooks,
    /// and redraw
    pub fn buffer_refresh(&mut self, on_tag: bool) {
        {
            let (fr, buf) = if on_tag {
                (&mut self.tag_fr, &self.tag_buf)
            } else {
                (&mut self.body_fr, &self.body_buf)
            };
            let top = fr.top.min(buf.size());
            fr.top = top;
            fr.clear();
            fr.insert(&buf.runes()[top..]);
        }

        if !on_tag {
            let text: Arc<Vec<char>> =
                Arc::new(self.body_buf.runes().iter().map(|cr| cr.r).collect());
            let hook_text = text.clone();
            self.body_fr.expand_selection = Some(Box::new(move |kind, s, e| {
                expand_selection(&hook_text, kind, s, e)
            }));

            let scroll_text: Arc<Vec<ColorRune>> = Arc::new(self.body_buf.runes().to_vec());
            self.body_fr.scroll = Some(Box::new(move |fr, dir, n| {
                scroll_frame(fr, &scroll_text, dir, n);
            }));
        }

        let fr = if on_tag {
            &mut self.tag_fr
        } else {
            &mut self.body_fr
        };
        fr.redraw(true, None);
    }

    /// Route a mouse press landing on this editor to the right frame
    pub fn handle_mouse(
        &mut self,
        e: MouseInput,
        events: &Receiver<MouseInput>,
    ) -> (bool, ClickOutcome) {
        if self.tag_fr.r.contains(e.pos) {
            (true, route_click(&mut self.tag_fr, &self.tag_buf, e, events))
        } else {
            (
                false,
                route_click(&mut self.body_fr, &self.body_buf, e, events),
            )
        }
    }
}

/// Word (kind 2) and line (kind 3) selection expansion over a rune
/// snapshot of the buffer
pub fn expand_selection(text: &[char], kind: usize, start: usize, end: usize) -> (usize, usize) {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    match kind {
        2 => {
            let mut s = start.min(text.len());
            let mut e = end.min(text.len());
            while s > 0 && is_word(text[s - 1]) {
                s -= 1;
            }
            while e < text.len() && is_word(text[e]) {
                e += 1;
            }
            (s, e)
        }
        3 => {
            let mut s = start.min(text.len());
            let mut e = end.min(text.len());
            while s > 0 && text[s - 1] != '\n' {
                s -= 1;
            }
            while e < text.len() {
                let was_nl = text[e] == '\n';
                e += 1;
                if was_nl {
                    break;
                }
            }
            (s, e)
        }
        _ => (start, end),
    }
}

/// Offset of the start of the line containing `p`
fn line_start(text: &[ColorRune], p: usize) -> usize {
    let mut i = p.min(text.len());
    while i > 0 && text[i - 1].r != '\n' {
        i -= 1;
    }
    i
}

/// Scroll the frame over its text snapshot: `dir` -1/+1 scrolls by `n`
/// lines, 0 jumps to absolute rune offset `n`
pub fn scroll_frame(fr: &mut Frame, text: &[ColorRune], dir: i32, n: i32) {
    match dir.signum() {
        1 => {
            fr.push_up(n as usize, true);
            let from = (fr.top + fr.size()).min(text.len());
            fr.insert(&text[from..]);
        }
        -1 => {
            let mut s = fr.top;
            for _ in 0..n {
                if s == 0 {
                    break;
                }
                s = line_start(text, s - 1);
            }
            if s < fr.top {
                let a: Vec<ColorRune> = text[s..fr.top].to_vec();
                fr.push_down(n as usize, &a, &[]);
            }
        }
        _ => {
            let top = (n.max(0) as usize).min(text.len());
            fr.top = top;
            fr.clear();
            fr.insert(&text[top..]);
        }
    }
}
