//! Mouse input routing
//!
//! Translates raw mouse events into frame selections and editor actions:
//! wheel events scroll, left clicks (with count-driven char/word/line
//! expansion and shift extension) select, middle clicks execute the
//! selected text, right clicks load it. Drag tracking is delegated to
//! [`Frame::select_until_release`].

use std::sync::mpsc::Receiver;

use crate::core::buffer::Buffer;
use crate::core::frame::Frame;
use crate::core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseDir {
    Press,
    Move,
    Release,
}

/// A raw mouse event in image coordinates
#[derive(Debug, Clone, Copy)]
pub struct MouseInput {
    pub pos: Point,
    pub button: MouseButton,
    /// Click count: 1 char, 2 word, 3 line selection
    pub count: usize,
    pub shift: bool,
    pub dir: MouseDir,
}

/// What a completed click asks the editor to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    None,
    /// Middle click: run the selected text through the command resolver
    Exec(String),
    /// Right click: run the load engine; `origin` is the clicked rune
    /// index, or -1 when the click landed on an explicit selection
    Load { origin: isize },
}

impl MouseButton {
    /// Selection color row driven by this button
    fn sel_index(self) -> Option<usize> {
        match self {
            MouseButton::Left => Some(0),
            MouseButton::Middle => Some(1),
            MouseButton::Right => Some(2),
            _ => None,
        }
    }
}

/// Handle a button press on `fr`: set up the selection, track the drag
/// until release, and report what the editor should do with the result.
pub fn route_click(
    fr: &mut Frame,
    buf: &Buffer,
    e: MouseInput,
    events: &Receiver<MouseInput>,
) -> ClickOutcome {
    match e.button {
        MouseButton::WheelUp => {
            if let Some(mut scroll) = fr.scroll.take() {
                scroll(fr, -1, 1);
                fr.scroll = Some(scroll);
            }
            return ClickOutcome::None;
        }
        MouseButton::WheelDown => {
            if let Some(mut scroll) = fr.scroll.take() {
                scroll(fr, 1, 1);
                fr.scroll = Some(scroll);
            }
            return ClickOutcome::None;
        }
        _ => {}
    }

    let Some(sel) = e.button.sel_index() else {
        return ClickOutcome::None;
    };
    if sel >= fr.colors.len() {
        return ClickOutcome::None;
    }

    let Some(p) = fr.coord_to_point(e.pos) else {
        return ClickOutcome::None;
    };

    // Clicking on or next to the active selection with a command button
    // retargets its color instead of collapsing it.
    let retarget =
        sel != 0 && !fr.sel.is_empty() && p + 1 >= fr.sel.s && p <= fr.sel.e + 1;

    if sel == 0 && e.count == 1 && e.shift {
        // shift-click extends selection, but only for the first selection
        if p < fr.sel.s {
            fr.set_select(sel, e.count, p, fr.sel.e);
        } else {
            fr.set_select(sel, e.count, fr.sel.s, p);
        }
    } else if retarget {
        fr.sel_color = sel;
    } else {
        fr.set_select(sel, e.count, p, p);
    }
    fr.redraw(true, None);
    fr.select_until_release(sel, e.count, e.pos, events);
    fr.redraw(true, None);

    match e.button {
        MouseButton::Middle => {
            let text = buf.selection_string(fr.sel);
            if text.is_empty() {
                ClickOutcome::None
            } else {
                ClickOutcome::Exec(text)
            }
        }
        MouseButton::Right => ClickOutcome::Load {
            origin: if retarget { -1 } else { p as isize },
        },
        _ => ClickOutcome::None,
    }
}
