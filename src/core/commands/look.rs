//! In-buffer search and the LookFile window

use crate::core::command::Command;
use crate::core::exec::ExecContext;
use crate::core::id::EditorId;
use crate::core::lookfile::{self, LookFileMsg};
use crate::core::selection::Sel;
use crate::core::window::WindowRoot;

/// `Look <pattern>`: forward search of the body for the literal
/// pattern, wrapping at the end. With no argument, nothing happens.
#[derive(Clone)]
pub struct Look;

impl Command for Look {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        let Some(id) = ec.ed else { return };
        if arg.is_empty() {
            return;
        }
        look_forward(root, id, arg);
    }
}

/// Search the body of `id` for `pattern` starting past the current
/// selection, wrapping around; selects and reveals the match
pub fn look_forward(root: &mut WindowRoot, id: EditorId, pattern: &str) -> bool {
    let Some(ed) = root.editor_mut(id) else {
        return false;
    };
    let text: Vec<char> = ed.body_buf.contents().chars().collect();
    let pat: Vec<char> = pattern.chars().collect();
    if pat.is_empty() || text.len() < pat.len() {
        return false;
    }

    let from = ed.body_fr.sel.e.min(text.len());
    let hit = search_at(&text, &pat, from).or_else(|| search_at(&text, &pat, 0));
    let Some(s) = hit else { return false };

    ed.body_fr.sel = Sel::new(s, s + pat.len());
    if !ed.body_fr.inside(s) {
        ed.body_fr.top = ed.body_buf.tonl(s, -1);
    }
    ed.buffer_refresh(false);
    true
}

fn search_at(text: &[char], pat: &[char], from: usize) -> Option<usize> {
    if text.len() < pat.len() {
        return None;
    }
    (from..=text.len() - pat.len()).find(|&i| text[i..i + pat.len()] == *pat)
}

/// Forward a control message (`!Again`, `!Quit`) to the editor's
/// special-mode channel
#[derive(Clone)]
pub struct SpecialSend {
    pub msg: &'static str,
}

impl Command for SpecialSend {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(id) = ec.ed else { return };
        root.editor_event(id, LookFileMsg::Exec(self.msg.to_string()));
    }
}

/// Open (or focus) the `+LookFile` editor and hand it to the searcher
#[derive(Clone)]
pub struct LookFile;

impl Command for LookFile {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        let dir = root.tag.dir.clone();
        let id = match root.edit_find(&dir, "+LookFile", true, false) {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(err) => {
                root.warn(&err.to_string());
                return;
            }
        };

        let already_special = root
            .editor(id)
            .map(|ed| ed.special.is_some())
            .unwrap_or(false);
        if !already_special {
            lookfile::start(root, id);
        } else if let Some(ed) = root.editor_mut(id) {
            // re-select the needle so typing replaces it
            ed.tag_fr.sel = Sel::new(ed.tag_buf.editable_start, ed.tag_buf.size());
            ed.buffer_refresh(true);
        }
    }
}
