//! File and editor lifecycle commands

use crate::core::command::Command;
use crate::core::exec::ExecContext;
use crate::core::window::{resolve_path, WindowRoot};

/// Persist the body buffer
#[derive(Clone)]
pub struct Put;

impl Command for Put {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(id) = ec.ed else { return };
        let Some(ed) = root.editor_mut(id) else { return };
        if ed.body_buf.is_scratch() {
            return;
        }
        let short = ed.body_buf.short_name();
        match ed.body_buf.put() {
            Ok(()) => {
                ed.buffer_refresh(false);
            }
            Err(err) => {
                root.warn(&format!("Put: Couldn't save {}: {}", short, err));
            }
        }
    }
}

/// Persist every modified non-scratch buffer, accumulating failures
#[derive(Clone)]
pub struct Putall;

impl Command for Putall {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        let mut t = String::from("Putall: Saving the following files failed:\n");
        let mut nerr = 0;
        for col in &mut root.columns {
            for ed in &mut col.editors {
                if !ed.body_buf.is_scratch() && ed.body_buf.modified {
                    if let Err(err) = ed.body_buf.put() {
                        t.push_str(&format!("{}: {}\n", ed.body_buf.short_name(), err));
                        nerr += 1;
                    }
                    ed.buffer_refresh(false);
                }
            }
        }
        if nerr != 0 {
            root.warn(&t);
        }
    }
}

/// Delete the editor. Refused once (with a warning) when the buffer has
/// unsaved changes; the next Del goes through. `sure` (Delete) skips the
/// confirmation.
#[derive(Clone)]
pub struct Del {
    pub sure: bool,
}

impl Command for Del {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(id) = ec.ed else { return };
        let Some(ed) = root.editor_mut(id) else { return };
        let deletable = !ed.body_buf.modified
            || ed.body_buf.is_scratch()
            || self.sure
            || ed.confirm_del;
        if deletable {
            if let Some(tx) = ed.special.take() {
                let _ = tx.send(crate::core::lookfile::LookFileMsg::Closed);
            }
            root.remove_editor(id);
            root.backend.flush_image(&[]);
        } else {
            let short = ed.body_buf.short_name();
            ed.confirm_del = true;
            root.warn(&format!("File {} has unsaved changes", short));
        }
    }
}

/// Delete a whole column, with the same two-phase confirmation over the
/// union of its modified buffers
#[derive(Clone)]
pub struct Delcol;

impl Command for Delcol {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(col_id) = ec.col else { return };
        let Some(col) = root.column_mut(col_id) else {
            return;
        };

        let mut t = String::from("The following files have unsaved changes:\n");
        let mut n = 0;
        for ed in &mut col.editors {
            if ed.body_buf.modified && !ed.body_buf.is_scratch() && !ed.confirm_del {
                ed.confirm_del = true;
                t.push_str(&ed.body_buf.short_name());
                t.push('\n');
                n += 1;
            }
        }

        if n == 0 {
            for ed in &mut col.editors {
                if let Some(tx) = ed.special.take() {
                    let _ = tx.send(crate::core::lookfile::LookFileMsg::Closed);
                }
            }
            root.remove_column(col_id);
            root.backend.flush_image(&[]);
        } else {
            root.warn(&t);
        }
    }
}

/// Open (or focus) an editor on a path resolved against the context
/// directory
#[derive(Clone)]
pub struct New;

impl Command for New {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        let arg = arg.trim();
        if arg.is_empty() {
            root.warn("New: must specify argument");
            return;
        }
        let dir = ec.dir.clone();
        if let Err(err) = root.edit_find(&dir, arg, true, true) {
            root.warn(&format!("New: {}", err));
        }
    }
}

/// Add a column
#[derive(Clone)]
pub struct Newcol;

impl Command for Newcol {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        root.add_column();
        root.backend.flush_image(&[]);
    }
}

/// Rename the body buffer and mark it modified. No-op without an editor.
#[derive(Clone)]
pub struct Rename;

impl Command for Rename {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        let Some(id) = ec.ed else { return };
        let arg = arg.trim();
        if arg.is_empty() {
            root.warn("Rename: must specify argument");
            return;
        }
        let Some(ed) = root.editor_mut(id) else { return };
        let path = resolve_path(&ed.body_buf.dir, arg);
        match (path.file_name(), path.parent()) {
            (Some(name), Some(parent)) => {
                ed.body_buf.name = name.to_string_lossy().into_owned();
                ed.body_buf.dir = parent.to_path_buf();
            }
            _ => {
                ed.body_buf.name = arg.to_string();
            }
        }
        ed.body_buf.modified = true;
        ed.gen_tag();
        ed.buffer_refresh(false);
    }
}
