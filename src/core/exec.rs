//! Command resolver and dispatcher
//!
//! Trimmed command text resolves to a built-in verb (first token, or the
//! single byte `<`/`>`/`|`) or falls through to an external job spawned
//! in the context directory. Built-ins run inside a panic boundary: a
//! crash becomes a `+Errors` warning (with a backtrace when
//! `edit_error_trace` is configured) and the editor continues.
//!
//! The dispatcher also owns the confirm flags: any verb other than the
//! one a flag guards resets it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use crate::core::id::{ColumnId, EditorId};
use crate::core::jobs::{self, JobSink};
use crate::core::window::WindowRoot;

/// Capability bundle scoped to a single dispatch: which column, editor,
/// and frame the command acts on, and the working directory for spawned
/// jobs
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub col: Option<ColumnId>,
    pub ed: Option<EditorId>,
    /// Whether the invocation came from the tag frame
    pub on_tag: bool,
    pub dir: PathBuf,
}

impl ExecContext {
    pub fn bare(dir: PathBuf) -> Self {
        ExecContext {
            col: None,
            ed: None,
            on_tag: false,
            dir,
        }
    }
}

/// Outcome of splitting a command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing to do
    Empty,
    /// A registered verb with its argument
    Builtin { verb: String, arg: String },
    /// Not a built-in: spawn it
    External(String),
}

/// Split `cmd` into verb and argument and look the verb up. A leading
/// `<`, `>` or `|` is a one-byte verb with no separating space required;
/// otherwise the verb is the first whitespace-separated token.
pub fn resolve(root: &WindowRoot, cmd: &str) -> Resolution {
    if cmd.is_empty() {
        return Resolution::Empty;
    }

    if let Some(first) = cmd.chars().next() {
        if first == '<' || first == '>' || first == '|' {
            return Resolution::Builtin {
                verb: first.to_string(),
                arg: cmd[first.len_utf8()..].to_string(),
            };
        }
    }

    let mut parts = cmd.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("");
    let arg = parts.next().unwrap_or("").trim_start();
    if root.registry.contains_key(verb) {
        Resolution::Builtin {
            verb: verb.to_string(),
            arg: arg.to_string(),
        }
    } else {
        Resolution::External(cmd.to_string())
    }
}

/// Dispatch `cmd` with panic containment
pub fn exec(root: &mut WindowRoot, ec: &ExecContext, cmd: &str) {
    let trace = root.config.edit_error_trace;
    let result = catch_unwind(AssertUnwindSafe(|| exec_no_defer(root, ec, cmd)));
    if let Err(payload) = result {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        let mut errmsg = format!("{}\n", msg);
        if trace {
            errmsg.push_str(&format!("{}", std::backtrace::Backtrace::force_capture()));
        }
        root.warn(&errmsg);
    }
}

/// Dispatch `cmd` without the panic boundary (used by Do to avoid
/// stacking recovery frames)
pub fn exec_no_defer(root: &mut WindowRoot, ec: &ExecContext, cmd: &str) {
    let cmd = cmd.trim();
    match resolve(root, cmd) {
        Resolution::Empty => {}
        Resolution::Builtin { verb, arg } => {
            reset_confirm_flags(root, ec, &verb);
            // clone the boxed command out of the registry so it can
            // borrow the root mutably
            if let Some(command) = root.registry.get(&verb).cloned() {
                command.execute(root, ec, &arg);
            }
        }
        Resolution::External(cmd) => {
            reset_confirm_flags(root, ec, "");
            ext_exec(root, ec, &cmd);
        }
    }
}

/// Any verb other than the one a confirm flag guards resets that flag
fn reset_confirm_flags(root: &mut WindowRoot, ec: &ExecContext, verb: &str) {
    if verb != "Exit" {
        root.exit_confirmed = false;
    }
    if !matches!(verb, "Del" | "Delete" | "Delcol") {
        if let Some(id) = ec.ed {
            if let Some(ed) = root.editor_mut(id) {
                ed.confirm_del = false;
            }
        }
    }
}

/// Spawn `cmd` as an external job in the context directory (falling back
/// to the global tag directory)
pub fn ext_exec(root: &mut WindowRoot, ec: &ExecContext, cmd: &str) {
    let wd = if ec.dir.as_os_str().is_empty() {
        root.tag.dir.clone()
    } else {
        ec.dir.clone()
    };
    jobs::new_job(root, &wd, cmd, None, JobSink::Errors);
}
