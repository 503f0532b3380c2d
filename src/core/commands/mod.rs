//! Built-in command implementations
//!
//! One struct per verb, organized by concern:
//!
//! - **edit**: clipboard, paste (plain/primary/indent), undo/redo, Edit programs
//! - **file**: saving, opening, deleting editors and columns, renaming
//! - **control**: exit, working directory, environment, sorting, Do
//! - **job**: the pipe verbs and job management
//! - **look**: in-buffer search and the LookFile window
//!
//! All commands implement the [`Command`](crate::core::command::Command)
//! trait and are registered by name in the dispatcher's registry.

pub mod control;
pub mod edit;
pub mod file;
pub mod job;
pub mod look;

use crate::core::command::Command;
use crate::core::window::WindowRoot;

fn reg(root: &mut WindowRoot, name: &str, cmd: impl Command + 'static) {
    root.registry.insert(name.to_string(), Box::new(cmd));
}

/// Register every built-in verb
pub fn register_all(root: &mut WindowRoot) {
    reg(root, "Cut", edit::Copy { del: true });
    reg(root, "Copy", edit::Copy { del: false });
    reg(root, "Snarf", edit::Copy { del: false });
    reg(root, "Paste", edit::Paste { primary: false });
    reg(root, "Paste!Primary", edit::Paste { primary: true });
    reg(root, "Paste!Indent", edit::PasteIndent);
    reg(root, "Undo", edit::Undo { redo: false });
    reg(root, "Redo", edit::Undo { redo: true });
    reg(root, "Edit", edit::EditProgram);

    reg(root, "Put", file::Put);
    reg(root, "Putall", file::Putall);
    reg(root, "Del", file::Del { sure: false });
    reg(root, "Delete", file::Del { sure: true });
    reg(root, "Delcol", file::Delcol);
    reg(root, "New", file::New);
    reg(root, "Newcol", file::Newcol);
    reg(root, "Rename", file::Rename);
    reg(root, "Get", control::Reserved { name: "Get" });

    reg(root, "Exit", control::Exit);
    reg(root, "Cd", control::Cd);
    reg(root, "Setenv", control::Setenv);
    reg(root, "Sort", control::Sort);
    reg(root, "Do", control::Do);
    reg(root, "Dump", control::Reserved { name: "Dump" });
    reg(root, "Load", control::Reserved { name: "Load" });
    reg(root, "Zerox", control::Reserved { name: "Zerox" });
    reg(root, "Send", control::Reserved { name: "Send" });

    reg(root, "|", job::Pipe { mode: job::PipeMode::Through });
    reg(root, "<", job::Pipe { mode: job::PipeMode::In });
    reg(root, ">", job::Pipe { mode: job::PipeMode::Out });
    reg(root, "Jobs", job::Jobs);
    reg(root, "Kill", job::Kill);

    reg(root, "Look", look::Look);
    reg(root, "Look!Again", look::SpecialSend { msg: "!Again" });
    reg(root, "Look!Quit", look::SpecialSend { msg: "!Quit" });
    reg(root, "LookFile", look::LookFile);
}
