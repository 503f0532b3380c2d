//! Pipe verbs and job management

use crate::core::command::Command;
use crate::core::exec::ExecContext;
use crate::core::jobs::{self, JobSink};
use crate::core::window::WindowRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    /// `|`: selection to stdin, stdout replaces the selection
    Through,
    /// `<`: no stdin, stdout replaces the selection
    In,
    /// `>`: selection to stdin, stdout discarded
    Out,
}

/// Run an external command against the body selection
#[derive(Clone)]
pub struct Pipe {
    pub mode: PipeMode,
}

impl Command for Pipe {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        let Some(id) = ec.ed else { return };
        let Some(ed) = root.editor(id) else { return };

        let wd = ed.body_buf.dir.clone();
        let selection = ed.body_buf.selection_string(ed.body_fr.sel);

        let (input, sink) = match self.mode {
            PipeMode::Through => (Some(selection), JobSink::ReplaceSelection { ed: id }),
            PipeMode::In => (None, JobSink::ReplaceSelection { ed: id }),
            PipeMode::Out => (Some(selection), JobSink::Discard),
        };
        jobs::new_job(root, &wd, arg, input, sink);
    }
}

/// List live jobs into the `+Jobs` scratch editor
#[derive(Clone)]
pub struct Jobs;

impl Command for Jobs {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        let mut t = String::new();
        for (i, descr) in root.jobs.list() {
            t.push_str(&format!("{} {}\n", i, descr));
        }
        root.warnfull("+Jobs", &t);
    }
}

/// `Kill [n]`: terminate job `n`, or every job with no argument
#[derive(Clone)]
pub struct Kill;

impl Command for Kill {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, arg: &str) {
        let arg = arg.trim();
        if arg.is_empty() {
            root.jobs.kill_all();
            return;
        }
        match arg.parse::<usize>() {
            Ok(n) => root.jobs.kill(n),
            Err(_) => root.warn(&format!("Kill: bad job id: {}", arg)),
        }
    }
}
