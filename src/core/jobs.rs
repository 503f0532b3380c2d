//! External job registry
//!
//! Jobs are external commands run through `sh -c` in a working
//! directory, with optional text piped to stdin. Their output is routed
//! back to the UI thread as a side-channel closure: either replacing the
//! originating selection, appended to `+Errors`, or discarded. The
//! registry itself sits behind a mutex so the UI thread and job threads
//! can both touch it.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::core::buffer::ReplaceOrigin;
use crate::core::id::EditorId;
use crate::core::window::WindowRoot;

/// Where a job's stdout goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSink {
    /// Append to the `+Errors` editor (plain external commands)
    Errors,
    /// Replace the body selection of the originating editor (`|`, `<`)
    ReplaceSelection { ed: EditorId },
    /// Throw it away (`>`)
    Discard,
}

struct JobHandle {
    descr: String,
    child: Arc<Mutex<Child>>,
}

/// Registry of live jobs, indexed by slot number
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<Mutex<Vec<Option<JobHandle>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn add(&self, descr: String, child: Arc<Mutex<Child>>) -> usize {
        let mut jobs = self.jobs.lock().unwrap();
        let handle = JobHandle { descr, child };
        for (i, slot) in jobs.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(handle);
                return i;
            }
        }
        jobs.push(Some(handle));
        jobs.len() - 1
    }

    fn remove(&self, n: usize) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(slot) = jobs.get_mut(n) {
            *slot = None;
        }
    }

    /// Numbered descriptions of the live jobs
    pub fn list(&self) -> Vec<(usize, String)> {
        let jobs = self.jobs.lock().unwrap();
        jobs.iter()
            .enumerate()
            .filter_map(|(i, j)| j.as_ref().map(|j| (i, j.descr.clone())))
            .collect()
    }

    /// Kill job `n`; out-of-range ids are ignored
    pub fn kill(&self, n: usize) {
        let jobs = self.jobs.lock().unwrap();
        if let Some(Some(job)) = jobs.get(n) {
            debug!(job = n, descr = %job.descr, "killing job");
            let _ = job.child.lock().unwrap().kill();
        }
    }

    pub fn kill_all(&self) {
        let n = self.jobs.lock().unwrap().len();
        for i in 0..n {
            self.kill(i);
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().iter().filter(|j| j.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn `cmd` in `wd`, feeding it `input` when given, and route its
/// output according to `sink`. Failures to spawn are warned, not fatal.
pub fn new_job(
    root: &mut WindowRoot,
    wd: &Path,
    cmd: &str,
    input: Option<String>,
    sink: JobSink,
) {
    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(cmd)
        .current_dir(wd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(err) => {
            root.warn(&format!("error executing {}: {}", cmd, err));
            return;
        }
    };
    debug!(cmd, dir = %wd.display(), "spawned job");

    let stdin = child.stdin.take();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let child = Arc::new(Mutex::new(child));
    let registry = root.jobs.clone();
    let n = registry.add(cmd.to_string(), child.clone());
    let side = root.side_sender();
    let descr = cmd.to_string();

    thread::spawn(move || {
        if let (Some(mut pipe), Some(text)) = (stdin, input) {
            let _ = pipe.write_all(text.as_bytes());
            // pipe drops here, closing the child's stdin
        }

        let mut out = String::new();
        if let Some(pipe) = stdout.as_mut() {
            let _ = pipe.read_to_string(&mut out);
        }
        let mut errout = String::new();
        if let Some(pipe) = stderr.as_mut() {
            let _ = pipe.read_to_string(&mut errout);
        }
        let _ = child.lock().unwrap().wait();

        let _ = side.send(Box::new(move |root: &mut WindowRoot| {
            finish_job(root, n, sink, &descr, out, errout);
        }));
    });
}

fn finish_job(
    root: &mut WindowRoot,
    n: usize,
    sink: JobSink,
    descr: &str,
    out: String,
    errout: String,
) {
    root.jobs.remove(n);
    if !errout.is_empty() {
        root.warn(&format!("{}: {}", descr, errout));
    }
    match sink {
        JobSink::Discard => {}
        JobSink::Errors => {
            if !out.is_empty() {
                root.warn(&out);
            }
        }
        JobSink::ReplaceSelection { ed } => {
            if let Some(ed) = root.editor_mut(ed) {
                let mut sel = ed.body_fr.sel;
                ed.body_buf.replace(&out, &mut sel, ReplaceOrigin::Job);
                ed.body_fr.sel = sel;
                ed.buffer_refresh(false);
            }
        }
    }
}
