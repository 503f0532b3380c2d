//! Application control commands

use crate::core::command::Command;
use crate::core::exec::{self, ExecContext};
use crate::core::window::{resolve_path, WindowRoot};

/// Two-phase exit: the first invocation with unsaved changes warns and
/// arms the confirmation, the second shuts down
#[derive(Clone)]
pub struct Exit;

impl Command for Exit {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        let mut t = String::from("The following files have unsaved changes:\n");
        let mut n = 0;
        for col in &root.columns {
            for ed in &col.editors {
                if ed.body_buf.modified && !ed.body_buf.is_scratch() {
                    t.push_str(&ed.body_buf.short_name());
                    t.push('\n');
                    n += 1;
                }
            }
        }

        if n == 0 || root.exit_confirmed {
            root.shutdown = true;
            if let Some(mut hook) = root.on_exit.take() {
                hook();
                root.on_exit = Some(hook);
            }
        } else {
            root.exit_confirmed = true;
            root.warn(&t);
        }
    }
}

/// Change the process working directory and propagate it to every tag
#[derive(Clone)]
pub struct Cd;

impl Command for Cd {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        let target = resolve_path(&ec.dir, arg.trim());
        if let Err(err) = std::env::set_current_dir(&target) {
            root.warn(&format!("Cd: {}: {}", target.display(), err));
            return;
        }
        let wd = std::env::current_dir().unwrap_or(target);

        root.tag.dir = wd.clone();
        for col in &mut root.columns {
            col.tag.dir = wd.clone();
            for ed in &mut col.editors {
                ed.buffer_refresh(false);
            }
        }
        root.backend.flush_image(&[]);
    }
}

/// `Setenv K V`: set an environment variable; exactly two tokens
#[derive(Clone)]
pub struct Setenv;

impl Command for Setenv {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, arg: &str) {
        let v: Vec<&str> = arg.split_whitespace().collect();
        if v.len() != 2 {
            root.warn("Setenv: wrong number of arguments");
            return;
        }
        std::env::set_var(v[0], v[1]);
    }
}

/// Stable sort of the column's editors by body-buffer name
#[derive(Clone)]
pub struct Sort;

impl Command for Sort {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(col_id) = ec.col else { return };
        if let Some(col) = root.column_mut(col_id) {
            col.sort_editors();
            col.recalc_rects();
        }
        root.backend.flush_image(&[]);
    }
}

/// `Do <multi-line>`: dispatch every line through the resolver
#[derive(Clone)]
pub struct Do;

impl Command for Do {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        for line in arg.split('\n') {
            exec::exec_no_defer(root, ec, line);
        }
    }
}

/// A reserved verb: resets the confirm flags like any other command and
/// warns that it does nothing yet
#[derive(Clone)]
pub struct Reserved {
    pub name: &'static str,
}

impl Command for Reserved {
    fn execute(&self, root: &mut WindowRoot, _ec: &ExecContext, _arg: &str) {
        root.warn(&format!("{}: not implemented", self.name));
    }
}
