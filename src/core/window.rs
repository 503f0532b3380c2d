//! Window root: the owning state of the editor core
//!
//! `WindowRoot` owns every column and editor, the command registry, the
//! compiled load rules, the job registry, and the side channel through
//! which background threads post closures that the UI thread drains.
//! Warnings land in the `+Errors` scratch editor.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::config::{Config, ConfigError};
use crate::core::buffer::{Buffer, BufferError, ReplaceOrigin};
use crate::core::command::Command;
use crate::core::editor::Editor;
use crate::core::exec::ExecContext;
use crate::core::face::GlyphFace;
use crate::core::geometry::{Point, Rect};
use crate::core::id::{ColumnId, EditorId};
use crate::core::input::{ClickOutcome, MouseInput};
use crate::core::jobs::JobRegistry;
use crate::core::load::LoadRule;
use crate::core::selection::Sel;

/// Closure posted by a background thread, run on the UI thread with
/// exclusive access to the root
pub type SideClosure = Box<dyn FnOnce(&mut WindowRoot) + Send>;

/// The window-system collaborator: clipboard, primary selection, pixel
/// flushing, pointer warping
pub trait WindowBackend: Send {
    fn set_clipboard(&mut self, s: &str);
    fn get_clipboard(&mut self) -> String;
    fn get_primary_selection(&mut self) -> String;
    fn flush_image(&mut self, rects: &[Rect]);
    fn warp_mouse(&mut self, _p: Point) {}
}

/// Headless backend: stores the clipboard in memory, discards flushes
#[derive(Debug, Default)]
pub struct NullBackend {
    pub clipboard: String,
    pub primary: String,
}

impl WindowBackend for NullBackend {
    fn set_clipboard(&mut self, s: &str) {
        self.clipboard = s.to_string();
    }

    fn get_clipboard(&mut self) -> String {
        self.clipboard.clone()
    }

    fn get_primary_selection(&mut self) -> String {
        self.primary.clone()
    }

    fn flush_image(&mut self, _rects: &[Rect]) {}
}

/// One entry of the tag index consumed by the LookFile searcher
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub tag: String,
    pub path: String,
    pub search: String,
}

/// The tag index, guarded by a single mutex held for the duration of a
/// scan
pub type TagIndex = Arc<Mutex<Vec<TagEntry>>>;

/// A column of editors
pub struct Column {
    pub id: ColumnId,
    pub r: Rect,
    pub tag: Buffer,
    pub editors: Vec<Editor>,
}

impl Column {
    /// Stable sort of the editors by body-buffer name
    pub fn sort_editors(&mut self) {
        self.editors
            .sort_by(|a, b| a.body_buf.name.cmp(&b.body_buf.name));
    }

    /// Divide the column rectangle among the editors, top to bottom
    pub fn recalc_rects(&mut self) {
        let n = self.editors.len() as i32;
        if n == 0 {
            return;
        }
        let h = self.r.dy() / n;
        for (i, ed) in self.editors.iter_mut().enumerate() {
            let top = self.r.min.y + h * i as i32;
            let bottom = if i as i32 == n - 1 {
                self.r.max.y
            } else {
                top + h
            };
            ed.resize(Rect::new(self.r.min.x, top, self.r.max.x, bottom));
        }
    }
}

pub struct WindowRoot {
    pub config: Config,
    pub face: Arc<dyn GlyphFace>,
    pub backend: Box<dyn WindowBackend>,
    pub r: Rect,
    /// Global tag buffer; its `dir` is the working directory
    pub tag: Buffer,
    pub columns: Vec<Column>,
    pub registry: FxHashMap<String, Box<dyn Command>>,
    pub load_rules: Arc<Vec<LoadRule>>,
    pub jobs: JobRegistry,
    pub tags: TagIndex,
    /// Two-phase Exit confirmation state
    pub exit_confirmed: bool,
    /// Set when a confirmed Exit requested shutdown
    pub shutdown: bool,
    pub on_exit: Option<Box<dyn FnMut() + Send>>,
    side_tx: Sender<SideClosure>,
    side_rx: Receiver<SideClosure>,
    next_editor: usize,
    next_column: usize,
}

impl WindowRoot {
    pub fn new(
        mut config: Config,
        face: Arc<dyn GlyphFace>,
        backend: Box<dyn WindowBackend>,
    ) -> Result<Self, ConfigError> {
        config.finish()?;
        let load_rules = Arc::new(crate::core::load::compile_rules(&config.load_rules)?);

        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let mut tag = Buffer::new("", &dir);
        let mut sel = Sel::default();
        tag.replace("Newcol Putall Exit | ", &mut sel, ReplaceOrigin::Kbd);
        tag.editable_start = tag.size();
        tag.modified = false;

        let (side_tx, side_rx) = mpsc::channel();

        let mut root = WindowRoot {
            r: Rect::new(0, 0, config.startup_width, config.startup_height),
            config,
            face,
            backend,
            tag,
            columns: Vec::new(),
            registry: FxHashMap::default(),
            load_rules,
            jobs: JobRegistry::new(),
            tags: Arc::new(Mutex::new(Vec::new())),
            exit_confirmed: false,
            shutdown: false,
            on_exit: None,
            side_tx,
            side_rx,
            next_editor: 0,
            next_column: 0,
        };
        crate::core::commands::register_all(&mut root);
        Ok(root)
    }

    /// Sender background threads use to post closures back to the UI
    /// thread
    pub fn side_sender(&self) -> Sender<SideClosure> {
        self.side_tx.clone()
    }

    /// Run one pending side closure, waiting up to `timeout` for it
    pub fn process_side_for(&mut self, timeout: Duration) -> bool {
        match self.side_rx.recv_timeout(timeout) {
            Ok(f) => {
                f(self);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run every side closure currently queued
    pub fn drain_side(&mut self) {
        while let Ok(f) = self.side_rx.try_recv() {
            f(self);
        }
    }

    pub fn add_column(&mut self) -> ColumnId {
        let id = ColumnId(self.next_column);
        self.next_column += 1;
        self.columns.push(Column {
            id,
            r: self.r,
            tag: Buffer::new("", &self.tag.dir),
            editors: Vec::new(),
        });
        self.recalc_columns();
        id
    }

    fn recalc_columns(&mut self) {
        let n = self.columns.len() as i32;
        if n == 0 {
            return;
        }
        let w = self.r.dx() / n;
        for (i, col) in self.columns.iter_mut().enumerate() {
            let left = self.r.min.x + w * i as i32;
            let right = if i as i32 == n - 1 {
                self.r.max.x
            } else {
                left + w
            };
            col.r = Rect::new(left, self.r.min.y, right, self.r.max.y);
            col.recalc_rects();
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    pub fn remove_column(&mut self, id: ColumnId) {
        self.columns.retain(|c| c.id != id);
        self.recalc_columns();
    }

    pub fn editor(&self, id: EditorId) -> Option<&Editor> {
        self.columns
            .iter()
            .flat_map(|c| c.editors.iter())
            .find(|e| e.id == id)
    }

    pub fn editor_mut(&mut self, id: EditorId) -> Option<&mut Editor> {
        self.columns
            .iter_mut()
            .flat_map(|c| c.editors.iter_mut())
            .find(|e| e.id == id)
    }

    /// Column holding editor `id`
    pub fn column_of(&self, id: EditorId) -> Option<ColumnId> {
        self.columns
            .iter()
            .find(|c| c.editors.iter().any(|e| e.id == id))
            .map(|c| c.id)
    }

    /// Create an editor over `buf` in the last column (creating one when
    /// none exists)
    pub fn new_editor(&mut self, buf: Buffer) -> EditorId {
        if self.columns.is_empty() {
            self.add_column();
        }
        let id = EditorId(self.next_editor);
        self.next_editor += 1;

        let face = self.face.clone();
        let colors = self.config.body_colors.clone();
        let tag_colors = self.config.tag_colors.clone();
        let col = self.columns.last_mut().unwrap();
        let r = col.r;
        match Editor::new(id, face, colors, tag_colors, r, buf) {
            Ok(ed) => {
                col.editors.push(ed);
                col.recalc_rects();
                id
            }
            Err(_) => unreachable!("config color matrices are validated at startup"),
        }
    }

    /// Drop editor `id` and its buffers
    pub fn remove_editor(&mut self, id: EditorId) {
        for col in &mut self.columns {
            let before = col.editors.len();
            col.editors.retain(|e| e.id != id);
            if col.editors.len() != before {
                col.recalc_rects();
                return;
            }
        }
    }

    /// Find an editor whose body buffer is `name` under `dir`, opening
    /// the file when `load` is set and creating an empty buffer when
    /// `create` is set.
    pub fn edit_find(
        &mut self,
        dir: &Path,
        name: &str,
        create: bool,
        load: bool,
    ) -> Result<Option<EditorId>, BufferError> {
        let path = resolve_path(dir, name);
        let scratch = name.starts_with('+');

        for col in &self.columns {
            for ed in &col.editors {
                let hit = if scratch {
                    ed.body_buf.name == name
                } else {
                    ed.body_buf.path() == path
                };
                if hit {
                    return Ok(Some(ed.id));
                }
            }
        }

        if scratch {
            if !create {
                return Ok(None);
            }
            let buf = Buffer::new(name, dir);
            return Ok(Some(self.new_editor(buf)));
        }

        if path.exists() && load {
            let buf = Buffer::from_file(&path)?;
            return Ok(Some(self.new_editor(buf)));
        }
        if create {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parent = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dir.to_path_buf());
            let buf = Buffer::new(&name, &parent);
            return Ok(Some(self.new_editor(buf)));
        }
        Ok(None)
    }

    /// Run `f` over the context frame and buffer of `ec` (tag or body)
    pub fn with_ctx<R>(
        &mut self,
        ec: &ExecContext,
        f: impl FnOnce(&mut crate::core::frame::Frame, &mut Buffer) -> R,
    ) -> Option<R> {
        let id = ec.ed?;
        let ed = self.editor_mut(id)?;
        let (fr, buf) = if ec.on_tag {
            (&mut ed.tag_fr, &mut ed.tag_buf)
        } else {
            (&mut ed.body_fr, &mut ed.body_buf)
        };
        Some(f(fr, buf))
    }

    /// Refresh the context editor's frame after a buffer mutation
    pub fn refresh_ctx(&mut self, ec: &ExecContext) {
        if let Some(id) = ec.ed {
            if let Some(ed) = self.editor_mut(id) {
                ed.buffer_refresh(ec.on_tag);
            }
        }
    }

    /// Append a warning to the `+Errors` editor
    pub fn warn(&mut self, msg: &str) {
        tracing::warn!(msg, "editor warning");
        self.append_scratch("+Errors", msg, false);
    }

    /// Replace the whole content of the scratch editor `name`
    pub fn warnfull(&mut self, name: &str, text: &str) {
        self.append_scratch(name, text, true);
    }

    fn append_scratch(&mut self, name: &str, text: &str, replace: bool) {
        let dir = self.tag.dir.clone();
        let Ok(Some(id)) = self.edit_find(&dir, name, true, false) else {
            return;
        };
        if let Some(ed) = self.editor_mut(id) {
            let mut sel = if replace {
                Sel::new(0, ed.body_buf.size())
            } else {
                Sel::point(ed.body_buf.size())
            };
            let mut text = text.to_string();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            ed.body_buf.replace(&text, &mut sel, ReplaceOrigin::Job);
            ed.body_buf.modified = false;
            ed.buffer_refresh(false);
        }
    }

    /// Load a ctags-style index file into the tag index: lines of
    /// `name<TAB>file<TAB>/^pattern$/` or `name<TAB>file<TAB>line`
    pub fn load_tags(&mut self, path: &Path) -> std::io::Result<usize> {
        let text = std::fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for line in text.lines() {
            if line.starts_with('!') {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let (Some(tag), Some(file)) = (fields.next(), fields.next()) else {
                continue;
            };
            let search = fields
                .next()
                .and_then(|f| {
                    f.strip_prefix("/^")
                        .and_then(|s| s.trim_end_matches(";\"").strip_suffix("$/"))
                })
                .unwrap_or("")
                .to_string();
            entries.push(TagEntry {
                tag: tag.to_string(),
                path: file.to_string(),
                search,
            });
        }
        let n = entries.len();
        *self.tags.lock().unwrap() = entries;
        Ok(n)
    }

    /// Forward an editor event to its special channel, when one is
    /// installed. Returns false when the editor is not special.
    pub fn editor_event(&mut self, id: EditorId, msg: crate::core::lookfile::LookFileMsg) -> bool {
        let Some(ed) = self.editor_mut(id) else {
            return false;
        };
        let Some(tx) = ed.special.clone() else {
            return false;
        };
        if tx.send(msg).is_err() {
            ed.special = None;
            return false;
        }
        true
    }

    /// Dispatch a mouse press to the editor under it and run the
    /// resulting action through the resolver or the load engine
    pub fn handle_mouse(&mut self, e: MouseInput, events: &Receiver<MouseInput>) {
        let mut hit = None;
        'outer: for col in &self.columns {
            for ed in &col.editors {
                if ed.r.contains(e.pos) {
                    hit = Some((col.id, ed.id));
                    break 'outer;
                }
            }
        }
        let Some((col, id)) = hit else { return };

        let (on_tag, outcome) = match self.editor_mut(id) {
            Some(ed) => ed.handle_mouse(e, events),
            None => return,
        };

        let dir = self
            .editor(id)
            .map(|ed| ed.body_buf.work_dir())
            .unwrap_or_else(|| self.tag.dir.clone());
        let ec = ExecContext {
            col: Some(col),
            ed: Some(id),
            on_tag,
            dir,
        };
        match outcome {
            ClickOutcome::Exec(text) => crate::core::exec::exec(self, &ec, &text),
            ClickOutcome::Load { origin } => crate::core::load::load(self, &ec, origin),
            ClickOutcome::None => {}
        }
    }
}

/// Resolve `arg` against `dir`: absolute paths pass through, relative
/// ones are joined, and `.`/`..` components are folded away
pub fn resolve_path(dir: &Path, arg: &str) -> PathBuf {
    let p = Path::new(arg);
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    };
    let mut out = PathBuf::new();
    for c in joined.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
