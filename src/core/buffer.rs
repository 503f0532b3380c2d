//! Rune-indexed text buffer
//!
//! The buffer stores one [`ColorRune`] per Unicode scalar, tracks a
//! modified flag, and keeps a linear undo/redo history of replacements.
//! Each replacement is stamped with the origin of the edit (mouse,
//! keyboard, or job output) for consumers that care where a change came
//! from. Buffers whose name starts with `+` are scratch buffers: they are
//! never saved and are excluded from unsaved-change checks.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::color::TAG_PLAIN;
use crate::core::frame::ColorRune;
use crate::core::selection::Sel;

/// Where a replacement came from; undo consumers can use this to group
/// related edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOrigin {
    Mouse,
    Kbd,
    Job,
}

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("scratch buffer {0} cannot be saved")]
    Scratch(String),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct EditRecord {
    at: usize,
    before: Vec<ColorRune>,
    after: Vec<ColorRune>,
    #[allow(dead_code)]
    origin: ReplaceOrigin,
}

/// A rune-indexed buffer with color tags and an undo stack
#[derive(Debug, Default)]
pub struct Buffer {
    pub name: String,
    pub dir: PathBuf,
    pub modified: bool,
    /// Content before this offset is protected tag machinery (editors keep
    /// the buffer name and fixed verbs there)
    pub editable_start: usize,
    is_dir: bool,
    runes: Vec<ColorRune>,
    undo: Vec<EditRecord>,
    redo: Vec<EditRecord>,
}

impl Buffer {
    pub fn new(name: &str, dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a file (or directory listing) from disk
    pub fn from_file(path: &Path) -> Result<Self, BufferError> {
        let dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/"));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut buffer = Buffer::new(&name, &dir);
        if path.is_dir() {
            buffer.is_dir = true;
            let mut names: Vec<String> = fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| {
                    let mut n = e.file_name().to_string_lossy().into_owned();
                    if e.path().is_dir() {
                        n.push('/');
                    }
                    n
                })
                .collect();
            names.sort();
            buffer.load_text(&names.join("\n"));
        } else {
            let text = fs::read_to_string(path)?;
            buffer.load_text(&text);
        }
        Ok(buffer)
    }

    fn load_text(&mut self, text: &str) {
        self.runes = text
            .chars()
            .map(|r| ColorRune { c: TAG_PLAIN, r })
            .collect();
        self.modified = false;
        self.undo.clear();
        self.redo.clear();
    }

    pub fn size(&self) -> usize {
        self.runes.len()
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Scratch buffers (`+Errors`, `+LookFile`, ...) are unsaveable
    pub fn is_scratch(&self) -> bool {
        self.name.starts_with('+')
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Buffer path with the home directory abbreviated, for messages
    pub fn short_name(&self) -> String {
        let p = self.path();
        match std::env::var("HOME") {
            Ok(home) if !home.is_empty() => match p.strip_prefix(&home) {
                Ok(rest) => format!("~/{}", rest.display()),
                Err(_) => p.display().to_string(),
            },
            _ => p.display().to_string(),
        }
    }

    /// Directory jobs spawned from this buffer run in: the buffer's own
    /// path for directory buffers, its parent otherwise
    pub fn work_dir(&self) -> PathBuf {
        if self.is_dir() {
            self.path()
        } else {
            self.dir.clone()
        }
    }

    pub fn at(&self, i: usize) -> Option<ColorRune> {
        self.runes.get(i).copied()
    }

    /// Set the color tag of the rune at `i`
    pub fn set_color(&mut self, i: usize, c: u16) {
        if let Some(cr) = self.runes.get_mut(i) {
            cr.c = c;
        }
    }

    pub fn runes(&self) -> &[ColorRune] {
        &self.runes
    }

    /// The colored runes covered by `sel`, clamped to the buffer
    pub fn selection_x(&self, sel: Sel) -> &[ColorRune] {
        let sel = sel.normalized();
        let s = sel.s.min(self.runes.len());
        let e = sel.e.min(self.runes.len());
        &self.runes[s..e]
    }

    /// The text covered by `sel`
    pub fn selection_string(&self, sel: Sel) -> String {
        self.selection_x(sel).iter().map(|cr| cr.r).collect()
    }

    pub fn to_string_range(&self, from: usize, to: usize) -> String {
        self.selection_string(Sel::new(from, to))
    }

    pub fn contents(&self) -> String {
        self.runes.iter().map(|cr| cr.r).collect()
    }

    /// Replace the selection with `text`. On return `sel` spans the
    /// inserted text. Records one undo entry and clears the redo stack.
    pub fn replace(&mut self, text: &str, sel: &mut Sel, origin: ReplaceOrigin) {
        let norm = sel.normalized();
        let s = norm.s.min(self.runes.len());
        let e = norm.e.min(self.runes.len());

        let after: Vec<ColorRune> = text
            .chars()
            .map(|r| ColorRune { c: TAG_PLAIN, r })
            .collect();
        let before: Vec<ColorRune> = self.runes.splice(s..e, after.iter().copied()).collect();
        let inserted = after.len();

        self.undo.push(EditRecord {
            at: s,
            before,
            after,
            origin,
        });
        self.redo.clear();
        self.modified = true;

        *sel = Sel::new(s, s + inserted);
    }

    /// Step the history one edit backward (or forward when `redo`).
    /// `sel` is left spanning the restored text.
    pub fn undo(&mut self, sel: &mut Sel, redo: bool) {
        if redo {
            let Some(rec) = self.redo.pop() else { return };
            let e = (rec.at + rec.before.len()).min(self.runes.len());
            self.runes.splice(rec.at..e, rec.after.iter().copied());
            *sel = Sel::new(rec.at, rec.at + rec.after.len());
            self.undo.push(rec);
        } else {
            let Some(rec) = self.undo.pop() else { return };
            let e = (rec.at + rec.after.len()).min(self.runes.len());
            self.runes.splice(rec.at..e, rec.before.iter().copied());
            *sel = Sel::new(rec.at, rec.at + rec.before.len());
            self.redo.push(rec);
        }
        self.modified = true;
    }

    /// Write the buffer to its path and clear the modified flag
    pub fn put(&mut self) -> Result<(), BufferError> {
        if self.is_scratch() {
            return Err(BufferError::Scratch(self.name.clone()));
        }
        fs::write(self.path(), self.contents())?;
        self.modified = false;
        Ok(())
    }

    /// Offset just past the nearest newline scanning from `from` in
    /// direction `dir` (+1 forward, -1 backward). Forward returns the
    /// start of the next line (or the buffer size); backward returns the
    /// start of the current line (or 0).
    pub fn tonl(&self, from: usize, dir: i32) -> usize {
        if dir > 0 {
            for i in from..self.runes.len() {
                if self.runes[i].r == '\n' {
                    return i + 1;
                }
            }
            self.runes.len()
        } else {
            let mut i = from.min(self.runes.len());
            while i > 0 {
                if self.runes[i - 1].r == '\n' {
                    return i;
                }
                i -= 1;
            }
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Buffer {
        let mut b = Buffer::new("scratch.txt", Path::new("/tmp"));
        b.load_text(text);
        b
    }

    #[test]
    fn test_replace_sets_selection_to_inserted() {
        let mut b = buf("hello\n");
        let mut sel = Sel::new(0, 5);
        b.replace("HELLO", &mut sel, ReplaceOrigin::Job);
        assert_eq!(b.contents(), "HELLO\n");
        assert_eq!(sel, Sel::new(0, 5));
        assert!(b.modified);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut b = buf("hello\n");
        let mut sel = Sel::new(0, 5);
        b.replace("HELLO", &mut sel, ReplaceOrigin::Job);
        b.undo(&mut sel, false);
        assert_eq!(b.contents(), "hello\n");
        assert_eq!(sel, Sel::new(0, 5));
        b.undo(&mut sel, true);
        assert_eq!(b.contents(), "HELLO\n");
    }

    #[test]
    fn test_undo_restores_deleted_text() {
        let mut b = buf("abcdef");
        let mut sel = Sel::new(2, 4);
        b.replace("", &mut sel, ReplaceOrigin::Mouse);
        assert_eq!(b.contents(), "abef");
        b.undo(&mut sel, false);
        assert_eq!(b.contents(), "abcdef");
    }

    #[test]
    fn test_tonl() {
        let b = buf("one\ntwo\nthree");
        assert_eq!(b.tonl(1, 1), 4);
        assert_eq!(b.tonl(5, 1), 8);
        assert_eq!(b.tonl(5, -1), 4);
        assert_eq!(b.tonl(2, -1), 0);
        assert_eq!(b.tonl(10, 1), 13);
    }

    #[test]
    fn test_scratch_put_refused() {
        let mut b = Buffer::new("+Errors", Path::new("/tmp"));
        assert!(b.is_scratch());
        assert!(b.put().is_err());
    }

    #[test]
    fn test_selection_string_clamps() {
        let b = buf("abc");
        assert_eq!(b.selection_string(Sel::new(1, 999)), "bc");
        assert_eq!(b.selection_string(Sel::new(2, 1)), "b");
    }
}
