//! LookFile: concurrent fuzzy file and tag search
//!
//! The `+LookFile` editor runs in special mode: its events are rerouted
//! to a reader thread that reacts to needle changes by cancelling any
//! in-flight search and spawning two producers, one walking the
//! filesystem breadth-first and one scanning the tag index. Producers
//! send scored results over the shared channel and poll a cancellation
//! token between candidates; the reader keeps a ranked list of at most
//! [`MAX_RESULTS`] and renders it into the editor body through the side
//! channel. Results tagged with a stale needle are dropped, so a search
//! overtaken by further typing cannot pollute the display.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::core::buffer::ReplaceOrigin;
use crate::core::color::TAG_COMMENT;
use crate::core::elastic;
use crate::core::exec::{self, ExecContext};
use crate::core::fuzzy::fuzzy_match;
use crate::core::id::EditorId;
use crate::core::load;
use crate::core::selection::Sel;
use crate::core::window::{resolve_path, SideClosure, TagIndex, WindowRoot};

pub const MAX_RESULTS: usize = 20;
pub const MAX_FS_RECUR_DEPTH: isize = 11;

/// A scored search result; lower scores rank higher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookFileResult {
    pub score: i32,
    /// Display line
    pub show: String,
    /// Rune positions inside `show` to highlight
    pub mpos: Vec<usize>,
    /// The needle this result was computed for; stale results are
    /// dropped by the reader
    pub needle: String,
}

/// Messages multiplexed onto the reader's channel: editor events from
/// the UI thread and results from the producers
pub enum LookFileMsg {
    /// The tag needle changed
    Tag(String),
    /// Text executed in the body (Return, Escape, or anything else)
    Exec(String),
    /// A producer result
    Result(LookFileResult),
    /// The editor left special mode
    Closed,
}

/// The ranked result list: ordered insertion by ascending score (ties
/// keep insertion order), capped at [`MAX_RESULTS`], stale needles
/// rejected
#[derive(Default)]
pub struct SearchMerge {
    pub list: Vec<LookFileResult>,
    pub needle: String,
}

impl SearchMerge {
    /// Returns true when the needle actually changed (and the list was
    /// cleared)
    pub fn set_needle(&mut self, needle: &str) -> bool {
        if needle == self.needle {
            return false;
        }
        self.needle = needle.to_string();
        self.list.clear();
        true
    }

    /// Returns true when the result was accepted into the list
    pub fn on_result(&mut self, r: LookFileResult) -> bool {
        if r.score < 0 {
            return false;
        }
        if r.needle != self.needle {
            debug!(needle = %r.needle, current = %self.needle, "dropping stale result");
            return false;
        }

        let mut inserted = false;
        for i in 0..self.list.len() {
            if self.list[i].score > r.score {
                self.list.insert(i, r.clone());
                inserted = true;
                break;
            }
        }
        if !inserted {
            self.list.push(r);
        }
        self.list.truncate(MAX_RESULTS);
        true
    }
}

/// Put editor `ed` into special mode and start the search loop over it
pub fn start(root: &mut WindowRoot, ed_id: EditorId) {
    let (tx, rx) = mpsc::channel();
    let Some(ed) = root.editor_mut(ed_id) else {
        return;
    };
    ed.special = Some(tx.clone());
    let dir = ed.body_buf.dir.clone();
    let side = root.side_sender();
    let tags = root.tags.clone();
    thread::spawn(move || reader_loop(rx, tx, side, ed_id, dir, tags));
}

fn reader_loop(
    rx: Receiver<LookFileMsg>,
    tx: Sender<LookFileMsg>,
    side: Sender<SideClosure>,
    ed_id: EditorId,
    dir: PathBuf,
    tags: TagIndex,
) {
    let mut merge = SearchMerge::default();
    let mut cancel: Option<Arc<AtomicBool>> = None;

    let stop = |cancel: &mut Option<Arc<AtomicBool>>| {
        if let Some(c) = cancel.take() {
            c.store(true, Ordering::SeqCst);
        }
    };

    while let Ok(msg) = rx.recv() {
        match msg {
            LookFileMsg::Tag(needle) => {
                stop(&mut cancel);

                let exact = needle.chars().any(|c| c.is_uppercase());
                if merge.set_needle(&needle) {
                    if !needle.is_empty() {
                        debug!(%needle, exact, "starting search");
                        let token = Arc::new(AtomicBool::new(false));
                        cancel = Some(token.clone());

                        let fs_tx = tx.clone();
                        let fs_dir = dir.clone();
                        let fs_needle = needle.clone();
                        let fs_token = token.clone();
                        thread::spawn(move || {
                            file_system_search(&fs_dir, &fs_needle, exact, fs_tx, fs_token);
                        });

                        let tag_tx = tx.clone();
                        let tag_index = tags.clone();
                        thread::spawn(move || {
                            tags_search(tag_index, needle, exact, tag_tx, token);
                        });
                    } else {
                        display(&merge, &side, ed_id);
                    }
                } else {
                    display(&merge, &side, ed_id);
                }
            }

            LookFileMsg::Exec(cmd) => match cmd.trim() {
                "Escape" => {}
                "Return" => {
                    stop(&mut cancel);
                    if !merge.list.is_empty() {
                        let _ = side.send(Box::new(move |root: &mut WindowRoot| {
                            navigate_first(root, ed_id);
                        }));
                    }
                }
                _ => {
                    let cmd = cmd.to_string();
                    let _ = side.send(Box::new(move |root: &mut WindowRoot| {
                        let dir = root
                            .editor(ed_id)
                            .map(|ed| ed.body_buf.dir.clone())
                            .unwrap_or_else(|| root.tag.dir.clone());
                        let ec = ExecContext {
                            col: root.column_of(ed_id),
                            ed: Some(ed_id),
                            on_tag: false,
                            dir,
                        };
                        exec::exec(root, &ec, &cmd);
                    }));
                }
            },

            LookFileMsg::Result(r) => {
                if merge.on_result(r) {
                    display(&merge, &side, ed_id);
                }
            }

            LookFileMsg::Closed => break,
        }
    }

    stop(&mut cancel);
    let _ = side.send(Box::new(move |root: &mut WindowRoot| {
        if let Some(ed) = root.editor_mut(ed_id) {
            ed.special = None;
        }
    }));
}

/// Select the first result line and run it through the load engine
fn navigate_first(root: &mut WindowRoot, ed_id: EditorId) {
    let Some(ed) = root.editor_mut(ed_id) else {
        return;
    };
    let end = ed.body_buf.tonl(1, 1);
    ed.body_fr.sel = Sel::new(0, end);
    let dir = ed.body_buf.dir.clone();
    let ec = ExecContext {
        col: root.column_of(ed_id),
        ed: Some(ed_id),
        on_tag: false,
        dir,
    };
    load::load(root, &ec, 0);
}

/// Render the ranked list into the editor body: one display line per
/// result, match positions tagged with the comment color, tab stops
/// realigned
fn display(merge: &SearchMerge, side: &Sender<SideClosure>, ed_id: EditorId) {
    let mut text = String::new();
    let mut mpos = Vec::new();
    let mut offset = 0;
    for r in &merge.list {
        text.push_str(&r.show);
        text.push('\n');
        for &p in &r.mpos {
            mpos.push(p + offset);
        }
        offset += r.show.chars().count() + 1;
    }

    let _ = side.send(Box::new(move |root: &mut WindowRoot| {
        if let Some(ed) = root.editor_mut(ed_id) {
            let mut sel = Sel::new(0, ed.body_buf.size());
            ed.body_buf.replace(&text, &mut sel, ReplaceOrigin::Job);
            ed.body_buf.modified = false;
            for &p in &mpos {
                ed.body_buf.set_color(p, TAG_COMMENT);
            }
            elastic::elastic_tabs(ed, true);
            ed.buffer_refresh(false);
        }
    }));
}

fn count_slash(p: &Path) -> isize {
    p.to_string_lossy().chars().filter(|&c| c == '/').count() as isize
}

/// Breadth-first filesystem walk from the directory the needle resolves
/// into, fuzzy-matching entry names, bounded by depth and result count.
/// Dot-entries are skipped; unreadable directories are skipped silently.
fn file_system_search(
    ed_dir: &Path,
    needle: &str,
    exact: bool,
    tx: Sender<LookFileMsg>,
    done: Arc<AtomicBool>,
) {
    let x = resolve_path(ed_dir, needle);
    let start_dir = x
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"));
    let base: Vec<char> = x
        .file_name()
        .map(|n| n.to_string_lossy().chars().collect())
        .unwrap_or_default();

    let start_depth = count_slash(&start_dir);
    let mut queue = VecDeque::from([start_dir]);
    let mut sent = 0usize;

    while let Some(dir) = queue.pop_front() {
        if done.load(Ordering::SeqCst) {
            debug!("filesystem search cancelled");
            return;
        }

        let depth = count_slash(&dir) - start_depth + 1;
        if depth > MAX_FS_RECUR_DEPTH {
            continue;
        }

        // unreadable directories are skipped, never reported
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            if done.load(Ordering::SeqCst) {
                return;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.is_empty() || name.starts_with('.') {
                continue;
            }
            let path = dir.join(&name);
            let is_dir = path.is_dir();
            if is_dir {
                queue.push_back(path.clone());
            }

            // entries that can't be shown relative to the editor
            // directory are dropped
            let mut rel = match path.strip_prefix(ed_dir) {
                Ok(r) => r.to_string_lossy().into_owned(),
                Err(_) => continue,
            };
            let off = rel.chars().count() - name.chars().count();

            let mut d = depth;
            if is_dir {
                rel.push('/');
                d += 1;
            }

            let name_chars: Vec<char> = name.chars().collect();
            let Some(m) = fuzzy_match(&base, &name_chars, exact) else {
                continue;
            };

            let score = (m.start as i32) * 1000
                + (d as i32) * 100
                + (m.gaps as i32) * 10
                + name_chars.len() as i32
                + off as i32;
            let mpos: Vec<usize> = m.positions.iter().map(|&p| p + off).collect();

            if tx
                .send(LookFileMsg::Result(LookFileResult {
                    score,
                    show: rel,
                    mpos,
                    needle: needle.to_string(),
                }))
                .is_err()
            {
                return;
            }

            sent += 1;
            if sent > MAX_RESULTS {
                return;
            }
        }
    }
}

/// Linear scan of the tag index; the mutex is held for the whole scan.
/// Substring matching folds case when the needle isn't exact.
fn tags_search(
    tags: TagIndex,
    needle: String,
    exact: bool,
    tx: Sender<LookFileMsg>,
    done: Arc<AtomicBool>,
) {
    let tags = tags.lock().unwrap();
    if tags.is_empty() {
        return;
    }

    let folded = if exact {
        needle.clone()
    } else {
        needle.to_lowercase()
    };

    let mut sent = 0usize;
    for entry in tags.iter() {
        if done.load(Ordering::SeqCst) {
            debug!("tag search cancelled");
            return;
        }
        if sent > MAX_RESULTS {
            return;
        }

        let haystack = if exact {
            entry.tag.clone()
        } else {
            entry.tag.to_lowercase()
        };
        let n = match haystack.find(&folded) {
            Some(n) if n > 0 => haystack[..n].chars().count(),
            _ => continue,
        };

        let score = 1000 + (n as i32) * 10 + entry.tag.chars().count() as i32;

        let show = if entry.search.is_empty() {
            entry.path.clone()
        } else {
            format!("{}:\t/^{}/", entry.path, entry.search)
        };

        if tx
            .send(LookFileMsg::Result(LookFileResult {
                score,
                show,
                mpos: Vec::new(),
                needle: needle.clone(),
            }))
            .is_err()
        {
            return;
        }
        sent += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: i32, show: &str, needle: &str) -> LookFileResult {
        LookFileResult {
            score,
            show: show.to_string(),
            mpos: Vec::new(),
            needle: needle.to_string(),
        }
    }

    #[test]
    fn test_merge_orders_by_score() {
        let mut m = SearchMerge::default();
        m.set_needle("foo");
        assert!(m.on_result(result(300, "c", "foo")));
        assert!(m.on_result(result(100, "a", "foo")));
        assert!(m.on_result(result(200, "b", "foo")));
        let shows: Vec<&str> = m.list.iter().map(|r| r.show.as_str()).collect();
        assert_eq!(shows, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_ties_keep_insertion_order() {
        let mut m = SearchMerge::default();
        m.set_needle("foo");
        m.on_result(result(100, "first", "foo"));
        m.on_result(result(100, "second", "foo"));
        let shows: Vec<&str> = m.list.iter().map(|r| r.show.as_str()).collect();
        assert_eq!(shows, vec!["first", "second"]);
    }

    #[test]
    fn test_merge_caps_at_max_results() {
        let mut m = SearchMerge::default();
        m.set_needle("foo");
        for i in 0..40 {
            m.on_result(result(i, &format!("r{}", i), "foo"));
        }
        assert_eq!(m.list.len(), MAX_RESULTS);
        // scores are non-decreasing
        for w in m.list.windows(2) {
            assert!(w[0].score <= w[1].score);
        }
    }

    #[test]
    fn test_merge_drops_stale_needle() {
        // needle changed from "fo" to "foo" while producers were live
        let mut m = SearchMerge::default();
        m.set_needle("fo");
        m.on_result(result(100, "fold.rs", "fo"));
        assert!(m.set_needle("foo"));
        assert!(m.list.is_empty());
        assert!(!m.on_result(result(50, "fond.rs", "fo")));
        assert!(m.on_result(result(70, "food.rs", "foo")));
        let shows: Vec<&str> = m.list.iter().map(|r| r.show.as_str()).collect();
        assert_eq!(shows, vec!["food.rs"]);
    }

    #[test]
    fn test_merge_rejects_negative_scores() {
        let mut m = SearchMerge::default();
        m.set_needle("x");
        assert!(!m.on_result(result(-1, "bad", "x")));
        assert!(m.list.is_empty());
    }

    #[test]
    fn test_set_needle_unchanged_keeps_list() {
        let mut m = SearchMerge::default();
        m.set_needle("abc");
        m.on_result(result(10, "hit", "abc"));
        assert!(!m.set_needle("abc"));
        assert_eq!(m.list.len(), 1);
    }
}
