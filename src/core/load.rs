//! Load engine: rule-driven right-click resolution
//!
//! Each rule pairs a buffer-path filter (or a directories-only flag)
//! with a content regex and an action template. On a load request the
//! rules run in order; matches are filtered by the click origin (a click
//! must fall inside the match, an explicit selection must equal it), and
//! the first rule whose action succeeds ends the load. Actions expand
//! `$0`..`$9` capture references (`$l` lower-cases the next one) and
//! either re-enter the dispatcher (`X`) or open a target editor at a
//! structural address (`L`).

use std::panic::{catch_unwind, AssertUnwindSafe};

use regex::RegexBuilder;
use tracing::debug;

use crate::config::{ConfigError, LoadRuleDef};
use crate::core::address;
use crate::core::buffer::Buffer;
use crate::core::exec::{self, ExecContext};
use crate::core::selection::Sel;
use crate::core::window::WindowRoot;

/// A compiled load rule
pub struct LoadRule {
    /// Apply only to directory buffers (the `/` buffer pattern)
    pub for_dir: bool,
    pub buf_re: Option<regex::Regex>,
    pub re: ContentRegex,
    pub action: String,
}

/// Compile the configured rule table. A rule action not starting with
/// `X` or `L` is a fatal configuration error.
pub fn compile_rules(defs: &[LoadRuleDef]) -> Result<Vec<LoadRule>, ConfigError> {
    let mut rules = Vec::with_capacity(defs.len());
    for def in defs {
        if !def.action.starts_with('X') && !def.action.starts_with('L') {
            return Err(ConfigError::BadRuleAction(def.action.clone()));
        }
        let buf_re = if def.buf_re == "/" {
            None
        } else {
            Some(
                regex::Regex::new(&def.buf_re)
                    .map_err(|e| ConfigError::BadRuleRegex(def.buf_re.clone(), e.to_string()))?,
            )
        };
        rules.push(LoadRule {
            for_dir: buf_re.is_none(),
            buf_re,
            re: ContentRegex::compile(&def.re, true, false)
                .map_err(|e| ConfigError::BadRuleRegex(def.re.clone(), e.to_string()))?,
            action: def.action.clone(),
        });
    }
    Ok(rules)
}

/// A content regex matched against a rune window of a buffer, reporting
/// rune-offset spans
pub struct ContentRegex {
    re: regex::Regex,
}

/// A buffer range materialized for regex matching, with the byte↔rune
/// offset tables needed to translate spans back
pub struct RuneWindow {
    text: String,
    byte_of_rune: Vec<usize>,
    base: usize,
}

impl RuneWindow {
    pub fn new(buf: &Buffer, from: usize, to: usize) -> Self {
        let from = from.min(buf.size());
        let to = to.clamp(from, buf.size());
        let mut text = String::new();
        let mut byte_of_rune = Vec::with_capacity(to - from + 1);
        for i in from..to {
            byte_of_rune.push(text.len());
            if let Some(cr) = buf.at(i) {
                text.push(cr.r);
            }
        }
        byte_of_rune.push(text.len());
        RuneWindow {
            text,
            byte_of_rune,
            base: from,
        }
    }

    fn rune_of_byte(&self, b: usize) -> usize {
        match self.byte_of_rune.binary_search(&b) {
            Ok(i) => self.base + i,
            Err(i) => self.base + i - 1,
        }
    }
}

impl ContentRegex {
    pub fn compile(
        src: &str,
        case_insensitive: bool,
        multiline: bool,
    ) -> Result<Self, regex::Error> {
        Ok(ContentRegex {
            re: RegexBuilder::new(src)
                .case_insensitive(case_insensitive)
                .multi_line(multiline)
                .build()?,
        })
    }

    /// Search forward in `w` from absolute rune offset `start`. Returns
    /// the rune spans of the whole match and each capture group.
    pub fn match_window(&self, w: &RuneWindow, start: usize) -> Option<Vec<Option<(usize, usize)>>> {
        let rel = start.checked_sub(w.base)?;
        let byte_start = *w.byte_of_rune.get(rel)?;
        let caps = self.re.captures_at(&w.text, byte_start)?;
        let mut spans = Vec::with_capacity(caps.len());
        for i in 0..caps.len() {
            spans.push(
                caps.get(i)
                    .map(|m| (w.rune_of_byte(m.start()), w.rune_of_byte(m.end()))),
            );
        }
        Some(spans)
    }
}

/// Expand `$0`..`$9` in `template` against the capture list; `$l` before
/// a digit lower-cases the substitution, anything else after `$` is left
/// as-is
pub fn expand_matches(template: &str, matches: &[String]) -> String {
    let mut out = String::new();
    let mut sub = false;
    let mut tolower = false;
    for ch in template.chars() {
        if !sub {
            if ch == '$' {
                tolower = false;
                sub = true;
            } else {
                out.push(ch);
            }
        } else if ch == 'l' {
            tolower = true;
        } else if ch.is_ascii_digit() {
            let d = (ch as u8 - b'0') as usize;
            if d >= matches.len() {
                out.push('$');
                out.push(ch);
            } else if tolower {
                out.push_str(&matches[d].to_lowercase());
            } else {
                out.push_str(&matches[d]);
            }
            sub = false;
        } else {
            out.push('$');
            out.push(ch);
            sub = false;
        }
    }
    out
}

/// Run the load engine at `origin` (the clicked rune index, or -1 for an
/// explicit selection). Failures inside rule execution are contained and
/// warned.
pub fn load(root: &mut WindowRoot, ec: &ExecContext, origin: isize) {
    let result = catch_unwind(AssertUnwindSafe(|| load_inner(root, ec, origin)));
    if let Err(payload) = result {
        let msg = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "unknown panic".to_string());
        root.warn(&format!("error during load: {}", msg));
    }
}

fn load_inner(root: &mut WindowRoot, ec: &ExecContext, origin: isize) {
    let Some(ed_id) = ec.ed else { return };

    // a bare click carries an empty selection: widen it to the line
    // around the origin so rules have text to match against
    {
        let Some(ed) = root.editor_mut(ed_id) else {
            return;
        };
        let (fr, buf) = if ec.on_tag {
            (&mut ed.tag_fr, &ed.tag_buf)
        } else {
            (&mut ed.body_fr, &ed.body_buf)
        };
        if fr.sel.is_empty() && origin >= 0 {
            let o = origin as usize;
            fr.sel = Sel::new(buf.tonl(o, -1), buf.tonl(o, 1));
        }
    }

    let rules = root.load_rules.clone();
    for rule in rules.iter() {
        let Some(ed) = root.editor(ed_id) else { return };
        let buf = if ec.on_tag { &ed.tag_buf } else { &ed.body_buf };
        let path = buf.path();

        if rule.for_dir {
            if !buf.is_dir() {
                continue;
            }
        } else {
            let pathstr = path.to_string_lossy();
            match &rule.buf_re {
                Some(re) if re.is_match(&pathstr) => {}
                _ => continue,
            }
        }

        let sel = if ec.on_tag {
            ed.tag_fr.sel
        } else {
            ed.body_fr.sel
        };
        let window = RuneWindow::new(buf, sel.s, sel.e);

        let mut start = sel.s;
        loop {
            let Some(spans) = rule.re.match_window(&window, start) else {
                break;
            };
            let Some((s, e)) = spans[0] else { break };

            let ok = if origin < 0 {
                s == sel.s && e == sel.e
            } else {
                s as isize <= origin && origin <= e as isize
            };

            if ok {
                debug!(s, e, action = %rule.action, "load rule matched");
                let Some(ed) = root.editor(ed_id) else { return };
                let buf = if ec.on_tag { &ed.tag_buf } else { &ed.body_buf };
                let strmatches: Vec<String> = spans
                    .iter()
                    .map(|sp| match sp {
                        Some((gs, ge)) => buf.selection_string(Sel::new(*gs, *ge)),
                        None => String::new(),
                    })
                    .collect();
                if rule_exec(root, ec, rule, &strmatches, s, e) {
                    return;
                }
                // abandon the rule after the first match straddling the
                // origin
                break;
            }

            start = s + 1;
            if start as isize > origin {
                break;
            }
        }
    }
}

/// Execute a matched rule. Returns true when the load is complete, false
/// to try the next rule.
fn rule_exec(
    root: &mut WindowRoot,
    ec: &ExecContext,
    rule: &LoadRule,
    matches: &[String],
    s: usize,
    e: usize,
) -> bool {
    let action = &rule.action[1..];

    match rule.action.as_bytes()[0] {
        b'X' => {
            let expanded = expand_matches(action, matches);
            set_load_selection(root, ec, s, e);
            exec::exec(root, ec, &expanded);
            true
        }
        b'L' => {
            let mut parts = action.splitn(2, ':');
            let name = expand_matches(parts.next().unwrap_or(""), matches);
            let addr_expr = expand_matches(parts.next().unwrap_or(""), matches);

            let target = if !name.is_empty() {
                match root.edit_find(&ec.dir, &name, false, true) {
                    Ok(Some(id)) => id,
                    _ => return false,
                }
            } else {
                match ec.ed {
                    Some(id) => id,
                    None => return false,
                }
            };

            set_load_selection(root, ec, s, e);
            if let Some(id) = ec.ed {
                if let Some(ed) = root.editor_mut(id) {
                    ed.buffer_refresh(ec.on_tag);
                }
            }

            if !addr_expr.is_empty() {
                if let Some(ed) = root.editor_mut(target) {
                    ed.body_fr.sel_color = 0;
                    ed.body_fr.sel = Sel::default();
                    match address::addr_eval(&addr_expr, &ed.body_buf, ed.body_fr.sel) {
                        Ok(sel) => {
                            ed.body_fr.sel = sel;
                            // scroll the address into view
                            if !ed.body_fr.inside(sel.s) {
                                ed.body_fr.top = ed.body_buf.tonl(sel.s, -1);
                            }
                        }
                        Err(_) => {}
                    }
                    ed.buffer_refresh(false);
                }
            }

            if let Some(ed) = root.editor(target) {
                let p = ed.body_fr.point_to_coord(ed.body_fr.sel.s);
                root.backend.warp_mouse(p);
            }
            true
        }
        _ => false,
    }
}

fn set_load_selection(root: &mut WindowRoot, ec: &ExecContext, s: usize, e: usize) {
    if let Some(id) = ec.ed {
        if let Some(ed) = root.editor_mut(id) {
            let fr = if ec.on_tag {
                &mut ed.tag_fr
            } else {
                &mut ed.body_fr
            };
            fr.sel = Sel::new(s, e);
            fr.sel_color = 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_matches_basic() {
        let m = vec!["Foo".to_string(), "BAR".to_string(), "baz".to_string()];
        assert_eq!(expand_matches("$0$l1$2", &m), "Foobarbaz");
    }

    #[test]
    fn test_expand_matches_out_of_range_is_literal() {
        let m = vec!["a".to_string()];
        assert_eq!(expand_matches("$9", &m), "$9");
    }

    #[test]
    fn test_expand_matches_non_digit_is_literal() {
        assert_eq!(expand_matches("$x", &[]), "$x");
        assert_eq!(expand_matches("a$", &[]), "a");
    }

    #[test]
    fn test_expand_matches_plain_text() {
        let m = vec!["util.go".to_string()];
        assert_eq!(expand_matches("open $0 now", &m), "open util.go now");
    }

    fn window_of(text: &str) -> (Buffer, RuneWindow) {
        let mut buf = Buffer::new("t.txt", Path::new("/tmp"));
        let mut sel = Sel::default();
        buf.replace(text, &mut sel, crate::core::buffer::ReplaceOrigin::Kbd);
        let w = RuneWindow::new(&buf, 0, buf.size());
        (buf, w)
    }

    #[test]
    fn test_content_regex_rune_spans() {
        let (_buf, w) = window_of("see util.go:42 for details");
        let re = ContentRegex::compile("([a-zA-Z_][a-zA-Z0-9_./]*):([0-9]+)", true, false).unwrap();
        let spans = re.match_window(&w, 0).unwrap();
        assert_eq!(spans[0], Some((4, 14)));
        assert_eq!(spans[1], Some((4, 11)));
        assert_eq!(spans[2], Some((12, 14)));
    }

    #[test]
    fn test_content_regex_non_ascii_offsets() {
        let (_buf, w) = window_of("αβ file.rs:7");
        let re = ContentRegex::compile("([a-z.]+):([0-9]+)", true, false).unwrap();
        let spans = re.match_window(&w, 0).unwrap();
        assert_eq!(spans[0], Some((3, 12)));
    }

    #[test]
    fn test_content_regex_search_from_offset() {
        let (_buf, w) = window_of("a.go:1 b.go:2");
        let re = ContentRegex::compile("([a-z.]+):([0-9]+)", true, false).unwrap();
        let spans = re.match_window(&w, 5).unwrap();
        assert_eq!(spans[0], Some((7, 13)));
    }

    #[test]
    fn test_compile_rules_rejects_bad_action() {
        let defs = vec![LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "x".to_string(),
            action: "Qnope".to_string(),
        }];
        assert!(compile_rules(&defs).is_err());
    }

    #[test]
    fn test_compile_rules_slash_means_directories() {
        let defs = vec![LoadRuleDef {
            buf_re: "/".to_string(),
            re: "(.+)".to_string(),
            action: "L$1:".to_string(),
        }];
        let rules = compile_rules(&defs).unwrap();
        assert!(rules[0].for_dir);
        assert!(rules[0].buf_re.is_none());
    }
}
