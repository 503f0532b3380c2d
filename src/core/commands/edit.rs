//! Clipboard, paste, undo and Edit-program commands

use crate::core::buffer::{Buffer, ReplaceOrigin};
use crate::core::command::Command;
use crate::core::exec::ExecContext;
use crate::core::selection::Sel;
use crate::core::window::WindowRoot;
use crate::core::address;

/// Cut (`del`) or Snarf/Copy the selection to the clipboard. An empty
/// selection never touches the clipboard.
#[derive(Clone)]
pub struct Copy {
    pub del: bool,
}

impl Command for Copy {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        let Some(text) = root.with_ctx(ec, |fr, buf| buf.selection_string(fr.sel)) else {
            return;
        };
        if text.is_empty() {
            // does not trash the clipboard when copying nothing
            return;
        }
        if self.del {
            root.with_ctx(ec, |fr, buf| {
                let mut sel = fr.sel;
                buf.replace("", &mut sel, ReplaceOrigin::Mouse);
                fr.sel = sel;
            });
            root.refresh_ctx(ec);
        }
        root.backend.set_clipboard(&text);
    }
}

/// Replace the selection with the clipboard (or the primary selection)
#[derive(Clone)]
pub struct Paste {
    pub primary: bool,
}

impl Command for Paste {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        if ec.ed.is_none() {
            return;
        }
        let cb = if self.primary {
            root.backend.get_primary_selection()
        } else {
            root.backend.get_clipboard()
        };
        root.with_ctx(ec, |fr, buf| {
            let mut sel = fr.sel;
            buf.replace(&cb, &mut sel, ReplaceOrigin::Mouse);
            fr.sel = sel;
        });
        root.refresh_ctx(ec);
    }
}

/// Indentation-aware paste: with an empty caret mid-line in the body,
/// the current line's indent prefix replaces the pasted block's
/// first-line indent on every line but the first
#[derive(Clone)]
pub struct PasteIndent;

impl Command for PasteIndent {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        if ec.ed.is_none() {
            return;
        }
        let cb = root.backend.get_clipboard();

        let plain = root
            .with_ctx(ec, |fr, _buf| fr.sel.s == 0 || !fr.sel.is_empty())
            .unwrap_or(true)
            || ec.on_tag;
        if plain {
            root.with_ctx(ec, |fr, buf| {
                let mut sel = fr.sel;
                buf.replace(&cb, &mut sel, ReplaceOrigin::Mouse);
                fr.sel = sel;
            });
            root.refresh_ctx(ec);
            return;
        }

        root.with_ctx(ec, |fr, buf| {
            let text = indent_paste_text(buf, fr.sel.s, &cb);
            let mut sel = fr.sel;
            buf.replace(&text, &mut sel, ReplaceOrigin::Mouse);
            fr.sel = sel;
        });
        root.refresh_ctx(ec);
    }
}

/// Rewrite `cb` for insertion at caret `at`: detect the target line's
/// indent, strip the source block's first-line indent, and prepend the
/// target indent to every line but the first. Falls back to the pasted
/// text as-is when the caret isn't in pure leading whitespace.
pub fn indent_paste_text(buf: &Buffer, at: usize, cb: &str) -> String {
    let mut failed = false;
    let mut tgt_indent = String::new();
    let mut i = at as isize - 1;
    while i > 0 {
        let r = match buf.at(i as usize) {
            Some(cr) => cr.r,
            None => break,
        };
        match r {
            '\n' => {
                tgt_indent = buf.selection_string(Sel::new(i as usize + 1, at));
                break;
            }
            ' ' | '\t' => i -= 1,
            _ => {
                failed = true;
                break;
            }
        }
    }
    if failed {
        return cb.to_string();
    }

    let paste_lines: Vec<&str> = cb.split('\n').collect();
    let mut src_indent = "";
    for (i, ch) in paste_lines[0].char_indices() {
        if ch != ' ' && ch != '\t' {
            src_indent = &paste_lines[0][..i];
            break;
        }
    }

    let mut out = Vec::with_capacity(paste_lines.len());
    for (i, line) in paste_lines.iter().enumerate() {
        match line.strip_prefix(src_indent) {
            Some(rest) if i == 0 => out.push(rest.to_string()),
            Some(rest) => out.push(format!("{}{}", tgt_indent, rest)),
            None => out.push(line.to_string()),
        }
    }
    out.join("\n")
}

/// Step the buffer history backward or forward
#[derive(Clone)]
pub struct Undo {
    pub redo: bool,
}

impl Command for Undo {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, _arg: &str) {
        if ec.ed.is_none() {
            return;
        }
        let redo = self.redo;
        root.with_ctx(ec, |fr, buf| {
            let mut sel = fr.sel;
            buf.undo(&mut sel, redo);
            fr.sel = sel;
        });
        root.refresh_ctx(ec);
    }
}

/// `Edit <program>`: a structural edit program, an address followed by
/// an optional command (`d`, `a/text/`, `i/text/`, `c/text/`,
/// `s/re/sub/`)
#[derive(Clone)]
pub struct EditProgram;

impl Command for EditProgram {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str) {
        if ec.ed.is_none() {
            return;
        }
        let prog = arg.trim().to_string();
        let result = root.with_ctx(ec, |fr, buf| {
            let mut sel = fr.sel;
            let r = run_edit_program(&prog, buf, &mut sel);
            fr.sel = sel;
            r
        });
        match result {
            Some(Err(msg)) => root.warn(&format!("Edit: {}", msg)),
            _ => root.refresh_ctx(ec),
        }
    }
}

/// Execute one edit program line against `buf` with `sel` as dot
pub fn run_edit_program(prog: &str, buf: &mut Buffer, sel: &mut Sel) -> Result<(), String> {
    let (addr_part, cmd_part) = split_program(prog);

    let dot = address::addr_eval(addr_part, buf, *sel).map_err(|e| e.to_string())?;
    *sel = dot;

    let cmd_part = cmd_part.trim();
    if cmd_part.is_empty() {
        return Ok(());
    }

    let mut chars = cmd_part.chars();
    let op = chars.next().unwrap();
    let rest = chars.as_str();
    match op {
        'd' => {
            let mut s = dot;
            buf.replace("", &mut s, ReplaceOrigin::Kbd);
            *sel = s;
            Ok(())
        }
        'a' => {
            let text = delimited_text(rest)?;
            let mut s = Sel::point(dot.e);
            buf.replace(&text, &mut s, ReplaceOrigin::Kbd);
            *sel = s;
            Ok(())
        }
        'i' => {
            let text = delimited_text(rest)?;
            let mut s = Sel::point(dot.s);
            buf.replace(&text, &mut s, ReplaceOrigin::Kbd);
            *sel = s;
            Ok(())
        }
        'c' => {
            let text = delimited_text(rest)?;
            let mut s = dot;
            buf.replace(&text, &mut s, ReplaceOrigin::Kbd);
            *sel = s;
            Ok(())
        }
        's' => {
            let (re_src, sub, global) = split_subst(rest)?;
            let re = regex::Regex::new(&re_src).map_err(|e| e.to_string())?;
            let text = buf.selection_string(dot);
            let replaced = if global {
                re.replace_all(&text, sub.as_str()).into_owned()
            } else {
                re.replace(&text, sub.as_str()).into_owned()
            };
            let mut s = dot;
            buf.replace(&replaced, &mut s, ReplaceOrigin::Kbd);
            *sel = s;
            Ok(())
        }
        other => Err(format!("unknown command '{}'", other)),
    }
}

// Split an edit program into its leading address and the command tail.
// The address may contain /regex/ delimiters hiding command letters.
fn split_program(prog: &str) -> (&str, &str) {
    let mut in_re = false;
    let mut prev_escape = false;
    for (i, ch) in prog.char_indices() {
        match ch {
            '/' if !prev_escape => in_re = !in_re,
            'd' | 'a' | 'i' | 'c' | 's' if !in_re => return (&prog[..i], &prog[i..]),
            _ => {}
        }
        prev_escape = ch == '\\' && !prev_escape;
    }
    (prog, "")
}

// `/text/` (closing delimiter optional) or bare text
fn delimited_text(rest: &str) -> Result<String, String> {
    let rest = rest.trim_start();
    if let Some(body) = rest.strip_prefix('/') {
        Ok(body.strip_suffix('/').unwrap_or(body).replace("\\n", "\n"))
    } else if rest.is_empty() {
        Err("missing text".to_string())
    } else {
        Ok(rest.replace("\\n", "\n"))
    }
}

// `/re/sub/` with optional trailing `g`
fn split_subst(rest: &str) -> Result<(String, String, bool), String> {
    let rest = rest
        .strip_prefix('/')
        .ok_or_else(|| "substitution needs /re/sub/".to_string())?;
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut escape = false;
    for ch in rest.chars() {
        if escape {
            cur.push(ch);
            escape = false;
        } else if ch == '\\' {
            cur.push(ch);
            escape = true;
        } else if ch == '/' {
            parts.push(std::mem::take(&mut cur));
        } else {
            cur.push(ch);
        }
    }
    parts.push(cur);
    if parts.len() < 2 {
        return Err("substitution needs /re/sub/".to_string());
    }
    let global = parts.get(2).map(|s| s.trim() == "g").unwrap_or(false);
    Ok((parts[0].clone(), parts[1].clone(), global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn buf(text: &str) -> Buffer {
        let mut b = Buffer::new("t.txt", Path::new("/tmp"));
        let mut sel = Sel::default();
        b.replace(text, &mut sel, ReplaceOrigin::Kbd);
        b
    }

    #[test]
    fn test_indent_paste_matching_indent() {
        let b = buf("    foo\n    bar\n    ");
        // caret at end, line indent is four spaces
        let out = indent_paste_text(&b, 20, "x\n  y\n");
        assert_eq!(out, "x\n      y\n    ");
    }

    #[test]
    fn test_indent_paste_strips_source_indent() {
        let b = buf("\tfn main() {\n\t");
        let out = indent_paste_text(&b, 14, "  a\n  b");
        assert_eq!(out, "a\n\tb");
    }

    #[test]
    fn test_indent_paste_fails_mid_word() {
        let b = buf("hello");
        assert_eq!(indent_paste_text(&b, 5, "  x\n  y"), "  x\n  y");
    }

    #[test]
    fn test_edit_program_delete_line() {
        let mut b = buf("one\ntwo\nthree\n");
        let mut sel = Sel::default();
        run_edit_program("2d", &mut b, &mut sel).unwrap();
        assert_eq!(b.contents(), "one\nthree\n");
    }

    #[test]
    fn test_edit_program_substitute() {
        let mut b = buf("hello world\n");
        let mut sel = Sel::new(0, 12);
        run_edit_program("s/o/0/g", &mut b, &mut sel).unwrap();
        assert_eq!(b.contents(), "hell0 w0rld\n");
    }

    #[test]
    fn test_edit_program_append() {
        let mut b = buf("ab\n");
        let mut sel = Sel::default();
        run_edit_program("1a/X/", &mut b, &mut sel).unwrap();
        assert_eq!(b.contents(), "ab\nX");
    }

    #[test]
    fn test_edit_program_change() {
        let mut b = buf("one\ntwo\n");
        let mut sel = Sel::default();
        run_edit_program("1c/uno\\n/", &mut b, &mut sel).unwrap();
        assert_eq!(b.contents(), "uno\ntwo\n");
    }

    #[test]
    fn test_edit_program_address_only_moves_dot() {
        let mut b = buf("one\ntwo\n");
        let mut sel = Sel::default();
        run_edit_program("2", &mut b, &mut sel).unwrap();
        assert_eq!(sel, Sel::new(4, 8));
        assert_eq!(b.contents(), "one\ntwo\n");
    }

    #[test]
    fn test_edit_program_bad_command() {
        let mut b = buf("x");
        let mut sel = Sel::default();
        assert!(run_edit_program("1z", &mut b, &mut sel).is_err());
    }
}
