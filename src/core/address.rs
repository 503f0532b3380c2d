//! Structural address evaluation
//!
//! Evaluates the address forms load rules and Edit programs use to
//! position a selection: absolute line numbers, `#` rune offsets, `$`
//! end-of-buffer, `/regex/` forward searches, and `a1,a2` ranges. A line
//! address selects the whole line including its newline.

use thiserror::Error;

use crate::core::buffer::Buffer;
use crate::core::load::{ContentRegex, RuneWindow};
use crate::core::selection::Sel;

#[derive(Debug, Error)]
pub enum AddrError {
    #[error("bad address: {0}")]
    Bad(String),
    #[error("no match for /{0}/")]
    NoMatch(String),
    #[error("bad regex /{0}/: {1}")]
    BadRegex(String, String),
}

/// Evaluate `expr` against `buf`, starting from `dot`
pub fn addr_eval(expr: &str, buf: &Buffer, dot: Sel) -> Result<Sel, AddrError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(dot);
    }

    if let Some((a1, a2)) = split_range(expr) {
        let s1 = eval_simple(a1, buf, dot)?;
        let s2 = eval_simple(a2, buf, s1)?;
        return Ok(Sel::new(s1.s, s2.e));
    }

    eval_simple(expr, buf, dot)
}

// Split on a top-level comma, ignoring commas inside /regex/ delimiters
fn split_range(expr: &str) -> Option<(&str, &str)> {
    let mut in_re = false;
    let mut prev_escape = false;
    for (i, ch) in expr.char_indices() {
        match ch {
            '/' if !prev_escape => in_re = !in_re,
            ',' if !in_re => return Some((&expr[..i], &expr[i + 1..])),
            _ => {}
        }
        prev_escape = ch == '\\' && !prev_escape;
    }
    None
}

fn eval_simple(expr: &str, buf: &Buffer, dot: Sel) -> Result<Sel, AddrError> {
    let expr = expr.trim();

    if expr.is_empty() {
        return Ok(dot);
    }

    if expr == "$" {
        return Ok(Sel::point(buf.size()));
    }

    if let Some(rest) = expr.strip_prefix('#') {
        let n: usize = rest
            .parse()
            .map_err(|_| AddrError::Bad(expr.to_string()))?;
        return Ok(Sel::point(n.min(buf.size())));
    }

    if expr.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = expr
            .parse()
            .map_err(|_| AddrError::Bad(expr.to_string()))?;
        return Ok(line_sel(buf, n));
    }

    if let Some(rel) = expr.strip_prefix('+') {
        let n: usize = rel.parse().map_err(|_| AddrError::Bad(expr.to_string()))?;
        let base = line_of(buf, dot.s);
        return Ok(line_sel(buf, base + n));
    }
    if let Some(rel) = expr.strip_prefix('-') {
        let n: usize = rel.parse().map_err(|_| AddrError::Bad(expr.to_string()))?;
        let base = line_of(buf, dot.s);
        return Ok(line_sel(buf, base.saturating_sub(n).max(1)));
    }

    if let Some(body) = expr.strip_prefix('/') {
        let pat = body.strip_suffix('/').unwrap_or(body);
        let re = ContentRegex::compile(pat, false, false)
            .map_err(|e| AddrError::BadRegex(pat.to_string(), e.to_string()))?;
        let w = RuneWindow::new(buf, 0, buf.size());
        if let Some(spans) = re.match_window(&w, dot.e) {
            if let Some((s, e)) = spans[0] {
                return Ok(Sel::new(s, e));
            }
        }
        // wrap around to the start
        if let Some(spans) = re.match_window(&w, 0) {
            if let Some((s, e)) = spans[0] {
                return Ok(Sel::new(s, e));
            }
        }
        return Err(AddrError::NoMatch(pat.to_string()));
    }

    Err(AddrError::Bad(expr.to_string()))
}

/// Selection spanning 1-based line `n`, including its newline
fn line_sel(buf: &Buffer, n: usize) -> Sel {
    if n == 0 {
        return Sel::point(0);
    }
    let mut start = 0;
    for _ in 1..n {
        let next = buf.tonl(start, 1);
        if next == start {
            break;
        }
        start = next;
        if start >= buf.size() {
            return Sel::point(buf.size());
        }
    }
    Sel::new(start, buf.tonl(start, 1))
}

/// 1-based line number containing rune offset `p`
fn line_of(buf: &Buffer, p: usize) -> usize {
    let mut line = 1;
    for i in 0..p.min(buf.size()) {
        if let Some(cr) = buf.at(i) {
            if cr.r == '\n' {
                line += 1;
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::ReplaceOrigin;
    use std::path::Path;

    fn buf(text: &str) -> Buffer {
        let mut b = Buffer::new("t.txt", Path::new("/tmp"));
        let mut sel = Sel::default();
        b.replace(text, &mut sel, ReplaceOrigin::Kbd);
        b
    }

    #[test]
    fn test_line_address() {
        let b = buf("one\ntwo\nthree\n");
        assert_eq!(addr_eval("2", &b, Sel::default()).unwrap(), Sel::new(4, 8));
        assert_eq!(addr_eval("1", &b, Sel::default()).unwrap(), Sel::new(0, 4));
    }

    #[test]
    fn test_line_address_past_end() {
        let b = buf("one\n");
        assert_eq!(addr_eval("9", &b, Sel::default()).unwrap(), Sel::point(4));
    }

    #[test]
    fn test_char_address() {
        let b = buf("hello");
        assert_eq!(addr_eval("#3", &b, Sel::default()).unwrap(), Sel::point(3));
        assert_eq!(addr_eval("#99", &b, Sel::default()).unwrap(), Sel::point(5));
    }

    #[test]
    fn test_end_address() {
        let b = buf("hello");
        assert_eq!(addr_eval("$", &b, Sel::default()).unwrap(), Sel::point(5));
    }

    #[test]
    fn test_regex_address() {
        let b = buf("one\ntwo\nthree\n");
        assert_eq!(
            addr_eval("/two/", &b, Sel::default()).unwrap(),
            Sel::new(4, 7)
        );
    }

    #[test]
    fn test_regex_address_wraps() {
        let b = buf("one\ntwo\n");
        assert_eq!(
            addr_eval("/one/", &b, Sel::point(5)).unwrap(),
            Sel::new(0, 3)
        );
    }

    #[test]
    fn test_range_address() {
        let b = buf("one\ntwo\nthree\nfour\n");
        assert_eq!(
            addr_eval("2,3", &b, Sel::default()).unwrap(),
            Sel::new(4, 14)
        );
    }

    #[test]
    fn test_relative_address() {
        let b = buf("one\ntwo\nthree\nfour\n");
        let dot = Sel::new(4, 8); // line 2
        assert_eq!(addr_eval("+1", &b, dot).unwrap(), Sel::new(8, 14));
        assert_eq!(addr_eval("-1", &b, dot).unwrap(), Sel::new(0, 4));
    }

    #[test]
    fn test_bad_address() {
        let b = buf("x");
        assert!(addr_eval("%%", &b, Sel::default()).is_err());
        assert!(addr_eval("/nope/", &b, Sel::default()).is_err());
    }
}
