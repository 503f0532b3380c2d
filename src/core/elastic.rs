//! Elastic tab stops
//!
//! Computes per-buffer tab-stop positions so that vertically adjacent
//! tab-separated cells line up: each column is as wide as its widest
//! cell plus padding. Used by the search-result window to align paths
//! and addresses.

use crate::core::editor::Editor;

/// Recompute the body frame's tab stops from its buffer content.
/// Buffers without tabs get their stops cleared (plain modulo tabbing).
pub fn elastic_tabs(ed: &mut Editor, on_body: bool) {
    if !on_body {
        return;
    }
    let text = ed.body_buf.contents();
    if !text.contains('\t') {
        ed.body_fr.tabs = None;
        return;
    }

    let pad = ed.body_fr.text_advance("  ");

    // column widths over all rows
    let mut widths: Vec<i32> = Vec::new();
    for line in text.split('\n') {
        let cells: Vec<&str> = line.split('\t').collect();
        // the last cell of a row has no tab after it and doesn't
        // constrain a stop
        for (j, cell) in cells.iter().enumerate() {
            if j + 1 == cells.len() {
                break;
            }
            let w = ed.body_fr.text_advance(cell) + pad;
            if j >= widths.len() {
                widths.push(w);
            } else if widths[j] < w {
                widths[j] = w;
            }
        }
    }

    if widths.is_empty() {
        ed.body_fr.tabs = None;
        return;
    }

    let mut stops = Vec::with_capacity(widths.len());
    let mut x = 0;
    for w in widths {
        x += w;
        stops.push(x);
    }
    // trailing stops so text after the last aligned column still tabs
    let step = stops.last().copied().unwrap_or(0).max(pad);
    for i in 1..=8 {
        stops.push(step + i * pad * 4);
    }
    ed.body_fr.tabs = Some(stops);
}
