//! Frame layout and redraw behavior through the public API

mod common;

use std::sync::Arc;

use common::TestFace;
use limn::core::color::simple_matrix;
use limn::core::frame::{color_runes, Frame};
use limn::core::geometry::{Point, Rect};

fn frame(r: Rect) -> Frame {
    Frame::new(Arc::new(TestFace), simple_matrix(), r, 4).unwrap()
}

#[test]
fn layout_is_deterministic() {
    let text = color_runes("fn main() {\n\tprintln!(\"hello\");\n}\n");
    let mut a = frame(Rect::new(0, 0, 150, 120));
    let mut b = frame(Rect::new(0, 0, 150, 120));
    let la = a.insert(&text);
    let lb = b.insert(&text);
    assert_eq!(la, lb);
    for i in 0..a.size() {
        assert_eq!(a.point_to_coord(i), b.point_to_coord(i));
    }
}

#[test]
fn coord_round_trip_holds_for_every_glyph() {
    let mut fr = frame(Rect::new(0, 0, 150, 120));
    fr.insert(&color_runes("hello\tworld\nsecond line with text\nthird"));
    for i in 0..fr.size() {
        let p = fr.point_to_coord(i);
        assert_eq!(fr.coord_to_point(p), Some(i), "glyph {}", i);
    }
}

#[test]
fn insert_reports_pixel_limit() {
    let mut fr = frame(Rect::new(0, 0, 400, 120));
    let limit = fr.insert(&color_runes("abc"));
    // 3 glyphs of advance 8 starting at the 4px margin
    assert_eq!(limit.x, 4 + 24);
    assert_eq!(limit.y, 11);
}

#[test]
fn push_up_then_push_down_restores_positions() {
    let text = "alpha\nbravo\ncharlie\ndelta\n";
    let mut fr = frame(Rect::new(0, 0, 300, 200));
    fr.insert(&color_runes(text));
    let orig: Vec<Point> = (0..fr.size()).map(|i| fr.point_to_coord(i)).collect();

    let remaining = fr.push_up(1, false);
    assert!(remaining < orig.len());
    assert_eq!(fr.top, 6); // "alpha\n"

    fr.push_down(1, &color_runes("alpha\n"), &[]);
    assert_eq!(fr.top, 0);
    let now: Vec<Point> = (0..fr.size()).map(|i| fr.point_to_coord(i)).collect();
    assert_eq!(now, orig);
}

#[test]
fn tick_move_invalidates_only_tick_rects() {
    let mut fr = frame(Rect::new(0, 0, 400, 100));
    fr.visible_tick = true;
    fr.insert(&color_runes("some text to carry a moving tick"));
    fr.set_select(0, 1, 10, 10);
    fr.redraw(false, None);

    fr.set_select(0, 1, 20, 20);
    let mut invalid = Vec::new();
    fr.redraw(false, Some(&mut invalid));

    assert_eq!(invalid.len(), 2);
    for r in &invalid {
        assert!(r.dx() < 30 && r.dy() <= 20, "not tick-sized: {:?}", r);
    }
}

#[test]
fn full_redraw_invalidates_whole_frame() {
    let mut fr = frame(Rect::new(0, 0, 400, 100));
    fr.insert(&color_runes("text"));
    let mut invalid = Vec::new();
    fr.redraw(false, Some(&mut invalid));
    assert_eq!(invalid, vec![fr.r]);
}

#[test]
fn tick_fast_path_pixels_match_full_redraw() {
    let text = "the quick brown fox\njumps over the dog\n";

    let mut fast = frame(Rect::new(0, 0, 400, 100));
    fast.visible_tick = true;
    fast.insert(&color_runes(text));
    fast.set_select(0, 1, 3, 3);
    fast.redraw(false, None);
    for pos in [9, 25, 1, 30] {
        fast.set_select(0, 1, pos, pos);
        fast.redraw(false, None);
    }

    let mut full = frame(Rect::new(0, 0, 400, 100));
    full.visible_tick = true;
    full.insert(&color_runes(text));
    full.set_select(0, 1, 30, 30);
    full.redraw(false, None);

    assert_eq!(fast.b.pixels(), full.b.pixels());
}

#[test]
fn refresh_colors_keeps_layout() {
    let mut fr = frame(Rect::new(0, 0, 300, 100));
    fr.insert(&color_runes("abc def"));
    let before: Vec<Point> = (0..fr.size()).map(|i| fr.point_to_coord(i)).collect();
    fr.refresh_colors(&color_runes("abc"), &color_runes(" def"));
    let after: Vec<Point> = (0..fr.size()).map(|i| fr.point_to_coord(i)).collect();
    assert_eq!(before, after);
}

#[test]
fn line_no_counts_whole_lines() {
    let fr = frame(Rect::new(0, 0, 300, 150));
    assert_eq!(fr.line_no(), 10);
}

#[test]
fn inside_rejects_offscreen_runes() {
    let mut fr = frame(Rect::new(0, 0, 300, 30));
    fr.insert(&color_runes("a\nb\nc\nd\ne\nf\ng\nh\n"));
    assert!(fr.inside(0));
    assert!(!fr.inside(15));
}
