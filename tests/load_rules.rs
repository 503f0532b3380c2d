//! Load engine: origin eligibility, capture expansion, X and L dispatch

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{SharedBackend, TestFace};
use limn::config::{Config, LoadRuleDef};
use limn::core::buffer::{Buffer, ReplaceOrigin};
use limn::core::exec::ExecContext;
use limn::core::id::EditorId;
use limn::core::load;
use limn::core::selection::Sel;
use limn::core::window::WindowRoot;

fn setup_with(config: Config) -> WindowRoot {
    WindowRoot::new(config, Arc::new(TestFace), Box::new(SharedBackend::default())).unwrap()
}

fn open(root: &mut WindowRoot, dir: &Path, name: &str, text: &str) -> EditorId {
    let mut buf = Buffer::new(name, dir);
    let mut sel = Sel::default();
    buf.replace(text, &mut sel, ReplaceOrigin::Kbd);
    buf.modified = false;
    root.new_editor(buf)
}

fn ec_for(root: &WindowRoot, id: EditorId) -> ExecContext {
    ExecContext {
        col: root.column_of(id),
        ed: Some(id),
        on_tag: false,
        dir: root.editor(id).unwrap().body_buf.work_dir(),
    }
}

fn find_editor(root: &WindowRoot, name: &str) -> Option<EditorId> {
    root.columns
        .iter()
        .flat_map(|c| c.editors.iter())
        .find(|e| e.body_buf.name == name)
        .map(|e| e.id)
}

#[test]
fn click_on_file_line_reference_opens_editor_at_line() {
    let dir = tempfile::tempdir().unwrap();
    let content: String = (1..=45).map(|i| format!("line {}\n", i)).collect();
    std::fs::write(dir.path().join("util.go"), &content).unwrap();

    let mut root = setup_with(Config::default());
    let id = open(
        &mut root,
        dir.path(),
        "notes.txt",
        "see util.go:42 for details",
    );
    let ec = ec_for(&root, id);

    // right-click at offset 8, inside "util.go"
    load::load(&mut root, &ec, 8);

    let opened = find_editor(&root, "util.go").expect("util.go was not opened");
    let ed = root.editor(opened).unwrap();
    let sel = ed.body_fr.sel;
    assert_eq!(ed.body_buf.selection_string(sel), "line 42\n");

    // the source match is highlighted with the load color
    let src = root.editor(id).unwrap();
    assert_eq!(src.body_fr.sel, Sel::new(4, 14));
    assert_eq!(src.body_fr.sel_color, 2);
}

#[test]
fn origin_must_fall_inside_the_match() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.go"), "first\n").unwrap();
    std::fs::write(dir.path().join("b.go"), "second\n").unwrap();

    let mut root = setup_with(Config::default());
    let id = open(&mut root, dir.path(), "notes.txt", "a.go:1 b.go:1");
    let ec = ec_for(&root, id);

    // click on the second reference: the first match is skipped because
    // it doesn't straddle the origin
    load::load(&mut root, &ec, 8);

    assert!(find_editor(&root, "b.go").is_some());
    assert!(find_editor(&root, "a.go").is_none());
}

#[test]
fn explicit_selection_requires_exact_span() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("exact.go"), "x\n").unwrap();

    let mut root = setup_with(Config::default());
    let id = open(&mut root, dir.path(), "notes.txt", "see exact.go:1 here");
    {
        let ed = root.editor_mut(id).unwrap();
        // selection covering more than the match: not eligible
        ed.body_fr.sel = Sel::new(0, 19);
    }
    let ec = ec_for(&root, id);
    load::load(&mut root, &ec, -1);
    assert!(find_editor(&root, "exact.go").is_none());

    {
        let ed = root.editor_mut(id).unwrap();
        // exactly the match span: eligible
        ed.body_fr.sel = Sel::new(4, 14);
    }
    load::load(&mut root, &ec, -1);
    assert!(find_editor(&root, "exact.go").is_some());
}

#[test]
fn x_action_expands_captures_and_dispatches() {
    let mut config = Config::default();
    config.load_rules.insert(
        0,
        LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "@([A-Za-z]+)".to_string(),
            action: "X Setenv LIMN_LOAD_X $l1".to_string(),
        },
    );
    let mut root = setup_with(config);
    let id = open(&mut root, Path::new("/tmp"), "notes.txt", "run @PayLoad now");
    let ec = ec_for(&root, id);

    load::load(&mut root, &ec, 5);

    assert_eq!(std::env::var("LIMN_LOAD_X").unwrap(), "payload");
    let src = root.editor(id).unwrap();
    assert_eq!(src.body_fr.sel, Sel::new(4, 12));
    assert_eq!(src.body_fr.sel_color, 2);
}

#[test]
fn directory_rule_applies_only_to_directory_buffers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("entry.txt"), "inside\n").unwrap();

    let mut root = setup_with(Config::default());
    let buf = Buffer::from_file(dir.path()).unwrap();
    assert!(buf.is_dir());
    let id = root.new_editor(buf);
    let ec = ec_for(&root, id);

    // the listing contains "entry.txt"; click its first character
    let listing = root.editor(id).unwrap().body_buf.contents();
    let off = listing.find("entry.txt").unwrap();
    load::load(&mut root, &ec, off as isize);

    let opened = find_editor(&root, "entry.txt").expect("entry.txt was not opened");
    assert_eq!(
        root.editor(opened).unwrap().body_buf.contents(),
        "inside\n"
    );
}

#[test]
fn no_rule_match_is_a_quiet_no_op() {
    let mut root = setup_with(Config::default());
    let id = open(&mut root, Path::new("/tmp"), "notes.txt", "?? !! ??");
    let before = root
        .columns
        .iter()
        .map(|c| c.editors.len())
        .sum::<usize>();
    let ec = ec_for(&root, id);

    load::load(&mut root, &ec, 3);

    let after = root.columns.iter().map(|c| c.editors.len()).sum::<usize>();
    assert_eq!(before, after);
}
