//! Command resolver, built-in table, and confirm-flag behavior

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{SharedBackend, TestFace};
use limn::config::Config;
use limn::core::buffer::{Buffer, ReplaceOrigin};
use limn::core::exec::{self, ExecContext};
use limn::core::id::EditorId;
use limn::core::selection::Sel;
use limn::core::window::WindowRoot;

fn setup() -> (WindowRoot, std::sync::Arc<std::sync::Mutex<String>>) {
    let backend = SharedBackend::default();
    let clipboard = backend.clipboard.clone();
    let root = WindowRoot::new(Config::default(), Arc::new(TestFace), Box::new(backend)).unwrap();
    (root, clipboard)
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
        dir: root.editor(id).unwrap().body_buf.dir.clone(),
    }
}

fn body(root: &WindowRoot, id: EditorId) -> String {
    root.editor(id).unwrap().body_buf.contents()
}

fn errors_text(root: &WindowRoot) -> String {
    root.columns
        .iter()
        .flat_map(|c| c.editors.iter())
        .find(|e| e.body_buf.name == "+Errors")
        .map(|e| e.body_buf.contents())
        .unwrap_or_default()
}

fn drain_until(root: &mut WindowRoot, mut done: impl FnMut(&WindowRoot) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if done(root) {
            return true;
        }
        root.process_side_for(Duration::from_millis(50));
    }
    done(root)
}

#[test]
fn cut_copies_and_deletes_selection() {
    let (mut root, clipboard) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "hello world");
    root.editor_mut(id).unwrap().body_fr.sel = Sel::new(0, 6);
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Cut");

    assert_eq!(clipboard.lock().unwrap().as_str(), "hello ");
    assert_eq!(body(&root, id), "world");
}

#[test]
fn copy_of_empty_selection_preserves_clipboard() {
    let (mut root, clipboard) = setup();
    *clipboard.lock().unwrap() = "precious".to_string();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "hello");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Snarf");

    assert_eq!(clipboard.lock().unwrap().as_str(), "precious");
}

#[test]
fn paste_replaces_selection() {
    let (mut root, clipboard) = setup();
    *clipboard.lock().unwrap() = "NEW".to_string();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "old text");
    root.editor_mut(id).unwrap().body_fr.sel = Sel::new(0, 3);
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Paste");

    assert_eq!(body(&root, id), "NEW text");
    assert_eq!(root.editor(id).unwrap().body_fr.sel, Sel::new(0, 3));
}

#[test]
fn paste_indent_rewrites_block_indent() {
    let (mut root, clipboard) = setup();
    *clipboard.lock().unwrap() = "x\n  y\n".to_string();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "    foo\n    bar\n    ");
    root.editor_mut(id).unwrap().body_fr.sel = Sel::point(20);
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Paste!Indent");

    assert_eq!(body(&root, id), "    foo\n    bar\n    x\n      y\n    ");
}

#[test]
fn pipe_round_trip_with_undo() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "hello\n");
    root.editor_mut(id).unwrap().body_fr.sel = Sel::new(0, 6);
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "| tr a-z A-Z");
    assert!(
        drain_until(&mut root, |r| body(r, id) == "HELLO\n"),
        "pipe output never arrived: {:?}",
        body(&root, id)
    );
    assert_eq!(root.editor(id).unwrap().body_fr.sel, Sel::new(0, 6));

    exec::exec(&mut root, &ec, "Undo");
    assert_eq!(body(&root, id), "hello\n");
}

#[test]
fn pipe_out_discards_output() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "data\n");
    root.editor_mut(id).unwrap().body_fr.sel = Sel::new(0, 5);
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "> cat");
    // give the job time to finish, then check nothing changed
    drain_until(&mut root, |r| r.jobs.is_empty());
    assert_eq!(body(&root, id), "data\n");
}

#[test]
fn external_command_output_lands_in_errors() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "echo external-output");
    assert!(drain_until(&mut root, |r| errors_text(r)
        .contains("external-output")));
}

#[test]
fn exit_guard_two_phase() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "a.txt", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Exit");
    assert!(!root.shutdown);
    assert!(root.exit_confirmed);
    assert!(errors_text(&root).contains("a.txt"));

    // any command in between resets the confirmation, so the next Exit
    // warns again instead of shutting down
    let bare = ExecContext::bare(Path::new("/tmp").to_path_buf());
    exec::exec(&mut root, &bare, "Put");
    assert!(!root.exit_confirmed);

    exec::exec(&mut root, &ec, "Exit");
    assert!(!root.shutdown);
    assert!(root.exit_confirmed);

    exec::exec(&mut root, &ec, "Exit");
    assert!(root.shutdown);
}

#[test]
fn exit_second_invocation_shuts_down() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "a.txt", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Exit");
    assert!(!root.shutdown);
    exec::exec(&mut root, &ec, "Exit");
    assert!(root.shutdown);
}

#[test]
fn del_two_phase_confirmation() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "mod.txt", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Del");
    assert!(root.editor(id).is_some());
    assert!(root.editor(id).unwrap().confirm_del);
    assert!(errors_text(&root).contains("unsaved changes"));

    exec::exec(&mut root, &ec, "Del");
    assert!(root.editor(id).is_none());
}

#[test]
fn delete_skips_confirmation() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "mod.txt", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Delete");
    assert!(root.editor(id).is_none());
}

#[test]
fn scratch_buffers_delete_without_confirmation() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "+Scratch", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Del");
    assert!(root.editor(id).is_none());
}

#[test]
fn other_commands_reset_confirm_flags() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "a.txt", "text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Del");
    assert!(root.editor(id).unwrap().confirm_del);

    // an unrelated verb clears the Del guard
    exec::exec(&mut root, &ec, "Look zzz");
    assert!(!root.editor(id).unwrap().confirm_del);

    exec::exec(&mut root, &ec, "Exit");
    assert!(root.exit_confirmed);

    exec::exec(&mut root, &ec, "Setenv LIMN_RESET_TEST 1");
    assert!(!root.exit_confirmed);
}

#[test]
fn setenv_requires_exactly_two_arguments() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Setenv ONLYONE");
    assert!(errors_text(&root).contains("wrong number of arguments"));

    exec::exec(&mut root, &ec, "Setenv LIMN_DISPATCH_TEST somevalue");
    assert_eq!(
        std::env::var("LIMN_DISPATCH_TEST").unwrap(),
        "somevalue"
    );
}

#[test]
fn do_dispatches_each_line() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Do Setenv LIMN_DO_A 1\nSetenv LIMN_DO_B 2");
    assert_eq!(std::env::var("LIMN_DO_A").unwrap(), "1");
    assert_eq!(std::env::var("LIMN_DO_B").unwrap(), "2");
}

#[test]
fn sort_orders_column_by_name() {
    let (mut root, _) = setup();
    let c = open(&mut root, Path::new("/tmp"), "c.txt", "");
    let a = open(&mut root, Path::new("/tmp"), "a.txt", "");
    let _b = open(&mut root, Path::new("/tmp"), "b.txt", "");
    let ec = ec_for(&root, a);

    exec::exec(&mut root, &ec, "Sort");

    let names: Vec<String> = root.columns[0]
        .editors
        .iter()
        .map(|e| e.body_buf.name.clone())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    let _ = c;
}

#[test]
fn rename_changes_name_and_marks_modified() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "old.txt", "text");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Rename new.txt");
    let ed = root.editor(id).unwrap();
    assert_eq!(ed.body_buf.name, "new.txt");
    assert!(ed.body_buf.modified);
}

#[test]
fn new_without_argument_warns() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "New");
    assert!(errors_text(&root).contains("New: must specify argument"));
}

#[test]
fn new_opens_editor_for_path() {
    let (mut root, _) = setup();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("opened.txt"), "contents\n").unwrap();
    let id = open(&mut root, dir.path(), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "New opened.txt");
    let found = root
        .columns
        .iter()
        .flat_map(|c| c.editors.iter())
        .any(|e| e.body_buf.name == "opened.txt" && e.body_buf.contents() == "contents\n");
    assert!(found);
}

#[test]
fn put_writes_file_and_clears_modified() {
    let (mut root, _) = setup();
    let dir = tempfile::tempdir().unwrap();
    let id = open(&mut root, dir.path(), "save.txt", "saved text\n");
    root.editor_mut(id).unwrap().body_buf.modified = true;
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Put");

    assert!(!root.editor(id).unwrap().body_buf.modified);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("save.txt")).unwrap(),
        "saved text\n"
    );
}

#[test]
fn edit_program_runs_against_buffer() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "one\ntwo\nthree\n");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Edit 2d");
    assert_eq!(body(&root, id), "one\nthree\n");
}

#[test]
fn look_selects_next_match() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "one two one");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "Look two");
    assert_eq!(root.editor(id).unwrap().body_fr.sel, Sel::new(4, 7));
}

#[test]
fn jobs_lists_into_scratch_buffer() {
    let (mut root, _) = setup();
    let id = open(&mut root, Path::new("/tmp"), "t.txt", "x");
    let ec = ec_for(&root, id);

    exec::exec(&mut root, &ec, "sleep 5");
    exec::exec(&mut root, &ec, "Jobs");
    let jobs_buf = root
        .columns
        .iter()
        .flat_map(|c| c.editors.iter())
        .find(|e| e.body_buf.name == "+Jobs")
        .map(|e| e.body_buf.contents())
        .unwrap_or_default();
    assert!(jobs_buf.contains("sleep 5"), "+Jobs was: {:?}", jobs_buf);

    exec::exec(&mut root, &ec, "Kill");
    assert!(drain_until(&mut root, |r| r.jobs.is_empty()));
}
