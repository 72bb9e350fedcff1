// Snapshot tests for editing sessions
// Renders the editable content as markup after each toolbar action

use richedit::config::EditorConfig;
use richedit::richtext::editor::RichTextEditor;
use richedit::richtext::mutation::{Alignment, EditError, LinkPolicy};
use richedit::richtext::selection::SelectionModel;
use richedit::richtext::surface::{MemorySurface, Point, Surface};
use richedit::script::{parse_script, run_script};

/// Helper to build an editor over plain text with default settings
fn editor(text: &str) -> RichTextEditor<MemorySurface> {
    RichTextEditor::new(MemorySurface::from_plain_text(text), EditorConfig::default())
}

/// Select character offsets the way a mouse drag would
fn drag(editor: &mut RichTextEditor<MemorySurface>, anchor: usize, focus: usize) {
    editor.surface_mut().select_chars(anchor, focus).unwrap();
    assert!(editor.selection_changed());
}

fn count_markers(editor: &RichTextEditor<MemorySurface>, class: &str) -> usize {
    let tree = editor.surface().tree();
    tree.descendants(editor.surface().editable_root())
        .into_iter()
        .filter(|&node| tree.attr(node, "class") == Some(class))
        .count()
}

#[test]
fn test_restore_survives_focus_leaving() {
    let mut surface = MemorySurface::from_plain_text("Hello world");
    let mut model = SelectionModel::new();
    let range = surface.select_chars(0, 5).unwrap();
    assert!(model.observe_selection_change(&surface));

    // focus moves to a popup input and the surface loses its selection
    surface.set_live_selection(None).unwrap();
    assert!(model.restore(&mut surface));
    assert!(model.restore(&mut surface));
    assert_eq!(surface.live_selection(), Ok(Some(range)));
    assert_eq!(range.text_content(surface.tree()), "Hello");
}

#[test]
fn test_bold_at_caret_inserts_placeholder() {
    let mut editor = editor("Hello");
    drag(&mut editor, 2, 2);
    editor.bold().unwrap();

    insta::assert_snapshot!(editor.surface().markup(), @"<p>He<strong>&#8203;</strong>llo</p>");
    let live = editor.surface().live_selection().unwrap().unwrap();
    let strong = editor
        .surface()
        .tree()
        .parent(live.anchor.node)
        .unwrap();
    assert_eq!(editor.surface().tree().tag(strong).map(|t| t.name()), Some("strong"));
}

#[test]
fn test_history_undo_and_redo_are_linear() {
    let mut editor = editor("one two three");
    let original = editor.surface().markup();

    drag(&mut editor, 0, 3);
    editor.bold().unwrap();
    drag(&mut editor, 4, 7);
    editor.italic().unwrap();
    drag(&mut editor, 8, 13);
    editor.align(Alignment::Center).unwrap();

    let edited = editor.surface().markup();
    insta::assert_snapshot!(edited, @r#"<p style="text-align: center"><strong>one</strong> <em>two</em> three</p>"#);

    for _ in 0..3 {
        assert!(editor.undo().unwrap().is_some());
    }
    assert_eq!(editor.surface().markup(), original);
    assert_eq!(editor.undo(), Ok(None));

    for _ in 0..3 {
        assert!(editor.redo().unwrap().is_some());
    }
    assert_eq!(editor.surface().markup(), edited);
}

#[test]
fn test_new_edit_invalidates_redo() {
    let mut editor = editor("one two");
    drag(&mut editor, 0, 3);
    editor.underline().unwrap();
    editor.undo().unwrap();
    assert!(editor.history().can_redo());

    drag(&mut editor, 4, 7);
    editor.strikethrough().unwrap();
    assert!(!editor.history().can_redo());
    assert_eq!(editor.redo(), Ok(None));
    insta::assert_snapshot!(editor.surface().markup(), @"<p>one <s>two</s></p>");
}

#[test]
fn test_list_from_lines_skips_blank_ones() {
    let mut editor = editor("a\n\nb\nc");
    insta::assert_snapshot!(editor.surface().markup(), @"<p>a</p><p>b<br>c</p>");

    drag(&mut editor, 0, 4);
    let caret = editor.list(false).unwrap();
    insta::assert_snapshot!(
        editor.surface().markup(),
        @r#"<ul style="margin: 8px 0; padding-left: 20px"><li>a</li><li>b</li><li>c</li></ul>"#
    );
    assert!(caret.is_collapsed());
    assert_eq!(editor.surface().tree().text(caret.anchor.node), Some("c"));

    editor.undo().unwrap();
    assert_eq!(editor.surface().markup(), "<p>a</p><p>b<br>c</p>");
}

#[test]
fn test_only_one_highlight_marker() {
    let mut editor = editor("Hello brave world");
    drag(&mut editor, 6, 11);
    editor.popup_opened().unwrap();
    editor.popup_opened().unwrap();
    assert_eq!(count_markers(&editor, "text-selection-highlight"), 1);
    insta::assert_snapshot!(
        editor.surface().markup(),
        @r#"<p>Hello <span class="text-selection-highlight" style="background-color: #d0d0d3">brave</span> world</p>"#
    );

    assert!(editor.popup_closed());
    assert_eq!(count_markers(&editor, "text-selection-highlight"), 0);
    assert_eq!(editor.surface().markup(), "<p>Hello brave world</p>");
    let live = editor.surface().live_selection().unwrap().unwrap();
    assert_eq!(live.text_content(editor.surface().tree()), "brave");
}

#[test]
fn test_selection_moved_while_highlighted_can_be_edited() {
    let mut editor = editor("Hello brave world");
    drag(&mut editor, 6, 11);
    editor.popup_opened().unwrap();

    // the user drags over "world" while the marker around "brave" is shown
    drag(&mut editor, 12, 17);
    editor.bold().unwrap();
    assert_eq!(count_markers(&editor, "text-selection-highlight"), 0);
    insta::assert_snapshot!(editor.surface().markup(), @"<p>Hello brave <strong>world</strong></p>");
    let live = editor.surface().live_selection().unwrap().unwrap();
    assert_eq!(live.text_content(editor.surface().tree()), "world");
}

#[test]
fn test_link_popup_flow() {
    let mut editor = editor("see docs here");
    drag(&mut editor, 4, 8);
    editor.popup_opened().unwrap();
    // the popup input has focus while the URL is typed
    editor.surface_mut().set_live_selection(None).unwrap();

    let caret = editor.insert_link("https://docs.rs").unwrap();
    assert!(caret.is_collapsed());
    assert_eq!(count_markers(&editor, "text-selection-highlight"), 0);
    insta::assert_snapshot!(editor.surface().markup(), @r#"<p>see <a href="https://docs.rs">docs</a> here</p>"#);
}

#[test]
fn test_strict_link_policy_rejects_bare_host() {
    let mut editor = editor("see docs");
    drag(&mut editor, 4, 8);
    assert_eq!(
        editor.insert_link("docs.rs"),
        Err(EditError::InvalidLink("docs.rs".to_string()))
    );
    assert_eq!(editor.surface().markup(), "<p>see docs</p>");
    assert!(!editor.history().can_undo());
}

#[test]
fn test_lenient_link_policy_adds_scheme() {
    let config = EditorConfig {
        link_policy: LinkPolicy::Lenient,
        ..EditorConfig::default()
    };
    let mut editor = RichTextEditor::new(MemorySurface::from_plain_text("see docs"), config);
    drag(&mut editor, 4, 8);
    editor.insert_link("docs.rs").unwrap();
    insta::assert_snapshot!(editor.surface().markup(), @r#"<p>see <a href="https://docs.rs">docs</a></p>"#);
}

#[test]
fn test_caret_anchor_leaves_document_alone() {
    let mut editor = editor("Hello world");
    assert_eq!(editor.caret_anchor(), None);

    drag(&mut editor, 3, 3);
    assert_eq!(editor.caret_anchor(), Some(Point { x: 24.0, y: 0.0 }));
    assert_eq!(editor.surface().markup(), "<p>Hello world</p>");

    drag(&mut editor, 0, 5);
    assert_eq!(editor.caret_anchor(), Some(Point { x: 40.0, y: 0.0 }));
}

#[test]
fn test_script_session() {
    let script = "\
select 6 11
italic
select 11 17
align right
link notaurl
locate
caret 0
heading 1
";
    let commands = parse_script(script).unwrap();
    let mut editor = editor("Hello world\n\nSecond line");
    let mut out = Vec::new();
    run_script(&mut editor, &commands, &mut out).unwrap();

    insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
    line 5: not an absolute http(s) URL: "notaurl"
    caret: 48 16
    "#);
    // the heading at a bare caret was skipped
    assert!(!editor.surface().markup().contains("<h1>"));
    insta::assert_snapshot!(
        editor.surface().markup(),
        @r#"<p>Hello <em>world</em></p><div style="text-align: right"><p>Second</p></div><p> line</p>"#
    );
}
