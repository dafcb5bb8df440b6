//! Commands run through the engine: undo bookkeeping, shortcuts, errors.

use kataja_core::{ColorKey, HeadlessViewport, KeyCode, KeyEvent, Modifiers, Point3, Shortcut, ViewportEvent};
use kataja_forest::{NodeType, Signal};
use kataja_runtime::{Command, CommandArgs, CommandError, Context, HostRequest, Invocation, Kataja, WidgetId};

type Engine = Kataja<HeadlessViewport>;

fn engine() -> Engine {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
    Kataja::new(Context::with_viewport(HeadlessViewport::default()))
}

fn none() -> CommandArgs {
    CommandArgs::default()
}

fn first(_: &mut Engine, _: &Invocation<'_>) -> kataja_runtime::Result<String> {
    Ok("first".to_string())
}

fn second(_: &mut Engine, _: &Invocation<'_>) -> kataja_runtime::Result<String> {
    Ok("second".to_string())
}

#[test]
fn every_documented_command_is_registered() {
    let k = engine();
    let mut expected: Vec<String> = [
        "undo",
        "redo",
        "next_forest",
        "previous_forest",
        "new_forest",
        "toggle_fold_node",
        "delete_node",
        "merge_nodes",
        "change_visualization",
        "toggle_brackets",
        "toggle_traces",
        "toggle_magnets",
        "show_merge_order",
        "show_select_order",
        "toggle_fullscreen",
        "fit_to_window",
        "print_pdf",
    ]
    .map(String::from)
    .to_vec();
    for t in NodeType::ALL {
        expected.push(format!("add_{}_node", t.name()));
        expected.push(format!("edit_{}_color", t.name()));
        expected.push(format!("select_{}_font", t.name()));
    }
    for name in &expected {
        assert!(k.commands().contains(name), "{name} missing");
    }
    assert_eq!(k.commands().len(), expected.len());
}

#[test]
fn undoable_commands_record_and_undo_redo_walk_back() {
    let mut k = engine();
    k.execute("add_constituent_node", &CommandArgs::text("A")).unwrap();
    k.execute("add_gloss_node", &CommandArgs::text("a dog")).unwrap();
    assert_eq!(k.forest().state().node_count(), 2);
    assert_eq!(k.forest().undo_manager().index(), 2);

    assert_eq!(k.execute("undo", &none()).unwrap(), "Undo: Added gloss a dog");
    assert_eq!(k.forest().state().node_count(), 1);
    assert_eq!(k.execute("undo", &none()).unwrap(), "Undo: Added constituent A");
    assert_eq!(k.forest().state().node_count(), 0);
    assert!(matches!(k.execute("undo", &none()), Err(CommandError::Disabled(_))));

    k.execute("redo", &none()).unwrap();
    k.execute("redo", &none()).unwrap();
    assert_eq!(k.forest().state().node_count(), 2);
    assert_eq!(k.forest().undo_manager().index(), 2);
}

#[test]
fn failed_command_leaves_no_undo_entry() {
    let mut k = engine();
    let before = k.forest().undo_manager().len();
    let err = k.execute("delete_node", &none()).unwrap_err();
    assert!(matches!(err, CommandError::MissingArgument { argument: "node", .. }));
    let err = k.execute("merge_nodes", &none()).unwrap_err();
    assert!(matches!(err, CommandError::MissingArgument { .. }));
    assert_eq!(k.forest().undo_manager().len(), before);
}

#[test]
fn unknown_command_is_an_error() {
    let mut k = engine();
    let err = k.execute("make_coffee", &none()).unwrap_err();
    assert!(matches!(err, CommandError::UnknownCommand(ref n) if n == "make_coffee"));
    assert_eq!(err.to_string(), "unknown command: make_coffee");
}

#[test]
fn add_node_uses_position_label_and_selects() {
    let mut k = engine();
    let args = CommandArgs::text("Top").at(Point3::xy(40.0, -20.0));
    k.execute("add_attribute_node", &args).unwrap();
    let id = k.forest().selection().nodes().next().unwrap();
    let node = k.forest().node(id).unwrap();
    assert_eq!(node.node_type, NodeType::Attribute);
    assert_eq!(node.label, "Top");
    assert_eq!(node.current_position, Point3::xy(40.0, -20.0));

    k.execute("add_property_node", &none()).unwrap();
    let id = k.forest().selection().nodes().next().unwrap();
    assert_eq!(k.forest().node(id).unwrap().label, "property");
}

#[test]
fn merge_puts_a_new_constituent_above_the_selection() {
    let mut k = engine();
    let the = k.forest_mut().create_node(NodeType::Constituent, "the");
    let dog = k.forest_mut().create_node(NodeType::Constituent, "dog");
    k.forest_mut().select(the).unwrap();
    k.forest_mut().add_to_selection(dog).unwrap();

    assert_eq!(k.execute("merge_nodes", &none()).unwrap(), format!("Merged {the} and {dog}"));
    let merged = k.forest().selection().nodes().next().unwrap();
    assert_eq!(k.forest().node(merged).unwrap().label, "the");
    assert_eq!(k.forest().state().children(merged), vec![the, dog]);
    assert_eq!(k.forest().roots(), [merged]);
}

#[test]
fn fold_toggles_and_delete_removes_the_selection() {
    let mut k = engine();
    let top = k.forest_mut().create_node(NodeType::Constituent, "D");
    let leaf = k.forest_mut().create_node(NodeType::Constituent, "N");
    k.forest_mut()
        .connect(top, leaf, kataja_forest::EdgeType::Constituent, kataja_forest::Alignment::Right)
        .unwrap();

    k.execute("toggle_fold_node", &CommandArgs::node(top)).unwrap();
    assert!(k.forest().is_folded(top));
    assert!(!k.forest().visible_nodes().contains(&leaf));
    k.execute("toggle_fold_node", &CommandArgs::node(top)).unwrap();
    assert!(!k.forest().is_folded(top));

    k.forest_mut().select(leaf).unwrap();
    assert_eq!(k.execute("delete_node", &none()).unwrap(), format!("Deleted {leaf}"));
    assert!(k.forest().node(leaf).is_none());
    k.execute("undo", &none()).unwrap();
    assert!(k.forest().node(leaf).is_some());
}

#[test]
fn style_commands_need_their_argument_and_signal() {
    let mut k = engine();
    let err = k.execute("edit_gloss_color", &none()).unwrap_err();
    assert!(matches!(err, CommandError::MissingArgument { argument: "color", .. }));
    k.execute("edit_gloss_color", &CommandArgs::color(ColorKey::Accent(7))).unwrap();
    assert_eq!(k.style(NodeType::Gloss).color, ColorKey::Accent(7));
    assert_eq!(k.signals().count(Signal::PaletteChanged), 1);

    k.execute("select_feature_font", &CommandArgs::text("mono")).unwrap();
    assert_eq!(k.style(NodeType::Feature).font, "mono");
    assert_eq!(k.signals().count(Signal::UiFontChanged), 1);
}

#[test]
fn checkable_toggles_report_their_state() {
    let mut k = engine();
    let traces = k.commands().get("toggle_traces").unwrap();
    assert!(traces.is_checkable());
    let before = traces.is_checked(&k).unwrap();
    k.execute("toggle_traces", &none()).unwrap();
    assert_eq!(k.commands().get("toggle_traces").unwrap().is_checked(&k), Some(!before));
    assert_eq!(k.commands().get("undo").unwrap().is_checked(&k), None);

    k.execute("toggle_fullscreen", &none()).unwrap();
    assert!(k.is_fullscreen());
}

#[test]
fn host_only_commands_queue_requests() {
    let mut k = engine();
    k.execute("print_pdf", &none()).unwrap();
    k.execute("fit_to_window", &none()).unwrap();
    let requests = k.take_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], HostRequest::PrintPdf);
    assert!(matches!(requests[1], HostRequest::FitToWindow(_)));
    assert!(k.take_requests().is_empty());
}

#[test]
fn visualization_command_cycles_or_takes_a_name() {
    let mut k = engine();
    k.execute("change_visualization", &CommandArgs::text("spiralling_tree")).unwrap();
    assert_eq!(k.forest().engine_name(), Some("spiralling_tree"));
    k.execute("change_visualization", &none()).unwrap();
    assert_eq!(
        k.forest().engine_name(),
        Some(kataja_layout::next_visualization("spiralling_tree"))
    );
    assert!(matches!(
        k.execute("change_visualization", &CommandArgs::text("nope")),
        Err(CommandError::Layout(_))
    ));
}

#[test]
fn forest_navigation_is_enabled_only_with_several_forests() {
    let mut k = engine();
    let right = ViewportEvent::KeyPress(KeyEvent::new(KeyCode::Right));
    assert!(!k.handle_event(&right), "nothing bound and enabled");

    k.execute("new_forest", &none()).unwrap();
    assert_eq!(k.current_index(), 1);
    assert!(k.handle_event(&right));
    assert_eq!(k.current_index(), 0);
    assert!(k.handle_event(&ViewportEvent::KeyPress(KeyEvent::new(KeyCode::Left))));
    assert_eq!(k.current_index(), 1);
}

#[test]
fn ambiguous_shortcut_prefers_a_visible_widget() {
    let mut k = engine();
    k.commands_mut().register(Command::new("first", first).shortcut("Ctrl+K"));
    k.commands_mut().register(Command::new("second", second).shortcut("Ctrl+K"));
    let ctrl_k: Shortcut = "Ctrl+K".parse().unwrap();
    assert_eq!(ctrl_k, KeyEvent::new(KeyCode::Char('k')).with_modifiers(Modifiers::CTRL).shortcut());

    assert_eq!(k.resolve_shortcut(ctrl_k).as_deref(), Some("first"));
    k.commands_mut().bind_widget(WidgetId(9), "second").unwrap();
    assert_eq!(k.resolve_shortcut(ctrl_k).as_deref(), Some("second"));
    assert!(k.commands_mut().set_widget_visible(WidgetId(9), false));
    assert_eq!(k.resolve_shortcut(ctrl_k).as_deref(), Some("first"));

    assert!(matches!(
        k.commands_mut().bind_widget(WidgetId(10), "missing"),
        Err(CommandError::UnknownCommand(_))
    ));
}

#[test]
fn redo_shortcut_needs_shift() {
    let k = engine();
    let undo: Shortcut = "Ctrl+Z".parse().unwrap();
    let redo: Shortcut = "Shift+Ctrl+Z".parse().unwrap();
    assert_ne!(undo, redo);
    assert_eq!(k.commands().get("redo").unwrap().shortcut, Some(redo));
    // Fresh forests have nothing to undo.
    assert_eq!(k.resolve_shortcut(undo), None);
}
