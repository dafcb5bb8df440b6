//! Pointer and keyboard input delivered through `handle_event`.

use kataja_core::{
    CursorKind, HeadlessViewport, KeyCode, KeyEvent, Modifiers, MouseButton, MouseButtons, Point3, ViewportEvent,
    ViewportRequest,
};
use kataja_forest::{NodeId, NodeType};
use kataja_runtime::{Context, Kataja};

type Engine = Kataja<HeadlessViewport>;

/// The default headless viewport shows scene origin at widget (400, 300).
fn widget(scene: Point3) -> Point3 {
    Point3::xy(scene.x + 400.0, scene.y + 300.0)
}

fn place(k: &mut Engine, label: &str, at: Point3) -> NodeId {
    let id = k.forest_mut().create_node(NodeType::Constituent, label);
    let node = k.forest_mut().state_mut().node_mut(id).unwrap();
    node.computed_position = at;
    node.current_position = at;
    id
}

fn press(at: Point3, modifiers: Modifiers) -> ViewportEvent {
    ViewportEvent::PointerPress {
        position: widget(at),
        button: MouseButton::Left,
        modifiers,
    }
}

fn drag(at: Point3) -> ViewportEvent {
    ViewportEvent::PointerMove {
        position: widget(at),
        buttons: MouseButtons::LEFT,
        modifiers: Modifiers::NONE,
    }
}

fn release(at: Point3) -> ViewportEvent {
    ViewportEvent::PointerRelease {
        position: widget(at),
        button: MouseButton::Left,
        modifiers: Modifiers::NONE,
    }
}

fn two_nodes() -> (Engine, NodeId, NodeId) {
    let mut k = Kataja::new(Context::with_viewport(HeadlessViewport::default()));
    let a = place(&mut k, "A", Point3::xy(-200.0, 0.0));
    let b = place(&mut k, "B", Point3::xy(200.0, 0.0));
    k.forest_mut().record("place");
    (k, a, b)
}

#[test]
fn press_selects_and_shift_press_adds() {
    let (mut k, a, b) = two_nodes();
    assert!(k.handle_event(&press(Point3::xy(-200.0, 0.0), Modifiers::NONE)));
    assert!(k.handle_event(&release(Point3::xy(-200.0, 0.0))));
    assert_eq!(k.forest().selection().nodes().collect::<Vec<_>>(), vec![a]);

    k.handle_event(&press(Point3::xy(200.0, 0.0), Modifiers::SHIFT));
    k.handle_event(&release(Point3::xy(200.0, 0.0)));
    assert_eq!(k.forest().selection().nodes().collect::<Vec<_>>(), vec![a, b]);

    k.handle_event(&press(Point3::xy(200.0, 0.0), Modifiers::NONE));
    assert_eq!(k.forest().selection().nodes().collect::<Vec<_>>(), vec![b]);
}

#[test]
fn press_on_empty_space_clears_the_selection() {
    let (mut k, a, _) = two_nodes();
    k.forest_mut().select(a).unwrap();
    assert!(k.handle_event(&press(Point3::xy(0.0, 250.0), Modifiers::NONE)));
    assert!(k.forest().selection().is_empty());
    assert!(!k.handle_event(&release(Point3::xy(0.0, 250.0))), "no drag in progress");
}

#[test]
fn drag_moves_the_node_and_release_records_one_undo_entry() {
    let (mut k, a, _) = two_nodes();
    let start = Point3::xy(-200.0, 0.0);
    let before = k.forest().undo_manager().len();

    k.handle_event(&press(start, Modifiers::NONE));
    assert!(k.forest().node(a).unwrap().dragged);
    k.handle_event(&drag(Point3::xy(-190.0, 5.0)));
    k.handle_event(&drag(Point3::xy(-170.0, 10.0)));
    let node = k.forest().node(a).unwrap();
    assert_eq!(node.adjustment, Point3::xy(30.0, 10.0));
    assert_eq!(node.current_position, Point3::xy(-170.0, 10.0));

    k.handle_event(&release(Point3::xy(-170.0, 10.0)));
    assert!(!k.forest().node(a).unwrap().dragged);
    assert_eq!(k.forest().undo_manager().len(), before + 1);
    assert_eq!(k.forest().undo_manager().labels().last(), Some("move node"));

    let cursors: Vec<CursorKind> = k
        .viewport()
        .requests()
        .iter()
        .filter_map(|r| match r {
            ViewportRequest::Cursor(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(cursors, vec![CursorKind::ClosedHand, CursorKind::Arrow]);

    assert_eq!(k.execute("undo", &Default::default()).unwrap(), "Undo: move node");
    assert_eq!(k.forest().node(a).unwrap().adjustment, Point3::ZERO);
}

#[test]
fn click_without_motion_records_nothing() {
    let (mut k, _, _) = two_nodes();
    let before = k.forest().undo_manager().len();
    let at = Point3::xy(200.0, 0.0);
    k.handle_event(&press(at, Modifiers::NONE));
    k.handle_event(&drag(at));
    k.handle_event(&release(at));
    assert_eq!(k.forest().undo_manager().len(), before);
}

#[test]
fn dragged_node_is_left_alone_by_the_scheduler() {
    let (mut k, a, _) = two_nodes();
    k.handle_event(&press(Point3::xy(-200.0, 0.0), Modifiers::NONE));
    k.handle_event(&drag(Point3::xy(-150.0, 0.0)));
    k.wake();
    assert!(k.run_until_idle(50) > 0);
    assert!(k.forest().node(a).unwrap().dragged);
    assert_eq!(k.forest().node(a).unwrap().current_position, Point3::xy(-150.0, 0.0));
}

#[test]
fn delete_key_removes_the_selected_node() {
    let (mut k, a, b) = two_nodes();
    k.handle_event(&press(Point3::xy(-200.0, 0.0), Modifiers::NONE));
    k.handle_event(&release(Point3::xy(-200.0, 0.0)));
    assert!(k.handle_event(&ViewportEvent::KeyPress(KeyEvent::new(KeyCode::Delete))));
    assert!(k.forest().node(a).is_none());
    assert!(k.forest().node(b).is_some());

    let undo = KeyEvent::new(KeyCode::Char('Z')).with_modifiers(Modifiers::CTRL);
    assert!(k.handle_event(&ViewportEvent::KeyPress(undo)));
    assert!(k.forest().node(a).is_some());
}

#[test]
fn wheel_and_resize_redraw_focus_is_ignored() {
    let (mut k, _, _) = two_nodes();
    let before = k.viewport().redraw_count();
    assert!(k.handle_event(&ViewportEvent::Wheel {
        delta: 1.0,
        modifiers: Modifiers::NONE
    }));
    assert!(k.handle_event(&ViewportEvent::Resize {
        width: 640.0,
        height: 480.0
    }));
    assert_eq!(k.viewport().redraw_count(), before + 2);
    assert!(!k.handle_event(&ViewportEvent::FocusIn));
    assert!(!k.handle_event(&ViewportEvent::KeyPress(KeyEvent::new(KeyCode::F(2)))));
}
