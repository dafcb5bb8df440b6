//! Undo history over real forest edits.

use kataja_core::UndoConfig;
use kataja_forest::{Alignment, EdgeType, Forest, ForestError, ForestSettings, NodeType};

fn serialized(forest: &Forest) -> String {
    serde_json::to_string(forest.state()).unwrap()
}

#[test]
fn three_edits_undo_to_empty_and_redo_back() {
    let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
    let a = forest.create_node(NodeType::Constituent, "A");
    forest.record("A");
    let b = forest.create_node(NodeType::Constituent, "B");
    forest.record("B");
    forest.connect(a, b, EdgeType::Constituent, Alignment::Left).unwrap();
    forest.record("connect");
    let connected = serialized(&forest);

    assert_eq!(forest.undo_manager().index(), 3);
    for expected in ["connect", "B", "A"] {
        assert_eq!(forest.undo().unwrap(), expected);
    }
    assert!(forest.state().is_empty(), "all nodes should be gone");
    assert_eq!(forest.undo_manager().index(), 0);
    assert_eq!(forest.undo(), Err(ForestError::NothingToUndo));

    assert_eq!(forest.undo_manager().redo_depth(), 3);
    for _ in 0..3 {
        forest.redo().unwrap();
    }
    assert_eq!(serialized(&forest), connected);
    assert_eq!(forest.state().edge_count(), 1);
    assert_eq!(forest.roots(), [a]);
}

#[test]
fn undo_then_redo_is_bit_identical() {
    let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
    let p = forest.create_node(NodeType::Constituent, "P");
    let g = forest.create_node(NodeType::Gloss, "the dog");
    forest.connect(p, g, EdgeType::Gloss, Alignment::None).unwrap();
    forest.select(g).unwrap();
    forest.record("gloss");
    let before = serialized(&forest);
    let selection = forest.selection().clone();

    forest.undo().unwrap();
    assert_ne!(serialized(&forest), before);
    forest.redo().unwrap();
    assert_eq!(serialized(&forest), before);
    assert_eq!(forest.selection(), &selection);
}

#[test]
fn suppressed_blocks_do_not_record() {
    let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
    forest.with_undo_suppressed(|f| {
        f.create_node(NodeType::Constituent, "A");
        f.record("hidden");
    });
    assert_eq!(forest.undo_manager().labels().collect::<Vec<_>>(), ["init"]);
}

#[test]
fn a_new_edit_drops_the_redo_tail() {
    let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
    forest.create_node(NodeType::Constituent, "A");
    forest.record("A");
    forest.undo().unwrap();
    forest.create_node(NodeType::Constituent, "B");
    forest.record("B");
    assert_eq!(forest.redo(), Err(ForestError::NothingToRedo));
    assert_eq!(forest.state().node_count(), 1);
}
