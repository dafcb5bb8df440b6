//! Engines driven through a forest, the way the runtime drives them.

use kataja_core::{LayoutConfig, Point3, UndoConfig};
use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings, NodeId, NodeType};
use kataja_layout::{TracesToDraw, VISUALIZATIONS, change_visualization};
use kataja_syntax::{Driver, Lexicon, Numeration};

const GRID_ENGINES: [&str; 4] = [
    "left_first_tree",
    "balanced_tree",
    "left_first_hex_tree",
    "spiralling_tree",
];

fn clause_forest() -> Forest {
    let lex = Lexicon::pop_default();
    let n = Numeration::from_json_str(r#"["C", ["the", "dog"], "v*", "v", "see", ["a", "cat"]]"#).unwrap();
    let d = Driver::new(&lex).derive(&n).unwrap();
    Forest::from_derivation(&d, &UndoConfig::default(), ForestSettings::default()).unwrap()
}

fn positions(forest: &Forest) -> Vec<(NodeId, Point3)> {
    forest
        .visible_nodes()
        .into_iter()
        .map(|id| (id, forest.node(id).unwrap().computed_position))
        .collect()
}

fn show(forest: &mut Forest, name: &str) -> Vec<(NodeId, Point3)> {
    change_visualization(forest, name, &LayoutConfig::default()).unwrap();
    forest.draw();
    positions(forest)
}

/// X shared by P and Q, both under R:
///
/// ```text
///        R
///      /   \
///     P     Q
///    / \   / \
///   a   X     b
/// ```
fn shared_leaf() -> (Forest, [NodeId; 6]) {
    let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
    let [r, p, q, a, x, b] = ["R", "P", "Q", "a", "X", "b"].map(|l| f.create_node(NodeType::Constituent, l));
    f.connect(r, p, EdgeType::Constituent, Alignment::Left).unwrap();
    f.connect(r, q, EdgeType::Constituent, Alignment::Right).unwrap();
    f.connect(p, a, EdgeType::Constituent, Alignment::Left).unwrap();
    f.connect(p, x, EdgeType::Constituent, Alignment::Right).unwrap();
    f.connect(q, x, EdgeType::Constituent, Alignment::Left).unwrap();
    f.connect(q, b, EdgeType::Constituent, Alignment::Right).unwrap();
    (f, [r, p, q, a, x, b])
}

#[test]
fn switching_away_and_back_reproduces_positions() {
    for a in GRID_ENGINES {
        for b in VISUALIZATIONS {
            let mut forest = clause_forest();
            let first = show(&mut forest, a);
            show(&mut forest, b);
            let again = show(&mut forest, a);
            assert_eq!(first, again, "{a} -> {b} -> {a}");
        }
    }
}

#[test]
fn every_visible_constituent_is_placed_apart() {
    for name in GRID_ENGINES {
        let mut forest = clause_forest();
        let placed = show(&mut forest, name);
        assert!(placed.len() >= 7, "{name} placed {}", placed.len());
        for (i, (_, p)) in placed.iter().enumerate() {
            assert!(p.is_finite());
            for (_, q) in &placed[i + 1..] {
                assert!(p.distance(*q) > 0.0, "{name} stacked two nodes at {p:?}");
            }
        }
    }
}

#[test]
fn folding_and_unfolding_restores_the_layout() {
    let mut forest = clause_forest();
    let before = show(&mut forest, "balanced_tree");
    let root = forest.roots()[0];
    let inner = forest
        .state()
        .children(root)
        .into_iter()
        .max_by_key(|c| forest.state().descendants(*c).len())
        .unwrap();
    forest.fold(inner).unwrap();
    forest.draw();
    assert!(forest.visible_nodes().len() < before.len());
    forest.unfold(inner).unwrap();
    forest.draw();
    assert_eq!(positions(&forest), before);
}

#[test]
fn shared_constituent_has_one_drawn_parent_in_every_rotation() {
    let (mut f, [_, p, q, _, x, _]) = shared_leaf();
    let rotations = TracesToDraw::compute(f.state(), 0).rotations();
    assert_eq!(rotations, 2);
    let mut hosts = Vec::new();
    for rotation in 0..rotations {
        let traces = TracesToDraw::compute(f.state(), rotation);
        assert_eq!(traces.len(), 1);
        let host = traces.drawn_parent(x).unwrap();
        assert_eq!([p, q].iter().filter(|h| **h == host).count(), 1);
        assert!(traces.should_draw(x, Some(host)));
        hosts.push(host);
    }
    assert_eq!(hosts, [p, q]);

    // reselect walks the same rotations through the engine
    change_visualization(&mut f, "left_first_tree", &LayoutConfig::default()).unwrap();
    f.draw();
    let under_p = f.node(x).unwrap().computed_position;
    f.reselect();
    f.draw();
    let under_q = f.node(x).unwrap().computed_position;
    assert_ne!(under_p, under_q);
    f.reselect();
    f.draw();
    assert_eq!(f.node(x).unwrap().computed_position, under_p);
}

#[test]
fn wide_labels_widen_their_column() {
    let mut f = Forest::new(&UndoConfig::default(), ForestSettings::default());
    let top = f.create_node(NodeType::Constituent, "T");
    let l = f.create_node(NodeType::Constituent, "an-unusually-long-label");
    let r = f.create_node(NodeType::Constituent, "r");
    f.connect(top, l, EdgeType::Constituent, Alignment::Left).unwrap();
    f.connect(top, r, EdgeType::Constituent, Alignment::Right).unwrap();
    show(&mut f, "left_first_tree");
    let lx = f.node(l).unwrap().computed_position.x;
    let rx = f.node(r).unwrap().computed_position.x;
    let half_widths = (f.node(l).unwrap().width + f.node(r).unwrap().width) / 2.0;
    assert!(rx - lx >= half_widths, "{rx} - {lx} < {half_widths}");
}
