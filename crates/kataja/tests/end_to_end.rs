//! Numeration in, settled forest out, through the public facade.

use kataja::prelude::*;

const CLAUSE: &str = r#"["C", ["the", "dog"], "v*", "v", "see", ["a", "cat"]]"#;

fn settled(k: &Kataja<HeadlessViewport>) -> bool {
    k.forest().visible_nodes().into_iter().all(|id| {
        let node = k.forest().node(id).unwrap();
        node.current_position == node.final_position() && node.opacity == 1.0
    })
}

#[test]
fn derived_clause_settles_under_each_visualization() {
    let lexicon = Lexicon::pop_default();
    let numeration = Numeration::from_json_str(CLAUSE).unwrap();
    let derivation = Driver::new(&lexicon).derive(&numeration).unwrap();

    let mut k = Kataja::new(Context::with_viewport(HeadlessViewport::default()));
    let index = k.add_derivation(&derivation).unwrap();
    assert!(k.show_forest(index));

    for name in VISUALIZATIONS.into_iter().filter(|v| *v != "equidistant_3d_tree") {
        k.change_visualization(name).unwrap();
        let ticks = k.run_until_idle(2_000);
        assert!(ticks < 2_000, "{name} never came to rest");
        assert!(settled(&k), "{name} stopped before nodes arrived");
    }

    k.change_visualization("equidistant_3d_tree").unwrap();
    k.run_until_idle(300);
    for id in k.forest().visible_nodes() {
        assert!(k.forest().node(id).unwrap().current_position.is_finite());
    }
}

#[test]
fn derive_forest_binds_the_preferred_visualization() {
    let mut prefs = Preferences::default();
    prefs.default_visualization = "left_first_tree".to_string();
    let forest = derive_forest(&Lexicon::pop_default(), CLAUSE, &prefs).unwrap();
    assert_eq!(forest.engine_name(), Some("left_first_tree"));

    let err = derive_forest(&Lexicon::pop_default(), "[]", &prefs).unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
}
