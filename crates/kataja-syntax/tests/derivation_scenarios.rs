//! End-to-end derivations over small hand-built lexicons.

use std::sync::{Arc, Mutex};

use kataja_syntax::{
    Crash, DerivationEvent, Driver, LabelKind, Lexicon, Numeration, Outcome,
};
use tracing_subscriber::layer::SubscriberExt;

fn lexicon(pairs: &[(&str, &[&str])]) -> Lexicon {
    Lexicon::from_pairs(pairs.iter().map(|(k, v)| (*k, *v))).expect("valid lexicon")
}

#[test]
fn two_word_merge_projects_the_determiner() {
    let lex = lexicon(&[
        ("the", &["iD", "uPerson"]),
        ("dog", &["Root", "iPerson", "iNumber", "iGender"]),
    ]);
    let d = Driver::new(&lex)
        .derive(&Numeration::flat(&["dog", "the"]))
        .unwrap();

    assert!(d.converged());
    assert_eq!(d.root_label(), "the");
    assert_eq!(d.syntax.len(), 3, "two leaves and one merged root");
    let root = &d.syntax[d.root];
    assert_eq!(d.syntax[root.part1.unwrap()].label, "the");
    assert_eq!(d.syntax[root.part2.unwrap()].label, "dog");
    assert_eq!(d.counters.merge, 1);
}

#[test]
fn shared_phi_features_give_a_phi_label() {
    let phi: &[&str] = &["iPerson:3", "iNumber:Sg", "iGender:M"];
    let lex = lexicon(&[("a", phi), ("b", phi)]);
    let d = Driver::new(&lex)
        .derive(&Numeration::flat(&["a", "b"]))
        .unwrap();

    assert!(d.converged());
    assert_eq!(d.counters.merge, 1);
    assert_eq!(d.root_label(), "Phi0");
    assert!(d.events.iter().any(|e| matches!(
        e,
        DerivationEvent::Labeled { kind: LabelKind::SharedFeats, label, .. } if label == "Phi0"
    )));

    let shared = d.syntax.head_features(d.root);
    let mut names: Vec<&str> = shared.iter().map(|f| d.syntax[*f].name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Gender", "Number", "Person"]);
    assert!(shared.iter().all(|f| d.syntax[*f].ifeature()));
    let rendered: Vec<String> = shared.iter().map(|f| d.syntax[*f].to_string()).collect();
    assert_eq!(rendered, ["iPerson:3", "iNumber:Sg", "iGender:M"]);
}

#[test]
fn dephasing_relabels_in_place_and_transfers_the_root_complement() {
    let lex = lexicon(&[
        ("v*", &["Head", "MergeF"]),
        ("X", &["Head", "MergeF"]),
        ("V", &["MergeF", "Root"]),
        ("obj", &["iD"]),
    ]);
    let d = Driver::new(&lex)
        .derive(&Numeration::flat(&["v*", "X", "V", "obj"]))
        .unwrap();

    assert!(d.converged());
    assert_eq!(d.root_label(), "V+v*");
    assert_eq!(d.syntax.len(), 7, "four leaves and three merges, no extra node");

    let dephase = d
        .events
        .iter()
        .position(|e| matches!(e, DerivationEvent::Dephased { .. }))
        .expect("dephase event");
    let obj = d
        .syntax
        .ids()
        .find(|id| d.syntax[*id].label == "obj")
        .unwrap();
    assert_eq!(
        d.events[dephase + 1],
        DerivationEvent::Transferred { target: Some(obj) }
    );
    assert!(d.syntax[obj].transferred);

    let vp = d.syntax.parent_of(d.root, obj).unwrap();
    assert_eq!(d.syntax[vp].label, "V");
    assert_eq!(d.stack.main().first(), Some(&vp), "stack truncated to the Root");
}

#[test]
fn phase_head_transfers_its_complement() {
    let lex = lexicon(&[("C", &["Head"]), ("T", &["Head"]), ("go", &["Root"])]);
    let d = Driver::new(&lex)
        .derive(&Numeration::flat(&["C", "T", "go"]))
        .unwrap();

    assert_eq!(d.root_label(), "C");
    let tp = d.syntax[d.root].part2.unwrap();
    assert_eq!(d.syntax[tp].label, "T");
    assert!(d.events.contains(&DerivationEvent::Transferred { target: Some(tp) }));
    assert_eq!(d.counters.transfer, 1);
}

#[test]
fn unlabeled_final_spine_crashes_and_logs_an_error() {
    let lex = lexicon(&[("the", &["iD"]), ("a", &["iD"]), ("b", &["iD"])]);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let capture = ErrorCapture(Arc::clone(&errors));
    let subscriber = tracing_subscriber::registry().with(capture);

    let d = tracing::subscriber::with_default(subscriber, || {
        Driver::new(&lex)
            .derive(&Numeration::flat(&["the", "a", "b"]))
            .unwrap()
    });

    assert_eq!(d.outcome, Outcome::Crashed(Crash::Unlabeled { node: d.root }));
    assert_eq!(d.syntax.len(), 5, "partial tree is kept");
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[test]
fn default_grammar_runs_a_transitive_clause() {
    let lex = Lexicon::pop_default();
    let n = Numeration::from_json_str(r#"["C", ["the", "dog"], "v*", "v", "see", ["a", "cat"]]"#)
        .unwrap();
    let d = Driver::new(&lex).derive(&n).unwrap();

    let indices: Vec<usize> = d.steps.iter().map(|s| s.index).collect();
    assert_eq!(indices, (0..d.steps.len()).collect::<Vec<_>>());
    assert!(d.counters.merge as usize >= n.lexeme_count() - 1);
    assert!(d.events.iter().any(|e| matches!(e, DerivationEvent::SubStream)));
}

struct ErrorCapture(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.lock().unwrap().push(event.metadata().name().to_string());
        }
    }
}
