//! Property tests: the driver never panics and its records stay consistent.

use kataja_syntax::{Driver, Lexicon, Numeration};
use proptest::prelude::*;

const LEXEMES: &[&str] = &[
    "the", "a", "n", "he", "she", "what", "v*", "v", "C", "C_Q", "that", "dog", "see",
];

proptest! {
    #[test]
    fn random_flat_numerations_finish(picks in prop::collection::vec(0..LEXEMES.len(), 1..8)) {
        let lex = Lexicon::pop_default();
        let words: Vec<&str> = picks.iter().map(|i| LEXEMES[*i]).collect();
        let d = Driver::new(&lex).derive(&Numeration::flat(&words)).unwrap();

        prop_assert!(d.counters.merge as usize >= words.len() - 1);
        for (i, step) in d.steps.iter().enumerate() {
            prop_assert_eq!(step.index, i);
            prop_assert!(step.syntax.len() <= d.syntax.len());
        }
        // Every constituent is either a leaf or binary.
        for id in d.syntax.ids() {
            let c = &d.syntax[id];
            prop_assert_eq!(c.part1.is_some(), c.part2.is_some());
        }
    }
}
