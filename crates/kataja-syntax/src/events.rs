#![forbid(unsafe_code)]

//! Typed record of what the driver did.

use serde::{Deserialize, Serialize};

use crate::constituent::{ConstituentId, SyntaxArena};
use crate::feature::FeatureId;

/// How a label was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    /// A `Head` feature projected.
    Head,
    /// The right operand was an adjunct.
    Adjunct,
    /// Ordering rules picked a projector.
    Projection,
    /// Root with a complete phi-set strengthened the label.
    Strengthened,
    /// The non-moved side projected.
    Move,
    /// Shared phi or person features.
    SharedFeats,
    /// A remerged Q/Top goal shares features with the phase.
    RemergeBack,
}

/// Why a derivation crashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crash {
    /// The numeration ran out while the top node was unlabeled.
    Unlabeled { node: ConstituentId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationEvent {
    Selected {
        x: ConstituentId,
        y: ConstituentId,
    },
    Merged {
        node: ConstituentId,
        part1: ConstituentId,
        part2: ConstituentId,
    },
    Labeled {
        node: ConstituentId,
        label: String,
        kind: LabelKind,
    },
    NoLabel {
        node: ConstituentId,
    },
    PassedFeatures {
        from: ConstituentId,
        to: ConstituentId,
        features: Vec<FeatureId>,
    },
    Unified {
        unvalued: FeatureId,
        valued: FeatureId,
    },
    CheckedFeatures {
        features: Vec<FeatureId>,
    },
    Remerged {
        target: ConstituentId,
        result: ConstituentId,
    },
    RemergeBlocked {
        target: ConstituentId,
    },
    Dephased {
        node: ConstituentId,
        label: String,
    },
    Transferred {
        target: Option<ConstituentId>,
    },
    SubStream,
    MainStream,
    Crashed(Crash),
}

impl DerivationEvent {
    /// Short tag, e.g. `Merge`, `Label(SharedFeats)`, `Crash(Unlabeled)`.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Selected { .. } => "Select".into(),
            Self::Merged { .. } => "Merge".into(),
            Self::Labeled { kind, .. } => format!("Label({kind:?})"),
            Self::NoLabel { .. } => "Label(None)".into(),
            Self::PassedFeatures { .. } => "PassFs".into(),
            Self::Unified { .. } => "Unification".into(),
            Self::CheckedFeatures { .. } => "CheckedFeatures".into(),
            Self::Remerged { .. } => "Remerge".into(),
            Self::RemergeBlocked { .. } => "RemergeBlocked".into(),
            Self::Dephased { .. } => "Dephase".into(),
            Self::Transferred { .. } => "Transfer".into(),
            Self::SubStream => "SubStream".into(),
            Self::MainStream => "MainStream".into(),
            Self::Crashed(Crash::Unlabeled { .. }) => "Crash(Unlabeled)".into(),
        }
    }

    /// Human readable line for step messages.
    #[must_use]
    pub fn describe(&self, arena: &SyntaxArena) -> String {
        let label = |id: ConstituentId| {
            arena
                .get(id)
                .map_or_else(|| id.to_string(), |c| c.label.clone())
        };
        let feats = |ids: &[FeatureId]| {
            ids.iter()
                .map(|f| arena.feature(*f).map_or_else(|| f.to_string(), ToString::to_string))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let tag = self.tag();
        match self {
            Self::Selected { x, y } => format!("{tag}: '{}', '{}'", label(*x), label(*y)),
            Self::Merged { node, part1, part2 } => format!(
                "{tag}: '{}' + '{}' = '{}'",
                label(*part1),
                label(*part2),
                label(*node)
            ),
            Self::Labeled { label: l, .. } => format!("{tag}: {l}"),
            Self::NoLabel { node } => format!("{tag}: {}", arena.get(*node).map_or(String::new(), |_| arena.bracketed(*node))),
            Self::PassedFeatures { from, to, features } => format!(
                "{tag}: {} to {} [{}]",
                label(*from),
                label(*to),
                feats(features)
            ),
            Self::Unified { unvalued, valued } => format!(
                "{tag}: {} with {}",
                feats(&[*unvalued]),
                feats(&[*valued])
            ),
            Self::CheckedFeatures { features } => format!("{tag}: [{}]", feats(features)),
            Self::Remerged { target, result } => {
                format!("{tag}: '{}' into '{}'", label(*target), label(*result))
            }
            Self::RemergeBlocked { target } => format!("{tag}: '{}'", label(*target)),
            Self::Dephased { label: l, .. } => format!("{tag}: {l}"),
            Self::Transferred { target } => match target {
                Some(t) => format!("{tag}: {}", label(*t)),
                None => format!("{tag}: nothing"),
            },
            Self::SubStream | Self::MainStream => tag,
            Self::Crashed(Crash::Unlabeled { node }) => format!("{tag}: {}", label(*node)),
        }
    }
}
