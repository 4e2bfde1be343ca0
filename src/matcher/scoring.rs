//! Similarity scoring between one rendered node and one expected node.
//!
//! Every signal kind is a pure function of the two nodes (plus inferred
//! styles for the layout signal) returning a point contribution and an
//! optional tag. The score is their sum clamped into `0..=100`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ExpectedNode, InferredStyles, MatchSignal, RenderedNode, SignalSet};

/// Score and contributing signals for a rendered/expected pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Similarity {
    pub score: u32,
    pub signals: SignalSet,
}

impl Similarity {
    pub fn has(&self, signal: MatchSignal) -> bool {
        self.signals.contains(&signal)
    }
}

/// Tags that can stand in for each other.
const EQUIVALENT_TAGS: [&[&str]; 3] = [
    &[
        "div", "section", "article", "main", "aside", "header", "footer", "nav",
    ],
    &["span", "strong", "em", "b", "i", "small", "mark"],
    &["a", "button"],
];

const TAG_EXACT_POINTS: i32 = 100;
const TAG_EQUIVALENT_POINTS: i32 = 50;
const TAG_MISMATCH_POINTS: i32 = -50;
const ID_POINTS: i32 = 100;
const TEXT_EXACT_POINTS: i32 = 80;
const TEXT_PARTIAL_POINTS: i32 = 40;
const CLASS_OVERLAP_POINTS: f64 = 60.0;
const CHILD_COUNT_EQUAL_POINTS: i32 = 20;
const CHILD_COUNT_MISMATCH_POINTS: i32 = -30;
const CHILD_COUNT_TOLERANCE: usize = 2;
const LAYOUT_DISPLAY_POINTS: i32 = 20;
const LAYOUT_FLEX_POINTS: i32 = 30;

#[derive(Debug, Clone, Copy)]
enum SignalKind {
    Tag,
    Id,
    Text,
    Classes,
    ChildCount,
    Layout,
}

const SIGNAL_KINDS: [SignalKind; 6] = [
    SignalKind::Tag,
    SignalKind::Id,
    SignalKind::Text,
    SignalKind::Classes,
    SignalKind::ChildCount,
    SignalKind::Layout,
];

#[derive(Debug, Clone, Copy, Default)]
struct Contribution {
    points: i32,
    signal: Option<MatchSignal>,
}

impl Contribution {
    fn new(points: i32, signal: MatchSignal) -> Self {
        Self {
            points,
            signal: Some(signal),
        }
    }

    fn none() -> Self {
        Self::default()
    }
}

impl SignalKind {
    fn evaluate(
        self,
        rendered: &RenderedNode,
        expected: &ExpectedNode,
        inferred: Option<&InferredStyles>,
    ) -> Contribution {
        match self {
            SignalKind::Tag => tag_signal(&rendered.tag, &expected.tag),
            SignalKind::Id => id_signal(rendered.html_id.as_deref(), expected.id.as_deref()),
            SignalKind::Text => text_signal(
                rendered.text_content.as_deref(),
                expected.text_content.as_deref(),
            ),
            SignalKind::Classes => class_signal(&rendered.classes, &expected.classes),
            SignalKind::ChildCount => {
                child_count_signal(rendered.children.len(), expected.children.len())
            }
            SignalKind::Layout => match inferred {
                Some(styles) => layout_signal(rendered, styles),
                None => Contribution::none(),
            },
        }
    }
}

/// Score a pair. Layout only contributes when inferred styles are supplied.
pub(crate) fn score_pair(
    rendered: &RenderedNode,
    expected: &ExpectedNode,
    inferred: Option<&InferredStyles>,
) -> Similarity {
    let (total, signals) = SIGNAL_KINDS
        .iter()
        .map(|kind| kind.evaluate(rendered, expected, inferred))
        .fold((0i32, SignalSet::new()), |(total, mut signals), c| {
            if let Some(signal) = c.signal {
                signals.insert(signal);
            }
            (total + c.points, signals)
        });

    Similarity {
        score: total.clamp(0, 100) as u32,
        signals,
    }
}

fn tag_signal(rendered: &str, expected: &str) -> Contribution {
    let rendered = rendered.to_ascii_lowercase();
    let expected = expected.to_ascii_lowercase();
    if rendered == expected {
        return Contribution::new(TAG_EXACT_POINTS, MatchSignal::TagExact);
    }
    let equivalent = EQUIVALENT_TAGS
        .iter()
        .any(|group| group.contains(&rendered.as_str()) && group.contains(&expected.as_str()));
    if equivalent {
        Contribution::new(TAG_EQUIVALENT_POINTS, MatchSignal::TagEquivalent)
    } else {
        Contribution::new(TAG_MISMATCH_POINTS, MatchSignal::TagMismatch)
    }
}

fn id_signal(rendered: Option<&str>, expected: Option<&str>) -> Contribution {
    match (rendered, expected) {
        (Some(a), Some(b)) if !a.is_empty() && a == b => {
            Contribution::new(ID_POINTS, MatchSignal::IdMatch)
        }
        _ => Contribution::none(),
    }
}

fn text_signal(rendered: Option<&str>, expected: Option<&str>) -> Contribution {
    let normalize = |s: Option<&str>| s.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    let rendered = normalize(rendered);
    let expected = normalize(expected);
    if rendered.is_empty() || expected.is_empty() {
        return Contribution::none();
    }
    if rendered == expected {
        Contribution::new(TEXT_EXACT_POINTS, MatchSignal::TextExact)
    } else if rendered.contains(&expected) || expected.contains(&rendered) {
        Contribution::new(TEXT_PARTIAL_POINTS, MatchSignal::TextPartial)
    } else {
        Contribution::none()
    }
}

fn class_signal(rendered: &[String], expected: &[String]) -> Contribution {
    let rendered: HashSet<&str> = rendered.iter().map(String::as_str).collect();
    let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
    if rendered.is_empty() || expected.is_empty() {
        return Contribution::none();
    }
    let matches = rendered.intersection(&expected).count();
    let largest = rendered.len().max(expected.len());
    let points = (matches as f64 / largest as f64 * CLASS_OVERLAP_POINTS).round() as i32;
    if points > 0 {
        Contribution::new(points, MatchSignal::ClassOverlap)
    } else {
        Contribution::none()
    }
}

fn child_count_signal(rendered: usize, expected: usize) -> Contribution {
    if rendered == expected {
        Contribution::new(CHILD_COUNT_EQUAL_POINTS, MatchSignal::ChildCountEqual)
    } else if rendered.abs_diff(expected) > CHILD_COUNT_TOLERANCE {
        Contribution::new(CHILD_COUNT_MISMATCH_POINTS, MatchSignal::ChildCountMismatch)
    } else {
        Contribution::none()
    }
}

fn layout_signal(rendered: &RenderedNode, inferred: &InferredStyles) -> Contribution {
    let Some(expected_display) = inferred.get("display") else {
        return Contribution::none();
    };
    let same = |a: &str, b: &str| a.trim().eq_ignore_ascii_case(b.trim());
    let display_matches = rendered
        .styles
        .display
        .as_deref()
        .is_some_and(|d| same(d, expected_display));
    if !display_matches {
        return Contribution::none();
    }

    // An unset computed flex-direction is the CSS initial value.
    let rendered_direction = rendered.styles.flex_direction.as_deref().unwrap_or("row");
    match inferred.get("flexDirection") {
        Some(direction) if same(direction, rendered_direction) => {
            Contribution::new(LAYOUT_FLEX_POINTS, MatchSignal::LayoutFlex)
        }
        _ => Contribution::new(LAYOUT_DISPLAY_POINTS, MatchSignal::LayoutDisplay),
    }
}
