//! Reconciliation report types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::tokens::TokenCategory;

/// Confidence at or above which a pair counts as high confidence.
pub const HIGH_CONFIDENCE: u32 = 70;

/// A similarity signal that contributed to a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    TagExact,
    TagEquivalent,
    TagMismatch,
    IdMatch,
    TextExact,
    TextPartial,
    ClassOverlap,
    ChildCountEqual,
    ChildCountMismatch,
    LayoutDisplay,
    LayoutFlex,
}

impl fmt::Display for MatchSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagExact => write!(f, "tag"),
            Self::TagEquivalent => write!(f, "tag~"),
            Self::TagMismatch => write!(f, "tag!"),
            Self::IdMatch => write!(f, "id"),
            Self::TextExact => write!(f, "text"),
            Self::TextPartial => write!(f, "text~"),
            Self::ClassOverlap => write!(f, "classes"),
            Self::ChildCountEqual => write!(f, "children"),
            Self::ChildCountMismatch => write!(f, "children!"),
            Self::LayoutDisplay => write!(f, "display"),
            Self::LayoutFlex => write!(f, "flex"),
        }
    }
}

pub type SignalSet = BTreeSet<MatchSignal>;

/// One rendered node paired with one expected node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePair {
    pub rendered_id: String,
    pub expected_index: usize,
    /// Match confidence, 0-100.
    pub confidence: u32,
    /// Levels below the paired roots, the same count `maxDepth` bounds. A
    /// rendered subtree keeps its own absolute `depth` on the node.
    pub depth: usize,
    pub match_signals: SignalSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaSeverity {
    Minor,
    Moderate,
    Major,
}

/// A property-level difference between the design intent and the rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDelta {
    pub rendered_id: String,
    pub expected_index: usize,
    pub property: String,
    pub figma_value: String,
    pub caliper_value: String,
    pub severity: DeltaSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
}

/// The design intended a specific token but the rendering used another value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedToken {
    pub token_name: String,
    pub category: TokenCategory,
    pub expected_value: String,
    pub actual_value: String,
    pub property: String,
    pub selector: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_pairs: usize,
    pub high_confidence_pairs: usize,
    pub unmatched_expected: usize,
    pub unmatched_rendered: usize,
    pub deltas: usize,
    pub missed_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub pairs: Vec<NodePair>,
    pub unmatched_rendered: Vec<String>,
    pub unmatched_expected: Vec<usize>,
    pub deltas: Vec<PropertyDelta>,
    pub missed_tokens: Vec<MissedToken>,
    pub summary: ReportSummary,
}

impl ReconciliationReport {
    /// Assemble a report, deriving the summary from its parts.
    pub fn new(
        pairs: Vec<NodePair>,
        unmatched_rendered: Vec<String>,
        unmatched_expected: Vec<usize>,
        deltas: Vec<PropertyDelta>,
        missed_tokens: Vec<MissedToken>,
    ) -> Self {
        let summary = ReportSummary {
            total_pairs: pairs.len(),
            high_confidence_pairs: pairs
                .iter()
                .filter(|p| p.confidence >= HIGH_CONFIDENCE)
                .count(),
            unmatched_expected: unmatched_expected.len(),
            unmatched_rendered: unmatched_rendered.len(),
            deltas: deltas.len(),
            missed_tokens: missed_tokens.len(),
        };
        Self {
            pairs,
            unmatched_rendered,
            unmatched_expected,
            deltas,
            missed_tokens,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(confidence: u32) -> NodePair {
        NodePair {
            rendered_id: format!("r{confidence}"),
            expected_index: 0,
            confidence,
            depth: 0,
            match_signals: SignalSet::new(),
        }
    }

    #[test]
    fn summary_counts_high_confidence_pairs() {
        let report = ReconciliationReport::new(
            vec![pair(100), pair(70), pair(69)],
            vec!["x".into()],
            vec![3, 4],
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(report.summary.total_pairs, 3);
        assert_eq!(report.summary.high_confidence_pairs, 2);
        assert_eq!(report.summary.unmatched_expected, 2);
        assert_eq!(report.summary.unmatched_rendered, 1);
    }

    #[test]
    fn signals_serialize_snake_case() {
        let mut signals = SignalSet::new();
        signals.insert(MatchSignal::IdMatch);
        signals.insert(MatchSignal::TagExact);
        let json = serde_json::to_string(&signals).expect("serialize signals");
        assert_eq!(json, r#"["tag_exact","id_match"]"#);
    }
}
