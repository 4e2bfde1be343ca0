//! Greedy child alignment and recursive pairing of the two trees.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::scoring::Similarity;
use super::Matcher;
use crate::types::{ExpectedNode, MatchSignal, NodePair, RenderedNode, SignalSet};

/// One accepted child pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildAlignment {
    pub rendered_idx: usize,
    pub expected_idx: usize,
    pub score: u32,
    pub signals: SignalSet,
}

/// The nodes behind one [`NodePair`].
#[derive(Debug, Clone, Copy)]
pub struct PairedNodes<'t> {
    pub rendered: &'t RenderedNode,
    pub expected: &'t ExpectedNode,
    /// Rendered parent of `rendered`, `None` at the root.
    pub rendered_parent: Option<&'t RenderedNode>,
}

/// Result of pairing a rendered tree against an expected tree.
#[derive(Debug, Clone)]
pub struct Pairing<'t> {
    pub pairs: Vec<NodePair>,
    /// Parallel to `pairs`.
    pub nodes: Vec<PairedNodes<'t>>,
    /// Agent ids of rendered nodes left unpaired, in pre-order.
    pub unmatched_rendered: Vec<String>,
    /// Pre-order indices of expected nodes left unpaired.
    pub unmatched_expected: Vec<usize>,
}

impl Matcher<'_> {
    /// Pair rendered children with expected children.
    ///
    /// Every combination scoring above the candidate floor (or matching by id)
    /// becomes a candidate. Candidates are taken best-first; one is accepted
    /// when it reaches the accept floor and neither side is already claimed.
    pub fn greedy_child_alignment(
        &self,
        rendered: &[RenderedNode],
        expected: &[ExpectedNode],
    ) -> Vec<ChildAlignment> {
        let mut candidates: Vec<(usize, usize, Similarity)> = Vec::new();
        for (i, r) in rendered.iter().enumerate() {
            for (j, e) in expected.iter().enumerate() {
                let sim = self.similarity(r, e);
                if sim.score > self.options.candidate_floor || sim.has(MatchSignal::IdMatch) {
                    candidates.push((i, j, sim));
                }
            }
        }
        // Stable: equal scores keep (rendered, expected) generation order.
        candidates.sort_by(|a, b| b.2.score.cmp(&a.2.score));

        let mut claimed_rendered = vec![false; rendered.len()];
        let mut claimed_expected = vec![false; expected.len()];
        let mut accepted = Vec::new();
        for (i, j, sim) in candidates {
            if sim.score < self.options.accept_floor || claimed_rendered[i] || claimed_expected[j]
            {
                continue;
            }
            claimed_rendered[i] = true;
            claimed_expected[j] = true;
            accepted.push(ChildAlignment {
                rendered_idx: i,
                expected_idx: j,
                score: sim.score,
                signals: sim.signals,
            });
        }
        accepted
    }

    /// Pair two trees top-down.
    ///
    /// The roots are always paired. Below them only aligned children are
    /// recursed into; everything else ends up in the unmatched lists.
    pub fn pair_hierarchically<'t>(
        &self,
        rendered: &'t RenderedNode,
        expected: &'t ExpectedNode,
    ) -> Pairing<'t> {
        let expected_nodes = expected.walk();
        let expected_index: HashMap<*const ExpectedNode, usize> = expected_nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (*node as *const ExpectedNode, i))
            .collect();

        let mut state = PairingState {
            expected_index,
            pairs: Vec::new(),
            nodes: Vec::new(),
        };
        self.pair_node(&mut state, rendered, None, expected, 0);

        let matched_rendered: HashSet<&str> =
            state.pairs.iter().map(|p| p.rendered_id.as_str()).collect();
        let matched_expected: HashSet<usize> =
            state.pairs.iter().map(|p| p.expected_index).collect();

        let unmatched_rendered: Vec<String> = rendered
            .walk()
            .into_iter()
            .filter(|node| !matched_rendered.contains(node.agent_id.as_str()))
            .map(|node| node.agent_id.clone())
            .collect();
        let unmatched_expected: Vec<usize> = (0..expected_nodes.len())
            .filter(|i| !matched_expected.contains(i))
            .collect();

        debug!(
            pairs = state.pairs.len(),
            unmatched_rendered = unmatched_rendered.len(),
            unmatched_expected = unmatched_expected.len(),
            "hierarchical pairing complete"
        );

        Pairing {
            pairs: state.pairs,
            nodes: state.nodes,
            unmatched_rendered,
            unmatched_expected,
        }
    }

    fn pair_node<'t>(
        &self,
        state: &mut PairingState<'t>,
        rendered: &'t RenderedNode,
        rendered_parent: Option<&'t RenderedNode>,
        expected: &'t ExpectedNode,
        depth: usize,
    ) {
        let Some(&expected_index) = state.expected_index.get(&(expected as *const ExpectedNode))
        else {
            return;
        };
        let sim = self.similarity(rendered, expected);
        state.pairs.push(NodePair {
            rendered_id: rendered.agent_id.clone(),
            expected_index,
            confidence: sim.score,
            depth,
            match_signals: sim.signals,
        });
        state.nodes.push(PairedNodes {
            rendered,
            expected,
            rendered_parent,
        });

        if depth >= self.options.max_depth {
            warn!(
                depth,
                rendered_id = %rendered.agent_id,
                "pairing depth limit reached; descendants left unmatched"
            );
            return;
        }

        for aligned in self.greedy_child_alignment(&rendered.children, &expected.children) {
            self.pair_node(
                state,
                &rendered.children[aligned.rendered_idx],
                Some(rendered),
                &expected.children[aligned.expected_idx],
                depth + 1,
            );
        }
    }
}

struct PairingState<'t> {
    expected_index: HashMap<*const ExpectedNode, usize>,
    pairs: Vec<NodePair>,
    nodes: Vec<PairedNodes<'t>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_markup;
    use crate::matcher::MatchingOptions;

    fn node(id: &str, tag: &str, text: Option<&str>) -> RenderedNode {
        let mut n = RenderedNode::new(id, tag);
        n.text_content = text.map(str::to_string);
        n
    }

    #[test]
    fn alignment_prefers_best_pairs_and_is_exclusive() {
        let rendered = vec![
            node("r0", "span", Some("Price")),
            node("r1", "button", Some("Buy now")),
            node("r2", "span", Some("Price")),
        ];
        let expected = parse_markup("<div><button>Buy now</button><span>Price</span></div>");
        let matcher = Matcher::new(None, MatchingOptions::default());

        let aligned = matcher.greedy_child_alignment(&rendered, &expected.children);
        // All three candidates score 100; ties keep generation order, so r0
        // claims the span before r2 can.
        assert_eq!(aligned.len(), 2);
        assert_eq!((aligned[0].rendered_idx, aligned[0].expected_idx), (0, 1));
        assert_eq!((aligned[1].rendered_idx, aligned[1].expected_idx), (1, 0));

        let mut seen_r = HashSet::new();
        let mut seen_e = HashSet::new();
        for a in &aligned {
            assert!(seen_r.insert(a.rendered_idx));
            assert!(seen_e.insert(a.expected_idx));
        }
    }

    #[test]
    fn weak_candidates_are_rejected() {
        let rendered = vec![node("r0", "img", None)];
        let expected = vec![ExpectedNode::new("p")];
        let matcher = Matcher::new(None, MatchingOptions::default());
        assert!(matcher
            .greedy_child_alignment(&rendered, &expected)
            .is_empty());
    }

    #[test]
    fn unaligned_nodes_are_reported_by_set_difference() {
        let rendered = RenderedNode::new("root", "div");
        let expected = parse_markup("<div><span>Missing!</span></div>");
        let matcher = Matcher::new(None, MatchingOptions::default());

        let pairing = matcher.pair_hierarchically(&rendered, &expected);
        assert_eq!(pairing.pairs.len(), 1);
        assert_eq!(pairing.pairs[0].expected_index, 0);
        assert_eq!(pairing.unmatched_expected, vec![1]);
        assert!(pairing.unmatched_rendered.is_empty());
    }

    #[test]
    fn expected_indices_are_pre_order() {
        let rendered = RenderedNode::new("root", "div")
            .with_child(node("a", "h1", Some("Title")))
            .with_child(node("b", "p", Some("Body")));
        let expected = parse_markup("<div><p>Body</p><h1>Title</h1></div>");
        let matcher = Matcher::new(None, MatchingOptions::default());

        let pairing = matcher.pair_hierarchically(&rendered, &expected);
        let mut by_id: Vec<(String, usize)> = pairing
            .pairs
            .iter()
            .map(|p| (p.rendered_id.clone(), p.expected_index))
            .collect();
        by_id.sort();
        assert_eq!(
            by_id,
            vec![("a".into(), 2), ("b".into(), 1), ("root".into(), 0)]
        );
        assert_eq!(pairing.nodes[1].rendered_parent.map(|p| p.agent_id.as_str()), Some("root"));
    }

    #[test]
    fn depth_limit_stops_recursion() {
        let rendered = RenderedNode::new("root", "div")
            .with_child(RenderedNode::new("c", "div").with_child(RenderedNode::new("g", "div")));
        let expected = parse_markup("<div><div><div></div></div></div>");
        let options = MatchingOptions {
            max_depth: 1,
            ..MatchingOptions::default()
        };
        let pairing = Matcher::new(None, options).pair_hierarchically(&rendered, &expected);
        assert_eq!(pairing.pairs.len(), 2);
        assert_eq!(pairing.unmatched_rendered, vec!["g".to_string()]);
        assert_eq!(pairing.unmatched_expected, vec![2]);
    }

    #[test]
    fn pair_depth_counts_from_the_paired_root() {
        let mut section = RenderedNode::new("s", "section");
        section.depth = 3;
        let rendered = section.with_child(node("h", "h2", Some("Plans")));
        let expected = parse_markup("<section><h2>Plans</h2></section>");

        let pairing = Matcher::new(None, MatchingOptions::default())
            .pair_hierarchically(&rendered, &expected);
        let depths: Vec<(usize, u16)> = pairing
            .pairs
            .iter()
            .zip(&pairing.nodes)
            .map(|(pair, nodes)| (pair.depth, nodes.rendered.depth))
            .collect();
        assert_eq!(depths, vec![(0, 3), (1, 4)]);
    }
}
