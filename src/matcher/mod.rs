//! Semantic matching between the rendered tree and the expected tree.
//!
//! [`similarity`] scores a single pair. A [`Matcher`] carries the options and
//! the per-run [`StyleCache`] used by child alignment and hierarchical
//! pairing.

mod align;
mod scoring;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::markup::{infer_styles, StyleFramework};
use crate::types::{DesignTokenDictionary, ExpectedNode, InferredStyles, RenderedNode};

pub use align::{ChildAlignment, PairedNodes, Pairing};
pub use scoring::Similarity;

/// Framework and tokens used to infer expected styles. Without a context the
/// layout signal is skipped.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub framework: StyleFramework,
    pub tokens: &'a DesignTokenDictionary,
}

/// Score floors and the recursion guard for alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingOptions {
    /// Pairs must score strictly above this to become candidates (unless
    /// their ids match).
    pub candidate_floor: u32,
    /// Minimum score for a candidate to be accepted.
    pub accept_floor: u32,
    /// Deepest level the hierarchical pairing descends to.
    pub max_depth: usize,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            candidate_floor: 10,
            accept_floor: 30,
            max_depth: 64,
        }
    }
}

/// Inferred styles memoized per expected node.
///
/// Keyed by node address: entries are valid only while the expected tree
/// they were computed from is alive and unmodified.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: RefCell<HashMap<usize, Rc<InferredStyles>>>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_infer(&self, node: &ExpectedNode, context: &MatchContext) -> Rc<InferredStyles> {
        let key = node as *const ExpectedNode as usize;
        if let Some(styles) = self.entries.borrow().get(&key) {
            return Rc::clone(styles);
        }
        let styles = Rc::new(infer_styles(node, context.framework, context.tokens));
        self.entries.borrow_mut().insert(key, Rc::clone(&styles));
        styles
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Similarity of one pair, inferring expected styles when a context is given.
pub fn similarity(
    rendered: &RenderedNode,
    expected: &ExpectedNode,
    context: Option<&MatchContext>,
) -> Similarity {
    let inferred = context.map(|ctx| infer_styles(expected, ctx.framework, ctx.tokens));
    scoring::score_pair(rendered, expected, inferred.as_ref())
}

/// Align two sibling lists with default options.
pub fn greedy_child_alignment(
    rendered: &[RenderedNode],
    expected: &[ExpectedNode],
    context: Option<&MatchContext>,
) -> Vec<ChildAlignment> {
    Matcher::new(context.copied(), MatchingOptions::default())
        .greedy_child_alignment(rendered, expected)
}

/// Pair two trees with default options.
pub fn pair_hierarchically<'t>(
    rendered: &'t RenderedNode,
    expected: &'t ExpectedNode,
    context: Option<&MatchContext>,
) -> Pairing<'t> {
    Matcher::new(context.copied(), MatchingOptions::default()).pair_hierarchically(rendered, expected)
}

/// Matching state for one reconciliation run.
#[derive(Debug)]
pub struct Matcher<'a> {
    context: Option<MatchContext<'a>>,
    options: MatchingOptions,
    cache: StyleCache,
}

impl<'a> Matcher<'a> {
    pub fn new(context: Option<MatchContext<'a>>, options: MatchingOptions) -> Self {
        Self {
            context,
            options,
            cache: StyleCache::new(),
        }
    }

    pub fn options(&self) -> &MatchingOptions {
        &self.options
    }

    /// Inferred styles of `expected`, computed once per node.
    pub fn inferred_styles(&self, expected: &ExpectedNode) -> Option<Rc<InferredStyles>> {
        self.context
            .as_ref()
            .map(|ctx| self.cache.get_or_infer(expected, ctx))
    }

    pub fn similarity(&self, rendered: &RenderedNode, expected: &ExpectedNode) -> Similarity {
        let inferred = self.inferred_styles(expected);
        scoring::score_pair(rendered, expected, inferred.as_deref())
    }
}
