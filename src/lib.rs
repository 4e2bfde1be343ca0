//! Caliper Library
//!
//! Reconciles a live, rendered element tree against the markup a design tool
//! produced for the same screen, and reports where the two disagree in terms
//! of design tokens.
//!
//! # Module Overview
//!
//! - [`markup`] - Tolerant markup parser and class/inline style inference
//! - [`matcher`] - Similarity scoring and greedy hierarchical alignment
//! - [`tokens`] - Token index with OKLab perceptual color matching
//! - [`units`] - CSS length, `calc()`, `clamp()`, `min()`/`max()` and `var()` evaluation
//! - [`protocol`] - Binary wire format for rendered trees plus the JSON envelope
//! - [`reconcile`] - End-to-end reconciliation producing a report
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types and structures
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use caliper_lib::{reconcile_markup, ContextMetrics, DesignTokenDictionary, ReconcileOptions};
//!
//! # fn example() -> caliper_lib::Result<()> {
//! let bytes = std::fs::read("tree.bin")?;
//! let rendered = caliper_lib::protocol::deserialize(&bytes)?;
//! let tokens = DesignTokenDictionary::from_path("tokens.json".as_ref())?;
//! let report = reconcile_markup(
//!     &rendered,
//!     r#"<div class="p-4 bg-primary">Hello</div>"#,
//!     &tokens,
//!     &ContextMetrics::default(),
//!     &ReconcileOptions::default(),
//! );
//! println!("{} deltas", report.summary.deltas);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod markup;
pub mod matcher;
pub mod output;
pub mod protocol;
pub mod reconcile;
pub mod tokens;
pub mod types;
pub mod units;

pub use config::Config;
pub use error::{CaliperError, ErrorCategory, ErrorPayload, Result};
pub use markup::{infer_styles, parse_markup, StyleFramework};
pub use matcher::{
    greedy_child_alignment, pair_hierarchically, similarity, ChildAlignment, MatchContext,
    Matcher, MatchingOptions, Pairing, Similarity,
};
pub use output::{
    CaliperOutput, DecodeOutput, EncodeOutput, ErrorOutput, InputDescriptor, ReconcileOutput,
    ResolveOutput, CALIPER_OUTPUT_VERSION,
};
pub use protocol::{decode_envelope, encode_envelope, Envelope, ProtocolError};
pub use reconcile::{reconcile, reconcile_markup, ReconcileOptions};
pub use tokens::{TokenComparison, TokenIndex, TokenThresholds};
pub use types::{
    ContextMetrics, DesignTokenDictionary, ExpectedNode, InferredStyles, MissedToken,
    PropertyDelta, ReconciliationReport, RenderedNode, RenderedStyles,
};
pub use units::{resolve_calc, to_pixels, ResolveOptions};
