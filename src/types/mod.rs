//! Core types used throughout the Caliper library.
//!
//! - [`RenderedNode`] - geometry and style snapshot of a live element
//! - [`ExpectedNode`] - node parsed from design-intent markup
//! - [`DesignTokenDictionary`] - named design values
//! - [`ContextMetrics`] - environment used to resolve relative units
//! - [`ReconciliationReport`] - result of a reconciliation run

pub mod context;
pub mod expected;
pub mod rendered;
pub mod report;
pub mod tokens;

pub use context::{ColorScheme, ContextMetrics, Orientation, UserPreferences};
pub use expected::{ExpectedNode, InferredStyles};
pub use rendered::{BoxRect, EdgeSizes, RenderedNode, RenderedStyles, ViewportOffset};
pub use report::{
    DeltaSeverity, MatchSignal, MissedToken, NodePair, PropertyDelta, ReconciliationReport,
    ReportSummary, SignalSet, HIGH_CONFIDENCE,
};
pub use tokens::{DesignTokenDictionary, TokenCategory, TypographyToken};
