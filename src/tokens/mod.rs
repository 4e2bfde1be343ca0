//! Token resolution: mapping computed values back to named design tokens.
//!
//! A [`TokenIndex`] is built fresh for every reconciliation run. It holds
//! searchable indices over the dictionary's colors (exact literal plus OKLab
//! nearest-neighbour) and its spacing, border-radius and font-size scales
//! (sorted by resolved pixel value), along with a pixel-resolution memo.

pub mod color;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::types::{ContextMetrics, DesignTokenDictionary, MissedToken, TokenCategory};
use crate::units::{self, ResolveOptions};

pub use color::{color_distance, delta_e_ok, parse_css_color, ParsedColor};

/// Acceptance thresholds for nearest-token search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenThresholds {
    /// Maximum OKLab ΔE (exclusive) for a color to resolve to a token.
    pub color_delta_e: f32,
    /// Maximum pixel distance (inclusive) for a length to resolve to a token.
    pub pixel_tolerance: f64,
}

impl Default for TokenThresholds {
    fn default() -> Self {
        Self {
            color_delta_e: 0.05,
            pixel_tolerance: 2.0,
        }
    }
}

/// How a CSS property is compared and which token scale it searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Color,
    Spacing,
    BorderRadius,
    FontSize,
    Other,
}

impl PropertyKind {
    /// Classify a property given in camelCase or kebab-case.
    pub fn classify(property: &str) -> Self {
        let key: String = property
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        if key.contains("color") || key == "fill" || key == "stroke" {
            PropertyKind::Color
        } else if key.contains("radius") {
            PropertyKind::BorderRadius
        } else if key == "fontsize" {
            PropertyKind::FontSize
        } else if key.starts_with("padding")
            || key.starts_with("margin")
            || key.starts_with("inset")
            || key.ends_with("gap")
            || matches!(key.as_str(), "top" | "right" | "bottom" | "left")
        {
            PropertyKind::Spacing
        } else {
            PropertyKind::Other
        }
    }

    pub fn category(self) -> Option<TokenCategory> {
        match self {
            PropertyKind::Color => Some(TokenCategory::Color),
            PropertyKind::Spacing => Some(TokenCategory::Spacing),
            PropertyKind::BorderRadius => Some(TokenCategory::BorderRadius),
            PropertyKind::FontSize => Some(TokenCategory::Typography),
            PropertyKind::Other => None,
        }
    }

    pub fn is_length(self) -> bool {
        matches!(
            self,
            PropertyKind::Spacing | PropertyKind::BorderRadius | PropertyKind::FontSize
        )
    }
}

/// A value normalized for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Pixels(f64),
    Text(String),
}

impl NormalizedValue {
    fn matches(&self, other: &NormalizedValue) -> bool {
        match (self, other) {
            (NormalizedValue::Pixels(a), NormalizedValue::Pixels(b)) => (a - b).abs() < 1e-6,
            (NormalizedValue::Text(a), NormalizedValue::Text(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_pixels(&self) -> Option<f64> {
        match self {
            NormalizedValue::Pixels(v) => Some(*v),
            NormalizedValue::Text(_) => None,
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Pixels(v) => write!(f, "{}", format_px(*v)),
            NormalizedValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Format a pixel value without trailing zeros (`16px`, `12.5px`).
pub fn format_px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}px", rounded as i64)
    } else {
        format!("{}px", rounded)
    }
}

/// Format a unitless number to at most three decimals (`0.5`, `1`).
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Outcome of comparing an expected and an actual value for one property.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenComparison {
    pub is_match: bool,
    pub token_name: Option<String>,
    pub missed_token: Option<MissedToken>,
    pub expected: NormalizedValue,
    pub actual: NormalizedValue,
}

#[derive(Debug, Clone)]
struct ColorEntry {
    name: String,
    color: ParsedColor,
}

#[derive(Debug, Clone)]
struct SizeEntry {
    name: String,
    pixels: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PixelKey {
    value: String,
    viewport_width: u64,
    root_font_size: u64,
    percentage_reference: Option<u64>,
}

/// Searchable indices over a design-token dictionary.
///
/// The memo uses interior mutability; an index belongs to a single
/// reconciliation run and is not shared across threads.
#[derive(Debug)]
pub struct TokenIndex<'a> {
    tokens: &'a DesignTokenDictionary,
    metrics: ContextMetrics,
    thresholds: TokenThresholds,
    color_literals: HashMap<String, String>,
    colors: Vec<ColorEntry>,
    spacing: Vec<SizeEntry>,
    radius: Vec<SizeEntry>,
    font_sizes: Vec<SizeEntry>,
    memo: RefCell<HashMap<PixelKey, f64>>,
}

impl<'a> TokenIndex<'a> {
    pub fn build(
        tokens: &'a DesignTokenDictionary,
        metrics: &ContextMetrics,
        thresholds: TokenThresholds,
    ) -> Self {
        let mut index = Self {
            tokens,
            metrics: *metrics,
            thresholds,
            color_literals: HashMap::new(),
            colors: Vec::new(),
            spacing: Vec::new(),
            radius: Vec::new(),
            font_sizes: Vec::new(),
            memo: RefCell::new(HashMap::new()),
        };
        index.populate();
        index
    }

    /// Clear every index and the memo, then repopulate from `tokens`.
    pub fn rebuild(&mut self, tokens: &'a DesignTokenDictionary, metrics: &ContextMetrics) {
        self.tokens = tokens;
        self.metrics = *metrics;
        self.color_literals.clear();
        self.colors.clear();
        self.spacing.clear();
        self.radius.clear();
        self.font_sizes.clear();
        self.memo.borrow_mut().clear();
        self.populate();
    }

    fn populate(&mut self) {
        let tokens = self.tokens;

        for (name, value) in &tokens.colors {
            let literal = value.trim().to_ascii_lowercase();
            self.color_literals
                .entry(literal)
                .or_insert_with(|| name.clone());
            match parse_css_color(value) {
                Some(color) => self.colors.push(ColorEntry {
                    name: name.clone(),
                    color,
                }),
                None => debug!(token = %name, value = %value, "color token is not a parsable color"),
            }
        }

        let spacing = self.sized_entries(tokens.spacing.iter().map(|(n, v)| (n, v.as_str())));
        let radius =
            self.sized_entries(tokens.border_radius.iter().map(|(n, v)| (n, v.as_str())));
        let font_sizes = self.sized_entries(
            tokens
                .typography
                .iter()
                .map(|(n, t)| (n, t.font_size.as_str())),
        );
        self.spacing = spacing;
        self.radius = radius;
        self.font_sizes = font_sizes;

        debug!(
            colors = self.colors.len(),
            spacing = self.spacing.len(),
            radius = self.radius.len(),
            font_sizes = self.font_sizes.len(),
            "token index built"
        );
    }

    fn sized_entries<'t>(
        &self,
        entries: impl Iterator<Item = (&'t String, &'t str)>,
    ) -> Vec<SizeEntry> {
        let mut out: Vec<SizeEntry> = entries
            .map(|(name, value)| SizeEntry {
                name: name.clone(),
                pixels: self.resolve_pixels(value, None),
            })
            .collect();
        // Stable: equal pixel values keep declaration order.
        out.sort_by(|a, b| a.pixels.total_cmp(&b.pixels));
        out
    }

    pub fn tokens(&self) -> &'a DesignTokenDictionary {
        self.tokens
    }

    pub fn metrics(&self) -> &ContextMetrics {
        &self.metrics
    }

    pub fn thresholds(&self) -> TokenThresholds {
        self.thresholds
    }

    /// Resolve a value to pixels through the unit evaluator, memoized per
    /// (value, viewport width, root font size, percentage reference).
    pub fn resolve_pixels(&self, value: &str, percentage_reference: Option<f64>) -> f64 {
        let key = PixelKey {
            value: value.to_string(),
            viewport_width: self.metrics.viewport_width.to_bits(),
            root_font_size: self.metrics.root_font_size.to_bits(),
            percentage_reference: percentage_reference.map(f64::to_bits),
        };
        let cached = self.memo.borrow().get(&key).copied();
        if let Some(pixels) = cached {
            return pixels;
        }

        let options = ResolveOptions {
            parent_font_size: None,
            percentage_reference,
            tokens: Some(self.tokens),
        };
        let pixels = units::to_pixels(value, &self.metrics, &options);
        self.memo.borrow_mut().insert(key, pixels);
        pixels
    }

    /// Find the token a computed value corresponds to, if any.
    pub fn find_token_by_value(
        &self,
        property: &str,
        value: &str,
        percentage_reference: Option<f64>,
    ) -> Option<String> {
        match PropertyKind::classify(property) {
            PropertyKind::Color => self.find_color(value),
            PropertyKind::Spacing => self.find_size(&self.spacing, value, percentage_reference),
            PropertyKind::BorderRadius => self.find_size(&self.radius, value, percentage_reference),
            PropertyKind::FontSize => {
                self.find_size(&self.font_sizes, value, percentage_reference)
            }
            PropertyKind::Other => None,
        }
    }

    fn find_size(
        &self,
        entries: &[SizeEntry],
        value: &str,
        percentage_reference: Option<f64>,
    ) -> Option<String> {
        let pixels = self.resolve_pixels(value, percentage_reference);
        nearest(entries, pixels, self.thresholds.pixel_tolerance)
    }

    fn find_color(&self, value: &str) -> Option<String> {
        let literal = value.trim().to_ascii_lowercase();
        if let Some(name) = self.color_literals.get(&literal) {
            return Some(name.clone());
        }

        let target = parse_css_color(&literal)?;
        let mut best: Option<(&ColorEntry, f32)> = None;
        for entry in &self.colors {
            let delta = delta_e_ok(&target, &entry.color);
            if best.map_or(true, |(_, d)| delta < d) {
                best = Some((entry, delta));
            }
        }

        let (entry, delta) = best?;
        if delta < self.thresholds.color_delta_e {
            trace!(value, token = %entry.name, delta, "color resolved by perceptual distance");
            Some(entry.name.clone())
        } else {
            None
        }
    }

    /// Normalize a value for equality comparison under `kind`.
    pub fn normalize(
        &self,
        kind: PropertyKind,
        value: &str,
        percentage_reference: Option<f64>,
    ) -> NormalizedValue {
        if kind.is_length() {
            NormalizedValue::Pixels(self.resolve_pixels(value, percentage_reference))
        } else {
            NormalizedValue::Text(value.trim().to_ascii_lowercase())
        }
    }

    /// Compare an expected value with an actual value for `property`.
    ///
    /// On a mismatch where the expected value resolves to a token, the result
    /// carries a [`MissedToken`] describing the token the rendering failed to use.
    pub fn compare_with_tokens(
        &self,
        property: &str,
        expected_value: &str,
        actual_value: &str,
        selector: &str,
        percentage_reference: Option<f64>,
    ) -> TokenComparison {
        let kind = PropertyKind::classify(property);
        let expected = self.normalize(kind, expected_value, percentage_reference);
        let actual = self.normalize(kind, actual_value, percentage_reference);
        let token_name = self.find_token_by_value(property, expected_value, percentage_reference);

        if expected.matches(&actual) {
            return TokenComparison {
                is_match: true,
                token_name,
                missed_token: None,
                expected,
                actual,
            };
        }

        let missed_token = match (&token_name, kind.category()) {
            (Some(name), Some(category)) => Some(MissedToken {
                token_name: name.clone(),
                category,
                expected_value: expected.to_string(),
                actual_value: actual.to_string(),
                property: property.to_string(),
                selector: selector.to_string(),
            }),
            _ => None,
        };

        TokenComparison {
            is_match: false,
            token_name,
            missed_token,
            expected,
            actual,
        }
    }
}

/// Nearest entry by pixel value within `tolerance`, via binary search over
/// the ascending index. Ties prefer the smaller value.
fn nearest(entries: &[SizeEntry], pixels: f64, tolerance: f64) -> Option<String> {
    if entries.is_empty() || !pixels.is_finite() {
        return None;
    }
    let idx = entries.partition_point(|e| e.pixels < pixels);
    let above = entries.get(idx);
    let below = idx.checked_sub(1).and_then(|i| entries.get(i));

    let best = match (below, above) {
        (Some(b), Some(a)) => {
            if (pixels - b.pixels).abs() <= (a.pixels - pixels).abs() {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    ((best.pixels - pixels).abs() <= tolerance).then(|| best.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypographyToken;

    fn dictionary() -> DesignTokenDictionary {
        let mut dict = DesignTokenDictionary::default();
        dict.colors.insert("brand-red".into(), "#ff0000".into());
        dict.colors.insert("danger".into(), "#FF0000".into());
        dict.colors.insert("ink".into(), "#111827".into());
        dict.spacing.insert("space-2".into(), "8px".into());
        dict.spacing.insert("space-4".into(), "1rem".into());
        dict.spacing.insert("space-md".into(), "16px".into());
        dict.spacing.insert("space-8".into(), "calc(2rem)".into());
        dict.border_radius.insert("radius-sm".into(), "4px".into());
        dict.border_radius.insert("radius-full".into(), "9999px".into());
        dict.typography.insert(
            "body".into(),
            TypographyToken {
                font_size: "16px".into(),
                font_weight: "400".into(),
                font_family: "Inter".into(),
                line_height: Some("24px".into()),
            },
        );
        dict.typography.insert(
            "body-lg".into(),
            TypographyToken {
                font_size: "1.125rem".into(),
                font_weight: "400".into(),
                font_family: "Inter".into(),
                line_height: None,
            },
        );
        dict
    }

    fn index(dict: &DesignTokenDictionary) -> TokenIndex<'_> {
        TokenIndex::build(dict, &ContextMetrics::default(), TokenThresholds::default())
    }

    #[test]
    fn classifies_properties() {
        assert_eq!(PropertyKind::classify("backgroundColor"), PropertyKind::Color);
        assert_eq!(PropertyKind::classify("border-top-color"), PropertyKind::Color);
        assert_eq!(PropertyKind::classify("paddingLeft"), PropertyKind::Spacing);
        assert_eq!(PropertyKind::classify("gap"), PropertyKind::Spacing);
        assert_eq!(PropertyKind::classify("rowGap"), PropertyKind::Spacing);
        assert_eq!(PropertyKind::classify("borderRadius"), PropertyKind::BorderRadius);
        assert_eq!(PropertyKind::classify("font-size"), PropertyKind::FontSize);
        assert_eq!(PropertyKind::classify("display"), PropertyKind::Other);
    }

    #[test]
    fn rgb_rendering_resolves_to_hex_token() {
        let dict = dictionary();
        let idx = index(&dict);
        assert_eq!(
            idx.find_token_by_value("backgroundColor", "rgb(255,0,0)", None),
            Some("brand-red".to_string())
        );
    }

    #[test]
    fn duplicate_literal_resolves_to_first_declared_name() {
        let dict = dictionary();
        let idx = index(&dict);
        assert_eq!(
            idx.find_token_by_value("color", "#FF0000", None),
            Some("brand-red".to_string())
        );
    }

    #[test]
    fn distant_color_has_no_token() {
        let dict = dictionary();
        let idx = index(&dict);
        assert_eq!(idx.find_token_by_value("color", "#00ff00", None), None);
        assert_eq!(idx.find_token_by_value("color", "bogus", None), None);
    }

    #[test]
    fn spacing_resolves_within_two_pixels() {
        let dict = dictionary();
        let idx = index(&dict);
        assert_eq!(
            idx.find_token_by_value("paddingTop", "16px", None),
            Some("space-4".to_string())
        );
        assert_eq!(
            idx.find_token_by_value("paddingTop", "10px", None),
            Some("space-2".to_string())
        );
        assert_eq!(
            idx.find_token_by_value("margin", "31px", None),
            Some("space-8".to_string())
        );
        assert_eq!(idx.find_token_by_value("gap", "12px", None), None);
        assert_eq!(idx.find_token_by_value("gap", "200px", None), None);
    }

    #[test]
    fn radius_and_font_size_use_their_own_scales() {
        let dict = dictionary();
        let idx = index(&dict);
        assert_eq!(
            idx.find_token_by_value("borderRadius", "5px", None),
            Some("radius-sm".to_string())
        );
        assert_eq!(
            idx.find_token_by_value("fontSize", "18px", None),
            Some("body-lg".to_string())
        );
        assert_eq!(idx.find_token_by_value("display", "flex", None), None);
    }

    #[test]
    fn compare_emits_missed_token_for_expected_token_value() {
        let dict = dictionary();
        let idx = index(&dict);
        let cmp = idx.compare_with_tokens("fontSize", "1.125rem", "16px", "div > p", None);
        assert!(!cmp.is_match);
        let missed = cmp.missed_token.expect("missed token");
        assert_eq!(missed.token_name, "body-lg");
        assert_eq!(missed.category, TokenCategory::Typography);
        assert_eq!(missed.expected_value, "18px");
        assert_eq!(missed.actual_value, "16px");
        assert_eq!(missed.selector, "div > p");
    }

    #[test]
    fn compare_matches_equivalent_lengths_and_attaches_token() {
        let dict = dictionary();
        let idx = index(&dict);
        let cmp = idx.compare_with_tokens("paddingTop", "1rem", "16px", "div", None);
        assert!(cmp.is_match);
        assert_eq!(cmp.token_name.as_deref(), Some("space-4"));
        assert!(cmp.missed_token.is_none());
    }

    #[test]
    fn compare_without_expected_token_emits_no_missed_token() {
        let dict = dictionary();
        let idx = index(&dict);
        let cmp = idx.compare_with_tokens("paddingTop", "40px", "16px", "div", None);
        assert!(!cmp.is_match);
        assert!(cmp.missed_token.is_none());

        let cmp = idx.compare_with_tokens("display", "flex", "block", "div", None);
        assert!(!cmp.is_match);
        assert!(cmp.missed_token.is_none());
    }

    #[test]
    fn compare_colors_uses_literal_equality() {
        let dict = dictionary();
        let idx = index(&dict);
        let cmp = idx.compare_with_tokens("color", "#FF0000", "#ff0000", "a", None);
        assert!(cmp.is_match);
        let cmp = idx.compare_with_tokens("color", "#ff0000", "rgb(0, 0, 255)", "a", None);
        assert!(!cmp.is_match);
        assert_eq!(
            cmp.missed_token.map(|m| m.token_name),
            Some("brand-red".to_string())
        );
    }

    #[test]
    fn rebuild_replaces_indices_and_memo() {
        let dict = dictionary();
        let empty = DesignTokenDictionary::default();
        let mut idx = index(&dict);
        assert_eq!(idx.resolve_pixels("10vw", None), 192.0);

        let mut metrics = ContextMetrics::default();
        metrics.viewport_width = 1000.0;
        idx.rebuild(&empty, &metrics);
        assert_eq!(idx.resolve_pixels("10vw", None), 100.0);
        assert_eq!(idx.find_token_by_value("paddingTop", "16px", None), None);
    }

    #[test]
    fn format_px_trims_trailing_zeros() {
        assert_eq!(format_px(16.0), "16px");
        assert_eq!(format_px(12.5), "12.5px");
        assert_eq!(format_px(1.0 / 3.0), "0.33px");
    }
}
