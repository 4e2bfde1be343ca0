//! Reconciliation of a rendered tree against design-intent markup.
//!
//! One call builds a fresh [`TokenIndex`] and [`Matcher`], pairs the two
//! trees, then compares every style the expected side declares with the
//! computed value on its paired rendered node.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::markup::{parse_markup, StyleFramework};
use crate::matcher::{MatchContext, Matcher, MatchingOptions, PairedNodes};
use crate::tokens::{
    color_distance, format_number, format_px, NormalizedValue, PropertyKind, TokenIndex,
    TokenThresholds,
};
use crate::types::{
    ContextMetrics, DeltaSeverity, DesignTokenDictionary, ExpectedNode, MissedToken,
    PropertyDelta, ReconciliationReport, RenderedNode,
};
use crate::units::parse_length;

/// Tunables for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileOptions {
    pub framework: StyleFramework,
    pub thresholds: TokenThresholds,
    pub matching: MatchingOptions,
}

/// Reconcile a rendered tree against an already parsed expected tree.
#[instrument(
    skip_all,
    fields(rendered_root = %rendered.agent_id, expected_root = %expected.tag)
)]
pub fn reconcile(
    rendered: &RenderedNode,
    expected: &ExpectedNode,
    tokens: &DesignTokenDictionary,
    metrics: &ContextMetrics,
    options: &ReconcileOptions,
) -> ReconciliationReport {
    let index = TokenIndex::build(tokens, metrics, options.thresholds);
    let context = MatchContext {
        framework: options.framework,
        tokens,
    };
    let matcher = Matcher::new(Some(context), options.matching);
    let pairing = matcher.pair_hierarchically(rendered, expected);

    let mut deltas = Vec::new();
    let mut missed_tokens = Vec::new();
    for (pair, nodes) in pairing.pairs.iter().zip(&pairing.nodes) {
        let Some(inferred) = matcher.inferred_styles(nodes.expected) else {
            continue;
        };
        for (property, expected_value) in inferred.iter() {
            let Some(finding) = compare_property(&index, nodes, property, expected_value) else {
                continue;
            };
            let Finding { delta, missed } = finding;
            deltas.push(PropertyDelta {
                rendered_id: pair.rendered_id.clone(),
                expected_index: pair.expected_index,
                property: property.clone(),
                figma_value: delta.expected,
                caliper_value: delta.actual,
                severity: delta.severity,
                token_name: delta.token_name,
            });
            missed_tokens.extend(missed);
        }
    }

    let report = ReconciliationReport::new(
        pairing.pairs,
        pairing.unmatched_rendered,
        pairing.unmatched_expected,
        deltas,
        missed_tokens,
    );
    debug!(
        pairs = report.summary.total_pairs,
        high_confidence = report.summary.high_confidence_pairs,
        deltas = report.summary.deltas,
        missed_tokens = report.summary.missed_tokens,
        "reconciliation complete"
    );
    report
}

/// Parse `markup` and reconcile the rendered tree against it.
#[instrument(skip_all, fields(markup_len = markup.len()))]
pub fn reconcile_markup(
    rendered: &RenderedNode,
    markup: &str,
    tokens: &DesignTokenDictionary,
    metrics: &ContextMetrics,
    options: &ReconcileOptions,
) -> ReconciliationReport {
    let expected = parse_markup(markup);
    reconcile(rendered, &expected, tokens, metrics, options)
}

struct DeltaValues {
    expected: String,
    actual: String,
    severity: DeltaSeverity,
    token_name: Option<String>,
}

struct Finding {
    delta: DeltaValues,
    missed: Option<MissedToken>,
}

fn compare_property(
    index: &TokenIndex,
    nodes: &PairedNodes,
    property: &str,
    expected_value: &str,
) -> Option<Finding> {
    let rendered = nodes.rendered;
    let Some(actual_value) = actual_style(rendered, property) else {
        trace!(property, rendered_id = %rendered.agent_id, "no computed value to compare");
        return None;
    };
    let selector = if rendered.selector.is_empty() {
        rendered.tag.as_str()
    } else {
        rendered.selector.as_str()
    };
    let percentage_reference = nodes
        .rendered_parent
        .map(|parent| f64::from(parent.rect.width));

    let kind = PropertyKind::classify(property);
    let expected_canonical = canonicalize(property, expected_value);
    let actual_canonical = canonicalize(property, &actual_value);

    if kind == PropertyKind::Other {
        if let Some(equal) = compare_lengths(index, &expected_canonical, &actual_canonical) {
            if equal {
                return None;
            }
        }
    }

    let comparison = index.compare_with_tokens(
        property,
        &expected_canonical,
        &actual_canonical,
        selector,
        percentage_reference,
    );
    if comparison.is_match {
        return None;
    }

    let severity = match kind {
        PropertyKind::Color => {
            match color_distance(&expected_canonical, &actual_canonical) {
                Some(delta) if delta < index.thresholds().color_delta_e => {
                    trace!(property, delta, "color difference below perceptual threshold");
                    return None;
                }
                Some(delta) => color_severity(delta),
                None => DeltaSeverity::Major,
            }
        }
        _ => match (&comparison.expected, &comparison.actual) {
            (NormalizedValue::Pixels(e), NormalizedValue::Pixels(a)) => length_severity(*e, *a),
            _ => match numeric_pair(index, &expected_canonical, &actual_canonical) {
                Some((e, a)) if property != "fontWeight" => length_severity(e, a),
                _ => keyword_severity(property),
            },
        },
    };

    Some(Finding {
        delta: DeltaValues {
            expected: comparison.expected.to_string(),
            actual: comparison.actual.to_string(),
            severity,
            token_name: comparison.token_name,
        },
        missed: comparison.missed_token,
    })
}

/// The computed value for a camelCase property, if the snapshot carries one.
fn actual_style(rendered: &RenderedNode, property: &str) -> Option<String> {
    let styles = &rendered.styles;
    let text = |v: &Option<String>| v.clone();
    let px = |v: f32| Some(format_px(f64::from(v)));

    match property {
        "width" | "height" => px(css_size(rendered, property == "width")),
        "display" => text(&styles.display),
        "position" => text(&styles.position),
        "boxSizing" => text(&styles.box_sizing),
        "fontSize" => styles.font_size.and_then(px),
        "fontWeight" => text(&styles.font_weight),
        "fontFamily" => text(&styles.font_family),
        "color" => text(&styles.color),
        "backgroundColor" => text(&styles.background_color),
        "borderRadius" => text(&styles.border_radius),
        "opacity" => styles.opacity.map(|v| format_number(f64::from(v))),
        "overflow" => text(&styles.overflow),
        "overflowX" => text(&styles.overflow_x),
        "overflowY" => text(&styles.overflow_y),
        "gap" => text(&styles.gap),
        "rowGap" => gap_axis(styles.gap.as_deref(), 0),
        "columnGap" => gap_axis(styles.gap.as_deref(), 1),
        "lineHeight" => text(&styles.line_height),
        "letterSpacing" => text(&styles.letter_spacing),
        "zIndex" => text(&styles.z_index),
        // Unset computed flex-direction is the initial value.
        "flexDirection" => Some(
            styles
                .flex_direction
                .clone()
                .unwrap_or_else(|| "row".to_string()),
        ),
        "paddingTop" => px(styles.padding.top),
        "paddingRight" => px(styles.padding.right),
        "paddingBottom" => px(styles.padding.bottom),
        "paddingLeft" => px(styles.padding.left),
        "marginTop" => px(styles.margin.top),
        "marginRight" => px(styles.margin.right),
        "marginBottom" => px(styles.margin.bottom),
        "marginLeft" => px(styles.margin.left),
        "borderTopWidth" => px(styles.border.top),
        "borderRightWidth" => px(styles.border.right),
        "borderBottomWidth" => px(styles.border.bottom),
        "borderLeftWidth" => px(styles.border.left),
        _ => None,
    }
}

/// The `width`/`height` a stylesheet would set to produce the measured
/// border box.
fn css_size(rendered: &RenderedNode, horizontal: bool) -> f32 {
    let s = &rendered.styles;
    let (outer, padding, border) = if horizontal {
        (
            rendered.rect.width,
            s.padding.left + s.padding.right,
            s.border.left + s.border.right,
        )
    } else {
        (
            rendered.rect.height,
            s.padding.top + s.padding.bottom,
            s.border.top + s.border.bottom,
        )
    };
    if s.box_sizing.as_deref() == Some("border-box") {
        outer
    } else {
        (outer - padding - border).max(0.0)
    }
}

/// `gap` is `row column`, or one value for both.
fn gap_axis(gap: Option<&str>, axis: usize) -> Option<String> {
    let parts: Vec<&str> = gap?.split_whitespace().collect();
    parts
        .get(axis)
        .or_else(|| parts.first())
        .map(|s| s.to_string())
}

/// Put keyword values into a comparable form.
fn canonicalize(property: &str, value: &str) -> String {
    let value = value.trim();
    match property {
        "fontWeight" => match value.to_ascii_lowercase().as_str() {
            "normal" => "400".to_string(),
            "bold" => "700".to_string(),
            other => other
                .parse::<f64>()
                .map(format_number)
                .unwrap_or_else(|_| other.to_string()),
        },
        "fontFamily" => value
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .to_ascii_lowercase(),
        "opacity" => value
            .parse::<f64>()
            .map(format_number)
            .unwrap_or_else(|_| value.to_string()),
        _ => value.to_string(),
    }
}

/// For unclassified properties holding lengths on both sides (`lineHeight:
/// 24px` vs `1.5rem`), whether they resolve to the same pixel value.
fn compare_lengths(index: &TokenIndex, expected: &str, actual: &str) -> Option<bool> {
    let (e, a) = numeric_pair(index, expected, actual)?;
    Some((e - a).abs() < 1e-6)
}

fn numeric_pair(index: &TokenIndex, expected: &str, actual: &str) -> Option<(f64, f64)> {
    let is_length = |v: &str| parse_length(v).is_some_and(|(_, unit)| !unit.is_empty());
    if is_length(expected) && is_length(actual) {
        Some((
            index.resolve_pixels(expected, None),
            index.resolve_pixels(actual, None),
        ))
    } else {
        None
    }
}

fn length_severity(expected: f64, actual: f64) -> DeltaSeverity {
    let diff = (expected - actual).abs();
    let relative = if expected.abs() > f64::EPSILON {
        diff / expected.abs()
    } else {
        f64::INFINITY
    };
    if diff <= 4.0 || relative <= 0.15 {
        DeltaSeverity::Minor
    } else if diff <= 12.0 || relative <= 0.35 {
        DeltaSeverity::Moderate
    } else {
        DeltaSeverity::Major
    }
}

fn color_severity(delta: f32) -> DeltaSeverity {
    if delta < 0.1 {
        DeltaSeverity::Minor
    } else if delta < 0.25 {
        DeltaSeverity::Moderate
    } else {
        DeltaSeverity::Major
    }
}

fn keyword_severity(property: &str) -> DeltaSeverity {
    match property {
        "fontWeight" => DeltaSeverity::Moderate,
        _ => DeltaSeverity::Major,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoxRect, EdgeSizes, TypographyToken};

    fn tokens() -> DesignTokenDictionary {
        let mut dict = DesignTokenDictionary::default();
        dict.colors.insert("brand-red".into(), "#ff0000".into());
        dict.colors.insert("ink".into(), "#111827".into());
        dict.spacing.insert("space-4".into(), "16px".into());
        dict.typography.insert(
            "body-lg".into(),
            TypographyToken {
                font_size: "18px".into(),
                font_weight: "400".into(),
                font_family: "Inter, sans-serif".into(),
                line_height: None,
            },
        );
        dict
    }

    fn run(rendered: &RenderedNode, markup: &str) -> ReconciliationReport {
        reconcile_markup(
            rendered,
            markup,
            &tokens(),
            &ContextMetrics::default(),
            &ReconcileOptions::default(),
        )
    }

    fn paragraph() -> RenderedNode {
        let mut p = RenderedNode::new("p1", "p");
        p.selector = "main > p".into();
        p.text_content = Some("Hello".into());
        p.styles.font_size = Some(16.0);
        p.styles.font_weight = Some("400".into());
        p.styles.font_family = Some("\"Inter\", system-ui".into());
        p
    }

    #[test]
    fn font_size_off_token_is_a_minor_delta() {
        let report = run(&paragraph(), r#"<p class="text-body-lg">Hello</p>"#);
        assert_eq!(report.deltas.len(), 1, "{:?}", report.deltas);
        let delta = &report.deltas[0];
        assert_eq!(delta.property, "fontSize");
        assert_eq!(delta.severity, DeltaSeverity::Minor);
        assert_eq!(delta.token_name.as_deref(), Some("body-lg"));
        assert_eq!(delta.figma_value, "18px");
        assert_eq!(delta.caliper_value, "16px");

        assert_eq!(report.missed_tokens.len(), 1);
        assert_eq!(report.missed_tokens[0].selector, "main > p");
    }

    #[test]
    fn perceptually_equal_colors_are_not_deltas() {
        let mut button = RenderedNode::new("b1", "button");
        button.styles.background_color = Some("rgb(255, 0, 0)".into());
        let report = run(&button, r#"<button class="bg-brand-red"></button>"#);
        assert!(report.deltas.is_empty(), "{:?}", report.deltas);
    }

    #[test]
    fn wrong_color_is_reported_with_missed_token() {
        let mut button = RenderedNode::new("b1", "button");
        button.styles.color = Some("rgb(0, 0, 255)".into());
        let report = run(&button, r#"<button class="text-ink"></button>"#);
        assert_eq!(report.deltas.len(), 1);
        assert_eq!(report.deltas[0].severity, DeltaSeverity::Major);
        assert_eq!(report.missed_tokens[0].token_name, "ink");
        assert_eq!(report.missed_tokens[0].selector, "button");
    }

    #[test]
    fn spacing_resolves_against_parent_and_severity_scales() {
        let mut card = RenderedNode::new("c1", "div");
        card.rect = BoxRect::new(0.0, 0.0, 400.0, 100.0);
        let mut inner = RenderedNode::new("c2", "div");
        inner.styles.padding = EdgeSizes::uniform(16.0);
        inner.styles.margin = EdgeSizes {
            top: 40.0,
            ..EdgeSizes::default()
        };
        let rendered = card.with_child(inner);

        let report = run(
            &rendered,
            r#"<div><div class="p-space-4" style="margin-top: 10%"></div></div>"#,
        );
        let deltas: Vec<_> = report
            .deltas
            .iter()
            .map(|d| (d.property.as_str(), d.severity))
            .collect();
        // 10% of the 400px parent is 40px.
        assert!(deltas.is_empty(), "{deltas:?}");

        assert_eq!(length_severity(16.0, 12.0), DeltaSeverity::Minor);
        assert_eq!(length_severity(16.0, 26.0), DeltaSeverity::Moderate);
        assert_eq!(length_severity(16.0, 48.0), DeltaSeverity::Major);
        assert_eq!(length_severity(200.0, 180.0), DeltaSeverity::Minor);
    }

    #[test]
    fn keyword_canonicalization() {
        assert_eq!(canonicalize("fontWeight", "bold"), "700");
        assert_eq!(canonicalize("fontWeight", "600.0"), "600");
        assert_eq!(canonicalize("fontFamily", "'Inter', sans-serif"), "inter");
        assert_eq!(canonicalize("opacity", ".5"), "0.5");
    }

    #[test]
    fn layout_keyword_mismatch_is_major() {
        let mut row = RenderedNode::new("r", "div");
        row.styles.display = Some("block".into());
        let report = run(&row, r#"<div class="flex"></div>"#);
        assert_eq!(report.deltas.len(), 1);
        assert_eq!(report.deltas[0].property, "display");
        assert_eq!(report.deltas[0].severity, DeltaSeverity::Major);
        assert!(report.missed_tokens.is_empty());
    }

    #[test]
    fn width_and_height_compare_against_the_measured_box() {
        let mut card = RenderedNode::new("c1", "div");
        card.rect = BoxRect::new(0.0, 0.0, 320.0, 100.0);
        card.styles.padding = EdgeSizes::uniform(10.0);
        let report = run(&card, r#"<div style="width: 300px; height: 80px"></div>"#);
        assert!(report.deltas.is_empty(), "{:?}", report.deltas);

        card.styles.box_sizing = Some("border-box".into());
        let report = run(&card, r#"<div style="width: 300px"></div>"#);
        assert_eq!(report.deltas.len(), 1, "{:?}", report.deltas);
        assert_eq!(report.deltas[0].property, "width");
        assert_eq!(report.deltas[0].caliper_value, "320px");
    }

    #[test]
    fn missing_expected_child_is_unmatched() {
        let report = run(
            &RenderedNode::new("root", "div"),
            "<div><span>Missing!</span></div>",
        );
        assert_eq!(report.summary.total_pairs, 1);
        assert_eq!(report.summary.unmatched_expected, 1);
        assert_eq!(report.unmatched_expected, vec![1]);
    }
}
