//! Token-aware style inference for expected nodes.
//!
//! Utility classes are mapped to camelCase style declarations, consulting the
//! design-token dictionary first so `p-gutter` or `text-body-lg` pick up the
//! project's own values. The inline `style` attribute is applied last and
//! overrides anything a class produced.

use serde::{Deserialize, Serialize};

use crate::tokens::{format_number, format_px, parse_css_color};
use crate::types::{DesignTokenDictionary, ExpectedNode, InferredStyles, TypographyToken};
use crate::units::parse_length;

/// How class names on expected markup are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleFramework {
    /// Utility classes (`p-4`, `bg-brand`, `text-lg`) plus inline styles.
    #[default]
    Tailwind,
    /// Inline styles only; class names carry no style information.
    Css,
}

/// Base unit of the numeric spacing scale (`p-4` = 16px).
const SPACING_STEP_PX: f64 = 4.0;

const DISPLAY_CLASSES: [(&str, &str); 10] = [
    ("block", "block"),
    ("inline-block", "inline-block"),
    ("inline", "inline"),
    ("flex", "flex"),
    ("inline-flex", "inline-flex"),
    ("grid", "grid"),
    ("inline-grid", "inline-grid"),
    ("contents", "contents"),
    ("table", "table"),
    ("hidden", "none"),
];

const POSITION_CLASSES: [&str; 5] = ["static", "fixed", "absolute", "relative", "sticky"];

const FLEX_DIRECTIONS: [(&str, &str); 4] = [
    ("flex-row", "row"),
    ("flex-row-reverse", "row-reverse"),
    ("flex-col", "column"),
    ("flex-col-reverse", "column-reverse"),
];


const TEXT_SIZES: [(&str, &str); 10] = [
    ("xs", "12px"),
    ("sm", "14px"),
    ("base", "16px"),
    ("lg", "18px"),
    ("xl", "20px"),
    ("2xl", "24px"),
    ("3xl", "30px"),
    ("4xl", "36px"),
    ("5xl", "48px"),
    ("6xl", "60px"),
];

const RADIUS_SIZES: [(&str, &str); 8] = [
    ("none", "0px"),
    ("sm", "2px"),
    ("md", "6px"),
    ("lg", "8px"),
    ("xl", "12px"),
    ("2xl", "16px"),
    ("3xl", "24px"),
    ("full", "9999px"),
];

const FONT_WEIGHTS: [(&str, &str); 9] = [
    ("thin", "100"),
    ("extralight", "200"),
    ("light", "300"),
    ("normal", "400"),
    ("medium", "500"),
    ("semibold", "600"),
    ("bold", "700"),
    ("extrabold", "800"),
    ("black", "900"),
];

/// Spacing utility prefixes and the properties each one sets.
const SPACING_UTILITIES: [(&str, &[&str]); 17] = [
    ("p", &["paddingTop", "paddingRight", "paddingBottom", "paddingLeft"]),
    ("px", &["paddingLeft", "paddingRight"]),
    ("py", &["paddingTop", "paddingBottom"]),
    ("pt", &["paddingTop"]),
    ("pr", &["paddingRight"]),
    ("pb", &["paddingBottom"]),
    ("pl", &["paddingLeft"]),
    ("m", &["marginTop", "marginRight", "marginBottom", "marginLeft"]),
    ("mx", &["marginLeft", "marginRight"]),
    ("my", &["marginTop", "marginBottom"]),
    ("mt", &["marginTop"]),
    ("mr", &["marginRight"]),
    ("mb", &["marginBottom"]),
    ("ml", &["marginLeft"]),
    ("gap", &["gap"]),
    ("gap-x", &["columnGap"]),
    ("gap-y", &["rowGap"]),
];

/// Compute the style declarations an expected node asks for.
pub fn infer_styles(
    node: &ExpectedNode,
    framework: StyleFramework,
    tokens: &DesignTokenDictionary,
) -> InferredStyles {
    let mut styles = InferredStyles::new();

    if framework == StyleFramework::Tailwind {
        for class in &node.classes {
            apply_utility_class(class, tokens, &mut styles);
        }
    }
    if let Some(inline) = &node.raw_inline_style {
        apply_inline_style(inline, &mut styles);
    }
    styles
}

fn apply_utility_class(class: &str, tokens: &DesignTokenDictionary, styles: &mut InferredStyles) {
    // Variant classes (`hover:bg-x`, `md:p-4`) do not describe the resting state.
    if class.contains(':') {
        return;
    }
    let class = class.trim_start_matches('!');
    if class.is_empty() {
        return;
    }

    if let Some((_, display)) = DISPLAY_CLASSES.iter().find(|(c, _)| *c == class) {
        set(styles, "display", display);
        return;
    }
    if POSITION_CLASSES.contains(&class) {
        set(styles, "position", class);
        return;
    }
    if let Some((_, direction)) = FLEX_DIRECTIONS.iter().find(|(c, _)| *c == class) {
        set(styles, "flexDirection", direction);
        return;
    }
    if apply_spacing(class, tokens, styles) {
        return;
    }
    if let Some(rest) = class.strip_prefix("text-") {
        apply_text(rest, tokens, styles);
        return;
    }
    if let Some(rest) = class.strip_prefix("bg-") {
        if let Some(color) = color_value(rest, tokens) {
            set(styles, "backgroundColor", &color);
        }
        return;
    }
    if class == "rounded" || class.starts_with("rounded-") {
        if let Some(radius) = radius_value(class, tokens) {
            set(styles, "borderRadius", &radius);
        }
        return;
    }
    if let Some(rest) = class.strip_prefix("font-") {
        if let Some(weight) = font_weight_value(rest) {
            set(styles, "fontWeight", &weight);
        }
        return;
    }
    if let Some(rest) = class.strip_prefix("opacity-") {
        if let Ok(percent) = rest.parse::<f64>() {
            set(styles, "opacity", &format_number(percent / 100.0));
        }
        return;
    }
    if let Some(token) = tokens.typography.get(class) {
        apply_typography(token, styles);
    }
}

/// Padding, margin and gap utilities. Returns whether the class was consumed.
fn apply_spacing(class: &str, tokens: &DesignTokenDictionary, styles: &mut InferredStyles) -> bool {
    let (negative, body) = match class.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, class),
    };

    // Longest prefix first so `gap-x-2` is not read as `gap` with `x-2`.
    let mut matched: Option<(&[&str], &str)> = None;
    for (prefix, properties) in SPACING_UTILITIES.iter() {
        if let Some(value) = body
            .strip_prefix(*prefix)
            .and_then(|rest| rest.strip_prefix('-'))
        {
            if matched.map_or(true, |(_, v)| value.len() < v.len()) {
                matched = Some((*properties, value));
            }
        }
    }
    let Some((properties, suffix)) = matched else {
        return false;
    };
    // Negative utilities only exist for margins.
    if negative && !properties.iter().all(|p| p.starts_with("margin")) {
        return false;
    }
    let Some(value) = spacing_value(suffix, tokens) else {
        return false;
    };
    let value = if negative { negate(&value) } else { value };
    for property in properties {
        set(styles, property, &value);
    }
    true
}

fn spacing_value(suffix: &str, tokens: &DesignTokenDictionary) -> Option<String> {
    if let Some(token) = tokens.spacing.get(suffix) {
        return Some(token.clone());
    }
    if let Some(arbitrary) = arbitrary(suffix) {
        return Some(arbitrary);
    }
    match suffix {
        "px" => Some("1px".to_string()),
        "auto" => Some("auto".to_string()),
        _ => suffix
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| format_px(n * SPACING_STEP_PX)),
    }
}

fn negate(value: &str) -> String {
    match parse_length(value) {
        Some((number, unit)) if number == 0.0 => format!("0{unit}"),
        Some((number, unit)) => format!("{}{unit}", format_number(-number)),
        None if value == "auto" => value.to_string(),
        None => format!("calc({value} * -1)"),
    }
}

fn apply_text(rest: &str, tokens: &DesignTokenDictionary, styles: &mut InferredStyles) {
    if let Some(token) = tokens.typography.get(rest) {
        apply_typography(token, styles);
        return;
    }
    if let Some(color) = tokens.colors.get(rest) {
        set(styles, "color", color);
        return;
    }
    if let Some((_, size)) = TEXT_SIZES.iter().find(|(name, _)| *name == rest) {
        set(styles, "fontSize", size);
        return;
    }
    if let Some(value) = arbitrary(rest) {
        if parse_css_color(&value).is_some() {
            set(styles, "color", &value);
        } else {
            set(styles, "fontSize", &value);
        }
        return;
    }
    if parse_css_color(rest).is_some() {
        set(styles, "color", rest);
    }
}

fn apply_typography(token: &TypographyToken, styles: &mut InferredStyles) {
    set(styles, "fontSize", &token.font_size);
    set(styles, "fontWeight", &token.font_weight);
    set(styles, "fontFamily", &token.font_family);
    if let Some(line_height) = &token.line_height {
        set(styles, "lineHeight", line_height);
    }
}

fn color_value(suffix: &str, tokens: &DesignTokenDictionary) -> Option<String> {
    if let Some(color) = tokens.colors.get(suffix) {
        return Some(color.clone());
    }
    if let Some(value) = arbitrary(suffix) {
        return Some(value);
    }
    parse_css_color(suffix).map(|_| suffix.to_string())
}

fn radius_value(class: &str, tokens: &DesignTokenDictionary) -> Option<String> {
    let Some(suffix) = class.strip_prefix("rounded-") else {
        return Some("4px".to_string());
    };
    if let Some(token) = tokens.border_radius.get(suffix) {
        return Some(token.clone());
    }
    if let Some(value) = arbitrary(suffix) {
        return Some(value);
    }
    RADIUS_SIZES
        .iter()
        .find(|(name, _)| *name == suffix)
        .map(|(_, value)| value.to_string())
}

fn font_weight_value(suffix: &str) -> Option<String> {
    if let Some((_, weight)) = FONT_WEIGHTS.iter().find(|(name, _)| *name == suffix) {
        return Some(weight.to_string());
    }
    arbitrary(suffix).filter(|v| v.parse::<u32>().is_ok())
}

/// The literal inside `[...]`, with `_` standing in for spaces.
fn arbitrary(suffix: &str) -> Option<String> {
    let inner = suffix.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.replace('_', " "))
}

fn apply_inline_style(inline: &str, styles: &mut InferredStyles) {
    for declaration in split_declarations(inline) {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = strip_important(value);
        if name.is_empty() || value.is_empty() {
            continue;
        }

        match name.as_str() {
            "padding" | "margin" => {
                let sides = expand_box_shorthand(value);
                for (side, side_value) in ["Top", "Right", "Bottom", "Left"].iter().zip(sides) {
                    set(styles, &format!("{name}{side}"), &side_value);
                }
            }
            _ => set(styles, &kebab_to_camel(&name), value),
        }
    }
}

fn strip_important(value: &str) -> &str {
    const IMPORTANT: &str = "!important";
    let value = value.trim();
    let cut = value.len().saturating_sub(IMPORTANT.len());
    match value.get(cut..) {
        Some(tail) if tail.eq_ignore_ascii_case(IMPORTANT) => value[..cut].trim_end(),
        _ => value,
    }
}

/// Split on `;` outside parentheses, so `calc()` and `url()` stay intact.
fn split_declarations(inline: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inline.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                out.push(&inline[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&inline[start..]);
    out
}

/// Expand a 1-4 value box shorthand into top/right/bottom/left.
fn expand_box_shorthand(value: &str) -> [String; 4] {
    let parts = split_top_level_whitespace(value);
    match parts.as_slice() {
        [all] => [all.clone(), all.clone(), all.clone(), all.clone()],
        [vertical, horizontal] => [
            vertical.clone(),
            horizontal.clone(),
            vertical.clone(),
            horizontal.clone(),
        ],
        [top, horizontal, bottom] => [
            top.clone(),
            horizontal.clone(),
            bottom.clone(),
            horizontal.clone(),
        ],
        [top, right, bottom, left, ..] => {
            [top.clone(), right.clone(), bottom.clone(), left.clone()]
        }
        [] => Default::default(),
    }
}

fn split_top_level_whitespace(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in value.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn set(styles: &mut InferredStyles, property: &str, value: &str) {
    styles.insert(property.to_string(), value.to_string());
}
