//! CSS unit and math evaluation.
//!
//! Resolves length strings (`12px`, `1.5rem`, `10vw`), math functions
//! (`calc()`, `clamp()`, `min()`, `max()`) and `var()` references to a pixel
//! value given a [`ContextMetrics`] snapshot and an optional token dictionary.
//!
//! Resolution never fails: unparsable input resolves to `0.0` and unknown
//! units pass their numeric literal through.

mod calc;
mod vars;

use std::collections::HashSet;

use tracing::trace;

use crate::types::{ContextMetrics, DesignTokenDictionary};

/// Nesting limit for math expressions and `var()` indirection.
pub const MAX_RESOLVE_DEPTH: usize = 64;

const MATH_FUNCTIONS: [&str; 4] = ["calc(", "clamp(", "min(", "max("];

/// Per-call inputs beyond the environment metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    /// Font size of the parent element, used by `em`.
    pub parent_font_size: Option<f64>,
    /// Base for `%` values; defaults to the viewport width.
    pub percentage_reference: Option<f64>,
    /// Dictionary consulted by `var(--name)`.
    pub tokens: Option<&'a DesignTokenDictionary>,
}

/// Resolve any CSS length or expression to pixels.
pub fn to_pixels(value: &str, context: &ContextMetrics, options: &ResolveOptions) -> f64 {
    Evaluator::new(context, options).resolve(value)
}

/// Evaluate a math expression to pixels.
///
/// Accepts both wrapped (`calc(1rem + 2px)`) and bare (`1rem + 2px`) forms.
pub fn resolve_calc(expr: &str, context: &ContextMetrics, options: &ResolveOptions) -> f64 {
    let mut evaluator = Evaluator::new(context, options);
    calc::evaluate(&mut evaluator, expr.trim()).unwrap_or_else(|| {
        trace!(expr, "unresolvable math expression");
        0.0
    })
}

/// Whether `value` starts with one of the supported math functions.
pub fn is_math_function(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    MATH_FUNCTIONS.iter().any(|f| lower.starts_with(f))
}

/// State for one resolution call.
pub(crate) struct Evaluator<'a> {
    context: &'a ContextMetrics,
    options: &'a ResolveOptions<'a>,
    /// Token names on the current `var()` resolution path.
    visiting: HashSet<String>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    fn new(context: &'a ContextMetrics, options: &'a ResolveOptions<'a>) -> Self {
        Self {
            context,
            options,
            visiting: HashSet::new(),
            depth: 0,
        }
    }

    pub(crate) fn resolve(&mut self, value: &str) -> f64 {
        let value = value.trim();
        if value.is_empty() {
            return 0.0;
        }
        if self.depth >= MAX_RESOLVE_DEPTH {
            trace!(value, "resolution depth exceeded");
            return 0.0;
        }

        self.depth += 1;
        let resolved = if is_math_function(value) {
            calc::evaluate(self, value).unwrap_or_else(|| {
                trace!(value, "unresolvable math expression");
                0.0
            })
        } else if value.to_ascii_lowercase().starts_with("var(") {
            vars::resolve_var(self, value)
        } else {
            match parse_length(value) {
                Some((number, unit)) => self.convert(number, &unit),
                None => 0.0,
            }
        };
        self.depth -= 1;
        resolved
    }

    /// Convert a number with a unit suffix to pixels.
    pub(crate) fn convert(&self, value: f64, unit: &str) -> f64 {
        let ctx = self.context;
        let root = ctx.root_font_size;
        let vw = ctx.viewport_width;
        let vh = ctx.viewport_height;
        let dvw = ctx.dynamic_width();
        let dvh = ctx.dynamic_height();
        let pct = |base: f64| value * base / 100.0;

        match unit.to_ascii_lowercase().as_str() {
            "" | "px" => value,
            "rem" => value * root,
            "em" => value * self.options.parent_font_size.unwrap_or(root),
            "%" => pct(self.options.percentage_reference.unwrap_or(vw)),
            "vw" | "lvw" | "cqw" | "cqi" => pct(vw),
            "vh" | "lvh" | "cqh" | "cqb" => pct(vh),
            "vmin" | "lvmin" | "cqmin" => pct(vw.min(vh)),
            "vmax" | "lvmax" | "cqmax" => pct(vw.max(vh)),
            "svw" | "dvw" => pct(dvw),
            "svh" | "dvh" => pct(dvh),
            "svmin" | "dvmin" => pct(dvw.min(dvh)),
            "svmax" | "dvmax" => pct(dvw.max(dvh)),
            "pt" => value * 96.0 / 72.0,
            "pc" => value * 16.0,
            "in" => value * 96.0,
            "cm" => value * 96.0 / 2.54,
            "mm" => value * 96.0 / 25.4,
            "q" => value * 96.0 / 101.6,
            "ch" => value * 0.5 * root,
            "ex" => value * 0.45 * root,
            _ => value,
        }
    }
}

/// Split a bare value into its numeric literal and unit suffix.
///
/// Returns `None` when the value does not start with a number or carries
/// trailing content that is not a unit.
pub fn parse_length(value: &str) -> Option<(f64, String)> {
    let value = value.trim();
    let end = numeric_prefix_len(value);
    if end == 0 {
        return None;
    }
    let number: f64 = value[..end].parse().ok()?;
    let unit = value[end..].trim();
    if unit == "%" || unit.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((number, unit.to_ascii_lowercase()))
    } else {
        None
    }
}

/// Length in bytes of the leading CSS number in `s` (sign, digits,
/// fraction, exponent).
pub(crate) fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    // Exponent only when digits follow, so `1em` keeps its unit.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}
