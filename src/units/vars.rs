//! `var(--name, fallback)` resolution against the token dictionary.

use tracing::trace;

use super::calc::matching_paren;
use super::Evaluator;

/// Split the inside of `var(...)` into the custom property name and the
/// optional fallback expression.
fn split_var(value: &str) -> Option<(&str, Option<&str>)> {
    let open = value.find('(')?;
    let close = matching_paren(value, open)?;
    let inner = &value[open + 1..close];

    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                return Some((inner[..i].trim(), Some(inner[i + 1..].trim())));
            }
            _ => {}
        }
    }
    Some((inner.trim(), None))
}

/// Look a name up in spacing, border-radius, colors, then typography font sizes.
fn lookup<'d>(evaluator: &Evaluator<'d>, name: &str) -> Option<&'d str> {
    let tokens = evaluator.options.tokens?;
    let bare = name.trim_start_matches("--");
    let keys = [name, bare];

    for key in keys {
        if let Some(v) = tokens.spacing.get(key) {
            return Some(v.as_str());
        }
    }
    for key in keys {
        if let Some(v) = tokens.border_radius.get(key) {
            return Some(v.as_str());
        }
    }
    for key in keys {
        if let Some(v) = tokens.colors.get(key) {
            return Some(v.as_str());
        }
    }
    for key in keys {
        if let Some(t) = tokens.typography.get(key) {
            return Some(t.font_size.as_str());
        }
    }
    None
}

pub(super) fn resolve_var(evaluator: &mut Evaluator, value: &str) -> f64 {
    let Some((name, fallback)) = split_var(value) else {
        trace!(value, "malformed var() reference");
        return 0.0;
    };
    let key = name.trim_start_matches("--").to_string();

    if evaluator.visiting.contains(&key) {
        trace!(name, "var() cycle detected");
        return 0.0;
    }

    match lookup(evaluator, name) {
        Some(found) => {
            evaluator.visiting.insert(key.clone());
            let resolved = evaluator.resolve(found);
            evaluator.visiting.remove(&key);
            resolved
        }
        None => match fallback {
            Some(expr) if !expr.is_empty() => evaluator.resolve(expr),
            _ => {
                trace!(name, "var() reference has no token and no fallback");
                0.0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::split_var;
    use crate::types::{ContextMetrics, DesignTokenDictionary, TypographyToken};
    use crate::units::{to_pixels, ResolveOptions};

    fn tokens() -> DesignTokenDictionary {
        let mut dict = DesignTokenDictionary::default();
        dict.spacing.insert("gutter".into(), "24px".into());
        dict.spacing.insert("loop-a".into(), "var(--loop-b)".into());
        dict.spacing.insert("loop-b".into(), "calc(var(--loop-a) + 4px)".into());
        dict.border_radius.insert("gutter".into(), "2px".into());
        dict.border_radius.insert("card".into(), "0.5rem".into());
        dict.typography.insert(
            "body-lg".into(),
            TypographyToken {
                font_size: "18px".into(),
                font_weight: "400".into(),
                font_family: "Inter".into(),
                line_height: None,
            },
        );
        dict
    }

    fn resolve(value: &str, dict: &DesignTokenDictionary) -> f64 {
        let options = ResolveOptions {
            tokens: Some(dict),
            ..ResolveOptions::default()
        };
        to_pixels(value, &ContextMetrics::default(), &options)
    }

    #[test]
    fn splits_name_and_fallback() {
        assert_eq!(split_var("var(--a)"), Some(("--a", None)));
        assert_eq!(
            split_var("var(--a, calc(1px, 2px))"),
            Some(("--a", Some("calc(1px, 2px)")))
        );
        assert_eq!(split_var("var(--a"), None);
    }

    #[test]
    fn spacing_takes_priority_over_border_radius() {
        let dict = tokens();
        assert_eq!(resolve("var(--gutter)", &dict), 24.0);
        assert_eq!(resolve("var(--card)", &dict), 8.0);
    }

    #[test]
    fn typography_font_size_is_last_resort() {
        assert_eq!(resolve("var(--body-lg)", &tokens()), 18.0);
    }

    #[test]
    fn falls_back_when_token_missing() {
        let dict = tokens();
        assert_eq!(resolve("var(--missing, 12px)", &dict), 12.0);
        assert_eq!(resolve("var(--missing, var(--gutter))", &dict), 24.0);
        assert_eq!(resolve("var(--missing)", &dict), 0.0);
    }

    #[test]
    fn fallback_used_without_dictionary() {
        let value = to_pixels(
            "var(--x, 2rem)",
            &ContextMetrics::default(),
            &ResolveOptions::default(),
        );
        assert_eq!(value, 32.0);
    }

    #[test]
    fn cycles_resolve_to_zero() {
        // loop-a -> loop-b -> calc(loop-a + 4px); the revisit contributes 0.
        assert_eq!(resolve("var(--loop-a)", &tokens()), 4.0);
        assert_eq!(resolve("var(--loop-b)", &tokens()), 4.0);
    }
}
