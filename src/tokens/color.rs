//! CSS color parsing and perceptual distance in OKLab.

use palette::{FromColor, Hsl, LinSrgb, Oklab, Srgb};

/// A parsed color with its OKLab representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedColor {
    pub rgb: Srgb,
    pub alpha: f32,
    pub lab: Oklab,
}

impl ParsedColor {
    fn from_srgb(rgb: Srgb, alpha: f32) -> Self {
        let linear: LinSrgb = rgb.into_linear();
        let lab = Oklab::from_color(linear);
        Self { rgb, alpha, lab }
    }

    pub fn to_hex(&self) -> String {
        let clamp = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            clamp(self.rgb.red),
            clamp(self.rgb.green),
            clamp(self.rgb.blue)
        )
    }
}

/// Euclidean distance in OKLab (ΔE OK).
pub fn delta_e_ok(a: &ParsedColor, b: &ParsedColor) -> f32 {
    let dl = a.lab.l - b.lab.l;
    let da = a.lab.a - b.lab.a;
    let db = a.lab.b - b.lab.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// ΔE between two CSS color strings, when both parse.
pub fn color_distance(a: &str, b: &str) -> Option<f32> {
    Some(delta_e_ok(&parse_css_color(a)?, &parse_css_color(b)?))
}

const NAMED_COLORS: [(&str, [u8; 3]); 18] = [
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("lime", [0, 255, 0]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("orange", [255, 165, 0]),
];

/// Parse a CSS color: hex, `rgb()`/`rgba()`, `hsl()`/`hsla()`, or a basic
/// named color.
pub fn parse_css_color(value: &str) -> Option<ParsedColor> {
    let value = value.trim().to_ascii_lowercase();

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if value == "transparent" {
        return Some(ParsedColor::from_srgb(Srgb::new(0.0, 0.0, 0.0), 0.0));
    }
    if let Some(args) = function_args(&value, &["rgba", "rgb"]) {
        return parse_rgb_args(&args);
    }
    if let Some(args) = function_args(&value, &["hsla", "hsl"]) {
        return parse_hsl_args(&args);
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, [r, g, b])| ParsedColor::from_srgb(srgb8(*r, *g, *b), 1.0))
}

fn srgb8(r: u8, g: u8, b: u8) -> Srgb {
    Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

fn parse_hex(hex: &str) -> Option<ParsedColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
        4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };
    Some(ParsedColor::from_srgb(srgb8(r, g, b), a as f32 / 255.0))
}

/// Arguments of `name(...)` split on commas, whitespace and `/`.
fn function_args(value: &str, names: &[&str]) -> Option<Vec<String>> {
    let name = names.iter().find(|n| value.starts_with(&format!("{n}(")))?;
    let inner = value[name.len() + 1..].strip_suffix(')')?;
    Some(
        inner
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn parse_channel(arg: &str) -> Option<f32> {
    match arg.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok().map(|v| (v / 100.0).clamp(0.0, 1.0)),
        None => arg.parse::<f32>().ok().map(|v| (v / 255.0).clamp(0.0, 1.0)),
    }
}

fn parse_alpha(arg: Option<&String>) -> Option<f32> {
    match arg {
        None => Some(1.0),
        Some(a) => match a.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok().map(|v| (v / 100.0).clamp(0.0, 1.0)),
            None => a.parse::<f32>().ok().map(|v| v.clamp(0.0, 1.0)),
        },
    }
}

fn parse_rgb_args(args: &[String]) -> Option<ParsedColor> {
    if args.len() < 3 || args.len() > 4 {
        return None;
    }
    let rgb = Srgb::new(
        parse_channel(&args[0])?,
        parse_channel(&args[1])?,
        parse_channel(&args[2])?,
    );
    Some(ParsedColor::from_srgb(rgb, parse_alpha(args.get(3))?))
}

fn parse_hsl_args(args: &[String]) -> Option<ParsedColor> {
    if args.len() < 3 || args.len() > 4 {
        return None;
    }
    let hue: f32 = args[0].trim_end_matches("deg").parse().ok()?;
    let percent = |s: &str| -> Option<f32> {
        s.trim_end_matches('%')
            .parse::<f32>()
            .ok()
            .map(|v| (v / 100.0).clamp(0.0, 1.0))
    };
    let hsl = Hsl::new(hue, percent(&args[1])?, percent(&args[2])?);
    Some(ParsedColor::from_srgb(
        Srgb::from_color(hsl),
        parse_alpha(args.get(3))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        let short = parse_css_color("#f00").expect("short hex");
        let long = parse_css_color("#FF0000").expect("long hex");
        assert_eq!(short.to_hex(), "#ff0000");
        assert!(delta_e_ok(&short, &long) < 1e-6);

        let with_alpha = parse_css_color("#ff000080").expect("hex with alpha");
        assert!((with_alpha.alpha - 128.0 / 255.0).abs() < 1e-6);
        assert!(parse_css_color("#ff00").is_some());
        assert!(parse_css_color("#ggg").is_none());
        assert!(parse_css_color("#12345").is_none());
    }

    #[test]
    fn parses_rgb_functions() {
        let comma = parse_css_color("rgb(255, 0, 0)").expect("comma rgb");
        let space = parse_css_color("rgb(255 0 0 / 50%)").expect("space rgb");
        let rgba = parse_css_color("rgba(255,0,0,0.5)").expect("rgba");
        assert_eq!(comma.to_hex(), "#ff0000");
        assert_eq!(space.to_hex(), "#ff0000");
        assert!((space.alpha - 0.5).abs() < 1e-6);
        assert!((rgba.alpha - 0.5).abs() < 1e-6);
        assert!(parse_css_color("rgb(1, 2)").is_none());
    }

    #[test]
    fn parses_hsl_and_named_colors() {
        let hsl = parse_css_color("hsl(0, 100%, 50%)").expect("hsl");
        assert_eq!(hsl.to_hex(), "#ff0000");
        let named = parse_css_color("White").expect("named");
        assert_eq!(named.to_hex(), "#ffffff");
        assert_eq!(parse_css_color("transparent").map(|c| c.alpha), Some(0.0));
        assert!(parse_css_color("not-a-color").is_none());
    }

    #[test]
    fn hex_and_rgb_renderings_are_perceptually_equal() {
        let d = color_distance("#3b82f6", "rgb(59, 130, 246)").expect("both parse");
        assert!(d < 1e-4, "expected ~0 delta, got {d}");
    }

    #[test]
    fn distinct_colors_have_large_delta() {
        let d = color_distance("#ff0000", "#0000ff").expect("both parse");
        assert!(d > 0.3, "expected red/blue to be far apart, got {d}");
        let near = color_distance("#ff0000", "#fe0000").expect("both parse");
        assert!(near < 0.05, "expected near-red to be close, got {near}");
    }
}
