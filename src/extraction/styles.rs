//! Style mining: color literals and font families from CSS text.
//!
//! Pure functions of their input — the same blobs always produce the same
//! ranking, which is what the palette tests pin down.

use crate::model::{ColorPalette, Fonts};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Generic and system fallback families that never become heading/body.
const SYSTEM_FONTS: &[&str] = &[
    "system-ui",
    "-apple-system",
    "blinkmacsystemfont",
    "segoe ui",
    "sans-serif",
    "serif",
    "monospace",
    "cursive",
    "fantasy",
    "ui-sans-serif",
    "ui-serif",
    "ui-monospace",
    "ui-rounded",
    "arial",
    "helvetica",
    "helvetica neue",
    "times",
    "times new roman",
    "georgia",
    "courier",
    "courier new",
    "verdana",
    "tahoma",
    "inherit",
    "initial",
    "unset",
];

/// A color literal and how often it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedColor {
    pub value: String,
    pub count: usize,
}

/// Rank color literals across CSS blobs by frequency, most frequent first.
///
/// Matches hex (#RGB/#RGBA/#RRGGBB/#RRGGBBAA), rgb()/rgba() and
/// hsl()/hsla(); values are lowercased and whitespace-stripped for dedup.
/// Pure black, pure white, and fully-transparent literals are excluded as
/// uninformative. Ties are broken by first occurrence, so the ranking is a
/// pure function of the input.
pub fn score_colors(blobs: &[String]) -> Vec<RankedColor> {
    let color_re = Regex::new(
        r"#[0-9a-fA-F]{8}\b|#[0-9a-fA-F]{6}\b|#[0-9a-fA-F]{3,4}\b|rgba?\([^)]*\)|hsla?\([^)]*\)",
    )
    .unwrap();

    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for blob in blobs {
        for m in color_re.find_iter(blob) {
            let color = normalize_color(m.as_str());
            if is_excluded(&color) {
                continue;
            }
            let entry = counts.entry(color).or_insert_with(|| {
                order += 1;
                (0, order)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first_seen))| (value, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .map(|(value, count, _)| RankedColor { value, count })
        .collect()
}

/// Reduce a ranked color list to named palette slots: primary is the single
/// most frequent qualifying color; the next distinct colors fill secondary,
/// accent, and background in rank order.
pub fn pick_palette(ranked: &[RankedColor]) -> ColorPalette {
    let mut slots = ranked.iter().map(|c| c.value.clone());
    ColorPalette {
        primary: slots.next(),
        secondary: slots.next(),
        accent: slots.next(),
        background: slots.next(),
        palette: ranked.iter().map(|c| c.value.clone()).collect(),
    }
}

/// Extract font families from stylesheet text, inline `style` attributes,
/// and Google-Fonts `<link>` query parameters. The first two non-system
/// families become the heading/body guesses — positional, not semantic.
pub fn extract_fonts(html: &str, css_blobs: &[String]) -> Fonts {
    let family_re = Regex::new(r#"font-family\s*:\s*([^;}{]+)"#).unwrap();
    let src_re = Regex::new(r#"src\s*:\s*url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap();

    let mut families: Vec<String> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    let mut push_family = |raw: &str| {
        let name = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        if name.is_empty() {
            return;
        }
        if !families.iter().any(|f| f.eq_ignore_ascii_case(name)) {
            families.push(name.to_string());
        }
    };

    // Stylesheet text first, then inline style attributes.
    for blob in css_blobs {
        for caps in family_re.captures_iter(blob) {
            for part in caps[1].split(',') {
                push_family(part);
            }
        }
        for caps in src_re.captures_iter(blob) {
            let src = caps[1].trim().to_string();
            if !sources.contains(&src) {
                sources.push(src);
            }
        }
    }

    let document = Html::parse_document(html);
    let styled_sel = Selector::parse("[style]").unwrap();
    for element in document.select(&styled_sel) {
        let style = element.value().attr("style").unwrap_or("");
        for caps in family_re.captures_iter(style) {
            for part in caps[1].split(',') {
                push_family(part);
            }
        }
    }

    // Google Fonts links contribute both family names and sources.
    let link_sel = Selector::parse("link[href]").unwrap();
    for element in document.select(&link_sel) {
        let href = element.value().attr("href").unwrap_or("");
        if !href.contains("fonts.googleapis.com") {
            continue;
        }
        if !sources.contains(&href.to_string()) {
            sources.push(href.to_string());
        }
        for name in google_font_families(href) {
            push_family(&name);
        }
    }

    let non_system: Vec<String> = families
        .iter()
        .filter(|f| is_non_system_font(f))
        .cloned()
        .collect();

    Fonts {
        heading: non_system.first().cloned(),
        body: non_system.get(1).cloned(),
        families: non_system,
        sources,
    }
}

/// Whether a family name is a real webfont rather than a generic or system
/// fallback.
pub fn is_non_system_font(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    !lower.is_empty() && !SYSTEM_FONTS.contains(&lower.as_str()) && !lower.starts_with("var(")
}

/// Contents of every inline `<style>` block, for feeding into the color and
/// font miners alongside fetched stylesheets.
pub fn inline_style_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("style").unwrap();
    document
        .select(&sel)
        .map(|el| el.inner_html())
        .filter(|css| !css.trim().is_empty())
        .collect()
}

fn normalize_color(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn is_excluded(color: &str) -> bool {
    matches!(
        color,
        "#fff" | "#ffffff" | "#000" | "#000000" | "#ffffffff" | "#000000ff"
    ) || matches!(
        color,
        "rgb(255,255,255)" | "rgb(0,0,0)" | "rgba(255,255,255,1)" | "rgba(0,0,0,1)"
    ) || ((color.starts_with("rgba(") || color.starts_with("hsla("))
        && (color.ends_with(",0)") || color.ends_with(",0.0)")))
}

/// Family names from a Google-Fonts URL's `family=` parameters. Handles
/// both the v1 (`family=A+B|C`) and v2 (`family=A+B:wght@400`) shapes.
fn google_font_families(href: &str) -> Vec<String> {
    let Ok(parsed) = url::Url::parse(href) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for (key, value) in parsed.query_pairs() {
        if key != "family" {
            continue;
        }
        for group in value.split('|') {
            let name = group.split(':').next().unwrap_or("").replace('+', " ");
            let name = name.trim().to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
