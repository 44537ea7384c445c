//! Heuristic section segmentation: split a rendered page into semantically
//! typed regions using class names, headings, and content signals.
//!
//! The LLM-backed strategy lives in `classify::segmenter`; both produce the
//! same `PageSection` shape.

use crate::model::{PageSection, SectionKind};
use scraper::{ElementRef, Html, Selector};

const TEXT_SAMPLE_LEN: usize = 240;
const GALLERY_IMAGE_THRESHOLD: usize = 6;

/// Split a page into typed sections.
///
/// Order of output: nav, hero, body sections in document order, footer.
/// Unrecognized body sections are kept as `unknown`, never dropped.
pub fn infer_sections(html: &str) -> Vec<PageSection> {
    let document = Html::parse_document(html);
    let mut sections: Vec<PageSection> = Vec::new();

    // <header>/<nav> → nav
    for selector in ["header", "nav"] {
        let sel = Selector::parse(selector).unwrap();
        if let Some(el) = document.select(&sel).next() {
            sections.push(build_section(SectionKind::Nav, selector, &el));
            break;
        }
    }

    // First hero-classed element, else the first <h1>-bearing section.
    let mut hero_seen: Option<String> = None;
    if let Some((el, selector)) = find_hero(&document) {
        hero_seen = Some(element_fingerprint(&el));
        sections.push(build_section(SectionKind::Hero, &selector, &el));
    }

    // Body candidates: every <section>, plus direct <div> children of <main>.
    let mut candidates: Vec<ElementRef<'_>> = Vec::new();
    let section_sel = Selector::parse("section").unwrap();
    candidates.extend(document.select(&section_sel));
    let main_div_sel = Selector::parse("main > div").unwrap();
    candidates.extend(document.select(&main_div_sel));

    for el in candidates {
        if hero_seen.as_deref() == Some(element_fingerprint(&el).as_str()) {
            continue;
        }
        let kind = classify_element(&el);
        let selector = selector_hint(&el);
        sections.push(build_section(kind, &selector, &el));
    }

    let footer_sel = Selector::parse("footer").unwrap();
    if let Some(el) = document.select(&footer_sel).next() {
        sections.push(build_section(SectionKind::Footer, "footer", &el));
    }

    sections
}

/// Classify one candidate element. Class-name substrings are checked first,
/// then content signals, in a fixed priority order ending at `unknown`.
fn classify_element(el: &ElementRef<'_>) -> SectionKind {
    let class = el.value().attr("class").unwrap_or("").to_lowercase();
    let class_has = |needles: &[&str]| needles.iter().any(|n| class.contains(n));

    if class_has(&["hero", "banner", "jumbotron"]) {
        return SectionKind::Hero;
    }
    if class_has(&["about"]) {
        return SectionKind::About;
    }
    if class_has(&["course", "training", "certification"]) {
        return SectionKind::Courses;
    }
    if class_has(&["service"]) {
        return SectionKind::Services;
    }
    if class_has(&["gallery", "portfolio"]) {
        return SectionKind::Gallery;
    }
    if class_has(&["testimonial", "review"]) {
        return SectionKind::Testimonials;
    }
    if class_has(&["faq", "accordion"]) {
        return SectionKind::Faq;
    }
    if class_has(&["team", "staff", "crew", "instructor"]) {
        return SectionKind::Team;
    }
    if class_has(&["contact"]) {
        return SectionKind::Contact;
    }
    if class_has(&["map", "location"]) {
        return SectionKind::Map;
    }
    if class_has(&["cta", "call-to-action"]) {
        return SectionKind::Cta;
    }

    // Content signals.
    if image_urls(el).len() >= GALLERY_IMAGE_THRESHOLD {
        return SectionKind::Gallery;
    }
    let form_sel = Selector::parse("form").unwrap();
    if el.select(&form_sel).next().is_some() {
        return SectionKind::Contact;
    }
    if let Some(heading) = first_heading(el) {
        let h = heading.to_lowercase();
        if h.contains("testimonial") || h.contains("review") {
            return SectionKind::Testimonials;
        }
        if h.contains("faq") || h.contains("frequently asked") {
            return SectionKind::Faq;
        }
        if h.contains("our team") || h.contains("meet the") || h.contains("instructors") {
            return SectionKind::Team;
        }
        if h.contains("contact") {
            return SectionKind::Contact;
        }
        if h.contains("course") {
            return SectionKind::Courses;
        }
    }

    SectionKind::Unknown
}

fn find_hero(document: &Html) -> Option<(ElementRef<'_>, String)> {
    for class_sel in [
        r#"[class*="hero"]"#,
        r#"[class*="banner"]"#,
        r#"[class*="jumbotron"]"#,
    ] {
        let sel = Selector::parse(class_sel).unwrap();
        if let Some(el) = document.select(&sel).next() {
            return Some((el, selector_hint(&el)));
        }
    }

    // Fallback: the first section-like container holding an <h1>.
    let sel = Selector::parse("section, main > div, body > div").unwrap();
    let h1_sel = Selector::parse("h1").unwrap();
    for el in document.select(&sel) {
        if el.select(&h1_sel).next().is_some() {
            return Some((el, selector_hint(&el)));
        }
    }
    None
}

fn build_section(kind: SectionKind, selector: &str, el: &ElementRef<'_>) -> PageSection {
    let text: String = el
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let text_sample = if text.is_empty() {
        None
    } else {
        Some(truncate(&text, TEXT_SAMPLE_LEN))
    };

    PageSection {
        kind,
        selector: Some(selector.to_string()),
        heading: first_heading(el),
        text_sample,
        images: image_urls(el),
        confidence: None,
        rationale: None,
        html: None,
    }
}

fn first_heading(el: &ElementRef<'_>) -> Option<String> {
    let sel = Selector::parse("h1, h2, h3").unwrap();
    el.select(&sel)
        .next()
        .map(|h| {
            h.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}

fn image_urls(el: &ElementRef<'_>) -> Vec<String> {
    let sel = Selector::parse("img[src]").unwrap();
    let mut urls = Vec::new();
    for img in el.select(&sel) {
        if let Some(src) = img.value().attr("src") {
            let src = src.to_string();
            if !src.starts_with("data:") && !urls.contains(&src) {
                urls.push(src);
            }
        }
    }
    urls
}

/// "section.dive-gallery" style hint for debugging which element a section
/// came from.
fn selector_hint(el: &ElementRef<'_>) -> String {
    let name = el.value().name();
    match el
        .value()
        .attr("class")
        .and_then(|c| c.split_whitespace().next())
    {
        Some(first_class) => format!("{name}.{first_class}"),
        None => name.to_string(),
    }
}

/// Identity key for deduplicating the hero element against the body scan.
fn element_fingerprint(el: &ElementRef<'_>) -> String {
    format!("{:?}", el.id())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}
