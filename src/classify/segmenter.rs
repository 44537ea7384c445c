//! LLM-backed section segmentation: hand the whole rendered page to the
//! model and get back typed sections with confidence scores.

use super::blocks;
use super::llm::{extract_json, ChatClient, ChatMessage};
use crate::model::{PageSection, SectionKind};
use serde::Deserialize;
use tracing::{debug, warn};

const MAX_HTML_CHARS: usize = 24_000;
const MAX_TEXT_CHARS: usize = 4_000;
const TEXT_SAMPLE_LEN: usize = 240;

#[derive(Debug, Deserialize)]
struct LlmSectionsResponse {
    #[serde(default)]
    sections: Vec<LlmSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content_text: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

/// Ask the LLM to segment a page. Any failure — transport, non-JSON reply,
/// shape mismatch — degrades to an empty section list; the page is still
/// processed, it just yields no block candidates.
pub async fn segment_sections(
    chat: &dyn ChatClient,
    html: &str,
    text: &str,
) -> Vec<PageSection> {
    let messages = [
        ChatMessage::system(system_prompt()),
        ChatMessage::user(format!(
            "Segment this web page into sections.\n\n\
             PLAIN TEXT:\n{}\n\nHTML:\n{}",
            truncate(text, MAX_TEXT_CHARS),
            truncate(html, MAX_HTML_CHARS),
        )),
    ];

    let raw = match chat.complete(&messages).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("section segmentation call failed: {e}");
            return Vec::new();
        }
    };

    let Some(json) = extract_json(&raw) else {
        warn!("section segmentation reply contained no JSON object");
        return Vec::new();
    };

    let parsed: LlmSectionsResponse = match serde_json::from_str(&json) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("section segmentation reply failed to parse: {e}");
            return Vec::new();
        }
    };

    parsed
        .sections
        .into_iter()
        .map(|s| {
            let kind = SectionKind::parse(&s.kind);
            if kind == SectionKind::Unknown {
                debug!("section type {:?} not recognized, recording as unknown", s.kind);
            }
            PageSection {
                kind,
                selector: None,
                heading: s.title,
                text_sample: s
                    .content_text
                    .as_deref()
                    .map(|t| truncate(t, TEXT_SAMPLE_LEN)),
                images: s.images,
                confidence: s.confidence.map(|c| c.clamp(0.0, 1.0)),
                rationale: s.rationale,
                html: s.html,
            }
        })
        .collect()
}

/// System prompt enumerating every block type the product can render, so
/// the model segments in our vocabulary.
fn system_prompt() -> String {
    let mut prompt = String::from(
        "You segment dive-shop websites into semantic sections for a site \
         builder. Respond with JSON only, in the shape \
         {\"sections\": [{\"type\", \"title\", \"contentText\", \"images\", \
         \"confidence\", \"rationale\", \"html\"}]}. \
         Use these section types: nav, hero, about, services, courses, \
         gallery, testimonials, faq, team, contact, map, cta, footer, text, \
         image, unknown. confidence is 0..1.\n\n\
         The sections feed these content blocks:\n",
    );
    for schema in blocks::all_schemas() {
        prompt.push_str(&format!("- {}: {}\n", schema.kind, schema.description));
    }
    prompt
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}
