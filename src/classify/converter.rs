//! Section → block conversion: one LLM attempt per section, schema-gated.
//!
//! Validation is authoritative and final. A candidate that fails the gate
//! is discarded — no retry, no coercion — and one section's failure never
//! touches its siblings.

use super::blocks::{field_hints, schema_for};
use super::llm::{extract_json, ChatClient, ChatMessage};
use crate::model::{BlockCandidate, BlockType, LlmBlockCandidate, PageSection};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_CONFIDENCE: f32 = 0.8;
const MAX_SECTION_HTML_CHARS: usize = 8_000;

/// Convert one section into a typed block candidate, or None when anything
/// along the way fails.
pub async fn convert_section(
    chat: &dyn ChatClient,
    section: &PageSection,
    target: BlockType,
    order: usize,
) -> Option<LlmBlockCandidate> {
    let schema = schema_for(target);

    let raw = match chat
        .complete(&[
            ChatMessage::system(
                "You convert a section of a dive-shop website into one typed \
                 content block for a site builder. Respond with JSON only: a \
                 single object that is the block content, nothing else.",
            ),
            ChatMessage::user(build_prompt(section, target, order)),
        ])
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!("block conversion call failed for {} section: {e}", section.kind);
            return None;
        }
    };

    let Some(json) = extract_json(&raw) else {
        warn!("block conversion reply for {target} had no JSON object");
        return None;
    };
    let content: Value = match serde_json::from_str(&json) {
        Ok(content) => content,
        Err(e) => {
            warn!("block conversion reply for {target} failed to parse: {e}");
            return None;
        }
    };

    if let Err(e) = schema.validate(&content) {
        debug!("discarding {target} candidate: {e}");
        return None;
    }

    Some(LlmBlockCandidate {
        block: BlockCandidate {
            kind: target,
            content,
            source_section: Some(section.kind),
        },
        confidence: section.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        rationale: Some(match &section.rationale {
            Some(r) => r.clone(),
            None => format!("{} section converted to {} block", section.kind, target),
        }),
    })
}

fn build_prompt(section: &PageSection, target: BlockType, order: usize) -> String {
    let schema = schema_for(target);
    let hints = field_hints(target);

    let mut prompt = format!(
        "Block type: {target}\nDescription: {}\n",
        schema.description
    );
    if !hints.is_empty() {
        prompt.push_str(&format!("Required fields: {}\n", hints.join(", ")));
    }
    prompt.push_str(&format!("\nSection #{order} ({})\n", section.kind));
    if let Some(title) = &section.heading {
        prompt.push_str(&format!("Title: {title}\n"));
    }
    if let Some(text) = &section.text_sample {
        prompt.push_str(&format!("Text: {text}\n"));
    }
    if !section.images.is_empty() {
        prompt.push_str(&format!("Images: {}\n", section.images.join(", ")));
    }
    if let Some(html) = &section.html {
        let mut end = html.len().min(MAX_SECTION_HTML_CHARS);
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        prompt.push_str(&format!("HTML:\n{}\n", &html[..end]));
    }
    prompt.push_str("\nReturn only the content object for this block.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionKind;
    use anyhow::Result;
    use async_trait::async_trait;

    struct CannedChat(String);

    #[async_trait]
    impl ChatClient for CannedChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatClient for FailingChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    fn hero_section() -> PageSection {
        PageSection {
            kind: SectionKind::Hero,
            selector: Some("section.hero".into()),
            heading: Some("Dive Into Adventure".into()),
            text_sample: Some("Daily boat trips to the reef".into()),
            images: vec!["/img/hero.jpg".into()],
            confidence: Some(0.9),
            rationale: None,
            html: None,
        }
    }

    #[tokio::test]
    async fn test_valid_reply_becomes_candidate() {
        let chat = CannedChat(
            r#"{"heading": "Dive Into Adventure", "subheading": "Daily boat trips",
                "backgroundImage": "/img/hero.jpg"}"#
                .to_string(),
        );
        let candidate = convert_section(&chat, &hero_section(), BlockType::Hero, 0)
            .await
            .expect("candidate expected");

        assert_eq!(candidate.block.kind, BlockType::Hero);
        assert_eq!(candidate.block.source_section, Some(SectionKind::Hero));
        assert_eq!(candidate.confidence, 0.9);
        assert_eq!(
            candidate.block.content.get("heading").and_then(|v| v.as_str()),
            Some("Dive Into Adventure")
        );
        // The surfaced candidate must pass its own schema again.
        assert!(schema_for(BlockType::Hero)
            .validate(&candidate.block.content)
            .is_ok());
    }

    #[tokio::test]
    async fn test_schema_failure_discards_candidate() {
        // Hero requires a string heading.
        let chat = CannedChat(r#"{"heading": 12345}"#.to_string());
        let candidate = convert_section(&chat, &hero_section(), BlockType::Hero, 0).await;
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_non_json_reply_discards_candidate() {
        let chat = CannedChat("sorry, I cannot help with that".to_string());
        let candidate = convert_section(&chat, &hero_section(), BlockType::Hero, 0).await;
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_discards_candidate() {
        let candidate = convert_section(&FailingChat, &hero_section(), BlockType::Hero, 0).await;
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_default_confidence_applied() {
        let mut section = hero_section();
        section.confidence = None;
        let chat = CannedChat(r#"{"heading": "Welcome"}"#.to_string());
        let candidate = convert_section(&chat, &section, BlockType::Hero, 0)
            .await
            .unwrap();
        assert_eq!(candidate.confidence, DEFAULT_CONFIDENCE);
    }
}
