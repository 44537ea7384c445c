//! LLM-assisted classification: block schemas, the chat-completion seam,
//! whole-page segmentation, and section → block conversion.

pub mod blocks;
pub mod converter;
pub mod llm;
pub mod segmenter;
