//! Block content schemas and the validation gate.
//!
//! Each block type has a typed content struct; "validating against the
//! schema" is typed deserialization plus non-empty checks on required
//! collections. The LLM prompt's field hints are derived by probing the
//! validator with an empty object and feeding back its error messages, so
//! the prompt never drifts from the actual schema.

use crate::model::BlockType;
use serde::Deserialize;
use serde_json::{json, Value};

// ── Content types ───────────────────────────────────────────────────────────
//
// Wire shape is camelCase — these objects are stored verbatim as block
// content for the builder frontend.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    pub heading: String,
    pub subheading: Option<String>,
    pub background_image: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub heading: Option<String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub url: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryContent {
    pub heading: Option<String>,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialsContent {
    pub heading: Option<String>,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub quote: String,
    pub author: Option<String>,
    pub rating: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamContent {
    pub heading: Option<String>,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    pub role: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqContent {
    pub heading: Option<String>,
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFormContent {
    pub heading: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub success_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToActionContent {
    pub heading: String,
    pub body: Option<String>,
    pub button_label: String,
    pub button_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapContent {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialFeedContent {
    pub platform: String,
    pub handle: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividerContent {
    pub style: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoColumnContent {
    pub left: Column,
    pub right: Column,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub heading: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursesContent {
    pub heading: Option<String>,
    pub courses: Vec<CourseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineLifeContent {
    pub heading: Option<String>,
    pub species: Vec<SpeciesItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesItem {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub season: Option<String>,
}

// ── Schema registry ─────────────────────────────────────────────────────────

/// One registered block schema: human-readable description for prompts plus
/// the validation gate.
pub struct BlockSchema {
    pub kind: BlockType,
    pub description: &'static str,
    validate_fn: fn(&Value) -> Result<(), String>,
}

impl BlockSchema {
    /// The authoritative gate: a candidate either passes or is discarded.
    pub fn validate(&self, content: &Value) -> Result<(), String> {
        (self.validate_fn)(content)
    }
}

fn typed<T: for<'de> Deserialize<'de>>(value: &Value) -> Result<T, String> {
    serde_json::from_value::<T>(value.clone()).map_err(|e| e.to_string())
}

fn non_empty<T>(items: &[T], field: &str) -> Result<(), String> {
    if items.is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

static SCHEMAS: &[BlockSchema] = &[
    BlockSchema {
        kind: BlockType::Hero,
        description: "Large banner at the top of a page: headline, optional subheading, background image, and a call-to-action button.",
        validate_fn: |v| typed::<HeroContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Text,
        description: "A prose block: optional heading plus body text. Used for about, services, and generic copy.",
        validate_fn: |v| typed::<TextContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Image,
        description: "A single image with optional alt text and caption.",
        validate_fn: |v| typed::<ImageContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Gallery,
        description: "A photo gallery: a list of images, each with a URL and optional alt text.",
        validate_fn: |v| {
            let c = typed::<GalleryContent>(v)?;
            non_empty(&c.images, "images")
        },
    },
    BlockSchema {
        kind: BlockType::Testimonials,
        description: "Customer testimonials: a list of quotes with optional author and star rating.",
        validate_fn: |v| {
            let c = typed::<TestimonialsContent>(v)?;
            non_empty(&c.testimonials, "testimonials")
        },
    },
    BlockSchema {
        kind: BlockType::Team,
        description: "Team/staff roster: members with name, optional role, photo and bio.",
        validate_fn: |v| {
            let c = typed::<TeamContent>(v)?;
            non_empty(&c.members, "members")
        },
    },
    BlockSchema {
        kind: BlockType::Faq,
        description: "Frequently asked questions: a list of question/answer pairs.",
        validate_fn: |v| {
            let c = typed::<FaqContent>(v)?;
            non_empty(&c.items, "items")
        },
    },
    BlockSchema {
        kind: BlockType::ContactForm,
        description: "Contact section: optional heading, email, phone, and address shown next to an enquiry form.",
        validate_fn: |v| typed::<ContactFormContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::CallToAction,
        description: "Conversion banner: heading, optional body, and a labelled button.",
        validate_fn: |v| typed::<CallToActionContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Video,
        description: "An embedded video by URL with optional caption.",
        validate_fn: |v| typed::<VideoContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Map,
        description: "A location map: address and/or latitude+longitude coordinates.",
        validate_fn: |v| {
            let c = typed::<MapContent>(v)?;
            let has_coords = c.lat.is_some() && c.lng.is_some();
            if c.address.is_none() && !has_coords {
                Err("map needs an address or lat+lng".to_string())
            } else {
                Ok(())
            }
        },
    },
    BlockSchema {
        kind: BlockType::SocialFeed,
        description: "Embedded social feed: platform name plus profile handle or URL.",
        validate_fn: |v| typed::<SocialFeedContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Divider,
        description: "A visual divider between sections, with an optional style name.",
        validate_fn: |v| typed::<DividerContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::TwoColumn,
        description: "Two side-by-side columns, each with optional heading, body, and image.",
        validate_fn: |v| typed::<TwoColumnContent>(v).map(|_| ()),
    },
    BlockSchema {
        kind: BlockType::Courses,
        description: "Dive course catalogue: a list of courses with name and optional description, price, duration, and certification level.",
        validate_fn: |v| {
            let c = typed::<CoursesContent>(v)?;
            non_empty(&c.courses, "courses")
        },
    },
    BlockSchema {
        kind: BlockType::MarineLife,
        description: "Marine life showcase: species seen at the dive sites, with optional description, image, and season.",
        validate_fn: |v| {
            let c = typed::<MarineLifeContent>(v)?;
            non_empty(&c.species, "species")
        },
    },
];

/// Look up the schema for a block type. Every `BlockType` variant is
/// registered, so this never fails.
pub fn schema_for(kind: BlockType) -> &'static BlockSchema {
    SCHEMAS
        .iter()
        .find(|s| s.kind == kind)
        .expect("every block type has a registered schema")
}

/// All registered schemas, for enumerating block descriptions in prompts.
pub fn all_schemas() -> &'static [BlockSchema] {
    SCHEMAS
}

/// Derive prompt field hints by probing the validator with an empty object:
/// each reported `missing field` becomes a hint and gets a placeholder
/// value; `invalid type` errors rotate the placeholder until the probe
/// stalls or passes. Bounded, deterministic, and always in sync with the
/// actual schema.
pub fn field_hints(kind: BlockType) -> Vec<String> {
    let schema = schema_for(kind);
    let defaults = [json!(""), json!([]), json!({}), json!(0), json!(false)];

    let mut obj = serde_json::Map::new();
    let mut hints: Vec<String> = Vec::new();
    let mut last_field: Option<String> = None;
    let mut default_idx = 0usize;

    for _ in 0..64 {
        match schema.validate(&Value::Object(obj.clone())) {
            Ok(()) => break,
            Err(msg) => {
                if let Some(field) = parse_missing_field(&msg) {
                    if hints.contains(&field) {
                        break;
                    }
                    hints.push(field.clone());
                    obj.insert(field.clone(), defaults[0].clone());
                    last_field = Some(field);
                    default_idx = 0;
                } else if let Some(field) = last_field.clone() {
                    default_idx += 1;
                    if default_idx >= defaults.len() {
                        break;
                    }
                    obj.insert(field, defaults[default_idx].clone());
                } else {
                    break;
                }
            }
        }
    }

    hints
}

/// Pull the field name out of serde's "missing field `x`" message.
fn parse_missing_field(msg: &str) -> Option<String> {
    let rest = msg.split("missing field `").nth(1)?;
    let name = rest.split('`').next()?;
    (!name.is_empty()).then(|| name.to_string())
}
