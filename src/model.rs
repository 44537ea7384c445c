//! Core data model for one ingestion run.
//!
//! Everything here is created and fully assembled inside a single
//! `scrape_site` call and never mutated afterwards. The wire names are
//! camelCase because the aggregate is the contract the rest of the product
//! (shop/page/block persistence) consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root aggregate of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteScrape {
    pub target_url: String,
    pub crawled_at: DateTime<Utc>,
    pub colors: ColorPalette,
    pub fonts: Fonts,
    pub business: Option<BusinessProfile>,
    /// URL tree of the discovered site structure.
    pub sitemap: Vec<SiteMapNode>,
    pub pages: Vec<ScrapedPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt: Option<String>,
    pub sitemap_xml_urls: Vec<String>,
    /// Non-fatal failures collected along the way.
    pub errors: Vec<String>,
    /// First few CSS blobs that fed the style analyzer, for offline debugging.
    pub render_css_sample: Vec<String>,
}

/// Frequency-ranked colors reduced to named slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub background: Option<String>,
    pub accent: Option<String>,
    /// Full ranked list, most frequent first.
    pub palette: Vec<String>,
}

/// Font families mined from stylesheets, plus where they came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fonts {
    pub heading: Option<String>,
    pub body: Option<String>,
    pub families: Vec<String>,
    pub sources: Vec<String>,
}

/// Best-effort business identity record, built once from the home page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub opening_hours: Vec<String>,
    pub geo: Option<GeoPoint>,
    pub social: SocialLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub youtube: Option<String>,
    pub tiktok: Option<String>,
    pub linkedin: Option<String>,
    pub whatsapp: Option<String>,
}

/// One node of the discovered URL tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMapNode {
    pub url: String,
    pub title: Option<String>,
    pub children: Vec<SiteMapNode>,
}

/// One crawled/rendered URL, immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedPage {
    pub url: String,
    pub slug: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub text: Option<String>,
    pub sections: Vec<PageSection>,
    pub block_candidates: Vec<LlmBlockCandidate>,
    pub images: Vec<ImageAsset>,
    pub seo: SeoMeta,
    pub render: Option<RenderStats>,
    pub ai: Option<PageAi>,
}

/// Summary of the LLM's contribution to one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAi {
    pub llm_blocks: u32,
    pub notes: Option<String>,
    pub confidence: Option<f32>,
}

/// Render outcome bookkeeping for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub final_url: String,
    pub load_time_ms: u64,
    pub stylesheet_count: usize,
}

/// A semantic region of a scraped page, prior to block classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSection {
    pub kind: SectionKind,
    pub selector: Option<String>,
    pub heading: Option<String>,
    pub text_sample: Option<String>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Fixed section-type vocabulary. Anything unrecognized maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Nav,
    Hero,
    About,
    Services,
    Courses,
    Gallery,
    Testimonials,
    Faq,
    Team,
    Contact,
    Map,
    Cta,
    Footer,
    Text,
    Image,
    Unknown,
}

impl SectionKind {
    /// Parse a section-type label, falling back to `Unknown` rather than
    /// dropping the section.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "nav" | "navigation" | "header" => Self::Nav,
            "hero" | "banner" => Self::Hero,
            "about" => Self::About,
            "services" | "service" => Self::Services,
            "courses" | "course" | "training" => Self::Courses,
            "gallery" | "portfolio" => Self::Gallery,
            "testimonials" | "testimonial" | "reviews" => Self::Testimonials,
            "faq" | "faqs" => Self::Faq,
            "team" | "staff" => Self::Team,
            "contact" => Self::Contact,
            "map" | "location" => Self::Map,
            "cta" | "call-to-action" => Self::Cta,
            "footer" => Self::Footer,
            "text" => Self::Text,
            "image" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Target block type when this section is converted, if any.
    pub fn block_type(&self) -> Option<BlockType> {
        match self {
            Self::Hero => Some(BlockType::Hero),
            Self::About | Self::Services | Self::Text => Some(BlockType::Text),
            Self::Courses => Some(BlockType::Courses),
            Self::Gallery => Some(BlockType::Gallery),
            Self::Testimonials => Some(BlockType::Testimonials),
            Self::Faq => Some(BlockType::Faq),
            Self::Team => Some(BlockType::Team),
            Self::Contact => Some(BlockType::ContactForm),
            Self::Map => Some(BlockType::Map),
            Self::Cta => Some(BlockType::CallToAction),
            Self::Image => Some(BlockType::Image),
            Self::Nav | Self::Footer | Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Nav => "nav",
            Self::Hero => "hero",
            Self::About => "about",
            Self::Services => "services",
            Self::Courses => "courses",
            Self::Gallery => "gallery",
            Self::Testimonials => "testimonials",
            Self::Faq => "faq",
            Self::Team => "team",
            Self::Contact => "contact",
            Self::Map => "map",
            Self::Cta => "cta",
            Self::Footer => "footer",
            Self::Text => "text",
            Self::Image => "image",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Typed content-block vocabulary the builder can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Hero,
    Text,
    Image,
    Gallery,
    Testimonials,
    Team,
    Faq,
    ContactForm,
    CallToAction,
    Video,
    Map,
    SocialFeed,
    Divider,
    TwoColumn,
    Courses,
    MarineLife,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hero => "hero",
            Self::Text => "text",
            Self::Image => "image",
            Self::Gallery => "gallery",
            Self::Testimonials => "testimonials",
            Self::Team => "team",
            Self::Faq => "faq",
            Self::ContactForm => "contact-form",
            Self::CallToAction => "call-to-action",
            Self::Video => "video",
            Self::Map => "map",
            Self::SocialFeed => "social-feed",
            Self::Divider => "divider",
            Self::TwoColumn => "two-column",
            Self::Courses => "courses",
            Self::MarineLife => "marine-life",
        };
        write!(f, "{s}")
    }
}

/// A proposed block that has passed schema validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCandidate {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_section: Option<SectionKind>,
}

/// A block candidate plus the classifier's advisory confidence.
///
/// Confidence is carried through unchanged; nothing branches on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmBlockCandidate {
    #[serde(flatten)]
    pub block: BlockCandidate,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// An image found on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub url: String,
    pub alt: Option<String>,
    /// Where the asset came from: "img" or "css-background".
    pub source: String,
}

/// SEO metadata pulled from a rendered page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub og: OpenGraphMeta,
    pub twitter: TwitterMeta,
    /// `@type` values of every JSON-LD object found on the page.
    pub jsonld_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraphMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    pub site_name: Option<String>,
    #[serde(rename = "type")]
    pub og_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterMeta {
    pub card: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Flat projection the shop/page persistence layer imports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopImport {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub whatsapp_url: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub images: Vec<String>,
    pub pages: Vec<ShopImportPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopImportPage {
    pub title: Option<String>,
    pub url: String,
    pub content: Option<String>,
}

impl SiteScrape {
    /// Final contract gate. A malformed aggregate must fail loudly here —
    /// everything downstream depends on this shape.
    pub fn validate(&self) -> Result<(), crate::error::IngestError> {
        let parsed = url::Url::parse(&self.target_url).map_err(|e| {
            crate::error::IngestError::InvalidAggregate(format!(
                "targetUrl is not an absolute URL: {e}"
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::error::IngestError::InvalidAggregate(format!(
                "targetUrl has unsupported scheme {}",
                parsed.scheme()
            )));
        }
        for page in &self.pages {
            if page.slug.is_empty() {
                return Err(crate::error::IngestError::InvalidAggregate(format!(
                    "page {} has an empty slug",
                    page.url
                )));
            }
            for candidate in &page.block_candidates {
                let schema = crate::classify::blocks::schema_for(candidate.block.kind);
                schema.validate(&candidate.block.content).map_err(|e| {
                    crate::error::IngestError::InvalidAggregate(format!(
                        "block candidate {} on {} fails its schema: {e}",
                        candidate.block.kind, page.url
                    ))
                })?;
                if !(0.0..=1.0).contains(&candidate.confidence) {
                    return Err(crate::error::IngestError::InvalidAggregate(format!(
                        "block candidate {} on {} has confidence {} outside [0,1]",
                        candidate.block.kind, page.url, candidate.confidence
                    )));
                }
            }
        }
        Ok(())
    }

    /// Derive the flat record the shop importer consumes.
    pub fn to_shop_import(&self) -> ShopImport {
        let business = self.business.clone().unwrap_or_default();
        let description = business.description.clone().or_else(|| {
            self.pages
                .first()
                .and_then(|p| p.seo.description.clone().or_else(|| p.seo.og.description.clone()))
        });

        let mut images = Vec::new();
        for page in &self.pages {
            for asset in &page.images {
                if !images.contains(&asset.url) {
                    images.push(asset.url.clone());
                }
            }
        }

        ShopImport {
            name: business.name,
            description,
            address: business.address,
            phone_number: business.phone_number,
            email: business.email,
            facebook_url: business.social.facebook,
            instagram_url: business.social.instagram,
            whatsapp_url: business.social.whatsapp,
            logo_url: business.logo_url,
            favicon_url: business.favicon_url,
            primary_color: self.colors.primary.clone(),
            secondary_color: self.colors.secondary.clone(),
            accent_color: self.colors.accent.clone(),
            images,
            pages: self
                .pages
                .iter()
                .map(|p| ShopImportPage {
                    title: p.title.clone(),
                    url: p.url.clone(),
                    content: p.text.clone(),
                })
                .collect(),
        }
    }
}

/// Derive a URL's page slug: last non-empty path segment, or "home".
pub fn slug_for_url(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let slug: String = path
        .split('/')
        .rev()
        .find(|seg| !seg.is_empty())
        .unwrap_or("home")
        .trim_end_matches(".html")
        .to_lowercase();
    if slug.is_empty() {
        "home".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_kind_parse_fallback() {
        assert_eq!(SectionKind::parse("hero"), SectionKind::Hero);
        assert_eq!(SectionKind::parse("TESTIMONIALS"), SectionKind::Testimonials);
        assert_eq!(SectionKind::parse("pricing-table"), SectionKind::Unknown);
        assert_eq!(SectionKind::parse(""), SectionKind::Unknown);
    }

    #[test]
    fn test_block_type_wire_names() {
        let json = serde_json::to_string(&BlockType::ContactForm).unwrap();
        assert_eq!(json, "\"contact-form\"");
        let json = serde_json::to_string(&BlockType::CallToAction).unwrap();
        assert_eq!(json, "\"call-to-action\"");
        let back: BlockType = serde_json::from_str("\"marine-life\"").unwrap();
        assert_eq!(back, BlockType::MarineLife);
    }

    #[test]
    fn test_slug_for_url() {
        assert_eq!(slug_for_url("https://example.com/"), "home");
        assert_eq!(slug_for_url("https://example.com/about"), "about");
        assert_eq!(slug_for_url("https://example.com/courses/open-water.html"), "open-water");
        assert_eq!(slug_for_url("https://example.com/Contact/"), "contact");
    }

    #[test]
    fn test_nav_and_footer_have_no_block_mapping() {
        assert!(SectionKind::Nav.block_type().is_none());
        assert!(SectionKind::Footer.block_type().is_none());
        assert!(SectionKind::Unknown.block_type().is_none());
        assert_eq!(SectionKind::Contact.block_type(), Some(BlockType::ContactForm));
    }

    #[test]
    fn test_shop_import_projection() {
        let scrape = SiteScrape {
            target_url: "https://bluedivers.example".into(),
            crawled_at: Utc::now(),
            colors: ColorPalette {
                primary: Some("#2563eb".into()),
                secondary: Some("#111827".into()),
                accent: None,
                background: None,
                palette: vec!["#2563eb".into(), "#111827".into()],
            },
            fonts: Fonts::default(),
            business: Some(BusinessProfile {
                name: Some("Blue Divers".into()),
                phone_number: Some("+1-555-0100".into()),
                social: SocialLinks {
                    instagram: Some("https://instagram.com/bluedivers".into()),
                    ..Default::default()
                },
                ..Default::default()
            }),
            sitemap: Vec::new(),
            pages: vec![ScrapedPage {
                url: "https://bluedivers.example/".into(),
                slug: "home".into(),
                title: Some("Blue Divers".into()),
                html: None,
                text: Some("Dive with us".into()),
                sections: Vec::new(),
                block_candidates: Vec::new(),
                images: vec![ImageAsset {
                    url: "https://bluedivers.example/hero.jpg".into(),
                    alt: None,
                    source: "img".into(),
                }],
                seo: SeoMeta::default(),
                render: None,
                ai: None,
            }],
            robots_txt: None,
            sitemap_xml_urls: Vec::new(),
            errors: Vec::new(),
            render_css_sample: Vec::new(),
        };

        let import = scrape.to_shop_import();
        assert_eq!(import.name.as_deref(), Some("Blue Divers"));
        assert_eq!(import.phone_number.as_deref(), Some("+1-555-0100"));
        assert_eq!(import.primary_color.as_deref(), Some("#2563eb"));
        assert_eq!(import.images, vec!["https://bluedivers.example/hero.jpg"]);
        assert_eq!(import.pages.len(), 1);
        assert_eq!(import.pages[0].content.as_deref(), Some("Dive with us"));
    }

    #[test]
    fn test_validate_rejects_relative_target() {
        let scrape = SiteScrape {
            target_url: "/not-absolute".into(),
            crawled_at: Utc::now(),
            colors: ColorPalette::default(),
            fonts: Fonts::default(),
            business: None,
            sitemap: Vec::new(),
            pages: Vec::new(),
            robots_txt: None,
            sitemap_xml_urls: Vec::new(),
            errors: Vec::new(),
            render_css_sample: Vec::new(),
        };
        assert!(scrape.validate().is_err());
    }
}
