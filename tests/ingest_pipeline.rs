//! End-to-end pipeline tests with a mocked browser and a scripted LLM.

use anyhow::Result;
use async_trait::async_trait;
use moray::classify::blocks::schema_for;
use moray::classify::llm::{ChatClient, ChatMessage};
use moray::model::{BlockType, SectionKind};
use moray::pipeline::{IngestConfig, SegmentStrategy, SiteIngestor};
use moray::renderer::{RenderedPage, Renderer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Home-page fixture: one JSON-LD Organization, one hero section with an
/// <h1>, and a stylesheet link.
fn fixture_html(base: &str) -> String {
    format!(
        r##"<!doctype html>
<html>
<head>
  <title>Blue Divers — Dive Center</title>
  <meta name="description" content="PADI courses and daily boat trips" />
  <link rel="stylesheet" href="{base}/css/site.css" />
  <link rel="icon" href="/favicon.ico" />
  <script type="application/ld+json">
  {{"@type": "Organization", "name": "Blue Divers", "telephone": "+1-555-0100"}}
  </script>
</head>
<body>
  <header><nav><a href="/">Home</a><a href="/courses">Courses</a></nav></header>
  <section class="hero">
    <h1>Dive Into Adventure</h1>
    <p>Daily boat trips to the reef.</p>
  </section>
  <footer><a href="https://instagram.com/bluedivers">Instagram</a></footer>
</body>
</html>"##
    )
}

/// `.btn` background is the only non-excluded color on the site.
const FIXTURE_CSS: &str = ".btn { background: #2563eb; color: #fff; } body { background: #ffffff; }";

struct MockRenderer {
    html: String,
    css_urls: Vec<String>,
    final_url: String,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage> {
        Ok(RenderedPage {
            final_url: self.final_url.clone(),
            html: self.html.clone(),
            css_urls: self.css_urls.clone(),
            screenshot: Some("data:image/png;base64,aGVsbG8=".to_string()),
            load_time_ms: 120,
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted LLM: answers segmentation and conversion prompts differently,
/// counting calls.
struct ScriptedChat {
    segmentation_reply: String,
    conversion_reply: String,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        if system.contains("segment") {
            Ok(self.segmentation_reply.clone())
        } else {
            Ok(self.conversion_reply.clone())
        }
    }
}

struct FailingChat;

#[async_trait]
impl ChatClient for FailingChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(anyhow::anyhow!("LLM endpoint unreachable"))
    }
}

/// Start a server covering discovery (robots/sitemap 404, home page served)
/// and the fixture stylesheet.
async fn fixture_server() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture_html(&base)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Courses</h1>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/css")
                .set_body_string(FIXTURE_CSS),
        )
        .mount(&server)
        .await;
    server
}

fn mock_renderer(server: &MockServer, closed: Arc<AtomicBool>) -> MockRenderer {
    let base = server.uri();
    MockRenderer {
        html: fixture_html(&base),
        css_urls: vec![format!("{base}/css/site.css")],
        final_url: format!("{base}/"),
        closed,
    }
}

fn test_config(debug_dir: Option<std::path::PathBuf>) -> IngestConfig {
    IngestConfig {
        max_pages: 5,
        debug_dir,
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn end_to_end_fixture_site() {
    let server = fixture_server().await;
    let target = format!("{}/", server.uri());
    let closed = Arc::new(AtomicBool::new(false));

    let chat = ScriptedChat {
        segmentation_reply: r#"{"sections": [
            {"type": "nav", "title": "Navigation", "confidence": 0.95},
            {"type": "hero", "title": "Dive Into Adventure",
             "contentText": "Daily boat trips to the reef.",
             "images": [], "confidence": 0.9,
             "rationale": "full-width banner with the page h1"}
        ]}"#
        .to_string(),
        conversion_reply:
            r#"{"heading": "Dive Into Adventure", "subheading": "Daily boat trips to the reef."}"#
                .to_string(),
        calls: AtomicUsize::new(0),
    };

    let snapshot_dir = tempfile::tempdir().unwrap();
    let ingestor = SiteIngestor::new(
        Arc::new(mock_renderer(&server, Arc::clone(&closed))),
        Some(Arc::new(chat)),
        test_config(Some(snapshot_dir.path().to_path_buf())),
    );

    let scrape = ingestor.scrape_site(&target).await.expect("run succeeds");

    // Business profile from JSON-LD.
    let business = scrape.business.as_ref().expect("business extracted");
    assert_eq!(business.name.as_deref(), Some("Blue Divers"));
    assert_eq!(business.phone_number.as_deref(), Some("+1-555-0100"));
    assert_eq!(
        business.social.instagram.as_deref(),
        Some("https://instagram.com/bluedivers")
    );

    // Palette: #2563eb is the only qualifying color.
    assert_eq!(scrape.colors.primary.as_deref(), Some("#2563eb"));
    assert!(!scrape.colors.palette.iter().any(|c| c == "#fff" || c == "#ffffff"));

    // Sections and blocks.
    let page = &scrape.pages[0];
    assert!(page.sections.iter().any(|s| s.kind == SectionKind::Hero));
    assert_eq!(page.block_candidates.len(), 1);
    let candidate = &page.block_candidates[0];
    assert_eq!(candidate.block.kind, BlockType::Hero);
    assert_eq!(candidate.confidence, 0.9);
    assert!(schema_for(BlockType::Hero)
        .validate(&candidate.block.content)
        .is_ok());
    assert_eq!(page.ai.as_ref().unwrap().llm_blocks, 1);

    // Downstream projection carries the same facts.
    let import = scrape.to_shop_import();
    assert_eq!(import.name.as_deref(), Some("Blue Divers"));
    assert_eq!(import.primary_color.as_deref(), Some("#2563eb"));

    // Debug snapshots: full, llm, leftover.
    let mut files: Vec<_> = std::fs::read_dir(snapshot_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files.len(), 3);
    assert!(files.iter().any(|f| f.ends_with("-llm.json")));
    assert!(files.iter().any(|f| f.ends_with("-leftover.json")));

    // Browser released at the end of the run.
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn llm_total_failure_degrades_to_empty_blocks() {
    let server = fixture_server().await;
    let target = format!("{}/", server.uri());
    let closed = Arc::new(AtomicBool::new(false));

    let ingestor = SiteIngestor::new(
        Arc::new(mock_renderer(&server, Arc::clone(&closed))),
        Some(Arc::new(FailingChat)),
        test_config(None),
    );

    let scrape = ingestor
        .scrape_site(&target)
        .await
        .expect("pipeline must survive a dead LLM");

    let page = &scrape.pages[0];
    assert!(page.block_candidates.is_empty());
    assert!(page.sections.is_empty());
    // Non-LLM signals are unaffected.
    assert_eq!(
        scrape.business.as_ref().unwrap().name.as_deref(),
        Some("Blue Divers")
    );
    assert_eq!(scrape.colors.primary.as_deref(), Some("#2563eb"));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn heuristic_strategy_segments_without_llm() {
    let server = fixture_server().await;
    let target = format!("{}/", server.uri());
    let closed = Arc::new(AtomicBool::new(false));

    let config = IngestConfig {
        strategy: SegmentStrategy::Heuristic,
        ..test_config(None)
    };
    let ingestor = SiteIngestor::new(
        Arc::new(mock_renderer(&server, Arc::clone(&closed))),
        None,
        config,
    );

    let scrape = ingestor.scrape_site(&target).await.unwrap();
    let page = &scrape.pages[0];
    assert!(page.sections.iter().any(|s| s.kind == SectionKind::Hero));
    assert!(page.sections.iter().any(|s| s.kind == SectionKind::Nav));
    // No chat client — sections are recorded but nothing converts.
    assert!(page.block_candidates.is_empty());
    assert!(page.ai.is_none());
}

#[tokio::test]
async fn invalid_llm_content_never_surfaces() {
    let server = fixture_server().await;
    let target = format!("{}/", server.uri());
    let closed = Arc::new(AtomicBool::new(false));

    // Segmentation works, but the conversion reply fails the hero schema
    // (heading must be a string).
    let chat = ScriptedChat {
        segmentation_reply: r#"{"sections": [
            {"type": "hero", "title": "Dive Into Adventure", "confidence": 0.9}
        ]}"#
        .to_string(),
        conversion_reply: r#"{"heading": 12345}"#.to_string(),
        calls: AtomicUsize::new(0),
    };

    let ingestor = SiteIngestor::new(
        Arc::new(mock_renderer(&server, Arc::clone(&closed))),
        Some(Arc::new(chat)),
        test_config(None),
    );

    let scrape = ingestor.scrape_site(&target).await.unwrap();
    let page = &scrape.pages[0];
    assert_eq!(page.sections.len(), 1);
    assert!(page.block_candidates.is_empty());
}

#[tokio::test]
async fn sitemap_urls_populate_site_tree() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<urlset>
                 <url><loc>{base}/</loc></url>
                 <url><loc>{base}/courses</loc></url>
                 <url><loc>{base}/about</loc></url>
               </urlset>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE_CSS))
        .mount(&server)
        .await;

    let target = format!("{base}/");
    let closed = Arc::new(AtomicBool::new(false));
    let ingestor = SiteIngestor::new(
        Arc::new(mock_renderer(&server, Arc::clone(&closed))),
        None,
        test_config(None),
    );

    let scrape = ingestor.scrape_site(&target).await.unwrap();
    assert_eq!(scrape.sitemap_xml_urls, vec![format!("{base}/sitemap.xml")]);
    let root = &scrape.sitemap[0];
    let child_titles: Vec<_> = root
        .children
        .iter()
        .filter_map(|c| c.title.as_deref())
        .collect();
    assert!(child_titles.contains(&"Courses"));
    assert!(child_titles.contains(&"About"));
    // Single-page mode: many URLs discovered, one page processed.
    assert_eq!(scrape.pages.len(), 1);
}
