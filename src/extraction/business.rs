//! Business identity extraction from a rendered home page.
//!
//! Each field is resolved independently through a first-non-empty-wins
//! precedence chain: JSON-LD structured data, then meta tags, then
//! heuristic anchor scraping.

use super::page::jsonld_blocks;
use crate::model::{BusinessProfile, GeoPoint, SocialLinks};
use scraper::{Html, Selector};
use serde_json::Value;

/// Assemble a best-effort business profile from rendered HTML.
pub fn extract_business(html: &str, origin_url: &str) -> BusinessProfile {
    let document = Html::parse_document(html);
    let org = find_organization(&document);
    let org = org.as_ref();

    let resolve = |raw: &str| -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        url::Url::parse(origin_url)
            .ok()
            .and_then(|base| base.join(raw).ok())
            .map(|u| u.to_string())
            .or_else(|| Some(raw.to_string()))
    };

    let name = org
        .and_then(|o| str_field(o, "name"))
        .or_else(|| meta_property(&document, "og:site_name"))
        .or_else(|| meta_property(&document, "og:title"))
        .or_else(|| title_text(&document));

    let description = org
        .and_then(|o| str_field(o, "description"))
        .or_else(|| meta_name(&document, "description"))
        .or_else(|| meta_property(&document, "og:description"));

    let address = org.and_then(structured_address);

    let phone_number = org
        .and_then(|o| str_field(o, "telephone"))
        .or_else(|| first_anchor_scheme(&document, "tel:"));

    let email = org
        .and_then(|o| str_field(o, "email"))
        .or_else(|| first_anchor_scheme(&document, "mailto:"));

    let logo_url = org
        .and_then(jsonld_logo)
        .and_then(|u| resolve(&u))
        .or_else(|| favicon_href(&document).and_then(|u| resolve(&u)));

    let favicon_url = favicon_href(&document).and_then(|u| resolve(&u));

    let website_url = org
        .and_then(|o| str_field(o, "url"))
        .or_else(|| {
            let sel = Selector::parse(r#"link[rel="canonical"]"#).unwrap();
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(|s| s.to_string())
        })
        .or_else(|| Some(origin_url.to_string()));

    let opening_hours = org.map(opening_hours).unwrap_or_default();
    let geo = org.and_then(geo_point);
    let social = social_links(&document);

    BusinessProfile {
        name,
        description,
        website_url,
        logo_url,
        favicon_url,
        phone_number,
        email,
        address,
        opening_hours,
        geo,
        social,
    }
}

/// First JSON-LD object whose `@type` matches Organization or LocalBusiness
/// (case-insensitive; string or array form). Arrays and `@graph` wrappers
/// are flattened one level.
fn find_organization(document: &Html) -> Option<Value> {
    let mut candidates: Vec<Value> = Vec::new();
    for block in jsonld_blocks(document) {
        match block {
            Value::Array(items) => candidates.extend(items),
            other => {
                if let Some(Value::Array(graph)) = other.get("@graph") {
                    candidates.extend(graph.clone());
                }
                candidates.push(other);
            }
        }
    }

    candidates.into_iter().find(|c| {
        let matches = |t: &str| {
            let t = t.to_lowercase();
            t.contains("organization") || t.contains("localbusiness")
        };
        match c.get("@type") {
            Some(Value::String(t)) => matches(t),
            Some(Value::Array(ts)) => ts.iter().filter_map(|t| t.as_str()).any(matches),
            _ => false,
        }
    })
}

fn str_field(org: &Value, key: &str) -> Option<String> {
    org.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// JSON-LD address: structured `PostalAddress` joined with commas, or a
/// plain string address.
fn structured_address(org: &Value) -> Option<String> {
    let addr = org.get("address")?;
    if let Some(s) = addr.as_str() {
        let s = s.trim();
        return (!s.is_empty()).then(|| s.to_string());
    }
    let parts: Vec<String> = [
        "streetAddress",
        "addressLocality",
        "addressRegion",
        "postalCode",
        "addressCountry",
    ]
    .iter()
    .filter_map(|key| {
        addr.get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
    .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn jsonld_logo(org: &Value) -> Option<String> {
    match org.get("logo")? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Object(map) => map
            .get("url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// `openingHours` as a flat string/array, or `openingHoursSpecification`
/// entries normalized to `"<day> <opens>-<closes>"`.
fn opening_hours(org: &Value) -> Vec<String> {
    match org.get("openingHours") {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            return vec![s.trim().to_string()];
        }
        Some(Value::Array(items)) => {
            let hours: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !hours.is_empty() {
                return hours;
            }
        }
        _ => {}
    }

    let Some(Value::Array(specs)) = org.get("openingHoursSpecification") else {
        return Vec::new();
    };
    specs
        .iter()
        .filter_map(|spec| {
            let opens = spec.get("opens")?.as_str()?;
            let closes = spec.get("closes")?.as_str()?;
            let days = match spec.get("dayOfWeek") {
                Some(Value::String(d)) => vec![day_name(d)],
                Some(Value::Array(ds)) => {
                    ds.iter().filter_map(|d| d.as_str()).map(day_name).collect()
                }
                _ => vec![String::new()],
            };
            Some(
                days.into_iter()
                    .map(|day| format!("{day} {opens}-{closes}").trim().to_string())
                    .collect::<Vec<_>>(),
            )
        })
        .flatten()
        .collect()
}

/// "https://schema.org/Monday" → "Monday".
fn day_name(raw: &str) -> String {
    raw.rsplit('/').next().unwrap_or(raw).to_string()
}

fn geo_point(org: &Value) -> Option<GeoPoint> {
    let geo = org.get("geo")?;
    let coord = |key: &str| -> Option<f64> {
        let v = geo.get(key)?;
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    };
    Some(GeoPoint {
        lat: coord("latitude")?,
        lng: coord("longitude")?,
    })
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn meta_name(document: &Html, name: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn title_text(document: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn favicon_href(document: &Html) -> Option<String> {
    for rel in [
        r#"link[rel="icon"]"#,
        r#"link[rel="shortcut icon"]"#,
        r#"link[rel="apple-touch-icon"]"#,
    ] {
        let sel = Selector::parse(rel).unwrap();
        if let Some(href) = document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("href"))
        {
            return Some(href.to_string());
        }
    }
    None
}

fn first_anchor_scheme(document: &Html, scheme: &str) -> Option<String> {
    let sel = Selector::parse("a[href]").unwrap();
    document.select(&sel).find_map(|el| {
        let href = el.value().attr("href")?;
        href.strip_prefix(scheme)
            .map(|rest| rest.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Scan anchors in DOM order against fixed platform domains; first match
/// per platform wins.
fn social_links(document: &Html) -> SocialLinks {
    let sel = Selector::parse("a[href]").unwrap();
    let mut social = SocialLinks::default();

    for element in document.select(&sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(parsed) = url::Url::parse(href) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };
        let host = host.to_lowercase();
        let host_is = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        let slot = if host_is("instagram.com") {
            &mut social.instagram
        } else if host_is("facebook.com") {
            &mut social.facebook
        } else if host_is("twitter.com") || host_is("x.com") {
            &mut social.twitter
        } else if host_is("youtube.com") || host_is("youtu.be") {
            &mut social.youtube
        } else if host_is("tiktok.com") {
            &mut social.tiktok
        } else if host_is("linkedin.com") {
            &mut social.linkedin
        } else if host_is("wa.me") || host == "api.whatsapp.com" {
            &mut social.whatsapp
        } else {
            continue;
        };

        if slot.is_none() {
            *slot = Some(href.to_string());
        }
    }

    social
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://bluedivers.example";

    #[test]
    fn test_jsonld_name_beats_opengraph() {
        let html = r#"
        <html><head>
        <meta property="og:site_name" content="AcmeCo" />
        <script type="application/ld+json">
        {"@type": "Organization", "name": "Acme Corp"}
        </script>
        </head><body></body></html>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(profile.name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn test_opengraph_then_title_fallback() {
        let html = r#"
        <html><head>
        <title>Blue Divers — Home</title>
        </head><body></body></html>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(profile.name.as_deref(), Some("Blue Divers — Home"));
    }

    #[test]
    fn test_structured_address_joined() {
        let html = r#"
        <script type="application/ld+json">
        {"@type": "LocalBusiness", "name": "Blue Divers",
         "address": {"@type": "PostalAddress", "streetAddress": "12 Reef Road",
                     "addressLocality": "Key Largo", "addressRegion": "FL",
                     "postalCode": "33037", "addressCountry": "US"}}
        </script>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(
            profile.address.as_deref(),
            Some("12 Reef Road, Key Largo, FL, 33037, US")
        );
    }

    #[test]
    fn test_phone_falls_back_to_tel_anchor() {
        let html = r#"<body><a href="tel:+1-555-0100">Call us</a></body>"#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(profile.phone_number.as_deref(), Some("+1-555-0100"));
    }

    #[test]
    fn test_jsonld_telephone_beats_tel_anchor() {
        let html = r#"
        <script type="application/ld+json">
        {"@type": "LocalBusiness", "telephone": "+1-555-0100"}
        </script>
        <a href="tel:+1-555-9999">Other</a>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(profile.phone_number.as_deref(), Some("+1-555-0100"));
    }

    #[test]
    fn test_opening_hours_specification_normalized() {
        let html = r#"
        <script type="application/ld+json">
        {"@type": "LocalBusiness",
         "openingHoursSpecification": [
            {"dayOfWeek": "https://schema.org/Monday", "opens": "08:00", "closes": "17:00"},
            {"dayOfWeek": ["Saturday", "Sunday"], "opens": "09:00", "closes": "14:00"}
         ]}
        </script>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(
            profile.opening_hours,
            vec![
                "Monday 08:00-17:00",
                "Saturday 09:00-14:00",
                "Sunday 09:00-14:00"
            ]
        );
    }

    #[test]
    fn test_social_links_first_match_wins() {
        let html = r#"
        <a href="https://www.instagram.com/bluedivers">IG</a>
        <a href="https://instagram.com/other">IG2</a>
        <a href="https://www.facebook.com/bluedivers">FB</a>
        <a href="https://x.com/bluedivers">X</a>
        <a href="https://wa.me/15550100">WhatsApp</a>
        <a href="https://maxmovies.example/x.com-review">not social</a>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(
            profile.social.instagram.as_deref(),
            Some("https://www.instagram.com/bluedivers")
        );
        assert_eq!(
            profile.social.facebook.as_deref(),
            Some("https://www.facebook.com/bluedivers")
        );
        assert_eq!(profile.social.twitter.as_deref(), Some("https://x.com/bluedivers"));
        assert_eq!(profile.social.whatsapp.as_deref(), Some("https://wa.me/15550100"));
        assert_eq!(profile.social.youtube, None);
    }

    #[test]
    fn test_logo_from_jsonld_object_and_favicon_fallback() {
        let html = r#"
        <head><link rel="icon" href="/favicon.png" /></head>
        <script type="application/ld+json">
        {"@type": "Organization", "logo": {"@type": "ImageObject", "url": "/img/logo.svg"}}
        </script>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(
            profile.logo_url.as_deref(),
            Some("https://bluedivers.example/img/logo.svg")
        );
        assert_eq!(
            profile.favicon_url.as_deref(),
            Some("https://bluedivers.example/favicon.png")
        );

        let no_logo = r#"<head><link rel="icon" href="/favicon.png" /></head>"#;
        let profile = extract_business(no_logo, ORIGIN);
        assert_eq!(
            profile.logo_url.as_deref(),
            Some("https://bluedivers.example/favicon.png")
        );
    }

    #[test]
    fn test_geo_from_strings_or_numbers() {
        let html = r#"
        <script type="application/ld+json">
        {"@type": "LocalBusiness", "geo": {"latitude": "25.08", "longitude": -80.44}}
        </script>
        "#;
        let profile = extract_business(html, ORIGIN);
        let geo = profile.geo.unwrap();
        assert!((geo.lat - 25.08).abs() < 1e-9);
        assert!((geo.lng + 80.44).abs() < 1e-9);
    }

    #[test]
    fn test_website_url_defaults_to_origin() {
        let profile = extract_business("<html></html>", ORIGIN);
        assert_eq!(profile.website_url.as_deref(), Some(ORIGIN));
    }

    #[test]
    fn test_bad_jsonld_blocks_tolerated() {
        let html = r#"
        <script type="application/ld+json">{oops</script>
        <script type="application/ld+json">
        [{"@type": "WebSite"}, {"@type": ["Thing", "LocalBusiness"], "name": "Blue Divers"}]
        </script>
        "#;
        let profile = extract_business(html, ORIGIN);
        assert_eq!(profile.name.as_deref(), Some("Blue Divers"));
    }
}
