//! robots.txt parsing and the `is_allowed` predicate.
//!
//! Only the pieces the crawler needs: user-agent group matching, Allow/
//! Disallow longest-prefix resolution, and `Sitemap:` directives (which are
//! global, not per-group).

/// One Allow/Disallow rule from an applicable group.
#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    path: String,
}

/// Parsed robots.txt rules, filtered to the groups that apply to us.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    rules: Vec<Rule>,
    pub sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Parse robots.txt, keeping the rules from every group whose
    /// `User-agent` is `*` or contains `ua_token` (case-insensitive).
    pub fn parse(text: &str, ua_token: &str) -> Self {
        let ua_token = ua_token.to_lowercase();
        let mut rules = Vec::new();
        let mut sitemaps = Vec::new();

        // A group is one or more User-agent lines followed by rules.
        let mut group_applies = false;
        let mut in_ua_header = false;

        for raw in text.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let agent = value.to_lowercase();
                    let matches = agent == "*" || agent.contains(&ua_token);
                    if in_ua_header {
                        group_applies |= matches;
                    } else {
                        group_applies = matches;
                        in_ua_header = true;
                    }
                }
                "allow" | "disallow" => {
                    in_ua_header = false;
                    // An empty Disallow means "everything allowed" — no rule.
                    if group_applies && !value.is_empty() {
                        rules.push(Rule {
                            allow: key == "allow",
                            path: value.to_string(),
                        });
                    }
                }
                "sitemap" => {
                    in_ua_header = false;
                    if !value.is_empty() && !sitemaps.contains(&value.to_string()) {
                        sitemaps.push(value.to_string());
                    }
                }
                _ => {
                    in_ua_header = false;
                }
            }
        }

        Self { rules, sitemaps }
    }

    /// Whether we may fetch this URL. Longest matching rule wins; Allow wins
    /// a length tie; no matching rule means allowed.
    pub fn is_allowed(&self, url: &str) -> bool {
        let path = match url::Url::parse(url) {
            Ok(u) => {
                let mut p = u.path().to_string();
                if let Some(q) = u.query() {
                    p.push('?');
                    p.push_str(q);
                }
                p
            }
            // Already a path, or unparseable — match against it directly.
            Err(_) => url.to_string(),
        };

        let mut best: Option<(&Rule, usize)> = None;
        for rule in &self.rules {
            if path.starts_with(&rule.path) {
                let len = rule.path.len();
                match best {
                    Some((b, blen)) if blen > len || (blen == len && b.allow) => {}
                    _ => best = Some((rule, len)),
                }
            }
        }
        best.map(|(r, _)| r.allow).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# dive shop robots
User-agent: *
Disallow: /admin/
Disallow: /cart
Allow: /admin/public/

User-agent: badbot
Disallow: /

Sitemap: https://example.com/sitemap.xml
Sitemap: https://example.com/sitemap-blog.xml
";

    #[test]
    fn test_disallow_and_allow_precedence() {
        let rules = RobotsRules::parse(SAMPLE, "moray");
        assert!(!rules.is_allowed("https://example.com/admin/settings"));
        assert!(rules.is_allowed("https://example.com/admin/public/page"));
        assert!(!rules.is_allowed("https://example.com/cart"));
        assert!(rules.is_allowed("https://example.com/courses"));
    }

    #[test]
    fn test_other_agent_group_ignored() {
        let rules = RobotsRules::parse(SAMPLE, "moray");
        // The badbot group's blanket Disallow must not apply to us.
        assert!(rules.is_allowed("https://example.com/"));
    }

    #[test]
    fn test_sitemap_directives_collected() {
        let rules = RobotsRules::parse(SAMPLE, "moray");
        assert_eq!(
            rules.sitemaps,
            vec![
                "https://example.com/sitemap.xml",
                "https://example.com/sitemap-blog.xml"
            ]
        );
    }

    #[test]
    fn test_specific_agent_group_applies() {
        let txt = "User-agent: moray\nDisallow: /private\n";
        let rules = RobotsRules::parse(txt, "moray");
        assert!(!rules.is_allowed("https://example.com/private/x"));
        assert!(rules.is_allowed("https://example.com/public"));
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let rules = RobotsRules::parse("", "moray");
        assert!(rules.is_allowed("https://example.com/anything"));
        let rules = RobotsRules::parse("not a robots file\n<<<>>>", "moray");
        assert!(rules.is_allowed("https://example.com/anything"));
    }
}
