use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LOC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<loc>\s*([^<]+)\s*</loc>").unwrap());

/// Extract `<loc>` URLs from a sitemap or sitemap-index document
/// (spec §4.4: URLs discovered via sitemap get priority 10).
pub fn parse_sitemap(body: &str) -> Vec<Url> {
    LOC_RE
        .captures_iter(body)
        .filter_map(|cap| Url::parse(cap[1].trim()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_loc_entries() {
        let xml = r#"<urlset><url><loc>https://example.com/a</loc></url><url><loc>https://example.com/b</loc></url></urlset>"#;
        let urls = parse_sitemap(xml);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "https://example.com/a");
    }

    #[test]
    fn ignores_malformed_entries() {
        let xml = "<urlset><url><loc>not a url</loc></url></urlset>";
        assert!(parse_sitemap(xml).is_empty());
    }
}
