use url::Url;

use crate::error::CrawlError;

/// Canonicalize a user-supplied URL string, a bare host, or a relative
/// href resolved against `base` (spec §4.1).
///
/// - Adds `https://` when the scheme is missing and the input isn't a
///   relative path (i.e. no `base` given, or the input looks absolute).
/// - Resolves relative hrefs against `base`.
/// - Lowercases scheme and host.
/// - Strips the fragment.
/// - Rejects non-HTTP(S) schemes and hosts without a dot (except
///   `localhost`).
pub fn normalize(input: &str, base: Option<&Url>) -> Result<Url, CrawlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CrawlError::InvalidUrl("empty URL".to_string()));
    }

    let mut url = if let Some(base) = base {
        match base.join(trimmed) {
            Ok(u) => u,
            Err(e) => return Err(CrawlError::InvalidUrl(format!("{trimmed}: {e}"))),
        }
    } else {
        parse_absolute(trimmed)?
    };

    lowercase_authority(&mut url);
    url.set_fragment(None);

    validate(&url)?;
    Ok(url)
}

fn parse_absolute(input: &str) -> Result<Url, CrawlError> {
    if let Ok(url) = Url::parse(input) {
        return Ok(url);
    }
    let with_scheme = format!("https://{input}");
    Url::parse(&with_scheme).map_err(|e| CrawlError::InvalidUrl(format!("{input}: {e}")))
}

fn lowercase_authority(url: &mut Url) {
    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            let _ = url.set_host(Some(&lowered));
        }
    }
    let scheme = url.scheme().to_string();
    let lowered_scheme = scheme.to_lowercase();
    if lowered_scheme != scheme {
        let _ = url.set_scheme(&lowered_scheme);
    }
}

fn validate(url: &Url) -> Result<(), CrawlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CrawlError::InvalidUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| CrawlError::InvalidUrl("missing host".to_string()))?;
    if host != "localhost" && !host.contains('.') {
        return Err(CrawlError::InvalidUrl(format!("host has no dot: {host}")));
    }
    Ok(())
}

/// Strip the query string for use as the duplicate filter's fingerprint
/// (spec §4.2's default fingerprint).
pub fn dedup_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_query(None);
    let path = key.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        key.set_path(&path[..path.len() - 1]);
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_scheme_to_bare_host() {
        let url = normalize("example.com", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn lowercases_scheme_and_host() {
        let url = normalize("HTTPS://EXAMPLE.com/Feed.xml", None).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/Feed.xml");
    }

    #[test]
    fn strips_fragment() {
        let url = normalize("https://example.com/page#section", None).unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn resolves_relative_against_base() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let url = normalize("../feed.xml", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/feed.xml");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(normalize("mailto:a@b.com", None).is_err());
    }

    #[test]
    fn rejects_dotless_host() {
        assert!(normalize("https://localhost2/", None).is_err());
    }

    #[test]
    fn allows_localhost() {
        assert!(normalize("http://localhost:8080/feed", None).is_ok());
    }

    #[test]
    fn dedup_key_strips_query_and_trailing_slash() {
        let url = normalize("https://example.com/feed?x=1", None).unwrap();
        assert_eq!(dedup_key(&url), "https://example.com/feed");
    }
}
