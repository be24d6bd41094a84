use scraper::{Html, Selector};
use url::Url;

/// Title, description, favicon, and OpenGraph fields pulled from an
/// origin page (spec §4.10).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMetaResult {
    pub site_name: Option<String>,
    pub description: Option<String>,
    pub favicon_url: Option<Url>,
}

pub fn extract_site_meta(html: &str, base: &Url) -> SiteMetaResult {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title").map(|el| text_of(&el));
    let og_site_name = select_attr(&document, "meta[property=\"og:site_name\"]", "content");
    let og_title = select_attr(&document, "meta[property=\"og:title\"]", "content");
    let description = select_attr(&document, "meta[name=\"description\"]", "content");

    let favicon_href = select_attr(&document, "link[rel=\"icon\"]", "href")
        .or_else(|| select_attr(&document, "link[rel=\"shortcut icon\"]", "href"));
    let favicon_url = favicon_href.and_then(|href| base.join(&href).ok());

    SiteMetaResult {
        site_name: og_site_name.or(og_title).or(title),
        description,
        favicon_url,
    }
}

fn select_first<'a>(document: &'a Html, sel: &str) -> Option<scraper::ElementRef<'a>> {
    Selector::parse(sel)
        .ok()
        .and_then(|s| document.select(&s).next())
}

fn select_attr(document: &Html, sel: &str, attr: &str) -> Option<String> {
    select_first(document, sel).and_then(|el| el.value().attr(attr).map(str::to_string))
}

fn text_of(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn extracts_title_description_and_favicon() {
        let html = r#"
            <html><head>
              <title>  My Blog  </title>
              <meta name="description" content="A blog about things">
              <link rel="icon" href="/favicon.ico">
            </head></html>
        "#;
        let meta = extract_site_meta(html, &base());
        assert_eq!(meta.site_name.as_deref(), Some("My Blog"));
        assert_eq!(meta.description.as_deref(), Some("A blog about things"));
        assert_eq!(
            meta.favicon_url.unwrap().as_str(),
            "https://example.com/favicon.ico"
        );
    }

    #[test]
    fn open_graph_site_name_takes_precedence_over_title() {
        let html = r#"
            <html><head>
              <title>Fallback Title</title>
              <meta property="og:site_name" content="OG Name">
            </head></html>
        "#;
        let meta = extract_site_meta(html, &base());
        assert_eq!(meta.site_name.as_deref(), Some("OG Name"));
    }

    #[test]
    fn shortcut_icon_used_when_icon_absent() {
        let html = r#"<link rel="shortcut icon" href="/old-favicon.png">"#;
        let meta = extract_site_meta(html, &base());
        assert_eq!(
            meta.favicon_url.unwrap().as_str(),
            "https://example.com/old-favicon.png"
        );
    }

    #[test]
    fn missing_meta_yields_none_fields() {
        let meta = extract_site_meta("<html></html>", &base());
        assert!(meta.site_name.is_none());
        assert!(meta.description.is_none());
        assert!(meta.favicon_url.is_none());
    }
}
