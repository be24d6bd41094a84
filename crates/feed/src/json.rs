use chrono::{DateTime, Utc};
use feedcrawl_core::{FeedFormat, FeedInfo};
use serde_json::Value;
use url::Url;

use crate::dates::parse_lenient;
use crate::velocity::summarize_dates;

/// Extracts the fields spec §4.9 names for the JSON Feed 1.x schema:
/// <https://www.jsonfeed.org/version/1.1/>. Assumes the caller already
/// confirmed this is a JSON Feed via [`crate::sniff`].
pub fn extract(json: &Value, feed_url: &Url) -> FeedInfo {
    let title = str_field(json, "title");
    let description = str_field(json, "description");
    let site_url = str_field(json, "home_page_url").and_then(|s| Url::parse(&s).ok());
    let self_url = str_field(json, "feed_url").and_then(|s| Url::parse(&s).ok());

    let hubs = json
        .get("hubs")
        .and_then(Value::as_array)
        .map(|hubs| {
            hubs.iter()
                .filter_map(|h| h.get("url").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let items = json.get("items").and_then(Value::as_array);
    let item_count = items.map(Vec::len).unwrap_or(0);

    let dates: Vec<DateTime<Utc>> = items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    str_field(item, "date_published")
                        .or_else(|| str_field(item, "date_modified"))
                        .and_then(|s| parse_lenient(&s))
                })
                .collect()
        })
        .unwrap_or_default();
    let (last_updated, velocity) = summarize_dates(&dates, item_count);

    let podcast = items
        .map(|items| {
            items.iter().any(|item| {
                item.get("attachments")
                    .and_then(Value::as_array)
                    .map(|atts| {
                        atts.iter().any(|a| {
                            a.get("mime_type")
                                .and_then(Value::as_str)
                                .map(|m| m.starts_with("audio/"))
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false);

    FeedInfo {
        url: feed_url.clone(),
        title,
        description,
        version: Some("json1".to_string()),
        format: FeedFormat::Json,
        hubs,
        self_url,
        site_url,
        site_name: None,
        favicon_url: None,
        favicon_data_uri: None,
        content_type: Some("application/feed+json".to_string()),
        content_length: json.to_string().len(),
        last_updated,
        item_count,
        velocity,
        podcast,
        bozo: false,
        score: 0,
    }
}

fn str_field(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_core_fields() {
        let body = json!({
            "version": "https://jsonfeed.org/version/1.1",
            "title": "My Feed",
            "home_page_url": "https://example.com/",
            "feed_url": "https://example.com/feed.json",
            "items": [
                {"id": "1", "date_published": "2024-01-01T00:00:00Z"},
                {"id": "2", "date_published": "2024-01-03T00:00:00Z"},
            ],
        });
        let url = Url::parse("https://example.com/feed.json").unwrap();
        let info = extract(&body, &url);
        assert_eq!(info.title.as_deref(), Some("My Feed"));
        assert_eq!(info.format, FeedFormat::Json);
        assert_eq!(info.item_count, 2);
        assert_eq!(
            info.site_url.unwrap().as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn detects_podcast_attachment() {
        let body = json!({
            "version": "https://jsonfeed.org/version/1.1",
            "items": [
                {"id": "1", "attachments": [{"mime_type": "audio/mpeg"}]}
            ],
        });
        let url = Url::parse("https://example.com/feed.json").unwrap();
        assert!(extract(&body, &url).podcast);
    }
}
