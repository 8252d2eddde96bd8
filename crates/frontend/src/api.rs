use reqwest::Url;
use storymap_shared::feed::MarkerFeed;

/// Resolve a feed `src` against the page URL; absolute sources pass through.
pub fn feed_url(page: &str, src: &str) -> Result<Url, String> {
    match Url::parse(src) {
        Ok(url) => Ok(url),
        Err(_) => Url::parse(page)
            .and_then(|base| base.join(src))
            .map_err(|e| format!("invalid feed url {src:?}: {e}")),
    }
}

fn page_url() -> String {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default()
}

/// Fetch and decode a `map-data` marker feed.
pub async fn fetch_feed(src: &str) -> Result<MarkerFeed, String> {
    let url = feed_url(&page_url(), src)?;
    let resp = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("feed {src} returned {}", resp.status()));
    }

    resp.json::<MarkerFeed>().await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url_relative_to_page() {
        let url = feed_url("https://maps.example.org/story/index.html?zoom=3", "data/feed.json")
            .unwrap();
        assert_eq!(url.as_str(), "https://maps.example.org/story/data/feed.json");
    }

    #[test]
    fn test_feed_url_absolute_passes_through() {
        let url = feed_url("https://maps.example.org/", "https://cdn.example.org/f.json").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/f.json");
    }

    #[test]
    fn test_feed_url_root_relative() {
        let url = feed_url("https://maps.example.org/a/b", "/feeds/x.json").unwrap();
        assert_eq!(url.as_str(), "https://maps.example.org/feeds/x.json");
    }

    #[test]
    fn test_feed_url_without_page_is_an_error() {
        assert!(feed_url("", "feed.json").is_err());
    }

    #[test]
    fn test_feed_response_deserializes() {
        let json = r#"{"markers":[{"id":"a","latitude":1.5,"longitude":2.5,"zoom":9}]}"#;
        let feed: MarkerFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.markers.len(), 1);
        assert_eq!(feed.markers[0].element_id(), "story_location-a");
        assert!(feed.markers[0].bearing.is_none());
    }
}
