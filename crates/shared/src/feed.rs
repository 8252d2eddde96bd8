use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::Attributes;
use crate::error::Result;
use crate::registry::DeclaredLocation;
use crate::url_state::format_number;

/// `{ "markers": [...] }`; each entry becomes one declared location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerFeed {
    pub markers: Vec<StoryLocation>,
}

impl MarkerFeed {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryLocation {
    pub id: Value,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    #[serde(default)]
    pub bearing: Option<f64>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_link: String,
    #[serde(default)]
    pub citation: String,
    #[serde(default)]
    pub citation_link: String,
    #[serde(default)]
    pub originator: String,
}

impl StoryLocation {
    /// Element id of the generated location.
    pub fn element_id(&self) -> String {
        let id = match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("story_location-{id}")
    }

    fn image(&self) -> Option<&str> {
        self.image_link
            .as_deref()
            .filter(|link| !link.is_empty() && *link != "NaN")
    }

    /// Popup body for this entry.
    pub fn content_html(&self) -> String {
        let image = self
            .image()
            .map(|src| {
                format!(
                    r#"<img src="{}" style="width:100%; height:auto" />"#,
                    escape_html(src)
                )
            })
            .unwrap_or_default();
        format!(
            concat!(
                "<h2>{location}</h2>{image}",
                "<h1>{title}</h1>",
                "<small>Latitude:{lat:.2}, Longitude:{lng:.2}</small>",
                r#"<p><a style="text-decoration:none;" href="{desc_link}" target="_blank"> {desc}</a></p>"#,
                r#"<cite><a href="{cite_link}">{cite}</a></cite>"#
            ),
            location = escape_html(&self.location),
            image = image,
            title = escape_html(&self.title),
            lat = self.latitude,
            lng = self.longitude,
            desc_link = escape_html(&self.description_link),
            desc = escape_html(&self.description),
            cite_link = escape_html(&self.citation_link),
            cite = escape_html(&self.citation),
        )
    }

    /// `key` is the host identity the generated element will carry.
    pub fn to_declared(&self, key: impl Into<String>) -> DeclaredLocation {
        let mut attrs = Attributes::new()
            .with("id", self.element_id())
            .with("latitude", format_number(self.latitude))
            .with("longitude", format_number(self.longitude))
            .with("zoom", format_number(self.zoom))
            .with("title", self.title.as_str())
            .with("originator", self.originator.as_str())
            .with("location_name", self.location.as_str());
        if let Some(bearing) = self.bearing {
            attrs.set("bearing", format_number(bearing));
        }
        if let Some(pitch) = self.pitch {
            attrs.set("pitch", format_number(pitch));
        }
        let mut decl = DeclaredLocation::new(key, attrs);
        decl.content_html = self.content_html();
        decl
    }
}

/// Escape text for HTML bodies and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
