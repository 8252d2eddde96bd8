use crate::attrs::Attributes;
use crate::feed::escape_html;
use crate::url_state::{format_value, UrlState};

/// A location captured from the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDraft {
    /// Attributes for the `map-location` appended to the live map.
    pub attributes: Attributes,
    /// Copy-paste markup for the author's page source.
    pub markup: String,
}

impl LocationDraft {
    /// Every URL key becomes an attribute; the snippet carries the pose,
    /// `title` and `body`.
    pub fn capture(url: &UrlState, title: &str, body: &str) -> Self {
        let mut attributes: Attributes = url
            .iter()
            .map(|(key, value)| (key.to_string(), format_value(value)))
            .collect();
        if !title.is_empty() {
            attributes.set("title", title);
        }

        let pose = |key: &str| url.get(key).map(format_value).unwrap_or_default();
        let markup = format!(
            "\n<map-location\n  latitude=\"{}\"\n  longitude=\"{}\"\n  zoom=\"{}\"\n  pitch=\"{}\"\n  bearing=\"{}\"\n  title=\"{}\"\n>\n  {}\n</map-location>\n",
            pose("latitude"),
            pose("longitude"),
            pose("zoom"),
            pose("pitch"),
            pose("bearing"),
            escape_html(title),
            body.trim(),
        );
        Self { attributes, markup }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttributeBag;
    use crate::models::ViewState;

    #[test]
    fn test_capture_copies_url_pose() {
        let url = UrlState::from_view_state(&ViewState::new(20.0, 10.0, 4.5, 0.0, 30.0));
        let draft = LocationDraft::capture(&url, "Harbour \"east\"", "<p>Boats</p>\n");
        assert_eq!(draft.attributes.attribute("zoom").as_deref(), Some("4.5"));
        assert_eq!(draft.attributes.attribute("title").as_deref(), Some("Harbour \"east\""));
        assert!(draft.markup.contains("latitude=\"10\""));
        assert!(draft.markup.contains("pitch=\"30\""));
        assert!(draft.markup.contains("title=\"Harbour &quot;east&quot;\""));
        assert!(draft.markup.contains("  <p>Boats</p>\n</map-location>"));
    }

    #[test]
    fn test_capture_without_pose_leaves_blanks() {
        let draft = LocationDraft::capture(&UrlState::new(), "", "");
        assert!(draft.markup.contains("zoom=\"\""));
        assert!(!draft.attributes.has_attribute("title"));
    }
}
