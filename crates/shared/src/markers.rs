use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a marker turns when the map rotates or pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationAlignment {
    #[default]
    Viewport,
    Map,
    Auto,
}

impl RotationAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationAlignment::Viewport => "viewport",
            RotationAlignment::Map => "map",
            RotationAlignment::Auto => "auto",
        }
    }

    /// Parse an author-supplied alignment, falling back to `viewport`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "viewport" | "" => RotationAlignment::Viewport,
            "map" => RotationAlignment::Map,
            "auto" => RotationAlignment::Auto,
            other => {
                warn!(value = other, "unknown rotation alignment, using viewport");
                RotationAlignment::Viewport
            }
        }
    }
}

/// One `map-marker` child declared inside a location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDecl {
    pub rotation_alignment: Option<String>,
    /// Inner markup of the custom marker, rendered as its visual.
    pub content_html: String,
}

/// Everything the engine needs to draw one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub rotation_alignment: RotationAlignment,
    pub scale: f64,
    /// Custom markup to render instead of the engine's default pin.
    #[serde(skip)]
    pub custom_html: Option<String>,
}

impl MarkerSpec {
    /// The pin used when a location declares no marker of its own.
    pub fn default_pin() -> Self {
        Self {
            rotation_alignment: RotationAlignment::Viewport,
            scale: 1.0,
            custom_html: None,
        }
    }

    pub fn custom(decl: &MarkerDecl) -> Self {
        Self {
            rotation_alignment: decl
                .rotation_alignment
                .as_deref()
                .map(RotationAlignment::parse)
                .unwrap_or_default(),
            scale: 0.0,
            custom_html: Some(decl.content_html.clone()),
        }
    }

    /// One spec per declared marker, or exactly one default pin.
    pub fn for_location(decls: &[MarkerDecl]) -> Vec<Self> {
        if decls.is_empty() {
            vec![Self::default_pin()]
        } else {
            decls.iter().map(Self::custom).collect()
        }
    }

    pub fn is_custom(&self) -> bool {
        self.custom_html.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_declared_marker_gets_default_pin() {
        let specs = MarkerSpec::for_location(&[]);
        assert_eq!(specs, vec![MarkerSpec::default_pin()]);
        assert!(!specs[0].is_custom());
    }

    #[test]
    fn test_custom_markers_keep_declaration_order() {
        let decls = vec![
            MarkerDecl {
                rotation_alignment: Some("map".into()),
                content_html: "<b>1</b>".into(),
            },
            MarkerDecl::default(),
        ];
        let specs = MarkerSpec::for_location(&decls);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].rotation_alignment, RotationAlignment::Map);
        assert_eq!(specs[1].rotation_alignment, RotationAlignment::Viewport);
        assert!(specs.iter().all(|s| s.scale == 0.0 && s.is_custom()));
    }

    #[test]
    fn test_unknown_alignment_falls_back() {
        assert_eq!(RotationAlignment::parse("sideways"), RotationAlignment::Viewport);
        assert_eq!(RotationAlignment::parse("auto").as_str(), "auto");
    }
}
