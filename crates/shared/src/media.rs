use serde::Serialize;

use crate::attrs::{parse_number, AttributeBag, Attributes};
use crate::error::{ElementKind, Error, Result};
use crate::ids::IdSource;
use crate::models::{ElementKey, LngLat};

/// Corner child elements, in the order the engine expects coordinates.
pub const CORNERS: [&str; 4] = [
    "north-west-corner",
    "north-east-corner",
    "south-east-corner",
    "south-west-corner",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn element(self) -> ElementKind {
        match self {
            MediaKind::Image => ElementKind::Image,
            MediaKind::Video => ElementKind::Video,
        }
    }
}

/// A `map-image` or `map-video` element as declared in markup.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDecl {
    pub key: ElementKey,
    pub kind: MediaKind,
    pub attrs: Attributes,
    /// Corner children by tag name.
    pub corners: Vec<(String, Attributes)>,
}

/// A resolved overlay ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaOverlay {
    pub source_id: String,
    pub layer_id: String,
    pub kind: MediaKind,
    pub src: String,
    /// North-west, north-east, south-east, south-west.
    pub corners: [LngLat; 4],
}

impl MediaOverlay {
    pub fn resolve(decl: &MediaDecl, ids: &mut dyn IdSource) -> Result<Self> {
        let element = decl.kind.element();
        let src = decl
            .attrs
            .attribute("src")
            .filter(|s| !s.trim().is_empty())
            .ok_or(Error::MissingSource(element))?;

        let mut corners = [LngLat::new(0.0, 0.0); 4];
        for (slot, corner) in corners.iter_mut().zip(CORNERS) {
            let attrs = decl
                .corners
                .iter()
                .find(|(tag, _)| tag == corner)
                .map(|(_, attrs)| attrs)
                .ok_or(Error::MissingCorner { element, corner })?;
            *slot = corner_position(element, corner, attrs)?;
        }

        Ok(Self {
            source_id: ids.next_id(),
            layer_id: ids.next_id(),
            kind: decl.kind,
            src,
            corners,
        })
    }

    /// Coordinates as `[lng, lat]` pairs.
    pub fn coordinates(&self) -> [[f64; 2]; 4] {
        self.corners.map(|c| [c.lng, c.lat])
    }
}

fn corner_position(element: ElementKind, corner: &'static str, attrs: &Attributes) -> Result<LngLat> {
    let read = |name: &'static str| {
        attrs
            .attribute(name)
            .ok_or(Error::MissingCorner { element, corner })
            .and_then(|raw| parse_number(element, name, &raw))
    };
    Ok(LngLat::new(read("longitude")?, read("latitude")?))
}

/// A `map-edge` element: ids of the two elements it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDecl {
    pub key: ElementKey,
    pub attrs: Attributes,
}

/// A line drawn between two declared places.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: LngLat,
    pub target: LngLat,
}

impl Edge {
    /// `lookup` maps an element id to the position it declares.
    pub fn resolve(
        decl: &EdgeDecl,
        lookup: impl Fn(&str) -> Option<LngLat>,
        ids: &mut dyn IdSource,
    ) -> Result<Self> {
        let endpoint = |attribute: &'static str| -> Result<LngLat> {
            let id = decl
                .attrs
                .attribute(attribute)
                .filter(|id| !id.is_empty())
                .ok_or(Error::MissingAttribute {
                    element: ElementKind::Edge,
                    attribute,
                })?;
            lookup(&id).ok_or(Error::UnknownEndpoint(id))
        };
        let source = endpoint("source")?;
        let target = endpoint("target")?;
        Ok(Self {
            id: ids.next_id(),
            source,
            target,
        })
    }
}
