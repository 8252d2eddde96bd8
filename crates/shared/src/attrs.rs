use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{ElementKind, Error, Result};
use crate::models::ViewState;
use crate::url_state::UrlState;

/// Read access to an element's declared attributes.
pub trait AttributeBag {
    fn attribute(&self, name: &str) -> Option<String>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Remove a consume-once attribute (credentials, style url).
    fn remove_attribute(&mut self, name: &str);
}

/// In-memory attribute snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl AttributeBag for Attributes {
    fn attribute(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn remove_attribute(&mut self, name: &str) {
        self.values.remove(name);
    }
}

/// Defaults for the map root's pose.
pub const ROOT_DEFAULT_POSE: ViewState = ViewState {
    longitude: 0.0,
    latitude: 0.0,
    zoom: 1.0,
    bearing: 0.0,
    pitch: 0.0,
};

/// Bearing used for a location that does not declare one.
pub const LOCATION_DEFAULT_BEARING: f64 = 80.0;
/// Pitch used for a location that does not declare one.
pub const LOCATION_DEFAULT_PITCH: f64 = 60.0;

/// Parse a declared numeric attribute. Blank counts as absent.
pub fn parse_number(element: ElementKind, attribute: &'static str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidAttribute {
            element,
            attribute,
            value: raw.to_string(),
        }),
    }
}

fn declared_number<B: AttributeBag + ?Sized>(
    bag: &B,
    element: ElementKind,
    attribute: &'static str,
) -> Option<Result<f64>> {
    let raw = bag.attribute(attribute)?;
    if raw.trim().is_empty() {
        return None;
    }
    Some(parse_number(element, attribute, &raw))
}

/// Resolve one numeric map-root parameter. URL state wins over the
/// declared attribute, which wins over the built-in default.
pub fn resolve_number<B: AttributeBag + ?Sized>(
    bag: &B,
    url: &UrlState,
    attribute: &'static str,
    default: f64,
) -> f64 {
    if url.contains_key(attribute) {
        match url.number(attribute) {
            Some(value) if value.is_finite() => return value,
            _ => warn!(attribute, "ignoring non-numeric url value"),
        }
    }
    match declared_number(bag, ElementKind::Map, attribute) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            warn!(attribute, default, "{err}, using the default");
            default
        }
        None => default,
    }
}

/// Resolve a boolean flag: URL value when present, else attribute presence.
pub fn resolve_flag<B: AttributeBag + ?Sized>(bag: &B, url: &UrlState, attribute: &str) -> bool {
    url.flag(attribute)
        .unwrap_or_else(|| bag.has_attribute(attribute))
}

/// Initial camera pose of the map root.
pub fn resolve_root_pose<B: AttributeBag + ?Sized>(bag: &B, url: &UrlState) -> ViewState {
    ViewState {
        latitude: resolve_number(bag, url, "latitude", ROOT_DEFAULT_POSE.latitude),
        longitude: resolve_number(bag, url, "longitude", ROOT_DEFAULT_POSE.longitude),
        zoom: resolve_number(bag, url, "zoom", ROOT_DEFAULT_POSE.zoom),
        bearing: resolve_number(bag, url, "bearing", ROOT_DEFAULT_POSE.bearing),
        pitch: resolve_number(bag, url, "pitch", ROOT_DEFAULT_POSE.pitch),
    }
}

/// Everything a `map-location` declares about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationAttrs {
    pub id: Option<String>,
    pub view_state: ViewState,
    pub duration_ms: Option<u64>,
    pub title: Option<String>,
}

impl LocationAttrs {
    /// Fails when latitude, longitude or zoom is missing or not a number.
    pub fn resolve<B: AttributeBag + ?Sized>(bag: &B) -> Result<Self> {
        let required = |attribute: &'static str| {
            declared_number(bag, ElementKind::Location, attribute).unwrap_or(Err(
                Error::MissingAttribute {
                    element: ElementKind::Location,
                    attribute,
                },
            ))
        };
        let latitude = required("latitude")?;
        let longitude = required("longitude")?;
        let zoom = required("zoom")?;

        let optional = |attribute: &'static str, default: f64| {
            match declared_number(bag, ElementKind::Location, attribute) {
                Some(Ok(value)) => value,
                Some(Err(err)) => {
                    warn!(attribute, default, "{err}, using the default");
                    default
                }
                None => {
                    warn!(attribute, default, "could not find {attribute}, using the default");
                    default
                }
            }
        };
        let bearing = optional("bearing", LOCATION_DEFAULT_BEARING);
        let pitch = optional("pitch", LOCATION_DEFAULT_PITCH);

        let duration_ms = bag.attribute("duration").and_then(|raw| {
            let parsed = raw.trim().parse::<u64>().ok();
            if parsed.is_none() {
                warn!(duration = raw.as_str(), "ignoring unparseable duration");
            }
            parsed
        });

        Ok(Self {
            id: bag.attribute("id").filter(|id| !id.is_empty()),
            view_state: ViewState::new(longitude, latitude, zoom, bearing, pitch),
            duration_ms,
            title: bag.attribute("title").filter(|t| !t.is_empty()),
        })
    }
}
