use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
pub const MIN_PITCH: f64 = 0.0;
pub const MAX_PITCH: f64 = 60.0;

/// Upper bound (exclusive) of the `far` zoom band.
pub const FAR_BAND_BELOW: f64 = 10.0;
/// Upper bound (inclusive) of the `middle` zoom band.
pub const MIDDLE_BAND_UPTO: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Camera pose: where the camera looks and how it is tilted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl ViewState {
    pub fn new(longitude: f64, latitude: f64, zoom: f64, bearing: f64, pitch: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            bearing,
            pitch,
        }
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(self.longitude, self.latitude)
    }

    /// Clamp zoom and pitch into the ranges every engine accepts.
    pub fn clamped(self) -> Self {
        Self {
            zoom: self.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            pitch: self.pitch.clamp(MIN_PITCH, MAX_PITCH),
            ..self
        }
    }
}

impl std::fmt::Display for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.4},{:.4} z{:.2} b{:.1} p{:.1}",
            self.longitude, self.latitude, self.zoom, self.bearing, self.pitch
        )
    }
}

/// Coarse zoom classification the host mirrors as a state class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomBand {
    Far,
    Middle,
    Near,
}

impl ZoomBand {
    pub fn classify(zoom: f64) -> Self {
        if zoom < FAR_BAND_BELOW {
            ZoomBand::Far
        } else if zoom <= MIDDLE_BAND_UPTO {
            ZoomBand::Middle
        } else {
            ZoomBand::Near
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            ZoomBand::Far => "far",
            ZoomBand::Middle => "middle",
            ZoomBand::Near => "near",
        }
    }

    pub const ALL: [ZoomBand; 3] = [ZoomBand::Far, ZoomBand::Middle, ZoomBand::Near];
}

/// Host-assigned identity of a declared element, stable for as long as
/// the element stays attached.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ElementKey(pub String);

impl ElementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub String);

impl StopId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-side handle of a marker placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRef {
    pub owner: StopId,
    pub anchor: LngLat,
    pub handle: MarkerHandle,
}

/// One declared point of interest on the tour.
#[derive(Debug, Clone, PartialEq)]
pub struct TourStop {
    pub id: StopId,
    pub key: ElementKey,
    /// Author-declared `id` attribute; edges resolve their endpoints by it.
    pub declared_id: Option<String>,
    pub view_state: ViewState,
    pub duration_ms: Option<u64>,
    pub title: Option<String>,
    pub content_html: String,
    pub markers: Vec<MarkerRef>,
}

impl TourStop {
    pub fn info_box(&self) -> InfoBox {
        InfoBox {
            stop: self.id.clone(),
            title: self.title.clone(),
            content_html: self.content_html.clone(),
        }
    }
}

/// Content of the information box shown for a selected stop.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoBox {
    pub stop: StopId,
    pub title: Option<String>,
    pub content_html: String,
}
