use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::engine::{FlyToOptions, FrameId, MapEngine, PageHost, Sky, TimerId};
use crate::events::MapEvent;
use crate::markers::MarkerSpec;
use crate::media::{Edge, MediaOverlay};
use crate::models::{ElementKey, InfoBox, LngLat, MarkerHandle, StopId, ViewState, ZoomBand};

#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub flights: Vec<(ViewState, FlyToOptions)>,
    pub rotations: Vec<(f64, u64)>,
    pub bearing: f64,
    pub markers: BTreeMap<MarkerHandle, (StopId, MarkerSpec, LngLat)>,
    pub scene: Option<Sky>,
    pub media: Vec<MediaOverlay>,
    pub edges: Vec<Edge>,
    next_marker: u64,
}

impl MapEngine for RecordingEngine {
    fn fly_to(&mut self, target: ViewState, opts: FlyToOptions) {
        self.flights.push((target, opts));
    }

    fn rotate_to(&mut self, bearing: f64, duration_ms: u64) {
        self.bearing = bearing;
        self.rotations.push((bearing, duration_ms));
    }

    fn bearing(&self) -> f64 {
        self.bearing
    }

    fn add_marker(&mut self, owner: &StopId, spec: &MarkerSpec, at: LngLat) -> MarkerHandle {
        self.next_marker += 1;
        let handle = MarkerHandle(self.next_marker);
        self.markers.insert(handle, (owner.clone(), spec.clone(), at));
        handle
    }

    fn move_marker(&mut self, marker: MarkerHandle, to: LngLat) {
        if let Some(entry) = self.markers.get_mut(&marker) {
            entry.2 = to;
        }
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        self.markers.remove(&marker);
    }

    fn configure_scene(&mut self, sky: Sky) {
        self.scene = Some(sky);
    }

    fn add_media(&mut self, overlay: &MediaOverlay) {
        self.media.push(overlay.clone());
    }

    fn add_edge(&mut self, edge: &Edge) {
        self.edges.push(edge.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingPage {
    pub history: Vec<(String, u64)>,
    /// Pending timers only; cancelled ones are removed.
    pub timers: HashMap<TimerId, Duration>,
    /// Pending frame requests only.
    pub frames: Vec<FrameId>,
    /// Boxes currently on screen.
    pub info_boxes: Vec<InfoBox>,
    pub shown_info_boxes: usize,
    pub zoom_band: Option<ZoomBand>,
    pub notices: Vec<(ElementKey, String)>,
    pub events: Vec<MapEvent>,
    next_handle: u64,
}

impl RecordingPage {
    /// Deliver a timer: forget it and return its id.
    pub fn fire_timer(&mut self, timer: TimerId) -> TimerId {
        self.timers.remove(&timer);
        timer
    }

    /// Take the oldest pending frame request.
    pub fn next_frame(&mut self) -> Option<FrameId> {
        if self.frames.is_empty() {
            return None;
        }
        Some(self.frames.remove(0))
    }
}

impl PageHost for RecordingPage {
    fn push_history(&mut self, url: &str, page_counter: u64) {
        self.history.push((url.to_string(), page_counter));
    }

    fn start_timer(&mut self, delay: Duration) -> TimerId {
        self.next_handle += 1;
        let id = TimerId(self.next_handle);
        self.timers.insert(id, delay);
        id
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    fn request_frame(&mut self) -> FrameId {
        self.next_handle += 1;
        let id = FrameId(self.next_handle);
        self.frames.push(id);
        id
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        self.frames.retain(|f| *f != frame);
    }

    fn show_info_box(&mut self, info: &InfoBox) {
        self.shown_info_boxes += 1;
        self.info_boxes.push(info.clone());
    }

    fn clear_info_boxes(&mut self) {
        self.info_boxes.clear();
    }

    fn set_zoom_band(&mut self, band: ZoomBand) {
        self.zoom_band = Some(band);
    }

    fn render_notice(&mut self, element: &ElementKey, text: &str) {
        self.notices.push((element.clone(), text.to_string()));
    }

    fn emit(&mut self, event: MapEvent) {
        self.events.push(event);
    }
}
