use std::time::Duration;

use crate::events::MapEvent;
use crate::markers::MarkerSpec;
use crate::media::{Edge, MediaOverlay};
use crate::models::{ElementKey, InfoBox, LngLat, MarkerHandle, StopId, ViewState, ZoomBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlyToOptions {
    /// Animation length; `None` lets the engine pick.
    pub duration_ms: Option<u64>,
}

/// Sky layer installed once the engine has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sky {
    Atmosphere,
    /// Flat dark gradient, used when the map declares `no-sky`.
    Night,
}

/// Handle of a pending countdown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle of a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Camera and overlay commands understood by the rendering engine.
///
/// The engine reports camera changes back through
/// [`StoryMap::on_engine_settle`](crate::StoryMap::on_engine_settle);
/// none of these calls may call back into the story synchronously.
pub trait MapEngine {
    fn fly_to(&mut self, target: ViewState, opts: FlyToOptions);
    fn rotate_to(&mut self, bearing: f64, duration_ms: u64);
    fn bearing(&self) -> f64;

    /// Place a marker; clicking it must select `owner`.
    fn add_marker(&mut self, owner: &StopId, spec: &MarkerSpec, at: LngLat) -> MarkerHandle;
    fn move_marker(&mut self, marker: MarkerHandle, to: LngLat);
    fn remove_marker(&mut self, marker: MarkerHandle);

    fn configure_scene(&mut self, sky: Sky);
    fn add_media(&mut self, overlay: &MediaOverlay);
    fn add_edge(&mut self, edge: &Edge);
}

/// Page-side services: history, timers, frames and the DOM around the map.
///
/// Timer and frame callbacks are delivered back to
/// [`StoryMap::on_timer`](crate::StoryMap::on_timer) and
/// [`StoryMap::on_frame`](crate::StoryMap::on_frame).
pub trait PageHost {
    fn push_history(&mut self, url: &str, page_counter: u64);

    fn start_timer(&mut self, delay: Duration) -> TimerId;
    fn cancel_timer(&mut self, timer: TimerId);
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, frame: FrameId);

    fn show_info_box(&mut self, info: &InfoBox);
    fn clear_info_boxes(&mut self);
    fn set_zoom_band(&mut self, band: ZoomBand);
    fn render_notice(&mut self, element: &ElementKey, text: &str);
    fn emit(&mut self, event: MapEvent);
}
