//! Slideshow cursor and the idle-orbit state machine.
//!
//! `Idle` is left for `Orbiting` only when the countdown timer fires with
//! orbit enabled. Pointer activity or any explicit navigation returns to
//! `Idle`, cancelling the rotation and re-arming the countdown.

use std::time::Duration;

use tracing::debug;

use crate::config::TourTiming;
use crate::engine::{FlyToOptions, FrameId, MapEngine, PageHost, TimerId};
use crate::models::{InfoBox, StopId, TourStop, ViewState};
use crate::registry::LocationRegistry;
use crate::view_state::ViewStateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TourState {
    #[default]
    Idle,
    Orbiting,
}

/// Everything a navigation step reads or commands.
pub struct Stage<'a, E: ?Sized, P: ?Sized> {
    pub registry: &'a LocationRegistry,
    pub store: &'a ViewStateStore,
    pub engine: &'a mut E,
    pub page: &'a mut P,
}

#[derive(Debug)]
pub struct TourController {
    current_index: usize,
    state: TourState,
    countdown: Option<TimerId>,
    frame: Option<FrameId>,
    orbit_enabled: bool,
    popups: bool,
    home: ViewState,
    timing: TourTiming,
}

impl TourController {
    pub fn new(home: ViewState, orbit_enabled: bool, popups: bool, timing: TourTiming) -> Self {
        Self {
            current_index: 0,
            state: TourState::Idle,
            countdown: None,
            frame: None,
            orbit_enabled,
            popups,
            home,
            timing,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn is_orbiting(&self) -> bool {
        self.state == TourState::Orbiting
    }

    pub fn home_pose(&self) -> ViewState {
        self.home
    }

    /// Live countdown timer, if armed.
    pub fn countdown(&self) -> Option<TimerId> {
        self.countdown
    }

    /// Live orbit frame request, if any.
    pub fn frame(&self) -> Option<FrameId> {
        self.frame
    }

    pub fn next<E, P>(&mut self, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        let len = stage.registry.len();
        if len == 0 {
            return;
        }
        self.current_index = (self.current_index + 1) % len;
        self.select_index(self.current_index, stage);
    }

    pub fn prev<E, P>(&mut self, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        let len = stage.registry.len();
        if len == 0 {
            return;
        }
        self.current_index = (self.current_index + len - 1) % len;
        self.select_index(self.current_index, stage);
    }

    /// Fly back to the map root's own pose. The cursor stays where it is.
    pub fn home<E, P>(&mut self, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        debug!(pose = %self.home, "showing home");
        let home = self.home;
        self.show(home, None, None, stage);
    }

    /// Select the stop at `index` (wrapping). No-op on an empty registry.
    pub fn select_index<E, P>(&mut self, index: usize, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        let registry = stage.registry;
        let Some(stop) = registry.get(index) else {
            return;
        };
        self.show_stop(stop, stage);
    }

    /// Select a stop by id, as a marker click does. Unknown ids are ignored.
    pub fn select_stop<E, P>(&mut self, id: &StopId, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        let registry = stage.registry;
        let Some(stop) = registry.find(id) else {
            debug!(stop = %id, "ignoring selection of unknown stop");
            return;
        };
        self.show_stop(stop, stage);
    }

    /// Fly somewhere that is not a stop, leaving any info box in place.
    pub fn fly_to<E, P>(&mut self, target: ViewState, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        self.interrupt(stage.page);
        stage
            .store
            .fly_to(stage.engine, target, FlyToOptions::default());
    }

    fn show_stop<E, P>(&mut self, stop: &TourStop, stage: Stage<'_, E, P>)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        debug!(stop = %stop.id, pose = %stop.view_state, "selecting stop");
        let info = stop.info_box();
        self.show(stop.view_state, stop.duration_ms, Some(info), stage);
    }

    fn show<E, P>(
        &mut self,
        pose: ViewState,
        duration_ms: Option<u64>,
        info: Option<InfoBox>,
        stage: Stage<'_, E, P>,
    ) where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        self.interrupt(stage.page);
        stage
            .store
            .fly_to(stage.engine, pose, FlyToOptions { duration_ms });
        stage.page.clear_info_boxes();
        if self.popups {
            return;
        }
        if let Some(info) = info {
            stage.page.show_info_box(&info);
        }
    }

    /// Leave `Orbiting` for `Idle`, restarting the countdown.
    fn interrupt<P: PageHost + ?Sized>(&mut self, page: &mut P) {
        if self.is_orbiting() {
            self.stop_orbit(page);
            self.arm_countdown(self.timing.rearm_delay, page);
        }
    }

    /// Arm the first countdown once the map has loaded.
    pub fn start<P: PageHost + ?Sized>(&mut self, page: &mut P) {
        self.arm_countdown(self.timing.initial_delay, page);
    }

    fn arm_countdown<P: PageHost + ?Sized>(&mut self, delay: Duration, page: &mut P) {
        if !self.orbit_enabled {
            return;
        }
        if let Some(previous) = self.countdown.take() {
            page.cancel_timer(previous);
        }
        self.countdown = Some(page.start_timer(delay));
    }

    pub fn on_pointer_activity<P: PageHost + ?Sized>(&mut self, page: &mut P) {
        if !self.orbit_enabled {
            return;
        }
        self.stop_orbit(page);
        self.arm_countdown(self.timing.rearm_delay, page);
    }

    /// A timer fired. Stale or foreign timers are ignored.
    pub fn on_timer<E, P>(&mut self, timer: TimerId, engine: &mut E, page: &mut P) -> bool
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        if self.countdown != Some(timer) {
            return false;
        }
        self.countdown = None;
        self.begin_orbit(engine, page);
        true
    }

    /// Start rotating. Only valid from `Idle` with orbit enabled.
    pub fn begin_orbit<E, P>(&mut self, engine: &mut E, page: &mut P)
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        if !self.orbit_enabled || self.is_orbiting() {
            return;
        }
        debug!("orbit started");
        self.state = TourState::Orbiting;
        if let Some(timer) = self.countdown.take() {
            page.cancel_timer(timer);
        }
        engine.rotate_to(engine.bearing().rem_euclid(360.0), 0);
        self.frame = Some(page.request_frame());
    }

    /// One animation frame. The bearing is a function of page time, so a
    /// late frame catches up instead of drifting.
    pub fn on_frame<E, P>(&mut self, frame: FrameId, timestamp_ms: f64, engine: &mut E, page: &mut P) -> bool
    where
        E: MapEngine + ?Sized,
        P: PageHost + ?Sized,
    {
        if !self.is_orbiting() || self.frame != Some(frame) {
            return false;
        }
        let bearing = orbit_bearing(timestamp_ms, self.timing.degrees_per_second);
        engine.rotate_to(bearing, 0);
        self.frame = Some(page.request_frame());
        true
    }

    /// Cancel the countdown and the rotation. Idempotent.
    pub fn stop_orbit<P: PageHost + ?Sized>(&mut self, page: &mut P) {
        if let Some(timer) = self.countdown.take() {
            page.cancel_timer(timer);
        }
        if let Some(frame) = self.frame.take() {
            page.cancel_frame(frame);
        }
        if self.is_orbiting() {
            debug!("orbit stopped");
        }
        self.state = TourState::Idle;
    }

    /// Keep the cursor inside the registry after its length changed.
    pub fn registry_changed(&mut self, len: usize) {
        self.current_index = if len == 0 { 0 } else { self.current_index % len };
    }
}

/// Bearing for page time `timestamp_ms`, folded into [0, 360).
pub fn orbit_bearing(timestamp_ms: f64, degrees_per_second: f64) -> f64 {
    (timestamp_ms / 1000.0 * degrees_per_second).rem_euclid(360.0)
}
