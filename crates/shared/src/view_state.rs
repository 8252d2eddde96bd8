//! The single owner of the current camera pose.
//!
//! Programmatic flies never write the pose directly: the stored pose only
//! changes when the engine reports that the camera settled, whether the
//! move came from the user or from the tour.

use tracing::debug;

use crate::engine::{FlyToOptions, MapEngine, PageHost};
use crate::models::{ViewState, ZoomBand};
use crate::url_state::{UrlState, UrlStateCodec};

#[derive(Debug)]
pub struct ViewStateStore {
    pose: ViewState,
    band: ZoomBand,
    codec: UrlStateCodec,
}

impl ViewStateStore {
    /// Seed the store and persist the pose to the URL.
    pub fn initialize<P: PageHost + ?Sized>(
        pose: ViewState,
        mut codec: UrlStateCodec,
        page: &mut P,
    ) -> Self {
        codec.encode(&UrlState::from_view_state(&pose), page);
        let band = ZoomBand::classify(pose.zoom);
        page.set_zoom_band(band);
        Self { pose, band, codec }
    }

    pub fn pose(&self) -> ViewState {
        self.pose
    }

    pub fn zoom_band(&self) -> ZoomBand {
        self.band
    }

    pub fn codec(&self) -> &UrlStateCodec {
        &self.codec
    }

    /// Mirror a settled camera into the store and URL. Returns whether the
    /// move was applied; moves made while orbiting are dropped.
    pub fn apply_engine_move<P: PageHost + ?Sized>(
        &mut self,
        pose: ViewState,
        orbiting: bool,
        page: &mut P,
    ) -> bool {
        if orbiting {
            return false;
        }
        self.pose = pose;
        self.codec.encode(&UrlState::from_view_state(&pose), page);

        let band = ZoomBand::classify(pose.zoom);
        if band != self.band {
            debug!(band = band.class_name(), "zoom band changed");
        }
        self.band = band;
        page.set_zoom_band(band);
        true
    }

    /// Start an animated camera move. The stored pose is untouched until
    /// the engine settles.
    pub fn fly_to<E: MapEngine + ?Sized>(&self, engine: &mut E, target: ViewState, opts: FlyToOptions) {
        engine.fly_to(target.clamped(), opts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingEngine, RecordingPage};
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://example.org/";

    fn store(page: &mut RecordingPage) -> ViewStateStore {
        ViewStateStore::initialize(
            ViewState::new(20.0, 10.0, 4.0, 0.0, 0.0),
            UrlStateCodec::new(BASE),
            page,
        )
    }

    #[test]
    fn test_initialize_persists_pose() {
        let mut page = RecordingPage::default();
        let store = store(&mut page);
        assert_eq!(page.history.len(), 1);
        assert_eq!(
            page.history[0].0,
            "https://example.org/?&latitude=10&longitude=20&zoom=4&bearing=0&pitch=0"
        );
        assert_eq!(page.zoom_band, Some(ZoomBand::Far));
        assert_eq!(store.zoom_band(), ZoomBand::Far);
    }

    #[test]
    fn test_settle_updates_pose_url_and_band() {
        let mut page = RecordingPage::default();
        let mut store = store(&mut page);
        let moved = ViewState::new(1.0, 2.0, 12.0, 30.0, 10.0);
        assert!(store.apply_engine_move(moved, false, &mut page));
        assert_eq!(store.pose(), moved);
        assert_eq!(page.history.len(), 2);
        assert_eq!(page.history[1].1, 2);
        assert_eq!(page.zoom_band, Some(ZoomBand::Middle));
    }

    #[test]
    fn test_settle_while_orbiting_is_ignored() {
        let mut page = RecordingPage::default();
        let mut store = store(&mut page);
        let before = store.pose();
        for bearing in [10.0, 20.0, 30.0] {
            let spun = ViewState { bearing, ..before };
            assert!(!store.apply_engine_move(spun, true, &mut page));
        }
        assert_eq!(store.pose(), before);
        assert_eq!(page.history.len(), 1);
    }

    #[test]
    fn test_fly_to_does_not_touch_state() {
        let mut page = RecordingPage::default();
        let store = store(&mut page);
        let mut engine = RecordingEngine::default();
        let target = ViewState::new(5.0, 5.0, 30.0, 0.0, 90.0);
        store.fly_to(&mut engine, target, FlyToOptions::default());
        assert_eq!(engine.flights.len(), 1);
        assert_eq!(engine.flights[0].0, target.clamped());
        assert_eq!(store.pose(), ViewState::new(20.0, 10.0, 4.0, 0.0, 0.0));
        assert_eq!(page.history.len(), 1);
    }
}
