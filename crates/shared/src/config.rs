use std::time::Duration;

use tracing::warn;

use crate::attrs::{resolve_flag, resolve_root_pose, AttributeBag};
use crate::models::ViewState;
use crate::url_state::UrlState;

pub const DEFAULT_STYLE_URL: &str = "mapbox://styles/mapbox/streets-v11";

/// Pose flown to by the FLY HOME control. The tiny bearing and pitch keep
/// the engine from treating the move as a no-op.
pub const WORLD_VIEW: ViewState = ViewState {
    longitude: 0.0,
    latitude: 0.0,
    zoom: 1.0,
    bearing: 0.001,
    pitch: 0.001,
};

/// Orbit countdown and speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TourTiming {
    /// Countdown armed when the map finishes loading.
    pub initial_delay: Duration,
    /// Countdown re-armed after every pointer activity.
    pub rearm_delay: Duration,
    pub degrees_per_second: f64,
}

impl Default for TourTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            rearm_delay: Duration::from_secs(10),
            degrees_per_second: 1.0,
        }
    }
}

/// Which optional controls the host should mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub slideshow: bool,
    pub flyhome: bool,
    pub edit: bool,
    pub geocoder: bool,
    pub geolocate: bool,
    pub navigation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub initial_pose: ViewState,
    pub popups: bool,
    pub orbit: bool,
    pub no_sky: bool,
    pub locked: bool,
    pub controls: Controls,
    pub access_token: Option<String>,
    pub style_url: String,
}

impl MapConfig {
    /// Read the root's attributes. The access token and style url are
    /// consumed: they are removed from `root` once read.
    pub fn resolve<B: AttributeBag + ?Sized>(root: &mut B, url: &UrlState) -> Self {
        let access_token = root.attribute("accesstoken").filter(|t| !t.is_empty());
        root.remove_attribute("accesstoken");

        let style_url = match root.attribute("styleurl").filter(|s| !s.is_empty()) {
            Some(style) => style,
            None => {
                warn!(default = DEFAULT_STYLE_URL, "could not find style url, using the default");
                DEFAULT_STYLE_URL.to_string()
            }
        };
        root.remove_attribute("styleurl");

        let present = |name: &str| root.has_attribute(name);
        let controls = Controls {
            slideshow: present("slideshow"),
            flyhome: present("flyhome"),
            edit: present("edit"),
            geocoder: present("geocoder"),
            geolocate: present("geolocate"),
            navigation: present("navigation"),
        };

        Self {
            initial_pose: resolve_root_pose(&*root, url),
            popups: resolve_flag(&*root, url, "popups"),
            orbit: resolve_flag(&*root, url, "orbit"),
            no_sky: resolve_flag(&*root, url, "no-sky"),
            locked: resolve_flag(&*root, url, "locked"),
            controls,
            access_token,
            style_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attributes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_credentials_are_consumed() {
        let mut root = Attributes::new()
            .with("accesstoken", "pk.abc")
            .with("styleurl", "mapbox://styles/me/custom");
        let config = MapConfig::resolve(&mut root, &UrlState::new());
        assert_eq!(config.access_token.as_deref(), Some("pk.abc"));
        assert_eq!(config.style_url, "mapbox://styles/me/custom");
        assert!(!root.has_attribute("accesstoken"));
        assert!(!root.has_attribute("styleurl"));
    }

    #[test]
    fn test_missing_style_url_uses_default() {
        let mut root = Attributes::new().with("styleurl", "");
        let config = MapConfig::resolve(&mut root, &UrlState::new());
        assert_eq!(config.style_url, DEFAULT_STYLE_URL);
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn test_flags_and_controls_by_presence() {
        let mut root = Attributes::new()
            .with("popups", "")
            .with("no-sky", "no")
            .with("slideshow", "")
            .with("navigation", "");
        let config = MapConfig::resolve(&mut root, &UrlState::new());
        assert!(config.popups);
        assert!(config.no_sky);
        assert!(!config.orbit);
        assert!(!config.locked);
        assert_eq!(
            config.controls,
            Controls {
                slideshow: true,
                navigation: true,
                ..Controls::default()
            }
        );
    }

    #[test]
    fn test_initial_pose_from_attributes() {
        let mut root = Attributes::new()
            .with("latitude", "10")
            .with("longitude", "20")
            .with("zoom", "4");
        let config = MapConfig::resolve(&mut root, &UrlState::new());
        assert_eq!(config.initial_pose, ViewState::new(20.0, 10.0, 4.0, 0.0, 0.0));
    }

    #[test]
    fn test_default_timing() {
        let timing = TourTiming::default();
        assert_eq!(timing.initial_delay, Duration::from_secs(5));
        assert_eq!(timing.rearm_delay, Duration::from_secs(10));
    }
}
