use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};
use storymap_shared::config::MapConfig;
use storymap_shared::engine::{FlyToOptions, MapEngine, Sky};
use storymap_shared::markers::MarkerSpec;
use storymap_shared::media::{Edge, MediaKind, MediaOverlay};
use storymap_shared::models::{LngLat, MarkerHandle, StopId, ViewState};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement};

use crate::runtime::{Action, Dispatcher};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    #[derive(Clone)]
    pub type MapboxMap;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map")]
    pub fn new(options: &JsValue) -> MapboxMap;

    #[wasm_bindgen(method, js_name = flyTo)]
    pub fn fly_to(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = rotateTo)]
    pub fn rotate_to(this: &MapboxMap, bearing: f64, options: &JsValue);

    #[wasm_bindgen(method, js_name = getCenter)]
    pub fn get_center(this: &MapboxMap) -> JsValue;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = getBearing)]
    pub fn get_bearing(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = getPitch)]
    pub fn get_pitch(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method)]
    pub fn on(this: &MapboxMap, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = addControl)]
    pub fn add_control(this: &MapboxMap, control: &JsValue);

    #[wasm_bindgen(method, js_name = addSource)]
    pub fn add_source(this: &MapboxMap, id: &str, source: &JsValue);

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &MapboxMap, layer: &JsValue);

    #[wasm_bindgen(method, js_name = setTerrain)]
    pub fn set_terrain(this: &MapboxMap, terrain: &JsValue);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Marker)]
    pub type Marker;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Marker")]
    pub fn new(options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &Marker, lng_lat: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Marker, map: &MapboxMap) -> Marker;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Marker);

    #[wasm_bindgen(method, js_name = getElement)]
    pub fn get_element(this: &Marker) -> HtmlElement;

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = NavigationControl)]
    pub type NavigationControl;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "NavigationControl")]
    pub fn new(options: &JsValue) -> NavigationControl;

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = GeolocateControl)]
    pub type GeolocateControl;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "GeolocateControl")]
    pub fn new(options: &JsValue) -> GeolocateControl;

    #[wasm_bindgen(js_name = MapboxGeocoder)]
    pub type Geocoder;

    #[wasm_bindgen(constructor, js_class = "MapboxGeocoder")]
    pub fn new(options: &JsValue) -> Geocoder;
}

pub const TERRAIN_SOURCE: &str = "mapbox-terrain";

/// Whether a global named `name` is defined on the page.
pub fn global_defined(name: &str) -> bool {
    js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(name))
        .map(|value| !value.is_undefined())
        .unwrap_or(false)
}

/// Install the access token on the `mapboxgl` global.
pub fn set_access_token(token: &str) -> Result<(), String> {
    let mapboxgl = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))
        .map_err(|e| format!("{e:?}"))?;
    js_sys::Reflect::set(
        &mapboxgl,
        &JsValue::from_str("accessToken"),
        &JsValue::from_str(token),
    )
    .map_err(|e| format!("{e:?}"))?;
    Ok(())
}

/// Turn a JSON value into a plain JS object.
pub fn to_js(value: &Value) -> JsValue {
    match js_sys::JSON::parse(&value.to_string()) {
        Ok(js) => js,
        Err(err) => {
            tracing::warn!("could not convert options for mapbox: {err:?}");
            JsValue::UNDEFINED
        }
    }
}

fn lng_lat_array(at: LngLat) -> Value {
    json!([at.lng, at.lat])
}

pub fn map_options(config: &MapConfig) -> Value {
    let pose = config.initial_pose;
    json!({
        "center": [pose.longitude, pose.latitude],
        "zoom": pose.zoom,
        "bearing": pose.bearing,
        "pitch": pose.pitch,
        "style": config.style_url,
        "interactive": !config.locked,
    })
}

/// Camera options for `flyTo`.
#[derive(Debug, Clone, Serialize)]
pub struct CameraOptions {
    pub center: [f64; 2],
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub essential: bool,
}

impl CameraOptions {
    pub fn fly_to(target: &ViewState, opts: FlyToOptions) -> Self {
        Self {
            center: [target.longitude, target.latitude],
            zoom: target.zoom,
            bearing: target.bearing,
            pitch: target.pitch,
            duration: opts.duration_ms,
            essential: true,
        }
    }
}

pub fn fly_to_options(target: &ViewState, opts: FlyToOptions) -> Value {
    serde_json::to_value(CameraOptions::fly_to(target, opts)).unwrap_or_else(|_| json!({}))
}

pub fn rotate_options(duration_ms: u64) -> Value {
    json!({ "duration": duration_ms })
}

/// Options for `new mapboxgl.Marker`, without the custom element.
pub fn marker_options(spec: &MarkerSpec) -> Value {
    serde_json::to_value(spec).unwrap_or_else(|_| json!({}))
}

pub fn terrain_source() -> Value {
    json!({
        "type": "raster-dem",
        "url": "mapbox://mapbox.mapbox-terrain-dem-v1",
        "tileSize": 512,
        "maxzoom": 20,
    })
}

pub fn terrain() -> Value {
    json!({ "source": TERRAIN_SOURCE, "exaggeration": 1 })
}

pub fn sky_layer(sky: Sky) -> Value {
    let paint = match sky {
        Sky::Night => json!({
            "sky-type": "gradient",
            "sky-gradient": ["interpolate", ["linear"], ["sky-radial-progress"], 0.8, "#040810", 1, "#040810"],
        }),
        Sky::Atmosphere => json!({
            "sky-type": "atmosphere",
            "sky-atmosphere-sun": [0.0, 0.0],
            "sky-atmosphere-sun-intensity": 15,
        }),
    };
    json!({ "id": "sky", "type": "sky", "paint": paint })
}

pub fn media_source(overlay: &MediaOverlay) -> Value {
    let coordinates = overlay.coordinates();
    match overlay.kind {
        MediaKind::Image => json!({
            "type": "image",
            "url": overlay.src,
            "coordinates": coordinates,
        }),
        MediaKind::Video => json!({
            "type": "video",
            "urls": [overlay.src],
            "coordinates": coordinates,
        }),
    }
}

pub fn media_layer(overlay: &MediaOverlay) -> Value {
    let paint = match overlay.kind {
        MediaKind::Image => json!({ "raster-fade-duration": 0 }),
        MediaKind::Video => json!({ "raster-opacity": 1 }),
    };
    json!({
        "id": overlay.layer_id,
        "type": "raster",
        "source": overlay.source_id,
        "paint": paint,
    })
}

pub fn edge_source(edge: &Edge) -> Value {
    json!({
        "type": "geojson",
        "data": {
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "LineString",
                "coordinates": [lng_lat_array(edge.source), lng_lat_array(edge.target)],
            },
        },
    })
}

pub fn edge_layer(edge: &Edge) -> Value {
    json!({
        "id": edge.id,
        "type": "line",
        "source": edge.id,
        "layout": { "line-cap": "round", "line-join": "round" },
        "paint": { "line-color": "#ffffff", "line-width": 4 },
    })
}

pub fn geocoder_options() -> Value {
    json!({
        "zoom": 18,
        "marker": false,
        "placeholder": "Search for an Address",
    })
}

/// Current camera of `map` as a view state.
fn camera(map: &MapboxMap) -> ViewState {
    let center = map.get_center();
    let read = |key: &str| {
        js_sys::Reflect::get(&center, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or_default()
    };
    ViewState::new(
        read("lng"),
        read("lat"),
        map.get_zoom(),
        map.get_bearing(),
        map.get_pitch(),
    )
}

struct PlacedMarker {
    marker: Marker,
    _on_click: Closure<dyn FnMut(Event)>,
}

/// [`MapEngine`] over a live `mapboxgl.Map`.
///
/// Map events are forwarded to the story through the [`Dispatcher`]; they
/// never call back while an engine method is running.
pub struct MapboxEngine {
    map: MapboxMap,
    dispatcher: Dispatcher,
    markers: HashMap<MarkerHandle, PlacedMarker>,
    next_marker: u64,
    _listeners: Vec<Closure<dyn FnMut()>>,
}

impl MapboxEngine {
    /// Create the map inside `container` and add the configured controls.
    pub fn new(container: &Element, config: &MapConfig, dispatcher: Dispatcher) -> Self {
        let options = to_js(&map_options(config));
        let _ = js_sys::Reflect::set(&options, &JsValue::from_str("container"), container);
        let map = MapboxMap::new(&options);

        let mut engine = Self {
            map,
            dispatcher,
            markers: HashMap::new(),
            next_marker: 0,
            _listeners: Vec::new(),
        };
        engine.add_controls(config);
        engine.listen();
        engine
    }

    fn add_controls(&self, config: &MapConfig) {
        let controls = config.controls;
        if controls.geocoder {
            if global_defined("MapboxGeocoder") {
                let options = to_js(&geocoder_options());
                if let Some(token) = &config.access_token {
                    let _ = js_sys::Reflect::set(
                        &options,
                        &JsValue::from_str("accessToken"),
                        &JsValue::from_str(token),
                    );
                }
                if let Ok(mapboxgl) =
                    js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))
                {
                    let _ = js_sys::Reflect::set(&options, &JsValue::from_str("mapboxgl"), &mapboxgl);
                }
                self.map.add_control(&Geocoder::new(&options));
            } else {
                tracing::warn!("geocoder requested but the MapboxGeocoder plugin is not loaded");
            }
        }
        if controls.geolocate {
            let options = to_js(&json!({ "showAccuracy": false, "showUserLocation": false }));
            self.map.add_control(&GeolocateControl::new(&options));
        }
        if controls.navigation {
            let options = to_js(&json!({ "visualizePitch": true }));
            self.map.add_control(&NavigationControl::new(&options));
        }
    }

    fn listen(&mut self) {
        let dispatcher = self.dispatcher.clone();
        let on_load = Closure::<dyn FnMut()>::new(move || dispatcher.send(Action::Loaded));
        self.map.on("load", on_load.as_ref().unchecked_ref());
        self._listeners.push(on_load);

        let dispatcher = self.dispatcher.clone();
        let map = self.map.clone();
        let on_moveend = Closure::<dyn FnMut()>::new(move || {
            dispatcher.send(Action::Settle(camera(&map)));
        });
        self.map.on("moveend", on_moveend.as_ref().unchecked_ref());
        self._listeners.push(on_moveend);
    }

    fn marker_element(spec: &MarkerSpec) -> Option<Element> {
        let html = spec.custom_html.as_deref()?;
        let el = crate::dom::document()?.create_element("div").ok()?;
        el.set_class_name(crate::dom::MARKER_TAG);
        el.set_inner_html(html);
        Some(el)
    }
}

impl MapEngine for MapboxEngine {
    fn fly_to(&mut self, target: ViewState, opts: FlyToOptions) {
        self.map.fly_to(&to_js(&fly_to_options(&target, opts)));
    }

    fn rotate_to(&mut self, bearing: f64, duration_ms: u64) {
        self.map
            .rotate_to(bearing, &to_js(&rotate_options(duration_ms)));
    }

    fn bearing(&self) -> f64 {
        self.map.get_bearing()
    }

    fn add_marker(&mut self, owner: &StopId, spec: &MarkerSpec, at: LngLat) -> MarkerHandle {
        let options = to_js(&marker_options(spec));
        if let Some(el) = Self::marker_element(spec) {
            let _ = js_sys::Reflect::set(&options, &JsValue::from_str("element"), &el);
        }
        let marker = Marker::new(&options);
        marker.set_lng_lat(&to_js(&lng_lat_array(at)));
        marker.add_to(&self.map);

        let dispatcher = self.dispatcher.clone();
        let owner = owner.clone();
        let on_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.stop_propagation();
            dispatcher.send(Action::Select(owner.clone()));
        });
        let _ = marker
            .get_element()
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());

        self.next_marker += 1;
        let handle = MarkerHandle(self.next_marker);
        self.markers.insert(
            handle,
            PlacedMarker {
                marker,
                _on_click: on_click,
            },
        );
        handle
    }

    fn move_marker(&mut self, marker: MarkerHandle, to: LngLat) {
        if let Some(placed) = self.markers.get(&marker) {
            placed.marker.set_lng_lat(&to_js(&lng_lat_array(to)));
        }
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        if let Some(placed) = self.markers.remove(&marker) {
            placed.marker.remove();
        }
    }

    fn configure_scene(&mut self, sky: Sky) {
        self.map
            .add_source(TERRAIN_SOURCE, &to_js(&terrain_source()));
        self.map.set_terrain(&to_js(&terrain()));
        self.map.add_layer(&to_js(&sky_layer(sky)));
    }

    fn add_media(&mut self, overlay: &MediaOverlay) {
        self.map
            .add_source(&overlay.source_id, &to_js(&media_source(overlay)));
        self.map.add_layer(&to_js(&media_layer(overlay)));
    }

    fn add_edge(&mut self, edge: &Edge) {
        self.map.add_source(&edge.id, &to_js(&edge_source(edge)));
        self.map.add_layer(&to_js(&edge_layer(edge)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storymap_shared::attrs::Attributes;
    use storymap_shared::markers::MarkerDecl;
    use storymap_shared::url_state::UrlState;

    fn overlay(kind: MediaKind) -> MediaOverlay {
        MediaOverlay {
            source_id: "dtrm-1".into(),
            layer_id: "dtrm-2".into(),
            kind,
            src: "clip.mp4".into(),
            corners: [
                LngLat::new(0.0, 1.0),
                LngLat::new(1.0, 1.0),
                LngLat::new(1.0, 0.0),
                LngLat::new(0.0, 0.0),
            ],
        }
    }

    #[test]
    fn test_fly_to_options_omit_duration_by_default() {
        let target = ViewState::new(10.0, 20.0, 5.0, 80.0, 60.0);
        let opts = fly_to_options(&target, FlyToOptions::default());
        assert_eq!(opts["center"][0], 10.0);
        assert_eq!(opts["center"][1], 20.0);
        assert_eq!(opts["bearing"], 80.0);
        assert!(opts.get("duration").is_none());
    }

    #[test]
    fn test_fly_to_options_with_duration() {
        let target = ViewState::new(0.0, 0.0, 1.0, 0.0, 0.0);
        let opts = fly_to_options(
            &target,
            FlyToOptions {
                duration_ms: Some(0),
            },
        );
        assert_eq!(opts["duration"], 0);
    }

    #[test]
    fn test_map_options_lock_interaction() {
        let mut root = Attributes::new().with("locked", "").with("zoom", "3");
        let config = MapConfig::resolve(&mut root, &UrlState::new());
        let opts = map_options(&config);
        assert_eq!(opts["zoom"], 3.0);
        assert_eq!(opts["interactive"], false);
        assert_eq!(opts["style"], config.style_url.as_str());
    }

    #[test]
    fn test_marker_options_for_custom_marker() {
        let spec = MarkerSpec::custom(&MarkerDecl {
            rotation_alignment: Some("map".into()),
            content_html: "<b>x</b>".into(),
        });
        let opts = marker_options(&spec);
        assert_eq!(opts["rotationAlignment"], "map");
        assert_eq!(opts["scale"], 0.0);
        assert!(opts.get("customHtml").is_none());
    }

    #[test]
    fn test_sky_layer_variants() {
        assert_eq!(sky_layer(Sky::Night)["paint"]["sky-type"], "gradient");
        assert_eq!(sky_layer(Sky::Atmosphere)["paint"]["sky-type"], "atmosphere");
    }

    #[test]
    fn test_video_source_lists_urls() {
        let source = media_source(&overlay(MediaKind::Video));
        assert_eq!(source["type"], "video");
        assert_eq!(source["urls"][0], "clip.mp4");
        assert_eq!(source["coordinates"][0][1], 1.0);
    }

    #[test]
    fn test_image_layer_references_source() {
        let layer = media_layer(&overlay(MediaKind::Image));
        assert_eq!(layer["id"], "dtrm-2");
        assert_eq!(layer["source"], "dtrm-1");
        assert_eq!(layer["paint"]["raster-fade-duration"], 0);
    }

    #[test]
    fn test_edge_is_a_line_between_endpoints() {
        let edge = Edge {
            id: "dtrm-3".into(),
            source: LngLat::new(1.0, 2.0),
            target: LngLat::new(3.0, 4.0),
        };
        let source = edge_source(&edge);
        let coords = &source["data"]["geometry"]["coordinates"];
        assert_eq!(coords[0][0], 1.0);
        assert_eq!(coords[1][1], 4.0);
        assert_eq!(edge_layer(&edge)["source"], "dtrm-3");
    }
}
