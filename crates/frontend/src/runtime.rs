//! Owns the running story map; browser callbacks reach it as [`Action`]s.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use storymap_shared::config::{Controls, MapConfig};
use storymap_shared::engine::{FrameId, TimerId};
use storymap_shared::error::{ElementKind, Error};
use storymap_shared::events::{LocationEvent, MapCommand};
use storymap_shared::ids::SequentialIds;
use storymap_shared::models::{ElementKey, StopId, ViewState};
use storymap_shared::url_state::UrlStateCodec;
use storymap_shared::StoryMap;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, MutationObserver, MutationObserverInit, MutationRecord, NodeList};

use crate::api;
use crate::browser::BrowserPage;
use crate::dom::{self, ElementAttrs};
use crate::mapbox::{self, MapboxEngine};

const MAPBOX_MISSING: &str =
    "STORY MAP REQUIRES MAPBOXGL TO WORK: https://docs.mapbox.com/mapbox-gl-js/api/";

type Story = StoryMap<MapboxEngine, BrowserPage>;

#[derive(Debug, Clone)]
pub enum Action {
    Command(MapCommand),
    Select(StopId),
    Settle(ViewState),
    Timer(TimerId),
    Frame(FrameId, f64),
    Pointer,
    Mutation,
    Updated(ElementKey),
    Removed(ElementKey),
    Loaded,
}

struct StoryCell {
    root: Element,
    story: RefCell<Option<Story>>,
    deferred: RefCell<VecDeque<Action>>,
    listeners: RefCell<Vec<Closure<dyn FnMut(Event)>>>,
    observer: RefCell<Option<(MutationObserver, Closure<dyn FnMut(js_sys::Array)>)>>,
}

impl Drop for StoryCell {
    fn drop(&mut self) {
        if let Some((observer, _callback)) = self.observer.get_mut().take() {
            observer.disconnect();
        }
    }
}

/// Sends actions to a story without keeping it alive.
#[derive(Clone)]
pub struct Dispatcher(Weak<StoryCell>);

impl Dispatcher {
    pub fn send(&self, action: Action) {
        match self.0.upgrade() {
            Some(cell) => StoryHandle(cell).run(action),
            None => debug!(?action, "story is gone, dropping action"),
        }
    }
}

#[derive(Clone)]
pub struct StoryHandle(Rc<StoryCell>);

impl PartialEq for StoryHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl StoryHandle {
    /// Start the story on `root`. Fatal problems are rendered into the
    /// root and returned.
    pub fn boot(root: Element) -> Result<Self, String> {
        if !mapbox::global_defined("mapboxgl") {
            dom::render_notice(&root, MAPBOX_MISSING);
            return Err(MAPBOX_MISSING.to_string());
        }
        let window = web_sys::window().ok_or("no window")?;
        let location = window.location();
        let js_err = |e: JsValue| format!("{e:?}");
        let href = location.href().map_err(js_err)?;
        let base = format!(
            "{}{}",
            location.origin().map_err(js_err)?,
            location.pathname().map_err(js_err)?
        );

        let codec = UrlStateCodec::new(base);
        let url_state = codec.decode(&href);
        let config = MapConfig::resolve(&mut ElementAttrs(&root), &url_state);
        let Some(token) = config.access_token.as_deref() else {
            let notice = Error::MissingAccessToken.notice();
            dom::render_notice(&root, &notice);
            return Err(notice);
        };
        mapbox::set_access_token(token)?;

        let cell = Rc::new(StoryCell {
            root: root.clone(),
            story: RefCell::new(None),
            deferred: RefCell::new(VecDeque::new()),
            listeners: RefCell::new(Vec::new()),
            observer: RefCell::new(None),
        });
        let dispatcher = Dispatcher(Rc::downgrade(&cell));

        let engine = MapboxEngine::new(&root, &config, dispatcher.clone());
        let page = BrowserPage::new(window, root.clone(), dispatcher.clone());
        let story = StoryMap::with_config(
            config,
            codec,
            Box::new(SequentialIds::new()),
            engine,
            page,
        );
        *cell.story.borrow_mut() = Some(story);

        let handle = StoryHandle(cell);
        handle.listen(&dispatcher);
        handle.observe(&dispatcher);
        handle.load_feeds(&dispatcher);
        handle.drain();
        info!("story map booted");
        Ok(handle)
    }

    pub fn root(&self) -> &Element {
        &self.0.root
    }

    pub fn controls(&self) -> Option<Controls> {
        let story = self.0.story.try_borrow().ok()?;
        story.as_ref().map(|s| s.config().controls)
    }

    pub fn submit(&self, cmd: MapCommand) {
        self.run(Action::Command(cmd));
    }

    /// Draft a location at the current camera, append it to the map and
    /// return its markup.
    pub fn add_location(&self, title: &str, body: &str) -> Option<String> {
        let draft = {
            let story = self.0.story.try_borrow().ok()?;
            story.as_ref()?.capture_location(title, body)
        };
        dom::append_location(&self.0.root, &draft.attributes, body)?;
        Some(draft.markup)
    }

    fn run(&self, action: Action) {
        self.0.deferred.borrow_mut().push_back(action);
        self.drain();
    }

    fn drain(&self) {
        loop {
            // Already borrowed means an outer drain is running and will
            // pick the queued action up.
            let Ok(mut slot) = self.0.story.try_borrow_mut() else {
                return;
            };
            let Some(story) = slot.as_mut() else {
                return;
            };
            let Some(action) = self.0.deferred.borrow_mut().pop_front() else {
                return;
            };
            apply(story, &self.0.root, action);
        }
    }

    fn add_listener(
        &self,
        target: &web_sys::EventTarget,
        name: &str,
        capture: bool,
        f: impl FnMut(Event) + 'static,
    ) {
        let closure = Closure::<dyn FnMut(Event)>::new(f);
        if let Err(err) = target.add_event_listener_with_callback_and_bool(
            name,
            closure.as_ref().unchecked_ref(),
            capture,
        ) {
            warn!(event = name, "could not add listener: {err:?}");
            return;
        }
        self.0.listeners.borrow_mut().push(closure);
    }

    fn listen(&self, dispatcher: &Dispatcher) {
        let root = self.0.root.clone();

        for cmd in MapCommand::ALL {
            let d = dispatcher.clone();
            self.add_listener(&root, cmd.wire_name(), false, move |_| {
                d.send(Action::Command(cmd))
            });
        }

        // Location events do not bubble; listen in the capture phase.
        let d = dispatcher.clone();
        self.add_listener(&root, LocationEvent::Updated.wire_name(), true, move |event| {
            if let Some(el) = event_element(&event) {
                d.send(Action::Updated(dom::element_key(&el)));
            }
        });
        let d = dispatcher.clone();
        self.add_listener(&root, LocationEvent::Removed.wire_name(), true, move |event| {
            if let Some(key) = event_element(&event).and_then(|el| dom::existing_key(&el)) {
                d.send(Action::Removed(key));
            }
        });

        if let Some(body) = dom::document().and_then(|d| d.body()) {
            let d = dispatcher.clone();
            self.add_listener(&body, dom::POINTER_ACTIVITY_EVENT, false, move |_| {
                d.send(Action::Pointer)
            });
        }
    }

    fn observe(&self, dispatcher: &Dispatcher) {
        let d = dispatcher.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |records: js_sys::Array| {
            let mut membership = false;
            for record in records.iter() {
                let record: MutationRecord = record.unchecked_into();
                match record.type_().as_str() {
                    "childList" => {
                        for key in removed_location_keys(&record.removed_nodes()) {
                            d.send(Action::Removed(key));
                            membership = true;
                        }
                        membership |= has_locations(&record.added_nodes());
                    }
                    "attributes" => {
                        let target = record.target().and_then(|n| n.dyn_into::<Element>().ok());
                        if let Some(el) = target.filter(is_location) {
                            dom::dispatch(&el, LocationEvent::Updated.wire_name());
                        }
                    }
                    _ => {}
                }
            }
            if membership {
                d.send(Action::Mutation);
            }
        });

        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                warn!("could not create mutation observer: {err:?}");
                return;
            }
        };
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_attributes(true);
        let filter: js_sys::Array = dom::POSE_ATTRS.iter().map(|a| JsValue::from_str(a)).collect();
        init.set_attribute_filter(&filter);
        if let Err(err) = observer.observe_with_options(&self.0.root, &init) {
            warn!("could not observe map root: {err:?}");
            return;
        }
        *self.0.observer.borrow_mut() = Some((observer, callback));
    }

    /// Fetch every `map-data` feed and append its entries as locations.
    fn load_feeds(&self, dispatcher: &Dispatcher) {
        for el in dom::query_all(&self.0.root, dom::DATA_TAG) {
            let Some(src) = el.get_attribute("src").filter(|s| !s.is_empty()) else {
                dom::render_notice(&el, &Error::MissingSource(ElementKind::Data).notice());
                continue;
            };
            let _ = el.remove_attribute("src");
            let d = dispatcher.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match api::fetch_feed(&src).await {
                    Ok(feed) => {
                        for entry in &feed.markers {
                            // The element key is minted on first snapshot, so
                            // repeated feed ids still get distinct keys.
                            let decl = entry.to_declared(entry.element_id());
                            let _ = dom::append_location(&el, &decl.attrs, &decl.content_html);
                        }
                        info!(src = %src, entries = feed.markers.len(), "marker feed loaded");
                        d.send(Action::Mutation);
                        d.send(Action::Command(MapCommand::ShowHome));
                    }
                    Err(err) => {
                        warn!(src = %src, "could not load marker feed: {err}");
                        dom::render_notice(&el, &format!("Error: {err}"));
                    }
                }
            });
        }
    }
}

fn apply(story: &mut Story, root: &Element, action: Action) {
    match action {
        Action::Command(cmd) => {
            story.submit(cmd);
            story.pump();
        }
        Action::Select(id) => story.select_stop(&id),
        Action::Settle(pose) => story.on_engine_settle(pose),
        Action::Timer(timer) => {
            story.page_mut().timer_fired(timer);
            story.on_timer(timer);
        }
        Action::Frame(frame, timestamp) => {
            story.page_mut().frame_fired(frame);
            story.on_frame(frame, timestamp);
        }
        Action::Pointer => story.on_pointer_activity(),
        Action::Mutation => story.on_mutation(&dom::declared_locations(root)),
        Action::Updated(key) => match dom::find_by_key(root, &key) {
            Some(el) => story.location_updated(&key, &dom::snapshot(&el)),
            None => debug!(key = %key, "updated location is not attached"),
        },
        Action::Removed(key) => story.location_removed(&key),
        Action::Loaded => story.on_engine_loaded(
            &dom::declared_locations(root),
            &dom::declared_media(root),
            &dom::declared_edges(root),
        ),
    }
}

fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn is_location(el: &Element) -> bool {
    el.tag_name().eq_ignore_ascii_case(dom::LOCATION_TAG)
}

/// The element itself when it is a location, plus any nested locations.
fn locations_in(nodes: &NodeList) -> Vec<Element> {
    let mut out = Vec::new();
    for node in (0..nodes.length()).filter_map(|i| nodes.get(i)) {
        let Ok(el) = node.dyn_into::<Element>() else {
            continue;
        };
        if is_location(&el) {
            out.push(el.clone());
        }
        out.extend(dom::query_all(&el, dom::LOCATION_TAG));
    }
    out
}

fn removed_location_keys(nodes: &NodeList) -> Vec<ElementKey> {
    locations_in(nodes)
        .iter()
        .filter_map(dom::existing_key)
        .collect()
}

fn has_locations(nodes: &NodeList) -> bool {
    !locations_in(nodes).is_empty()
}
