use std::cell::Cell;

use storymap_shared::attrs::{AttributeBag, Attributes};
use storymap_shared::events::MapCommand;
use storymap_shared::markers::MarkerDecl;
use storymap_shared::media::{EdgeDecl, MediaDecl, MediaKind, CORNERS};
use storymap_shared::models::ElementKey;
use storymap_shared::registry::DeclaredLocation;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Element};

pub const ROOT_TAG: &str = "geo-map";
pub const LOCATION_TAG: &str = "map-location";
pub const MARKER_TAG: &str = "map-marker";
pub const DATA_TAG: &str = "map-data";
pub const EDGE_TAG: &str = "map-edge";
pub const KEY_ATTR: &str = "data-story-key";
/// Activity that re-arms the orbit countdown; covers mouse, touch and pen.
pub const POINTER_ACTIVITY_EVENT: &str = "pointermove";

/// Attributes whose change repositions a declared location.
pub const POSE_ATTRS: [&str; 5] = ["latitude", "longitude", "zoom", "bearing", "pitch"];

thread_local! {
    static NEXT_KEY: Cell<u64> = const { Cell::new(0) };
}

/// Live attribute bag over a DOM element.
pub struct ElementAttrs<'a>(pub &'a Element);

impl AttributeBag for ElementAttrs<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.0.has_attribute(name)
    }

    fn remove_attribute(&mut self, name: &str) {
        let _ = self.0.remove_attribute(name);
    }
}

pub fn document() -> Option<web_sys::Document> {
    web_sys::window()?.document()
}

/// The first map root on the page.
pub fn find_root() -> Option<Element> {
    document()?.query_selector(ROOT_TAG).ok().flatten()
}

/// Elements under `parent` matching `selector`, in document order.
pub fn query_all(parent: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = parent.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Key stored on the element, minted on first sight.
pub fn element_key(el: &Element) -> ElementKey {
    if let Some(key) = el.get_attribute(KEY_ATTR) {
        return ElementKey::new(key);
    }
    let key = mint_key(&el.tag_name().to_ascii_lowercase());
    let _ = el.set_attribute(KEY_ATTR, &key);
    ElementKey::new(key)
}

fn mint_key(tag: &str) -> String {
    let n = NEXT_KEY.with(|next| {
        next.set(next.get() + 1);
        next.get()
    });
    format!("{tag}-{n}")
}

/// Key of an element that may already be detached; never mints one.
pub fn existing_key(el: &Element) -> Option<ElementKey> {
    el.get_attribute(KEY_ATTR).map(ElementKey::new)
}

pub fn find_by_key(root: &Element, key: &ElementKey) -> Option<Element> {
    root.query_selector(&key_selector(key)).ok().flatten()
}

pub fn key_selector(key: &ElementKey) -> String {
    format!("[{KEY_ATTR}=\"{}\"]", key.as_str().replace('"', "\\\""))
}

/// Copy every attribute of `el` except the key marker.
pub fn snapshot(el: &Element) -> Attributes {
    el.get_attribute_names()
        .iter()
        .filter_map(|name| name.as_string())
        .filter(|name| name != KEY_ATTR)
        .filter_map(|name| {
            let value = el.get_attribute(&name)?;
            Some((name, value))
        })
        .collect()
}

/// Inner markup of a location without its marker children or notices.
fn location_body(el: &Element) -> String {
    let Ok(copy) = el.clone_node_with_deep(true) else {
        return el.inner_html();
    };
    let Ok(copy) = copy.dyn_into::<Element>() else {
        return el.inner_html();
    };
    for child in query_all(&copy, &format!("{MARKER_TAG}, error")) {
        child.remove();
    }
    copy.inner_html().trim().to_string()
}

pub fn declared_location(el: &Element) -> DeclaredLocation {
    let mut decl = DeclaredLocation::new(element_key(el).0, snapshot(el));
    decl.content_html = location_body(el);
    decl.markers = query_all(el, MARKER_TAG)
        .iter()
        .map(|marker| MarkerDecl {
            rotation_alignment: marker.get_attribute("rotation-alignment"),
            content_html: marker.inner_html(),
        })
        .collect();
    decl
}

/// Every `map-location` currently attached under the root.
pub fn declared_locations(root: &Element) -> Vec<DeclaredLocation> {
    query_all(root, LOCATION_TAG)
        .iter()
        .map(declared_location)
        .collect()
}

pub fn declared_media(root: &Element) -> Vec<MediaDecl> {
    let mut out = Vec::new();
    for kind in [MediaKind::Image, MediaKind::Video] {
        for el in query_all(root, &kind.element().to_string()) {
            let corners = CORNERS
                .iter()
                .filter_map(|corner| {
                    let found = el.query_selector(corner).ok().flatten()?;
                    Some((corner.to_string(), snapshot(&found)))
                })
                .collect();
            out.push(MediaDecl {
                key: element_key(&el),
                kind,
                attrs: snapshot(&el),
                corners,
            });
        }
    }
    out
}

pub fn declared_edges(root: &Element) -> Vec<EdgeDecl> {
    query_all(root, EDGE_TAG)
        .iter()
        .map(|el| EdgeDecl {
            key: element_key(el),
            attrs: snapshot(el),
        })
        .collect()
}

/// Append a new `map-location` carrying `attrs` and `body` to `parent`.
pub fn append_location(parent: &Element, attrs: &Attributes, body: &str) -> Option<Element> {
    let el = parent.owner_document()?.create_element(LOCATION_TAG).ok()?;
    for (name, value) in attrs.iter() {
        let _ = el.set_attribute(name, value);
    }
    el.set_inner_html(body);
    parent.append_child(&el).ok()?;
    Some(el)
}

pub fn render_notice(el: &Element, text: &str) {
    el.set_inner_html(&format!("<error> {text} </error>"));
}

/// Fire a bare `CustomEvent` named `name` on `target`.
pub fn dispatch(target: &Element, name: &str) {
    match CustomEvent::new(name) {
        Ok(event) => {
            let _ = target.dispatch_event(&event);
        }
        Err(err) => tracing::warn!(event = name, "could not create event: {err:?}"),
    }
}

/// Send `cmd` to the map root as its wire event.
pub fn dispatch_command(cmd: MapCommand) {
    match find_root() {
        Some(root) => dispatch(&root, cmd.wire_name()),
        None => tracing::warn!(command = %cmd, "no map root to receive command"),
    }
}
