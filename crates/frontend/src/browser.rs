use std::collections::HashMap;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use storymap_shared::engine::{FrameId, PageHost, TimerId};
use storymap_shared::events::MapEvent;
use storymap_shared::models::{ElementKey, InfoBox, ZoomBand};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, Window};

use crate::dom;
use crate::runtime::{Action, Dispatcher};

pub const INFO_BOX_TAG: &str = "map-information-box";
const CLOSE_CLASS: &str = "close-button";

/// Markup of an information box: close button, then the stop's own body.
pub fn info_box_html(info: &InfoBox) -> String {
    format!(
        r#"<button class="{CLOSE_CLASS}" aria-label="Close">&times;</button>{}"#,
        info.content_html
    )
}

/// Accessible name of the box; the title is not rendered as text.
pub fn info_box_label(info: &InfoBox) -> Option<&str> {
    info.title.as_deref().filter(|t| !t.is_empty())
}

pub struct BrowserPage {
    window: Window,
    root: Element,
    dispatcher: Dispatcher,
    timers: HashMap<TimerId, Timeout>,
    frames: HashMap<FrameId, (i32, Closure<dyn FnMut(f64)>)>,
    next_handle: u64,
    _on_close: Closure<dyn FnMut(Event)>,
}

impl BrowserPage {
    pub fn new(window: Window, root: Element, dispatcher: Dispatcher) -> Self {
        // One delegated listener closes whichever box the button belongs to.
        let on_close = Closure::<dyn FnMut(Event)>::new(|event: Event| {
            let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            if !target.class_list().contains(CLOSE_CLASS) {
                return;
            }
            if let Ok(Some(info_box)) = target.closest(INFO_BOX_TAG) {
                info_box.remove();
            }
        });
        let _ = root.add_event_listener_with_callback("click", on_close.as_ref().unchecked_ref());

        Self {
            window,
            root,
            dispatcher,
            timers: HashMap::new(),
            frames: HashMap::new(),
            next_handle: 0,
            _on_close: on_close,
        }
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Forget a timer that has fired.
    pub fn timer_fired(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    /// Forget a frame request that has been delivered.
    pub fn frame_fired(&mut self, frame: FrameId) {
        self.frames.remove(&frame);
    }
}

impl PageHost for BrowserPage {
    fn push_history(&mut self, url: &str, page_counter: u64) {
        let result = self.window.history().and_then(|history| {
            history.push_state_with_url(
                &JsValue::from_f64(page_counter as f64),
                "",
                Some(url),
            )
        });
        if let Err(err) = result {
            tracing::warn!(url, "could not push history entry: {err:?}");
        }
    }

    fn start_timer(&mut self, delay: Duration) -> TimerId {
        let timer = TimerId(self.next_handle());
        let dispatcher = self.dispatcher.clone();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || dispatcher.send(Action::Timer(timer)));
        self.timers.insert(timer, timeout);
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        // Dropping a gloo timeout clears it.
        self.timers.remove(&timer);
    }

    fn request_frame(&mut self) -> FrameId {
        let frame = FrameId(self.next_handle());
        let dispatcher = self.dispatcher.clone();
        let callback = Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            dispatcher.send(Action::Frame(frame, timestamp));
        });
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(request) => {
                self.frames.insert(frame, (request, callback));
            }
            Err(err) => tracing::warn!("requestAnimationFrame failed: {err:?}"),
        }
        frame
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        if let Some((request, _callback)) = self.frames.remove(&frame) {
            let _ = self.window.cancel_animation_frame(request);
        }
    }

    fn show_info_box(&mut self, info: &InfoBox) {
        let Some(document) = self.root.owner_document() else {
            return;
        };
        match document.create_element(INFO_BOX_TAG) {
            Ok(el) => {
                if let Some(label) = info_box_label(info) {
                    let _ = el.set_attribute("aria-label", label);
                }
                el.set_inner_html(&info_box_html(info));
                let _ = self.root.append_child(&el);
            }
            Err(err) => tracing::warn!("could not create information box: {err:?}"),
        }
    }

    fn clear_info_boxes(&mut self) {
        for el in dom::query_all(&self.root, INFO_BOX_TAG) {
            el.remove();
        }
    }

    fn set_zoom_band(&mut self, band: ZoomBand) {
        let classes = self.root.class_list();
        for other in ZoomBand::ALL {
            if other != band {
                let _ = classes.remove_1(other.class_name());
            }
        }
        let _ = classes.add_1(band.class_name());
    }

    fn render_notice(&mut self, element: &ElementKey, text: &str) {
        match dom::find_by_key(&self.root, element) {
            Some(el) => dom::render_notice(&el, text),
            None => tracing::warn!(key = %element, "notice target is no longer attached"),
        }
    }

    fn emit(&mut self, event: MapEvent) {
        dom::dispatch(&self.root, event.wire_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storymap_shared::models::StopId;

    #[test]
    fn test_info_box_html_shows_content_once_without_heading() {
        let info = InfoBox {
            stop: StopId("dtrm-1".into()),
            title: Some("Harbour".into()),
            content_html: "<h1>Harbour</h1><p>Boats</p>".into(),
        };
        let html = info_box_html(&info);
        assert!(html.starts_with(r#"<button class="close-button""#));
        assert!(!html.contains("<h3>"));
        assert_eq!(html.matches("Harbour").count(), 1);
        assert!(html.ends_with("<p>Boats</p>"));
    }

    #[test]
    fn test_info_box_label_skips_empty_title() {
        let mut info = InfoBox {
            stop: StopId("dtrm-1".into()),
            title: Some("Harbour & Quay".into()),
            content_html: "body".into(),
        };
        assert_eq!(info_box_label(&info), Some("Harbour & Quay"));
        info.title = Some(String::new());
        assert_eq!(info_box_label(&info), None);
        info.title = None;
        assert_eq!(info_box_label(&info), None);
    }
}
