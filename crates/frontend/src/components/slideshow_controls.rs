use dioxus::prelude::*;
use storymap_shared::events::MapCommand;

use crate::dom;

/// Previous / home / next buttons. They talk to the map only through its
/// wire events, so any script on the page can drive the tour the same way.
#[component]
pub fn SlideshowControls() -> Element {
    rsx! {
        div { class: "slideshow-controls",
            button {
                class: "slide-prev",
                title: "Previous location",
                onclick: move |_| dom::dispatch_command(MapCommand::PrevSlide),
                "◀"
            }
            button {
                class: "slide-home",
                title: "Back to start",
                onclick: move |_| dom::dispatch_command(MapCommand::ShowHome),
                "⌂"
            }
            button {
                class: "slide-next",
                title: "Next location",
                onclick: move |_| dom::dispatch_command(MapCommand::NextSlide),
                "▶"
            }
        }
    }
}
