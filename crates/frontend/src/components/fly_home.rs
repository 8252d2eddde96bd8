use dioxus::prelude::*;
use storymap_shared::events::MapCommand;

use crate::dom;

#[component]
pub fn FlyHomeButton() -> Element {
    rsx! {
        button {
            class: "fly-home",
            title: "Zoom out to the whole world",
            onclick: move |_| dom::dispatch_command(MapCommand::FlyHome),
            "🌍"
        }
    }
}
