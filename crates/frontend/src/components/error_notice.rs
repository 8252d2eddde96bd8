use dioxus::prelude::*;

/// Inline error shown when the story map cannot start.
#[component]
pub fn ErrorNotice(message: String) -> Element {
    rsx! {
        div { class: "story-error", role: "alert", "{message}" }
    }
}
