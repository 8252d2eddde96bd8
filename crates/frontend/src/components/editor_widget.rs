use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use crate::runtime::StoryHandle;

/// Capture the current camera as a new location and show its markup for
/// pasting into the page source.
#[component]
pub fn EditorWidget(handle: StoryHandle) -> Element {
    let mut title = use_signal(String::new);
    let mut body = use_signal(String::new);
    let mut markup = use_signal(String::new);
    let mut copied = use_signal(|| false);

    rsx! {
        div { class: "panel editor-widget",
            h3 { "New location" }
            input {
                r#type: "text",
                placeholder: "Title...",
                value: "{title}",
                oninput: move |evt: Event<FormData>| title.set(evt.value()),
            }
            textarea {
                placeholder: "Popup content (HTML)...",
                value: "{body}",
                oninput: move |evt: Event<FormData>| body.set(evt.value()),
            }
            button {
                onclick: move |_| {
                    let (new_title, new_body) = (title(), body());
                    match handle.add_location(&new_title, &new_body) {
                        Some(snippet) => {
                            markup.with_mut(|all| all.push_str(&snippet));
                            title.set(String::new());
                            body.set(String::new());
                        }
                        None => tracing::warn!("story map is busy, location not added"),
                    }
                },
                "Add location here"
            }
            if !markup.read().is_empty() {
                textarea { class: "editor-output", readonly: true, value: "{markup}" }
                button {
                    class: "secondary",
                    onclick: move |_| {
                        let text = markup.read().clone();
                        wasm_bindgen_futures::spawn_local(async move {
                            if let Some(window) = web_sys::window() {
                                let clipboard = window.navigator().clipboard();
                                let _ = wasm_bindgen_futures::JsFuture::from(
                                    clipboard.write_text(&text)
                                ).await;
                            }
                            copied.set(true);
                            TimeoutFuture::new(1_500).await;
                            copied.set(false);
                        });
                    },
                    if copied() { "Copied" } else { "Copy" }
                }
            }
        }
    }
}
