use dioxus::prelude::*;

use crate::components::editor_widget::EditorWidget;
use crate::components::error_notice::ErrorNotice;
use crate::components::fly_home::FlyHomeButton;
use crate::components::slideshow_controls::SlideshowControls;
use crate::dom;
use crate::runtime::StoryHandle;

#[component]
pub fn StoryPage() -> Element {
    let mut story = use_signal(|| None::<StoryHandle>);
    let mut missing_root = use_signal(|| false);

    // The author's markup lives outside the app; boot once it is mounted.
    use_effect(move || {
        let Some(root) = dom::find_root() else {
            tracing::error!(tag = dom::ROOT_TAG, "no map root on the page");
            missing_root.set(true);
            return;
        };
        match StoryHandle::boot(root) {
            Ok(handle) => story.set(Some(handle)),
            // Already rendered inside the root.
            Err(err) => tracing::error!("story map failed to start: {err}"),
        }
    });

    let handle = story.read().clone();
    let controls = handle
        .as_ref()
        .and_then(|h| h.controls())
        .unwrap_or_default();

    rsx! {
        if missing_root() {
            ErrorNotice { message: format!("Story maps need a <{}> element on the page.", dom::ROOT_TAG) }
        }
        if let Some(handle) = handle {
            div { class: "story-controls",
                if controls.slideshow {
                    SlideshowControls {}
                }
                if controls.flyhome {
                    FlyHomeButton {}
                }
            }
            if controls.edit {
                EditorWidget { handle }
            }
        }
    }
}
