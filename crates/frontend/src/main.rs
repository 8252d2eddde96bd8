mod api;
mod browser;
mod components;
mod dom;
mod mapbox;
mod pages;
mod runtime;

use dioxus::prelude::*;

const CSS: Asset = asset!("/assets/main.css");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Stylesheet { href: CSS }
        pages::story::StoryPage {}
    }
}

fn main() {
    launch(App);
}
