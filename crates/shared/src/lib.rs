//! Declarative story-map core; map engines and pages plug in through [`engine`].

pub mod attrs;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod events;
pub mod feed;
pub mod ids;
pub mod markers;
pub mod media;
pub mod models;
pub mod registry;
pub mod story;
pub mod tour;
pub mod url_state;
pub mod view_state;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use story::StoryMap;
