pub mod editor_widget;
pub mod error_notice;
pub mod fly_home;
pub mod slideshow_controls;
