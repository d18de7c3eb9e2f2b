//! Chat panel: transcript, composer and inline notices

pub mod composer;
pub mod notice;
pub mod transcript;
pub mod widget;

pub use widget::{ChatWidget, WidgetAction};
