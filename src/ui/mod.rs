//! UI module for parley.
//!
//! This module contains all rendering logic:
//! - Main layout: message list, status cell, input line
//! - Markdown rendering for assistant messages
//! - Popup overlays (help, config, profiles)
//! - Toast notifications

mod markdown;
mod overlay;
mod render;
mod text;
mod toast;

pub use overlay::Overlay;
pub use render::ui;
pub use text::{wrap_spans, wrap_text};
pub use toast::{ToastLevel, ToastState};
