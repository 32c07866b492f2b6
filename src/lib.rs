//! Bevel serves a search landing page and drives the hosted search widget
//! embedded in it.
//!
//! - [`assets`] maps request paths onto files and picks their content type.
//! - [`web`] is the HTTP server (behind the `web` feature).
//! - [`controller`] is the page-side state machine that reacts to widget
//!   lifecycle events, quick links and keyboard shortcuts.

pub mod assets;
pub mod controller;
#[cfg(feature = "web")]
pub mod web;

pub use assets::{DEFAULT_ENTRY, content_type_for, resolve_request_path};
pub use controller::{Controller, Effect, Page, PanelView, PendingQuery, UiEvent, UiState};
