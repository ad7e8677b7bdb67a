//! Core logic for the multi-group poster.
//!
//! This crate is intentionally platform-agnostic. Telegram lives behind the
//! `PlatformClient` port, implemented in the `mgp-telegram` adapter crate; the
//! presentation layer talks to [`poster::Poster`] and listens to
//! [`events::UiEvent`]s.

pub mod auth;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod events;
pub mod logging;
pub mod platform;
pub mod poster;

pub use errors::{Error, Result};
