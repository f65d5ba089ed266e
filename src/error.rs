//! Re-exports of this crate's recoverable error types.
//!
//! The teacher keeps a single `error.rs` wrapping whatever its other
//! modules produce (`ATreeError` wraps `ATreeParseError`/`EventError`).
//! This crate has no top-level operation that can fail in more than one
//! way at once — `Config::add_attr_domain` only ever fails with
//! [`ConfigError`], event building only ever fails with [`EventError`] —
//! so there is no analogous umbrella enum; this module exists purely to
//! give callers one place to import both from.

pub use crate::event::EventError;
pub use crate::interner::ConfigError;
