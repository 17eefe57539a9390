//! # cachamita_core
//!
//! Core domain logic for Cachamita: menu lookup, prompt assembly,
//! streamed inference providers and reply consumption.

pub mod chat;
pub mod completion;
pub mod menu;
pub mod migrate;
pub mod persona;
pub mod prompt;
pub mod render;
pub mod reply;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
