//! API server configuration.

use std::path::PathBuf;

use cachamita_core::completion::CompletionLimits;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8787").
    pub bind_addr: String,
    /// Directory holding the front-end assets.
    pub static_dir: PathBuf,
    /// Output bounds for every completion.
    pub limits: CompletionLimits,
}
