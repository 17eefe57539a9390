//! Route paths.

/// Paths starting with this prefix are never served from static assets.
pub const API_PREFIX: &str = "/api/";

/// Chat relay endpoint.
pub const API_CHAT: &str = "/api/chat";
