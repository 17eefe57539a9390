//! Menu lookup — finds menu items matching a free-text term.
//!
//! # Public API
//!
//! - [`MenuLookup`] — lookup capability injected into the HTTP layer
//! - [`menu_context`] — runs a lookup and renders the prompt context text,
//!   degrading to a fixed notice when the store fails
//! - [`queries::PgMenu`] — PostgreSQL-backed lookup
//! - [`memory::InMemoryMenu`] — lookup over a fixed list (JSON file or tests)

pub mod memory;
pub mod queries;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of rows returned for a matching term.
pub const MATCH_LIMIT: i64 = 5;

/// Number of rows suggested when nothing matches.
pub const SUGGESTION_LIMIT: i64 = 3;

/// Context text used when the menu store cannot be queried.
pub const DEGRADED_CONTEXT: &str = "Error consultando precios. Ofrece el menú general.";

const MATCHES_PREFIX: &str = "INFORMACIÓN DEL MENÚ ENCONTRADA: ";
const SUGGESTIONS_PREFIX: &str = "No hay coincidencia exacta. Sugiere estos platos: ";

/// Menu lookup errors.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Menu file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Menu file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A row of the `menu_items` table.
///
/// `id` is substituted verbatim into photo URLs; it is not validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub categoria: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub precio: f64,
}

impl MenuItem {
    /// Case-insensitive substring match against name, category and description.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [&self.nombre, &self.categoria, &self.descripcion]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Rows matching the term (at most [`MATCH_LIMIT`]).
    Matches(Vec<MenuItem>),
    /// Nothing matched; a fixed-size sample to suggest instead.
    Suggestions(Vec<MenuItem>),
}

impl LookupOutcome {
    pub fn items(&self) -> &[MenuItem] {
        match self {
            Self::Matches(items) | Self::Suggestions(items) => items,
        }
    }

    /// Render the outcome as the text embedded in the system prompt.
    pub fn to_context(&self) -> String {
        let (prefix, items) = match self {
            Self::Matches(items) => (MATCHES_PREFIX, items),
            Self::Suggestions(items) => (SUGGESTIONS_PREFIX, items),
        };
        let rows = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
        format!("{prefix}{rows}")
    }
}

/// Lookup capability over the menu store.
#[async_trait]
pub trait MenuLookup: Send + Sync {
    /// Find rows whose name, category or description contains `term`
    /// (case-insensitive), falling back to a suggestion sample when none do.
    async fn find_menu_items(&self, term: &str) -> Result<LookupOutcome, MenuError>;
}

/// Run a lookup and render its prompt context.
///
/// Store failures are logged and replaced by [`DEGRADED_CONTEXT`]; they never
/// reach the caller.
pub async fn menu_context(lookup: &dyn MenuLookup, term: &str) -> String {
    match lookup.find_menu_items(term).await {
        Ok(outcome) => {
            debug!(
                term,
                matched = matches!(outcome, LookupOutcome::Matches(_)),
                rows = outcome.items().len(),
                "menu lookup finished"
            );
            outcome.to_context()
        }
        Err(e) => {
            warn!(term, "menu lookup failed, using degraded context: {e}");
            DEGRADED_CONTEXT.to_string()
        }
    }
}
