//! Reply text transforms for the terminal client.
//!
//! The model embeds dish photos as `![foto](URL)`; [`to_terminal`] turns them
//! into a bracketed link.

use std::sync::LazyLock;

use regex::Regex;

static IMAGE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("image markup pattern is valid")
});

/// Render reply text for a plain terminal.
pub fn to_terminal(text: &str) -> String {
    IMAGE_MARKUP.replace_all(text, "[$1: $2]").into_owned()
}
