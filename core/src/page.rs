use serde::{Deserialize, Serialize};

/// Number of content characters kept in a precomputed snippet.
pub const SNIPPET_CHARS: usize = 200;
pub const ELLIPSIS: &str = "...";

/// A crawled page. The URL is the identity and is never normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub content: String,
}

impl PageRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let snippet = preview(&content);
        Self { url: url.into(), title: title.into(), snippet, content }
    }

    /// Record emitted for a URL whose fetch failed.
    pub fn empty(url: impl Into<String>) -> Self {
        Self { url: url.into(), title: String::new(), snippet: String::new(), content: String::new() }
    }

    pub fn is_empty(&self) -> bool { self.title.is_empty() && self.content.is_empty() }
}

/// First `SNIPPET_CHARS` characters of `text`, with a trailing ellipsis when truncated.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
