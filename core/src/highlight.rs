//! Query-term highlighting for search snippets.

use crate::page::{preview, ELLIPSIS, SNIPPET_CHARS};

/// Characters of context kept before the first match.
pub const CONTEXT_CHARS: usize = 50;
pub const EMPHASIS: &str = "**";

/// Build a snippet of `content` around the earliest occurrence of any of `terms`.
///
/// Terms are expected in tokenizer form (lowercase). Matching for the window position is
/// case-insensitive, but marking is not: only the literal term and its capitalized form
/// are wrapped in `EMPHASIS`. When no term occurs the plain preview is returned.
pub fn highlight(content: &str, terms: &[String]) -> String {
    let first = terms.iter().filter_map(|t| find_ignore_case(content, t)).min();
    let Some(first) = first else {
        return preview(content);
    };

    let start = first.saturating_sub(CONTEXT_CHARS);
    let mut window: String = content.chars().skip(start).take(SNIPPET_CHARS).collect();
    let mut marked: Vec<&String> = Vec::with_capacity(terms.len());
    for term in terms {
        if marked.contains(&term) {
            continue;
        }
        marked.push(term);
        window = mark(&window, term);
        let capitalized = capitalize(term);
        if capitalized != *term {
            window = mark(&window, &capitalized);
        }
    }
    format!("{ELLIPSIS}{window}{ELLIPSIS}")
}

fn mark(text: &str, needle: &str) -> String {
    if needle.is_empty() {
        return text.to_string();
    }
    text.replace(needle, &format!("{EMPHASIS}{needle}{EMPHASIS}"))
}

fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Character offset of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .char_indices()
        .enumerate()
        .find(|(_, (byte_pos, _))| starts_with_ignore_case(&haystack[*byte_pos..], needle))
        .map(|(char_pos, _)| char_pos)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut text = text.chars().flat_map(char::to_lowercase);
    prefix.chars().flat_map(char::to_lowercase).all(|p| text.next() == Some(p))
}
