use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
}

/// Tokens of this many bytes or fewer are dropped.
pub const MIN_TOKEN_LEN: usize = 2;

/// Tokenize text into lowercase terms: maximal runs of letters and digits, longer than
/// `MIN_TOKEN_LEN` bytes. Indexing and query parsing share this rule.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text)
        .map(|mat| mat.as_str())
        .filter(|token| token.len() > MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}
