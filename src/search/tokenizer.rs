//! Text tokenization shared by indexing and querying.

use std::collections::HashSet;

/// Split `text` into a set of lowercase tokens.
///
/// A token is a maximal run of letters, digits, apostrophes, hyphens,
/// or underscores. Every other character ends the current token and is
/// dropped. Empty tokens are never produced.
///
/// ```
/// use zksearch::tokenize;
///
/// let tokens = tokenize("Buy coffee at McDonald's!");
/// assert!(tokens.contains("mcdonald's"));
/// assert_eq!(tokens.len(), 4);
/// ```
pub fn tokenize(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_token_char(c) {
            current.push(c);
        } else if !current.is_empty() {
            tokens.insert(current.to_lowercase());
            current.clear();
        }
    }

    if !current.is_empty() {
        tokens.insert(current.to_lowercase());
    }

    tokens
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '\'' | '-' | '_')
}
