//! Name normalization for comparison
//!
//! The normalized form is only ever used to compare names; the stored
//! canonical name keeps its original surface form.

const ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Canonicalize a candidate name for comparison
///
/// Strips a leading article, drops every character that is neither a word
/// character nor whitespace, collapses whitespace, trims and lower-cases.
/// The steps repeat until the output is stable, so
/// `normalize(normalize(x)) == normalize(x)` holds for inputs such as
/// `"The the Corp"`.
pub fn normalize(name: &str) -> String {
    let mut current = normalize_once(name);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(name: &str) -> String {
    let stripped = strip_leading_article(name);
    let words: String = stripped
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();
    collapse_whitespace(&words).to_lowercase()
}

/// Remove a leading "the"/"a"/"an" (any case) followed by whitespace
pub(crate) fn strip_leading_article(name: &str) -> &str {
    let Some(split) = name.find(char::is_whitespace) else {
        return name;
    };

    let (head, rest) = name.split_at(split);
    if ARTICLES.iter().any(|a| head.eq_ignore_ascii_case(a)) {
        rest.trim_start()
    } else {
        name
    }
}

/// Join whitespace-separated words with single spaces
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
