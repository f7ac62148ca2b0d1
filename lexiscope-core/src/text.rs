//! Script-based language detection for tracked words.
//!
//! Mirrors the `lang` column materialized on `Word`: any Cyrillic letter
//! selects the Russian normalization branch, everything else falls back to
//! English.

use serde::Serialize;

/// Normalization branch for `lemmatize`/`stem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ru,
    En,
}

impl Lang {
    /// Language code understood by the store's NLP functions.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::En => "en",
        }
    }

    /// Detect the branch for a word.
    pub fn detect(word: &str) -> Self {
        if word.chars().any(is_cyrillic) {
            Lang::Ru
        } else {
            Lang::En
        }
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, 'а'..='я' | 'ё' | 'А'..='Я' | 'Ё')
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// Extract the first word from free-text input.
///
/// The input is lowercased and trimmed; the result is the first maximal run
/// of letters from a single alphabet (Cyrillic or Latin). Returns `None` when
/// the input holds no such letters.
pub fn first_word(input: &str) -> Option<String> {
    let lowered = input.trim().to_lowercase();
    let mut chars = lowered.chars().peekable();

    while let Some(&c) = chars.peek() {
        let same_script: fn(char) -> bool = if is_cyrillic(c) {
            is_cyrillic
        } else if is_latin(c) {
            is_latin
        } else {
            chars.next();
            continue;
        };

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if !same_script(c) {
                break;
            }
            word.push(c);
            chars.next();
        }
        return Some(word);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_script() {
        assert_eq!(Lang::detect("привет"), Lang::Ru);
        assert_eq!(Lang::detect("hello"), Lang::En);
        assert_eq!(Lang::detect("ёлка"), Lang::Ru);
        assert_eq!(Lang::detect("123"), Lang::En);
        assert_eq!(Lang::detect("hi привет"), Lang::Ru);
    }

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("  Hello, world").as_deref(), Some("hello"));
        assert_eq!(first_word("«Привет»!").as_deref(), Some("привет"));
        assert_eq!(first_word("42 cats").as_deref(), Some("cats"));
        assert_eq!(first_word("catкот").as_deref(), Some("cat"));
        assert_eq!(first_word("ЁЖ").as_deref(), Some("ёж"));
        assert_eq!(first_word("1234 !?"), None);
        assert_eq!(first_word(""), None);
    }
}
