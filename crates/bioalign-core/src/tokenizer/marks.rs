//! Punctuation tables shared by the tokenizer and the detokenizer.

/// Characters peeled off the edges of a word in [`super::TokenizerMode::Punctuation`].
pub const SPLIT_CHARS: &[char] = &[
    ',', '.', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '“', '”', '‘', '’',
    '„', '«', '»', '‹', '›', '…', '–', '—',
];

/// Tokens glued to the preceding token (no space before them).
pub const NO_SPACE_BEFORE: &[&str] = &[
    ",", ".", "!", "?", ";", ":", "]", ")", "}", "…", "”", "’", ">", ">>", "›", "»", "'s", "’s",
];

/// Tokens glued to the following token (no space after them).
pub const NO_SPACE_AFTER: &[&str] = &["[", "(", "{", "“", "‘", "„", "<", "<<", "‹", "«"];

/// A lone apostrophe.
pub const SINGLE_QUOTE: &str = "'";

/// Two apostrophes used as a closing double quote by some corpora.
pub const DOUBLED_QUOTE: &str = "''";
