//! # Offset-preserving Tokenizer
//!
//! Splits raw text into tokens and records the exact char offsets of every
//! token, which the span tagger relies on.

use serde::{Deserialize, Serialize};

use super::marks::SPLIT_CHARS;
use crate::types::Token;

/// How words are cut into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// Whitespace runs only: `"Paris."` stays one token.
    Whitespace,
    /// Whitespace runs, then leading and trailing punctuation become their
    /// own tokens: `"(Paris)."` gives `"("`, `"Paris"`, `")"`, `"."`.
    #[default]
    Punctuation,
}

/// Tokenizer for raw document text.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    mode: TokenizerMode,
}

impl Tokenizer {
    /// Create a new tokenizer instance.
    pub fn new(mode: TokenizerMode) -> Self {
        Self { mode }
    }

    /// The configured mode.
    pub fn mode(&self) -> TokenizerMode {
        self.mode
    }

    /// Tokenize text into a sequence of tokens.
    ///
    /// Whitespace is dropped. For every token,
    /// `char_slice(text, token.start, token.end) == Some(&token.text)`.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::tokenizer::{Tokenizer, TokenizerMode};
    ///
    /// let tokenizer = Tokenizer::new(TokenizerMode::Punctuation);
    /// let tokens = tokenizer.tokenize("John lives in Paris.");
    /// let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    /// assert_eq!(texts, ["John", "lives", "in", "Paris", "."]);
    /// ```
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        // (char offset, byte offset) of the word being read
        let mut word: Option<(usize, usize)> = None;

        for (char_idx, (byte_idx, c)) in text.char_indices().enumerate() {
            if c.is_whitespace() {
                if let Some((char_start, byte_start)) = word.take() {
                    self.emit(&text[byte_start..byte_idx], char_start, &mut tokens);
                }
            } else if word.is_none() {
                word = Some((char_idx, byte_idx));
            }
        }

        if let Some((char_start, byte_start)) = word {
            self.emit(&text[byte_start..], char_start, &mut tokens);
        }

        tokens
    }

    fn emit(&self, word: &str, char_start: usize, tokens: &mut Vec<Token>) {
        match self.mode {
            TokenizerMode::Whitespace => {
                let len = word.chars().count();
                push(tokens, word.to_string(), char_start, char_start + len);
            }
            TokenizerMode::Punctuation => {
                let chars: Vec<char> = word.chars().collect();
                let mut lo = 0;
                let mut hi = chars.len();

                while lo < hi && SPLIT_CHARS.contains(&chars[lo]) {
                    push(tokens, chars[lo].to_string(), char_start + lo, char_start + lo + 1);
                    lo += 1;
                }

                let mut trailing = Vec::new();
                while hi > lo && SPLIT_CHARS.contains(&chars[hi - 1]) {
                    hi -= 1;
                    trailing.push(hi);
                }

                if lo < hi {
                    let core: String = chars[lo..hi].iter().collect();
                    push(tokens, core, char_start + lo, char_start + hi);
                }

                for &pos in trailing.iter().rev() {
                    push(tokens, chars[pos].to_string(), char_start + pos, char_start + pos + 1);
                }
            }
        }
    }
}

fn push(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    let index = tokens.len();
    tokens.push(Token {
        text,
        start,
        end,
        index,
    });
}
