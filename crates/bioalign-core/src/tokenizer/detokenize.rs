//! # Detokenizer
//!
//! Rebuilds display text from a discrete token list, for corpora that ship
//! tokens and tags instead of raw text and spans. Offsets of the rebuilt
//! tokens are recorded so that tags survive the trip unchanged.

use std::collections::HashSet;

use super::marks::{DOUBLED_QUOTE, NO_SPACE_AFTER, NO_SPACE_BEFORE, SINGLE_QUOTE};
use crate::error::{BioalignError, Result};
use crate::types::{BioTag, Document, EntitySpan, Token, TokenizedDocument};

/// Joins tokens into text using punctuation attachment rules.
#[derive(Debug, Clone)]
pub struct Detokenizer {
    no_space_before: HashSet<String>,
    no_space_after: HashSet<String>,
}

impl Default for Detokenizer {
    fn default() -> Self {
        Self {
            no_space_before: NO_SPACE_BEFORE.iter().map(|s| s.to_string()).collect(),
            no_space_after: NO_SPACE_AFTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Detokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token that attaches to its left neighbour.
    pub fn with_no_space_before(mut self, token: impl Into<String>) -> Self {
        self.no_space_before.insert(token.into());
        self
    }

    /// Adds a token that attaches to its right neighbour.
    pub fn with_no_space_after(mut self, token: impl Into<String>) -> Self {
        self.no_space_after.insert(token.into());
        self
    }

    /// Whether each token is followed by a space.
    ///
    /// The last token never is.
    pub fn spaces<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<bool> {
        let mut spaces = vec![true; tokens.len()];
        if let Some(last) = spaces.last_mut() {
            *last = false;
        }

        for (i, token) in tokens.iter().enumerate() {
            let token = token.as_ref();
            if i > 0 {
                let prev = tokens[i - 1].as_ref();
                if self.no_space_before.contains(token) || is_quote_pair(prev, token) {
                    spaces[i - 1] = false;
                }
            }
            if self.no_space_after.contains(token) {
                spaces[i] = false;
            }
        }

        spaces
    }

    /// Joins tokens into a sentence and returns the tokens with their offsets in it.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::tokenizer::Detokenizer;
    ///
    /// let (text, _) = Detokenizer::new().detokenize(&["The", ",", "cat", "'s", "toy", "."]);
    /// assert_eq!(text, "The, cat's toy.");
    /// ```
    pub fn detokenize<S: AsRef<str>>(&self, tokens: &[S]) -> (String, Vec<Token>) {
        let spaces = self.spaces(tokens);
        let mut text = String::new();
        let mut offset = 0;
        let mut out = Vec::with_capacity(tokens.len());

        for (index, (token, &space)) in tokens.iter().zip(&spaces).enumerate() {
            let token = token.as_ref();
            let len = token.chars().count();
            out.push(Token::new(token, offset, offset + len, index));
            text.push_str(token);
            offset += len;
            if space {
                text.push(' ');
                offset += 1;
            }
        }

        (text, out)
    }

    /// Rebuilds a document with entity spans from tokens and their BIO tags.
    ///
    /// `B-X` opens an entity and `I-X` extends an open `X` entity. An `I-X`
    /// with nothing to extend opens a new one, so IOB1-style input still yields
    /// entities.
    ///
    /// # Errors
    ///
    /// Fails when the counts differ or a token is empty.
    pub fn to_document<S: AsRef<str>>(
        &self,
        tokens: &[S],
        tags: &[BioTag],
    ) -> Result<TokenizedDocument> {
        if tokens.len() != tags.len() {
            return Err(BioalignError::TokenTagCountMismatch {
                tokens: tokens.len(),
                tags: tags.len(),
            });
        }

        if let Some(index) = tokens.iter().position(|t| t.as_ref().is_empty()) {
            return Err(BioalignError::EmptyToken { index });
        }

        let (text, tokens) = self.detokenize(tokens);
        let mut entities = Vec::new();
        let mut open: Option<EntitySpan> = None;

        for (token, tag) in tokens.iter().zip(tags) {
            match tag {
                BioTag::Begin(label) => {
                    entities.extend(open.take());
                    open = Some(EntitySpan::new(token.start, token.end, label.clone()));
                }
                BioTag::Inside(label) => match open.as_mut() {
                    Some(span) if span.label == *label => span.end = token.end,
                    _ => {
                        entities.extend(open.take());
                        open = Some(EntitySpan::new(token.start, token.end, label.clone()));
                    }
                },
                BioTag::Outside => entities.extend(open.take()),
            }
        }
        entities.extend(open);

        Ok(TokenizedDocument::new(Document::new(text, entities), tokens))
    }
}

fn is_quote_pair(prev: &str, next: &str) -> bool {
    (prev == SINGLE_QUOTE && next == DOUBLED_QUOTE) || (prev == DOUBLED_QUOTE && next == SINGLE_QUOTE)
}
