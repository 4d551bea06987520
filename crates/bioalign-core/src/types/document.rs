use serde::{Deserialize, Serialize};

use super::label::{BioTag, EntityLabel};

/// A labelled, half-open `[start, end)` interval over a document's text.
///
/// Offsets count chars (Unicode scalar values), which is what dataset
/// loaders emit for non-ASCII text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    /// First char of the mention (inclusive).
    pub start: usize,
    /// One past the last char of the mention (exclusive).
    pub end: usize,
    /// Entity category.
    pub label: EntityLabel,
}

impl EntitySpan {
    /// Creates a span. No validation happens here; see [`crate::align::SpanResolver`].
    pub fn new(start: usize, end: usize, label: EntityLabel) -> Self {
        Self { start, end, label }
    }

    /// Number of chars covered (zero for reversed spans).
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the span covers no chars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the two spans share at least one char.
    #[must_use]
    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if `[start, end)` lies entirely inside this span.
    #[must_use]
    pub fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Raw text plus its entity annotations.
///
/// Documents are immutable once built; tokens and tags are derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    text: String,
    entities: Vec<EntitySpan>,
}

impl Document {
    /// Creates a document from its text and (unvalidated) entity spans.
    #[must_use]
    pub fn new(text: impl Into<String>, entities: Vec<EntitySpan>) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }

    /// The document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Entity spans in the order they were supplied.
    pub fn entities(&self) -> &[EntitySpan] {
        &self.entities
    }

    /// Length of the text in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The text covered by `[start, end)` char offsets, if in bounds.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        char_slice(&self.text, start, end)
    }
}

/// Slices `text` by char offsets. Returns `None` when out of bounds or reversed.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let byte_start = char_to_byte(text, start)?;
    let byte_end = byte_start + char_to_byte(&text[byte_start..], end - start)?;
    Some(&text[byte_start..byte_end])
}

/// Converts a char offset into a byte offset. `char_len` maps to `text.len()`.
fn char_to_byte(text: &str, offset: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}

/// A token with char offsets into its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text content.
    pub text: String,
    /// Start char offset in the original text.
    pub start: usize,
    /// End char offset in the original text (exclusive).
    pub end: usize,
    /// Token index in the sequence.
    pub index: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
        }
    }

    /// Returns `true` if `offset` falls strictly between the token's first and last boundary.
    #[must_use]
    pub fn splits_at(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }
}

/// A token paired with its BIO tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: Token,
    pub tag: BioTag,
}

impl TaggedToken {
    pub fn new(token: Token, tag: BioTag) -> Self {
        Self { token, tag }
    }
}

/// Zips tokens with tags. Extra items on either side are ignored.
pub fn zip_tagged(tokens: &[Token], tags: &[BioTag]) -> Vec<TaggedToken> {
    tokens
        .iter()
        .zip(tags)
        .map(|(token, tag)| TaggedToken::new(token.clone(), tag.clone()))
        .collect()
}

/// A document together with the token sequence its tags refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedDocument {
    pub document: Document,
    pub tokens: Vec<Token>,
}

impl TokenizedDocument {
    pub fn new(document: Document, tokens: Vec<Token>) -> Self {
        Self { document, tokens }
    }

    /// Token texts in order.
    pub fn token_texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}
