//! # Span Resolver
//!
//! Drops malformed entity spans and picks a non-overlapping subset of the
//! rest: earliest start first, longest span on ties.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{char_slice, Document, EntitySpan};

/// Why a span was left out of a document's annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("span is empty or reversed")]
    Empty,
    #[error("span ends past the end of the text ({len} chars)")]
    OutOfBounds { len: usize },
    #[error("span starts on whitespace")]
    LeadingWhitespace,
    #[error("span ends on whitespace")]
    TrailingWhitespace,
    #[error("span boundary falls inside a token")]
    BisectsToken,
    #[error("span covers no token")]
    CoversNoToken,
}

/// A span that was dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSpan {
    pub span: EntitySpan,
    pub reason: RejectReason,
}

impl RejectedSpan {
    /// Logs the rejection with the offending slice of `text`.
    pub(crate) fn report(&self, text: &str) {
        let len = text.chars().count();
        let slice = char_slice(text, self.span.start.min(len), self.span.end.min(len)).unwrap_or("");
        warn!(
            start = self.span.start,
            end = self.span.end,
            label = %self.span.label,
            slice,
            reason = %self.reason,
            "rejected entity span"
        );
    }
}

/// Outcome of validating and resolving a document's spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Non-overlapping spans ordered by start.
    pub accepted: Vec<EntitySpan>,
    /// Malformed spans.
    pub rejected: Vec<RejectedSpan>,
}

/// Validates entity spans and removes overlaps.
pub struct SpanResolver;

impl SpanResolver {
    /// Splits `spans` into well-formed spans and rejections.
    ///
    /// A span is rejected if it is empty or reversed, if it runs past the text,
    /// or if its first or last char is whitespace. Each rejection is logged.
    pub fn validate(
        text: &str,
        spans: impl IntoIterator<Item = EntitySpan>,
    ) -> (Vec<EntitySpan>, Vec<RejectedSpan>) {
        let chars: Vec<char> = text.chars().collect();
        let mut valid = Vec::new();
        let mut rejected = Vec::new();

        for span in spans {
            let reason = if span.start >= span.end {
                Some(RejectReason::Empty)
            } else if span.end > chars.len() {
                Some(RejectReason::OutOfBounds { len: chars.len() })
            } else if chars[span.start].is_whitespace() {
                Some(RejectReason::LeadingWhitespace)
            } else if chars[span.end - 1].is_whitespace() {
                Some(RejectReason::TrailingWhitespace)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    let rejection = RejectedSpan { span, reason };
                    rejection.report(text);
                    rejected.push(rejection);
                }
                None => valid.push(span),
            }
        }

        (valid, rejected)
    }

    /// Selects non-overlapping spans.
    ///
    /// Candidates are sorted by `(start ascending, length descending)` and
    /// accepted greedily when they start at or after the end of the last
    /// accepted span. Nested spans lose to their enclosing span whatever
    /// their label. Empty spans are skipped.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::align::SpanResolver;
    /// use bioalign_core::types::{EntityLabel, EntitySpan};
    ///
    /// let kept = SpanResolver::resolve(vec![
    ///     EntitySpan::new(0, 3, EntityLabel::Org),
    ///     EntitySpan::new(0, 5, EntityLabel::Per),
    /// ]);
    /// assert_eq!(kept, vec![EntitySpan::new(0, 5, EntityLabel::Per)]);
    /// ```
    pub fn resolve(spans: impl IntoIterator<Item = EntitySpan>) -> Vec<EntitySpan> {
        let mut candidates: Vec<EntitySpan> = spans.into_iter().filter(|s| !s.is_empty()).collect();
        candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));

        let mut accepted: Vec<EntitySpan> = Vec::with_capacity(candidates.len());
        for span in candidates {
            match accepted.last() {
                Some(last) if span.start < last.end => {
                    debug!(
                        start = span.start,
                        end = span.end,
                        label = %span.label,
                        kept_start = last.start,
                        kept_end = last.end,
                        "discarded overlapping span"
                    );
                }
                _ => accepted.push(span),
            }
        }
        accepted
    }

    /// Validates and resolves a document's spans in one pass.
    pub fn resolve_document(document: &Document) -> Resolution {
        let (valid, rejected) = Self::validate(document.text(), document.entities().iter().cloned());
        Resolution {
            accepted: Self::resolve(valid),
            rejected,
        }
    }
}
