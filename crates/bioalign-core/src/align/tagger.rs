use std::ops::Range;

use tracing::debug;

use super::resolver::{RejectReason, RejectedSpan, SpanResolver};
use crate::types::{zip_tagged, BioTag, EntitySpan, TaggedToken, Token};

/// Tags produced for a token sequence plus the spans that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutcome {
    /// One tag per token, always valid IOB2.
    pub tags: Vec<BioTag>,
    /// Spans whose boundaries do not line up with tokens.
    pub rejected: Vec<RejectedSpan>,
    /// Spans the tags were written from, non-overlapping and ordered by start.
    pub placed: Vec<EntitySpan>,
}

impl TagOutcome {
    /// Pairs each token with its tag.
    pub fn tagged(&self, tokens: &[Token]) -> Vec<TaggedToken> {
        zip_tagged(tokens, &self.tags)
    }
}

/// Projects char-offset entity spans onto a token sequence as IOB2 tags.
pub struct SpanTagger;

impl SpanTagger {
    /// Tags `tokens` from `spans`.
    ///
    /// A span whose start or end falls inside a token, or which covers no
    /// token, is rejected before overlaps are resolved, so a misaligned span
    /// never displaces a good one. The first token inside a span gets `B-`,
    /// the rest `I-`, and tokens outside every span get `O`. Tokens must be
    /// ordered by offset, as the tokenizer emits them.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::align::SpanTagger;
    /// use bioalign_core::tokenizer::Tokenizer;
    /// use bioalign_core::types::{EntityLabel, EntitySpan};
    ///
    /// let tokens = Tokenizer::default().tokenize("John lives in Paris.");
    /// let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(14, 19, EntityLabel::Loc)]);
    /// let tags: Vec<String> = outcome.tags.iter().map(|t| t.to_string()).collect();
    /// assert_eq!(tags, ["O", "O", "O", "B-LOC", "O"]);
    /// ```
    pub fn tag(tokens: &[Token], spans: &[EntitySpan]) -> TagOutcome {
        let mut tags = vec![BioTag::Outside; tokens.len()];
        let mut rejected = Vec::new();
        let mut aligned = Vec::with_capacity(spans.len());

        for span in spans {
            match Self::token_range(tokens, span) {
                Ok(_) => aligned.push(span.clone()),
                Err(reason) => {
                    debug!(
                        start = span.start,
                        end = span.end,
                        label = %span.label,
                        reason = %reason,
                        "span does not line up with tokens"
                    );
                    rejected.push(RejectedSpan {
                        span: span.clone(),
                        reason,
                    });
                }
            }
        }

        let mut placed = Vec::with_capacity(aligned.len());
        for span in SpanResolver::resolve(aligned) {
            let Ok(range) = Self::token_range(tokens, &span) else {
                continue;
            };
            tags[range.start] = BioTag::Begin(span.label.clone());
            for tag in &mut tags[range.start + 1..range.end] {
                *tag = BioTag::Inside(span.label.clone());
            }
            placed.push(span);
        }

        TagOutcome {
            tags,
            rejected,
            placed,
        }
    }

    /// Indices of the tokens `span` covers, if its edges fall on token boundaries.
    fn token_range(tokens: &[Token], span: &EntitySpan) -> Result<Range<usize>, RejectReason> {
        let first = tokens.partition_point(|t| t.end <= span.start);
        let last = tokens.partition_point(|t| t.start < span.end);

        let bisects = tokens.get(first).is_some_and(|t| t.splits_at(span.start))
            || last
                .checked_sub(1)
                .and_then(|i| tokens.get(i))
                .is_some_and(|t| t.splits_at(span.end));

        if bisects {
            Err(RejectReason::BisectsToken)
        } else if first >= last {
            Err(RejectReason::CoversNoToken)
        } else {
            Ok(first..last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, TokenizerMode};
    use crate::types::{is_valid_iob2, EntityLabel};

    fn names(tags: &[BioTag]) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_single_token_entity() {
        let tokens = Tokenizer::default().tokenize("John lives in Paris.");
        let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(14, 19, EntityLabel::Loc)]);
        assert_eq!(names(&outcome.tags), ["O", "O", "O", "B-LOC", "O"]);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_multi_token_entity() {
        let tokens = Tokenizer::default().tokenize("Ana Marija Kovač radi u Splitu");
        let outcome = SpanTagger::tag(
            &tokens,
            &[
                EntitySpan::new(0, 16, EntityLabel::Per),
                EntitySpan::new(24, 30, EntityLabel::Loc),
            ],
        );
        assert_eq!(
            names(&outcome.tags),
            ["B-PER", "I-PER", "I-PER", "O", "O", "B-LOC"]
        );
    }

    #[test]
    fn test_nested_span_loses_to_outer() {
        let tokens = Tokenizer::default().tokenize("John Smith works");
        let outcome = SpanTagger::tag(
            &tokens,
            &[
                EntitySpan::new(0, 4, EntityLabel::Per),
                EntitySpan::new(0, 10, EntityLabel::Org),
            ],
        );
        assert_eq!(names(&outcome.tags), ["B-ORG", "I-ORG", "O"]);
    }

    #[test]
    fn test_misaligned_outer_span_keeps_inner() {
        let tokens = Tokenizer::default().tokenize("John Smithson works");
        let outcome = SpanTagger::tag(
            &tokens,
            &[
                EntitySpan::new(0, 4, EntityLabel::Per),
                EntitySpan::new(0, 10, EntityLabel::Org),
            ],
        );
        assert_eq!(names(&outcome.tags), ["B-PER", "O", "O"]);
        assert_eq!(outcome.placed, [EntitySpan::new(0, 4, EntityLabel::Per)]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].span.label, EntityLabel::Org);
        assert_eq!(outcome.rejected[0].reason, RejectReason::BisectsToken);
    }

    #[test]
    fn test_span_inside_token_is_rejected() {
        let tokens = Tokenizer::new(TokenizerMode::Whitespace).tokenize("Paris-based firm");
        let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(0, 5, EntityLabel::Loc)]);
        assert_eq!(names(&outcome.tags), ["O", "O"]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectReason::BisectsToken);
    }

    #[test]
    fn test_span_over_whitespace_covers_no_token() {
        let tokens = Tokenizer::default().tokenize("a    b");
        let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(2, 4, EntityLabel::Misc)]);
        assert_eq!(outcome.rejected[0].reason, RejectReason::CoversNoToken);

        let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(10, 12, EntityLabel::Misc)]);
        assert_eq!(outcome.rejected[0].reason, RejectReason::CoversNoToken);
    }

    #[test]
    fn test_no_tokens() {
        let outcome = SpanTagger::tag(&[], &[EntitySpan::new(0, 3, EntityLabel::Per)]);
        assert!(outcome.tags.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_overlapping_input_stays_iob2_valid() {
        let text = "one two three four five six";
        let tokens = Tokenizer::default().tokenize(text);
        let spans = vec![
            EntitySpan::new(0, 7, EntityLabel::Per),
            EntitySpan::new(4, 13, EntityLabel::Org),
            EntitySpan::new(8, 18, EntityLabel::Loc),
            EntitySpan::new(19, 27, EntityLabel::Misc),
            EntitySpan::new(24, 27, EntityLabel::Per),
        ];
        let outcome = SpanTagger::tag(&tokens, &spans);
        assert!(is_valid_iob2(&outcome.tags));
        assert_eq!(
            names(&outcome.tags),
            ["B-PER", "I-PER", "B-LOC", "I-LOC", "B-MISC", "I-MISC"]
        );
    }

    #[test]
    fn test_tagged_pairs() {
        let tokens = Tokenizer::default().tokenize("in Paris");
        let outcome = SpanTagger::tag(&tokens, &[EntitySpan::new(3, 8, EntityLabel::Loc)]);
        let tagged = outcome.tagged(&tokens);
        assert_eq!(tagged[1].token.text, "Paris");
        assert_eq!(tagged[1].tag, BioTag::Begin(EntityLabel::Loc));
    }
}
