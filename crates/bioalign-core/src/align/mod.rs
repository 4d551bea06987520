//! Span resolution and conversion between spans and BIO tags.

pub mod render;
pub mod resolver;
pub mod subword;
pub mod tagger;

pub use render::{locate_entities, render_entities, SentencePrediction};
pub use resolver::{RejectReason, RejectedSpan, Resolution, SpanResolver};
pub use subword::{
    align_char_predictions, AlignOutcome, CharEntity, DropReason, DroppedEntity, PredictedEntity,
    SubwordAligner, TokenAlignment, DEFAULT_CONTINUATION_PREFIXES,
};
pub use tagger::{SpanTagger, TagOutcome};
