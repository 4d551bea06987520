//! # Bioalign Core
//!
//! Converts between raw text with char-offset entity spans, offset-exact
//! tokens, and token-level IOB2 tags. Also resolves overlapping spans,
//! realigns sub-word model predictions onto gold word tokens and scores
//! predictions at the entity level.
//!
//! ## Quick Start
//!
//! ```rust
//! use bioalign_core::align::SpanTagger;
//! use bioalign_core::tokenizer::Tokenizer;
//! use bioalign_core::types::{EntityLabel, EntitySpan};
//!
//! let tokens = Tokenizer::default().tokenize("John Smith works at Acme.");
//! let outcome = SpanTagger::tag(
//!     &tokens,
//!     &[
//!         EntitySpan::new(0, 4, EntityLabel::Per),
//!         EntitySpan::new(0, 10, EntityLabel::Per),
//!         EntitySpan::new(20, 24, EntityLabel::Org),
//!     ],
//! );
//!
//! let tags: Vec<String> = outcome.tags.iter().map(|t| t.to_string()).collect();
//! assert_eq!(tags, ["B-PER", "I-PER", "O", "O", "B-ORG", "O"]);
//! ```
pub mod align;
pub mod config;
pub mod error;
pub mod eval;
pub mod gazetteer;
pub mod prepare;
pub mod tokenizer;
pub mod types;

// Re-export primary API
pub use align::{
    align_char_predictions, render_entities, AlignOutcome, CharEntity, DropReason,
    PredictedEntity, RejectReason, RejectedSpan, SpanResolver, SpanTagger, SubwordAligner,
    TagOutcome,
};
pub use config::AlignConfig;
pub use error::{BioalignError, Result};
pub use eval::{score, Report, Scorer};
pub use gazetteer::{EntityClassifier, Gazetteer};
pub use prepare::{PreparedDocument, Preparer};
pub use tokenizer::{segment_sentences, Detokenizer, SentenceSplitter, Tokenizer, TokenizerMode};
pub use types::{
    BioTag, Document, EntityLabel, EntitySpan, InputRecord, LabelMap, RecordSchema, TagSet,
    Token, TokenizedDocument,
};
