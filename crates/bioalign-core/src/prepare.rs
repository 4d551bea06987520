//! # Record Preparation
//!
//! Normalizes every [`InputRecord`] shape into a tokenized document with one
//! IOB2 tag per token.

use tracing::debug;

use crate::align::{RejectedSpan, SpanResolver, SpanTagger};
use crate::config::AlignConfig;
use crate::error::Result;
use crate::gazetteer::EntityClassifier;
use crate::tokenizer::{Detokenizer, Tokenizer};
use crate::types::{
    zip_tagged, AnchoredRecord, BioTag, Document, EntitySpan, InputRecord, LabelMap,
    PreTokenizedRecord, RawTextRecord, TagSet, TagValue, TaggedToken, Token, TokenizedDocument,
};

/// A document ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    /// Text, the entities that made it into the tags, and the tokens.
    pub tokenized: TokenizedDocument,
    /// One IOB2 tag per token.
    pub tags: Vec<BioTag>,
    /// Spans left out, with reasons.
    pub rejected: Vec<RejectedSpan>,
}

impl PreparedDocument {
    pub fn tokens(&self) -> &[Token] {
        &self.tokenized.tokens
    }

    pub fn tagged(&self) -> Vec<TaggedToken> {
        zip_tagged(&self.tokenized.tokens, &self.tags)
    }
}

/// Turns input records into [`PreparedDocument`]s.
#[derive(Debug, Clone)]
pub struct Preparer {
    tokenizer: Tokenizer,
    detokenizer: Detokenizer,
    label_map: LabelMap,
    tag_set: TagSet,
}

impl Default for Preparer {
    fn default() -> Self {
        Self::new(&AlignConfig::default())
    }
}

impl Preparer {
    pub fn new(config: &AlignConfig) -> Self {
        Self {
            tokenizer: config.tokenizer(),
            detokenizer: Detokenizer::default(),
            label_map: config.label_map.clone(),
            tag_set: config.tag_set.clone(),
        }
    }

    /// Replaces the detokenizer used for pre-tokenized records.
    pub fn with_detokenizer(mut self, detokenizer: Detokenizer) -> Self {
        self.detokenizer = detokenizer;
        self
    }

    /// Prepares any record. Only anchored records consult `classifier`.
    pub fn prepare(
        &self,
        record: &InputRecord,
        classifier: &dyn EntityClassifier,
    ) -> Result<PreparedDocument> {
        match record {
            InputRecord::RawText(raw) => self.prepare_raw(raw),
            InputRecord::PreTokenized(tokens) => self.prepare_tokens(tokens),
            InputRecord::Anchored(anchored) => self.prepare_anchored(anchored, classifier),
        }
    }

    /// Tokenizes raw text and projects its char spans onto the tokens.
    ///
    /// # Errors
    ///
    /// Returns `BioalignError::UnknownTag` if an entity label cannot be mapped.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::prepare::Preparer;
    /// use bioalign_core::types::{RawEntity, RawTextRecord};
    ///
    /// let record = RawTextRecord {
    ///     text: "John lives in Paris.".into(),
    ///     entities: vec![RawEntity { start: 14, end: 19, label: "LOC".into() }],
    /// };
    /// let doc = Preparer::default().prepare_raw(&record).unwrap();
    /// let tags: Vec<String> = doc.tags.iter().map(|t| t.to_string()).collect();
    /// assert_eq!(tags, ["O", "O", "O", "B-LOC", "O"]);
    /// ```
    pub fn prepare_raw(&self, record: &RawTextRecord) -> Result<PreparedDocument> {
        let spans = record
            .entities
            .iter()
            .map(|e| Ok(EntitySpan::new(e.start, e.end, self.label_map.apply(&e.label)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.project(&record.text, spans))
    }

    /// Rebuilds text from discrete tokens and keeps their tags.
    ///
    /// Tags are normalized to IOB2: an `I-X` that opens an entity becomes `B-X`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown tag name, a tag index outside the tag set, or a
    /// token/tag count mismatch.
    pub fn prepare_tokens(&self, record: &PreTokenizedRecord) -> Result<PreparedDocument> {
        let tags = record
            .tags
            .iter()
            .map(|tag| match tag {
                TagValue::Index(i) => self.tag_set.get(*i).cloned(),
                TagValue::Name(name) => self.label_map.apply_tag(name),
            })
            .collect::<Result<Vec<_>>>()?;

        let tokenized = self.detokenizer.to_document(&record.tokens, &tags)?;
        let outcome = SpanTagger::tag(&tokenized.tokens, tokenized.document.entities());
        Ok(PreparedDocument {
            tokenized,
            tags: outcome.tags,
            rejected: outcome.rejected,
        })
    }

    /// Classifies anchors into entity spans, then proceeds as for raw text.
    ///
    /// Anchors with a missing or non-numeric offset, or that the classifier
    /// drops, are skipped.
    pub fn prepare_anchored(
        &self,
        record: &AnchoredRecord,
        classifier: &dyn EntityClassifier,
    ) -> Result<PreparedDocument> {
        let mut spans = Vec::with_capacity(record.anchors.len());
        for anchor in &record.anchors {
            let start = anchor.start.as_ref().and_then(|o| o.value());
            let end = anchor.end.as_ref().and_then(|o| o.value());
            let label = classifier.classify(anchor.qid.as_deref());

            match (start, end, label) {
                (Some(start), Some(end), Some(label)) => spans.push(EntitySpan::new(start, end, label)),
                _ => debug!(
                    start = ?anchor.start,
                    end = ?anchor.end,
                    qid = anchor.qid.as_deref().unwrap_or_default(),
                    "skipped anchor"
                ),
            }
        }
        Ok(self.project(&record.text, spans))
    }

    fn project(&self, text: &str, spans: Vec<EntitySpan>) -> PreparedDocument {
        let (valid, mut rejected) = SpanResolver::validate(text, spans);

        // Token alignment is checked before overlaps are resolved.
        let tokens = self.tokenizer.tokenize(text);
        let outcome = SpanTagger::tag(&tokens, &valid);
        for rejection in &outcome.rejected {
            rejection.report(text);
        }
        rejected.extend(outcome.rejected);

        PreparedDocument {
            tokenized: TokenizedDocument::new(Document::new(text, outcome.placed), tokens),
            tags: outcome.tags,
            rejected,
        }
    }
}
