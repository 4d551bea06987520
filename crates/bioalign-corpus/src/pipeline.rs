//! # Preparation Pipeline
//!
//! Streams JSON Lines records through the preparer into a corpus sink.
//! A record that fails to decode or prepare is logged and skipped; a sink
//! failure stops the run.

use std::io::{BufRead, Write};

use bioalign_core::config::AlignConfig;
use bioalign_core::gazetteer::{EntityClassifier, Gazetteer};
use bioalign_core::prepare::{PreparedDocument, Preparer};
use bioalign_core::types::RecordSchema;
use tracing::{debug, info, info_span, warn};

use crate::conll::ConllWriter;
use crate::container::{ContainerDoc, ContainerWriter};
use crate::error::Result;

/// Destination for prepared documents.
pub trait DocumentSink {
    fn accept(&mut self, doc: &PreparedDocument) -> Result<()>;
}

impl<W: Write> DocumentSink for ConllWriter<W> {
    fn accept(&mut self, doc: &PreparedDocument) -> Result<()> {
        self.write_sentence(&doc.tokenized.token_texts(), &doc.tags)
    }
}

impl DocumentSink for ContainerWriter {
    fn accept(&mut self, doc: &PreparedDocument) -> Result<()> {
        self.push(&ContainerDoc::from(doc))
    }
}

impl DocumentSink for Vec<PreparedDocument> {
    fn accept(&mut self, doc: &PreparedDocument) -> Result<()> {
        self.push(doc.clone());
        Ok(())
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Documents handed to the sink.
    pub documents: usize,
    /// Records skipped because they failed to decode or prepare.
    pub failed: usize,
    /// Records with no tokens, which are not passed to the sink.
    pub empty: usize,
    /// Entity spans left out of otherwise good documents.
    pub rejected_spans: usize,
    pub tokens: usize,
}

/// Prepares a stream of records of one schema.
pub struct Pipeline {
    preparer: Preparer,
    schema: RecordSchema,
    classifier: Box<dyn EntityClassifier>,
    language: String,
}

impl Pipeline {
    pub fn new(config: &AlignConfig, schema: RecordSchema) -> Self {
        Self {
            preparer: Preparer::new(config),
            schema,
            classifier: Box::new(Gazetteer::default()),
            language: String::new(),
        }
    }

    /// Classifier for anchored records.
    pub fn with_classifier(mut self, classifier: Box<dyn EntityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Language code attached to every log line of the run.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Prepares every non-blank line of `input` and feeds it to `sink`.
    ///
    /// # Errors
    ///
    /// Fails on an I/O error reading `input` or when the sink fails.
    /// Bad records are counted in [`PipelineStats::failed`] instead.
    pub fn run<R: BufRead, S: DocumentSink + ?Sized>(&self, input: R, sink: &mut S) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let span = info_span!("document", language = %self.language, index);
            let _enter = span.enter();

            let prepared = self
                .schema
                .parse_line(&line)
                .and_then(|record| self.preparer.prepare(&record, self.classifier.as_ref()));
            let doc = match prepared {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "skipping document");
                    stats.failed += 1;
                    continue;
                }
            };

            if doc.tokens().is_empty() {
                debug!("skipping document without tokens");
                stats.empty += 1;
                continue;
            }

            sink.accept(&doc)?;
            stats.documents += 1;
            stats.rejected_spans += doc.rejected.len();
            stats.tokens += doc.tokens().len();
        }

        info!(
            language = %self.language,
            documents = stats.documents,
            failed = stats.failed,
            empty = stats.empty,
            rejected_spans = stats.rejected_spans,
            tokens = stats.tokens,
            "prepared corpus"
        );
        Ok(stats)
    }
}
