//! # CoNLL Corpus I/O
//!
//! One `token<sep>tag` pair per line, a blank line after every sentence.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use bioalign_core::types::{BioTag, TaggedToken};
use bioalign_core::BioalignError;
use serde::{Deserialize, Serialize};

use crate::config::Separator;
use crate::error::{CorpusError, Result};

/// Marker line some CoNLL dumps put between documents.
const DOCSTART: &str = "-DOCSTART-";

/// A tagged sentence as stored in a CoNLL file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConllSentence {
    pub tokens: Vec<String>,
    pub tags: Vec<BioTag>,
}

impl ConllSentence {
    /// Pairs tokens with tags.
    ///
    /// # Errors
    ///
    /// Returns `BioalignError::TokenTagCountMismatch` if the counts differ.
    pub fn new(tokens: Vec<String>, tags: Vec<BioTag>) -> Result<Self> {
        if tokens.len() != tags.len() {
            return Err(BioalignError::TokenTagCountMismatch {
                tokens: tokens.len(),
                tags: tags.len(),
            }
            .into());
        }
        Ok(Self { tokens, tags })
    }

    pub fn from_tagged(tagged: &[TaggedToken]) -> Self {
        Self {
            tokens: tagged.iter().map(|t| t.token.text.clone()).collect(),
            tags: tagged.iter().map(|t| t.tag.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Streams sentences to a CoNLL file.
pub struct ConllWriter<W: Write> {
    inner: W,
    separator: char,
    sentences: usize,
}

impl ConllWriter<BufWriter<File>> {
    /// Creates (or truncates) a CoNLL file.
    pub fn create(path: impl AsRef<Path>, separator: Separator) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?), separator))
    }
}

impl<W: Write> ConllWriter<W> {
    pub fn new(inner: W, separator: Separator) -> Self {
        Self {
            inner,
            separator: separator.as_char(),
            sentences: 0,
        }
    }

    /// Writes one sentence followed by a blank line. Empty sentences are skipped.
    pub fn write_sentence<S: AsRef<str>>(&mut self, tokens: &[S], tags: &[BioTag]) -> Result<()> {
        if tokens.len() != tags.len() {
            return Err(BioalignError::TokenTagCountMismatch {
                tokens: tokens.len(),
                tags: tags.len(),
            }
            .into());
        }
        if tokens.is_empty() {
            return Ok(());
        }

        for (token, tag) in tokens.iter().zip(tags) {
            writeln!(self.inner, "{}{}{}", token.as_ref(), self.separator, tag)?;
        }
        writeln!(self.inner)?;
        self.sentences += 1;
        Ok(())
    }

    pub fn write(&mut self, sentence: &ConllSentence) -> Result<()> {
        self.write_sentence(&sentence.tokens, &sentence.tags)
    }

    /// Sentences written so far.
    pub fn sentences(&self) -> usize {
        self.sentences
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads sentences from a CoNLL stream, one at a time.
///
/// Consecutive blank lines and a missing final blank line are tolerated.
/// A line without both a token and a tag, or with an unparsable tag, yields
/// `BioalignError::MalformedLine` and ends the stream.
pub struct ConllReader<R: BufRead> {
    lines: Lines<R>,
    separator: Separator,
    line_no: usize,
    failed: bool,
}

impl ConllReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, separator: Separator) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?), separator))
    }
}

impl<R: BufRead> ConllReader<R> {
    pub fn new(reader: R, separator: Separator) -> Self {
        Self {
            lines: reader.lines(),
            separator,
            line_no: 0,
            failed: false,
        }
    }
}

fn malformed(line: usize, content: &str) -> CorpusError {
    BioalignError::MalformedLine {
        line,
        content: content.to_string(),
    }
    .into()
}

impl<R: BufRead> Iterator for ConllReader<R> {
    type Item = Result<ConllSentence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut sentence = ConllSentence::default();
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            };
            let line = line.trim();

            if line.is_empty() {
                if sentence.is_empty() {
                    continue;
                }
                return Some(Ok(sentence));
            }

            let Some((token, tag)) = self.separator.split(line) else {
                if line.starts_with(DOCSTART) {
                    continue;
                }
                self.failed = true;
                return Some(Err(malformed(self.line_no, line)));
            };
            if token == DOCSTART {
                continue;
            }
            let Ok(tag) = tag.parse::<BioTag>() else {
                self.failed = true;
                return Some(Err(malformed(self.line_no, line)));
            };
            sentence.tokens.push(token.to_string());
            sentence.tags.push(tag);
        }

        (!sentence.is_empty()).then_some(Ok(sentence))
    }
}

/// Reads a whole CoNLL file.
pub fn read_conll_file(path: impl AsRef<Path>, separator: Separator) -> Result<Vec<ConllSentence>> {
    ConllReader::open(path, separator)?.collect()
}
