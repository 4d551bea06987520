//! # Input Records
//!
//! The two dataset shapes (raw text with char spans, pre-tokenized text with
//! tags) plus knowledge-base anchored paragraphs, as an explicit tagged union.
//! The caller picks the [`RecordSchema`]; nothing is inferred from which
//! fields happen to be present.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BioalignError, Result};

/// An entity annotation as delivered by a dataset loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Raw text with char-offset entity annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTextRecord {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
}

/// A tag given either by name (`"B-PER"`) or by class index into a tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Index(usize),
    Name(String),
}

/// Pre-tokenized text with one tag per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreTokenizedRecord {
    pub tokens: Vec<String>,
    #[serde(alias = "ner_tags")]
    pub tags: Vec<TagValue>,
}

/// An offset that some dumps store as a number and others as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOffset {
    Int(u64),
    Text(String),
}

impl RawOffset {
    /// The offset as a `usize`, or `None` if it does not parse.
    pub fn value(&self) -> Option<usize> {
        match self {
            Self::Int(v) => usize::try_from(*v).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A hyperlink anchor pointing at a knowledge-base entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub start: Option<RawOffset>,
    pub end: Option<RawOffset>,
    pub qid: Option<String>,
}

/// A paragraph whose entities are anchors resolved through a gazetteer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredRecord {
    #[serde(alias = "paragraph_text")]
    pub text: String,
    #[serde(alias = "paragraph_anchors", default)]
    pub anchors: Vec<Anchor>,
}

/// One input record, in one of the supported dataset shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRecord {
    RawText(RawTextRecord),
    PreTokenized(PreTokenizedRecord),
    Anchored(AnchoredRecord),
}

/// Selects how a JSON line is decoded into an [`InputRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSchema {
    /// `{"text": ..., "entities": [{"start", "end", "label"}]}`
    #[default]
    Raw,
    /// `{"tokens": [...], "tags": [...]}`
    Tokens,
    /// `{"text": ..., "anchors": [{"start", "end", "qid"}]}`
    Anchors,
}

impl RecordSchema {
    /// Decodes one JSON line into the variant this schema names.
    pub fn parse_line(self, line: &str) -> Result<InputRecord> {
        Ok(match self {
            Self::Raw => InputRecord::RawText(serde_json::from_str(line)?),
            Self::Tokens => InputRecord::PreTokenized(serde_json::from_str(line)?),
            Self::Anchors => InputRecord::Anchored(serde_json::from_str(line)?),
        })
    }
}

impl FromStr for RecordSchema {
    type Err = BioalignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Self::Raw),
            "tokens" => Ok(Self::Tokens),
            "anchors" => Ok(Self::Anchors),
            other => Err(BioalignError::InvalidConfig(format!(
                "unknown record schema {other:?}"
            ))),
        }
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Tokens => write!(f, "tokens"),
            Self::Anchors => write!(f, "anchors"),
        }
    }
}
