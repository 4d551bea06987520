use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::{SubwordAligner, DEFAULT_CONTINUATION_PREFIXES};
use crate::error::{BioalignError, Result};
use crate::tokenizer::{Tokenizer, TokenizerMode};
use crate::types::{LabelMap, TagSet};

/// Settings shared by the tokenizer, the span tagger and the sub-word aligner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Markers stripped from the front of sub-word pieces.
    pub continuation_prefixes: Vec<String>,
    /// How raw text is cut into tokens.
    pub tokenizer_mode: TokenizerMode,
    /// Predictions with a lower mean probability are dropped.
    pub min_probability: Option<f32>,
    /// Maps dataset label names onto entity labels.
    pub label_map: LabelMap,
    /// Order of integer tag ids.
    pub tag_set: TagSet,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            continuation_prefixes: DEFAULT_CONTINUATION_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            tokenizer_mode: TokenizerMode::default(),
            min_probability: None,
            label_map: LabelMap::default(),
            tag_set: TagSet::default(),
        }
    }
}

impl AlignConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`AlignConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be used.
    pub fn validate(&self) -> Result<()> {
        if self.continuation_prefixes.iter().all(String::is_empty) {
            return Err(BioalignError::InvalidConfig(
                "at least one continuation prefix is required".into(),
            ));
        }
        if self.tag_set.is_empty() {
            return Err(BioalignError::InvalidConfig("tag set is empty".into()));
        }
        Ok(())
    }

    pub fn with_continuation_prefixes<S: Into<String>>(
        mut self,
        prefixes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.continuation_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tokenizer_mode(mut self, mode: TokenizerMode) -> Self {
        self.tokenizer_mode = mode;
        self
    }

    /// Set the probability threshold for predictions, clamped to `[0, 1]`.
    pub fn with_min_probability(mut self, threshold: f32) -> Self {
        self.min_probability = Some(threshold.clamp(0.0, 1.0));
        self
    }

    pub fn with_label_map(mut self, label_map: LabelMap) -> Self {
        self.label_map = label_map;
        self
    }

    pub fn with_tag_set(mut self, tag_set: TagSet) -> Self {
        self.tag_set = tag_set;
        self
    }

    /// Builds a tokenizer in the configured mode.
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.tokenizer_mode)
    }

    /// Builds a sub-word aligner with the configured prefixes and threshold.
    pub fn aligner(&self) -> SubwordAligner {
        SubwordAligner::new(self.continuation_prefixes.iter().cloned())
            .with_min_probability(self.min_probability)
    }
}
