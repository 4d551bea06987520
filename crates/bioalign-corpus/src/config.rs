use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

/// Field separator between token and tag in CoNLL files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    Space,
    Tab,
    /// Reads any whitespace run; writes a single space.
    #[default]
    Whitespace,
}

impl Separator {
    /// The char written between token and tag.
    pub fn as_char(self) -> char {
        match self {
            Self::Tab => '\t',
            Self::Space | Self::Whitespace => ' ',
        }
    }

    /// Splits a line into `(token, tag)`: the first and last fields.
    pub(crate) fn split(self, line: &str) -> Option<(&str, &str)> {
        let fields: Vec<&str> = match self {
            Self::Whitespace => line.split_whitespace().collect(),
            Self::Space => line.split(' ').filter(|f| !f.is_empty()).collect(),
            Self::Tab => line.split('\t').filter(|f| !f.is_empty()).collect(),
        };
        match fields.as_slice() {
            [token, .., tag] => Some((*token, *tag)),
            _ => None,
        }
    }
}

/// Settings for corpus serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub separator: Separator,
    /// Documents per container chunk file.
    pub chunk_size: usize,
    /// Extension of container chunk files, without the dot.
    pub container_extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            separator: Separator::Whitespace,
            chunk_size: 100,
            container_extension: "docbin".to_string(),
        }
    }
}

impl CorpusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CorpusError::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.container_extension.is_empty() || self.container_extension.contains(['.', '/']) {
            return Err(CorpusError::InvalidConfig(format!(
                "bad container extension {:?}",
                self.container_extension
            )));
        }
        Ok(())
    }

    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Set the chunk size (at least 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_container_extension(mut self, extension: impl Into<String>) -> Self {
        self.container_extension = extension.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_fields() {
        assert_eq!(Separator::Space.split("Paris B-LOC"), Some(("Paris", "B-LOC")));
        assert_eq!(Separator::Tab.split("Paris\tNNP\tB-LOC"), Some(("Paris", "B-LOC")));
        assert_eq!(Separator::Whitespace.split("Paris \t  B-LOC"), Some(("Paris", "B-LOC")));
        assert_eq!(Separator::Space.split("lonely"), None);
        assert_eq!(Separator::Tab.split("Paris B-LOC"), None);
    }

    #[test]
    fn test_defaults_and_builder() {
        let config = CorpusConfig::new();
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.container_extension, "docbin");
        assert_eq!(config.separator, Separator::Whitespace);
        assert_eq!(config.separator.as_char(), ' ');
        assert_eq!(
            config.separator.split("Paris\tB-LOC"),
            Some(("Paris", "B-LOC"))
        );

        let config = config.with_chunk_size(0).with_separator(Separator::Tab);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.separator.as_char(), '\t');
    }

    #[test]
    fn test_validate() {
        let mut config = CorpusConfig::new();
        config.chunk_size = 0;
        assert!(config.validate().is_err());

        let config = CorpusConfig::new().with_container_extension(".docbin");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"separator": "tab", "chunk_size": 5000}}"#).unwrap();
        let config = CorpusConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.separator, Separator::Tab);
        assert_eq!(config.chunk_size, 5000);
        assert_eq!(config.container_extension, "docbin");
    }
}
