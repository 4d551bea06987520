//! # Gazetteer
//!
//! Classifies knowledge-base identifiers (e.g. Wikidata QIDs) into entity
//! labels from per-label id lists.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::types::EntityLabel;

/// Maps an anchor's knowledge-base id to an entity label.
pub trait EntityClassifier {
    /// Returns the label for `id`, or `None` to drop the anchor.
    fn classify(&self, id: Option<&str>) -> Option<EntityLabel>;
}

/// An ordered set of `(label, ids)` lists.
///
/// Lists are consulted in the order they were added, so an id present in
/// several lists takes the first list's label. Anchors without an id are
/// `MISC`; ids found in no list get the fallback label, if any.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: Vec<(EntityLabel, HashSet<String>)>,
    fallback: Option<EntityLabel>,
}

impl Gazetteer {
    pub fn builder() -> GazetteerBuilder {
        GazetteerBuilder::default()
    }

    /// Looks `id` up in the lists without applying the fallback.
    pub fn lookup(&self, id: &str) -> Option<&EntityLabel> {
        self.entries
            .iter()
            .find(|(_, ids)| ids.contains(id))
            .map(|(label, _)| label)
    }

    /// Total number of ids across all lists.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, ids)| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityClassifier for Gazetteer {
    fn classify(&self, id: Option<&str>) -> Option<EntityLabel> {
        // An absent id is MISC. It is never looked up as the text "None",
        // which would make it an unknown id and drop it without a fallback.
        match id.map(str::trim) {
            None | Some("") => Some(EntityLabel::Misc),
            Some(id) => self.lookup(id).cloned().or_else(|| self.fallback.clone()),
        }
    }
}

/// Builder for [`Gazetteer`].
#[derive(Debug, Default)]
pub struct GazetteerBuilder {
    entries: Vec<(EntityLabel, HashSet<String>)>,
    fallback: Option<EntityLabel>,
}

impl GazetteerBuilder {
    /// Adds ids for `label`, merging with ids already added for it.
    pub fn ids<I, S>(mut self, label: EntityLabel, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty());

        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, set)) => set.extend(ids),
            None => self.entries.push((label, ids.collect())),
        }
        self
    }

    /// Reads one id per line from `path`. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BioalignError::Io` if the file cannot be read.
    pub fn load(self, label: EntityLabel, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
        debug!(path = %path.display(), label = %label, ids = lines.len(), "loaded gazetteer list");
        Ok(self.ids(label, lines))
    }

    /// Label for ids found in no list. `None` drops such anchors.
    pub fn fallback(mut self, label: Option<EntityLabel>) -> Self {
        self.fallback = label;
        self
    }

    pub fn build(self) -> Gazetteer {
        Gazetteer {
            entries: self.entries,
            fallback: self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> Gazetteer {
        Gazetteer::builder()
            .ids(EntityLabel::Loc, ["Q1085", "Q14960"])
            .ids(EntityLabel::Per, ["Q1001", "Q1085"])
            .ids(EntityLabel::Org, ["Q458"])
            .build()
    }

    #[test]
    fn test_classify_known_ids() {
        let gazetteer = sample();
        assert_eq!(gazetteer.classify(Some("Q14960")), Some(EntityLabel::Loc));
        assert_eq!(gazetteer.classify(Some("Q1001")), Some(EntityLabel::Per));
        assert_eq!(gazetteer.classify(Some(" Q458 ")), Some(EntityLabel::Org));
    }

    #[test]
    fn test_first_list_wins() {
        assert_eq!(sample().classify(Some("Q1085")), Some(EntityLabel::Loc));
    }

    #[test]
    fn test_missing_id_is_misc() {
        let gazetteer = sample();
        assert_eq!(gazetteer.classify(None), Some(EntityLabel::Misc));
        assert_eq!(gazetteer.classify(Some("")), Some(EntityLabel::Misc));
        // The literal text is an ordinary id, unknown here.
        assert_eq!(gazetteer.classify(Some("None")), None);
    }

    #[test]
    fn test_unknown_id_uses_fallback() {
        assert_eq!(sample().classify(Some("Q999")), None);

        let gazetteer = Gazetteer::builder()
            .ids(EntityLabel::Loc, ["Q1"])
            .fallback(Some(EntityLabel::Misc))
            .build();
        assert_eq!(gazetteer.classify(Some("Q999")), Some(EntityLabel::Misc));
    }

    #[test]
    fn test_load_merges_files() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "Q1\n\n  Q2  ").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "Q3").unwrap();

        let gazetteer = Gazetteer::builder()
            .load(EntityLabel::Per, first.path())
            .unwrap()
            .load(EntityLabel::Per, second.path())
            .unwrap()
            .build();

        assert_eq!(gazetteer.len(), 3);
        assert_eq!(gazetteer.lookup("Q2"), Some(&EntityLabel::Per));
        assert_eq!(gazetteer.lookup("Q3"), Some(&EntityLabel::Per));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Gazetteer::builder().load(EntityLabel::Loc, "/nonexistent/LOC-ND.txt");
        assert!(result.is_err());
    }
}
