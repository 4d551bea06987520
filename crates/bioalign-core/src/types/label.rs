//! # Entity Labels and BIO Tags
//!
//! Defines the label vocabulary and the IOB2 tag set used for sequence
//! labeling of named entities.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BioalignError, Result};

/// Entity category attached to a span or a B/I tag.
///
/// The four CoNLL categories are first-class. Any other label a dataset
/// uses is kept verbatim in [`EntityLabel::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityLabel {
    Per,
    Org,
    Loc,
    Misc,
    Other(String),
}

impl EntityLabel {
    /// The label as it appears in tag strings.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Per => "PER",
            Self::Org => "ORG",
            Self::Loc => "LOC",
            Self::Misc => "MISC",
            Self::Other(name) => name,
        }
    }
}

impl Ord for EntityLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for EntityLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for EntityLabel {
    type Err = BioalignError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() || name == "O" || name.contains(char::is_whitespace) {
            return Err(BioalignError::UnknownTag(s.to_string()));
        }
        Ok(match name {
            "PER" => Self::Per,
            "ORG" => Self::Org,
            "LOC" => Self::Loc,
            "MISC" => Self::Misc,
            other => Self::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for EntityLabel {
    type Error = BioalignError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EntityLabel> for String {
    fn from(label: EntityLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IOB2 tag for a single token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BioTag {
    /// Token begins an entity.
    Begin(EntityLabel),
    /// Token continues the entity opened by the previous token.
    Inside(EntityLabel),
    /// Token is outside every entity.
    Outside,
}

impl BioTag {
    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, Self::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, Self::Inside(_))
    }

    /// Get the entity label for this tag.
    pub fn label(&self) -> Option<&EntityLabel> {
        match self {
            Self::Begin(label) | Self::Inside(label) => Some(label),
            Self::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid IOB2.
    ///
    /// `I-X` may only follow `B-X` or `I-X`. Everything else is allowed.
    pub fn is_valid_transition(from: &BioTag, to: &BioTag) -> bool {
        match to {
            Self::Inside(label) => from.label() == Some(label),
            _ => true,
        }
    }
}

impl FromStr for BioTag {
    type Err = BioalignError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        if tag == "O" {
            return Ok(Self::Outside);
        }
        let unknown = || BioalignError::UnknownTag(s.to_string());
        if let Some(label) = tag.strip_prefix("B-") {
            return label.parse().map(Self::Begin).map_err(|_| unknown());
        }
        if let Some(label) = tag.strip_prefix("I-") {
            return label.parse().map(Self::Inside).map_err(|_| unknown());
        }
        Err(unknown())
    }
}

impl TryFrom<String> for BioTag {
    type Error = BioalignError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BioTag> for String {
    fn from(tag: BioTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for BioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin(label) => write!(f, "B-{label}"),
            Self::Inside(label) => write!(f, "I-{label}"),
            Self::Outside => write!(f, "O"),
        }
    }
}

/// Returns the index of the first tag that breaks IOB2, if any.
pub fn first_iob2_violation(tags: &[BioTag]) -> Option<usize> {
    let mut prev = &BioTag::Outside;
    for (i, tag) in tags.iter().enumerate() {
        if !BioTag::is_valid_transition(prev, tag) {
            return Some(i);
        }
        prev = tag;
    }
    None
}

/// Returns `true` if no `I-X` tag appears without a preceding `B-X`/`I-X`.
pub fn is_valid_iob2(tags: &[BioTag]) -> bool {
    first_iob2_violation(tags).is_none()
}

/// Ordered tag vocabulary mapping integer tag ids to [`BioTag`]s.
///
/// Datasets that ship tags as class indices disagree on the order, so the
/// order is part of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: Vec<BioTag>,
}

impl TagSet {
    /// `O, B-PER, I-PER, B-ORG, I-ORG, B-LOC, I-LOC` (WikiANN order).
    pub fn wikiann() -> Self {
        Self {
            tags: vec![
                BioTag::Outside,
                BioTag::Begin(EntityLabel::Per),
                BioTag::Inside(EntityLabel::Per),
                BioTag::Begin(EntityLabel::Org),
                BioTag::Inside(EntityLabel::Org),
                BioTag::Begin(EntityLabel::Loc),
                BioTag::Inside(EntityLabel::Loc),
            ],
        }
    }

    /// `B-LOC, B-ORG, B-PER, I-LOC, I-ORG, I-PER, O` (alphabetical, as TNER exports).
    pub fn tner() -> Self {
        Self {
            tags: vec![
                BioTag::Begin(EntityLabel::Loc),
                BioTag::Begin(EntityLabel::Org),
                BioTag::Begin(EntityLabel::Per),
                BioTag::Inside(EntityLabel::Loc),
                BioTag::Inside(EntityLabel::Org),
                BioTag::Inside(EntityLabel::Per),
                BioTag::Outside,
            ],
        }
    }

    /// Builds a tag set from tag names in index order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let tags = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<BioTag>>>()?;
        if tags.is_empty() {
            return Err(BioalignError::InvalidConfig("tag set is empty".into()));
        }
        Ok(Self { tags })
    }

    /// Get the tag for a class index.
    pub fn get(&self, index: usize) -> Result<&BioTag> {
        self.tags.get(index).ok_or(BioalignError::TagIndexOutOfRange {
            index,
            len: self.tags.len(),
        })
    }

    /// Get the class index of a tag.
    pub fn index_of(&self, tag: &BioTag) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All tags in index order.
    pub fn tags(&self) -> &[BioTag] {
        &self.tags
    }
}

impl Default for TagSet {
    fn default() -> Self {
        Self::wikiann()
    }
}

/// Maps a foreign label vocabulary onto [`EntityLabel`]s.
///
/// Labels without an entry are parsed as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMap {
    entries: HashMap<String, EntityLabel>,
}

impl LabelMap {
    /// Creates an empty (identity) map.
    pub fn new() -> Self {
        Self::default()
    }

    /// MAPA legal-domain categories folded onto PER/ORG/LOC/MISC.
    pub fn mapa() -> Self {
        Self::new()
            .with("PERSON", EntityLabel::Per)
            .with("ORGANISATION", EntityLabel::Org)
            .with("ADDRESS", EntityLabel::Loc)
            .with("DATE", EntityLabel::Misc)
            .with("TIME", EntityLabel::Misc)
            .with("AMOUNT", EntityLabel::Misc)
    }

    /// Adds one mapping.
    pub fn with(mut self, source: impl Into<String>, target: EntityLabel) -> Self {
        self.entries.insert(source.into(), target);
        self
    }

    /// Maps a raw label, falling back to parsing it directly.
    pub fn apply(&self, raw: &str) -> Result<EntityLabel> {
        match self.entries.get(raw.trim()) {
            Some(label) => Ok(label.clone()),
            None => raw.parse(),
        }
    }

    /// Maps a raw tag string such as `B-PERSON`, keeping its prefix.
    pub fn apply_tag(&self, raw: &str) -> Result<BioTag> {
        let tag = raw.trim();
        if tag == "O" {
            return Ok(BioTag::Outside);
        }
        if let Some(label) = tag.strip_prefix("B-") {
            return self.apply(label).map(BioTag::Begin);
        }
        if let Some(label) = tag.strip_prefix("I-") {
            return self.apply(label).map(BioTag::Inside);
        }
        Err(BioalignError::UnknownTag(raw.to_string()))
    }

    /// Returns `true` if no mappings are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<BioTag> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn test_tag_parse_and_display() {
        for name in ["O", "B-PER", "I-ORG", "B-LOC", "I-MISC", "B-DATE"] {
            let tag: BioTag = name.parse().unwrap();
            assert_eq!(tag.to_string(), name);
        }
        assert_eq!(
            "B-DATE".parse::<BioTag>().unwrap(),
            BioTag::Begin(EntityLabel::Other("DATE".into()))
        );
    }

    #[test]
    fn test_tag_parse_rejects_garbage() {
        assert!("X-PER".parse::<BioTag>().is_err());
        assert!("B-".parse::<BioTag>().is_err());
        assert!("PER".parse::<BioTag>().is_err());
        assert!("".parse::<BioTag>().is_err());
    }

    #[test]
    fn test_valid_transitions() {
        let b_per = BioTag::Begin(EntityLabel::Per);
        let i_per = BioTag::Inside(EntityLabel::Per);

        assert!(BioTag::is_valid_transition(&b_per, &i_per));
        assert!(BioTag::is_valid_transition(&i_per, &i_per));
        assert!(BioTag::is_valid_transition(&BioTag::Outside, &b_per));
        assert!(BioTag::is_valid_transition(&i_per, &BioTag::Outside));
    }

    #[test]
    fn test_invalid_transitions() {
        let b_per = BioTag::Begin(EntityLabel::Per);
        let i_org = BioTag::Inside(EntityLabel::Org);

        assert!(!BioTag::is_valid_transition(&BioTag::Outside, &i_org));
        assert!(!BioTag::is_valid_transition(&b_per, &i_org));
    }

    #[test]
    fn test_iob2_validation() {
        assert!(is_valid_iob2(&tags(&["O", "B-PER", "I-PER", "O", "B-LOC"])));
        assert!(is_valid_iob2(&[]));
        assert_eq!(first_iob2_violation(&tags(&["I-PER", "O"])), Some(0));
        assert_eq!(
            first_iob2_violation(&tags(&["B-PER", "I-PER", "I-ORG"])),
            Some(2)
        );
    }

    #[test]
    fn test_tag_set_orders() {
        let wikiann = TagSet::wikiann();
        assert_eq!(wikiann.get(0).unwrap(), &BioTag::Outside);
        assert_eq!(wikiann.get(5).unwrap().to_string(), "B-LOC");

        let tner = TagSet::tner();
        assert_eq!(tner.get(6).unwrap(), &BioTag::Outside);
        assert_eq!(tner.index_of(&"I-PER".parse().unwrap()), Some(5));

        let err = tner.get(7).unwrap_err();
        assert!(matches!(
            err,
            BioalignError::TagIndexOutOfRange { index: 7, len: 7 }
        ));
    }

    #[test]
    fn test_tag_set_from_names() {
        let set = TagSet::from_names(&["O", "B-MISC", "I-MISC"]).unwrap();
        assert_eq!(set.len(), 3);
        assert!(TagSet::from_names::<&str>(&[]).is_err());
        assert!(TagSet::from_names(&["O", "nonsense"]).is_err());
    }

    #[test]
    fn test_label_map_mapa() {
        let map = LabelMap::mapa();
        assert_eq!(map.apply("PERSON").unwrap(), EntityLabel::Per);
        assert_eq!(map.apply("AMOUNT").unwrap(), EntityLabel::Misc);
        assert_eq!(map.apply("LOC").unwrap(), EntityLabel::Loc);
        assert_eq!(
            map.apply_tag("I-ADDRESS").unwrap(),
            BioTag::Inside(EntityLabel::Loc)
        );
        assert_eq!(map.apply_tag("O").unwrap(), BioTag::Outside);
    }

    #[test]
    fn test_label_serde_as_string() {
        let json = serde_json::to_string(&BioTag::Begin(EntityLabel::Org)).unwrap();
        assert_eq!(json, "\"B-ORG\"");
        let back: EntityLabel = serde_json::from_str("\"LOC\"").unwrap();
        assert_eq!(back, EntityLabel::Loc);
        assert!(serde_json::from_str::<EntityLabel>("\"\"").is_err());
    }

    #[test]
    fn test_labels_sort_alphabetically() {
        let mut labels = vec![
            EntityLabel::Per,
            EntityLabel::Loc,
            EntityLabel::Other("DATE".into()),
            EntityLabel::Org,
        ];
        labels.sort();
        let names: Vec<_> = labels.iter().map(EntityLabel::as_str).collect();
        assert_eq!(names, ["DATE", "LOC", "ORG", "PER"]);
    }
}
