//! # Sub-word Realignment
//!
//! Maps entity predictions made over a model's sub-word pieces back onto
//! the gold word tokens, so predicted and gold tag sequences can be compared
//! position by position.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{BioalignError, Result};
use crate::types::{BioTag, EntityLabel};

/// Word-start and continuation markers used by common sub-word vocabularies.
pub const DEFAULT_CONTINUATION_PREFIXES: &[&str] = &["Ġ", "▁", "##"];

/// An entity predicted over sub-word piece positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedEntity {
    /// Indices into the piece sequence, in order.
    #[serde(alias = "position")]
    pub positions: Vec<usize>,
    #[serde(alias = "type")]
    pub label: EntityLabel,
    /// Per-piece probabilities, if the model reports them.
    #[serde(alias = "probability", default)]
    pub probabilities: Vec<f32>,
}

impl PredictedEntity {
    pub fn new(positions: Vec<usize>, label: EntityLabel) -> Self {
        Self {
            positions,
            label,
            probabilities: Vec::new(),
        }
    }

    pub fn with_probabilities(mut self, probabilities: Vec<f32>) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Mean of the per-piece probabilities, `None` when none were reported.
    pub fn mean_probability(&self) -> Option<f32> {
        if self.probabilities.is_empty() {
            return None;
        }
        Some(self.probabilities.iter().sum::<f32>() / self.probabilities.len() as f32)
    }
}

/// An entity predicted over char offsets of the space-joined gold tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharEntity {
    pub start: usize,
    pub end: usize,
    #[serde(alias = "entity_group")]
    pub label: EntityLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl CharEntity {
    pub fn new(start: usize, end: usize, label: EntityLabel) -> Self {
        Self {
            start,
            end,
            label,
            score: None,
        }
    }
}

/// Why a predicted entity produced no tags.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum DropReason {
    #[error("start position maps to no gold token")]
    AlignmentMiss,
    #[error("entity has no positions")]
    EmptyPositions,
    #[error("mean probability {mean:.3} is below the threshold")]
    LowProbability { mean: f32 },
}

/// A prediction that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEntity<E> {
    pub entity: E,
    pub reason: DropReason,
}

/// Result of realigning predictions onto gold tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOutcome<E> {
    /// One tag per gold token.
    pub tags: Vec<BioTag>,
    pub dropped: Vec<DroppedEntity<E>>,
}

/// The run of pieces each gold token was matched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAlignment {
    runs: Vec<Option<Range<usize>>>,
}

impl TokenAlignment {
    /// Piece range matched to gold token `gold`, if any.
    pub fn piece_run(&self, gold: usize) -> Option<Range<usize>> {
        self.runs.get(gold).cloned().flatten()
    }

    /// The gold token whose matched run contains piece `piece`.
    pub fn gold_for_piece(&self, piece: usize) -> Option<usize> {
        self.runs
            .iter()
            .position(|run| run.as_ref().is_some_and(|r| r.contains(&piece)))
    }

    /// Number of gold tokens.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Gold tokens no piece run was found for.
    pub fn unmatched(&self) -> usize {
        self.runs.iter().filter(|r| r.is_none()).count()
    }
}

/// Realigns sub-word predictions to gold word tokens.
#[derive(Debug, Clone)]
pub struct SubwordAligner {
    prefixes: Vec<String>,
    min_probability: Option<f32>,
}

impl Default for SubwordAligner {
    fn default() -> Self {
        Self::new(DEFAULT_CONTINUATION_PREFIXES.iter().map(|p| p.to_string()))
    }
}

impl SubwordAligner {
    /// Creates an aligner that strips the given continuation prefixes.
    /// Empty prefixes are ignored.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
            min_probability: None,
        }
    }

    /// Drops predictions whose mean probability is below `threshold`.
    pub fn with_min_probability(mut self, threshold: Option<f32>) -> Self {
        self.min_probability = threshold;
        self
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn min_probability(&self) -> Option<f32> {
        self.min_probability
    }

    /// Strips every leading continuation prefix from `piece`.
    ///
    /// # Examples
    /// ```
    /// use bioalign_core::align::SubwordAligner;
    ///
    /// let aligner = SubwordAligner::default();
    /// assert_eq!(aligner.clean("##ing"), "ing");
    /// assert_eq!(aligner.clean("▁Paris"), "Paris");
    /// ```
    pub fn clean<'a>(&self, piece: &'a str) -> &'a str {
        let mut piece = piece;
        while let Some(prefix) = self.prefixes.iter().find(|p| piece.starts_with(p.as_str())) {
            piece = &piece[prefix.len()..];
        }
        piece
    }

    /// Matches every gold token to a run of consecutive pieces.
    ///
    /// For each gold token, pieces are searched forward from the cursor for a
    /// run whose cleaned concatenation equals the token, first with exact
    /// case and then ignoring case. A match moves the cursor past the run; a
    /// miss leaves the token unmatched and the cursor where it was.
    pub fn map_tokens<G: AsRef<str>, P: AsRef<str>>(&self, gold: &[G], pieces: &[P]) -> TokenAlignment {
        let cleaned: Vec<&str> = pieces.iter().map(|p| self.clean(p.as_ref())).collect();
        let mut cursor = 0;
        let mut runs = Vec::with_capacity(gold.len());

        for token in gold {
            let token = token.as_ref();
            let run = find_run(&cleaned, cursor, token, false)
                .or_else(|| find_run(&cleaned, cursor, token, true));
            if let Some(run) = &run {
                cursor = run.end;
            }
            runs.push(run);
        }

        TokenAlignment { runs }
    }

    /// Converts piece-level entity predictions into one tag per gold token.
    ///
    /// The entity starts at the gold token owning its first position and ends
    /// at the gold token owning its last position. An unmapped start drops the
    /// entity; an unmapped end falls back to the start. Later entities
    /// overwrite earlier ones where they overlap.
    pub fn align<G: AsRef<str>, P: AsRef<str>>(
        &self,
        gold: &[G],
        pieces: &[P],
        entities: &[PredictedEntity],
    ) -> AlignOutcome<PredictedEntity> {
        let alignment = self.map_tokens(gold, pieces);
        let mut tags = vec![BioTag::Outside; gold.len()];
        let mut dropped = Vec::new();
        let mut low_probability = 0usize;

        for entity in entities {
            let (Some(&first), Some(&last)) = (entity.positions.first(), entity.positions.last()) else {
                dropped.push(DroppedEntity {
                    entity: entity.clone(),
                    reason: DropReason::EmptyPositions,
                });
                continue;
            };

            if let (Some(threshold), Some(mean)) = (self.min_probability, entity.mean_probability()) {
                if mean < threshold {
                    low_probability += 1;
                    dropped.push(DroppedEntity {
                        entity: entity.clone(),
                        reason: DropReason::LowProbability { mean },
                    });
                    continue;
                }
            }

            let Some(start) = alignment.gold_for_piece(first) else {
                warn!(
                    position = first,
                    label = %entity.label,
                    reason = %DropReason::AlignmentMiss,
                    "dropped predicted entity"
                );
                dropped.push(DroppedEntity {
                    entity: entity.clone(),
                    reason: DropReason::AlignmentMiss,
                });
                continue;
            };
            let end = alignment
                .gold_for_piece(last)
                .filter(|&end| end >= start)
                .unwrap_or(start);

            write_entity(&mut tags, start, end, &entity.label);
        }

        if low_probability > 0 {
            warn!(
                removed = low_probability,
                threshold = self.min_probability.unwrap_or_default(),
                "removed predicted entities below the probability threshold"
            );
        }

        AlignOutcome { tags, dropped }
    }

    /// Maps sub-word pieces to char spans of `sentence`, shifted by `offset`.
    ///
    /// Each cleaned piece is searched forward from the end of the previous
    /// one, exactly and then ignoring case. A piece that cleans to nothing
    /// gets a zero-width span at the cursor.
    ///
    /// # Errors
    ///
    /// Returns `BioalignError::TokenNotFound` when a piece does not occur in
    /// the remaining text.
    pub fn piece_char_spans<P: AsRef<str>>(
        &self,
        sentence: &str,
        pieces: &[P],
        offset: usize,
    ) -> Result<Vec<(usize, usize)>> {
        let hay: Vec<char> = sentence.chars().collect();
        let mut cursor = 0;
        let mut spans = Vec::with_capacity(pieces.len());

        for piece in pieces {
            let raw = piece.as_ref();
            let needle: Vec<char> = self.clean(raw).chars().collect();
            if needle.is_empty() {
                spans.push((cursor + offset, cursor + offset));
                continue;
            }

            let found = find_chars(&hay, &needle, cursor, false)
                .or_else(|| find_chars(&hay, &needle, cursor, true));
            let Some(start) = found else {
                return Err(BioalignError::TokenNotFound {
                    token: raw.to_string(),
                    offset: cursor,
                });
            };
            cursor = start + needle.len();
            spans.push((start + offset, cursor + offset));
        }

        Ok(spans)
    }
}

/// Converts char-offset predictions over `gold.join(" ")` into one tag per gold token.
///
/// The start token is the one containing `start`; the end token is the one
/// containing `end - 1`, falling back to the start token.
pub fn align_char_predictions<G: AsRef<str>>(
    gold: &[G],
    entities: &[CharEntity],
) -> AlignOutcome<CharEntity> {
    let mut bounds = Vec::with_capacity(gold.len());
    let mut offset = 0;
    for token in gold {
        let len = token.as_ref().chars().count();
        bounds.push((offset, offset + len));
        offset += len + 1;
    }

    let mut tags = vec![BioTag::Outside; gold.len()];
    let mut dropped = Vec::new();

    for entity in entities {
        let start = bounds
            .iter()
            .position(|&(s, e)| s <= entity.start && entity.start < e);
        let Some(start) = start else {
            warn!(
                start = entity.start,
                end = entity.end,
                label = %entity.label,
                reason = %DropReason::AlignmentMiss,
                "dropped predicted entity"
            );
            dropped.push(DroppedEntity {
                entity: entity.clone(),
                reason: DropReason::AlignmentMiss,
            });
            continue;
        };
        let end = bounds
            .iter()
            .position(|&(s, e)| s < entity.end && entity.end <= e)
            .filter(|&end| end >= start)
            .unwrap_or(start);

        write_entity(&mut tags, start, end, &entity.label);
    }

    AlignOutcome { tags, dropped }
}

fn write_entity(tags: &mut [BioTag], start: usize, end: usize, label: &EntityLabel) {
    tags[start] = BioTag::Begin(label.clone());
    for tag in &mut tags[start + 1..=end] {
        *tag = BioTag::Inside(label.clone());
    }
}

/// Finds the first run of pieces starting at or after `from` whose
/// concatenation equals `target`.
fn find_run(pieces: &[&str], from: usize, target: &str, fold_case: bool) -> Option<Range<usize>> {
    let target = if fold_case {
        target.to_lowercase()
    } else {
        target.to_string()
    };
    if target.is_empty() {
        return None;
    }

    for start in from..pieces.len() {
        if pieces[start].is_empty() {
            continue;
        }
        let mut joined = String::new();
        let mut end = start;
        while end < pieces.len() && joined.len() < target.len() {
            if fold_case {
                joined.push_str(&pieces[end].to_lowercase());
            } else {
                joined.push_str(pieces[end]);
            }
            end += 1;
            if !target.starts_with(joined.as_str()) {
                break;
            }
        }
        if joined == target {
            return Some(start..end);
        }
    }
    None
}

fn find_chars(hay: &[char], needle: &[char], from: usize, fold_case: bool) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| {
        hay[i..i + needle.len()].iter().zip(needle).all(|(a, b)| {
            if fold_case {
                a.to_lowercase().eq(b.to_lowercase())
            } else {
                a == b
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::is_valid_iob2;

    fn names(tags: &[BioTag]) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_clean_strips_repeated_prefixes() {
        let aligner = SubwordAligner::default();
        assert_eq!(aligner.clean("Ġworld"), "world");
        assert_eq!(aligner.clean("##ing"), "ing");
        assert_eq!(aligner.clean("▁▁x"), "x");
        assert_eq!(aligner.clean("▁"), "");
        assert_eq!(aligner.clean("plain"), "plain");
    }

    #[test]
    fn test_custom_prefixes() {
        let aligner = SubwordAligner::new(vec!["@@".to_string(), String::new()]);
        assert_eq!(aligner.prefixes(), ["@@"]);
        assert_eq!(aligner.clean("@@lo"), "lo");
        assert_eq!(aligner.clean("##lo"), "##lo");
    }

    #[test]
    fn test_subword_merge() {
        let aligner = SubwordAligner::default();
        let gold = ["Barack", "Obama"];
        let pieces = ["▁Bar", "ack", "▁Obama"];
        let entities = [PredictedEntity::new(vec![0, 2], EntityLabel::Per)];

        let outcome = aligner.align(&gold, &pieces, &entities);
        assert_eq!(names(&outcome.tags), ["B-PER", "I-PER"]);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_wordpiece_entity_stays_in_one_word() {
        let aligner = SubwordAligner::default();
        let outcome = aligner.align(
            &["John", "Smith"],
            &["Jo", "##hn", "Smith"],
            &[PredictedEntity::new(vec![0, 1], EntityLabel::Per)],
        );
        assert_eq!(names(&outcome.tags), ["B-PER", "O"]);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_map_tokens_runs() {
        let aligner = SubwordAligner::default();
        let mapping = aligner.map_tokens(&["Barack", "Obama", "."], &["▁Bar", "ack", "▁Obama", "."]);
        assert_eq!(mapping.piece_run(0), Some(0..2));
        assert_eq!(mapping.piece_run(1), Some(2..3));
        assert_eq!(mapping.gold_for_piece(1), Some(0));
        assert_eq!(mapping.gold_for_piece(3), Some(2));
        assert_eq!(mapping.unmatched(), 0);
    }

    #[test]
    fn test_map_tokens_case_insensitive_fallback() {
        let aligner = SubwordAligner::default();
        let mapping = aligner.map_tokens(&["PARIS", "is"], &["▁paris", "▁is"]);
        assert_eq!(mapping.piece_run(0), Some(0..1));
        assert_eq!(mapping.piece_run(1), Some(1..2));
    }

    #[test]
    fn test_unmatched_gold_keeps_cursor() {
        let aligner = SubwordAligner::default();
        let mapping = aligner.map_tokens(&["a", "???", "b"], &["▁a", "▁b"]);
        assert_eq!(mapping.piece_run(0), Some(0..1));
        assert_eq!(mapping.piece_run(1), None);
        assert_eq!(mapping.piece_run(2), Some(1..2));
        assert_eq!(mapping.unmatched(), 1);
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_start_miss_drops_entity() {
        let aligner = SubwordAligner::default();
        let outcome = aligner.align(
            &["a", "b"],
            &["▁a", "▁b", "▁zz"],
            &[PredictedEntity::new(vec![2], EntityLabel::Loc)],
        );
        assert_eq!(names(&outcome.tags), ["O", "O"]);
        assert_eq!(outcome.dropped[0].reason, DropReason::AlignmentMiss);
    }

    #[test]
    fn test_end_miss_falls_back_to_start() {
        let aligner = SubwordAligner::default();
        let outcome = aligner.align(
            &["New", "York"],
            &["▁New", "▁York", "▁extra"],
            &[PredictedEntity::new(vec![0, 2], EntityLabel::Loc)],
        );
        assert_eq!(names(&outcome.tags), ["B-LOC", "O"]);
    }

    #[test]
    fn test_empty_positions_dropped() {
        let aligner = SubwordAligner::default();
        let outcome = aligner.align(&["x"], &["▁x"], &[PredictedEntity::new(vec![], EntityLabel::Misc)]);
        assert_eq!(names(&outcome.tags), ["O"]);
        assert_eq!(outcome.dropped[0].reason, DropReason::EmptyPositions);
    }

    #[test]
    fn test_min_probability_filter() {
        let aligner = SubwordAligner::default().with_min_probability(Some(0.5));
        let entities = [
            PredictedEntity::new(vec![0], EntityLabel::Per).with_probabilities(vec![0.2, 0.4]),
            PredictedEntity::new(vec![1], EntityLabel::Loc).with_probabilities(vec![0.9]),
            PredictedEntity::new(vec![2], EntityLabel::Org),
        ];
        let outcome = aligner.align(&["Ana", "Rim", "EU"], &["▁Ana", "▁Rim", "▁EU"], &entities);

        assert_eq!(names(&outcome.tags), ["O", "B-LOC", "B-ORG"]);
        assert_eq!(outcome.dropped.len(), 1);
        assert!(matches!(
            outcome.dropped[0].reason,
            DropReason::LowProbability { .. }
        ));
    }

    #[test]
    fn test_align_never_panics_on_garbage() {
        let aligner = SubwordAligner::default();
        let outcome = aligner.align(
            &["Hello", "world"],
            &["completely", "different", "##stuff"],
            &[
                PredictedEntity::new(vec![0, 1], EntityLabel::Per),
                PredictedEntity::new(vec![99], EntityLabel::Per),
            ],
        );
        assert_eq!(names(&outcome.tags), ["O", "O"]);
        assert_eq!(outcome.dropped.len(), 2);
        assert!(is_valid_iob2(&outcome.tags));
    }

    #[test]
    fn test_deserialize_predicted_entity() {
        let json = r#"{"position": [3, 4], "type": "ORG", "probability": [0.8, 0.6]}"#;
        let entity: PredictedEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.positions, [3, 4]);
        assert_eq!(entity.label, EntityLabel::Org);
        assert!((entity.mean_probability().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_align_char_predictions() {
        // "Barack Obama visited Paris"
        let gold = ["Barack", "Obama", "visited", "Paris"];
        let entities = [
            CharEntity::new(0, 12, EntityLabel::Per),
            CharEntity::new(21, 26, EntityLabel::Loc),
            CharEntity::new(6, 7, EntityLabel::Misc),
        ];
        let outcome = align_char_predictions(&gold, &entities);
        assert_eq!(names(&outcome.tags), ["B-PER", "I-PER", "O", "B-LOC"]);
        assert_eq!(outcome.dropped.len(), 1);
    }

    #[test]
    fn test_align_char_predictions_partial_end() {
        let gold = ["Novi", "Sad"];
        let entities = [CharEntity::new(0, 6, EntityLabel::Loc)];
        let outcome = align_char_predictions(&gold, &entities);
        assert_eq!(names(&outcome.tags), ["B-LOC", "I-LOC"]);
    }

    #[test]
    fn test_piece_char_spans() {
        let aligner = SubwordAligner::default();
        let spans = aligner
            .piece_char_spans("Barack Obama.", &["▁Bar", "ack", "▁", "▁OBAMA", "."], 10)
            .unwrap();
        assert_eq!(spans, [(10, 13), (13, 16), (16, 16), (17, 22), (22, 23)]);
    }

    #[test]
    fn test_piece_char_spans_missing_piece() {
        let aligner = SubwordAligner::default();
        let err = aligner
            .piece_char_spans("abc", &["▁abc", "▁def"], 0)
            .unwrap_err();
        assert!(matches!(err, BioalignError::TokenNotFound { offset: 3, .. }));
    }
}
