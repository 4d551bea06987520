//! Terminal rendering of predicted entities over raw text.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::subword::{CharEntity, DropReason, PredictedEntity, SubwordAligner};
use crate::error::Result;
use crate::tokenizer::SentenceSplitter;
use crate::types::char_slice;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_BLUE: &str = "\x1b[94m";
const ANSI_RESET: &str = "\x1b[0m";

/// A model's output for one sentence: its pieces and the entities over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencePrediction {
    #[serde(alias = "input")]
    pub pieces: Vec<String>,
    #[serde(alias = "entity_prediction", default)]
    pub entities: Vec<PredictedEntity>,
}

/// Places piece-level predictions for each sentence of `text` at absolute char offsets.
///
/// `predictions` pairs up with the sentences found by `splitter`; extra
/// entries on either side are ignored. Entities below the aligner's
/// probability threshold are removed, as are entities whose positions fall
/// outside the piece list. The result is ordered by start.
pub fn locate_entities(
    aligner: &SubwordAligner,
    splitter: &SentenceSplitter,
    text: &str,
    predictions: &[SentencePrediction],
) -> Result<Vec<CharEntity>> {
    let mut located = Vec::new();
    let mut below_threshold = 0usize;

    for (&(start, end), prediction) in splitter.split(text).iter().zip(predictions) {
        let sentence = char_slice(text, start, end).unwrap_or_default();
        let spans = aligner.piece_char_spans(sentence, &prediction.pieces, start)?;

        for entity in &prediction.entities {
            let bounds = entity
                .positions
                .first()
                .zip(entity.positions.last())
                .and_then(|(&first, &last)| Some((spans.get(first)?.0, spans.get(last)?.1)));
            let Some((char_start, char_end)) = bounds else {
                warn!(
                    label = %entity.label,
                    reason = %DropReason::AlignmentMiss,
                    "dropped predicted entity"
                );
                continue;
            };

            let score = entity.mean_probability();
            if let (Some(threshold), Some(mean)) = (aligner.min_probability(), score) {
                if mean < threshold {
                    below_threshold += 1;
                    continue;
                }
            }

            located.push(CharEntity {
                start: char_start,
                end: char_end,
                label: entity.label.clone(),
                score,
            });
        }
    }

    if below_threshold > 0 {
        warn!(
            removed = below_threshold,
            threshold = aligner.min_probability().unwrap_or_default(),
            "removed predicted entities below the probability threshold"
        );
    }

    located.sort_by_key(|e| e.start);
    Ok(located)
}

/// Highlights entities in `text` with ANSI escapes: the mention in bold,
/// followed by its label in brackets.
///
/// Entities are drawn in start order. One that overlaps an entity already
/// drawn, or falls outside the text, is skipped.
///
/// # Examples
/// ```
/// use bioalign_core::align::{render_entities, CharEntity};
/// use bioalign_core::types::EntityLabel;
///
/// let out = render_entities("in Paris", &[CharEntity::new(3, 8, EntityLabel::Loc)]);
/// assert_eq!(out, "in \x1b[1mParis\x1b[0m[\x1b[94mLOC\x1b[0m]");
/// ```
pub fn render_entities(text: &str, entities: &[CharEntity]) -> String {
    let mut ordered: Vec<&CharEntity> = entities.iter().collect();
    ordered.sort_by_key(|e| e.start);

    let len = text.chars().count();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for entity in ordered {
        if entity.start < last || entity.start >= entity.end || entity.end > len {
            continue;
        }
        out.push_str(char_slice(text, last, entity.start).unwrap_or_default());
        out.push_str(ANSI_BOLD);
        out.push_str(char_slice(text, entity.start, entity.end).unwrap_or_default());
        out.push_str(ANSI_RESET);
        out.push('[');
        out.push_str(ANSI_BLUE);
        out.push_str(entity.label.as_str());
        out.push_str(ANSI_RESET);
        out.push(']');
        last = entity.end;
    }
    out.push_str(char_slice(text, last, len).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityLabel;

    fn strip_ansi(s: &str) -> String {
        s.replace(ANSI_BOLD, "")
            .replace(ANSI_BLUE, "")
            .replace(ANSI_RESET, "")
    }

    #[test]
    fn test_render_plain_text() {
        assert_eq!(render_entities("nothing here", &[]), "nothing here");
    }

    #[test]
    fn test_render_skips_overlaps() {
        let text = "Ivo Andrić, Beograd";
        let entities = [
            CharEntity::new(12, 19, EntityLabel::Loc),
            CharEntity::new(0, 10, EntityLabel::Per),
            CharEntity::new(4, 10, EntityLabel::Per),
            CharEntity::new(15, 40, EntityLabel::Misc),
        ];
        let out = render_entities(text, &entities);
        assert_eq!(strip_ansi(&out), "Ivo Andrić[PER], Beograd[LOC]");
    }

    #[test]
    fn test_locate_entities() {
        let aligner = SubwordAligner::default().with_min_probability(Some(0.5));
        let splitter = SentenceSplitter::new().unwrap();
        let text = "Ana lives here. Marko visited Rome.";
        let predictions = vec![
            SentencePrediction {
                pieces: ["▁Ana", "▁lives", "▁here", "."].map(String::from).to_vec(),
                entities: vec![PredictedEntity::new(vec![0], EntityLabel::Per)
                    .with_probabilities(vec![0.9])],
            },
            SentencePrediction {
                pieces: ["▁Mar", "ko", "▁visited", "▁Rome", "."].map(String::from).to_vec(),
                entities: vec![
                    PredictedEntity::new(vec![0, 1], EntityLabel::Per)
                        .with_probabilities(vec![0.8, 0.6]),
                    PredictedEntity::new(vec![3], EntityLabel::Loc).with_probabilities(vec![0.1]),
                    PredictedEntity::new(vec![7], EntityLabel::Loc),
                ],
            },
        ];

        let located = locate_entities(&aligner, &splitter, text, &predictions).unwrap();
        let spans: Vec<_> = located
            .iter()
            .map(|e| (e.start, e.end, e.label.as_str()))
            .collect();
        assert_eq!(spans, [(0, 3, "PER"), (16, 21, "PER")]);

        let out = strip_ansi(&render_entities(text, &located));
        assert_eq!(out, "Ana[PER] lives here. Marko[PER] visited Rome.");
    }
}
