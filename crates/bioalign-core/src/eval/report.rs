use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chunks::{extract_chunks, Chunk};
use crate::error::{BioalignError, Result};
use crate::types::{BioTag, EntityLabel};

/// Precision, recall and F1 for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: EntityLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Gold chunks with this label.
    pub support: usize,
    /// Predicted chunks with this label.
    pub predicted: usize,
    /// Predicted chunks matching a gold chunk exactly.
    pub correct: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Entity-level evaluation of predicted tag sequences against gold ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Micro-averaged scores over all chunks.
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
    pub predicted: usize,
    pub correct: usize,
    /// Per-label scores, sorted by label.
    pub labels: Vec<LabelScore>,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    /// Number of sentences scored.
    pub sentences: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    support: usize,
    predicted: usize,
    correct: usize,
}

/// Accumulates chunk counts one sentence at a time.
#[derive(Debug, Default)]
pub struct Scorer {
    counts: BTreeMap<EntityLabel, Counts>,
    sentences: usize,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sentence.
    ///
    /// # Errors
    ///
    /// Returns `BioalignError::LengthMismatch` if the sequences differ in length.
    pub fn add(&mut self, gold: &[BioTag], predicted: &[BioTag]) -> Result<()> {
        if gold.len() != predicted.len() {
            return Err(BioalignError::LengthMismatch {
                index: self.sentences,
                gold: gold.len(),
                predicted: predicted.len(),
            });
        }

        let gold_chunks: HashSet<Chunk> = extract_chunks(gold).into_iter().collect();
        let pred_chunks = extract_chunks(predicted);

        for chunk in &gold_chunks {
            self.counts.entry(chunk.label.clone()).or_default().support += 1;
        }
        for chunk in &pred_chunks {
            let counts = self.counts.entry(chunk.label.clone()).or_default();
            counts.predicted += 1;
            if gold_chunks.contains(chunk) {
                counts.correct += 1;
            }
        }

        self.sentences += 1;
        Ok(())
    }

    /// Computes the report from everything added so far.
    pub fn finish(&self) -> Report {
        let mut total = Counts::default();
        let mut labels = Vec::with_capacity(self.counts.len());

        for (label, counts) in &self.counts {
            total.support += counts.support;
            total.predicted += counts.predicted;
            total.correct += counts.correct;

            let (precision, recall, f1) = prf(counts);
            labels.push(LabelScore {
                label: label.clone(),
                precision,
                recall,
                f1,
                support: counts.support,
                predicted: counts.predicted,
                correct: counts.correct,
            });
        }

        let (precision, recall, f1) = prf(&total);
        let macro_avg = average(&labels, |_| 1.0);
        let weighted_avg = average(&labels, |s| s.support as f64);

        debug!(
            sentences = self.sentences,
            support = total.support,
            predicted = total.predicted,
            correct = total.correct,
            "scored predictions"
        );

        Report {
            precision,
            recall,
            f1,
            support: total.support,
            predicted: total.predicted,
            correct: total.correct,
            labels,
            macro_avg,
            weighted_avg,
            sentences: self.sentences,
        }
    }
}

/// Scores predicted tag sequences against gold ones at the entity level.
///
/// A predicted chunk counts as correct only if a gold chunk in the same
/// sentence has the same label, start and end. Empty denominators score 0.
///
/// # Errors
///
/// Returns `BioalignError::SequenceCountMismatch` if the two sides hold a
/// different number of sentences, and `BioalignError::LengthMismatch` if any
/// sentence pair differs in length.
///
/// # Examples
/// ```
/// use bioalign_core::eval::score;
/// use bioalign_core::types::BioTag;
///
/// let gold: Vec<BioTag> = ["B-PER", "I-PER", "O"].iter().map(|t| t.parse().unwrap()).collect();
/// let pred: Vec<BioTag> = ["B-PER", "O", "O"].iter().map(|t| t.parse().unwrap()).collect();
/// let report = score(&[gold], &[pred]).unwrap();
/// assert_eq!(report.f1, 0.0);
/// ```
pub fn score<G: AsRef<[BioTag]>, P: AsRef<[BioTag]>>(gold: &[G], predicted: &[P]) -> Result<Report> {
    if gold.len() != predicted.len() {
        return Err(BioalignError::SequenceCountMismatch {
            gold: gold.len(),
            predicted: predicted.len(),
        });
    }

    let mut scorer = Scorer::new();
    for (g, p) in gold.iter().zip(predicted) {
        scorer.add(g.as_ref(), p.as_ref())?;
    }
    Ok(scorer.finish())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn prf(counts: &Counts) -> (f64, f64, f64) {
    let precision = ratio(counts.correct, counts.predicted);
    let recall = ratio(counts.correct, counts.support);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}

fn average(labels: &[LabelScore], weight: impl Fn(&LabelScore) -> f64) -> Averages {
    let total: f64 = labels.iter().map(&weight).sum();
    if total == 0.0 {
        return Averages::default();
    }
    let sum = |metric: fn(&LabelScore) -> f64| -> f64 {
        labels.iter().map(|s| metric(s) * weight(s)).sum::<f64>() / total
    };
    Averages {
        precision: sum(|s| s.precision),
        recall: sum(|s| s.recall),
        f1: sum(|s| s.f1),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|s| s.label.as_str().chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or_default();

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for s in &self.labels {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
                s.label.as_str(),
                s.precision,
                s.recall,
                s.f1,
                s.support
            )?;
        }
        writeln!(f)?;
        let rows = [
            ("micro avg", self.precision, self.recall, self.f1),
            ("macro avg", self.macro_avg.precision, self.macro_avg.recall, self.macro_avg.f1),
            (
                "weighted avg",
                self.weighted_avg.precision,
                self.weighted_avg.recall,
                self.weighted_avg.f1,
            ),
        ];
        for (name, p, r, f1) in rows {
            writeln!(
                f,
                "{name:>width$}  {p:>9.4}  {r:>9.4}  {f1:>9.4}  {:>9}",
                self.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Precision : {:.4}", self.precision)?;
        writeln!(f, "Recall    : {:.4}", self.recall)?;
        write!(f, "F1        : {:.4}", self.f1)
    }
}
