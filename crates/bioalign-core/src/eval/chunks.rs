use serde::{Deserialize, Serialize};

use crate::types::{BioTag, EntityLabel};

/// A labelled run of tokens `[start, end)` within one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chunk {
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
}

/// Extracts entity chunks the way conlleval does.
///
/// A chunk starts at `B-X`, or at an `I-X` that does not continue an open
/// `X` chunk. It ends before `O`, before any `B-`, and before a change of type.
///
/// # Examples
/// ```
/// use bioalign_core::eval::extract_chunks;
/// use bioalign_core::types::BioTag;
///
/// let tags: Vec<BioTag> = ["B-PER", "I-PER", "O", "I-LOC"]
///     .iter()
///     .map(|t| t.parse().unwrap())
///     .collect();
/// let spans: Vec<_> = extract_chunks(&tags).iter().map(|c| (c.start, c.end)).collect();
/// assert_eq!(spans, [(0, 2), (3, 4)]);
/// ```
pub fn extract_chunks(tags: &[BioTag]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut open: Option<(EntityLabel, usize)> = None;

    for (i, tag) in tags.iter().enumerate() {
        let continues = match tag {
            BioTag::Inside(label) => matches!(&open, Some((current, _)) if current == label),
            _ => false,
        };
        if continues {
            continue;
        }

        if let Some((label, start)) = open.take() {
            chunks.push(Chunk { label, start, end: i });
        }
        if let Some(label) = tag.label() {
            open = Some((label.clone(), i));
        }
    }

    if let Some((label, start)) = open {
        chunks.push(Chunk {
            label,
            start,
            end: tags.len(),
        });
    }

    chunks
}
