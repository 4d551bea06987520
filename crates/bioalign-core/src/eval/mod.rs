//! Entity-level scoring of predicted tag sequences.

pub mod chunks;
pub mod report;

pub use chunks::{extract_chunks, Chunk};
pub use report::{score, Averages, LabelScore, Report, Scorer};
