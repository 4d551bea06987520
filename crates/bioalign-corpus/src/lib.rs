//! # Bioalign Corpus
//!
//! Reads and writes NER corpora: CoNLL token/tag files, chunked document
//! containers, and the streaming pipeline that fills them from JSON Lines
//! records.
//!
//! ```rust
//! use bioalign_core::{AlignConfig, RecordSchema};
//! use bioalign_corpus::{ConllWriter, Pipeline, Separator};
//!
//! let input = r#"{"text": "Ana lives in Rome.", "entities": [{"start": 13, "end": 17, "label": "LOC"}]}"#;
//! let mut writer = ConllWriter::new(Vec::new(), Separator::Tab);
//! Pipeline::new(&AlignConfig::default(), RecordSchema::Raw)
//!     .run(input.as_bytes(), &mut writer)
//!     .unwrap();
//!
//! let out = String::from_utf8(writer.finish().unwrap()).unwrap();
//! assert!(out.contains("Rome\tB-LOC\n"));
//! ```
pub mod config;
pub mod conll;
pub mod container;
pub mod convert;
pub mod error;
pub mod pipeline;

pub use config::{CorpusConfig, Separator};
pub use conll::{read_conll_file, ConllReader, ConllSentence, ConllWriter};
pub use container::{
    chunk_files, read_container, read_container_dir, ContainerDoc, ContainerWriter,
};
pub use convert::{container_to_conll, conll_to_container, mirror_containers, MirrorSummary};
pub use error::{CorpusError, Result};
pub use pipeline::{DocumentSink, Pipeline, PipelineStats};
