//! Conversion between document containers and flat CoNLL files.

use std::fs;
use std::path::{Path, PathBuf};

use bioalign_core::tokenizer::Detokenizer;
use tracing::{info, warn};

use crate::config::CorpusConfig;
use crate::conll::{ConllReader, ConllWriter};
use crate::container::{read_container, ContainerDoc, ContainerWriter};
use crate::error::Result;

/// Writes every document of one container chunk as a CoNLL sentence.
///
/// Returns the number of sentences written.
pub fn container_to_conll(input: &Path, output: &Path, config: &CorpusConfig) -> Result<usize> {
    let docs = read_container(input)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = ConllWriter::create(output, config.separator)?;
    for doc in &docs {
        writer.write_sentence(&doc.token_texts(), &doc.tags())?;
    }
    let written = writer.sentences();
    writer.finish()?;
    Ok(written)
}

/// Packs a CoNLL file into container chunks under `dir`, rebuilding each
/// sentence's text with `detokenizer`.
///
/// Returns the chunk paths written.
pub fn conll_to_container(
    input: &Path,
    dir: &Path,
    prefix: &str,
    config: &CorpusConfig,
    detokenizer: &Detokenizer,
) -> Result<Vec<PathBuf>> {
    let mut writer = ContainerWriter::new(dir, prefix, config)?;
    for sentence in ConllReader::open(input, config.separator)? {
        let sentence = sentence?;
        let tokenized = detokenizer.to_document(&sentence.tokens, &sentence.tags)?;
        writer.push(&ContainerDoc {
            text: tokenized.document.text().to_string(),
            entities: tokenized.document.entities().to_vec(),
            tokens: tokenized.tokens,
        })?;
    }
    writer.finish()
}

/// Outcome of converting a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub sentences: usize,
}

/// Converts every container under `in_root` to a `.txt` CoNLL file at the
/// same relative path under `out_root`.
///
/// A file that fails to convert is logged and listed in
/// [`MirrorSummary::failed`]; the rest are still converted.
pub fn mirror_containers(in_root: &Path, out_root: &Path, config: &CorpusConfig) -> Result<MirrorSummary> {
    let mut inputs = Vec::new();
    collect_files(in_root, &config.container_extension, &mut inputs)?;
    inputs.sort();

    let mut summary = MirrorSummary::default();
    for input in inputs {
        let relative = input.strip_prefix(in_root).unwrap_or(&input);
        let output = out_root.join(relative).with_extension("txt");

        match container_to_conll(&input, &output, config) {
            Ok(sentences) => {
                info!(input = %input.display(), output = %output.display(), sentences, "converted container");
                summary.sentences += sentences;
                summary.converted.push(output);
            }
            Err(e) => {
                warn!(input = %input.display(), error = %e, "failed to convert container");
                summary.failed.push(input);
            }
        }
    }
    Ok(summary)
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extension, out)?;
        } else if path.extension().is_some_and(|e| e == extension) {
            out.push(path);
        }
    }
    Ok(())
}
