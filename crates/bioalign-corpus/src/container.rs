//! # Document Container
//!
//! Chunked, gzip-compressed JSON Lines files holding whole documents: text,
//! tokens and entity spans. The first line of every chunk is a header naming
//! the format and its version.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bioalign_core::align::SpanTagger;
use bioalign_core::prepare::PreparedDocument;
use bioalign_core::types::{BioTag, EntitySpan, Token};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CorpusConfig;
use crate::error::{CorpusError, Result};

/// Format name written into every chunk header.
pub const CONTAINER_FORMAT: &str = "bioalign-docs";
/// Current container version.
pub const CONTAINER_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContainerHeader {
    format: String,
    version: u32,
}

/// A document as stored in a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDoc {
    pub text: String,
    pub tokens: Vec<Token>,
    pub entities: Vec<EntitySpan>,
}

impl ContainerDoc {
    /// Token texts in order.
    pub fn token_texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// The IOB2 tags the stored entities give the stored tokens.
    pub fn tags(&self) -> Vec<BioTag> {
        SpanTagger::tag(&self.tokens, &self.entities).tags
    }
}

impl From<&PreparedDocument> for ContainerDoc {
    fn from(doc: &PreparedDocument) -> Self {
        Self {
            text: doc.tokenized.document.text().to_string(),
            tokens: doc.tokenized.tokens.clone(),
            entities: doc.tokenized.document.entities().to_vec(),
        }
    }
}

type ChunkEncoder = GzEncoder<BufWriter<File>>;

/// Writes documents into numbered chunk files `<prefix><n>.<ext>`, starting at 1.
///
/// A new chunk is started every `chunk_size` documents. Call
/// [`ContainerWriter::finish`] to close the last chunk.
pub struct ContainerWriter {
    dir: PathBuf,
    prefix: String,
    extension: String,
    chunk_size: usize,
    current: Option<ChunkEncoder>,
    in_current: usize,
    paths: Vec<PathBuf>,
    documents: usize,
}

impl ContainerWriter {
    /// Creates `dir` if needed and prepares to write chunks into it.
    pub fn new(dir: impl AsRef<Path>, prefix: impl Into<String>, config: &CorpusConfig) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            extension: config.container_extension.clone(),
            chunk_size: config.chunk_size,
            current: None,
            in_current: 0,
            paths: Vec::new(),
            documents: 0,
        })
    }

    /// Appends one document, rolling over to a new chunk when the current one is full.
    pub fn push(&mut self, doc: &ContainerDoc) -> Result<()> {
        let encoder = match self.current.take() {
            Some(encoder) => encoder,
            None => self.open_chunk()?,
        };
        let encoder = self.current.insert(encoder);

        serde_json::to_writer(&mut *encoder, doc)?;
        encoder.write_all(b"\n")?;
        self.in_current += 1;
        self.documents += 1;

        if self.in_current == self.chunk_size {
            self.close_chunk()?;
        }
        Ok(())
    }

    /// Documents written so far.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Closes the open chunk and returns every chunk path written.
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.close_chunk()?;
        Ok(self.paths)
    }

    fn open_chunk(&mut self) -> Result<ChunkEncoder> {
        let path = self.dir.join(format!(
            "{}{}.{}",
            self.prefix,
            self.paths.len() + 1,
            self.extension
        ));
        let mut encoder = GzEncoder::new(BufWriter::new(File::create(&path)?), Compression::default());

        let header = ContainerHeader {
            format: CONTAINER_FORMAT.to_string(),
            version: CONTAINER_VERSION,
        };
        serde_json::to_writer(&mut encoder, &header)?;
        encoder.write_all(b"\n")?;

        self.paths.push(path);
        self.in_current = 0;
        Ok(encoder)
    }

    fn close_chunk(&mut self) -> Result<()> {
        if let Some(encoder) = self.current.take() {
            encoder.finish()?.flush()?;
            debug!(
                path = %self.paths.last().map(|p| p.display().to_string()).unwrap_or_default(),
                documents = self.in_current,
                "flushed container chunk"
            );
            self.in_current = 0;
        }
        Ok(())
    }
}

/// Reads every document from one chunk file.
///
/// # Errors
///
/// Fails if the file is not a container, has an unsupported header, or
/// holds a line that does not decode.
pub fn read_container(path: impl AsRef<Path>) -> Result<Vec<ContainerDoc>> {
    let path = path.as_ref();
    let reader = BufReader::new(GzDecoder::new(File::open(path)?));
    let mut lines = reader.lines();

    let header_line = lines
        .next()
        .transpose()?
        .ok_or_else(|| CorpusError::MissingHeader {
            path: path.to_path_buf(),
        })?;
    let header: ContainerHeader =
        serde_json::from_str(&header_line).map_err(|_| CorpusError::MissingHeader {
            path: path.to_path_buf(),
        })?;
    if header.format != CONTAINER_FORMAT || header.version > CONTAINER_VERSION {
        return Err(CorpusError::UnsupportedContainer {
            path: path.to_path_buf(),
            format: header.format,
            version: header.version,
        });
    }

    let mut docs = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        docs.push(serde_json::from_str(&line)?);
    }
    Ok(docs)
}

/// Lists the chunk files in `dir` with the given extension, ordered by
/// their numeric suffix (`train2` before `train10`).
pub fn chunk_files(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == extension) {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|path| chunk_sort_key(path));
    Ok(files)
}

/// Reads every chunk in `dir` in suffix order.
pub fn read_container_dir(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<ContainerDoc>> {
    let mut docs = Vec::new();
    for path in chunk_files(dir, extension)? {
        docs.extend(read_container(&path)?);
    }
    Ok(docs)
}

fn chunk_sort_key(path: &Path) -> (String, Option<u64>, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit()).to_string();
    let number = stem[prefix.len()..].parse().ok();
    (prefix, number, stem)
}
