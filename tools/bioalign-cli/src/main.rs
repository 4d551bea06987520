//! Bioalign Corpus Tool
//!
//! Prepares BIO-tagged NER corpora from JSON Lines records, converts between
//! container and CoNLL files, scores model predictions against gold tags and
//! renders predictions over raw text.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bioalign_core::align::{
    align_char_predictions, locate_entities, render_entities, CharEntity, SentencePrediction,
};
use bioalign_core::eval::{score, Report};
use bioalign_core::gazetteer::Gazetteer;
use bioalign_core::tokenizer::{Detokenizer, SentenceSplitter, TokenizerMode};
use bioalign_core::types::{BioTag, EntityLabel, LabelMap, RecordSchema, TagSet};
use bioalign_core::{AlignConfig, BioalignError};
use bioalign_corpus::{
    container_to_conll, conll_to_container, mirror_containers, read_conll_file, ConllWriter,
    ContainerWriter, CorpusConfig, Pipeline, PipelineStats, Separator,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "bioalign")]
#[command(about = "Prepare, convert and evaluate BIO-tagged NER corpora")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Alignment configuration file (JSON)
    #[arg(short, long, global = true, env = "BIOALIGN_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus configuration file (JSON)
    #[arg(long, global = true, env = "BIOALIGN_CORPUS_CONFIG")]
    corpus_config: Option<PathBuf>,

    /// Separator between token and tag in CoNLL files
    #[arg(short, long, global = true, value_enum)]
    separator: Option<SeparatorArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn JSON Lines records into a tagged corpus
    Prepare(PrepareArgs),
    /// Convert between document containers and CoNLL files
    Convert(ConvertArgs),
    /// Score predictions against a gold CoNLL file
    Evaluate(EvaluateArgs),
    /// Highlight predicted entities in raw text
    Render(RenderArgs),
}

#[derive(Args)]
struct PrepareArgs {
    /// JSON Lines input files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Record shape of every input line
    #[arg(long, value_enum, default_value_t = SchemaArg::Raw)]
    schema: SchemaArg,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Conll)]
    format: OutputFormat,

    /// Language code attached to log lines
    #[arg(short, long, env = "BIOALIGN_LANGUAGE", default_value = "xx")]
    language: String,

    /// Id list for anchored records, as LABEL=PATH (repeatable, first match wins)
    #[arg(long = "gazetteer", value_name = "LABEL=PATH")]
    gazetteers: Vec<String>,

    /// Label for anchor ids found in no gazetteer list (dropped if unset)
    #[arg(long)]
    unknown_label: Option<String>,

    /// Order of integer tag ids
    #[arg(long, value_enum)]
    tag_set: Option<TagSetArg>,

    /// Map MAPA categories (PERSON, ADDRESS, ...) onto PER/ORG/LOC/MISC
    #[arg(long)]
    mapa: bool,

    /// How raw text is tokenized
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerArg>,

    /// Documents per container chunk
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file, or a directory of containers for --to conll
    input: PathBuf,

    /// Output file or directory
    output: PathBuf,

    /// Target format
    #[arg(long, value_enum)]
    to: OutputFormat,

    /// Chunk file prefix for --to container (defaults to the input file stem)
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Gold CoNLL file
    gold: PathBuf,

    /// Predictions file, one sentence per line (or a CoNLL file)
    predicted: PathBuf,

    /// How predictions are encoded
    #[arg(long, value_enum, default_value_t = PredictionMode::Subword)]
    predictions: PredictionMode,

    /// Drop predicted entities with a lower mean probability
    #[arg(long)]
    min_probability: Option<f32>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenderArgs {
    /// JSON Lines file of `{"text": ..., "predictions": [...]}`
    input: PathBuf,

    /// Drop predicted entities with a lower mean probability
    #[arg(long)]
    min_probability: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    Raw,
    Tokens,
    Anchors,
}

impl From<SchemaArg> for RecordSchema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Raw => Self::Raw,
            SchemaArg::Tokens => Self::Tokens,
            SchemaArg::Anchors => Self::Anchors,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Conll,
    Container,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeparatorArg {
    Space,
    Tab,
    Whitespace,
}

impl From<SeparatorArg> for Separator {
    fn from(arg: SeparatorArg) -> Self {
        match arg {
            SeparatorArg::Space => Self::Space,
            SeparatorArg::Tab => Self::Tab,
            SeparatorArg::Whitespace => Self::Whitespace,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TagSetArg {
    Wikiann,
    Tner,
}

#[derive(Clone, Copy, ValueEnum)]
enum TokenizerArg {
    Whitespace,
    Punctuation,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PredictionMode {
    /// `{"pieces": [...], "entities": [{"positions", "label", "probabilities"}]}`
    Subword,
    /// `{"entities": [{"start", "end", "label"}]}` over the space-joined gold tokens
    Char,
    /// A CoNLL file aligned with the gold file
    Conll,
}

#[derive(Deserialize)]
struct CharPredictionLine {
    #[serde(default)]
    entities: Vec<CharEntity>,
}

#[derive(Deserialize)]
struct RenderLine {
    text: String,
    #[serde(default)]
    predictions: Vec<SentencePrediction>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let align = load_align_config(cli.config.as_deref())?;
    let mut corpus = load_corpus_config(cli.corpus_config.as_deref())?;
    if let Some(separator) = cli.separator {
        corpus.separator = separator.into();
    }

    match cli.command {
        Commands::Prepare(args) => prepare(&args, align, corpus),
        Commands::Convert(args) => convert(&args, &corpus),
        Commands::Evaluate(args) => {
            let report = evaluate(&args, &align, &corpus)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            Ok(())
        }
        Commands::Render(args) => render(&args, &align),
    }
}

fn load_align_config(path: Option<&Path>) -> Result<AlignConfig> {
    match path {
        Some(path) => AlignConfig::from_json_file(path)
            .with_context(|| format!("Failed to load alignment config {}", path.display())),
        None => Ok(AlignConfig::default()),
    }
}

fn load_corpus_config(path: Option<&Path>) -> Result<CorpusConfig> {
    match path {
        Some(path) => CorpusConfig::from_json_file(path)
            .with_context(|| format!("Failed to load corpus config {}", path.display())),
        None => Ok(CorpusConfig::default()),
    }
}

/// Parses a `LABEL=PATH` gazetteer argument.
fn parse_gazetteer_spec(spec: &str) -> Result<(EntityLabel, PathBuf)> {
    let Some((label, path)) = spec.split_once('=') else {
        bail!("Gazetteer must be given as LABEL=PATH, got {spec:?}");
    };
    let label = label
        .parse::<EntityLabel>()
        .with_context(|| format!("Bad gazetteer label in {spec:?}"))?;
    Ok((label, PathBuf::from(path)))
}

fn build_gazetteer(args: &PrepareArgs) -> Result<Gazetteer> {
    let mut builder = Gazetteer::builder();
    for spec in &args.gazetteers {
        let (label, path) = parse_gazetteer_spec(spec)?;
        builder = builder
            .load(label, &path)
            .with_context(|| format!("Failed to read gazetteer {}", path.display()))?;
    }
    let fallback = args
        .unknown_label
        .as_deref()
        .map(str::parse::<EntityLabel>)
        .transpose()
        .context("Bad --unknown-label")?;
    Ok(builder.fallback(fallback).build())
}

fn prepare(args: &PrepareArgs, mut align: AlignConfig, mut corpus: CorpusConfig) -> Result<()> {
    if let Some(tag_set) = args.tag_set {
        align = align.with_tag_set(match tag_set {
            TagSetArg::Wikiann => TagSet::wikiann(),
            TagSetArg::Tner => TagSet::tner(),
        });
    }
    if args.mapa {
        align = align.with_label_map(LabelMap::mapa());
    }
    if let Some(mode) = args.tokenizer {
        align = align.with_tokenizer_mode(match mode {
            TokenizerArg::Whitespace => TokenizerMode::Whitespace,
            TokenizerArg::Punctuation => TokenizerMode::Punctuation,
        });
    }
    if let Some(chunk_size) = args.chunk_size {
        corpus = corpus.with_chunk_size(chunk_size);
    }
    align.validate()?;

    let pipeline = Pipeline::new(&align, args.schema.into())
        .with_classifier(Box::new(build_gazetteer(args)?))
        .with_language(args.language.as_str());
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut failed = 0;
    for input in &args.inputs {
        match prepare_file(&pipeline, input, args, &corpus) {
            Ok(stats) => info!(
                input = %input.display(),
                documents = stats.documents,
                skipped = stats.failed,
                "prepared file"
            ),
            Err(e) => {
                error!(input = %input.display(), "{e:#}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} input files failed", args.inputs.len());
    }
    Ok(())
}

fn prepare_file(
    pipeline: &Pipeline,
    input: &Path,
    args: &PrepareArgs,
    corpus: &CorpusConfig,
) -> Result<PipelineStats> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let stem = file_stem(input);

    let stats = match args.format {
        OutputFormat::Conll => {
            let path = args.output.join(format!("{stem}.txt"));
            let mut writer = ConllWriter::create(&path, corpus.separator)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let stats = pipeline.run(reader, &mut writer)?;
            writer.finish()?;
            stats
        }
        OutputFormat::Container => {
            let mut writer = ContainerWriter::new(&args.output, stem, corpus)?;
            let stats = pipeline.run(reader, &mut writer)?;
            writer.finish()?;
            stats
        }
    };
    Ok(stats)
}

fn convert(args: &ConvertArgs, corpus: &CorpusConfig) -> Result<()> {
    match args.to {
        OutputFormat::Conll if args.input.is_dir() => {
            let summary = mirror_containers(&args.input, &args.output, corpus)?;
            info!(
                converted = summary.converted.len(),
                failed = summary.failed.len(),
                sentences = summary.sentences,
                "converted container directory"
            );
            if !summary.failed.is_empty() {
                bail!("{} container files failed to convert", summary.failed.len());
            }
        }
        OutputFormat::Conll => {
            let sentences = container_to_conll(&args.input, &args.output, corpus)
                .with_context(|| format!("Failed to convert {}", args.input.display()))?;
            info!(sentences, output = %args.output.display(), "wrote CoNLL file");
        }
        OutputFormat::Container => {
            let prefix = args.prefix.clone().unwrap_or_else(|| file_stem(&args.input));
            let chunks = conll_to_container(
                &args.input,
                &args.output,
                &prefix,
                corpus,
                &Detokenizer::default(),
            )
            .with_context(|| format!("Failed to convert {}", args.input.display()))?;
            info!(chunks = chunks.len(), output = %args.output.display(), "wrote containers");
        }
    }
    Ok(())
}

fn evaluate(args: &EvaluateArgs, align: &AlignConfig, corpus: &CorpusConfig) -> Result<Report> {
    let gold = read_conll_file(&args.gold, corpus.separator)
        .with_context(|| format!("Failed to read gold file {}", args.gold.display()))?;

    let predicted: Vec<Vec<BioTag>> = match args.predictions {
        PredictionMode::Conll => read_conll_file(&args.predicted, corpus.separator)
            .with_context(|| format!("Failed to read predictions {}", args.predicted.display()))?
            .into_iter()
            .map(|s| s.tags)
            .collect(),
        PredictionMode::Subword => {
            let mut aligner = align.aligner();
            if args.min_probability.is_some() {
                aligner = aligner.with_min_probability(args.min_probability);
            }
            let lines: Vec<SentencePrediction> = read_json_lines(&args.predicted)?;
            check_count(gold.len(), lines.len())?;
            lines
                .iter()
                .zip(&gold)
                .map(|(line, sentence)| aligner.align(&sentence.tokens, &line.pieces, &line.entities).tags)
                .collect()
        }
        PredictionMode::Char => {
            if args.min_probability.is_some() {
                warn!("--min-probability has no effect on char predictions");
            }
            let lines: Vec<CharPredictionLine> = read_json_lines(&args.predicted)?;
            check_count(gold.len(), lines.len())?;
            lines
                .iter()
                .zip(&gold)
                .map(|(line, sentence)| align_char_predictions(&sentence.tokens, &line.entities).tags)
                .collect()
        }
    };

    let gold_tags: Vec<&[BioTag]> = gold.iter().map(|s| s.tags.as_slice()).collect();
    Ok(score(&gold_tags, &predicted)?)
}

fn check_count(gold: usize, predicted: usize) -> Result<()> {
    if gold != predicted {
        return Err(BioalignError::SequenceCountMismatch { gold, predicted }.into());
    }
    Ok(())
}

fn render(args: &RenderArgs, align: &AlignConfig) -> Result<()> {
    let mut aligner = align.aligner();
    if args.min_probability.is_some() {
        aligner = aligner.with_min_probability(args.min_probability);
    }
    let splitter = SentenceSplitter::new()?;
    let lines: Vec<RenderLine> = read_json_lines(&args.input)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, line) in lines.iter().enumerate() {
        match locate_entities(&aligner, &splitter, &line.text, &line.predictions) {
            Ok(entities) => writeln!(out, "{}", render_entities(&line.text, &entities))?,
            Err(e) => warn!(index, error = %e, "could not place predictions"),
        }
    }
    Ok(())
}

/// Decodes every non-blank line of a JSON Lines file.
fn read_json_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
    );
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: bad JSON line", path.display(), index + 1))?;
        items.push(item);
    }
    Ok(items)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn write(path: &Path, body: &str) {
        fs::write(path, body).unwrap();
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bioalign").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_gazetteer_spec() {
        let (label, path) = parse_gazetteer_spec("PER=lists/PER-ND.txt").unwrap();
        assert_eq!(label, EntityLabel::Per);
        assert_eq!(path, PathBuf::from("lists/PER-ND.txt"));
        assert!(parse_gazetteer_spec("PER-ND.txt").is_err());
        assert!(parse_gazetteer_spec("=x.txt").is_err());
    }

    #[test]
    fn test_prepare_conll_continues_after_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hr.jsonl");
        write(
            &input,
            r#"{"text": "Ivo živi u Splitu.", "entities": [{"start": 11, "end": 17, "label": "LOC"}]}"#,
        );
        let missing = dir.path().join("missing.jsonl");
        let out = dir.path().join("out");

        let cli = parse(&[
            "prepare",
            missing.to_str().unwrap(),
            input.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--language",
            "hr",
        ]);
        assert!(run(cli).is_err());

        let written = fs::read_to_string(out.join("hr.txt")).unwrap();
        assert_eq!(written, "Ivo O\nživi O\nu O\nSplitu B-LOC\n. O\n\n");
    }

    #[test]
    fn test_prepare_container_then_convert() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("train.jsonl");
        write(
            &input,
            "{\"tokens\": [\"Oslo\", \"je\", \"lijep\"], \"tags\": [0, 6, 6]}\n",
        );
        let docs = dir.path().join("docs");
        let cli = parse(&[
            "prepare",
            input.to_str().unwrap(),
            "-o",
            docs.to_str().unwrap(),
            "--schema",
            "tokens",
            "--format",
            "container",
            "--tag-set",
            "tner",
        ]);
        run(cli).unwrap();
        assert!(docs.join("train1.docbin").is_file());

        let txt = dir.path().join("txt");
        let cli = parse(&[
            "convert",
            docs.to_str().unwrap(),
            txt.to_str().unwrap(),
            "--to",
            "conll",
            "--separator",
            "tab",
        ]);
        run(cli).unwrap();
        let written = fs::read_to_string(txt.join("train1.txt")).unwrap();
        assert_eq!(written, "Oslo\tB-LOC\nje\tO\nlijep\tO\n\n");
    }

    #[test]
    fn test_evaluate_subword_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let gold = dir.path().join("gold.txt");
        write(&gold, "Barack B-PER\nObama I-PER\n\nu O\nRimu B-LOC\n\n");
        let predicted = dir.path().join("pred.jsonl");
        write(
            &predicted,
            concat!(
                "{\"pieces\": [\"▁Bar\", \"ack\", \"▁Obama\"], \"entities\": [{\"positions\": [0, 2], \"label\": \"PER\"}]}\n",
                "{\"pieces\": [\"▁u\", \"▁Rim\", \"u\"], \"entities\": [{\"positions\": [1], \"label\": \"ORG\"}]}\n",
            ),
        );

        let Commands::Evaluate(args) = parse(&[
            "evaluate",
            gold.to_str().unwrap(),
            predicted.to_str().unwrap(),
        ])
        .command
        else {
            panic!("expected evaluate");
        };
        let report = evaluate(&args, &AlignConfig::default(), &CorpusConfig::default()).unwrap();
        assert_eq!(report.correct, 1);
        assert!((report.precision - 0.5).abs() < 1e-9);
        assert!((report.recall - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_count_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gold = dir.path().join("gold.txt");
        write(&gold, "a O\n\nb O\n\n");
        let predicted = dir.path().join("pred.txt");
        write(&predicted, "a O\n\n");

        let Commands::Evaluate(args) = parse(&[
            "evaluate",
            gold.to_str().unwrap(),
            predicted.to_str().unwrap(),
            "--predictions",
            "conll",
        ])
        .command
        else {
            panic!("expected evaluate");
        };
        assert!(evaluate(&args, &AlignConfig::default(), &CorpusConfig::default()).is_err());
    }

    #[test]
    fn test_evaluate_char_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let gold = dir.path().join("gold.txt");
        write(&gold, "Novi B-LOC\nSad I-LOC\n\n");
        let predicted = dir.path().join("pred.jsonl");
        write(
            &predicted,
            "{\"entities\": [{\"start\": 0, \"end\": 8, \"entity_group\": \"LOC\", \"score\": 0.97}]}\n",
        );

        let Commands::Evaluate(args) = parse(&[
            "evaluate",
            gold.to_str().unwrap(),
            predicted.to_str().unwrap(),
            "--predictions",
            "char",
        ])
        .command
        else {
            panic!("expected evaluate");
        };
        let report = evaluate(&args, &AlignConfig::default(), &CorpusConfig::default()).unwrap();
        assert_eq!(report.f1, 1.0);
    }
}
