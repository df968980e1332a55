//! Phyto CLI - Command-line interface
//!
//! Usage:
//!   phyto annotate -g <gazetteer-dir> <corpus.tok.pos.txt | dir>
//!   phyto link <tagged-file> -o linked.json [-f iob|chunks] [-r lookup.tsv]
//!   phyto evaluate <silver.iob.txt> <gold.iob.txt>
//!   phyto stats <corpus.iob.txt>
//!   phyto sentences <corpus.iob.txt>
//!
//! Author: hephaex@gmail.com

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use phyto_annotator::{
    iob_output_path, read_tag_stream, write_sentence_lines, Annotator, CorpusStatistics,
    Evaluator, GazetteerStore, SpanExtractor, TagFormat,
};
use phyto_core::{AnnotationConfig, AppConfig, LinkerConfig, LoggingConfig, SpanLengthRule};
use phyto_linker::{ColClient, EntityLinker, LookupTable};

#[derive(Parser)]
#[command(name = "phyto")]
#[command(about = "Gazetteer-based plant name annotation and taxonomic linking")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag a token corpus (or every *.tok.pos.txt in a directory) with IOB labels
    Annotate {
        /// Token file or directory of token files
        input: PathBuf,

        /// Output file (single-file mode only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gazetteer directory; may be repeated
        #[arg(short, long = "gazetteers")]
        gazetteers: Vec<PathBuf>,

        /// Only load gazetteer files with this extension
        #[arg(long)]
        extension: Option<String>,

        /// How gazetteer entry length is measured (tokens | legacy-spaces)
        #[arg(long)]
        span_rule: Option<SpanLengthRule>,

        /// Categories that win overlaps first, comma-separated
        #[arg(long, value_delimiter = ',')]
        priority: Vec<String>,
    },
    /// Link tagged plant names to Catalogue of Life records
    Link {
        /// Tagged file in IOB rows or token__TAG chunks
        input: PathBuf,

        /// JSON report path
        #[arg(short, long, default_value = "linked_output.json")]
        output: PathBuf,

        /// Input format (iob | chunks)
        #[arg(short, long, default_value = "iob")]
        format: TagFormat,

        /// Vernacular to scientific name lookup table
        #[arg(short = 'r', long)]
        lookup: Option<PathBuf>,

        /// Do not retry unresolved names through the lookup table
        #[arg(long)]
        no_lookup: bool,

        /// Name service endpoint
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum concurrent name queries
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Compare a silver IOB corpus against its gold standard
    Evaluate {
        silver: PathBuf,
        gold: PathBuf,

        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print size and label statistics of an IOB corpus
    Stats {
        input: PathBuf,

        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite an IOB corpus as one tokenized sentence per line
    Sentences {
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Commands::Annotate {
            input,
            output,
            gazetteers,
            extension,
            span_rule,
            priority,
        } => {
            let mut annotation = config.annotation;
            if !gazetteers.is_empty() {
                annotation.gazetteer_dirs = gazetteers;
            }
            if extension.is_some() {
                annotation.gazetteer_extension = extension;
            }
            if let Some(rule) = span_rule {
                annotation.span_length_rule = rule;
            }
            if !priority.is_empty() {
                annotation.priority = priority;
            }
            annotate(&annotation, &input, output)?;
        }
        Commands::Link {
            input,
            output,
            format,
            lookup,
            no_lookup,
            base_url,
            timeout,
            concurrency,
        } => {
            let mut linker = config.linker;
            if lookup.is_some() {
                linker.lookup_table = lookup;
            }
            if no_lookup {
                linker.use_lookup = false;
            }
            if let Some(url) = base_url {
                linker.base_url = url;
            }
            if let Some(secs) = timeout {
                linker.timeout_secs = secs;
            }
            if let Some(n) = concurrency {
                linker.concurrency = n;
            }
            link(&linker, &input, &output, format).await?;
        }
        Commands::Evaluate { silver, gold, json } => {
            let evaluation = Evaluator::new().evaluate(open(&silver)?, open(&gold)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                print!("{}", evaluation.report());
            }
        }
        Commands::Stats { input, json } => {
            let stats = CorpusStatistics::from_reader(open(&input)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", stats.report());
            }
            if !stats.errors.is_empty() {
                eprintln!("{} malformed rows skipped", stats.errors.len());
            }
        }
        Commands::Sentences { input, output } => {
            let reader = open(&input)?;
            let written = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_sentence_lines(reader, BufWriter::new(file))?
                }
                None => write_sentence_lines(reader, std::io::stdout().lock())?,
            };
            eprintln!("{written} sentences written");
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn annotate(
    config: &AnnotationConfig,
    input: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if config.gazetteer_dirs.is_empty() {
        bail!("No gazetteer directory given (use --gazetteers or PHYTO_GAZETTEER_DIRS)");
    }

    let store = GazetteerStore::from_config(config)?;
    let mut annotator = Annotator::new(&store);
    let summary = if input.is_dir() {
        if output.is_some() {
            bail!("--output cannot be used with a directory input");
        }
        annotator.annotate_dir(input)?
    } else {
        let output = output.unwrap_or_else(|| iob_output_path(input));
        annotator.annotate_file(input, &output)?
    };

    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{} - SUMMARY - {}", "#".repeat(15), "#".repeat(15))?;
    writeln!(
        stderr,
        "Annotated {} file(s): {} sentences, {} tokens, {} botanical entities.",
        summary.files, summary.sentences, summary.tokens, summary.entities
    )?;
    if !summary.errors.is_empty() {
        writeln!(stderr, "{} malformed rows left untagged", summary.errors.len())?;
    }

    info!(
        files = summary.files,
        sentences = summary.sentences,
        entities = summary.entities,
        errors = summary.errors.len(),
        "Annotation finished"
    );
    Ok(())
}

async fn link(
    config: &LinkerConfig,
    input: &Path,
    output: &Path,
    format: TagFormat,
) -> anyhow::Result<()> {
    let stream = read_tag_stream(open(input)?, format)?;
    let extracted = SpanExtractor.extract(&stream);

    let lookup = match &config.lookup_table {
        Some(path) if config.use_lookup => Some(LookupTable::load(path)?),
        _ => None,
    };
    let client = ColClient::from_config(config)?;
    let linker = EntityLinker::from_config(Arc::new(client), config, lookup);

    let (report, summary) = linker
        .link_spans(&extracted.spans, extracted.sentences)
        .await;

    let file =
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    report.write_json(&mut writer)?;
    writer.flush()?;

    eprintln!("{} - SUMMARY - {}", "#".repeat(15), "#".repeat(15));
    eprint!("{}", summary.report());
    if !stream.errors.is_empty() {
        eprintln!("{} malformed lines in input", stream.errors.len());
    }

    info!(output = %output.display(), entities = report.plant_names.len(), "Report written");
    Ok(())
}
