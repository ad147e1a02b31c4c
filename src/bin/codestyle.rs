//! Codestyle CLI - stylometric feature datasets from Java sources.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use codestyle::builder::Codestyle;
use codestyle::errors::{exit_code, CodestyleError};
use codestyle::logging::init_logging;
use codestyle::output::{
    format_features, write_dataset, FeatureFormat, OutputFormat, OutputOptions,
};
use codestyle::pipeline::FeaturePipeline;
use codestyle::walker::IdentifierSource;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "codestyle")]
#[command(about = "Extract stylometric feature datasets from Java source code")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a feature dataset from a directory of sources
    Extract {
        /// Root directory (or single file) to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per CPU)
        #[arg(short = 'j', long, default_value_t = 0)]
        threads: usize,

        /// How each snippet is identified
        #[arg(long, value_enum, default_value = "parent-dir")]
        identifier: IdentifierArg,

        /// File extensions to collect
        #[arg(long = "ext", value_delimiter = ',', default_value = "java")]
        extensions: Vec<String>,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Maximum directory depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Omit the identifier and index columns
        #[arg(long)]
        no_provenance: bool,
    },

    /// Print the features of a single source file
    Features {
        /// Source file to analyze
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum IdentifierArg {
    ParentDir,
    Path,
    Stem,
}

impl From<IdentifierArg> for IdentifierSource {
    fn from(arg: IdentifierArg) -> Self {
        match arg {
            IdentifierArg::ParentDir => IdentifierSource::ParentDir,
            IdentifierArg::Path => IdentifierSource::Path,
            IdentifierArg::Stem => IdentifierSource::Stem,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json_output = json_flag(&cli.command);

    if let Err(e) = init_logging(cli.verbose, cli.log_json) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = match cli.command {
        Commands::Extract {
            path,
            format,
            output,
            threads,
            identifier,
            extensions,
            include_hidden,
            max_depth,
            no_provenance,
        } => {
            let mut builder = Codestyle::new(path)
                .threads(threads)
                .identifier(identifier.into())
                .extensions(extensions)
                .include_hidden(include_hidden);
            if let Some(depth) = max_depth {
                builder = builder.max_depth(depth);
            }
            let options = OutputOptions {
                format: format.into(),
                include_provenance: !no_provenance,
            };
            run_extract(builder, &options, output)
        }
        Commands::Features { file, json } => run_features(file, json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "codestyle", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Extract { format, .. } => matches!(format, FormatArg::Json),
        Commands::Features { json, .. } => *json,
        Commands::Completions { .. } => false,
    }
}

// --- Extract command ---

fn run_extract(
    builder: Codestyle,
    options: &OutputOptions,
    output: Option<PathBuf>,
) -> Result<(), CodestyleError> {
    let result = builder.build()?;

    match output {
        Some(path) => {
            let mut out = BufWriter::new(fs::File::create(&path)?);
            write_dataset(&result.dataset, &mut out, options)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_dataset(&result.dataset, &mut out, options)?;
        }
    }

    let batch = &result.batch;
    eprintln!(
        "{} snippets, {} features, {} dropped ({:.2}s, {} threads)",
        result.dataset.n_rows(),
        result.dataset.n_cols(),
        batch.failed_count(),
        batch.elapsed.as_secs_f64(),
        batch.threads_used,
    );

    Ok(())
}

// --- Features command ---

fn run_features(file: PathBuf, json: bool) -> Result<(), CodestyleError> {
    if !file.exists() {
        return Err(CodestyleError::PathNotFound(file));
    }

    let text = fs::read_to_string(&file)?;
    let features = FeaturePipeline::java().extract(&text)?;

    let format = if json {
        FeatureFormat::Json
    } else {
        FeatureFormat::Text
    };
    let rendered = format_features(&features, format)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write!(out, "{rendered}")?;
    if json {
        writeln!(out)?;
    }
    Ok(())
}
