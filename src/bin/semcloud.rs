use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use semcloud::{
    serialization, CloudConfig, CloudEngine, DisplayStyle, EntityId, InMemoryTable, NamedCloud,
    WordFilter,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Selection-enrichment word cloud toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute a word cloud from a corpus JSON file and a selection
    Build(BuildArgs),
    /// Convert cloud configurations to and from flat records
    Record(RecordArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Attribute columns feeding the cloud (repeatable)
    #[arg(long = "attr", value_name = "NAME")]
    attributes: Vec<String>,

    /// Background-weight exponent in [0, 1]
    #[arg(long, value_name = "W")]
    weight: Option<f64>,

    /// Minimum pair probability for cluster merges
    #[arg(long, value_name = "P")]
    cutoff: Option<f64>,

    /// Maximum number of words in the cloud
    #[arg(long, value_name = "N")]
    max_words: Option<usize>,

    /// Minimum selected occurrence count per word
    #[arg(long, value_name = "N")]
    min_occurrence: Option<usize>,

    /// Display style: no-clustering, clustered-standard, clustered-boxes
    #[arg(long, value_name = "STYLE")]
    style: Option<String>,

    /// Enable suffix stemming
    #[arg(long)]
    stem: bool,

    /// Additional delimiter strings (repeatable)
    #[arg(long = "delimiter", value_name = "TEXT")]
    delimiters: Vec<String>,

    /// Exclude decimal integers 0-999
    #[arg(long)]
    exclude_numbers: bool,

    /// Skip the legacy zero-cutoff second clustering pass
    #[arg(long)]
    no_second_pass: bool,
}

impl ConfigArgs {
    fn to_config(&self) -> Result<CloudConfig> {
        let mut builder = CloudConfig::builder()
            .stemming(self.stem)
            .delimiters(self.delimiters.clone())
            .exclude_numbers(self.exclude_numbers)
            .second_pass(!self.no_second_pass);
        if !self.attributes.is_empty() {
            builder = builder.attribute_names(self.attributes.clone());
        }
        if let Some(weight) = self.weight {
            builder = builder.weight_exponent(weight);
        }
        if let Some(cutoff) = self.cutoff {
            builder = builder.cluster_cutoff(cutoff);
        }
        if let Some(max_words) = self.max_words {
            builder = builder.max_words(max_words);
        }
        if let Some(min_occurrence) = self.min_occurrence {
            builder = builder.min_word_occurrence(min_occurrence);
        }
        if let Some(style) = &self.style {
            builder = builder.display_style(style.parse::<DisplayStyle>()?);
        }
        builder.build().context("invalid cloud configuration")
    }
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Corpus JSON file: an array of {"id", "attributes"} records
    corpus: PathBuf,

    /// Selected entity ids, comma separated
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    select: Vec<EntityId>,

    /// File of selected entity ids, one per line
    #[arg(long, value_name = "PATH", conflicts_with = "select")]
    select_file: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Additional excluded words (repeatable)
    #[arg(long = "exclude-word", value_name = "WORD")]
    exclude_words: Vec<String>,

    /// Include the word-to-entity index in the output
    #[arg(long)]
    with_index: bool,

    /// Output path; stdout when omitted
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct RecordArgs {
    #[command(subcommand)]
    command: RecordCommands,
}

#[derive(Subcommand, Debug)]
enum RecordCommands {
    /// Print the flat record of a configuration assembled from flags
    Make {
        /// Cloud name stored in the record
        #[arg(long, value_name = "NAME", default_value = "cloud")]
        name: String,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Parse a flat record file and print the configuration as JSON
    Show {
        /// Record file to parse
        path: PathBuf,
    },
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => "off",
        -1 => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn read_selection(args: &BuildArgs) -> Result<Vec<EntityId>> {
    if let Some(path) = &args.select_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading selection file {}", path.display()))?;
        return text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse::<EntityId>()
                    .with_context(|| format!("invalid entity id {line:?}"))
            })
            .collect();
    }
    Ok(args.select.clone())
}

fn run_build(args: &BuildArgs) -> Result<()> {
    let config = args.config.to_config()?;
    let table = InMemoryTable::load(&args.corpus)
        .with_context(|| format!("loading corpus {}", args.corpus.display()))?;
    let selection = read_selection(args)?;

    let mut filter = WordFilter::new(config.exclude_numbers);
    for word in &args.exclude_words {
        filter.add(word);
    }

    let engine = CloudEngine::new(&table, &selection, &config, &filter)?;
    let mut result = engine.compute()?;
    info!(
        "cloud holds {} words over {} selected of {} entities",
        result.words.len(),
        result.selected_total,
        result.background_total
    );

    if !args.with_index {
        result.entity_index.clear();
    }
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing output {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_record(args: &RecordArgs) -> Result<()> {
    match &args.command {
        RecordCommands::Make { name, config } => {
            let named = NamedCloud {
                name: name.clone(),
                config: config.to_config()?,
            };
            print!("{}", serialization::to_record(&named));
        }
        RecordCommands::Show { path } => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading record {}", path.display()))?;
            let named = serialization::from_record(&text)?;
            println!("{}", serde_json::to_string_pretty(&named.config)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match &cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Record(args) => run_record(args),
    }
}
