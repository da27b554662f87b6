use std::fs;
use std::io::Write;

use clap::{Parser, Subcommand, ValueEnum};
use libglidelm::lm::params::LoudsLmParams;

use crate::subcmd::dump_ngrams::dump_ngrams;
use crate::subcmd::lookup::lookup;
use crate::subcmd::make_lm::make_lm;
use crate::subcmd::predict::predict;

mod ngram_tsv;
mod subcmd;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[clap(
name = env ! ("CARGO_PKG_NAME"),
version = env ! ("CARGO_PKG_VERSION"),
about = "Build and inspect LOUDS n-gram language models",
arg_required_else_help = true,
)]
struct Args {
    #[clap(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[clap(arg_required_else_help = true)]
    MakeLm(MakeLmArgs),
    #[clap(arg_required_else_help = true)]
    DumpNgrams(DumpNgramsArgs),
    #[clap(arg_required_else_help = true)]
    Lookup(LookupArgs),
    #[clap(arg_required_else_help = true)]
    Predict(PredictArgs),
}

/// Build a binary LM container from a TSV n-gram listing
/// (`w1 w2 ... wN<TAB>logp[<TAB>backoff]`, natural log).
#[derive(Debug, clap::Args)]
struct MakeLmArgs {
    /// YAML file with model parameters; flags below override it
    #[arg(long)]
    params: Option<String>,
    /// Quantizer range: log probabilities cover [-range, 0]
    #[arg(long)]
    quantizer_range: Option<f32>,
    /// Cap the externally visible term-id space to the top-N terms
    #[arg(long)]
    max_num_term_ids: Option<u32>,
    /// Store per-history backoff weights instead of stupid backoff
    #[arg(long)]
    backoff_weights: bool,
    /// Precompute top-unigram fallback predictions
    #[arg(long)]
    unigram_predictions: bool,
    /// Encode best-completion log probabilities for lexicon prefixes
    #[arg(long)]
    prefix_unigrams: bool,
    src_file: String,
    dst_file: String,
}

/// Dump every n-gram stored in a model.
#[derive(Debug, clap::Args)]
struct DumpNgramsArgs {
    /// Memory-map the model instead of reading it
    #[arg(long)]
    mmap: bool,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    model_file: String,
}

/// Conditional log probability of the last word given the preceding ones.
#[derive(Debug, clap::Args)]
struct LookupArgs {
    /// Memory-map the model instead of reading it
    #[arg(long)]
    mmap: bool,
    model_file: String,
    words: Vec<String>,
}

/// Predict the most probable next words for a context.
#[derive(Debug, clap::Args)]
struct PredictArgs {
    /// Memory-map the model instead of reading it
    #[arg(long)]
    mmap: bool,
    /// Number of predictions
    #[arg(short = 'n', long, default_value_t = 5)]
    max_results: usize,
    model_file: String,
    context: Vec<String>,
}

fn load_params(args: &MakeLmArgs) -> anyhow::Result<LoudsLmParams> {
    let mut params: LoudsLmParams = match &args.params {
        Some(path) => serde_yaml::from_str(&fs::read_to_string(path)?)?,
        None => LoudsLmParams::default(),
    };
    if let Some(range) = args.quantizer_range {
        params.logp_quantizer_range = range;
    }
    if let Some(max) = args.max_num_term_ids {
        params.max_num_term_ids = max;
    }
    params.has_backoff_weights |= args.backoff_weights;
    params.include_unigram_predictions |= args.unigram_predictions;
    params.enable_prefix_unigrams |= args.prefix_unigrams;
    Ok(params)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format(|buf, record| {
            let ts = buf.timestamp_micros();
            writeln!(buf, "{}: {}: {}", ts, record.level(), record.args())
        })
        .init();

    match args.command {
        Commands::MakeLm(opt) => {
            let params = load_params(&opt)?;
            make_lm(opt.src_file.as_str(), opt.dst_file.as_str(), params)
        }
        Commands::DumpNgrams(opt) => {
            dump_ngrams(opt.model_file.as_str(), opt.mmap, opt.format)
        }
        Commands::Lookup(opt) => lookup(opt.model_file.as_str(), opt.mmap, &opt.words),
        Commands::Predict(opt) => predict(
            opt.model_file.as_str(),
            opt.mmap,
            &opt.context,
            opt.max_results,
        ),
    }
}
