use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kira-qcagg",
    version,
    about = "Aggregate ReadQC qcML, BBMap idhist and GffCompare stats into one QC report"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level
    #[arg(short = 'l', long, value_enum, global = true, default_value_t = LogLevelArg::Warn)]
    pub loglevel: LogLevelArg,

    /// Silence all output
    #[arg(long, global = true, conflicts_with = "loglevel")]
    pub quiet: bool,

    /// Prepend log entries with a timestamp
    #[arg(
        short = 'X',
        long,
        global = true,
        value_name = "GRANULARITY",
        default_value = "none",
        value_parser = clap::value_parser!(stderrlog::Timestamp)
    )]
    pub timestamp: stderrlog::Timestamp,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Files or directories to search for tool output
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    /// Glob pattern of sample names to leave out (repeatable)
    #[arg(long = "ignore-samples", value_name = "PATTERN")]
    pub ignore_samples: Vec<String>,

    /// Extra extension to strip when deriving sample names (repeatable)
    #[arg(long = "fn-clean-ext", value_name = "EXT")]
    pub fn_clean_exts: Vec<String>,

    /// Prefix sample names with their parent directory
    #[arg(long, default_value_t = false)]
    pub prepend_dirs: bool,

    #[arg(long, value_enum, default_value_t = DataFormatArg::Tsv)]
    pub data_format: DataFormatArg,

    /// Compress the data directory into a zip archive
    #[arg(long, default_value_t = false)]
    pub zip_data_dir: bool,

    #[arg(long, value_enum, default_value_t = CountScaleArg::Millions)]
    pub read_count_scale: CountScaleArg,

    #[arg(long, value_enum, default_value_t = CountScaleArg::Millions)]
    pub base_count_scale: CountScaleArg,

    /// Skip input files larger than this many megabytes
    #[arg(long, default_value_t = 50)]
    pub max_file_size: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevelArg {
    #[value(name = "error")]
    Error,
    #[value(name = "warn")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
    #[value(name = "none")]
    None,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DataFormatArg {
    #[value(name = "tsv")]
    Tsv,
    #[value(name = "json")]
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CountScaleArg {
    #[value(name = "raw")]
    Raw,
    #[value(name = "thousands")]
    Thousands,
    #[value(name = "millions")]
    Millions,
    #[value(name = "billions")]
    Billions,
}
