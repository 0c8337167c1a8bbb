use glob::Pattern;
use std::path::PathBuf;

/// Unit used when displaying large counts in report tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CountScale {
    Raw,
    Thousands,
    Millions,
    Billions,
}

impl CountScale {
    pub fn multiplier(self) -> f64 {
        match self {
            CountScale::Raw => 1.0,
            CountScale::Thousands => 1e-3,
            CountScale::Millions => 1e-6,
            CountScale::Billions => 1e-9,
        }
    }

    pub fn read_prefix(self) -> &'static str {
        match self {
            CountScale::Raw => "",
            CountScale::Thousands => "K",
            CountScale::Millions => "M",
            CountScale::Billions => "B",
        }
    }

    pub fn base_prefix(self) -> &'static str {
        match self {
            CountScale::Raw => "bp",
            CountScale::Thousands => "Kb",
            CountScale::Millions => "Mb",
            CountScale::Billions => "Gb",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataFormat {
    Tsv,
    Json,
}

impl DataFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Tsv => "tsv",
            DataFormat::Json => "json",
        }
    }
}

/// Display units shared by every module.
#[derive(Clone, Debug)]
pub struct Units {
    pub read_count_multiplier: f64,
    pub read_count_prefix: String,
    pub cluster_count_multiplier: f64,
    pub cluster_count_prefix: String,
    pub base_count_multiplier: f64,
    pub base_count_prefix: String,
}

impl Units {
    pub fn new(reads: CountScale, bases: CountScale) -> Self {
        Self {
            read_count_multiplier: reads.multiplier(),
            read_count_prefix: reads.read_prefix().to_string(),
            cluster_count_multiplier: reads.multiplier(),
            cluster_count_prefix: reads.read_prefix().to_string(),
            base_count_multiplier: bases.multiplier(),
            base_count_prefix: bases.base_prefix().to_string(),
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Units::new(CountScale::Millions, CountScale::Millions)
    }
}

/// How discovered file names become sample names.
#[derive(Clone, Debug)]
pub struct NameConfig {
    pub clean_exts: Vec<String>,
    pub prepend_dirs: bool,
    pub ignore: Vec<Pattern>,
}

pub const DEFAULT_CLEAN_EXTS: &[&str] = &[
    ".gz", ".qcML", ".qcml", ".txt", ".fastq", ".fq", ".bam", "_idhist", ".idhist", ".stats",
];

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            clean_exts: DEFAULT_CLEAN_EXTS.iter().map(|s| s.to_string()).collect(),
            prepend_dirs: false,
            ignore: Vec::new(),
        }
    }
}

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub struct ReportConfig {
    pub inputs: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub title: Option<String>,
    pub names: NameConfig,
    pub units: Units,
    pub data_format: DataFormat,
    pub zip_data_dir: bool,
    pub max_file_size: u64,
}
