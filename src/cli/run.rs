use crate::cli::args::{Cli, Commands, CountScaleArg, DataFormatArg, LogLevelArg, RunArgs};
use crate::core::config::{
    CountScale, DEFAULT_MAX_FILE_SIZE, DataFormat, NameConfig, ReportConfig, Units,
};
use crate::core::discovery::{self, SampleFile, SearchPattern};
use crate::core::model::ModuleOutcome;
use crate::core::{bbmap, gffcompare, readqc};
use crate::report;
use crate::report::html::HtmlReport;
use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, error, info};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const DATA_DIR: &str = "report_data";
const REPORT_FILE: &str = "report.html";

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    init_log(&cli)?;
    match cli.command {
        Commands::Run(args) => run(config_from_args(args)?),
    }
}

fn init_log(cli: &Cli) -> Result<()> {
    let (quiet, verbosity) = match cli.loglevel {
        LogLevelArg::Error => (false, 0),
        LogLevelArg::Warn => (false, 1),
        LogLevelArg::Info => (false, 2),
        LogLevelArg::Debug => (false, 3),
        LogLevelArg::Trace => (false, 4),
        LogLevelArg::None => (true, 0),
    };
    stderrlog::new()
        .quiet(quiet || cli.quiet)
        .verbosity(verbosity)
        .timestamp(cli.timestamp)
        .init()
        .context("failed to initialise logging")
}

fn config_from_args(args: RunArgs) -> Result<ReportConfig> {
    let mut names = NameConfig::default();
    names.clean_exts.extend(args.fn_clean_exts);
    names.prepend_dirs = args.prepend_dirs;
    names.ignore = discovery::compile_patterns(&args.ignore_samples)?;

    let scale = |s: CountScaleArg| match s {
        CountScaleArg::Raw => CountScale::Raw,
        CountScaleArg::Thousands => CountScale::Thousands,
        CountScaleArg::Millions => CountScale::Millions,
        CountScaleArg::Billions => CountScale::Billions,
    };

    let data_format = match args.data_format {
        DataFormatArg::Tsv => DataFormat::Tsv,
        DataFormatArg::Json => DataFormat::Json,
    };

    let max_file_size = args
        .max_file_size
        .checked_mul(1024 * 1024)
        .unwrap_or(DEFAULT_MAX_FILE_SIZE);

    Ok(ReportConfig {
        inputs: args.inputs,
        out_dir: args.out,
        title: args.title,
        names,
        units: Units::new(scale(args.read_count_scale), scale(args.base_count_scale)),
        data_format,
        zip_data_dir: args.zip_data_dir,
        max_file_size,
    })
}

pub fn run(cfg: ReportConfig) -> Result<()> {
    let t0 = Instant::now();

    let candidates = stage("discover", || discovery::collect_candidates(&cfg.inputs))?;

    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("failed to create output dir {}", cfg.out_dir.display()))?;
    let data_dir = cfg.out_dir.join(DATA_DIR);
    let mut report = HtmlReport::new(data_dir.clone(), cfg.data_format, cfg.title.clone())?;

    let mut modules = ModuleTally::default();

    let files = find(&candidates, &readqc::PATTERN, &cfg);
    let outcome = stage("readqc", || {
        readqc::run(&files, &cfg.names, &cfg.units, &mut report)
    });
    modules.record(readqc::MODULE.name, outcome);

    let files = find(&candidates, &bbmap::IDHIST_PATTERN, &cfg);
    let outcome = stage("bbmap", || bbmap::run(&files, &cfg.names, &mut report));
    modules.record(bbmap::MODULE.name, outcome);

    let files = find(&candidates, &gffcompare::PATTERN, &cfg);
    let outcome = stage("gffcompare", || {
        gffcompare::run(&files, &cfg.names, &mut report)
    });
    modules.record(gffcompare::MODULE.name, outcome);

    if modules.reported == 0 || report.is_empty() {
        error!("no analysis results found in the given inputs");
        let _ = fs::remove_dir_all(&data_dir);
        bail!("no analysis results found");
    }

    stage("data", || report.write_summary_data())?;

    let html_path = cfg.out_dir.join(REPORT_FILE);
    stage("html", || report.write(&html_path))
        .with_context(|| format!("failed to write {}", html_path.display()))?;
    info!("report written to {}", html_path.display());

    if cfg.zip_data_dir {
        stage("zip", || report::zip::zip_data_dir(&cfg.out_dir, DATA_DIR))
            .with_context(|| "failed to create zip output")?;
    }

    debug!("total time {}", fmt_dur(t0.elapsed()));
    if !modules.failed.is_empty() {
        bail!(
            "{} module(s) failed: {}",
            modules.failed.len(),
            modules.failed.join(", ")
        );
    }
    Ok(())
}

fn find(candidates: &[PathBuf], pattern: &SearchPattern, cfg: &ReportConfig) -> Vec<SampleFile> {
    let files = discovery::find_files(candidates, pattern, &cfg.names, cfg.max_file_size);
    debug!("{}: {} matching files", pattern.module, files.len());
    files
}

/// Per-run module bookkeeping. A failed module is logged and skipped so the
/// others still reach the report.
#[derive(Default)]
struct ModuleTally {
    reported: usize,
    failed: Vec<&'static str>,
}

impl ModuleTally {
    fn record(&mut self, module: &'static str, outcome: Result<ModuleOutcome>) {
        match outcome {
            Ok(ModuleOutcome::Report { samples }) => {
                info!("{}: reported {} samples", module, samples);
                self.reported += 1;
            }
            Ok(ModuleOutcome::NoData) => {
                debug!("{}: no data found, skipping", module);
            }
            Err(e) => {
                error!("{}: module failed: {:#}", module, e);
                self.failed.push(module);
            }
        }
    }
}

fn stage<T, F>(name: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let t = Instant::now();
    let res = f();
    debug!("stage={} time={}", name, fmt_dur(t.elapsed()));
    res
}

fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gffcompare::tests::STATS;
    use crate::core::idhist::tests::IDHIST;
    use crate::core::qcml::tests::qcml_doc;

    fn config(inputs: Vec<PathBuf>, out: PathBuf) -> ReportConfig {
        ReportConfig {
            inputs,
            out_dir: out,
            title: None,
            names: NameConfig::default(),
            units: Units::default(),
            data_format: DataFormat::Tsv,
            zip_data_dir: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    fn readqc_doc() -> String {
        qcml_doc(
            &["S1_R1.fastq.gz", "S1_R2.fastq.gz"],
            &[
                ("read count", "2000"),
                ("bases sequenced (MB)", "0.5"),
                ("gc content percentage", "40.5"),
            ],
        )
    }

    #[test]
    fn runs_both_modules() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("S1.qcML"), readqc_doc()).unwrap();
        fs::write(input.path().join("S2_idhist.txt"), IDHIST).unwrap();

        run(config(vec![input.path().to_path_buf()], out.path().to_path_buf())).unwrap();

        let html = fs::read_to_string(out.path().join(REPORT_FILE)).unwrap();
        assert!(html.contains("id=\"readqc\""));
        assert!(html.contains("id=\"bbmap\""));
        assert!(html.contains("BBTools: Identity histogram"));
        let data = out.path().join(DATA_DIR);
        assert!(data.join("readqc.tsv").is_file());
        assert!(data.join("bbmap_idhist.tsv").is_file());
        assert!(data.join("general_stats.tsv").is_file());

        let dump = fs::read_to_string(data.join("readqc.tsv")).unwrap();
        assert!(dump.contains("S1\t2000\t40.5\t500000\t1000"));
    }

    #[test]
    fn failed_module_does_not_stop_the_others() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("S1.qcML"), "<qcML><ReadQC>").unwrap();
        fs::write(input.path().join("S2_idhist.txt"), IDHIST).unwrap();

        let err = run(config(vec![input.path().to_path_buf()], out.path().to_path_buf()))
            .unwrap_err();
        assert!(err.to_string().contains("ReadQC"), "{}", err);

        let html = fs::read_to_string(out.path().join(REPORT_FILE)).unwrap();
        assert!(html.contains("id=\"bbmap\""));
        assert!(!html.contains("id=\"readqc\""));
        assert!(out.path().join(DATA_DIR).join("bbmap_idhist.tsv").is_file());
        assert!(!out.path().join(DATA_DIR).join("readqc.tsv").exists());
    }

    #[test]
    fn gffcompare_stats_are_reported() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("S3.stats"), STATS).unwrap();

        run(config(vec![input.path().to_path_buf()], out.path().to_path_buf())).unwrap();

        let html = fs::read_to_string(out.path().join(REPORT_FILE)).unwrap();
        assert!(html.contains("id=\"gffcompare\""));
        assert!(html.contains("gffcompare_accuracy_plot"));
        let dump = fs::read_to_string(out.path().join(DATA_DIR).join("gffcompare.tsv")).unwrap();
        assert!(dump.lines().nth(1).unwrap().starts_with("S3\t12345\t"));
    }

    #[test]
    fn zips_data_dir_on_request() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("S2_idhist.txt"), IDHIST).unwrap();

        let mut cfg = config(vec![input.path().to_path_buf()], out.path().to_path_buf());
        cfg.zip_data_dir = true;
        run(cfg).unwrap();

        assert!(out.path().join("report_data.zip").is_file());
        assert!(!out.path().join(DATA_DIR).exists());
    }

    #[test]
    fn no_results_is_an_error() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("notes.txt"), "nothing here").unwrap();

        let err = run(config(vec![input.path().to_path_buf()], out.path().to_path_buf()))
            .unwrap_err();
        assert!(err.to_string().contains("no analysis results"));
        assert!(!out.path().join(REPORT_FILE).exists());
    }
}
