use crate::core::config::NameConfig;
use crate::core::discovery::{SampleFile, SearchPattern, ignore_samples};
use crate::core::idhist::{self, IdHist};
use crate::core::model::{ModuleOutcome, SampleTable};
use crate::report::linegraph::PlotOverrides;
use crate::report::{ModuleInfo, ReportSink, Section, SectionContent};
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

pub const MODULE: ModuleInfo = ModuleInfo {
    name: "BBTools",
    anchor: "bbmap",
    href: "http://jgi.doe.gov/data-and-tools/bbtools/",
    info: "is a suite of fast, multithreaded bioinformatics tools designed for analysis of DNA and RNA sequence data.",
};

pub const IDHIST_PATTERN: SearchPattern = SearchPattern {
    module: "bbmap/idhist",
    fn_suffix: None,
    contents: Some(idhist::COLUMN_HEADER),
};

/// Parse identity histograms and add the identity plot to the report.
pub fn run(files: &[SampleFile], names: &NameConfig, sink: &mut dyn ReportSink) -> Result<ModuleOutcome> {
    let mut samples: BTreeMap<String, IdHist> = BTreeMap::new();
    let mut sources: BTreeMap<&str, &Path> = BTreeMap::new();
    for f in files {
        let hist = idhist::parse(&f.contents)
            .with_context(|| format!("failed to parse idhist file {}", f.path.display()))?;
        if samples.insert(f.s_name.clone(), hist).is_some() {
            warn!(
                "{}: duplicate sample name '{}', overwriting with {}",
                MODULE.name, f.s_name, f.file_name
            );
        }
        sources.insert(f.s_name.as_str(), f.path.as_path());
    }
    let samples = ignore_samples(samples, &names.ignore);
    if samples.is_empty() {
        return Ok(ModuleOutcome::NoData);
    }

    info!("{}: found {} idhist reports", MODULE.name, samples.len());

    let plot = idhist::plot_idhist(
        &samples,
        "idhist",
        "Identity histogram",
        PlotOverrides::default(),
    )?;
    let summary: SampleTable = samples
        .iter()
        .map(|(s_name, h)| (s_name.clone(), h.summary.clone()))
        .collect();
    sink.write_data_file(&summary, "bbmap_idhist")?;

    for (s_name, path) in sources {
        if samples.contains_key(s_name) {
            sink.add_data_source(&MODULE, s_name, path);
        }
    }
    sink.add_section(
        &MODULE,
        Section {
            name: "Identity Histogram".to_string(),
            anchor: "bbmap-idhist".to_string(),
            description: "Histogram of read count and base count by percent identity to the reference.".to_string(),
            content: SectionContent::LinePlot(plot),
        },
    );

    Ok(ModuleOutcome::Report {
        samples: samples.len(),
    })
}
