//! ReadQC (ngs-bits) report module: qcML quality parameters per sample.

use crate::core::config::{NameConfig, Units};
use crate::core::discovery::{SampleFile, SearchPattern, ignore_samples};
use crate::core::model::{ModuleOutcome, ReadType, SampleTable, Value};
use crate::core::qcml::{self, ParamMeta, QUALITY_PARAMETER, QcmlParser};
use crate::report::table::{ColorScale, Headers, Table, TableHeader};
use crate::report::{ModuleInfo, ReportSink, Section, SectionContent};
use anyhow::{Context, Result, anyhow};
use glob::Pattern;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub const MODULE: ModuleInfo = ModuleInfo {
    name: "ReadQC",
    anchor: "readqc",
    href: "https://github.com/imgag/ngs-bits",
    info: "calculates QC metrics on unprocessed NGS reads. Paired-end reads count as two reads, and single-end reads count as one read.",
};

pub const PATTERN: SearchPattern = SearchPattern {
    module: "readqc",
    fn_suffix: Some(".qcML"),
    contents: Some("ReadQC"),
};

const NAMESPACE: &str = "ReadQC";

pub const READ_COUNT: &str = "read count";
pub const CLUSTER_COUNT: &str = "cluster count";
pub const BASES_SEQUENCED: &str = "bases sequenced";
pub const BASES_SEQUENCED_MB: &str = "bases sequenced (MB)";
pub const GC_CONTENT: &str = "gc content %";

/// Columns shown in the general statistics table.
const GENERAL_STATS_KEYS: [&str; 3] = [READ_COUNT, BASES_SEQUENCED, GC_CONTENT];

/// Parameter tables collected from every ReadQC qcML file.
#[derive(Debug, Default)]
pub struct ReadQc {
    params: QcmlParser,
    data: SampleTable,
    read_types: HashMap<String, ReadType>,
    sources: BTreeMap<String, PathBuf>,
}

impl ReadQc {
    pub fn parse_files(files: &[SampleFile]) -> Result<Self> {
        let mut rq = ReadQc::default();
        for f in files {
            rq.add_file(&f.s_name, &f.contents)
                .with_context(|| format!("failed to parse qcML file {}", f.path.display()))?;
            rq.sources.insert(f.s_name.clone(), f.path.clone());
        }
        Ok(rq)
    }

    pub fn add_file(&mut self, s_name: &str, xml: &str) -> Result<()> {
        let row = self.params.parse_by(xml, QUALITY_PARAMETER)?;
        let read_type = qcml::read_type(xml)?;
        debug!("{}: {} is {}", MODULE.name, s_name, read_type);
        if self.data.insert(s_name.to_string(), row).is_some() {
            warn!(
                "{}: duplicate sample name '{}', keeping the last file",
                MODULE.name, s_name
            );
        }
        self.read_types.insert(s_name.to_string(), read_type);
        Ok(())
    }

    pub fn ignore(&mut self, patterns: &[Pattern]) {
        self.data = ignore_samples(std::mem::take(&mut self.data), patterns);
    }

    pub fn data(&self) -> &SampleTable {
        &self.data
    }

    pub fn params(&self) -> &QcmlParser {
        &self.params
    }

    /// Replace "bases sequenced (MB)" by "bases sequenced" and add "cluster count".
    ///
    /// Samples of unknown read type get no cluster count.
    pub fn derive_metrics(&mut self) -> Result<()> {
        self.params
            .remove(BASES_SEQUENCED_MB)
            .with_context(|| format!("no '{}' parameter found", BASES_SEQUENCED_MB))?;
        self.params.insert(
            BASES_SEQUENCED,
            ParamMeta {
                description: "Bases sequenced in total.".to_string(),
                accession: String::new(),
            },
        );
        self.params.insert(
            CLUSTER_COUNT,
            ParamMeta {
                description: "Total number of clusters.".to_string(),
                accession: String::new(),
            },
        );

        for (s_name, row) in self.data.iter_mut() {
            let mb = numeric(row.get(BASES_SEQUENCED_MB), s_name, BASES_SEQUENCED_MB)?;
            row.insert(BASES_SEQUENCED, Value::Number(mb * 1e6));

            let read_count = numeric(row.get(READ_COUNT), s_name, READ_COUNT)?;
            match self.read_types.get(s_name).copied().unwrap_or(ReadType::Unknown) {
                ReadType::Single => row.insert(CLUSTER_COUNT, Value::Number(read_count)),
                ReadType::PairedEnd => row.insert(CLUSTER_COUNT, Value::Number(read_count / 2.0)),
                ReadType::Unknown => warn!(
                    "{}: read type of sample '{}' is unknown, cluster count not computed",
                    MODULE.name, s_name
                ),
            }

            row.remove(BASES_SEQUENCED_MB);
        }
        Ok(())
    }

    /// One header per collected parameter, with display hints for the well-known ones.
    pub fn headers(&self, units: &Units) -> Result<Headers> {
        let mut headers = Headers::new();
        for (key, _) in self.params.iter() {
            let description = self.params.make_description(&[key])?;
            headers.push(TableHeader::new(key, NAMESPACE, &description));
        }

        let count_hint = |headers: &mut Headers,
                          key: &str,
                          suffix: &str,
                          multiplier: f64,
                          scale: ColorScale,
                          placement: f64| {
            if let Some(h) = headers.get_mut(key) {
                h.suffix = Some(suffix.to_string());
                h.decimals = Some(2);
                h.modify = Some(multiplier);
                h.scale = Some(scale);
                h.placement = placement;
            }
        };
        count_hint(
            &mut headers,
            READ_COUNT,
            &units.read_count_prefix,
            units.read_count_multiplier,
            ColorScale::Purples,
            10.0,
        );
        count_hint(
            &mut headers,
            CLUSTER_COUNT,
            &units.cluster_count_prefix,
            units.cluster_count_multiplier,
            ColorScale::Purples,
            20.0,
        );
        count_hint(
            &mut headers,
            BASES_SEQUENCED,
            &units.base_count_prefix,
            units.base_count_multiplier,
            ColorScale::Blues,
            30.0,
        );

        let percent_hint = |headers: &mut Headers, key: &str, scale: ColorScale, placement: f64| {
            if let Some(h) = headers.get_mut(key) {
                h.suffix = Some("%".to_string());
                h.decimals = Some(2);
                h.max = Some(100.0);
                h.scale = Some(scale);
                h.placement = placement;
            }
        };
        percent_hint(&mut headers, GC_CONTENT, ColorScale::Spectral, 40.0);
        percent_hint(&mut headers, "Q20 read %", ColorScale::Reds, 50.0);
        percent_hint(&mut headers, "Q30 base %", ColorScale::Oranges, 60.0);

        if let Some(h) = headers.get_mut("read length") {
            h.suffix = Some("bp".to_string());
            h.decimals = Some(0);
            h.scale = Some(ColorScale::Greens);
            h.placement = 70.0;
        }
        if let Some(h) = headers.get_mut("no base call %") {
            h.suffix = Some("%".to_string());
            h.decimals = Some(2);
            h.floor = Some(1.0);
            h.scale = Some(ColorScale::BuGn);
        }
        Ok(headers)
    }
}

fn numeric(value: Option<&Value>, s_name: &str, key: &str) -> Result<f64> {
    match value {
        Some(Value::Number(v)) => Ok(*v),
        Some(Value::Text(t)) => Err(anyhow!(
            "sample '{}': '{}' is not numeric ({})",
            s_name,
            key,
            t
        )),
        None => Err(anyhow!("sample '{}' has no '{}' value", s_name, key)),
    }
}

/// Parse ReadQC qcML files and add the overview table to the report.
pub fn run(
    files: &[SampleFile],
    names: &NameConfig,
    units: &Units,
    sink: &mut dyn ReportSink,
) -> Result<ModuleOutcome> {
    let mut rq = ReadQc::parse_files(files)?;
    rq.ignore(&names.ignore);
    if rq.data.is_empty() {
        return Ok(ModuleOutcome::NoData);
    }

    rq.derive_metrics()?;
    let headers = rq.headers(units)?;
    info!("{}: found {} reports", MODULE.name, rq.data.len());

    sink.write_data_file(&rq.data, "readqc")?;
    for (s_name, path) in &rq.sources {
        if rq.data.contains_key(s_name) {
            sink.add_data_source(&MODULE, s_name, path);
        }
    }
    sink.general_stats_addcols(&MODULE, &rq.data, headers.subset(&GENERAL_STATS_KEYS));

    let samples = rq.data.len();
    sink.add_section(
        &MODULE,
        Section {
            name: "Overview".to_string(),
            anchor: "readqc-all".to_string(),
            description: String::new(),
            content: SectionContent::Table(Table {
                id: "readqc-all-table".to_string(),
                namespace: NAMESPACE.to_string(),
                headers,
                rows: rq.data,
            }),
        },
    );

    Ok(ModuleOutcome::Report { samples })
}
