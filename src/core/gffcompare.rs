//! GffCompare report module: accuracy of a query annotation against a reference.

use crate::core::config::NameConfig;
use crate::core::discovery::{SampleFile, SearchPattern, ignore_samples};
use crate::core::model::{ModuleOutcome, Row, SampleTable, Value};
use crate::report::bargraph::{BarConfig, BarPlot, Bars};
use crate::report::scatter::{Points, ScatterConfig, ScatterPlot};
use crate::report::{ModuleInfo, ReportSink, Section, SectionContent};
use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

pub const MODULE: ModuleInfo = ModuleInfo {
    name: "GffCompare",
    anchor: "gffcompare",
    href: "https://ccb.jhu.edu/software/stringtie/gffcompare.shtml",
    info: "is a tool to compare, merge and annotate one or more GFF files with a reference annotation in GFF format.",
};

pub const SUMMARY_MARKER: &str = "#= Summary for dataset:";

pub const PATTERN: SearchPattern = SearchPattern {
    module: "gffcompare",
    fn_suffix: None,
    contents: Some(SUMMARY_MARKER),
};

/// Comparison level of the sensitivity/precision table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Base,
    Exon,
    Intron,
    IntronChain,
    Transcript,
    Locus,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Base,
        Level::Exon,
        Level::Intron,
        Level::IntronChain,
        Level::Transcript,
        Level::Locus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Level::Base => "Base",
            Level::Exon => "Exon",
            Level::Intron => "Intron",
            Level::IntronChain => "Intron_chain",
            Level::Transcript => "Transcript",
            Level::Locus => "Locus",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Base => "Base level:",
            Level::Exon => "Exon level:",
            Level::Intron => "Intron level:",
            Level::IntronChain => "Intron chain level:",
            Level::Transcript => "Transcript level:",
            Level::Locus => "Locus level:",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counts {
    pub mrna: u64,
    pub loci: u64,
    pub multi_exon: u64,
}

/// `count/total` as printed for missed and novel elements.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Fraction {
    pub count: u64,
    pub total: u64,
}

impl Fraction {
    /// Elements of the total that are not in `count`.
    pub fn rest(self) -> u64 {
        self.total.saturating_sub(self.count)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Elements {
    pub exons: Fraction,
    pub introns: Fraction,
    pub loci: Fraction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accuracy {
    pub sensitivity: f64,
    pub precision: f64,
}

/// First dataset summary of a gffcompare `.stats` file.
#[derive(Clone, Debug, PartialEq)]
pub struct GffStats {
    pub query: Counts,
    pub multi_transcript_loci: u64,
    pub reference: Counts,
    pub super_loci: u64,
    /// Levels printed as `-` (nothing to compare) are absent.
    pub accuracy: BTreeMap<Level, Accuracy>,
    pub matching_intron_chains: u64,
    pub matching_transcripts: u64,
    pub matching_loci: u64,
    pub missed: Elements,
    pub novel: Elements,
}

#[derive(Default)]
struct Partial {
    query: Option<Counts>,
    multi_transcript_loci: Option<u64>,
    reference: Option<Counts>,
    super_loci: Option<u64>,
    levels: Vec<Level>,
    accuracy: BTreeMap<Level, Accuracy>,
    matching_intron_chains: Option<u64>,
    matching_transcripts: Option<u64>,
    matching_loci: Option<u64>,
    missed: [Option<Fraction>; 3],
    novel: [Option<Fraction>; 3],
}

const ELEMENTS: [&str; 3] = ["exons", "introns", "loci"];

/// Unsigned integer tokens of `s`, in order.
fn ints(s: &str) -> Vec<u64> {
    s.split_whitespace()
        .filter(|t| t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .collect()
}

fn first_int(s: &str, what: &str) -> Result<u64> {
    ints(s)
        .first()
        .copied()
        .ok_or_else(|| anyhow!("no {} count", what))
}

fn counts(s: &str, what: &str) -> Result<Counts> {
    match ints(&s.replace('(', " "))[..] {
        [mrna, loci, multi_exon, ..] => Ok(Counts {
            mrna,
            loci,
            multi_exon,
        }),
        _ => bail!("expected mRNA, loci and multi-exon counts for {}", what),
    }
}

fn fraction(s: &str) -> Result<Fraction> {
    match ints(&s.replace('/', " "))[..] {
        [count, total, ..] => Ok(Fraction { count, total }),
        _ => bail!("expected 'count/total'"),
    }
}

fn percent(tok: Option<&str>, what: &str) -> Result<Option<f64>> {
    match tok {
        None => bail!("missing {}", what),
        Some("-") => Ok(None),
        Some(t) => {
            let v: f64 = t
                .parse()
                .with_context(|| format!("invalid {} '{}'", what, t))?;
            if !v.is_finite() {
                bail!("{} is not finite", what);
            }
            Ok(Some(v))
        }
    }
}

/// Parse the first summary block of a gffcompare stats file. Lines are
/// recognised by their label, not their position.
pub fn parse(text: &str) -> Result<GffStats> {
    let mut p = Partial::default();
    let mut in_summary = false;
    for (i, raw) in text.lines().enumerate() {
        if raw.starts_with(SUMMARY_MARKER) {
            if in_summary {
                break;
            }
            in_summary = true;
            continue;
        }
        if !in_summary {
            continue;
        }
        let line = raw.trim_start_matches('#').trim();
        p.line(line).with_context(|| format!("line {}", i + 1))?;
    }
    if !in_summary {
        bail!("no '{}' block", SUMMARY_MARKER);
    }
    p.finish()
}

impl Partial {
    fn line(&mut self, line: &str) -> Result<()> {
        if let Some(rest) = line.strip_prefix("Query mRNAs") {
            self.query = Some(counts(rest, "query")?);
        } else if let Some(rest) = line.strip_prefix("Reference mRNAs") {
            self.reference = Some(counts(rest, "reference")?);
        } else if line.contains("multi-transcript loci") {
            self.multi_transcript_loci = Some(first_int(&line.replace('(', " "), "multi-transcript loci")?);
        } else if let Some(rest) = line.strip_prefix("Super-loci w/ reference transcripts:") {
            self.super_loci = Some(first_int(rest, "super-loci")?);
        } else if let Some(rest) = line.strip_prefix("Matching intron chains:") {
            self.matching_intron_chains = Some(first_int(rest, "matching intron chains")?);
        } else if let Some(rest) = line.strip_prefix("Matching transcripts:") {
            self.matching_transcripts = Some(first_int(rest, "matching transcripts")?);
        } else if let Some(rest) = line.strip_prefix("Matching loci:") {
            self.matching_loci = Some(first_int(rest, "matching loci")?);
        } else if let Some(level) = Level::ALL.into_iter().find(|l| line.starts_with(l.label())) {
            let rest = line[level.label().len()..].replace('|', " ");
            let mut toks = rest.split_whitespace();
            let sensitivity = percent(toks.next(), "sensitivity")?;
            let precision = percent(toks.next(), "precision")?;
            self.levels.push(level);
            if let (Some(sensitivity), Some(precision)) = (sensitivity, precision) {
                self.accuracy.insert(
                    level,
                    Accuracy {
                        sensitivity,
                        precision,
                    },
                );
            }
        } else {
            for (k, element) in ELEMENTS.iter().enumerate() {
                if let Some(rest) = line.strip_prefix(&format!("Missed {}:", element)) {
                    self.missed[k] = Some(fraction(rest)?);
                } else if let Some(rest) = line.strip_prefix(&format!("Novel {}:", element)) {
                    self.novel[k] = Some(fraction(rest)?);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<GffStats> {
        fn need<T>(v: Option<T>, label: &str) -> Result<T> {
            v.ok_or_else(|| anyhow!("missing '{}' line", label))
        }
        for level in Level::ALL {
            if !self.levels.contains(&level) {
                bail!("missing '{}' line", level.label());
            }
        }
        let elements = |v: [Option<Fraction>; 3], kind: &str| -> Result<Elements> {
            let [exons, introns, loci] = v;
            Ok(Elements {
                exons: need(exons, &format!("{} exons", kind))?,
                introns: need(introns, &format!("{} introns", kind))?,
                loci: need(loci, &format!("{} loci", kind))?,
            })
        };
        Ok(GffStats {
            query: need(self.query, "Query mRNAs")?,
            multi_transcript_loci: self.multi_transcript_loci.unwrap_or(0),
            reference: need(self.reference, "Reference mRNAs")?,
            super_loci: need(self.super_loci, "Super-loci w/ reference transcripts")?,
            accuracy: self.accuracy,
            matching_intron_chains: need(self.matching_intron_chains, "Matching intron chains")?,
            matching_transcripts: need(self.matching_transcripts, "Matching transcripts")?,
            matching_loci: need(self.matching_loci, "Matching loci")?,
            missed: elements(self.missed, "Missed")?,
            novel: elements(self.novel, "Novel")?,
        })
    }
}

impl GffStats {
    /// Flat row for the data file.
    pub fn to_row(&self) -> Row {
        let n = |v: u64| Value::Number(v as f64);
        let mut row = Row::new();
        row.insert("query_mRNA", n(self.query.mrna));
        row.insert("query_loci", n(self.query.loci));
        row.insert("query_multi_exon_transcripts", n(self.query.multi_exon));
        row.insert("query_multi_transcript_loci", n(self.multi_transcript_loci));
        row.insert("reference_mRNA", n(self.reference.mrna));
        row.insert("reference_loci", n(self.reference.loci));
        row.insert("reference_multi_exon_transcripts", n(self.reference.multi_exon));
        row.insert("super_loci", n(self.super_loci));
        for (level, acc) in &self.accuracy {
            row.insert(format!("{}_sensitivity", level.name()), Value::Number(acc.sensitivity));
            row.insert(format!("{}_precision", level.name()), Value::Number(acc.precision));
        }
        row.insert("matching_intron_chains", n(self.matching_intron_chains));
        row.insert("matching_transcripts", n(self.matching_transcripts));
        row.insert("matching_loci", n(self.matching_loci));
        for (kind, el) in [("missed", &self.missed), ("novel", &self.novel)] {
            for (element, f) in ELEMENTS.iter().zip([el.exons, el.introns, el.loci]) {
                row.insert(format!("{}_{}", kind, element), n(f.count));
                row.insert(format!("{}_{}_total", kind, element), n(f.total));
            }
        }
        row
    }
}

/// Sensitivity against precision, one dataset per level, scaled to 0..1.
pub fn plot_accuracy(samples: &BTreeMap<String, GffStats>) -> ScatterPlot {
    let datasets = Level::ALL
        .iter()
        .map(|level| {
            samples
                .iter()
                .filter_map(|(s_name, s)| {
                    s.accuracy.get(level).map(|a| {
                        (
                            s_name.clone(),
                            (a.sensitivity / 100.0, a.precision / 100.0),
                        )
                    })
                })
                .collect::<Points>()
        })
        .collect();
    ScatterPlot {
        config: ScatterConfig {
            id: "gffcompare_accuracy_plot".to_string(),
            title: "GffCompare: Accuracy values".to_string(),
            xlab: "Sensitivity".to_string(),
            ylab: "Precision".to_string(),
            x_range: Some((0.0, 1.0)),
            y_range: Some((0.0, 1.0)),
            data_labels: Level::ALL.iter().map(|l| l.name().to_string()).collect(),
        },
        datasets,
    }
}

/// Stacked `kind`/found bars for exons, introns and loci.
pub fn plot_elements<F>(samples: &BTreeMap<String, GffStats>, kind: &str, pick: F) -> BarPlot
where
    F: Fn(&GffStats) -> Elements,
{
    let labels = ["Exons", "Introns", "Loci"];
    let datasets = (0..labels.len())
        .map(|k| {
            samples
                .iter()
                .map(|(s_name, s)| {
                    let e = pick(s);
                    let f = [e.exons, e.introns, e.loci][k];
                    (s_name.clone(), vec![f.count as f64, f.rest() as f64])
                })
                .collect::<Bars>()
        })
        .collect();
    BarPlot {
        config: BarConfig {
            id: format!("gffcompare_{}_plot", kind),
            title: format!("GffCompare: {} elements", kind),
            ylab: "Count".to_string(),
            data_labels: labels.iter().map(|l| l.to_string()).collect(),
        },
        categories: vec![kind.to_string(), "found".to_string()],
        datasets,
    }
}

/// Parse gffcompare stats files and add the accuracy, novel and missed sections.
pub fn run(files: &[SampleFile], names: &NameConfig, sink: &mut dyn ReportSink) -> Result<ModuleOutcome> {
    let mut samples: BTreeMap<String, GffStats> = BTreeMap::new();
    let mut sources: BTreeMap<&str, &Path> = BTreeMap::new();
    for f in files {
        let stats = parse(&f.contents)
            .with_context(|| format!("failed to parse gffcompare stats file {}", f.path.display()))?;
        if samples.insert(f.s_name.clone(), stats).is_some() {
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

    info!("{}: found {} reports", MODULE.name, samples.len());

    let table: SampleTable = samples
        .iter()
        .map(|(s_name, s)| (s_name.clone(), s.to_row()))
        .collect();
    sink.write_data_file(&table, "gffcompare")?;

    for (s_name, path) in sources {
        if samples.contains_key(s_name) {
            sink.add_data_source(&MODULE, s_name, path);
        }
    }
    sink.add_section(
        &MODULE,
        Section {
            name: "Gffcompare comparison accuracy".to_string(),
            anchor: "gffcompare_accuracy".to_string(),
            description: "Sensitivity and precision of the query annotation at each comparison level.".to_string(),
            content: SectionContent::ScatterPlot(plot_accuracy(&samples)),
        },
    );
    sink.add_section(
        &MODULE,
        Section {
            name: "Gffcompare novel loci".to_string(),
            anchor: "gffcompare_novel".to_string(),
            description: "Query exons, introns and loci with no reference counterpart.".to_string(),
            content: SectionContent::BarPlot(plot_elements(&samples, "novel", |s| s.novel)),
        },
    );
    sink.add_section(
        &MODULE,
        Section {
            name: "Gffcompare missed loci".to_string(),
            anchor: "gffcompare_missed".to_string(),
            description: "Reference exons, introns and loci not matched by the query.".to_string(),
            content: SectionContent::BarPlot(plot_elements(&samples, "missed", |s| s.missed)),
        },
    );

    Ok(ModuleOutcome::Report {
        samples: samples.len(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::report::tests::MemorySink;
    use std::path::PathBuf;

    pub(crate) const STATS: &str = "\
# gffcompare v0.11.2 | Command line was:
#gffcompare -r ref.gtf -o cmp query.gtf
#

#= Summary for dataset: query.gtf
#     Query mRNAs :   12345 in   10000 loci  (9000 multi-exon transcripts)
#            (1234 multi-transcript loci, ~1.2 transcripts per locus)
# Reference mRNAs :   20000 in   15000 loci  (17000 multi-exon)
# Super-loci w/ reference transcripts:     9000
#-----------------| Sensitivity | Precision  |
        Base level:    80.1     |    90.2    |
        Exon level:    75.0     |    85.5    |
      Intron level:    78.3     |    92.1    |
Intron chain level:    60.2     |    70.4    |
  Transcript level:    55.0     |    60.0    |
       Locus level:    70.0     |    75.0    |

     Matching intron chains:    5000
       Matching transcripts:    6000
              Matching loci:    7000

          Missed exons:    1000/50000\t(  2.0%)
           Novel exons:    2000/45000\t(  4.4%)
        Missed introns:     500/40000\t(  1.2%)
         Novel introns:     800/38000\t(  2.1%)
           Missed loci:     300/15000\t(  2.0%)
            Novel loci:     400/10000\t(  4.0%)

 Total union super-loci across all input datasets: 12000
";

    fn file(s_name: &str, contents: &str) -> SampleFile {
        SampleFile {
            path: PathBuf::from(format!("{}.stats", s_name)),
            file_name: format!("{}.stats", s_name),
            s_name: s_name.to_string(),
            contents: contents.to_string(),
        }
    }

    #[test]
    fn parses_summary_block() {
        let s = parse(STATS).unwrap();
        assert_eq!(
            s.query,
            Counts {
                mrna: 12345,
                loci: 10000,
                multi_exon: 9000
            }
        );
        assert_eq!(s.multi_transcript_loci, 1234);
        assert_eq!(s.reference.multi_exon, 17000);
        assert_eq!(s.super_loci, 9000);
        assert_eq!(s.accuracy.len(), 6);
        assert_eq!(
            s.accuracy[&Level::IntronChain],
            Accuracy {
                sensitivity: 60.2,
                precision: 70.4
            }
        );
        assert_eq!(s.matching_loci, 7000);
        assert_eq!(s.missed.exons, Fraction { count: 1000, total: 50000 });
        assert_eq!(s.novel.loci, Fraction { count: 400, total: 10000 });
        assert_eq!(s.novel.loci.rest(), 9600);
    }

    #[test]
    fn intron_level_is_not_confused_with_intron_chain() {
        let s = parse(STATS).unwrap();
        assert_eq!(s.accuracy[&Level::Intron].sensitivity, 78.3);
    }

    #[test]
    fn dash_level_is_absent() {
        let text = STATS.replace(
            "Intron chain level:    60.2     |    70.4    |",
            "Intron chain level:     -       |     -      |",
        );
        let s = parse(&text).unwrap();
        assert_eq!(s.accuracy.len(), 5);
        assert!(!s.accuracy.contains_key(&Level::IntronChain));
        assert!(!s.to_row().contains_key("Intron_chain_sensitivity"));
    }

    #[test]
    fn missing_line_is_an_error() {
        let text = STATS.replace("            Novel loci:     400/10000\t(  4.0%)\n", "");
        let err = parse(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("Novel loci"));

        let err = parse("no summary here\n").unwrap_err();
        assert!(err.to_string().contains(SUMMARY_MARKER));
    }

    #[test]
    fn bad_percentage_names_the_line() {
        let text = STATS.replace("80.1", "eighty");
        let err = parse(&text).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 11"), "{}", msg);
        assert!(msg.contains("sensitivity"), "{}", msg);
    }

    #[test]
    fn only_first_dataset_is_read() {
        let second = STATS
            .replace("query.gtf", "other.gtf")
            .replace("12345 in", "1 in");
        let text = format!("{}\n{}", STATS, second);
        assert_eq!(parse(&text).unwrap().query.mrna, 12345);
    }

    #[test]
    fn found_never_underflows() {
        let f = Fraction { count: 5, total: 3 };
        assert_eq!(f.rest(), 0);
    }

    #[test]
    fn adds_three_sections_and_data_file() {
        let mut sink = MemorySink::default();
        let files = [file("S1", STATS), file("S2", STATS)];
        let outcome = run(&files, &NameConfig::default(), &mut sink).unwrap();
        assert_eq!(outcome, ModuleOutcome::Report { samples: 2 });

        let anchors: Vec<&str> = sink.sections.iter().map(|(_, s)| s.anchor.as_str()).collect();
        assert_eq!(
            anchors,
            ["gffcompare_accuracy", "gffcompare_novel", "gffcompare_missed"]
        );
        match &sink.sections[0].1.content {
            SectionContent::ScatterPlot(plot) => {
                assert_eq!(plot.datasets.len(), 6);
                let (x, y) = plot.datasets[0]["S1"];
                assert!((x - 0.801).abs() < 1e-9 && (y - 0.902).abs() < 1e-9);
            }
            other => panic!("unexpected section {:?}", other),
        }
        match &sink.sections[2].1.content {
            SectionContent::BarPlot(plot) => {
                assert_eq!(plot.categories, ["missed", "found"]);
                assert_eq!(plot.datasets[0]["S2"], vec![1000.0, 49000.0]);
            }
            other => panic!("unexpected section {:?}", other),
        }

        let (name, table) = &sink.data_files[0];
        assert_eq!(name, "gffcompare");
        assert_eq!(table["S1"].get("novel_loci_total"), Some(&Value::Number(10000.0)));
        assert_eq!(sink.sources.len(), 2);
    }

    #[test]
    fn no_files_or_all_ignored_is_no_data() {
        let mut sink = MemorySink::default();
        assert_eq!(
            run(&[], &NameConfig::default(), &mut sink).unwrap(),
            ModuleOutcome::NoData
        );
        let names = NameConfig {
            ignore: vec![glob::Pattern::new("S1").unwrap()],
            ..NameConfig::default()
        };
        assert_eq!(
            run(&[file("S1", STATS)], &names, &mut sink).unwrap(),
            ModuleOutcome::NoData
        );
        assert!(sink.sections.is_empty());
        assert!(sink.data_files.is_empty());
    }
}
