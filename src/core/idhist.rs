//! BBMap identity histograms (`idhist=` output).

use crate::core::model::{Row, Value};
use crate::report::linegraph::{DataLabel, LinePlot, PlotConfig, PlotOverrides, Series};
use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, HashMap};

pub const COLUMN_HEADER: &str = "#Identity\tReads\tBases";

/// Parsed histogram of one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdHist {
    /// `#Key\tvalue` lines preceding the table (Mean_reads, Median_bases, ...).
    pub summary: Row,
    /// Percent identity and the count columns that follow it (reads, bases).
    pub data: Vec<(f64, Vec<f64>)>,
}

pub fn parse(contents: &str) -> Result<IdHist> {
    let mut hist = IdHist::default();
    let mut in_table = false;

    for (i, line) in contents.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if line.starts_with("#Identity") {
                in_table = true;
            } else if !in_table
                && let Some((key, value)) = rest.split_once('\t')
            {
                hist.summary.insert(key.trim(), Value::parse(value));
            }
            continue;
        }
        if !in_table {
            bail!("line {}: data row before the #Identity header", i + 1);
        }
        let mut fields = line.split('\t');
        let x = fields
            .next()
            .unwrap_or("")
            .trim()
            .parse::<f64>()
            .with_context(|| format!("line {}: invalid identity value", i + 1))?;
        if !x.is_finite() {
            bail!("line {}: identity value is not finite", i + 1);
        }
        let counts = fields
            .map(|f| f.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("line {}: invalid count", i + 1))?;
        if counts.iter().any(|c| !c.is_finite()) {
            bail!("line {}: count is not finite", i + 1);
        }
        if counts.len() < 2 {
            bail!(
                "line {}: expected reads and bases columns, found {}",
                i + 1,
                counts.len()
            );
        }
        hist.data.push((x, counts));
    }
    Ok(hist)
}

const SERIES: [(&str, usize, &str); 2] = [("Reads", 0, "Count"), ("Bases", 1, "Count")];

fn x_key(x: f64) -> u64 {
    // folds -0.0 into 0.0
    (x + 0.0).to_bits()
}

/// Reshape histograms into a Reads and a Bases dataset over the union of all
/// x values, filling absent points with zero.
pub fn plot_idhist(
    samples: &BTreeMap<String, IdHist>,
    file_type: &str,
    plot_title: &str,
    overrides: PlotOverrides,
) -> Result<LinePlot> {
    let mut all_x: Vec<f64> = samples
        .values()
        .flat_map(|h| h.data.iter().map(|(x, _)| *x))
        .collect();
    all_x.sort_by(f64::total_cmp);
    all_x.dedup_by(|a, b| x_key(*a) == x_key(*b));

    let lookup: BTreeMap<&str, HashMap<u64, &[f64]>> = samples
        .iter()
        .map(|(s_name, h)| {
            let by_x = h
                .data
                .iter()
                .map(|(x, counts)| (x_key(*x), counts.as_slice()))
                .collect();
            (s_name.as_str(), by_x)
        })
        .collect();

    let mut datasets = Vec::with_capacity(SERIES.len());
    for (series_name, column, column_name) in SERIES {
        let mut series = Series::new();
        for (s_name, by_x) in &lookup {
            let mut points = Vec::with_capacity(all_x.len());
            for &x in &all_x {
                let y = match by_x.get(&x_key(x)) {
                    Some(counts) => *counts.get(column).with_context(|| {
                        format!(
                            "{}: no {} column at identity {} for sample {}",
                            file_type, series_name, x, s_name
                        )
                    })?,
                    None => 0.0,
                };
                points.push((x, y));
            }
            series.insert(format!("{}.{}", s_name, column_name), points);
        }
        datasets.push(series);
    }

    let config = PlotConfig {
        id: format!("bbmap-{}_plot", file_type),
        title: format!("BBTools: {}", plot_title),
        xlab: "Percent identity".to_string(),
        ylab: "Read count".to_string(),
        data_labels: vec![
            DataLabel {
                name: "Reads".to_string(),
                ylab: "Read count".to_string(),
            },
            DataLabel {
                name: "Bases".to_string(),
                ylab: "Number of bases".to_string(),
            },
        ],
    }
    .merge(overrides);

    Ok(LinePlot { config, datasets })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const IDHIST: &str = "#Mean_reads\t98.712\n\
#Mean_bases\t98.894\n\
#Median_reads\t100\n\
#Median_bases\t100\n\
#Mode_reads\t100\n\
#Mode_bases\t100\n\
#STDev_reads\t2.934\n\
#STDev_bases\t2.577\n\
#Identity\tReads\tBases\n\
100.0\t7000\t1050000\n\
99.5\t300\t45000\n\
95.0\t25\t3750\n";

    fn hist(rows: &[(f64, f64, f64)]) -> IdHist {
        IdHist {
            summary: Row::new(),
            data: rows.iter().map(|&(x, r, b)| (x, vec![r, b])).collect(),
        }
    }

    #[test]
    fn parses_summary_and_rows() {
        let h = parse(IDHIST).unwrap();
        assert_eq!(h.summary.get("Mean_reads"), Some(&Value::Number(98.712)));
        assert_eq!(h.summary.len(), 8);
        assert_eq!(h.data.len(), 3);
        assert_eq!(h.data[0], (100.0, vec![7000.0, 1050000.0]));
    }

    #[test]
    fn rejects_short_rows() {
        let err = parse("#Identity\tReads\tBases\n100.0\t5\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse("#Identity\tReads\tBases\nabc\t1\t2\n").is_err());
        assert!(parse("100.0\t1\t2\n").is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = parse("#Identity\tReads\tBases\n100.0\tnan\t5\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse("#Identity\tReads\tBases\n100.0\t5\tinf\n").is_err());
        assert!(parse("#Identity\tReads\tBases\ninf\t5\t5\n").is_err());
    }

    #[test]
    fn shared_x_values_collapse() {
        let mut samples = BTreeMap::new();
        samples.insert(
            "A".to_string(),
            hist(&[(100.0, 10.0, 1500.0), (-0.0, 1.0, 150.0), (50.0, 3.0, 450.0)]),
        );
        samples.insert("B".to_string(), hist(&[(0.0, 2.0, 300.0), (100.0, 4.0, 600.0)]));

        let plot = plot_idhist(&samples, "idhist", "t", PlotOverrides::default()).unwrap();
        for series in &plot.datasets {
            for points in series.values() {
                let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
                assert_eq!(xs, vec![0.0, 50.0, 100.0]);
            }
        }
        let reads = &plot.datasets[0];
        assert_eq!(reads["A.Count"], vec![(0.0, 1.0), (50.0, 3.0), (100.0, 10.0)]);
        assert_eq!(reads["B.Count"], vec![(0.0, 2.0), (50.0, 0.0), (100.0, 4.0)]);
    }

    #[test]
    fn union_of_x_sorted_and_zero_filled() {
        let mut samples = BTreeMap::new();
        samples.insert("A".to_string(), hist(&[(100.0, 10.0, 1500.0), (98.0, 2.0, 300.0)]));
        samples.insert("B".to_string(), hist(&[(99.0, 4.0, 600.0)]));

        let plot = plot_idhist(&samples, "idhist", "Identity histogram", PlotOverrides::default())
            .unwrap();
        assert_eq!(plot.datasets.len(), 2);

        let reads = &plot.datasets[0];
        assert_eq!(
            reads["A.Count"],
            vec![(98.0, 2.0), (99.0, 0.0), (100.0, 10.0)]
        );
        assert_eq!(
            reads["B.Count"],
            vec![(98.0, 0.0), (99.0, 4.0), (100.0, 0.0)]
        );
        let bases = &plot.datasets[1];
        assert_eq!(
            bases["A.Count"],
            vec![(98.0, 300.0), (99.0, 0.0), (100.0, 1500.0)]
        );
        assert_eq!(bases["B.Count"][1], (99.0, 600.0));
    }

    #[test]
    fn plot_config_defaults_and_overrides() {
        let mut samples = BTreeMap::new();
        samples.insert("A".to_string(), hist(&[(100.0, 1.0, 1.0)]));

        let plot = plot_idhist(&samples, "idhist", "Identity histogram", PlotOverrides::default())
            .unwrap();
        assert_eq!(plot.config.id, "bbmap-idhist_plot");
        assert_eq!(plot.config.title, "BBTools: Identity histogram");
        assert_eq!(plot.config.xlab, "Percent identity");
        assert_eq!(plot.config.data_labels[1].ylab, "Number of bases");

        let plot = plot_idhist(
            &samples,
            "idhist",
            "Identity histogram",
            PlotOverrides {
                xlab: Some("Identity (%)".to_string()),
                ..PlotOverrides::default()
            },
        )
        .unwrap();
        assert_eq!(plot.config.xlab, "Identity (%)");
        assert_eq!(plot.config.title, "BBTools: Identity histogram");
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut samples = BTreeMap::new();
        samples.insert(
            "A".to_string(),
            IdHist {
                summary: Row::new(),
                data: vec![(100.0, vec![1.0])],
            },
        );
        assert!(
            plot_idhist(&samples, "idhist", "t", PlotOverrides::default()).is_err()
        );
    }
}
