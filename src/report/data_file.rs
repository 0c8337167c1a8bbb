use crate::core::config::DataFormat;
use crate::core::model::SampleTable;
use anyhow::{Context, Result};
use indexmap::IndexSet;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a sample's data was read from.
#[derive(Clone, Debug, Serialize)]
pub struct DataSource {
    pub module: String,
    pub sample: String,
    pub path: PathBuf,
}

/// Write one per-sample table as `<dir>/<name>.<ext>`.
pub fn write(dir: &Path, name: &str, data: &SampleTable, format: DataFormat) -> Result<PathBuf> {
    let path = dir.join(format!("{}.{}", name, format.extension()));
    let mut w = BufWriter::new(
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?,
    );
    match format {
        DataFormat::Tsv => write_tsv(&mut w, data)?,
        DataFormat::Json => {
            serde_json::to_writer_pretty(&mut w, data)
                .with_context(|| format!("failed to serialize {}", name))?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(path)
}

fn tsv_writer(w: &mut dyn Write) -> csv::Writer<&mut dyn Write> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(false)
        .from_writer(w)
}

/// Tab separated table: one row per sample, columns in first-seen order.
/// Fields holding a tab, quote or newline are quoted.
pub fn write_tsv(w: &mut dyn Write, data: &SampleTable) -> Result<()> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for row in data.values() {
        columns.extend(row.iter().map(|(k, _)| k));
    }

    let mut wtr = tsv_writer(w);
    wtr.write_record(std::iter::once("Sample").chain(columns.iter().copied()))?;
    for (s_name, row) in data {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(s_name.clone());
        for c in &columns {
            record.push(row.get(c).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_sources(dir: &Path, sources: &[DataSource], format: DataFormat) -> Result<PathBuf> {
    let path = dir.join(format!("sources.{}", format.extension()));
    let mut w = BufWriter::new(
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?,
    );
    match format {
        DataFormat::Tsv => {
            let mut wtr = tsv_writer(&mut w);
            wtr.write_record(["Module", "Sample Name", "Source"])?;
            for s in sources {
                let path = s.path.display().to_string();
                wtr.write_record([s.module.as_str(), s.sample.as_str(), path.as_str()])?;
            }
            wtr.flush()?;
        }
        DataFormat::Json => {
            serde_json::to_writer_pretty(&mut w, sources).context("failed to serialize sources")?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(path)
}
