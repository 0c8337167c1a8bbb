pub mod bargraph;
pub mod data_file;
pub mod html;
pub mod linegraph;
pub mod scatter;
pub mod svg;
pub mod table;
pub mod zip;

use crate::core::model::SampleTable;
use anyhow::Result;
use bargraph::BarPlot;
use linegraph::LinePlot;
use scatter::ScatterPlot;
use table::{Headers, Table};

/// Report section produced by a module.
#[derive(Debug)]
pub struct Section {
    pub name: String,
    pub anchor: String,
    pub description: String,
    pub content: SectionContent,
}

#[derive(Debug)]
pub enum SectionContent {
    Table(Table),
    LinePlot(LinePlot),
    BarPlot(BarPlot),
    ScatterPlot(ScatterPlot),
}

/// Identity of a report module, shown as the heading of its sections.
#[derive(Clone, Copy, Debug)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub anchor: &'static str,
    pub href: &'static str,
    pub info: &'static str,
}

/// Destination for everything a module produces.
pub trait ReportSink {
    fn add_section(&mut self, module: &ModuleInfo, section: Section);

    /// Add columns to the general statistics table shown at the top of the report.
    fn general_stats_addcols(&mut self, module: &ModuleInfo, data: &SampleTable, headers: Headers);

    /// Dump a per-sample table for downstream tools.
    fn write_data_file(&mut self, data: &SampleTable, name: &str) -> Result<()>;

    /// Record which file a sample came from.
    fn add_data_source(&mut self, module: &ModuleInfo, s_name: &str, path: &std::path::Path);
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
