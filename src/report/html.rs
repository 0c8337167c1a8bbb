use crate::core::config::DataFormat;
use crate::core::model::{Row, SampleTable};
use crate::report::data_file::{self, DataSource};
use crate::report::table::{Headers, Table};
use crate::report::{ModuleInfo, ReportSink, Section, SectionContent, escape_html};
use anyhow::{Context, Result};
use log::debug;
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Report sink that renders a single HTML page and writes data files alongside it.
pub struct HtmlReport {
    title: Option<String>,
    data_dir: PathBuf,
    data_format: DataFormat,
    modules: Vec<(ModuleInfo, Vec<Section>)>,
    general: Vec<(ModuleInfo, SampleTable, Headers)>,
    sources: Vec<DataSource>,
}

impl HtmlReport {
    pub fn new(data_dir: PathBuf, data_format: DataFormat, title: Option<String>) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        Ok(Self {
            title,
            data_dir,
            data_format,
            modules: Vec::new(),
            general: Vec::new(),
            sources: Vec::new(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.general.is_empty()
    }

    /// Merge the general statistics of all modules into one table.
    ///
    /// Column keys are prefixed with the module anchor so modules never collide.
    pub fn general_stats(&self) -> Table {
        let mut headers = Headers::new();
        let mut rows = SampleTable::new();
        for (i, (module, data, module_headers)) in self.general.iter().enumerate() {
            for h in module_headers.iter() {
                let mut h = h.clone();
                h.key = format!("{}-{}", module.anchor, h.key);
                h.placement += (i as f64) * 10_000.0;
                headers.push(h);
            }
            for (s_name, row) in data {
                let merged = rows.entry(s_name.clone()).or_insert_with(Row::new);
                for h in module_headers.iter() {
                    if let Some(v) = row.get(&h.key) {
                        merged.insert(format!("{}-{}", module.anchor, h.key), v.clone());
                    }
                }
            }
        }
        Table {
            id: "general_stats_table".to_string(),
            namespace: "General Statistics".to_string(),
            headers,
            rows,
        }
    }

    /// Write the general statistics and source listing data files.
    pub fn write_summary_data(&mut self) -> Result<()> {
        let general = self.general_stats();
        if !general.rows.is_empty() {
            self.write_data_file(&general.rows, "general_stats")?;
        }
        let path = data_file::write_sources(&self.data_dir, &self.sources, self.data_format)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let html = self.render()?;
        let mut w = BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        w.write_all(html.as_bytes())?;
        w.flush()?;
        Ok(())
    }

    pub fn render(&self) -> Result<String> {
        let mut html = String::with_capacity(256 * 1024);
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let title = self.title.as_deref().unwrap_or("QC report");

        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, "<html lang=\"en\">")?;
        writeln!(html, "<head>")?;
        writeln!(html, "<meta charset=\"utf-8\"/>")?;
        writeln!(
            html,
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>"
        )?;
        writeln!(html, "<title>{}</title>", escape_html(title))?;
        writeln!(html, "<style>")?;
        writeln!(
            html,
            "body{{font-family:Arial,Helvetica,sans-serif;margin:20px;color:#222;background:#fff;}}"
        )?;
        writeln!(html, "h1{{margin:0 0 8px 0;font-size:24px;}}")?;
        writeln!(html, "h2{{margin:28px 0 8px 0;font-size:20px;}}")?;
        writeln!(html, "h3{{margin:18px 0 6px 0;font-size:16px;}}")?;
        writeln!(
            html,
            ".meta{{color:#555;font-size:13px;margin-bottom:16px;}}"
        )?;
        writeln!(
            html,
            ".module{{border-top:1px solid #eee;padding-top:8px;}}"
        )?;
        writeln!(html, ".plot{{margin:8px 0 6px 0;}}")?;
        writeln!(html, ".plot-title{{font-weight:bold;margin:4px 0;}}")?;
        writeln!(html, ".switch button{{margin:0 4px 6px 0;}}")?;
        writeln!(
            html,
            ".desc{{color:#444;font-size:13px;max-width:1000px;margin:4px 0 10px 0;}}"
        )?;
        writeln!(
            html,
            ".table{{border-collapse:collapse;width:100%;max-width:1200px;font-size:12px;}}"
        )?;
        writeln!(
            html,
            ".table th,.table td{{border:1px solid #ddd;padding:4px 6px;text-align:right;}}"
        )?;
        writeln!(
            html,
            ".table th:first-child,.table td:first-child{{text-align:left;}}"
        )?;
        writeln!(html, "svg{{background:#fafafa;border:1px solid #e5e5e5;}}")?;
        writeln!(html, "</style>")?;
        writeln!(html, "</head>")?;
        writeln!(html, "<body>")?;

        writeln!(html, "<h1>{}</h1>", escape_html(title))?;
        writeln!(
            html,
            "<div class=\"meta\">Generated: {} (unix: {})<br/>Samples: {}</div>",
            fmt_timestamp(ts),
            ts,
            self.sample_count()
        )?;

        if !self.modules.is_empty() {
            write!(html, "<div class=\"meta\">Modules:")?;
            for (module, _) in &self.modules {
                write!(
                    html,
                    " <a href=\"#{}\">{}</a>",
                    escape_html(module.anchor),
                    escape_html(module.name)
                )?;
            }
            writeln!(html, "</div>")?;
        }

        let general = self.general_stats();
        if !general.headers.is_empty() {
            writeln!(html, "<h2 id=\"general_stats\">General Statistics</h2>")?;
            general.render(&mut html)?;
        }

        for (module, sections) in &self.modules {
            writeln!(
                html,
                "<div class=\"module\" id=\"{}\">",
                escape_html(module.anchor)
            )?;
            writeln!(html, "<h2>{}</h2>", escape_html(module.name))?;
            writeln!(
                html,
                "<div class=\"desc\"><a href=\"{}\">{}</a> {}</div>",
                escape_html(module.href),
                escape_html(module.name),
                escape_html(module.info)
            )?;
            for section in sections {
                writeln!(
                    html,
                    "<h3 id=\"{}\">{}</h3>",
                    escape_html(&section.anchor),
                    escape_html(&section.name)
                )?;
                if !section.description.is_empty() {
                    writeln!(
                        html,
                        "<div class=\"desc\">{}</div>",
                        escape_html(&section.description)
                    )?;
                }
                match &section.content {
                    SectionContent::Table(table) => table.render(&mut html)?,
                    SectionContent::LinePlot(plot) => plot.render(&mut html)?,
                    SectionContent::BarPlot(plot) => plot.render(&mut html)?,
                    SectionContent::ScatterPlot(plot) => plot.render(&mut html)?,
                }
            }
            writeln!(html, "</div>")?;
        }

        html.push_str("<script>");
        html.push_str(r#"document.querySelectorAll('table.sortable').forEach(t=>{const h=t.querySelectorAll('th');h.forEach((th,i)=>{th.style.cursor='pointer';th.addEventListener('click',()=>{const rows=[...t.querySelectorAll('tr')].slice(1);const asc=th.getAttribute('data-asc')!=='true';rows.sort((a,b)=>{const av=a.children[i].innerText.replace(/,/g,'');const bv=b.children[i].innerText.replace(/,/g,'');const an=parseFloat(av);const bn=parseFloat(bv);if(!isNaN(an)&&!isNaN(bn)){return asc?an-bn:bn-an;}return asc?av.localeCompare(bv):bv.localeCompare(av);});th.setAttribute('data-asc',asc);rows.forEach(r=>t.appendChild(r));});});});"#);
        html.push_str(r#"function showDataset(id,idx){document.querySelectorAll('.dataset[data-plot="'+id+'"]').forEach(d=>{d.style.display=(d.getAttribute('data-index')==String(idx))?'':'none';});}"#);
        html.push_str("</script>\n");
        writeln!(html, "</body></html>")?;
        Ok(html)
    }

    fn sample_count(&self) -> usize {
        let mut names: Vec<&str> = self.sources.iter().map(|s| s.sample.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

impl ReportSink for HtmlReport {
    fn add_section(&mut self, module: &ModuleInfo, section: Section) {
        match self.modules.iter_mut().find(|(m, _)| m.anchor == module.anchor) {
            Some((_, sections)) => sections.push(section),
            None => self.modules.push((*module, vec![section])),
        }
    }

    fn general_stats_addcols(&mut self, module: &ModuleInfo, data: &SampleTable, headers: Headers) {
        self.general.push((*module, data.clone(), headers));
    }

    fn write_data_file(&mut self, data: &SampleTable, name: &str) -> Result<()> {
        let path = data_file::write(&self.data_dir, name, data, self.data_format)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    fn add_data_source(&mut self, module: &ModuleInfo, s_name: &str, path: &Path) {
        self.sources.push(DataSource {
            module: module.name.to_string(),
            sample: s_name.to_string(),
            path: path.to_path_buf(),
        });
    }
}

fn fmt_timestamp(ts: u64) -> String {
    let days = (ts / 86_400) as i64;
    let secs = (ts % 86_400) as u32;
    let hour = secs / 3_600;
    let min = (secs % 3_600) / 60;
    let sec = secs % 60;

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    let year = y + if m <= 2 { 1 } else { 0 };

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year, m, d, hour, min, sec
    )
}
