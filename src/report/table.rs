use crate::core::model::{SampleTable, Value};
use crate::report::escape_html;
use anyhow::Result;
use std::fmt::Write as FmtWrite;

pub const DEFAULT_PLACEMENT: f64 = 1000.0;

/// Colour scales used to shade table cells.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColorScale {
    Purples,
    Blues,
    Spectral,
    Reds,
    Oranges,
    Greens,
    BuGn,
}

impl ColorScale {
    /// Bar colour drawn behind the cell value.
    pub fn color(self) -> &'static str {
        match self {
            ColorScale::Purples => "#9e9ac8",
            ColorScale::Blues => "#6baed6",
            ColorScale::Spectral => "#fdae61",
            ColorScale::Reds => "#fb6a4a",
            ColorScale::Oranges => "#fd8d3c",
            ColorScale::Greens => "#74c476",
            ColorScale::BuGn => "#66c2a4",
        }
    }
}

/// Column definition for a rendered table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableHeader {
    pub key: String,
    pub namespace: String,
    pub title: String,
    pub description: String,
    pub suffix: Option<String>,
    /// Decimal places, rendered with thousands separators.
    pub decimals: Option<usize>,
    /// Multiplier applied to numeric values before formatting.
    pub modify: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Lower bound for the top of the colour scale.
    pub floor: Option<f64>,
    pub scale: Option<ColorScale>,
    pub placement: f64,
}

impl TableHeader {
    pub fn new(key: &str, namespace: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            namespace: namespace.to_string(),
            title: key.to_string(),
            description: description.to_string(),
            suffix: None,
            decimals: None,
            modify: None,
            min: None,
            max: None,
            floor: None,
            scale: None,
            placement: DEFAULT_PLACEMENT,
        }
    }

    /// Numeric value after the modify multiplier.
    pub fn display_value(&self, v: f64) -> f64 {
        match self.modify {
            Some(m) => v * m,
            None => v,
        }
    }

    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Number(v) => {
                let v = self.display_value(*v);
                let mut s = match self.decimals {
                    Some(d) => fmt_thousands(v, d),
                    None => fmt_plain(v),
                };
                if let Some(suffix) = &self.suffix {
                    s.push_str(suffix);
                }
                s
            }
            Value::Text(t) => t.clone(),
        }
    }

    /// Scale range over the displayed values of this column.
    fn range(&self, rows: &SampleTable) -> (f64, f64) {
        let values = rows
            .values()
            .filter_map(|r| r.get(&self.key).and_then(Value::as_f64))
            .map(|v| self.display_value(v));
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in values {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let lo = self.min.unwrap_or(if lo.is_finite() { lo.min(0.0) } else { 0.0 });
        let mut hi = self.max.unwrap_or(if hi.is_finite() { hi } else { 1.0 });
        if let Some(floor) = self.floor {
            hi = hi.max(floor);
        }
        (lo, hi)
    }
}

/// Ordered set of table headers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers(Vec<TableHeader>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: TableHeader) {
        match self.get_mut(&header.key) {
            Some(h) => *h = header,
            None => self.0.push(header),
        }
    }

    pub fn get(&self, key: &str) -> Option<&TableHeader> {
        self.0.iter().find(|h| h.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TableHeader> {
        self.0.iter_mut().find(|h| h.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableHeader> {
        self.0.iter()
    }

    /// Headers for `keys`, in that order, ignoring keys without a header.
    pub fn subset(&self, keys: &[&str]) -> Headers {
        Headers(keys.iter().filter_map(|k| self.get(k).cloned()).collect())
    }

    /// Display order: by placement, then insertion order.
    pub fn ordered(&self) -> Vec<&TableHeader> {
        let mut out: Vec<&TableHeader> = self.0.iter().collect();
        out.sort_by(|a, b| a.placement.total_cmp(&b.placement));
        out
    }
}

/// A header/row table payload.
#[derive(Clone, Debug)]
pub struct Table {
    pub id: String,
    pub namespace: String,
    pub headers: Headers,
    pub rows: SampleTable,
}

impl Table {
    pub fn render(&self, out: &mut String) -> Result<()> {
        let headers = self.headers.ordered();
        let ranges: Vec<(f64, f64)> = headers.iter().map(|h| h.range(&self.rows)).collect();

        writeln!(
            out,
            "<table class=\"table sortable\" id=\"{}\" data-namespace=\"{}\">",
            escape_html(&self.id),
            escape_html(&self.namespace)
        )?;
        write!(out, "<tr><th>Sample Name</th>")?;
        for h in &headers {
            write!(
                out,
                "<th title=\"{}: {}\">{}</th>",
                escape_html(&h.namespace),
                escape_html(&h.description),
                escape_html(&h.title)
            )?;
        }
        writeln!(out, "</tr>")?;
        for (s_name, row) in &self.rows {
            write!(out, "<tr><td>{}</td>", escape_html(s_name))?;
            for (h, (lo, hi)) in headers.iter().zip(&ranges) {
                match row.get(&h.key) {
                    Some(value) => {
                        let text = escape_html(&h.format_value(value));
                        match (h.scale, value.as_f64()) {
                            (Some(scale), Some(v)) => {
                                let pct = bar_percent(h.display_value(v), *lo, *hi);
                                write!(
                                    out,
                                    "<td style=\"background:linear-gradient(90deg,{} {:.1}%,transparent {:.1}%);\">{}</td>",
                                    scale.color(),
                                    pct,
                                    pct,
                                    text
                                )?;
                            }
                            _ => write!(out, "<td>{}</td>", text)?,
                        }
                    }
                    None => write!(out, "<td></td>")?,
                }
            }
            writeln!(out, "</tr>")?;
        }
        writeln!(out, "</table>")?;
        Ok(())
    }
}

fn bar_percent(v: f64, lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    if span <= 0.0 || !v.is_finite() {
        return 0.0;
    }
    ((v - lo) / span * 100.0).clamp(0.0, 100.0)
}

/// Fixed decimals with `,` thousands separators.
pub fn fmt_thousands(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let s = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match s.find('.') {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s.as_str(), ""),
    };
    let len = int_part.len();
    let mut out = String::with_capacity(s.len() + len / 3 + 1);
    if v < 0.0 && s.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push_str(frac_part);
    out
}

fn fmt_plain(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
