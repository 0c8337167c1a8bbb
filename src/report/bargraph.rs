use crate::report::escape_html;
use crate::report::svg;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

#[derive(Clone, Debug, PartialEq)]
pub struct BarConfig {
    pub id: String,
    pub title: String,
    pub ylab: String,
    /// Button label per dataset.
    pub data_labels: Vec<String>,
}

/// Sample -> one value per category, stacked bottom to top in category order.
pub type Bars = BTreeMap<String, Vec<f64>>;

/// Stacked bar graph with one bar per sample.
#[derive(Clone, Debug)]
pub struct BarPlot {
    pub config: BarConfig,
    pub categories: Vec<String>,
    pub datasets: Vec<Bars>,
}

const PLOT_W: f64 = 900.0;
const PLOT_H: f64 = 360.0;

impl BarPlot {
    pub fn render(&self, out: &mut String) -> Result<()> {
        let id = escape_html(&self.config.id);
        let names: Vec<String> = (0..self.datasets.len())
            .map(|i| {
                self.config
                    .data_labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Dataset {}", i + 1))
            })
            .collect();
        svg::plot_header(out, &id, &self.config.title, &names)?;
        for (i, bars) in self.datasets.iter().enumerate() {
            svg::open_dataset(out, &id, i)?;
            self.svg_bars(out, bars)?;
            svg::legend(out, self.categories.iter().map(String::as_str))?;
            writeln!(out, "</div>")?;
        }
        writeln!(out, "</div>")?;
        Ok(())
    }

    fn svg_bars(&self, out: &mut String, bars: &Bars) -> Result<()> {
        let mut frame = svg::frame(PLOT_W, PLOT_H, 60.0);
        svg::open_svg(out, PLOT_W, PLOT_H, &frame)?;
        if bars.is_empty() {
            writeln!(out, "</svg>")?;
            return Ok(());
        }

        let max_y = bars
            .values()
            .map(|v| v.iter().filter(|y| y.is_finite()).sum::<f64>())
            .fold(0.0, f64::max);
        frame.y_max = if max_y > 0.0 { max_y } else { 1.0 };
        svg::draw_y_axis_ticks(out, &frame, 5)?;
        svg::draw_axis_labels(out, &frame, "", &self.config.ylab)?;

        let slot = frame.plot_w / bars.len() as f64;
        let bar_w = (slot * 0.7).max(1.0);
        for (i, (s_name, values)) in bars.iter().enumerate() {
            let x = frame.left + i as f64 * slot + (slot - bar_w) / 2.0;
            let mut base = 0.0;
            for (c, v) in values.iter().enumerate() {
                if !v.is_finite() || *v <= 0.0 {
                    continue;
                }
                let y0 = frame.y(base + v);
                let height = frame.y(base) - y0;
                writeln!(
                    out,
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"><title>{}: {} {}</title></rect>",
                    x,
                    y0,
                    bar_w,
                    height,
                    svg::color(c),
                    escape_html(s_name),
                    escape_html(self.categories.get(c).map(String::as_str).unwrap_or("")),
                    svg::fmt_tick(*v)
                )?;
                base += v;
            }
            writeln!(
                out,
                "<text x=\"{:.2}\" y=\"{}\" font-size=\"10\" fill=\"#666\" text-anchor=\"middle\" dominant-baseline=\"hanging\">{}</text>",
                x + bar_w / 2.0,
                frame.top + frame.plot_h + 4.0,
                escape_html(s_name)
            )?;
        }
        writeln!(out, "</svg>")?;
        Ok(())
    }
}
