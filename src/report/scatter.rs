use crate::report::escape_html;
use crate::report::svg;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

#[derive(Clone, Debug, PartialEq)]
pub struct ScatterConfig {
    pub id: String,
    pub title: String,
    pub xlab: String,
    pub ylab: String,
    /// Fixed axis ranges; `None` fits the data.
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub data_labels: Vec<String>,
}

/// Sample -> (x, y).
pub type Points = BTreeMap<String, (f64, f64)>;

/// Scatter plot with one point per sample, colored by sample.
#[derive(Clone, Debug)]
pub struct ScatterPlot {
    pub config: ScatterConfig,
    pub datasets: Vec<Points>,
}

const PLOT_W: f64 = 600.0;
const PLOT_H: f64 = 420.0;

impl ScatterPlot {
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
        for (i, points) in self.datasets.iter().enumerate() {
            svg::open_dataset(out, &id, i)?;
            self.svg_points(out, points)?;
            svg::legend(out, points.keys().map(String::as_str))?;
            writeln!(out, "</div>")?;
        }
        writeln!(out, "</div>")?;
        Ok(())
    }

    fn svg_points(&self, out: &mut String, points: &Points) -> Result<()> {
        let mut frame = svg::frame(PLOT_W, PLOT_H, 60.0);
        svg::open_svg(out, PLOT_W, PLOT_H, &frame)?;

        let finite: Vec<(usize, &String, f64, f64)> = points
            .iter()
            .enumerate()
            .filter(|(_, (_, (x, y)))| x.is_finite() && y.is_finite())
            .map(|(i, (s_name, (x, y)))| (i, s_name, *x, *y))
            .collect();
        let fit = |vals: Vec<f64>| {
            let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
            let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if min.is_finite() && max > min {
                (min, max)
            } else if min.is_finite() {
                (min - 1.0, min + 1.0)
            } else {
                (0.0, 1.0)
            }
        };
        let (x_min, x_max) = self
            .config
            .x_range
            .unwrap_or_else(|| fit(finite.iter().map(|p| p.2).collect()));
        let (y_min, y_max) = self
            .config
            .y_range
            .unwrap_or_else(|| fit(finite.iter().map(|p| p.3).collect()));
        frame.x_min = x_min;
        frame.x_max = x_max;
        frame.y_min = y_min;
        frame.y_max = y_max;

        svg::draw_y_axis_ticks(out, &frame, 6)?;
        svg::draw_x_axis_ticks(out, &frame, 6)?;
        svg::draw_axis_labels(out, &frame, &self.config.xlab, &self.config.ylab)?;
        for (i, s_name, x, y) in finite {
            writeln!(
                out,
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{}\"><title>{}: ({}, {})</title></circle>",
                frame.x(x),
                frame.y(y),
                svg::color(i),
                escape_html(s_name),
                svg::fmt_tick(x),
                svg::fmt_tick(y)
            )?;
        }
        writeln!(out, "</svg>")?;
        Ok(())
    }
}
