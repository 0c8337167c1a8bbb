use crate::report::escape_html;
use crate::report::svg::{self, Frame};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

/// One selectable dataset of a multi-dataset line plot.
#[derive(Clone, Debug, PartialEq)]
pub struct DataLabel {
    pub name: String,
    pub ylab: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlotConfig {
    pub id: String,
    pub title: String,
    pub xlab: String,
    pub ylab: String,
    pub data_labels: Vec<DataLabel>,
}

/// Caller-supplied plot settings; set fields replace the defaults.
#[derive(Clone, Debug, Default)]
pub struct PlotOverrides {
    pub id: Option<String>,
    pub title: Option<String>,
    pub xlab: Option<String>,
    pub ylab: Option<String>,
    pub data_labels: Option<Vec<DataLabel>>,
}

impl PlotConfig {
    pub fn merge(mut self, overrides: PlotOverrides) -> PlotConfig {
        if let Some(id) = overrides.id {
            self.id = id;
        }
        if let Some(title) = overrides.title {
            self.title = title;
        }
        if let Some(xlab) = overrides.xlab {
            self.xlab = xlab;
        }
        if let Some(ylab) = overrides.ylab {
            self.ylab = ylab;
        }
        if let Some(labels) = overrides.data_labels {
            self.data_labels = labels;
        }
        self
    }
}

/// Line name -> points in ascending x.
pub type Series = BTreeMap<String, Vec<(f64, f64)>>;

#[derive(Clone, Debug)]
pub struct LinePlot {
    pub config: PlotConfig,
    pub datasets: Vec<Series>,
}

const PLOT_W: f64 = 900.0;
const PLOT_H: f64 = 360.0;

impl LinePlot {
    pub fn render(&self, out: &mut String) -> Result<()> {
        let id = escape_html(&self.config.id);
        let names: Vec<String> = (0..self.datasets.len())
            .map(|i| self.dataset_name(i))
            .collect();
        svg::plot_header(out, &id, &self.config.title, &names)?;
        for (i, series) in self.datasets.iter().enumerate() {
            let ylab = self
                .config
                .data_labels
                .get(i)
                .map(|l| l.ylab.as_str())
                .unwrap_or(self.config.ylab.as_str());
            svg::open_dataset(out, &id, i)?;
            svg_lines(out, series, &self.config.xlab, ylab)?;
            svg::legend(out, series.keys().map(String::as_str))?;
            writeln!(out, "</div>")?;
        }
        writeln!(out, "</div>")?;
        Ok(())
    }

    fn dataset_name(&self, i: usize) -> String {
        self.config
            .data_labels
            .get(i)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("Dataset {}", i + 1))
    }
}

fn svg_lines(out: &mut String, series: &Series, x_label: &str, y_label: &str) -> Result<()> {
    let mut frame = svg::frame(PLOT_W, PLOT_H, 60.0);
    svg::open_svg(out, PLOT_W, PLOT_H, &frame)?;

    let points = || series.values().flat_map(|p| p.iter());
    let x_min = points().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_max = points().map(|p| p.1).fold(0.0, f64::max);
    if !x_min.is_finite() || !x_max.is_finite() {
        writeln!(out, "</svg>")?;
        return Ok(());
    }
    frame.x_min = x_min;
    frame.x_max = x_max;
    frame.y_max = if y_max > 0.0 { y_max } else { 1.0 };

    svg::draw_y_axis_ticks(out, &frame, 5)?;
    svg::draw_x_axis_ticks(out, &frame, 6)?;
    svg::draw_axis_labels(out, &frame, x_label, y_label)?;
    for (i, data) in series.values().enumerate() {
        svg_line(out, data, &frame, svg::color(i))?;
    }
    writeln!(out, "</svg>")?;
    Ok(())
}

fn svg_line(out: &mut String, data: &[(f64, f64)], f: &Frame, color: &str) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let mut path = String::new();
    for (i, (xv, yv)) in data.iter().enumerate() {
        let x = f.x(*xv);
        let y = f.y(*yv);
        if i == 0 {
            write!(path, "M {:.2} {:.2}", x, y)?;
        } else {
            write!(path, " L {:.2} {:.2}", x, y)?;
        }
    }
    writeln!(
        out,
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>",
        path, color
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlotConfig {
        PlotConfig {
            id: "p".to_string(),
            title: "T".to_string(),
            xlab: "x".to_string(),
            ylab: "y".to_string(),
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
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let merged = config().merge(PlotOverrides {
            title: Some("Custom".to_string()),
            ..PlotOverrides::default()
        });
        assert_eq!(merged.title, "Custom");
        assert_eq!(merged.id, "p");
        assert_eq!(merged.data_labels.len(), 2);
    }

    #[test]
    fn renders_each_dataset_with_switch() {
        let mut reads = Series::new();
        reads.insert("S1.Count".to_string(), vec![(90.0, 1.0), (100.0, 5.0)]);
        let mut bases = Series::new();
        bases.insert("S1.Count".to_string(), vec![(90.0, 150.0), (100.0, 750.0)]);
        let plot = LinePlot {
            config: config(),
            datasets: vec![reads, bases],
        };
        let mut out = String::new();
        plot.render(&mut out).unwrap();
        assert_eq!(out.matches("<svg").count(), 2);
        assert_eq!(out.matches("<path").count(), 2);
        assert!(out.contains("showDataset('p',1)"));
        assert!(out.contains("Number of bases"));
        assert!(out.contains("S1.Count"));
    }

    #[test]
    fn empty_dataset_renders_frame_only() {
        let plot = LinePlot {
            config: config(),
            datasets: vec![Series::new()],
        };
        let mut out = String::new();
        plot.render(&mut out).unwrap();
        assert!(out.contains("<svg"));
        assert!(!out.contains("<path"));
    }
}
