//! SVG building blocks shared by the line, bar and scatter plots.

use crate::report::escape_html;
use anyhow::Result;
use std::fmt::Write as FmtWrite;

pub(crate) const PALETTE: &[&str] = &[
    "#7cb5ec", "#434348", "#90ed7d", "#f7a35c", "#8085e9", "#f15c80", "#e4d354", "#2b908f",
    "#f45b5b", "#91e8e1",
];

pub(crate) fn color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// Margins around the plotting area of an SVG of the given size.
pub(crate) fn frame(w: f64, h: f64, left: f64) -> Frame {
    let right = 20.0;
    let top = 12.0;
    let bottom = 34.0;
    Frame {
        left,
        top,
        plot_w: w - left - right,
        plot_h: h - top - bottom,
        x_min: 0.0,
        x_max: 1.0,
        y_min: 0.0,
        y_max: 1.0,
    }
}

pub(crate) fn open_svg(out: &mut String, w: f64, h: f64, f: &Frame) -> Result<()> {
    writeln!(
        out,
        "<svg width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
        w, h, w, h
    )?;
    writeln!(
        out,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#fff\" stroke=\"#ddd\"/>",
        f.left, f.top, f.plot_w, f.plot_h
    )?;
    Ok(())
}

/// Plot heading plus one button per dataset when there is more than one.
pub(crate) fn plot_header(out: &mut String, id: &str, title: &str, names: &[String]) -> Result<()> {
    writeln!(out, "<div class=\"plot\" id=\"{}\">", id)?;
    writeln!(out, "<div class=\"plot-title\">{}</div>", escape_html(title))?;
    if names.len() > 1 {
        writeln!(out, "<div class=\"switch\">")?;
        for (i, name) in names.iter().enumerate() {
            writeln!(
                out,
                "<button onclick=\"showDataset('{}',{})\">{}</button>",
                id,
                i,
                escape_html(name)
            )?;
        }
        writeln!(out, "</div>")?;
    }
    Ok(())
}

/// Opens the container of dataset `i`; only the first one starts visible.
pub(crate) fn open_dataset(out: &mut String, id: &str, i: usize) -> Result<()> {
    let hidden = if i == 0 { "" } else { " style=\"display:none\"" };
    writeln!(
        out,
        "<div class=\"dataset\" data-plot=\"{}\" data-index=\"{}\"{}>",
        id, i, hidden
    )?;
    Ok(())
}

pub(crate) fn legend<'a>(out: &mut String, names: impl Iterator<Item = &'a str>) -> Result<()> {
    write!(out, "<div class=\"desc\">")?;
    for (i, name) in names.enumerate() {
        write!(
            out,
            "<span style=\"display:inline-block;width:18px;height:4px;background:{};margin:0 6px 2px 10px;vertical-align:middle;\"></span>{}",
            color(i),
            escape_html(name)
        )?;
    }
    writeln!(out, "</div>")?;
    Ok(())
}

pub(crate) struct Frame {
    pub left: f64,
    pub top: f64,
    pub plot_w: f64,
    pub plot_h: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Frame {
    pub fn x(&self, v: f64) -> f64 {
        self.left + (v - self.x_min) / (self.x_max - self.x_min).max(1e-6) * self.plot_w
    }

    pub fn y(&self, v: f64) -> f64 {
        self.top + self.plot_h - (v - self.y_min) / (self.y_max - self.y_min).max(1e-6) * self.plot_h
    }
}

pub(crate) fn draw_y_axis_ticks(out: &mut String, f: &Frame, ticks: usize) -> Result<()> {
    if ticks < 2 || (f.y_max - f.y_min).abs() < 1e-9 {
        return Ok(());
    }
    let (start, step, count) = nice_ticks(f.y_min, f.y_max, ticks);
    for i in 0..count {
        let v = start + step * i as f64;
        if v > f.y_max + step * 1e-6 {
            break;
        }
        let y = f.y(v);
        writeln!(
            out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#eee\"/>",
            f.left,
            y,
            f.left + f.plot_w,
            y
        )?;
        writeln!(
            out,
            "<text x=\"{}\" y=\"{}\" font-size=\"10\" fill=\"#666\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>",
            f.left - 4.0,
            y,
            fmt_tick(v)
        )?;
    }
    Ok(())
}

pub(crate) fn draw_x_axis_ticks(out: &mut String, f: &Frame, ticks: usize) -> Result<()> {
    if ticks < 2 || (f.x_max - f.x_min).abs() < 1e-9 {
        return Ok(());
    }
    let (start, step, count) = nice_ticks(f.x_min, f.x_max, ticks);
    for i in 0..count {
        let v = start + step * i as f64;
        if v < f.x_min - step * 1e-6 || v > f.x_max + step * 1e-6 {
            continue;
        }
        let x = f.x(v);
        writeln!(
            out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#eee\"/>",
            x,
            f.top,
            x,
            f.top + f.plot_h
        )?;
        writeln!(
            out,
            "<text x=\"{}\" y=\"{}\" font-size=\"10\" fill=\"#666\" text-anchor=\"middle\" dominant-baseline=\"hanging\">{}</text>",
            x,
            f.top + f.plot_h + 4.0,
            fmt_tick(v)
        )?;
    }
    Ok(())
}

pub(crate) fn draw_axis_labels(out: &mut String, f: &Frame, x_label: &str, y_label: &str) -> Result<()> {
    let x = f.left + f.plot_w / 2.0;
    let y = f.top + f.plot_h + 24.0;
    writeln!(
        out,
        "<text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#444\" text-anchor=\"middle\">{}</text>",
        x,
        y,
        escape_html(x_label)
    )?;
    let yx = f.left - 46.0;
    let yy = f.top + f.plot_h / 2.0;
    writeln!(
        out,
        "<text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#444\" text-anchor=\"middle\" transform=\"rotate(-90 {} {})\">{}</text>",
        yx,
        yy,
        yx,
        yy,
        escape_html(y_label)
    )?;
    Ok(())
}

pub(crate) fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 0.001 {
        format!("{}", v.round() as i64)
    } else if v.abs() < 10.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.1}", v)
    }
}

pub(crate) fn nice_ticks(min: f64, max: f64, ticks: usize) -> (f64, f64, usize) {
    let range = (max - min).abs().max(1e-9);
    let rough = range / (ticks as f64 - 1.0);
    let mag = 10f64.powf(rough.abs().log10().floor());
    let norm = rough / mag;
    let step = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    } * mag;
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let count = ((end - start) / step).round() as usize + 1;
    (start, step, count)
}
