//! In-memory figures in plotly's JSON layout (`{"data": [...], "layout": {...}}`).

use serde::{Serialize, Serializer};

use crate::color::{to_hex, Rgb};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(layout: Layout) -> Self {
        Figure {
            data: Vec::new(),
            layout,
        }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    pub fn traces(&self) -> &[Trace] {
        &self.data
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A line trace; `NaN` samples serialize as `null` gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub line: Line,
}

impl Trace {
    pub fn lines(name: String, x: Vec<f64>, y: Vec<f64>, color: Rgb) -> Self {
        Trace {
            kind: "scatter",
            mode: "lines",
            name,
            x,
            y,
            line: Line { color, width: 1.5 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    #[serde(serialize_with = "serialize_rgb")]
    pub color: Rgb,
    pub width: f32,
}

fn serialize_rgb<S: Serializer>(color: &Rgb, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(*color))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub template: &'static str,
    pub showlegend: bool,
    pub autosize: bool,
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

impl Layout {
    /// Layout of a figure overlaying many entries.
    pub fn overlay(x_title: String, y_title: String) -> Self {
        Layout {
            template: "simple_white",
            showlegend: true,
            autosize: true,
            width: 600,
            height: 400,
            margin: Margin::uniform(70, 7),
            xaxis: Axis::framed(x_title),
            yaxis: Axis::framed(y_title),
        }
    }

    /// Layout of a single entry's figure.
    pub fn single(x_title: String, y_title: String) -> Self {
        Layout {
            width: 450,
            height: 350,
            ..Layout::overlay(x_title, y_title)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
    pub pad: u32,
}

impl Margin {
    pub fn uniform(px: u32, pad: u32) -> Self {
        Margin {
            l: px,
            r: px,
            b: px,
            t: px,
            pad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    pub showline: bool,
    pub mirror: bool,
}

impl Axis {
    /// An axis with a line on both sides of the plot area.
    pub fn framed(title: String) -> Self {
        Axis {
            title,
            showline: true,
            mirror: true,
        }
    }
}
