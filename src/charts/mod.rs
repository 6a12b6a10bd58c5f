//! Charts module - chart specs and rendering

mod plotter;
mod renderer;

pub use plotter::{
    format_optional, format_percent, ChartPlotter, ChartSpec, Metric, TableSpec,
};
pub use renderer::{RenderError, StaticChartRenderer};
