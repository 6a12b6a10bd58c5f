//! Static Chart Renderer
//! Rasterises chart specs with plotters and encodes them as PNG bytes for
//! embedding in the report deck.
//!
//! Layout:
//! 1. Title centered at the top
//! 2. Plot area (single chart, or one panel per facet)
//! 3. Optional caption line at the bottom

use crate::charts::plotter::{ChartKind, ChartSpec, Facet, Series};
use crate::stats::TrendLine;
use image::{ImageFormat, RgbImage};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;
use thiserror::Error;

const FONT: &str = "sans-serif";
const TITLE_SIZE: f64 = 28.0;
const LABEL_SIZE: f64 = 16.0;
const CAPTION_HEIGHT: u32 = 40;
const HEADROOM: f64 = 1.15;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Chart drawing failed: {0}")]
    Draw(String),
    #[error("Pixel buffer does not match {0}x{1}")]
    Buffer(u32, u32),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

fn draw_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a chart spec to PNG bytes.
    pub fn render_png(spec: &ChartSpec, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        debug!("Rendering '{}' at {}x{}", spec.title, width, height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            Self::draw(&root, spec)?;
            root.present().map_err(draw_error)?;
        }

        let img = RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer(width, height))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    fn draw(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(draw_error)?;
        let titled = root
            .titled(&spec.title, (FONT, TITLE_SIZE))
            .map_err(draw_error)?;

        let (_, height) = titled.dim_in_pixel();
        let plot_area = match &spec.caption {
            Some(caption) if height > CAPTION_HEIGHT * 2 => {
                let (upper, lower) = titled.split_vertically((height - CAPTION_HEIGHT) as i32);
                lower
                    .draw_text(caption, &(FONT, LABEL_SIZE).into_font().color(&BLACK), (20, 10))
                    .map_err(draw_error)?;
                upper
            }
            _ => titled,
        };

        match &spec.kind {
            ChartKind::DualAxisLine {
                categories,
                left,
                right,
                right_label,
                right_scale,
            } => Self::draw_dual_axis(
                &plot_area,
                spec,
                categories,
                left,
                right,
                right_label,
                *right_scale,
            ),
            ChartKind::Bar {
                categories,
                values,
                labels,
                color,
            } => Self::draw_bars(&plot_area, spec, categories, values, labels, *color),
            ChartKind::Lines { categories, series } => {
                Self::draw_lines(&plot_area, spec, categories, series)
            }
            ChartKind::Scatter {
                points,
                color,
                trend,
                trend_color,
            } => Self::draw_scatter(&plot_area, spec, points, *color, *trend, *trend_color),
            ChartKind::FacetedBar { categories, facets } => {
                Self::draw_facets(&plot_area, spec, categories, facets)
            }
        }
    }

    fn draw_dual_axis(
        area: &Area,
        spec: &ChartSpec,
        categories: &[String],
        left: &Series,
        right: &Series,
        right_label: &str,
        right_scale: f64,
    ) -> Result<(), RenderError> {
        let x_range = 0.0..x_extent(categories.len());
        let left_max = upper_bound(left.values.iter().flatten().copied());
        let right_max = left_max * right_scale;
        let formatter = |x: &f64| category_label(categories, *x);

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .right_y_label_area_size(90)
            .build_cartesian_2d(x_range.clone(), 0.0..left_max)
            .map_err(draw_error)?
            .set_secondary_coord(x_range, 0.0..right_max);

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(categories.len().min(12))
            .x_label_formatter(&formatter)
            .draw()
            .map_err(draw_error)?;
        chart
            .configure_secondary_axes()
            .y_desc(right_label)
            .draw()
            .map_err(draw_error)?;

        for (i, segment) in segments(&left.values).into_iter().enumerate() {
            let anno = chart
                .draw_series(LineSeries::new(segment, left.color.stroke_width(2)))
                .map_err(draw_error)?;
            if i == 0 {
                let color = left.color;
                anno.label(left.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
        for (i, segment) in segments(&right.values).into_iter().enumerate() {
            let anno = chart
                .draw_secondary_series(LineSeries::new(segment, right.color.stroke_width(2)))
                .map_err(draw_error)?;
            if i == 0 {
                let color = right.color;
                anno.label(right.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_error)?;
        Ok(())
    }

    fn draw_bars(
        area: &Area,
        spec: &ChartSpec,
        categories: &[String],
        values: &[Option<f64>],
        labels: &[String],
        color: RGBColor,
    ) -> Result<(), RenderError> {
        let (y_min, y_max) = bar_range(values.iter().flatten().copied());
        let formatter = |x: &f64| category_label(categories, *x);
        let pad = (y_max - y_min) * 0.02;

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5..categories.len().max(1) as f64 - 0.5, y_min..y_max)
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(categories.len().max(1))
            .x_label_formatter(&formatter)
            .draw()
            .map_err(draw_error)?;

        chart
            .draw_series(values.iter().enumerate().filter_map(|(i, v)| {
                v.map(|v| {
                    let x = i as f64;
                    Rectangle::new([(x - 0.35, 0.0), (x + 0.35, v)], color.filled())
                })
            }))
            .map_err(draw_error)?;

        let label_style = (FONT, LABEL_SIZE)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        chart
            .draw_series(labels.iter().enumerate().map(|(i, label)| {
                let top = values.get(i).copied().flatten().unwrap_or(0.0).max(0.0);
                Text::new(label.clone(), (i as f64, top + pad), label_style.clone())
            }))
            .map_err(draw_error)?;
        Ok(())
    }

    fn draw_lines(
        area: &Area,
        spec: &ChartSpec,
        categories: &[String],
        series: &[Series],
    ) -> Result<(), RenderError> {
        let y_max = upper_bound(series.iter().flat_map(|s| s.values.iter().flatten().copied()));
        let formatter = |x: &f64| category_label(categories, *x);

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0..x_extent(categories.len()), 0.0..y_max)
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(categories.len().min(12))
            .x_label_formatter(&formatter)
            .draw()
            .map_err(draw_error)?;

        for s in series {
            for (i, segment) in segments(&s.values).into_iter().enumerate() {
                let anno = chart
                    .draw_series(LineSeries::new(segment, s.color.stroke_width(2)))
                    .map_err(draw_error)?;
                if i == 0 {
                    let color = s.color;
                    anno.label(s.name.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                }
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_error)?;
        Ok(())
    }

    fn draw_scatter(
        area: &Area,
        spec: &ChartSpec,
        points: &[(f64, f64)],
        color: RGBColor,
        trend: Option<TrendLine>,
        trend_color: RGBColor,
    ) -> Result<(), RenderError> {
        let (x_min, x_max) = padded_range(points.iter().map(|p| p.0));
        let y_max = upper_bound(points.iter().map(|p| p.1));

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()
            .map_err(draw_error)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.mix(0.7).filled())),
            )
            .map_err(draw_error)?;

        if let Some(line) = trend {
            chart
                .draw_series(LineSeries::new(
                    [x_min, x_max].map(|x| (x, line.at(x))),
                    trend_color.stroke_width(2),
                ))
                .map_err(draw_error)?
                .label("OLS trend")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], trend_color));
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_error)?;
        }
        Ok(())
    }

    /// One panel per facet, each scaled to its own values.
    fn draw_facets(
        area: &Area,
        spec: &ChartSpec,
        categories: &[String],
        facets: &[Facet],
    ) -> Result<(), RenderError> {
        let panels = area.split_evenly((1, facets.len().max(1)));
        let formatter = |x: &f64| category_label(categories, *x);

        for (panel, facet) in panels.iter().zip(facets) {
            let (y_min, y_max) = bar_range(facet.values.iter().copied());
            let mut chart = ChartBuilder::on(panel)
                .caption(facet.title.as_str(), (FONT, 20.0))
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(80)
                .build_cartesian_2d(-0.5..categories.len().max(1) as f64 - 0.5, y_min..y_max)
                .map_err(draw_error)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(spec.x_label.as_str())
                .y_desc(facet.y_label.as_str())
                .x_labels(categories.len().max(1))
                .x_label_formatter(&formatter)
                .draw()
                .map_err(draw_error)?;

            let color = facet.color;
            chart
                .draw_series(facet.values.iter().enumerate().map(|(i, &v)| {
                    let x = i as f64;
                    Rectangle::new([(x - 0.35, 0.0), (x + 0.35, v)], color.filled())
                }))
                .map_err(draw_error)?;
        }
        Ok(())
    }
}

/// Label for an x position that lands on a category index.
pub fn category_label(categories: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

/// Split a gappy series into runs of consecutive points.
pub fn segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) if v.is_finite() => current.push((i as f64, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn x_extent(len: usize) -> f64 {
    (len.saturating_sub(1) as f64).max(1.0)
}

/// Top of a zero-based axis with headroom; 1.0 when there is nothing positive.
pub fn upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() && max > 0.0 {
        max * HEADROOM
    } else {
        1.0
    }
}

/// Y range for bars, always including zero.
pub fn bar_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min == 0.0 && max == 0.0 {
        return (0.0, 1.0);
    }
    (min * HEADROOM, max * HEADROOM)
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartPlotter, Metric};
    use crate::config::CovidWindows;
    use crate::data::{CleanedRecord, CleanedTable, DataProcessor};
    use crate::report::{Analysis, ReportDocument, Section};
    use crate::stats::StatsCalculator;
    use chrono::NaiveDate;

    fn sample_table() -> CleanedTable {
        let rows = [
            (2019, 11, 1000.0, 170_000.0, 140),
            (2019, 12, 1300.0, 202_000.0, 143),
            (2020, 1, 1305.0, 216_000.0, 144),
            (2020, 4, 999.0, 151_000.0, 153),
            (2020, 7, 1497.0, 290_000.0, 0),
            (2021, 1, 2300.0, 431_000.0, 207),
        ];
        CleanedTable {
            records: rows
                .iter()
                .map(|&(y, m, volume, value, banks)| CleanedRecord {
                    month: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
                    volume_in_mn: volume,
                    value_in_cr: value,
                    banks_live: banks,
                })
                .collect(),
        }
    }

    fn assert_png(spec: &ChartSpec, width: u32, height: u32) {
        let png = StaticChartRenderer::render_png(spec, width, height)
            .unwrap_or_else(|e| panic!("'{}' failed: {e}", spec.title));
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (width, height), "{}", spec.title);
    }

    #[test]
    fn renders_every_chart_kind() {
        let cleaned = sample_table();
        let derived = DataProcessor::derive(&cleaned, &CovidWindows::default());
        let yearly = DataProcessor::yearly_aggregate(&cleaned);
        let trend = StatsCalculator::linear_fit(StatsCalculator::banks_volume_pairs(&derived));

        let specs = [
            ChartPlotter::trend_chart(&derived),
            ChartPlotter::yoy_chart(&yearly, Metric::Volume),
            ChartPlotter::covid_chart(&derived),
            ChartPlotter::scatter_chart(&derived, Metric::Volume, trend),
            ChartPlotter::seasonality_chart(&StatsCalculator::seasonality(&derived)),
            ChartPlotter::efficiency_chart(&derived),
        ];
        assert!(specs[1].caption.is_some());
        assert!(matches!(specs[3].kind, ChartKind::Scatter { trend: Some(_), .. }));
        for spec in &specs {
            assert_png(spec, 800, 500);
        }
    }

    #[test]
    fn empty_charts_still_render() {
        let analysis = Analysis::run(&CleanedTable::default(), &CovidWindows::default());
        let doc = ReportDocument::build(&analysis);
        let charts: Vec<&ChartSpec> = doc
            .sections
            .iter()
            .filter_map(|s| match s {
                Section::Chart(spec) => Some(spec),
                _ => None,
            })
            .collect();
        assert_eq!(charts.len(), 8);
        for spec in charts {
            assert_png(spec, 640, 400);
        }
    }

    #[test]
    fn segments_break_at_gaps() {
        let runs = segments(&[Some(1.0), Some(2.0), None, None, Some(5.0), Some(f64::NAN)]);
        assert_eq!(runs, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(4.0, 5.0)]]);
        assert!(segments(&[None, None]).is_empty());
    }

    #[test]
    fn category_labels_only_on_integer_ticks() {
        let cats = vec!["Jan-20".to_string(), "Feb-20".to_string()];
        assert_eq!(category_label(&cats, 1.0), "Feb-20");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -1.0), "");
    }

    #[test]
    fn axis_ranges_handle_degenerate_input() {
        assert_eq!(upper_bound(std::iter::empty()), 1.0);
        assert!((upper_bound([10.0, 20.0].into_iter()) - 23.0).abs() < 1e-9);
        assert_eq!(bar_range(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = bar_range([-20.0, 50.0].into_iter());
        assert!(lo < -20.0 && hi > 50.0);
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(padded_range([5.0].into_iter()), (4.0, 6.0));
    }
}
