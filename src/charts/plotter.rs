//! Chart Plotter Module
//! Builds chart and table specs from the derived tables. Nothing here draws;
//! the specs carry titles, axis labels, colors and the bound data.

use crate::data::{CovidPeriod, DerivedTable, YearlyTable};
use crate::stats::{CorrelationSummary, CovidSummary, SeasonalityTable, TrendLine};
use plotters::style::RGBColor;

pub const VOLUME_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
pub const VALUE_COLOR: RGBColor = RGBColor(231, 76, 60); // Red
pub const GROWTH_COLOR: RGBColor = RGBColor(46, 204, 113); // Green
pub const PRE_COVID_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
pub const POST_COVID_COLOR: RGBColor = RGBColor(243, 156, 18); // Orange
pub const TREND_COLOR: RGBColor = RGBColor(96, 125, 139); // Blue Grey
pub const SEASONAL_VOLUME_COLOR: RGBColor = RGBColor(26, 188, 156); // Teal
pub const SEASONAL_VALUE_COLOR: RGBColor = RGBColor(155, 89, 182); // Purple

/// Right axis range is this multiple of the left axis range on dual-axis charts.
pub const RIGHT_AXIS_SCALE: f64 = 100.0;

/// Placeholder for undefined statistics in labels and tables.
pub const UNDEFINED: &str = "n/a";

/// Transaction metric selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Volume,
    Value,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Volume => "Volume",
            Metric::Value => "Value",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Metric::Volume => "Volume (in Mn)",
            Metric::Value => "Value (in Cr.)",
        }
    }
}

/// A named line of values, one per x category. `None` leaves a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub color: RGBColor,
    pub values: Vec<Option<f64>>,
}

/// One panel of a faceted bar chart, with its own y scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub title: String,
    pub y_label: String,
    pub color: RGBColor,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Left series on the primary axis, right series on a secondary axis
    /// whose range is `right_scale` times the primary range.
    DualAxisLine {
        categories: Vec<String>,
        left: Series,
        right: Series,
        right_label: String,
        right_scale: f64,
    },
    /// Vertical bars with a text label above each bar.
    Bar {
        categories: Vec<String>,
        values: Vec<Option<f64>>,
        labels: Vec<String>,
        color: RGBColor,
    },
    /// Several lines over a shared x axis.
    Lines {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// Points with an optional least-squares line.
    Scatter {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        trend: Option<TrendLine>,
        trend_color: RGBColor,
    },
    /// Side-by-side bar panels sharing categories.
    FacetedBar {
        categories: Vec<String>,
        facets: Vec<Facet>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Note drawn under the chart.
    pub caption: Option<String>,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub caption: Option<String>,
}

/// Format a growth figure as a rounded percentage.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let rounded = v.round();
            // avoid "-0%"
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{rounded:.0}%")
        }
        None => UNDEFINED.to_string(),
    }
}

/// Format an optional statistic with fixed decimals.
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => UNDEFINED.to_string(),
    }
}

fn month_labels(table: &DerivedTable) -> Vec<String> {
    table
        .records
        .iter()
        .map(|r| r.record.month.format("%b-%y").to_string())
        .collect()
}

/// Builds chart and table specs for every report section.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn trend_chart(table: &DerivedTable) -> ChartSpec {
        ChartSpec {
            title: "UPI Monthly Transaction Volume and Value".to_string(),
            x_label: "Month".to_string(),
            y_label: Metric::Volume.axis_label().to_string(),
            caption: None,
            kind: ChartKind::DualAxisLine {
                categories: month_labels(table),
                left: Series {
                    name: "Volume".to_string(),
                    color: VOLUME_COLOR,
                    values: table
                        .records
                        .iter()
                        .map(|r| Some(r.record.volume_in_mn))
                        .collect(),
                },
                right: Series {
                    name: "Value".to_string(),
                    color: VALUE_COLOR,
                    values: table
                        .records
                        .iter()
                        .map(|r| Some(r.record.value_in_cr))
                        .collect(),
                },
                right_label: Metric::Value.axis_label().to_string(),
                right_scale: RIGHT_AXIS_SCALE,
            },
        }
    }

    /// Year-over-year growth bars for one metric.
    ///
    /// Years whose growth compares a different number of months than the
    /// year before are called out in the caption, with the direction of skew.
    pub fn yoy_chart(yearly: &YearlyTable, metric: Metric) -> ChartSpec {
        let values: Vec<Option<f64>> = yearly
            .years
            .iter()
            .map(|y| match metric {
                Metric::Volume => y.volume_yoy_growth,
                Metric::Value => y.value_yoy_growth,
            })
            .collect();

        let notes: Vec<String> = values
            .iter()
            .enumerate()
            .filter(|(_, growth)| growth.is_some())
            .filter_map(|(i, _)| yearly.coverage_note(i))
            .map(|note| note.to_string())
            .collect();
        let caption = if notes.is_empty() {
            None
        } else {
            Some(format!(
                "Uneven year coverage: {}. Figures are shown as computed.",
                notes.join("; ")
            ))
        };

        ChartSpec {
            title: format!(
                "Year-over-Year Growth in UPI Transaction {}",
                metric.name()
            ),
            x_label: "Year".to_string(),
            y_label: "YoY Growth (%)".to_string(),
            caption,
            kind: ChartKind::Bar {
                categories: yearly.years.iter().map(|y| y.year.to_string()).collect(),
                labels: values.iter().map(|v| format_percent(*v)).collect(),
                values,
                color: match metric {
                    Metric::Volume => GROWTH_COLOR,
                    Metric::Value => VALUE_COLOR,
                },
            },
        }
    }

    pub fn covid_table(summary: &[CovidSummary]) -> TableSpec {
        TableSpec {
            title: "Pre-COVID vs Post-COVID Monthly Averages".to_string(),
            headers: vec![
                "Period".to_string(),
                "Months".to_string(),
                "Avg Volume (Mn)".to_string(),
                "Avg Value (Cr)".to_string(),
                "Avg Banks Live".to_string(),
            ],
            rows: summary
                .iter()
                .map(|s| {
                    vec![
                        s.period.label().to_string(),
                        s.months.to_string(),
                        format_optional(s.mean_volume, 2),
                        format_optional(s.mean_value, 2),
                        format_optional(s.mean_banks, 1),
                    ]
                })
                .collect(),
            caption: Some(
                "Months between the pre- and post-COVID windows are excluded.".to_string(),
            ),
        }
    }

    /// Volume over time with one line per COVID period; unlabeled months are
    /// left out of both lines.
    pub fn covid_chart(table: &DerivedTable) -> ChartSpec {
        let series = [
            (CovidPeriod::PreCovid, PRE_COVID_COLOR),
            (CovidPeriod::PostCovid, POST_COVID_COLOR),
        ]
        .into_iter()
        .map(|(period, color)| Series {
            name: period.label().to_string(),
            color,
            values: table
                .records
                .iter()
                .map(|r| (r.period == period).then_some(r.record.volume_in_mn))
                .collect(),
        })
        .collect();

        ChartSpec {
            title: "UPI Transaction Volume: Pre-COVID vs Post-COVID".to_string(),
            x_label: "Month".to_string(),
            y_label: Metric::Volume.axis_label().to_string(),
            caption: None,
            kind: ChartKind::Lines {
                categories: month_labels(table),
                series,
            },
        }
    }

    /// Bank count against a metric, with the least-squares line overlaid.
    pub fn scatter_chart(
        table: &DerivedTable,
        metric: Metric,
        trend: Option<TrendLine>,
    ) -> ChartSpec {
        let points = table
            .records
            .iter()
            .map(|r| {
                let y = match metric {
                    Metric::Volume => r.record.volume_in_mn,
                    Metric::Value => r.record.value_in_cr,
                };
                (f64::from(r.record.banks_live), y)
            })
            .collect();

        ChartSpec {
            title: format!("Banks Live on UPI vs Transaction {}", metric.name()),
            x_label: "No. of Banks live on UPI".to_string(),
            y_label: metric.axis_label().to_string(),
            caption: trend
                .is_none()
                .then(|| "Trend line undefined for this data.".to_string()),
            kind: ChartKind::Scatter {
                points,
                color: match metric {
                    Metric::Volume => VOLUME_COLOR,
                    Metric::Value => VALUE_COLOR,
                },
                trend,
                trend_color: TREND_COLOR,
            },
        }
    }

    pub fn correlation_table(summary: &CorrelationSummary) -> TableSpec {
        TableSpec {
            title: "Correlation with Number of Banks Live".to_string(),
            headers: vec![
                "Metric".to_string(),
                "Pearson r".to_string(),
                "Observations".to_string(),
            ],
            rows: vec![
                vec![
                    Metric::Volume.axis_label().to_string(),
                    format_optional(summary.banks_vs_volume, 3),
                    summary.volume_observations.to_string(),
                ],
                vec![
                    Metric::Value.axis_label().to_string(),
                    format_optional(summary.banks_vs_value, 3),
                    summary.value_observations.to_string(),
                ],
            ],
            caption: None,
        }
    }

    pub fn seasonality_chart(seasonality: &SeasonalityTable) -> ChartSpec {
        let categories = seasonality
            .months
            .iter()
            .map(|m| m.month_name[..3].to_string())
            .collect();

        ChartSpec {
            title: "Average Monthly Volume and Value by Calendar Month".to_string(),
            x_label: "Month".to_string(),
            y_label: "Average".to_string(),
            caption: None,
            kind: ChartKind::FacetedBar {
                categories,
                facets: vec![
                    Facet {
                        title: "Average Volume".to_string(),
                        y_label: Metric::Volume.axis_label().to_string(),
                        color: SEASONAL_VOLUME_COLOR,
                        values: seasonality.months.iter().map(|m| m.mean_volume).collect(),
                    },
                    Facet {
                        title: "Average Value".to_string(),
                        y_label: Metric::Value.axis_label().to_string(),
                        color: SEASONAL_VALUE_COLOR,
                        values: seasonality.months.iter().map(|m| m.mean_value).collect(),
                    },
                ],
            },
        }
    }

    /// Per-bank volume and value; same layout as the trend chart.
    pub fn efficiency_chart(table: &DerivedTable) -> ChartSpec {
        ChartSpec {
            title: "UPI Efficiency: Volume and Value per Live Bank".to_string(),
            x_label: "Month".to_string(),
            y_label: "Volume per Bank (Mn)".to_string(),
            caption: None,
            kind: ChartKind::DualAxisLine {
                categories: month_labels(table),
                left: Series {
                    name: "Volume per Bank".to_string(),
                    color: VOLUME_COLOR,
                    values: table.records.iter().map(|r| r.volume_per_bank).collect(),
                },
                right: Series {
                    name: "Value per Bank".to_string(),
                    color: VALUE_COLOR,
                    values: table.records.iter().map(|r| r.value_per_bank).collect(),
                },
                right_label: "Value per Bank (Cr)".to_string(),
                right_scale: RIGHT_AXIS_SCALE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CovidWindows;
    use crate::data::{CleanedRecord, CleanedTable, DataProcessor};
    use crate::stats::StatsCalculator;
    use chrono::NaiveDate;

    fn derived(rows: &[(i32, u32, f64, f64, u32)]) -> (CleanedTable, DerivedTable) {
        let cleaned = CleanedTable {
            records: rows
                .iter()
                .map(|&(y, m, volume, value, banks)| CleanedRecord {
                    month: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
                    volume_in_mn: volume,
                    value_in_cr: value,
                    banks_live: banks,
                })
                .collect(),
        };
        let table = DataProcessor::derive(&cleaned, &CovidWindows::default());
        (cleaned, table)
    }

    #[test]
    fn percent_labels_are_rounded() {
        assert_eq!(format_percent(Some(50.0)), "50%");
        assert_eq!(format_percent(Some(-19.999999999999996)), "-20%");
        assert_eq!(format_percent(Some(12.4)), "12%");
        assert_eq!(format_percent(Some(-0.3)), "0%");
        assert_eq!(format_percent(None), "n/a");
    }

    #[test]
    fn trend_chart_binds_both_axes() {
        let (_, table) = derived(&[(2020, 1, 10.0, 100.0, 5), (2020, 2, 20.0, 200.0, 5)]);
        let spec = ChartPlotter::trend_chart(&table);
        assert_eq!(spec.y_label, "Volume (in Mn)");
        match spec.kind {
            ChartKind::DualAxisLine {
                categories,
                left,
                right,
                right_label,
                right_scale,
            } => {
                assert_eq!(categories, vec!["Jan-20", "Feb-20"]);
                assert_eq!(left.values, vec![Some(10.0), Some(20.0)]);
                assert_eq!(right.values, vec![Some(100.0), Some(200.0)]);
                assert_eq!(left.color, VOLUME_COLOR);
                assert_eq!(right_label, "Value (in Cr.)");
                assert_eq!(right_scale, 100.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn yoy_chart_labels_and_partial_year_caption() {
        let mut rows: Vec<(i32, u32, f64, f64, u32)> =
            (1..=12).map(|m| (2021, m, 10.0, 10.0, 1)).collect();
        rows.push((2022, 1, 60.0, 60.0, 1));
        let (cleaned, _) = derived(&rows);
        let yearly = DataProcessor::yearly_aggregate(&cleaned);

        let spec = ChartPlotter::yoy_chart(&yearly, Metric::Volume);
        assert!(spec.title.ends_with("Volume"));
        let caption = spec.caption.expect("partial year caption");
        assert!(
            caption.contains("2022 growth is understated (1 month vs 12 in 2021)"),
            "{caption}"
        );
        match spec.kind {
            ChartKind::Bar {
                categories, labels, ..
            } => {
                assert_eq!(categories, vec!["2021", "2022"]);
                assert_eq!(labels, vec!["n/a", "-50%"]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn partial_first_year_is_not_flagged_but_its_successor_is() {
        let (cleaned, _) = derived(&[
            (2016, 4, 1.0, 1.0, 1),
            (2016, 5, 1.0, 1.0, 1),
            (2017, 1, 5.0, 5.0, 1),
            (2017, 2, 5.0, 5.0, 1),
            (2017, 3, 5.0, 5.0, 1),
            (2018, 1, 9.0, 9.0, 1),
        ]);
        let yearly = DataProcessor::yearly_aggregate(&cleaned);
        let caption = ChartPlotter::yoy_chart(&yearly, Metric::Value)
            .caption
            .expect("coverage caption");
        assert!(!caption.contains("2016"), "{caption}");
        assert!(
            caption.contains("2017 growth is overstated (3 months vs 2 in 2016)"),
            "{caption}"
        );
        assert!(
            caption.contains("2018 growth is understated (1 month vs 3 in 2017)"),
            "{caption}"
        );

        let (cleaned, _) = derived(&[(2016, 4, 1.0, 1.0, 1), (2016, 5, 1.0, 1.0, 1)]);
        let yearly = DataProcessor::yearly_aggregate(&cleaned);
        assert_eq!(ChartPlotter::yoy_chart(&yearly, Metric::Volume).caption, None);
    }

    #[test]
    fn covid_table_renders_undefined_means() {
        let (_, table) = derived(&[(2019, 5, 10.0, 100.0, 4)]);
        let spec = ChartPlotter::covid_table(&StatsCalculator::covid_summary(&table));
        assert_eq!(spec.rows.len(), 2);
        assert_eq!(spec.rows[0], vec!["Pre-COVID", "1", "10.00", "100.00", "4.0"]);
        assert_eq!(spec.rows[1], vec!["Post-COVID", "0", "n/a", "n/a", "n/a"]);
    }

    #[test]
    fn covid_chart_splits_lines_by_period() {
        let (_, table) = derived(&[
            (2020, 1, 1.0, 1.0, 1),
            (2020, 3, 2.0, 1.0, 1),
            (2020, 7, 3.0, 1.0, 1),
        ]);
        match ChartPlotter::covid_chart(&table).kind {
            ChartKind::Lines { series, .. } => {
                assert_eq!(series[0].name, "Pre-COVID");
                assert_eq!(series[0].values, vec![Some(1.0), None, None]);
                assert_eq!(series[1].color, POST_COVID_COLOR);
                assert_eq!(series[1].values, vec![None, None, Some(3.0)]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn scatter_chart_carries_trend_line() {
        let (_, table) = derived(&[(2021, 1, 100.0, 1.0, 10), (2021, 2, 200.0, 1.0, 20)]);
        let trend = StatsCalculator::linear_fit(StatsCalculator::banks_volume_pairs(&table));
        let spec = ChartPlotter::scatter_chart(&table, Metric::Volume, trend);
        assert_eq!(spec.x_label, "No. of Banks live on UPI");
        assert!(spec.caption.is_none());
        match spec.kind {
            ChartKind::Scatter { points, trend, .. } => {
                assert_eq!(points, vec![(10.0, 100.0), (20.0, 200.0)]);
                let trend = trend.unwrap();
                assert!((trend.slope - 10.0).abs() < 1e-9);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let spec = ChartPlotter::scatter_chart(&table, Metric::Value, None);
        assert!(spec.caption.is_some());
    }

    #[test]
    fn correlation_table_formats_three_decimals() {
        let summary = CorrelationSummary {
            banks_vs_volume: Some(0.98765),
            banks_vs_value: None,
            volume_observations: 12,
            value_observations: 1,
        };
        let spec = ChartPlotter::correlation_table(&summary);
        assert_eq!(spec.rows[0][1], "0.988");
        assert_eq!(spec.rows[1][1], "n/a");
        assert_eq!(spec.rows[1][2], "1");
    }

    #[test]
    fn seasonality_chart_has_one_facet_per_metric() {
        let (_, table) = derived(&[(2021, 3, 3.0, 30.0, 1), (2021, 1, 1.0, 10.0, 1)]);
        let spec = ChartPlotter::seasonality_chart(&StatsCalculator::seasonality(&table));
        match spec.kind {
            ChartKind::FacetedBar { categories, facets } => {
                assert_eq!(categories, vec!["Jan", "Mar"]);
                assert_eq!(facets.len(), 2);
                assert_eq!(facets[0].values, vec![1.0, 3.0]);
                assert_eq!(facets[1].values, vec![10.0, 30.0]);
                assert_eq!(facets[1].y_label, "Value (in Cr.)");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn efficiency_chart_leaves_gaps_for_zero_banks() {
        let (_, table) = derived(&[(2021, 1, 100.0, 50.0, 0), (2021, 2, 100.0, 50.0, 10)]);
        match ChartPlotter::efficiency_chart(&table).kind {
            ChartKind::DualAxisLine { left, right, .. } => {
                assert_eq!(left.values, vec![None, Some(10.0)]);
                assert_eq!(right.values, vec![None, Some(5.0)]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
