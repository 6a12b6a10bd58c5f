//! Report Assembly Module
//! Runs derivation and analysis over the cleaned table, lays out the fixed
//! section order, and renders each section into a slide.

use crate::charts::{
    format_optional, format_percent, ChartPlotter, ChartSpec, Metric, RenderError,
    StaticChartRenderer, TableSpec,
};
use crate::config::CovidWindows;
use crate::data::{CleanedTable, DataProcessor, DerivedTable, YearlyTable};
use crate::ppt::Slide;
use crate::stats::{CorrelationSummary, CovidSummary, SeasonalityTable, StatsCalculator, TrendLine};
use log::{debug, info, warn};

pub const REPORT_TITLE: &str = "UPI Transaction Trends";

/// Every derived table and statistic the report draws from.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub derived: DerivedTable,
    pub yearly: YearlyTable,
    pub covid: Vec<CovidSummary>,
    pub correlation: CorrelationSummary,
    pub volume_trend: Option<TrendLine>,
    pub value_trend: Option<TrendLine>,
    pub seasonality: SeasonalityTable,
}

impl Analysis {
    pub fn run(cleaned: &CleanedTable, windows: &CovidWindows) -> Self {
        let derived = DataProcessor::derive(cleaned, windows);
        if derived.is_empty() {
            warn!("No months to analyse; every section will be empty");
        }
        let yearly = DataProcessor::yearly_aggregate(cleaned);
        let partial = yearly.partial_years();
        if !partial.is_empty() {
            info!("Years with fewer than 12 months: {partial:?}");
        }
        let covid = StatsCalculator::covid_summary(&derived);
        let correlation = StatsCalculator::correlation_summary(&derived);
        let volume_trend = StatsCalculator::linear_fit(StatsCalculator::banks_volume_pairs(&derived));
        let value_trend = StatsCalculator::linear_fit(StatsCalculator::banks_value_pairs(&derived));
        let seasonality = StatsCalculator::seasonality(&derived);
        info!(
            "Analysed {} months across {} years",
            derived.len(),
            yearly.years.len()
        );

        Self {
            derived,
            yearly,
            covid,
            correlation,
            volume_trend,
            value_trend,
            seasonality,
        }
    }
}

/// One report section before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Text {
        title: String,
        paragraphs: Vec<String>,
    },
    Chart(ChartSpec),
    Table(TableSpec),
}

impl Section {
    pub fn title(&self) -> &str {
        match self {
            Section::Text { title, .. } => title,
            Section::Chart(spec) => &spec.title,
            Section::Table(spec) => &spec.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    /// Lay out every section in report order.
    pub fn build(analysis: &Analysis) -> Self {
        let derived = &analysis.derived;
        let sections = vec![
            Section::Text {
                title: REPORT_TITLE.to_string(),
                paragraphs: introduction(analysis),
            },
            Section::Chart(ChartPlotter::trend_chart(derived)),
            Section::Chart(ChartPlotter::yoy_chart(&analysis.yearly, Metric::Volume)),
            Section::Chart(ChartPlotter::yoy_chart(&analysis.yearly, Metric::Value)),
            Section::Table(ChartPlotter::covid_table(&analysis.covid)),
            Section::Chart(ChartPlotter::covid_chart(derived)),
            Section::Chart(ChartPlotter::scatter_chart(
                derived,
                Metric::Volume,
                analysis.volume_trend,
            )),
            Section::Chart(ChartPlotter::scatter_chart(
                derived,
                Metric::Value,
                analysis.value_trend,
            )),
            Section::Table(ChartPlotter::correlation_table(&analysis.correlation)),
            Section::Chart(ChartPlotter::seasonality_chart(&analysis.seasonality)),
            Section::Chart(ChartPlotter::efficiency_chart(derived)),
            Section::Text {
                title: "Conclusion".to_string(),
                paragraphs: conclusion(analysis),
            },
        ];

        Self {
            title: REPORT_TITLE.to_string(),
            sections,
        }
    }

    /// Render charts to PNG and convert every section into a slide.
    pub fn render(&self, width: u32, height: u32) -> Result<Vec<Slide>, RenderError> {
        self.sections
            .iter()
            .map(|section| -> Result<Slide, RenderError> {
                debug!("Rendering section '{}'", section.title());
                Ok(match section {
                    Section::Text { title, paragraphs } => Slide::Text {
                        title: title.clone(),
                        paragraphs: paragraphs.clone(),
                    },
                    Section::Chart(spec) => Slide::Image {
                        title: spec.title.clone(),
                        png: StaticChartRenderer::render_png(spec, width, height)?,
                        width,
                        height,
                        caption: spec.caption.clone(),
                    },
                    Section::Table(spec) => Slide::Table(spec.clone()),
                })
            })
            .collect()
    }
}

fn introduction(analysis: &Analysis) -> Vec<String> {
    let records = &analysis.derived.records;
    let span = match (records.first(), records.last()) {
        (Some(first), Some(last)) => format!(
            "{} months of data from {} to {}.",
            records.len(),
            first.record.month.format("%B %Y"),
            last.record.month.format("%B %Y")
        ),
        _ => "The input contained no months of data.".to_string(),
    };

    vec![
        "This report summarises monthly Unified Payments Interface (UPI) transaction volume, value and the number of banks live on the network.".to_string(),
        span,
        "Sections cover the overall trend, year-over-year growth, the pre- and post-COVID comparison, the relationship with bank count, seasonality, and per-bank efficiency.".to_string(),
    ]
}

fn conclusion(analysis: &Analysis) -> Vec<String> {
    let mut paragraphs = Vec::new();

    let years = &analysis.yearly.years;
    if let Some(latest) = years.last() {
        let mut line = format!(
            "{} volume growth: {}; value growth: {}.",
            latest.year,
            format_percent(latest.volume_yoy_growth),
            format_percent(latest.value_yoy_growth)
        );
        let has_growth = latest.volume_yoy_growth.is_some() || latest.value_yoy_growth.is_some();
        if let Some(note) = analysis
            .yearly
            .coverage_note(years.len() - 1)
            .filter(|_| has_growth)
        {
            line.push_str(&format!(" {note}."));
        }
        paragraphs.push(line);
    }

    if let [pre, post] = analysis.covid.as_slice() {
        paragraphs.push(format!(
            "Average monthly volume moved from {} Mn ({}) to {} Mn ({}).",
            format_optional(pre.mean_volume, 2),
            pre.period,
            format_optional(post.mean_volume, 2),
            post.period
        ));
    }

    paragraphs.push(format!(
        "Correlation with banks live: volume r = {}, value r = {}.",
        format_optional(analysis.correlation.banks_vs_volume, 3),
        format_optional(analysis.correlation.banks_vs_value, 3)
    ));
    paragraphs.push(
        "Correlation here is descriptive; the trend lines are visual references, not forecasts."
            .to_string(),
    );
    paragraphs
}
