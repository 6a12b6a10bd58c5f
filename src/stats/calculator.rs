//! Statistics Calculator Module
//! COVID-period means, bank-count correlation, OLS trend lines and
//! seasonal averages over the derived table.

use crate::data::{CovidPeriod, DerivedTable, MONTH_NAMES};
use log::warn;
use statrs::statistics::Statistics;

/// Means for one COVID period. `None` marks an undefined mean.
#[derive(Debug, Clone, PartialEq)]
pub struct CovidSummary {
    pub period: CovidPeriod,
    pub months: usize,
    pub mean_volume: Option<f64>,
    pub mean_value: Option<f64>,
    pub mean_banks: Option<f64>,
}

/// Pearson coefficients between bank count and each transaction metric.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationSummary {
    pub banks_vs_volume: Option<f64>,
    pub banks_vs_value: Option<f64>,
    pub volume_observations: usize,
    pub value_observations: usize,
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Average volume and value for one calendar month across all years.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalMonth {
    pub month_number: u32,
    pub month_name: &'static str,
    pub observations: usize,
    pub mean_volume: f64,
    pub mean_value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeasonalityTable {
    pub months: Vec<SeasonalMonth>,
}

/// Handles statistical calculations over the derived table.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Arithmetic mean, undefined for an empty sample.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().mean())
    }

    /// Keep pairs where both members are present and finite.
    fn complete_pairs<I>(pairs: I) -> (Vec<f64>, Vec<f64>)
    where
        I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
    {
        pairs
            .into_iter()
            .filter_map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
                _ => None,
            })
            .unzip()
    }

    /// Pearson correlation over complete observations.
    ///
    /// Undefined with fewer than two pairs or when either variable is constant.
    pub fn pearson<I>(pairs: I) -> Option<f64>
    where
        I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
    {
        let (xs, ys) = Self::complete_pairs(pairs);
        if xs.len() < 2 {
            return None;
        }
        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return None;
        }
        let r = xs.iter().covariance(ys.iter()) / (sx * sy);
        Some(r.clamp(-1.0, 1.0))
    }

    /// Ordinary least-squares fit of `y` on `x` over complete observations.
    pub fn linear_fit<I>(pairs: I) -> Option<TrendLine>
    where
        I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
    {
        let (xs, ys) = Self::complete_pairs(pairs);
        if xs.len() < 2 {
            return None;
        }
        let var_x = xs.iter().variance();
        if var_x == 0.0 {
            return None;
        }
        let slope = xs.iter().covariance(ys.iter()) / var_x;
        let intercept = ys.iter().mean() - slope * xs.iter().mean();
        Some(TrendLine { slope, intercept })
    }

    /// Means per COVID period. Always returns Pre-COVID then Post-COVID.
    pub fn covid_summary(table: &DerivedTable) -> Vec<CovidSummary> {
        [CovidPeriod::PreCovid, CovidPeriod::PostCovid]
            .into_iter()
            .map(|period| {
                let records: Vec<_> = table.in_period(period).collect();
                if records.is_empty() {
                    warn!("No months fall in the {period} window; means are undefined");
                }
                let volumes: Vec<f64> = records.iter().map(|r| r.record.volume_in_mn).collect();
                let values: Vec<f64> = records.iter().map(|r| r.record.value_in_cr).collect();
                let banks: Vec<f64> = records
                    .iter()
                    .map(|r| f64::from(r.record.banks_live))
                    .collect();
                CovidSummary {
                    period,
                    months: records.len(),
                    mean_volume: Self::mean(&volumes),
                    mean_value: Self::mean(&values),
                    mean_banks: Self::mean(&banks),
                }
            })
            .collect()
    }

    /// Bank count paired with volume for every record.
    pub fn banks_volume_pairs(table: &DerivedTable) -> Vec<(Option<f64>, Option<f64>)> {
        table
            .records
            .iter()
            .map(|r| {
                (
                    Some(f64::from(r.record.banks_live)),
                    Some(r.record.volume_in_mn),
                )
            })
            .collect()
    }

    /// Bank count paired with value for every record.
    pub fn banks_value_pairs(table: &DerivedTable) -> Vec<(Option<f64>, Option<f64>)> {
        table
            .records
            .iter()
            .map(|r| {
                (
                    Some(f64::from(r.record.banks_live)),
                    Some(r.record.value_in_cr),
                )
            })
            .collect()
    }

    pub fn correlation_summary(table: &DerivedTable) -> CorrelationSummary {
        let volume_pairs = Self::banks_volume_pairs(table);
        let value_pairs = Self::banks_value_pairs(table);
        let count = |pairs: &[(Option<f64>, Option<f64>)]| Self::complete_pairs(pairs.iter().copied()).0.len();

        let summary = CorrelationSummary {
            volume_observations: count(&volume_pairs),
            value_observations: count(&value_pairs),
            banks_vs_volume: Self::pearson(volume_pairs),
            banks_vs_value: Self::pearson(value_pairs),
        };
        if summary.banks_vs_volume.is_none() || summary.banks_vs_value.is_none() {
            warn!("Bank-count correlation is undefined for this input");
        }
        summary
    }

    /// Mean volume and value per calendar month, January first.
    pub fn seasonality(table: &DerivedTable) -> SeasonalityTable {
        let mut buckets: [(Vec<f64>, Vec<f64>); 12] = Default::default();
        for r in &table.records {
            let bucket = &mut buckets[(r.month_number - 1) as usize];
            bucket.0.push(r.record.volume_in_mn);
            bucket.1.push(r.record.value_in_cr);
        }

        let months = buckets
            .iter()
            .enumerate()
            .filter(|(_, (volumes, _))| !volumes.is_empty())
            .map(|(i, (volumes, values))| SeasonalMonth {
                month_number: i as u32 + 1,
                month_name: MONTH_NAMES[i],
                observations: volumes.len(),
                mean_volume: volumes.iter().mean(),
                mean_value: values.iter().mean(),
            })
            .collect();
        SeasonalityTable { months }
    }
}
