//! Data Processor Module
//! Derives yearly aggregates, COVID-period labels, per-bank ratios and
//! calendar-month fields from the cleaned table.

use crate::config::CovidWindows;
use crate::data::loader::{CleanedRecord, CleanedTable};
use chrono::{Datelike, NaiveDate};
use log::info;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// COVID-period label for a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CovidPeriod {
    PreCovid,
    PostCovid,
    /// Outside both windows, including the lockdown gap between them.
    Unlabeled,
}

impl CovidPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            CovidPeriod::PreCovid => "Pre-COVID",
            CovidPeriod::PostCovid => "Post-COVID",
            CovidPeriod::Unlabeled => "Unlabeled",
        }
    }

    /// Label a month against fixed, inclusive windows.
    pub fn classify(date: NaiveDate, windows: &CovidWindows) -> Self {
        if date >= windows.pre_start && date <= windows.pre_end {
            CovidPeriod::PreCovid
        } else if date >= windows.post_start {
            CovidPeriod::PostCovid
        } else {
            CovidPeriod::Unlabeled
        }
    }
}

impl fmt::Display for CovidPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A cleaned month plus every per-row derived field.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub record: CleanedRecord,
    pub period: CovidPeriod,
    /// `None` when no banks were live.
    pub volume_per_bank: Option<f64>,
    pub value_per_bank: Option<f64>,
    pub month_name: &'static str,
    pub month_number: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedTable {
    pub records: Vec<DerivedRecord>,
}

impl DerivedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in a given period, in table order.
    pub fn in_period(&self, period: CovidPeriod) -> impl Iterator<Item = &DerivedRecord> {
        self.records.iter().filter(move |r| r.period == period)
    }
}

/// Totals for one calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyAggregate {
    pub year: i32,
    pub months: usize,
    pub total_volume: f64,
    pub total_value: f64,
    /// Percent change vs. the previous year; `None` for the first year.
    pub volume_yoy_growth: Option<f64>,
    pub value_yoy_growth: Option<f64>,
}

impl YearlyAggregate {
    /// Fewer than twelve months contributed.
    pub fn is_partial(&self) -> bool {
        self.months < 12
    }
}

/// Direction in which uneven month coverage skews a growth figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthBias {
    /// Fewer months than the previous year.
    Understated,
    /// More months than the previous year.
    Overstated,
}

impl GrowthBias {
    pub fn label(&self) -> &'static str {
        match self {
            GrowthBias::Understated => "understated",
            GrowthBias::Overstated => "overstated",
        }
    }
}

/// A year whose growth figure compares a different number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageNote {
    pub year: i32,
    pub months: usize,
    pub previous_year: i32,
    pub previous_months: usize,
    pub bias: GrowthBias,
}

impl fmt::Display for CoverageNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} growth is {} ({} vs {} in {})",
            self.year,
            self.bias.label(),
            month_count(self.months),
            month_count(self.previous_months),
            self.previous_year
        )
    }
}

fn month_count(months: usize) -> String {
    if months == 1 {
        "1 month".to_string()
    } else {
        format!("{months} months")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearlyTable {
    pub years: Vec<YearlyAggregate>,
}

impl YearlyTable {
    pub fn partial_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|y| y.is_partial())
            .map(|y| y.year)
            .collect()
    }

    /// Coverage note for the year at `index`. The first year has no growth
    /// to skew, and years covering as many months as the one before get none.
    pub fn coverage_note(&self, index: usize) -> Option<CoverageNote> {
        let current = self.years.get(index)?;
        let previous = self.years.get(index.checked_sub(1)?)?;
        let bias = match current.months.cmp(&previous.months) {
            Ordering::Less => GrowthBias::Understated,
            Ordering::Greater => GrowthBias::Overstated,
            Ordering::Equal => return None,
        };
        Some(CoverageNote {
            year: current.year,
            months: current.months,
            previous_year: previous.year,
            previous_months: previous.months,
            bias,
        })
    }
}

/// Pure derivation functions over the cleaned table.
pub struct DataProcessor;

impl DataProcessor {
    /// Sum volume and value per calendar year with year-over-year growth.
    pub fn yearly_aggregate(table: &CleanedTable) -> YearlyTable {
        let mut by_year: BTreeMap<i32, (usize, f64, f64)> = BTreeMap::new();
        for r in &table.records {
            let entry = by_year.entry(r.month.year()).or_insert((0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += r.volume_in_mn;
            entry.2 += r.value_in_cr;
        }

        let mut years: Vec<YearlyAggregate> = Vec::with_capacity(by_year.len());
        for (year, (months, total_volume, total_value)) in by_year {
            let (volume_yoy_growth, value_yoy_growth) = match years.last() {
                Some(p) => (
                    pct_change(p.total_volume, total_volume),
                    pct_change(p.total_value, total_value),
                ),
                None => (None, None),
            };
            years.push(YearlyAggregate {
                year,
                months,
                total_volume,
                total_value,
                volume_yoy_growth,
                value_yoy_growth,
            });
        }

        info!("Aggregated {} years", years.len());
        YearlyTable { years }
    }

    /// Attach period label, per-bank ratios and calendar month to each record.
    pub fn derive(table: &CleanedTable, windows: &CovidWindows) -> DerivedTable {
        let records = table
            .records
            .iter()
            .map(|r| {
                let month_number = r.month.month();
                DerivedRecord {
                    record: r.clone(),
                    period: CovidPeriod::classify(r.month, windows),
                    volume_per_bank: per_bank(r.volume_in_mn, r.banks_live),
                    value_per_bank: per_bank(r.value_in_cr, r.banks_live),
                    month_name: MONTH_NAMES[(month_number - 1) as usize],
                    month_number,
                }
            })
            .collect();
        DerivedTable { records }
    }
}

/// `(current / previous - 1) * 100`, undefined for a zero previous total.
pub fn pct_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current / previous - 1.0) * 100.0)
    }
}

/// Metric divided by live bank count, undefined when no banks were live.
pub fn per_bank(amount: f64, banks: u32) -> Option<f64> {
    if banks == 0 {
        None
    } else {
        Some(amount / f64::from(banks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn record(y: i32, m: u32, volume: f64, value: f64, banks: u32) -> CleanedRecord {
        CleanedRecord {
            month: date(y, m),
            volume_in_mn: volume,
            value_in_cr: value,
            banks_live: banks,
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a value");
        assert!(
            (actual - expected).abs() < 1e-9,
            "{actual} != {expected}"
        );
    }

    #[test]
    fn yoy_growth_against_previous_year() {
        let table = CleanedTable {
            records: vec![
                record(2019, 1, 100.0, 1000.0, 1),
                record(2020, 1, 150.0, 1500.0, 1),
                record(2021, 1, 120.0, 1200.0, 1),
            ],
        };
        let yearly = DataProcessor::yearly_aggregate(&table);
        let years: Vec<i32> = yearly.years.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);

        assert_eq!(yearly.years[0].volume_yoy_growth, None);
        assert_eq!(yearly.years[0].value_yoy_growth, None);
        assert_close(yearly.years[1].volume_yoy_growth, 50.0);
        assert_close(yearly.years[2].volume_yoy_growth, -20.0);
        assert_close(yearly.years[2].value_yoy_growth, -20.0);
    }

    #[test]
    fn yearly_sums_and_partial_years() {
        let mut records: Vec<CleanedRecord> =
            (1..=12).map(|m| record(2021, m, 1.0, 2.0, 3)).collect();
        records.push(record(2022, 1, 5.0, 5.0, 3));
        records.push(record(2022, 2, 5.0, 5.0, 3));

        let yearly = DataProcessor::yearly_aggregate(&CleanedTable { records });
        assert_eq!(yearly.years[0].total_volume, 12.0);
        assert_eq!(yearly.years[0].total_value, 24.0);
        assert!(!yearly.years[0].is_partial());
        assert_eq!(yearly.years[1].months, 2);
        assert_eq!(yearly.partial_years(), vec![2022]);
        assert_close(yearly.years[1].volume_yoy_growth, (10.0 / 12.0 - 1.0) * 100.0);
    }

    #[test]
    fn partial_first_year_overstates_the_next() {
        let mut records: Vec<CleanedRecord> =
            (4..=12).map(|m| record(2016, m, 1.0, 1.0, 1)).collect();
        records.extend((1..=12).map(|m| record(2017, m, 2.0, 2.0, 1)));
        records.push(record(2018, 1, 3.0, 3.0, 1));

        let yearly = DataProcessor::yearly_aggregate(&CleanedTable { records });
        assert_eq!(yearly.partial_years(), vec![2016, 2018]);
        assert_eq!(yearly.coverage_note(0), None);

        let note = yearly.coverage_note(1).expect("2017 note");
        assert_eq!(note.bias, GrowthBias::Overstated);
        assert_eq!(note.to_string(), "2017 growth is overstated (12 months vs 9 in 2016)");

        let note = yearly.coverage_note(2).expect("2018 note");
        assert_eq!(note.bias, GrowthBias::Understated);
        assert_eq!(note.to_string(), "2018 growth is understated (1 month vs 12 in 2017)");
        assert_eq!(yearly.coverage_note(3), None);
    }

    #[test]
    fn equal_coverage_has_no_note() {
        let table = CleanedTable {
            records: vec![
                record(2016, 4, 1.0, 1.0, 1),
                record(2016, 5, 1.0, 1.0, 1),
                record(2017, 1, 5.0, 5.0, 1),
                record(2017, 12, 5.0, 5.0, 1),
            ],
        };
        let yearly = DataProcessor::yearly_aggregate(&table);
        assert_eq!(yearly.coverage_note(0), None);
        assert_eq!(yearly.coverage_note(1), None);
    }

    #[test]
    fn unordered_input_is_grouped_by_year() {
        let table = CleanedTable {
            records: vec![
                record(2021, 3, 4.0, 0.0, 1),
                record(2020, 3, 2.0, 0.0, 1),
                record(2021, 1, 4.0, 0.0, 1),
            ],
        };
        let yearly = DataProcessor::yearly_aggregate(&table);
        assert_eq!(yearly.years[0].year, 2020);
        assert_close(yearly.years[1].volume_yoy_growth, 300.0);
    }

    #[test]
    fn zero_previous_total_has_no_growth() {
        assert_eq!(pct_change(0.0, 10.0), None);
        assert_eq!(pct_change(10.0, 10.0), Some(0.0));
    }

    #[test]
    fn per_bank_ratio_guards_zero_banks() {
        assert_eq!(per_bank(1000.0, 10), Some(100.0));
        assert_eq!(per_bank(1000.0, 0), None);

        let table = CleanedTable {
            records: vec![record(2021, 1, 1000.0, 50.0, 0)],
        };
        let derived = DataProcessor::derive(&table, &CovidWindows::default());
        assert_eq!(derived.records[0].volume_per_bank, None);
        assert_eq!(derived.records[0].value_per_bank, None);
    }

    #[test]
    fn covid_windows_are_inclusive_with_a_gap() {
        let w = CovidWindows::default();
        assert_eq!(CovidPeriod::classify(date(2018, 3), &w), CovidPeriod::Unlabeled);
        assert_eq!(CovidPeriod::classify(date(2018, 4), &w), CovidPeriod::PreCovid);
        assert_eq!(CovidPeriod::classify(date(2020, 2), &w), CovidPeriod::PreCovid);
        assert_eq!(CovidPeriod::classify(date(2020, 3), &w), CovidPeriod::Unlabeled);
        assert_eq!(CovidPeriod::classify(date(2020, 5), &w), CovidPeriod::Unlabeled);
        assert_eq!(CovidPeriod::classify(date(2020, 6), &w), CovidPeriod::PostCovid);
        assert_eq!(CovidPeriod::classify(date(2023, 1), &w), CovidPeriod::PostCovid);
    }

    #[test]
    fn month_fields_follow_the_date() {
        let table = CleanedTable {
            records: vec![record(2021, 9, 1.0, 1.0, 1), record(2020, 1, 1.0, 1.0, 1)],
        };
        let derived = DataProcessor::derive(&table, &CovidWindows::default());
        assert_eq!(derived.records[0].month_name, "September");
        assert_eq!(derived.records[0].month_number, 9);
        assert_eq!(derived.records[1].month_name, "January");
        assert_eq!(derived.records[1].month_number, 1);
    }

    #[test]
    fn derivation_is_repeatable() {
        let table = CleanedTable {
            records: (1..=6).map(|m| record(2020, m, m as f64, 2.0, m)).collect(),
        };
        let w = CovidWindows::default();
        assert_eq!(DataProcessor::derive(&table, &w), DataProcessor::derive(&table, &w));
        assert_eq!(
            DataProcessor::yearly_aggregate(&table),
            DataProcessor::yearly_aggregate(&table)
        );
    }
}
