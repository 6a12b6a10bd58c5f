//! Report Configuration Module
//! Input/output locations, chart sizes and COVID window boundaries.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("COVID pre-window ends ({pre_end}) after the post-window starts ({post_start})")]
    OverlappingWindows {
        pre_end: NaiveDate,
        post_start: NaiveDate,
    },
    #[error("COVID pre-window starts ({pre_start}) after it ends ({pre_end})")]
    InvertedWindow {
        pre_start: NaiveDate,
        pre_end: NaiveDate,
    },
    #[error("Chart size must be non-zero, got {0}x{1}")]
    ChartSize(u32, u32),
}

/// Fixed date windows used to label months as pre- or post-COVID.
///
/// Both windows are inclusive. The post window is open-ended. Months between
/// `pre_end` and `post_start` form the lockdown gap and get no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CovidWindows {
    pub pre_start: NaiveDate,
    pub pre_end: NaiveDate,
    pub post_start: NaiveDate,
}

impl Default for CovidWindows {
    fn default() -> Self {
        Self {
            pre_start: NaiveDate::from_ymd_opt(2018, 4, 1).unwrap_or_default(),
            pre_end: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap_or_default(),
            post_start: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or_default(),
        }
    }
}

/// Settings for one report run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
    pub covid: CovidWindows,
    pub open_when_done: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/upi_monthly.csv"),
            output_path: PathBuf::from("upi_report.pptx"),
            chart_width: 1200,
            chart_height: 700,
            covid: CovidWindows::default(),
            open_when_done: false,
        }
    }
}

impl ReportConfig {
    /// Load settings from a JSON file, or use defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from JSON text. Missing keys fall back to defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.covid;
        if w.pre_start > w.pre_end {
            return Err(ConfigError::InvertedWindow {
                pre_start: w.pre_start,
                pre_end: w.pre_end,
            });
        }
        if w.pre_end >= w.post_start {
            return Err(ConfigError::OverlappingWindows {
                pre_end: w.pre_end,
                post_start: w.post_start,
            });
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(ConfigError::ChartSize(self.chart_width, self.chart_height));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_lockdown_gap() {
        let w = CovidWindows::default();
        assert_eq!(w.pre_start, NaiveDate::from_ymd_opt(2018, 4, 1).unwrap());
        assert_eq!(w.pre_end, NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
        assert_eq!(w.post_start, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert!(ReportConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ReportConfig::from_json(r#"{"output_path": "out/deck.pptx"}"#).unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/deck.pptx"));
        assert_eq!(config.input_path, PathBuf::from("data/upi_monthly.csv"));
        assert_eq!(config.chart_width, 1200);
        assert_eq!(config.covid, CovidWindows::default());
    }

    #[test]
    fn covid_windows_from_json() {
        let config = ReportConfig::from_json(
            r#"{"covid": {"pre_start": "2019-01-01", "pre_end": "2019-12-01", "post_start": "2021-01-01"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.covid.post_start,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
    }

    #[test]
    fn partial_covid_windows_keep_other_defaults() {
        let config = ReportConfig::from_json(r#"{"covid": {"post_start": "2020-07-01"}}"#).unwrap();
        let defaults = CovidWindows::default();
        assert_eq!(
            config.covid.post_start,
            NaiveDate::from_ymd_opt(2020, 7, 1).unwrap()
        );
        assert_eq!(config.covid.pre_start, defaults.pre_start);
        assert_eq!(config.covid.pre_end, defaults.pre_end);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlapping_windows_rejected() {
        let mut config = ReportConfig::default();
        config.covid.post_start = config.covid.pre_end;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingWindows { .. })
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ReportConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
