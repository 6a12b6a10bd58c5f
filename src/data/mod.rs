//! Data module - CSV loading and derivation

mod loader;
mod processor;

pub use loader::{CleanedRecord, CleanedTable, DataLoader};
pub use processor::{
    CovidPeriod, DataProcessor, DerivedTable, YearlyTable, MONTH_NAMES,
};
