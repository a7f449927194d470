//! Service layer for the sync application.
//!
//! This module contains the business logic for:
//! - Free-text field parsing (`parse_meter_rules`, `derive_facility`)
//! - Row normalization (`Normalizer`)
//! - Reading the open data API (`OpenDataClient`)

mod fields;
mod normalizer;
mod source;

pub use fields::{
    Facility, MeterRules, SkipReason, derive_facility, ordinal_suffix, parse_meter_rules,
    title_case,
};
pub use normalizer::{NormalizedPage, Normalizer};
pub use source::{MeterSource, OpenDataClient};
