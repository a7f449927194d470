// src/models/mod.rs

//! Domain models for the sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod meter;

// Re-export all public types
pub use config::{Config, SourceConfig, StoreConfig, SyncConfig};
pub use meter::{ActiveDays, ActiveHours, MeterRecord, Point, RawMeter, VehicleType};
