// src/lib.rs

//! meter-sync Library
//!
//! Pulls the parking meter dataset page by page from the open data API,
//! normalizes every row and upserts the result into a document store.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
