//! Case normalization, scoring and filtering behind the onbid auction dashboard.

pub mod auction;
pub mod config;
pub mod error;
pub mod telemetry;
