//! Shared configuration and telemetry for Stowage.
//!
//! This crate provides the ambient pieces used by the other crates:
//! - Configuration loading from files and `STOWAGE__*` environment variables
//! - Tracing subscriber initialisation

pub mod config;
pub mod telemetry;

pub use config::{AppConfig, StorageSettings, TelemetryConfig};
