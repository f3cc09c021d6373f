//! Core storage logic for Stowage.
//!
//! This crate contains the object-storage subsystem with ZERO web or database
//! dependencies: one contract, one shared S3-protocol implementation, and the
//! backend selection that wires them together.
//!
//! # Modules
//!
//! - `storage` - Storage contract, S3/R2 backends, provider factory, and facade

pub mod storage;
