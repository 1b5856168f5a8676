//! # ODB Rust Backend
//!
//! Core engine of an astronomy observatory database: takes a science
//! observation (target, observing conditions, instrument configuration)
//! and produces, records, and time-accounts the sequence of exposures
//! needed to carry it out on a telescope.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`models`]: Type algebra and domain model (identifiers, time types,
//!   quantities, observations, instrument configuration)
//! - [`sequence`]: Sequence generation, Smart GCAL expansion, per-step
//!   time estimation, and the execution digest
//! - [`execution`]: Event vocabulary and the execution recorder
//! - [`accounting`]: Interval algebra, discounts, corrections, invoices
//! - [`workflow`]: Observation workflow state resolution
//! - [`itc`]: Integration Time Calculator oracle
//! - [`db`]: Repository pattern and persistence abstractions
//! - [`services`]: High-level orchestration over the repository
//! - [`http`]: Axum-based REST API
//!
//! The pure core (sequence, accounting, workflow) never touches I/O; the
//! service layer combines it with the repository, and the HTTP layer is a
//! thin shell over the services.

pub mod accounting;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
#[cfg(feature = "http-server")]
pub mod http;
pub mod itc;
pub mod models;
pub mod sequence;
pub mod services;
pub mod workflow;
