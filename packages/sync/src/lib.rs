#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Periodic location sync.
//!
//! Each cycle fetches the current location batch, refreshes the reference
//! cache when the batch mentions unknown sites or cards, aggregates
//! occupancy and replaces the snapshot table. See [`pipeline::Pipeline`]
//! and [`scheduler::Scheduler`].

pub mod clock;
pub mod config;
pub mod pipeline;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError};
pub use pipeline::{CycleReport, Pipeline, PipelineSettings, SyncError};
pub use scheduler::Scheduler;
