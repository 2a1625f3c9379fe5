#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference data cache and per-cycle occupancy aggregation.
//!
//! [`cache::ReferenceCache`] holds the site→area and card→department
//! mappings and reloads them lazily when a batch references something it
//! has not seen. [`aggregate::aggregate`] turns one location batch into a
//! [`syncloc_occupancy_models::CycleAggregate`].

pub mod aggregate;
pub mod cache;

pub use aggregate::aggregate;
pub use cache::{AreaIndex, DepartmentIndex, ReferenceCache, RefreshOutcome, ReloadStatus};
