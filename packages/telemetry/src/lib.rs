#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the location tracking service.
//!
//! The service exposes four fixed POST endpoints. Each answers with an XML
//! document whose root element wraps a JSON payload of the form
//! `{"Code": "1", "Message": "...", "result": [...]}`. The [`client`]
//! module handles the transport, [`envelope`] the two layers of decoding.
//!
//! Consumers depend on the [`TelemetrySource`] trait rather than the
//! concrete [`client::RemoteClient`] so the aggregation pipeline can run
//! against [`memory::MemorySource`] in tests.

pub mod client;
pub mod envelope;
pub mod memory;
pub mod time;

use async_trait::async_trait;
use syncloc_telemetry_models::{Employee, LocationRecord, WorkArea, WorkSite};

/// Errors that can occur while talking to the tracking service.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Connection, timeout, or body read failure.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path or base address involved.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The envelope could not be decoded or the service reported failure.
    #[error("Protocol error from {endpoint}: {message}")]
    Protocol {
        /// Endpoint path.
        endpoint: String,
        /// Remote message or description of the malformed envelope.
        message: String,
    },

    /// The `result` payload did not match the expected record shape.
    #[error("Failed to decode result from {endpoint}: {source}")]
    Decode {
        /// Endpoint path.
        endpoint: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl TelemetryError {
    /// The endpoint (or base address) the error relates to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Protocol { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// The four requests the tracking service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    /// Current location of every tag.
    Locations,
    /// Monitoring sites and their owning areas.
    WorkSites,
    /// Work areas.
    WorkAreas,
    /// Personnel directory.
    Employees,
}

impl Endpoint {
    /// Path relative to the service base address.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Locations => "/KjtxLocService.asmx/GetLocStatusInfo",
            Self::WorkSites => "/KjtxBaseDataService.asmx/GetWorkSiteInfo",
            Self::WorkAreas => "/KjtxBaseDataService.asmx/GetWorkArea",
            Self::Employees => "/KjtxBaseDataService.asmx/GetEmployeeInfo",
        }
    }

    /// Form-encoded request body. Every filter is sent empty so the service
    /// returns the full list.
    #[must_use]
    pub const fn form_body(self) -> &'static str {
        match self {
            Self::Locations => "CardNum=&CardType=",
            Self::WorkSites => "number=&workAreaName=",
            Self::WorkAreas => "",
            Self::Employees => "CardNum=&departmentName=&typeOfWorkName=&officePosition=",
        }
    }
}

/// Typed access to the tracking service.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetches the current location of every tag.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if the request or decoding fails.
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, TelemetryError>;

    /// Fetches all work areas.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if the request or decoding fails.
    async fn fetch_work_areas(&self) -> Result<Vec<WorkArea>, TelemetryError>;

    /// Fetches all monitoring sites.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if the request or decoding fails.
    async fn fetch_work_sites(&self) -> Result<Vec<WorkSite>, TelemetryError>;

    /// Fetches the personnel directory.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if the request or decoding fails.
    async fn fetch_employees(&self) -> Result<Vec<Employee>, TelemetryError>;
}
