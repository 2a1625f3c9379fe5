//! In-memory [`TelemetrySource`].
//!
//! Serves canned responses and can be told to fail individual endpoints.
//! Used by the pipeline tests and for dry runs without a live service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use syncloc_telemetry_models::{Employee, LocationRecord, WorkArea, WorkSite};

use crate::{Endpoint, TelemetryError, TelemetrySource};

#[derive(Debug, Default)]
struct State {
    locations: Vec<LocationRecord>,
    work_areas: Vec<WorkArea>,
    work_sites: Vec<WorkSite>,
    employees: Vec<Employee>,
    failing: BTreeSet<Endpoint>,
    calls: BTreeMap<Endpoint, usize>,
}

/// A [`TelemetrySource`] holding its responses in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<State>,
}

impl MemorySource {
    /// Creates a source that returns empty lists for every endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the location batch.
    pub fn set_locations(&self, locations: Vec<LocationRecord>) {
        self.state().locations = locations;
    }

    /// Replaces the work area list.
    pub fn set_work_areas(&self, work_areas: Vec<WorkArea>) {
        self.state().work_areas = work_areas;
    }

    /// Replaces the site list.
    pub fn set_work_sites(&self, work_sites: Vec<WorkSite>) {
        self.state().work_sites = work_sites;
    }

    /// Replaces the personnel directory.
    pub fn set_employees(&self, employees: Vec<Employee>) {
        self.state().employees = employees;
    }

    /// Makes every subsequent request to `endpoint` fail with a protocol
    /// error until [`Self::recover`] is called.
    pub fn fail(&self, endpoint: Endpoint) {
        self.state().failing.insert(endpoint);
    }

    /// Undoes [`Self::fail`].
    pub fn recover(&self, endpoint: Endpoint) {
        self.state().failing.remove(&endpoint);
    }

    /// Number of requests made to `endpoint`, failed ones included.
    #[must_use]
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state().calls.get(&endpoint).copied().unwrap_or(0)
    }

    fn serve<T: Clone>(
        &self,
        endpoint: Endpoint,
        pick: impl FnOnce(&State) -> &Vec<T>,
    ) -> Result<Vec<T>, TelemetryError> {
        let mut state = self.state();
        *state.calls.entry(endpoint).or_insert(0) += 1;
        if state.failing.contains(&endpoint) {
            return Err(TelemetryError::Protocol {
                endpoint: endpoint.path().to_string(),
                message: "endpoint unavailable".to_string(),
            });
        }
        Ok(pick(&*state).clone())
    }
}

#[async_trait]
impl TelemetrySource for MemorySource {
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, TelemetryError> {
        self.serve(Endpoint::Locations, |s| &s.locations)
    }

    async fn fetch_work_areas(&self) -> Result<Vec<WorkArea>, TelemetryError> {
        self.serve(Endpoint::WorkAreas, |s| &s.work_areas)
    }

    async fn fetch_work_sites(&self) -> Result<Vec<WorkSite>, TelemetryError> {
        self.serve(Endpoint::WorkSites, |s| &s.work_sites)
    }

    async fn fetch_employees(&self) -> Result<Vec<Employee>, TelemetryError> {
        self.serve(Endpoint::Employees, |s| &s.employees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_endpoint_counts_calls_and_recovers() {
        let source = MemorySource::new();
        source.set_work_areas(vec![WorkArea {
            name: "North".to_string(),
            ..WorkArea::default()
        }]);
        source.fail(Endpoint::WorkAreas);

        let err = source.fetch_work_areas().await.unwrap_err();
        assert_eq!(err.endpoint(), Endpoint::WorkAreas.path());

        source.recover(Endpoint::WorkAreas);
        let areas = source.fetch_work_areas().await.unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(source.calls(Endpoint::WorkAreas), 2);
        assert_eq!(source.calls(Endpoint::Locations), 0);
    }
}
