//! One sync cycle: fetch, refresh, aggregate, persist.

use std::sync::Arc;

use chrono::NaiveDateTime;
use syncloc_database::{AreaColumn, ColumnLimits, DbError, Reference, Snapshot, SnapshotSink};
use syncloc_occupancy::{ReferenceCache, RefreshOutcome, aggregate};
use syncloc_occupancy_models::{CycleAggregate, Windows};
use syncloc_telemetry::{TelemetryError, TelemetrySource};

use crate::clock::Clock;

/// Errors that abort a single cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The location batch could not be fetched.
    #[error(transparent)]
    Fetch(#[from] TelemetryError),

    /// The snapshot could not be written.
    #[error(transparent)]
    Persist(#[from] DbError),
}

impl SyncError {
    /// Pipeline stage that failed.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Persist(_) => "persist",
        }
    }
}

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Time the batch was aged against and the snapshot stamped with.
    pub at: NaiveDateTime,
    /// Which reference indexes were reloaded.
    pub refresh: RefreshOutcome,
    /// Counts written to the sink.
    pub aggregate: CycleAggregate,
    /// Width of the written snapshot.
    pub columns: usize,
}

/// Fixed parameters of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Staleness windows.
    pub windows: Windows,
    /// Snapshot column limits.
    pub limits: ColumnLimits,
}

/// Owns everything a cycle needs. The reference cache lives across cycles.
pub struct Pipeline {
    source: Arc<dyn TelemetrySource>,
    sink: Arc<dyn SnapshotSink>,
    clock: Arc<dyn Clock>,
    cache: ReferenceCache,
    settings: PipelineSettings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with an empty reference cache.
    #[must_use]
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        sink: Arc<dyn SnapshotSink>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            sink,
            clock,
            cache: ReferenceCache::new(),
            settings,
        }
    }

    /// Current reference data.
    #[must_use]
    pub const fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Runs one cycle.
    ///
    /// Reference reload failures are logged and do not fail the cycle. A
    /// failed write leaves the refreshed cache in place.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fetch`] if the location batch cannot be fetched
    /// and [`SyncError::Persist`] if the snapshot cannot be written.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
        let locations = self.source.fetch_locations().await?;
        log::debug!("Fetched {} locations", locations.len());

        let refresh = self.cache.refresh(self.source.as_ref(), &locations).await;

        let at = self.clock.now();
        let aggregate = aggregate(&locations, &self.cache, at, self.settings.windows);

        let areas: Vec<AreaColumn<'_>> = self
            .cache
            .areas()
            .iter()
            .map(|area| AreaColumn {
                id: &area.id,
                name: &area.name,
            })
            .collect();
        let departments: Vec<&str> = self.cache.departments().iter().map(String::as_str).collect();

        let snapshot = Snapshot::build(
            &aggregate,
            Reference {
                areas: &areas,
                departments: &departments,
                site_count: self.cache.site_count(),
            },
            self.settings.limits,
            at,
        );

        self.sink.replace(&snapshot).await?;

        log::info!(
            "Cycle at {at}: {} locations, {} in-well persons ({} by area, {} by department), \
             {} above ground, {} vehicles ({} in-well), {} left network",
            aggregate.loc_count,
            aggregate.inwell_person_count,
            aggregate.area_total(),
            aggregate.department_total(),
            aggregate.uninwell_person_count,
            aggregate.vehicle_count,
            aggregate.inwell_vehicle_count,
            aggregate.leave_person_count,
        );

        Ok(CycleReport {
            at,
            refresh,
            aggregate,
            columns: snapshot.columns().len(),
        })
    }
}
