//! Reference data cache.
//!
//! Two independent indexes are held: [`AreaIndex`] (areas and the
//! site→area mapping) and [`DepartmentIndex`] (card→department mapping and
//! the department list). Each is rebuilt as a whole from freshly fetched
//! data and swapped in only when every fetch it needs succeeded, so a
//! failed reload leaves the previous index fully usable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use syncloc_telemetry::{TelemetryError, TelemetrySource};
use syncloc_telemetry_models::{Employee, LocationRecord, WorkArea, WorkSite};

/// Work areas in display order plus the site→area mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaIndex {
    areas: Vec<WorkArea>,
    by_name: BTreeMap<String, usize>,
    site_to_area: BTreeMap<String, String>,
    site_count: usize,
}

impl AreaIndex {
    /// Builds an index from fetched areas and sites.
    ///
    /// Areas are ordered by [`compare_area_ids`]. When two areas share a
    /// name, the later one in that order wins the name lookup.
    #[must_use]
    pub fn build(mut areas: Vec<WorkArea>, sites: &[WorkSite]) -> Self {
        areas.sort_by(|a, b| compare_area_ids(&a.id, &b.id));

        let by_name = areas
            .iter()
            .enumerate()
            .map(|(i, area)| (area.name.clone(), i))
            .collect();

        let site_to_area = sites
            .iter()
            .map(|site| (site.number.clone(), site.work_area_name.clone()))
            .collect();

        Self {
            areas,
            by_name,
            site_to_area,
            site_count: sites.len(),
        }
    }
}

/// Orders area ids numerically when both parse as integers.
///
/// Numeric ids sort before non-numeric ones, which sort lexically, so the
/// order stays total for mixed id sets.
#[must_use]
pub fn compare_area_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Card→department mapping plus the sorted, de-duplicated department list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentIndex {
    department_of: BTreeMap<String, String>,
    departments: Vec<String>,
}

impl DepartmentIndex {
    /// Builds an index from the personnel directory. A card listed twice
    /// maps to the department of its last entry.
    #[must_use]
    pub fn build(employees: &[Employee]) -> Self {
        let department_of = employees
            .iter()
            .map(|e| (e.card_number.clone(), e.department.clone()))
            .collect();

        let departments = employees
            .iter()
            .map(|e| e.department.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            department_of,
            departments,
        }
    }
}

/// What happened to one index during [`ReferenceCache::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    /// The batch referenced nothing new.
    Skipped,
    /// The index was rebuilt.
    Reloaded,
    /// A fetch failed and the previous index was kept.
    Failed,
}

/// Result of [`ReferenceCache::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Area and site index.
    pub areas: ReloadStatus,
    /// Department index.
    pub departments: ReloadStatus,
}

/// Cached reference data used to resolve location records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCache {
    areas: AreaIndex,
    departments: DepartmentIndex,
}

impl ReferenceCache {
    /// Creates an empty cache. The first batch will trigger both reloads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache from prebuilt indexes.
    #[must_use]
    pub const fn from_parts(areas: AreaIndex, departments: DepartmentIndex) -> Self {
        Self { areas, departments }
    }

    /// Whether any record's site code is missing from the site→area map.
    #[must_use]
    pub fn needs_area_reload(&self, locations: &[LocationRecord]) -> bool {
        locations
            .iter()
            .any(|loc| !self.areas.site_to_area.contains_key(&loc.site_code))
    }

    /// Whether any in-well person's card is missing from the
    /// card→department map.
    #[must_use]
    pub fn needs_department_reload(&self, locations: &[LocationRecord]) -> bool {
        locations.iter().any(|loc| {
            loc.is_person()
                && loc.is_inwell()
                && !self.departments.department_of.contains_key(&loc.card_number)
        })
    }

    /// Fetches areas and sites and replaces the area index.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error. The current index is left untouched.
    pub async fn reload_areas(&mut self, source: &dyn TelemetrySource) -> Result<(), TelemetryError> {
        let areas = source.fetch_work_areas().await?;
        let sites = source.fetch_work_sites().await?;
        log::info!(
            "Loaded {} work areas and {} sites",
            areas.len(),
            sites.len()
        );
        self.areas = AreaIndex::build(areas, &sites);
        Ok(())
    }

    /// Fetches the personnel directory and replaces the department index.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The current index is left untouched.
    pub async fn reload_departments(
        &mut self,
        source: &dyn TelemetrySource,
    ) -> Result<(), TelemetryError> {
        let employees = source.fetch_employees().await?;
        let index = DepartmentIndex::build(&employees);
        log::info!(
            "Loaded {} employees in {} departments",
            employees.len(),
            index.departments.len()
        );
        self.departments = index;
        Ok(())
    }

    /// Reloads whichever index the batch shows to be out of date.
    ///
    /// Reload failures are logged and reported in the outcome; the cycle
    /// carries on with the previous data.
    pub async fn refresh(
        &mut self,
        source: &dyn TelemetrySource,
        locations: &[LocationRecord],
    ) -> RefreshOutcome {
        let areas = if self.needs_area_reload(locations) {
            match self.reload_areas(source).await {
                Ok(()) => ReloadStatus::Reloaded,
                Err(e) => {
                    log::warn!("Failed to reload work areas: {e}");
                    ReloadStatus::Failed
                }
            }
        } else {
            ReloadStatus::Skipped
        };

        let departments = if self.needs_department_reload(locations) {
            match self.reload_departments(source).await {
                Ok(()) => ReloadStatus::Reloaded,
                Err(e) => {
                    log::warn!("Failed to reload departments: {e}");
                    ReloadStatus::Failed
                }
            }
        } else {
            ReloadStatus::Skipped
        };

        RefreshOutcome { areas, departments }
    }

    /// Name of the area owning `site_code`.
    #[must_use]
    pub fn area_of_site(&self, site_code: &str) -> Option<&str> {
        self.areas.site_to_area.get(site_code).map(String::as_str)
    }

    /// Area named `name`.
    #[must_use]
    pub fn area(&self, name: &str) -> Option<&WorkArea> {
        self.areas
            .by_name
            .get(name)
            .and_then(|&i| self.areas.areas.get(i))
    }

    /// Department of the employee carrying `card_number`.
    #[must_use]
    pub fn department_of(&self, card_number: &str) -> Option<&str> {
        self.departments
            .department_of
            .get(card_number)
            .map(String::as_str)
    }

    /// Areas in display order.
    #[must_use]
    pub fn areas(&self) -> &[WorkArea] {
        &self.areas.areas
    }

    /// Departments, sorted.
    #[must_use]
    pub fn departments(&self) -> &[String] {
        &self.departments.departments
    }

    /// Number of sites in the last successful site fetch.
    #[must_use]
    pub const fn site_count(&self) -> usize {
        self.areas.site_count
    }
}
