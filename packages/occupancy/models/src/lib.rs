#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-cycle occupancy aggregate and classification window types.
//!
//! A [`CycleAggregate`] is rebuilt from scratch every sync cycle and never
//! merged with a previous one.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Coarse work area category used for the cross-cutting type totals.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum AreaType {
    /// Type code `1`.
    #[strum(serialize = "1")]
    #[serde(rename = "1")]
    One,
    /// Type code `2`.
    #[strum(serialize = "2")]
    #[serde(rename = "2")]
    Two,
    /// Type code `3`.
    #[strum(serialize = "3")]
    #[serde(rename = "3")]
    Three,
    /// Type code `4`.
    #[strum(serialize = "4")]
    #[serde(rename = "4")]
    Four,
}

impl AreaType {
    /// Parses a raw `typeId`. Codes outside `1`..`4` have no type.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        code.parse().ok()
    }

    /// Zero-based position in [`AreaTypeCounts`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
            Self::Four => 3,
        }
    }
}

/// Person counts per [`AreaType`], indexed by [`AreaType::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTypeCounts(pub [u64; 4]);

impl AreaTypeCounts {
    /// Count for `area_type`.
    #[must_use]
    pub const fn get(&self, area_type: AreaType) -> u64 {
        self.0[area_type.index()]
    }

    /// Increments the count for `area_type`.
    pub fn increment(&mut self, area_type: AreaType) {
        self.0[area_type.index()] += 1;
    }
}

/// Staleness thresholds applied to observation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    /// Records older than this are excluded from occupancy counts.
    pub active: Duration,
    /// Persons older than this are reported as having left the network.
    pub leave: Duration,
}

/// Occupancy counts computed from one location batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAggregate {
    /// In-well persons per area name. Every cached area has a key.
    pub area_person_count: BTreeMap<String, u64>,
    /// In-well persons per department name. Every cached department has a
    /// key.
    pub dept_person_count: BTreeMap<String, u64>,
    /// Records fetched, before staleness filtering.
    pub loc_count: u64,
    /// Active person records underground.
    pub inwell_person_count: u64,
    /// Active person records above ground.
    pub uninwell_person_count: u64,
    /// Active vehicle records.
    pub vehicle_count: u64,
    /// Active vehicle records underground.
    pub inwell_vehicle_count: u64,
    /// Person records older than the leave window.
    pub leave_person_count: u64,
    /// In-well persons per area type.
    pub area_type_counts: AreaTypeCounts,
}

impl CycleAggregate {
    /// Creates an aggregate with a zero entry for every area and
    /// department.
    #[must_use]
    pub fn zeroed<'a>(
        areas: impl IntoIterator<Item = &'a str>,
        departments: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            area_person_count: areas.into_iter().map(|a| (a.to_string(), 0)).collect(),
            dept_person_count: departments
                .into_iter()
                .map(|d| (d.to_string(), 0))
                .collect(),
            ..Self::default()
        }
    }

    /// Sum of the per-area counts.
    #[must_use]
    pub fn area_total(&self) -> u64 {
        self.area_person_count.values().sum()
    }

    /// Sum of the per-department counts.
    #[must_use]
    pub fn department_total(&self) -> u64 {
        self.dept_person_count.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn area_type_codes() {
        assert_eq!(AreaType::from_code("1"), Some(AreaType::One));
        assert_eq!(AreaType::from_code("4"), Some(AreaType::Four));
        assert_eq!(AreaType::from_code("5"), None);
        assert_eq!(AreaType::from_code(""), None);
        assert_eq!(AreaType::Three.to_string(), "3");
    }

    #[test]
    fn indexes_are_dense() {
        let indexes: Vec<usize> = AreaType::iter().map(AreaType::index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn zeroed_has_every_key() {
        let agg = CycleAggregate::zeroed(["A", "B"], ["X"]);
        assert_eq!(agg.area_person_count.get("A"), Some(&0));
        assert_eq!(agg.area_person_count.get("B"), Some(&0));
        assert_eq!(agg.dept_person_count.get("X"), Some(&0));
        assert_eq!(agg.area_total(), 0);
    }
}
