//! Per-cycle occupancy aggregation.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use syncloc_occupancy_models::{AreaType, CycleAggregate, Windows};
use syncloc_telemetry::time::parse_dev_time;
use syncloc_telemetry_models::LocationRecord;

use crate::cache::ReferenceCache;

/// Counts one location batch against the cached reference data.
///
/// Per record, in order:
///
/// 1. A person older than `windows.leave` counts as having left the
///    network. This does not exclude the record.
/// 2. A record older than `windows.active` is dropped.
/// 3. Surviving records are classified as in-well person (resolved to an
///    area, area type, and department), vehicle, or above-ground person.
///
/// A timestamp that cannot be parsed counts as older than any window.
/// Every cached area and department appears in the result, zero if idle.
#[must_use]
pub fn aggregate(
    locations: &[LocationRecord],
    cache: &ReferenceCache,
    now: NaiveDateTime,
    windows: Windows,
) -> CycleAggregate {
    let mut agg = CycleAggregate::zeroed(
        cache.areas().iter().map(|a| a.name.as_str()),
        cache.departments().iter().map(String::as_str),
    );
    agg.loc_count = locations.len() as u64;

    for loc in locations {
        let age = parse_dev_time(&loc.dev_time).map(|t| now.signed_duration_since(t));

        if loc.is_person() && exceeds(age, windows.leave) {
            agg.leave_person_count += 1;
        }

        if exceeds(age, windows.active) {
            log::debug!(
                "Location outside active window: card={} devTime={:?}",
                loc.card_number,
                loc.dev_time
            );
            continue;
        }

        match (loc.is_person(), loc.is_inwell()) {
            (true, true) => {
                agg.inwell_person_count += 1;
                count_area(&mut agg, cache, loc);
                count_department(&mut agg, cache, loc);
            }
            (false, inwell) => {
                agg.vehicle_count += 1;
                if inwell {
                    agg.inwell_vehicle_count += 1;
                }
            }
            (true, false) => agg.uninwell_person_count += 1,
        }
    }

    agg
}

fn count_area(agg: &mut CycleAggregate, cache: &ReferenceCache, loc: &LocationRecord) {
    let Some(area_name) = cache.area_of_site(&loc.site_code) else {
        log::warn!("Site not found: {}", loc.site_code);
        return;
    };

    let Some(count) = agg.area_person_count.get_mut(area_name) else {
        log::warn!(
            "Site {} points at unknown area: {area_name}",
            loc.site_code
        );
        return;
    };
    *count += 1;

    if let Some(area_type) = cache
        .area(area_name)
        .and_then(|area| AreaType::from_code(&area.type_id))
    {
        agg.area_type_counts.increment(area_type);
    }
}

fn count_department(agg: &mut CycleAggregate, cache: &ReferenceCache, loc: &LocationRecord) {
    let Some(department) = cache.department_of(&loc.card_number) else {
        log::warn!("Department not found for card: {}", loc.card_number);
        return;
    };

    if let Some(count) = agg.dept_person_count.get_mut(department) {
        *count += 1;
    }
}

fn exceeds(age: Option<TimeDelta>, window: Duration) -> bool {
    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    age.is_none_or(|age| age > window)
}
