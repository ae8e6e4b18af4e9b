//! External stop-location reference table and the location comparison.

use std::collections::HashMap;

use geo::HaversineDistance;

use crate::config::STOP_DISTANCE_THRESHOLD_M;
use crate::stop::{LocatedStop, StopRef};

/// Identifier → located stop, as loaded by an external collaborator.
pub type StopLocations = HashMap<StopRef, LocatedStop>;

/// Differences between OSM stop locations and the reference table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StopLocationReport {
    pub osm_only: Vec<StopRef>,
    pub reference_only: Vec<StopRef>,
    /// Common refs whose two locations are farther apart than the threshold,
    /// with the rounded distance in metres.
    pub far_away: Vec<(StopRef, u32)>,
}

/// Compare each commonly known stop's two locations, great-circle.
pub fn compare_stop_locations(
    osm_stops: &HashMap<StopRef, LocatedStop>,
    reference: &StopLocations,
) -> StopLocationReport {
    let mut report = StopLocationReport {
        osm_only: osm_stops
            .keys()
            .filter(|stop_ref| !reference.contains_key(*stop_ref))
            .cloned()
            .collect(),
        reference_only: reference
            .keys()
            .filter(|stop_ref| !osm_stops.contains_key(*stop_ref))
            .cloned()
            .collect(),
        far_away: Vec::new(),
    };
    report.osm_only.sort();
    report.reference_only.sort();

    let mut common: Vec<&StopRef> = osm_stops
        .keys()
        .filter(|stop_ref| reference.contains_key(*stop_ref))
        .collect();
    common.sort();
    for stop_ref in common {
        let distance = osm_stops[stop_ref]
            .point()
            .haversine_distance(&reference[stop_ref].point());
        if distance > STOP_DISTANCE_THRESHOLD_M {
            report.far_away.push((stop_ref.clone(), distance.round() as u32));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(stop_ref: &str, name: &str, lat: f64, lon: f64) -> LocatedStop {
        LocatedStop {
            stop_ref: StopRef::new(stop_ref),
            name: name.to_string(),
            lat,
            lon,
        }
    }

    fn table(stops: &[LocatedStop]) -> StopLocations {
        stops
            .iter()
            .map(|stop| (stop.stop_ref.clone(), stop.clone()))
            .collect()
    }

    #[test]
    fn test_far_away_stop_is_reported() {
        // roughly 139 m apart
        let osm = table(&[located("100001", "Test 01", 52.137859, 21.234539)]);
        let reference = table(&[located("100001", "Test 01", 52.136611, 21.234386)]);
        let report = compare_stop_locations(&osm, &reference);
        assert_eq!(report.far_away.len(), 1);
        let (stop_ref, distance) = &report.far_away[0];
        assert_eq!(stop_ref.as_str(), "100001");
        assert!((135..=142).contains(distance), "distance {distance}");
    }

    #[test]
    fn test_near_stop_is_not_reported() {
        let osm = table(&[located("100001", "Test 01", 52.137859, 21.234539)]);
        let reference = table(&[located("100001", "Test 01", 52.137900, 21.234500)]);
        let report = compare_stop_locations(&osm, &reference);
        assert!(report.far_away.is_empty());
    }

    #[test]
    fn test_one_sided_refs() {
        let osm = table(&[
            located("100001", "Test 01", 52.1, 21.2),
            located("200001", "Other 01", 52.2, 21.3),
        ]);
        let reference = table(&[
            located("100001", "Test 01", 52.1, 21.2),
            located("300001", "Third 01", 52.3, 21.4),
        ]);
        let report = compare_stop_locations(&osm, &reference);
        assert_eq!(report.osm_only, vec![StopRef::new("200001")]);
        assert_eq!(report.reference_only, vec![StopRef::new("300001")]);
    }
}
