//! Terminal-stop identifier inference.
//!
//! The operator's timetable pages link every stop except the terminal, so
//! its identifier has to be inferred: from adjacency statistics gathered
//! across the whole corpus, from the authoritative variant catalog, or from
//! stop locations near the preceding stop.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use geo::HaversineDistance;
use regex::Regex;

use crate::catalog::RouteCatalog;
use crate::config::{LAST_STOP_DISTANCE_CEILING_M, UNIQUE_LAST_STOP_OVERRIDE};
use crate::locations::StopLocations;
use crate::operator::OperatorStop;
use crate::stop::{StopName, StopRef};

/// Adjacency statistics for terminal-stop inference.
///
/// Built once per run from every variant's operator stop list, consulted
/// read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastStopRefs {
    /// (terminal group name, adjacent group code) → terminal group code.
    refs_after: HashMap<(String, String), String>,
    /// Group names whose code is the same regardless of the approach.
    unique_ref_for_name: HashMap<String, String>,
}

/// `"Name 01"` → (`"Name"`, `"01"`).
fn stop_name_parts(name: &str) -> Option<(&str, &str)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^(.*) (\d\d)$").expect("valid pattern"));
    let captures = pattern.captures(name)?;
    Some((
        captures.get(1).map(|group| group.as_str())?,
        captures.get(2).map(|group| group.as_str())?,
    ))
}

/// Everything before the final space-separated token of a stop name.
fn group_name_of(name: &StopName) -> String {
    let tokens: Vec<&str> = name.split(' ').collect();
    tokens[..tokens.len().saturating_sub(1)].join(" ")
}

/// Scan every variant's operator stop list and record which group codes
/// appear next to which group names.
///
/// A key observed with two different codes is reported and keeps its first
/// value, so conflicting corpora stay deterministic.
pub fn build_last_stop_refs<'a>(
    corpus: impl IntoIterator<Item = &'a [OperatorStop]>,
) -> LastStopRefs {
    let mut refs_after: HashMap<(String, String), String> = HashMap::new();
    for stops in corpus {
        for (index, stop) in stops.iter().enumerate() {
            let Some(group_code) = stop.record.stop_ref.group_code() else {
                continue;
            };
            let group_name = group_name_of(&stop.record.name);
            let mut note_neighbour = |neighbour: &OperatorStop| {
                let Some(neighbour_code) = neighbour.record.stop_ref.group_code() else {
                    return;
                };
                let key = (group_name.clone(), neighbour_code.to_string());
                match refs_after.get(&key) {
                    Some(existing) if existing != group_code => {
                        log::warn!(
                            "conflicting group code for {key:?}: keeping {existing}, ignoring {group_code}"
                        );
                    }
                    Some(_) => {}
                    None => {
                        refs_after.insert(key, group_code.to_string());
                    }
                }
            };
            if index > 0 {
                note_neighbour(&stops[index - 1]);
            }
            if index + 1 < stops.len() {
                note_neighbour(&stops[index + 1]);
            }
        }
    }
    collapse_unique_names(refs_after)
}

/// Rebuild the maps, moving every group name whose code is the same under
/// all approaches into the name shortcut.
fn collapse_unique_names(refs_after: HashMap<(String, String), String>) -> LastStopRefs {
    let mut unique_ref_for_name: HashMap<String, String> = HashMap::new();
    unique_ref_for_name.insert(
        UNIQUE_LAST_STOP_OVERRIDE.0.to_string(),
        UNIQUE_LAST_STOP_OVERRIDE.1.to_string(),
    );

    let mut codes_by_name: HashMap<&String, HashSet<&String>> = HashMap::new();
    for ((name, _), code) in &refs_after {
        codes_by_name.entry(name).or_default().insert(code);
    }
    let unique_names: HashSet<String> = codes_by_name
        .iter()
        .filter(|(_, codes)| codes.len() == 1)
        .map(|(name, _)| (*name).clone())
        .collect();

    let mut kept: HashMap<(String, String), String> = HashMap::new();
    for ((name, neighbour_code), code) in refs_after {
        if unique_names.contains(&name) {
            unique_ref_for_name.insert(name, code);
        } else {
            kept.insert((name, neighbour_code), code);
        }
    }
    LastStopRefs {
        refs_after: kept,
        unique_ref_for_name,
    }
}

/// Infer the identifier of a variant's terminal stop.
///
/// Strategies, in order: the unique-name shortcut, the adjacency map keyed
/// by the preceding stop's group, a catalog variant with an identical
/// sequence up to the terminal, and the nearest located stop of the same
/// group name. Exhausting all four is reported and yields the sentinel.
pub fn resolve_last_stop(
    terminal_name: &str,
    previous_ref: &StopRef,
    refs: &LastStopRefs,
    route_ref: &str,
    stops: &[OperatorStop],
    catalog: &RouteCatalog,
    locations: &StopLocations,
) -> StopRef {
    let Some((group_name, local_suffix)) = stop_name_parts(terminal_name) else {
        return StopRef::missing();
    };
    if let Some(group_code) = refs.unique_ref_for_name.get(group_name) {
        return StopRef::new(format!("{group_code}{local_suffix}"));
    }
    if let Some(previous_code) = previous_ref.group_code() {
        let key = (group_name.to_string(), previous_code.to_string());
        if let Some(group_code) = refs.refs_after.get(&key) {
            return StopRef::new(format!("{group_code}{local_suffix}"));
        }
    }
    if let Some(found) = matching_catalog_terminal(route_ref, stops, catalog) {
        return found;
    }
    if let Some(found) = nearest_located_terminal(group_name, previous_ref, locations) {
        return found;
    }
    log::warn!("no identifier found for terminal stop {terminal_name} after {previous_ref}");
    StopRef::missing()
}

/// A catalog variant whose sequence equals this one up to the terminal
/// supplies its terminal identifier.
fn matching_catalog_terminal(
    route_ref: &str,
    stops: &[OperatorStop],
    catalog: &RouteCatalog,
) -> Option<StopRef> {
    let published = catalog.get(route_ref)?;
    if stops.is_empty() {
        return None;
    }
    let leading: Vec<&StopRef> = stops[..stops.len() - 1]
        .iter()
        .map(|stop| &stop.record.stop_ref)
        .collect();
    published
        .iter()
        .find(|variant| {
            variant.stop_refs.len() == stops.len()
                && variant.stop_refs[..variant.stop_refs.len() - 1]
                    .iter()
                    .eq(leading.iter().copied())
        })
        .and_then(|variant| variant.stop_refs.last().cloned())
}

/// The located stop of the terminal's group closest to the preceding stop,
/// if it is within the acceptance ceiling.
fn nearest_located_terminal(
    group_name: &str,
    previous_ref: &StopRef,
    locations: &StopLocations,
) -> Option<StopRef> {
    let origin = locations.get(previous_ref)?.point();
    let (best, distance) = locations
        .values()
        .filter(|stop| stop.name.contains(group_name))
        .map(|stop| (stop, origin.haversine_distance(&stop.point())))
        .min_by(|left, right| left.1.total_cmp(&right.1))?;
    (distance < LAST_STOP_DISTANCE_CEILING_M).then(|| best.stop_ref.clone())
}
