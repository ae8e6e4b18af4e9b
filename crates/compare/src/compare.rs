//! Stop-sequence reconciliation.
//!
//! Aligns each variant's map-side and operator-side stop sequences,
//! classifies every aligned position, and aggregates route-level status
//! across variants.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::{EitherOrBoth, Itertools};

use crate::analyzer::VariantResult;
use crate::config::MISSING_REF;
use crate::diff::{opcodes, OpTag};
use crate::stop::{RouteRef, StopName, StopRef};

/// Classification of one aligned position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffColor {
    /// Identifiers (or, failing that, names) agree.
    Neutral,
    /// The map side has no stop at this position.
    Addition,
    /// Both sides name a real stop, but different ones.
    Conflict,
    /// The operator side has neither identifier nor name here.
    Removal,
    /// The operator side has only a name here, and it differs from the
    /// map-side name.
    AdditionSuspect,
}

/// One aligned position of a variant's two stop sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRow {
    pub color: DiffColor,
    pub osm_ref: StopRef,
    pub osm_name: StopName,
    pub operator_ref: StopRef,
    pub operator_name: StopName,
    pub detour: bool,
    pub new: bool,
}

/// A variant reported with its aligned rows and sorted findings.
#[derive(Clone, Debug)]
pub struct ReportedVariant {
    pub variant: VariantResult,
    pub rows: Vec<DiffRow>,
    pub findings: Vec<String>,
}

/// Aggregate status of one route across its variants, accumulated in
/// relation order: later variants only add, never clear a flag.
#[derive(Clone, Debug, Default)]
pub struct RouteStatus {
    /// Some variant's sequences differ.
    pub mismatch: bool,
    /// Some variant has findings or diff rows.
    pub error: bool,
    /// Every mismatching variant is flagged as an operator detour.
    pub detour_only: bool,
    pub variants: Vec<ReportedVariant>,
}

/// Full comparison output, ready for rendering.
#[derive(Clone, Debug, Default)]
pub struct CompareResult {
    /// Route references sorted by length, then lexically.
    pub refs: Vec<RouteRef>,
    pub routes: HashMap<RouteRef, RouteStatus>,
    /// Every name the operator used for each identifier.
    pub operator_names: HashMap<StopRef, BTreeSet<StopName>>,
}

/// Reconcile all analyzed variants, route by route.
pub fn compare_stops(
    results: BTreeMap<RouteRef, Vec<VariantResult>>,
    osm_names: &HashMap<StopRef, BTreeSet<StopName>>,
) -> CompareResult {
    let mut compare = CompareResult {
        refs: results.keys().cloned().collect(),
        ..Default::default()
    };
    compare
        .refs
        .sort_by(|left, right| left.len().cmp(&right.len()).then_with(|| left.cmp(right)));

    for (route_ref, variants) in results {
        let mut status = RouteStatus {
            detour_only: true,
            ..Default::default()
        };
        for variant in variants {
            for stop in &variant.operator_stops {
                compare
                    .operator_names
                    .entry(stop.record.stop_ref.clone())
                    .or_default()
                    .insert(stop.record.name.clone());
            }
            let osm_refs: Vec<&StopRef> =
                variant.osm_stops.iter().map(|stop| &stop.stop_ref).collect();
            let operator_refs: Vec<&StopRef> = variant
                .operator_stops
                .iter()
                .map(|stop| &stop.record.stop_ref)
                .collect();
            let sequences_differ = osm_refs != operator_refs;
            let rows = if sequences_differ {
                build_diff_rows(&variant, osm_names)
            } else {
                Vec::new()
            };
            if sequences_differ && !variant.detour {
                status.detour_only = false;
            }
            status.error |= !variant.diagnostics.is_empty() || !rows.is_empty();
            status.mismatch |= sequences_differ;
            if status.error {
                let findings = variant
                    .diagnostics
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                status.variants.push(ReportedVariant {
                    variant,
                    rows,
                    findings,
                });
            }
        }
        compare.routes.insert(route_ref, status);
    }
    compare
}

/// Align one variant's sequences into classified rows.
fn build_diff_rows(
    variant: &VariantResult,
    osm_names: &HashMap<StopRef, BTreeSet<StopName>>,
) -> Vec<DiffRow> {
    let osm_refs: Vec<&StopRef> = variant.osm_stops.iter().map(|stop| &stop.stop_ref).collect();
    let operator_refs: Vec<&StopRef> = variant
        .operator_stops
        .iter()
        .map(|stop| &stop.record.stop_ref)
        .collect();

    let mut rows = Vec::new();
    let mut push_row = |osm_index: Option<usize>, operator_index: Option<usize>| {
        let (osm_ref, osm_name) = match osm_index {
            Some(i) => {
                let stop = &variant.osm_stops[i];
                let name = first_known_name(osm_names, &stop.stop_ref)
                    .unwrap_or_else(|| stop.name.clone());
                (stop.stop_ref.clone(), name)
            }
            None => (StopRef::missing(), MISSING_REF.to_string()),
        };
        let (operator_ref, operator_name, detour, new) = match operator_index {
            Some(j) => {
                let stop = &variant.operator_stops[j];
                (
                    stop.record.stop_ref.clone(),
                    stop.record.name.clone(),
                    stop.detour,
                    stop.new,
                )
            }
            None => (StopRef::missing(), MISSING_REF.to_string(), false, false),
        };
        let color = classify(&osm_ref, &osm_name, &operator_ref, &operator_name);
        rows.push(DiffRow {
            color,
            osm_ref,
            osm_name,
            operator_ref,
            operator_name,
            detour,
            new,
        });
    };

    for opcode in opcodes(&osm_refs, &operator_refs) {
        match opcode.tag {
            OpTag::Equal => {
                for (i, j) in opcode.a.zip(opcode.b) {
                    push_row(Some(i), Some(j));
                }
            }
            OpTag::Delete => {
                for i in opcode.a {
                    push_row(Some(i), None);
                }
            }
            OpTag::Insert => {
                for j in opcode.b {
                    push_row(None, Some(j));
                }
            }
            OpTag::Replace => {
                for pair in opcode.a.zip_longest(opcode.b) {
                    let (i, j) = match pair {
                        EitherOrBoth::Both(i, j) => (Some(i), Some(j)),
                        EitherOrBoth::Left(i) => (Some(i), None),
                        EitherOrBoth::Right(j) => (None, Some(j)),
                    };
                    push_row(i, j);
                }
            }
        }
    }
    rows
}

fn classify(
    osm_ref: &StopRef,
    osm_name: &str,
    operator_ref: &StopRef,
    operator_name: &str,
) -> DiffColor {
    if osm_ref == operator_ref {
        return DiffColor::Neutral;
    }
    if osm_ref.is_missing() {
        return DiffColor::Addition;
    }
    if !operator_ref.is_missing() {
        return DiffColor::Conflict;
    }
    if operator_name == MISSING_REF {
        return DiffColor::Removal;
    }
    if osm_name != operator_name {
        DiffColor::AdditionSuspect
    } else {
        DiffColor::Neutral
    }
}

fn first_known_name(
    names: &HashMap<StopRef, BTreeSet<StopName>>,
    stop_ref: &StopRef,
) -> Option<StopName> {
    names.get(stop_ref).and_then(|set| set.iter().next().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorStop;
    use crate::stop::StopRecord;

    fn variant(route_ref: &str, osm: &[(&str, &str)], operator: &[(&str, &str)]) -> VariantResult {
        VariantResult {
            route_ref: route_ref.to_string(),
            osm_name: format!("Bus {route_ref}"),
            osm_id: 1,
            operator_link: String::new(),
            osm_stops: osm
                .iter()
                .map(|(stop_ref, name)| StopRecord::new(*stop_ref, *name))
                .collect(),
            operator_stops: operator
                .iter()
                .map(|(stop_ref, name)| OperatorStop::new(StopRecord::new(*stop_ref, *name)))
                .collect(),
            detour: false,
            new: false,
            short: false,
            diagnostics: BTreeSet::new(),
            route_type: "bus".to_string(),
        }
    }

    fn compare_one(variant: VariantResult) -> CompareResult {
        let osm_names = variant
            .osm_stops
            .iter()
            .map(|stop| {
                (
                    stop.stop_ref.clone(),
                    BTreeSet::from([stop.name.clone()]),
                )
            })
            .collect();
        let mut results = BTreeMap::new();
        results.insert(variant.route_ref.clone(), vec![variant]);
        compare_stops(results, &osm_names)
    }

    #[test]
    fn test_equal_sequences_have_no_rows() {
        let stops = [("100001", "Pierwsza 01"), ("200002", "Druga 02")];
        let result = compare_one(variant("7", &stops, &stops));
        let status = &result.routes["7"];
        assert!(!status.mismatch);
        assert!(!status.error);
        assert!(status.variants.is_empty());
    }

    #[test]
    fn test_operator_only_stop_is_an_addition() {
        let result = compare_one(variant(
            "7",
            &[("100001", "Pierwsza 01"), ("300003", "Trzecia 03")],
            &[
                ("100001", "Pierwsza 01"),
                ("200002", "Druga 02"),
                ("300003", "Trzecia 03"),
            ],
        ));
        let status = &result.routes["7"];
        assert!(status.mismatch && status.error);
        let rows = &status.variants[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].color, DiffColor::Addition);
        assert!(rows[1].osm_ref.is_missing());
        assert_eq!(rows[1].operator_name, "Druga 02");
        assert_eq!(rows[0].color, DiffColor::Neutral);
        assert_eq!(rows[2].color, DiffColor::Neutral);
    }

    #[test]
    fn test_unlinked_terminal_classification() {
        // the operator terminal kept its name but no identifier was resolved
        let result = compare_one(variant(
            "7",
            &[("100001", "Pierwsza 01"), ("300003", "Trzecia 03")],
            &[("100001", "Pierwsza 01"), ("-", "Trzecia 03")],
        ));
        let rows = &result.routes["7"].variants[0].rows;
        // replace segment pairs the map stop with the nameless-ref operator
        // terminal; names agree, so the row stays neutral
        assert_eq!(rows[1].color, DiffColor::Neutral);

        let result = compare_one(variant(
            "7",
            &[("100001", "Pierwsza 01"), ("300003", "Trzecia 03")],
            &[("100001", "Pierwsza 01"), ("-", "Inna 09")],
        ));
        let rows = &result.routes["7"].variants[0].rows;
        assert_eq!(rows[1].color, DiffColor::AdditionSuspect);
    }

    #[test]
    fn test_conflicting_refs() {
        let result = compare_one(variant(
            "7",
            &[("100001", "Pierwsza 01"), ("300003", "Trzecia 03")],
            &[("100001", "Pierwsza 01"), ("400004", "Czwarta 04")],
        ));
        let rows = &result.routes["7"].variants[0].rows;
        assert_eq!(rows[1].color, DiffColor::Conflict);
    }

    #[test]
    fn test_map_only_stop_is_a_removal() {
        let result = compare_one(variant(
            "7",
            &[
                ("100001", "Pierwsza 01"),
                ("200002", "Druga 02"),
                ("300003", "Trzecia 03"),
            ],
            &[("100001", "Pierwsza 01"), ("300003", "Trzecia 03")],
        ));
        let rows = &result.routes["7"].variants[0].rows;
        assert_eq!(rows[1].color, DiffColor::Removal);
        assert!(rows[1].operator_ref.is_missing());
    }

    #[test]
    fn test_detour_only_aggregation() {
        let clean = [("100001", "Pierwsza 01")];
        let changed = [("100001", "Pierwsza 01"), ("200002", "Druga 02")];

        let mut detoured = variant("7", &clean, &changed);
        detoured.detour = true;
        let mut results = BTreeMap::new();
        results.insert("7".to_string(), vec![detoured]);
        let result = compare_stops(results, &HashMap::new());
        assert!(result.routes["7"].detour_only);
        assert!(result.routes["7"].mismatch);

        let plain = variant("7", &clean, &changed);
        let mut results = BTreeMap::new();
        results.insert("7".to_string(), vec![plain]);
        let result = compare_stops(results, &HashMap::new());
        assert!(!result.routes["7"].detour_only);
    }

    #[test]
    fn test_refs_sorted_by_length_then_value() {
        let mut results = BTreeMap::new();
        for route_ref in ["512", "E-2", "10", "9"] {
            results.insert(
                route_ref.to_string(),
                vec![variant(route_ref, &[("100001", "A 01")], &[("100001", "A 01")])],
            );
        }
        let result = compare_stops(results, &HashMap::new());
        assert_eq!(result.refs, vec!["9", "10", "512", "E-2"]);
    }

    #[test]
    fn test_diagnostics_alone_mark_error() {
        use crate::topology::RouteDiagnostic;
        let stops = [("100001", "Pierwsza 01")];
        let mut with_finding = variant("7", &stops, &stops);
        with_finding.diagnostics.insert(RouteDiagnostic::RouteGap);
        let mut results = BTreeMap::new();
        results.insert("7".to_string(), vec![with_finding]);
        let result = compare_stops(results, &HashMap::new());
        let status = &result.routes["7"];
        assert!(status.error);
        assert!(!status.mismatch);
        assert_eq!(status.variants[0].findings, vec!["route has a gap"]);
    }

    #[test]
    fn test_operator_names_registry_collects_renames() {
        let mut results = BTreeMap::new();
        results.insert(
            "7".to_string(),
            vec![
                variant("7", &[("100001", "Stara 01")], &[("100001", "Stara 01")]),
                variant("7", &[("100001", "Stara 01")], &[("100001", "Nowa 01")]),
            ],
        );
        let result = compare_stops(results, &HashMap::new());
        let names = &result.operator_names[&StopRef::new("100001")];
        assert_eq!(names.len(), 2);
    }
}
