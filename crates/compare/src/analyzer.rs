//! One pass over the geographic dataset.
//!
//! Filters route relations, fetches their operator timetables, infers
//! missing terminal identifiers, validates geometry and assembles one
//! [`VariantResult`] per route relation, keyed by route reference.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use wtp_osm::{lookup_first, ElementRef, OsmSnapshot, Relation, Tags};

use crate::catalog::RouteCatalog;
use crate::config::{
    NAME_TAG_KEYS, OPERATOR_DOMAIN, OPERATOR_NETWORK, RAIL_OPERATOR_WIKIDATA, REF_TAG_KEYS,
    SKIPPED_ROUTE_CLASSES,
};
use crate::last_stop::{build_last_stop_refs, resolve_last_stop, LastStopRefs};
use crate::locations::StopLocations;
use crate::operator::{
    remap_operator_stop, OperatorLink, OperatorStop, OperatorTimetable, TimetableSource,
};
use crate::stop::{LocatedStop, RouteRef, StopName, StopRecord, StopRef};
use crate::topology::{validate_route, RouteDiagnostic};

/// Everything one route variant contributes to the comparison.
#[derive(Clone, Debug)]
pub struct VariantResult {
    pub route_ref: RouteRef,
    pub osm_name: String,
    pub osm_id: i64,
    pub operator_link: String,
    /// Map-side stops, consecutive repeats collapsed.
    pub osm_stops: Vec<StopRecord>,
    /// Operator-side stops with their per-stop flags.
    pub operator_stops: Vec<OperatorStop>,
    pub detour: bool,
    pub new: bool,
    pub short: bool,
    pub diagnostics: BTreeSet<RouteDiagnostic>,
    pub route_type: String,
}

/// Findings and registries accumulated across the whole run.
///
/// Threaded explicitly through the analysis instead of process-wide state,
/// so parallel runs and tests stay isolated.
#[derive(Clone, Debug, Default)]
pub struct AnalysisContext {
    /// Every well-formed ref seen on a map-side stop.
    pub all_osm_refs: BTreeSet<StopRef>,
    /// Stop elements carrying a `disused`-ish tag, by element URL.
    pub disused_stops: BTreeSet<String>,
    /// Stop elements without a usable name, by element URL.
    pub missing_name: BTreeSet<String>,
    /// Route relations without an operator link: (relation URL, name).
    pub missing_route_link: BTreeSet<(String, String)>,
    /// Stop elements without a usable ref: (element URL, name if any).
    pub missing_stop_ref: BTreeSet<(String, StopName)>,
    /// Operator links pointing outside the timetable site.
    pub unexpected_link: BTreeSet<(String, String)>,
    /// Relations tagged with a foreign network.
    pub unexpected_network: BTreeSet<(String, String)>,
    /// Refs with an unexpected shape on operator-network stops.
    pub unexpected_stop_ref: BTreeSet<(String, StopRef)>,
    /// Stops whose ref and name suffix disagree: (ref, name, element URL).
    pub mismatched_name_ref: BTreeSet<(StopRef, StopName, String)>,
    /// Every name observed per ref, for non-unique-naming detection.
    pub osm_ref_to_name: HashMap<StopRef, BTreeSet<StopName>>,
    /// Best known location per ref; stop positions win over platforms.
    pub located_stops: HashMap<StopRef, LocatedStop>,
    /// Canonical links referenced from route relations.
    pub operator_links: BTreeSet<OperatorLink>,
    /// Canonical links referenced by more than one relation.
    pub duplicate_links: BTreeSet<String>,
    /// Links whose timetable was unavailable or empty: (link, relation URL).
    pub invalid_variants: BTreeSet<(String, String)>,
}

/// Analyzer output: per-route variant results plus the run's context.
#[derive(Clone, Debug, Default)]
pub struct AnalysisOutcome {
    pub results: BTreeMap<RouteRef, Vec<VariantResult>>,
    pub context: AnalysisContext,
}

/// A route relation paired with its scraped operator timetable.
struct ScrapedRoute<'a> {
    relation: &'a Relation,
    route_ref: RouteRef,
    link: OperatorLink,
    timetable: OperatorTimetable,
}

pub fn parse_ref(tags: &Tags) -> Option<&str> {
    lookup_first(tags, &REF_TAG_KEYS)
}

pub fn parse_name(tags: &Tags) -> Option<&str> {
    lookup_first(tags, &NAME_TAG_KEYS)
}

/// Analyze every operator route relation in the snapshot.
///
/// Timetables are fetched first so that terminal-stop statistics can be
/// built from the full corpus, then each relation's members are walked and
/// validated.
pub fn analyze_routes(
    snapshot: &OsmSnapshot,
    timetables: &dyn TimetableSource,
    catalog: &RouteCatalog,
    locations: &StopLocations,
) -> AnalysisOutcome {
    let mut context = AnalysisContext::default();
    let mut scraped = scrape_routes(snapshot, timetables, &mut context);
    let last_stop_refs = build_last_stop_refs(
        scraped
            .iter()
            .map(|route| route.timetable.stops.as_slice()),
    );
    for route in &mut scraped {
        backfill_terminal_ref(route, &last_stop_refs, catalog, locations);
    }

    let mut results: BTreeMap<RouteRef, Vec<VariantResult>> = BTreeMap::new();
    for route in &scraped {
        let variant = analyze_variant(route, snapshot, &mut context);
        results
            .entry(variant.route_ref.clone())
            .or_default()
            .push(variant);
    }
    AnalysisOutcome { results, context }
}

fn scrape_routes<'a>(
    snapshot: &'a OsmSnapshot,
    timetables: &dyn TimetableSource,
    context: &mut AnalysisContext,
) -> Vec<ScrapedRoute<'a>> {
    let mut relations: Vec<&Relation> = snapshot.relations().collect();
    relations.sort_by_key(|relation| relation.id);
    relations
        .into_iter()
        .filter_map(|relation| scrape_route(relation, timetables, context))
        .collect()
}

/// Decide whether a relation is an operator route and fetch its timetable.
fn scrape_route<'a>(
    relation: &'a Relation,
    timetables: &dyn TimetableSource,
    context: &mut AnalysisContext,
) -> Option<ScrapedRoute<'a>> {
    let tags = &relation.tags;
    if tags.get("type").map(String::as_str) != Some("route") {
        return None;
    }
    let route_type = tags.get("route")?;
    if SKIPPED_ROUTE_CLASSES.contains(&route_type.as_str()) {
        return None;
    }
    let route_ref = parse_ref(tags)?.to_string();

    let Some(link) = tags.get("url") else {
        let rail_operated = tags
            .get("operator:wikidata")
            .is_some_and(|id| RAIL_OPERATOR_WIKIDATA.contains(&id.as_str()));
        if !rail_operated {
            context.missing_route_link.insert((
                relation.url(),
                tags.get("name").cloned().unwrap_or_default(),
            ));
        }
        return None;
    };
    if let Some(network) = tags.get("network") {
        if network != OPERATOR_NETWORK {
            context
                .unexpected_network
                .insert((relation.url(), network.clone()));
        }
    }
    if !link.contains(OPERATOR_DOMAIN) {
        context.unexpected_link.insert((relation.url(), link.clone()));
        return None;
    }
    let Some(parsed) = OperatorLink::parse(link) else {
        log::warn!("could not parse operator link {link}");
        context
            .invalid_variants
            .insert((link.clone(), relation.url()));
        return None;
    };
    if !context.operator_links.insert(parsed.clone()) {
        context.duplicate_links.insert(parsed.url());
    }

    match timetables.fetch(&parsed) {
        Ok(timetable) if !timetable.unavailable && !timetable.stops.is_empty() => {
            Some(ScrapedRoute {
                relation,
                route_ref,
                link: parsed,
                timetable: remap_timetable(timetable),
            })
        }
        Ok(_) => {
            context
                .invalid_variants
                .insert((link.clone(), relation.url()));
            None
        }
        Err(error) => {
            log::warn!("timetable fetch failed for {link}: {error}");
            context
                .invalid_variants
                .insert((link.clone(), relation.url()));
            None
        }
    }
}

/// Apply the fixed stop corrections to every scraped stop.
fn remap_timetable(mut timetable: OperatorTimetable) -> OperatorTimetable {
    for stop in &mut timetable.stops {
        stop.record = remap_operator_stop(stop.record.clone());
    }
    timetable
}

/// Resolve the identifier of a variant's terminal stop if it is missing.
fn backfill_terminal_ref(
    route: &mut ScrapedRoute<'_>,
    refs: &LastStopRefs,
    catalog: &RouteCatalog,
    locations: &StopLocations,
) {
    let stops = &route.timetable.stops;
    if stops.len() < 2 {
        return;
    }
    let terminal = &stops[stops.len() - 1].record;
    if !terminal.stop_ref.is_missing() {
        return;
    }
    let resolved = resolve_last_stop(
        &terminal.name,
        &stops[stops.len() - 2].record.stop_ref,
        refs,
        &route.route_ref,
        stops,
        catalog,
        locations,
    );
    if let Some(last) = route.timetable.stops.last_mut() {
        last.record.stop_ref = resolved;
    }
}

/// Walk one relation's members and assemble its variant result.
fn analyze_variant(
    route: &ScrapedRoute<'_>,
    snapshot: &OsmSnapshot,
    context: &mut AnalysisContext,
) -> VariantResult {
    let relation = route.relation;
    let mut diagnostics: BTreeSet<RouteDiagnostic> = BTreeSet::new();
    let mut osm_stops: Vec<StopRecord> = Vec::new();
    let mut stop_nodes: HashSet<i64> = HashSet::new();
    let mut path: Vec<ElementRef<'_>> = Vec::new();

    for member in &relation.members {
        let Some(element) = snapshot.resolve(member) else {
            diagnostics.insert(RouteDiagnostic::UnresolvedMember(format!(
                "{}/{}",
                member.member_type.as_str(),
                member.id
            )));
            continue;
        };
        let role = member.role.as_str();
        if role.is_empty() {
            path.push(element);
        } else if role.starts_with("platform") || role.starts_with("stop") {
            collect_stop_member(
                role,
                element,
                snapshot,
                context,
                &mut diagnostics,
                &mut osm_stops,
                &mut stop_nodes,
            );
        } else {
            diagnostics.insert(RouteDiagnostic::UnknownRole(role.to_string()));
        }
    }
    diagnostics.extend(validate_route(&path, &stop_nodes));

    VariantResult {
        route_ref: route.route_ref.clone(),
        osm_name: relation.tags.get("name").cloned().unwrap_or_default(),
        osm_id: relation.id,
        operator_link: route.link.url(),
        osm_stops,
        operator_stops: route.timetable.stops.clone(),
        detour: route.timetable.detour,
        new: route.timetable.new,
        short: route.timetable.short,
        diagnostics,
        route_type: relation.tags.get("route").cloned().unwrap_or_default(),
    }
}

/// Record one platform/stop member: registries, location, the deduplicated
/// stop list and the stop-position node set.
fn collect_stop_member(
    role: &str,
    element: ElementRef<'_>,
    snapshot: &OsmSnapshot,
    context: &mut AnalysisContext,
    diagnostics: &mut BTreeSet<RouteDiagnostic>,
    osm_stops: &mut Vec<StopRecord>,
    stop_nodes: &mut HashSet<i64>,
) {
    let tags = element.tags();
    if tags.keys().any(|tag| tag.contains("disused")) {
        context.disused_stops.insert(element.url());
    }
    let stop_ref = parse_ref(tags);
    let Some(name) = parse_name(tags) else {
        if tags.get("railway").map(String::as_str) != Some("platform") {
            context.missing_name.insert(element.url());
        }
        if stop_ref.is_none() {
            context
                .missing_stop_ref
                .insert((element.url(), String::new()));
        }
        return;
    };
    let Some(stop_ref) = stop_ref else {
        context
            .missing_stop_ref
            .insert((element.url(), name.to_string()));
        return;
    };
    let stop_ref = StopRef::new(stop_ref);
    if !stop_ref.is_well_formed() {
        if tags.get("network").map(String::as_str) == Some(OPERATOR_NETWORK) {
            context
                .unexpected_stop_ref
                .insert((element.url(), stop_ref));
        }
        return;
    }
    context
        .osm_ref_to_name
        .entry(stop_ref.clone())
        .or_default()
        .insert(name.to_string());
    check_name_matches_ref(&stop_ref, name, &element.url(), context);

    // prefer a stop position's coordinates over a platform's
    if role == "stop" || !context.located_stops.contains_key(&stop_ref) {
        if let Some(point) = element.center(snapshot) {
            context.located_stops.insert(
                stop_ref.clone(),
                LocatedStop {
                    stop_ref: stop_ref.clone(),
                    name: name.to_string(),
                    lat: point.y(),
                    lon: point.x(),
                },
            );
        }
    }
    if osm_stops.last().map(|stop| &stop.stop_ref) != Some(&stop_ref) {
        context.all_osm_refs.insert(stop_ref.clone());
        osm_stops.push(StopRecord::new(stop_ref.clone(), name));
    }
    if role.starts_with("stop") {
        match element {
            ElementRef::Node(node) => {
                stop_nodes.insert(node.id);
            }
            _ => {
                diagnostics.insert(RouteDiagnostic::StopNotNode);
            }
        }
    }
}

/// The ref's post digit should match the name's suffix digit.
fn check_name_matches_ref(
    stop_ref: &StopRef,
    name: &str,
    url: &str,
    context: &mut AnalysisContext,
) {
    let ref_digit = nth_char_from_end(stop_ref.as_str(), 1);
    let name_digit = nth_char_from_end(name, 1);
    if let (Some(ref_digit), Some(name_digit)) = (ref_digit, name_digit) {
        if ref_digit != name_digit {
            context.mismatched_name_ref.insert((
                stop_ref.clone(),
                name.to_string(),
                url.to_string(),
            ));
        }
    }
}

fn nth_char_from_end(value: &str, n: usize) -> Option<char> {
    value.chars().rev().nth(n)
}
