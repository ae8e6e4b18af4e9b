//! Route geometry validation.
//!
//! Checks that the ordered roleless members of a route relation form a
//! connected, directionally consistent line and that the declared stop
//! positions lie on it. Findings are collected, never thrown; an empty set
//! means the variant's geometry is fine.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;
use wtp_osm::{ElementRef, Tags, Way};

/// One data-quality finding on a route variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Error)]
pub enum RouteDiagnostic {
    #[error("route runs over an element without a highway/railway tag")]
    MissingHighwayRailwayTag,
    #[error("route uses {key}={value}")]
    InvalidWayTag { key: String, value: String },
    #[error("access=no without bus/psv=yes/designated")]
    AccessRestricted,
    #[error("unsplit roundabout is part of the route")]
    UnsplitRoundabout,
    #[error("one-way road {0} used against its direction")]
    OnewayAgainstDirection(i64),
    #[error("route has a gap")]
    RouteGap,
    #[error("member without a role is not a way")]
    RolelessMemberNotWay,
    #[error("stop position is not a node")]
    StopNotNode,
    #[error("stop positions do not lie on the route")]
    StopsNotOnRoute,
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("member {0} missing from the dataset")]
    UnresolvedMember(String),
}

/// Validate one variant's ordered path elements and stop position nodes.
///
/// An empty path yields no geometry findings; the continuity walk simply has
/// no pairs to check.
pub fn validate_route(
    path: &[ElementRef<'_>],
    stop_nodes: &HashSet<i64>,
) -> BTreeSet<RouteDiagnostic> {
    let mut findings = BTreeSet::new();
    let mut path_nodes: HashSet<i64> = HashSet::new();
    let mut ways: Vec<&Way> = Vec::new();
    for element in path {
        match element {
            ElementRef::Way(way) => {
                path_nodes.extend(way.nodes.iter().copied());
                check_way_tags(&way.tags, &mut findings);
                ways.push(way);
            }
            _ => {
                findings.insert(RouteDiagnostic::RolelessMemberNotWay);
            }
        }
    }
    check_continuity(&ways, &mut findings);
    if stop_nodes.iter().any(|node| !path_nodes.contains(node)) {
        findings.insert(RouteDiagnostic::StopsNotOnRoute);
    }
    findings
}

fn check_way_tags(tags: &Tags, findings: &mut BTreeSet<RouteDiagnostic>) {
    let highway = tags.get("highway");
    let railway = tags.get("railway");
    if highway.is_none() && railway.is_none() {
        findings.insert(RouteDiagnostic::MissingHighwayRailwayTag);
    }
    for (key, value) in [("highway", highway), ("railway", railway)] {
        if let Some(value) = value {
            if value == "construction" || value == "proposed" {
                findings.insert(RouteDiagnostic::InvalidWayTag {
                    key: key.to_string(),
                    value: value.clone(),
                });
            }
        }
    }
    check_access_tags(tags, findings);
}

fn check_access_tags(tags: &Tags, findings: &mut BTreeSet<RouteDiagnostic>) {
    let allows = |key: &str| {
        matches!(
            tags.get(key).map(String::as_str),
            Some("yes") | Some("designated")
        )
    };
    if tags.get("access").map(String::as_str) == Some("no") && !allows("bus") && !allows("psv") {
        findings.insert(RouteDiagnostic::AccessRestricted);
    }
}

/// Walk adjacent way pairs in member order; every pair must connect.
fn check_continuity(ways: &[&Way], findings: &mut BTreeSet<RouteDiagnostic>) {
    for pair in ways.windows(2) {
        if !ways_connect(pair[0], pair[1], findings) {
            findings.insert(RouteDiagnostic::RouteGap);
        }
    }
}

fn ways_connect(previous: &Way, current: &Way, findings: &mut BTreeSet<RouteDiagnostic>) -> bool {
    if shares_roundabout_endpoint(previous, current, findings)
        || shares_roundabout_endpoint(current, previous, findings)
    {
        return true;
    }
    // an explicit two-way exemption for buses overrides the endpoint checks
    let exempt = |key: &str| previous.tags.get(key).map(String::as_str) == Some("no");
    if exempt("oneway:bus") || exempt("oneway:psv") {
        return true;
    }
    let (Some(previous_start), Some(previous_end)) = (previous.first_node(), previous.last_node())
    else {
        return false;
    };
    let (Some(current_start), Some(current_end)) = (current.first_node(), current.last_node())
    else {
        return false;
    };
    let oneway = previous.tags.get("oneway").map(String::as_str);
    if previous_end == current_start || previous_end == current_end {
        if oneway == Some("-1") {
            findings.insert(RouteDiagnostic::OnewayAgainstDirection(previous.id));
        }
        return true;
    }
    if previous_start == current_start || previous_start == current_end {
        if oneway == Some("yes") {
            findings.insert(RouteDiagnostic::OnewayAgainstDirection(previous.id));
        }
        return true;
    }
    false
}

/// A closed roundabout connects to any way ending on one of its nodes, but
/// should have been split at the junctions.
fn shares_roundabout_endpoint(
    roundabout: &Way,
    way: &Way,
    findings: &mut BTreeSet<RouteDiagnostic>,
) -> bool {
    if roundabout.tags.get("junction").map(String::as_str) != Some("roundabout")
        || !roundabout.is_closed()
    {
        return false;
    }
    let endpoints = [way.first_node(), way.last_node()];
    if roundabout
        .nodes
        .iter()
        .any(|node| endpoints.contains(&Some(*node)))
    {
        findings.insert(RouteDiagnostic::UnsplitRoundabout);
        return true;
    }
    false
}
