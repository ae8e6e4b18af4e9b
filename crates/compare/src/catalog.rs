//! Authoritative route-variant catalog published by the city API.
//!
//! Loaded by an external collaborator; consulted here for terminal-stop
//! inference and for auditing map-side stop sequences.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::analyzer::VariantResult;
use crate::stop::{RouteRef, StopRef};

/// One variant of a route as published by the authoritative API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub variant_id: String,
    pub stop_refs: Vec<StopRef>,
}

/// Route reference → published variants.
pub type RouteCatalog = HashMap<RouteRef, Vec<CatalogVariant>>;

/// Result of matching one analyzed variant against the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogMatch {
    pub osm_id: i64,
    pub osm_name: String,
    /// Catalog variant with an identical stop sequence, if any.
    pub variant_id: Option<String>,
}

/// Match every analyzed variant's map-side sequence against the catalog.
pub fn audit_against_catalog(
    results: &BTreeMap<RouteRef, Vec<VariantResult>>,
    catalog: &RouteCatalog,
) -> Vec<CatalogMatch> {
    let mut matches = Vec::new();
    for (route_ref, variants) in results {
        let Some(published) = catalog.get(route_ref) else {
            log::warn!("route {route_ref} missing from the variant catalog");
            continue;
        };
        for variant in variants {
            let stop_refs: Vec<&StopRef> =
                variant.osm_stops.iter().map(|stop| &stop.stop_ref).collect();
            let found = published
                .iter()
                .find(|candidate| candidate.stop_refs.iter().eq(stop_refs.iter().copied()));
            match found {
                Some(candidate) => log::info!(
                    "{} ({}) matches catalog variant {}",
                    variant.osm_name,
                    variant.osm_id,
                    candidate.variant_id
                ),
                None => log::warn!(
                    "no catalog variant matches {} ({})",
                    variant.osm_name,
                    variant.osm_id
                ),
            }
            matches.push(CatalogMatch {
                osm_id: variant.osm_id,
                osm_name: variant.osm_name.clone(),
                variant_id: found.map(|candidate| candidate.variant_id.clone()),
            });
        }
    }
    matches
}
