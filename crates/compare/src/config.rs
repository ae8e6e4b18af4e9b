//! Warsaw-network assumptions, kept in one place.
//!
//! The operator encodes its conventions in identifier shapes, tag keys and a
//! handful of special cases. Adjusting these constants retargets the
//! comparison to another network with the same data model.

/// Sentinel identifier meaning "no stop identifier known".
pub const MISSING_REF: &str = "-";

/// Expected length of a stop identifier: four-character group code plus
/// two-character post number.
pub const STOP_REF_LEN: usize = 6;

/// Leading characters of a stop identifier naming its stop group.
pub const GROUP_REF_LEN: usize = 4;

/// Ref tag lookup order on route relations and stop elements.
pub const REF_TAG_KEYS: [&str; 3] = ["ref:wtp", "ref:ztm", "ref"];

/// Name tag lookup order on stop elements.
pub const NAME_TAG_KEYS: [&str; 3] = ["name:wtp", "name:ztm", "name"];

/// `network` tag value expected on the operator's route relations.
pub const OPERATOR_NETWORK: &str = "ZTM Warszawa";

/// Domain of the operator's timetable site.
pub const OPERATOR_DOMAIN: &str = "wtp.waw.pl";

/// Route classes published by other sources, not the operator site.
pub const SKIPPED_ROUTE_CLASSES: [&str; 4] = ["tracks", "subway", "train", "railway"];

/// `operator:wikidata` of the Koleje Mazowieckie regional rail operator.
pub const KM_WIKIDATA: &str = "Q1753004";

/// `operator:wikidata` of the WKD commuter rail operator.
pub const WKD_WIKIDATA: &str = "Q1061947";

/// Rail operators whose relations legitimately carry no operator link.
pub const RAIL_OPERATOR_WIKIDATA: [&str; 2] = [KM_WIKIDATA, WKD_WIKIDATA];

/// Ceiling for accepting the nearest located stop as a terminal match, in
/// metres.
pub const LAST_STOP_DISTANCE_CEILING_M: f64 = 20_000.0;

/// Distance above which an OSM stop and its reference-table counterpart are
/// reported as diverged, in metres.
pub const STOP_DISTANCE_THRESHOLD_M: f64 = 100.0;

/// The one stop group served exclusively by terminating lines, so its code
/// never appears in through-adjacency statistics.
pub const UNIQUE_LAST_STOP_OVERRIDE: (&str, &str) = ("Zgoda", "3701");
