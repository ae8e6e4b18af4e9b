//! # wtp-compare
//!
//! Reconciles two descriptions of the Warsaw public-transit network: the
//! community-edited map data (route relations, ways, stop positions) and the
//! operator's published timetables. Disagreements come out as structured
//! diagnostics and per-stop diff rows for manual correction.
//!
//! The pipeline is batch and synchronous: collaborators hand over a complete
//! [`wtp_osm::OsmSnapshot`], a [`operator::TimetableSource`], the route
//! [`catalog::RouteCatalog`] and a [`locations::StopLocations`] table; then
//! [`analyzer::analyze_routes`] produces per-variant results and
//! [`compare::compare_stops`] aligns and classifies the stop sequences.
//!
//! ## Example
//!
//! ```
//! use wtp_compare::operator::OperatorLink;
//!
//! let link = OperatorLink::parse(
//!     "https://www.wtp.waw.pl/rozklady-jazdy/?wtp_md=3&wtp_ln=180",
//! )
//! .unwrap();
//! assert_eq!(link.direction, "A");
//! assert_eq!(link.variant, "0");
//! ```

pub mod analyzer;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod diff;
pub mod last_stop;
pub mod locations;
pub mod operator;
pub mod stop;
pub mod topology;

// Re-exports for convenience
pub mod prelude {
    pub use crate::analyzer::{analyze_routes, AnalysisContext, AnalysisOutcome, VariantResult};
    pub use crate::catalog::{audit_against_catalog, CatalogVariant, RouteCatalog};
    pub use crate::compare::{compare_stops, CompareResult, DiffColor, DiffRow, RouteStatus};
    pub use crate::last_stop::{build_last_stop_refs, resolve_last_stop, LastStopRefs};
    pub use crate::locations::{compare_stop_locations, StopLocationReport, StopLocations};
    pub use crate::operator::{
        remap_operator_stop, OperatorLink, OperatorStop, OperatorTimetable, SourceError,
        TimetableSource,
    };
    pub use crate::stop::{LocatedStop, RouteRef, StopName, StopRecord, StopRef};
    pub use crate::topology::{validate_route, RouteDiagnostic};
}
