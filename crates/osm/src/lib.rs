//! # wtp-osm
//!
//! Geographic element model for public-transit route checking.
//!
//! A dataset download is a stream of nodes, ways and relations. This crate
//! indexes one download into an [`OsmSnapshot`] that owns every element and
//! hands out borrowed [`ElementRef`] views, so a route relation and its
//! validators share elements without copying.
//!
//! ## Example
//!
//! ```
//! use wtp_osm::{Element, Node, OsmSnapshot, Tags};
//!
//! let snapshot = OsmSnapshot::from_elements([Element::Node(Node {
//!     id: 1,
//!     lat: 52.23,
//!     lon: 21.01,
//!     tags: Tags::new(),
//! })]);
//!
//! assert!(snapshot.node(1).is_some());
//! assert!(snapshot.way(1).is_none());
//! ```

pub mod element;
pub mod snapshot;

pub use element::{
    lookup_first, Element, ElementRef, Member, MemberType, Node, Relation, Tags, Way,
};
pub use snapshot::OsmSnapshot;
