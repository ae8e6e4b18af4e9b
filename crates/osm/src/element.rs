//! Element types: nodes, ways, relations and their tag dictionaries.

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::snapshot::OsmSnapshot;

/// Tag dictionary of an element.
pub type Tags = hashbrown::HashMap<String, String>;

/// Look up the first of `keys` present in `tags`.
///
/// Tag fallbacks (`ref:wtp`, `ref:ztm`, `ref`) are expressed as the key
/// order, highest priority first.
pub fn lookup_first<'a>(tags: &'a Tags, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| tags.get(*key).map(String::as_str))
}

/// A point with coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Tags,
}

impl Node {
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// An ordered sequence of node references forming a line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: Tags,
}

impl Way {
    pub fn first_node(&self) -> Option<i64> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<i64> {
        self.nodes.last().copied()
    }

    /// A closed way starts and ends on the same node.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() >= 2 && self.first_node() == self.last_node()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::Node => "node",
            MemberType::Way => "way",
            MemberType::Relation => "relation",
        }
    }
}

/// A typed member reference of a relation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
}

/// An ordered sequence of typed member references with roles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    #[serde(default)]
    pub tags: Tags,
}

impl Relation {
    /// Stable element URL, e.g. `https://osm.org/relation/123`.
    pub fn url(&self) -> String {
        format!("https://osm.org/relation/{}", self.id)
    }
}

/// One element of a provider's element stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// Borrowed view of an element resolved from a snapshot.
#[derive(Clone, Copy, Debug)]
pub enum ElementRef<'a> {
    Node(&'a Node),
    Way(&'a Way),
    Relation(&'a Relation),
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> i64 {
        match self {
            ElementRef::Node(node) => node.id,
            ElementRef::Way(way) => way.id,
            ElementRef::Relation(relation) => relation.id,
        }
    }

    pub fn tags(&self) -> &'a Tags {
        match self {
            ElementRef::Node(node) => &node.tags,
            ElementRef::Way(way) => &way.tags,
            ElementRef::Relation(relation) => &relation.tags,
        }
    }

    pub fn member_type(&self) -> MemberType {
        match self {
            ElementRef::Node(_) => MemberType::Node,
            ElementRef::Way(_) => MemberType::Way,
            ElementRef::Relation(_) => MemberType::Relation,
        }
    }

    /// Stable element URL, e.g. `https://osm.org/way/123`.
    pub fn url(&self) -> String {
        format!("https://osm.org/{}/{}", self.member_type().as_str(), self.id())
    }

    /// Representative coordinate of the element.
    ///
    /// Nodes return their own location, ways the arithmetic mean of their
    /// resolvable nodes. Relations have no representative coordinate.
    pub fn center(&self, snapshot: &OsmSnapshot) -> Option<Point> {
        match self {
            ElementRef::Node(node) => Some(node.point()),
            ElementRef::Way(way) => {
                let points: Vec<Point> = way
                    .nodes
                    .iter()
                    .filter_map(|id| snapshot.node(*id))
                    .map(Node::point)
                    .collect();
                if points.is_empty() {
                    return None;
                }
                let count = points.len() as f64;
                let lon = points.iter().map(|p| p.x()).sum::<f64>() / count;
                let lat = points.iter().map(|p| p.y()).sum::<f64>() / count;
                Some(Point::new(lon, lat))
            }
            ElementRef::Relation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_first_respects_priority() {
        let tags = tags(&[("ref", "plain"), ("ref:wtp", "operator")]);
        assert_eq!(
            lookup_first(&tags, &["ref:wtp", "ref:ztm", "ref"]),
            Some("operator")
        );
        assert_eq!(lookup_first(&tags, &["ref:ztm", "ref"]), Some("plain"));
        assert_eq!(lookup_first(&tags, &["name"]), None);
    }

    #[test]
    fn test_way_is_closed() {
        let closed = Way {
            id: 1,
            nodes: vec![1, 2, 3, 1],
            tags: Tags::new(),
        };
        assert!(closed.is_closed());

        let open = Way {
            id: 2,
            nodes: vec![1, 2, 3],
            tags: Tags::new(),
        };
        assert!(!open.is_closed());

        let empty = Way {
            id: 3,
            nodes: vec![],
            tags: Tags::new(),
        };
        assert!(!empty.is_closed());
    }

    #[test]
    fn test_element_stream_deserializes() {
        let json = r#"[
            {"type": "node", "id": 7, "lat": 52.1, "lon": 21.0, "tags": {"name": "Test 01"}},
            {"type": "way", "id": 8, "nodes": [7, 9]},
            {"type": "relation", "id": 9, "members": [{"type": "way", "ref": 8, "role": ""}], "tags": {"type": "route"}}
        ]"#;
        let elements: Vec<Element> = serde_json::from_str(json).unwrap();
        assert_eq!(elements.len(), 3);
        match &elements[0] {
            Element::Node(node) => assert_eq!(node.tags.get("name").unwrap(), "Test 01"),
            other => panic!("expected a node, got {other:?}"),
        }
        match &elements[2] {
            Element::Relation(relation) => {
                assert_eq!(relation.members[0].id, 8);
                assert_eq!(relation.members[0].member_type, MemberType::Way);
            }
            other => panic!("expected a relation, got {other:?}"),
        }
    }

    #[test]
    fn test_element_url() {
        let node = Node {
            id: 42,
            lat: 0.0,
            lon: 0.0,
            tags: Tags::new(),
        };
        assert_eq!(ElementRef::Node(&node).url(), "https://osm.org/node/42");
    }
}
