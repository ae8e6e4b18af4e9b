//! Id-indexed store of one dataset download.

use hashbrown::HashMap;

use crate::element::{Element, ElementRef, Member, MemberType, Node, Relation, Way};

/// All elements of one dataset download, indexed by id and type.
///
/// Owns every node, way and relation. Relations reference their members by
/// id; [`OsmSnapshot::resolve`] turns a member reference into a borrowed
/// [`ElementRef`], so elements are shared rather than copied.
#[derive(Clone, Debug, Default)]
pub struct OsmSnapshot {
    nodes: HashMap<i64, Node>,
    ways: HashMap<i64, Way>,
    relations: HashMap<i64, Relation>,
}

impl OsmSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a provider's element stream.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut snapshot = Self::new();
        for element in elements {
            match element {
                Element::Node(node) => {
                    snapshot.nodes.insert(node.id, node);
                }
                Element::Way(way) => {
                    snapshot.ways.insert(way.id, way);
                }
                Element::Relation(relation) => {
                    snapshot.relations.insert(relation.id, relation);
                }
            }
        }
        snapshot
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn way(&self, id: i64) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn relation(&self, id: i64) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Resolve a relation member to its element.
    ///
    /// `None` when the dataset does not contain the referenced element; the
    /// caller decides whether that degrades or skips the affected route.
    pub fn resolve(&self, member: &Member) -> Option<ElementRef<'_>> {
        match member.member_type {
            MemberType::Node => self.nodes.get(&member.id).map(ElementRef::Node),
            MemberType::Way => self.ways.get(&member.id).map(ElementRef::Way),
            MemberType::Relation => self.relations.get(&member.id).map(ElementRef::Relation),
        }
    }
}
