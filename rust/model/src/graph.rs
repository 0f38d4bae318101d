// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the portable object graph.
//!
//! The [`ObjectGraph`] owns every object in a slot map. Members and element
//! bodies refer to other objects by [`ObjectKey`], which lets one node be
//! shared by many members and lets the same object appear under several
//! parents. Cycles are representable; traversals must track what they have
//! visited.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use slotmap::SlotMap;

use crate::elements::Node;
use crate::error::{Error, Result};
use crate::keys::ObjectKey;
use crate::object::{GraphObject, ObjectBody, ObjectKind};
use crate::primitives::Point;
use crate::properties::{Material, SectionProperty, SurfaceProperty};

/// The portable object graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectGraph {
    objects: SlotMap<ObjectKey, GraphObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<ObjectKey>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, filling its content id when empty.
    pub fn add(&mut self, mut object: GraphObject) -> ObjectKey {
        if object.id.is_empty() {
            object.id = content_id(&object);
        }
        self.objects.insert(object)
    }

    /// Insert an object and make it the root.
    pub fn add_root(&mut self, object: GraphObject) -> ObjectKey {
        let key = self.add(object);
        self.root = Some(key);
        key
    }

    pub fn set_root(&mut self, key: ObjectKey) {
        self.root = Some(key);
    }

    pub fn root(&self) -> Option<ObjectKey> {
        self.root
    }

    pub fn get(&self, key: ObjectKey) -> Option<&GraphObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut GraphObject> {
        self.objects.get_mut(key)
    }

    /// Object by key, or an error naming the missing key.
    pub fn object(&self, key: ObjectKey) -> Result<&GraphObject> {
        self.objects.get(key).ok_or(Error::ObjectNotFound(key))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &GraphObject)> {
        self.objects.iter()
    }

    /// First object carrying the given content id.
    pub fn find_by_id(&self, id: &str) -> Option<ObjectKey> {
        self.objects
            .iter()
            .find(|(_, object)| object.id == id)
            .map(|(key, _)| key)
    }

    /// Objects referenced by a named member of `key`.
    pub fn member_objects(&self, key: ObjectKey, name: &str) -> &[ObjectKey] {
        self.objects
            .get(key)
            .and_then(|object| object.member(name))
            .map(|member| member.object_keys())
            .unwrap_or(&[])
    }

    pub fn node(&self, key: ObjectKey) -> Result<&Node> {
        match &self.object(key)?.body {
            ObjectBody::Node(node) => Ok(node),
            other => Err(unexpected(ObjectKind::Node, other)),
        }
    }

    /// Base points of a ring of node references.
    pub fn node_points(&self, keys: &[ObjectKey]) -> Result<Vec<Point>> {
        keys.iter()
            .map(|&key| self.node(key).map(|node| node.base_point))
            .collect()
    }

    pub fn section_property(&self, key: ObjectKey) -> Result<&SectionProperty> {
        match &self.object(key)?.body {
            ObjectBody::SectionProperty(section) => Ok(section),
            other => Err(unexpected(ObjectKind::SectionProperty, other)),
        }
    }

    pub fn surface_property(&self, key: ObjectKey) -> Result<&SurfaceProperty> {
        match &self.object(key)?.body {
            ObjectBody::SurfaceProperty(property) => Ok(property),
            other => Err(unexpected(ObjectKind::SurfaceProperty, other)),
        }
    }

    pub fn material(&self, key: ObjectKey) -> Result<&Material> {
        match &self.object(key)?.body {
            ObjectBody::Material(material) => Ok(material),
            other => Err(unexpected(ObjectKind::Material, other)),
        }
    }
}

fn unexpected(expected: ObjectKind, found: &ObjectBody) -> Error {
    Error::UnexpectedKind {
        expected,
        found: found.kind(),
    }
}

/// Content hash of an object's type, application id, body and members.
///
/// Identical objects hash to the same id, which is how the graph expresses
/// sharing across independently built subtrees.
pub fn content_id(object: &GraphObject) -> String {
    let mut hasher = Sha256::new();
    hasher.update(object.type_path.as_bytes());
    hasher.update([0u8]);
    if let Some(application_id) = &object.application_id {
        hasher.update(application_id.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(serde_json::to_vec(&object.body).unwrap_or_default());
    hasher.update(serde_json::to_vec(&object.members).unwrap_or_default());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::LinearMember;
    use crate::object::Member;

    #[test]
    fn test_identical_objects_share_content_id() {
        let mut graph = ObjectGraph::new();
        let a = graph.add(GraphObject::new(ObjectBody::Node(Node::at(1.0, 2.0, 3.0))));
        let b = graph.add(GraphObject::new(ObjectBody::Node(Node::at(1.0, 2.0, 3.0))));
        let c = graph.add(GraphObject::new(ObjectBody::Node(Node::at(1.0, 2.0, 4.0))));

        let id = |key| graph.get(key).map(|o| o.id.clone()).unwrap_or_default();
        assert_eq!(id(a), id(b));
        assert_ne!(id(a), id(c));
        assert_eq!(id(a).len(), 32);
    }

    #[test]
    fn test_application_id_changes_content_id() {
        let node = || GraphObject::new(ObjectBody::Node(Node::at(0.0, 0.0, 0.0)));
        assert_ne!(
            content_id(&node()),
            content_id(&node().with_application_id("n1"))
        );
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let mut graph = ObjectGraph::new();
        let key = graph.add(GraphObject::new(ObjectBody::Generic).with_id("fixed"));
        assert_eq!(graph.find_by_id("fixed"), Some(key));
    }

    #[test]
    fn test_typed_accessors() {
        let mut graph = ObjectGraph::new();
        let n1 = graph.add(GraphObject::new(ObjectBody::Node(Node::at(0.0, 0.0, 0.0))));
        let n2 = graph.add(GraphObject::new(ObjectBody::Node(Node::at(5.0, 0.0, 0.0))));
        let beam = graph.add(GraphObject::new(ObjectBody::LinearMember(
            LinearMember::between(n1, n2),
        )));

        let points = graph.node_points(&[n1, n2]).expect("both are nodes");
        assert_eq!(points[1], Point::new(5.0, 0.0, 0.0));

        match graph.node(beam) {
            Err(Error::UnexpectedKind { expected, found }) => {
                assert_eq!(expected, ObjectKind::Node);
                assert_eq!(found, ObjectKind::LinearMember);
            }
            other => panic!("expected kind mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_member_objects() {
        let mut graph = ObjectGraph::new();
        let child = graph.add(GraphObject::new(ObjectBody::Generic).with_id("child"));
        let parent = graph.add(
            GraphObject::new(ObjectBody::Generic)
                .with_member("elements", Member::List(vec![child]))
                .with_member("name", Member::Text("level 1".into())),
        );

        assert_eq!(graph.member_objects(parent, "elements"), &[child]);
        assert!(graph.member_objects(parent, "name").is_empty());
        assert!(graph.member_objects(parent, "missing").is_empty());
    }
}
