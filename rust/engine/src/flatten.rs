// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flattening of the object graph into conversion records.
//!
//! Traversal is depth-first with an explicit stack. Every object is visited
//! at most once per pass, keyed by content id. Convertible objects and
//! objects carrying a display member only descend into their element
//! members; anything else descends into all of its members. Non-convertible
//! objects with display content get fallback child records. The resulting
//! list is emitted in reverse of discovery order.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use structsync_model::{GraphObject, ObjectGraph, ObjectKey};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::record::ConversionRecord;

/// Objects found by traversal, keyed by content id.
///
/// The first insertion of an id wins. Entries are taken out as they are
/// converted, so each object is converted at most once.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: FxHashMap<String, ObjectKey>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless `id` is already present. Returns whether it was inserted.
    pub fn insert(&mut self, id: &str, key: ObjectKey) -> bool {
        if self.objects.contains_key(id) {
            return false;
        }
        self.objects.insert(id.to_string(), key);
        true
    }

    pub fn get(&self, id: &str) -> Option<ObjectKey> {
        self.objects.get(id).copied()
    }

    pub fn take(&mut self, id: &str) -> Option<ObjectKey> {
        self.objects.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Walks a graph and produces the records to convert.
pub struct GraphFlattener<'a> {
    display_aliases: &'a [String],
    element_aliases: &'a [String],
}

impl<'a> GraphFlattener<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self {
            display_aliases: &config.display_aliases,
            element_aliases: &config.element_aliases,
        }
    }

    /// Flatten everything reachable from `root`.
    pub fn flatten<F>(
        &self,
        graph: &ObjectGraph,
        root: ObjectKey,
        can_convert: F,
        store: &mut ObjectStore,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<ConversionRecord>>
    where
        F: Fn(&GraphObject) -> bool,
    {
        let mut seen = FxHashSet::default();
        let mut records = self.traverse(graph, &[root], &can_convert, store, &mut seen, sink)?;
        records.reverse();
        tracing::debug!(
            records = records.len(),
            visited = seen.len(),
            "Flattened object graph"
        );
        Ok(records)
    }

    fn traverse<F>(
        &self,
        graph: &ObjectGraph,
        start: &[ObjectKey],
        can_convert: &F,
        store: &mut ObjectStore,
        seen: &mut FxHashSet<String>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<ConversionRecord>>
    where
        F: Fn(&GraphObject) -> bool,
    {
        let mut records = Vec::new();
        let mut stack: Vec<ObjectKey> = start.to_vec();

        while let Some(key) = stack.pop() {
            let object = graph.object(key)?;
            if !seen.insert(object.id.clone()) {
                continue;
            }

            let convertible = can_convert(object);
            let display = if convertible {
                None
            } else {
                object.first_member(self.display_aliases)
            };

            if convertible {
                store.insert(&object.id, key);
                records.push(ConversionRecord::from_object(object, true));
            } else if let Some((alias, member)) = display {
                let mut record = ConversionRecord::from_object(object, false);
                record.fallback =
                    self.traverse(graph, member.object_keys(), can_convert, store, seen, sink)?;
                tracing::debug!(
                    id = %object.id,
                    alias,
                    children = record.fallback.len(),
                    "Using display fallback"
                );
                store.insert(&object.id, key);
                records.push(record);
            } else {
                tracing::trace!(id = %object.id, kind = %object.kind(), "No conversion path");
                sink.log(&format!(
                    "Skipped {} {}: no conversion or display fallback",
                    object.simplified_type(),
                    object.id
                ));
            }

            stack.extend(self.children(object, convertible || display.is_some()));
        }

        Ok(records)
    }

    /// Member objects to descend into, in member order.
    fn children(&self, object: &GraphObject, elements_only: bool) -> SmallVec<[ObjectKey; 8]> {
        object
            .members
            .iter()
            .filter(|(name, _)| !elements_only || self.element_aliases.iter().any(|a| a == name))
            .flat_map(|(_, member)| member.object_keys().iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RunReport;
    use structsync_model::{Line, Member, Node, ObjectBody, ObjectKind, Point};

    fn node(graph: &mut ObjectGraph, x: f64) -> ObjectKey {
        graph.add(GraphObject::new(ObjectBody::Node(Node::at(x, 0.0, 0.0))))
    }

    fn convertible(object: &GraphObject) -> bool {
        matches!(object.kind(), ObjectKind::Node | ObjectKind::Line)
    }

    #[test]
    fn test_store_first_write_wins() {
        let mut graph = ObjectGraph::new();
        let a = node(&mut graph, 0.0);
        let b = node(&mut graph, 1.0);

        let mut store = ObjectStore::new();
        assert!(store.insert("x", a));
        assert!(!store.insert("x", b));
        assert_eq!(store.get("x"), Some(a));
        assert_eq!(store.take("x"), Some(a));
        assert!(store.take("x").is_none());
    }

    #[test]
    fn test_shared_object_visited_once() {
        let mut graph = ObjectGraph::new();
        let shared = node(&mut graph, 0.0);
        let other = node(&mut graph, 1.0);
        let root = graph.add_root(
            GraphObject::new(ObjectBody::Collection { name: "model".into() })
                .with_member("elements", Member::List(vec![shared, other, shared])),
        );

        let config = SyncConfig::default();
        let mut store = ObjectStore::new();
        let mut report = RunReport::default();
        let records = GraphFlattener::new(&config)
            .flatten(&graph, root, convertible, &mut store, &mut report)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(report.messages.len(), 1, "the collection itself is skipped");
    }

    #[test]
    fn test_display_fallback_children() {
        let mut graph = ObjectGraph::new();
        let edge = graph.add(GraphObject::new(ObjectBody::Line(Line::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(4.0, 0.0, 0.0),
        ))));
        let wall = graph.add(
            GraphObject::new(ObjectBody::Generic)
                .with_type_path("Objects.BuiltElements.Wall")
                .with_member("@displayValue", Member::List(vec![edge])),
        );
        let root = graph.add_root(
            GraphObject::new(ObjectBody::Collection { name: "model".into() })
                .with_member("elements", Member::List(vec![wall])),
        );

        let config = SyncConfig::default();
        let mut store = ObjectStore::new();
        let mut report = RunReport::default();
        let records = GraphFlattener::new(&config)
            .flatten(&graph, root, convertible, &mut store, &mut report)
            .unwrap();

        assert_eq!(records.len(), 1);
        let wall_record = &records[0];
        assert!(!wall_record.convertible);
        assert_eq!(wall_record.type_name, "Wall");
        assert_eq!(wall_record.fallback.len(), 1);
        assert!(store.contains(&wall_record.fallback[0].original_id));
    }

    #[test]
    fn test_convertible_descends_into_elements_only() {
        let mut graph = ObjectGraph::new();
        let hosted = node(&mut graph, 5.0);
        let hidden = node(&mut graph, 6.0);
        let host = graph.add(
            GraphObject::new(ObjectBody::Node(Node::at(0.0, 0.0, 0.0)))
                .with_member("elements", Member::List(vec![hosted]))
                .with_member("analysis", Member::Object(hidden)),
        );
        let root = graph.add_root(
            GraphObject::new(ObjectBody::Generic).with_member("data", Member::Object(host)),
        );

        let config = SyncConfig::default();
        let mut store = ObjectStore::new();
        let mut report = RunReport::default();
        let records = GraphFlattener::new(&config)
            .flatten(&graph, root, convertible, &mut store, &mut report)
            .unwrap();

        let host_id = &graph.get(host).unwrap().id;
        let hosted_id = &graph.get(hosted).unwrap().id;
        let ids: Vec<&str> = records.iter().map(|r| r.original_id.as_str()).collect();
        assert_eq!(ids, vec![hosted_id.as_str(), host_id.as_str()]);
    }

    fn all_ids(records: &[ConversionRecord], into: &mut FxHashSet<String>) {
        for record in records {
            into.insert(record.original_id.clone());
            all_ids(&record.fallback, into);
        }
    }

    #[test]
    fn test_flatten_twice_yields_same_membership() {
        let mut graph = ObjectGraph::new();
        let shared = node(&mut graph, 0.0);
        let other = node(&mut graph, 2.0);
        let edge = graph.add(GraphObject::new(ObjectBody::Line(Line::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 3.0, 0.0),
        ))));
        let wall = graph.add(
            GraphObject::new(ObjectBody::Generic)
                .with_type_path("Objects.BuiltElements.Wall")
                .with_member("displayValue", Member::List(vec![edge])),
        );
        let level = graph.add(
            GraphObject::new(ObjectBody::Collection { name: "level 1".into() })
                .with_member("elements", Member::List(vec![shared, wall])),
        );
        let root = graph.add_root(
            GraphObject::new(ObjectBody::Collection { name: "model".into() })
                .with_member("elements", Member::List(vec![level, shared, other])),
        );

        let config = SyncConfig::default();
        let flattener = GraphFlattener::new(&config);
        let mut store = ObjectStore::new();
        let mut report = RunReport::default();

        let first = flattener
            .flatten(&graph, root, convertible, &mut store, &mut report)
            .unwrap();
        let stored = store.len();
        store.clear();
        let second = flattener
            .flatten(&graph, root, convertible, &mut store, &mut report)
            .unwrap();

        let mut first_ids = FxHashSet::default();
        let mut second_ids = FxHashSet::default();
        all_ids(&first, &mut first_ids);
        all_ids(&second, &mut second_ids);
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_ids.len(), 4, "two nodes, the wall and its edge");
        assert_eq!(store.len(), stored);
        assert!(first_ids.contains(&graph.get(edge).unwrap().id));
    }
}
