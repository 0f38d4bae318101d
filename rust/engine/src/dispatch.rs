// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a converter over flattened records.

use structsync_model::{ObjectGraph, ObjectKey};

use crate::convert::Converter;
use crate::error::Result;
use crate::flatten::ObjectStore;
use crate::progress::{CancellationToken, ProgressSink};
use crate::record::{ConversionRecord, ConversionStatus};

/// Converts records in order, isolating per-object failures.
///
/// Non-fatal errors settle the record as `Skipped` or `Failed` and the
/// batch continues; fatal errors stop it. The converter's finalize step, if
/// it has one, runs once after the last record.
pub struct ConversionDispatcher<'a, C: Converter + ?Sized> {
    converter: &'a mut C,
    has_finalizer: bool,
}

impl<'a, C: Converter + ?Sized> ConversionDispatcher<'a, C> {
    pub fn new(converter: &'a mut C) -> Self {
        let has_finalizer = converter.finalizer().is_some();
        Self {
            converter,
            has_finalizer,
        }
    }

    pub fn convert_all(
        &mut self,
        graph: &ObjectGraph,
        records: Vec<ConversionRecord>,
        store: &mut ObjectStore,
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<ConversionRecord>> {
        let mut settled = Vec::with_capacity(records.len());
        for mut record in records {
            cancel.check()?;
            // Taken already when reached through another record's fallback
            let Some(key) = store.take(&record.original_id) else {
                continue;
            };
            if record.convertible {
                self.convert_one(graph, key, &mut record)?;
            } else {
                self.convert_fallback(graph, &mut record, store, cancel)?;
            }
            sink.record(&record);
            settled.push(record);
        }

        if self.has_finalizer {
            self.finalize(sink)?;
        }
        Ok(settled)
    }

    fn convert_one(&mut self, graph: &ObjectGraph, key: ObjectKey, record: &mut ConversionRecord) -> Result<()> {
        match self.converter.convert_to_native(graph, key) {
            Ok(outcome) => {
                record.created_ids.extend(outcome.created_ids);
                record.converted.extend(outcome.converted);
                record.log.extend(outcome.log);
                let status = match outcome.status {
                    ConversionStatus::Unknown => ConversionStatus::Created,
                    status => status,
                };
                record.advance(status);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::debug!(id = %record.original_id, error = %e, "Conversion failed");
                record.fail(&e);
                Ok(())
            }
        }
    }

    /// Convert the display children of a non-convertible record and derive
    /// the parent's status from theirs.
    fn convert_fallback(
        &mut self,
        graph: &ObjectGraph,
        record: &mut ConversionRecord,
        store: &mut ObjectStore,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for child in record.fallback.iter_mut() {
            cancel.check()?;
            let Some(key) = store.take(&child.original_id) else {
                child.log.push("Already converted through another record".into());
                child.advance(ConversionStatus::Skipped);
                continue;
            };
            if child.convertible {
                self.convert_one(graph, key, child)?;
            } else {
                self.convert_fallback(graph, child, store, cancel)?;
            }
        }

        let converted = record.fallback.iter().filter(|c| c.status.is_success()).count();
        let attempted = record
            .fallback
            .iter()
            .filter(|c| c.status != ConversionStatus::Unknown)
            .count();
        let status = if converted > 0 {
            ConversionStatus::Created
        } else if record.fallback.iter().any(|c| c.status == ConversionStatus::Failed) {
            ConversionStatus::Failed
        } else {
            ConversionStatus::Skipped
        };
        record.log.push(format!(
            "Converted {converted} of {attempted} display objects as fallback"
        ));
        record.advance(status);
        Ok(())
    }

    fn finalize(&mut self, sink: &mut dyn ProgressSink) -> Result<()> {
        let Some(finalizer) = self.converter.finalizer() else {
            return Ok(());
        };
        match finalizer.finalize_conversion() {
            Ok(lines) => {
                for line in lines {
                    sink.log(&line);
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                let message = format!("Finalize step failed: {e}");
                tracing::warn!("{message}");
                sink.log(&message);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConversionOutcome, NativeObject};
    use crate::error::ConversionError;
    use crate::host::ElementKind;
    use crate::progress::RunReport;
    use structsync_model::{GraphObject, ObjectBody};

    /// Creates one frame per object it is asked to convert.
    #[derive(Default)]
    struct FrameCounter {
        converted: usize,
    }

    impl Converter for FrameCounter {
        fn can_convert_to_native(&self, _object: &GraphObject) -> bool {
            true
        }

        fn convert_to_native(&mut self, _graph: &ObjectGraph, _key: ObjectKey) -> Result<ConversionOutcome> {
            self.converted += 1;
            let name = self.converted.to_string();
            Ok(ConversionOutcome::created(ElementKind::Frame, name.clone(), format!("guid-{name}")))
        }

        fn can_convert_to_portable(&self, _native: &NativeObject) -> bool {
            false
        }

        fn convert_to_portable(&mut self, _native: &NativeObject, _graph: &mut ObjectGraph) -> Result<ObjectKey> {
            Err(ConversionError::NotSupported("sending".into()))
        }
    }

    fn fallback_parent(children: &[&str]) -> ConversionRecord {
        let mut parent = ConversionRecord::new("wall", None, "Wall", false);
        parent.fallback = children
            .iter()
            .map(|id| ConversionRecord::new(*id, None, "Line", true))
            .collect();
        parent
    }

    fn run(records: Vec<ConversionRecord>, store: &mut ObjectStore, graph: &ObjectGraph) -> Vec<ConversionRecord> {
        let mut converter = FrameCounter::default();
        ConversionDispatcher::new(&mut converter)
            .convert_all(graph, records, store, &CancellationToken::new(), &mut RunReport::default())
            .unwrap()
    }

    #[test]
    fn test_taken_fallback_child_is_skipped() {
        let mut graph = ObjectGraph::new();
        let wall = graph.add(GraphObject::new(ObjectBody::Generic));
        let edge = graph.add(GraphObject::new(ObjectBody::Generic));

        let mut store = ObjectStore::new();
        store.insert("wall", wall);
        store.insert("edge-a", edge);

        let settled = run(vec![fallback_parent(&["edge-a", "edge-b"])], &mut store, &graph);
        assert_eq!(settled.len(), 1);
        let parent = &settled[0];
        assert_eq!(parent.status, ConversionStatus::Created);
        assert_eq!(parent.fallback[0].status, ConversionStatus::Created);
        assert_eq!(parent.fallback[1].status, ConversionStatus::Skipped);
        assert!(parent.log.iter().any(|l| l == "Converted 1 of 2 display objects as fallback"));
    }

    #[test]
    fn test_every_child_settles() {
        let mut graph = ObjectGraph::new();
        let wall = graph.add(GraphObject::new(ObjectBody::Generic));

        let mut store = ObjectStore::new();
        store.insert("wall", wall);

        let settled = run(vec![fallback_parent(&["edge-a", "edge-b"])], &mut store, &graph);
        let parent = &settled[0];
        assert_eq!(parent.status, ConversionStatus::Skipped);
        assert!(parent
            .fallback
            .iter()
            .all(|c| c.status == ConversionStatus::Skipped));
    }

    #[test]
    fn test_record_without_stored_object_is_dropped() {
        let graph = ObjectGraph::new();
        let mut store = ObjectStore::new();
        let record = ConversionRecord::new("gone", None, "Line", true);
        assert!(run(vec![record], &mut store, &graph).is_empty());
    }
}
