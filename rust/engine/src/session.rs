// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receive and send runs against one host.

use structsync_model::{GraphObject, Member, ObjectBody, ObjectGraph};

use crate::config::SyncConfig;
use crate::convert::{Converter, CsiConverter, NativeObject};
use crate::dispatch::ConversionDispatcher;
use crate::error::{ConversionError, Result};
use crate::flatten::{GraphFlattener, ObjectStore};
use crate::host::ElementDatabase;
use crate::progress::{CancellationToken, ProgressSink};
use crate::reconcile::ReconciliationEngine;
use crate::record::{ConversionRecord, ConversionStatus, RunSummary, Snapshot};

/// Result of a receive.
#[derive(Debug, Clone)]
pub struct ReceiveOutcome {
    /// Records of this run, to pass as `previous` next time
    pub snapshot: Snapshot,
    /// Previous records whose elements were deleted
    pub removed: Vec<ConversionRecord>,
    pub summary: RunSummary,
}

/// Result of a send.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub graph: ObjectGraph,
    pub records: Vec<ConversionRecord>,
    pub summary: RunSummary,
}

/// A synchronization session over one element database.
pub struct SyncSession<D: ElementDatabase> {
    converter: CsiConverter<D>,
    store: ObjectStore,
}

impl<D: ElementDatabase> SyncSession<D> {
    pub fn new(db: D, config: SyncConfig) -> Self {
        Self {
            converter: CsiConverter::new(db, config),
            store: ObjectStore::new(),
        }
    }

    pub fn database(&self) -> &D {
        self.converter.database()
    }

    pub fn database_mut(&mut self) -> &mut D {
        self.converter.database_mut()
    }

    pub fn into_database(self) -> D {
        self.converter.into_database()
    }

    pub fn config(&self) -> &SyncConfig {
        self.converter.config()
    }

    /// Write `graph` into the host.
    ///
    /// Flattens the graph, converts every record, then deletes the elements
    /// of `previous` records that are gone. Cancellation stops the run
    /// between objects; nothing already written is rolled back.
    pub fn receive(
        &mut self,
        graph: &ObjectGraph,
        previous: &Snapshot,
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> Result<ReceiveOutcome> {
        let root = graph
            .root()
            .ok_or_else(|| ConversionError::failed("object graph has no root"))?;
        cancel.check()?;

        self.store.clear();
        self.converter.set_previous_snapshot(previous);

        let records = {
            let converter = &self.converter;
            GraphFlattener::new(converter.config()).flatten(
                graph,
                root,
                |object| converter.can_convert_to_native(object),
                &mut self.store,
                sink,
            )?
        };
        tracing::info!(records = records.len(), "Receiving object graph");
        sink.log(&format!("Found {} object(s) to convert", records.len()));

        let current = ConversionDispatcher::new(&mut self.converter).convert_all(
            graph,
            records,
            &mut self.store,
            cancel,
            sink,
        )?;
        self.store.clear();

        let removed = ReconciliationEngine::new(&previous.records, &current)
            .apply(self.converter.database_mut(), sink);

        let mut summary = RunSummary::from_records(&current);
        summary.removed = removed.len();
        sink.summary(&summary);
        tracing::info!(%summary, "Receive finished");

        Ok(ReceiveOutcome {
            snapshot: Snapshot::new(current),
            removed,
            summary,
        })
    }

    /// Build a graph from host elements.
    ///
    /// Each element becomes one object under a root collection; points
    /// shared by several elements become one node.
    pub fn send(
        &mut self,
        selection: &[NativeObject],
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> Result<SendOutcome> {
        self.converter.begin_send();
        let mut graph = ObjectGraph::new();
        let mut elements = Vec::with_capacity(selection.len());
        let mut records = Vec::with_capacity(selection.len());

        for native in selection {
            cancel.check()?;
            let mut record = ConversionRecord::new(native.to_string(), None, native.kind.as_str(), true);
            if !self.converter.can_convert_to_portable(native) {
                record.fail(&ConversionError::NotSupported(format!("sending {}", native.kind)));
            } else {
                match self.converter.convert_to_portable(native, &mut graph) {
                    Ok(key) => {
                        elements.push(key);
                        if let Some(object) = graph.get(key) {
                            record.application_id = object.application_id.clone();
                        }
                        record.advance(ConversionStatus::Created);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => record.fail(&e),
                }
            }
            sink.record(&record);
            records.push(record);
        }

        graph.add_root(
            GraphObject::new(ObjectBody::Collection {
                name: self.converter.database().program_version(),
            })
            .with_member("elements", Member::List(elements)),
        );

        let summary = RunSummary::from_records(&records);
        sink.summary(&summary);
        tracing::info!(%summary, objects = graph.len(), "Send finished");

        Ok(SendOutcome {
            graph,
            records,
            summary,
        })
    }
}
