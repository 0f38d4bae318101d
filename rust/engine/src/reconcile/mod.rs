// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation of a receive against the previous one.
//!
//! Records are correlated by stable id. A previous record with no current
//! counterpart is stale: its frames, areas and points are deleted from the
//! host. Definitions are left in place.

pub mod connectivity;

use rustc_hash::FxHashSet;

use crate::host::{ElementDatabase, ElementKind};
use crate::progress::ProgressSink;
use crate::record::{ConversionRecord, ConversionStatus, NativeArtifact};

/// Compares two runs and removes what disappeared.
pub struct ReconciliationEngine<'a> {
    previous: &'a [ConversionRecord],
    current: &'a [ConversionRecord],
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(previous: &'a [ConversionRecord], current: &'a [ConversionRecord]) -> Self {
        Self { previous, current }
    }

    /// Previous records with host elements and no current counterpart.
    pub fn stale_records(&self) -> Vec<&'a ConversionRecord> {
        let current: FxHashSet<&str> = self.current.iter().map(|r| r.stable_id()).collect();
        self.previous
            .iter()
            .filter(|r| !current.contains(r.stable_id()))
            .filter(|r| r.all_artifacts().iter().any(|a| a.category.is_element()))
            .collect()
    }

    /// Delete the elements of stale records.
    ///
    /// Frames and areas go before points so points are free when their turn
    /// comes. A failed delete is logged and skipped. Returns copies of the
    /// stale records that lost at least one element, marked `Removed`.
    pub fn apply<D: ElementDatabase + ?Sized>(&self, db: &mut D, sink: &mut dyn ProgressSink) -> Vec<ConversionRecord> {
        let stale = self.stale_records();
        let mut removed: Vec<(ConversionRecord, usize)> =
            stale.iter().map(|&record| (record.clone(), 0)).collect();

        for pass in [Pass::Members, Pass::Points] {
            for (record, deleted) in removed.iter_mut() {
                let artifacts: Vec<NativeArtifact> = record
                    .all_artifacts()
                    .into_iter()
                    .filter(|a| pass.includes(a.category))
                    .cloned()
                    .collect();
                for artifact in artifacts {
                    match db.delete(artifact.category, &artifact.name) {
                        Ok(()) => {
                            *deleted += 1;
                            tracing::debug!(%artifact, id = %record.stable_id(), "Deleted stale element");
                        }
                        Err(e) => {
                            let message = format!("Could not delete {artifact}: {e}");
                            tracing::warn!("{message}");
                            sink.log(&message);
                            record.log.push(message);
                        }
                    }
                }
            }
        }

        removed
            .into_iter()
            .filter(|(_, deleted)| *deleted > 0)
            .map(|(mut record, deleted)| {
                record.advance(ConversionStatus::Removed);
                sink.log(&format!(
                    "Removed {} {} ({deleted} element(s))",
                    record.type_name,
                    record.stable_id()
                ));
                sink.record(&record);
                record
            })
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Members,
    Points,
}

impl Pass {
    fn includes(self, category: ElementKind) -> bool {
        match self {
            Pass::Members => matches!(category, ElementKind::Frame | ElementKind::Area),
            Pass::Points => category == ElementKind::Point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDatabase, DEFAULT_SECTION};
    use crate::progress::RunReport;
    use structsync_model::Point;

    fn frame_record(db: &mut MemoryDatabase, id: &str) -> ConversionRecord {
        let name = db
            .add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0), DEFAULT_SECTION)
            .unwrap();
        let mut record = ConversionRecord::new(id, None, "Element1D", true);
        record.advance(ConversionStatus::Created);
        record.converted.push(NativeArtifact::new(ElementKind::Frame, name));
        record
    }

    #[test]
    fn test_stale_record_is_removed() {
        let mut db = MemoryDatabase::default();
        let previous = vec![frame_record(&mut db, "A")];
        let mut report = RunReport::default();

        let removed = ReconciliationEngine::new(&previous, &[]).apply(&mut db, &mut report);

        assert_eq!(db.deleted(), [(ElementKind::Frame, "1".to_string())]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].status, ConversionStatus::Removed);
        assert_eq!(previous[0].status, ConversionStatus::Created);
    }

    #[test]
    fn test_matching_record_is_kept() {
        let mut db = MemoryDatabase::default();
        let previous = vec![frame_record(&mut db, "A")];
        let current = previous.clone();
        let mut report = RunReport::default();

        let removed = ReconciliationEngine::new(&previous, &current).apply(&mut db, &mut report);
        assert!(removed.is_empty());
        assert!(db.deleted().is_empty());
    }

    #[test]
    fn test_failed_delete_is_logged() {
        let mut db = MemoryDatabase::default();
        let mut stale = frame_record(&mut db, "A");
        stale.converted.push(NativeArtifact::new(ElementKind::Area, "missing"));
        let previous = vec![stale];
        let mut report = RunReport::default();

        let removed = ReconciliationEngine::new(&previous, &[]).apply(&mut db, &mut report);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].log.len(), 1);
        assert!(report.messages.iter().any(|m| m.contains("Area::missing")));
    }

    #[test]
    fn test_definitions_are_not_deleted() {
        let mut db = MemoryDatabase::default();
        let mut record = ConversionRecord::new("S", None, "Property1D", true);
        record.advance(ConversionStatus::Created);
        record.created_ids.push("W12".into());
        let previous = vec![record];
        let mut report = RunReport::default();

        let engine = ReconciliationEngine::new(&previous, &[]);
        assert!(engine.stale_records().is_empty());
        assert!(engine.apply(&mut db, &mut report).is_empty());
    }
}
