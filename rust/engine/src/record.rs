// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-object conversion records, run snapshots and summaries.

use std::fmt;

use serde::{Deserialize, Serialize};
use structsync_model::GraphObject;

use crate::error::{ConversionError, Result};
use crate::host::ElementKind;

/// Outcome of converting one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConversionStatus {
    #[default]
    Unknown,
    Created,
    Updated,
    Skipped,
    Failed,
    /// Deleted from the host because the source object disappeared
    Removed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Unknown => "Unknown",
            ConversionStatus::Created => "Created",
            ConversionStatus::Updated => "Updated",
            ConversionStatus::Skipped => "Skipped",
            ConversionStatus::Failed => "Failed",
            ConversionStatus::Removed => "Removed",
        }
    }

    /// Statuses only move forward: out of `Unknown` once, and into `Removed`
    /// from any settled status.
    pub fn can_advance_to(self, next: ConversionStatus) -> bool {
        match (self, next) {
            (_, ConversionStatus::Unknown) => false,
            (ConversionStatus::Unknown, ConversionStatus::Removed) => false,
            (ConversionStatus::Unknown, _) => true,
            (ConversionStatus::Removed, _) => false,
            (_, ConversionStatus::Removed) => true,
            _ => false,
        }
    }

    /// Created or Updated.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ConversionStatus::Created | ConversionStatus::Updated)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host element produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeArtifact {
    pub category: ElementKind,
    pub name: String,
}

impl NativeArtifact {
    pub fn new(category: ElementKind, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for NativeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.category, self.name)
    }
}

/// What happened to one source object during a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Content id of the source object
    pub original_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    pub type_name: String,
    pub convertible: bool,
    pub status: ConversionStatus,
    /// GUIDs or definition names of what was written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub converted: Vec<NativeArtifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
    /// Records for the display content of a non-convertible object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback: Vec<ConversionRecord>,
}

impl ConversionRecord {
    pub fn new(
        original_id: impl Into<String>,
        application_id: Option<String>,
        type_name: impl Into<String>,
        convertible: bool,
    ) -> Self {
        Self {
            original_id: original_id.into(),
            application_id,
            type_name: type_name.into(),
            convertible,
            ..Default::default()
        }
    }

    pub fn from_object(object: &GraphObject, convertible: bool) -> Self {
        Self::new(
            object.id.clone(),
            object.application_id.clone(),
            object.simplified_type(),
            convertible,
        )
    }

    /// Correlation key across runs: the application id, else the content id.
    pub fn stable_id(&self) -> &str {
        self.application_id.as_deref().unwrap_or(&self.original_id)
    }

    /// Move to `next`, refusing backward transitions.
    pub fn advance(&mut self, next: ConversionStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                id = %self.original_id,
                from = %self.status,
                to = %next,
                "Rejected backward status transition"
            );
            false
        }
    }

    /// Record a per-object error.
    pub fn fail(&mut self, error: &ConversionError) {
        self.log.push(error.to_string());
        self.advance(error.status());
    }

    /// Every artifact of this record and its fallback children.
    pub fn all_artifacts(&self) -> Vec<&NativeArtifact> {
        let mut artifacts: Vec<&NativeArtifact> = self.converted.iter().collect();
        for child in &self.fallback {
            artifacts.extend(child.all_artifacts());
        }
        artifacts
    }
}

/// The records of one receive run, kept for reconciling the next one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<ConversionRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<ConversionRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, stable_id: &str) -> Option<&ConversionRecord> {
        self.records.iter().find(|r| r.stable_id() == stable_id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConversionError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConversionError::Serialization(e.to_string()))
    }
}

/// Counts per status for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
}

impl RunSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ConversionRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.count(record.status);
        }
        summary
    }

    pub fn count(&mut self, status: ConversionStatus) {
        match status {
            ConversionStatus::Created => self.created += 1,
            ConversionStatus::Updated => self.updated += 1,
            ConversionStatus::Skipped => self.skipped += 1,
            ConversionStatus::Failed => self.failed += 1,
            ConversionStatus::Removed => self.removed += 1,
            ConversionStatus::Unknown => {}
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed + self.removed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {}, updated {}, skipped {}, failed {}, removed {}",
            self.created, self.updated, self.skipped, self.failed, self.removed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        let mut record = ConversionRecord::new("a", None, "Node", true);
        assert!(!record.advance(ConversionStatus::Removed));
        assert!(record.advance(ConversionStatus::Created));
        assert!(!record.advance(ConversionStatus::Failed));
        assert_eq!(record.status, ConversionStatus::Created);
        assert!(record.advance(ConversionStatus::Removed));
        assert!(!record.advance(ConversionStatus::Created));
        assert_eq!(record.status, ConversionStatus::Removed);
    }

    #[test]
    fn test_fail_records_message() {
        let mut record = ConversionRecord::new("a", None, "Mesh", true);
        record.fail(&ConversionError::NotSupported("Mesh".into()));
        assert_eq!(record.status, ConversionStatus::Skipped);
        assert_eq!(record.log.len(), 1);
    }

    #[test]
    fn test_all_artifacts_includes_fallback() {
        let mut parent = ConversionRecord::new("p", None, "Wall", false);
        parent.converted.push(NativeArtifact::new(ElementKind::Area, "4"));
        let mut child = ConversionRecord::new("c", None, "Line", true);
        child.converted.push(NativeArtifact::new(ElementKind::Frame, "1"));
        parent.fallback.push(child);

        let names: Vec<String> = parent.all_artifacts().iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["Area::4", "Frame::1"]);
    }

    #[test]
    fn test_snapshot_json() {
        let mut record = ConversionRecord::new("a", Some("beam-1".into()), "Element1D", true);
        record.advance(ConversionStatus::Created);
        record.converted.push(NativeArtifact::new(ElementKind::Frame, "1"));
        let snapshot = Snapshot::new(vec![record]);

        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
        assert!(restored.find("beam-1").is_some());
        assert!(Snapshot::from_json("{").is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut a = ConversionRecord::new("a", None, "Node", true);
        a.advance(ConversionStatus::Created);
        let mut b = ConversionRecord::new("b", None, "Node", true);
        b.advance(ConversionStatus::Failed);
        let c = ConversionRecord::new("c", None, "Node", true);

        let summary = RunSummary::from_records(&[a, b, c]);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 2);
    }
}
