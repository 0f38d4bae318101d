// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion between graph objects and host elements.
//!
//! [`Converter`] is the seam the dispatcher drives; [`CsiConverter`] is the
//! implementation for the analysis host, split by element family.

mod area;
mod definitions;
mod frame;
mod loads;
mod point;
mod portable;

use std::fmt;

use rustc_hash::FxHashMap;
use structsync_model::{GraphObject, ObjectBody, ObjectGraph, ObjectKey, ObjectKind};

use crate::config::{ReceiveMode, SyncConfig};
use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, ElementKind};
use crate::record::{ConversionStatus, NativeArtifact, Snapshot};
use crate::tables::{self, ProgramVersion};

/// A host element selected for sending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeObject {
    pub kind: ElementKind,
    pub name: String,
}

impl NativeObject {
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.kind, self.name)
    }
}

/// What a successful conversion wrote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionOutcome {
    pub status: ConversionStatus,
    pub created_ids: Vec<String>,
    pub converted: Vec<NativeArtifact>,
    pub log: Vec<String>,
}

impl ConversionOutcome {
    pub fn created(kind: ElementKind, name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self::written(ConversionStatus::Created, kind, name, guid)
    }

    pub fn updated(kind: ElementKind, name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self::written(ConversionStatus::Updated, kind, name, guid)
    }

    fn written(status: ConversionStatus, kind: ElementKind, name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self {
            status,
            created_ids: vec![guid.into()],
            converted: vec![NativeArtifact::new(kind, name)],
            log: Vec::new(),
        }
    }

    /// A definition identified by its name rather than a GUID.
    pub fn defined(name: impl Into<String>) -> Self {
        Self {
            status: ConversionStatus::Created,
            created_ids: vec![name.into()],
            ..Default::default()
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: ConversionStatus::Skipped,
            log: vec![reason.into()],
            ..Default::default()
        }
    }

    pub fn with_log(mut self, log: Vec<String>) -> Self {
        self.log.extend(log);
        self
    }
}

/// Post-batch step, run once after every record of a receive.
pub trait FinalizeConversion {
    /// Returns log lines for the progress sink.
    fn finalize_conversion(&mut self) -> Result<Vec<String>>;
}

/// Converts graph objects to host elements and back.
pub trait Converter {
    fn can_convert_to_native(&self, object: &GraphObject) -> bool;

    fn convert_to_native(&mut self, graph: &ObjectGraph, key: ObjectKey) -> Result<ConversionOutcome>;

    fn can_convert_to_portable(&self, native: &NativeObject) -> bool;

    /// Add the portable form of `native` to `graph`.
    fn convert_to_portable(&mut self, native: &NativeObject, graph: &mut ObjectGraph) -> Result<ObjectKey>;

    /// Records of the previous receive, used to find existing elements.
    fn set_previous_snapshot(&mut self, _previous: &Snapshot) {}

    fn finalizer(&mut self) -> Option<&mut dyn FinalizeConversion> {
        None
    }
}

/// Converter for the analysis host.
pub struct CsiConverter<D: ElementDatabase> {
    db: D,
    config: SyncConfig,
    version: Option<ProgramVersion>,
    /// GUID or stable id to element, for finding objects received before
    existing: FxHashMap<String, (ElementKind, String)>,
    /// Stable id to the artifacts it produced last run
    previous: FxHashMap<String, Vec<NativeArtifact>>,
    pending_refresh: Vec<&'static str>,
    /// Native name to graph object, per send
    sent: FxHashMap<(ElementKind, String), ObjectKey>,
}

impl<D: ElementDatabase> CsiConverter<D> {
    pub fn new(db: D, config: SyncConfig) -> Self {
        let version = ProgramVersion::parse(&db.program_version());
        Self {
            db,
            config,
            version,
            existing: FxHashMap::default(),
            previous: FxHashMap::default(),
            pending_refresh: Vec::new(),
            sent: FxHashMap::default(),
        }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut D {
        &mut self.db
    }

    pub fn into_database(self) -> D {
        self.db
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn program_version(&self) -> Option<ProgramVersion> {
        self.version
    }

    /// Reset per-send caches.
    pub fn begin_send(&mut self) {
        self.sent.clear();
    }

    /// Existing element of `kind` that `object` was received into before.
    ///
    /// Looks the stable id up among host GUIDs and this run's conversions
    /// first, then among the previous run's artifacts.
    fn find_existing(&self, object: &GraphObject, kind: ElementKind) -> Option<String> {
        if let Some((found, name)) = self.existing.get(object.stable_id()) {
            if *found == kind && self.db.exists(kind, name) {
                return Some(name.clone());
            }
        }
        self.previous.get(object.stable_id()).and_then(|artifacts| {
            artifacts
                .iter()
                .find(|a| a.category == kind && self.db.exists(kind, &a.name))
                .map(|a| a.name.clone())
        })
    }

    /// Existing element to update, or `None` to create. `Err` carries the
    /// outcome for an element left alone.
    fn existing_target(
        &self,
        object: &GraphObject,
        kind: ElementKind,
    ) -> std::result::Result<Option<String>, ConversionOutcome> {
        match (self.find_existing(object, kind), self.config.receive_mode) {
            (None, _) | (Some(_), ReceiveMode::Create) => Ok(None),
            (Some(name), ReceiveMode::Update) => Ok(Some(name)),
            (Some(name), ReceiveMode::Ignore) => Err(ConversionOutcome::skipped(format!(
                "{kind} {name} already exists and receive mode is ignore"
            ))),
        }
    }

    /// Stamp the application id onto a new element, or read the host GUID.
    fn assign_guid(&mut self, kind: ElementKind, name: &str, object: &GraphObject) -> Result<String> {
        let guid = match &object.application_id {
            Some(application_id) => {
                self.db.set_guid(kind, name, application_id)?;
                application_id.clone()
            }
            None => self.db.guid(kind, name)?,
        };
        self.existing.insert(guid.clone(), (kind, name.to_string()));
        Ok(guid)
    }

    /// Rename to the source name when one is given and free. A taken name
    /// gets the first eight characters of the content id appended.
    fn apply_name(
        &mut self,
        kind: ElementKind,
        name: &str,
        desired: Option<&str>,
        object: &GraphObject,
        log: &mut Vec<String>,
    ) -> String {
        let Some(desired) = desired.filter(|d| !d.is_empty() && *d != name) else {
            return name.to_string();
        };
        let short_id: String = object.id.chars().take(8).collect();
        let suffixed = format!("{desired}_{short_id}");
        for candidate in [desired.to_string(), suffixed] {
            if self.db.exists(kind, &candidate) {
                continue;
            }
            if self.db.rename(kind, name, &candidate).is_ok() {
                return candidate;
            }
        }
        log.push(format!("Could not rename {kind} {name} to {desired}"));
        name.to_string()
    }

    fn queue_refresh(&mut self, table: &'static str) {
        if !self.pending_refresh.contains(&table) {
            self.pending_refresh.push(table);
        }
    }
}

impl<D: ElementDatabase> Converter for CsiConverter<D> {
    fn can_convert_to_native(&self, object: &GraphObject) -> bool {
        matches!(
            object.kind(),
            ObjectKind::Node
                | ObjectKind::LinearMember
                | ObjectKind::SurfaceMember
                | ObjectKind::Line
                | ObjectKind::SectionProperty
                | ObjectKind::SurfaceProperty
                | ObjectKind::Material
                | ObjectKind::Diaphragm
                | ObjectKind::LoadPattern
                | ObjectKind::NodeLoad
                | ObjectKind::BeamLoad
                | ObjectKind::FaceLoad
        )
    }

    fn convert_to_native(&mut self, graph: &ObjectGraph, key: ObjectKey) -> Result<ConversionOutcome> {
        let object = graph.object(key)?;
        let outcome = match &object.body {
            ObjectBody::Node(node) => self.node_to_native(object, node),
            ObjectBody::LinearMember(member) => self.frame_to_native(graph, object, member),
            ObjectBody::SurfaceMember(member) => self.area_to_native(graph, object, member),
            ObjectBody::Line(line) => self.line_to_native(object, line),
            ObjectBody::SectionProperty(section) => self.section_to_native(graph, section),
            ObjectBody::SurfaceProperty(property) => self.surface_property_to_native(graph, property),
            ObjectBody::Material(material) => self.material_to_native(material),
            ObjectBody::Diaphragm(diaphragm) => self.diaphragm_to_native(diaphragm),
            ObjectBody::LoadPattern(pattern) => self.load_pattern_to_native(pattern),
            ObjectBody::NodeLoad(load) => self.node_load_to_native(graph, load),
            ObjectBody::BeamLoad(load) => self.beam_load_to_native(graph, load),
            ObjectBody::FaceLoad(load) => self.face_load_to_native(graph, load),
            ObjectBody::Collection { .. } | ObjectBody::Generic | ObjectBody::Mesh(_) => Err(
                ConversionError::NotSupported(format!("{} has no native counterpart", object.simplified_type())),
            ),
        }?;

        if let Some(artifact) = outcome.converted.first() {
            self.existing.insert(
                object.stable_id().to_string(),
                (artifact.category, artifact.name.clone()),
            );
        }
        Ok(outcome)
    }

    fn can_convert_to_portable(&self, native: &NativeObject) -> bool {
        native.kind.is_element()
    }

    fn convert_to_portable(&mut self, native: &NativeObject, graph: &mut ObjectGraph) -> Result<ObjectKey> {
        match native.kind {
            ElementKind::Point => self.point_to_portable(&native.name, graph),
            ElementKind::Frame => self.frame_to_portable(&native.name, graph),
            ElementKind::Area => self.area_to_portable(&native.name, graph),
            other => Err(ConversionError::NotSupported(format!("sending {other} definitions"))),
        }
    }

    fn set_previous_snapshot(&mut self, previous: &Snapshot) {
        self.existing = self.db.guid_index();
        self.previous = previous
            .records
            .iter()
            .map(|record| {
                let artifacts = record.all_artifacts().into_iter().cloned().collect();
                (record.stable_id().to_string(), artifacts)
            })
            .collect();
        self.pending_refresh.clear();
    }

    fn finalizer(&mut self) -> Option<&mut dyn FinalizeConversion> {
        Some(self)
    }
}

impl<D: ElementDatabase> FinalizeConversion for CsiConverter<D> {
    /// Refresh the connectivity tables touched by updates so the host
    /// recomputes dependent data.
    fn finalize_conversion(&mut self) -> Result<Vec<String>> {
        let mut log = Vec::new();
        for table in std::mem::take(&mut self.pending_refresh) {
            let report = tables::refresh_table(&mut self.db, table)?;
            log.push(format!(
                "Refreshed {table}: {} warning(s), {} error(s)",
                report.warnings, report.errors
            ));
        }
        Ok(log)
    }
}
