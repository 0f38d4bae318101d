// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Load patterns and element loads. Loads target elements received earlier
//! in the same run, so they are converted after their elements.

use structsync_model::{
    BeamLoad, BeamLoadKind, FaceLoad, LoadPattern, LoadPatternKind, NodeLoad, ObjectBody, ObjectGraph, ObjectKey,
};

use super::{ConversionOutcome, CsiConverter};
use crate::error::{ConversionError, Result};
use crate::host::{Definition, ElementDatabase, ElementKind, LoadAssignment};
use crate::record::ConversionStatus;

impl<D: ElementDatabase> CsiConverter<D> {
    pub(super) fn load_pattern_to_native(&mut self, pattern: &LoadPattern) -> Result<ConversionOutcome> {
        if self.db.exists(ElementKind::LoadPattern, &pattern.name) {
            return Ok(ConversionOutcome::skipped(format!(
                "Load pattern {} already defined",
                pattern.name
            )));
        }
        self.db.define(
            &pattern.name,
            Definition::LoadPattern {
                kind: pattern.kind,
                self_weight_multiplier: pattern.self_weight_multiplier,
            },
        )?;
        Ok(ConversionOutcome::defined(&pattern.name))
    }

    pub(super) fn node_load_to_native(&mut self, graph: &ObjectGraph, load: &NodeLoad) -> Result<ConversionOutcome> {
        let mut log = self.ensure_pattern(&load.pattern)?;
        let mut targets = Vec::with_capacity(load.nodes.len());
        for &key in &load.nodes {
            let at = graph.node(key)?.base_point;
            let point = self
                .db
                .find_point(at, self.config.point_tolerance)
                .ok_or_else(|| {
                    ConversionError::failed(format!("no point at ({}, {}, {}) for node load", at.x, at.y, at.z))
                })?;
            self.db.assign_load(
                ElementKind::Point,
                &point,
                LoadAssignment::PointForce {
                    pattern: load.pattern.clone(),
                    direction: load.direction,
                    value: load.value,
                },
            )?;
            targets.push(point);
        }
        log.push(format!("Point load assigned to {} point(s)", targets.len()));
        Ok(load_outcome(targets, log))
    }

    pub(super) fn beam_load_to_native(&mut self, graph: &ObjectGraph, load: &BeamLoad) -> Result<ConversionOutcome> {
        if load.values.is_empty() {
            return Err(ConversionError::failed("beam load has no values"));
        }
        let assignments: Vec<LoadAssignment> = match load.kind {
            BeamLoadKind::Uniform => vec![LoadAssignment::FrameUniform {
                pattern: load.pattern.clone(),
                direction: load.direction,
                value: load.values[0],
            }],
            BeamLoadKind::Point => {
                if load.positions.len() != load.values.len() {
                    return Err(ConversionError::failed(format!(
                        "beam load has {} values but {} positions",
                        load.values.len(),
                        load.positions.len()
                    )));
                }
                load.values
                    .iter()
                    .zip(&load.positions)
                    .map(|(&value, &position)| LoadAssignment::FramePoint {
                        pattern: load.pattern.clone(),
                        direction: load.direction,
                        value,
                        relative_distance: position.clamp(0.0, 1.0),
                    })
                    .collect()
            }
        };

        let mut log = self.ensure_pattern(&load.pattern)?;
        let mut targets = Vec::with_capacity(load.elements.len());
        for &key in &load.elements {
            let frame = self.load_target(graph, key, ElementKind::Frame)?;
            for assignment in &assignments {
                self.db
                    .assign_load(ElementKind::Frame, &frame, assignment.clone())?;
            }
            targets.push(frame);
        }
        log.push(format!("Frame load assigned to {} frame(s)", targets.len()));
        Ok(load_outcome(targets, log))
    }

    pub(super) fn face_load_to_native(&mut self, graph: &ObjectGraph, load: &FaceLoad) -> Result<ConversionOutcome> {
        let mut log = self.ensure_pattern(&load.pattern)?;
        let mut targets = Vec::with_capacity(load.elements.len());
        for &key in &load.elements {
            let area = self.load_target(graph, key, ElementKind::Area)?;
            self.db.assign_load(
                ElementKind::Area,
                &area,
                LoadAssignment::AreaUniform {
                    pattern: load.pattern.clone(),
                    direction: load.direction,
                    value: load.value,
                },
            )?;
            targets.push(area);
        }
        log.push(format!("Area load assigned to {} area(s)", targets.len()));
        Ok(load_outcome(targets, log))
    }

    /// Define a missing load pattern with default settings.
    fn ensure_pattern(&mut self, name: &str) -> Result<Vec<String>> {
        if self.db.exists(ElementKind::LoadPattern, name) {
            return Ok(Vec::new());
        }
        self.db.define(
            name,
            Definition::LoadPattern {
                kind: LoadPatternKind::Other,
                self_weight_multiplier: 0.0,
            },
        )?;
        Ok(vec![format!("Load pattern {name} defined with default settings")])
    }

    /// Host element a load refers to, found by GUID or by source name.
    fn load_target(&self, graph: &ObjectGraph, key: ObjectKey, kind: ElementKind) -> Result<String> {
        let object = graph.object(key)?;
        if let Some(name) = self.find_existing(object, kind) {
            return Ok(name);
        }
        let source_name = match &object.body {
            ObjectBody::LinearMember(member) => member.name.as_deref(),
            ObjectBody::SurfaceMember(member) => member.name.as_deref(),
            _ => None,
        };
        source_name
            .filter(|name| self.db.exists(kind, name))
            .map(String::from)
            .ok_or_else(|| {
                ConversionError::failed(format!(
                    "{kind} for load target {} not found, receive the element first",
                    object.stable_id()
                ))
            })
    }
}

/// Loads have no GUID of their own; targets identify what was written.
fn load_outcome(targets: Vec<String>, log: Vec<String>) -> ConversionOutcome {
    ConversionOutcome {
        status: ConversionStatus::Created,
        created_ids: targets,
        converted: Vec::new(),
        log,
    }
}
