// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use structsync_model::{GraphObject, Line, Node};

use super::{ConversionOutcome, CsiConverter};
use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, ElementKind, ElementProperty, DEFAULT_SECTION};
use crate::reconcile::connectivity;

impl<D: ElementDatabase> CsiConverter<D> {
    /// Nodes reuse a coincident host point; only a point created here
    /// counts as created.
    pub(super) fn node_to_native(&mut self, object: &GraphObject, node: &Node) -> Result<ConversionOutcome> {
        let tolerance = self.config.point_tolerance;
        let existing = match self.existing_target(object, ElementKind::Point) {
            Ok(existing) => existing,
            Err(skipped) => return Ok(skipped),
        };

        let mut log = Vec::new();
        let (name, reused) = match existing {
            Some(current) => {
                let name = connectivity::resolve_point(&mut self.db, Some(&current), node.base_point, tolerance)?;
                if name != current {
                    log.push(format!("Point {current} moved to {name}"));
                    connectivity::purge_orphan_points(&mut self.db, &[current]);
                }
                (name, true)
            }
            None => match self.db.find_point(node.base_point, tolerance) {
                Some(name) => (name, true),
                None => (self.db.add_point(node.base_point)?, false),
            },
        };

        let name = if reused {
            name
        } else {
            self.apply_name(ElementKind::Point, &name, node.name.as_deref(), object, &mut log)
        };
        if let Some(restraint) = &node.restraint {
            self.db
                .set_property(ElementKind::Point, &name, ElementProperty::Restraint(restraint.fixities()))?;
        }
        let guid = self.assign_guid(ElementKind::Point, &name, object)?;

        let outcome = if reused {
            ConversionOutcome::updated(ElementKind::Point, name, guid)
        } else {
            ConversionOutcome::created(ElementKind::Point, name, guid)
        };
        Ok(outcome.with_log(log))
    }

    /// A bare line becomes a frame with the default section.
    pub(super) fn line_to_native(&mut self, object: &GraphObject, line: &Line) -> Result<ConversionOutcome> {
        if line.length() <= self.config.point_tolerance {
            return Err(ConversionError::failed("Cannot create frame: identical points"));
        }
        let existing = match self.existing_target(object, ElementKind::Frame) {
            Ok(existing) => existing,
            Err(skipped) => return Ok(skipped),
        };
        if let Some(name) = existing {
            self.update_frame_geometry(&name, line.start, line.end)?;
            let guid = self.db.guid(ElementKind::Frame, &name)?;
            return Ok(ConversionOutcome::updated(ElementKind::Frame, name, guid));
        }

        let name = self.db.add_frame_by_coord(line.start, line.end, DEFAULT_SECTION)?;
        self.queue_refresh(crate::tables::FRAME_CONNECTIVITY_TABLE);
        let guid = self.assign_guid(ElementKind::Frame, &name, object)?;
        Ok(ConversionOutcome::created(ElementKind::Frame, name, guid))
    }
}
