// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use structsync_model::{GraphObject, LinearMember, LinearMemberType, ObjectGraph, Point, Restraint};

use super::{ConversionOutcome, CsiConverter};
use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, ElementKind, ElementProperty, EndReleases, DEFAULT_SECTION};
use crate::reconcile::connectivity;
use crate::tables::FRAME_CONNECTIVITY_TABLE;

impl<D: ElementDatabase> CsiConverter<D> {
    pub(super) fn frame_to_native(
        &mut self,
        graph: &ObjectGraph,
        object: &GraphObject,
        member: &LinearMember,
    ) -> Result<ConversionOutcome> {
        if member.member_type == LinearMemberType::Link {
            return Err(ConversionError::NotSupported("link members".into()));
        }

        let (start, end) = member_endpoints(graph, member)?;
        if start.coincides(&end, self.config.point_tolerance) {
            return Err(ConversionError::failed("Cannot create frame: identical points"));
        }

        let existing = match self.existing_target(object, ElementKind::Frame) {
            Ok(existing) => existing,
            Err(skipped) => return Ok(skipped),
        };
        let section = match member.property {
            Some(key) => self.ensure_section(graph, key)?,
            None => DEFAULT_SECTION.to_string(),
        };

        let mut log = Vec::new();
        let (name, created) = match existing {
            Some(name) => {
                if self.update_frame_geometry(&name, start, end)? {
                    log.push(format!("Frame {name} reconnected"));
                }
                (name, false)
            }
            None => {
                let name = self.db.add_frame_by_coord(start, end, &section)?;
                let name = self.apply_name(ElementKind::Frame, &name, member.name.as_deref(), object, &mut log);
                (name, true)
            }
        };
        self.queue_refresh(FRAME_CONNECTIVITY_TABLE);

        self.db
            .set_property(ElementKind::Frame, &name, ElementProperty::Section(section))?;
        self.set_frame_properties(&name, member, &mut log)?;

        let outcome = if created {
            let guid = self.assign_guid(ElementKind::Frame, &name, object)?;
            ConversionOutcome::created(ElementKind::Frame, name, guid)
        } else {
            let guid = self.db.guid(ElementKind::Frame, &name)?;
            ConversionOutcome::updated(ElementKind::Frame, name, guid)
        };
        Ok(outcome.with_log(log))
    }

    /// Move a frame's ends onto `start` and `end` without moving shared
    /// points. Returns whether the connectivity changed.
    pub(super) fn update_frame_geometry(&mut self, name: &str, start: Point, end: Point) -> Result<bool> {
        let tolerance = self.config.point_tolerance;
        connectivity::update_frame_connectivity(&mut self.db, name, start, end, tolerance)
    }

    fn set_frame_properties(&mut self, name: &str, member: &LinearMember, log: &mut Vec<String>) -> Result<()> {
        let kind = ElementKind::Frame;
        if member.orientation_angle != 0.0 {
            self.db
                .set_property(kind, name, ElementProperty::LocalAxis(member.orientation_angle.to_degrees()))?;
        }
        if member.end1_releases.is_some() || member.end2_releases.is_some() {
            let releases = end_releases(member.end1_releases.as_ref(), member.end2_releases.as_ref());
            if let Err(e) = self.db.set_property(kind, name, ElementProperty::Releases(releases)) {
                log.push(format!("End releases of frame {name} not set: {e}"));
            }
        }
        if let Some(modifiers) = &member.stiffness_modifiers {
            self.db
                .set_property(kind, name, ElementProperty::Modifiers(modifiers.clone()))?;
        }
        if let Some(pier) = &member.pier {
            self.db.set_property(kind, name, ElementProperty::Pier(pier.clone()))?;
        }
        if let Some(spandrel) = &member.spandrel {
            self.db
                .set_property(kind, name, ElementProperty::Spandrel(spandrel.clone()))?;
        }
        if let Some(procedure) = member.design_procedure {
            self.db
                .set_property(kind, name, ElementProperty::DesignProcedure(procedure.code()))?;
        }
        if let Some(cardinal) = member.cardinal_point {
            self.db
                .set_property(kind, name, ElementProperty::CardinalPoint(cardinal))?;
        }
        Ok(())
    }
}

/// End points from the end nodes, else from the centerline.
fn member_endpoints(graph: &ObjectGraph, member: &LinearMember) -> Result<(Point, Point)> {
    match (member.end1_node, member.end2_node, member.base_line) {
        (Some(end1), Some(end2), _) => Ok((graph.node(end1)?.base_point, graph.node(end2)?.base_point)),
        (_, _, Some(line)) => Ok((line.start, line.end)),
        _ => Err(ConversionError::failed(
            "linear member has neither end nodes nor a centerline",
        )),
    }
}

/// Releases from fixity codes: a degree of freedom that is not fixed is
/// released, springs keep their stiffness.
fn end_releases(end1: Option<&Restraint>, end2: Option<&Restraint>) -> EndReleases {
    let released = |restraint: Option<&Restraint>| {
        restraint
            .map(|r| r.fixities().map(|fixed| !fixed))
            .unwrap_or([false; 6])
    };
    let stiffness = |restraint: Option<&Restraint>| restraint.map(|r| r.stiffness).unwrap_or([0.0; 6]);
    EndReleases {
        end1: released(end1),
        end2: released(end2),
        end1_stiffness: stiffness(end1),
        end2_stiffness: stiffness(end2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_releases() {
        let pinned = Restraint::pinned();
        let releases = end_releases(Some(&pinned), None);
        assert_eq!(releases.end1, [false, false, false, true, true, true]);
        assert_eq!(releases.end2, [false; 6]);
    }
}
