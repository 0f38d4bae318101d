// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use structsync_model::{GraphObject, ObjectGraph, ObjectKey, Point, SurfaceMember};

use super::{ConversionOutcome, CsiConverter};
use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, ElementKind, ElementProperty, PropertyKey};
use crate::reconcile::connectivity::{self, RingUpdate};
use crate::record::NativeArtifact;

impl<D: ElementDatabase> CsiConverter<D> {
    pub(super) fn area_to_native(
        &mut self,
        graph: &ObjectGraph,
        object: &GraphObject,
        member: &SurfaceMember,
    ) -> Result<ConversionOutcome> {
        let outer = self.ring_points(graph, &member.topology)?;
        let existing = match self.existing_target(object, ElementKind::Area) {
            Ok(existing) => existing,
            Err(skipped) => return Ok(skipped),
        };

        let mut log = Vec::new();
        let section = self.ensure_area_section(graph, member.property, &mut log)?;

        let mut outcome = match existing {
            Some(name) => self.update_area(object, &name, &outer, &section, member)?,
            None => {
                let name = self.db.add_area_by_coord(&outer, &section)?;
                let name = self.apply_name(ElementKind::Area, &name, member.name.as_deref(), object, &mut log);
                self.set_area_properties(&name, member, &mut log)?;
                let guid = self.assign_guid(ElementKind::Area, &name, object)?;
                ConversionOutcome::created(ElementKind::Area, name, guid)
            }
        };

        if !member.is_opening {
            if let Some(area) = outcome.converted.first().map(|a| a.name.clone()) {
                self.replace_openings(graph, object, &area, member, &section, &mut outcome)?;
            }
        }
        Ok(outcome.with_log(log))
    }

    /// Ring coordinates with a closing duplicate removed.
    fn ring_points(&self, graph: &ObjectGraph, ring: &[ObjectKey]) -> Result<Vec<Point>> {
        let mut points = graph.node_points(ring)?;
        if points.len() > 1 {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                if first.coincides(last, self.config.ring_closure_tolerance) {
                    points.pop();
                }
            }
        }
        if points.len() < 3 {
            return Err(ConversionError::failed(format!(
                "area needs at least 3 distinct points, got {}",
                points.len()
            )));
        }
        Ok(points)
    }

    fn update_area(
        &mut self,
        object: &GraphObject,
        name: &str,
        outer: &[Point],
        section: &str,
        member: &SurfaceMember,
    ) -> Result<ConversionOutcome> {
        let tolerance = self.config.point_tolerance;
        let mut log = Vec::new();
        match connectivity::update_area_ring(&mut self.db, name, outer, tolerance) {
            Ok(RingUpdate::Unchanged) => {}
            Ok(RingUpdate::Reconnected) => log.push(format!("Area {name} reconnected")),
            Ok(RingUpdate::TableEdited(report)) => {
                log.push(format!("Area {name} reconnected through {}", crate::tables::AREA_CONNECTIVITY_TABLE));
                if report.errors > 0 {
                    log.push(format!("Table import reported {} error(s): {}", report.errors, report.import_log.trim()));
                }
            }
            Err(ConversionError::StructuralIntegrityConflict(reason)) => {
                tracing::debug!(area = name, %reason, "Recreating area");
                return self.recreate_area(object, name, outer, section, member);
            }
            Err(e) => return Err(e),
        }

        self.db
            .set_property(ElementKind::Area, name, ElementProperty::AreaSection(section.to_string()))?;
        self.set_area_properties(name, member, &mut log)?;
        let guid = self.db.guid(ElementKind::Area, name)?;
        Ok(ConversionOutcome::updated(ElementKind::Area, name, guid).with_log(log))
    }

    /// Delete and re-add an area, keeping its GUID.
    fn recreate_area(
        &mut self,
        object: &GraphObject,
        name: &str,
        outer: &[Point],
        section: &str,
        member: &SurfaceMember,
    ) -> Result<ConversionOutcome> {
        let guid = self.db.guid(ElementKind::Area, name)?;
        let old_points = self.db.area_points(name)?;
        self.db.delete(ElementKind::Area, name)?;
        self.existing.remove(&guid);

        let new_name = self.db.add_area_by_coord(outer, section)?;
        let mut log = vec![format!(
            "Area {name} recreated as {new_name} to hold {} points",
            outer.len()
        )];
        let new_name = self.apply_name(ElementKind::Area, &new_name, member.name.as_deref(), object, &mut log);
        self.set_area_properties(&new_name, member, &mut log)?;
        self.db.set_guid(ElementKind::Area, &new_name, &guid)?;
        self.existing
            .insert(guid.clone(), (ElementKind::Area, new_name.clone()));
        connectivity::purge_orphan_points(&mut self.db, &old_points);

        Ok(ConversionOutcome::updated(ElementKind::Area, new_name, guid).with_log(log))
    }

    fn set_area_properties(&mut self, name: &str, member: &SurfaceMember, log: &mut Vec<String>) -> Result<()> {
        let kind = ElementKind::Area;
        if member.orientation_angle != 0.0 {
            self.db
                .set_property(kind, name, ElementProperty::LocalAxis(member.orientation_angle.to_degrees()))?;
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
        if member.is_opening {
            self.db.set_property(kind, name, ElementProperty::Opening(true))?;
        } else if let Some(diaphragm) = &member.diaphragm {
            if let Err(e) = self
                .db
                .set_property(kind, name, ElementProperty::Diaphragm(diaphragm.clone()))
            {
                log.push(format!("Diaphragm {diaphragm} not assigned to area {name}: {e}"));
            }
        }
        Ok(())
    }

    /// Remove openings created for this object last run, then add one
    /// opening area per hole ring.
    fn replace_openings(
        &mut self,
        graph: &ObjectGraph,
        object: &GraphObject,
        area: &str,
        member: &SurfaceMember,
        section: &str,
        outcome: &mut ConversionOutcome,
    ) -> Result<()> {
        let stale: Vec<String> = self
            .previous
            .get(object.stable_id())
            .map(|artifacts| {
                artifacts
                    .iter()
                    .filter(|a| a.category == ElementKind::Area && a.name != area)
                    .map(|a| a.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for name in stale {
            let is_opening = self.db.exists(ElementKind::Area, &name)
                && matches!(
                    self.db.property(ElementKind::Area, &name, PropertyKey::Opening)?,
                    Some(ElementProperty::Opening(true))
                );
            if is_opening {
                let points = self.db.area_points(&name)?;
                self.db.delete(ElementKind::Area, &name)?;
                connectivity::purge_orphan_points(&mut self.db, &points);
            }
        }

        for hole in &member.holes {
            let ring = match self.ring_points(graph, hole) {
                Ok(ring) => ring,
                Err(e) => {
                    outcome.log.push(format!("Opening in area {area} skipped: {e}"));
                    continue;
                }
            };
            let opening = self.db.add_area_by_coord(&ring, section)?;
            self.db
                .set_property(ElementKind::Area, &opening, ElementProperty::Opening(true))?;
            outcome.created_ids.push(self.db.guid(ElementKind::Area, &opening)?);
            outcome.log.push(format!("Opening {opening} created in area {area}"));
            outcome.converted.push(NativeArtifact::new(ElementKind::Area, opening));
        }
        Ok(())
    }
}
