// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host elements to graph objects.
//!
//! Points are shared: every element referencing a host point gets the same
//! node object. Frames and areas carry display meshes under `displayValue`.

use structsync_geometry::{
    connect_top_and_bottom, extrude_centerline, extrude_surface, opening_mesh, polygon_mesh, translate_mesh, Mesh,
    Point3, RectangularSection, VerticalAlignment,
};
use structsync_model::{
    DesignProcedure, GraphObject, LinearMember, LinearMemberType, Member, Node, ObjectBody, ObjectGraph, ObjectKey,
    Restraint, SectionProfile, SectionProperty, SurfaceMember, SurfaceProperty,
};

use super::CsiConverter;
use crate::error::{ConversionError, Result};
use crate::host::{Definition, ElementDatabase, ElementKind, ElementProperty, PropertyKey};

/// Centroid insertion point.
const DEFAULT_CARDINAL_POINT: i32 = 10;

const DISPLAY_MEMBER: &str = "displayValue";

impl<D: ElementDatabase> CsiConverter<D> {
    pub(super) fn point_to_portable(&mut self, name: &str, graph: &mut ObjectGraph) -> Result<ObjectKey> {
        if let Some(&key) = self.sent.get(&(ElementKind::Point, name.to_string())) {
            return Ok(key);
        }
        let restraint = match self.db.property(ElementKind::Point, name, PropertyKey::Restraint)? {
            Some(ElementProperty::Restraint(fixities)) => Some(Restraint::from_fixities(fixities)),
            _ => None,
        };
        let node = Node {
            name: Some(name.to_string()),
            base_point: self.db.point_coordinates(name)?,
            restraint,
        };
        let guid = self.db.guid(ElementKind::Point, name)?;
        let key = graph.add(GraphObject::new(ObjectBody::Node(node)).with_application_id(guid));
        self.sent.insert((ElementKind::Point, name.to_string()), key);
        Ok(key)
    }

    pub(super) fn frame_to_portable(&mut self, name: &str, graph: &mut ObjectGraph) -> Result<ObjectKey> {
        let kind = ElementKind::Frame;
        let (point_i, point_j) = self.db.frame_points(name)?;
        let start = self.db.point_coordinates(&point_i)?;
        let end = self.db.point_coordinates(&point_j)?;
        if start.coincides(&end, self.config.point_tolerance) {
            return Err(ConversionError::failed(format!("frame {name} has zero length")));
        }
        let end1 = self.point_to_portable(&point_i, graph)?;
        let end2 = self.point_to_portable(&point_j, graph)?;

        let section = match self.db.property(kind, name, PropertyKey::Section)? {
            Some(ElementProperty::Section(section)) => Some(section),
            _ => None,
        };
        let (property, rectangle) = match &section {
            Some(section) => {
                let (key, rectangle) = self.section_to_portable(section, graph)?;
                (Some(key), rectangle)
            }
            None => (None, None),
        };

        let member_type = LinearMemberType::from_direction(end.x - start.x, end.y - start.y, end.z - start.z);
        let cardinal_point = match self.db.property(kind, name, PropertyKey::CardinalPoint)? {
            Some(ElementProperty::CardinalPoint(c)) => c,
            _ => DEFAULT_CARDINAL_POINT,
        };
        let (end1_releases, end2_releases) = match self.db.property(kind, name, PropertyKey::Releases)? {
            Some(ElementProperty::Releases(releases)) => (
                Some(release_restraint(releases.end1, releases.end1_stiffness)),
                Some(release_restraint(releases.end2, releases.end2_stiffness)),
            ),
            _ => (None, None),
        };

        let member = LinearMember {
            name: Some(name.to_string()),
            member_type,
            end1_node: Some(end1),
            end2_node: Some(end2),
            base_line: None,
            property,
            end1_releases,
            end2_releases,
            orientation_angle: self.local_axis(kind, name)?.to_radians(),
            stiffness_modifiers: self.modifiers(kind, name)?,
            pier: self.label(kind, name, PropertyKey::Pier)?,
            spandrel: self.label(kind, name, PropertyKey::Spandrel)?,
            design_procedure: match self.db.property(kind, name, PropertyKey::DesignProcedure)? {
                Some(ElementProperty::DesignProcedure(code)) => DesignProcedure::from_code(code),
                _ => None,
            },
            cardinal_point: Some(cardinal_point),
        };

        let guid = self.db.guid(kind, name)?;
        let mut object = GraphObject::new(ObjectBody::LinearMember(member)).with_application_id(guid);

        if self.config.send_extruded_geometry {
            let alignment = if member_type == LinearMemberType::Beam {
                VerticalAlignment::from_cardinal_point(cardinal_point)
            } else {
                VerticalAlignment::Middle
            };
            let profile = rectangle.unwrap_or_default();
            match extrude_centerline(Point3::from(start), Point3::from(end), &profile, alignment) {
                Ok(mesh) => {
                    let mesh_key = graph.add(GraphObject::new(ObjectBody::Mesh(mesh)));
                    object = object.with_member(DISPLAY_MEMBER, Member::List(vec![mesh_key]));
                }
                Err(e) => tracing::debug!(frame = name, error = %e, "No display mesh"),
            }
        }

        Ok(graph.add(object))
    }

    pub(super) fn area_to_portable(&mut self, name: &str, graph: &mut ObjectGraph) -> Result<ObjectKey> {
        let kind = ElementKind::Area;
        let point_names = self.db.area_points(name)?;
        let mut topology = Vec::with_capacity(point_names.len());
        let mut ring = Vec::with_capacity(point_names.len());
        for point in &point_names {
            topology.push(self.point_to_portable(point, graph)?);
            ring.push(Point3::from(self.db.point_coordinates(point)?));
        }

        let is_opening = matches!(
            self.db.property(kind, name, PropertyKey::Opening)?,
            Some(ElementProperty::Opening(true))
        );
        let section = match self.db.property(kind, name, PropertyKey::AreaSection)? {
            Some(ElementProperty::AreaSection(section)) => Some(section),
            _ => None,
        };
        let (property, thickness) = match &section {
            Some(section) if !is_opening => {
                let (key, thickness) = self.area_section_to_portable(section, graph)?;
                (Some(key), thickness)
            }
            _ => (None, None),
        };

        let member = SurfaceMember {
            name: Some(name.to_string()),
            topology,
            property,
            orientation_angle: self.local_axis(kind, name)?.to_radians(),
            stiffness_modifiers: self.modifiers(kind, name)?,
            diaphragm: self.label(kind, name, PropertyKey::Diaphragm)?,
            pier: self.label(kind, name, PropertyKey::Pier)?,
            spandrel: self.label(kind, name, PropertyKey::Spandrel)?,
            is_opening,
            ..Default::default()
        };

        let meshes = if is_opening {
            vec![opening_mesh(&ring)]
        } else {
            let thickness = thickness
                .filter(|t| *t > 0.0)
                .unwrap_or(self.config.default_surface_thickness);
            self.area_display(&ring, thickness)
        };
        let mesh_keys = meshes
            .into_iter()
            .filter(|mesh| !mesh.is_empty())
            .map(|mesh| graph.add(GraphObject::new(ObjectBody::Mesh(mesh))))
            .collect();

        let guid = self.db.guid(kind, name)?;
        let object = GraphObject::new(ObjectBody::SurfaceMember(member))
            .with_application_id(guid)
            .with_member(DISPLAY_MEMBER, Member::List(mesh_keys));
        Ok(graph.add(object))
    }

    /// Display meshes for an area: an extruded slab when enabled, a side
    /// connected top and bottom when extrusion only manages a wrapped
    /// fallback, the flat polygon otherwise.
    fn area_display(&self, ring: &[Point3<f64>], thickness: f64) -> Vec<Mesh> {
        if !self.config.send_extruded_geometry {
            return vec![polygon_mesh(ring)];
        }
        match extrude_surface(&[ring.to_vec()], thickness, self.config.vertical_normal_threshold) {
            Some(mesh) if !mesh.tag.is_fallback() => vec![mesh],
            _ => {
                let top = polygon_mesh(ring);
                let bottom = translate_mesh(&top, thickness);
                match connect_top_and_bottom(&top, &bottom) {
                    Some(shell) => vec![shell],
                    None => vec![top],
                }
            }
        }
    }

    /// Section object and its rectangle, shared per send.
    fn section_to_portable(
        &mut self,
        section: &str,
        graph: &mut ObjectGraph,
    ) -> Result<(ObjectKey, Option<RectangularSection>)> {
        let (material, rectangle) = match self.db.definition(ElementKind::FrameSection, section)? {
            Some(Definition::FrameSection { material, rectangle }) => (material, rectangle),
            _ => (None, None),
        };
        if let Some(&key) = self.sent.get(&(ElementKind::FrameSection, section.to_string())) {
            return Ok((key, rectangle));
        }
        let profile = match rectangle {
            Some(r) => SectionProfile::Rectangular {
                width: r.width,
                depth: r.depth,
            },
            None => SectionProfile::Undefined,
        };
        let material = material
            .map(|m| self.material_to_portable(&m, graph))
            .transpose()?;
        let key = graph.add(GraphObject::new(ObjectBody::SectionProperty(SectionProperty {
            name: section.to_string(),
            material,
            profile,
        })));
        self.sent
            .insert((ElementKind::FrameSection, section.to_string()), key);
        Ok((key, rectangle))
    }

    fn area_section_to_portable(&mut self, section: &str, graph: &mut ObjectGraph) -> Result<(ObjectKey, Option<f64>)> {
        let definition = self.db.definition(ElementKind::AreaSection, section)?;
        let thickness = match &definition {
            Some(Definition::AreaSection { thickness, .. }) => Some(*thickness),
            _ => None,
        };
        if let Some(&key) = self.sent.get(&(ElementKind::AreaSection, section.to_string())) {
            return Ok((key, thickness));
        }
        let property = match definition {
            Some(Definition::AreaSection {
                material,
                thickness,
                kind,
            }) => SurfaceProperty {
                name: section.to_string(),
                material: material
                    .map(|m| self.material_to_portable(&m, graph))
                    .transpose()?,
                thickness,
                kind,
            },
            _ => SurfaceProperty {
                name: section.to_string(),
                material: None,
                thickness: 0.0,
                kind: Default::default(),
            },
        };
        let key = graph.add(GraphObject::new(ObjectBody::SurfaceProperty(property)));
        self.sent
            .insert((ElementKind::AreaSection, section.to_string()), key);
        Ok((key, thickness))
    }

    fn material_to_portable(&mut self, name: &str, graph: &mut ObjectGraph) -> Result<ObjectKey> {
        if let Some(&key) = self.sent.get(&(ElementKind::Material, name.to_string())) {
            return Ok(key);
        }
        let material = match self.db.definition(ElementKind::Material, name)? {
            Some(Definition::Material {
                kind,
                elastic_modulus,
                poisson_ratio,
                density,
            }) => structsync_model::Material {
                name: name.to_string(),
                kind,
                elastic_modulus,
                poisson_ratio,
                density,
            },
            _ => structsync_model::Material {
                name: name.to_string(),
                kind: Default::default(),
                elastic_modulus: 0.0,
                poisson_ratio: 0.0,
                density: 0.0,
            },
        };
        let key = graph.add(GraphObject::new(ObjectBody::Material(material)));
        self.sent.insert((ElementKind::Material, name.to_string()), key);
        Ok(key)
    }

    fn local_axis(&self, kind: ElementKind, name: &str) -> Result<f64> {
        Ok(match self.db.property(kind, name, PropertyKey::LocalAxis)? {
            Some(ElementProperty::LocalAxis(degrees)) => degrees,
            _ => 0.0,
        })
    }

    fn modifiers(&self, kind: ElementKind, name: &str) -> Result<Option<Vec<f64>>> {
        Ok(match self.db.property(kind, name, PropertyKey::Modifiers)? {
            Some(ElementProperty::Modifiers(modifiers)) => Some(modifiers),
            _ => None,
        })
    }

    fn label(&self, kind: ElementKind, name: &str, key: PropertyKey) -> Result<Option<String>> {
        Ok(match self.db.property(kind, name, key)? {
            Some(ElementProperty::Pier(label))
            | Some(ElementProperty::Spandrel(label))
            | Some(ElementProperty::Diaphragm(label)) => Some(label),
            _ => None,
        })
    }
}

/// Restraint for one frame end: released degrees of freedom become `R`,
/// released ones with stiffness become springs.
fn release_restraint(released: [bool; 6], stiffness: [f64; 6]) -> Restraint {
    let code = released
        .iter()
        .zip(stiffness.iter())
        .map(|(&free, &k)| match (free, k != 0.0) {
            (false, _) => 'F',
            (true, true) => 'K',
            (true, false) => 'R',
        })
        .collect::<String>();
    Restraint { code, stiffness }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_restraint_codes() {
        let r = release_restraint([false, false, false, true, true, false], [0.0, 0.0, 0.0, 0.0, 50.0, 0.0]);
        assert_eq!(r.code, "FFFRKF");
        assert_eq!(r.stiffness[4], 50.0);
    }
}
