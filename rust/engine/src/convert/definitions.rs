// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sections, materials and diaphragms. Definitions are matched by name and
//! never overwritten.

use structsync_model::{Diaphragm, Material, ObjectGraph, ObjectKey, SectionProperty, SurfaceProperty};

use super::{ConversionOutcome, CsiConverter};
use crate::error::{ConversionError, Result};
use crate::host::{Definition, ElementDatabase, ElementKind};

impl<D: ElementDatabase> CsiConverter<D> {
    /// Frame section name for a section property, defining it on first use.
    pub(super) fn ensure_section(&mut self, graph: &ObjectGraph, key: ObjectKey) -> Result<String> {
        let section = graph.section_property(key)?;
        self.define_section(graph, section)?;
        Ok(section.name.clone())
    }

    /// Area section for a surface member. Without a property the first
    /// defined area section is used.
    pub(super) fn ensure_area_section(
        &mut self,
        graph: &ObjectGraph,
        key: Option<ObjectKey>,
        log: &mut Vec<String>,
    ) -> Result<String> {
        if let Some(key) = key {
            let property = graph.surface_property(key)?;
            self.define_surface_property(graph, property)?;
            return Ok(property.name.clone());
        }
        let fallback = self
            .db
            .names(ElementKind::AreaSection)
            .into_iter()
            .next()
            .ok_or_else(|| ConversionError::failed("area has no property and no area section is defined"))?;
        log.push(format!("No property given, using area section {fallback}"));
        Ok(fallback)
    }

    fn ensure_material(&mut self, graph: &ObjectGraph, key: Option<ObjectKey>) -> Result<Option<String>> {
        let Some(key) = key else {
            return Ok(None);
        };
        let material = graph.material(key)?;
        self.define_material(material)?;
        Ok(Some(material.name.clone()))
    }

    /// Returns whether a new definition was added.
    fn define_section(&mut self, graph: &ObjectGraph, section: &SectionProperty) -> Result<bool> {
        if self.db.exists(ElementKind::FrameSection, &section.name) {
            return Ok(false);
        }
        let material = self.ensure_material(graph, section.material)?;
        let rectangle = section.profile.rectangle();
        if rectangle.is_none() {
            tracing::debug!(section = %section.name, "Section defined without dimensions");
        }
        self.db
            .define(&section.name, Definition::FrameSection { material, rectangle })?;
        Ok(true)
    }

    fn define_surface_property(&mut self, graph: &ObjectGraph, property: &SurfaceProperty) -> Result<bool> {
        if self.db.exists(ElementKind::AreaSection, &property.name) {
            return Ok(false);
        }
        let material = self.ensure_material(graph, property.material)?;
        self.db.define(
            &property.name,
            Definition::AreaSection {
                material,
                thickness: property.thickness,
                kind: property.kind,
            },
        )?;
        Ok(true)
    }

    fn define_material(&mut self, material: &Material) -> Result<bool> {
        if self.db.exists(ElementKind::Material, &material.name) {
            return Ok(false);
        }
        self.db.define(
            &material.name,
            Definition::Material {
                kind: material.kind,
                elastic_modulus: material.elastic_modulus,
                poisson_ratio: material.poisson_ratio,
                density: material.density,
            },
        )?;
        Ok(true)
    }

    pub(super) fn section_to_native(
        &mut self,
        graph: &ObjectGraph,
        section: &SectionProperty,
    ) -> Result<ConversionOutcome> {
        let added = self.define_section(graph, section)?;
        Ok(definition_outcome(ElementKind::FrameSection, &section.name, added))
    }

    pub(super) fn surface_property_to_native(
        &mut self,
        graph: &ObjectGraph,
        property: &SurfaceProperty,
    ) -> Result<ConversionOutcome> {
        let added = self.define_surface_property(graph, property)?;
        Ok(definition_outcome(ElementKind::AreaSection, &property.name, added))
    }

    pub(super) fn material_to_native(&mut self, material: &Material) -> Result<ConversionOutcome> {
        let added = self.define_material(material)?;
        Ok(definition_outcome(ElementKind::Material, &material.name, added))
    }

    pub(super) fn diaphragm_to_native(&mut self, diaphragm: &Diaphragm) -> Result<ConversionOutcome> {
        if self.db.exists(ElementKind::Diaphragm, &diaphragm.name) {
            return Ok(definition_outcome(ElementKind::Diaphragm, &diaphragm.name, false));
        }
        self.db.define(
            &diaphragm.name,
            Definition::Diaphragm {
                semi_rigid: diaphragm.semi_rigid,
            },
        )?;
        Ok(definition_outcome(ElementKind::Diaphragm, &diaphragm.name, true))
    }
}

fn definition_outcome(kind: ElementKind, name: &str, added: bool) -> ConversionOutcome {
    if added {
        ConversionOutcome::defined(name)
    } else {
        ConversionOutcome::skipped(format!("{kind} {name} already defined"))
    }
}
