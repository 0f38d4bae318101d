// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory element database.
//!
//! Behaves like the analysis host where the synchronizer can observe it:
//! sequential numeric names, coincident point merging, reference checks on
//! sections and load patterns, and the connectivity tables with their
//! version-dependent field names.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use structsync_model::Point;
use uuid::Uuid;

use super::{
    Definition, EditableTable, ElementDatabase, ElementKind, ElementProperty, HostCapabilities,
    LoadAssignment, PropertyKey, TableApplyReport, DEFAULT_SECTION,
};
use crate::error::{HostError, HostResult};
use crate::tables::{ProgramVersion, AREA_CONNECTIVITY_TABLE, FRAME_CONNECTIVITY_TABLE};

const MERGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
enum Geometry {
    Point(Point),
    Frame { i: String, j: String },
    Area(Vec<String>),
}

#[derive(Debug, Clone)]
struct Element {
    geometry: Geometry,
    guid: String,
    properties: FxHashMap<PropertyKey, ElementProperty>,
    loads: Vec<LoadAssignment>,
}

impl Element {
    fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            guid: Uuid::new_v4().to_string(),
            properties: FxHashMap::default(),
            loads: Vec::new(),
        }
    }
}

/// Element database held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    version: String,
    capabilities: HostCapabilities,
    elements: BTreeMap<(ElementKind, String), Element>,
    definitions: BTreeMap<(ElementKind, String), Definition>,
    next_name: FxHashMap<ElementKind, usize>,
    staged_tables: Vec<EditableTable>,
    deleted: Vec<(ElementKind, String)>,
    applied_tables: Vec<String>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new("21.0.0")
    }
}

impl MemoryDatabase {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            capabilities: HostCapabilities::default(),
            elements: BTreeMap::new(),
            definitions: BTreeMap::new(),
            next_name: FxHashMap::default(),
            staged_tables: Vec::new(),
            deleted: Vec::new(),
            applied_tables: Vec::new(),
        }
    }

    pub fn with_area_connectivity_edit(mut self, enabled: bool) -> Self {
        self.capabilities.area_connectivity_edit = enabled;
        self
    }

    /// Every successful `delete`, in call order.
    pub fn deleted(&self) -> &[(ElementKind, String)] {
        &self.deleted
    }

    /// Keys of the tables applied so far, in order.
    pub fn applied_tables(&self) -> &[String] {
        &self.applied_tables
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        if kind.is_element() {
            self.elements.keys().filter(|(k, _)| *k == kind).count()
        } else {
            self.definitions.keys().filter(|(k, _)| *k == kind).count()
        }
    }

    pub fn loads(&self, kind: ElementKind, name: &str) -> &[LoadAssignment] {
        self.elements
            .get(&(kind, name.to_string()))
            .map(|e| e.loads.as_slice())
            .unwrap_or(&[])
    }

    fn element(&self, kind: ElementKind, name: &str) -> HostResult<&Element> {
        self.elements
            .get(&(kind, name.to_string()))
            .ok_or_else(|| HostError::not_found(kind, name))
    }

    fn element_mut(&mut self, kind: ElementKind, name: &str) -> HostResult<&mut Element> {
        self.elements
            .get_mut(&(kind, name.to_string()))
            .ok_or_else(|| HostError::not_found(kind, name))
    }

    fn issue_name(&mut self, kind: ElementKind) -> String {
        let counter = self.next_name.entry(kind).or_insert(0);
        loop {
            *counter += 1;
            let name = counter.to_string();
            if !self.elements.contains_key(&(kind, name.clone())) {
                return name;
            }
        }
    }

    fn insert(&mut self, kind: ElementKind, geometry: Geometry) -> String {
        let name = self.issue_name(kind);
        self.elements.insert((kind, name.clone()), Element::new(geometry));
        name
    }

    fn has_definition(&self, kind: ElementKind, name: &str) -> bool {
        self.definitions.contains_key(&(kind, name.to_string()))
    }

    fn check_section(&self, kind: ElementKind, name: &str, operation: &str) -> HostResult<()> {
        if name == DEFAULT_SECTION || self.has_definition(kind, name) {
            Ok(())
        } else {
            Err(HostError::rejected(operation, 1))
        }
    }

    fn check_points(&self, points: &[String], operation: &str) -> HostResult<()> {
        if points
            .iter()
            .all(|p| self.elements.contains_key(&(ElementKind::Point, p.clone())))
        {
            Ok(())
        } else {
            Err(HostError::rejected(operation, 1))
        }
    }

    fn point_or_add(&mut self, at: Point) -> String {
        match self.find_point(at, MERGE_TOLERANCE) {
            Some(name) => name,
            None => self.insert(ElementKind::Point, Geometry::Point(at)),
        }
    }

    fn area_table(&self) -> EditableTable {
        let areas: Vec<(&String, &Element, &Vec<String>)> = self
            .elements
            .iter()
            .filter_map(|((kind, name), element)| match (&element.geometry, kind) {
                (Geometry::Area(points), ElementKind::Area) => Some((name, element, points)),
                _ => None,
            })
            .collect();
        let width = areas.iter().map(|(_, _, p)| p.len()).max().unwrap_or(0).max(3);

        let mut fields = Vec::with_capacity(width + 2);
        fields.push("UniqueName".to_string());
        fields.extend((1..=width).map(|i| format!("UniquePt{i}")));
        fields.push("GUID".to_string());

        let rows = areas
            .into_iter()
            .map(|(name, element, points)| {
                let mut row = Vec::with_capacity(width + 2);
                row.push(name.clone());
                row.extend((0..width).map(|i| points.get(i).cloned().unwrap_or_default()));
                row.push(element.guid.clone());
                row
            })
            .collect();

        EditableTable {
            key: AREA_CONNECTIVITY_TABLE.to_string(),
            fields,
            rows,
        }
    }

    fn frame_table(&self) -> EditableTable {
        let rows = self
            .elements
            .iter()
            .filter_map(|((_, name), element)| match &element.geometry {
                Geometry::Frame { i, j } => {
                    Some(vec![name.clone(), i.clone(), j.clone(), element.guid.clone()])
                }
                _ => None,
            })
            .collect();
        EditableTable {
            key: FRAME_CONNECTIVITY_TABLE.to_string(),
            fields: vec![
                "UniqueName".to_string(),
                "UniquePtI".to_string(),
                "UniquePtJ".to_string(),
                "GUID".to_string(),
            ],
            rows,
        }
    }

    /// Name field the host expects when importing tables.
    fn expected_name_field(&self) -> &'static str {
        match ProgramVersion::parse(&self.version) {
            Some(v) if v < ProgramVersion::new(20, 0, 0) => "Unique Name",
            _ => "UniqueName",
        }
    }

    fn validate_table(&self, table: &EditableTable, report: &mut TableApplyReport) -> Vec<(String, Vec<String>)> {
        let expected = self.expected_name_field();
        if table.fields.first().map(String::as_str) != Some(expected) {
            fatal(report, format!("{}: field '{}' not found", table.key, expected));
            return Vec::new();
        }

        let (kind, point_columns) = match table.key.as_str() {
            AREA_CONNECTIVITY_TABLE => (ElementKind::Area, 1..table.fields.len().saturating_sub(1)),
            FRAME_CONNECTIVITY_TABLE => (ElementKind::Frame, 1..3),
            other => {
                fatal(report, format!("table '{other}' is not editable"));
                return Vec::new();
            }
        };

        let mut changes = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let Some(name) = row.first() else { continue };
            if !self.elements.contains_key(&(kind, name.clone())) {
                fatal(report, format!("{kind} '{name}' not found"));
                continue;
            }
            let points: Vec<String> = point_columns
                .clone()
                .filter_map(|i| row.get(i))
                .filter(|p| !p.is_empty())
                .cloned()
                .collect();
            let minimum = if kind == ElementKind::Area { 3 } else { 2 };
            if points.len() < minimum {
                fatal(report, format!("{kind} '{name}' has {} points", points.len()));
                continue;
            }
            if let Some(missing) = points
                .iter()
                .find(|p| !self.elements.contains_key(&(ElementKind::Point, (*p).clone())))
            {
                fatal(report, format!("{kind} '{name}' references unknown point '{missing}'"));
                continue;
            }
            changes.push((name.clone(), points));
        }
        report.info += changes.len();
        changes
    }
}

fn fatal(report: &mut TableApplyReport, message: String) {
    report.fatal_errors += 1;
    report.import_log.push_str(&message);
    report.import_log.push('\n');
}

impl ElementDatabase for MemoryDatabase {
    fn program_version(&self) -> String {
        self.version.clone()
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn add_point(&mut self, at: Point) -> HostResult<String> {
        Ok(self.point_or_add(at))
    }

    fn point_coordinates(&self, name: &str) -> HostResult<Point> {
        match self.element(ElementKind::Point, name)?.geometry {
            Geometry::Point(p) => Ok(p),
            _ => Err(HostError::not_found(ElementKind::Point, name)),
        }
    }

    fn find_point(&self, at: Point, tolerance: f64) -> Option<String> {
        self.elements.iter().find_map(|((_, name), element)| match element.geometry {
            Geometry::Point(p) if p.coincides(&at, tolerance) => Some(name.clone()),
            _ => None,
        })
    }

    fn point_connectivity(&self, name: &str) -> HostResult<usize> {
        self.element(ElementKind::Point, name)?;
        Ok(self
            .elements
            .values()
            .filter(|element| match &element.geometry {
                Geometry::Frame { i, j } => i == name || j == name,
                Geometry::Area(points) => points.iter().any(|p| p == name),
                Geometry::Point(_) => false,
            })
            .count())
    }

    fn delete_special_point(&mut self, name: &str) -> HostResult<()> {
        self.delete(ElementKind::Point, name)
    }

    fn add_frame_by_coord(&mut self, start: Point, end: Point, section: &str) -> HostResult<String> {
        self.check_section(ElementKind::FrameSection, section, "FrameObj.AddByCoord")?;
        if start.coincides(&end, MERGE_TOLERANCE) {
            return Err(HostError::rejected("FrameObj.AddByCoord", 1));
        }
        let i = self.point_or_add(start);
        let j = self.point_or_add(end);
        let name = self.insert(ElementKind::Frame, Geometry::Frame { i, j });
        self.set_property(ElementKind::Frame, &name, ElementProperty::Section(section.to_string()))?;
        Ok(name)
    }

    fn frame_points(&self, name: &str) -> HostResult<(String, String)> {
        match &self.element(ElementKind::Frame, name)?.geometry {
            Geometry::Frame { i, j } => Ok((i.clone(), j.clone())),
            _ => Err(HostError::not_found(ElementKind::Frame, name)),
        }
    }

    fn change_frame_connectivity(&mut self, name: &str, point_i: &str, point_j: &str) -> HostResult<()> {
        let points = [point_i.to_string(), point_j.to_string()];
        self.check_points(&points, "EditFrame.ChangeConnectivity")?;
        if point_i == point_j {
            return Err(HostError::rejected("EditFrame.ChangeConnectivity", 1));
        }
        let [i, j] = points;
        self.element_mut(ElementKind::Frame, name)?.geometry = Geometry::Frame { i, j };
        Ok(())
    }

    fn add_area_by_coord(&mut self, points: &[Point], section: &str) -> HostResult<String> {
        self.check_section(ElementKind::AreaSection, section, "AreaObj.AddByCoord")?;
        if points.len() < 3 {
            return Err(HostError::rejected("AreaObj.AddByCoord", 1));
        }
        let names: Vec<String> = points.iter().map(|&p| self.point_or_add(p)).collect();
        let name = self.insert(ElementKind::Area, Geometry::Area(names));
        self.set_property(ElementKind::Area, &name, ElementProperty::AreaSection(section.to_string()))?;
        Ok(name)
    }

    fn area_points(&self, name: &str) -> HostResult<Vec<String>> {
        match &self.element(ElementKind::Area, name)?.geometry {
            Geometry::Area(points) => Ok(points.clone()),
            _ => Err(HostError::not_found(ElementKind::Area, name)),
        }
    }

    fn change_area_connectivity(&mut self, name: &str, points: &[String]) -> HostResult<()> {
        if !self.capabilities.area_connectivity_edit {
            return Err(HostError::rejected("EditArea.ChangeConnectivity", -1));
        }
        self.check_points(points, "EditArea.ChangeConnectivity")?;
        if points.len() < 3 {
            return Err(HostError::rejected("EditArea.ChangeConnectivity", 1));
        }
        self.element_mut(ElementKind::Area, name)?.geometry = Geometry::Area(points.to_vec());
        Ok(())
    }

    fn names(&self, kind: ElementKind) -> Vec<String> {
        let keys: Box<dyn Iterator<Item = &(ElementKind, String)>> = if kind.is_element() {
            Box::new(self.elements.keys())
        } else {
            Box::new(self.definitions.keys())
        };
        keys.filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn guid(&self, kind: ElementKind, name: &str) -> HostResult<String> {
        Ok(self.element(kind, name)?.guid.clone())
    }

    fn set_guid(&mut self, kind: ElementKind, name: &str, guid: &str) -> HostResult<()> {
        self.element_mut(kind, name)?.guid = guid.to_string();
        Ok(())
    }

    fn rename(&mut self, kind: ElementKind, name: &str, new_name: &str) -> HostResult<()> {
        if name == new_name {
            return Ok(());
        }
        if new_name.is_empty() || self.elements.contains_key(&(kind, new_name.to_string())) {
            return Err(HostError::rejected("ChangeName", 1));
        }
        let element = self
            .elements
            .remove(&(kind, name.to_string()))
            .ok_or_else(|| HostError::not_found(kind, name))?;
        self.elements.insert((kind, new_name.to_string()), element);

        if kind == ElementKind::Point {
            for element in self.elements.values_mut() {
                match &mut element.geometry {
                    Geometry::Frame { i, j } => {
                        for end in [i, j] {
                            if end.as_str() == name {
                                *end = new_name.to_string();
                            }
                        }
                    }
                    Geometry::Area(points) => {
                        for point in points.iter_mut().filter(|p| p.as_str() == name) {
                            *point = new_name.to_string();
                        }
                    }
                    Geometry::Point(_) => {}
                }
            }
        }
        Ok(())
    }

    fn set_property(&mut self, kind: ElementKind, name: &str, property: ElementProperty) -> HostResult<()> {
        match &property {
            ElementProperty::Section(section) => {
                self.check_section(ElementKind::FrameSection, section, "FrameObj.SetSection")?
            }
            ElementProperty::AreaSection(section) => {
                self.check_section(ElementKind::AreaSection, section, "AreaObj.SetProperty")?
            }
            ElementProperty::Diaphragm(diaphragm) if !self.has_definition(ElementKind::Diaphragm, diaphragm) => {
                return Err(HostError::rejected("AreaObj.SetDiaphragm", 1));
            }
            ElementProperty::Restraint(_) if kind != ElementKind::Point => {
                return Err(HostError::rejected("PointObj.SetRestraint", 1));
            }
            ElementProperty::Opening(_) if kind != ElementKind::Area => {
                return Err(HostError::rejected("AreaObj.SetOpening", 1));
            }
            _ => {}
        }
        self.element_mut(kind, name)?
            .properties
            .insert(property.key(), property);
        Ok(())
    }

    fn property(&self, kind: ElementKind, name: &str, key: PropertyKey) -> HostResult<Option<ElementProperty>> {
        Ok(self.element(kind, name)?.properties.get(&key).cloned())
    }

    fn delete(&mut self, kind: ElementKind, name: &str) -> HostResult<()> {
        if kind.is_element() {
            if kind == ElementKind::Point && self.point_connectivity(name)? > 0 {
                return Err(HostError::rejected("PointObj.DeleteSpecialPoint", 1));
            }
            self.elements
                .remove(&(kind, name.to_string()))
                .ok_or_else(|| HostError::not_found(kind, name))?;
        } else {
            self.definitions
                .remove(&(kind, name.to_string()))
                .ok_or_else(|| HostError::not_found(kind, name))?;
        }
        self.deleted.push((kind, name.to_string()));
        Ok(())
    }

    fn define(&mut self, name: &str, definition: Definition) -> HostResult<()> {
        if name.is_empty() {
            return Err(HostError::rejected("Define", 1));
        }
        self.definitions
            .insert((definition.kind(), name.to_string()), definition);
        Ok(())
    }

    fn definition(&self, kind: ElementKind, name: &str) -> HostResult<Option<Definition>> {
        Ok(self.definitions.get(&(kind, name.to_string())).cloned())
    }

    fn assign_load(&mut self, kind: ElementKind, name: &str, load: LoadAssignment) -> HostResult<()> {
        if !self.has_definition(ElementKind::LoadPattern, load.pattern()) {
            return Err(HostError::rejected("SetLoad", 1));
        }
        self.element_mut(kind, name)?.loads.push(load);
        Ok(())
    }

    fn table_for_editing(&self, key: &str) -> HostResult<EditableTable> {
        match key {
            AREA_CONNECTIVITY_TABLE => Ok(self.area_table()),
            FRAME_CONNECTIVITY_TABLE => Ok(self.frame_table()),
            _ => Err(HostError::rejected("DatabaseTables.GetTableForEditingArray", 1)),
        }
    }

    fn set_table_for_editing(&mut self, table: EditableTable) -> HostResult<()> {
        let width = table.fields.len();
        if table.rows.iter().any(|row| row.len() != width) {
            return Err(HostError::rejected("DatabaseTables.SetTableForEditingArray", 1));
        }
        self.staged_tables.retain(|t| t.key != table.key);
        self.staged_tables.push(table);
        Ok(())
    }

    fn apply_edited_tables(&mut self, fill_import_log: bool) -> HostResult<TableApplyReport> {
        let staged = std::mem::take(&mut self.staged_tables);
        let mut report = TableApplyReport::default();

        let validated: Vec<(String, Vec<(String, Vec<String>)>)> = staged
            .iter()
            .map(|table| (table.key.clone(), self.validate_table(table, &mut report)))
            .collect();

        if report.fatal_errors == 0 {
            for (key, changes) in validated {
                for (name, points) in changes {
                    let geometry = if key == AREA_CONNECTIVITY_TABLE {
                        Geometry::Area(points)
                    } else {
                        Geometry::Frame {
                            i: points[0].clone(),
                            j: points[1].clone(),
                        }
                    };
                    let kind = if key == AREA_CONNECTIVITY_TABLE {
                        ElementKind::Area
                    } else {
                        ElementKind::Frame
                    };
                    self.element_mut(kind, &name)?.geometry = geometry;
                }
                self.applied_tables.push(key);
            }
        }

        if !fill_import_log {
            report.import_log.clear();
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(db: &mut MemoryDatabase) -> String {
        db.add_area_by_coord(
            &[
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            DEFAULT_SECTION,
        )
        .unwrap()
    }

    #[test]
    fn test_sequential_names_and_point_merging() {
        let mut db = MemoryDatabase::default();
        let f1 = db
            .add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(5.0, 0.0, 0.0), DEFAULT_SECTION)
            .unwrap();
        let f2 = db
            .add_frame_by_coord(Point::new(5.0, 0.0, 0.0), Point::new(5.0, 0.0, 3.0), DEFAULT_SECTION)
            .unwrap();
        assert_eq!((f1.as_str(), f2.as_str()), ("1", "2"));
        assert_eq!(db.count(ElementKind::Point), 3);
        assert_eq!(db.point_connectivity("2").unwrap(), 2);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let mut db = MemoryDatabase::default();
        let result = db.add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), "W12X26");
        assert!(matches!(result, Err(HostError::Rejected { .. })));
    }

    #[test]
    fn test_connected_point_cannot_be_deleted() {
        let mut db = MemoryDatabase::default();
        square(&mut db);
        assert!(db.delete(ElementKind::Point, "1").is_err());
        db.delete(ElementKind::Area, "1").unwrap();
        db.delete_special_point("1").unwrap();
        assert_eq!(db.deleted().len(), 2);
    }

    #[test]
    fn test_rename_updates_references() {
        let mut db = MemoryDatabase::default();
        let area = square(&mut db);
        db.rename(ElementKind::Point, "1", "P1").unwrap();
        assert_eq!(db.area_points(&area).unwrap()[0], "P1");
        assert!(db.rename(ElementKind::Point, "2", "P1").is_err());
    }

    #[test]
    fn test_area_table_shape() {
        let mut db = MemoryDatabase::default();
        square(&mut db);
        let table = db.table_for_editing(AREA_CONNECTIVITY_TABLE).unwrap();
        assert_eq!(table.fields.len(), 6);
        assert_eq!(table.fields[0], "UniqueName");
        assert_eq!(table.fields[5], "GUID");
        assert_eq!(table.rows[0][1..5], ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_old_versions_expect_spaced_name_field() {
        let mut db = MemoryDatabase::new("19.1.0");
        let area = square(&mut db);
        let table = db.table_for_editing(AREA_CONNECTIVITY_TABLE).unwrap();
        db.set_table_for_editing(table.clone()).unwrap();
        let report = db.apply_edited_tables(true).unwrap();
        assert_eq!(report.fatal_errors, 1);
        assert!(report.import_log.contains("Unique Name"));

        let mut fixed = table;
        fixed.fields[0] = "Unique Name".to_string();
        fixed.row_mut(&area).unwrap()[4] = String::new();
        db.set_table_for_editing(fixed).unwrap();
        let report = db.apply_edited_tables(true).unwrap();
        assert_eq!(report.fatal_errors, 0);
        assert_eq!(db.area_points(&area).unwrap(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_connectivity_edit_capability() {
        let mut db = MemoryDatabase::default().with_area_connectivity_edit(false);
        let area = square(&mut db);
        let points = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        assert!(db.change_area_connectivity(&area, &points).is_err());
    }

    #[test]
    fn test_load_requires_pattern() {
        let mut db = MemoryDatabase::default();
        let point = db.add_point(Point::new(0.0, 0.0, 0.0)).unwrap();
        let load = LoadAssignment::PointForce {
            pattern: "LIVE".into(),
            direction: structsync_model::LoadDirection::Gravity,
            value: 10.0,
        };
        assert!(db.assign_load(ElementKind::Point, &point, load.clone()).is_err());

        db.define(
            "LIVE",
            Definition::LoadPattern {
                kind: structsync_model::LoadPatternKind::Live,
                self_weight_multiplier: 0.0,
            },
        )
        .unwrap();
        db.assign_load(ElementKind::Point, &point, load).unwrap();
        assert_eq!(db.loads(ElementKind::Point, &point).len(), 1);
    }
}
