// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tabular edits against the host's database tables.
//!
//! Some host versions cannot change area connectivity directly; the ring is
//! rewritten through the area connectivity table instead. Field names of
//! those tables differ between host versions, so staged tables go through
//! [`apply_field_overrides`] before they are submitted.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, TableApplyReport};

pub const AREA_CONNECTIVITY_TABLE: &str = "Floor Object Connectivity";
pub const FRAME_CONNECTIVITY_TABLE: &str = "Beam Object Connectivity";

/// Host program version, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProgramVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse `"19.1.0"`, `"v21.2"` or `"20"`. Trailing build text is ignored.
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version
            .trim()
            .trim_start_matches(|c| c == 'v' || c == 'V')
            .split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u32>().ok()
            });
        let major = parts.next()??;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl Ord for ProgramVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for ProgramVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProgramVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Field renamed on import for hosts older than `applies_before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNameOverride {
    pub applies_before: ProgramVersion,
    pub field: &'static str,
    pub replacement: &'static str,
}

pub const FIELD_NAME_OVERRIDES: &[FieldNameOverride] = &[FieldNameOverride {
    applies_before: ProgramVersion::new(20, 0, 0),
    field: "UniqueName",
    replacement: "Unique Name",
}];

/// Rename fields for `version`. An unknown version gets no overrides.
/// Returns the number of fields renamed.
pub fn apply_field_overrides(fields: &mut [String], version: Option<ProgramVersion>) -> usize {
    let Some(version) = version else {
        return 0;
    };
    let mut renamed = 0;
    for rule in FIELD_NAME_OVERRIDES.iter().filter(|r| version < r.applies_before) {
        for field in fields.iter_mut().filter(|f| f.as_str() == rule.field) {
            *field = rule.replacement.to_string();
            renamed += 1;
        }
    }
    renamed
}

/// Submit staged tables and turn fatal import errors into a failure.
pub fn apply_tables<D: ElementDatabase + ?Sized>(db: &mut D) -> Result<TableApplyReport> {
    let report = db.apply_edited_tables(true)?;
    if report.fatal_errors > 0 {
        return Err(ConversionError::failed(format!(
            "table import rejected with {} fatal error(s): {}",
            report.fatal_errors,
            report.import_log.trim()
        )));
    }
    Ok(report)
}

/// Resubmit a table unchanged so the host recomputes it.
pub fn refresh_table<D: ElementDatabase + ?Sized>(db: &mut D, key: &str) -> Result<TableApplyReport> {
    let mut table = db.table_for_editing(key)?;
    apply_field_overrides(&mut table.fields, ProgramVersion::parse(&db.program_version()));
    db.set_table_for_editing(table)?;
    apply_tables(db)
}

/// Rewrite the point columns of one area's connectivity row.
///
/// The table has one column per point of the widest area plus the name and
/// GUID columns. A ring that grows past that width cannot be expressed and
/// raises [`ConversionError::StructuralIntegrityConflict`]; columns past the
/// end of a shrinking ring are cleared.
pub fn edit_area_connectivity<D: ElementDatabase + ?Sized>(
    db: &mut D,
    area: &str,
    previous_len: usize,
    points: &[String],
) -> Result<TableApplyReport> {
    let mut table = db.table_for_editing(AREA_CONNECTIVITY_TABLE)?;
    let width = table.fields.len();
    let capacity = width.saturating_sub(2);

    if points.len() > previous_len && points.len() > capacity {
        return Err(ConversionError::StructuralIntegrityConflict(format!(
            "area {area} needs {} point columns, the connectivity table has {capacity}",
            points.len()
        )));
    }

    let row = table
        .row_mut(area)
        .ok_or_else(|| ConversionError::failed(format!("area {area} missing from {AREA_CONNECTIVITY_TABLE}")))?;
    if row.len() < width {
        row.resize(width, String::new());
    }
    for (slot, cell) in row.iter_mut().skip(1).take(capacity).enumerate() {
        *cell = points.get(slot).cloned().unwrap_or_default();
    }

    apply_field_overrides(&mut table.fields, ProgramVersion::parse(&db.program_version()));
    db.set_table_for_editing(table)?;
    let report = apply_tables(db)?;
    tracing::debug!(area, points = points.len(), "Area connectivity rewritten through table");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ElementKind, MemoryDatabase, DEFAULT_SECTION};
    use structsync_model::Point;

    fn names(points: &[&str]) -> Vec<String> {
        points.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!(ProgramVersion::parse("19.1.0"), Some(ProgramVersion::new(19, 1, 0)));
        assert_eq!(ProgramVersion::parse("v21.2"), Some(ProgramVersion::new(21, 2, 0)));
        assert_eq!(ProgramVersion::parse("20.0.1 build 44"), Some(ProgramVersion::new(20, 0, 1)));
        assert_eq!(ProgramVersion::parse("beta"), None);
        assert!(ProgramVersion::new(19, 9, 9) < ProgramVersion::new(20, 0, 0));
    }

    #[test]
    fn test_field_overrides_by_version() {
        let mut fields = names(&["UniqueName", "UniquePt1"]);
        assert_eq!(apply_field_overrides(&mut fields, ProgramVersion::parse("21.0.0")), 0);
        assert_eq!(fields[0], "UniqueName");

        assert_eq!(apply_field_overrides(&mut fields, ProgramVersion::parse("19.0.0")), 1);
        assert_eq!(fields[0], "Unique Name");

        let mut fields = names(&["UniqueName"]);
        assert_eq!(apply_field_overrides(&mut fields, None), 0);
    }

    fn two_areas(db: &mut MemoryDatabase) -> (String, String) {
        let triangle = db
            .add_area_by_coord(
                &[Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
                DEFAULT_SECTION,
            )
            .unwrap();
        let square = db
            .add_area_by_coord(
                &[
                    Point::new(5.0, 0.0, 0.0),
                    Point::new(6.0, 0.0, 0.0),
                    Point::new(6.0, 1.0, 0.0),
                    Point::new(5.0, 1.0, 0.0),
                ],
                DEFAULT_SECTION,
            )
            .unwrap();
        (triangle, square)
    }

    #[test]
    fn test_edit_grows_within_capacity() {
        let mut db = MemoryDatabase::new("19.0.0");
        let (triangle, _) = two_areas(&mut db);
        let extra = db.add_point(Point::new(-1.0, 0.5, 0.0)).unwrap();
        let mut ring = db.area_points(&triangle).unwrap();
        ring.push(extra);

        edit_area_connectivity(&mut db, &triangle, 3, &ring).unwrap();
        assert_eq!(db.area_points(&triangle).unwrap(), ring);
    }

    #[test]
    fn test_edit_past_capacity_conflicts() {
        let mut db = MemoryDatabase::default();
        let (_, square) = two_areas(&mut db);
        let extra = db.add_point(Point::new(5.5, 2.0, 0.0)).unwrap();
        let mut ring = db.area_points(&square).unwrap();
        ring.insert(3, extra);

        let result = edit_area_connectivity(&mut db, &square, 4, &ring);
        assert!(matches!(result, Err(ConversionError::StructuralIntegrityConflict(_))));
        assert_eq!(db.area_points(&square).unwrap().len(), 4);
    }

    #[test]
    fn test_edit_shrink_clears_trailing_columns() {
        let mut db = MemoryDatabase::default();
        let (_, square) = two_areas(&mut db);
        let ring: Vec<String> = db.area_points(&square).unwrap().into_iter().take(3).collect();

        edit_area_connectivity(&mut db, &square, 4, &ring).unwrap();
        assert_eq!(db.area_points(&square).unwrap(), ring);
    }

    #[test]
    fn test_refresh_applies_version_override() {
        let mut db = MemoryDatabase::new("19.1.0");
        db.add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(3.0, 0.0, 0.0), DEFAULT_SECTION)
            .unwrap();
        refresh_table(&mut db, FRAME_CONNECTIVITY_TABLE).unwrap();
        assert_eq!(db.applied_tables(), [FRAME_CONNECTIVITY_TABLE.to_string()]);
        assert_eq!(db.count(ElementKind::Frame), 1);
    }
}
