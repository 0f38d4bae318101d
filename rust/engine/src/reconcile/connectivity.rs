// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-place connectivity updates.
//!
//! Shared points are never moved. An element whose geometry changed is
//! reconnected to a coincident existing point or to a new one, and the
//! points it let go of are deleted once nothing else uses them.

use smallvec::SmallVec;
use structsync_model::Point;

use crate::error::{ConversionError, Result};
use crate::host::{ElementDatabase, TableApplyReport};
use crate::tables;

/// How an area's ring was brought up to date.
#[derive(Debug, Clone, PartialEq)]
pub enum RingUpdate {
    Unchanged,
    /// Changed through the host's connectivity edit
    Reconnected,
    /// Changed through the area connectivity table
    TableEdited(TableApplyReport),
}

/// Point to use at `desired`: the current point when it is already there,
/// else any coincident point, else a new one.
pub fn resolve_point<D: ElementDatabase + ?Sized>(
    db: &mut D,
    current: Option<&str>,
    desired: Point,
    tolerance: f64,
) -> Result<String> {
    if let Some(current) = current {
        if db.point_coordinates(current)?.coincides(&desired, tolerance) {
            return Ok(current.to_string());
        }
    }
    if let Some(existing) = db.find_point(desired, tolerance) {
        return Ok(existing);
    }
    Ok(db.add_point(desired)?)
}

/// Delete the candidates no element uses anymore. Returns the deleted names.
pub fn purge_orphan_points<D: ElementDatabase + ?Sized>(db: &mut D, candidates: &[String]) -> Vec<String> {
    let mut deleted = Vec::new();
    for name in candidates {
        if deleted.contains(name) {
            continue;
        }
        if matches!(db.point_connectivity(name), Ok(0)) && db.delete_special_point(name).is_ok() {
            tracing::trace!(point = %name, "Deleted orphan point");
            deleted.push(name.clone());
        }
    }
    deleted
}

/// Reconnect a frame to `start` and `end`. Returns whether anything changed.
pub fn update_frame_connectivity<D: ElementDatabase + ?Sized>(
    db: &mut D,
    name: &str,
    start: Point,
    end: Point,
    tolerance: f64,
) -> Result<bool> {
    let (point_i, point_j) = db.frame_points(name)?;
    let new_i = resolve_point(db, Some(&point_i), start, tolerance)?;
    let new_j = resolve_point(db, Some(&point_j), end, tolerance)?;
    if new_i == point_i && new_j == point_j {
        return Ok(false);
    }

    if let Err(e) = db.change_frame_connectivity(name, &new_i, &new_j) {
        let added: SmallVec<[String; 2]> = [new_i, new_j]
            .into_iter()
            .filter(|p| *p != point_i && *p != point_j)
            .collect();
        purge_orphan_points(db, &added);
        return Err(ConversionError::failed(format!("frame {name} could not be reconnected: {e}")));
    }

    let released: SmallVec<[String; 2]> = [point_i, point_j]
        .into_iter()
        .filter(|p| *p != new_i && *p != new_j)
        .collect();
    purge_orphan_points(db, &released);
    Ok(true)
}

/// Bring an area's ring to `desired`.
///
/// Uses the host's connectivity edit when available, the connectivity table
/// otherwise. A table that cannot hold the grown ring yields
/// [`ConversionError::StructuralIntegrityConflict`]; the caller recreates
/// the area.
pub fn update_area_ring<D: ElementDatabase + ?Sized>(
    db: &mut D,
    name: &str,
    desired: &[Point],
    tolerance: f64,
) -> Result<RingUpdate> {
    let current = db.area_points(name)?;
    let mut resolved = Vec::with_capacity(desired.len());
    for (i, &point) in desired.iter().enumerate() {
        resolved.push(resolve_point(db, current.get(i).map(String::as_str), point, tolerance)?);
    }
    if resolved == current {
        return Ok(RingUpdate::Unchanged);
    }

    let update = if db.capabilities().area_connectivity_edit {
        db.change_area_connectivity(name, &resolved)
            .map(|_| RingUpdate::Reconnected)
            .map_err(|e| ConversionError::failed(format!("area {name} could not be reconnected: {e}")))
    } else {
        tables::edit_area_connectivity(db, name, current.len(), &resolved).map(RingUpdate::TableEdited)
    };
    let update = match update {
        Ok(update) => update,
        Err(e) => {
            // Points added for the new ring are unused when the edit fails
            let added: Vec<String> = resolved.into_iter().filter(|p| !current.contains(p)).collect();
            purge_orphan_points(db, &added);
            return Err(e);
        }
    };

    let released: Vec<String> = current.into_iter().filter(|p| !resolved.contains(p)).collect();
    purge_orphan_points(db, &released);
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ElementKind, MemoryDatabase, DEFAULT_SECTION};

    #[test]
    fn test_shared_point_is_not_moved() {
        let mut db = MemoryDatabase::default();
        let beam = db
            .add_frame_by_coord(Point::new(0.0, 0.0, 3.0), Point::new(5.0, 0.0, 3.0), DEFAULT_SECTION)
            .unwrap();
        let column = db
            .add_frame_by_coord(Point::new(5.0, 0.0, 0.0), Point::new(5.0, 0.0, 3.0), DEFAULT_SECTION)
            .unwrap();
        let (_, shared) = db.frame_points(&beam).unwrap();

        let changed = update_frame_connectivity(
            &mut db,
            &beam,
            Point::new(0.0, 0.0, 3.0),
            Point::new(6.0, 0.0, 3.0),
            1e-3,
        )
        .unwrap();
        assert!(changed);

        assert_eq!(db.point_coordinates(&shared).unwrap(), Point::new(5.0, 0.0, 3.0));
        assert_eq!(db.frame_points(&column).unwrap().1, shared);
        assert_ne!(db.frame_points(&beam).unwrap().1, shared);
    }

    #[test]
    fn test_released_orphan_is_deleted() {
        let mut db = MemoryDatabase::default();
        let beam = db
            .add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(5.0, 0.0, 0.0), DEFAULT_SECTION)
            .unwrap();
        let (_, old_end) = db.frame_points(&beam).unwrap();

        update_frame_connectivity(&mut db, &beam, Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0), 1e-3)
            .unwrap();
        assert!(!db.exists(ElementKind::Point, &old_end));
        assert_eq!(db.count(ElementKind::Point), 2);
    }

    #[test]
    fn test_unchanged_ring() {
        let mut db = MemoryDatabase::default();
        let ring = [Point::new(0.0, 0.0, 0.0), Point::new(2.0, 0.0, 0.0), Point::new(0.0, 2.0, 0.0)];
        let area = db.add_area_by_coord(&ring, DEFAULT_SECTION).unwrap();
        assert_eq!(update_area_ring(&mut db, &area, &ring, 1e-3).unwrap(), RingUpdate::Unchanged);
    }

    #[test]
    fn test_ring_update_through_table() {
        let mut db = MemoryDatabase::default().with_area_connectivity_edit(false);
        let square = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ];
        let area = db.add_area_by_coord(&square, DEFAULT_SECTION).unwrap();

        let mut moved = square;
        moved[2] = Point::new(3.0, 3.0, 0.0);
        let update = update_area_ring(&mut db, &area, &moved, 1e-3).unwrap();
        assert!(matches!(update, RingUpdate::TableEdited(_)));
        assert_eq!(db.count(ElementKind::Point), 4);

        let mut grown = moved.to_vec();
        grown.push(Point::new(-1.0, 1.0, 0.0));
        let result = update_area_ring(&mut db, &area, &grown, 1e-3);
        assert!(matches!(result, Err(ConversionError::StructuralIntegrityConflict(_))));
        assert_eq!(db.count(ElementKind::Point), 4);
    }

    #[test]
    fn test_rejected_frame_edit_leaves_no_new_points() {
        let mut db = MemoryDatabase::default();
        let beam = db
            .add_frame_by_coord(Point::new(0.0, 0.0, 0.0), Point::new(5.0, 0.0, 0.0), DEFAULT_SECTION)
            .unwrap();
        let before = db.frame_points(&beam).unwrap();

        // Both ends resolve to the same new point, which the host rejects
        let target = Point::new(9.0, 0.0, 0.0);
        let result = update_frame_connectivity(&mut db, &beam, target, target, 1e-3);
        assert!(matches!(result, Err(ConversionError::Failed(_))));
        assert_eq!(db.count(ElementKind::Point), 2);
        assert!(db.find_point(target, 1e-3).is_none());
        assert_eq!(db.frame_points(&beam).unwrap(), before);
    }

    #[test]
    fn test_rejected_area_edit_leaves_no_new_points() {
        let mut db = MemoryDatabase::default();
        let ring = [Point::new(0.0, 0.0, 0.0), Point::new(2.0, 0.0, 0.0), Point::new(0.0, 2.0, 0.0)];
        let area = db.add_area_by_coord(&ring, DEFAULT_SECTION).unwrap();

        let collapsed = [Point::new(7.0, 7.0, 0.0), Point::new(8.0, 8.0, 0.0)];
        let result = update_area_ring(&mut db, &area, &collapsed, 1e-3);
        assert!(matches!(result, Err(ConversionError::Failed(_))));
        assert_eq!(db.count(ElementKind::Point), 3);
        assert_eq!(db.area_points(&area).unwrap().len(), 3);
    }
}
