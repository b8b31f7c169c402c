//! Parent-cell / child-center mirroring.
//!
//! # Responsibility
//! - Restore the mirror invariant after any content edit.
//!
//! # Invariants
//! - After `sync_center_text`, every child unit's center cell carries the
//!   text and image of the cell that owns it, at every depth.
//! - A tree that is already in sync is returned by identity.

use crate::model::chart::{Cell, Unit, CENTER};
use std::sync::Arc;

/// Full recursive pass copying each owning cell's text/image into the
/// center of its child unit.
pub fn sync_center_text(unit: &Arc<Unit>) -> Arc<Unit> {
    sync_unit(unit)
        .map(Arc::new)
        .unwrap_or_else(|| Arc::clone(unit))
}

/// Returns whether the mirror invariant holds everywhere below `unit`.
pub fn is_synchronized(unit: &Unit) -> bool {
    unit.cells.iter().all(|cell| match cell.children.as_deref() {
        None => true,
        Some(child) => {
            child
                .center()
                .is_some_and(|center| center.text == cell.text && center.image == cell.image)
                && is_synchronized(child)
        }
    })
}

fn sync_unit(unit: &Unit) -> Option<Unit> {
    let mut cells: Option<Vec<Cell>> = None;
    for (index, cell) in unit.cells.iter().enumerate() {
        let Some(child) = cell.children.as_deref() else {
            continue;
        };
        if let Some(next) = sync_child(child, cell) {
            let cells = cells.get_or_insert_with(|| unit.cells.clone());
            cells[index].children = Some(Arc::new(next));
        }
    }
    cells.map(|cells| Unit {
        id: unit.id.clone(),
        cells,
    })
}

fn sync_child(child: &Unit, owner: &Cell) -> Option<Unit> {
    let mirrored = mirror_center(child, owner);
    let base = mirrored.as_ref().unwrap_or(child);
    sync_unit(base).or(mirrored)
}

fn mirror_center(unit: &Unit, owner: &Cell) -> Option<Unit> {
    let index = unit.cells.iter().position(|cell| cell.position == CENTER)?;
    let center = &unit.cells[index];
    if center.text == owner.text && center.image == owner.image {
        return None;
    }
    let mut cells = unit.cells.clone();
    cells[index].text = owner.text.clone();
    cells[index].image = owner.image.clone();
    Some(Unit {
        id: unit.id.clone(),
        cells,
    })
}
