//! Pure tree operators over the unit hierarchy.
//!
//! # Responsibility
//! - Locate cells and units anywhere in the tree.
//! - Produce edited trees without touching the input.
//!
//! # Invariants
//! - An operator that changes nothing returns a clone of the input `Arc`,
//!   so `Arc::ptr_eq(&input, &output)` is the "no-op" signal callers use
//!   to skip history entries.
//! - Only the root-to-target path is copied; sibling subtrees stay shared.
//! - Missing ids are never an error; they degrade to a no-op.

use crate::model::chart::{Cell, Unit, UnitId, CELL_COUNT, CENTER};
use std::sync::Arc;

/// Replaces the text of the cell with `cell_id`.
pub fn update_cell_text(unit: &Arc<Unit>, cell_id: &str, text: &str) -> Arc<Unit> {
    edit_cell(unit, cell_id, &|cell| {
        if cell.text == text {
            return None;
        }
        let mut updated = cell.clone();
        updated.text = text.to_string();
        Some(updated)
    })
}

/// Sets or clears the image reference of the cell with `cell_id`.
pub fn set_cell_image(unit: &Arc<Unit>, cell_id: &str, image: Option<&str>) -> Arc<Unit> {
    edit_cell(unit, cell_id, &|cell| {
        if cell.image.as_deref() == image {
            return None;
        }
        let mut updated = cell.clone();
        updated.image = image.map(str::to_string);
        Some(updated)
    })
}

/// Materializes the child unit of the cell with `cell_id`.
///
/// The new unit's center is seeded from the cell's text and image. A cell
/// that already owns a child unit is left alone and the input root is
/// returned as-is.
pub fn ensure_child_unit(unit: &Arc<Unit>, cell_id: &str) -> Arc<Unit> {
    edit_cell(unit, cell_id, &|cell| {
        if cell.children.is_some() {
            return None;
        }
        let mut updated = cell.clone();
        updated.children = Some(Arc::new(Unit::with_center(
            cell.text.clone(),
            cell.image.clone(),
        )));
        Some(updated)
    })
}

/// Exchanges text, children and image between two cells of one unit.
///
/// `unit_id` names the unit (not a cell). Cell ids and positions stay in
/// place. Swaps that touch `CENTER`, repeat a position, or leave the grid
/// are no-ops.
pub fn swap_cells(unit: &Arc<Unit>, unit_id: &str, pos_a: usize, pos_b: usize) -> Arc<Unit> {
    if pos_a == pos_b || pos_a == CENTER || pos_b == CENTER {
        return Arc::clone(unit);
    }
    if pos_a >= CELL_COUNT || pos_b >= CELL_COUNT {
        return Arc::clone(unit);
    }
    swap_in_unit(unit, unit_id, pos_a, pos_b)
        .map(Arc::new)
        .unwrap_or_else(|| Arc::clone(unit))
}

/// Depth-first search for the unit with `unit_id`.
pub fn find_unit_by_id<'a>(unit: &'a Arc<Unit>, unit_id: &str) -> Option<&'a Arc<Unit>> {
    if unit.id == unit_id {
        return Some(unit);
    }
    unit.cells
        .iter()
        .filter_map(|cell| cell.children.as_ref())
        .find_map(|child| find_unit_by_id(child, unit_id))
}

/// Returns whether a unit with `unit_id` exists anywhere in the tree.
pub fn contains_unit(unit: &Arc<Unit>, unit_id: &str) -> bool {
    find_unit_by_id(unit, unit_id).is_some()
}

/// Returns the chain of units from `unit` down to `unit_id`, inclusive.
///
/// Falls back to `[unit]` when the target is not in the tree.
pub fn find_unit_path<'a>(unit: &'a Arc<Unit>, unit_id: &str) -> Vec<&'a Arc<Unit>> {
    let mut path = Vec::new();
    if collect_path(unit, unit_id, &mut path) {
        path
    } else {
        vec![unit]
    }
}

/// Depth-first search for the cell with `cell_id`.
pub fn find_cell<'a>(unit: &'a Unit, cell_id: &str) -> Option<&'a Cell> {
    for cell in &unit.cells {
        if cell.id == cell_id {
            return Some(cell);
        }
        if let Some(found) = cell
            .children
            .as_deref()
            .and_then(|child| find_cell(child, cell_id))
        {
            return Some(found);
        }
    }
    None
}

/// Returns the id of the child unit owned by the cell with `cell_id`.
pub fn find_child_unit_id(unit: &Unit, cell_id: &str) -> Option<UnitId> {
    find_cell(unit, cell_id)
        .and_then(|cell| cell.children.as_ref())
        .map(|child| child.id.clone())
}

fn edit_cell(
    unit: &Arc<Unit>,
    cell_id: &str,
    edit: &dyn Fn(&Cell) -> Option<Cell>,
) -> Arc<Unit> {
    edit_in_unit(unit, cell_id, edit)
        .map(Arc::new)
        .unwrap_or_else(|| Arc::clone(unit))
}

// Returns `None` when nothing below `unit` changed.
fn edit_in_unit(unit: &Unit, cell_id: &str, edit: &dyn Fn(&Cell) -> Option<Cell>) -> Option<Unit> {
    for (index, cell) in unit.cells.iter().enumerate() {
        if cell.id == cell_id {
            return edit(cell).map(|updated| replace_cell(unit, index, updated));
        }
        if let Some(child) = cell.children.as_deref() {
            if let Some(next) = edit_in_unit(child, cell_id, edit) {
                let mut updated = cell.clone();
                updated.children = Some(Arc::new(next));
                return Some(replace_cell(unit, index, updated));
            }
        }
    }
    None
}

fn swap_in_unit(unit: &Unit, unit_id: &str, pos_a: usize, pos_b: usize) -> Option<Unit> {
    if unit.id == unit_id {
        let index_a = unit.cells.iter().position(|cell| cell.position == pos_a)?;
        let index_b = unit.cells.iter().position(|cell| cell.position == pos_b)?;
        let mut cells = unit.cells.clone();
        let first = unit.cells[index_a].clone();
        let second = unit.cells[index_b].clone();
        move_content(&mut cells[index_a], second);
        move_content(&mut cells[index_b], first);
        return Some(Unit {
            id: unit.id.clone(),
            cells,
        });
    }
    for (index, cell) in unit.cells.iter().enumerate() {
        if let Some(child) = cell.children.as_deref() {
            if let Some(next) = swap_in_unit(child, unit_id, pos_a, pos_b) {
                let mut updated = cell.clone();
                updated.children = Some(Arc::new(next));
                return Some(replace_cell(unit, index, updated));
            }
        }
    }
    None
}

fn move_content(target: &mut Cell, source: Cell) {
    target.text = source.text;
    target.children = source.children;
    target.image = source.image;
}

fn replace_cell(unit: &Unit, index: usize, cell: Cell) -> Unit {
    let mut cells = unit.cells.clone();
    cells[index] = cell;
    Unit {
        id: unit.id.clone(),
        cells,
    }
}

fn collect_path<'a>(unit: &'a Arc<Unit>, unit_id: &str, path: &mut Vec<&'a Arc<Unit>>) -> bool {
    path.push(unit);
    if unit.id == unit_id {
        return true;
    }
    for child in unit.cells.iter().filter_map(|cell| cell.children.as_ref()) {
        if collect_path(child, unit_id, path) {
            return true;
        }
    }
    path.pop();
    false
}
