//! Chart document model.
//!
//! # Responsibility
//! - Define the Cell/Unit/Chart tree shared by every core operation.
//! - Generate identifiers and validate trees that come from disk.
//!
//! # Invariants
//! - Every `Unit` holds exactly nine cells, `cells[i].position == i`.
//! - Position `CENTER` is the unit topic and mirrors the owning cell.
//! - Child units sit behind `Arc`, so an edit copies only the path from
//!   the root to the edited cell and shares every other subtree.
//!
//! # See also
//! - `model::tree` for the mutation operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Number of cells in every unit (3x3 grid).
pub const CELL_COUNT: usize = 9;
/// Position of the unit topic.
pub const CENTER: usize = 4;
/// Positions around the center, in reading order.
pub const SURROUNDING: [usize; 8] = [0, 1, 2, 3, 5, 6, 7, 8];
/// Title given to freshly created charts.
pub const DEFAULT_CHART_TITLE: &str = "マンダラチャート";

/// Identifier of a cell. Stable for the lifetime of the cell.
pub type CellId = String;
/// Identifier of a unit. Navigation state refers to units by this id.
pub type UnitId = String;
/// Identifier of a chart document.
pub type ChartId = String;

/// Generates a fresh cell id.
pub fn new_cell_id() -> CellId {
    format!("cell-{}", Uuid::new_v4())
}

/// Generates a fresh unit id.
pub fn new_unit_id() -> UnitId {
    format!("unit-{}", Uuid::new_v4())
}

/// Generates a fresh chart id.
pub fn new_chart_id() -> ChartId {
    format!("chart-{}", Uuid::new_v4())
}

/// One addressable slot of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub text: String,
    /// Grid position `0..=8`, row-major; `CENTER` is the topic.
    pub position: usize,
    /// Nested unit, materialized the first time the cell is drilled into.
    pub children: Option<Arc<Unit>>,
    /// Bare asset filename (or a legacy `data:` URI).
    pub image: Option<String>,
}

impl Cell {
    fn empty(position: usize) -> Self {
        Self {
            id: new_cell_id(),
            text: String::new(),
            position,
            children: None,
            image: None,
        }
    }

    /// Returns whether the cell is the topic cell of its unit.
    pub fn is_center(&self) -> bool {
        self.position == CENTER
    }

    /// Returns whether the cell carries neither text nor an image.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

/// A 3x3 grid of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub cells: Vec<Cell>,
}

impl Unit {
    /// Creates a unit whose center cell holds `center_text`.
    pub fn new(center_text: impl Into<String>) -> Self {
        Self::with_center(center_text, None)
    }

    /// Creates a unit whose center cell mirrors the given text and image.
    pub fn with_center(center_text: impl Into<String>, center_image: Option<String>) -> Self {
        let mut cells = (0..CELL_COUNT).map(Cell::empty).collect::<Vec<_>>();
        cells[CENTER].text = center_text.into();
        cells[CENTER].image = center_image;
        Self {
            id: new_unit_id(),
            cells,
        }
    }

    /// Returns the cell at `position`, if present.
    pub fn cell_at(&self, position: usize) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.position == position)
    }

    /// Returns the center cell, if present.
    pub fn center(&self) -> Option<&Cell> {
        self.cell_at(CENTER)
    }

    /// Returns the center text, or `""` when the center is missing.
    pub fn center_text(&self) -> &str {
        self.center().map(|cell| cell.text.as_str()).unwrap_or("")
    }

    /// Iterates the eight non-center cells in position order.
    pub fn surrounding(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| !cell.is_center())
    }

    /// Checks structural invariants of this unit and every nested unit.
    ///
    /// Identifiers are not checked here; see [`Unit::rekey_duplicate_ids`].
    ///
    /// # Errors
    /// - `WrongCellCount` when a unit does not hold exactly nine cells.
    /// - `PositionMismatch` when `cells[i].position != i`.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.cells.len() != CELL_COUNT {
            return Err(ModelValidationError::WrongCellCount {
                unit_id: self.id.clone(),
                count: self.cells.len(),
            });
        }
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.position != index {
                return Err(ModelValidationError::PositionMismatch {
                    unit_id: self.id.clone(),
                    index,
                    position: cell.position,
                });
            }
            if let Some(child) = cell.children.as_deref() {
                child.validate()?;
            }
        }
        Ok(())
    }

    /// Gives every blank id, and every id already claimed by an enclosing
    /// unit or an earlier sibling subtree, a freshly generated one.
    ///
    /// Files written by older editors can repeat ids across sessions; the
    /// outermost occurrence keeps its id so references to it stay valid.
    /// Returns the number of ids replaced.
    pub fn rekey_duplicate_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        rekey_unit(self, &mut seen)
    }
}

fn rekey_unit(unit: &mut Unit, seen: &mut HashSet<String>) -> usize {
    let mut replaced = 0;
    if !claim_id(&unit.id, seen) {
        unit.id = new_unit_id();
        replaced += 1;
    }
    for cell in &mut unit.cells {
        if !claim_id(&cell.id, seen) {
            cell.id = new_cell_id();
            replaced += 1;
        }
    }
    for cell in &mut unit.cells {
        if let Some(child) = cell.children.as_mut() {
            replaced += rekey_unit(Arc::make_mut(child), seen);
        }
    }
    replaced
}

fn claim_id(id: &str, seen: &mut HashSet<String>) -> bool {
    !id.trim().is_empty() && seen.insert(id.to_string())
}

/// Top-level document: metadata plus the root unit.
///
/// Serialized with camelCase field names (`rootUnit`, `createdAt`,
/// `updatedAt`) and RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: ChartId,
    pub title: String,
    pub root_unit: Arc<Unit>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chart {
    /// Creates an empty chart with a blank root topic.
    pub fn new() -> Self {
        Self::with_root(Unit::new(""))
    }

    /// Creates a chart around an existing root unit.
    pub fn with_root(root_unit: Unit) -> Self {
        let now = Utc::now();
        Self {
            id: new_chart_id(),
            title: DEFAULT_CHART_TITLE.to_string(),
            root_unit: Arc::new(root_unit),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the root topic text.
    pub fn topic(&self) -> &str {
        self.root_unit.center_text()
    }

    /// Refreshes `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural problems detected in a chart tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A unit does not hold exactly nine cells.
    WrongCellCount { unit_id: UnitId, count: usize },
    /// A cell is stored at an index that differs from its position.
    PositionMismatch {
        unit_id: UnitId,
        index: usize,
        position: usize,
    },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongCellCount { unit_id, count } => {
                write!(f, "unit {unit_id} has {count} cells, expected {CELL_COUNT}")
            }
            Self::PositionMismatch {
                unit_id,
                index,
                position,
            } => write!(
                f,
                "unit {unit_id} stores position {position} at index {index}"
            ),
        }
    }
}

impl Error for ModelValidationError {}
