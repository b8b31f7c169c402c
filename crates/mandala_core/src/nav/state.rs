//! Drill path and forward stack.
//!
//! # Responsibility
//! - Track the unit path from the root to the unit being viewed.
//! - Keep units left via drill-up available for drill-forward.
//!
//! # Invariants
//! - `nav_stack` is never empty and `nav_stack[0]` is the root unit id.
//! - Forward entries are re-validated against the live tree before use.
//! - Nothing here is recorded in document history.

use crate::model::chart::{Unit, UnitId, CELL_COUNT};
use crate::model::sync::sync_center_text;
use crate::model::tree::{contains_unit, ensure_child_unit, find_child_unit_id};
use log::{debug, info};
use std::sync::Arc;

/// Which view the host shows for the current unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Single-unit editing grid.
    #[default]
    Unit,
    /// Read-mostly overview of the unit and its children.
    Overview,
}

/// Navigation state kept beside (not inside) the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    nav_stack: Vec<UnitId>,
    forward_stack: Vec<UnitId>,
    view: ViewMode,
    focused_position: Option<usize>,
}

impl NavState {
    /// Starts at the root unit with an empty forward stack.
    pub fn new(root_id: impl Into<UnitId>) -> Self {
        Self {
            nav_stack: vec![root_id.into()],
            forward_stack: Vec::new(),
            view: ViewMode::Unit,
            focused_position: None,
        }
    }

    /// Returns to the root of a (possibly new) document.
    pub fn reset(&mut self, root_id: impl Into<UnitId>) {
        *self = Self::new(root_id);
    }

    pub fn nav_stack(&self) -> &[UnitId] {
        &self.nav_stack
    }

    pub fn forward_stack(&self) -> &[UnitId] {
        &self.forward_stack
    }

    /// Id of the unit being viewed.
    pub fn current_unit_id(&self) -> &str {
        self.nav_stack.last().map(String::as_str).unwrap_or("")
    }

    /// Number of drill steps below the root.
    pub fn depth(&self) -> usize {
        self.nav_stack.len().saturating_sub(1)
    }

    pub fn is_top_level(&self) -> bool {
        self.nav_stack.len() <= 1
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            ViewMode::Unit => ViewMode::Overview,
            ViewMode::Overview => ViewMode::Unit,
        };
    }

    pub fn focused_position(&self) -> Option<usize> {
        self.focused_position
    }

    /// Sets the focused grid position; out-of-grid values clear focus.
    pub fn set_focused_position(&mut self, position: Option<usize>) {
        self.focused_position = position.filter(|value| *value < CELL_COUNT);
    }

    /// Enters the child unit of `cell_id`, materializing it if needed.
    ///
    /// Returns the (possibly new) synchronized root. When the cell is not
    /// in the tree the root comes back unchanged and navigation stays put.
    pub fn drill_down(&mut self, root: &Arc<Unit>, cell_id: &str) -> Arc<Unit> {
        let next = sync_center_text(&ensure_child_unit(root, cell_id));
        let Some(child_id) = find_child_unit_id(&next, cell_id) else {
            debug!("event=nav_drill_down module=nav status=skip reason=cell_not_found");
            return next;
        };
        self.nav_stack.push(child_id);
        self.forward_stack.clear();
        self.view = ViewMode::Unit;
        debug!(
            "event=nav_drill_down module=nav status=ok depth={}",
            self.depth()
        );
        next
    }

    /// Leaves the current unit; it becomes the first forward entry.
    pub fn drill_up(&mut self) -> bool {
        if self.nav_stack.len() <= 1 {
            return false;
        }
        let Some(left) = self.nav_stack.pop() else {
            return false;
        };
        self.forward_stack.insert(0, left);
        true
    }

    /// Re-enters the most recently left unit if it still exists.
    ///
    /// A stale entry is discarded without trying the next one.
    pub fn drill_forward(&mut self, root: &Arc<Unit>) -> bool {
        if self.forward_stack.is_empty() {
            return false;
        }
        let next = self.forward_stack.remove(0);
        if !contains_unit(root, &next) {
            debug!("event=nav_drill_forward module=nav status=skip reason=unit_missing");
            return false;
        }
        self.nav_stack.push(next);
        true
    }

    /// Truncates the path so the crumb at `index` becomes current.
    pub fn navigate_breadcrumb(&mut self, index: usize) {
        self.nav_stack.truncate(index.saturating_add(1));
        self.forward_stack.clear();
    }

    /// Returns to the root when the current unit is no longer in the tree.
    ///
    /// Returns `true` when a reset happened.
    pub fn reset_if_needed(&mut self, root: &Arc<Unit>) -> bool {
        if contains_unit(root, self.current_unit_id()) && self.nav_stack[0] == root.id {
            return false;
        }
        info!(
            "event=nav_reset module=nav status=ok dropped_depth={}",
            self.depth()
        );
        self.nav_stack = vec![root.id.clone()];
        self.forward_stack.clear();
        true
    }
}
