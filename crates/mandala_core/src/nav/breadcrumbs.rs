//! Breadcrumb labels for the drill path.

use crate::model::chart::{Unit, UnitId};
use crate::model::tree::find_unit_path;
use std::sync::Arc;

/// Label used for the root crumb when the root topic is blank.
pub const ROOT_PLACEHOLDER: &str = "主題";
/// Label used for nested crumbs whose topic is blank.
pub const UNTITLED_PLACEHOLDER: &str = "未入力";

/// One entry of the root-to-current path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub unit_id: UnitId,
    pub label: String,
}

/// Builds crumbs from the root down to `current_unit_id`.
///
/// An id that is not in the tree yields only the root crumb.
pub fn build_breadcrumbs(root: &Arc<Unit>, current_unit_id: &str) -> Vec<Breadcrumb> {
    find_unit_path(root, current_unit_id)
        .into_iter()
        .enumerate()
        .map(|(index, unit)| {
            let topic = unit.center_text();
            let label = match (index, topic.is_empty()) {
                (_, false) => topic.to_string(),
                (0, true) => ROOT_PLACEHOLDER.to_string(),
                (_, true) => UNTITLED_PLACEHOLDER.to_string(),
            };
            Breadcrumb {
                unit_id: unit.id.clone(),
                label,
            }
        })
        .collect()
}
