use mandala_core::nav::breadcrumbs::{ROOT_PLACEHOLDER, UNTITLED_PLACEHOLDER};
use mandala_core::{build_breadcrumbs, update_cell_text, NavState, Unit, ViewMode};
use std::sync::Arc;

fn root_with_topic(topic: &str) -> (Arc<Unit>, NavState) {
    let root = Arc::new(Unit::new(topic));
    let nav = NavState::new(root.id.clone());
    (root, nav)
}

#[test]
fn drill_down_up_forward_returns_to_created_child() {
    let (root, mut nav) = root_with_topic("goal");
    let cell_id = root.cells[0].id.clone();

    let root = nav.drill_down(&root, &cell_id);
    let child_id = root.cells[0].children.as_ref().unwrap().id.clone();
    assert_eq!(nav.current_unit_id(), child_id);

    assert!(nav.drill_up());
    assert_eq!(nav.current_unit_id(), root.id);
    assert_eq!(nav.forward_stack(), [child_id.clone()]);

    assert!(nav.drill_forward(&root));
    assert_eq!(nav.current_unit_id(), child_id);
    assert!(nav.forward_stack().is_empty());
}

#[test]
fn drill_down_reuses_existing_child() {
    let (root, mut nav) = root_with_topic("goal");
    let cell_id = root.cells[3].id.clone();

    let root = nav.drill_down(&root, &cell_id);
    nav.drill_up();
    let again = nav.drill_down(&root, &cell_id);

    assert!(Arc::ptr_eq(&root, &again));
    assert_eq!(nav.depth(), 1);
    assert!(nav.forward_stack().is_empty());
}

#[test]
fn drill_up_prepends_to_forward_stack() {
    let (root, mut nav) = root_with_topic("goal");
    let root = nav.drill_down(&root, &root.cells[0].id.clone());
    let child = root.cells[0].children.clone().unwrap();
    let root = nav.drill_down(&root, &child.cells[1].id.clone());
    let grandchild_id = nav.current_unit_id().to_string();

    nav.drill_up();
    nav.drill_up();
    assert_eq!(nav.forward_stack(), [child.id.clone(), grandchild_id.clone()]);
    assert!(nav.is_top_level());

    assert!(nav.drill_forward(&root));
    assert!(nav.drill_forward(&root));
    assert_eq!(nav.current_unit_id(), grandchild_id);
}

#[test]
fn stale_forward_entry_is_discarded_without_fallthrough() {
    let (root, mut nav) = root_with_topic("goal");
    let before_drill = Arc::clone(&root);
    let root = nav.drill_down(&root, &root.cells[0].id.clone());
    let child = root.cells[0].children.clone().unwrap();
    let root = nav.drill_down(&root, &child.cells[1].id.clone());
    nav.drill_up();
    nav.drill_up();
    assert_eq!(nav.forward_stack().len(), 2);

    assert!(!nav.drill_forward(&before_drill));
    assert!(nav.is_top_level());
    assert_eq!(nav.forward_stack().len(), 1);

    assert!(!nav.drill_forward(&before_drill));
    assert!(nav.forward_stack().is_empty());
    assert!(!nav.drill_forward(&root));
}

#[test]
fn reset_after_child_disappears() {
    let (root, mut nav) = root_with_topic("goal");
    let before_drill = Arc::clone(&root);
    let root = nav.drill_down(&root, &root.cells[0].id.clone());
    nav.drill_up();
    nav.drill_forward(&root);
    assert_eq!(nav.depth(), 1);

    assert!(nav.reset_if_needed(&before_drill));
    assert_eq!(nav.nav_stack(), [before_drill.id.clone()]);
    assert!(nav.forward_stack().is_empty());
    assert!(!nav.reset_if_needed(&before_drill));
}

#[test]
fn breadcrumb_navigation_truncates_and_clears_forward() {
    let (root, mut nav) = root_with_topic("goal");
    let root = nav.drill_down(&root, &root.cells[0].id.clone());
    let child = root.cells[0].children.clone().unwrap();
    let root = nav.drill_down(&root, &child.cells[2].id.clone());
    let grandchild = root.cells[0].children.as_ref().unwrap().cells[2]
        .children
        .clone()
        .unwrap();
    let root = nav.drill_down(&root, &grandchild.cells[5].id.clone());
    nav.drill_up();
    assert_eq!(nav.depth(), 2);
    assert_eq!(nav.forward_stack().len(), 1);

    nav.navigate_breadcrumb(0);
    assert_eq!(nav.nav_stack(), [root.id.clone()]);
    assert!(nav.forward_stack().is_empty());
}

#[test]
fn breadcrumb_labels_use_topics_and_placeholders() {
    let (root, mut nav) = root_with_topic("");
    let first = root.cells[0].id.clone();
    let root = update_cell_text(&root, &first, "health");
    let root = nav.drill_down(&root, &first);
    let child = root.cells[0].children.clone().unwrap();
    let root = nav.drill_down(&root, &child.cells[7].id.clone());

    let crumbs = build_breadcrumbs(&root, nav.current_unit_id());
    let labels: Vec<&str> = crumbs.iter().map(|crumb| crumb.label.as_str()).collect();
    assert_eq!(labels, vec![ROOT_PLACEHOLDER, "health", UNTITLED_PLACEHOLDER]);
    assert_eq!(crumbs[0].unit_id, root.id);
    assert_eq!(crumbs[2].unit_id, nav.current_unit_id());
}

#[test]
fn view_and_focus_are_independent_of_path() {
    let (root, mut nav) = root_with_topic("goal");
    nav.toggle_view();
    assert_eq!(nav.view(), ViewMode::Overview);
    nav.set_focused_position(Some(4));

    let _ = nav.drill_down(&root, &root.cells[1].id.clone());
    assert_eq!(nav.view(), ViewMode::Unit);
    assert_eq!(nav.focused_position(), Some(4));
}
