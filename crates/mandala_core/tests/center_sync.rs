use mandala_core::{
    ensure_child_unit, is_synchronized, set_cell_image, swap_cells, sync_center_text,
    update_cell_text, Unit, CENTER,
};
use std::sync::Arc;

fn assert_mirrored(unit: &Unit) {
    for cell in &unit.cells {
        if let Some(child) = cell.children.as_deref() {
            let center = &child.cells[CENTER];
            assert_eq!(center.text, cell.text);
            assert_eq!(center.image, cell.image);
            assert_mirrored(child);
        }
    }
}

#[test]
fn mixed_edits_followed_by_sync_restore_the_mirror() {
    let root = Arc::new(Unit::new("goal"));
    let a = root.cells[0].id.clone();
    let b = root.cells[2].id.clone();
    let root = ensure_child_unit(&root, &a);
    let root = ensure_child_unit(&root, &b);
    let child_a = root.cells[0].children.clone().unwrap();
    let nested = child_a.cells[1].id.clone();
    let root = ensure_child_unit(&root, &nested);

    let root = update_cell_text(&root, &a, "health");
    let root = set_cell_image(&root, &b, Some("study.png"));
    let root = update_cell_text(&root, &nested, "sleep");
    let root = swap_cells(&root, &root.id.clone(), 0, 2);
    assert!(!is_synchronized(&root));

    let synced = sync_center_text(&root);
    assert!(is_synchronized(&synced));
    assert_mirrored(&synced);
}

#[test]
fn swapped_children_follow_their_new_owner() {
    let root = Arc::new(Unit::new("goal"));
    let a = root.cells[0].id.clone();
    let root = update_cell_text(&root, &a, "first");
    let root = ensure_child_unit(&root, &a);
    let root = update_cell_text(&root, &root.cells[8].id.clone(), "last");

    let swapped = sync_center_text(&swap_cells(&root, &root.id.clone(), 0, 8));
    let moved = swapped.cells[8].children.as_ref().unwrap();
    assert_eq!(moved.center_text(), "first");
    assert_eq!(swapped.cells[8].text, "first");
    assert_eq!(swapped.cells[0].text, "last");
    assert!(swapped.cells[0].children.is_none());
}

#[test]
fn sync_on_tree_without_children_is_identity() {
    let root = Arc::new(Unit::new("solo"));
    let root = update_cell_text(&root, &root.cells[3].id.clone(), "edited");
    assert!(Arc::ptr_eq(&sync_center_text(&root), &root));
}

#[test]
fn sync_only_copies_the_changed_path() {
    let root = Arc::new(Unit::new("goal"));
    let a = root.cells[0].id.clone();
    let b = root.cells[1].id.clone();
    let root = ensure_child_unit(&ensure_child_unit(&root, &a), &b);

    let edited = update_cell_text(&root, &a, "changed");
    let synced = sync_center_text(&edited);
    assert!(Arc::ptr_eq(
        edited.cells[1].children.as_ref().unwrap(),
        synced.cells[1].children.as_ref().unwrap()
    ));
}
