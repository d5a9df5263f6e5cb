use crate::common::{harness, recorder};
use statusbar_tray::menu::{MenuRegistry, MenuTag};
use statusbar_tray::native::NativeOp;
use statusbar_tray::tray::IconId;
use statusbar_tray::TrayError;

#[test]
fn inserts_at_index_with_tags_in_allocation_order() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let (l1, seen1) = recorder();
    let (l2, seen2) = recorder();

    // Act
    icon.add_item("A", 0, Some(l1)).unwrap();
    icon.add_item("B", 0, Some(l2)).unwrap();
    icon.add_item("-", 2, None).unwrap();
    let first = icon.item_selected_callback(MenuTag::new(0));
    let second = icon.item_selected_callback(MenuTag::new(1));

    // Assert
    assert_eq!(icon.menu_labels(), vec!["B", "A", "-"]);
    assert_eq!(
        icon.menu_tags(),
        vec![MenuTag::new(1), MenuTag::new(0), MenuTag::new(2)]
    );
    assert!(first);
    assert!(second);
    let seen1 = seen1.lock().unwrap();
    let seen2 = seen2.lock().unwrap();
    assert_eq!(seen1.len(), 1);
    assert_eq!(seen1[0].label, "A");
    assert_eq!(seen1[0].tag, MenuTag::new(0));
    assert_eq!(seen2.len(), 1);
    assert_eq!(seen2[0].label, "B");
}

#[test]
fn separator_selection_is_dropped() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let tag = icon.add_separator(0).unwrap();

    // Act
    let delivered = icon.item_selected_callback(tag);

    // Assert
    assert!(!delivered);
}

#[test]
fn out_of_range_remove_leaves_registry_unchanged() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    icon.add_item("A", 0, None).unwrap();
    icon.add_item("B", 1, None).unwrap();
    icon.add_notify().unwrap();
    h.bar.clear_calls();

    // Act
    let result = icon.remove_item(5);

    // Assert
    assert!(matches!(result, Err(TrayError::InvalidArgument(_))));
    assert_eq!(icon.menu_labels(), vec!["A", "B"]);
    assert_eq!(h.bar.count(NativeOp::RemoveMenuItem), 0);
}

#[test]
fn out_of_range_insert_is_not_pushed() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    icon.add_notify().unwrap();
    h.bar.clear_calls();

    // Act
    let result = icon.add_item("A", 1, None);

    // Assert
    assert!(matches!(result, Err(TrayError::InvalidArgument(_))));
    assert_eq!(icon.menu_len(), 0);
    assert!(h.bar.calls().is_empty());
}

#[test]
fn add_then_remove_restores_entries_but_not_the_tag() {
    // Arrange
    let mut registry = MenuRegistry::new();
    registry.insert("keep", 0, None).unwrap();
    let before_tags = registry.tags();

    // Act
    let tag = registry.insert("temp", 1, None).unwrap();
    let removed = registry.remove(1).unwrap();
    let next = registry.insert("again", 1, None).unwrap();

    // Assert
    assert_eq!(removed.tag, tag);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.tags()[..1], before_tags[..]);
    assert!(next > tag);
}

#[test]
fn tags_stay_distinct_and_increasing_under_churn() {
    // Arrange
    let mut registry = MenuRegistry::new();
    let mut allocated = Vec::new();

    // Act
    for round in 0..50usize {
        let index = round % (registry.len() + 1);
        allocated.push(registry.insert(&format!("item {}", round), index, None).unwrap());
        if round % 3 == 2 {
            registry.remove(round % registry.len()).unwrap();
        }
    }

    // Assert
    assert!(allocated.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(allocated.len(), 50);
}

#[test]
fn native_menu_mirrors_local_menu_once_attached() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    icon.add_item("A", 0, None).unwrap();
    icon.add_notify().unwrap();
    let handle = h.bar.live_handles()[0];

    // Act
    icon.add_item("B", 0, None).unwrap();
    icon.add_separator(2).unwrap();
    icon.remove_item(1).unwrap();

    // Assert
    assert_eq!(h.bar.menu_labels(handle), vec!["B", "-"]);
    assert_eq!(
        h.bar.menu_tags(handle),
        icon.menu_tags().iter().map(|t| t.raw()).collect::<Vec<_>>()
    );
}

#[test]
fn enabled_flag_follows_listener_presence() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    icon.add_notify().unwrap();
    let (listener, _) = recorder();

    // Act
    icon.add_item("Open", 0, Some(listener)).unwrap();
    icon.add_item("Disabled", 1, None).unwrap();

    // Assert
    let enabled: Vec<bool> = h
        .bar
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            statusbar_tray::native::NativeCall::AddMenuItem { enabled, .. } => Some(enabled),
            _ => None,
        })
        .collect();
    assert_eq!(enabled, vec![true, false]);
}

#[test]
fn resolve_uses_the_requesting_icon() {
    // Arrange
    let mut registry = MenuRegistry::new();
    let (listener, _) = recorder();
    let tag = registry.insert("A", 0, Some(listener)).unwrap();

    // Act
    let (_, event) = registry.resolve(IconId::new(77), tag).unwrap();

    // Assert
    assert_eq!(event.icon, IconId::new(77));
}
