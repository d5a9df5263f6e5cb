use crate::common::{harness, recorder, TIMEOUT};
use statusbar_tray::menu::MenuEvent;
use statusbar_tray::native::MouseEventKind;
use statusbar_tray::tray::IconId;
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn menu_selection_runs_on_the_ui_thread_not_inline() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let ran_on = Arc::new(Mutex::new(Vec::new()));
    let sink = ran_on.clone();
    icon.add_item(
        "A",
        0,
        Some(Arc::new(move |_: &MenuEvent| {
            sink.lock().unwrap().push(thread::current().id());
        })),
    )
    .unwrap();

    // Act
    let router = h.router().clone();
    let id = icon.id();
    let posted = thread::spawn(move || router.on_menu_item_selected(id, 0))
        .join()
        .unwrap();
    let before_drain = ran_on.lock().unwrap().len();
    let drained = h.ui_loop.drain();

    // Assert
    assert!(posted);
    assert_eq!(before_drain, 0);
    assert_eq!(drained.ran, 1);
    assert_eq!(*ran_on.lock().unwrap(), vec![thread::current().id()]);
}

#[test]
fn events_for_unknown_icons_are_dropped() {
    // Arrange
    let h = harness();

    // Act
    let menu = h.router().on_menu_item_selected(IconId::new(u64::MAX), 0);
    let click = h.router().on_status_item_selected(IconId::new(u64::MAX));
    let drained = h.ui_loop.drain();

    // Assert
    assert!(!menu);
    assert!(!click);
    assert_eq!(drained.ran, 0);
}

#[test]
fn selection_of_item_removed_before_dispatch_is_dropped() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let (listener, seen) = recorder();
    icon.add_item("A", 0, Some(listener)).unwrap();

    // Act
    h.router().on_menu_item_selected(icon.id(), 0);
    icon.remove_item(0).unwrap();
    let drained = h.ui_loop.drain();

    // Assert
    assert_eq!(drained.ran, 1);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn icon_dropped_before_dispatch_misses_the_event() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let (listener, seen) = recorder();
    icon.add_item("A", 0, Some(listener)).unwrap();
    let id = icon.id();

    // Act
    h.router().on_menu_item_selected(id, 0);
    drop(icon);
    let drained = h.ui_loop.drain();

    // Assert
    assert_eq!(drained.ran, 1);
    assert!(seen.lock().unwrap().is_empty());
    assert!(!h.router().is_registered(id));
}

#[test]
fn status_item_selection_fires_action_listeners() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let count = Arc::new(Mutex::new(0));
    let counter = count.clone();
    icon.add_action_listener(move |_| *counter.lock().unwrap() += 1);

    // Act
    h.router().on_status_item_selected(icon.id());
    h.ui_loop.drain();

    // Assert
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn mouse_press_opens_menu_on_the_ui_thread() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    icon.add_item("A", 0, None).unwrap();

    // Act
    h.router()
        .on_mouse_event(icon.id(), MouseEventKind::RightDown, 5.0, 5.0, 120.0);
    let showing_before = icon.menu_showing();
    h.ui_loop.drain();

    // Assert
    assert!(!showing_before);
    assert!(icon.menu_showing());
    assert!(icon.highlighted());
}

#[test]
fn events_from_another_thread_arrive_in_order() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let order = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let sink = order.clone();
        let index = icon.menu_len();
        icon.add_item(
            label,
            index,
            Some(Arc::new(move |e: &MenuEvent| sink.lock().unwrap().push(e.label.clone()))),
        )
        .unwrap();
    }

    // Act
    let router = h.router().clone();
    let id = icon.id();
    let native = thread::spawn(move || {
        for tag in [2, 0, 1] {
            router.on_menu_item_selected(id, tag);
        }
    });
    native.join().unwrap();
    let drained = h.ui_loop.run_for(TIMEOUT, 3);

    // Assert
    assert_eq!(drained.ran, 3);
    assert_eq!(*order.lock().unwrap(), vec!["third", "first", "second"]);
}

#[test]
fn selection_is_published_on_the_event_bus() {
    // Arrange
    let h = harness();
    let icon = h.icon();
    let (listener, _) = recorder();
    icon.add_item("A", 0, Some(listener)).unwrap();
    let mut rx = h.events.subscribe();

    // Act
    h.router().on_menu_item_selected(icon.id(), 0);
    h.ui_loop.drain();

    // Assert
    let event = rx.try_recv().unwrap();
    assert_eq!(
        event,
        statusbar_tray::daemon::TrayEvent::MenuItemSelected {
            icon: icon.id(),
            tag: statusbar_tray::menu::MenuTag::new(0),
        }
    );
}
