use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use twinpad_core::{
    BufferId, Choice, CoordinatorConfig, CoordinatorEvent, DocumentCoordinator, FixedPrompter,
    MemoryClipboard, Notification, SurfaceId, TextSurface, TransferMode, WindowStatus,
};

fn coordinator() -> DocumentCoordinator {
    DocumentCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(FixedPrompter(Choice::Yes)),
        Box::new(MemoryClipboard::default()),
    )
}

fn write_files(dir: &tempfile::TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, format!("contents of {name}\n")).unwrap();
            path
        })
        .collect()
}

fn record_events(c: &mut DocumentCoordinator) -> Arc<Mutex<Vec<CoordinatorEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    c.subscribe(move |e| sink.lock().unwrap().push(*e));
    events
}

#[test]
fn test_opening_a_file_replaces_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt"]);
    let mut c = coordinator();
    let placeholder = c.current_buffer().unwrap();
    let events = record_events(&mut c);

    let a = c.open_file(&paths[0]).unwrap();

    assert_eq!(c.view_slot(SurfaceId::Main).unwrap().tabs(), &[a]);
    assert_eq!(c.current_buffer(), Some(a));
    assert!(c.buffer(placeholder).is_none());
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&CoordinatorEvent::Notify(Notification::BeforeClose(placeholder)))
    );

    // A second open only re-activates.
    assert_eq!(c.open_file(&paths[0]).unwrap(), a);
    assert_eq!(c.store().len(), 1);
}

#[test]
fn test_clone_shares_the_buffer_with_independent_positions() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    c.active_surface().unwrap().set_selection(3, 3);

    assert!(c.move_or_clone_to_other_view(TransferMode::Clone));

    assert_eq!(c.active_view(), SurfaceId::Secondary);
    assert!(c.window_status().contains(WindowStatus::MAIN_VISIBLE | WindowStatus::SECONDARY_VISIBLE));
    assert_eq!(c.buffer(a).unwrap().reference_count(), 2);
    assert_eq!(c.current_buffer_in(SurfaceId::Secondary), Some(a));
    // The clone starts where the source was.
    assert_eq!(c.view_state(SurfaceId::Secondary).unwrap().selection.caret, 3);

    c.active_surface().unwrap().set_selection(7, 7);
    assert_eq!(c.view_state(SurfaceId::Main).unwrap().selection.caret, 3);

    // An edit through one view is seen by the other.
    c.active_surface().unwrap().insert(0, "> ");
    let main_text = c.surface(SurfaceId::Main).unwrap().text();
    assert!(main_text.starts_with("> contents"));
}

#[test]
fn test_move_closes_the_source_tab() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt", "b.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    let b = c.open_file(&paths[1]).unwrap();

    assert!(c.move_or_clone_to_other_view(TransferMode::Move));

    assert_eq!(c.view_slot(SurfaceId::Main).unwrap().tabs(), &[a]);
    assert_eq!(c.current_buffer_in(SurfaceId::Main), Some(a));
    assert_eq!(c.view_slot(SurfaceId::Secondary).unwrap().tabs(), &[b]);
    assert_eq!(c.active_view(), SurfaceId::Secondary);
    assert_eq!(c.buffer(b).unwrap().references(), &[SurfaceId::Secondary]);
}

#[test]
fn test_moving_the_only_tab_into_a_hidden_view_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();

    assert!(!c.move_or_clone_to_other_view(TransferMode::Move));
    assert!(!c.is_visible(SurfaceId::Secondary));
    assert_eq!(c.current_buffer(), Some(a));
}

#[test]
fn test_closing_the_last_tab_of_the_secondary_view_hides_it() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt", "b.txt"]);
    let mut c = coordinator();
    c.open_file(&paths[0]).unwrap();
    let b = c.open_file(&paths[1]).unwrap();
    c.move_or_clone_to_other_view(TransferMode::Move);
    let events = record_events(&mut c);

    assert!(c.close_buffer(b, SurfaceId::Secondary));

    assert!(c.buffer(b).is_none());
    assert!(!c.is_visible(SurfaceId::Secondary));
    assert_eq!(c.active_view(), SurfaceId::Main);
    assert!(!c.window_status().contains(WindowStatus::SECONDARY_VISIBLE));
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&CoordinatorEvent::Notify(Notification::BeforeClose(b)))
    );
}

#[test]
fn test_closing_a_clone_keeps_the_buffer_alive() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    c.move_or_clone_to_other_view(TransferMode::Clone);

    assert!(c.close_buffer(a, SurfaceId::Main));

    let buffer = c.buffer(a).unwrap();
    assert_eq!(buffer.references(), &[SurfaceId::Secondary]);
    // Main got a fresh placeholder in place of its only tab and was hidden.
    assert!(!c.is_visible(SurfaceId::Main));
    let main = c.view_slot(SurfaceId::Main).unwrap();
    assert_eq!(main.len(), 1);
    assert!(c.buffer(main.at(0).unwrap()).unwrap().is_clean_untitled());
}

/// The reference count of `id` matches the tab strips holding it.
fn assert_references(c: &DocumentCoordinator, id: BufferId) {
    let holders = [SurfaceId::Main, SurfaceId::Secondary]
        .into_iter()
        .filter(|v| c.view_slot(*v).unwrap().contains(id))
        .count();
    match c.buffer(id) {
        Some(buffer) => assert_eq!(buffer.reference_count(), holders, "{id:?}"),
        None => assert_eq!(holders, 0, "{id:?} closed but still shown"),
    }
}

fn closes_of(events: &Mutex<Vec<CoordinatorEvent>>, id: BufferId) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| **e == CoordinatorEvent::Notify(Notification::BeforeClose(id)))
        .count()
}

#[test]
fn test_reference_counts_follow_the_tab_strips() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt", "b.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    let b = c.open_file(&paths[1]).unwrap();
    let events = record_events(&mut c);
    let check = |c: &DocumentCoordinator| {
        assert_references(c, a);
        assert_references(c, b);
    };
    check(&c);

    assert!(c.activate_buffer(a, SurfaceId::Main));
    assert!(c.move_or_clone_to_other_view(TransferMode::Clone));
    check(&c);
    assert_eq!(c.buffer(a).unwrap().reference_count(), 2);

    assert!(c.bind_buffer_to_view(b, SurfaceId::Secondary, false));
    check(&c);
    assert!(!c.bind_buffer_to_view(b, SurfaceId::Secondary, false));
    check(&c);

    assert!(c.unbind_buffer_from_view(a, SurfaceId::Main));
    check(&c);
    assert_eq!(c.buffer(a).unwrap().reference_count(), 1);

    // Secondary holds a and b; a moves back to main.
    assert_eq!(c.active_view(), SurfaceId::Secondary);
    assert!(c.activate_buffer(a, SurfaceId::Secondary));
    assert!(c.move_or_clone_to_other_view(TransferMode::Move));
    check(&c);
    assert_eq!(c.buffer(a).unwrap().references(), &[SurfaceId::Main]);

    assert!(c.close_buffer(b, SurfaceId::Main));
    check(&c);
    assert_eq!(closes_of(&events, b), 0);

    assert!(c.close_buffer(b, SurfaceId::Secondary));
    check(&c);
    assert!(c.buffer(b).is_none());

    assert!(c.close_buffer(a, SurfaceId::Main));
    check(&c);
    assert!(c.buffer(a).is_none());

    assert_eq!(closes_of(&events, a), 1);
    assert_eq!(closes_of(&events, b), 1);
}

#[test]
fn test_unbinding_the_current_tab_activates_its_neighbour() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt", "b.txt", "c.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    let b = c.open_file(&paths[1]).unwrap();
    let last = c.open_file(&paths[2]).unwrap();

    c.activate_buffer(b, SurfaceId::Main);
    assert!(c.unbind_buffer_from_view(b, SurfaceId::Main));
    assert_eq!(c.current_buffer(), Some(last));

    assert!(c.unbind_buffer_from_view(last, SurfaceId::Main));
    assert_eq!(c.current_buffer(), Some(a));
    assert!(!c.unbind_buffer_from_view(last, SurfaceId::Main));
}

#[test]
fn test_positions_survive_tab_switches() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt", "b.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    c.active_surface().unwrap().set_selection(2, 5);
    let b = c.open_file(&paths[1]).unwrap();
    assert_eq!(c.current_buffer(), Some(b));

    c.activate_buffer(a, SurfaceId::Main);
    let selection = c.view_state(SurfaceId::Main).unwrap().selection;
    assert_eq!((selection.anchor, selection.caret), (2, 5));
}

#[test]
fn test_show_and_hide_views() {
    let mut c = coordinator();
    assert!(c.show_view(SurfaceId::Secondary));
    // An empty view receives an untitled buffer.
    assert_eq!(c.view_slot(SurfaceId::Secondary).unwrap().len(), 1);
    assert!(c.can_hide_view(SurfaceId::Secondary));

    c.switch_active_view(SurfaceId::Secondary);
    assert!(c.hide_view(SurfaceId::Secondary));
    assert_eq!(c.active_view(), SurfaceId::Main);
    assert!(!c.hide_view(SurfaceId::Main));
}

#[test]
fn test_delete_file_closes_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.txt"]);
    let mut c = coordinator();
    let a = c.open_file(&paths[0]).unwrap();
    c.move_or_clone_to_other_view(TransferMode::Clone);

    assert!(c.delete_file(a).unwrap());

    assert!(!paths[0].exists());
    assert!(c.buffer(a).is_none());
    assert!(!c.opened_buffers().contains(&a));
}

#[test]
fn test_read_only_buffers_refuse_edit_commands() {
    let mut c = coordinator();
    let id = c.current_buffer().unwrap();
    c.active_surface().unwrap().insert(0, "a  \nb  \n");
    assert!(c.set_read_only(id, true));

    assert!(!c.trim_lines(twinpad_core::Trim::Trailing));
    assert_eq!(c.buffer(id).unwrap().document().text(), "a  \nb  \n");

    c.set_read_only(id, false);
    assert!(c.trim_lines(twinpad_core::Trim::Trailing));
    assert_eq!(c.buffer(id).unwrap().document().text(), "a\nb\n");
    assert!(c.undo());
    assert_eq!(c.buffer(id).unwrap().document().text(), "a  \nb  \n");
}
