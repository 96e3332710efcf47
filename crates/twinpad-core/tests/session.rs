use std::fs;
use std::path::PathBuf;
use twinpad_core::{
    Choice, CoordinatorConfig, DiskStatus, DocumentCoordinator, FixedPrompter, LangType,
    MemoryClipboard, Session, SnapshotConfig, SurfaceId, TextSurface, TransferMode,
};

fn coordinator(config: CoordinatorConfig) -> DocumentCoordinator {
    DocumentCoordinator::new(
        config,
        Box::new(FixedPrompter(Choice::No)),
        Box::new(MemoryClipboard::default()),
    )
}

fn titles(c: &DocumentCoordinator, view: SurfaceId) -> Vec<String> {
    c.view_slot(view)
        .unwrap()
        .tabs()
        .iter()
        .map(|id| c.buffer(*id).unwrap().title().to_string())
        .collect()
}

fn round_trip(session: &Session) -> Session {
    let json = serde_json::to_string_pretty(session).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_session_restores_tabs_and_positions() {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [
        ("a.rs", "fn main() {}\n"),
        ("b.txt", "one\ntwo\nthree\n"),
        ("c.py", "print(1)\n"),
    ] {
        fs::write(dir.path().join(name), body).unwrap();
    }

    let mut c = coordinator(CoordinatorConfig::default());
    let a = c.open_file(&dir.path().join("a.rs")).unwrap();
    let b = c.open_file(&dir.path().join("b.txt")).unwrap();
    {
        let mut surface = c.active_surface().unwrap();
        surface.set_selection(4, 4);
        surface.set_bookmark(1, true);
    }
    c.set_read_only(b, true);
    c.activate_buffer(a, SurfaceId::Main);
    c.active_surface().unwrap().set_selection(3, 3);
    assert!(c.move_or_clone_to_other_view(TransferMode::Clone));
    c.open_file(&dir.path().join("c.py")).unwrap();

    let session = c.capture_session();
    assert_eq!(session.main.files.len(), 2);
    assert_eq!(session.secondary.active_index, 1);
    assert_eq!(session.active_view, SurfaceId::Secondary);
    let session = round_trip(&session);

    let mut restored = coordinator(CoordinatorConfig::default());
    let report = restored.restore_session(&session);

    assert_eq!(report.restored, 4);
    assert!(report.missing.is_empty());
    assert_eq!(titles(&restored, SurfaceId::Main), vec!["a.rs", "b.txt"]);
    assert_eq!(titles(&restored, SurfaceId::Secondary), vec!["a.rs", "c.py"]);
    assert_eq!(restored.active_view(), SurfaceId::Secondary);
    assert_eq!(restored.store().len(), 3);

    let a2 = restored.current_buffer_in(SurfaceId::Main).unwrap();
    assert_eq!(restored.buffer(a2).unwrap().reference_count(), 2);
    assert_eq!(restored.buffer(a2).unwrap().lang(), LangType::Rust);
    assert_eq!(
        restored.view_state(SurfaceId::Main).unwrap().selection.caret,
        3
    );
    let c2 = restored.current_buffer_in(SurfaceId::Secondary).unwrap();
    assert_eq!(restored.buffer(c2).unwrap().title(), "c.py");

    let b2 = restored.view_slot(SurfaceId::Main).unwrap().at(1).unwrap();
    let b2 = restored.buffer(b2).unwrap();
    assert!(b2.is_user_read_only());
    assert_eq!(b2.document().bookmarked_lines(), vec![1]);
    assert_eq!(b2.saved_position(SurfaceId::Main).unwrap().caret, 4);
}

#[test]
fn test_unsaved_work_comes_back_from_backups() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("x.txt");
    fs::write(&file, "saved\n").unwrap();
    let config = CoordinatorConfig {
        snapshot: SnapshotConfig {
            backup_dir: Some(dir.path().join("backup")),
            ..SnapshotConfig::default()
        },
        ..CoordinatorConfig::default()
    };

    let mut c = coordinator(config.clone());
    c.open_file(&file).unwrap();
    c.active_surface().unwrap().insert(0, "unsaved ");
    assert!(c.backup_active());
    c.new_document();
    c.active_surface().unwrap().insert(0, "scratch");
    assert!(c.backup_active());
    // A clean untitled tab has nothing worth restoring.
    c.new_document();

    let session = round_trip(&c.capture_session());
    assert_eq!(session.main.files.len(), 2);
    fs::remove_file(&file).unwrap();

    let mut restored = coordinator(config);
    let report = restored.restore_session(&session);
    assert_eq!(report.restored, 2);
    assert_eq!(titles(&restored, SurfaceId::Main), vec!["x.txt", "new 1"]);

    let tabs = restored.view_slot(SurfaceId::Main).unwrap().tabs().to_vec();
    let x = restored.buffer(tabs[0]).unwrap();
    assert_eq!(x.document().text(), "unsaved saved\n");
    assert_eq!(x.path(), Some(file.as_path()));
    assert_eq!(x.disk_status(), DiskStatus::Deleted);
    assert!(x.is_dirty());

    let scratch = restored.buffer(tabs[1]).unwrap();
    assert!(scratch.is_untitled());
    assert!(scratch.is_dirty());
    assert_eq!(scratch.document().text(), "scratch");
}

#[test]
fn test_missing_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("gone.txt");
    fs::write(&file, "x\n").unwrap();
    let mut c = coordinator(CoordinatorConfig::default());
    c.open_file(&file).unwrap();
    let session = c.capture_session();
    fs::remove_file(&file).unwrap();

    let mut restored = coordinator(CoordinatorConfig::default());
    let report = restored.restore_session(&session);

    assert_eq!(report.restored, 0);
    assert_eq!(report.missing, vec![PathBuf::from(&file)]);
    assert_eq!(titles(&restored, SurfaceId::Main), vec!["new 1"]);
    assert!(!restored.is_visible(SurfaceId::Secondary));
}
