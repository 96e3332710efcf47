use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use twinpad_core::{
    Choice, CodePage, CoordinatorConfig, DiskStatus, DocumentCoordinator, Encoding,
    FileDetection, MemoryClipboard, ScriptedPrompter, SnapshotConfig, SurfaceId, TextSurface,
};

fn coordinator(
    config: CoordinatorConfig,
    answers: &[Choice],
) -> (DocumentCoordinator, ScriptedPrompter) {
    let prompter = ScriptedPrompter::new(answers.iter().copied());
    let c = DocumentCoordinator::new(
        config,
        Box::new(prompter.clone()),
        Box::new(MemoryClipboard::default()),
    );
    (c, prompter)
}

/// Rewrite `path` and push its modification time forward so the change is visible even on
/// filesystems with coarse timestamps.
fn rewrite(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
}

fn text(c: &DocumentCoordinator, id: twinpad_core::BufferId) -> String {
    c.buffer(id).unwrap().document().text()
}

#[test]
fn test_external_change_prompts_before_reloading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "v1\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[Choice::Yes]);
    let id = c.open_file(&path).unwrap();

    rewrite(&path, "v2\n");
    c.check_file_states();

    assert_eq!(prompter.asked(), 1);
    assert_eq!(text(&c, id), "v2\n");
    assert!(!c.buffer(id).unwrap().is_dirty());
}

#[test]
fn test_declining_a_reload_marks_the_buffer_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "v1\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[Choice::No]);
    let id = c.open_file(&path).unwrap();

    rewrite(&path, "v2\n");
    c.check_file_states();
    assert_eq!(text(&c, id), "v1\n");
    assert!(c.buffer(id).unwrap().is_dirty());

    // The same change is not reported twice.
    c.check_file_states();
    assert_eq!(prompter.asked(), 1);
}

#[test]
fn test_auto_update_reloads_clean_buffers_silently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    fs::write(&path, "a\n").unwrap();
    let config = CoordinatorConfig {
        file_detection: FileDetection {
            auto_update: true,
            ..FileDetection::default()
        },
        ..CoordinatorConfig::default()
    };
    let (mut c, prompter) = coordinator(config, &[Choice::No]);
    let id = c.open_file(&path).unwrap();

    rewrite(&path, "a\nb\n");
    c.check_file_states();
    assert_eq!(text(&c, id), "a\nb\n");
    assert_eq!(prompter.asked(), 0);

    // Unsaved edits still need confirmation.
    c.active_surface().unwrap().insert(0, "edit ");
    rewrite(&path, "c\n");
    c.check_file_states();
    assert_eq!(prompter.asked(), 1);
    assert_eq!(text(&c, id), "edit a\nb\n");
}

#[test]
fn test_monitoring_follows_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.log");
    fs::write(&path, "start\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[]);
    let id = c.open_file(&path).unwrap();

    assert!(c.set_monitoring(id, true));
    assert!(c.buffer(id).unwrap().is_read_only());

    rewrite(&path, "start\nline 2\nline 3\n");
    c.check_file_states();

    assert_eq!(prompter.asked(), 0);
    assert_eq!(text(&c, id), "start\nline 2\nline 3\n");
    let state = c.view_state(SurfaceId::Main).unwrap();
    assert_eq!(state.selection.caret, 20);
    assert_eq!(state.first_visible_line, 3);

    assert!(c.set_monitoring(id, false));
    assert!(!c.buffer(id).unwrap().is_read_only());
}

#[test]
fn test_deleted_file_can_be_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.txt");
    fs::write(&path, "data\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[Choice::Yes]);
    let id = c.open_file(&path).unwrap();

    fs::remove_file(&path).unwrap();
    c.check_file_states();

    let buffer = c.buffer(id).unwrap();
    assert_eq!(buffer.disk_status(), DiskStatus::Deleted);
    assert!(buffer.is_dirty());
    assert_eq!(buffer.document().text(), "data\n");

    c.check_file_states();
    assert_eq!(prompter.asked(), 1);

    // Saving writes the file back.
    c.save_buffer(id, None).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "data\n");
    assert_eq!(c.buffer(id).unwrap().disk_status(), DiskStatus::Regular);
}

#[test]
fn test_deleted_file_can_be_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.txt");
    fs::write(&path, "data\n").unwrap();
    let (mut c, _) = coordinator(CoordinatorConfig::default(), &[Choice::No]);
    let id = c.open_file(&path).unwrap();

    fs::remove_file(&path).unwrap();
    c.check_file_states();

    assert!(c.buffer(id).is_none());
    assert_eq!(c.store().len(), 1);
    assert!(c.buffer(c.current_buffer().unwrap()).unwrap().is_clean_untitled());
}

#[test]
fn test_background_buffers_reload_when_activated() {
    let dir = tempfile::tempdir().unwrap();
    let a_path = dir.path().join("a.txt");
    let b_path = dir.path().join("b.txt");
    fs::write(&a_path, "a1\n").unwrap();
    fs::write(&b_path, "b1\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[Choice::Yes]);
    let a = c.open_file(&a_path).unwrap();
    let b = c.open_file(&b_path).unwrap();
    assert_eq!(c.current_buffer(), Some(b));

    rewrite(&a_path, "a2\n");
    c.check_file_states();
    assert_eq!(prompter.asked(), 1);
    assert!(c.buffer(a).unwrap().needs_reload());
    assert_eq!(text(&c, a), "a1\n");

    assert!(c.activate_buffer(a, SurfaceId::Main));
    assert!(!c.buffer(a).unwrap().needs_reload());
    assert_eq!(text(&c, a), "a2\n");
}

#[test]
fn test_idle_runs_checks_queued_by_activation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "one\n").unwrap();
    let (mut c, prompter) = coordinator(CoordinatorConfig::default(), &[Choice::Yes]);
    let id = c.open_file(&path).unwrap();

    rewrite(&path, "two\n");
    c.idle();
    assert_eq!(prompter.asked(), 1);
    assert_eq!(text(&c, id), "two\n");

    c.idle();
    assert_eq!(prompter.asked(), 1);
}

#[test]
fn test_detection_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "one\n").unwrap();
    let config = CoordinatorConfig {
        file_detection: FileDetection {
            enabled: false,
            ..FileDetection::default()
        },
        ..CoordinatorConfig::default()
    };
    let (mut c, prompter) = coordinator(config, &[Choice::Yes]);
    let id = c.open_file(&path).unwrap();

    rewrite(&path, "two\n");
    c.check_file_states();
    c.idle();
    assert_eq!(prompter.asked(), 0);
    assert_eq!(text(&c, id), "one\n");
}

#[test]
fn test_snapshot_backups_follow_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backup");
    let config = CoordinatorConfig {
        snapshot: SnapshotConfig {
            enabled: true,
            backup_dir: Some(backups.clone()),
            ..SnapshotConfig::default()
        },
        ..CoordinatorConfig::default()
    };
    let (mut c, _) = coordinator(config, &[]);
    let id = c.current_buffer().unwrap();

    // Nothing to back up while clean.
    assert!(!c.backup_active());

    c.active_surface().unwrap().insert(0, "draft");
    assert!(c.backup_active());
    let backup = c.buffer(id).unwrap().backup_path().unwrap().to_path_buf();
    assert!(backup.starts_with(&backups));
    assert!(backup.file_name().unwrap().to_string_lossy().starts_with("new 1@"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), "draft");

    let target = dir.path().join("draft.txt");
    c.save_buffer(id, Some(&target)).unwrap();
    assert!(!backup.exists());
    assert!(c.buffer(id).unwrap().backup_path().is_none());
}

#[test]
fn test_changing_the_encoding_of_a_clean_file_rereads_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cafe.txt");
    fs::write(&path, "caf\u{e9}\n").unwrap();
    let (mut c, _) = coordinator(CoordinatorConfig::default(), &[]);
    let id = c.open_file(&path).unwrap();
    assert_eq!(c.buffer(id).unwrap().encoding(), Encoding::Utf8);

    let latin = Encoding::from_label("windows-1252").unwrap();
    assert!(c.set_encoding(id, latin).unwrap());
    assert_eq!(text(&c, id), "caf\u{c3}\u{a9}\n");
    assert_eq!(c.view_state(SurfaceId::Main).unwrap().code_page, CodePage::Ansi);

    // With unsaved edits only the save encoding changes.
    c.active_surface().unwrap().insert(0, "x");
    assert!(c.set_encoding(id, Encoding::Utf8).unwrap());
    assert_eq!(text(&c, id), "xcaf\u{c3}\u{a9}\n");
    assert_eq!(c.buffer(id).unwrap().encoding(), Encoding::Utf8);
    assert!(!c.set_encoding(id, Encoding::Utf8).unwrap());
}
