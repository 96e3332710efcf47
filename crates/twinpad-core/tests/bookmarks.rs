use std::sync::{Arc, Mutex};
use twinpad_core::{
    Choice, Clipboard, CoordinatorConfig, DocumentCoordinator, FindOptions, FixedPrompter,
    TextSurface,
};

#[derive(Clone, Default)]
struct SharedClipboard(Arc<Mutex<Option<String>>>);

impl Clipboard for SharedClipboard {
    fn set_text(&mut self, text: String) {
        *self.0.lock().unwrap() = Some(text);
    }

    fn text(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }
}

fn editor(text: &str, marks: &[usize]) -> (DocumentCoordinator, SharedClipboard) {
    let clipboard = SharedClipboard::default();
    let mut c = DocumentCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(FixedPrompter(Choice::No)),
        Box::new(clipboard.clone()),
    );
    {
        let mut surface = c.active_surface().unwrap();
        surface.insert(0, text);
        surface.set_selection(0, 0);
        for line in marks {
            surface.set_bookmark(*line, true);
        }
    }
    (c, clipboard)
}

fn text(c: &mut DocumentCoordinator) -> String {
    c.active_surface().unwrap().text()
}

fn marks(c: &DocumentCoordinator) -> Vec<usize> {
    let id = c.current_buffer().unwrap();
    c.buffer(id).unwrap().document().bookmarked_lines()
}

#[test]
fn test_toggle_and_navigate_bookmarks() {
    let (mut c, _) = editor("one\ntwo\nthree\nfour\n", &[]);
    c.active_surface().unwrap().set_selection(5, 5);
    c.toggle_bookmark();
    c.active_surface().unwrap().set_selection(15, 15);
    c.toggle_bookmark();
    assert_eq!(marks(&c), vec![1, 3]);

    c.active_surface().unwrap().set_selection(0, 0);
    assert_eq!(c.goto_next_bookmark(true), Some(1));
    assert_eq!(c.goto_next_bookmark(true), Some(3));
    assert_eq!(c.goto_next_bookmark(true), Some(1));
    assert_eq!(c.goto_next_bookmark(false), Some(3));
    assert_eq!(c.view_state(c.active_view()).unwrap().selection.caret, 14);

    c.toggle_bookmark();
    assert_eq!(marks(&c), vec![1]);
}

#[test]
fn test_invert_and_clear() {
    let (mut c, _) = editor("a\nb\nc", &[0]);
    c.invert_bookmarks();
    assert_eq!(marks(&c), vec![1, 2]);
    c.clear_bookmarks();
    assert!(marks(&c).is_empty());
}

#[test]
fn test_copy_and_cut_marked_lines() {
    let (mut c, clipboard) = editor("one\ntwo\nthree\nfour\n", &[1, 3]);

    assert!(c.copy_marked_lines());
    assert_eq!(clipboard.text().as_deref(), Some("two\nfour\n"));
    assert_eq!(text(&mut c), "one\ntwo\nthree\nfour\n");

    *clipboard.0.lock().unwrap() = None;
    assert!(c.cut_marked_lines());
    assert_eq!(clipboard.text().as_deref(), Some("two\nfour\n"));
    assert_eq!(text(&mut c), "one\nthree\n");
    assert!(marks(&c).is_empty());

    assert!(!c.copy_marked_lines());
}

#[test]
fn test_copy_terminates_an_unterminated_last_line() {
    let (mut c, clipboard) = editor("a\nb", &[1]);
    assert!(c.copy_marked_lines());
    assert_eq!(clipboard.text().as_deref(), Some("b\n"));
}

#[test]
fn test_delete_marked_and_unmarked_lines() {
    let (mut c, _) = editor("a\nb", &[1]);
    assert_eq!(c.delete_lines(true), 1);
    // The last line takes the break before it along.
    assert_eq!(text(&mut c), "a");

    let (mut c, _) = editor("a\nb\nc", &[1]);
    assert_eq!(c.delete_lines(false), 2);
    assert_eq!(text(&mut c), "b");
    assert!(c.undo());
    assert_eq!(text(&mut c), "a\nb\nc");
}

#[test]
fn test_paste_to_marked_lines() {
    let (mut c, mut clipboard) = editor("a\nb\nc\nd", &[0, 2]);
    clipboard.set_text("X\r\nY\r\nZ".to_string());

    assert_eq!(c.paste_to_marked_lines(), 2);
    assert_eq!(text(&mut c), "X\nb\nY\nd");
    assert_eq!(marks(&c), vec![0, 2]);
}

#[test]
fn test_bulk_operations_refused_while_one_is_running() {
    let (mut c, clipboard) = editor("a\nb\n", &[0]);
    let token = c.bookmark_guard().try_enter().unwrap();

    assert!(!c.copy_marked_lines());
    assert!(!c.cut_marked_lines());
    assert_eq!(c.delete_lines(true), 0);
    assert_eq!(clipboard.text(), None);

    drop(token);
    assert!(c.copy_marked_lines());
}

#[test]
fn test_bookmark_matching_lines() {
    let (mut c, _) = editor("one\ntwo\nthree\nfour", &[1]);

    assert_eq!(c.bookmark_matches(&FindOptions::literal("o")).unwrap(), 2);
    assert_eq!(marks(&c), vec![0, 1, 3]);
    assert!(c.bookmark_matches(&FindOptions::regex("(")).is_err());
}
