use twinpad_core::{
    Choice, CoordinatorConfig, DocumentCoordinator, FindError, FindOptions, FixedPrompter,
    MemoryClipboard, SearchMode, Selection, TextSurface,
};

fn editor(text: &str) -> DocumentCoordinator {
    let mut c = DocumentCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(FixedPrompter(Choice::No)),
        Box::new(MemoryClipboard::default()),
    );
    {
        let mut surface = c.active_surface().unwrap();
        surface.insert(0, text);
        surface.set_selection(0, 0);
    }
    c
}

fn text(c: &mut DocumentCoordinator) -> String {
    c.active_surface().unwrap().text()
}

fn selection(c: &DocumentCoordinator) -> Selection {
    c.view_state(c.active_view()).unwrap().selection
}

#[test]
fn test_find_next_wraps_around() {
    let mut c = editor("cat dog cat");
    let options = FindOptions::literal("cat");

    assert_eq!(c.find_next(&options, true, true).unwrap(), Some((0, 3)));
    assert_eq!(c.find_next(&options, true, true).unwrap(), Some((8, 11)));
    assert_eq!(c.find_next(&options, true, false).unwrap(), None);
    assert_eq!(c.find_next(&options, true, true).unwrap(), Some((0, 3)));
    assert_eq!(selection(&c), Selection::new(0, 3));

    assert_eq!(c.find_next(&options, false, true).unwrap(), Some((8, 11)));
}

#[test]
fn test_whole_word_and_case() {
    let mut c = editor("Cat concat cat");
    let mut options = FindOptions::literal("cat");
    options.whole_word = true;
    assert_eq!(c.count_matches(&options).unwrap(), 1);

    options.match_case = false;
    assert_eq!(c.count_matches(&options).unwrap(), 2);

    options.whole_word = false;
    assert_eq!(c.count_matches(&options).unwrap(), 3);
}

#[test]
fn test_replace_next_replaces_the_selected_match_only() {
    let mut c = editor("a-a-a");
    let options = FindOptions::literal("a").with_replacement("bb");

    // Nothing is selected yet: the first call only selects.
    assert!(!c.replace_next(&options, true).unwrap());
    assert_eq!(selection(&c), Selection::new(0, 1));

    assert!(c.replace_next(&options, true).unwrap());
    assert_eq!(text(&mut c), "bb-a-a");
    assert_eq!(selection(&c), Selection::new(3, 4));
}

#[test]
fn test_regex_replace_all_expands_groups() {
    let mut c = editor("x=1\ny=22\n");
    let options = FindOptions::regex(r"^(\w)=(\d+)$").with_replacement(r"\2:\1");

    assert_eq!(c.replace_all(&options).unwrap(), 2);
    assert_eq!(text(&mut c), "1:x\n22:y\n");

    assert!(c.undo());
    assert_eq!(text(&mut c), "x=1\ny=22\n");
}

#[test]
fn test_regex_keeps_crlf_line_endings() {
    let mut c = editor("foo\r\nbar\r\n");
    assert_eq!(c.count_matches(&FindOptions::regex("foo$")).unwrap(), 1);
    assert_eq!(c.count_matches(&FindOptions::regex("^bar$")).unwrap(), 1);

    let mut c = editor("ab\r\ncd");
    let options = FindOptions::regex("b.*").with_replacement("X");
    assert_eq!(c.replace_all(&options).unwrap(), 1);
    assert_eq!(text(&mut c), "aX\r\ncd");
}

#[test]
fn test_extended_mode_escapes() {
    let mut c = editor("a\tb\tc");
    let options = FindOptions {
        pattern: r"\t".to_string(),
        replacement: r"\n".to_string(),
        mode: SearchMode::Extended,
        match_case: true,
        ..FindOptions::default()
    };

    assert_eq!(c.replace_all(&options).unwrap(), 2);
    assert_eq!(text(&mut c), "a\nb\nc");
}

#[test]
fn test_normal_mode_is_literal() {
    let mut c = editor("1+1=2 11=2");
    assert_eq!(c.count_matches(&FindOptions::literal("1+1")).unwrap(), 1);
}

#[test]
fn test_malformed_and_empty_patterns_are_errors() {
    let mut c = editor("abc");
    assert!(matches!(
        c.count_matches(&FindOptions::regex("[a")),
        Err(FindError::MalformedPattern(_))
    ));
    assert!(matches!(
        c.find_next(&FindOptions::literal(""), true, true),
        Err(FindError::MalformedPattern(_))
    ));
    assert_eq!(c.count_matches(&FindOptions::literal("zzz")).unwrap(), 0);
}

#[test]
fn test_replace_is_refused_on_read_only_buffers() {
    let mut c = editor("aaa");
    let id = c.current_buffer().unwrap();
    c.set_read_only(id, true);

    assert_eq!(c.replace_all(&FindOptions::literal("a").with_replacement("b")).unwrap(), 0);
    assert_eq!(text(&mut c), "aaa");
    // Searching still works.
    assert_eq!(c.count_matches(&FindOptions::literal("a")).unwrap(), 3);
}
