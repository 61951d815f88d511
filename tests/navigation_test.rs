mod common;

use common::{load_csv, numbered, range, HOURLY_CSV};
use rowscope::window::WindowLimits;
use rowscope::{
    AppEvent, ExploreError, Explorer, NavDirection, NavigationWindow, Outcome, Presentation,
    RawTable,
};

#[test]
fn test_hourly_scenario() {
    let mut explorer = load_csv(HOURLY_CSV);
    explorer.handle(AppEvent::SetWindowSize(2)).unwrap();
    explorer.handle(AppEvent::SetStep(1)).unwrap();
    assert_eq!(range(&explorer), 0..2);

    explorer
        .handle(AppEvent::Navigate(NavDirection::Forward))
        .unwrap();
    assert_eq!(range(&explorer), 1..3);

    explorer
        .handle(AppEvent::Navigate(NavDirection::Backward))
        .unwrap();
    let second = explorer
        .handle(AppEvent::Navigate(NavDirection::Backward))
        .unwrap();
    assert_eq!(second, Outcome::Unchanged);
    assert_eq!(range(&explorer), 0..2);
}

#[test]
fn test_visible_range_bounds_hold() {
    for len in [0usize, 1, 2, 7, 30] {
        for size in [1i64, 3, 10, 40] {
            let mut explorer = numbered(len, size, 4);
            let events = [
                AppEvent::Navigate(NavDirection::Forward),
                AppEvent::Navigate(NavDirection::Forward),
                AppEvent::Scroll(1.0),
                AppEvent::Last,
                AppEvent::Navigate(NavDirection::Forward),
                AppEvent::Scroll(-3.0),
                AppEvent::Navigate(NavDirection::Backward),
                AppEvent::First,
                AppEvent::Navigate(NavDirection::Backward),
            ];
            for event in events {
                explorer.handle(event).unwrap();
                let r = range(&explorer);
                assert!(r.start <= r.end, "len={} size={}", len, size);
                assert!(r.end <= len, "len={} size={}", len, size);
                assert!(r.end - r.start <= size as usize, "len={} size={}", len, size);
                assert!(explorer.window().offset() <= len.saturating_sub(size as usize));
            }
        }
    }
}

#[test]
fn test_next_at_end_is_noop() {
    let mut explorer = numbered(10, 4, 4);
    explorer.handle(AppEvent::Last).unwrap();
    assert_eq!(explorer.window().offset(), 6);
    assert_eq!(
        explorer.handle(AppEvent::Navigate(NavDirection::Forward)),
        Ok(Outcome::Unchanged)
    );
    assert_eq!(explorer.window().offset(), 6);
}

#[test]
fn test_set_size_round_trip() {
    let mut explorer = numbered(50, 10, 5);
    explorer.handle(AppEvent::Navigate(NavDirection::Forward)).unwrap();
    explorer.handle(AppEvent::SetWindowSize(20)).unwrap();
    assert_eq!(explorer.window().offset(), 0);
    explorer.handle(AppEvent::SetWindowSize(10)).unwrap();
    assert_eq!(explorer.window().size(), 10);
}

#[test]
fn test_size_clamped_to_config() {
    let mut explorer = numbered(5, 10, 1);
    let outcome = explorer.handle(AppEvent::SetWindowSize(0)).unwrap();
    assert!(matches!(outcome, Outcome::Corrected(_)));
    assert_eq!(explorer.window().size(), 1);

    let outcome = explorer.handle(AppEvent::SetStepText("-7".into())).unwrap();
    assert!(matches!(outcome, Outcome::Corrected(_)));
    assert_eq!(explorer.window().step(), 1);
}

#[test]
fn test_wheel_scroll_moves_half_step() {
    let mut explorer = numbered(100, 10, 8);
    explorer.handle(AppEvent::Scroll(120.0)).unwrap();
    assert_eq!(explorer.window().offset(), 4);
    explorer.handle(AppEvent::Scroll(-1.0)).unwrap();
    assert_eq!(explorer.window().offset(), 0);
}

#[test]
fn test_empty_window_range() {
    let mut window = NavigationWindow::new(WindowLimits::default(), 10, 1);
    window.set_len(0);
    assert_eq!(window.visible_range(), 0..0);
    assert_eq!(window.position_label(), "0 - 0 of 0");
    assert!(!window.next());
}

#[test]
fn test_empty_table_is_not_loaded() {
    let table = RawTable::new(vec!["i".to_string()], Vec::new());
    let mut explorer = Explorer::default();
    let err = explorer.handle(AppEvent::LoadPrimary(table)).unwrap_err();
    assert!(matches!(err, ExploreError::ParseFailure(_)));
    assert!(explorer.dataset().is_none());
    assert!(explorer.payload(Presentation::Standard).is_none());
}

#[test]
fn test_position_label_follows_window() {
    let mut explorer = numbered(45, 20, 20);
    explorer.handle(AppEvent::Last).unwrap();
    let payload = explorer.payload(Presentation::Standard).unwrap();
    assert_eq!(payload.content.position_label, "26 - 45 of 45");
}

#[test]
fn test_new_load_resets_offset() {
    let mut explorer = numbered(30, 5, 5);
    explorer.handle(AppEvent::Last).unwrap();
    explorer
        .handle(AppEvent::LoadPrimaryCsv("a\n1\n2\n".into()))
        .unwrap();
    assert_eq!(explorer.window().offset(), 0);
    assert_eq!(range(&explorer), 0..2);
}
