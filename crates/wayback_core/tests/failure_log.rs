use pretty_assertions::assert_eq;
use wayback_core::{index_targets, BatchState, FailureReason, Outcome, FAILURE_LOG_FILENAME};

#[test]
fn failure_log_lists_failed_targets_in_input_order() {
    let urls = vec![
        "https://x/1".to_string(),
        "https://x/2".to_string(),
        "https://x/3".to_string(),
        "https://x/4".to_string(),
    ];
    let mut state = BatchState::new(index_targets(urls));
    state.record(3, Outcome::failure("4", FailureReason::HttpStatus(500)));
    state.record(1, Outcome::success("2"));
    state.record(0, Outcome::failure("1", FailureReason::NotFound));
    state.record(2, Outcome::success("3"));

    let report = state.into_report();

    assert_eq!(
        report.failure_log().as_deref(),
        Some("https://x/1\nhttps://x/4\n")
    );
}

#[test]
fn failure_log_is_absent_when_everything_succeeds() {
    let mut state = BatchState::new(index_targets(vec!["https://x/ok.txt".to_string()]));
    state.record(0, Outcome::success("ok.txt"));

    let report = state.into_report();

    assert!(!report.has_failures());
    assert_eq!(report.failure_log(), None);
}

#[test]
fn one_success_one_not_found() {
    let urls = vec![
        "https://x/ok.txt".to_string(),
        "https://x/missing.txt".to_string(),
    ];
    let mut state = BatchState::new(index_targets(urls));
    state.record(1, Outcome::failure("missing.txt", FailureReason::NotFound));
    state.record(0, Outcome::success("ok.txt"));

    let report = state.into_report();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.failure_log().as_deref(),
        Some("https://x/missing.txt\n")
    );
}

#[test]
fn duplicate_target_strings_are_each_logged() {
    let urls = vec!["https://x/a".to_string(), "https://x/a".to_string()];
    let mut state = BatchState::new(index_targets(urls));
    state.record(0, Outcome::failure("a", FailureReason::Timeout));
    state.record(1, Outcome::failure("a--1", FailureReason::Timeout));

    assert_eq!(
        state.into_report().failure_log().as_deref(),
        Some("https://x/a\nhttps://x/a\n")
    );
}

#[test]
fn failure_log_filename_is_stable() {
    assert_eq!(FAILURE_LOG_FILENAME, "failed_urls.txt");
}
