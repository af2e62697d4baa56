//! Unit tests for retry classification and the backoff schedule.

use std::time::Duration;

use turnq::error::RequestError;
use turnq::retry::{Classify, ErrorClass, RetryPolicy};

#[test]
fn backoff_doubles_per_retry() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(0), Duration::from_secs(2));
    assert_eq!(policy.delay_for(1), Duration::from_secs(4));
    assert_eq!(policy.delay_for(2), Duration::from_secs(8));
}

#[test]
fn client_class_is_never_retried() {
    let policy = RetryPolicy::default();
    assert!(!policy.should_retry(ErrorClass::Client { code: 400 }));
    assert!(!policy.should_retry(ErrorClass::Client { code: 429 }));
    assert!(policy.should_retry(ErrorClass::Transient));
}

#[test]
fn unknown_class_follows_the_knob() {
    let mut policy = RetryPolicy::default();
    assert!(policy.should_retry(ErrorClass::Unknown));
    policy.retry_unknown = false;
    assert!(!policy.should_retry(ErrorClass::Unknown));
}

#[test]
fn status_codes_split_at_500() {
    let bad_request = RequestError::Status {
        code: 400,
        message: "nope".to_string(),
    };
    assert_eq!(bad_request.class(), ErrorClass::Client { code: 400 });

    let overloaded = RequestError::Status {
        code: 503,
        message: "try later".to_string(),
    };
    assert_eq!(overloaded.class(), ErrorClass::Transient);
}

#[test]
fn transport_and_unknown_classification() {
    let reset = RequestError::Transport("connection reset by peer".to_string());
    assert_eq!(reset.class(), ErrorClass::Transient);

    let mystery = RequestError::Unknown("something odd".to_string());
    assert_eq!(mystery.class(), ErrorClass::Unknown);
}
