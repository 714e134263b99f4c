use std::time::Duration;

use super::test_utilities::*;
use rabbitpub::{ConnectStage, DeliveryMode, RabbitPubError, run};

#[test_log::test(tokio::test)]
async fn test_run_publishes_body() {
    let broker = FakeBroker::new();
    let report = run(&body_config("hello"), &broker).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.published, 1);
    assert_eq!(broker.published_bodies(), vec!["hello"]);

    let state = broker.state.lock();
    assert_eq!(state.open_attempts, 1);
    assert!(state.channel_closed);
    assert!(state.connection_closed);
    assert_eq!(state.published[0].routing_key, "tasks");
}

#[test_log::test(tokio::test)]
async fn test_run_publishes_input_file_lines() {
    let file = message_file("a\n\nb\n  \nc");
    let mut config = file_config(file.path().to_path_buf());
    config.delivery_mode = DeliveryMode::Persistent;

    let broker = FakeBroker::new();
    let report = run(&config, &broker).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(broker.published_bodies(), vec!["a", "b", "c"]);
    assert!(
        broker
            .state
            .lock()
            .published
            .iter()
            .all(|p| p.message.delivery_mode == DeliveryMode::Persistent)
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_input_file_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path().join("does-not-exist.txt"));

    let broker = FakeBroker::new();
    let err = run(&config, &broker).await.unwrap_err();

    assert!(matches!(err, RabbitPubError::InputFile { .. }));
    assert!(err.is_fatal());
    assert_eq!(broker.state.lock().open_attempts, 0);
}

#[test_log::test(tokio::test)]
async fn test_dial_failure_is_fatal() {
    let broker = FakeBroker::new().with_open_failure(OpenFailure::Dial);
    let err = run(&body_config("hello"), &broker).await.unwrap_err();

    assert!(matches!(
        err,
        RabbitPubError::Connection {
            stage: ConnectStage::Dial,
            ..
        }
    ));
    let state = broker.state.lock();
    assert_eq!(state.publish_attempts, 0);
    assert!(!state.channel_closed);
}

#[test_log::test(tokio::test)]
async fn test_channel_failure_releases_connection() {
    let broker = FakeBroker::new().with_open_failure(OpenFailure::Channel);
    let err = run(&body_config("hello"), &broker).await.unwrap_err();

    assert_eq!(err.to_string(), "failed to open channel: channel max reached");
    let state = broker.state.lock();
    assert!(state.connection_closed);
    assert_eq!(state.publish_attempts, 0);
}

#[test_log::test(tokio::test)]
async fn test_publish_failures_do_not_fail_run() {
    let file = message_file("one\ntwo\nthree\n");
    let broker = FakeBroker::new().failing_on([0]);

    let report = run(&file_config(file.path().to_path_buf()), &broker)
        .await
        .unwrap();

    assert_eq!(report.published, 2);
    assert_eq!(report.failures[0].index, 0);
    assert_eq!(broker.published_bodies(), vec!["two", "three"]);
    assert!(broker.state.lock().channel_closed);
}

#[test_log::test(tokio::test)]
async fn test_zero_timeout_reports_every_message_and_closes() {
    let file = message_file("one\ntwo\n");
    let mut config = file_config(file.path().to_path_buf());
    config.timeout = Duration::ZERO;

    let broker = FakeBroker::new();
    let report = run(&config, &broker).await.unwrap();

    assert_eq!(report.failed(), 2);
    assert!(broker.published_bodies().is_empty());
    assert!(broker.state.lock().channel_closed);
}

#[test_log::test(tokio::test)]
async fn test_blank_input_file_publishes_nothing() {
    let file = message_file("\n   \n\t\n");
    let broker = FakeBroker::new();

    let report = run(&file_config(file.path().to_path_buf()), &broker)
        .await
        .unwrap();

    assert_eq!(report.total, 0);
    assert_eq!(broker.state.lock().open_attempts, 1);
    assert!(broker.state.lock().channel_closed);
}
