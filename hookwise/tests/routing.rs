mod common;

use common::{event, harness, issues};
use hookwise::testing::RecordingHandler;
use serde_json::json;

#[tokio::test]
async fn every_matching_tier_runs_once() {
    let mut h = harness();
    let any = RecordingHandler::new();
    let name = RecordingHandler::new();
    let opened = RecordingHandler::new();
    let closed = RecordingHandler::new();
    h.builder
        .on("*", any.clone())
        .unwrap()
        .on("issues", name.clone())
        .unwrap()
        .on("issues.opened", opened.clone())
        .unwrap()
        .on("issues.closed", closed.clone())
        .unwrap();
    let app = h.builder.build();

    let report = app.receive(issues("opened", 1)).await.unwrap();

    assert_eq!(report.handled, 3);
    assert_eq!(any.count(), 1);
    assert_eq!(name.count(), 1);
    assert_eq!(opened.count(), 1);
    assert_eq!(closed.count(), 0);
}

#[tokio::test]
async fn only_the_matching_action_fires() {
    let mut h = harness();
    let opened = RecordingHandler::new();
    let closed = RecordingHandler::new();
    h.builder
        .on("issues.opened", opened.clone())
        .unwrap()
        .on("issues.closed", closed.clone())
        .unwrap();
    let app = h.builder.build();

    let report = app.receive(issues("opened", 1)).await.unwrap();

    assert_eq!(report.handled, 1);
    assert_eq!(opened.count(), 1);
    assert_eq!(closed.count(), 0);
}

#[tokio::test]
async fn pattern_list_behaves_like_separate_registrations() {
    let mut listed = harness();
    let list_recorder = RecordingHandler::new();
    listed
        .builder
        .on(["issues.opened", "pull_request"], list_recorder.clone())
        .unwrap();
    let listed = listed.builder.build();

    let mut separate = harness();
    let separate_recorder = RecordingHandler::new();
    separate
        .builder
        .on("issues.opened", separate_recorder.clone())
        .unwrap()
        .on("pull_request", separate_recorder.clone())
        .unwrap();
    let separate = separate.builder.build();

    let pull_request = event(
        "pull_request",
        json!({ "action": "synchronize", "installation": { "id": 1 } }),
    );
    for app in [&listed, &separate] {
        app.receive(issues("opened", 1)).await.unwrap();
        app.receive(issues("closed", 1)).await.unwrap();
        app.receive(pull_request.clone()).await.unwrap();
    }

    assert_eq!(list_recorder.count(), 2);
    assert_eq!(separate_recorder.count(), 2);
    let names: Vec<String> = list_recorder
        .calls()
        .iter()
        .map(|call| call.event.routing_key())
        .collect();
    assert_eq!(names, vec!["issues.opened", "pull_request.synchronize"]);
}

#[tokio::test]
async fn event_without_action_skips_action_patterns() {
    let mut h = harness();
    let push = RecordingHandler::new();
    let push_action = RecordingHandler::new();
    h.builder
        .on("push", push.clone())
        .unwrap()
        .on("push.created", push_action.clone())
        .unwrap();
    let app = h.builder.build();

    app.receive(event("push", json!({ "installation": { "id": 1 } })))
        .await
        .unwrap();

    assert_eq!(push.count(), 1);
    assert_eq!(push_action.count(), 0);
}

#[tokio::test]
async fn unmatched_event_is_not_an_error() {
    let mut h = harness();
    h.builder.on("issues", RecordingHandler::new()).unwrap();
    let app = h.builder.build();

    let report = app
        .receive(event("deployment", json!({ "action": "created" })))
        .await
        .unwrap();

    assert_eq!(report.handled, 0);
}

#[tokio::test]
async fn dotted_event_name_does_not_reach_action_handlers() {
    let mut h = harness();
    let opened = RecordingHandler::new();
    h.builder.on("issues.opened", opened.clone()).unwrap();
    let app = h.builder.build();

    let report = app
        .receive(event("issues.opened", json!({})))
        .await
        .unwrap();

    assert_eq!(report.handled, 0);
    assert_eq!(opened.count(), 0);
}
