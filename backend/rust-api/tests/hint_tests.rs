use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn hints_are_locked_without_an_anchor() {
    let (app, _handles) = common::create_test_app().await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;

    // session not started: everything locked, no reachable unlock time
    let (status, body) =
        common::get_json(&app, &format!("/api/v1/sessions/{}/hints", session_id)).await;
    assert_eq!(status, StatusCode::OK);

    let hints = body["hints"].as_array().unwrap();
    assert_eq!(hints.len(), 2);
    for hint in hints {
        assert_eq!(hint["locked"], true);
        assert!(hint["unlock_at"].is_null());
        assert!(hint.get("content").is_none());
    }
    assert_eq!(body["assist"]["unlocked"], false);
    assert!(body["assist"]["unlock_at"].is_null());
}

#[tokio::test]
async fn hints_stay_locked_through_the_schedule_after_start() {
    let (app, _handles) = common::create_test_app().await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;
    common::start_session(&app, &session_id).await;

    let (_, body) =
        common::get_json(&app, &format!("/api/v1/sessions/{}/hints", session_id)).await;

    let hints = body["hints"].as_array().unwrap();
    // first hint unlocks one interval after the anchor, second one later
    assert_eq!(hints[0]["locked"], true);
    assert!(hints[0]["unlock_at"].is_string());
    let first_countdown = hints[0]["unlocks_in_seconds"].as_u64().unwrap();
    let second_countdown = hints[1]["unlocks_in_seconds"].as_u64().unwrap();
    assert!(first_countdown <= 300);
    assert!(first_countdown > 290);
    assert!(second_countdown > first_countdown);

    // ordinals and kinds come back in problem order
    assert_eq!(hints[0]["ordinal"], 0);
    assert_eq!(hints[1]["ordinal"], 1);
    assert_eq!(hints[1]["kind"], "video");
}

#[tokio::test]
async fn zero_interval_unlocks_hint_content_immediately() {
    let (app, _handles) = common::create_test_app_with(|config| {
        config.hint_unlock_interval_seconds = 0;
    })
    .await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;
    common::start_session(&app, &session_id).await;

    let (_, body) =
        common::get_json(&app, &format!("/api/v1/sessions/{}/hints", session_id)).await;

    let hints = body["hints"].as_array().unwrap();
    assert_eq!(hints[0]["locked"], false);
    assert_eq!(hints[0]["content"], "Split the input on the comma.");
    assert_eq!(
        hints[1]["content"],
        "https://videos.test/two-sum-walkthrough"
    );
    // assist still gated by its own delay
    assert_eq!(body["assist"]["unlocked"], false);
}

#[tokio::test]
async fn assist_is_forbidden_while_gated() {
    let (app, _handles) = common::create_test_app().await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;
    common::start_session(&app, &session_id).await;

    let (status, _) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{}/assist", session_id),
        json!({ "mode": "guide" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assist_before_start_is_a_conflict() {
    let (app, _handles) = common::create_test_app().await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;

    let (status, _) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{}/assist", session_id),
        json!({ "mode": "guide" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn assist_flows_through_once_the_gate_opens() {
    let (app, _handles) = common::create_test_app_with(|config| {
        config.assist_unlock_delay_seconds = 0;
    })
    .await;
    let session_id = common::create_session(&app, "two-sum", "practice").await;
    common::start_session(&app, &session_id).await;

    let (status, body) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{}/assist", session_id),
        json!({ "mode": "solution", "source": "print(1)" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Consider the edge cases first.");
}
