//! API router tests over in-memory backends.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use hookcut_api::handlers::{NO_CLIPS_REASON, START_FAILED_REASON};
use hookcut_api::webhook_auth::{sign_body, SIGNATURE_HEADER};
use hookcut_api::ApiConfig;
use hookcut_firestore::ProjectStore;
use hookcut_integration_tests::*;
use hookcut_models::{ClipRenderStatus, ProjectStatus};
use hookcut_queue::WorkflowEvent;

// =============================================================================
// Health and middleware
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;
    let response = app.send(get("/health", None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["X-Content-Type-Options"], "nosniff");
    assert_eq!(response.headers["X-Frame-Options"], "DENY");
    assert!(response.headers.contains_key("X-Request-ID"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/healthz")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.headers["X-Request-ID"], "req-42");
}

#[tokio::test]
async fn test_readiness_with_memory_backends() {
    let app = TestApp::new().await;
    let response = app.send(get("/ready", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
    assert_eq!(response.body["redis"]["status"], "skipped");
    assert_eq!(response.body["store"]["status"], "ok");
    assert_eq!(response.body["objects"]["status"], "ok");
}

#[tokio::test]
async fn test_metrics_route_absent_without_recorder() {
    let app = TestApp::new().await;
    let response = app.send(get("/metrics", None)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Processing webhook
// =============================================================================

#[tokio::test]
async fn test_processing_webhook_rejects_bad_secret() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;
    let payload = ready_payload(&project, 2);

    let wrong = app.send(webhook("/webhooks/modal", "not-the-secret", &payload)).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let missing = app
        .send(post_json("/webhooks/modal", None, &payload))
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.store.clip_count(&project.id).await, 0);
}

#[tokio::test]
async fn test_processing_webhook_fails_closed_without_secret() {
    let app = TestApp::with_config(ApiConfig {
        processing_webhook_secret: None,
        ..test_config()
    })
    .await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let response = app
        .send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 1)))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["code"], "not_configured");
    assert_eq!(app.store.clip_count(&project.id).await, 0);
}

#[tokio::test]
async fn test_processing_webhook_accepts_hmac_signature() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;
    let body = ready_payload(&project, 1).to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/modal")
        .header(SIGNATURE_HEADER, sign_body(MODAL_SECRET, body.as_bytes()).unwrap())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["action"], "clips_created");
}

#[tokio::test]
async fn test_ready_for_review_is_idempotent() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;
    let payload = ready_payload(&project, 2);

    let first = app.send(webhook("/webhooks/modal", MODAL_SECRET, &payload)).await;
    assert_eq!(first.status, StatusCode::ACCEPTED);
    assert_eq!(first.body["action"], "clips_created");
    assert_eq!(first.body["clips"], 2);

    let second = app.send(webhook("/webhooks/modal", MODAL_SECRET, &payload)).await;
    assert_eq!(second.status, StatusCode::ACCEPTED);
    assert_eq!(second.body["received"], true);
    assert_eq!(second.body["action"], "already_processed");

    assert_eq!(app.store.clip_count(&project.id).await, 2);
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processed);
    // Two clips at two credits each, charged once.
    assert_eq!(app.user(USER).await.credits, 6);

    let processed: Vec<_> = app
        .bus
        .published_events()
        .await
        .into_iter()
        .filter(|e| matches!(e, WorkflowEvent::ProjectProcessed { .. }))
        .collect();
    assert_eq!(processed.len(), 1);
}

#[tokio::test]
async fn test_ready_for_review_stores_clip_fields() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    app.send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 2)))
        .await;

    let clips = app.store.list_clips(&project.id).await.unwrap();
    assert_eq!(clips.len(), 2);
    assert_eq!(clips[0].hook, "Hook number 0");
    assert_eq!(clips[0].transcript.len(), 3);
    assert_eq!(clips[0].start, 0.0);
    assert_eq!(clips[1].start, 30.0);
    assert_eq!(clips[0].status, ClipRenderStatus::Unrendered);
    assert_eq!(
        clips[0].raw_clip_url.as_deref(),
        Some("https://cdn.example.com/raw/clip-0.mp4")
    );
}

#[tokio::test]
async fn test_ready_for_review_without_clips_is_a_failure() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let response = app
        .send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 0)))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["action"], "failure_recorded");

    assert_eq!(
        app.bus.published_events().await,
        vec![WorkflowEvent::ProjectFailed {
            project_id: project.id.clone(),
            reason: NO_CLIPS_REASON.to_string(),
        }]
    );
    assert_eq!(app.store.clip_count(&project.id).await, 0);
}

#[tokio::test]
async fn test_empty_delivery_for_foreign_project_is_not_found() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let mut payload = ready_payload(&project, 0);
    payload["user_id"] = json!(OTHER_USER);

    let response = app.send(webhook("/webhooks/modal", MODAL_SECRET, &payload)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(app.bus.published().await.is_empty());
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processing);
}

#[tokio::test]
async fn test_invalid_clip_rejects_whole_delivery() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let mut payload = ready_payload(&project, 2);
    payload["clips"][1]["start"] = json!(40.0);
    payload["clips"][1]["end"] = json!(40.0);

    let response = app.send(webhook("/webhooks/modal", MODAL_SECRET, &payload)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "validation_error");
    assert!(response.body["errors"]["clips[1]"].is_array());

    assert_eq!(app.store.clip_count(&project.id).await, 0);
    assert_eq!(app.user(USER).await.credits, 10);
}

#[tokio::test]
async fn test_processing_webhook_requires_ids() {
    let app = TestApp::new().await;

    let missing = app
        .send(webhook("/webhooks/modal", MODAL_SECRET, &json!({"status": "completed"})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let empty = app
        .send(webhook(
            "/webhooks/modal",
            MODAL_SECRET,
            &json!({"user_id": "", "project_id": "p1", "status": "completed"}),
        ))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert!(app.bus.published().await.is_empty());
}

#[tokio::test]
async fn test_failed_status_records_reason() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let response = app
        .send(webhook(
            "/webhooks/modal",
            MODAL_SECRET,
            &json!({
                "user_id": USER,
                "project_id": project.id,
                "status": "failed",
                "error": "audio track missing",
            }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let stored = app.project(&project).await;
    assert_eq!(stored.status, ProjectStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("audio track missing"));
    assert!(matches!(
        app.bus.published_events().await.as_slice(),
        [WorkflowEvent::ProjectFailed { reason, .. }] if reason == "audio track missing"
    ));
}

#[tokio::test]
async fn test_failed_status_for_foreign_project_is_not_found() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let response = app
        .send(webhook(
            "/webhooks/modal",
            MODAL_SECRET,
            &json!({"user_id": OTHER_USER, "project_id": project.id, "status": "failed"}),
        ))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processing);
}

#[tokio::test]
async fn test_completed_and_unknown_statuses() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let completed = app
        .send(webhook(
            "/webhooks/modal",
            MODAL_SECRET,
            &json!({"user_id": USER, "project_id": project.id, "status": "completed"}),
        ))
        .await;
    assert_eq!(completed.body["action"], "notified_processed");

    let unknown = app
        .send(webhook(
            "/webhooks/modal",
            MODAL_SECRET,
            &json!({"user_id": USER, "project_id": project.id, "status": "transcribing"}),
        ))
        .await;
    assert_eq!(unknown.status, StatusCode::ACCEPTED);
    assert_eq!(unknown.body["action"], "ignored");

    assert_eq!(app.bus.published().await.len(), 1);
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processing);
}

// =============================================================================
// Render webhook and clip status
// =============================================================================

#[tokio::test]
async fn test_render_webhook_success_sets_video_url() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;

    let response = app
        .send(webhook(
            "/webhooks/video-generated",
            VIDEO_SECRET,
            &json!({
                "success": true,
                "clipId": clip.id,
                "videoUrl": "https://cdn.example.com/rendered/c1.mp4",
            }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "rendered");

    let status = app
        .send(get(&format!("/api/clips/{}/status", clip.id), Some(USER)))
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(
        status.body,
        json!({"status": "rendered", "videoUrl": "https://cdn.example.com/rendered/c1.mp4"})
    );
}

#[tokio::test]
async fn test_render_webhook_failure() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;

    app.send(webhook(
        "/webhooks/video-generated",
        VIDEO_SECRET,
        &json!({"success": false, "clipId": clip.id, "videoUrl": "https://ignored"}),
    ))
    .await;

    let status = app
        .send(get(&format!("/api/clips/{}/status", clip.id), Some(USER)))
        .await;
    assert_eq!(status.body, json!({"status": "failed"}));
}

#[tokio::test]
async fn test_render_webhook_auth_and_unknown_clip() {
    let app = TestApp::new().await;
    let body = json!({"success": true, "clipId": "missing"});

    // The processing secret is not valid here.
    let wrong = app
        .send(webhook("/webhooks/video-generated", MODAL_SECRET, &body))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .send(webhook("/webhooks/video-generated", VIDEO_SECRET, &body))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clip_status_is_ownership_scoped() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;
    let uri = format!("/api/clips/{}/status", clip.id);

    assert_eq!(app.send(get(&uri, None)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(get(&uri, Some(OTHER_USER))).await.status, StatusCode::NOT_FOUND);
    let own = app.send(get(&uri, Some(USER))).await;
    assert_eq!(own.body, json!({"status": "unrendered"}));
}

// =============================================================================
// Clip editing
// =============================================================================

fn edit_body(hook: &str) -> serde_json::Value {
    json!({
        "transcript": [
            {"word": "this", "start": 0.0, "end": 0.4, "id": "w-1"},
            {"word": "changed", "start": 0.4, "end": 0.9, "id": "w-2"},
        ],
        "hook": hook,
        "hookStyle": {"fontSize": 90.0, "position": {"x": 50.0, "y": 20.0}},
        "captionStyleId": 3,
    })
}

#[tokio::test]
async fn test_get_clip_edit_bootstrap() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;

    let response = app
        .send(get(&format!("/api/clips/{}/edit", clip.id), Some(USER)))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["hook"], "Hook number 0");
    assert_eq!(response.body["version"], 0);
    // Project style is the fallback for clips without their own.
    assert_eq!(response.body["captionStyleId"], 3);
    assert_eq!(response.body["hookStyle"]["position"]["y"], 22.0);
}

#[tokio::test]
async fn test_save_clip_edit_queues_render() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;

    let response = app
        .send(post_json(
            &format!("/api/clips/{}/edit", clip.id),
            Some(USER),
            &edit_body("New hook"),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["renderQueued"], true);
    assert_eq!(response.body["clip"]["status"], "processing");
    assert_eq!(response.body["clip"]["version"], 1);

    let stored = app.store.get_clip(&clip.id).await.unwrap().unwrap();
    assert_eq!(stored.hook, "New hook");
    assert!(stored.transcript.iter().all(|w| w.id.is_none()));

    let events = app.bus.published_events().await;
    let [WorkflowEvent::GenerateVideo(payload)] = events.as_slice() else {
        panic!("expected one render event, got {:?}", events);
    };
    assert_eq!(payload.clip_id, clip.id);
    assert_eq!(payload.hook, "New hook");
    assert_eq!(payload.hook_style.font_size, 90.0);
    assert_eq!(payload.source_video_url, "https://cdn.example.com/raw/clip-0.mp4");
    assert_eq!(payload.original_caption_style, Some(3));
}

#[tokio::test]
async fn test_save_clip_edit_version_conflict() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;
    let uri = format!("/api/clips/{}/edit", clip.id);

    let mut body = edit_body("First tab");
    body["expectedVersion"] = json!(0);
    assert_eq!(app.send(post_json(&uri, Some(USER), &body)).await.status, StatusCode::OK);

    body["hook"] = json!("Second tab");
    let stale = app.send(post_json(&uri, Some(USER), &body)).await;
    assert_eq!(stale.status, StatusCode::CONFLICT);

    let stored = app.store.get_clip(&clip.id).await.unwrap().unwrap();
    assert_eq!(stored.hook, "First tab");
    assert_eq!(app.bus.published().await.len(), 1);
}

#[tokio::test]
async fn test_save_clip_edit_rejections() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;
    let uri = format!("/api/clips/{}/edit", clip.id);

    let foreign = app
        .send(post_json(&uri, Some(OTHER_USER), &edit_body("x")))
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let mut reversed = edit_body("x");
    reversed["transcript"][0]["start"] = json!(2.0);
    let invalid = app.send(post_json(&uri, Some(USER), &reversed)).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let mut reserved = edit_body("x");
    reserved["captionStyleId"] = json!(99);
    let coming_soon = app.send(post_json(&uri, Some(USER), &reserved)).await;
    assert_eq!(coming_soon.status, StatusCode::BAD_REQUEST);

    assert!(app.bus.published().await.is_empty());
    let stored = app.store.get_clip(&clip.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 0);
}

// =============================================================================
// Projects
// =============================================================================

#[tokio::test]
async fn test_upload_url_is_scoped_to_user() {
    let app = TestApp::new().await;
    let response = app
        .send(post_json(
            "/api/projects/upload-url",
            Some(USER),
            &json!({"filename": "My Episode #12.mp4", "contentType": "video/mp4"}),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let key = response.body["key"].as_str().unwrap();
    assert!(key.starts_with("uploads/u1/"), "{}", key);

    let not_video = app
        .send(post_json(
            "/api/projects/upload-url",
            Some(USER),
            &json!({"filename": "notes.txt", "contentType": "text/plain"}),
        ))
        .await;
    assert_eq!(not_video.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_project_starts_workflow() {
    let app = TestApp::new().await;
    let response = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({
                "source": "UPLOADED_FILE",
                "s3Key": "uploads/u1/abc-episode.mp4",
                "clipCount": 5,
                "captionStyle": 3,
            }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "queued");
    assert_eq!(response.body["clipCount"], 5);
    assert_eq!(response.body["captionStyle"], 3);

    let project_id = response.body["id"].as_str().unwrap().to_string();
    assert_eq!(
        app.bus.published_events().await,
        vec![WorkflowEvent::ProcessVideo {
            project_id: project_id.as_str().into(),
            user_id: USER.into(),
        }]
    );
}

#[tokio::test]
async fn test_create_project_fails_when_workflow_cannot_start() {
    let app = TestApp::new().await;
    app.bus.set_unavailable(true);

    let response = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({
                "source": "UPLOADED_FILE",
                "s3Key": "uploads/u1/abc-episode.mp4",
                "clipCount": 3,
            }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    // The project is settled as failed rather than left queued with no run.
    let projects = app.store.projects().await;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].status, ProjectStatus::Failed);
    assert_eq!(
        projects[0].failure_reason.as_deref(),
        Some(START_FAILED_REASON)
    );
    assert!(app.bus.published().await.is_empty());
}

#[tokio::test]
async fn test_create_project_rejections() {
    let app = TestApp::new().await;

    let foreign_key = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({"source": "UPLOADED_FILE", "s3Key": "uploads/u2/x.mp4", "clipCount": 3}),
        ))
        .await;
    assert_eq!(foreign_key.status, StatusCode::BAD_REQUEST);

    let internal_url = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({"source": "VIDEO_URL", "videoUrl": "http://169.254.169.254/latest", "clipCount": 3}),
        ))
        .await;
    assert_eq!(internal_url.status, StatusCode::BAD_REQUEST);

    let too_many = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({"source": "VIDEO_URL", "videoUrl": "https://videos.example.com/ep.mp4", "clipCount": 21}),
        ))
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .send(post_json(
            "/api/projects",
            None,
            &json!({"source": "VIDEO_URL", "videoUrl": "https://videos.example.com/ep.mp4", "clipCount": 3}),
        ))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    assert!(app.bus.published().await.is_empty());
}

#[tokio::test]
async fn test_get_and_delete_project() {
    let app = TestApp::new().await;
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    seed_clip(&app.store, &project).await;

    let rendered = format!("{}clips/c1.mp4", project.storage_prefix());
    app.objects.put(rendered.clone()).await;
    app.objects.put(project.s3_key.clone().unwrap()).await;
    app.objects.put("uploads/u1/other.mp4").await;

    let uri = format!("/api/projects/{}", project.id);
    let detail = app.send(get(&uri, Some(USER))).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["project"]["id"], json!(project.id));
    assert_eq!(detail.body["clips"].as_array().unwrap().len(), 1);

    assert_eq!(app.send(get(&uri, Some(OTHER_USER))).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.send(delete(&uri, Some(OTHER_USER))).await.status, StatusCode::NOT_FOUND);

    let deleted = app.send(delete(&uri, Some(USER))).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!app.objects.contains(&rendered).await);
    assert!(!app.objects.contains(project.s3_key.as_deref().unwrap()).await);
    assert!(app.objects.contains("uploads/u1/other.mp4").await);
    assert_eq!(app.store.clip_count(&project.id).await, 0);
    assert_eq!(app.send(get(&uri, Some(USER))).await.status, StatusCode::NOT_FOUND);
}
