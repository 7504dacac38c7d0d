//! Workflow engine tests: the router and the engine share one in-memory
//! store and bus, so events emitted by handlers are fed straight back in.

use std::time::Duration;

use serde_json::json;

use hookcut_api::handlers::NO_CLIPS_REASON;
use hookcut_firestore::ProjectStore;
use hookcut_integration_tests::*;
use hookcut_models::{ClipRenderStatus, Project, ProjectId, ProjectStatus, UserId};
use hookcut_queue::{EventEnvelope, WorkflowEvent};
use hookcut_remote::{RecordingProcessor, RecordingRenderer};
use hookcut_worker::{
    AdmissionOutcome, FailureOutcome, GuardianOutcome, NotifyOutcome, RenderOutcome,
    RunDisposition, WorkflowOutcome,
};
use hookcut_worker::workflow::guardian::TIMEOUT_REASON;

fn process_video(project: &Project) -> EventEnvelope {
    EventEnvelope::new(WorkflowEvent::ProcessVideo {
        project_id: project.id.clone(),
        user_id: project.user_id.clone(),
    })
}

fn guardian_check(project: &Project) -> EventEnvelope {
    EventEnvelope::new(WorkflowEvent::GuardianCheck {
        project_id: project.id.clone(),
    })
}

async fn queued_project(app: &TestApp, clip_count: u32) -> Project {
    let project = new_project(USER, clip_count);
    app.store.create_project(&project).await.unwrap();
    project
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_admission_caps_clips_to_credits() {
    let app = TestApp::new().await;
    app.store.insert_user(user(USER, 3)).await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = queued_project(&app, 5).await;

    let disposition = worker.engine.handle(&process_video(&project)).await;
    assert_eq!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Admission(AdmissionOutcome::Dispatched {
            clip_count: 1
        }))
    );

    let calls = worker.processor.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ids, format!("u1/{}", project.id));
    assert_eq!(calls[0].clip_count, 1);
    assert_eq!(calls[0].source_key, "uploads/u1/episode.mp4");
    assert_eq!(calls[0].webhook_url, "https://api.hookcut.test/webhooks/modal");

    assert_eq!(app.project(&project).await.status, ProjectStatus::Processing);
    // Admission never charges; clips are paid for when they arrive.
    assert_eq!(app.user(USER).await.credits, 3);
}

#[tokio::test]
async fn test_admission_without_credits() {
    let app = TestApp::new().await;
    app.store.insert_user(user(USER, 1)).await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = queued_project(&app, 3).await;

    let disposition = worker.engine.handle(&process_video(&project)).await;
    assert_eq!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Admission(AdmissionOutcome::NoCredits))
    );
    assert_eq!(app.project(&project).await.status, ProjectStatus::NoCredits);
    assert!(worker.processor.calls().await.is_empty());
    assert!(app.bus.scheduled().await.is_empty());
}

#[tokio::test]
async fn test_admission_schedules_guardian() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = queued_project(&app, 2).await;

    worker.engine.handle(&process_video(&project)).await;

    let scheduled = app.bus.take_scheduled().await;
    assert_eq!(scheduled.len(), 1);
    let (envelope, delay) = &scheduled[0];
    assert_eq!(*delay, Duration::from_secs(45 * 60));
    assert_eq!(
        envelope.event,
        WorkflowEvent::GuardianCheck {
            project_id: project.id.clone()
        }
    );
}

#[tokio::test]
async fn test_duplicate_delivery_does_not_dispatch_twice() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = queued_project(&app, 2).await;

    worker.engine.handle(&process_video(&project)).await;
    // A second run for the same project finds it already admitted.
    let again = worker.engine.handle(&process_video(&project)).await;

    assert_eq!(
        again,
        RunDisposition::Completed(WorkflowOutcome::Admission(AdmissionOutcome::Skipped(
            ProjectStatus::Processing
        )))
    );
    assert_eq!(worker.processor.calls().await.len(), 1);
}

#[tokio::test]
async fn test_dispatch_retry_replays_completed_steps() {
    let app = TestApp::new().await;
    let worker = TestWorker::with_services(
        app.store.clone(),
        app.bus.clone(),
        RecordingProcessor::failing(1),
        RecordingRenderer::new(),
    );
    let project = queued_project(&app, 2).await;

    let first = worker.engine.handle(&process_video(&project)).await;
    assert!(matches!(first, RunDisposition::Retrying { attempt: 1, .. }));
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processing);

    let (retry, _) = app.bus.take_scheduled().await.remove(0);
    assert_eq!(retry.attempt, 1);

    // The journaled admission is replayed even though the project is no
    // longer queued.
    let second = worker.engine.handle(&retry).await;
    assert_eq!(
        second,
        RunDisposition::Completed(WorkflowOutcome::Admission(AdmissionOutcome::Dispatched {
            clip_count: 2
        }))
    );
    assert_eq!(worker.processor.calls().await.len(), 1);
}

// =============================================================================
// Guardian and failure
// =============================================================================

#[tokio::test]
async fn test_guardian_times_out_stuck_project() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    let disposition = worker.engine.handle(&guardian_check(&project)).await;
    assert_eq!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Guardian(GuardianOutcome::TimedOut))
    );

    let stored = app.project(&project).await;
    assert_eq!(stored.status, ProjectStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some(TIMEOUT_REASON));
}

#[tokio::test]
async fn test_guardian_leaves_settled_project_alone() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = seed_project(&app.store, ProjectStatus::Processed).await;

    let disposition = worker.engine.handle(&guardian_check(&project)).await;
    assert_eq!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Guardian(GuardianOutcome::Settled {
            status: ProjectStatus::Processed
        }))
    );
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processed);
}

#[tokio::test]
async fn test_no_clips_delivery_fails_project() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = seed_project(&app.store, ProjectStatus::Processing).await;

    app.send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 0)))
        .await;
    let published = app.bus.take_published().await;
    assert_eq!(published.len(), 1);

    let disposition = worker.engine.handle(&published[0]).await;
    assert_eq!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Failure(FailureOutcome::Recorded))
    );
    let stored = app.project(&project).await;
    assert_eq!(stored.status, ProjectStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some(NO_CLIPS_REASON));
}

#[tokio::test]
async fn test_failure_for_deleted_project_is_a_no_op() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());

    let envelope = EventEnvelope::new(WorkflowEvent::ProjectFailed {
        project_id: ProjectId::from("gone"),
        reason: "timed out".to_string(),
    });
    assert_eq!(
        worker.engine.handle(&envelope).await,
        RunDisposition::Completed(WorkflowOutcome::Failure(FailureOutcome::ProjectMissing))
    );
}

// =============================================================================
// Notification and render
// =============================================================================

#[tokio::test]
async fn test_notification_skips_missing_owner() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());
    let project = seed_project(&app.store, ProjectStatus::Processed).await;

    let envelope = EventEnvelope::new(WorkflowEvent::ProjectProcessed {
        project_id: project.id.clone(),
        user_id: UserId::from("nobody"),
    });
    let disposition = worker.engine.handle(&envelope).await;
    assert!(matches!(
        disposition,
        RunDisposition::Completed(WorkflowOutcome::Notify(NotifyOutcome::Skipped { .. }))
    ));
    assert!(worker.mailer.calls().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_render_marks_clip_failed() {
    let app = TestApp::new().await;
    let worker = TestWorker::with_services(
        app.store.clone(),
        app.bus.clone(),
        RecordingProcessor::new(),
        RecordingRenderer::failing(1),
    );
    let project = seed_project(&app.store, ProjectStatus::Processed).await;
    let clip = seed_clip(&app.store, &project).await;

    app.send(post_json(
        &format!("/api/clips/{}/edit", clip.id),
        Some(USER),
        &json!({"transcript": [], "hook": "Edited"}),
    ))
    .await;
    let envelope = app.bus.take_published().await.remove(0);

    let last_attempt = envelope.next_attempt().next_attempt();
    let disposition = worker.engine.handle(&last_attempt).await;
    assert!(matches!(disposition, RunDisposition::Failed { .. }));

    let stored = app.store.get_clip(&clip.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ClipRenderStatus::Failed);
    assert!(worker.renderer.calls().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_dispatch_fails_project_in_flight() {
    let app = TestApp::new().await;
    let worker = TestWorker::with_services(
        app.store.clone(),
        app.bus.clone(),
        RecordingProcessor::failing(1),
        RecordingRenderer::new(),
    );
    let project = queued_project(&app, 2).await;

    let last_attempt = process_video(&project).next_attempt().next_attempt();
    let disposition = worker.engine.handle(&last_attempt).await;
    assert!(matches!(disposition, RunDisposition::Failed { .. }));

    let stored = app.project(&project).await;
    assert_eq!(stored.status, ProjectStatus::Failed);
    assert!(stored
        .failure_reason
        .as_deref()
        .is_some_and(|r| r.starts_with("processing failed")));
}

#[tokio::test]
async fn test_exhausted_dispatch_keeps_processed_project() {
    let app = TestApp::new().await;
    let worker = TestWorker::with_services(
        app.store.clone(),
        app.bus.clone(),
        RecordingProcessor::failing(3),
        RecordingRenderer::new(),
    );
    let project = queued_project(&app, 2).await;

    let first = worker.engine.handle(&process_video(&project)).await;
    assert!(matches!(first, RunDisposition::Retrying { attempt: 1, .. }));
    let (retry, _) = app.bus.take_scheduled().await.remove(0);

    // Clips arrive before the dispatch retries run out.
    app.send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 2)))
        .await;
    assert_eq!(app.project(&project).await.status, ProjectStatus::Processed);

    let disposition = worker.engine.handle(&retry.next_attempt()).await;
    assert!(matches!(disposition, RunDisposition::Failed { .. }));

    let stored = app.project(&project).await;
    assert_eq!(stored.status, ProjectStatus::Processed);
    assert!(stored.failure_reason.is_none());
    assert_eq!(app.store.clip_count(&project.id).await, 2);
}

#[tokio::test]
async fn test_end_to_end_project_lifecycle() {
    let app = TestApp::new().await;
    let worker = TestWorker::new(app.store.clone(), app.bus.clone());

    // Create.
    let created = app
        .send(post_json(
            "/api/projects",
            Some(USER),
            &json!({"source": "UPLOADED_FILE", "s3Key": "uploads/u1/abc-ep.mp4", "clipCount": 2}),
        ))
        .await;
    let project_id = ProjectId::from(created.body["id"].as_str().unwrap());

    // Admit and dispatch.
    let start = app.bus.take_published().await.remove(0);
    assert!(matches!(
        worker.engine.handle(&start).await,
        RunDisposition::Completed(WorkflowOutcome::Admission(AdmissionOutcome::Dispatched {
            clip_count: 2
        }))
    ));
    let (guardian, _) = app.bus.take_scheduled().await.remove(0);

    // Clips arrive.
    let project = app.store.get_project(&project_id).await.unwrap().unwrap();
    let ack = app
        .send(webhook("/webhooks/modal", MODAL_SECRET, &ready_payload(&project, 2)))
        .await;
    assert_eq!(ack.body["action"], "clips_created");
    assert_eq!(app.user(USER).await.credits, 6);

    // Owner is told.
    let processed = app.bus.take_published().await.remove(0);
    assert_eq!(
        worker.engine.handle(&processed).await,
        RunDisposition::Completed(WorkflowOutcome::Notify(NotifyOutcome::Sent {
            to: "u1@example.com".to_string(),
            clips: 2,
        }))
    );
    let mail = worker.mailer.calls().await.remove(0);
    assert_eq!(mail.subject, "Your clips are ready");
    assert!(mail.text.contains("2 clips are ready"));
    assert!(mail
        .text
        .contains(&format!("https://api.hookcut.test/projects/{}", project_id)));

    // The guardian fires late and finds nothing to do.
    assert!(matches!(
        worker.engine.handle(&guardian).await,
        RunDisposition::Completed(WorkflowOutcome::Guardian(GuardianOutcome::Settled { .. }))
    ));

    // Edit one clip and render it.
    let clip = app.store.list_clips(&project_id).await.unwrap().remove(0);
    let saved = app
        .send(post_json(
            &format!("/api/clips/{}/edit", clip.id),
            Some(USER),
            &json!({"transcript": clip.transcript, "hook": "Sharper hook"}),
        ))
        .await;
    assert_eq!(saved.body["renderQueued"], true);

    let render = app.bus.take_published().await.remove(0);
    assert_eq!(
        worker.engine.handle(&render).await,
        RunDisposition::Completed(WorkflowOutcome::Render(RenderOutcome::Requested))
    );
    let rendered = worker.renderer.calls().await.remove(0);
    assert_eq!(rendered.clip_id, clip.id);
    assert_eq!(rendered.hook, "Sharper hook");

    app.send(webhook(
        "/webhooks/video-generated",
        VIDEO_SECRET,
        &json!({"success": true, "clipId": clip.id, "videoUrl": "https://cdn.example.com/out.mp4"}),
    ))
    .await;
    let status = app
        .send(get(&format!("/api/clips/{}/status", clip.id), Some(USER)))
        .await;
    assert_eq!(status.body["status"], "rendered");
    assert_eq!(status.body["videoUrl"], "https://cdn.example.com/out.mp4");
}
