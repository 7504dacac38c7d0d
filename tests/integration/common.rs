//! Shared fixtures for the integration suite.
//!
//! The API router and the workflow engine run against the in-memory store,
//! object store and event bus, so nothing here needs external services.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use hookcut_api::auth::SessionClaims;
use hookcut_api::{create_router, ApiConfig, AppState};
use hookcut_firestore::{MemoryStore, ProjectStore};
use hookcut_models::{
    CaptionStyle, Clip, IncomingClip, Project, ProjectSource, ProjectStatus, TranscriptWord, User,
    UserId,
};
use hookcut_queue::MemoryEventBus;
use hookcut_remote::{RecordingMailer, RecordingProcessor, RecordingRenderer};
use hookcut_storage::MemoryObjectStore;
use hookcut_worker::{WorkerConfig, WorkflowContext, WorkflowEngine};

pub const SESSION_SECRET: &str = "test-session-secret";
pub const MODAL_SECRET: &str = "modal-secret";
pub const VIDEO_SECRET: &str = "video-secret";

/// Owner of the seeded fixtures.
pub const USER: &str = "u1";
pub const OTHER_USER: &str = "u2";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        session_secret: SESSION_SECRET.to_string(),
        processing_webhook_secret: Some(MODAL_SECRET.to_string()),
        render_webhook_secret: Some(VIDEO_SECRET.to_string()),
        ..ApiConfig::default()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Router over in-memory backends, with one user holding 10 credits.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub bus: Arc<MemoryEventBus>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let bus = Arc::new(MemoryEventBus::new());
        store.insert_user(user(USER, 10)).await;
        store.insert_user(user(OTHER_USER, 10)).await;

        let state = AppState::new(config, store.clone(), objects.clone(), bus.clone());
        Self {
            router: create_router(state, None),
            store,
            objects,
            bus,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn user(&self, id: &str) -> User {
        self.store
            .get_user(&UserId::from(id))
            .await
            .unwrap()
            .expect("seeded user")
    }

    pub async fn project(&self, project: &Project) -> Project {
        self.store
            .get_project(&project.id)
            .await
            .unwrap()
            .expect("project exists")
    }
}

pub fn user(id: &str, credits: u32) -> User {
    User {
        id: UserId::from(id),
        email: format!("{}@example.com", id),
        name: Some("Host".to_string()),
        credits,
    }
}

pub fn session_token(user_id: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        name: None,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session_token(user)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, user, None)
}

pub fn delete(uri: &str, user: Option<&str>) -> Request<Body> {
    request(Method::DELETE, uri, user, None)
}

pub fn post_json(uri: &str, user: Option<&str>, body: &Value) -> Request<Body> {
    request(Method::POST, uri, user, Some(body))
}

/// Webhook delivery authenticated with `Authorization: Bearer <secret>`.
pub fn webhook(uri: &str, secret: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", secret))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn new_project(user_id: &str, clip_count: u32) -> Project {
    Project::new(
        UserId::from(user_id),
        ProjectSource::UploadedFile,
        Some(format!("uploads/{}/episode.mp4", user_id)),
        None,
        clip_count,
        CaptionStyle::Karaoke,
    )
}

pub async fn seed_project(store: &MemoryStore, status: ProjectStatus) -> Project {
    let mut project = new_project(USER, 3);
    project.status = status;
    store.create_project(&project).await.unwrap();
    project
}

pub fn incoming_clip(index: usize) -> IncomingClip {
    let start = index as f64 * 30.0;
    IncomingClip {
        raw_clip_url: format!("https://cdn.example.com/raw/clip-{}.mp4", index),
        transcript_segments: vec![
            TranscriptWord::new("this", 0.0, 0.4),
            TranscriptWord::new("changes", 0.4, 0.9),
            TranscriptWord::new("everything", 0.9, 1.6),
        ],
        hook: format!("Hook number {}", index),
        start,
        end: start + 25.0,
    }
}

pub async fn seed_clip(store: &MemoryStore, project: &Project) -> Clip {
    let clip = Clip::from_incoming(&project.id, &project.user_id, &incoming_clip(0));
    store.insert_clip(clip.clone()).await;
    clip
}

/// `ready_for_review` delivery with `clips` valid clips.
pub fn ready_payload(project: &Project, clips: usize) -> Value {
    let clips: Vec<IncomingClip> = (0..clips).map(incoming_clip).collect();
    json!({
        "user_id": project.user_id,
        "project_id": project.id,
        "status": "ready_for_review",
        "clips": clips,
    })
}

/// Workflow engine sharing the app's store and bus, with recording fakes
/// for every remote service.
pub struct TestWorker {
    pub engine: WorkflowEngine,
    pub processor: Arc<RecordingProcessor>,
    pub renderer: Arc<RecordingRenderer>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestWorker {
    pub fn new(store: Arc<MemoryStore>, bus: Arc<MemoryEventBus>) -> Self {
        Self::with_services(store, bus, RecordingProcessor::new(), RecordingRenderer::new())
    }

    pub fn with_services(
        store: Arc<MemoryStore>,
        bus: Arc<MemoryEventBus>,
        processor: RecordingProcessor,
        renderer: RecordingRenderer,
    ) -> Self {
        let processor = Arc::new(processor);
        let renderer = Arc::new(renderer);
        let mailer = Arc::new(RecordingMailer::new());
        let ctx = Arc::new(WorkflowContext {
            config: WorkerConfig {
                public_base_url: "https://api.hookcut.test".to_string(),
                ..WorkerConfig::default()
            },
            store,
            events: bus.clone(),
            journal: bus.clone(),
            processing: processor.clone(),
            renderer: renderer.clone(),
            mailer: mailer.clone(),
        });
        Self {
            engine: WorkflowEngine::new(ctx, bus),
            processor,
            renderer,
            mailer,
        }
    }
}
