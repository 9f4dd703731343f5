mod acl;
pub mod auth;
mod children;
mod config;
mod events;
mod progress;
mod tasks;

use crate::server::auth::AuthCtx;
use crate::storage::{Store, StorageError, models};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, State},
    http::{Method, StatusCode, header},
    routing::{get, post, put},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
pub use config::{AppConfig, ConfigError};
use habitstar_shared::api::{self, ServerEvent, View};
use habitstar_shared::domain::StickerThreshold;
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

type StarCacheMap = Arc<Mutex<HashMap<String, Arc<Mutex<Option<i64>>>>>>;
type StarsGuard<'a> = MutexGuard<'a, Option<i64>>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A server event addressed to one family (parent account).
#[derive(Clone, Debug)]
pub struct FamilyEvent {
    pub parent_id: String,
    pub event: ServerEvent,
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    tz: chrono_tz::Tz,
    events: broadcast::Sender<FamilyEvent>,
    shutdown: CancellationToken,
    // Cache of star totals per child. None => needs recompute
    stars_cache: StarCacheMap,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        let tz = config.tz();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            store,
            tz,
            events,
            shutdown: CancellationToken::new(),
            stars_cache: Default::default(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Calendar date in the configured time zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Per-child lock guarding the cached star total. The child must belong to
    /// `parent_id`; unknown ids never get a cache slot.
    async fn child_mutex(
        &self,
        parent_id: &str,
        child_id: &str,
    ) -> Result<Arc<Mutex<Option<i64>>>, AppError> {
        self.store.get_child(parent_id, child_id).await?;
        let mut map = self.stars_cache.lock().await;
        Ok(map
            .entry(child_id.to_string())
            .or_insert_with(Default::default)
            .clone())
    }

    async fn star_count(&self, child_id: &str, guard: &mut StarsGuard<'_>) -> Result<i64, AppError> {
        if let Some(v) = **guard {
            return Ok(v);
        }
        let v = self.store.star_count(child_id).await?;
        **guard = Some(v);
        Ok(v)
    }

    async fn forget_child(&self, child_id: &str) {
        self.stars_cache.lock().await.remove(child_id);
    }

    fn subscribe(&self) -> broadcast::Receiver<FamilyEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, parent_id: &str, event: ServerEvent) {
        // Nobody listening is fine
        let _ = self.events.send(FamilyEvent {
            parent_id: parent_id.to_string(),
            event,
        });
    }

    fn invalidate(&self, parent_id: &str, views: &[View]) {
        self.publish(
            parent_id,
            ServerEvent::Invalidate {
                views: views.to_vec(),
            },
        );
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/v1/auth/session", get(auth::api_auth_session))
        .route("/api/v1/auth/logout", post(auth::api_auth_logout))
        .route("/api/v1/events", get(events::api_events))
        .route("/api/v1/dashboard", get(progress::api_dashboard))
        .route("/api/v1/settings", get(api_get_settings).put(api_update_settings))
        .route(
            "/api/v1/children",
            get(children::api_list_children).post(children::api_create_child),
        )
        .route(
            "/api/v1/children/{id}",
            put(children::api_update_child).delete(children::api_delete_child),
        )
        .route(
            "/api/v1/children/{id}/play",
            get(progress::api_play_view).post(auth::api_play_token),
        )
        .route("/api/v1/children/{id}/rewards", get(progress::api_rewards_view))
        .route(
            "/api/v1/children/{id}/reset-progress",
            post(children::api_reset_progress),
        )
        .route(
            "/api/v1/children/{id}/reset-rewards",
            post(children::api_reset_rewards),
        )
        .route(
            "/api/v1/children/{id}/completions/today",
            get(progress::api_today_completions),
        )
        .route(
            "/api/v1/children/{id}/stats/weekly",
            get(progress::api_weekly_stats),
        )
        .route(
            "/api/v1/children/{id}/tasks/{task_id}/complete",
            post(progress::api_complete_task),
        )
        .route(
            "/api/v1/tasks",
            get(tasks::api_list_tasks).post(tasks::api_create_task),
        )
        .route("/api/v1/tasks/templates", get(tasks::api_list_templates))
        .route(
            "/api/v1/tasks/templates/{index}",
            post(tasks::api_create_from_template),
        )
        .route(
            "/api/v1/tasks/{id}",
            put(tasks::api_update_task).delete(tasks::api_delete_task),
        )
        .with_state(state.clone())
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn(acl::enforce_acl))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
            role = tracing::field::Empty,
            child_id = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/version", get(api_version))
        .route("/api/v1/catalog", get(api_catalog))
        .route("/api/v1/auth/register", post(auth::api_auth_register))
        .route("/api/v1/auth/login", post(auth::api_auth_login))
        .merge(private)
        .fallback(get(serve_embedded))
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn api_version() -> Json<api::VersionDto> {
    Json(api::VersionDto {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn api_catalog() -> Json<api::CatalogDto> {
    Json(api::CatalogDto::current())
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    // HSTS is only honored on HTTPS
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // API responses are user-specific and must never be cached
    if path == "/healthz" || path.starts_with("/api/") || path == "/api" {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
        headers.insert(
            HeaderName::from_static("expires"),
            HeaderValue::from_static("0"),
        );
    }

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        let span = Span::current();
        span.record("user_id", tracing::field::display(&auth.claims.sub));
        span.record("role", tracing::field::debug(&auth.claims.role));
        if let Some(cid) = &auth.claims.child_id {
            span.record("child_id", tracing::field::display(cid));
        }
    }
    Ok(next.run(req).await)
}

async fn api_get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::SettingsDto>, AppError> {
    let row = state.store.get_or_create_settings(auth.parent_id()).await?;
    Ok(Json(api::SettingsDto {
        sticker_threshold: row.threshold(),
    }))
}

async fn api_update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::UpdateSettingsReq>,
) -> Result<Json<api::SettingsDto>, AppError> {
    if !body.sticker_threshold.is_finite() {
        return Err(AppError::bad_request("sticker_threshold must be a number"));
    }
    let threshold = StickerThreshold::clamped(body.sticker_threshold);
    let row = state
        .store
        .update_sticker_threshold(auth.parent_id(), threshold)
        .await?;
    tracing::info!(threshold = threshold.get(), "settings: sticker threshold updated");
    state.invalidate(auth.parent_id(), &[View::Settings]);
    Ok(Json(api::SettingsDto {
        sticker_threshold: row.threshold(),
    }))
}

// Model -> DTO conversions shared by the handler modules

fn rfc3339(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

fn child_dto(c: models::Child) -> api::ChildDto {
    api::ChildDto {
        id: c.id,
        name: c.name,
        avatar: c.avatar,
        created_at: rfc3339(c.created_at),
    }
}

fn task_dto(t: models::Task) -> api::TaskDto {
    api::TaskDto {
        frequency: t.frequency(),
        id: t.id,
        title: t.title,
        icon: t.icon,
        enabled: t.enabled,
        created_at: rfc3339(t.created_at),
    }
}

fn completion_dto(c: models::Completion) -> api::CompletionDto {
    api::CompletionDto {
        id: c.id,
        child_id: c.child_id,
        task_id: c.task_id,
        date: c.date.to_string(),
    }
}

fn reward_dto(r: models::Reward) -> api::RewardDto {
    api::RewardDto {
        kind: r.kind(),
        id: r.id,
        child_id: r.child_id,
        sticker_id: r.sticker_id,
        created_at: rfc3339(r.created_at),
    }
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(m) => AppError::NotFound(m),
            StorageError::Conflict(m) => AppError::Conflict(m),
            StorageError::InvalidInput(m) => AppError::BadRequest(m),
            other => AppError::internal(other),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m, "conflict", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::warn!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(api::ErrorDto { error: msg });
        (status, body).into_response()
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct WebAssets;

async fn serve_embedded(
    uri: axum::http::Uri,
) -> Result<axum::response::Response, (StatusCode, String)> {
    let path = uri.path().trim_start_matches('/');
    let candidate = if path.is_empty() { "index.html" } else { path };
    let (name, asset) = match WebAssets::get(candidate) {
        Some(a) => (candidate, a),
        None => (
            "index.html",
            WebAssets::get("index.html")
                .ok_or((StatusCode::NOT_FOUND, "asset not found".to_string()))?,
        ),
    };

    let bytes = asset.data.into_owned();
    let mime = from_path(name).first_or_octet_stream();

    let mut resp = axum::response::Response::new(axum::body::Body::from(bytes));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_str(mime.as_ref())
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use habitstar_shared::auth::Role;
    use habitstar_shared::domain::Frequency;
    use habitstar_shared::jwt::JwtClaims;

    async fn state_with_parent() -> (AppState, AuthCtx, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("app.db");
        let store = Store::connect_sqlite(db.to_str().unwrap()).await.unwrap();
        let parent = store
            .create_user("Pat", "pat@example.com", "not-a-real-hash")
            .await
            .unwrap();
        let config = AppConfig {
            jwt_secret: "testsecret".into(),
            dev_cors_origin: None,
            listen_port: None,
            allow_registration: true,
            timezone: None,
        };
        let auth = AuthCtx {
            claims: JwtClaims {
                sub: parent.id,
                name: parent.name,
                jti: "jti-1".into(),
                exp: 4_102_444_800,
                role: Role::Parent,
                child_id: None,
            },
        };
        (AppState::new(config, store), auth, dir)
    }

    #[tokio::test]
    async fn unknown_children_get_no_cache_slot() {
        let (state, auth, _dir) = state_with_parent().await;
        let task = state
            .store
            .create_task(auth.parent_id(), "Brush teeth", "🦷", Frequency::Daily)
            .await
            .unwrap();

        for i in 0..50 {
            let id = format!("missing-{i}");
            let res = progress::api_complete_task(
                State(state.clone()),
                Extension(auth.clone()),
                Path((id.clone(), task.id.clone())),
            )
            .await;
            assert!(matches!(res, Err(AppError::NotFound(_))));
            let res = progress::api_rewards_view(
                State(state.clone()),
                Extension(auth.clone()),
                Path(id.clone()),
            )
            .await;
            assert!(matches!(res, Err(AppError::NotFound(_))));
            let res = children::api_reset_rewards(
                State(state.clone()),
                Extension(auth.clone()),
                Path(id.clone()),
            )
            .await;
            assert!(matches!(res, Err(AppError::NotFound(_))));
            let res = children::api_reset_progress(
                State(state.clone()),
                Extension(auth.clone()),
                Path(id),
            )
            .await;
            assert!(matches!(res, Err(AppError::NotFound(_))));
        }
        assert!(state.stars_cache.lock().await.is_empty());
    }

    #[tokio::test]
    async fn foreign_children_get_no_cache_slot() {
        let (state, auth, _dir) = state_with_parent().await;
        let other = state
            .store
            .create_user("Sam", "sam@example.com", "not-a-real-hash")
            .await
            .unwrap();
        let theirs = state
            .store
            .create_child(&other.id, "Bo", "fox")
            .await
            .unwrap();

        let res = children::api_reset_rewards(
            State(state.clone()),
            Extension(auth.clone()),
            Path(theirs.id.clone()),
        )
        .await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
        assert!(state.stars_cache.lock().await.is_empty());

        let mine = state
            .store
            .create_child(auth.parent_id(), "Ada", "owl")
            .await
            .unwrap();
        children::api_reset_rewards(State(state.clone()), Extension(auth), Path(mine.id.clone()))
            .await
            .unwrap();
        let map = state.stars_cache.lock().await;
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&mine.id));
    }
}
