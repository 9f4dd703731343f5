//! Minimal REST client helpers for consumers (scripts, companion apps, tests).
//! Feature-gated by `rest-client` to avoid pulling reqwest into the server binary.

use once_cell::sync::OnceCell;

use super::endpoints as ep;
use super::*;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

impl RestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

static CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

fn client() -> Result<&'static reqwest::Client, RestError> {
    CLIENT.get_or_try_init(|| {
        reqwest::Client::builder()
            .build()
            .map_err(|e| RestError::Http(e.to_string()))
    })
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, RestError> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        // Server errors arrive as `{"error": msg}`; anything else is passed through
        let body = serde_json::from_str::<ErrorDto>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(res)
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    check_status(res)
        .await?
        .json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn send(req: reqwest::RequestBuilder) -> Result<reqwest::Response, RestError> {
    req.send().await.map_err(|e| RestError::Http(e.to_string()))
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: &str,
) -> Result<T, RestError> {
    let res = send(client()?.get(url).bearer_auth(bearer)).await?;
    handle_json(res).await
}

async fn post_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: Option<&str>,
    body: &B,
) -> Result<T, RestError> {
    let mut req = client()?.post(url).json(body);
    if let Some(b) = bearer {
        req = req.bearer_auth(b);
    }
    handle_json(send(req).await?).await
}

pub async fn register(base: &str, req: &RegisterReq) -> Result<AuthResp, RestError> {
    post_json(ep::auth_register(base), None, req).await
}

pub async fn login(base: &str, req: &LoginReq) -> Result<AuthResp, RestError> {
    post_json(ep::auth_login(base), None, req).await
}

pub async fn session(base: &str, bearer: &str) -> Result<SessionDto, RestError> {
    get_json(ep::auth_session(base), bearer).await
}

pub async fn catalog(base: &str) -> Result<CatalogDto, RestError> {
    let res = send(client()?.get(ep::catalog(base))).await?;
    handle_json(res).await
}

pub async fn list_children(base: &str, bearer: &str) -> Result<Vec<ChildOverviewDto>, RestError> {
    get_json(ep::children(base), bearer).await
}

pub async fn create_child(base: &str, bearer: &str, req: &ChildReq) -> Result<ChildDto, RestError> {
    post_json(ep::children(base), Some(bearer), req).await
}

pub async fn list_tasks(base: &str, bearer: &str) -> Result<Vec<TaskDto>, RestError> {
    get_json(ep::tasks(base), bearer).await
}

pub async fn create_task(base: &str, bearer: &str, req: &TaskReq) -> Result<TaskDto, RestError> {
    post_json(ep::tasks(base), Some(bearer), req).await
}

pub async fn create_task_from_template(
    base: &str,
    bearer: &str,
    index: usize,
) -> Result<TaskDto, RestError> {
    let res = send(
        client()?
            .post(ep::task_from_template(base, index))
            .bearer_auth(bearer),
    )
    .await?;
    handle_json(res).await
}

pub async fn play_token(base: &str, bearer: &str, child_id: &str) -> Result<PlayTokenResp, RestError> {
    let res = send(client()?.post(ep::child_play(base, child_id)).bearer_auth(bearer)).await?;
    handle_json(res).await
}

pub async fn play_view(base: &str, bearer: &str, child_id: &str) -> Result<PlayViewDto, RestError> {
    get_json(ep::child_play(base, child_id), bearer).await
}

pub async fn complete_task(
    base: &str,
    bearer: &str,
    child_id: &str,
    task_id: &str,
) -> Result<CompleteTaskResp, RestError> {
    let res = send(
        client()?
            .post(ep::child_complete_task(base, child_id, task_id))
            .bearer_auth(bearer),
    )
    .await?;
    handle_json(res).await
}

pub async fn child_rewards(
    base: &str,
    bearer: &str,
    child_id: &str,
) -> Result<RewardsViewDto, RestError> {
    get_json(ep::child_rewards(base, child_id), bearer).await
}

pub async fn weekly_stats(
    base: &str,
    bearer: &str,
    child_id: &str,
) -> Result<WeeklyStatsDto, RestError> {
    get_json(ep::child_weekly_stats(base, child_id), bearer).await
}

pub async fn reset_child_progress(base: &str, bearer: &str, child_id: &str) -> Result<(), RestError> {
    let res = send(
        client()?
            .post(ep::child_reset_progress(base, child_id))
            .bearer_auth(bearer),
    )
    .await?;
    check_status(res).await.map(|_| ())
}

pub async fn reset_child_rewards(base: &str, bearer: &str, child_id: &str) -> Result<(), RestError> {
    let res = send(
        client()?
            .post(ep::child_reset_rewards(base, child_id))
            .bearer_auth(bearer),
    )
    .await?;
    check_status(res).await.map(|_| ())
}

pub async fn dashboard(base: &str, bearer: &str) -> Result<DashboardDto, RestError> {
    get_json(ep::dashboard(base), bearer).await
}

pub async fn settings(base: &str, bearer: &str) -> Result<SettingsDto, RestError> {
    get_json(ep::settings(base), bearer).await
}

pub async fn update_settings(
    base: &str,
    bearer: &str,
    req: &UpdateSettingsReq,
) -> Result<SettingsDto, RestError> {
    let res = send(client()?.put(ep::settings(base)).bearer_auth(bearer).json(req)).await?;
    handle_json(res).await
}
