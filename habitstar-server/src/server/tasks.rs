use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use habitstar_shared::api::{self, View};
use habitstar_shared::catalog;

use super::{AppError, AppState, auth::AuthCtx, task_dto};

const MAX_TITLE_LEN: usize = 60;
const MAX_ICON_LEN: usize = 16;

const TASK_VIEWS: &[View] = &[View::Dashboard, View::Tasks, View::Play];

fn validate_task(title: &str, icon: &str) -> Result<(String, String), AppError> {
    let title = title.trim();
    let icon = icon.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be 1-60 characters"));
    }
    if icon.is_empty() || icon.chars().count() > MAX_ICON_LEN {
        return Err(AppError::bad_request("icon is required"));
    }
    Ok((title.to_string(), icon.to_string()))
}

pub async fn api_list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::TaskDto>>, AppError> {
    let rows = state.store.list_tasks(auth.parent_id(), false).await?;
    Ok(Json(rows.into_iter().map(task_dto).collect()))
}

pub async fn api_create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::TaskReq>,
) -> Result<(StatusCode, Json<api::TaskDto>), AppError> {
    let (title, icon) = validate_task(&body.title, &body.icon)?;
    let task = state
        .store
        .create_task(auth.parent_id(), &title, &icon, body.frequency)
        .await?;
    state.invalidate(auth.parent_id(), TASK_VIEWS);
    Ok((StatusCode::CREATED, Json(task_dto(task))))
}

pub async fn api_update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    Json(body): Json<api::TaskUpdateReq>,
) -> Result<Json<api::TaskDto>, AppError> {
    let (title, icon) = validate_task(&body.title, &body.icon)?;
    let task = state
        .store
        .update_task(
            auth.parent_id(),
            &id,
            &title,
            &icon,
            body.frequency,
            body.enabled,
        )
        .await?;
    state.invalidate(auth.parent_id(), TASK_VIEWS);
    Ok(Json(task_dto(task)))
}

pub async fn api_delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete_task(auth.parent_id(), &id).await?;
    state.invalidate(auth.parent_id(), TASK_VIEWS);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_list_templates() -> Json<Vec<api::TaskTemplateDto>> {
    Json(api::task_templates())
}

pub async fn api_create_from_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(index): Path<usize>,
) -> Result<(StatusCode, Json<api::TaskDto>), AppError> {
    let tpl = catalog::task_template(index)
        .ok_or_else(|| AppError::bad_request(format!("unknown template: {}", index)))?;
    let task = state
        .store
        .create_task(auth.parent_id(), tpl.title, tpl.icon, tpl.frequency)
        .await?;
    state.invalidate(auth.parent_id(), TASK_VIEWS);
    Ok((StatusCode::CREATED, Json(task_dto(task))))
}
