use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use habitstar_shared::api::{self, View};
use habitstar_shared::catalog;

use super::{AppError, AppState, auth::AuthCtx, child_dto};

const MAX_CHILD_NAME_LEN: usize = 30;

/// Views a reset or child edit makes stale.
const CHILD_VIEWS: &[View] = &[View::Dashboard, View::Children];
const RESET_VIEWS: &[View] = &[View::Dashboard, View::Children, View::Play, View::Rewards];

/// Trims and checks a child profile; returns the cleaned name.
fn validate_child(body: &api::ChildReq) -> Result<String, AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if name.chars().count() > MAX_CHILD_NAME_LEN {
        return Err(AppError::bad_request("name is too long"));
    }
    if catalog::avatar(&body.avatar).is_none() {
        return Err(AppError::bad_request(format!(
            "unknown avatar: {}",
            body.avatar
        )));
    }
    Ok(name.to_string())
}

pub async fn api_list_children(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::ChildOverviewDto>>, AppError> {
    let rows = state
        .store
        .list_child_overviews(auth.parent_id(), state.today())
        .await?;
    let items = rows
        .into_iter()
        .map(|o| api::ChildOverviewDto {
            child: child_dto(o.child),
            star_count: o.star_count,
            sticker_ids: o.sticker_ids,
            completed_today: o.completed_today,
        })
        .collect();
    Ok(Json(items))
}

pub async fn api_create_child(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::ChildReq>,
) -> Result<(StatusCode, Json<api::ChildDto>), AppError> {
    let name = validate_child(&body)?;
    let child = state
        .store
        .create_child(auth.parent_id(), &name, &body.avatar)
        .await?;
    tracing::info!(child_id = %child.id, "children: created");
    state.invalidate(auth.parent_id(), CHILD_VIEWS);
    Ok((StatusCode::CREATED, Json(child_dto(child))))
}

pub async fn api_update_child(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    Json(body): Json<api::ChildReq>,
) -> Result<Json<api::ChildDto>, AppError> {
    let name = validate_child(&body)?;
    let child = state
        .store
        .update_child(auth.parent_id(), &id, &name, &body.avatar)
        .await?;
    state.invalidate(auth.parent_id(), CHILD_VIEWS);
    Ok(Json(child_dto(child)))
}

pub async fn api_delete_child(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete_child(auth.parent_id(), &id).await?;
    state.forget_child(&id).await;
    tracing::info!(child_id = %id, "children: deleted");
    state.invalidate(auth.parent_id(), RESET_VIEWS);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_reset_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let child_mutex = state.child_mutex(auth.parent_id(), &id).await?;
    let mut stars = child_mutex.lock().await;
    // Drop the cached total before touching the DB
    stars.take();
    state
        .store
        .reset_child_progress(auth.parent_id(), &id)
        .await?;
    *stars = Some(0);
    state.invalidate(auth.parent_id(), RESET_VIEWS);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_reset_rewards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let child_mutex = state.child_mutex(auth.parent_id(), &id).await?;
    let mut stars = child_mutex.lock().await;
    stars.take();
    state
        .store
        .reset_child_rewards(auth.parent_id(), &id)
        .await?;
    *stars = Some(0);
    state.invalidate(auth.parent_id(), RESET_VIEWS);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, avatar: &str) -> api::ChildReq {
        api::ChildReq {
            name: name.into(),
            avatar: avatar.into(),
        }
    }

    #[test]
    fn child_names_are_trimmed() {
        let avatar = catalog::AVATARS[0].id;
        assert_eq!(validate_child(&req("  Ada ", avatar)).unwrap(), "Ada");
    }

    #[test]
    fn rejects_blank_names_and_unknown_avatars() {
        let avatar = catalog::AVATARS[0].id;
        assert!(validate_child(&req("   ", avatar)).is_err());
        assert!(validate_child(&req(&"x".repeat(31), avatar)).is_err());
        assert!(validate_child(&req("Ada", "dragon-king")).is_err());
    }
}
