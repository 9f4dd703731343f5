//! Completion endpoint and the read models built on stars and stickers.

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use habitstar_shared::api::{self, ServerEvent, View};
use habitstar_shared::catalog;
use std::collections::HashSet;

use super::{AppError, AppState, auth::AuthCtx, child_dto, completion_dto, reward_dto, task_dto};

const COMPLETION_VIEWS: &[View] = &[View::Dashboard, View::Play, View::Rewards];

/// Today's completions against enabled tasks, in whole percent capped at 100.
/// Repeated completions of one task count each time.
fn progress_percent(done: i64, enabled_tasks: usize) -> i64 {
    if enabled_tasks == 0 {
        return 0;
    }
    let pct = (done as f64 * 100.0 / enabled_tasks as f64).round() as i64;
    pct.clamp(0, 100)
}

pub async fn api_complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<Json<api::CompleteTaskResp>, AppError> {
    // One completion per child at a time; the cached total is refreshed from the outcome
    let child_mutex = state.child_mutex(auth.parent_id(), &id).await?;
    let mut stars = child_mutex.lock().await;
    let outcome = state
        .store
        .complete_task(auth.parent_id(), &id, &task_id, state.today())
        .await?;
    *stars = Some(outcome.star_count);
    drop(stars);

    if let Some(sticker_id) = outcome
        .new_sticker
        .as_ref()
        .and_then(|r| r.sticker_id.clone())
    {
        state.publish(
            auth.parent_id(),
            ServerEvent::StickerUnlocked {
                child_id: id.clone(),
                sticker_id,
            },
        );
    }
    state.invalidate(auth.parent_id(), COMPLETION_VIEWS);

    Ok(Json(api::CompleteTaskResp {
        completion: completion_dto(outcome.completion),
        star_count: outcome.star_count,
        new_sticker: outcome.new_sticker.map(reward_dto),
    }))
}

pub async fn api_today_completions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<Vec<api::CompletionDto>>, AppError> {
    let rows = state
        .store
        .today_completions(auth.parent_id(), &id, state.today())
        .await?;
    Ok(Json(rows.into_iter().map(completion_dto).collect()))
}

pub async fn api_weekly_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::WeeklyStatsDto>, AppError> {
    let stats = state
        .store
        .weekly_stats(auth.parent_id(), &id, state.today())
        .await?;
    Ok(Json(api::WeeklyStatsDto {
        by_date: stats
            .by_date
            .into_iter()
            .map(|(d, n)| (d.format("%Y-%m-%d").to_string(), n))
            .collect(),
        by_task: stats.by_task,
        total: stats.total,
    }))
}

pub async fn api_play_view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::PlayViewDto>, AppError> {
    let parent = auth.parent_id();
    let child = state.store.get_child(parent, &id).await?;
    let tasks = state.store.list_tasks(parent, true).await?;
    let done = state
        .store
        .today_completions(parent, &id, state.today())
        .await?;
    let settings = state.store.get_or_create_settings(parent).await?;

    let child_mutex = state.child_mutex(parent, &id).await?;
    let mut stars = child_mutex.lock().await;
    let star_count = state.star_count(&id, &mut stars).await?;
    drop(stars);

    let mut seen = HashSet::new();
    let completed_task_ids = done
        .into_iter()
        .map(|c| c.task_id)
        .filter(|t| seen.insert(t.clone()))
        .collect();

    Ok(Json(api::PlayViewDto {
        child: child_dto(child),
        tasks: tasks.into_iter().map(task_dto).collect(),
        completed_task_ids,
        star_count,
        sticker_threshold: settings.threshold(),
    }))
}

pub async fn api_rewards_view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::RewardsViewDto>, AppError> {
    let parent = auth.parent_id();
    let settings = state.store.get_or_create_settings(parent).await?;

    let child_mutex = state.child_mutex(parent, &id).await?;
    let mut stars = child_mutex.lock().await;
    let summary = state.store.reward_summary(parent, &id).await?;
    *stars = Some(summary.star_count);
    drop(stars);

    let threshold = settings.threshold();
    let held: HashSet<&str> = summary.sticker_ids.iter().map(String::as_str).collect();
    let stickers: Vec<api::StickerStatusDto> = catalog::STICKERS
        .iter()
        .map(|s| api::StickerStatusDto {
            id: s.id.into(),
            emoji: s.emoji.into(),
            name: s.name.into(),
            unlocked: held.contains(s.id),
        })
        .collect();
    let unlocked_count = stickers.iter().filter(|s| s.unlocked).count();

    Ok(Json(api::RewardsViewDto {
        child: child_dto(summary.child),
        star_count: summary.star_count,
        sticker_threshold: threshold,
        stars_until_next: threshold.stars_until_next(summary.star_count),
        unlocked_count,
        stickers,
    }))
}

pub async fn api_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::DashboardDto>, AppError> {
    let parent = auth.parent_id();
    let overviews = state
        .store
        .list_child_overviews(parent, state.today())
        .await?;
    let active = state.store.list_tasks(parent, true).await?.len();

    let children: Vec<api::DashboardChildDto> = overviews
        .into_iter()
        .map(|o| {
            let today_done = o.completions_today;
            api::DashboardChildDto {
                id: o.child.id,
                name: o.child.name,
                avatar: o.child.avatar,
                star_count: o.star_count,
                today_done,
                progress_percent: progress_percent(today_done, active),
            }
        })
        .collect();
    let completed_today = children.iter().map(|c| c.today_done).sum();

    Ok(Json(api::DashboardDto {
        parent_name: auth.claims.name.clone(),
        children,
        active_task_count: active as i64,
        completed_today,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_rounded_percentage() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(3, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(5, 5), 100);
        // a task done twice still fills the bar only once
        assert_eq!(progress_percent(5, 1), 100);
    }
}
