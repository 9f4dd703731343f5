use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::catalog;
use crate::domain::{Frequency, RewardKind, StickerThreshold};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_V1_PREFIX: &str = "/api/v1";

// Auth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUserDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDto {
    pub user: SessionUserDto,
    pub role: Role,
    pub child_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayTokenResp {
    pub token: String,
    pub child_id: String,
}

// Children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildReq {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildDto {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub created_at: String, // RFC3339 UTC
}

/// A child together with its reward totals and what it finished today.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChildOverviewDto {
    #[serde(flatten)]
    pub child: ChildDto,
    pub star_count: i64,
    pub sticker_ids: Vec<String>,
    pub completed_today: Vec<String>,
}

// Tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReq {
    pub title: String,
    pub icon: String,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateReq {
    pub title: String,
    pub icon: String,
    pub frequency: Frequency,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub frequency: Frequency,
    pub enabled: bool,
    pub created_at: String, // RFC3339 UTC
}

// Completion + rewards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDto {
    pub id: String,
    pub child_id: String,
    pub task_id: String,
    pub date: String, // YYYY-MM-DD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardDto {
    pub id: String,
    pub child_id: String,
    pub kind: RewardKind,
    pub sticker_id: Option<String>,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteTaskResp {
    pub completion: CompletionDto,
    pub star_count: i64,
    pub new_sticker: Option<RewardDto>,
}

// Views
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardChildDto {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub star_count: i64,
    pub today_done: i64,
    pub progress_percent: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardDto {
    pub parent_name: String,
    pub children: Vec<DashboardChildDto>,
    pub active_task_count: i64,
    pub completed_today: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayViewDto {
    pub child: ChildDto,
    pub tasks: Vec<TaskDto>,
    pub completed_task_ids: Vec<String>,
    pub star_count: i64,
    pub sticker_threshold: StickerThreshold,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StickerStatusDto {
    pub id: String,
    pub emoji: String,
    pub name: String,
    pub unlocked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewardsViewDto {
    pub child: ChildDto,
    pub star_count: i64,
    pub sticker_threshold: StickerThreshold,
    pub stars_until_next: i64,
    pub unlocked_count: usize,
    pub stickers: Vec<StickerStatusDto>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WeeklyStatsDto {
    pub by_date: BTreeMap<String, i64>,
    pub by_task: BTreeMap<String, i64>,
    pub total: i64,
}

// Settings
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsDto {
    pub sticker_threshold: StickerThreshold,
}

/// Any number is accepted; the server floors and clamps it into range.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettingsReq {
    pub sticker_threshold: f64,
}

// Catalog (public)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntryDto {
    pub id: String,
    pub emoji: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskTemplateDto {
    pub index: usize,
    pub title: String,
    pub icon: String,
    pub frequency: Frequency,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogDto {
    pub stickers: Vec<CatalogEntryDto>,
    pub avatars: Vec<CatalogEntryDto>,
    pub task_icons: Vec<String>,
    pub templates: Vec<TaskTemplateDto>,
}

impl CatalogDto {
    pub fn current() -> Self {
        Self {
            stickers: catalog::STICKERS
                .iter()
                .map(|s| CatalogEntryDto {
                    id: s.id.into(),
                    emoji: s.emoji.into(),
                    name: s.name.into(),
                })
                .collect(),
            avatars: catalog::AVATARS
                .iter()
                .map(|a| CatalogEntryDto {
                    id: a.id.into(),
                    emoji: a.emoji.into(),
                    name: a.name.into(),
                })
                .collect(),
            task_icons: catalog::TASK_ICONS.iter().map(|i| i.to_string()).collect(),
            templates: task_templates(),
        }
    }
}

pub fn task_templates() -> Vec<TaskTemplateDto> {
    catalog::TASK_TEMPLATES
        .iter()
        .enumerate()
        .map(|(index, t)| TaskTemplateDto {
            index,
            title: t.title.into(),
            icon: t.icon.into(),
            frequency: t.frequency,
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionDto {
    pub version: String,
}

/// Client views whose cached data an action made stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Dashboard,
    Children,
    Tasks,
    Play,
    Rewards,
    Settings,
}

/// Payload of the `/events` Server-Sent Events stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Invalidate { views: Vec<View> },
    StickerUnlocked { child_id: String, sticker_id: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_event_is_tagged() {
        let ev = ServerEvent::Invalidate {
            views: vec![View::Dashboard, View::Play],
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "invalidate");
        assert_eq!(v["views"][1], "play");
    }

    #[test]
    fn overview_flattens_child_fields() {
        let dto = ChildOverviewDto {
            child: ChildDto {
                id: "c1".into(),
                name: "Ada".into(),
                avatar: "owl".into(),
                created_at: "2026-01-01T00:00:00+00:00".into(),
            },
            star_count: 3,
            sticker_ids: vec![],
            completed_today: vec!["t1".into()],
        };
        let v = serde_json::to_value(&dto).unwrap();
        assert_eq!(v["name"], "Ada");
        assert_eq!(v["star_count"], 3);
    }

    #[test]
    fn catalog_lists_every_template_with_its_index() {
        let c = CatalogDto::current();
        assert_eq!(c.stickers.len(), 15);
        assert_eq!(c.avatars.len(), 12);
        assert_eq!(c.templates[2].index, 2);
        assert_eq!(c.templates[2].title, "Read a book");
    }
}
