use crate::storage::schema::{
    app_settings, children, completions, rewards, sessions, tasks, users,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use habitstar_shared::domain::{Frequency, RewardKind, StickerThreshold};

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub user_id: &'a str,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = children)]
pub struct Child {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub avatar: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub icon: String,
    pub frequency: String,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
}

impl Task {
    /// Rows are CHECK-constrained, so an unknown value means a hand-edited DB.
    pub fn frequency(&self) -> Frequency {
        self.frequency.parse().unwrap_or(Frequency::Daily)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Insertable)]
#[diesel(table_name = completions)]
#[diesel(belongs_to(Child, foreign_key = child_id))]
#[diesel(belongs_to(Task, foreign_key = task_id))]
pub struct Completion {
    pub id: String,
    pub child_id: String,
    pub task_id: String,
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Insertable)]
#[diesel(table_name = rewards)]
#[diesel(belongs_to(Child, foreign_key = child_id))]
pub struct Reward {
    pub id: String,
    pub child_id: String,
    pub kind: String,
    pub sticker_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Reward {
    pub fn kind(&self) -> RewardKind {
        self.kind.parse().unwrap_or(RewardKind::Star)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = app_settings)]
#[diesel(primary_key(user_id))]
pub struct AppSettings {
    pub user_id: String,
    pub sticker_threshold: i32,
}

impl AppSettings {
    pub fn threshold(&self) -> StickerThreshold {
        StickerThreshold::new(i64::from(self.sticker_threshold)).unwrap_or_default()
    }
}
