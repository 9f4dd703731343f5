pub mod models;
pub mod schema;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use habitstar_shared::domain::{Frequency, RewardKind, StickerThreshold};
use models::{AppSettings, Child, Completion, NewSession, Reward, Task, User};
use tracing::{debug, info, trace};

use crate::rewards;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The record does not exist or is not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),
}

/// A child with its reward totals and what it did today.
#[derive(Debug, Clone)]
pub struct ChildOverview {
    pub child: Child,
    pub star_count: i64,
    pub sticker_ids: Vec<String>,
    /// Distinct task ids completed today.
    pub completed_today: Vec<String>,
    /// Every completion recorded today, repeats included.
    pub completions_today: i64,
}

/// Result of completing a task: the completion, the child's star total after
/// it, and the sticker minted by this completion, if any.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub completion: Completion,
    pub star_count: i64,
    pub new_sticker: Option<Reward>,
}

#[derive(Debug, Clone)]
pub struct RewardSummary {
    pub child: Child,
    pub star_count: i64,
    pub sticker_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyStats {
    pub by_date: BTreeMap<NaiveDate, i64>,
    pub by_task: BTreeMap<String, i64>,
    pub total: i64,
}

impl WeeklyStats {
    fn from_rows(rows: impl IntoIterator<Item = (NaiveDate, String)>) -> Self {
        let mut stats = WeeklyStats::default();
        for (date, title) in rows {
            *stats.by_date.entry(date).or_default() += 1;
            *stats.by_task.entry(title).or_default() += 1;
            stats.total += 1;
        }
        stats
    }
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;
        let store = Store { pool };

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        let applied = store
            .blocking(|conn| {
                let versions = conn
                    .run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(versions.len())
            })
            .await?;
        if applied > 0 {
            info!(applied, "storage: migrations applied");
        }

        Ok(store)
    }

    /// Runs `f` on a pooled connection on the blocking thread pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut *conn)
        })
        .await?
    }

    // Accounts

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        use schema::users::dsl as u;
        let user = User {
            id: new_id(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            created_at: now(),
        };
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<User, StorageError> {
                let taken: i64 = u::users
                    .filter(u::email.eq(&user.email))
                    .count()
                    .get_result(conn)?;
                if taken > 0 {
                    return Err(StorageError::Conflict("email already registered".into()));
                }
                diesel::insert_into(u::users)
                    .values(&user)
                    .execute(conn)
                    .map_err(|e| match e {
                        diesel::result::Error::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        ) => StorageError::Conflict("email already registered".into()),
                        other => other.into(),
                    })?;
                debug!(user_id = %user.id, "storage: user created");
                Ok(user)
            })
        })
        .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        use schema::users::dsl as u;
        let email = normalize_email(email);
        self.blocking(move |conn| {
            Ok(u::users
                .filter(u::email.eq(&email))
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        use schema::users::dsl as u;
        let user_id = user_id.to_string();
        self.blocking(move |conn| {
            Ok(u::users
                .filter(u::id.eq(&user_id))
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    // Session helpers for JWT inactivity windows

    pub async fn create_session(&self, jti_: &str, user_id_: &str) -> Result<(), StorageError> {
        use schema::sessions;
        let j = jti_.to_string();
        let u = user_id_.to_string();
        self.blocking(move |conn| {
            let now = now();
            let new = NewSession {
                jti: &j,
                user_id: &u,
                issued_at: now,
                last_used_at: now,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.blocking(move |conn| {
            let deleted = diesel::delete(sessions.filter(jti.eq(&j))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    ///
    /// The idle check and the `last_used_at` update are a single UPDATE, so a
    /// concurrent request cannot revive a session that just expired.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.blocking(move |conn| {
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now()))
                    .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    // Children

    pub async fn create_child(
        &self,
        parent: &str,
        name: &str,
        avatar: &str,
    ) -> Result<Child, StorageError> {
        use schema::children;
        let child = Child {
            id: new_id(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            created_at: now(),
        };
        self.blocking(move |conn| {
            diesel::insert_into(children::table)
                .values(&child)
                .execute(conn)?;
            trace!(child_id = %child.id, "storage: child created");
            Ok(child)
        })
        .await
    }

    pub async fn update_child(
        &self,
        parent: &str,
        child: &str,
        name: &str,
        avatar: &str,
    ) -> Result<Child, StorageError> {
        use schema::children::dsl as c;
        let parent = parent.to_string();
        let child = child.to_string();
        let name = name.to_string();
        let avatar = avatar.to_string();
        self.blocking(move |conn| {
            let updated = diesel::update(
                c::children
                    .filter(c::id.eq(&child))
                    .filter(c::parent_id.eq(&parent)),
            )
            .set((c::name.eq(&name), c::avatar.eq(&avatar)))
            .execute(conn)?;
            if updated == 0 {
                return Err(child_not_found(&child));
            }
            owned_child(conn, &parent, &child)
        })
        .await
    }

    /// Deletes the child; completions and rewards go with it (FK cascade).
    pub async fn delete_child(&self, parent: &str, child: &str) -> Result<(), StorageError> {
        use schema::children::dsl as c;
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| {
            let deleted = diesel::delete(
                c::children
                    .filter(c::id.eq(&child))
                    .filter(c::parent_id.eq(&parent)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(child_not_found(&child));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_child(&self, parent: &str, child: &str) -> Result<Child, StorageError> {
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| owned_child(conn, &parent, &child))
            .await
    }

    pub async fn list_children(&self, parent: &str) -> Result<Vec<Child>, StorageError> {
        let parent = parent.to_string();
        self.blocking(move |conn| load_children(conn, &parent)).await
    }

    /// Children of `parent` with star totals, held stickers and the ids of
    /// tasks completed on `today`.
    pub async fn list_child_overviews(
        &self,
        parent: &str,
        today: NaiveDate,
    ) -> Result<Vec<ChildOverview>, StorageError> {
        use schema::completions::dsl as cp;
        use schema::rewards::dsl as r;
        let parent = parent.to_string();
        self.blocking(move |conn| {
            let kids = load_children(conn, &parent)?;
            let ids: Vec<String> = kids.iter().map(|c| c.id.clone()).collect();

            let reward_rows: Vec<Reward> = r::rewards
                .filter(r::child_id.eq_any(ids.clone()))
                .order((r::created_at.asc(), r::id.asc()))
                .load(conn)?;
            let done_rows: Vec<(String, String)> = cp::completions
                .filter(cp::child_id.eq_any(ids))
                .filter(cp::date.eq(today))
                .order(cp::created_at.asc())
                .select((cp::child_id, cp::task_id))
                .load(conn)?;

            let mut stars: HashMap<String, i64> = HashMap::new();
            let mut stickers: HashMap<String, Vec<String>> = HashMap::new();
            for rw in reward_rows {
                match rw.kind() {
                    RewardKind::Star => *stars.entry(rw.child_id).or_default() += 1,
                    RewardKind::Sticker => {
                        if let Some(sid) = rw.sticker_id {
                            stickers.entry(rw.child_id).or_default().push(sid);
                        }
                    }
                }
            }
            let mut done: HashMap<String, Vec<String>> = HashMap::new();
            let mut done_count: HashMap<String, i64> = HashMap::new();
            for (cid, tid) in done_rows {
                *done_count.entry(cid.clone()).or_default() += 1;
                let ids = done.entry(cid).or_default();
                if !ids.contains(&tid) {
                    ids.push(tid);
                }
            }

            Ok(kids
                .into_iter()
                .map(|child| ChildOverview {
                    star_count: stars.get(&child.id).copied().unwrap_or(0),
                    sticker_ids: stickers.remove(&child.id).unwrap_or_default(),
                    completed_today: done.remove(&child.id).unwrap_or_default(),
                    completions_today: done_count.get(&child.id).copied().unwrap_or(0),
                    child,
                })
                .collect())
        })
        .await
    }

    // Tasks

    pub async fn create_task(
        &self,
        parent: &str,
        title: &str,
        icon: &str,
        frequency: Frequency,
    ) -> Result<Task, StorageError> {
        use schema::tasks;
        let task = Task {
            id: new_id(),
            parent_id: parent.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
            frequency: frequency.as_str().to_string(),
            enabled: true,
            created_at: now(),
        };
        self.blocking(move |conn| {
            diesel::insert_into(tasks::table).values(&task).execute(conn)?;
            trace!(task_id = %task.id, "storage: task created");
            Ok(task)
        })
        .await
    }

    pub async fn update_task(
        &self,
        parent: &str,
        task: &str,
        title: &str,
        icon: &str,
        frequency: Frequency,
        enabled: bool,
    ) -> Result<Task, StorageError> {
        use schema::tasks::dsl as t;
        let parent = parent.to_string();
        let task = task.to_string();
        let title = title.to_string();
        let icon = icon.to_string();
        self.blocking(move |conn| {
            let updated = diesel::update(
                t::tasks
                    .filter(t::id.eq(&task))
                    .filter(t::parent_id.eq(&parent)),
            )
            .set((
                t::title.eq(&title),
                t::icon.eq(&icon),
                t::frequency.eq(frequency.as_str()),
                t::enabled.eq(enabled),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(task_not_found(&task));
            }
            owned_task(conn, &parent, &task)
        })
        .await
    }

    /// Deletes the task together with its completion history (FK cascade).
    pub async fn delete_task(&self, parent: &str, task: &str) -> Result<(), StorageError> {
        use schema::tasks::dsl as t;
        let parent = parent.to_string();
        let task = task.to_string();
        self.blocking(move |conn| {
            let deleted = diesel::delete(
                t::tasks
                    .filter(t::id.eq(&task))
                    .filter(t::parent_id.eq(&parent)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(task_not_found(&task));
            }
            Ok(())
        })
        .await
    }

    pub async fn list_tasks(&self, parent: &str, enabled_only: bool) -> Result<Vec<Task>, StorageError> {
        use schema::tasks::dsl as t;
        let parent = parent.to_string();
        self.blocking(move |conn| {
            let rows = t::tasks
                .filter(t::parent_id.eq(&parent))
                .order((t::created_at.asc(), t::id.asc()))
                .load::<Task>(conn)?;
            if enabled_only {
                return Ok(rows.into_iter().filter(|t| t.enabled).collect());
            }
            Ok(rows)
        })
        .await
    }

    // Completions and rewards

    /// Records that `child` finished `task` on `today` and accrues rewards.
    ///
    /// Runs as one IMMEDIATE transaction: the completion, its star, the star
    /// recount and the milestone sticker either all land or none do, and two
    /// completions for the same child can never evaluate the same milestone.
    pub async fn complete_task(
        &self,
        parent: &str,
        child: &str,
        task: &str,
        today: NaiveDate,
    ) -> Result<CompletionOutcome, StorageError> {
        use schema::{completions, rewards as rw};
        let parent = parent.to_string();
        let child = child.to_string();
        let task = task.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<CompletionOutcome, StorageError> {
                owned_child(conn, &parent, &child)?;
                owned_task(conn, &parent, &task)?;
                let threshold = load_threshold(conn, &parent)?;
                let held: HashSet<String> = load_sticker_ids(conn, &child)?.into_iter().collect();

                let completion = Completion {
                    id: new_id(),
                    child_id: child.clone(),
                    task_id: task.clone(),
                    date: today,
                    created_at: now(),
                };
                diesel::insert_into(completions::table)
                    .values(&completion)
                    .execute(conn)?;

                let star = Reward {
                    id: new_id(),
                    child_id: child.clone(),
                    kind: RewardKind::Star.as_str().to_string(),
                    sticker_id: None,
                    created_at: now(),
                };
                diesel::insert_into(rw::table).values(&star).execute(conn)?;

                let star_count = count_stars(conn, &child)?;

                let mut rng = rand::thread_rng();
                let new_sticker =
                    match rewards::milestone_sticker(star_count, threshold, &held, &mut rng) {
                        Some(sticker) => {
                            let row = Reward {
                                id: new_id(),
                                child_id: child.clone(),
                                kind: RewardKind::Sticker.as_str().to_string(),
                                sticker_id: Some(sticker.id.to_string()),
                                created_at: now(),
                            };
                            diesel::insert_into(rw::table).values(&row).execute(conn)?;
                            info!(child_id = %child, sticker = sticker.id, star_count, "storage: sticker unlocked");
                            Some(row)
                        }
                        None => None,
                    };

                debug!(child_id = %child, task_id = %task, star_count, "storage: task completed");
                Ok(CompletionOutcome {
                    completion,
                    star_count,
                    new_sticker,
                })
            })
        })
        .await
    }

    pub async fn today_completions(
        &self,
        parent: &str,
        child: &str,
        today: NaiveDate,
    ) -> Result<Vec<Completion>, StorageError> {
        use schema::completions::dsl as cp;
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| {
            owned_child(conn, &parent, &child)?;
            Ok(cp::completions
                .filter(cp::child_id.eq(&child))
                .filter(cp::date.eq(today))
                .order(cp::created_at.asc())
                .load::<Completion>(conn)?)
        })
        .await
    }

    /// Completions dated within the seven days before `today`, plus `today`.
    pub async fn weekly_stats(
        &self,
        parent: &str,
        child: &str,
        today: NaiveDate,
    ) -> Result<WeeklyStats, StorageError> {
        use schema::{completions, tasks};
        let parent = parent.to_string();
        let child = child.to_string();
        let since = today - Duration::days(7);
        self.blocking(move |conn| {
            owned_child(conn, &parent, &child)?;
            let rows: Vec<(NaiveDate, String)> = completions::table
                .inner_join(tasks::table)
                .filter(completions::child_id.eq(&child))
                .filter(completions::date.ge(since))
                .select((completions::date, tasks::title))
                .load(conn)?;
            Ok(WeeklyStats::from_rows(rows))
        })
        .await
    }

    pub async fn reward_summary(&self, parent: &str, child: &str) -> Result<RewardSummary, StorageError> {
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| {
            let c = owned_child(conn, &parent, &child)?;
            let star_count = count_stars(conn, &child)?;
            let sticker_ids = load_sticker_ids(conn, &child)?;
            Ok(RewardSummary {
                child: c,
                star_count,
                sticker_ids,
            })
        })
        .await
    }

    pub async fn star_count(&self, child: &str) -> Result<i64, StorageError> {
        let child = child.to_string();
        self.blocking(move |conn| count_stars(conn, &child)).await
    }

    /// Wipes every completion and reward of the child in one transaction.
    pub async fn reset_child_progress(&self, parent: &str, child: &str) -> Result<(), StorageError> {
        use schema::completions::dsl as cp;
        use schema::rewards::dsl as r;
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                owned_child(conn, &parent, &child)?;
                let completions = diesel::delete(cp::completions.filter(cp::child_id.eq(&child)))
                    .execute(conn)?;
                let rewards =
                    diesel::delete(r::rewards.filter(r::child_id.eq(&child))).execute(conn)?;
                info!(child_id = %child, completions, rewards, "storage: child progress reset");
                Ok(())
            })
        })
        .await
    }

    /// Wipes the child's rewards; completion history stays.
    pub async fn reset_child_rewards(&self, parent: &str, child: &str) -> Result<(), StorageError> {
        use schema::rewards::dsl as r;
        let parent = parent.to_string();
        let child = child.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                owned_child(conn, &parent, &child)?;
                let rewards =
                    diesel::delete(r::rewards.filter(r::child_id.eq(&child))).execute(conn)?;
                info!(child_id = %child, rewards, "storage: child rewards reset");
                Ok(())
            })
        })
        .await
    }

    // Settings

    /// Returns the user's settings, creating the default row on first access.
    pub async fn get_or_create_settings(&self, user: &str) -> Result<AppSettings, StorageError> {
        use schema::app_settings::dsl as s;
        let user = user.to_string();
        self.blocking(move |conn| {
            let row = AppSettings {
                user_id: user.clone(),
                sticker_threshold: i32::from(StickerThreshold::DEFAULT.get()),
            };
            diesel::insert_into(s::app_settings)
                .values(&row)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(s::app_settings
                .filter(s::user_id.eq(&user))
                .first::<AppSettings>(conn)?)
        })
        .await
    }

    pub async fn update_sticker_threshold(
        &self,
        user: &str,
        threshold: StickerThreshold,
    ) -> Result<AppSettings, StorageError> {
        use schema::app_settings::dsl as s;
        let row = AppSettings {
            user_id: user.to_string(),
            sticker_threshold: i32::from(threshold.get()),
        };
        self.blocking(move |conn| {
            diesel::insert_into(s::app_settings)
                .values(&row)
                .on_conflict(s::user_id)
                .do_update()
                .set(s::sticker_threshold.eq(row.sticker_threshold))
                .execute(conn)?;
            Ok(row)
        })
        .await
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn child_not_found(id: &str) -> StorageError {
    StorageError::NotFound(format!("child not found: {}", id))
}

fn task_not_found(id: &str) -> StorageError {
    StorageError::NotFound(format!("task not found: {}", id))
}

fn owned_child(conn: &mut SqliteConnection, parent: &str, child: &str) -> Result<Child, StorageError> {
    use schema::children::dsl as c;
    c::children
        .filter(c::id.eq(child))
        .filter(c::parent_id.eq(parent))
        .first::<Child>(conn)
        .optional()?
        .ok_or_else(|| child_not_found(child))
}

fn owned_task(conn: &mut SqliteConnection, parent: &str, task: &str) -> Result<Task, StorageError> {
    use schema::tasks::dsl as t;
    t::tasks
        .filter(t::id.eq(task))
        .filter(t::parent_id.eq(parent))
        .first::<Task>(conn)
        .optional()?
        .ok_or_else(|| task_not_found(task))
}

fn load_children(conn: &mut SqliteConnection, parent: &str) -> Result<Vec<Child>, StorageError> {
    use schema::children::dsl as c;
    Ok(c::children
        .filter(c::parent_id.eq(parent))
        .order((c::created_at.asc(), c::id.asc()))
        .load::<Child>(conn)?)
}

fn load_threshold(conn: &mut SqliteConnection, user: &str) -> Result<StickerThreshold, StorageError> {
    use schema::app_settings::dsl as s;
    let row = s::app_settings
        .filter(s::user_id.eq(user))
        .first::<AppSettings>(conn)
        .optional()?;
    Ok(row.map(|r| r.threshold()).unwrap_or_default())
}

fn count_stars(conn: &mut SqliteConnection, child: &str) -> Result<i64, StorageError> {
    use schema::rewards::dsl as r;
    Ok(r::rewards
        .filter(r::child_id.eq(child))
        .filter(r::kind.eq(RewardKind::Star.as_str()))
        .count()
        .get_result::<i64>(conn)?)
}

fn load_sticker_ids(conn: &mut SqliteConnection, child: &str) -> Result<Vec<String>, StorageError> {
    use schema::rewards::dsl as r;
    let ids: Vec<Option<String>> = r::rewards
        .filter(r::child_id.eq(child))
        .filter(r::kind.eq(RewardKind::Sticker.as_str()))
        .order((r::created_at.asc(), r::id.asc()))
        .select(r::sticker_id)
        .load(conn)?;
    Ok(ids.into_iter().flatten().collect())
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // WAL for read/write concurrency, a busy timeout for writers queueing on
    // IMMEDIATE transactions, and FK enforcement for cascading deletes.
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn weekly_stats_groups_by_date_and_title() {
        let stats = WeeklyStats::from_rows(vec![
            (d("2026-10-12"), "Brush teeth".to_string()),
            (d("2026-10-12"), "Read a book".to_string()),
            (d("2026-10-13"), "Brush teeth".to_string()),
        ]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_date[&d("2026-10-12")], 2);
        assert_eq!(stats.by_task["Brush teeth"], 2);
        assert_eq!(stats.by_date.values().sum::<i64>(), stats.total);
        assert_eq!(stats.by_task.values().sum::<i64>(), stats.total);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Pat@Example.COM "), "pat@example.com");
    }
}
