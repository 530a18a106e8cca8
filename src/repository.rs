use crate::models::{
    Announcement, Problem, UpdateAnnouncementRequest, UpdateUserRequest, User, UserProfile,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;

/// Failure of the persistence layer. Handlers surface it as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Which announcements a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnouncementScope {
    /// `None` lists global announcements, `Some(id)` those of one contest.
    pub contest_id: Option<i64>,
    /// When set, hidden announcements are left out.
    pub shown_only: bool,
}

/// Repository Trait
///
/// The narrow persistence interface the business handlers use. The dispatch core never
/// calls it directly; only handlers and the authentication layer do.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` usable across request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;
    // Users seen within the last few minutes.
    async fn online_users(&self) -> RepositoryResult<Vec<User>>;
    async fn user_profile(&self, id: i64) -> RepositoryResult<Option<UserProfile>>;
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepositoryResult<Option<User>>;
    // Returns the stored show name, or None when the user does not exist.
    async fn update_show_name(&self, id: i64, show_name: String) -> RepositoryResult<Option<String>>;

    // --- Announcements ---
    async fn list_announcements(&self, scope: AnnouncementScope) -> RepositoryResult<Vec<Announcement>>;
    async fn create_announcement(&self, value: String, contest_id: Option<i64>) -> RepositoryResult<Announcement>;
    // Returns the removed row.
    async fn delete_announcement(&self, id: i64) -> RepositoryResult<Option<Announcement>>;
    async fn set_announcement_visibility(&self, id: i64, show: bool) -> RepositoryResult<Option<Announcement>>;
    async fn update_announcement(
        &self,
        id: i64,
        req: UpdateAnnouncementRequest,
    ) -> RepositoryResult<Option<Announcement>>;

    // --- Problems ---
    async fn list_problems(&self, search: Option<String>) -> RepositoryResult<Vec<Problem>>;
    async fn find_problem(&self, id: i64) -> RepositoryResult<Option<Problem>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, show_name, role, rating";
const ANNOUNCEMENT_COLUMNS: &str = "id, value, show, contest_id, created_at, updated_at";
const PROBLEM_COLUMNS: &str = "id, name, sname, score, time_limit, memory_limit";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    /// online_users
    ///
    /// `last_seen_at` is refreshed by the judge connection; five minutes of silence
    /// counts as offline.
    async fn online_users(&self) -> RepositoryResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE last_seen_at > NOW() - INTERVAL '5 minutes' ORDER BY id"
        );
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn user_profile(&self, id: i64) -> RepositoryResult<Option<UserProfile>> {
        Ok(sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, show_name, rating FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// update_user
    ///
    /// Uses `COALESCE` so only the provided fields change.
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepositoryResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                show_name = COALESCE($3, show_name),
                role = COALESCE($4, role),
                rating = COALESCE($5, rating)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(req.username)
            .bind(req.show_name)
            .bind(req.role)
            .bind(req.rating)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_show_name(&self, id: i64, show_name: String) -> RepositoryResult<Option<String>> {
        Ok(
            sqlx::query_scalar::<_, String>(
                "UPDATE users SET show_name = $2 WHERE id = $1 RETURNING show_name",
            )
            .bind(id)
            .bind(show_name)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    /// list_announcements
    ///
    /// Builds the filter with QueryBuilder so every value stays a bound parameter.
    async fn list_announcements(&self, scope: AnnouncementScope) -> RepositoryResult<Vec<Announcement>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE "));

        match scope.contest_id {
            Some(contest_id) => {
                builder.push("contest_id = ");
                builder.push_bind(contest_id);
            }
            None => {
                builder.push("contest_id IS NULL");
            }
        }

        if scope.shown_only {
            builder.push(" AND show = true");
        }

        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Announcement>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// create_announcement
    ///
    /// New announcements are visible immediately.
    async fn create_announcement(&self, value: String, contest_id: Option<i64>) -> RepositoryResult<Announcement> {
        let sql = format!(
            "INSERT INTO announcements (value, show, contest_id, created_at, updated_at) \
             VALUES ($1, true, $2, NOW(), NOW()) RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(value)
            .bind(contest_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_announcement(&self, id: i64) -> RepositoryResult<Option<Announcement>> {
        let sql = format!("DELETE FROM announcements WHERE id = $1 RETURNING {ANNOUNCEMENT_COLUMNS}");
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_announcement_visibility(&self, id: i64, show: bool) -> RepositoryResult<Option<Announcement>> {
        let sql = format!(
            "UPDATE announcements SET show = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .bind(show)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_announcement(
        &self,
        id: i64,
        req: UpdateAnnouncementRequest,
    ) -> RepositoryResult<Option<Announcement>> {
        let sql = format!(
            r#"
            UPDATE announcements
            SET value = COALESCE($2, value),
                show = COALESCE($3, show),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .bind(req.value)
            .bind(req.show)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_problems
    ///
    /// Optional case-insensitive search over the problem name and short name.
    async fn list_problems(&self, search: Option<String>) -> RepositoryResult<Vec<Problem>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {PROBLEM_COLUMNS} FROM problems"));

        if let Some(s) = search {
            let pattern = format!("%{}%", escape_like(&s));
            builder.push(" WHERE name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR sname ILIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\'");
        }

        builder.push(" ORDER BY id");

        Ok(builder.build_query_as::<Problem>().fetch_all(&self.pool).await?)
    }

    async fn find_problem(&self, id: i64) -> RepositoryResult<Option<Problem>> {
        let sql = format!("SELECT {PROBLEM_COLUMNS} FROM problems WHERE id = $1");
        Ok(sqlx::query_as::<_, Problem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

/// Escapes `%`, `_` and the escape character itself so user text matches literally
/// inside an `ILIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
