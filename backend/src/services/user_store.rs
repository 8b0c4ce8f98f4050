//! Persistence for users, profiles and login sessions
//!
//! `PgUserStore` is used in production; `MemoryUserStore` backs router tests
//! and database-less development runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shared::{Profile, Session, SessionStatus, User};

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Cheap connectivity check for the health endpoint
    async fn ping(&self) -> AppResult<()>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn username_taken(&self, username: &str) -> AppResult<bool>;

    /// Insert a user together with its profile
    async fn create_user(&self, user: &User, profile: &Profile) -> AppResult<()>;

    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>>;

    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    async fn create_session(&self, session: &Session) -> AppResult<()>;

    /// Whether an active session holds this refresh token hash
    async fn has_active_session(&self, user_id: Uuid, refresh_token_hash: &str) -> AppResult<bool>;

    /// Revoke every active session of a user, returning how many were revoked
    async fn revoke_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    email_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            email_verified: row.email_verified,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    username: String,
    full_name: String,
    avatar_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    website: Option<String>,
    preferences: Option<serde_json::Value>,
    last_seen: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            bio: row.bio,
            location: row.location,
            website: row.website,
            preferences: row.preferences,
            last_seen: row.last_seen,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, email_verified, is_active, created_at, updated_at";

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn create_user(&self, user: &User, profile: &Profile) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, email_verified, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.email_verified)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, username, full_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(user.id)
        .bind(&profile.username)
        .bind(&profile.full_name)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT username, full_name, avatar_url, bio, location, website, preferences, last_seen
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Profile::from))
    }

    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE profiles SET last_seen = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions
                (id, user_id, session_token, refresh_token_hash, ip_address, expires_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.session_token)
        .bind(&session.refresh_token_hash)
        .bind(&session.ip_address)
        .bind(session.expires_at)
        .bind(session.status.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn has_active_session(&self, user_id: Uuid, refresh_token_hash: &str) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM user_sessions
            WHERE user_id = $1 AND refresh_token_hash = $2 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(refresh_token_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    async fn revoke_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions SET status = 'revoked', revoked_at = $2
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
struct MemoryTables {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    sessions: Vec<Session>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<std::sync::RwLockReadGuard<'_, MemoryTables>> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<std::sync::RwLockWriteGuard<'_, MemoryTables>> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        Ok(self.read()?.profiles.values().any(|p| p.username == username))
    }

    async fn create_user(&self, user: &User, profile: &Profile) -> AppResult<()> {
        let mut tables = self.write()?;
        tables.users.insert(user.id, user.clone());
        tables.profiles.insert(user.id, profile.clone());
        Ok(())
    }

    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(profile) = self.write()?.profiles.get_mut(&user_id) {
            profile.last_seen = Some(at);
        }
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> AppResult<()> {
        self.write()?.sessions.push(session.clone());
        Ok(())
    }

    async fn has_active_session(&self, user_id: Uuid, refresh_token_hash: &str) -> AppResult<bool> {
        Ok(self.read()?.sessions.iter().any(|s| {
            s.user_id == user_id
                && s.refresh_token_hash == refresh_token_hash
                && s.status == SessionStatus::Active
        }))
    }

    async fn revoke_sessions(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.write()?;
        let mut revoked = 0;
        for session in tables
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Active)
        {
            session.status = SessionStatus::Revoked;
            session.revoked_at = Some(at);
            revoked += 1;
        }
        Ok(revoked)
    }
}
