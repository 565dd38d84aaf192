//! PostgreSQL-backed [`UserStore`] (schema in `sql/schema.sql`).

use super::models::{NewUser, NewVerificationToken, User};
use super::store::{ActivationOutcome, SignupOutcome, UserStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password: row.get("password"),
        email: row.get("email"),
        created: row.get("created"),
        enabled: row.get("enabled"),
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user_with_token(
        &self,
        user: &NewUser,
        token: &NewVerificationToken,
    ) -> Result<SignupOutcome> {
        let mut tx = self.pool.begin().await.context("begin signup transaction")?;

        let query = r"
            INSERT INTO users (username, password, email, created, enabled)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, username, password, email, created, enabled
        ";
        let row = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.created)
            .fetch_one(&mut *tx)
            .instrument(query_span("INSERT", query))
            .await;

        let created = match row {
            Ok(row) => user_from_row(&row),
            Err(err) => {
                if is_unique_violation(&err) {
                    let _ = tx.rollback().await;
                    return Ok(SignupOutcome::Conflict);
                }
                return Err(err).context("failed to insert user");
            }
        };

        let query = r"
            INSERT INTO verification_tokens (token_hash, user_id, created, expires_at)
            VALUES ($1, $2, $3, $4)
        ";
        sqlx::query(query)
            .bind(&token.token_hash)
            .bind(created.id)
            .bind(token.created)
            .bind(token.expires_at)
            .execute(&mut *tx)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert verification token")?;

        tx.commit().await.context("commit signup transaction")?;

        Ok(SignupOutcome::Created(created))
    }

    async fn activate_by_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin activation transaction")?;

        // Row lock makes a racing second presentation wait, then see it consumed.
        let query = r"
            SELECT id, user_id
            FROM verification_tokens
            WHERE token_hash = $1
              AND consumed_at IS NULL
              AND expires_at > $2
            FOR UPDATE
        ";
        let token = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&mut *tx)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup verification token")?;

        let Some(token) = token else {
            let _ = tx.rollback().await;
            return Ok(ActivationOutcome::InvalidToken);
        };
        let token_id: i64 = token.get("id");
        let user_id: i64 = token.get("user_id");

        let query = r"
            UPDATE users
            SET enabled = TRUE
            WHERE id = $1
            RETURNING id, username, password, email, created, enabled
        ";
        let user = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to enable user")?;

        let Some(user) = user else {
            let _ = tx.rollback().await;
            return Ok(ActivationOutcome::UserNotFound);
        };

        let query = "UPDATE verification_tokens SET consumed_at = $2 WHERE id = $1";
        sqlx::query(query)
            .bind(token_id)
            .bind(now)
            .execute(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to consume verification token")?;

        tx.commit().await.context("commit activation transaction")?;

        Ok(ActivationOutcome::Activated(user_from_row(&user)))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = r"
            SELECT id, username, password, email, created, enabled
            FROM users
            WHERE username = $1
        ";
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")
    }
}
