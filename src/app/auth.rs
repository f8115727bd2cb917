use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::error::ErrorKind;
use sqlx::Row;
use time::{Duration, OffsetDateTime};

use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: i64,
}

/// A freshly issued session. The raw token is returned to the caller once;
/// only its digest is persisted.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Registration failure, classified structurally from the store's error
/// kind rather than by callers matching message text.
#[derive(Debug)]
pub enum RegisterError {
    UsernameTaken,
    EmailTaken,
    Database(anyhow::Error),
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, session_ttl_hours: u64) -> Self {
        Self {
            db,
            session_ttl_hours,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, RegisterError> {
        let password_hash = hash_password(password).map_err(RegisterError::Database)?;

        // Explicit transaction: fetching the RETURNING row does not step the
        // statement to completion, so without a commit the insert stays
        // pending on the pooled connection.
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|err| RegisterError::Database(err.into()))?;

        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash) \
             VALUES (?1, ?2, ?3) \
             RETURNING id, username, email",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify_insert_error)?;

        tx.commit()
            .await
            .map_err(|err| RegisterError::Database(err.into()))?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<SessionToken>> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: i64 = row.get("id");
        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let token = generate_token();
        let expires_at =
            OffsetDateTime::now_utc() + Duration::hours(self.session_ttl_hours as i64);

        sqlx::query("INSERT INTO sessions (user_id, token_hash, expires_at) VALUES (?1, ?2, ?3)")
            .bind(user_id)
            .bind(hash_token(&token))
            .bind(expires_at.unix_timestamp())
            .execute(self.db.pool())
            .await?;

        Ok(Some(SessionToken { token, expires_at }))
    }

    pub async fn authenticate(&self, token: &str) -> Result<Option<AuthSession>> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let row = sqlx::query(
            "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
        )
        .bind(hash_token(token))
        .bind(now)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| AuthSession {
            user_id: row.get("user_id"),
        }))
    }
}

fn classify_insert_error(err: sqlx::Error) -> RegisterError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), ErrorKind::UniqueViolation) {
            let message = db_err.message();
            if message.contains("users.username") {
                return RegisterError::UsernameTaken;
            }
            if message.contains("users.email") {
                return RegisterError::EmailTaken;
            }
        }
    }
    RegisterError::Database(err.into())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}
