//! User repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with the given contact details
    pub async fn create(&self, email: Option<&str>, phone: Option<&str>) -> Result<User> {
        info!("Creating new user");

        let row = sqlx::query(
            r#"
            INSERT INTO users (email, phone)
            VALUES ($1, $2)
            RETURNING id, email, phone, otp_code, otp_expires_at, is_verified,
                      last_login_at, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        let user = User {
            id: row.get("id"),
            email: row.get("email"),
            phone: row.get("phone"),
            otp_code: row.get("otp_code"),
            otp_expires_at: row.get("otp_expires_at"),
            is_verified: row.get("is_verified"),
            last_login_at: row.get("last_login_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        };

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        info!("Finding user by ID: {}", id);

        let row = sqlx::query(
            r#"
            SELECT id, email, phone, otp_code, otp_expires_at, is_verified,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = User {
                    id: row.get("id"),
                    email: row.get("email"),
                    phone: row.get("phone"),
                    otp_code: row.get("otp_code"),
                    otp_expires_at: row.get("otp_expires_at"),
                    is_verified: row.get("is_verified"),
                    last_login_at: row.get("last_login_at"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                };
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Find a user by email address
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        info!("Finding user by email");

        let row = sqlx::query(
            r#"
            SELECT id, email, phone, otp_code, otp_expires_at, is_verified,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = User {
                    id: row.get("id"),
                    email: row.get("email"),
                    phone: row.get("phone"),
                    otp_code: row.get("otp_code"),
                    otp_expires_at: row.get("otp_expires_at"),
                    is_verified: row.get("is_verified"),
                    last_login_at: row.get("last_login_at"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                };
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Find a user by phone number
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        info!("Finding user by phone");

        let row = sqlx::query(
            r#"
            SELECT id, email, phone, otp_code, otp_expires_at, is_verified,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = User {
                    id: row.get("id"),
                    email: row.get("email"),
                    phone: row.get("phone"),
                    otp_code: row.get("otp_code"),
                    otp_expires_at: row.get("otp_expires_at"),
                    is_verified: row.get("is_verified"),
                    last_login_at: row.get("last_login_at"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                };
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Store a fresh verification code, replacing any previous one
    pub async fn set_otp(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        info!("Storing verification code for user {}", user_id);

        sqlx::query(
            r#"
            UPDATE users
            SET otp_code = $2, otp_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clear the verification code, mark the user verified and stamp the login time
    pub async fn complete_verification(&self, user_id: Uuid) -> Result<Option<User>> {
        info!("Completing verification for user {}", user_id);

        let row = sqlx::query(
            r#"
            UPDATE users
            SET otp_code = NULL, otp_expires_at = NULL, is_verified = TRUE,
                last_login_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, phone, otp_code, otp_expires_at, is_verified,
                      last_login_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = User {
                    id: row.get("id"),
                    email: row.get("email"),
                    phone: row.get("phone"),
                    otp_code: row.get("otp_code"),
                    otp_expires_at: row.get("otp_expires_at"),
                    is_verified: row.get("is_verified"),
                    last_login_at: row.get("last_login_at"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                };
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}
