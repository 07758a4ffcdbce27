//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User entity
///
/// Exactly one of `email` and `phone` is set at creation; both carry unique
/// indexes. The OTP fields hold the currently outstanding code, if any, and
/// are cleared by a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The contact channel this user signed up with
    pub fn contact(&self) -> &str {
        self.email
            .as_deref()
            .or(self.phone.as_deref())
            .unwrap_or_default()
    }
}

/// User payload for responses; never exposes the OTP fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_verified: user.is_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Login request carrying the contact channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email_or_phone: String,
}

/// Login response: where the code went, and who to verify as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub masked_contact: String,
    /// Present only when demo mode is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_otp: Option<String>,
}

/// OTP verification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub otp: String,
}

/// OTP verification response: the session token and the verified user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub token: String,
    pub user: UserResponse,
}

/// OTP resend request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendOtpRequest {
    pub user_id: Uuid,
}

/// OTP resend response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendOtpResponse {
    pub masked_contact: String,
    /// Present only when demo mode is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_otp: Option<String>,
}
