//! Application state shared across handlers

use sqlx::PgPool;

use crate::images::ImageLifecycle;
use crate::jwt::JwtService;
use crate::otp::OtpConfig;
use crate::repositories::{ProductRepository, UserRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub product_repository: ProductRepository,
    pub jwt_service: JwtService,
    pub otp_config: OtpConfig,
    pub images: ImageLifecycle,
}
