use anyhow::Result;
use aws_config::BehaviorVersion;
use std::env;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, init_pool};
use tokio::net::TcpListener;

use catalog::{
    blob::S3BlobStore,
    database,
    images::ImageLifecycle,
    jwt::{JwtConfig, JwtService},
    otp::OtpConfig,
    repositories::{ProductRepository, UserRepository},
    routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting catalog service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::init_schema(&pool).await?;

    // Initialize the S3-backed blob store
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&config);
    let bucket_name =
        env::var("IMAGE_BUCKET_NAME").unwrap_or_else(|_| "catalog-images".to_string());
    let blob_store = Arc::new(S3BlobStore::new(s3_client, bucket_name));

    // Load token and OTP configuration
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config);
    let otp_config = OtpConfig::from_env();
    if otp_config.demo_mode {
        warn!("DEMO_MODE is enabled; one-time codes are echoed in responses");
    }

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let product_repository = ProductRepository::new(pool.clone());

    let app_state = AppState {
        db_pool: pool,
        user_repository,
        product_repository,
        jwt_service,
        otp_config,
        images: ImageLifecycle::new(blob_store),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let port = env::var("PORT").unwrap_or_else(|_| "5001".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Catalog service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
