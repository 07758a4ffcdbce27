//! Integration tests for the HTTP surface
//!
//! The database-backed tests drive the real router with `tower::ServiceExt`
//! against PostgreSQL and are ignored unless an instance is available.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use catalog::blob::MemoryBlobStore;
use catalog::images::ImageLifecycle;
use catalog::jwt::{JwtConfig, JwtService};
use catalog::models::{Category, ProductInput};
use catalog::otp::OtpConfig;
use catalog::repositories::{ProductRepository, UserRepository};
use catalog::routes::{create_router, root_status};
use catalog::state::AppState;
use common::database::{DatabaseConfig, init_pool};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Build application state against the configured database, with an
/// in-memory blob store standing in for S3
async fn build_state() -> Result<AppState, Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    catalog::database::init_schema(&pool).await?;

    Ok(AppState {
        db_pool: pool.clone(),
        user_repository: UserRepository::new(pool.clone()),
        product_repository: ProductRepository::new(pool),
        jwt_service: JwtService::new(JwtConfig {
            secret: "integration-test-secret".to_string(),
            token_expiry: 3600,
        }),
        otp_config: OtpConfig { demo_mode: false },
        images: ImageLifecycle::new(Arc::new(MemoryBlobStore::new())),
    })
}

/// Create a user with a unique email and mint a session token for it
async fn register_user(state: &AppState) -> Result<(Uuid, String), Box<dyn std::error::Error>> {
    let email = format!("owner-{}@example.com", Uuid::new_v4());
    let user = state.user_repository.create(Some(&email), None).await?;
    let token = state.jwt_service.generate_token(user.id)?;
    Ok((user.id, token))
}

fn sample_input(name: &str) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        category: Category::Electronics,
        stock_quantity: 4,
        list_price: 99.0,
        selling_price: 79.0,
        brand_name: "Acme".to_string(),
        exchange_eligible: false,
    }
}

async fn read_json(
    response: axum::response::Response,
) -> Result<Value, Box<dyn std::error::Error>> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn remove_users(state: &AppState, ids: Vec<Uuid>) -> TestResult {
    sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(ids)
        .execute(&state.db_pool)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_root_banner_reports_service_status() {
    let response = root_status().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Catalog API is running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["environment"].is_string());
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_login_treats_email_case_insensitively() -> TestResult {
    let state = build_state().await?;
    let app = create_router(state.clone());

    let shouty = format!("MiXeD-{}@Example.COM", Uuid::new_v4());
    let lower = shouty.to_lowercase();

    let mut user_ids = Vec::new();
    for contact in [shouty, lower] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "email_or_phone": contact }).to_string(),
                    ))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await?;
        let masked = body["data"]["masked_contact"].as_str().unwrap();
        assert!(masked.starts_with("mi"), "mask not lowercased: {}", masked);
        user_ids.push(Uuid::parse_str(body["data"]["user_id"].as_str().unwrap())?);
    }

    // Both spellings must land on one account
    assert_eq!(user_ids[0], user_ids[1]);

    remove_users(&state, vec![user_ids[0]]).await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_foreign_owner_cannot_touch_a_product() -> TestResult {
    let state = build_state().await?;
    let app = create_router(state.clone());

    let (owner_id, _) = register_user(&state).await?;
    let (intruder_id, intruder_token) = register_user(&state).await?;

    let product = state
        .product_repository
        .create(owner_id, &sample_input("Turntable"), &[])
        .await?;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/api/products/{}", product.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", intruder_token))
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=boundary",
                )
                .body(Body::from(
                    "--boundary\r\nContent-Disposition: form-data; \
                     name=\"name\"\r\n\r\nIntruder\r\n--boundary--\r\n",
                ))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized to update this product");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/products/{}", product.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", intruder_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri(format!("/api/products/{}/publish", product.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", intruder_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(format!("/api/products/{}", product.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", intruder_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let unchanged = state
        .product_repository
        .find_by_id(product.id)
        .await?
        .expect("product must survive foreign requests");
    assert_eq!(unchanged.name, "Turntable");
    assert!(!unchanged.is_published);

    state.product_repository.delete(product.id).await?;
    remove_users(&state, vec![owner_id, intruder_id]).await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_listing_is_scoped_to_the_requesting_owner() -> TestResult {
    let state = build_state().await?;
    let app = create_router(state.clone());

    let (owner_id, owner_token) = register_user(&state).await?;
    let (other_id, _) = register_user(&state).await?;

    let published = state
        .product_repository
        .create(owner_id, &sample_input("Amp"), &[])
        .await?;
    let published = state
        .product_repository
        .set_published(published.id, true)
        .await?
        .expect("product must still exist");
    let draft = state
        .product_repository
        .create(owner_id, &sample_input("Mixer"), &[])
        .await?;

    // Published so the filter alone cannot be what hides it
    let foreign = state
        .product_repository
        .create(other_id, &sample_input("Speaker"), &[])
        .await?;
    state
        .product_repository
        .set_published(foreign.id, true)
        .await?
        .expect("product must still exist");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/products?published=true")
                .header(header::AUTHORIZATION, format!("Bearer {}", owner_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["data"][0]["id"].as_str().unwrap(),
        published.id.to_string()
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/products")
                .header(header::AUTHORIZATION, format!("Bearer {}", owner_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await?;
    assert_eq!(body["count"], 2);
    let listed: HashSet<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert!(listed.contains(&published.id.to_string()));
    assert!(listed.contains(&draft.id.to_string()));
    assert!(!listed.contains(&foreign.id.to_string()));

    for id in [published.id, draft.id, foreign.id] {
        state.product_repository.delete(id).await?;
    }
    remove_users(&state, vec![owner_id, other_id]).await?;
    Ok(())
}
