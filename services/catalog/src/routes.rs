//! Catalog service routes

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use chrono::Utc;
use serde_json::json;
use std::env;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    blob::BlobError,
    error::ApiError,
    forms,
    images::ImageLifecycle,
    middleware::{CurrentUser, auth_middleware},
    models::{
        LoginRequest, LoginResponse, Product, ProductListQuery, ResendOtpRequest,
        ResendOtpResponse, User, UserResponse, VerifyOtpRequest, VerifyOtpResponse,
    },
    otp::{self, OtpCheck},
    response::ApiResponse,
    state::AppState,
    validation::{ContactKind, canonicalize_contact},
};

// 10 files at 5 MiB each, plus scalar fields and multipart framing
const UPLOAD_BODY_LIMIT: usize = 55 * 1024 * 1024;

/// Create the router for the catalog service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/me", get(get_current_user))
        .route("/api/products", get(list_products))
        .route("/api/products", post(create_product))
        .route("/api/products/:id", get(get_product))
        .route("/api/products/:id", put(update_product))
        .route("/api/products/:id", delete(delete_product))
        .route("/api/products/:id/publish", patch(toggle_publish))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .route("/", get(root_status))
        .route("/api/health", get(health_check))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/resend-otp", post(resend_otp))
        .route("/api/products/image/:id", get(get_product_image))
        .merge(protected_routes)
        .with_state(state)
}

/// Root status banner, also used by hosting health checks
pub async fn root_status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Catalog API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match common::database::health_check(&state.db_pool).await {
        Ok(true) => "up",
        _ => "down",
    };

    Json(json!({
        "status": "ok",
        "service": "catalog-service",
        "database": database
    }))
}

/// Request a one-time code for an email address or phone number
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (kind, contact) = canonicalize_contact(&payload.email_or_phone)
        .map_err(|message| ApiError::validation("email_or_phone", message))?;

    let existing = match kind {
        ContactKind::Email => state.user_repository.find_by_email(&contact).await,
        ContactKind::Phone => state.user_repository.find_by_phone(&contact).await,
    }
    .map_err(|e| {
        tracing::error!("Failed to look up user: {}", e);
        ApiError::Internal
    })?;

    let user = match existing {
        Some(user) => user,
        None => {
            let (email, phone) = match kind {
                ContactKind::Email => (Some(contact.as_str()), None),
                ContactKind::Phone => (None, Some(contact.as_str())),
            };
            state
                .user_repository
                .create(email, phone)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create user: {}", e);
                    ApiError::Internal
                })?
        }
    };

    let (masked_contact, demo_otp) = issue_code(&state, &user).await?;

    Ok(ApiResponse::ok(
        "OTP sent successfully",
        LoginResponse {
            user_id: user.id,
            masked_contact,
            demo_otp,
        },
    ))
}

/// Verify a one-time code and mint a session token
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(payload.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    match otp::check_code(
        user.otp_code.as_deref(),
        user.otp_expires_at,
        payload.otp.trim(),
        Utc::now(),
    ) {
        OtpCheck::Valid => {}
        OtpCheck::Expired => return Err(ApiError::OtpExpired),
        OtpCheck::Mismatch => return Err(ApiError::OtpMismatch),
    }

    let user = state
        .user_repository
        .complete_verification(user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to complete verification: {}", e);
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    let token = state.jwt_service.generate_token(user.id).map_err(|e| {
        tracing::error!("Failed to mint session token: {}", e);
        ApiError::Internal
    })?;

    Ok(ApiResponse::ok(
        "Login successful",
        VerifyOtpResponse {
            token,
            user: UserResponse::from(&user),
        },
    ))
}

/// Replace any outstanding code with a fresh one
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(payload.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    let (masked_contact, demo_otp) = issue_code(&state, &user).await?;

    Ok(ApiResponse::ok(
        "OTP resent successfully",
        ResendOtpResponse {
            masked_contact,
            demo_otp,
        },
    ))
}

/// Generate, persist and deliver a fresh code for the user
///
/// Overwrites any outstanding code, which becomes permanently invalid.
async fn issue_code(state: &AppState, user: &User) -> Result<(String, Option<String>), ApiError> {
    let code = otp::generate_code();
    let expires_at = otp::expiry_from(Utc::now());

    state
        .user_repository
        .set_otp(user.id, &code, expires_at)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store verification code: {}", e);
            ApiError::Internal
        })?;

    let contact = user.contact();
    otp::log_delivery(contact, &code);

    let demo_otp = state.otp_config.demo_mode.then(|| code.clone());
    Ok((otp::mask_contact(contact), demo_otp))
}

/// Return the authenticated user
pub async fn get_current_user(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    ApiResponse::data(UserResponse::from(&current.user))
}

/// List the authenticated user's products, newest first
pub async fn list_products(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .product_repository
        .list_by_owner(current.id(), query.published)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list products: {}", e);
            ApiError::Internal
        })?;

    Ok(ApiResponse::list(products.len(), products))
}

/// Create a product from a multipart form with image uploads
pub async fn create_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = forms::parse_product_form(multipart).await?;

    // Fields are validated; store the uploads before touching the record
    let images = state
        .images
        .store_uploads(form.uploads)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store uploads: {}", e);
            ApiError::Upstream(e.to_string())
        })?;

    let product = match state
        .product_repository
        .create(current.id(), &form.input, &images)
        .await
    {
        Ok(product) => product,
        Err(e) => {
            tracing::error!("Failed to create product: {}", e);
            // The record never landed; reclaim the blobs stored above
            let ids = images.iter().map(|image| image.id).collect();
            state.images.delete_blobs(ids).await;
            return Err(ApiError::Internal);
        }
    };

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Product created successfully", product),
    ))
}

/// Fetch one of the authenticated user's products
pub async fn get_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = find_owned(&state, id, current.id(), "access").await?;

    Ok(ApiResponse::data(product))
}

/// Update a product's fields and reconcile its image list
pub async fn update_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let product = find_owned(&state, id, current.id(), "update").await?;
    let form = forms::parse_product_form(multipart).await?;

    let new_uploads = state
        .images
        .store_uploads(form.uploads)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store uploads: {}", e);
            ApiError::Upstream(e.to_string())
        })?;
    let upload_ids: Vec<Uuid> = new_uploads.iter().map(|image| image.id).collect();

    let plan = ImageLifecycle::reconcile(&product.images, &form.existing, new_uploads);

    let updated = match state
        .product_repository
        .update(id, &form.input, &plan.new_list)
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => {
            // Deleted out from under us; reclaim the new uploads
            state.images.delete_blobs(upload_ids).await;
            return Err(ApiError::NotFound("Product".to_string()));
        }
        Err(e) => {
            tracing::error!("Failed to update product {}: {}", id, e);
            state.images.delete_blobs(upload_ids).await;
            return Err(ApiError::Internal);
        }
    };

    // Dropped blobs go only after the record points at the new list
    let outcomes = state.images.delete_blobs(plan.to_delete).await;
    let failed = outcomes.iter().filter(|outcome| !outcome.ok).count();
    if failed > 0 {
        tracing::warn!(
            "{} image blob(s) could not be deleted while updating product {}",
            failed,
            id
        );
    }

    Ok(ApiResponse::ok("Product updated successfully", updated))
}

/// Delete a product and its image blobs
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = find_owned(&state, id, current.id(), "delete").await?;

    // Blob deletes run first; failures are swallowed per item
    let ids: Vec<Uuid> = product.images.iter().map(|image| image.id).collect();
    let outcomes = state.images.delete_blobs(ids).await;
    let failed = outcomes.iter().filter(|outcome| !outcome.ok).count();
    if failed > 0 {
        tracing::warn!(
            "{} image blob(s) could not be deleted while deleting product {}",
            failed,
            id
        );
    }

    let deleted = state.product_repository.delete(id).await.map_err(|e| {
        tracing::error!("Failed to delete product {}: {}", id, e);
        ApiError::Internal
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Product".to_string()));
    }

    Ok(ApiResponse::message("Product deleted successfully"))
}

/// Toggle a product's published flag
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = find_owned(&state, id, current.id(), "modify").await?;

    let updated = state
        .product_repository
        .set_published(id, !product.is_published)
        .await
        .map_err(|e| {
            tracing::error!("Failed to toggle publish for product {}: {}", id, e);
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::NotFound("Product".to_string()))?;

    let message = if updated.is_published {
        "Product published successfully"
    } else {
        "Product unpublished successfully"
    };

    Ok(ApiResponse::ok(message, updated))
}

/// Stream an image blob to any caller
///
/// Anonymous on purpose: identifiers are high-entropy UUIDs, and the
/// response is immutable and cacheable for a year.
pub async fn get_product_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let download = state.images.open(id).await.map_err(|e| match e {
        BlobError::NotFound => ApiError::NotFound("Image".to_string()),
        other => {
            tracing::error!("Failed to open blob {}: {}", id, other);
            ApiError::Upstream(other.to_string())
        }
    })?;

    let body = Body::from_stream(ReaderStream::new(download.reader));

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (header::CONTENT_LENGTH, download.length.to_string()),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        body,
    ))
}

/// Load a product, mapping absence to `NotFound` and foreign ownership to
/// `Forbidden`, in that order
async fn find_owned(
    state: &AppState,
    id: Uuid,
    owner: Uuid,
    action: &str,
) -> Result<Product, ApiError> {
    let product = state
        .product_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load product {}: {}", id, e);
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::NotFound("Product".to_string()))?;

    if product.created_by != owner {
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {} this product",
            action
        )));
    }

    Ok(product)
}
