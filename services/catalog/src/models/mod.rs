//! Catalog service models

pub mod product;
pub mod user;

// Re-export for convenience
pub use product::{Category, ImageRef, Product, ProductInput, ProductListQuery};
pub use user::{
    LoginRequest, LoginResponse, ResendOtpRequest, ResendOtpResponse, User, UserResponse,
    VerifyOtpRequest, VerifyOtpResponse,
};
