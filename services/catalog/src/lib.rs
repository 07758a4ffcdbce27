//! Catalog service
//!
//! A multi-tenant product catalog: OTP login over an email or phone contact,
//! bearer-token sessions, and product CRUD with image attachments kept in a
//! blob store.

pub mod blob;
pub mod database;
pub mod error;
pub mod forms;
pub mod images;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod otp;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;
