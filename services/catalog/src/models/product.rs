//! Product model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed category set for product listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Foods,
    Electronics,
    Clothes,
    #[serde(rename = "Beauty Products")]
    BeautyProducts,
    Others,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Foods,
        Category::Electronics,
        Category::Clothes,
        Category::BeautyProducts,
        Category::Others,
    ];

    /// The wire and storage label for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Foods => "Foods",
            Category::Electronics => "Electronics",
            Category::Clothes => "Clothes",
            Category::BeautyProducts => "Beauty Products",
            Category::Others => "Others",
        }
    }

    /// Parse a category from its exact label
    pub fn parse(value: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == value)
    }
}

/// Reference to an image blob attached to a product
///
/// The identifier is the opaque blob name in the store; the filename and
/// content type are what the client declared at upload time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    pub stock_quantity: i32,
    pub list_price: f64,
    pub selling_price: f64,
    pub brand_name: String,
    pub images: Vec<ImageRef>,
    pub exchange_eligible: bool,
    pub is_published: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated scalar fields of a create/update request
///
/// Image handling happens separately; this is what the record store persists
/// besides the image list.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub category: Category,
    pub stock_quantity: i32,
    pub list_price: f64,
    pub selling_price: f64,
    pub brand_name: String,
    pub exchange_eligible: bool,
}

/// Query parameters accepted by the product list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProductListQuery {
    pub published: Option<bool>,
}
