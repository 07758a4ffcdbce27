//! Multipart form parsing for product create and update
//!
//! Product payloads arrive as multipart form data: scalar fields, zero or
//! more `images` file parts, and (on update) `existing_images` parts naming
//! the previously stored blobs to keep. Parsing collects the raw parts
//! first, then validates them into a typed form.

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::images::{self, MAX_IMAGES_PER_REQUEST, PendingUpload};
use crate::models::{Category, ProductInput};

/// A fully parsed product form
#[derive(Debug)]
pub struct ProductForm {
    pub input: ProductInput,
    pub uploads: Vec<PendingUpload>,
    /// Blob identifiers the client wants to keep, in the order supplied
    pub existing: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct RawForm {
    name: Option<String>,
    category: Option<String>,
    stock_quantity: Option<String>,
    list_price: Option<String>,
    selling_price: Option<String>,
    brand_name: Option<String>,
    exchange_eligible: Option<String>,
    existing: Vec<String>,
    uploads: Vec<PendingUpload>,
}

/// Drain a multipart body into a validated product form
pub async fn parse_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut raw = RawForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation("body", format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "images" => {
                if raw.uploads.len() >= MAX_IMAGES_PER_REQUEST {
                    return Err(ApiError::validation(
                        "images",
                        format!(
                            "At most {} images are allowed per request",
                            MAX_IMAGES_PER_REQUEST
                        ),
                    ));
                }

                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::validation("images", format!("Failed to read upload: {}", e))
                })?;

                images::check_upload(&content_type, data.len())
                    .map_err(|message| ApiError::validation("images", message))?;

                raw.uploads.push(PendingUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "existing_images" => raw.existing.push(read_text(field, "existing_images").await?),
            "name" => raw.name = Some(read_text(field, "name").await?),
            "category" => raw.category = Some(read_text(field, "category").await?),
            "stock_quantity" => {
                raw.stock_quantity = Some(read_text(field, "stock_quantity").await?)
            }
            "list_price" => raw.list_price = Some(read_text(field, "list_price").await?),
            "selling_price" => raw.selling_price = Some(read_text(field, "selling_price").await?),
            "brand_name" => raw.brand_name = Some(read_text(field, "brand_name").await?),
            "exchange_eligible" => {
                raw.exchange_eligible = Some(read_text(field, "exchange_eligible").await?)
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    build(raw)
}

async fn read_text(field: Field<'_>, what: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(what, format!("Failed to read field: {}", e)))
}

fn build(raw: RawForm) -> Result<ProductForm, ApiError> {
    let name = required_field(raw.name, "name", "Product name")?;
    let category = required_field(raw.category, "category", "Category")?;
    let category = Category::parse(&category).ok_or_else(|| {
        let allowed: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        ApiError::validation(
            "category",
            format!("Category must be one of: {}", allowed.join(", ")),
        )
    })?;

    let stock_quantity = required_field(raw.stock_quantity, "stock_quantity", "Stock quantity")?
        .parse::<i32>()
        .ok()
        .filter(|quantity| *quantity >= 0)
        .ok_or_else(|| {
            ApiError::validation(
                "stock_quantity",
                "Stock quantity must be a non-negative integer",
            )
        })?;

    let list_price = parse_price(raw.list_price, "list_price", "List price")?;
    let selling_price = parse_price(raw.selling_price, "selling_price", "Selling price")?;
    let brand_name = required_field(raw.brand_name, "brand_name", "Brand name")?;
    let exchange_eligible = parse_flag(raw.exchange_eligible)?;
    let existing = parse_existing_images(&raw.existing)?;

    Ok(ProductForm {
        input: ProductInput {
            name,
            category,
            stock_quantity,
            list_price,
            selling_price,
            brand_name,
            exchange_eligible,
        },
        uploads: raw.uploads,
        existing,
    })
}

fn required_field(value: Option<String>, field: &str, label: &str) -> Result<String, ApiError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(ApiError::validation(field, format!("{} is required", label)));
    }

    Ok(value)
}

fn parse_price(value: Option<String>, field: &str, label: &str) -> Result<f64, ApiError> {
    required_field(value, field, label)?
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
        .ok_or_else(|| {
            ApiError::validation(field, format!("{} must be a non-negative number", label))
        })
}

/// Parse the exchange-eligibility flag
///
/// `true`/`false` are canonical; the legacy client sent `Yes`/`No`, which
/// remain accepted. An absent field defaults to false.
fn parse_flag(value: Option<String>) -> Result<bool, ApiError> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" => Ok(false),
        "true" | "yes" => Ok(true),
        _ => Err(ApiError::validation(
            "exchange_eligible",
            "Exchange eligibility must be true/false or Yes/No",
        )),
    }
}

/// Parse retained image identifiers
///
/// Clients either repeat the `existing_images` field once per identifier,
/// or send a single field holding a JSON array of identifier strings or of
/// full image-reference objects (the web client serializes whole objects).
fn parse_existing_images(values: &[String]) -> Result<Vec<Uuid>, ApiError> {
    if values.len() == 1 && values[0].trim_start().starts_with('[') {
        let array: Vec<Value> = serde_json::from_str(&values[0]).map_err(|_| {
            ApiError::validation("existing_images", "existing_images is not a valid JSON array")
        })?;

        return array.iter().map(existing_image_id).collect();
    }

    values
        .iter()
        .map(|value| parse_blob_id(value.trim()))
        .collect()
}

fn existing_image_id(value: &Value) -> Result<Uuid, ApiError> {
    let id = match value {
        Value::String(id) => id.as_str(),
        Value::Object(fields) => fields.get("id").and_then(Value::as_str).ok_or_else(|| {
            ApiError::validation(
                "existing_images",
                "Image reference objects must carry an \"id\" field",
            )
        })?,
        _ => {
            return Err(ApiError::validation(
                "existing_images",
                "existing_images entries must be identifiers or image objects",
            ));
        }
    };

    parse_blob_id(id)
}

fn parse_blob_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| {
        ApiError::validation(
            "existing_images",
            "existing_images contains an invalid blob identifier",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_raw() -> RawForm {
        RawForm {
            name: Some("Espresso machine".to_string()),
            category: Some("Electronics".to_string()),
            stock_quantity: Some("4".to_string()),
            list_price: Some("349.99".to_string()),
            selling_price: Some("299.99".to_string()),
            brand_name: Some("Rancilio".to_string()),
            exchange_eligible: Some("true".to_string()),
            existing: Vec::new(),
            uploads: Vec::new(),
        }
    }

    #[test]
    fn test_build_accepts_a_complete_form() {
        let form = build(complete_raw()).unwrap();
        assert_eq!(form.input.name, "Espresso machine");
        assert_eq!(form.input.category, Category::Electronics);
        assert_eq!(form.input.stock_quantity, 4);
        assert_eq!(form.input.list_price, 349.99);
        assert!(form.input.exchange_eligible);
        assert!(form.existing.is_empty());
    }

    #[test]
    fn test_build_requires_name_and_brand() {
        let mut raw = complete_raw();
        raw.name = Some("   ".to_string());
        assert!(build(raw).is_err());

        let mut raw = complete_raw();
        raw.brand_name = None;
        assert!(build(raw).is_err());
    }

    #[test]
    fn test_build_rejects_unknown_category() {
        let mut raw = complete_raw();
        raw.category = Some("Furniture".to_string());
        assert!(build(raw).is_err());
    }

    #[test]
    fn test_build_rejects_negative_quantities_and_prices() {
        let mut raw = complete_raw();
        raw.stock_quantity = Some("-1".to_string());
        assert!(build(raw).is_err());

        let mut raw = complete_raw();
        raw.list_price = Some("-0.01".to_string());
        assert!(build(raw).is_err());

        let mut raw = complete_raw();
        raw.selling_price = Some("NaN".to_string());
        assert!(build(raw).is_err());
    }

    #[test]
    fn test_flag_accepts_legacy_yes_no() {
        assert!(parse_flag(Some("Yes".to_string())).unwrap());
        assert!(!parse_flag(Some("No".to_string())).unwrap());
        assert!(parse_flag(Some("true".to_string())).unwrap());
        assert!(!parse_flag(None).unwrap());
        assert!(parse_flag(Some("maybe".to_string())).is_err());
    }

    #[test]
    fn test_existing_images_from_repeated_fields() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let ids = parse_existing_images(&[a.to_string(), b.to_string()]).unwrap();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_existing_images_from_json_string_array() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let payload = format!(r#"["{}", "{}"]"#, a, b);
        let ids = parse_existing_images(&[payload]).unwrap();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_existing_images_from_json_object_array() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let payload = format!(
            r#"[{{"id": "{}", "filename": "a.png", "content_type": "image/png"}}, {{"id": "{}"}}]"#,
            a, b
        );
        let ids = parse_existing_images(&[payload]).unwrap();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_existing_images_rejects_bad_identifiers() {
        assert!(parse_existing_images(&["not-a-uuid".to_string()]).is_err());
        assert!(parse_existing_images(&[r#"[{"filename": "a.png"}]"#.to_string()]).is_err());
        assert!(parse_existing_images(&["[1, 2]".to_string()]).is_err());
        assert!(parse_existing_images(&["[not json".to_string()]).is_err());
    }
}
