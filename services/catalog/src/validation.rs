//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Which contact channel a login identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Email,
    Phone,
}

/// Classify a contact string as an email or a phone number
///
/// The presence of an `@` character selects the email channel; anything else
/// is treated as a phone number. The matched channel is validated before the
/// kind is returned.
pub fn classify_contact(contact: &str) -> Result<ContactKind, String> {
    let contact = contact.trim();

    if contact.is_empty() {
        return Err("Email or phone number is required".to_string());
    }

    if contact.contains('@') {
        validate_email(contact)?;
        Ok(ContactKind::Email)
    } else {
        validate_phone(contact)?;
        Ok(ContactKind::Phone)
    }
}

/// Classify a contact and return the form used for storage and lookup
///
/// Email addresses are case-insensitive on this API, so they are lowercased
/// here; a mixed-case address must resolve to the same account as its
/// lowercase twin. Phone numbers are kept as supplied, minus surrounding
/// whitespace.
pub fn canonicalize_contact(contact: &str) -> Result<(ContactKind, String), String> {
    let contact = contact.trim();
    let kind = classify_contact(contact)?;

    let canonical = match kind {
        ContactKind::Email => contact.to_lowercase(),
        ContactKind::Phone => contact.to_string(),
    };

    Ok((kind, canonical))
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate phone number
///
/// Accepts an optional leading `+` and separator spaces or dashes; the
/// remaining digits must number between 7 and 15.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let digits: String = rest.chars().filter(|c| !matches!(c, ' ' | '-')).collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid phone number format".to_string());
    }

    if digits.len() < 7 || digits.len() > 15 {
        return Err("Phone number must contain between 7 and 15 digits".to_string());
    }

    Ok(())
}

/// Validate a required free-text field such as a product or brand name
pub fn validate_required_text(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", what));
    }

    Ok(())
}
