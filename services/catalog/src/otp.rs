//! One-time password generation, verification, and delivery
//!
//! Codes are 6-digit, uniformly random, single-use, and valid for exactly
//! ten minutes from issuance. The code and its expiry live on the user
//! record; there is no separate ephemeral store. Delivery is a log line in
//! default mode; an explicit demo flag additionally echoes the code in the
//! response payload.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

/// Validity window of an issued code, in minutes
pub const OTP_VALIDITY_MINUTES: i64 = 10;

/// OTP configuration
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Echo the generated code in login/resend responses. Never default-on.
    pub demo_mode: bool,
}

impl OtpConfig {
    /// Create a new OtpConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DEMO_MODE`: set to `"true"` to include OTPs in response payloads
    ///   (default: false)
    pub fn from_env() -> Self {
        let demo_mode = std::env::var("DEMO_MODE")
            .map(|v| v == "true")
            .unwrap_or(false);

        OtpConfig { demo_mode }
    }
}

/// Generate a 6-digit one-time code, uniformly random in [100000, 999999]
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100000..1000000);
    code.to_string()
}

/// Compute the expiry timestamp for a code issued at `now`
pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_VALIDITY_MINUTES)
}

/// Outcome of checking a supplied code against the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// The supplied code matches the stored, unexpired code
    Valid,
    /// The stored code's validity window has passed
    Expired,
    /// The supplied code does not equal the stored code, or none is stored
    Mismatch,
}

/// Check a supplied code against the stored code and expiry
///
/// Expiry is evaluated before the code comparison, so a stale code fails as
/// `Expired` even when the digits match. A cleared code (after a successful
/// verification) fails as `Mismatch`: there is nothing left to compare
/// against.
pub fn check_code(
    stored_code: Option<&str>,
    stored_expiry: Option<DateTime<Utc>>,
    supplied: &str,
    now: DateTime<Utc>,
) -> OtpCheck {
    if let Some(expiry) = stored_expiry {
        if expiry < now {
            return OtpCheck::Expired;
        }
    }

    match stored_code {
        Some(code) if code == supplied => OtpCheck::Valid,
        _ => OtpCheck::Mismatch,
    }
}

/// Mask a contact for inclusion in response payloads
///
/// Emails keep the first two characters of the local part and the full
/// domain; phone numbers expose only their last four digits.
pub fn mask_contact(contact: &str) -> String {
    match contact.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{}***@{}", visible, domain)
        }
        None => {
            let chars: Vec<char> = contact.chars().collect();
            let visible: String = chars.iter().skip(chars.len().saturating_sub(4)).collect();
            let masked = "*".repeat(chars.len().saturating_sub(4));
            format!("{}{}", masked, visible)
        }
    }
}

/// Deliver a code out-of-band
///
/// The default transport is the service log; operators read the code from
/// there during development and manual testing.
pub fn log_delivery(contact: &str, code: &str) {
    info!("OTP for {}: {} (valid {} minutes)", contact, code, OTP_VALIDITY_MINUTES);
}
