//! Client-side form validation.
//!
//! Request payloads derive `validator::Validate`; the custom rules they
//! reference live here. Every mutating API call validates its payload
//! before anything is sent.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use validator::{ValidateUrl, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::models::ResetPasswordRequest;

/// Minimum number of digits in a phone number
pub const MIN_PHONE_DIGITS: usize = 10;

/// Oldest year contributions can be generated for
pub const MIN_CONTRIBUTION_YEAR: i32 = 2000;

/// How many years ahead of the current one generation is allowed
pub const MAX_YEARS_AHEAD: i32 = 5;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Parse a `YYYY-MM-DD` date, also accepting a full RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

pub fn validate_iso_date(date: &str) -> Result<(), ValidationError> {
    parse_date(date)
        .map(|_| ())
        .ok_or_else(|| error("invalid_date", "Invalid date"))
}

/// Birth dates must parse; admins register with any plausible date.
pub fn validate_birth_date(date: &str) -> Result<(), ValidationError> {
    validate_iso_date(date)
}

/// Member birth dates must parse and not lie in the future.
pub fn validate_past_birth_date(date: &str) -> Result<(), ValidationError> {
    let parsed = parse_date(date).ok_or_else(|| error("invalid_date", "Invalid date"))?;
    if parsed > Local::now().date_naive() {
        return Err(error("future_birth_date", "Birth date cannot be in the future"));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(error("invalid_phone", "Invalid phone number"));
    }
    Ok(())
}

/// Empty is allowed (no picture); otherwise a URL or a bare image file name.
pub fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        if url.validate_url() {
            return Ok(());
        }
        return Err(error("invalid_image_url", "Invalid image URL"));
    }
    let has_image_extension = url
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if has_image_extension && !url.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(error("invalid_image_url", "Invalid image URL"))
    }
}

pub fn validate_generation_year(year: i32) -> Result<(), ValidationError> {
    validate_year_against(year, Local::now().year())
}

fn validate_year_against(year: i32, current_year: i32) -> Result<(), ValidationError> {
    if year < MIN_CONTRIBUTION_YEAR {
        return Err(error("year_too_old", "Year must be 2000 or later"));
    }
    if year > current_year + MAX_YEARS_AHEAD {
        return Err(error("year_too_far", "Year exceeds the allowed maximum"));
    }
    Ok(())
}

pub fn validate_password_confirmation(req: &ResetPasswordRequest) -> Result<(), ValidationError> {
    if req.new_password != req.confirm_password {
        return Err(error("password_mismatch", "Passwords do not match"));
    }
    Ok(())
}

/// Flatten validation errors to the first message per field, suitable for
/// showing next to form inputs. Struct-level errors are keyed `__all__`.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(list) = kind {
            if let Some(first) = list.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                out.insert(field.to_string(), message);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;
    use crate::models::{
        Gender, LocationRequest, LoginRequest, MemberStatus, PaymentRequest, PaymentStatus,
        PersonRequest,
    };

    fn person() -> PersonRequest {
        PersonRequest {
            first_name: "Hery".into(),
            last_name: "Randria".into(),
            birth_date: "1990-04-12".into(),
            gender: Gender::Male,
            image_url: String::new(),
            phone_number: "034 12 345 67".into(),
            status: MemberStatus::Worker,
            district_id: 1,
            tribute_id: 2,
            parent_id: None,
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_date("2024-02-29T10:00:00Z"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("29/02/2024"), None);
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0341234567").is_ok());
        assert!(validate_phone("+261 34 12 345 67").is_ok());
        assert!(validate_phone("034 12 34").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("").is_ok());
        assert!(validate_image_url("https://example.com/photo.png").is_ok());
        assert!(validate_image_url("rakoto_jean.jpg").is_ok());
        assert!(validate_image_url("not an image").is_err());
        assert!(validate_image_url("https://").is_err());
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year_against(2000, 2026).is_ok());
        assert!(validate_year_against(2031, 2026).is_ok());
        assert!(validate_year_against(1999, 2026).is_err());
        assert!(validate_year_against(2032, 2026).is_err());
    }

    #[test]
    fn test_future_birth_date_rejected() {
        let next_year = Local::now().year() + 1;
        assert!(validate_past_birth_date(&format!("{}-01-01", next_year)).is_err());
        assert!(validate_past_birth_date("1990-01-01").is_ok());
    }

    #[test]
    fn test_person_request_validation() {
        assert!(person().validate().is_ok());

        let mut bad = person();
        bad.first_name = "H".into();
        bad.district_id = 0;
        bad.phone_number = "123".into();
        let errors = bad.validate().unwrap_err();
        let fields = field_errors(&errors);
        assert_eq!(fields.get("first_name").map(String::as_str), Some("First name is required"));
        assert_eq!(fields.get("district_id").map(String::as_str), Some("Select a district"));
        assert_eq!(fields.get("phone_number").map(String::as_str), Some("Invalid phone number"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest { email: "admin@fizanakara.mg".into(), password: "secret1".into() };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest { email: "admin".into(), password: "123".into() };
        let fields = field_errors(&bad.validate().unwrap_err());
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_reset_password_confirmation() {
        let mismatch = ResetPasswordRequest {
            token: "tok".into(),
            new_password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        let fields = field_errors(&mismatch.validate().unwrap_err());
        assert_eq!(fields.get("__all__").map(String::as_str), Some("Passwords do not match"));
    }

    #[test]
    fn test_payment_and_location_validation() {
        let mut payment = PaymentRequest {
            amount_paid: 0.0,
            payment_date: Some("2025-13-01".into()),
            status: PaymentStatus::Completed,
            contribution_id: String::new(),
        };
        let fields = field_errors(&payment.validate().unwrap_err());
        assert_eq!(fields.len(), 3);

        payment.amount_paid = 5000.0;
        payment.payment_date = None;
        payment.contribution_id = "COT2026-001".into();
        assert!(payment.validate().is_ok());

        assert!(LocationRequest::new("  A ").validate().is_err());
        assert!(LocationRequest::new("Antananarivo").validate().is_ok());
        assert!(LocationRequest::new("x".repeat(51)).validate().is_err());
    }
}
