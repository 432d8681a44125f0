//! Checkout data validation.
//!
//! [`is_address_complete_for_quoting`] is the cheap gate used before asking
//! the rate service for prices. The `validate_*` functions apply the full
//! rules used when the customer saves a step, and report every failing field
//! rather than stopping at the first.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Address, PaymentKind, PaymentMethod, ShippingMethod};

/// Countries the store ships to.
pub const SUPPORTED_COUNTRIES: [&str; 8] = ["ES", "RO", "MD", "FR", "DE", "IT", "US", "GB"];

static FIVE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("valid postal code regex"));
static SIX_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid postal code regex"));
static MOLDOVA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^MD-?\d{4}$").expect("valid postal code regex"));
static UNITED_STATES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid postal code regex"));
static UNITED_KINGDOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}$").expect("valid postal code regex")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-()]{7,15}$").expect("valid phone regex"));

/// Machine-readable reason a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Required,
    TooShort,
    TooLong,
    InvalidFormat,
    InvalidCountry,
    InvalidPrice,
}

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub code: ErrorCode,
    pub message: &'static str,
}

impl FieldError {
    #[must_use]
    pub const fn new(field: &'static str, code: ErrorCode, message: &'static str) -> Self {
        Self {
            field,
            code,
            message,
        }
    }
}

/// True when country, postal code and city are all filled in.
///
/// Whitespace-only values count as empty.
#[must_use]
pub fn is_address_complete_for_quoting(address: &Address) -> bool {
    [&address.country, &address.postal_code, &address.city]
        .iter()
        .all(|value| !value.trim().is_empty())
}

/// Whether `postal_code` has the format used in `country`.
///
/// Countries without a known format accept any postal code.
#[must_use]
pub fn is_valid_postal_code(postal_code: &str, country: &str) -> bool {
    let pattern = match country.trim().to_uppercase().as_str() {
        "ES" | "FR" | "DE" | "IT" => &FIVE_DIGITS,
        "RO" => &SIX_DIGITS,
        "MD" => &MOLDOVA,
        "US" => &UNITED_STATES,
        "GB" => &UNITED_KINGDOM,
        _ => return true,
    };
    pattern.is_match(postal_code)
}

/// Whether the store ships to `country` (ISO 3166-1 alpha-2, any case).
#[must_use]
pub fn is_supported_country(country: &str) -> bool {
    let country = country.trim().to_uppercase();
    SUPPORTED_COUNTRIES.contains(&country.as_str())
}

#[must_use]
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE.is_match(phone)
}

struct LengthRule {
    field: &'static str,
    min: usize,
    max: usize,
    required: &'static str,
    too_short: &'static str,
    too_long: &'static str,
}

fn check_length(value: &str, rule: &LengthRule, errors: &mut Vec<FieldError>) {
    let len = value.chars().count();
    if value.trim().is_empty() {
        errors.push(FieldError::new(rule.field, ErrorCode::Required, rule.required));
    } else if len < rule.min {
        errors.push(FieldError::new(rule.field, ErrorCode::TooShort, rule.too_short));
    } else if len > rule.max {
        errors.push(FieldError::new(rule.field, ErrorCode::TooLong, rule.too_long));
    }
}

/// Check every field of a shipping or billing address.
#[must_use]
pub fn validate_address(address: &Address) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_length(
        &address.first_name,
        &LengthRule {
            field: "firstName",
            min: 2,
            max: 50,
            required: "First name is required",
            too_short: "First name must be at least 2 characters",
            too_long: "First name must be less than 50 characters",
        },
        &mut errors,
    );
    check_length(
        &address.last_name,
        &LengthRule {
            field: "lastName",
            min: 2,
            max: 50,
            required: "Last name is required",
            too_short: "Last name must be at least 2 characters",
            too_long: "Last name must be less than 50 characters",
        },
        &mut errors,
    );
    check_length(
        &address.street,
        &LengthRule {
            field: "street",
            min: 5,
            max: 100,
            required: "Street address is required",
            too_short: "Street address must be at least 5 characters",
            too_long: "Street address must be less than 100 characters",
        },
        &mut errors,
    );
    check_length(
        &address.city,
        &LengthRule {
            field: "city",
            min: 2,
            max: 50,
            required: "City is required",
            too_short: "City must be at least 2 characters",
            too_long: "City must be less than 50 characters",
        },
        &mut errors,
    );

    if address.postal_code.trim().is_empty() {
        errors.push(FieldError::new(
            "postalCode",
            ErrorCode::Required,
            "Postal code is required",
        ));
    } else if !is_valid_postal_code(&address.postal_code, &address.country) {
        errors.push(FieldError::new(
            "postalCode",
            ErrorCode::InvalidFormat,
            "Invalid postal code format for the selected country",
        ));
    }

    if address.country.trim().is_empty() {
        errors.push(FieldError::new(
            "country",
            ErrorCode::Required,
            "Country is required",
        ));
    } else if !is_supported_country(&address.country) {
        errors.push(FieldError::new(
            "country",
            ErrorCode::InvalidCountry,
            "Invalid country code",
        ));
    }

    if address
        .company
        .as_ref()
        .is_some_and(|company| company.chars().count() > 100)
    {
        errors.push(FieldError::new(
            "company",
            ErrorCode::TooLong,
            "Company name must be less than 100 characters",
        ));
    }
    if address
        .province
        .as_ref()
        .is_some_and(|province| province.chars().count() > 50)
    {
        errors.push(FieldError::new(
            "province",
            ErrorCode::TooLong,
            "Province must be less than 50 characters",
        ));
    }

    if !address.phone.is_empty() && !is_valid_phone_number(&address.phone) {
        errors.push(FieldError::new(
            "phone",
            ErrorCode::InvalidFormat,
            "Invalid phone number format",
        ));
    }

    errors
}

/// Check the address and chosen method saved on the shipping step.
#[must_use]
pub fn validate_shipping_info(address: &Address, method: &ShippingMethod) -> Vec<FieldError> {
    let mut errors = validate_address(address);
    if method.id.trim().is_empty() {
        errors.push(FieldError::new(
            "method.id",
            ErrorCode::Required,
            "Shipping method ID is required",
        ));
    }
    if method.price < Decimal::ZERO {
        errors.push(FieldError::new(
            "method.price",
            ErrorCode::InvalidPrice,
            "Invalid shipping method price",
        ));
    }
    errors
}

/// Check a payment selection. Cash needs nothing further.
#[must_use]
pub fn validate_payment_method(method: &PaymentMethod) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if method.kind == PaymentKind::CreditCard {
        check_length(
            method.holder_name.as_deref().unwrap_or_default(),
            &LengthRule {
                field: "holderName",
                min: 2,
                max: 50,
                required: "Cardholder name is required",
                too_short: "Cardholder name must be at least 2 characters",
                too_long: "Cardholder name must be less than 50 characters",
            },
            &mut errors,
        );
    }
    errors
}

/// Normalize an address before it is stored.
///
/// Trims every field, upper-cases country and postal code, and turns blank
/// optional fields into `None`.
#[must_use]
pub fn sanitize_address(address: &Address) -> Address {
    let optional = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Address {
        kind: address.kind,
        first_name: address.first_name.trim().to_string(),
        last_name: address.last_name.trim().to_string(),
        company: optional(&address.company),
        street: address.street.trim().to_string(),
        city: address.city.trim().to_string(),
        postal_code: address.postal_code.trim().to_uppercase(),
        province: optional(&address.province),
        country: address.country.trim().to_uppercase(),
        phone: address.phone.trim().to_string(),
    }
}
