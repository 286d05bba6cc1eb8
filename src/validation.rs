use std::{borrow::Cow, collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, AppResult};

static CPF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$").expect("Invalid regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("Invalid regex"));
static ZIP_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}-\d{3}$").expect("Invalid regex"));

fn masked(value: &str, re: &Regex, code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(code).with_message(Cow::Borrowed(message)))
    }
}

/// `###.###.###-##`
pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    masked(value, &CPF_RE, "cpf", "invalid CPF")
}

/// `(##) #####-####`
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    masked(value, &PHONE_RE, "phone", "invalid phone number")
}

/// `#####-###`
pub fn validate_zip_code(value: &str) -> Result<(), ValidationError> {
    masked(value, &ZIP_CODE_RE, "zip_code", "invalid zip code")
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed("is required")));
    }
    Ok(())
}

/// Validate a payload, collapsing the errors to one message per field.
pub fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|errors| AppError::ValidationFailed(field_messages(&errors)))
}

pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let first = errs.first()?;
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid {}", field));
            Some((to_camel_case(&field), message))
        })
        .collect()
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
