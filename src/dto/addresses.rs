use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{validate_cpf, validate_not_blank, validate_phone, validate_zip_code};

pub const DEFAULT_COUNTRY: &str = "Brasil";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShippingAddressRequest {
    #[validate(email(message = "invalid e-mail"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank", message = "name is required"))]
    pub full_name: String,
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(custom(function = "validate_zip_code"))]
    pub zip_code: String,
    #[serde(alias = "street")]
    #[validate(custom(function = "validate_not_blank", message = "address is required"))]
    pub address: String,
    #[validate(custom(function = "validate_not_blank", message = "number is required"))]
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "neighborhood is required"))]
    pub neighborhood: String,
    #[validate(custom(function = "validate_not_blank", message = "city is required"))]
    pub city: String,
    #[validate(custom(function = "validate_not_blank", message = "state is required"))]
    pub state: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Bind the new address to the caller's cart right after creating it.
    #[serde(default)]
    pub bind_to_cart: bool,
}
