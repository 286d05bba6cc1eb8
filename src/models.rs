use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    order_items::Model as OrderItemModel, orders::Model as OrderModel,
    shipping_addresses::Model as ShippingAddressModel,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient_name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
    pub cpf: String,
    /// One-line form used when listing addresses for selection.
    pub formatted: String,
    pub created_at: DateTime<Utc>,
}

impl From<ShippingAddressModel> for ShippingAddress {
    fn from(model: ShippingAddressModel) -> Self {
        let formatted = format_address(&model);
        Self {
            id: model.id,
            user_id: model.user_id,
            recipient_name: model.recipient_name,
            street: model.street,
            number: model.number,
            complement: model.complement,
            neighborhood: model.neighborhood,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
            country: model.country,
            phone: model.phone,
            email: model.email,
            cpf: model.cpf,
            formatted,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

pub fn format_address(address: &ShippingAddressModel) -> String {
    let number = match address.complement.as_deref().filter(|c| !c.is_empty()) {
        Some(complement) => format!("{} {}", address.number, complement),
        None => address.number.clone(),
    };
    format!(
        "{} . {}, {}, {}, {} - {} . CEP: {}",
        address.recipient_name,
        address.street,
        number,
        address.neighborhood,
        address.city,
        address.state,
        address.zip_code
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineView {
    pub id: Uuid,
    pub product_variant_id: Uuid,
    pub name: String,
    pub image_url: String,
    pub unit_price_in_cents: i64,
    pub quantity: i32,
    pub line_total_in_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<CartLineView>,
    pub total_price_in_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub recipient_name: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
    pub cpf: String,
    pub total_price_in_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            shipping_address_id: model.shipping_address_id,
            recipient_name: model.recipient_name,
            street: model.street,
            number: model.number,
            complement: model.complement,
            neighborhood: model.neighborhood,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
            country: model.country,
            phone: model.phone,
            email: model.email,
            cpf: model.cpf,
            total_price_in_cents: model.total_price_in_cents,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_variant_id: Uuid,
    pub quantity: i32,
    pub price_in_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_variant_id: model.product_variant_id,
            quantity: model.quantity,
            price_in_cents: model.price_in_cents,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn address(complement: Option<&str>) -> ShippingAddressModel {
        ShippingAddressModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            recipient_name: "Maria Silva".into(),
            street: "Rua das Flores".into(),
            number: "42".into(),
            complement: complement.map(str::to_string),
            neighborhood: "Centro".into(),
            city: "Curitiba".into(),
            state: "PR".into(),
            zip_code: "80010-000".into(),
            country: "Brasil".into(),
            phone: "(41) 99999-0000".into(),
            email: "maria@example.com".into(),
            cpf: "123.456.789-09".into(),
            created_at: Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap()),
        }
    }

    #[test]
    fn formats_address_with_complement() {
        assert_eq!(
            format_address(&address(Some("Apto 3"))),
            "Maria Silva . Rua das Flores, 42 Apto 3, Centro, Curitiba - PR . CEP: 80010-000"
        );
    }

    #[test]
    fn formats_address_without_complement() {
        let formatted = format_address(&address(None));
        assert!(formatted.contains("Rua das Flores, 42, Centro"));
        assert!(!formatted.contains("None"));
    }
}
