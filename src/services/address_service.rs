use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::addresses::{CreateShippingAddressRequest, DEFAULT_COUNTRY},
    entity::shipping_addresses::{
        ActiveModel as AddressActive, Column as AddressCol, Entity as ShippingAddresses,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::ShippingAddress,
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
    validation::validate_payload,
};

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn address_from_request(user_id: Uuid, payload: CreateShippingAddressRequest) -> AddressActive {
    AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        recipient_name: Set(payload.full_name.trim().to_string()),
        street: Set(payload.address.trim().to_string()),
        number: Set(payload.number.trim().to_string()),
        complement: Set(non_empty(payload.complement)),
        neighborhood: Set(payload.neighborhood.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        zip_code: Set(payload.zip_code),
        country: Set(non_empty(payload.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
        phone: Set(payload.phone),
        email: Set(payload.email.trim().to_string()),
        cpf: Set(payload.cpf),
        created_at: NotSet,
    }
}

/// Validate and store a new address; optionally bind it to the cart in the same transaction.
pub async fn create_shipping_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateShippingAddressRequest,
) -> AppResult<ApiResponse<ShippingAddress>> {
    validate_payload(&payload)?;
    let bind_to_cart = payload.bind_to_cart;

    let txn = state.orm.begin().await?;
    let address = address_from_request(user.user_id, payload)
        .insert(&txn)
        .await?;
    if bind_to_cart {
        cart_service::bind_in_txn(&txn, user.user_id, address.id).await?;
    }
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        shipping_address_id = %address.id,
        bound = bind_to_cart,
        "shipping address created"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::AddressCreated,
        serde_json::json!({ "shipping_address_id": address.id, "bound": bind_to_cart }),
    )
    .await;

    Ok(ApiResponse::success(
        "Shipping address created",
        ShippingAddress::from(address),
        Some(Meta::empty()),
    ))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<ShippingAddress>>> {
    let addresses = ShippingAddresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_asc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, user_id = %user.user_id, "address lookup failed");
            AppError::AddressLookupFailed
        })?;

    let total = addresses.len() as i64;
    let items = addresses.into_iter().map(ShippingAddress::from).collect();
    Ok(ApiResponse::success(
        "OK",
        items,
        Some(Meta::unpaged(total)),
    ))
}
