use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::addresses::CreateShippingAddressRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::ShippingAddress,
    response::ApiResponse,
    services::address_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_addresses).post(create_shipping_address))
}

#[utoipa::path(
    get,
    path = "/api/addresses",
    responses(
        (status = 200, description = "Shipping addresses of the current user", body = ApiResponse<Vec<ShippingAddress>>),
        (status = 500, description = "Failed to fetch addresses"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ShippingAddress>>>> {
    let resp = address_service::list_addresses(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/addresses",
    request_body = CreateShippingAddressRequest,
    responses(
        (status = 201, description = "Address created", body = ApiResponse<ShippingAddress>),
        (status = 422, description = "One message per invalid field"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn create_shipping_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateShippingAddressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ShippingAddress>>)> {
    let resp = address_service::create_shipping_address(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
