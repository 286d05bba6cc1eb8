use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::CreateShippingAddressRequest,
        cart::{AddToCartRequest, BindCartAddressRequest},
        orders::{FinalizedOrder, OrderList, OrderWithItems},
    },
    models::{Cart, CartLineView, Order, OrderItem, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{addresses, cart, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        addresses::list_addresses,
        addresses::create_shipping_address,
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::bind_cart_address,
        orders::finalize_order,
        orders::list_orders,
        orders::get_order
    ),
    components(
        schemas(
            ShippingAddress,
            Cart,
            CartLineView,
            Order,
            OrderItem,
            CreateShippingAddressRequest,
            AddToCartRequest,
            BindCartAddressRequest,
            FinalizedOrder,
            OrderList,
            OrderWithItems,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<Cart>,
            ApiResponse<ShippingAddress>,
            ApiResponse<FinalizedOrder>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Addresses", description = "Shipping address endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order finalization and history"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
