use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{FinalizedOrder, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        shipping_addresses::{Column as AddressCol, Entity as ShippingAddresses, Model as AddressModel},
    },
    error::{AppError, AppResult, PreconditionFailure},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service::{self, CartLine},
    state::AppState,
};

/// Finalize the user's cart inside `txn`.
///
/// Locks the cart row, prices every line from a single read, writes the order
/// with an inline copy of the bound address, copies the lines into order items
/// and deletes exactly the cart items that were priced. Nothing is committed
/// here; dropping `txn` without committing discards all of it.
pub async fn finalize_order(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<FinalizedOrder> {
    let cart = cart_service::lock_cart(txn, user_id)
        .await?
        .ok_or(AppError::PreconditionFailed(PreconditionFailure::MissingCart))?;

    let address_id = cart
        .shipping_address_id
        .ok_or(AppError::PreconditionFailed(
            PreconditionFailure::MissingShippingAddress,
        ))?;
    let address = ShippingAddresses::find_by_id(address_id)
        .filter(AddressCol::UserId.eq(user_id))
        .one(txn)
        .await?
        .ok_or(AppError::PreconditionFailed(
            PreconditionFailure::MissingShippingAddress,
        ))?;

    let lines = cart_service::load_cart_lines(txn, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::PreconditionFailed(PreconditionFailure::EmptyCart));
    }
    let total_price_in_cents = cart_service::compute_total(&lines)?;

    let order = order_snapshot(Uuid::new_v4(), user_id, &address, total_price_in_cents)
        .insert(txn)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, user_id = %user_id, "order insert rejected");
            AppError::OrderCreationFailed
        })?;

    OrderItems::insert_many(lines.iter().map(|line| order_item_snapshot(order.id, line)))
        .exec(txn)
        .await?;

    let cart_item_ids: Vec<Uuid> = lines.iter().map(|line| line.cart_item_id).collect();
    CartItems::delete_many()
        .filter(CartItemCol::Id.is_in(cart_item_ids))
        .exec(txn)
        .await?;

    Ok(FinalizedOrder {
        order_id: order.id,
        total_price_in_cents,
        item_count: lines.len(),
    })
}

fn order_snapshot(
    order_id: Uuid,
    user_id: Uuid,
    address: &AddressModel,
    total_price_in_cents: i64,
) -> OrderActive {
    OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        shipping_address_id: Set(address.id),
        recipient_name: Set(address.recipient_name.clone()),
        street: Set(address.street.clone()),
        number: Set(address.number.clone()),
        complement: Set(address.complement.clone()),
        neighborhood: Set(address.neighborhood.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        zip_code: Set(address.zip_code.clone()),
        country: Set(address.country.clone()),
        phone: Set(address.phone.clone()),
        email: Set(address.email.clone()),
        cpf: Set(address.cpf.clone()),
        total_price_in_cents: Set(total_price_in_cents),
        created_at: NotSet,
    }
}

fn order_item_snapshot(order_id: Uuid, line: &CartLine) -> OrderItemActive {
    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_variant_id: Set(line.product_variant_id),
        quantity: Set(line.quantity),
        price_in_cents: Set(line.price_in_cents),
        created_at: NotSet,
    }
}

pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<FinalizedOrder>> {
    let txn = state.orm.begin().await?;
    let finalized = finalize_order(&txn, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %finalized.order_id,
        total_price_in_cents = finalized.total_price_in_cents,
        items = finalized.item_count,
        "order finalized"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderFinalized,
        serde_json::json!({
            "order_id": finalized.order_id,
            "total_price_in_cents": finalized.total_price_in_cents,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        finalized,
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(OrderCol::UserId.eq(user.user_id));
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}
