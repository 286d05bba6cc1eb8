use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    FromQueryResult, IntoActiveModel, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{LockType, OnConflict};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::cart::{AddToCartRequest, BindCartAddressRequest},
    entity::{
        cart_items::{self, ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        shipping_addresses::{Column as AddressCol, Entity as ShippingAddresses},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartLineView, ShippingAddress},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// A cart item priced with the variant price observed in the same read.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct CartLine {
    pub cart_item_id: Uuid,
    pub product_variant_id: Uuid,
    pub quantity: i32,
    pub price_in_cents: i64,
}

impl CartLine {
    /// `price_in_cents * quantity`, rejecting non-positive quantities.
    pub fn subtotal(&self) -> AppResult<i64> {
        if self.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        self.price_in_cents
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart line overflows i64 cents")))
    }
}

/// A priced line plus the variant fields shown in the cart view.
#[derive(Debug, FromQueryResult)]
struct CartLineRow {
    cart_item_id: Uuid,
    product_variant_id: Uuid,
    quantity: i32,
    price_in_cents: i64,
    name: String,
    image_url: String,
}

impl CartLineRow {
    fn line(&self) -> CartLine {
        CartLine {
            cart_item_id: self.cart_item_id,
            product_variant_id: self.product_variant_id,
            quantity: self.quantity,
            price_in_cents: self.price_in_cents,
        }
    }
}

/// Sum of `price_in_cents * quantity` in integer cents.
pub fn compute_total(lines: &[CartLine]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |acc, line| {
        acc.checked_add(line.subtotal()?)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart total overflows i64 cents")))
    })
}

/// Lock the user's cart row for the rest of `txn`.
pub async fn lock_cart(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<Option<CartModel>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?;
    Ok(cart)
}

/// Lock the user's cart, creating it first if the user has none yet.
pub async fn lock_or_create_cart(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = lock_cart(txn, user_id).await? {
        return Ok(cart);
    }

    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        shipping_address_id: Set(None),
        created_at: NotSet,
    };
    Carts::insert(cart)
        .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
        .exec_without_returning(txn)
        .await?;

    lock_cart(txn, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart missing after insert")))
}

/// Cart items of `cart_id` joined to their variant's current price, oldest first.
/// Every priced read of a cart starts from this query.
fn cart_lines_query(cart_id: Uuid) -> Select<CartItems> {
    CartItems::find()
        .select_only()
        .column_as(CartItemCol::Id, "cart_item_id")
        .column(CartItemCol::ProductVariantId)
        .column(CartItemCol::Quantity)
        .column(VariantCol::PriceInCents)
        .join(JoinType::InnerJoin, cart_items::Relation::ProductVariants.def())
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
}

fn cart_view_query(cart_id: Uuid) -> Select<CartItems> {
    cart_lines_query(cart_id)
        .column(VariantCol::Name)
        .column(VariantCol::ImageUrl)
}

pub async fn load_cart_lines<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
    let lines = cart_lines_query(cart_id)
        .into_model::<CartLine>()
        .all(db)
        .await?;
    Ok(lines)
}

async fn cart_view<C: ConnectionTrait>(db: &C, cart: CartModel) -> AppResult<Cart> {
    let shipping_address = match cart.shipping_address_id {
        Some(id) => ShippingAddresses::find_by_id(id)
            .filter(AddressCol::UserId.eq(cart.user_id))
            .one(db)
            .await?
            .map(ShippingAddress::from),
        None => None,
    };

    let rows = cart_view_query(cart.id)
        .into_model::<CartLineRow>()
        .all(db)
        .await?;

    let lines: Vec<CartLine> = rows.iter().map(CartLineRow::line).collect();
    let total_price_in_cents = compute_total(&lines)?;

    let items = rows
        .into_iter()
        .zip(&lines)
        .map(|(row, line)| {
            Ok(CartLineView {
                id: row.cart_item_id,
                product_variant_id: row.product_variant_id,
                name: row.name,
                image_url: row.image_url,
                unit_price_in_cents: row.price_in_cents,
                quantity: row.quantity,
                line_total_in_cents: line.subtotal()?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Cart {
        id: cart.id,
        shipping_address,
        items,
        total_price_in_cents,
    })
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = lock_or_create_cart(&txn, user.user_id).await?;
    let view = cart_view(&txn, cart).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let variant = ProductVariants::find_by_id(payload.product_variant_id)
        .one(&state.orm)
        .await?;
    if variant.is_none() {
        return Err(AppError::BadRequest("product variant not found".to_string()));
    }

    let txn = state.orm.begin().await?;
    let cart = lock_or_create_cart(&txn, user.user_id).await?;

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductVariantId.eq(payload.product_variant_id))
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let mut active = item.into_active_model();
            active.quantity = Set(payload.quantity);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_variant_id: Set(payload.product_variant_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    let view = cart_view(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartItemUpdated,
        serde_json::json!({
            "product_variant_id": payload.product_variant_id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_variant_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id).await?.ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductVariantId.eq(product_variant_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let view = cart_view(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartItemRemoved,
        serde_json::json!({ "product_variant_id": product_variant_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        view,
        Some(Meta::empty()),
    ))
}

/// Bind one of the user's own addresses to their cart.
pub async fn bind_cart_address(
    state: &AppState,
    user: &AuthUser,
    payload: BindCartAddressRequest,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let view = bind_in_txn(&txn, user.user_id, payload.shipping_address_id).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        shipping_address_id = %payload.shipping_address_id,
        "cart address bound"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartAddressBound,
        serde_json::json!({ "shipping_address_id": payload.shipping_address_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Shipping address bound",
        view,
        Some(Meta::empty()),
    ))
}

pub(crate) async fn bind_in_txn(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    address_id: Uuid,
) -> AppResult<Cart> {
    let owned = ShippingAddresses::find_by_id(address_id)
        .filter(AddressCol::UserId.eq(user_id))
        .one(txn)
        .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let cart = lock_or_create_cart(txn, user_id).await?;
    let mut active = cart.into_active_model();
    active.shipping_address_id = Set(Some(address_id));
    let cart = active.update(txn).await?;

    cart_view(txn, cart).await
}
