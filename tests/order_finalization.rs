use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use sqlx::postgres::PgPoolOptions;
use storefront_checkout::{
    db::run_migrations,
    dto::{
        addresses::CreateShippingAddressRequest,
        cart::{AddToCartRequest, BindCartAddressRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, PreconditionFailure},
    middleware::auth::AuthUser,
    services::{address_service, cart_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Tests run against a real Postgres and skip when none is configured. Every
// test works on its own users and products so they can run in parallel.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run order finalization tests."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    run_migrations(&pool).await?;

    Ok(Some(AppState::new(pool, "test-secret")))
}

async fn create_user(state: &AppState) -> anyhow::Result<AuthUser> {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind("Test Customer")
        .bind(format!("{user_id}@example.com"))
        .execute(&state.pool)
        .await?;
    Ok(AuthUser { user_id })
}

async fn create_variant(state: &AppState, price_in_cents: i64) -> anyhow::Result<Uuid> {
    let product_id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, name) VALUES ($1, $2)")
        .bind(product_id)
        .bind(format!("Product {product_id}"))
        .execute(&state.pool)
        .await?;

    let variant_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO product_variants (id, product_id, name, image_url, price_in_cents) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(variant_id)
    .bind(product_id)
    .bind("Default")
    .bind("https://cdn.example.com/default.png")
    .bind(price_in_cents)
    .execute(&state.pool)
    .await?;
    Ok(variant_id)
}

fn address_request(street: &str, bind_to_cart: bool) -> CreateShippingAddressRequest {
    serde_json::from_value(serde_json::json!({
        "email": "buyer@example.com",
        "fullName": "  João Pereira  ",
        "cpf": "987.654.321-00",
        "phone": "(21) 91234-5678",
        "zipCode": "22041-001",
        "address": street,
        "number": "15",
        "complement": "Bloco B",
        "neighborhood": "Copacabana",
        "city": "Rio de Janeiro",
        "state": "RJ",
        "bindToCart": bind_to_cart
    }))
    .expect("address json")
}

async fn create_address(state: &AppState, user: &AuthUser, bind_to_cart: bool) -> anyhow::Result<Uuid> {
    let resp = address_service::create_shipping_address(
        state,
        user,
        address_request("Rua Barata Ribeiro", bind_to_cart),
    )
    .await?;
    Ok(resp.data.expect("address").id)
}

async fn add_item(state: &AppState, user: &AuthUser, variant_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_variant_id: variant_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

async fn order_count(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?)
}

async fn cart_item_count(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
    else {
        return Ok(0);
    };
    Ok(CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .count(&state.orm)
        .await?)
}

#[tokio::test]
async fn two_lines_become_one_order_and_cart_is_cleared() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    let variant_a = create_variant(&state, 1000).await?;
    let variant_b = create_variant(&state, 500).await?;

    add_item(&state, &user, variant_a, 2).await?;
    add_item(&state, &user, variant_b, 1).await?;
    let address_id = create_address(&state, &user, true).await?;

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.total_price_in_cents, 2500);
    assert_eq!(
        cart.shipping_address.as_ref().map(|a| a.id),
        Some(address_id)
    );

    let finalized = order_service::checkout(&state, &user)
        .await?
        .data
        .expect("finalized order");
    assert_eq!(finalized.total_price_in_cents, 2500);
    assert_eq!(finalized.item_count, 2);

    let detail = order_service::get_order(&state, &user, finalized.order_id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(detail.order.total_price_in_cents, 2500);
    assert_eq!(detail.order.shipping_address_id, address_id);
    assert_eq!(detail.order.recipient_name, "João Pereira");
    assert_eq!(detail.order.complement.as_deref(), Some("Bloco B"));
    assert_eq!(detail.order.country, "Brasil");
    assert_eq!(detail.items.len(), 2);

    let line_a = detail
        .items
        .iter()
        .find(|item| item.product_variant_id == variant_a)
        .expect("line a");
    assert_eq!((line_a.quantity, line_a.price_in_cents), (2, 1000));
    let line_b = detail
        .items
        .iter()
        .find(|item| item.product_variant_id == variant_b)
        .expect("line b");
    assert_eq!((line_b.quantity, line_b.price_in_cents), (1, 500));

    assert_eq!(cart_item_count(&state, &user).await?, 0);
    assert_eq!(order_count(&state, &user).await?, 1);

    let audited = AuditLogs::find()
        .filter(AuditCol::UserId.eq(user.user_id))
        .filter(AuditCol::Action.eq("order_finalized"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    Ok(())
}

#[tokio::test]
async fn empty_cart_with_address_is_a_precondition_failure() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    create_address(&state, &user, true).await?;

    let result = order_service::checkout(&state, &user).await;
    assert!(matches!(
        result,
        Err(AppError::PreconditionFailed(PreconditionFailure::EmptyCart))
    ));
    assert_eq!(order_count(&state, &user).await?, 0);

    Ok(())
}

#[tokio::test]
async fn items_without_bound_address_write_nothing() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    let variant = create_variant(&state, 1250).await?;
    add_item(&state, &user, variant, 3).await?;
    // Address exists but is not bound.
    create_address(&state, &user, false).await?;

    let result = order_service::checkout(&state, &user).await;
    assert!(matches!(
        result,
        Err(AppError::PreconditionFailed(
            PreconditionFailure::MissingShippingAddress
        ))
    ));
    assert_eq!(order_count(&state, &user).await?, 0);
    assert_eq!(cart_item_count(&state, &user).await?, 1);

    Ok(())
}

#[tokio::test]
async fn user_without_cart_is_a_distinct_precondition_failure() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;

    let result = order_service::checkout(&state, &user).await;
    assert!(matches!(
        result,
        Err(AppError::PreconditionFailed(PreconditionFailure::MissingCart))
    ));

    Ok(())
}

#[tokio::test]
async fn orders_keep_price_and_address_snapshots() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    let variant = create_variant(&state, 4990).await?;
    add_item(&state, &user, variant, 2).await?;
    let address_id = create_address(&state, &user, true).await?;

    let order_id = order_service::checkout(&state, &user)
        .await?
        .data
        .expect("finalized order")
        .order_id;

    sqlx::query("UPDATE product_variants SET price_in_cents = 9999 WHERE id = $1")
        .bind(variant)
        .execute(&state.pool)
        .await?;
    sqlx::query("UPDATE shipping_addresses SET street = 'Avenida Atlântica', city = 'Niterói' WHERE id = $1")
        .bind(address_id)
        .execute(&state.pool)
        .await?;

    let detail = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(detail.order.total_price_in_cents, 9980);
    assert_eq!(detail.items[0].price_in_cents, 4990);
    assert_eq!(detail.order.street, "Rua Barata Ribeiro");
    assert_eq!(detail.order.city, "Rio de Janeiro");

    Ok(())
}

#[tokio::test]
async fn concurrent_finalizations_produce_one_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    let variant = create_variant(&state, 300).await?;
    add_item(&state, &user, variant, 4).await?;
    create_address(&state, &user, true).await?;

    let (first, second) = tokio::join!(
        order_service::checkout(&state, &user),
        order_service::checkout(&state, &user)
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let empty_cart = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(AppError::PreconditionFailed(PreconditionFailure::EmptyCart))
            )
        })
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(empty_cart, 1);
    assert_eq!(order_count(&state, &user).await?, 1);
    assert_eq!(cart_item_count(&state, &user).await?, 0);

    Ok(())
}

#[tokio::test]
async fn binding_another_users_address_is_not_found() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let owner = create_user(&state).await?;
    let other = create_user(&state).await?;
    let address_id = create_address(&state, &owner, false).await?;

    let result = cart_service::bind_cart_address(
        &state,
        &other,
        BindCartAddressRequest {
            shipping_address_id: address_id,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let bound = cart_service::bind_cart_address(
        &state,
        &owner,
        BindCartAddressRequest {
            shipping_address_id: address_id,
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(bound.shipping_address.map(|a| a.id), Some(address_id));

    Ok(())
}

#[tokio::test]
async fn invalid_address_is_rejected_per_field_without_writes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state).await?;
    let mut request = address_request("Rua Sem Número", true);
    request.cpf = "98765432100".into();
    request.zip_code = "22041001".into();

    let result = address_service::create_shipping_address(&state, &user, request).await;
    match result {
        Err(AppError::ValidationFailed(fields)) => {
            assert_eq!(fields.len(), 2);
            assert!(fields.contains_key("cpf"));
            assert!(fields.contains_key("zipCode"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    let listed = address_service::list_addresses(&state, &user)
        .await?
        .data
        .expect("addresses");
    assert!(listed.is_empty());

    Ok(())
}

#[tokio::test]
async fn failures_inside_the_transaction_roll_everything_back() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    // Reject order rows and order item rows carrying marker values.
    for statement in [
        r#"
        CREATE OR REPLACE FUNCTION reject_fault_marked_rows() RETURNS trigger AS $$
        BEGIN
            RAISE EXCEPTION 'fault injected on %', TG_TABLE_NAME;
        END;
        $$ LANGUAGE plpgsql
        "#,
        "DROP TRIGGER IF EXISTS fault_order_items ON order_items",
        "CREATE TRIGGER fault_order_items BEFORE INSERT ON order_items FOR EACH ROW WHEN (NEW.quantity = 7777) EXECUTE FUNCTION reject_fault_marked_rows()",
        "DROP TRIGGER IF EXISTS fault_orders ON orders",
        "CREATE TRIGGER fault_orders BEFORE INSERT ON orders FOR EACH ROW WHEN (NEW.total_price_in_cents = 424242) EXECUTE FUNCTION reject_fault_marked_rows()",
    ] {
        sqlx::query(statement).execute(&state.pool).await?;
    }

    // Order row is written, then an order item insert fails.
    let user = create_user(&state).await?;
    let healthy = create_variant(&state, 100).await?;
    let faulty = create_variant(&state, 1).await?;
    add_item(&state, &user, healthy, 1).await?;
    add_item(&state, &user, faulty, 7777).await?;
    create_address(&state, &user, true).await?;

    let result = order_service::checkout(&state, &user).await;
    assert!(result.is_err());
    assert_eq!(order_count(&state, &user).await?, 0);
    assert_eq!(cart_item_count(&state, &user).await?, 2);

    // The order insert itself is rejected.
    let rejected = create_user(&state).await?;
    let marked = create_variant(&state, 424242).await?;
    add_item(&state, &rejected, marked, 1).await?;
    create_address(&state, &rejected, true).await?;

    let result = order_service::checkout(&state, &rejected).await;
    assert!(matches!(result, Err(AppError::OrderCreationFailed)));
    assert_eq!(order_count(&state, &rejected).await?, 0);
    assert_eq!(cart_item_count(&state, &rejected).await?, 1);

    // Retrying after the fault clears succeeds on the intact cart.
    cart_service::remove_from_cart(&state, &user, faulty).await?;
    let retried = order_service::checkout(&state, &user)
        .await?
        .data
        .expect("finalized order");
    assert_eq!(retried.total_price_in_cents, 100);
    assert_eq!(cart_item_count(&state, &user).await?, 0);

    Ok(())
}
