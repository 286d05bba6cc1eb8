use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Storefront actions recorded in `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    AddressCreated,
    CartAddressBound,
    CartItemUpdated,
    CartItemRemoved,
    OrderFinalized,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AddressCreated => "address_created",
            AuditAction::CartAddressBound => "cart_address_bound",
            AuditAction::CartItemUpdated => "cart_item_updated",
            AuditAction::CartItemRemoved => "cart_item_removed",
            AuditAction::OrderFinalized => "order_finalized",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::AddressCreated => "shipping_addresses",
            AuditAction::CartAddressBound => "carts",
            AuditAction::CartItemUpdated | AuditAction::CartItemRemoved => "cart_items",
            AuditAction::OrderFinalized => "orders",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort audit write; runs after the main work has committed.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, Some(user_id), action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
