use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CreatePaymentRequest, LineDisplay, PaymentDetail, PaymentHistory, PaymentHistoryEntry,
    },
    entity::{
        inventory_items::{Column as ItemCol, Entity as InventoryItems, Model as ItemModel},
        order_lines::{Column as LineCol, Entity as OrderLines},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{PAYMENT_PAID, Payment, STATUS_COMPLETED},
    response::ApiResponse,
    state::AppState,
};

use super::order_service::{line_from_entity, order_from_entity};

/// Attach a payment to an order and mark it COMPLETED. The payment insert and
/// the status flip share one transaction with the order row locked, so no
/// observable state carries a PAID payment on a non-COMPLETED order. The
/// UNIQUE constraint on `payments.order_id` backstops the at-most-one check.
pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentDetail>> {
    ensure_customer(user)?;

    if payload.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Order ID and payment method are required".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(payload.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let existing = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Payment already exists for this order".into(),
        ));
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(order.total_amount),
        status: Set(PAYMENT_PAID.into()),
        payment_method: Set(payload.payment_method),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.status = Set(STATUS_COMPLETED.into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let lines = OrderLines::find()
        .filter(LineCol::OrderId.eq(order.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(line_from_entity)
        .collect();

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_create",
        Some("payments"),
        Some(serde_json::json!({ "order_id": order.id, "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        PaymentDetail {
            payment: payment_from_entity(payment),
            order: order_from_entity(order),
            lines,
        },
    ))
}

/// Customer's orders that carry a payment, newest first.
pub async fn get_my_payments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentHistory>> {
    ensure_customer(user)?;

    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let payments = Payments::find()
        .filter(PaymentCol::OrderId.is_in(order_ids.clone()))
        .all(&state.orm)
        .await?;
    let payments_by_order: HashMap<Uuid, PaymentModel> =
        payments.into_iter().map(|p| (p.order_id, p)).collect();

    let lines = OrderLines::find()
        .filter(LineCol::OrderId.is_in(order_ids))
        .all(&state.orm)
        .await?;
    let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
    let items = InventoryItems::find()
        .filter(ItemCol::Id.is_in(item_ids))
        .all(&state.orm)
        .await?;
    let items_by_id: HashMap<Uuid, &ItemModel> = items.iter().map(|i| (i.id, i)).collect();

    let mut entries = Vec::new();
    for order in orders {
        let Some(payment) = payments_by_order.get(&order.id) else {
            continue;
        };
        let items: Vec<LineDisplay> = lines
            .iter()
            .filter(|l| l.order_id == order.id)
            .map(|l| LineDisplay {
                name: items_by_id
                    .get(&l.item_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| "Unknown item".to_string()),
                quantity: l.quantity,
                price: l.price,
            })
            .collect();

        entries.push(PaymentHistoryEntry {
            order: order_from_entity(order),
            payment: payment_from_entity(payment.clone()),
            items,
        });
    }

    Ok(ApiResponse::success(
        "Ok",
        PaymentHistory { payments: entries },
    ))
}

fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        order_id: model.order_id,
        amount: model.amount,
        status: model.status,
        payment_method: model.payment_method,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
