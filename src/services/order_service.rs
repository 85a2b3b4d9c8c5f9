use std::collections::HashMap;

use chrono::{Datelike, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CreateOrderRequest, CustomerSummary, LineDisplay, OrderDetail, PaymentSummary,
        ShopOrderEntry, ShopOrderStats, ShopOrders, TransactionEntry, TransactionHistory,
        UpdateOrderStatusRequest,
    },
    entity::{
        inventory_items::{
            Column as ItemCol, Entity as InventoryItems, Model as ItemModel,
        },
        order_lines::{
            ActiveModel as OrderLineActive, Column as LineCol, Entity as OrderLines,
            Model as LineModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        payments::{Column as PaymentCol, Entity as Payments},
        shops::{Column as ShopCol, Entity as Shops},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer, ensure_owner},
    models::{
        ORDER_STATUSES, Order, OrderLine, ROLE_CUSTOMER, STATUS_COMPLETED, STATUS_PENDING,
    },
    response::ApiResponse,
    state::AppState,
};

/// Create an order from a cart of lines. Validation, the stock decrement and
/// the order insert all run in one transaction: item rows are read under
/// `FOR UPDATE` and the decrement re-checks stock at commit time, so two
/// concurrent orders can never jointly over-draw an item.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_customer(user)?;

    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "Quantity must be a positive integer".into(),
            ));
        }
    }

    let txn = state.orm.begin().await?;

    // Validate every line before writing anything; any failure rolls back.
    let mut total_amount: i64 = 0;
    let mut validated: Vec<(ItemModel, i32)> = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let item = InventoryItems::find_by_id(line.item_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Item with ID {} not found", line.item_id))
            })?;

        if item.quantity < line.quantity {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for {}. Available: {}, Requested: {}",
                item.name, item.quantity, line.quantity
            )));
        }

        total_amount += item.price * i64::from(line.quantity);
        validated.push((item, line.quantity));
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set(STATUS_PENDING.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut lines: Vec<OrderLine> = Vec::with_capacity(validated.len());
    for (item, quantity) in &validated {
        let line = OrderLineActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            item_id: Set(item.id),
            quantity: Set(*quantity),
            // price snapshotted at order time
            price: Set(item.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        lines.push(line_from_entity(line));

        // Conditional decrement; zero affected rows means the stock moved
        // between validation and commit, so the whole order aborts.
        let result = InventoryItems::update_many()
            .col_expr(
                ItemCol::Quantity,
                Expr::col(ItemCol::Quantity).sub(*quantity),
            )
            .filter(ItemCol::Id.eq(item.id))
            .filter(ItemCol::Quantity.gte(*quantity))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for {}",
                item.name
            )));
        }
    }

    let customer = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".into()))?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderDetail {
            order: order_from_entity(order),
            lines,
            customer: customer_summary(customer),
        },
    ))
}

/// Customer transaction history with display fields for the mobile app.
pub async fn get_my_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<TransactionHistory>> {
    ensure_customer(user)?;

    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let lines = OrderLines::find()
        .filter(LineCol::OrderId.is_in(order_ids.clone()))
        .all(&state.orm)
        .await?;
    let payments = Payments::find()
        .filter(PaymentCol::OrderId.is_in(order_ids))
        .all(&state.orm)
        .await?;

    let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
    let items = InventoryItems::find()
        .filter(ItemCol::Id.is_in(item_ids))
        .all(&state.orm)
        .await?;
    let shop_ids: Vec<Uuid> = items.iter().map(|i| i.shop_id).collect();
    let shops = Shops::find()
        .filter(ShopCol::Id.is_in(shop_ids))
        .all(&state.orm)
        .await?;

    let items_by_id: HashMap<Uuid, &ItemModel> = items.iter().map(|i| (i.id, i)).collect();
    let shop_names: HashMap<Uuid, &str> =
        shops.iter().map(|s| (s.id, s.name.as_str())).collect();
    let payments_by_order: HashMap<Uuid, _> =
        payments.iter().map(|p| (p.order_id, p)).collect();
    let lines_by_order = group_lines(&lines);

    let mut total_spent: i64 = 0;
    let mut transactions = Vec::with_capacity(orders.len());
    for order in &orders {
        if order.status == STATUS_COMPLETED {
            total_spent += order.total_amount;
        }

        let order_lines = lines_by_order.get(&order.id).map(Vec::as_slice).unwrap_or(&[]);
        // Orders are placed against a single shop; take the name from the first line.
        let shop = order_lines
            .first()
            .and_then(|l| items_by_id.get(&l.item_id))
            .and_then(|i| shop_names.get(&i.shop_id))
            .copied()
            .unwrap_or("Unknown Shop");
        let payment = payments_by_order.get(&order.id);

        transactions.push(TransactionEntry {
            id: order.id,
            order_code: build_order_code(order),
            shop: shop.to_string(),
            date: order.created_at.format("%Y-%m-%d").to_string(),
            total: order.total_amount,
            status: order.status.clone(),
            payment_method: payment
                .map(|p| p.payment_method.clone())
                .unwrap_or_else(|| "Pending".to_string()),
            payment_id: payment.map(|p| p.id),
            items: display_lines(order_lines, &items_by_id),
            created_at: order.created_at.with_timezone(&Utc),
        });
    }

    let total_transactions = transactions.len();
    Ok(ApiResponse::success(
        "Ok",
        TransactionHistory {
            transactions,
            total_spent,
            total_transactions,
        },
    ))
}

/// Orders containing the owner's shop items, with sales statistics. Lines and
/// totals are scoped to the owner's shop even when an order spans shops.
pub async fn get_shop_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ShopOrders>> {
    ensure_owner(user)?;

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    let items = InventoryItems::find()
        .filter(ItemCol::ShopId.eq(shop.id))
        .all(&state.orm)
        .await?;
    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let items_by_id: HashMap<Uuid, &ItemModel> = items.iter().map(|i| (i.id, i)).collect();

    let lines = OrderLines::find()
        .filter(LineCol::ItemId.is_in(item_ids))
        .all(&state.orm)
        .await?;
    let lines_by_order = group_lines(&lines);

    let order_ids: Vec<Uuid> = lines_by_order.keys().copied().collect();
    let orders = Orders::find()
        .filter(OrderCol::Id.is_in(order_ids.clone()))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let payments = Payments::find()
        .filter(PaymentCol::OrderId.is_in(order_ids))
        .all(&state.orm)
        .await?;
    let payments_by_order: HashMap<Uuid, _> =
        payments.iter().map(|p| (p.order_id, p)).collect();

    let customer_ids: Vec<Uuid> = orders.iter().map(|o| o.customer_id).collect();
    let customers = Users::find()
        .filter(UserCol::Id.is_in(customer_ids))
        .all(&state.orm)
        .await?;
    let customer_names: HashMap<Uuid, &str> =
        customers.iter().map(|u| (u.id, u.name.as_str())).collect();

    let mut total_sales: i64 = 0;
    let mut total_items: i64 = 0;
    let mut completed_orders = 0usize;
    let mut pending_orders = 0usize;
    let mut entries = Vec::with_capacity(orders.len());

    for order in &orders {
        let shop_lines = lines_by_order.get(&order.id).map(Vec::as_slice).unwrap_or(&[]);
        let shop_total: i64 = shop_lines
            .iter()
            .map(|l| l.price * i64::from(l.quantity))
            .sum();

        match order.status.as_str() {
            STATUS_COMPLETED => {
                completed_orders += 1;
                total_sales += shop_total;
            }
            STATUS_PENDING => pending_orders += 1,
            _ => {}
        }
        total_items += shop_lines.iter().map(|l| i64::from(l.quantity)).sum::<i64>();

        entries.push(ShopOrderEntry {
            id: order.id,
            customer: customer_names
                .get(&order.customer_id)
                .copied()
                .unwrap_or("Unknown")
                .to_string(),
            date: order.created_at.format("%Y-%m-%d").to_string(),
            total: shop_total,
            status: order.status.clone(),
            item_count: shop_lines.len(),
            items: display_lines(shop_lines, &items_by_id),
            payment: payments_by_order.get(&order.id).map(|p| PaymentSummary {
                method: p.payment_method.clone(),
                status: p.status.clone(),
            }),
            created_at: order.created_at.with_timezone(&Utc),
        });
    }

    let statistics = ShopOrderStats {
        total_orders: orders.len(),
        completed_orders,
        pending_orders,
        total_sales,
        total_items,
    };

    Ok(ApiResponse::success(
        "Ok",
        ShopOrders {
            orders: entries,
            statistics,
        },
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    // Customers may only read their own orders; owners see any.
    if user.role == ROLE_CUSTOMER && order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let lines = OrderLines::find()
        .filter(LineCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(line_from_entity)
        .collect();

    let customer = Users::find_by_id(order.customer_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".into()))?;

    Ok(ApiResponse::success(
        "Ok",
        OrderDetail {
            order: order_from_entity(order),
            lines,
            customer: customer_summary(customer),
        },
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    validate_order_status(&payload.status)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
    ))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Invalid status. Must be PENDING, COMPLETED, or CANCELLED".into(),
        ))
    }
}

fn group_lines(lines: &[LineModel]) -> HashMap<Uuid, Vec<&LineModel>> {
    let mut grouped: HashMap<Uuid, Vec<&LineModel>> = HashMap::new();
    for line in lines {
        grouped.entry(line.order_id).or_default().push(line);
    }
    grouped
}

fn display_lines(
    lines: &[&LineModel],
    items_by_id: &HashMap<Uuid, &ItemModel>,
) -> Vec<LineDisplay> {
    lines
        .iter()
        .map(|l| LineDisplay {
            name: items_by_id
                .get(&l.item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "Unknown item".to_string()),
            quantity: l.quantity,
            price: l.price,
        })
        .collect()
}

/// Human-readable order code, e.g. `ORD-2026-3F9A1C`.
fn build_order_code(order: &OrderModel) -> String {
    let id_str = order.id.to_string();
    format!(
        "ORD-{}-{}",
        order.created_at.year(),
        id_str[..6].to_uppercase()
    )
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_id: model.customer_id,
        total_amount: model.total_amount,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn line_from_entity(model: LineModel) -> OrderLine {
    OrderLine {
        id: model.id,
        order_id: model.order_id,
        item_id: model.item_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn customer_summary(model: UserModel) -> CustomerSummary {
    CustomerSummary {
        id: model.id,
        name: model.name,
        email: model.email,
        username: model.username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_code_uses_year_and_id_prefix() {
        let id = Uuid::parse_str("3f9a1c2e-0000-0000-0000-000000000000").unwrap();
        let created = chrono::FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 8, 28, 12, 0, 0)
            .unwrap();
        let order = OrderModel {
            id,
            customer_id: Uuid::new_v4(),
            total_amount: 0,
            status: STATUS_PENDING.into(),
            created_at: created,
            updated_at: created,
        };
        assert_eq!(build_order_code(&order), "ORD-2026-3F9A1C");
    }

    #[test]
    fn status_validation() {
        assert!(validate_order_status("PENDING").is_ok());
        assert!(validate_order_status("COMPLETED").is_ok());
        assert!(validate_order_status("CANCELLED").is_ok());
        assert!(validate_order_status("SHIPPED").is_err());
        assert!(validate_order_status("pending").is_err());
    }
}
