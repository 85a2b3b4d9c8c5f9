use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderLine, Payment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub customer: CustomerSummary,
}

/// One line rendered for display: item name plus the snapshot price.
#[derive(Debug, Serialize, ToSchema)]
pub struct LineDisplay {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub order_code: String,
    pub shop: String,
    pub date: String,
    pub total: i64,
    pub status: String,
    pub payment_method: String,
    pub payment_id: Option<Uuid>,
    pub items: Vec<LineDisplay>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionHistory {
    pub transactions: Vec<TransactionEntry>,
    pub total_spent: i64,
    pub total_transactions: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSummary {
    pub method: String,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopOrderEntry {
    pub id: Uuid,
    pub customer: String,
    pub date: String,
    pub total: i64,
    pub status: String,
    pub item_count: usize,
    pub items: Vec<LineDisplay>,
    pub payment: Option<PaymentSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopOrderStats {
    pub total_orders: usize,
    pub completed_orders: usize,
    pub pending_orders: usize,
    pub total_sales: i64,
    pub total_items: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopOrders {
    pub orders: Vec<ShopOrderEntry>,
    pub statistics: ShopOrderStats,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDetail {
    pub payment: Payment,
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentHistoryEntry {
    pub order: Order,
    pub payment: Payment,
    pub items: Vec<LineDisplay>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentHistory {
    pub payments: Vec<PaymentHistoryEntry>,
}
