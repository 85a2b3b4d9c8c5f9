use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{InventoryItem, Shop};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopSummary {
    pub shop: Shop,
    pub owner: OwnerSummary,
    pub item_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopList {
    pub shops: Vec<ShopSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopDetail {
    pub shop: Shop,
    pub owner: OwnerSummary,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyShop {
    pub shop: Shop,
    pub items: Vec<InventoryItem>,
}
