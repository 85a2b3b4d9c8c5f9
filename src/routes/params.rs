use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub shop_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShopQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShopItemsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}
