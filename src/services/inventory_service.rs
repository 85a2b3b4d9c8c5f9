use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::inventory::{
        CreateItemRequest, InventoryList, ItemWithShop, ShopRef, UpdateItemRequest,
    },
    entity::{
        inventory_items::{
            ActiveModel as ItemActive, Column, Entity as InventoryItems, Model as ItemModel,
        },
        shops::{Column as ShopCol, Entity as Shops, Model as ShopModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner},
    models::{ITEM_CATEGORIES, InventoryItem, ROLE_OWNER},
    response::ApiResponse,
    routes::params::InventoryQuery,
    state::AppState,
};

pub async fn list_inventory(
    state: &AppState,
    user: &AuthUser,
    query: InventoryQuery,
) -> AppResult<ApiResponse<InventoryList>> {
    // An owner always browses their own stock regardless of the filter.
    let shop_id = if user.role == ROLE_OWNER {
        let shop = Shops::find()
            .filter(ShopCol::OwnerId.eq(user.user_id))
            .one(&state.orm)
            .await?;
        shop.map(|s| s.id).or(query.shop_id)
    } else {
        query.shop_id
    };

    let mut condition = Condition::all();
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }
    if let Some(shop_id) = shop_id {
        condition = condition.add(Column::ShopId.eq(shop_id));
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let items = InventoryItems::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let shop_ids: Vec<Uuid> = items.iter().map(|i| i.shop_id).collect();
    let shops = Shops::find()
        .filter(ShopCol::Id.is_in(shop_ids))
        .all(&state.orm)
        .await?;
    let shops_by_id: HashMap<Uuid, &ShopModel> = shops.iter().map(|s| (s.id, s)).collect();

    let items = items
        .into_iter()
        .filter_map(|item| {
            let shop = shops_by_id.get(&item.shop_id)?;
            Some(ItemWithShop {
                shop: ShopRef {
                    id: shop.id,
                    name: shop.name.clone(),
                },
                item: item_from_entity(item),
            })
        })
        .collect();

    Ok(ApiResponse::success("Ok", InventoryList { items }))
}

pub async fn get_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<InventoryItem>> {
    let item = InventoryItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))?;

    Ok(ApiResponse::success("Ok", item_from_entity(item)))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateItemRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_owner(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name, category, quantity, and price are required".into(),
        ));
    }
    validate_category(&payload.category)?;
    if payload.quantity < 0 {
        return Err(AppError::BadRequest("Quantity cannot be negative".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Shop not found. Please create a shop first.".into())
        })?;

    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop.id),
        name: Set(payload.name),
        category: Set(payload.category),
        description: Set(payload.description),
        quantity: Set(payload.quantity),
        price: Set(payload.price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_create",
        Some("inventory_items"),
        Some(serde_json::json!({ "item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Item created", item_from_entity(item)))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_owner(user)?;

    let existing = find_owned_item(state, user, id).await?;

    if let Some(category) = payload.category.as_deref() {
        validate_category(category)?;
    }
    if matches!(payload.quantity, Some(q) if q < 0) {
        return Err(AppError::BadRequest("Quantity cannot be negative".into()));
    }
    if matches!(payload.price, Some(p) if p < 0) {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }

    let mut active: ItemActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }

    let item = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_update",
        Some("inventory_items"),
        Some(serde_json::json!({ "item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Item updated", item_from_entity(item)))
}

pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_owner(user)?;

    let existing = find_owned_item(state, user, id).await?;
    InventoryItems::delete_by_id(existing.id)
        .exec(&state.orm)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_delete",
        Some("inventory_items"),
        Some(serde_json::json!({ "item_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item deleted successfully",
        serde_json::json!({}),
    ))
}

/// Look up an item and verify it belongs to the requesting owner's shop.
async fn find_owned_item(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ItemModel> {
    let item = InventoryItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))?;

    let shop = Shops::find_by_id(item.shop_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    if shop.owner_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(item)
}

fn validate_category(category: &str) -> Result<(), AppError> {
    if ITEM_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Invalid category. Must be FISH, FISH_FOOD, FISH_PLANT, or AQUARIUM".into(),
        ))
    }
}

pub(crate) fn item_from_entity(model: ItemModel) -> InventoryItem {
    InventoryItem {
        id: model.id,
        shop_id: model.shop_id,
        name: model.name,
        category: model.category,
        description: model.description,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_validation() {
        for valid in ITEM_CATEGORIES {
            assert!(validate_category(valid).is_ok());
        }
        assert!(validate_category("CORAL").is_err());
        assert!(validate_category("fish").is_err());
    }
}
