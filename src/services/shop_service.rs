use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::shops::{MyShop, OwnerSummary, ShopDetail, ShopList, ShopSummary, UpdateShopRequest},
    entity::{
        inventory_items::{Column as ItemCol, Entity as InventoryItems},
        shops::{ActiveModel as ShopActive, Column, Entity as Shops, Model as ShopModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner},
    models::Shop,
    response::ApiResponse,
    routes::params::{ShopItemsQuery, ShopQuery},
    state::AppState,
};

use super::inventory_service::item_from_entity;

pub async fn list_shops(state: &AppState, query: ShopQuery) -> AppResult<ApiResponse<ShopList>> {
    let mut condition = Condition::all();
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let shops = Shops::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let owner_ids: Vec<Uuid> = shops.iter().map(|s| s.owner_id).collect();
    let owners = Users::find()
        .filter(UserCol::Id.is_in(owner_ids))
        .all(&state.orm)
        .await?;
    let owners_by_id: HashMap<Uuid, &UserModel> = owners.iter().map(|u| (u.id, u)).collect();

    let shop_ids: Vec<Uuid> = shops.iter().map(|s| s.id).collect();
    let items = InventoryItems::find()
        .filter(ItemCol::ShopId.is_in(shop_ids))
        .all(&state.orm)
        .await?;
    let mut item_counts: HashMap<Uuid, usize> = HashMap::new();
    for item in &items {
        *item_counts.entry(item.shop_id).or_default() += 1;
    }

    let shops = shops
        .into_iter()
        .filter_map(|shop| {
            let owner = owners_by_id.get(&shop.owner_id)?;
            Some(ShopSummary {
                owner: owner_summary(owner),
                item_count: item_counts.get(&shop.id).copied().unwrap_or(0),
                shop: shop_from_entity(shop),
            })
        })
        .collect();

    Ok(ApiResponse::success("Ok", ShopList { shops }))
}

pub async fn get_shop(
    state: &AppState,
    id: Uuid,
    query: ShopItemsQuery,
) -> AppResult<ApiResponse<ShopDetail>> {
    let shop = Shops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    let owner = Users::find_by_id(shop.owner_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop owner not found".into()))?;

    let mut condition = Condition::all().add(ItemCol::ShopId.eq(shop.id));
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(ItemCol::Category.eq(category.clone()));
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ItemCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ItemCol::Description).ilike(pattern)),
        );
    }

    let items = InventoryItems::find()
        .filter(condition)
        .order_by_desc(ItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        ShopDetail {
            owner: owner_summary(&owner),
            shop: shop_from_entity(shop),
            items,
        },
    ))
}

pub async fn get_my_shop(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MyShop>> {
    ensure_owner(user)?;

    let shop = Shops::find()
        .filter(Column::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    let items = InventoryItems::find()
        .filter(ItemCol::ShopId.eq(shop.id))
        .order_by_desc(ItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        MyShop {
            shop: shop_from_entity(shop),
            items,
        },
    ))
}

pub async fn update_shop(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    ensure_owner(user)?;

    let shop = Shops::find()
        .filter(Column::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    let mut active: ShopActive = shop.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let shop = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Shop updated", shop_from_entity(shop)))
}

fn owner_summary(model: &UserModel) -> OwnerSummary {
    OwnerSummary {
        id: model.id,
        name: model.name.clone(),
        username: model.username.clone(),
    }
}

pub(crate) fn shop_from_entity(model: ShopModel) -> Shop {
    Shop {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
