use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::shops::{MyShop, ShopDetail, ShopList, UpdateShopRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Shop,
    response::ApiResponse,
    routes::params::{ShopItemsQuery, ShopQuery},
    services::shop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shops))
        .route("/my/shop", get(get_my_shop).put(update_shop))
        .route("/{id}", get(get_shop))
}

#[utoipa::path(
    get,
    path = "/api/shops",
    responses(
        (status = 200, description = "All shops", body = ApiResponse<ShopList>)
    ),
    tag = "Shops"
)]
pub async fn list_shops(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ShopQuery>,
) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::list_shops(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}",
    responses(
        (status = 200, description = "Shop with items", body = ApiResponse<ShopDetail>),
        (status = 404, description = "Shop not found")
    ),
    tag = "Shops"
)]
pub async fn get_shop(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ShopItemsQuery>,
) -> AppResult<Json<ApiResponse<ShopDetail>>> {
    let resp = shop_service::get_shop(&state, id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/my/shop",
    responses(
        (status = 200, description = "Owner's shop", body = ApiResponse<MyShop>),
        (status = 403, description = "Owner role required")
    ),
    tag = "Shops"
)]
pub async fn get_my_shop(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MyShop>>> {
    let resp = shop_service::get_my_shop(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/shops/my/shop",
    request_body = UpdateShopRequest,
    responses(
        (status = 200, description = "Shop updated", body = ApiResponse<Shop>),
        (status = 403, description = "Owner role required")
    ),
    tag = "Shops"
)]
pub async fn update_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::update_shop(&state, &user, payload).await?;
    Ok(Json(resp))
}
