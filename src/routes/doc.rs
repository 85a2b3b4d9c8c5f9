use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, ProfileResponse},
        inventory::{InventoryList, ItemWithShop, ShopRef},
        orders::{
            CustomerSummary, LineDisplay, OrderDetail, PaymentDetail, PaymentHistory,
            PaymentHistoryEntry, PaymentSummary, ShopOrderEntry, ShopOrderStats, ShopOrders,
            TransactionEntry, TransactionHistory,
        },
        shops::{MyShop, OwnerSummary, ShopDetail, ShopList, ShopSummary},
    },
    models::{InventoryItem, Order, OrderLine, Payment, Shop, UserProfile},
    response::ApiResponse,
    routes::{auth, health, inventory, orders, params, shops},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        shops::list_shops,
        shops::get_shop,
        shops::get_my_shop,
        shops::update_shop,
        inventory::list_inventory,
        inventory::get_item,
        inventory::create_item,
        inventory::update_item,
        inventory::delete_item,
        orders::create_order,
        orders::get_my_orders,
        orders::get_shop_orders,
        orders::get_order,
        orders::update_order_status,
        orders::create_payment,
        orders::get_my_payments
    ),
    components(
        schemas(
            UserProfile,
            Shop,
            InventoryItem,
            Order,
            OrderLine,
            Payment,
            AuthResponse,
            ProfileResponse,
            ShopList,
            ShopSummary,
            ShopDetail,
            MyShop,
            OwnerSummary,
            InventoryList,
            ItemWithShop,
            ShopRef,
            OrderDetail,
            CustomerSummary,
            LineDisplay,
            TransactionEntry,
            TransactionHistory,
            ShopOrderEntry,
            ShopOrderStats,
            ShopOrders,
            PaymentSummary,
            PaymentDetail,
            PaymentHistory,
            PaymentHistoryEntry,
            params::InventoryQuery,
            params::ShopQuery,
            params::ShopItemsQuery,
            ApiResponse<Order>,
            ApiResponse<OrderDetail>,
            ApiResponse<InventoryItem>,
            ApiResponse<ShopList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Shops", description = "Shop directory"),
        (name = "Inventory", description = "Inventory management"),
        (name = "Orders", description = "Orders and payments"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
