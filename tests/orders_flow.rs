use fishmarket_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{
        CreateOrderRequest, CreatePaymentRequest, OrderLineRequest, UpdateOrderStatusRequest,
    },
    entity::{
        inventory_items::{ActiveModel as ItemActive, Entity as InventoryItems},
        orders::{Column as OrderCol, Entity as Orders},
        shops::ActiveModel as ShopActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{order_service, payment_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    Statement,
};
use uuid::Uuid;

// End-to-end ledger flow: customer orders against a shop's stock, pays, and
// both sides read their histories. Covers the stock, total, and payment
// invariants in one sequential run.
#[tokio::test]
async fn order_and_payment_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    // Seed an owner with a shop, plus two customers.
    let owner_id = create_user(&state, "OWNER", "owner@example.com").await?;
    let customer_id = create_user(&state, "CUSTOMER", "customer@example.com").await?;
    let other_customer_id = create_user(&state, "CUSTOMER", "other@example.com").await?;

    let shop = ShopActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set("Reef & River".into()),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // price 150.00 (15000 centavos), stock 10
    let clownfish = create_item(&state, shop.id, "Clownfish", 15_000, 10).await?;
    // stock 3, used for the insufficient-stock scenario
    let tetra = create_item(&state, shop.id, "Neon Tetra", 2_500, 3).await?;

    let customer = AuthUser {
        user_id: customer_id,
        role: "CUSTOMER".into(),
    };
    let other_customer = AuthUser {
        user_id: other_customer_id,
        role: "CUSTOMER".into(),
    };
    let owner = AuthUser {
        user_id: owner_id,
        role: "OWNER".into(),
    };

    // Empty cart is rejected outright.
    let err = order_service::create_order(&state, &customer, CreateOrderRequest { items: vec![] })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Unknown item aborts the whole order.
    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: Uuid::new_v4(),
                quantity: 1,
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Requesting 5 against stock 3 fails and leaves stock untouched.
    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: tetra,
                quantity: 5,
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(item_stock(&state, tetra).await?, 3);
    let persisted = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer_id))
        .count(&state.orm)
        .await?;
    assert_eq!(persisted, 0, "failed order must not persist anything");

    // 2 x 150.00 succeeds: total 300.00, stock 10 -> 8.
    let created = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLineRequest {
                item_id: clownfish,
                quantity: 2,
            }],
        },
    )
    .await?;
    let detail = created.data.unwrap();
    assert_eq!(detail.order.total_amount, 30_000);
    assert_eq!(detail.order.status, "PENDING");
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].price, 15_000);
    assert_eq!(item_stock(&state, clownfish).await?, 8);

    // Two concurrent orders of 6 against stock 8: exactly one wins.
    let big = || CreateOrderRequest {
        items: vec![OrderLineRequest {
            item_id: clownfish,
            quantity: 6,
        }],
    };
    let (first, second) = tokio::join!(
        order_service::create_order(&state, &customer, big()),
        order_service::create_order(&state, &other_customer, big()),
    );
    assert!(
        first.is_ok() ^ second.is_ok(),
        "exactly one of two competing orders must succeed"
    );
    assert_eq!(item_stock(&state, clownfish).await?, 2);
    let loser = if first.is_err() {
        first.unwrap_err()
    } else {
        second.unwrap_err()
    };
    assert!(matches!(loser, AppError::Conflict(_)));

    // Total stays frozen against later price changes.
    let mut repriced: ItemActive = InventoryItems::find_by_id(clownfish)
        .one(&state.orm)
        .await?
        .unwrap()
        .into();
    repriced.price = Set(99_000);
    repriced.update(&state.orm).await?;
    let reread = order_service::get_order(&state, &customer, detail.order.id).await?;
    let reread = reread.data.unwrap();
    assert_eq!(reread.order.total_amount, 30_000);
    assert_eq!(reread.lines[0].price, 15_000);

    // A foreign customer cannot read the order; the shop owner can.
    let err = order_service::get_order(&state, &other_customer, detail.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    order_service::get_order(&state, &owner, detail.order.id).await?;

    // Pay: payment amount matches the order total and the status flips.
    let paid = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            order_id: detail.order.id,
            payment_method: "gcash".into(),
        },
    )
    .await?;
    let paid = paid.data.unwrap();
    assert_eq!(paid.payment.amount, 30_000);
    assert_eq!(paid.payment.status, "PAID");
    assert_eq!(paid.order.status, "COMPLETED");

    // A second payment on the same order is a conflict; the first one survives.
    let err = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            order_id: detail.order.id,
            payment_method: "card".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let history = payment_service::get_my_payments(&state, &customer).await?;
    let history = history.data.unwrap();
    assert_eq!(history.payments.len(), 1);
    assert_eq!(history.payments[0].payment.payment_method, "gcash");

    // Paying someone else's order is forbidden before any write happens.
    let err = payment_service::create_payment(
        &state,
        &other_customer,
        CreatePaymentRequest {
            order_id: detail.order.id,
            payment_method: "cash".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Customer history shows the paid order with display fields.
    let mine = order_service::get_my_orders(&state, &customer).await?;
    let mine = mine.data.unwrap();
    let entry = mine
        .transactions
        .iter()
        .find(|t| t.id == detail.order.id)
        .expect("paid order in history");
    assert!(entry.order_code.starts_with("ORD-"));
    assert_eq!(entry.shop, "Reef & River");
    assert_eq!(entry.payment_method, "gcash");
    assert_eq!(mine.total_spent, 30_000);

    // Owner view: one completed order plus whichever concurrent order won.
    let shop_orders = order_service::get_shop_orders(&state, &owner).await?;
    let shop_orders = shop_orders.data.unwrap();
    assert_eq!(shop_orders.statistics.total_orders, 2);
    assert_eq!(shop_orders.statistics.completed_orders, 1);
    assert_eq!(shop_orders.statistics.pending_orders, 1);
    assert_eq!(shop_orders.statistics.total_sales, 30_000);
    assert_eq!(shop_orders.statistics.total_items, 8);

    // Status update validates membership but not transitions.
    let err = order_service::update_order_status(
        &state,
        &owner,
        detail.order.id,
        UpdateOrderStatusRequest {
            status: "SHIPPED".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let updated = order_service::update_order_status(
        &state,
        &owner,
        detail.order.id,
        UpdateOrderStatusRequest {
            status: "CANCELLED".into(),
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, "CANCELLED");

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, order_lines, orders, inventory_items, shops, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let username = email.split('@').next().unwrap_or(email).to_string();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(username.clone()),
        password_hash: Set("dummy".into()),
        name: Set(username),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_item(
    state: &AppState,
    shop_id: Uuid,
    name: &str,
    price: i64,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop_id),
        name: Set(name.into()),
        category: Set("FISH".into()),
        description: Set(None),
        quantity: Set(quantity),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(item.id)
}

async fn item_stock(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let item = InventoryItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("item exists");
    Ok(item.quantity)
}
