use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use fishmarket_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let owner_id = ensure_user(&pool, "owner@example.com", "owner123", "OWNER", "Ola Owner").await?;
    let customer_id =
        ensure_user(&pool, "customer@example.com", "customer123", "CUSTOMER", "Cass Customer")
            .await?;
    let shop_id = ensure_shop(&pool, owner_id, "Reef & River").await?;
    seed_items(&pool, shop_id).await?;

    println!("Seed completed. Owner ID: {owner_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
    name: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let username = email.split('@').next().unwrap_or(email);

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, password_hash, name, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If the user already exists, fetch the id.
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_shop(pool: &sqlx::PgPool, owner_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO shops (id, owner_id, name, description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (owner_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(name)
    .bind("Freshwater and reef livestock")
    .fetch_optional(pool)
    .await?;

    let shop_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM shops WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured shop {name}");
    Ok(shop_id)
}

async fn seed_items(pool: &sqlx::PgPool, shop_id: Uuid) -> anyhow::Result<()> {
    let existing: (i64,) =
        sqlx::query_as("SELECT count(*) FROM inventory_items WHERE shop_id = $1")
            .bind(shop_id)
            .fetch_one(pool)
            .await?;
    if existing.0 > 0 {
        println!("Inventory already seeded");
        return Ok(());
    }

    let items = vec![
        ("Clownfish", "FISH", "Tank-bred ocellaris", 15000i64, 12),
        ("Neon Tetra", "FISH", "Schooling freshwater fish", 2500, 60),
        ("Flake Food 200g", "FISH_FOOD", "Staple tropical diet", 8000, 40),
        ("Java Fern", "FISH_PLANT", "Low-light hardy plant", 6000, 25),
        ("60L Aquarium Kit", "AQUARIUM", "Tank, lid and light", 450000, 5),
    ];

    for (name, category, desc, price, quantity) in items {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, shop_id, name, category, description, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(shop_id)
        .bind(name)
        .bind(category)
        .bind(desc)
        .bind(quantity)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded inventory");
    Ok(())
}
