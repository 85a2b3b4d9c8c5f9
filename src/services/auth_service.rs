use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{AuthResponse, Claims, LoginRequest, ProfileResponse, RegisterRequest},
    entity::{
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ROLE_CUSTOMER, ROLE_OWNER, UserProfile},
    response::ApiResponse,
    state::AppState,
};

use super::shop_service::shop_from_entity;

pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let RegisterRequest {
        email,
        password,
        name,
        username,
        role,
        shop_name,
        shop_description,
    } = payload;

    if email.trim().is_empty()
        || password.is_empty()
        || name.trim().is_empty()
        || username.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Email, password, name, username, and role are required".into(),
        ));
    }
    if role != ROLE_CUSTOMER && role != ROLE_OWNER {
        return Err(AppError::BadRequest(
            "Role must be either CUSTOMER or OWNER".into(),
        ));
    }
    let shop_name = match (role.as_str(), shop_name) {
        (ROLE_OWNER, Some(n)) if !n.trim().is_empty() => Some(n),
        (ROLE_OWNER, _) => {
            return Err(AppError::BadRequest(
                "Shop name is required for owners".into(),
            ));
        }
        _ => None,
    };

    let existing = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(email.clone()))
                .add(UserCol::Username.eq(username.clone())),
        )
        .one(&state.orm)
        .await?;
    if let Some(existing) = existing {
        let message = if existing.email == email {
            "Email already exists"
        } else {
            "Username already exists"
        };
        return Err(AppError::BadRequest(message.into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    // Owner accounts get their shop in the same transaction.
    let txn = state.orm.begin().await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        username: Set(username),
        password_hash: Set(password_hash),
        name: Set(name),
        role: Set(role),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let shop = match shop_name {
        Some(shop_name) => Some(
            ShopActive {
                id: Set(Uuid::new_v4()),
                owner_id: Set(user.id),
                name: Set(shop_name),
                description: Set(shop_description),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?,
        ),
        None => None,
    };

    txn.commit().await?;

    let token = issue_token(&user)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "role": user.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "User created",
        AuthResponse {
            user: profile_from_entity(user),
            shop: shop.map(shop_from_entity),
            token,
        },
    ))
}

pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { email, password } = payload;

    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.id))
        .one(&state.orm)
        .await?;

    let token = issue_token(&user)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            user: profile_from_entity(user),
            shop: shop.map(shop_from_entity),
            token,
        },
    ))
}

pub async fn get_profile(
    state: &AppState,
    auth: &AuthUser,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.id))
        .one(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Ok",
        ProfileResponse {
            user: profile_from_entity(user),
            shop: shop.map(shop_from_entity),
        },
    ))
}

fn issue_token(user: &UserModel) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(7))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn profile_from_entity(model: UserModel) -> UserProfile {
    UserProfile {
        id: model.id,
        email: model.email,
        username: model.username,
        name: model.name,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
