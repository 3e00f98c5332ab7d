//! Identity and profile handlers. Registration and login hand out a signed
//! bearer token; everything else resolves the principal through [`AuthUser`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use futures::TryStreamExt;
use mongodb::{
    bson::{DateTime, Document, doc},
    options::ReturnDocument,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    auth::{AuthUser, hash_password, issue_token, require_admin, verify_password},
    error::AppError,
    models::{Recipe, Role, User, UserResponse},
    state::AppState,
};

use super::{expand_recipes, parse_object_id};

const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/profile", get(profile))
        .route("/update-profile", put(update_profile))
        .route("/forgot-password", post(forgot_password))
        .route("/users", get(list_users))
        .route("/user", delete(delete_self))
        .route("/user/{id}", get(user_profile).delete(delete_user))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub answer: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub answer: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub about: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<String>,
    pub interests: Option<Vec<String>>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.answer.trim().is_empty()
    {
        return Err(AppError::InvalidInput("Please fill all fields".to_string()));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if state
        .users()
        .find_one(doc! { "email": &body.email })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hashed = hash_password(&body.password)?;
    let mut user = User::new(body.name, body.email, hashed, body.answer);

    let inserted = state.users().insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    let user_id = user.id.ok_or(AppError::Unauthorized)?;
    let token = issue_token(&user_id, &state.config.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "token": token,
            "user": UserResponse::from(&user),
        })),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let user = state
        .users()
        .find_one(doc! { "email": &body.email })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !verify_password(&body.password, &user.password)? {
        return Err(AppError::InvalidCredentials);
    }

    let user_id = user.id.ok_or(AppError::Unauthorized)?;
    let token = issue_token(&user_id, &state.config.jwt_secret)?;

    Ok(Json(json!({
        "message": "User logged in successfully",
        "token": token,
        "user": UserResponse::from(&user),
    })))
}

/// Sessions live entirely in the token, so logout is a client-side act.
async fn logout() -> Json<Value> {
    Json(json!({ "message": "User logged out" }))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    let recipes: Vec<Recipe> = state
        .recipes()
        .find(doc! { "owner": user_id })
        .await?
        .try_collect()
        .await?;

    let token = issue_token(&user_id, &state.config.jwt_secret)?;

    Ok(Json(json!({
        "message": "User profile fetched successfully",
        "token": token,
        "user": UserResponse::from(&user),
        "recipes": expand_recipes(&state, &recipes).await?,
    })))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(patch): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    let mut set = Document::new();
    if let Some(name) = patch.name {
        set.insert("name", name);
    }
    if let Some(email) = patch.email {
        set.insert("email", email);
    }
    if let Some(image) = patch.image {
        set.insert("image", image);
    }
    if let Some(about) = patch.about {
        set.insert("about", about);
    }
    if let Some(phone) = patch.phone {
        set.insert("phone", phone);
    }
    if let Some(address) = patch.address {
        set.insert("address", address);
    }
    if let Some(birthday) = patch.birthday {
        set.insert("birthday", birthday);
    }
    if let Some(interests) = patch.interests {
        set.insert("interests", interests);
    }
    set.insert("updated_at", DateTime::now());

    let updated = state
        .users()
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let token = issue_token(&user_id, &state.config.jwt_secret)?;

    Ok(Json(json!({
        "message": "User updated successfully",
        "token": token,
        "user": UserResponse::from(&updated),
    })))
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if body.email.trim().is_empty()
        || body.answer.trim().is_empty()
        || body.new_password.trim().is_empty()
    {
        return Err(AppError::InvalidInput("Please fill all fields".to_string()));
    }

    let user = state
        .users()
        .find_one(doc! { "email": &body.email })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if user.answer != body.answer {
        return Err(AppError::InvalidInput("Answer is incorrect".to_string()));
    }

    let hashed = hash_password(&body.new_password)?;

    state
        .users()
        .update_one(
            doc! { "_id": user.id.ok_or(AppError::NotFound("User"))? },
            doc! { "$set": { "password": hashed, "updated_at": DateTime::now() } },
        )
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn delete_self(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    // Authored recipes go with the account.
    state.recipes().delete_many(doc! { "owner": user_id }).await?;
    state.users().delete_one(doc! { "_id": user_id }).await?;

    Ok(Json(
        json!({ "message": "Sad to see you go, user deleted successfully" }),
    ))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(acting): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_admin(&acting)?;

    let target_id = parse_object_id(&id, "user")?;

    let target = state
        .users()
        .find_one(doc! { "_id": target_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    // Admins cannot remove other admins.
    if target.role == Role::Admin && target.id != acting.id {
        return Err(AppError::Forbidden);
    }

    state
        .recipes()
        .delete_many(doc! { "owner": target_id })
        .await?;
    state.users().delete_one(doc! { "_id": target_id }).await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(acting): AuthUser,
) -> Result<Json<Value>, AppError> {
    require_admin(&acting)?;

    let users: Vec<User> = state.users().find(doc! {}).await?.try_collect().await?;

    Ok(Json(json!({
        "message": "All users",
        "users": users.iter().map(UserResponse::from).collect::<Vec<_>>(),
    })))
}

async fn user_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_object_id(&id, "user")?;

    let user = state
        .users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let recipes: Vec<Recipe> = state
        .recipes()
        .find(doc! { "owner": user_id })
        .await?
        .try_collect()
        .await?;

    Ok(Json(json!({
        "user": UserResponse::from(&user),
        "recipes": expand_recipes(&state, &recipes).await?,
    })))
}
