//! Category domain. Creation, update and deletion are admin-only; reads
//! are public and expand member recipes for the browsing pages.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use futures::TryStreamExt;
use mongodb::{
    bson::{DateTime, Document, doc},
    options::ReturnDocument,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    auth::{AuthUser, require_admin},
    error::AppError,
    models::{Category, CategoryResponse, Recipe},
    state::AppState,
    utils::slugify,
};

use super::{expand_recipes, parse_object_id};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        // Reads address categories by slug, admin mutations by id; both
        // share the single path segment.
        .route(
            "/{key}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories: Vec<Category> = state
        .categories()
        .find(doc! {})
        .await?
        .try_collect()
        .await?;

    let mut expanded = Vec::with_capacity(categories.len());
    for category in &categories {
        expanded.push(expand_category(&state, category).await?);
    }

    Ok(Json(expanded))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = state
        .categories()
        .find_one(doc! { "slug": slug })
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    Ok(Json(expand_category(&state, &category).await?))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }

    if state
        .categories()
        .find_one(doc! { "name": &body.name })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Category already exists".to_string()));
    }

    let now = DateTime::now();
    let mut category = Category {
        id: None,
        slug: slugify(&body.name),
        name: body.name,
        image: body.image.unwrap_or_default(),
        recipes: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let inserted = state.categories().insert_one(&category).await?;
    category.id = inserted.inserted_id.as_object_id();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Category created successfully",
            "category": CategoryResponse::expand(&category, Vec::new()),
        })),
    ))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<UpdateCategoryRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let category_id = parse_object_id(&id, "category")?;

    let mut set = Document::new();
    if let Some(name) = patch.name {
        // The slug tracks the name wherever it goes.
        set.insert("slug", slugify(&name));
        set.insert("name", name);
    }
    if let Some(image) = patch.image {
        set.insert("image", image);
    }
    set.insert("updated_at", DateTime::now());

    let updated = state
        .categories()
        .find_one_and_update(doc! { "_id": category_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    Ok(Json(json!({
        "message": "Category updated successfully",
        "category": expand_category(&state, &updated).await?,
    })))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let category_id = parse_object_id(&id, "category")?;

    // Member recipes keep their category reference; readers treat a failed
    // lookup as "no category".
    let result = state
        .categories()
        .delete_one(doc! { "_id": category_id })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Category"));
    }

    Ok(Json(json!({ "message": "Category deleted successfully" })))
}

/// Resolves the category's denormalized member list into full recipes, each
/// with its owner summary.
async fn expand_category(
    state: &AppState,
    category: &Category,
) -> Result<CategoryResponse, AppError> {
    let recipes: Vec<Recipe> = state
        .recipes()
        .find(doc! { "_id": { "$in": category.recipes.clone() } })
        .await?
        .try_collect()
        .await?;

    Ok(CategoryResponse::expand(
        category,
        expand_recipes(state, &recipes).await?,
    ))
}
