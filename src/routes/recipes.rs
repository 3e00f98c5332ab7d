//! Recipe domain: CRUD plus the save/like/review relationships.
//!
//! Ownership rule: only the user referenced by `recipe.owner` may update or
//! delete it. Save/unsave maintain the acting user's saved-list with an
//! explicit membership check (double-save is an error); like/unlike lean on
//! `$addToSet`/`$pull` set semantics and stay silent on repeats.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use futures::TryStreamExt;
use mongodb::{
    bson::{DateTime, Document, doc, oid::ObjectId, to_bson},
    options::ReturnDocument,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Recipe, RecipeResponse, Review},
    state::AppState,
};

use super::{expand_recipes, parse_object_id};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/saveRecipe", put(save_recipe))
        .route("/unsaveRecipe", put(unsave_recipe))
        .route("/savedRecipes/{user_id}", get(saved_recipes))
        .route("/savedRecipes/ids/{user_id}", get(saved_recipe_ids))
        .route("/like", put(like_recipe))
        .route("/unlike", put(unlike_recipe))
        .route("/reviews/{recipe_id}/{review_id}", delete(delete_review))
        .route(
            "/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/{id}/reviews", post(add_review))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub name: String,
    pub instructions: String,
    pub ingredients: Vec<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub instructions: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct RecipeIdBody {
    #[serde(rename = "recipeID")]
    pub recipe_id: String,
}

#[derive(Deserialize)]
pub struct AddReviewRequest {
    pub rating: f64,
    pub comment: String,
}

async fn list_recipes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let recipes: Vec<Recipe> = state
        .recipes()
        .find(doc! {})
        .await?
        .try_collect()
        .await?;

    Ok(Json(expand_recipes(&state, &recipes).await?))
}

async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    if body.name.trim().is_empty()
        || body.instructions.trim().is_empty()
        || body.ingredients.is_empty()
    {
        return Err(AppError::InvalidInput(
            "Name, instructions and ingredients are required".to_string(),
        ));
    }

    let cooking_time = body.cooking_time.unwrap_or(0);
    if cooking_time < 0 {
        return Err(AppError::InvalidInput(
            "Cooking time must be non-negative".to_string(),
        ));
    }

    let category = body
        .category
        .as_deref()
        .map(|raw| parse_object_id(raw, "category"))
        .transpose()?;

    let owner = user.id.ok_or(AppError::Unauthorized)?;
    let now = DateTime::now();

    let mut recipe = Recipe {
        id: None,
        name: body.name,
        instructions: body.instructions,
        ingredients: body.ingredients,
        image: body.image.unwrap_or_default(),
        cooking_time,
        views: 0,
        rating: 0.0,
        num_reviews: 0,
        likes: Vec::new(),
        category,
        owner,
        reviews: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let inserted = state.recipes().insert_one(&recipe).await?;
    recipe.id = inserted.inserted_id.as_object_id();

    // Denormalized back-link: the category tracks its member recipes.
    if let (Some(category_id), Some(recipe_id)) = (category, recipe.id) {
        state
            .categories()
            .update_one(
                doc! { "_id": category_id },
                doc! { "$push": { "recipes": recipe_id } },
            )
            .await?;
    }

    let mut expanded = expand_recipes(&state, std::slice::from_ref(&recipe)).await?;
    Ok((StatusCode::CREATED, Json(expanded.remove(0))))
}

/// Each detail fetch counts as a view; the increment is atomic so
/// concurrent fetches never lose a count.
async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe_id = parse_object_id(&id, "recipe")?;

    let recipe = state
        .recipes()
        .find_one_and_update(doc! { "_id": recipe_id }, doc! { "$inc": { "views": 1 } })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    let mut expanded = expand_recipes(&state, std::slice::from_ref(&recipe)).await?;
    Ok(Json(expanded.remove(0)))
}

async fn update_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe_id = parse_object_id(&id, "recipe")?;

    let recipe = state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    recipe.ensure_owned_by(&user)?;

    let mut set = Document::new();
    if let Some(name) = patch.name {
        set.insert("name", name);
    }
    if let Some(instructions) = patch.instructions {
        set.insert("instructions", instructions);
    }
    if let Some(ingredients) = patch.ingredients {
        set.insert("ingredients", ingredients);
    }
    if let Some(image) = patch.image {
        set.insert("image", image);
    }
    if let Some(cooking_time) = patch.cooking_time {
        if cooking_time < 0 {
            return Err(AppError::InvalidInput(
                "Cooking time must be non-negative".to_string(),
            ));
        }
        set.insert("cooking_time", cooking_time);
    }
    if let Some(category) = patch.category.as_deref() {
        set.insert("category", parse_object_id(category, "category")?);
    }
    set.insert("updated_at", DateTime::now());

    let updated = state
        .recipes()
        .find_one_and_update(doc! { "_id": recipe_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    let mut expanded = expand_recipes(&state, std::slice::from_ref(&updated)).await?;
    Ok(Json(expanded.remove(0)))
}

async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&id, "recipe")?;

    let recipe = state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    recipe.ensure_owned_by(&user)?;

    state.recipes().delete_one(doc! { "_id": recipe_id }).await?;

    // Keep the category's membership list consistent with the deletion.
    if let Some(category_id) = recipe.category {
        state
            .categories()
            .update_one(
                doc! { "_id": category_id },
                doc! { "$pull": { "recipes": recipe_id } },
            )
            .await?;
    }

    Ok(Json(json!({ "message": "Recipe deleted successfully" })))
}

async fn save_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecipeIdBody>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&body.recipe_id, "recipe")?;
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    user.ensure_not_saved(recipe_id)?;

    let updated = state
        .users()
        .find_one_and_update(
            doc! { "_id": user_id },
            doc! { "$addToSet": { "saved_recipes": recipe_id } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "message": "Recipe saved successfully",
        "savedRecipes": hex_ids(&updated.saved_recipes),
    })))
}

async fn unsave_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecipeIdBody>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&body.recipe_id, "recipe")?;
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    user.ensure_saved(recipe_id)?;

    let updated = state
        .users()
        .find_one_and_update(
            doc! { "_id": user_id },
            doc! { "$pull": { "saved_recipes": recipe_id } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "message": "Recipe unsaved successfully",
        "savedRecipes": hex_ids(&updated.saved_recipes),
    })))
}

async fn saved_recipes(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_object_id(&user_id, "user")?;

    let user = state
        .users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let recipes: Vec<Recipe> = state
        .recipes()
        .find(doc! { "_id": { "$in": user.saved_recipes } })
        .await?
        .try_collect()
        .await?;

    Ok(Json(
        json!({ "savedRecipes": expand_recipes(&state, &recipes).await? }),
    ))
}

async fn saved_recipe_ids(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_object_id(&user_id, "user")?;

    let user = state
        .users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({ "savedRecipes": hex_ids(&user.saved_recipes) })))
}

async fn like_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecipeIdBody>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&body.recipe_id, "recipe")?;
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    let updated = state
        .recipes()
        .find_one_and_update(
            doc! { "_id": recipe_id },
            doc! { "$addToSet": { "likes": user_id } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    Ok(Json(json!({
        "message": "Recipe liked",
        "likes": hex_ids(&updated.likes),
    })))
}

async fn unlike_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecipeIdBody>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&body.recipe_id, "recipe")?;
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    let updated = state
        .recipes()
        .find_one_and_update(
            doc! { "_id": recipe_id },
            doc! { "$pull": { "likes": user_id } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    Ok(Json(json!({
        "message": "Recipe unliked",
        "likes": hex_ids(&updated.likes),
    })))
}

async fn add_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let recipe_id = parse_object_id(&id, "recipe")?;
    let user_id = user.id.ok_or(AppError::Unauthorized)?;

    if !(1.0..=5.0).contains(&body.rating) {
        return Err(AppError::InvalidInput(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    if body.comment.trim().is_empty() {
        return Err(AppError::InvalidInput("Comment is required".to_string()));
    }

    let mut recipe = state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    // Multiple reviews by the same user are allowed; each submission is a
    // fresh entry.
    recipe.reviews.push(Review {
        id: ObjectId::new(),
        name: user.name,
        rating: body.rating,
        comment: body.comment,
        user: user_id,
        created_at: DateTime::now(),
    });
    recipe.recompute_reviews();

    persist_reviews(&state, recipe_id, &recipe).await?;

    let mut expanded = expand_recipes(&state, std::slice::from_ref(&recipe)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review added", "recipe": expanded.remove(0) })),
    ))
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Path((recipe_id, review_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let recipe_id = parse_object_id(&recipe_id, "recipe")?;
    let review_id = parse_object_id(&review_id, "review")?;

    let mut recipe = state
        .recipes()
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or(AppError::NotFound("Recipe"))?;

    let position = recipe
        .reviews
        .iter()
        .position(|r| r.id == review_id)
        .ok_or(AppError::NotFound("Review"))?;

    recipe.reviews.remove(position);
    recipe.recompute_reviews();

    persist_reviews(&state, recipe_id, &recipe).await?;

    let mut expanded = expand_recipes(&state, std::slice::from_ref(&recipe)).await?;
    Ok(Json(
        json!({ "message": "Review deleted", "recipe": expanded.remove(0) }),
    ))
}

/// Writes the review collection and both derived fields in one `$set` so a
/// reader never observes them out of step with each other.
async fn persist_reviews(
    state: &AppState,
    recipe_id: ObjectId,
    recipe: &Recipe,
) -> Result<(), AppError> {
    state
        .recipes()
        .update_one(
            doc! { "_id": recipe_id },
            doc! { "$set": {
                "reviews": to_bson(&recipe.reviews)?,
                "num_reviews": recipe.num_reviews,
                "rating": recipe.rating,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;

    Ok(())
}

fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}
