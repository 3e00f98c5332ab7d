//! HTTP handlers, one module per resource.

pub mod auth;
pub mod categories;
pub mod recipes;
pub mod upload;

use std::collections::HashMap;

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    error::AppError,
    models::{Recipe, RecipeResponse, RefSummary},
    state::AppState,
};

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::InvalidInput(format!("Invalid {what} id")))
}

/// Resolves owner and category references for a batch of recipes with one
/// `$in` query per collection, then joins them into response shapes.
pub async fn expand_recipes(
    state: &AppState,
    recipes: &[Recipe],
) -> Result<Vec<RecipeResponse>, AppError> {
    let owner_ids: Vec<ObjectId> = recipes.iter().map(|r| r.owner).collect();
    let category_ids: Vec<ObjectId> = recipes.iter().filter_map(|r| r.category).collect();

    let owners = user_summaries(state, owner_ids).await?;
    let categories = category_summaries(state, category_ids).await?;

    Ok(recipes
        .iter()
        .map(|recipe| {
            RecipeResponse::expand(
                recipe,
                owners.get(&recipe.owner).cloned(),
                recipe.category.and_then(|id| categories.get(&id).cloned()),
            )
        })
        .collect())
}

async fn user_summaries(
    state: &AppState,
    ids: Vec<ObjectId>,
) -> Result<HashMap<ObjectId, RefSummary>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = state
        .users()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(users
        .into_iter()
        .filter_map(|u| {
            let id = u.id?;
            Some((
                id,
                RefSummary {
                    id: id.to_hex(),
                    name: u.name,
                    image: u.image,
                },
            ))
        })
        .collect())
}

async fn category_summaries(
    state: &AppState,
    ids: Vec<ObjectId>,
) -> Result<HashMap<ObjectId, RefSummary>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let categories = state
        .categories()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(categories
        .into_iter()
        .filter_map(|c| {
            let id = c.id?;
            Some((
                id,
                RefSummary {
                    id: id.to_hex(),
                    name: c.name,
                    image: c.image,
                },
            ))
        })
        .collect())
}
