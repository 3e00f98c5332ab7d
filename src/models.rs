//! Document models and their client-facing response shapes.
//!
//! Database structs keep raw `ObjectId` references; everything returned to
//! clients goes through a response struct carrying hex-string ids, expanded
//! owner/category summaries, and no password field.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_AVATAR: &str =
    "https://t4.ftcdn.net/jpg/03/32/59/65/240_F_332596535_lAdLhf6KzbW6PWXBWeIFTovTii1drkbT.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    /// Security answer checked by password recovery.
    pub answer: String,
    pub image: String,
    pub about: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub saved_recipes: Vec<ObjectId>,
    pub phone: String,
    pub address: String,
    pub birthday: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn new(name: String, email: String, password: String, answer: String) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            name,
            email,
            password,
            answer,
            image: DEFAULT_AVATAR.to_string(),
            about: "No bio yet".to_string(),
            role: Role::User,
            saved_recipes: Vec::new(),
            phone: "No phone number yet".to_string(),
            address: "No address yet".to_string(),
            birthday: "No birthday yet".to_string(),
            interests: vec!["No interests yet".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    /// Save-list admission: saving a recipe twice is an error, unlike the
    /// silent set semantics of likes.
    pub fn ensure_not_saved(&self, recipe_id: ObjectId) -> Result<(), AppError> {
        if self.saved_recipes.contains(&recipe_id) {
            return Err(AppError::AlreadySaved);
        }
        Ok(())
    }

    pub fn ensure_saved(&self, recipe_id: ObjectId) -> Result<(), AppError> {
        if !self.saved_recipes.contains(&recipe_id) {
            return Err(AppError::NotSaved);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Author display name, copied at creation time.
    pub name: String,
    pub rating: f64,
    pub comment: String,
    pub user: ObjectId,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub instructions: String,
    pub ingredients: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub cooking_time: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_reviews: i64,
    #[serde(default)]
    pub likes: Vec<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ObjectId>,
    pub owner: ObjectId,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Recipe {
    /// Rebuilds the derived review fields. Must run after every review
    /// insertion or removal so `num_reviews == reviews.len()` and `rating`
    /// is the arithmetic mean (0 when there are no reviews).
    pub fn recompute_reviews(&mut self) {
        self.num_reviews = self.reviews.len() as i64;
        self.rating = mean_rating(&self.reviews);
    }

    /// Only the owner may mutate or delete a recipe.
    pub fn ensure_owned_by(&self, user: &User) -> Result<(), AppError> {
        if Some(self.owner) != user.id {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

pub fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }

    reviews.iter().map(|r| r.rating).sum::<f64>() / reviews.len() as f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    pub image: String,
    #[serde(default)]
    pub recipes: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

// ---------------------------------------------------------------------------
// Response shapes

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
    pub about: String,
    pub role: Role,
    pub saved_recipes: Vec<String>,
    pub phone: String,
    pub address: String,
    pub birthday: String,
    pub interests: Vec<String>,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: hex_id(&user.id),
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            about: user.about.clone(),
            role: user.role,
            saved_recipes: user.saved_recipes.iter().map(|id| id.to_hex()).collect(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            birthday: user.birthday.clone(),
            interests: user.interests.clone(),
            created_at: rfc3339(user.created_at),
        }
    }
}

/// Owner or category reference expanded to what recipe cards render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefSummary {
    pub id: String,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub name: String,
    pub rating: f64,
    pub comment: String,
    pub user: String,
    pub created_at: String,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.to_hex(),
            name: review.name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            user: review.user.to_hex(),
            created_at: rfc3339(review.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub ingredients: Vec<String>,
    pub image: String,
    pub cooking_time: i64,
    pub views: i64,
    pub rating: f64,
    pub num_reviews: i64,
    pub likes: Vec<String>,
    pub category: Option<RefSummary>,
    pub owner: Option<RefSummary>,
    pub reviews: Vec<ReviewResponse>,
    pub created_at: String,
}

impl RecipeResponse {
    /// Joins a recipe with its already-resolved owner/category summaries.
    pub fn expand(
        recipe: &Recipe,
        owner: Option<RefSummary>,
        category: Option<RefSummary>,
    ) -> Self {
        Self {
            id: hex_id(&recipe.id),
            name: recipe.name.clone(),
            instructions: recipe.instructions.clone(),
            ingredients: recipe.ingredients.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
            views: recipe.views,
            rating: recipe.rating,
            num_reviews: recipe.num_reviews,
            likes: recipe.likes.iter().map(|id| id.to_hex()).collect(),
            category,
            owner,
            reviews: recipe.reviews.iter().map(ReviewResponse::from).collect(),
            created_at: rfc3339(recipe.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub recipes: Vec<RecipeResponse>,
    pub created_at: String,
}

impl CategoryResponse {
    pub fn expand(category: &Category, recipes: Vec<RecipeResponse>) -> Self {
        Self {
            id: hex_id(&category.id),
            name: category.name.clone(),
            slug: category.slug.clone(),
            image: category.image.clone(),
            recipes,
            created_at: rfc3339(category.created_at),
        }
    }
}

fn hex_id(id: &Option<ObjectId>) -> String {
    id.map(|o| o.to_hex()).unwrap_or_default()
}

fn rfc3339(when: DateTime) -> String {
    when.try_to_rfc3339_string().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: f64) -> Review {
        Review {
            id: ObjectId::new(),
            name: "tester".to_string(),
            rating,
            comment: "x".to_string(),
            user: ObjectId::new(),
            created_at: DateTime::now(),
        }
    }

    fn recipe() -> Recipe {
        let now = DateTime::now();
        Recipe {
            id: Some(ObjectId::new()),
            name: "Soup".to_string(),
            instructions: "Boil".to_string(),
            ingredients: vec!["water".to_string()],
            image: String::new(),
            cooking_time: 0,
            views: 0,
            rating: 0.0,
            num_reviews: 0,
            likes: Vec::new(),
            category: None,
            owner: ObjectId::new(),
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_mean_rating_empty() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn test_mean_rating() {
        assert_eq!(mean_rating(&[review(4.0)]), 4.0);
        assert_eq!(mean_rating(&[review(4.0), review(2.0)]), 3.0);
        assert_eq!(mean_rating(&[review(5.0), review(4.0), review(3.0)]), 4.0);
    }

    #[test]
    fn test_recompute_tracks_length() {
        let mut r = recipe();
        r.reviews.push(review(4.0));
        r.recompute_reviews();
        assert_eq!(r.num_reviews, 1);
        assert_eq!(r.rating, 4.0);

        r.reviews.push(review(2.0));
        r.recompute_reviews();
        assert_eq!(r.num_reviews, 2);
        assert_eq!(r.rating, 3.0);
    }

    #[test]
    fn test_recompute_after_last_review_removed() {
        let mut r = recipe();
        r.reviews.push(review(5.0));
        r.recompute_reviews();

        r.reviews.clear();
        r.recompute_reviews();
        assert_eq!(r.num_reviews, 0);
        assert_eq!(r.rating, 0.0);
    }

    fn user() -> User {
        let mut u = User::new(
            "a".to_string(),
            "a@b.c".to_string(),
            "hash".to_string(),
            "blue".to_string(),
        );
        u.id = Some(ObjectId::new());
        u
    }

    #[test]
    fn test_double_save_rejected() {
        let mut u = user();
        let recipe_id = ObjectId::new();

        assert!(u.ensure_not_saved(recipe_id).is_ok());
        u.saved_recipes.push(recipe_id);
        assert!(matches!(
            u.ensure_not_saved(recipe_id),
            Err(AppError::AlreadySaved)
        ));
    }

    #[test]
    fn test_unsave_of_unsaved_rejected() {
        let mut u = user();
        let recipe_id = ObjectId::new();

        assert!(matches!(u.ensure_saved(recipe_id), Err(AppError::NotSaved)));
        u.saved_recipes.push(recipe_id);
        assert!(u.ensure_saved(recipe_id).is_ok());
    }

    #[test]
    fn test_only_owner_may_mutate() {
        let owner = user();
        let stranger = user();

        let mut r = recipe();
        r.owner = owner.id.unwrap();

        assert!(r.ensure_owned_by(&owner).is_ok());
        assert!(matches!(
            r.ensure_owned_by(&stranger),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_user_response_has_no_password() {
        let user = User::new(
            "a".to_string(),
            "a@b.c".to_string(),
            "hash".to_string(),
            "blue".to_string(),
        );
        let value = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("answer").is_none());
        assert_eq!(value["role"], "user");
    }
}
