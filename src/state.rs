use std::sync::Arc;

use mongodb::{Collection, Database};

use crate::{
    config::Config,
    database::init_mongo,
    models::{Category, Recipe, User},
};

pub struct AppState {
    pub config: Config,
    pub db: Database,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = init_mongo(&config.mongo_url, &config.mongo_db).await;

        Arc::new(Self { config, db })
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn recipes(&self) -> Collection<Recipe> {
        self.db.collection("recipes")
    }

    pub fn categories(&self) -> Collection<Category> {
        self.db.collection("categories")
    }
}
