//! # MongoDB
//!
//! Document database holding the four collections: `users`, `recipes`,
//! `categories` (reviews are embedded in their recipe).
//!
//! No multi-document transactions are used. Single-document updates rely on
//! the server's per-document atomicity: view counts use `$inc`, likes and
//! saved-lists use `$addToSet`/`$pull` so repeated calls cannot introduce
//! duplicates. Cross-document pairs (recipe insert + category back-link)
//! are two writes with no rollback.

use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tracing::info;

pub async fn init_mongo(mongo_url: &str, db_name: &str) -> Database {
    let mut options = ClientOptions::parse(mongo_url)
        .await
        .expect("Invalid MONGO_URL");

    options.app_name = Some("potluck".to_string());
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options).expect("Failed to build MongoDB client");
    let database = client.database(db_name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .expect("MongoDB unreachable");

    info!("Connected to MongoDB database {db_name}");

    database
}
