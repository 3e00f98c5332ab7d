//! Image upload: a single `multipart/form-data` field named `image`,
//! constrained by extension, declared MIME type and size, written under the
//! configured upload directory and served back as a static file.

use std::{path::Path as FsPath, sync::Arc};

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde_json::{Value, json};
use tokio::fs;
use tracing::info;

use crate::{error::AppError, state::AppState, utils::image_filename};

pub const MAX_IMAGE_BYTES: usize = 1_000_000;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field
            .file_name()
            .ok_or_else(|| AppError::InvalidInput("Missing filename".to_string()))?
            .to_string();

        let extension = file_extension(&filename)
            .filter(|ext| is_allowed_extension(ext))
            .ok_or_else(|| AppError::InvalidInput("Images only!".to_string()))?;

        let mime_ok = field
            .content_type()
            .map(|m| ALLOWED_MIME_TYPES.contains(&m))
            .unwrap_or(false);
        if !mime_ok {
            return Err(AppError::InvalidInput("Images only!".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::InvalidInput(
                "Image must be smaller than 1MB".to_string(),
            ));
        }

        let stored_name = image_filename(&extension);

        fs::create_dir_all(&state.config.upload_dir).await?;
        fs::write(
            FsPath::new(&state.config.upload_dir).join(&stored_name),
            &data,
        )
        .await?;

        info!("Stored upload as {stored_name} ({} bytes)", data.len());

        return Ok(Json(json!({
            "message": "Image Uploaded Successfully",
            "image": format!("/uploads/{stored_name}"),
        })));
    }

    Err(AppError::InvalidInput("No image field in form".to_string()))
}

fn file_extension(filename: &str) -> Option<String> {
    FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

fn is_allowed_extension(extension: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        for ext in ["jpg", "jpeg", "png", "webp"] {
            assert!(is_allowed_extension(ext), "{ext} should be allowed");
        }
        assert!(!is_allowed_extension("gif"));
        assert!(!is_allowed_extension("pdf"));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("dish.tart.png"), Some("png".to_string()));
        assert_eq!(file_extension("noext"), None);
    }
}
