use std::time::Duration;

use anyhow::Context;
use tracing::warn;
use uuid::Uuid;

use super::decode::DecodedImage;
use crate::error::AppError;
use crate::state::AppState;

/// Uploads a recipe image and returns its object key.
pub async fn upload_recipe_image(
    st: &AppState,
    recipe_id: Uuid,
    image: DecodedImage,
) -> Result<String, AppError> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("recipes/images/{}-{}.{}", recipe_id, Uuid::new_v4(), ext);
    st.storage
        .put(&key, image.body, &image.content_type)
        .await
        .context("store recipe image")?;
    Ok(key)
}

/// Best-effort removal; an orphaned object is only logged.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.remove(key).await {
        warn!(error = %e, key, "failed to delete recipe image");
    }
}

pub async fn presign_image(st: &AppState, key: &str) -> Result<String, AppError> {
    let url = st
        .storage
        .signed_url(key, Duration::from_secs(st.config.image_url_ttl_secs))
        .await
        .context("sign recipe image url")?;
    Ok(url)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
