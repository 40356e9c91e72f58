use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{error, warn};
use tokio::fs;

use crate::{constants::MEDIA_URL_PREFIX, Error, HtmlError};

pub const RECIPE_FOLDER: &str = "recipes";
pub const AVATAR_FOLDER: &str = "avatars";


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

fn invalid_image() -> Error {
    HtmlError::InvalidRequest.fields(["image: Failed to decode image"])
}

/// Decodes `data:image/<ext>;base64,<payload>`.
pub fn decode_data_url(value: &str) -> Result<DecodedImage, Error> {
    let (header, payload) = value.split_once(',').ok_or_else(invalid_image)?;

    let extension = header
        .strip_prefix("data:image/")
        .and_then(|rest| rest.strip_suffix(";base64"))
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(invalid_image)?;

    // Raster formats only; files are served back from our own origin.
    let extension = match extension.as_str() {
        "jpeg" | "jpg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => return Err(invalid_image()),
    }
    .to_string();

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| invalid_image())?;

    if bytes.is_empty() {
        return Err(invalid_image());
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image under `root/folder` with a random name and returns its
/// public URL.
pub async fn save_image(root: &Path, folder: &str, image: &DecodedImage) -> Result<String, Error> {
    let directory = root.join(folder);
    let file_name = format!("{}.{}", uuid::Uuid::new_v4().simple(), image.extension);

    fs::create_dir_all(&directory).await.map_err(|e| {
        error!("Failed to create {}: {}", directory.display(), e);
        HtmlError::InternalServerError.new("Failed to store image")
    })?;

    let path = directory.join(&file_name);
    fs::write(&path, &image.bytes).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        HtmlError::InternalServerError.new("Failed to store image")
    })?;

    Ok(format!("{MEDIA_URL_PREFIX}{folder}/{file_name}"))
}

/// Removes a file previously returned by [`save_image`]. URLs outside the
/// media prefix are ignored.
pub async fn delete_image(root: &Path, url: &str) {
    let Some(relative) = url.strip_prefix(MEDIA_URL_PREFIX) else {
        return;
    };
    if relative.split('/').any(|part| part == ".." || part.is_empty()) {
        return;
    }

    let path = root.join(relative);
    if let Err(e) = fs::remove_file(&path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
