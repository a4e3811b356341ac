//! Project JSON parser

use serde_json::Value;
use tracing::{debug, info};

use super::{AssetRecord, AssetType, ProjectData, ProjectError};

/// Parse project JSON text into its image assets
///
/// Syntax errors surface as [`ProjectError::InvalidJson`]; a document without
/// a string `hash_id` or an `assets` array, or an image entry without a string
/// `image_url`, surfaces as [`ProjectError::MissingField`].
pub fn parse_project(json_text: &str) -> Result<ProjectData, ProjectError> {
    let document: Value = serde_json::from_str(json_text)?;

    let hash_id = document
        .get("hash_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ProjectError::missing("hash_id"))?
        .to_string();

    let raw_assets = document
        .get("assets")
        .and_then(Value::as_array)
        .ok_or_else(|| ProjectError::missing("assets"))?;

    let mut assets = Vec::new();
    for (index, raw) in raw_assets.iter().enumerate() {
        let asset_type = raw
            .get("asset_type")
            .and_then(Value::as_str)
            .map(AssetType::from)
            .unwrap_or(AssetType::Other);

        // Covers and videos answer 403 on the image endpoints
        if !asset_type.is_image() {
            debug!("Dropping {} asset #{}", asset_type, index);
            continue;
        }

        let url = raw
            .get("image_url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProjectError::missing(format!("assets[{}].image_url", index)))?;
        assets.push(AssetRecord::new(url, asset_type));
    }

    if assets.is_empty() {
        info!("No images found in project {}", hash_id);
    } else {
        debug!("Project {} lists {} images", hash_id, assets.len());
    }

    Ok(ProjectData { hash_id, assets })
}

/// Pull a project hash ID out of user input
///
/// Accepts a bare ID as well as a pasted artwork page or project JSON URL.
/// Returns `None` when nothing usable is left after trimming.
pub fn extract_hash_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let path = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => trimmed.split(['?', '#']).next().unwrap_or(trimmed).to_string(),
    };

    let last = path.split('/').filter(|segment| !segment.is_empty()).last()?;
    let id = last.strip_suffix(".json").unwrap_or(last);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
