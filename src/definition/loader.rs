//! Load the object-definition manifest from JSON text or a file on disk.

use crate::definition::types::Manifest;
use crate::definition::validate_manifest;
use crate::error::ConfigError;
use std::path::Path;

/// Parse and validate manifest JSON. Field names are filled from their map keys.
pub fn parse_manifest(text: &str) -> Result<Manifest, ConfigError> {
    let mut manifest: Manifest = serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
    for def in manifest.objects.iter_mut() {
        def.normalize();
    }
    validate_manifest(&manifest)?;
    Ok(manifest)
}

pub async fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let manifest = parse_manifest(&text)?;
    tracing::info!(
        path = %path.display(),
        objects = manifest.objects.len(),
        version = manifest.version,
        "loaded object manifest"
    );
    Ok(manifest)
}
