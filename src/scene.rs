use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::schema::Scene;

/// Load a scene file, or fall back to the built-in default scene when no
/// path is given. Image asset paths are resolved relative to the scene file
/// and must point at existing files.
pub fn load_scene(path: Option<&Path>) -> Result<Scene> {
    let Some(path) = path else {
        return Ok(Scene::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene {}", path.display()))?;
    let mut scene: Scene = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(
            "failed to parse yaml in {} at {}: {}",
            path.display(),
            location,
            error
        )
    })?;

    scene.validate()?;

    let scene_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    for (name, image_path) in &mut scene.images {
        let resolved = resolve_and_validate_image_path(&scene_dir, image_path, name)?;
        *image_path = resolved;
    }

    Ok(scene)
}

fn resolve_and_validate_image_path(
    scene_dir: &Path,
    image_path: &Path,
    name: &str,
) -> Result<PathBuf> {
    let resolved = if image_path.is_absolute() {
        image_path.to_path_buf()
    } else {
        scene_dir.join(image_path)
    };

    if !resolved.exists() {
        bail!(
            "image '{}' does not exist: {}",
            name,
            resolved.display()
        );
    }
    if !resolved.is_file() {
        bail!("image '{}' is not a file: {}", name, resolved.display());
    }

    Ok(resolved)
}
