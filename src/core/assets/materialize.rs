use std::path::Path;

use tracing::{debug, info};

use super::asset_index::{AssetIndex, AssetPlanner};
use crate::core::error::{LauncherError, LauncherResult};

/// Copy content-addressed objects to their virtual names under `target_dir`.
///
/// Used for legacy indexes (`virtual`, `map_to_resources`). A target that
/// already exists with the right size is left alone.
pub async fn materialize_virtual(
    index: &AssetIndex,
    planner: &AssetPlanner,
    target_dir: &Path,
) -> LauncherResult<usize> {
    let mut copied = 0;
    for (name, obj) in index.entries() {
        let Some(target) = safe_join(target_dir, name) else {
            debug!("Skipping asset with unsafe name: {}", name);
            continue;
        };

        if let Ok(meta) = tokio::fs::metadata(&target).await {
            if meta.len() == obj.size {
                continue;
            }
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let source = planner.object_path(&obj.hash);
        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| LauncherError::io(&source, e))?;
        copied += 1;
    }

    info!("Materialized {} virtual assets into {:?}", copied, target_dir);
    Ok(copied)
}

fn safe_join(root: &Path, name: &str) -> Option<std::path::PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if escapes || name.is_empty() {
        None
    } else {
        Some(root.join(relative))
    }
}
