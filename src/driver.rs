use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use featurecollection::WofFeature;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub sent: usize,
    /// Not `*.geojson`, or an alternate geometry.
    pub skipped: usize,
    pub failed: usize,
}

/// Principal records are named `<wof:id>.geojson`; alternate geometries
/// (`<id>-alt-<source>.geojson`) and anything else are skipped.
pub fn is_principal(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("geojson") {
        return false;
    }
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Walks every path (files directly, directories recursively) and sends each
/// principal record that parses to `features`. Each directory is read once,
/// however many symlinks lead to it. Stops early on cancel.
pub async fn index_paths(
    paths: &[PathBuf],
    features: &mpsc::Sender<WofFeature>,
    cancel: &CancellationToken,
) -> anyhow::Result<IndexStats> {
    let mut stats = IndexStats::default();
    let mut pending: Vec<PathBuf> = paths.iter().rev().cloned().collect();
    let mut visited: HashSet<PathBuf> = HashSet::new();

    while let Some(path) = pending.pop() {
        if cancel.is_cancelled() {
            log::info!("indexing cancelled");
            break;
        }

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;

        if meta.is_dir() {
            // symlinks may point back at an ancestor
            let canonical = tokio::fs::canonicalize(&path).await?;
            if !visited.insert(canonical) {
                log::debug!("skip already visited {}", path.display());
                continue;
            }

            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(&path).await?;
            while let Some(entry) = dir.next_entry().await? {
                entries.push(entry.path());
            }
            // sorted so output order is stable across runs
            entries.sort();
            pending.extend(entries.into_iter().rev());
            continue;
        }

        if !is_principal(&path) {
            log::trace!("skip {}", path.display());
            stats.skipped += 1;
            continue;
        }

        let feature = match WofFeature::from_path(&path).await {
            Ok(f) => f,
            Err(e) => {
                log::warn!("failed to load {}: {:#}", path.display(), e);
                stats.failed += 1;
                continue;
            }
        };
        for warning in feature.warnings() {
            log::debug!("{}: {}", path.display(), warning);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("indexing cancelled");
                break;
            },
            res = features.send(feature) => {
                res.map_err(|_| anyhow::anyhow!("feature intake closed"))?;
                stats.sent += 1;
            },
        }
    }

    Ok(stats)
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;
