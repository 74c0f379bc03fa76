//! The set of links processed by earlier runs, stored as a sorted JSON array.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context as _;

use crate::persist;

/// Loads the log. A missing file is an empty log; malformed JSON is an error,
/// since saving over it would silently forget every processed link.
pub async fn load(path: &Path) -> anyhow::Result<BTreeSet<String>> {
    let links: Option<Vec<String>> = persist::read_json(path)
        .await
        .with_context(|| format!("read link log: {}", path.display()))?;
    match links {
        Some(links) => Ok(links.into_iter().collect()),
        None => {
            tracing::warn!(path = %path.display(), "link log not found; starting empty");
            Ok(BTreeSet::new())
        }
    }
}

/// Overwrites the log with `links` in sorted order.
pub async fn save(path: &Path, links: &BTreeSet<String>) -> anyhow::Result<()> {
    let sorted: Vec<&String> = links.iter().collect();
    persist::write_json_atomic(path, &sorted)
        .await
        .with_context(|| format!("write link log: {}", path.display()))?;
    tracing::info!(path = %path.display(), count = links.len(), "link log saved");
    Ok(())
}
