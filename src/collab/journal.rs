use std::path::PathBuf;

use anyhow::Context;
use tokio::io::AsyncWriteExt;

use crate::foundation::error::RelayResult;
use crate::route::Route;

/// Per-visit route dumps, one file per route and position: `{dir}/{id}_{index}.json`.
///
/// Files are opened in append mode, so a route seen twice at the same position keeps
/// both copies back to back.
#[derive(Clone, Debug)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, route: &Route, host_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", route.id, route.current_node(host_name)))
    }

    pub async fn append(&self, route: &Route, host_name: &str) -> RelayResult<PathBuf> {
        let path = self.path_for(route, host_name);
        let bytes = serde_json::to_vec_pretty(route)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("open journal '{}'", path.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("write journal '{}'", path.display()))?;
        file.flush().await.context("flush journal")?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/journal.rs"]
mod tests;
