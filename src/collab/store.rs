use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::foundation::error::{RelayError, RelayResult};
use crate::route::{Host, Route};

/// Durable record of registered hosts and of every route's progress.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Registered hosts, in storage order.
    async fn default_topology(&self) -> RelayResult<Vec<Host>>;

    /// Upserts the view of `route` held by the host named `caller`.
    async fn record_route(&self, caller: &str, route: &Route) -> RelayResult<()>;

    async fn register_host(&self, host: &Host) -> RelayResult<()>;
}

/// Folds the copy of a route seen by `caller` into the stored document.
///
/// A route that has only just started replaces whatever is stored, as does one with no
/// stored document. Otherwise only the caller's own node, the hop leading into it, and
/// the payload-bearing fields are taken from `incoming`: every other node is owned by
/// another host, whose copy is authoritative for it.
pub fn merge_route(stored: Option<Route>, caller: &str, incoming: &Route) -> Route {
    let mut stored = match stored {
        Some(stored) if !incoming.just_started() => stored,
        _ => {
            let mut fresh = incoming.clone();
            fresh.last_update = Some(Utc::now());
            return fresh;
        }
    };
    stored.id.clone_from(&incoming.id);

    let idx = incoming.current_node(caller);
    if let Some(node) = incoming.nodes.get(idx) {
        if stored.nodes.len() <= idx {
            stored.nodes.resize_with(idx + 1, Default::default);
        }
        stored.nodes[idx] = node.clone();
    }

    if let Some(hop) = idx.checked_sub(1).and_then(|i| incoming.hops.get(i)) {
        let i = idx - 1;
        if stored.hops.len() <= i {
            stored.hops.resize_with(i + 1, Default::default);
        }
        stored.hops[i] = hop.clone();
    }

    if incoming.is_done() {
        stored.total = incoming.total.clone();
        stored.postcard.clone_from(&incoming.postcard);
        stored.last_update = incoming.last_update;
    }

    if stored.last_update.is_none() || incoming.last_update > stored.last_update {
        tracing::debug!(route_id = %incoming.id, "payload newer than stored copy");
        stored.postcard.clone_from(&incoming.postcard);
        stored.last_update = incoming.last_update;
    }

    stored
}

fn document_key(kind: &str, key: &str) -> RelayResult<String> {
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(RelayError::validation(format!("invalid {kind} key '{key}'")));
    }
    Ok(format!("{key}.json"))
}

/// JSON documents on disk: `nodes/<name>.json` and `routes/<id>.json` under one root.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn nodes_dir(&self) -> PathBuf {
        self.root.join("nodes")
    }

    fn route_path(&self, id: &str) -> RelayResult<PathBuf> {
        Ok(self.root.join("routes").join(document_key("route", id)?))
    }

    /// Stored copy of route `id`, if any.
    pub async fn load_route(&self, id: &str) -> RelayResult<Option<Route>> {
        let path = self.route_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read route '{}'", path.display()))
                .into()),
        }
    }

    async fn write_json<T: serde::Serialize + Sync>(path: &Path, value: &T) -> RelayResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir '{}'", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("write '{}'", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RouteStore for FileStore {
    async fn default_topology(&self) -> RelayResult<Vec<Host>> {
        let dir = self.nodes_dir();
        let mut rd = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read nodes dir '{}'", dir.display()))
                    .into());
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .with_context(|| format!("list nodes dir '{}'", dir.display()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut hosts = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("read host '{}'", path.display()))?;
            hosts.push(serde_json::from_slice(&bytes)?);
        }
        Ok(hosts)
    }

    async fn record_route(&self, caller: &str, route: &Route) -> RelayResult<()> {
        let path = self.route_path(&route.id)?;
        let _guard = self.write_lock.lock().await;
        let stored = self.load_route(&route.id).await?;
        let merged = merge_route(stored, caller, route);
        Self::write_json(&path, &merged).await
    }

    async fn register_host(&self, host: &Host) -> RelayResult<()> {
        let path = self.nodes_dir().join(document_key("host", &host.name)?);
        let _guard = self.write_lock.lock().await;
        Self::write_json(&path, host).await
    }
}

/// Store kept in process memory; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hosts: RwLock<BTreeMap<String, Host>>,
    routes: RwLock<HashMap<String, Route>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        Self {
            hosts: RwLock::new(hosts.into_iter().map(|h| (h.name.clone(), h)).collect()),
            routes: RwLock::default(),
        }
    }

    pub async fn route(&self, id: &str) -> Option<Route> {
        self.routes.read().await.get(id).cloned()
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn default_topology(&self) -> RelayResult<Vec<Host>> {
        Ok(self.hosts.read().await.values().cloned().collect())
    }

    async fn record_route(&self, caller: &str, route: &Route) -> RelayResult<()> {
        if route.id.is_empty() {
            return Err(RelayError::validation("route has no id"));
        }
        let mut routes = self.routes.write().await;
        let stored = routes.remove(&route.id);
        let merged = merge_route(stored, caller, route);
        routes.insert(route.id.clone(), merged);
        Ok(())
    }

    async fn register_host(&self, host: &Host) -> RelayResult<()> {
        if host.name.is_empty() {
            return Err(RelayError::validation("host has no name"));
        }
        self.hosts
            .write()
            .await
            .insert(host.name.clone(), host.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/store.rs"]
mod tests;
