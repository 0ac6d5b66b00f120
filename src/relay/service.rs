use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use super::state::{HopReport, advance, log_id};
use crate::collab::{
    FileStore, Forwarder, HttpForwarder, IdentityKind, IdentityProvider, Journal, MemoryStore,
    MetadataIdentity, RouteStore, StaticIdentity,
};
use crate::config::{Config, DEFAULT_MAX_BODY_BYTES, IdentitySource, StoreKind};
use crate::foundation::error::{RelayError, RelayResult};
use crate::postcard::{Compositor, OverlaySet, POSTCARD, decode_postcard, load_fonts};
use crate::route::{DEFAULT_ID_LEN, Host, Node, Route};

/// Knobs that shape a relay's behaviour once it is running.
#[derive(Clone, Debug)]
pub struct RelaySettings {
    /// Upper bound on each background job.
    pub task_timeout: Duration,
    /// Lay the matte over caller-supplied images before the first hop.
    pub matte_on_origination: bool,
    /// Request body cap applied by the HTTP router.
    pub max_body_bytes: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(5),
            matte_on_origination: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A request to start a new circuit.
#[derive(Clone, Debug, Default)]
pub struct Origination {
    /// Route id to use; a random one is generated when absent or empty.
    pub id: Option<String>,
    /// Base64 image, optionally as a `data:` URL.
    pub image: String,
    /// Visit hosts in random order instead of the canonical one.
    pub random: bool,
}

/// Everything one host needs to take part in circuits. Built once at startup and
/// shared read-only between requests.
pub struct Relay {
    host: Host,
    compositor: Compositor,
    store: Arc<dyn RouteStore>,
    forwarder: Arc<dyn Forwarder>,
    journal: Option<Journal>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        host: Host,
        compositor: Compositor,
        store: Arc<dyn RouteStore>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            host,
            compositor,
            store,
            forwarder,
            journal: None,
            settings: RelaySettings::default(),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_settings(mut self, settings: RelaySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolves this host's identity and wires up the collaborators named by `cfg`.
    pub async fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let identity: Box<dyn IdentityProvider> = match cfg.identity.source {
            IdentitySource::Metadata => Box::new(MetadataIdentity::new(cfg.forward_timeout())?),
            IdentitySource::Static => Box::new(StaticIdentity::new(
                Host {
                    name: cfg.identity.name.clone(),
                    endpoint: cfg.identity.endpoint.clone(),
                    private: cfg.identity.private.clone(),
                },
                cfg.identity.project_id.clone(),
            )),
        };
        let host = resolve_host(identity.as_ref()).await?;
        tracing::info!(host = %host.name, private = %host.private, "identity resolved");

        let store: Arc<dyn RouteStore> = match cfg.store.kind {
            StoreKind::File => Arc::new(FileStore::new(&cfg.store.path)),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        };
        if cfg.register_on_start
            && let Err(e) = store.register_host(&host).await
        {
            tracing::warn!(host = %host.name, error = %e, "could not register host");
        }

        let overlays = OverlaySet::load_dir(&cfg.image_dir).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "no overlay images, postcards will not be stamped");
            OverlaySet::new()
        });
        if !overlays.contains(&host.name) {
            tracing::warn!(host = %host.name, "no stamp image for this host");
        }
        let compositor = Compositor::new(overlays, load_fonts(Some(&cfg.image_dir)));

        let forwarder = Arc::new(HttpForwarder::new(
            cfg.forward_scheme.clone(),
            cfg.forward_timeout(),
        )?);

        let mut relay = Self::new(host, compositor, store, forwarder).with_settings(RelaySettings {
            task_timeout: cfg.task_timeout(),
            matte_on_origination: cfg.matte_on_origination,
            max_body_bytes: cfg.max_body_bytes,
        });
        if let Some(dir) = &cfg.log_dir {
            match tokio::fs::create_dir_all(dir).await {
                Ok(()) => relay = relay.with_journal(Journal::new(dir)),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "journal disabled");
                }
            }
        }
        Ok(relay)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// A fresh route over every registered host in canonical order, carrying the
    /// default postcard when one is available.
    #[tracing::instrument(skip(self))]
    pub async fn default_route(&self) -> RelayResult<Route> {
        let mut route = self.ordered_route().await?;
        match self.compositor.overlays().get(POSTCARD) {
            Ok(postcard) => route.set_postcard(postcard)?,
            Err(e) => tracing::debug!(error = %e, "default route has no postcard"),
        }
        Ok(route)
    }

    /// Registered hosts in canonical order with the topology snapshot taken, and no
    /// postcard yet.
    async fn ordered_route(&self) -> RelayResult<Route> {
        let hosts = self.store.default_topology().await?;

        let mut rng = rand::thread_rng();
        let mut route = Route::new(Route::new_id(&mut rng, DEFAULT_ID_LEN));
        for host in hosts {
            route.add_node(Node::new(host));
        }
        route.order(&mut rng)?;
        route.snapshot_topology();
        Ok(route)
    }

    /// Starts a circuit: builds the default route around the caller's image, records it
    /// and sends it to the first host in the background.
    pub async fn originate(&self, request: Origination) -> RelayResult<Arc<Route>> {
        let payload = normalize_payload(&request.image)?;
        let id = request.id.filter(|id| !id.is_empty());
        tracing::info!(route_id = id.as_deref().unwrap_or("NO ID"), "origination received");

        let mut route = self.ordered_route().await?;
        route.postcard = payload;
        if self.settings.matte_on_origination
            && let Err(e) = self.compositor.matte_image(&mut route)
        {
            tracing::warn!(route_id = log_id(&route), error = %e, "could not apply matte");
        }
        if request.random {
            route.shuffle(&mut rand::thread_rng());
        }
        if let Some(id) = id {
            route.id = id;
        }

        if let Err(e) = self.store.record_route(&self.host.name, &route).await {
            tracing::warn!(route_id = log_id(&route), error = %e, "could not record route");
        }

        let route = Arc::new(route);
        self.spawn_forward(&route);
        Ok(route)
    }

    /// Takes part in one hop of `route`. Local bookkeeping happens before this returns;
    /// forwarding, journaling and recording run in the background.
    pub async fn relay(self: &Arc<Self>, route: Route) -> RelayResult<HopReport> {
        tracing::info!(route_id = log_id(&route), "relay received");

        let this = Arc::clone(self);
        let (route, report) = tokio::task::spawn_blocking(move || {
            let mut route = route;
            advance(
                &mut route,
                &this.host.name,
                &this.compositor,
                &mut rand::thread_rng(),
            )
            .map(|report| (route, report))
        })
        .await
        .map_err(|e| RelayError::Other(anyhow::anyhow!("hop task failed: {e}")))??;

        let route = Arc::new(route);
        if report.next.is_some() {
            self.spawn_forward(&route);
        }
        self.spawn_journal(&route);
        self.spawn_record(&route);
        Ok(report)
    }

    fn spawn_forward(&self, route: &Arc<Route>) {
        let Some(next) = route.next() else {
            tracing::warn!(route_id = log_id(route), "no host left to forward to");
            return;
        };
        let address = next.private.clone();
        let forwarder = Arc::clone(&self.forwarder);
        let route = Arc::clone(route);
        self.spawn_job(log_id(&route).to_string(), "forward", async move {
            tracing::debug!(route_id = log_id(&route), %address, "sending to next host");
            forwarder.forward(&address, &route).await
        });
    }

    fn spawn_journal(&self, route: &Arc<Route>) {
        let Some(journal) = self.journal.clone() else {
            return;
        };
        let host_name = self.host.name.clone();
        let route = Arc::clone(route);
        self.spawn_job(log_id(&route).to_string(), "journal", async move {
            journal.append(&route, &host_name).await.map(|_| ())
        });
    }

    fn spawn_record(&self, route: &Arc<Route>) {
        let store = Arc::clone(&self.store);
        let host_name = self.host.name.clone();
        let route = Arc::clone(route);
        self.spawn_job(log_id(&route).to_string(), "record", async move {
            store.record_route(&host_name, &route).await
        });
    }

    /// Detached task bounded by the configured timeout. Failures are logged, never
    /// reported back.
    fn spawn_job<F>(&self, route_id: String, job: &'static str, fut: F)
    where
        F: Future<Output = RelayResult<()>> + Send + 'static,
    {
        let limit = self.settings.task_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(limit, fut).await {
                Ok(Ok(())) => tracing::debug!(route_id = %route_id, job, "background job done"),
                Ok(Err(e)) => {
                    tracing::warn!(route_id = %route_id, job, error = %e, "background job failed");
                }
                Err(_) => {
                    tracing::warn!(route_id = %route_id, job, ?limit, "background job timed out");
                }
            }
        });
    }
}

/// The name is mandatory; missing addresses are logged and left empty.
async fn resolve_host(identity: &dyn IdentityProvider) -> anyhow::Result<Host> {
    let name = identity
        .identity(IdentityKind::Name)
        .await
        .context("resolve host name")?;

    let mut host = Host::named(name);
    for (kind, slot) in [
        (IdentityKind::ExternalIp, &mut host.endpoint),
        (IdentityKind::PrivateIp, &mut host.private),
    ] {
        match identity.identity(kind).await {
            Ok(value) => *slot = value,
            Err(e) => tracing::warn!(?kind, error = %e, "identity lookup failed"),
        }
    }
    Ok(host)
}

/// Turns an origination body into a postcard payload.
///
/// Form posts turn `+` into spaces, so spaces are put back; a `data:` URL prefix is
/// dropped. The payload must decode as an image.
pub fn normalize_payload(raw: &str) -> RelayResult<String> {
    let raw = raw.trim();
    let data = match raw.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    };
    let payload = data.replace(' ', "+");
    if payload.is_empty() {
        return Err(RelayError::decode("no image supplied"));
    }
    decode_postcard(&payload)?;
    Ok(payload)
}

#[cfg(test)]
#[path = "../../tests/unit/relay/service.rs"]
mod tests;
