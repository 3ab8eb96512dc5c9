//! Offline cache controller: lifecycle, cache generation management, and
//! request routing.
//!
//! The controller is an intermediary between the application and the
//! network. The hosting runtime drives it through a one-directional
//! lifecycle (installing -> activating -> active); requests flow through
//! `handle_fetch` regardless of UI state.

use color_eyre::{eyre::eyre, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::traits::{CacheStore, NetworkFetcher};
use super::types::{AssetManifest, FetchRequest, FetchResponse, GenerationNames};

/// Lifecycle state. Transitions only move forward; `Failed` is terminal for
/// the attempt and the hosting runtime retries installation from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
  Installing,
  Activating,
  Active,
  Failed,
}

impl fmt::Display for ControllerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ControllerState::Installing => "installing",
      ControllerState::Activating => "activating",
      ControllerState::Active => "active",
      ControllerState::Failed => "failed",
    };
    f.write_str(name)
  }
}

/// Install failure: one asset could not be fetched or stored, so the whole
/// attempt is abandoned. A partial static cache is worse than none.
#[derive(Debug)]
pub struct CacheInstallError {
  pub url: url::Url,
  pub reason: String,
}

impl fmt::Display for CacheInstallError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "install failed caching {}: {}", self.url, self.reason)
  }
}

impl std::error::Error for CacheInstallError {}

/// What the application layer can observe about controller instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationSnapshot {
  /// Version of the instance currently governing requests.
  pub active: Option<String>,
  /// Version installed and ready, waiting to take over.
  pub waiting: Option<String>,
  /// A new version finished installing behind an active one. The UI should
  /// offer a reload; the controller never forces one.
  pub update_available: bool,
}

/// Shared registration handle.
///
/// The controller publishes lifecycle changes here; the UI layer subscribes
/// and reacts. Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct Registration {
  tx: Arc<watch::Sender<RegistrationSnapshot>>,
}

impl Default for Registration {
  fn default() -> Self {
    Self::new()
  }
}

impl Registration {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(RegistrationSnapshot::default());
    Self { tx: Arc::new(tx) }
  }

  /// Observe lifecycle changes. The receiver sees every state the sender
  /// publishes from now on.
  pub fn subscribe(&self) -> watch::Receiver<RegistrationSnapshot> {
    self.tx.subscribe()
  }

  pub fn snapshot(&self) -> RegistrationSnapshot {
    self.tx.borrow().clone()
  }

  fn installed(&self, version: &str) {
    self.tx.send_modify(|s| {
      s.waiting = Some(version.to_string());
      s.update_available = s.active.is_some();
    });
  }

  fn activated(&self, version: &str) {
    self.tx.send_modify(|s| {
      s.active = Some(version.to_string());
      s.waiting = None;
      s.update_available = false;
    });
  }
}

/// Cache-first request interception with offline fallbacks.
pub struct OfflineController<C: CacheStore, N: NetworkFetcher> {
  cache: C,
  network: N,
  generations: GenerationNames,
  manifest: AssetManifest,
  registration: Registration,
  state: ControllerState,
}

impl<C: CacheStore, N: NetworkFetcher> OfflineController<C, N> {
  pub fn new(
    cache: C,
    network: N,
    generations: GenerationNames,
    manifest: AssetManifest,
    registration: Registration,
  ) -> Self {
    Self {
      cache,
      network,
      generations,
      manifest,
      registration,
      state: ControllerState::Installing,
    }
  }

  pub fn state(&self) -> ControllerState {
    self.state
  }

  pub fn registration(&self) -> &Registration {
    &self.registration
  }

  /// Fetch every manifest asset and commit them to the static generation.
  ///
  /// All-or-nothing: a single failed fetch (transport error, non-2xx status,
  /// or store failure) abandons the attempt with nothing committed, and the
  /// controller moves to `Failed`. On success the controller skips waiting
  /// for superseded instances and is ready to activate.
  pub async fn install(&mut self) -> Result<(), CacheInstallError> {
    if self.state != ControllerState::Installing {
      debug!(state = %self.state, "install called outside installing state, ignored");
      return Ok(());
    }

    match self.fetch_manifest().await {
      Ok(fetched) => {
        for (url, response) in &fetched {
          if let Err(e) = self.cache.put(self.generations.static_name(), url, response) {
            // A partial static cache is worse than none; drop whatever
            // landed before the failing put.
            if let Err(purge) = self.cache.delete_generation(self.generations.static_name()) {
              warn!("failed to drop partial static generation: {}", purge);
            }
            self.state = ControllerState::Failed;
            return Err(CacheInstallError {
              url: url.clone(),
              reason: e.to_string(),
            });
          }
        }

        info!(
          assets = fetched.len(),
          generation = self.generations.static_name(),
          "static assets cached"
        );
        self.state = ControllerState::Activating;
        self.registration.installed(self.generations.version());
        Ok(())
      }
      Err(e) => {
        warn!("install attempt failed: {}", e);
        self.state = ControllerState::Failed;
        Err(e)
      }
    }
  }

  /// Fetch all manifest URLs concurrently; any failure fails the batch.
  async fn fetch_manifest(&self) -> Result<Vec<(url::Url, FetchResponse)>, CacheInstallError> {
    let fetches = self.manifest.urls().iter().map(|url| async move {
      let request = FetchRequest::get(url.clone());
      let response = self
        .network
        .fetch(&request)
        .await
        .map_err(|e| CacheInstallError {
          url: url.clone(),
          reason: e.to_string(),
        })?;

      if !response.ok() {
        return Err(CacheInstallError {
          url: url.clone(),
          reason: format!("unexpected status {}", response.status),
        });
      }

      Ok((url.clone(), response))
    });

    futures::future::try_join_all(fetches).await
  }

  /// Purge every generation that is not the current static/dynamic pair,
  /// then claim all open application instances so this version governs
  /// requests immediately.
  pub fn activate(&mut self) -> Result<()> {
    if self.state != ControllerState::Activating {
      return Err(eyre!(
        "cannot activate from the {} state",
        self.state
      ));
    }

    for generation in self.cache.list_generations()? {
      if !self.generations.is_current(&generation) {
        info!(generation = %generation, "purging stale cache generation");
        self.cache.delete_generation(&generation)?;
      }
    }

    self.state = ControllerState::Active;
    self.registration.activated(self.generations.version());
    Ok(())
  }

  /// Route one outbound request.
  ///
  /// Non-read requests pass through to the network untouched, including
  /// transport errors - those are the only `Err` this returns. Read requests
  /// are cache-first with a network fallback; a failed network fetch
  /// degrades to the cached app shell for navigations and to a synthetic
  /// 503 otherwise.
  pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
    if !request.is_read() {
      return self.network.fetch(request).await;
    }

    if let Some(cached) = self.cache_lookup(&request.url) {
      debug!(url = %request.url, "serving from cache");
      return Ok(cached);
    }

    match self.network.fetch(request).await {
      Ok(response) => {
        if response.ok() {
          let dynamic = self.generations.dynamic_name();
          if let Err(e) = self.cache.put(dynamic, &request.url, &response) {
            warn!(url = %request.url, "failed to cache response: {}", e);
          }
        }
        Ok(response)
      }
      Err(e) => {
        debug!(url = %request.url, "network fetch failed: {}", e);

        if request.mode == super::types::RequestMode::Navigate {
          if let Some(shell) = self.cache_lookup(self.manifest.root_document()) {
            info!(url = %request.url, "offline navigation, serving cached app shell");
            return Ok(shell);
          }
        }

        Ok(FetchResponse::offline_unavailable())
      }
    }
  }

  /// Cache read failures count as misses; offline routing must not die on a
  /// bad cache row.
  fn cache_lookup(&self, url: &url::Url) -> Option<FetchResponse> {
    match self.cache.get(url) {
      Ok(hit) => hit,
      Err(e) => {
        warn!(url = %url, "cache lookup failed, treating as miss: {}", e);
        None
      }
    }
  }
}
