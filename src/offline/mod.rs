//! Offline cache controller: an independently-lifecycled intermediary that
//! serves cached content first, falls back to the network, and purges stale
//! cache generations when a new version activates.
//!
//! The controller depends on two narrow seams - [`CacheStore`] and
//! [`NetworkFetcher`] - so routing logic runs identically against sqlite +
//! reqwest in production and in-memory fakes in tests.

mod controller;
mod fetcher;
mod push;
mod storage;
mod traits;
mod types;

pub use controller::{
  CacheInstallError, ControllerState, OfflineController, Registration, RegistrationSnapshot,
};
pub use fetcher::HttpFetcher;
pub use push::{handle_push, handle_sync, Notification, PushPayload, BACKGROUND_SYNC_TAG};
pub use storage::{MemoryCacheStore, SqliteCacheStore};
pub use traits::{CacheStore, NetworkFetcher};
pub use types::{
  resolve_asset, AssetManifest, FetchRequest, FetchResponse, GenerationNames, Method, RequestMode,
  DEFAULT_ROOT_DOCUMENT, DEFAULT_STATIC_ASSETS,
};
