//! Seams between the controller and its collaborators.
//!
//! Real backends (sqlite cache, reqwest fetcher) and in-memory fakes both
//! satisfy these, which is what keeps the routing logic testable without a
//! live network.

use color_eyre::Result;
use url::Url;

use super::types::{FetchRequest, FetchResponse};

/// Named cache generations of request/response pairs.
///
/// Implementations must be safe for concurrent lookups and appends; each
/// put/get is atomic per key.
pub trait CacheStore: Send + Sync {
  /// Store a response copy under a generation, replacing any previous entry
  /// for the same URL in that generation.
  fn put(&self, generation: &str, url: &Url, response: &FetchResponse) -> Result<()>;

  /// Exact-match lookup across all generations.
  fn get(&self, url: &Url) -> Result<Option<FetchResponse>>;

  /// Exact-match lookup within one generation.
  fn get_from(&self, generation: &str, url: &Url) -> Result<Option<FetchResponse>>;

  /// Names of every generation currently holding entries.
  fn list_generations(&self) -> Result<Vec<String>>;

  /// Drop a whole generation.
  fn delete_generation(&self, generation: &str) -> Result<()>;
}

/// The network side of request interception.
///
/// `Err` means the transport failed (offline, DNS, reset). An HTTP error
/// status is still `Ok` - the controller passes those through uncached.
pub trait NetworkFetcher: Send + Sync {
  fn fetch(
    &self,
    request: &FetchRequest,
  ) -> impl std::future::Future<Output = Result<FetchResponse>> + Send;
}
