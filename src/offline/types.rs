//! Request/response model and cache generation naming.

use color_eyre::{eyre::eyre, Result};
use std::fmt;
use url::Url;

/// Whether a request loads a full document or a sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// Full-page document load; falls back to the cached app shell offline.
  Navigate,
  /// Everything else: scripts, styles, images, data fetches.
  Subresource,
}

/// Request method. Only `Get` is a read; the rest bypass caching entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
    };
    f.write_str(name)
  }
}

/// An outbound request as seen by the controller.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub url: Url,
  pub method: Method,
  pub mode: RequestMode,
}

impl FetchRequest {
  /// A plain sub-resource GET.
  pub fn get(url: Url) -> Self {
    Self {
      url,
      method: Method::Get,
      mode: RequestMode::Subresource,
    }
  }

  /// A full-document navigation GET.
  pub fn navigate(url: Url) -> Self {
    Self {
      url,
      method: Method::Get,
      mode: RequestMode::Navigate,
    }
  }

  /// Read requests are the only ones the cache logic applies to.
  pub fn is_read(&self) -> bool {
    self.method == Method::Get
  }
}

/// A response, either from the network or replayed from a cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl FetchResponse {
  /// 2xx.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Synthetic 503 returned when the network is down and nothing is cached.
  pub fn offline_unavailable() -> Self {
    Self {
      status: 503,
      content_type: None,
      body: Vec::new(),
    }
  }
}

/// The current static/dynamic cache generation pair.
///
/// Any generation whose name is not one of these two is stale and gets
/// purged on activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNames {
  version: String,
  static_name: String,
  dynamic_name: String,
}

impl GenerationNames {
  pub fn for_version(version: &str) -> Self {
    Self {
      version: version.to_string(),
      static_name: format!("static-{version}"),
      dynamic_name: format!("dynamic-{version}"),
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn static_name(&self) -> &str {
    &self.static_name
  }

  pub fn dynamic_name(&self) -> &str {
    &self.dynamic_name
  }

  pub fn is_current(&self, generation: &str) -> bool {
    generation == self.static_name || generation == self.dynamic_name
  }
}

/// Core asset paths needed for offline app-shell rendering, relative to the
/// application origin. The icon-library script is the one cross-origin entry.
pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
  "/",
  "/index.html",
  "/styles.css",
  "/app.js",
  "/manifest.json",
  "/icons/icon-192x192.jpg",
  "/icons/icon-512x512.jpg",
  "https://unpkg.com/lucide@latest/dist/umd/lucide.js",
];

/// Default navigation fallback document.
pub const DEFAULT_ROOT_DOCUMENT: &str = "/index.html";

/// The fixed set of URLs cached at install time, plus the root document
/// served to offline navigations.
#[derive(Debug, Clone)]
pub struct AssetManifest {
  urls: Vec<Url>,
  root_document: Url,
}

impl AssetManifest {
  pub fn new(urls: Vec<Url>, root_document: Url) -> Self {
    Self { urls, root_document }
  }

  /// Build the default manifest against an application origin.
  ///
  /// Relative entries are resolved against the base; absolute entries
  /// (the cross-origin icon library) are taken as-is.
  pub fn default_for(base: &Url) -> Result<Self> {
    let urls = DEFAULT_STATIC_ASSETS
      .iter()
      .map(|entry| resolve_asset(base, entry))
      .collect::<Result<Vec<_>>>()?;
    let root_document = resolve_asset(base, DEFAULT_ROOT_DOCUMENT)?;

    Ok(Self::new(urls, root_document))
  }

  pub fn urls(&self) -> &[Url] {
    &self.urls
  }

  pub fn root_document(&self) -> &Url {
    &self.root_document
  }
}

/// Resolve a manifest entry: absolute URLs pass through, paths join the base.
pub fn resolve_asset(base: &Url, entry: &str) -> Result<Url> {
  match Url::parse(entry) {
    Ok(url) => Ok(url),
    Err(url::ParseError::RelativeUrlWithoutBase) => base
      .join(entry)
      .map_err(|e| eyre!("Invalid asset path {}: {}", entry, e)),
    Err(e) => Err(eyre!("Invalid asset URL {}: {}", entry, e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_names_are_version_tagged() {
    let names = GenerationNames::for_version("v2");
    assert_eq!(names.static_name(), "static-v2");
    assert_eq!(names.dynamic_name(), "dynamic-v2");

    assert!(names.is_current("static-v2"));
    assert!(names.is_current("dynamic-v2"));
    assert!(!names.is_current("static-v1"));
    assert!(!names.is_current("mealpal-v2"));
  }

  #[test]
  fn default_manifest_resolves_against_base() {
    let base = Url::parse("https://mealpal.example").unwrap();
    let manifest = AssetManifest::default_for(&base).unwrap();

    assert_eq!(manifest.urls().len(), DEFAULT_STATIC_ASSETS.len());
    assert_eq!(manifest.urls()[0].as_str(), "https://mealpal.example/");
    assert_eq!(
      manifest.root_document().as_str(),
      "https://mealpal.example/index.html"
    );
    // Absolute cross-origin entries are kept verbatim.
    assert_eq!(
      manifest.urls().last().unwrap().as_str(),
      "https://unpkg.com/lucide@latest/dist/umd/lucide.js"
    );
  }

  #[test]
  fn only_get_is_a_read() {
    let url = Url::parse("https://mealpal.example/app.js").unwrap();
    assert!(FetchRequest::get(url.clone()).is_read());
    assert!(FetchRequest::navigate(url.clone()).is_read());

    let post = FetchRequest {
      url,
      method: Method::Post,
      mode: RequestMode::Subresource,
    };
    assert!(!post.is_read());
  }
}
