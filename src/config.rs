use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::offline::{resolve_asset, AssetManifest, GenerationNames};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Override for the data directory holding meals.json and cache.db.
  pub data_dir: Option<PathBuf>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Version tag baked into the cache generation names.
  pub version: String,
  /// Application origin the static asset paths resolve against.
  pub base_url: String,
  /// Core assets cached at install time. Paths resolve against `base_url`;
  /// absolute URLs are taken as-is.
  pub static_assets: Vec<String>,
  /// Document served to offline navigations.
  pub root_document: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "v2".to_string(),
      base_url: "https://mealpal.example".to_string(),
      static_assets: crate::offline::DEFAULT_STATIC_ASSETS
        .iter()
        .map(|s| s.to_string())
        .collect(),
      root_document: crate::offline::DEFAULT_ROOT_DOCUMENT.to_string(),
    }
  }
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./mealpal.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/mealpal/config.yaml
  ///
  /// No file anywhere means defaults - the tool works out of the box.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("mealpal.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("mealpal").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Directory holding the persisted meal list and the cache database.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("mealpal"))
  }

  pub fn meals_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("meals.json"))
  }

  pub fn cache_db_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("cache.db"))
  }

  pub fn generation_names(&self) -> GenerationNames {
    GenerationNames::for_version(&self.cache.version)
  }

  pub fn asset_manifest(&self) -> Result<AssetManifest> {
    let base = Url::parse(&self.cache.base_url)
      .map_err(|e| eyre!("Invalid base_url {}: {}", self.cache.base_url, e))?;

    let urls = self
      .cache
      .static_assets
      .iter()
      .map(|entry| resolve_asset(&base, entry))
      .collect::<Result<Vec<_>>>()?;
    let root_document = resolve_asset(&base, &self.cache.root_document)?;

    Ok(AssetManifest::new(urls, root_document))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_mirror_the_shipped_manifest() {
    let config = Config::default();
    assert_eq!(config.cache.version, "v2");

    let names = config.generation_names();
    assert_eq!(names.static_name(), "static-v2");
    assert_eq!(names.dynamic_name(), "dynamic-v2");

    let manifest = config.asset_manifest().unwrap();
    assert_eq!(manifest.urls().len(), 8);
    assert_eq!(
      manifest.root_document().as_str(),
      "https://mealpal.example/index.html"
    );
  }

  #[test]
  fn partial_yaml_keeps_remaining_defaults() {
    let config: Config = serde_yaml::from_str("cache:\n  version: v3\n").unwrap();
    assert_eq!(config.cache.version, "v3");
    assert_eq!(config.cache.root_document, "/index.html");
    assert_eq!(config.cache.static_assets.len(), 8);
    assert!(config.data_dir.is_none());
  }

  #[test]
  fn explicit_missing_config_is_an_error() {
    assert!(Config::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
  }
}
