//! HTTP-backed network fetcher.

use color_eyre::{eyre::eyre, Result};

use super::traits::NetworkFetcher;
use super::types::{FetchRequest, FetchResponse, Method};

/// reqwest-backed fetcher used outside of tests.
#[derive(Clone, Default)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self::default()
  }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Head => reqwest::Method::HEAD,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Delete => reqwest::Method::DELETE,
    Method::Patch => reqwest::Method::PATCH,
  }
}

impl NetworkFetcher for HttpFetcher {
  async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
    let response = self
      .client
      .request(to_reqwest_method(request.method), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Fetch failed for {}: {}", request.url, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body from {}: {}", request.url, e))?
      .to_vec();

    Ok(FetchResponse {
      status,
      content_type,
      body,
    })
  }
}
