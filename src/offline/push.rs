//! Background sync and push notification hooks.
//!
//! Both are best-effort, at most once per event delivery. A sync event runs
//! a deferred task; a push event with a JSON payload becomes a user
//! notification. Failures are logged and swallowed - neither hook may crash
//! the controller.

use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, warn};

/// The one sync tag the controller responds to.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Fixed notification chrome.
pub const NOTIFICATION_ICON: &str = "/icons/icon-192x192.jpg";
pub const VIBRATION_PATTERN: [u32; 3] = [100, 50, 100];

/// Minimum push payload: `{"title": ..., "body": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
  pub title: String,
  pub body: String,
}

/// A displayable user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
}

impl From<PushPayload> for Notification {
  fn from(payload: PushPayload) -> Self {
    Self {
      title: payload.title,
      body: payload.body,
      icon: NOTIFICATION_ICON.to_string(),
      badge: NOTIFICATION_ICON.to_string(),
      vibrate: VIBRATION_PATTERN.to_vec(),
    }
  }
}

/// Turn a raw push payload into a notification.
///
/// An undecodable payload shows nothing: log and move on.
pub fn handle_push(payload: &[u8]) -> Option<Notification> {
  match serde_json::from_slice::<PushPayload>(payload) {
    Ok(payload) => Some(payload.into()),
    Err(e) => {
      warn!("discarding undecodable push payload: {}", e);
      None
    }
  }
}

/// Run the deferred task for a tagged sync event, best effort.
///
/// Unknown tags are ignored; a failing task is logged, never retried.
pub async fn handle_sync<F, Fut>(tag: &str, task: F)
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = color_eyre::Result<()>>,
{
  if tag != BACKGROUND_SYNC_TAG {
    debug!(tag = %tag, "ignoring unknown sync tag");
    return;
  }

  info!("background sync triggered");
  if let Err(e) = task().await {
    warn!("background sync task failed: {}", e);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicBool, Ordering};

  #[test]
  fn push_payload_becomes_notification() {
    let notification =
      handle_push(br#"{"title": "MealPal", "body": "Time to log lunch!"}"#).unwrap();

    assert_eq!(notification.title, "MealPal");
    assert_eq!(notification.body, "Time to log lunch!");
    assert_eq!(notification.icon, NOTIFICATION_ICON);
    assert_eq!(notification.badge, NOTIFICATION_ICON);
    assert_eq!(notification.vibrate, vec![100, 50, 100]);
  }

  #[test]
  fn malformed_push_payload_shows_nothing() {
    assert_eq!(handle_push(b"not json"), None);
    assert_eq!(handle_push(br#"{"title": "no body"}"#), None);
  }

  #[tokio::test]
  async fn sync_runs_only_for_the_known_tag() {
    let ran = AtomicBool::new(false);
    handle_sync(BACKGROUND_SYNC_TAG, || async {
      ran.store(true, Ordering::SeqCst);
      Ok(())
    })
    .await;
    assert!(ran.load(Ordering::SeqCst));

    let ran = AtomicBool::new(false);
    handle_sync("some-other-tag", || async {
      ran.store(true, Ordering::SeqCst);
      Ok(())
    })
    .await;
    assert!(!ran.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn failing_sync_task_is_swallowed() {
    handle_sync(BACKGROUND_SYNC_TAG, || async {
      Err(color_eyre::eyre::eyre!("flush failed"))
    })
    .await;
  }
}
