//! Seams between the remote session adapter and the outside world

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenService;
use super::events::RemoteEvent;

pub type EventSink = mpsc::UnboundedSender<RemoteEvent>;

/// The vendor runtime that turns this process into a controllable device.
#[async_trait]
pub trait RemoteRuntime: Send + Sync {
    /// Register the device and start pushing [`RemoteEvent`]s into `events`.
    ///
    /// `tokens` must be consulted on every authorization challenge. Once
    /// `cancel` fires, nothing may be sent to `events` any more.
    async fn connect(
        &self,
        device_name: &str,
        tokens: Arc<dyn TokenService>,
        events: EventSink,
        cancel: CancellationToken,
    ) -> Result<Box<dyn RemoteConnection>>;
}

/// Live device connection owned by the session adapter.
pub trait RemoteConnection: Send + Sync {
    fn disconnect(&self);
}

/// Web API view of the user's devices.
///
/// The id a device registers with is not necessarily the id the Web API
/// addresses it by, so commands only use ids found here.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn device_id_by_name(&self, name: &str) -> Result<Option<String>>;
}

pub const DEVICE_LOOKUP_ATTEMPTS: u32 = 10;
pub const DEVICE_LOOKUP_DELAY: Duration = Duration::from_millis(500);

/// Poll `directory` until a device called `name` shows up.
///
/// `None` when it never appears within `attempts` or `cancel` fires.
pub async fn resolve_device_id(
    directory: &dyn DeviceDirectory,
    name: &str,
    attempts: u32,
    delay: Duration,
    cancel: &CancellationToken,
) -> Option<String> {
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return None;
        }
        match directory.device_id_by_name(name).await {
            Ok(Some(id)) => {
                tracing::debug!(attempt, device_name = name, device_id = %id, "Resolved Web API device id");
                return Some(id);
            }
            Ok(None) => tracing::debug!(attempt, device_name = name, "Device not listed yet"),
            Err(e) => tracing::warn!(attempt, error = %e, "Device lookup failed"),
        }
        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
    None
}

/// What to start playing on the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayRequest {
    Uris(Vec<String>),
    /// Play `context_uri` (album, playlist, artist) starting at `offset_uri`.
    Context { context_uri: String, offset_uri: String },
}

/// Playback commands addressed to a specific device.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn play(&self, device_id: &str, request: &PlayRequest) -> Result<()>;
    async fn resume(&self, device_id: &str) -> Result<()>;
    async fn pause(&self, device_id: &str) -> Result<()>;
    async fn next(&self, device_id: &str) -> Result<()>;
    async fn previous(&self, device_id: &str) -> Result<()>;
    async fn seek(&self, device_id: &str, position_ms: u32) -> Result<()>;
    async fn set_volume(&self, device_id: &str, percent: u8) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lists the device only after `hidden_for` lookups
    struct SlowDirectory {
        hidden_for: usize,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl DeviceDirectory for SlowDirectory {
        async fn device_id_by_name(&self, name: &str) -> Result<Option<String>> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                anyhow::bail!("502 Bad Gateway");
            }
            Ok((n >= self.hidden_for && name == "Tandem").then(|| "web-id-1".to_string()))
        }
    }

    fn directory(hidden_for: usize) -> SlowDirectory {
        SlowDirectory { hidden_for, lookups: AtomicUsize::new(0) }
    }

    #[tokio::test]
    async fn waits_for_device_to_be_listed() {
        let dir = directory(2);
        let cancel = CancellationToken::new();
        let id = resolve_device_id(&dir, "Tandem", 5, Duration::from_millis(1), &cancel).await;
        assert_eq!(id.as_deref(), Some("web-id-1"));
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let dir = directory(usize::MAX);
        let cancel = CancellationToken::new();
        let id = resolve_device_id(&dir, "Tandem", 3, Duration::from_millis(1), &cancel).await;
        assert_eq!(id, None);
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_lookup() {
        let dir = directory(2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let id = resolve_device_id(&dir, "Tandem", 5, Duration::from_millis(1), &cancel).await;
        assert_eq!(id, None);
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 0);
    }
}
