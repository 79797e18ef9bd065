//! Remote session adapter
//!
//! Owns the single remote device connection. Everything the device reports
//! arrives as a [`RemoteEvent`] on the receiver returned by [`RemoteSession::new`]
//! and must be fed back through [`RemoteSession::apply`], the only place where
//! connection state changes.
//!
//! - `events`: typed device events and the reported track shape
//! - `runtime`: traits for the device runtime and the playback Web API
//! - `connect`: the librespot-backed Spotify Connect runtime

mod connect;
mod events;
mod runtime;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::auth::TokenService;
use crate::log_api_result;
use crate::model::{PlaybackTiming, Track};

pub use connect::LibrespotRuntime;
pub use events::{RemoteErrorKind, RemoteEvent};
#[cfg(test)]
pub use events::{RemotePlayerState, RemoteTrack};
pub use runtime::{PlayRequest, RemoteTransport};
pub(crate) use runtime::{DeviceDirectory, EventSink, RemoteConnection, RemoteRuntime};

type ConnectionSlot = Arc<Mutex<Option<Box<dyn RemoteConnection>>>>;

pub struct RemoteSession {
    runtime: Arc<dyn RemoteRuntime>,
    transport: Arc<dyn RemoteTransport>,
    tokens: Arc<dyn TokenService>,
    device_name: String,
    events_tx: EventSink,
    cancel: CancellationToken,
    connection: ConnectionSlot,
    initialized: bool,

    device_id: Option<String>,
    is_ready: bool,
    is_active: bool,
    paused: bool,
    track: Option<Track>,
    timing: PlaybackTiming,
    volume: f32,
}

impl RemoteSession {
    pub fn new(
        runtime: Arc<dyn RemoteRuntime>,
        transport: Arc<dyn RemoteTransport>,
        tokens: Arc<dyn TokenService>,
        device_name: impl Into<String>,
        volume: f32,
    ) -> (Self, mpsc::UnboundedReceiver<RemoteEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            runtime,
            transport,
            tokens,
            device_name: device_name.into(),
            events_tx,
            cancel: CancellationToken::new(),
            connection: Arc::new(Mutex::new(None)),
            initialized: false,
            device_id: None,
            is_ready: false,
            is_active: false,
            paused: true,
            track: None,
            timing: PlaybackTiming::default(),
            volume,
        };
        (session, events_rx)
    }

    /// Start connecting the device in the background.
    ///
    /// Does nothing when already initialized, torn down, or not authenticated.
    pub fn initialize(&mut self) {
        if self.initialized || self.cancel.is_cancelled() {
            return;
        }
        if !self.tokens.is_authenticated() {
            tracing::debug!("Not authenticated, skipping remote device setup");
            return;
        }
        self.initialized = true;

        let runtime = self.runtime.clone();
        let tokens = self.tokens.clone();
        let events = self.events_tx.clone();
        let cancel = self.cancel.clone();
        let slot = self.connection.clone();
        let device_name = self.device_name.clone();

        tracing::info!(device_name = %device_name, "Connecting remote device");

        tokio::spawn(async move {
            // Not raced against cancellation: a device that finishes connecting after teardown is disconnected below
            let result = runtime.connect(&device_name, tokens, events.clone(), cancel.clone()).await;

            match result {
                Ok(connection) => {
                    let mut slot = slot.lock().await;
                    if cancel.is_cancelled() {
                        tracing::debug!("Session torn down while connecting, dropping connection");
                        connection.disconnect();
                        return;
                    }
                    *slot = Some(connection);
                }
                Err(e) => {
                    if !cancel.is_cancelled() {
                        let _ = events.send(RemoteEvent::Error {
                            kind: RemoteErrorKind::Initialization,
                            message: e.to_string(),
                        });
                    }
                }
            }
        });
    }

    /// Fold one device event into the session state.
    pub fn apply(&mut self, event: RemoteEvent) {
        self.apply_at(event, Instant::now());
    }

    fn apply_at(&mut self, event: RemoteEvent, now: Instant) {
        if self.cancel.is_cancelled() {
            return;
        }

        match event {
            RemoteEvent::Ready { device_id } => {
                tracing::info!(device_id = %device_id, "Remote device ready");
                self.device_id = Some(device_id);
                self.is_ready = true;
            }
            RemoteEvent::NotReady { device_id } => {
                // The device id is kept: it stays stable across connectivity blips
                tracing::warn!(device_id = %device_id, known = ?self.device_id, "Remote device went offline");
                self.is_ready = false;
            }
            RemoteEvent::StateChanged(None) => {
                tracing::debug!("Remote device lost playback focus");
                self.is_active = false;
                self.paused = true;
                self.timing.update_position(self.timing.position_ms, false, now);
            }
            RemoteEvent::StateChanged(Some(state)) => {
                if let Some(remote_track) = &state.current_track {
                    self.track = Some(remote_track.to_track());
                }
                let duration_ms = if state.duration_ms > 0 {
                    state.duration_ms
                } else {
                    self.track.as_ref().map(|t| t.duration_ms).unwrap_or(0)
                };
                self.is_active = true;
                self.paused = state.paused;
                self.timing.set_duration(duration_ms);
                self.timing.update_position(state.position_ms, !state.paused, now);
                tracing::trace!(
                    paused = state.paused,
                    position_ms = state.position_ms,
                    duration_ms,
                    "Remote state changed"
                );
            }
            RemoteEvent::Error { kind, message } => {
                tracing::error!(kind = ?kind, error = %message, "Remote device error, continuing with local playback");
            }
        }
    }

    /// Advance the simulated position; called on a fixed cadence.
    pub fn tick(&mut self, now: Instant) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.timing.is_playing = self.is_playing();
        self.timing.advance(now);
    }

    fn connected_device(&self) -> Option<String> {
        if self.is_ready { self.device_id.clone() } else { None }
    }

    pub async fn play(&self, uri: &str, context_uri: Option<&str>) {
        let Some(device_id) = self.connected_device() else {
            tracing::debug!(uri, "No remote device connected, ignoring play");
            return;
        };
        let request = match context_uri {
            Some(context_uri) => PlayRequest::Context {
                context_uri: context_uri.to_string(),
                offset_uri: uri.to_string(),
            },
            None => PlayRequest::Uris(vec![uri.to_string()]),
        };
        crate::log_api_request!("play", device_id = %device_id, request = ?request);
        let result = self.transport.play(&device_id, &request).await;
        log_api_result!("play", result);
    }

    pub async fn toggle_play(&self) {
        let Some(device_id) = self.connected_device() else {
            return;
        };
        if self.paused {
            let result = self.transport.resume(&device_id).await;
            log_api_result!("resume", result);
        } else {
            let result = self.transport.pause(&device_id).await;
            log_api_result!("pause", result);
        }
    }

    pub async fn next(&self) {
        let Some(device_id) = self.connected_device() else {
            return;
        };
        let result = self.transport.next(&device_id).await;
        log_api_result!("next", result);
    }

    pub async fn previous(&self) {
        let Some(device_id) = self.connected_device() else {
            return;
        };
        let result = self.transport.previous(&device_id).await;
        log_api_result!("previous", result);
    }

    pub async fn seek(&self, position_ms: u32) {
        let Some(device_id) = self.connected_device() else {
            return;
        };
        let result = self.transport.seek(&device_id, position_ms).await;
        log_api_result!("seek", result);
    }

    pub async fn set_volume(&mut self, volume: f32) {
        let Some(device_id) = self.connected_device() else {
            return;
        };
        let volume = volume.clamp(0.0, 1.0);
        let percent = (volume * 100.0).round() as u8;
        let result = self.transport.set_volume(&device_id, percent).await;
        log_api_result!("set_volume", result);
        if result.is_ok() && !self.cancel.is_cancelled() {
            self.volume = volume;
        }
    }

    /// Disconnect and silence every pending callback. Safe to call repeatedly.
    pub async fn teardown(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Some(connection) = self.connection.lock().await.take() {
            connection.disconnect();
        }
        self.is_ready = false;
        self.is_active = false;
        self.device_id = None;
        tracing::info!("Remote session torn down");
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_playing(&self) -> bool {
        self.is_active && !self.paused
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn progress_ms(&self) -> u32 {
        self.timing.position_ms
    }

    pub fn duration_ms(&self) -> u32 {
        self.timing.duration_ms
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes shared by the remote and coordinator tests

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use anyhow::Result;
    use tokio::sync::Notify;
    use async_trait::async_trait;

    pub struct FakeTokens {
        pub authenticated: AtomicBool,
        pub fetches: AtomicUsize,
        /// Refresh keeps failing; no token is handed out
        pub exhausted: AtomicBool,
    }

    impl FakeTokens {
        pub fn new(authenticated: bool) -> Arc<Self> {
            Arc::new(Self {
                authenticated: AtomicBool::new(authenticated),
                fetches: AtomicUsize::new(0),
                exhausted: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl TokenService for FakeTokens {
        fn is_authenticated(&self) -> bool {
            self.authenticated.load(Ordering::SeqCst)
        }

        async fn valid_access_token(&self) -> Option<String> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.exhausted.load(Ordering::SeqCst) {
                return None;
            }
            Some(format!("token-{n}"))
        }
    }

    pub struct FakeConnection {
        pub disconnects: Arc<AtomicUsize>,
    }

    impl RemoteConnection for FakeConnection {
        fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    pub struct FakeRuntime {
        pub connects: AtomicUsize,
        pub disconnects: Arc<AtomicUsize>,
        pub fail: AtomicBool,
    }

    #[async_trait]
    impl RemoteRuntime for FakeRuntime {
        async fn connect(
            &self,
            _device_name: &str,
            tokens: Arc<dyn TokenService>,
            _events: EventSink,
            _cancel: CancellationToken,
        ) -> Result<Box<dyn RemoteConnection>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("runtime failed to load");
            }
            tokens.valid_access_token().await;
            Ok(Box::new(FakeConnection { disconnects: self.disconnects.clone() }))
        }
    }

    /// Connects only once `release` is notified, then reports the device ready
    /// the way the librespot runtime does.
    #[derive(Default)]
    pub struct GatedRuntime {
        pub release: Arc<Notify>,
        pub entered: Arc<Notify>,
        pub disconnects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RemoteRuntime for GatedRuntime {
        async fn connect(
            &self,
            _device_name: &str,
            _tokens: Arc<dyn TokenService>,
            events: EventSink,
            cancel: CancellationToken,
        ) -> Result<Box<dyn RemoteConnection>> {
            self.entered.notify_one();
            self.release.notified().await;
            if !cancel.is_cancelled() {
                let _ = events.send(RemoteEvent::Ready { device_id: "dev1".into() });
            }
            Ok(Box::new(FakeConnection { disconnects: self.disconnects.clone() }))
        }
    }

    #[derive(Default)]
    pub struct FakeTransport {
        pub calls: StdMutex<Vec<String>>,
        pub fail: AtomicBool,
    }

    impl FakeTransport {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("503 Service Unavailable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteTransport for FakeTransport {
        async fn play(&self, device_id: &str, request: &PlayRequest) -> Result<()> {
            self.record(format!("play {device_id} {request:?}"))
        }
        async fn resume(&self, device_id: &str) -> Result<()> {
            self.record(format!("resume {device_id}"))
        }
        async fn pause(&self, device_id: &str) -> Result<()> {
            self.record(format!("pause {device_id}"))
        }
        async fn next(&self, device_id: &str) -> Result<()> {
            self.record(format!("next {device_id}"))
        }
        async fn previous(&self, device_id: &str) -> Result<()> {
            self.record(format!("previous {device_id}"))
        }
        async fn seek(&self, device_id: &str, position_ms: u32) -> Result<()> {
            self.record(format!("seek {device_id} {position_ms}"))
        }
        async fn set_volume(&self, device_id: &str, percent: u8) -> Result<()> {
            self.record(format!("volume {device_id} {percent}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn session(
        authenticated: bool,
    ) -> (RemoteSession, Arc<FakeRuntime>, Arc<FakeTransport>, mpsc::UnboundedReceiver<RemoteEvent>) {
        let runtime = Arc::new(FakeRuntime::default());
        let transport = Arc::new(FakeTransport::default());
        let (session, rx) = RemoteSession::new(
            runtime.clone(),
            transport.clone(),
            FakeTokens::new(authenticated),
            "Test",
            0.5,
        );
        (session, runtime, transport, rx)
    }

    fn playing_state(position_ms: u32, paused: bool) -> RemotePlayerState {
        RemotePlayerState {
            paused,
            position_ms,
            duration_ms: 200_000,
            current_track: Some(RemoteTrack {
                uri: "spotify:track:t1".into(),
                name: "Song".into(),
                duration_ms: 200_000,
                ..Default::default()
            }),
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn initialize_is_noop_without_authentication() {
        let (mut session, runtime, _, _rx) = session(false);
        session.initialize();
        settle().await;
        assert_eq!(runtime.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initialize_connects_once() {
        let (mut session, runtime, _, _rx) = session(true);
        session.initialize();
        session.initialize();
        settle().await;
        assert_eq!(runtime.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_reported_as_initialization_error() {
        let (mut session, runtime, _, mut rx) = session(true);
        runtime.fail.store(true, Ordering::SeqCst);
        session.initialize();
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(matches!(
            event,
            Some(RemoteEvent::Error { kind: RemoteErrorKind::Initialization, .. })
        ));
        session.apply(event.unwrap());
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn ready_and_not_ready_keep_device_id() {
        let (mut session, _, _, _rx) = session(true);
        session.apply(RemoteEvent::NotReady { device_id: "ghost".into() });
        assert_eq!(session.device_id(), None);

        session.apply(RemoteEvent::Ready { device_id: "dev1".into() });
        assert!(session.is_ready());
        assert_eq!(session.device_id(), Some("dev1"));

        session.apply(RemoteEvent::NotReady { device_id: "dev1".into() });
        assert!(!session.is_ready());
        assert_eq!(session.device_id(), Some("dev1"));
    }

    #[tokio::test]
    async fn lost_focus_keeps_previous_track_and_progress() {
        let (mut session, _, _, _rx) = session(true);
        session.apply(RemoteEvent::StateChanged(Some(playing_state(42_000, false))));
        assert!(session.is_playing());

        session.apply(RemoteEvent::StateChanged(None));
        assert!(!session.is_active());
        assert!(!session.is_playing());
        assert_eq!(session.track().map(|t| t.id.as_str()), Some("t1"));
        assert_eq!(session.progress_ms(), 42_000);
    }

    #[tokio::test]
    async fn tick_simulates_progress_while_playing() {
        let (mut session, _, _, _rx) = session(true);
        let start = Instant::now();
        session.apply_at(RemoteEvent::StateChanged(Some(playing_state(199_500, false))), start);
        session.tick(start + Duration::from_millis(1000));
        assert_eq!(session.progress_ms(), 200_000);

        session.apply_at(RemoteEvent::StateChanged(Some(playing_state(10_000, true))), start);
        session.tick(start + Duration::from_millis(3000));
        assert_eq!(session.progress_ms(), 10_000);
    }

    #[tokio::test]
    async fn transport_is_noop_without_device() {
        let (mut session, _, transport, _rx) = session(true);
        session.play("spotify:track:t1", None).await;
        session.toggle_play().await;
        session.set_volume(0.3).await;
        assert!(transport.calls().is_empty());
        assert_eq!(session.volume(), 0.5);
    }

    #[tokio::test]
    async fn play_with_context_requests_offset() {
        let (mut session, _, transport, _rx) = session(true);
        session.apply(RemoteEvent::Ready { device_id: "dev1".into() });
        session.play("spotify:track:t1", Some("spotify:album:al1")).await;
        session.play("spotify:track:t2", None).await;

        let calls = transport.calls();
        assert_eq!(
            calls[0],
            format!(
                "play dev1 {:?}",
                PlayRequest::Context {
                    context_uri: "spotify:album:al1".into(),
                    offset_uri: "spotify:track:t1".into()
                }
            )
        );
        assert_eq!(calls[1], format!("play dev1 {:?}", PlayRequest::Uris(vec!["spotify:track:t2".into()])));
    }

    #[tokio::test]
    async fn toggle_follows_reported_pause_state() {
        let (mut session, _, transport, _rx) = session(true);
        session.apply(RemoteEvent::Ready { device_id: "dev1".into() });
        session.toggle_play().await;
        session.apply(RemoteEvent::StateChanged(Some(playing_state(0, false))));
        session.toggle_play().await;
        assert_eq!(transport.calls(), vec!["resume dev1", "pause dev1"]);
    }

    #[tokio::test]
    async fn failed_volume_change_leaves_state() {
        let (mut session, _, transport, _rx) = session(true);
        session.apply(RemoteEvent::Ready { device_id: "dev1".into() });
        transport.fail.store(true, Ordering::SeqCst);
        session.set_volume(0.8).await;
        assert_eq!(session.volume(), 0.5);

        transport.fail.store(false, Ordering::SeqCst);
        session.set_volume(0.8).await;
        assert_eq!(session.volume(), 0.8);
        assert_eq!(transport.calls().last().map(String::as_str), Some("volume dev1 80"));
    }

    #[tokio::test]
    async fn teardown_while_connecting_releases_late_connection() {
        let runtime = Arc::new(GatedRuntime::default());
        let (mut session, mut rx) = RemoteSession::new(
            runtime.clone(),
            Arc::new(FakeTransport::default()),
            FakeTokens::new(true),
            "Test",
            0.5,
        );
        session.initialize();
        runtime.entered.notified().await;

        session.teardown().await;
        runtime.release.notify_one();

        tokio::time::timeout(Duration::from_secs(1), async {
            while runtime.disconnects.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("late connection was never disconnected");

        assert_eq!(runtime.disconnects.load(Ordering::SeqCst), 1);
        assert!(session.connection.lock().await.is_none());
        assert!(rx.try_recv().is_err());
        assert!(!session.is_ready());
        assert_eq!(session.device_id(), None);
    }

    #[tokio::test]
    async fn connect_uses_a_freshly_fetched_token() {
        let runtime = Arc::new(FakeRuntime::default());
        let tokens = FakeTokens::new(true);
        let (mut session, _rx) = RemoteSession::new(
            runtime.clone(),
            Arc::new(FakeTransport::default()),
            tokens.clone(),
            "Test",
            0.5,
        );
        assert_eq!(tokens.fetches.load(Ordering::SeqCst), 0);

        session.initialize();
        settle().await;
        assert_eq!(runtime.connects.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn teardown_is_idempotent_and_silences_events() {
        let (mut session, runtime, _, _rx) = session(true);
        session.initialize();
        settle().await;
        session.apply(RemoteEvent::Ready { device_id: "dev1".into() });

        session.teardown().await;
        session.teardown().await;
        assert_eq!(runtime.disconnects.load(Ordering::SeqCst), 1);

        session.apply(RemoteEvent::Ready { device_id: "dev2".into() });
        assert!(!session.is_ready());
        assert_eq!(session.device_id(), None);

        session.initialize();
        settle().await;
        assert_eq!(runtime.connects.load(Ordering::SeqCst), 1);
    }
}
