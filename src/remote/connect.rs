//! librespot-backed device runtime
//!
//! Registers this process as a Spotify Connect device and translates the
//! librespot player feed into [`RemoteEvent`]s.

use std::sync::Arc;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use librespot::connect::{ConnectConfig, Spirc};
use librespot::core::authentication::Credentials;
use librespot::core::cache::Cache;
use librespot::core::config::SessionConfig;
use librespot::core::session::Session;
use librespot::metadata::audio::UniqueFields;
use librespot::playback::config::{AudioFormat, Bitrate, PlayerConfig};
use librespot::playback::mixer::{MixerConfig, NoOpVolume};
use librespot::playback::player::{Player, PlayerEvent, PlayerEventChannel};
use librespot::playback::{audio_backend, mixer};

use crate::auth::TokenService;
use super::events::{RemoteAlbum, RemoteArtist, RemoteErrorKind, RemoteEvent, RemotePlayerState, RemoteTrack};
use super::runtime::{
    resolve_device_id, DeviceDirectory, EventSink, RemoteConnection, RemoteRuntime, DEVICE_LOOKUP_ATTEMPTS,
    DEVICE_LOOKUP_DELAY,
};

/// Set once the audio sink and mixer backends have been resolved for this process.
static RUNTIME_LOADED: OnceCell<()> = OnceCell::new();

fn load_runtime() -> Result<()> {
    RUNTIME_LOADED
        .get_or_try_init(|| {
            if audio_backend::find(None).is_none() {
                return Err(anyhow!("no audio sink backend available"));
            }
            if mixer::find(None).is_none() {
                return Err(anyhow!("no mixer backend available"));
            }
            tracing::info!("librespot runtime loaded");
            Ok(())
        })
        .map(|_| ())
}

pub struct LibrespotRuntime {
    cache: Option<Cache>,
    directory: Arc<dyn DeviceDirectory>,
}

impl LibrespotRuntime {
    pub fn new(cache: Option<Cache>, directory: Arc<dyn DeviceDirectory>) -> Self {
        Self { cache, directory }
    }

    fn session_device_id(device_name: &str) -> String {
        // Stable per machine so the device keeps its identity across restarts
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", device_name, hostname)
    }
}

#[async_trait]
impl RemoteRuntime for LibrespotRuntime {
    async fn connect(
        &self,
        device_name: &str,
        tokens: Arc<dyn TokenService>,
        events: EventSink,
        cancel: CancellationToken,
    ) -> Result<Box<dyn RemoteConnection>> {
        load_runtime()?;

        let Some(access_token) = tokens.valid_access_token().await else {
            if !cancel.is_cancelled() {
                let _ = events.send(RemoteEvent::Error {
                    kind: RemoteErrorKind::Authentication,
                    message: "no access token available".to_string(),
                });
            }
            return Err(anyhow!("no access token available"));
        };

        let session_device_id = Self::session_device_id(device_name);
        let session_config = SessionConfig {
            device_id: session_device_id.clone(),
            ..Default::default()
        };
        let player_config = PlayerConfig {
            bitrate: Bitrate::Bitrate320,
            ..Default::default()
        };
        let connect_config = ConnectConfig {
            name: device_name.to_string(),
            ..Default::default()
        };
        let audio_format = AudioFormat::default();
        let sink_builder = audio_backend::find(None).ok_or_else(|| anyhow!("no audio sink backend available"))?;
        let mixer_builder = mixer::find(None).ok_or_else(|| anyhow!("no mixer backend available"))?;

        tracing::debug!(session_device_id = %session_device_id, "Connecting librespot session");
        let session = Session::new(session_config, self.cache.clone());
        let mixer = mixer_builder(MixerConfig::default())?;

        let player = Player::new(
            player_config,
            session.clone(),
            Box::new(NoOpVolume),
            move || sink_builder(None, audio_format),
        );
        let player_events = player.get_player_event_channel();

        let credentials = Credentials::with_access_token(access_token);
        let (spirc, spirc_task) = match Spirc::new(
            connect_config,
            session.clone(),
            credentials,
            player.clone(),
            mixer,
        )
        .await
        {
            Ok(parts) => parts,
            Err(e) => {
                if !cancel.is_cancelled() {
                    let _ = events.send(RemoteEvent::Error {
                        kind: RemoteErrorKind::Account,
                        message: e.to_string(),
                    });
                }
                return Err(e.into());
            }
        };

        spirc.activate()?;

        // Set once the Web API id is known; the spirc task reports loss under that id
        let web_device_id: Arc<OnceCell<String>> = Arc::new(OnceCell::new());

        let task_events = events.clone();
        let task_cancel = cancel.clone();
        let task_device_id = web_device_id.clone();
        tokio::spawn(async move {
            let _ = spirc_task.await;
            if let Some(device_id) = task_device_id.get() {
                if !task_cancel.is_cancelled() {
                    let _ = task_events.send(RemoteEvent::NotReady { device_id: device_id.clone() });
                }
            }
        });

        let Some(device_id) = resolve_device_id(
            self.directory.as_ref(),
            device_name,
            DEVICE_LOOKUP_ATTEMPTS,
            DEVICE_LOOKUP_DELAY,
            &cancel,
        )
        .await
        else {
            if let Err(e) = spirc.shutdown() {
                tracing::warn!(error = %e, "Spirc shutdown failed");
            }
            return Err(anyhow!("device {} never appeared in the Web API device list", device_name));
        };
        let _ = web_device_id.set(device_id.clone());

        forward_player_events(player_events, events.clone(), cancel.clone(), device_id.clone());

        if !cancel.is_cancelled() {
            let _ = events.send(RemoteEvent::Ready { device_id: device_id.clone() });
        }
        tracing::info!(device_id = %device_id, session_device_id = %session_device_id, device_name, "Remote device registered");

        Ok(Box::new(LibrespotConnection { spirc, device_id }))
    }
}

struct LibrespotConnection {
    spirc: Spirc,
    device_id: String,
}

impl RemoteConnection for LibrespotConnection {
    fn disconnect(&self) {
        tracing::debug!(device_id = %self.device_id, "Shutting down librespot device");
        if let Err(e) = self.spirc.shutdown() {
            tracing::warn!(error = %e, "Spirc shutdown failed");
        }
    }
}

fn forward_player_events(
    mut channel: PlayerEventChannel,
    events: EventSink,
    cancel: CancellationToken,
    device_id: String,
) {
    tokio::spawn(async move {
        let mut state = RemotePlayerState {
            paused: true,
            ..Default::default()
        };

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = channel.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let outgoing = match event {
                PlayerEvent::Playing { position_ms, .. } => {
                    state.paused = false;
                    state.position_ms = position_ms;
                    RemoteEvent::StateChanged(Some(state.clone()))
                }
                PlayerEvent::Paused { position_ms, .. } => {
                    state.paused = true;
                    state.position_ms = position_ms;
                    RemoteEvent::StateChanged(Some(state.clone()))
                }
                PlayerEvent::PositionChanged { position_ms, .. }
                | PlayerEvent::Seeked { position_ms, .. }
                | PlayerEvent::Loading { position_ms, .. } => {
                    state.position_ms = position_ms;
                    RemoteEvent::StateChanged(Some(state.clone()))
                }
                PlayerEvent::TrackChanged { audio_item } => {
                    let (artists, album) = match &audio_item.unique_fields {
                        UniqueFields::Track { artists, album, .. } => (
                            artists.0.iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
                            album.clone(),
                        ),
                        UniqueFields::Episode { show_name, .. } => {
                            (vec![show_name.clone()], "Podcast".to_string())
                        }
                        UniqueFields::Local { artists, album, .. } => (
                            artists.clone().into_iter().collect(),
                            album.clone().unwrap_or_default(),
                        ),
                    };

                    let track = RemoteTrack {
                        uri: audio_item.track_id.to_uri().unwrap_or_default(),
                        name: audio_item.name.clone(),
                        duration_ms: audio_item.duration_ms,
                        album: RemoteAlbum {
                            name: album,
                            ..Default::default()
                        },
                        artists: artists
                            .into_iter()
                            .map(|name| RemoteArtist { name, ..Default::default() })
                            .collect(),
                    };
                    tracing::info!(track = %track.name, uri = %track.uri, "Remote track changed");

                    state.duration_ms = track.duration_ms;
                    state.position_ms = 0;
                    state.current_track = Some(track);
                    RemoteEvent::StateChanged(Some(state.clone()))
                }
                PlayerEvent::EndOfTrack { .. } => {
                    state.paused = true;
                    state.position_ms = state.duration_ms;
                    RemoteEvent::StateChanged(Some(state.clone()))
                }
                PlayerEvent::Stopped { .. } => {
                    state.paused = true;
                    RemoteEvent::StateChanged(None)
                }
                PlayerEvent::Unavailable { .. } => RemoteEvent::Error {
                    kind: RemoteErrorKind::Playback,
                    message: "track unavailable on this device".to_string(),
                },
                PlayerEvent::SessionConnected { .. } => RemoteEvent::Ready {
                    device_id: device_id.clone(),
                },
                PlayerEvent::SessionDisconnected { .. } => RemoteEvent::NotReady {
                    device_id: device_id.clone(),
                },
                _ => {
                    tracing::trace!("PlayerEvent: other event received");
                    continue;
                }
            };

            if cancel.is_cancelled() || events.send(outgoing).is_err() {
                break;
            }
        }
        tracing::debug!("Player event forwarder stopped");
    });
}
