//! Spotify Web API client: device-targeted playback commands and the saved-tracks queue source

use std::collections::HashSet;
use std::sync::Arc;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rspotify::{
    model::{AlbumId, ArtistId, Offset, PlayContextId, PlayableId, PlaylistId, TrackId},
    prelude::*,
    AuthCodeSpotify, Config, Token,
};

use crate::auth::{TokenService, SCOPES};
use crate::remote::{DeviceDirectory, PlayRequest, RemoteTransport};
use super::track::{id_from_uri, Track};

/// Spotify API client that asks the token service for a fresh token before every request
#[derive(Clone)]
pub struct SpotifyClient {
    client: Arc<AuthCodeSpotify>,
    tokens: Arc<dyn TokenService>,
}

impl SpotifyClient {
    pub fn new(tokens: Arc<dyn TokenService>) -> Self {
        let client = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );
        tracing::debug!("rspotify client initialized");

        Self {
            client: Arc::new(client),
            tokens,
        }
    }

    async fn authorize(&self) -> Result<()> {
        let access_token = self
            .tokens
            .valid_access_token()
            .await
            .ok_or_else(|| anyhow!("401 Unauthorized: no valid access token"))?;

        let token = Token {
            access_token,
            expires_in: chrono::Duration::seconds(3600),
            expires_at: None,
            scopes: SCOPES
                .split_whitespace()
                .map(|s| s.to_string())
                .collect::<HashSet<String>>(),
            refresh_token: None,
        };

        *self
            .client
            .token
            .lock()
            .await
            .map_err(|_| anyhow!("rspotify token lock unavailable"))? = Some(token);
        Ok(())
    }

    /// The user's saved tracks, newest first, used as the play queue.
    pub async fn saved_tracks(&self, limit: usize) -> Result<Vec<Track>> {
        use futures::StreamExt;
        use futures::TryStreamExt;

        self.authorize().await?;
        crate::log_api_request!("saved_tracks", limit);

        let saved: Vec<_> = self
            .client
            .current_user_saved_tracks(None)
            .take(limit)
            .try_collect()
            .await?;

        let tracks: Vec<Track> = saved
            .into_iter()
            .map(|saved| Track::from_full_track(saved.track))
            .filter(|track| !track.id.is_empty())
            .collect();

        tracing::info!(
            count = tracks.len(),
            with_preview = tracks.iter().filter(|t| t.has_preview()).count(),
            "Loaded saved tracks"
        );
        Ok(tracks)
    }

    fn play_context(context_uri: &str) -> Result<PlayContextId<'static>> {
        let id = id_from_uri(context_uri);
        let context = if context_uri.contains(":album:") {
            PlayContextId::Album(AlbumId::from_id(id)?)
        } else if context_uri.contains(":playlist:") {
            PlayContextId::Playlist(PlaylistId::from_id(id)?)
        } else if context_uri.contains(":artist:") {
            PlayContextId::Artist(ArtistId::from_id(id)?)
        } else {
            return Err(anyhow!("Unknown context type: {}", context_uri));
        };
        Ok(context)
    }
}

#[async_trait]
impl RemoteTransport for SpotifyClient {
    async fn play(&self, device_id: &str, request: &PlayRequest) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, request = ?request, "API: play");

        match request {
            PlayRequest::Uris(uris) => {
                let ids = uris
                    .iter()
                    .map(|uri| TrackId::from_id(id_from_uri(uri)).map(PlayableId::Track))
                    .collect::<Result<Vec<_>, _>>()?;
                self.client
                    .start_uris_playback(ids, Some(device_id), None, None)
                    .await?;
            }
            PlayRequest::Context { context_uri, offset_uri } => {
                let context = Self::play_context(context_uri)?;
                let offset = Offset::Uri(offset_uri.clone());
                self.client
                    .start_context_playback(context, Some(device_id), Some(offset), None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn resume(&self, device_id: &str) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, "API: resume_playback");
        self.client.resume_playback(Some(device_id), None).await?;
        Ok(())
    }

    async fn pause(&self, device_id: &str) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, "API: pause_playback");
        self.client.pause_playback(Some(device_id)).await?;
        Ok(())
    }

    async fn next(&self, device_id: &str) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, "API: next_track");
        self.client.next_track(Some(device_id)).await?;
        Ok(())
    }

    async fn previous(&self, device_id: &str) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, "API: previous_track");
        self.client.previous_track(Some(device_id)).await?;
        Ok(())
    }

    async fn seek(&self, device_id: &str, position_ms: u32) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, position_ms, "API: seek_track");
        self.client
            .seek_track(chrono::Duration::milliseconds(position_ms as i64), Some(device_id))
            .await?;
        Ok(())
    }

    async fn set_volume(&self, device_id: &str, percent: u8) -> Result<()> {
        self.authorize().await?;
        tracing::debug!(device_id, percent, "API: set_volume");
        self.client.volume(percent.min(100), Some(device_id)).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceDirectory for SpotifyClient {
    async fn device_id_by_name(&self, name: &str) -> Result<Option<String>> {
        self.authorize().await?;
        let devices = self.client.device().await?;
        let device = devices.into_iter().find(|d| d.name == name);
        tracing::debug!(device_name = name, device_id = ?device.as_ref().and_then(|d| d.id.as_ref()), "API: device lookup");
        Ok(device.and_then(|d| d.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use crate::remote::testing::FakeTokens;

    #[test]
    fn context_uri_kinds() {
        assert!(matches!(
            SpotifyClient::play_context("spotify:album:4aawyAB9vmqN3uQ7FjRGTy"),
            Ok(PlayContextId::Album(_))
        ));
        assert!(matches!(
            SpotifyClient::play_context("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"),
            Ok(PlayContextId::Playlist(_))
        ));
        assert!(SpotifyClient::play_context("spotify:show:abc").is_err());
    }

    async fn installed_token(client: &SpotifyClient) -> Option<String> {
        let guard = client.client.token.lock().await.unwrap();
        let token: &Option<Token> = &guard;
        token.as_ref().map(|t| t.access_token.clone())
    }

    #[tokio::test]
    async fn every_request_asks_for_a_fresh_token() {
        let tokens = FakeTokens::new(true);
        let client = SpotifyClient::new(tokens.clone());

        client.authorize().await.unwrap();
        assert_eq!(installed_token(&client).await.as_deref(), Some("token-0"));

        client.authorize().await.unwrap();
        assert_eq!(installed_token(&client).await.as_deref(), Some("token-1"));
        assert_eq!(tokens.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let tokens = FakeTokens::new(false);
        tokens.exhausted.store(true, Ordering::SeqCst);
        let client = SpotifyClient::new(tokens.clone());

        let err = client.authorize().await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(installed_token(&client).await, None);
    }
}
