//! Events pushed by the remote device runtime

use crate::model::{id_from_uri, Album, Artist, Image, Track};

/// Everything the runtime can report about the device connection.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteEvent {
    /// The device is controllable under `device_id`.
    Ready { device_id: String },
    /// The device dropped off; it may come back.
    NotReady { device_id: String },
    /// Transport state changed. `None` means this device lost playback focus.
    StateChanged(Option<RemotePlayerState>),
    Error { kind: RemoteErrorKind, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Initialization,
    Authentication,
    Account,
    Playback,
}

/// Player state as reported by the device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemotePlayerState {
    pub paused: bool,
    pub position_ms: u32,
    pub duration_ms: u32,
    pub current_track: Option<RemoteTrack>,
}

/// Track shape reported by the device. Ids are only available inside URIs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteTrack {
    pub uri: String,
    pub name: String,
    pub duration_ms: u32,
    pub album: RemoteAlbum,
    pub artists: Vec<RemoteArtist>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteAlbum {
    pub uri: String,
    pub name: String,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteArtist {
    pub uri: String,
    pub name: String,
}

impl RemoteTrack {
    pub fn to_track(&self) -> Track {
        Track {
            id: id_from_uri(&self.uri),
            name: self.name.clone(),
            duration_ms: self.duration_ms,
            album: Album {
                id: id_from_uri(&self.album.uri),
                name: self.album.name.clone(),
                images: self
                    .album
                    .images
                    .iter()
                    .map(|url| Image { url: url.clone(), ..Default::default() })
                    .collect(),
            },
            artists: self
                .artists
                .iter()
                .map(|a| Artist {
                    id: id_from_uri(&a.uri),
                    name: a.name.clone(),
                })
                .collect(),
            // Remote playback never needs the clip
            preview_url: None,
        }
    }
}
