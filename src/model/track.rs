//! Track metadata shared by both playback backends

use rspotify::model::FullTrack;
use rspotify::prelude::Id;

/// Album artwork reference
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// An immutable track value. Two tracks are the same track when their ids match.
#[derive(Clone, Debug, Default)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: u32,
    pub album: Album,
    pub artists: Vec<Artist>,
    /// Short clip playable by the local fallback player
    pub preview_url: Option<String>,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Track {
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_preview(&self) -> bool {
        self.preview_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    pub fn from_full_track(track: FullTrack) -> Self {
        Self {
            id: track.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
            name: track.name,
            duration_ms: track.duration.num_milliseconds().max(0) as u32,
            album: Album {
                id: track.album.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
                name: track.album.name,
                images: track
                    .album
                    .images
                    .into_iter()
                    .map(|img| Image {
                        url: img.url,
                        width: img.width,
                        height: img.height,
                    })
                    .collect(),
            },
            artists: track
                .artists
                .into_iter()
                .map(|a| Artist {
                    id: a.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
                    name: a.name,
                })
                .collect(),
            preview_url: track.preview_url,
        }
    }
}

/// Extract the id from a `spotify:<kind>:<id>` URI.
///
/// Returns the third colon-delimited segment, or an empty string when the URI
/// has fewer segments.
pub fn id_from_uri(uri: &str) -> String {
    uri.split(':').nth(2).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_third_uri_segment() {
        assert_eq!(id_from_uri("spotify:album:4aawyAB9vmqN3uQ7FjRGTy"), "4aawyAB9vmqN3uQ7FjRGTy");
        assert_eq!(id_from_uri("spotify:artist:abc:extra"), "abc");
    }

    #[test]
    fn short_uri_yields_empty_id() {
        assert_eq!(id_from_uri("spotify:album"), "");
        assert_eq!(id_from_uri(""), "");
    }

    #[test]
    fn identity_is_id_only() {
        let a = Track { id: "1".into(), name: "A".into(), ..Default::default() };
        let b = Track { id: "1".into(), name: "Renamed".into(), ..Default::default() };
        assert_eq!(a, b);
        assert_eq!(a.uri(), "spotify:track:1");
    }

    #[test]
    fn empty_preview_url_is_not_playable() {
        let t = Track { preview_url: Some(String::new()), ..Default::default() };
        assert!(!t.has_preview());
    }
}
