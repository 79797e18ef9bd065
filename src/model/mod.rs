//! Model module - Playback data types
//!
//! - `track`: Track metadata shared by both backends
//! - `queue`: Local play queue with wrap-around stepping
//! - `playback`: Authority selection and the published playback snapshot
//! - `ui`: Selection and overlay state for the terminal UI
//! - `spotify_client`: Web API client used for remote transport and library loading

mod track;
mod queue;
mod playback;
mod spotify_client;
mod ui;

pub use track::{id_from_uri, Album, Artist, Image, Track};

pub use queue::Queue;

pub use playback::{clamp_progress, Authority, PlaybackState, PlaybackTiming};

pub use spotify_client::SpotifyClient;

pub use ui::UiState;
