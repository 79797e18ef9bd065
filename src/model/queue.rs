//! Play queue with circular advance

use super::track::Track;

/// Ordered tracks plus the index of the current one.
///
/// `current_index` is `-1` exactly when the queue is empty.
#[derive(Clone, Debug)]
pub struct Queue {
    tracks: Vec<Track>,
    current_index: i32,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            current_index: -1,
        }
    }
}

impl Queue {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> i32 {
        self.current_index
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&Track> {
        usize::try_from(self.current_index)
            .ok()
            .and_then(|i| self.tracks.get(i))
    }

    /// Replace the queue and point at `track`, or at the head if it is not in it.
    pub fn replace(&mut self, tracks: Vec<Track>, track: &Track) {
        self.current_index = if tracks.is_empty() {
            -1
        } else {
            tracks.iter().position(|t| t == track).unwrap_or(0) as i32
        };
        self.tracks = tracks;
    }

    /// Index reached by moving `step` positions from the current one, wrapping
    /// at both ends. `None` for an empty queue.
    fn wrapped_index(&self, step: i32) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len() as i32;
        let from = self.current_index.max(0);
        Some((from + step).rem_euclid(len) as usize)
    }

    /// Move the current index by `step` and return the new current track.
    pub fn advance(&mut self, step: i32) -> Option<&Track> {
        let index = self.wrapped_index(step)?;
        self.current_index = index as i32;
        self.tracks.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track { id: id.to_string(), name: id.to_uppercase(), ..Default::default() }
    }

    fn abc() -> Vec<Track> {
        vec![track("a"), track("b"), track("c")]
    }

    #[test]
    fn empty_queue_has_no_index() {
        let mut queue = Queue::default();
        assert_eq!(queue.current_index(), -1);
        assert!(queue.advance(1).is_none());
        assert_eq!(queue.current_index(), -1);
    }

    #[test]
    fn replace_points_at_requested_track() {
        let mut queue = Queue::default();
        queue.replace(abc(), &track("b"));
        assert_eq!(queue.current_index(), 1);
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn replace_with_absent_track_points_at_head() {
        let mut queue = Queue::default();
        queue.replace(abc(), &track("z"));
        assert_eq!(queue.current_index(), 0);
    }

    #[test]
    fn advance_wraps_both_ends() {
        let mut queue = Queue::default();
        queue.replace(abc(), &track("c"));
        assert_eq!(queue.advance(1).map(|t| t.id.as_str()), Some("a"));
        assert_eq!(queue.advance(-1).map(|t| t.id.as_str()), Some("c"));
    }

    #[test]
    fn next_then_previous_returns_to_start() {
        for len in 1..6 {
            let tracks: Vec<Track> = (0..len).map(|i| track(&i.to_string())).collect();
            for start in 0..len {
                let mut queue = Queue::default();
                queue.replace(tracks.clone(), &tracks[start]);
                queue.advance(1);
                queue.advance(-1);
                assert_eq!(queue.current_index(), start as i32);
            }
        }
    }
}
