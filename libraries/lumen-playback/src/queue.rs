//! Playback queue
//!
//! The queue keeps the catalog's canonical order untouched and layers a
//! permutation of canonical indices on top of it:
//!
//! ```text
//! canonical:  [A, B, C, D]        (as supplied by the catalog)
//! order:      [2, 0, 3, 1]        (Fisher-Yates permutation when shuffled)
//! view:       [C, A, D, B]        (what the UI and the controller index into)
//! ```
//!
//! Un-shuffling resets `order` to the identity, which restores the canonical
//! order exactly. The current selection is tracked by queue position but is
//! remapped through the canonical index whenever the permutation changes.

use crate::shuffle::{random_index, shuffle_order};
use crate::types::{RepeatMode, Track};
use rand::Rng;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Queue {
    /// Tracks in catalog order
    canonical: Vec<Track>,

    /// Queue position -> canonical index
    order: Vec<usize>,

    /// Materialized playback order, shared with state snapshots
    view: Rc<[Track]>,

    /// Selected queue position
    current: Option<usize>,

    shuffled: bool,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            canonical: Vec::new(),
            order: Vec::new(),
            view: Rc::from(Vec::new()),
            current: None,
            shuffled: false,
        }
    }

    /// Replace the whole queue
    ///
    /// The selection is cleared; no attempt is made to find the previously
    /// selected track in the new catalog.
    pub fn replace<R: Rng + ?Sized>(&mut self, tracks: Vec<Track>, shuffled: bool, rng: &mut R) {
        self.order = (0..tracks.len()).collect();
        self.canonical = tracks;
        self.current = None;
        self.shuffled = shuffled;
        if shuffled {
            shuffle_order(&mut self.order, rng);
        }
        self.rebuild_view();
    }

    /// Shuffle the full track set, keeping the current track selected
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let selected = self.current_canonical();
        shuffle_order(&mut self.order, rng);
        self.shuffled = true;
        self.rebuild_view();
        self.reselect(selected);
    }

    /// Restore catalog order, keeping the current track selected
    pub fn unshuffle(&mut self) {
        let selected = self.current_canonical();
        self.order = (0..self.canonical.len()).collect();
        self.shuffled = false;
        self.rebuild_view();
        self.reselect(selected);
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Track at a queue position
    pub fn get(&self, position: usize) -> Option<&Track> {
        self.view.get(position)
    }

    /// Tracks in playback order
    pub fn tracks(&self) -> Rc<[Track]> {
        Rc::clone(&self.view)
    }

    /// Tracks in catalog order
    pub fn canonical(&self) -> &[Track] {
        &self.canonical
    }

    /// Selected queue position
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.view.get(i))
    }

    /// Select a queue position (or clear the selection)
    ///
    /// Returns `false` and leaves the selection untouched if `position` is
    /// outside the queue.
    pub fn select(&mut self, position: Option<usize>) -> bool {
        match position {
            Some(i) if i >= self.len() => false,
            other => {
                self.current = other;
                true
            }
        }
    }

    /// Queue position of the track at `canonical` in catalog order
    pub fn position_of(&self, canonical: usize) -> Option<usize> {
        self.order.iter().position(|&o| o == canonical)
    }

    fn current_canonical(&self) -> Option<usize> {
        self.current.map(|i| self.order[i])
    }

    fn reselect(&mut self, canonical: Option<usize>) {
        self.current = canonical.and_then(|c| self.position_of(c));
    }

    fn rebuild_view(&mut self) {
        self.view = self
            .order
            .iter()
            .map(|&i| self.canonical[i].clone())
            .collect::<Vec<_>>()
            .into();
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the queue position that follows `current`
///
/// `None` means playback should stop (end of queue without repeat-all, or an
/// empty queue).
pub fn select_next<R: Rng + ?Sized>(
    current: Option<usize>,
    len: usize,
    repeat: RepeatMode,
    shuffled: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if repeat == RepeatMode::One {
        return Some(current.unwrap_or(0));
    }
    if shuffled {
        return random_index(len, rng);
    }

    let candidate = current.map_or(0, |i| i + 1);
    if candidate >= len {
        (repeat == RepeatMode::All).then_some(0)
    } else {
        Some(candidate)
    }
}

/// Pick the queue position that precedes `current`
///
/// Never stops: wraps to the last track under repeat-all, otherwise clamps to
/// the first track. Only an empty queue yields `None`.
pub fn select_previous<R: Rng + ?Sized>(
    current: Option<usize>,
    len: usize,
    repeat: RepeatMode,
    shuffled: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if repeat == RepeatMode::One {
        return Some(current.unwrap_or(0));
    }
    if shuffled {
        return random_index(len, rng);
    }

    match current {
        Some(i) if i > 0 => Some(i - 1),
        _ if repeat == RepeatMode::All => Some(len - 1),
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_test_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {}", id),
            artist: "Test Artist".to_string(),
            album: "Test Album".to_string(),
            duration_seconds: 180.0,
            source_uri: format!("/audio/{}.mp3", id),
            artwork_uri: None,
            genre: None,
        }
    }

    fn queue_of(n: usize) -> Queue {
        let mut queue = Queue::new();
        let tracks = (0..n).map(|i| create_test_track(&i.to_string())).collect();
        queue.replace(tracks, false, &mut StdRng::seed_from_u64(0));
        queue
    }

    fn ids(queue: &Queue) -> Vec<String> {
        queue.tracks().iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn replace_clears_selection() {
        let mut queue = queue_of(3);
        assert!(queue.select(Some(2)));

        queue.replace(vec![create_test_track("x")], false, &mut StdRng::seed_from_u64(0));
        assert_eq!(queue.current(), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn select_out_of_range_is_rejected() {
        let mut queue = queue_of(3);
        assert!(queue.select(Some(1)));
        assert!(!queue.select(Some(3)));
        assert_eq!(queue.current(), Some(1));
        assert!(queue.select(None));
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn shuffle_keeps_current_track_identity() {
        let mut queue = queue_of(12);
        queue.select(Some(5));
        let before = queue.current_track().unwrap().id.clone();

        queue.shuffle(&mut StdRng::seed_from_u64(5));

        assert!(queue.is_shuffled());
        assert_eq!(queue.current_track().unwrap().id, before);
    }

    #[test]
    fn unshuffle_restores_canonical_order() {
        let mut queue = queue_of(10);
        let original = ids(&queue);
        queue.select(Some(3));

        queue.shuffle(&mut StdRng::seed_from_u64(21));
        assert_ne!(ids(&queue), original);

        queue.unshuffle();
        assert_eq!(ids(&queue), original);
        assert_eq!(queue.current(), Some(3));
    }

    #[test]
    fn replace_while_shuffled_shuffles_new_tracks() {
        let mut queue = Queue::new();
        let tracks: Vec<Track> = (0..10).map(|i| create_test_track(&i.to_string())).collect();
        queue.replace(tracks.clone(), true, &mut StdRng::seed_from_u64(8));

        assert!(queue.is_shuffled());
        assert_eq!(queue.canonical(), tracks.as_slice());
        assert_ne!(ids(&queue), tracks.iter().map(|t| t.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn next_advances_and_stops_at_end() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_next(Some(0), 5, RepeatMode::Off, false, &mut rng), Some(1));
        assert_eq!(select_next(Some(4), 5, RepeatMode::Off, false, &mut rng), None);
        assert_eq!(select_next(None, 5, RepeatMode::Off, false, &mut rng), Some(0));
        assert_eq!(select_next(None, 0, RepeatMode::All, false, &mut rng), None);
    }

    #[test]
    fn next_wraps_with_repeat_all() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_next(Some(4), 5, RepeatMode::All, false, &mut rng), Some(0));
    }

    #[test]
    fn next_with_repeat_one_stays() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_next(Some(2), 5, RepeatMode::One, false, &mut rng), Some(2));
        assert_eq!(select_next(Some(2), 5, RepeatMode::One, true, &mut rng), Some(2));
        assert_eq!(select_next(None, 5, RepeatMode::One, false, &mut rng), Some(0));
    }

    #[test]
    fn next_shuffled_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..100 {
            let next = select_next(Some(4), 5, RepeatMode::Off, true, &mut rng).unwrap();
            assert!(next < 5);
        }
    }

    #[test]
    fn previous_clamps_without_repeat_all() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_previous(Some(3), 5, RepeatMode::Off, false, &mut rng), Some(2));
        assert_eq!(select_previous(Some(0), 5, RepeatMode::Off, false, &mut rng), Some(0));
        assert_eq!(select_previous(None, 5, RepeatMode::Off, false, &mut rng), Some(0));
    }

    #[test]
    fn previous_wraps_with_repeat_all() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_previous(Some(0), 5, RepeatMode::All, false, &mut rng), Some(4));
        assert_eq!(select_previous(Some(0), 0, RepeatMode::All, false, &mut rng), None);
    }
}
