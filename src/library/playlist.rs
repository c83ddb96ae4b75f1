//! Ordered, non-empty track list with wrapping navigation.

use crate::error::CatalogError;

use super::model::Track;

#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    /// Build a playlist; an empty track list is rejected so every index
    /// operation below has at least one valid target.
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::EmptyPlaylist);
        }
        Ok(Self { tracks })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    /// Index after `index`, wrapping from the last track to the first.
    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 >= self.tracks.len() {
            0
        } else {
            index + 1
        }
    }

    /// Index before `index`, wrapping from the first track to the last.
    pub fn prev_index(&self, index: usize) -> usize {
        if index == 0 || index >= self.tracks.len() {
            self.tracks.len() - 1
        } else {
            index - 1
        }
    }
}
