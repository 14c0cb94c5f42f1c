//! Ordered playlist with wrapping navigation

use crate::PlaylistItem;
use serde::{Deserialize, Serialize};

/// Immutable ordered sequence of items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist {
    items: Vec<PlaylistItem>,
}

impl Playlist {
    pub fn new(items: Vec<PlaylistItem>) -> Self {
        Self { items }
    }

    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    /// Index after `current`, wrapping to the first item
    pub fn next_index(&self, current: usize) -> Option<usize> {
        wrap_next(current, self.items.len())
    }

    /// Index before `current`, wrapping to the last item
    pub fn previous_index(&self, current: usize) -> Option<usize> {
        wrap_previous(current, self.items.len())
    }

    /// `index` reduced modulo the playlist length
    pub fn select_index(&self, index: usize) -> Option<usize> {
        wrap_select(index, self.items.len())
    }
}

impl From<Vec<PlaylistItem>> for Playlist {
    fn from(items: Vec<PlaylistItem>) -> Self {
        Self::new(items)
    }
}

pub(crate) fn wrap_next(current: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| (current % len + 1) % len)
}

pub(crate) fn wrap_previous(current: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| (current % len + len - 1) % len)
}

pub(crate) fn wrap_select(index: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| index % len)
}
