use std::collections::{HashMap, HashSet};

use baseland_shared::is_placeholder_url;

/// Authoritative in-memory ownership state.
///
/// Only the sync engine mutates this (through the surrounding signal); the
/// renderer and UI read it. Ownership is monotone: there is no way to
/// un-own a tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileBoard {
    owned: HashSet<u32>,
    /// Tile id → URL whose image has finished loading for it.
    display: HashMap<u32, String>,
    /// Owned tiles with no usable art yet. Drawn with the shared sold
    /// marker and revisited by the refresh pass. A tile can sit here while
    /// `display` still shows older art; display wins when drawing.
    pending: HashSet<u32>,
}

impl TileBoard {
    pub fn mark_owned(&mut self, id: u32) {
        self.owned.insert(id);
    }

    /// Record that `url`'s image is loaded and shown for this tile. Clears
    /// the placeholder classification.
    pub fn set_display(&mut self, id: u32, url: String) {
        self.display.insert(id, url);
        self.pending.remove(&id);
    }

    /// Classify an owned tile as awaiting usable art.
    pub fn mark_pending(&mut self, id: u32) {
        self.pending.insert(id);
    }

    pub fn is_owned(&self, id: u32) -> bool {
        self.owned.contains(&id)
    }

    pub fn display_url(&self, id: u32) -> Option<&str> {
        self.display.get(&id).map(String::as_str)
    }

    pub fn is_pending(&self, id: u32) -> bool {
        self.pending.contains(&id)
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    pub fn owned_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.owned.iter().copied()
    }

    /// Whether the refresh pass should re-resolve this tile: nothing is
    /// displayed yet, or the cached URL is missing or still a placeholder.
    pub fn needs_refresh(&self, id: u32, cached_url: Option<&str>) -> bool {
        !self.display.contains_key(&id) || is_placeholder_url(cached_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_only_grows() {
        let mut board = TileBoard::default();
        board.mark_owned(307);
        board.mark_pending(307);
        board.set_display(307, "https://cdn.x/a.png".into());
        board.mark_owned(307);
        assert!(board.is_owned(307));
        assert_eq!(board.owned_count(), 1);
    }

    #[test]
    fn display_clears_pending() {
        let mut board = TileBoard::default();
        board.mark_owned(1);
        board.mark_pending(1);
        assert!(board.is_pending(1));
        board.set_display(1, "https://cdn.x/a.png".into());
        assert!(!board.is_pending(1));
        assert_eq!(board.display_url(1), Some("https://cdn.x/a.png"));
    }

    #[test]
    fn pending_may_coexist_with_older_display() {
        // Re-resolution in flight: old art stays displayed until the new
        // image finishes loading.
        let mut board = TileBoard::default();
        board.mark_owned(2);
        board.set_display(2, "https://cdn.x/old.png".into());
        board.mark_pending(2);
        assert!(board.is_pending(2));
        assert_eq!(board.display_url(2), Some("https://cdn.x/old.png"));
    }

    #[test]
    fn refresh_predicate() {
        let mut board = TileBoard::default();
        board.mark_owned(3);
        // no display, no cache entry
        assert!(board.needs_refresh(3, None));
        // displayed with a real cached URL
        board.set_display(3, "https://cdn.x/a.png".into());
        assert!(!board.needs_refresh(3, Some("https://cdn.x/a.png")));
        // displayed but cache still holds a placeholder
        assert!(board.needs_refresh(3, Some("https://cdn.x/unrevealed.png")));
        // displayed but cache was never written
        assert!(board.needs_refresh(3, None));
    }
}
