use std::cell::RefCell;
use std::rc::Rc;

use baseland_shared::{IMAGE_CACHE_KEY, ImageCache, decode_image_cache, encode_image_cache};
use gloo_storage::{LocalStorage, Storage};

/// Local-storage backed record of resolved artwork URLs per tile.
///
/// A `None` entry means "owned, artwork not resolved yet", so a reload can
/// restore the pending set without touching the network.
#[derive(Clone, Default)]
pub struct ArtCache {
    inner: Rc<RefCell<ImageCache>>,
}

impl ArtCache {
    /// Warm the cache from local storage. Missing or corrupt payloads start
    /// empty.
    pub fn load() -> Self {
        let stored = LocalStorage::raw()
            .get_item(IMAGE_CACHE_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            inner: Rc::new(RefCell::new(decode_image_cache(&stored))),
        }
    }

    pub fn get(&self, id: u32) -> Option<String> {
        self.inner
            .borrow()
            .get(&id)
            .cloned()
            .flatten()
            .filter(|url| !url.is_empty())
    }

    pub fn set(&self, id: u32, url: Option<String>) {
        let url = url.filter(|u| !u.is_empty());
        self.inner.borrow_mut().insert(id, url);
        self.persist();
    }

    /// Snapshot for startup hydration.
    pub fn entries(&self) -> Vec<(u32, Option<String>)> {
        self.inner
            .borrow()
            .iter()
            .map(|(id, url)| (*id, url.clone()))
            .collect()
    }

    fn persist(&self) {
        let payload = encode_image_cache(&self.inner.borrow());
        let _ = LocalStorage::raw().set_item(IMAGE_CACHE_KEY, &payload);
    }
}
