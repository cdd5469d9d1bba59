use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use futures::channel::oneshot;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::config::SOLD_MARKER_URL;

/// Shared store of decoded tile artwork, keyed by URL.
///
/// Concurrent loads of the same URL are coalesced onto one in-flight fetch.
/// Failures are not memoized, so a later refresh pass can retry the URL.
#[derive(Clone)]
pub struct ImageStore {
    inner: Rc<RefCell<HashMap<String, Slot>>>,
    /// Sold-marker URL with a per-session cache buster.
    marker_url: Rc<String>,
}

enum Slot {
    Loading(Vec<oneshot::Sender<Option<HtmlImageElement>>>),
    Ready(HtmlImageElement),
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    pub fn new() -> Self {
        let sep = if SOLD_MARKER_URL.contains('?') { '&' } else { '?' };
        let marker_url = format!("{SOLD_MARKER_URL}{sep}v={}", js_sys::Date::now());
        Self {
            inner: Rc::default(),
            marker_url: Rc::new(marker_url),
        }
    }

    /// Start loading the shared sold marker so it is on hand by the time
    /// the first placeholder tile draws.
    pub async fn preload_marker(&self) {
        self.load(&self.marker_url).await;
    }

    /// Decoded sold marker, once its preload has finished.
    pub fn marker(&self) -> Option<HtmlImageElement> {
        self.get(&self.marker_url)
    }

    /// Fetch and decode `url`, or reuse the cached or in-flight element.
    pub async fn load(&self, url: &str) -> Option<HtmlImageElement> {
        let waiting = {
            let mut slots = self.inner.borrow_mut();
            match slots.entry(url.to_owned()) {
                Entry::Occupied(mut slot) => match slot.get_mut() {
                    Slot::Ready(img) => return Some(img.clone()),
                    Slot::Loading(waiters) => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        Some(rx)
                    }
                },
                Entry::Vacant(slot) => {
                    slot.insert(Slot::Loading(Vec::new()));
                    None
                }
            }
        };

        if let Some(rx) = waiting {
            return rx.await.ok().flatten();
        }

        let loaded = fetch_image(url).await;
        let waiters = {
            let mut slots = self.inner.borrow_mut();
            let waiters = match slots.remove(url) {
                Some(Slot::Loading(waiters)) => waiters,
                _ => Vec::new(),
            };
            if let Some(img) = &loaded {
                slots.insert(url.to_owned(), Slot::Ready(img.clone()));
            }
            waiters
        };
        for tx in waiters {
            let _ = tx.send(loaded.clone());
        }
        loaded
    }

    /// Decoded element for `url`, if a load already completed.
    pub fn get(&self, url: &str) -> Option<HtmlImageElement> {
        match self.inner.borrow().get(url) {
            Some(Slot::Ready(img)) => Some(img.clone()),
            _ => None,
        }
    }
}

async fn fetch_image(url: &str) -> Option<HtmlImageElement> {
    let img = HtmlImageElement::new().ok()?;
    img.set_cross_origin(Some("anonymous"));
    img.set_referrer_policy("no-referrer");
    img.set_src(url);
    match JsFuture::from(img.decode()).await {
        Ok(_) => Some(img),
        Err(_) => None,
    }
}
