use std::cell::Cell;
use std::rc::Rc;

use gloo_storage::{LocalStorage, Storage};
use gloo_timers::future::TimeoutFuture;
use web_sys::HtmlAudioElement;

use crate::config::{AUDIO_STORAGE_KEY, AUDIO_URL, AUDIO_VOLUME};

/// Looping ambient track with fade in/out and a persisted on/off switch.
///
/// Browsers block autoplay until a user gesture, so playback is also
/// retried from the first pointer interaction via [`AudioPlayer::unlock`].
#[derive(Clone)]
pub struct AudioPlayer {
    el: HtmlAudioElement,
    fading: Rc<Cell<bool>>,
}

impl AudioPlayer {
    pub fn new() -> Result<Self, String> {
        let el = HtmlAudioElement::new_with_src(AUDIO_URL)
            .map_err(|_| "audio element unavailable".to_string())?;
        el.set_loop(true);
        Ok(Self {
            el,
            fading: Rc::new(Cell::new(false)),
        })
    }

    /// Stored preference; missing means enabled.
    pub fn stored_enabled() -> bool {
        LocalStorage::raw()
            .get_item(AUDIO_STORAGE_KEY)
            .ok()
            .flatten()
            .map(|v| v != "0")
            .unwrap_or(true)
    }

    fn persist_enabled(on: bool) {
        let _ = LocalStorage::raw().set_item(AUDIO_STORAGE_KEY, if on { "1" } else { "0" });
    }

    /// First-load autoplay attempt; the browser may reject it silently.
    pub async fn try_autoplay(&self) {
        if !Self::stored_enabled() {
            return;
        }
        self.start().await;
    }

    /// Begin playback from a user gesture if the track is enabled but was
    /// still blocked.
    pub async fn unlock(&self, enabled: bool) {
        if enabled && self.el.paused() {
            self.start().await;
            self.fade_to(AUDIO_VOLUME, 250.0).await;
        }
    }

    pub async fn set_enabled(&self, on: bool) {
        Self::persist_enabled(on);
        if on {
            if self.el.paused() {
                self.start().await;
            }
            self.fade_to(AUDIO_VOLUME, 300.0).await;
        } else {
            self.fade_to(0.0, 250.0).await;
            let _ = self.el.pause();
        }
    }

    async fn start(&self) {
        self.el.set_muted(false);
        if !self.fading.get() {
            self.el.set_volume(AUDIO_VOLUME);
        }
        if let Ok(promise) = self.el.play() {
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        }
    }

    async fn fade_to(&self, target: f64, duration_ms: f64) {
        self.fading.set(true);
        let from = self.el.volume();
        let start = js_sys::Date::now();
        loop {
            TimeoutFuture::new(16).await;
            let k = ((js_sys::Date::now() - start) / duration_ms).min(1.0);
            self.el.set_volume(from + (target - from) * k);
            if k >= 1.0 {
                break;
            }
        }
        self.fading.set(false);
    }
}
