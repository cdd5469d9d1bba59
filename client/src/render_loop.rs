use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces grid repaints onto `requestAnimationFrame`.
///
/// Board, viewport, hover and selection changes all call [`mark_dirty`];
/// the paint closure runs at most once per frame no matter how many marks
/// arrive in between.
///
/// [`mark_dirty`]: RenderScheduler::mark_dirty
pub struct RenderScheduler {
    shared: Rc<Shared>,
}

struct Shared {
    window: Option<web_sys::Window>,
    dirty: Cell<bool>,
    /// Pending rAF handle; `Some` means a frame is already scheduled.
    frame_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl RenderScheduler {
    pub fn new(paint: impl Fn() + 'static) -> Self {
        let shared = Rc::new(Shared {
            window: web_sys::window(),
            dirty: Cell::new(false),
            frame_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let on_frame = shared.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            on_frame.frame_id.set(None);
            if on_frame.dirty.replace(false) {
                paint();
            }
        });
        *shared.callback.borrow_mut() = Some(cb);

        Self { shared }
    }

    /// Flag the scene and schedule a frame unless one is already pending.
    pub fn mark_dirty(&self) {
        self.shared.dirty.set(true);
        if self.shared.frame_id.get().is_some() {
            return;
        }
        let Some(window) = self.shared.window.as_ref() else {
            return;
        };
        let cb_ref = self.shared.callback.borrow();
        let Some(cb) = cb_ref.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.shared.frame_id.set(Some(id));
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(id) = self.shared.frame_id.take()
            && let Some(window) = self.shared.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
        // The closure holds an Rc back to `shared`; drop it to break the cycle.
        self.shared.callback.borrow_mut().take();
    }
}
