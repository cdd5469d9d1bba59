mod app;
mod art_cache;
mod audio;
mod board;
mod canvas;
mod config;
mod galaxy;
mod images;
mod indexer;
mod purchase;
mod render_loop;
mod resolver;
mod rpc;
mod status;
mod sync;
mod viewport;
mod wallet;

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(target) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(mount_target)
    else {
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // A re-entered main() (hot reload) replaces the previous mount so
        // its effects stop running against the new one.
        let _old = slot.borrow_mut().take();
        *slot.borrow_mut() = Some(Box::new(mount_to(target, app::App)));
    });
}

fn mount_target(document: web_sys::Document) -> Option<web_sys::HtmlElement> {
    document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body())
}
