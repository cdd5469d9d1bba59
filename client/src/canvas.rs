use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, TouchEvent, WheelEvent,
};

use baseland_shared::tile_id;

use crate::app::{AudioHandle, AudioOn, BuyOpen, Hovered, Selected};
use crate::board::TileBoard;
use crate::config::{EMPTY_COLOR, LINE_COLOR, OWNED_COLOR};
use crate::galaxy::Galaxy;
use crate::images::ImageStore;
use crate::render_loop::RenderScheduler;
use crate::viewport::Viewport;

/// Starfield frame period; touch devices get a lighter cadence.
const STARFIELD_FRAME_MS: i32 = 33;
const STARFIELD_FRAME_TOUCH_MS: i32 = 50;
/// Pointer travel below this counts as a tap, not a drag.
const TAP_SLOP_PX: f64 = 5.0;

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

struct StarfieldBinding {
    window: web_sys::Window,
    interval_id: i32,
    _callback: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
    static STARFIELD_BINDING: RefCell<Option<StarfieldBinding>> = const { RefCell::new(None) };
}

#[component]
pub fn BoardCanvas() -> impl IntoView {
    let board: RwSignal<TileBoard> = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let hovered = expect_context::<Hovered>().0;
    let selected = expect_context::<Selected>().0;
    let buy_open = expect_context::<BuyOpen>().0;
    let images: ImageStore =
        expect_context::<StoredValue<ImageStore, LocalStorage>>().get_value();
    let audio = expect_context::<StoredValue<AudioHandle, LocalStorage>>().get_value();
    let audio_on = expect_context::<AudioOn>().0;

    let bg_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let grid_canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Drag state shared across handlers.
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    let pinch_dist = Rc::new(Cell::new(0.0f64));
    let audio_unlocked = Rc::new(Cell::new(false));

    let galaxy: Rc<RefCell<Galaxy>> = Rc::new(RefCell::new(Galaxy::default()));
    // First resize applies the initial zoom and seeds the starfield.
    let sized = Rc::new(Cell::new(false));

    let images_paint = images.clone();
    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = grid_canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(ctx) = context_2d(canvas) else {
            return;
        };
        let vp = viewport.get_untracked();
        board.with_untracked(|board| {
            draw_board(
                &ctx,
                &vp,
                board,
                &images_paint,
                hovered.get_untracked(),
                selected.get_untracked(),
            );
        });
    });
    let scheduler = Rc::new(scheduler);

    // Match canvas backing stores to their CSS size, capped at 2x DPR.
    // Collapsed layout rects fall back to the window size.
    let do_resize: Rc<dyn Fn()> = Rc::new({
        let galaxy = galaxy.clone();
        let sized = sized.clone();
        let sched = scheduler.clone();
        move || {
            let Some(grid_canvas) = grid_canvas_ref.get_untracked() else {
                return;
            };
            let Some(bg_canvas) = bg_canvas_ref.get_untracked() else {
                return;
            };
            let (w, h) = css_size(&grid_canvas);
            let dpr = device_pixel_ratio();
            for canvas in [&grid_canvas as &HtmlCanvasElement, &bg_canvas] {
                canvas.set_width((w * dpr).floor() as u32);
                canvas.set_height((h * dpr).floor() as u32);
                // Resizing resets the context; reapply the DPR transform.
                if let Some(ctx) = context_2d(canvas) {
                    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
                }
            }
            let first = !sized.get();
            viewport.update(|vp| {
                vp.resize(w, h);
                if first {
                    vp.fit_initial();
                }
            });
            if first {
                sized.set(true);
                galaxy.borrow_mut().seed(w, h);
            }
            sched.mark_dirty();
        }
    });

    // Size on mount, then follow window resizes.
    let resize_mount = do_resize.clone();
    Effect::new(move || {
        if grid_canvas_ref.get().is_none() || bg_canvas_ref.get().is_none() {
            return;
        }
        resize_mount();
        let Some(window) = web_sys::window() else {
            return;
        };
        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });
        let on_resize = resize_mount.clone();
        let cb = Closure::<dyn Fn()>::new(move || on_resize());
        if window
            .add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: cb,
                });
            });
        }
    });

    // Repaint whenever anything drawn changes.
    let sched_state = scheduler.clone();
    Effect::new(move || {
        board.track();
        viewport.track();
        hovered.track();
        selected.track();
        sched_state.mark_dirty();
    });

    // Starfield animation on its own interval, under the grid canvas.
    let galaxy_tick = galaxy.clone();
    Effect::new(move || {
        if bg_canvas_ref.get().is_none() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        STARFIELD_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                old.window.clear_interval_with_handle(old.interval_id);
            }
        });
        let galaxy = galaxy_tick.clone();
        let cb = Closure::<dyn Fn()>::new(move || {
            let Some(canvas) = bg_canvas_ref.get_untracked() else {
                return;
            };
            let Some(ctx) = context_2d(&canvas) else {
                return;
            };
            let vp = viewport.get_untracked();
            let mut galaxy = galaxy.borrow_mut();
            galaxy.advance(js_sys::Date::now());
            galaxy.draw(&ctx, vp.origin_x, vp.origin_y, vp.width, vp.height);
        });
        let period = if is_touch_device() {
            STARFIELD_FRAME_TOUCH_MS
        } else {
            STARFIELD_FRAME_MS
        };
        let Ok(interval_id) = window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                period,
            )
        else {
            return;
        };
        STARFIELD_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(StarfieldBinding {
                window: window.clone(),
                interval_id,
                _callback: cb,
            });
        });
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let audio_unlocked = audio_unlocked.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            hovered.set(None);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }

            // Browsers gate playback on a gesture; the first press lifts it.
            if !audio_unlocked.get() {
                audio_unlocked.set(true);
                if let Some(player) = audio.0.clone() {
                    let enabled = audio_on.get_untracked();
                    wasm_bindgen_futures::spawn_local(async move {
                        player.unlock(enabled).await;
                    });
                }
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan_by(dx, dy));
            } else if e.pointer_type() == "mouse" {
                let (cx, cy) = local_coords(&e, grid_canvas_ref);
                viewport.update(|vp| vp.autopan(cx, cy));
                let hit = viewport.get_untracked().screen_to_tile(cx, cy);
                if hit != hovered.get_untracked() {
                    hovered.set(hit);
                }
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    // A press that barely moved selects the tile under it and opens the
    // buy dialog.
    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= TAP_SLOP_PX || dy >= TAP_SLOP_PX {
                return;
            }
            let Some(canvas) = grid_canvas_ref.get_untracked() else {
                return;
            };
            let rect = canvas.get_bounding_client_rect();
            let cx = e.client_x() as f64 - rect.left();
            let cy = e.client_y() as f64 - rect.top();
            if let Some(hit) = viewport.get_untracked().screen_to_tile(cx, cy) {
                selected.set(Some(hit));
                buy_open.set(true);
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let mid_x = (t0.client_x() + t1.client_x()) as f64 / 2.0;
                    let mid_y = (t0.client_y() + t1.client_y()) as f64 / 2.0;
                    let delta = -(new_dist - old_dist) * 2.0;
                    viewport.update(|vp| vp.zoom_at(delta, mid_x, mid_y));
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    // Starfield below, tile grid above.
    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=bg_canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%;"
            />
            <canvas
                node_ref=grid_canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

/// One full repaint of the tile grid in CSS pixel coordinates.
fn draw_board(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    board: &TileBoard,
    images: &ImageStore,
    hovered: Option<(u32, u32)>,
    selected: Option<(u32, u32)>,
) {
    ctx.clear_rect(0.0, 0.0, vp.width, vp.height);
    ctx.set_fill_style_str(EMPTY_COLOR);
    ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

    let px = vp.tile_px();
    let (start_x, start_y, end_x, end_y) = vp.visible_tiles();
    let marker = images.marker();

    for x in start_x..=end_x {
        for y in start_y..=end_y {
            let id = tile_id(x, y);
            if !board.is_owned(id) {
                continue;
            }
            let (tx, ty) = vp.tile_origin(x, y);
            let art = board
                .display_url(id)
                .and_then(|url| images.get(url))
                .or_else(|| {
                    if board.is_pending(id) {
                        marker.clone()
                    } else {
                        None
                    }
                });
            match art {
                Some(img) => {
                    ctx.set_fill_style_str("#000000");
                    ctx.fill_rect(tx, ty, px, px);
                    let (dw, dh) = fit_rect(img.width() as f64, img.height() as f64, px);
                    let dx = tx + ((px - dw) / 2.0).floor();
                    let dy = ty + ((px - dh) / 2.0).floor();
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(&img, dx, dy, dw, dh)
                        .ok();
                }
                None => {
                    ctx.set_fill_style_str(OWNED_COLOR);
                    ctx.fill_rect(tx, ty, px, px);
                }
            }
        }
    }

    // Soft glow over every owned tile, grown one pixel past its edges.
    ctx.save();
    ctx.set_global_alpha(0.25);
    ctx.set_fill_style_str(OWNED_COLOR);
    for x in start_x..=end_x {
        for y in start_y..=end_y {
            if board.is_owned(tile_id(x, y)) {
                let (tx, ty) = vp.tile_origin(x, y);
                ctx.fill_rect(tx - 1.0, ty - 1.0, px + 2.0, px + 2.0);
            }
        }
    }
    ctx.restore();

    // Grid lines snapped to half-pixel centers so they stay hairline.
    ctx.set_stroke_style_str(LINE_COLOR);
    ctx.set_line_width(0.5);
    ctx.begin_path();
    for x in start_x..=end_x {
        let sx = (vp.origin_x + x as f64 * px).floor() + 0.5;
        ctx.move_to(sx, vp.origin_y + start_y as f64 * px);
        ctx.line_to(sx, vp.origin_y + (end_y + 1) as f64 * px);
    }
    for y in start_y..=end_y {
        let sy = (vp.origin_y + y as f64 * px).floor() + 0.5;
        ctx.move_to(vp.origin_x + start_x as f64 * px, sy);
        ctx.line_to(vp.origin_x + (end_x + 1) as f64 * px, sy);
    }
    ctx.stroke();

    if let Some((hx, hy)) = hovered {
        let (tx, ty) = vp.tile_origin(hx, hy);
        ctx.set_stroke_style_str("rgba(255,255,255,.75)");
        ctx.set_line_width(1.5);
        ctx.stroke_rect(tx + 0.5, ty + 0.5, px - 1.0, px - 1.0);
    }
    if let Some((sx, sy)) = selected {
        let (tx, ty) = vp.tile_origin(sx, sy);
        ctx.set_stroke_style_str("#FFFFFF");
        ctx.set_line_width(2.0);
        ctx.stroke_rect(tx + 1.0, ty + 1.0, px - 2.0, px - 2.0);
    }
}

/// Scale an image to fit a square tile, preserving aspect. Sizes are
/// floored with a 1px minimum, matching the centering math in the draw
/// pass.
fn fit_rect(img_w: f64, img_h: f64, tile: f64) -> (f64, f64) {
    let ratio = (tile / img_w).min(tile / img_h);
    let dw = (img_w * ratio).floor().max(1.0);
    let dh = (img_h * ratio).floor().max(1.0);
    (dw, dh)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn device_pixel_ratio() -> f64 {
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0);
    let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    dpr.min(2.0)
}

/// CSS size of the canvas, per axis. Layout rects under 10px (hidden or
/// not laid out yet) fall back to the window size.
fn css_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
    let rect = canvas.get_bounding_client_rect();
    let window = web_sys::window();
    let axis = |v: f64, fallback: Option<f64>| {
        if v > 10.0 {
            v
        } else {
            fallback.unwrap_or(800.0)
        }
    };
    let win_w = window
        .as_ref()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64());
    let win_h = window
        .as_ref()
        .and_then(|w| w.inner_height().ok())
        .and_then(|v| v.as_f64());
    (axis(rect.width(), win_w), axis(rect.height(), win_h))
}

fn local_coords(e: &PointerEvent, canvas_ref: NodeRef<leptos::html::Canvas>) -> (f64, f64) {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

fn is_touch_device() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    if js_sys::Reflect::has(window.as_ref(), &JsValue::from_str("ontouchstart")).unwrap_or(false) {
        return true;
    }
    window
        .match_media("(pointer: coarse)")
        .ok()
        .flatten()
        .is_some_and(|m| m.matches())
}

#[cfg(test)]
mod tests {
    use super::fit_rect;

    #[test]
    fn square_art_fills_the_tile() {
        assert_eq!(fit_rect(512.0, 512.0, 32.0), (32.0, 32.0));
    }

    #[test]
    fn wide_art_letterboxes() {
        assert_eq!(fit_rect(256.0, 128.0, 32.0), (32.0, 16.0));
    }

    #[test]
    fn tall_art_pillarboxes() {
        assert_eq!(fit_rect(128.0, 512.0, 32.0), (8.0, 32.0));
    }

    #[test]
    fn degenerate_art_still_draws_a_pixel() {
        let (dw, dh) = fit_rect(0.0, 0.0, 32.0);
        assert!(dw >= 1.0 && dh >= 1.0);
    }
}
