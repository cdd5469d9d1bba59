use baseland_shared::GRID_SIZE;

use crate::config::{AUTOPAN_FACTOR, BASE_TILE_PX, INITIAL_FIT_TILES, MAX_SCALE, MIN_SCALE};

const ZOOM_SENSITIVITY: f64 = 0.001;

/// Pan/zoom state of the board view, in CSS pixel space.
///
/// `origin_x`/`origin_y` give the screen position of the grid's top-left
/// corner. The canvas size is carried here so every mutation can re-clamp
/// the pan in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
            width: 800.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    /// Edge length of one tile on screen.
    pub fn tile_px(&self) -> f64 {
        (BASE_TILE_PX * self.scale).floor().max(4.0)
    }

    fn world_px(&self) -> f64 {
        GRID_SIZE as f64 * self.tile_px()
    }

    /// Re-clamp the origin. An axis where the grid fits inside the canvas
    /// stays centered; an axis where it overflows keeps the canvas inside
    /// the grid.
    pub fn clamp_pan(&mut self) {
        let world = self.world_px();
        if world <= self.width {
            self.origin_x = ((self.width - world) / 2.0).floor();
        } else {
            self.origin_x = self.origin_x.clamp(self.width - world, 0.0);
        }
        if world <= self.height {
            self.origin_y = ((self.height - world) / 2.0).floor();
        } else {
            self.origin_y = self.origin_y.clamp(self.height - world, 0.0);
        }
    }

    /// Center the grid on both axes.
    pub fn center(&mut self) {
        let world = self.world_px();
        self.origin_x = ((self.width - world) / 2.0).floor();
        self.origin_y = ((self.height - world) / 2.0).floor();
    }

    /// Record a new canvas size and re-clamp.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.clamp_pan();
    }

    /// First-paint zoom: fit roughly [`INITIAL_FIT_TILES`] tiles across the
    /// short axis, then center the grid.
    pub fn fit_initial(&mut self) {
        let per_tile = (self.width / INITIAL_FIT_TILES).min(self.height / INITIAL_FIT_TILES);
        self.scale = (per_tile / BASE_TILE_PX).clamp(MIN_SCALE, MAX_SCALE);
        self.center();
    }

    /// Zoom toward a focus point in screen coordinates, keeping the world
    /// point under it fixed.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let old_px = self.tile_px();
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        // Anchor math uses the quantized tile size, not the raw scale, so
        // the point under the cursor holds exactly.
        let ratio = self.tile_px() / old_px;
        self.origin_x = screen_x - (screen_x - self.origin_x) * ratio;
        self.origin_y = screen_y - (screen_y - self.origin_y) * ratio;
        self.clamp_pan();
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.origin_x += dx;
        self.origin_y += dy;
        self.clamp_pan();
    }

    /// Nudge the origin so the view drifts toward the pointer. Only applied
    /// for mouse movement outside an active drag.
    pub fn autopan(&mut self, cursor_x: f64, cursor_y: f64) {
        self.origin_x -= (cursor_x - self.width / 2.0) * AUTOPAN_FACTOR;
        self.origin_y -= (cursor_y - self.height / 2.0) * AUTOPAN_FACTOR;
        self.clamp_pan();
    }

    /// Hit-test a screen point to a tile coordinate.
    pub fn screen_to_tile(&self, sx: f64, sy: f64) -> Option<(u32, u32)> {
        let px = self.tile_px();
        let x = ((sx - self.origin_x) / px).floor();
        let y = ((sy - self.origin_y) / px).floor();
        if x < 0.0 || y < 0.0 || x >= GRID_SIZE as f64 || y >= GRID_SIZE as f64 {
            return None;
        }
        Some((x as u32, y as u32))
    }

    /// Screen position of a tile's top-left corner.
    pub fn tile_origin(&self, x: u32, y: u32) -> (f64, f64) {
        let px = self.tile_px();
        (
            self.origin_x + x as f64 * px,
            self.origin_y + y as f64 * px,
        )
    }

    /// Inclusive tile-coordinate window currently on screen:
    /// `(start_x, start_y, end_x, end_y)`.
    pub fn visible_tiles(&self) -> (u32, u32, u32, u32) {
        let px = self.tile_px();
        let last = (GRID_SIZE - 1) as f64;
        let start_x = (-self.origin_x / px).floor().clamp(0.0, last) as u32;
        let start_y = (-self.origin_y / px).floor().clamp(0.0, last) as u32;
        let end_x = ((self.width - self.origin_x) / px).ceil().clamp(0.0, last) as u32;
        let end_y = ((self.height - self.origin_y) / px).ceil().clamp(0.0, last) as u32;
        (start_x, start_y, end_x, end_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(scale: f64, ox: f64, oy: f64, w: f64, h: f64) -> Viewport {
        Viewport {
            scale,
            origin_x: ox,
            origin_y: oy,
            width: w,
            height: h,
        }
    }

    #[test]
    fn tile_px_is_floored_with_a_minimum() {
        assert_eq!(vp(0.5, 0.0, 0.0, 800.0, 800.0).tile_px(), 4.0);
        assert_eq!(vp(1.0, 0.0, 0.0, 800.0, 800.0).tile_px(), 8.0);
        assert_eq!(vp(1.7, 0.0, 0.0, 800.0, 800.0).tile_px(), 13.0);
        assert_eq!(vp(6.0, 0.0, 0.0, 800.0, 800.0).tile_px(), 48.0);
    }

    #[test]
    fn clamp_centers_when_grid_fits() {
        // world = 100 * 8 = 800 on both axes
        let mut v = vp(1.0, 123.0, -77.0, 1600.0, 1200.0);
        v.clamp_pan();
        assert_eq!((v.origin_x, v.origin_y), (400.0, 200.0));
    }

    #[test]
    fn clamp_keeps_canvas_inside_overflowing_grid() {
        // world = 100 * 48 = 4800
        let mut v = vp(6.0, 99.0, -9999.0, 800.0, 800.0);
        v.clamp_pan();
        assert_eq!(v.origin_x, 0.0);
        assert_eq!(v.origin_y, 800.0 - 4800.0);
    }

    #[test]
    fn pan_is_clamped() {
        let mut v = vp(6.0, -2000.0, -2000.0, 800.0, 800.0);
        v.pan_by(5000.0, -5000.0);
        assert_eq!(v.origin_x, 0.0);
        assert_eq!(v.origin_y, -4000.0);
    }

    #[test]
    fn zoom_preserves_world_point_under_anchor() {
        let mut v = vp(2.0, -100.0, -50.0, 800.0, 800.0);
        let (ax, ay) = (400.0, 300.0);
        let before_x = (ax - v.origin_x) / v.tile_px();
        let before_y = (ay - v.origin_y) / v.tile_px();
        v.zoom_at(-500.0, ax, ay);
        let after_x = (ax - v.origin_x) / v.tile_px();
        let after_y = (ay - v.origin_y) / v.tile_px();
        assert!((before_x - after_x).abs() < 1e-9);
        assert!((before_y - after_y).abs() < 1e-9);
        assert!(v.scale > 2.0);
    }

    #[test]
    fn zoom_respects_scale_bounds() {
        let mut v = vp(1.0, 0.0, 0.0, 800.0, 800.0);
        v.zoom_at(1e9, 400.0, 400.0);
        assert_eq!(v.scale, MIN_SCALE);
        v.zoom_at(-1e9, 400.0, 400.0);
        assert_eq!(v.scale, MAX_SCALE);
    }

    #[test]
    fn initial_fit_shows_about_thirty_tiles() {
        let mut v = vp(1.0, 0.0, 0.0, 800.0, 600.0);
        v.fit_initial();
        // short axis: 600 / 30 = 20 px per tile -> scale 2.5, world 2000
        assert_eq!(v.scale, 2.5);
        assert_eq!(v.origin_x, -600.0);
        assert_eq!(v.origin_y, -700.0);
    }

    #[test]
    fn initial_fit_clamps_scale() {
        let mut v = vp(1.0, 0.0, 0.0, 3000.0, 3000.0);
        v.fit_initial();
        assert_eq!(v.scale, MAX_SCALE);
        let mut v = vp(1.0, 0.0, 0.0, 90.0, 90.0);
        v.fit_initial();
        assert_eq!(v.scale, MIN_SCALE);
    }

    #[test]
    fn hit_testing_maps_screen_to_tiles() {
        let v = vp(2.0, -100.0, -50.0, 800.0, 800.0);
        assert_eq!(v.screen_to_tile(0.0, 0.0), Some((6, 3)));
        let v = vp(1.0, 0.0, 0.0, 800.0, 800.0);
        assert_eq!(v.screen_to_tile(799.0, 799.0), Some((99, 99)));
        assert_eq!(v.screen_to_tile(800.0, 0.0), None);
        let v = vp(1.0, 100.0, 100.0, 800.0, 800.0);
        assert_eq!(v.screen_to_tile(0.0, 0.0), None);
    }

    #[test]
    fn visible_window_is_clipped_to_grid() {
        let v = vp(1.0, 0.0, 0.0, 800.0, 800.0);
        assert_eq!(v.visible_tiles(), (0, 0, 99, 99));
        let v = vp(1.0, -40.0, -16.0, 800.0, 800.0);
        let (sx, sy, ex, ey) = v.visible_tiles();
        assert_eq!((sx, sy), (5, 2));
        assert_eq!((ex, ey), (99, 99));
        let v = vp(6.0, -2400.0, -2400.0, 800.0, 800.0);
        let (sx, sy, ex, ey) = v.visible_tiles();
        assert_eq!((sx, sy), (50, 50));
        assert_eq!((ex, ey), (67, 67));
    }

    #[test]
    fn autopan_drifts_toward_cursor() {
        let mut v = vp(6.0, -2000.0, -2000.0, 800.0, 800.0);
        v.autopan(600.0, 400.0);
        assert_eq!(v.origin_x, -2003.0);
        assert_eq!(v.origin_y, -2000.0);
    }
}
