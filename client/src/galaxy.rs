use web_sys::CanvasRenderingContext2d;

use crate::config::{EMPTY_COLOR, OWNED_COLOR};

/// One parallax depth of the starfield.
pub struct StarLayer {
    pub speed: f64,
    pub density: f64,
    pub size: f64,
}

/// Slow sparse layers in front, a faster brighter one behind.
pub const STAR_LAYERS: [StarLayer; 3] = [
    StarLayer {
        speed: 0.08,
        density: 0.000_12,
        size: 2.0,
    },
    StarLayer {
        speed: 0.14,
        density: 0.000_09,
        size: 2.0,
    },
    StarLayer {
        speed: 0.20,
        density: 0.000_06,
        size: 3.0,
    },
];

struct Star {
    x: f64,
    y: f64,
    color: &'static str,
    size: f64,
}

/// Drifting starfield drawn behind the grid. Stars live in a band three
/// canvas sizes wide and wrap around it as they drift, shifted per layer by
/// the pan origin for a parallax feel.
#[derive(Default)]
pub struct Galaxy {
    stars: Vec<Vec<Star>>,
    drift_x: f64,
    drift_y: f64,
    last_time: f64,
}

impl Galaxy {
    /// (Re)seed the star positions for a canvas size.
    pub fn seed(&mut self, width: f64, height: f64) {
        self.seed_with(width, height, js_sys::Math::random);
    }

    fn seed_with(&mut self, width: f64, height: f64, mut rng: impl FnMut() -> f64) {
        self.stars = STAR_LAYERS
            .iter()
            .map(|layer| {
                let count = ((width * height * 3.0 * layer.density).floor() as usize).max(50);
                (0..count)
                    .map(|_| Star {
                        x: rng() * width * 3.0 - width,
                        y: rng() * height * 3.0 - height,
                        color: star_color(rng()),
                        size: layer.size,
                    })
                    .collect()
            })
            .collect();
    }

    /// Advance the drift clock to `t_ms`. The first call only anchors the
    /// clock.
    pub fn advance(&mut self, t_ms: f64) {
        let dt = if self.last_time > 0.0 {
            (t_ms - self.last_time) / 1000.0
        } else {
            0.0
        };
        self.last_time = t_ms;
        self.drift_x += dt * 5.0;
        self.drift_y += dt * 2.0;
    }

    pub fn draw(
        &self,
        ctx: &CanvasRenderingContext2d,
        origin_x: f64,
        origin_y: f64,
        width: f64,
        height: f64,
    ) {
        ctx.set_fill_style_str(EMPTY_COLOR);
        ctx.fill_rect(0.0, 0.0, width, height);
        for (layer, stars) in STAR_LAYERS.iter().zip(&self.stars) {
            let par_x = (origin_x + self.drift_x) * layer.speed;
            let par_y = (origin_y + self.drift_y) * layer.speed;
            for star in stars {
                let sx = wrap_coord(star.x + par_x, width);
                let sy = wrap_coord(star.y + par_y, height);
                ctx.set_fill_style_str(star.color);
                ctx.fill_rect(sx.floor(), sy.floor(), star.size, star.size);
            }
        }
    }
}

fn star_color(pick: f64) -> &'static str {
    if pick < 0.75 {
        "#FFFFFF"
    } else if pick < 0.9 {
        "#CCCCCC"
    } else {
        OWNED_COLOR
    }
}

/// Wrap a drifting coordinate into the band `[-span, 2*span)`.
pub fn wrap_coord(v: f64, span: f64) -> f64 {
    let band = span * 3.0;
    ((v % band) + band) % band - span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_stays_in_band() {
        for v in [-5000.0, -801.0, -800.0, 0.0, 799.0, 1600.0, 9999.0] {
            let w = wrap_coord(v, 800.0);
            assert!((-800.0..1600.0).contains(&w), "wrap({v}) = {w}");
        }
    }

    #[test]
    fn wrap_moves_offscreen_stars_to_far_side() {
        assert_eq!(wrap_coord(-801.0, 800.0), 1599.0);
        assert_eq!(wrap_coord(1600.0, 800.0), -800.0);
        assert_eq!(wrap_coord(100.0, 800.0), 100.0);
    }

    #[test]
    fn first_advance_only_anchors_the_clock() {
        let mut g = Galaxy::default();
        g.advance(1000.0);
        assert_eq!((g.drift_x, g.drift_y), (0.0, 0.0));
        g.advance(2000.0);
        assert_eq!((g.drift_x, g.drift_y), (5.0, 2.0));
    }

    #[test]
    fn seeding_honors_density_with_a_floor() {
        let mut g = Galaxy::default();
        g.seed_with(800.0, 600.0, || 0.5);
        // 800 * 600 * 3 * density, floored
        assert_eq!(g.stars[0].len(), 172);
        assert_eq!(g.stars[1].len(), 129);
        assert_eq!(g.stars[2].len(), 86);

        g.seed_with(10.0, 10.0, || 0.5);
        assert!(g.stars.iter().all(|layer| layer.len() == 50));
    }

    #[test]
    fn star_palette_split() {
        assert_eq!(star_color(0.0), "#FFFFFF");
        assert_eq!(star_color(0.74), "#FFFFFF");
        assert_eq!(star_color(0.8), "#CCCCCC");
        assert_eq!(star_color(0.95), OWNED_COLOR);
    }
}
