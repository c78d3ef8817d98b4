/// Side length of the square trail bitmap in texels.
pub(crate) const TRAIL_SIZE: u32 = 64;

/// Number of frames a trail point survives before eviction.
pub(crate) const TRAIL_MAX_AGE: u32 = 64;

/// Scale turning squared normalized pointer deltas into a saturating force.
const FORCE_SCALE: f32 = 10_000.0;

/// Peak alpha of the trail brush.
const BRUSH_ALPHA: f32 = 0.22;

/// One recorded pointer-move sample.
#[derive(Debug, Clone, Copy)]
struct TouchPoint {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    force: f32,
    age: u32,
}

/// Pointer-trail scratch bitmap sampled by the liquid displacement pass.
///
/// Pointer moves append decaying points; every frame each point drifts along
/// its velocity, ages, and is evicted once older than [`TRAIL_MAX_AGE`]. The
/// bitmap is redrawn from scratch out of the live points, so it is a derived
/// view rather than an accumulating store. Texel channels encode the stored
/// velocity direction (red/green) and intensity (blue).
#[derive(Debug)]
pub(crate) struct TouchTrail {
    points: Vec<TouchPoint>,
    last: Option<(f32, f32)>,
    radius: f32,
    pixels: Vec<u8>,
    dirty: bool,
    bitmap_blank: bool,
}

impl TouchTrail {
    pub fn new(radius_scale: f32) -> Self {
        let size = (TRAIL_SIZE * TRAIL_SIZE * 4) as usize;
        Self {
            points: Vec::new(),
            last: None,
            radius: 0.1 * TRAIL_SIZE as f32 * radius_scale.max(0.0),
            pixels: vec![0; size],
            dirty: false,
            bitmap_blank: true,
        }
    }

    /// Records a pointer position normalized to `[0, 1]²` (origin bottom-left).
    ///
    /// Velocity needs two samples, so the first touch after construction is
    /// stored with zero velocity and zero force. A repeat of the previous
    /// position is dropped.
    pub fn add_touch(&mut self, x: f32, y: f32) {
        let (vx, vy, force) = match self.last {
            Some((lx, ly)) => {
                let dx = x - lx;
                let dy = y - ly;
                if dx == 0.0 && dy == 0.0 {
                    return;
                }
                let d = (dx * dx + dy * dy).sqrt();
                let d = if d > 0.0 { d } else { 1.0 };
                let force = ((dx * dx + dy * dy) * FORCE_SCALE).min(1.0);
                (dx / d, dy / d, force)
            }
            None => (0.0, 0.0, 0.0),
        };
        self.last = Some((x, y));
        self.points.push(TouchPoint {
            x,
            y,
            vx,
            vy,
            force,
            age: 0,
        });
    }

    /// Advances, ages, and evicts points, then redraws the bitmap.
    pub fn update(&mut self) {
        let speed = 1.0 / TRAIL_MAX_AGE as f32;
        for point in &mut self.points {
            let f = point.force * speed * (1.0 - point.age as f32 / TRAIL_MAX_AGE as f32);
            point.x += point.vx * f;
            point.y += point.vy * f;
            point.age += 1;
        }
        self.points.retain(|point| point.age <= TRAIL_MAX_AGE);

        if self.points.is_empty() {
            if !self.bitmap_blank {
                self.pixels.fill(0);
                self.bitmap_blank = true;
                self.dirty = true;
            }
            return;
        }

        self.pixels.fill(0);
        for point in &self.points {
            draw_point(&mut self.pixels, self.radius, point);
        }
        self.bitmap_blank = false;
        self.dirty = true;
    }

    /// Raw RGBA8 texels in row-major order, top row first.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns true once per redraw; the caller re-uploads the bitmap then.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    #[cfg(test)]
    fn live_points(&self) -> usize {
        self.points.len()
    }
}

/// Stamps one soft brush disk into the bitmap.
fn draw_point(pixels: &mut [u8], radius: f32, point: &TouchPoint) {
    let intensity = envelope(point.age) * point.force;
    if intensity <= 0.0 || radius <= 0.0 {
        return;
    }

    let size = TRAIL_SIZE as f32;
    let cx = point.x * size;
    // Bitmap rows run top-down while trail coordinates are bottom-left.
    let cy = (1.0 - point.y) * size;
    let reach = radius * 2.0;

    let r = ((point.vx + 1.0) * 0.5 * 255.0) as u8;
    let g = ((point.vy + 1.0) * 0.5 * 255.0) as u8;
    let b = (intensity * 255.0) as u8;

    let x_min = (cx - reach).floor().max(0.0) as u32;
    let x_max = ((cx + reach).ceil() as u32).min(TRAIL_SIZE - 1);
    let y_min = (cy - reach).floor().max(0.0) as u32;
    let y_max = ((cy + reach).ceil() as u32).min(TRAIL_SIZE - 1);

    for ty in y_min..=y_max {
        for tx in x_min..=x_max {
            let dx = tx as f32 + 0.5 - cx;
            let dy = ty as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let falloff = (1.0 - dist / reach).clamp(0.0, 1.0);
            let alpha = BRUSH_ALPHA * intensity * falloff * falloff;
            if alpha <= 0.0 {
                continue;
            }
            let index = ((ty * TRAIL_SIZE + tx) * 4) as usize;
            blend(&mut pixels[index], r, alpha);
            blend(&mut pixels[index + 1], g, alpha);
            blend(&mut pixels[index + 2], b, alpha);
            pixels[index + 3] = 255;
        }
    }
}

/// Intensity over a point's lifetime: a sine ease in over the first 30%
/// followed by a quadratic ease out, reaching zero exactly at max age.
fn envelope(age: u32) -> f32 {
    let max_age = TRAIL_MAX_AGE as f32;
    let ramp = max_age * 0.3;
    let age = age as f32;
    if age < ramp {
        (age / ramp * std::f32::consts::FRAC_PI_2).sin()
    } else {
        let t = (1.0 - (age - ramp) / (max_age - ramp)).clamp(0.0, 1.0);
        -t * (t - 2.0)
    }
}

/// Source-over blend of one channel toward `value` with weight `alpha`.
fn blend(channel: &mut u8, value: u8, alpha: f32) {
    let current = f32::from(*channel);
    let target = f32::from(value);
    *channel = (current + (target - current) * alpha).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_is_blank(trail: &TouchTrail) -> bool {
        trail.pixels().chunks_exact(4).all(|px| px[2] == 0)
    }

    #[test]
    fn first_touch_has_no_velocity_or_force() {
        let mut trail = TouchTrail::new(1.0);
        trail.add_touch(0.8, 0.3);
        let point = trail.points[0];
        assert_eq!(point.vx, 0.0);
        assert_eq!(point.vy, 0.0);
        assert_eq!(point.force, 0.0);
    }

    #[test]
    fn second_touch_records_direction_and_saturating_force() {
        let mut trail = TouchTrail::new(1.0);
        trail.add_touch(0.5, 0.5);
        trail.add_touch(0.6, 0.5);
        let point = trail.points[1];
        assert!((point.vx - 1.0).abs() < 1e-6);
        assert!(point.vy.abs() < 1e-6);
        // A 0.1 normalized move saturates: 0.1² × 10000 = 100 → clamped to 1.
        assert_eq!(point.force, 1.0);
    }

    #[test]
    fn repeated_position_is_dropped() {
        let mut trail = TouchTrail::new(1.0);
        trail.add_touch(0.5, 0.5);
        trail.add_touch(0.5, 0.5);
        assert_eq!(trail.live_points(), 1);
    }

    #[test]
    fn moving_point_draws_into_the_bitmap() {
        let mut trail = TouchTrail::new(1.0);
        trail.add_touch(0.5, 0.5);
        trail.add_touch(0.55, 0.5);
        // Let the envelope ramp up before sampling.
        for _ in 0..8 {
            trail.update();
        }
        assert!(trail.take_dirty());
        assert!(!bitmap_is_blank(&trail));
    }

    #[test]
    fn points_age_out_and_bitmap_decays_to_blank() {
        let mut trail = TouchTrail::new(1.0);
        trail.add_touch(0.5, 0.5);
        trail.add_touch(0.55, 0.5);

        for _ in 0..TRAIL_MAX_AGE {
            trail.update();
        }
        assert_eq!(trail.live_points(), 2);

        // One more frame pushes both points past the maximum age.
        trail.update();
        assert_eq!(trail.live_points(), 0);
        assert!(bitmap_is_blank(&trail));

        // With no live points the bitmap stops being re-marked dirty.
        trail.take_dirty();
        trail.update();
        assert!(!trail.take_dirty());
    }

    #[test]
    fn envelope_starts_and_ends_at_zero() {
        assert_eq!(envelope(0), 0.0);
        assert!(envelope(10) > 0.0);
        assert!(envelope(TRAIL_MAX_AGE) <= 1e-6);
    }
}
