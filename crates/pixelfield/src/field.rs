//! CPU reference evaluation of the pixel-field shader.
//!
//! This is the same math the fragment shader in [`crate::shader`] runs on the
//! GPU, expressed in `f32` so still-frame exports work without a GPU context
//! and so the coverage pipeline can be asserted on in tests. The two copies
//! must stay in lockstep; any change to one is a change to both.
//!
//! GPU and CPU results are visually similar but not bit-identical across
//! hardware; nothing here promises reproducible floats, only the same
//! algorithm.

use crate::ripples::MAX_RIPPLES;
use crate::types::{FieldConfig, Shape};

/// GLSL `fract`: `x - floor(x)`, always in `[0, 1)` even for negative input.
fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn hash11(n: f32) -> f32 {
    fract(n.sin() * 43758.5453)
}

/// Value noise over a 3D lattice with quintic interpolation, in `[-1, 1]`.
fn vnoise(p: [f32; 3]) -> f32 {
    let ip = [p[0].floor(), p[1].floor(), p[2].floor()];
    let fp = [p[0] - ip[0], p[1] - ip[1], p[2] - ip[2]];
    let corner = |dx: f32, dy: f32, dz: f32| -> f32 {
        hash11((ip[0] + dx) + (ip[1] + dy) * 57.0 + (ip[2] + dz) * 113.0)
    };
    let quintic = |f: f32| f * f * f * (f * (f * 6.0 - 15.0) + 10.0);
    let w = [quintic(fp[0]), quintic(fp[1]), quintic(fp[2])];

    let x00 = mix(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), w[0]);
    let x10 = mix(corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), w[0]);
    let x01 = mix(corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), w[0]);
    let x11 = mix(corner(0.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), w[0]);
    let y0 = mix(x00, x10, w[1]);
    let y1 = mix(x01, x11, w[1]);
    mix(y0, y1, w[2]) * 2.0 - 1.0
}

/// Five-octave fractal noise with the deliberately slow 1.25× frequency
/// growth, rescaled to roughly `[0, 1]`.
fn fbm(uv: [f32; 2], scale: f32, t: f32) -> f32 {
    let p = [uv[0] * scale, uv[1] * scale, t];
    let amp = 1.0;
    let mut freq = 1.0;
    let mut sum = 1.0;
    for _ in 0..5 {
        sum += amp * vnoise([p[0] * freq, p[1] * freq, p[2] * freq]);
        freq *= 1.25;
    }
    sum * 0.5 + 0.5
}

fn bayer2(x: f32, y: f32) -> f32 {
    let (x, y) = (x.floor(), y.floor());
    fract(x / 2.0 + y * y * 0.75)
}

fn bayer4(x: f32, y: f32) -> f32 {
    bayer2(0.5 * x, 0.5 * y) * 0.25 + bayer2(x, y)
}

/// 8×8 ordered-dithering threshold in `[0, 1)`.
fn bayer8(x: f32, y: f32) -> f32 {
    bayer4(0.5 * x, 0.5 * y) * 0.25 + bayer2(x, y)
}

fn mask_circle(px: f32, py: f32, coverage: f32, fw: f32) -> f32 {
    let r = coverage.max(0.0).sqrt() * 0.25;
    let d = ((px - 0.5).powi(2) + (py - 0.5).powi(2)).sqrt() - r;
    coverage * (1.0 - smoothstep(-fw * 0.5, fw * 0.5, d * 2.0))
}

fn mask_triangle(px: f32, py: f32, id_x: f32, id_y: f32, coverage: f32, fw: f32) -> f32 {
    // Herringbone tiling: flip orientation on checkerboard parity.
    let px = if (id_x + id_y).rem_euclid(2.0) > 0.5 {
        1.0 - px
    } else {
        px
    };
    let d = py - coverage.max(0.0).sqrt() * (1.0 - px);
    coverage * (0.5 - d / fw).clamp(0.0, 1.0)
}

fn mask_diamond(px: f32, py: f32, coverage: f32) -> f32 {
    step(
        (px - 0.49).abs() + (py - 0.49).abs(),
        coverage.max(0.0).sqrt() * 0.564,
    )
}

/// Per-fragment result split at the point where shape masking happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    /// Binary dithering decision before jitter and shape masking.
    pub lit: bool,
    /// Final opacity after jitter, shape mask, and edge fade.
    pub opacity: f32,
}

/// One frame's worth of inputs to the field evaluation.
pub struct FieldFrame<'a> {
    pub config: &'a FieldConfig,
    /// Surface size in physical pixels.
    pub width: f32,
    pub height: f32,
    /// Cell size in physical pixels (config value times device pixel ratio).
    pub pixel_size: f32,
    /// Animation time in seconds.
    pub time: f32,
    /// Ripple slots as `[x, y, birth_time, _]`; `x < 0` marks an empty slot.
    pub clicks: &'a [[f32; 4]; MAX_RIPPLES],
}

impl FieldFrame<'_> {
    /// Evaluates one fragment at surface coordinates with a bottom-left
    /// origin, mirroring the fragment shader step for step.
    pub fn shade(&self, screen_x: f32, screen_y: f32) -> FieldSample {
        let cfg = self.config;
        let (res_x, res_y) = (self.width, self.height);
        let aspect = res_x / res_y;
        let frag = [screen_x - res_x * 0.5, screen_y - res_y * 0.5];

        let pixel_id = [
            (frag[0] / self.pixel_size).floor(),
            (frag[1] / self.pixel_size).floor(),
        ];
        let pixel_uv = [
            fract(frag[0] / self.pixel_size),
            fract(frag[1] / self.pixel_size),
        ];
        let cell_size = 8.0 * self.pixel_size;
        let cell_id = [(frag[0] / cell_size).floor(), (frag[1] / cell_size).floor()];
        let uv = [
            cell_id[0] * cell_size / res_x * aspect,
            cell_id[1] * cell_size / res_y,
        ];

        let center = [
            (screen_x / res_x - 0.5) * aspect,
            screen_y / res_y - 0.5,
        ];
        let dist_from_center = (center[0] * center[0] + center[1] * center[1]).sqrt();

        let base = fbm(uv, cfg.pattern_scale, self.time * 0.05) * 0.5 - 0.65;
        let mut feed = base + (cfg.pattern_density - 0.5) * 0.3;

        if cfg.center_grow > 0.0 {
            let grow_radius = self.time * cfg.center_grow * 0.15;
            feed *= smoothstep(grow_radius, grow_radius - 0.3, dist_from_center);
        }

        if cfg.ripples.enabled {
            for click in self.clicks.iter() {
                if click[0] < 0.0 {
                    continue;
                }
                let cuv = [
                    (click[0] - res_x * 0.5 - cell_size * 0.5) / res_x * aspect,
                    (click[1] - res_y * 0.5 - cell_size * 0.5) / res_y,
                ];
                let t = (self.time - click[2]).max(0.0);
                let r = ((uv[0] - cuv[0]).powi(2) + (uv[1] - cuv[1]).powi(2)).sqrt();
                let ring =
                    (-((r - cfg.ripples.speed * t) / cfg.ripples.thickness).powi(2)).exp();
                // Saturating max-blend: ripples only ever brighten a cell and
                // overlapping rings do not compound.
                feed = feed.max(
                    ring * (-t).exp() * (-10.0 * r).exp() * cfg.ripples.intensity_scale,
                );
            }
        }

        let bayer = bayer8(frag[0] / self.pixel_size, frag[1] / self.pixel_size) - 0.5;
        let bw = step(0.5, feed + bayer);
        let hash = fract((pixel_id[0] * 127.1 + pixel_id[1] * 311.7).sin() * 43758.5453);
        let coverage = bw * (1.0 + (hash - 0.5) * cfg.pixel_jitter);

        // Screen-space derivative of cell UV; stands in for fwidth().
        let fw = 1.5 / self.pixel_size;
        let mut opacity = match cfg.shape {
            Shape::Square => coverage,
            Shape::Circle => mask_circle(pixel_uv[0], pixel_uv[1], coverage, fw),
            Shape::Triangle => {
                mask_triangle(pixel_uv[0], pixel_uv[1], pixel_id[0], pixel_id[1], coverage, fw)
            }
            Shape::Diamond => mask_diamond(pixel_uv[0], pixel_uv[1], coverage),
        };

        if cfg.edge_fade > 0.0 {
            let norm = [screen_x / res_x, screen_y / res_y];
            let edge = norm[0]
                .min(norm[1])
                .min(1.0 - norm[0])
                .min(1.0 - norm[1]);
            opacity *= smoothstep(0.0, cfg.edge_fade, edge);
        }

        FieldSample {
            lit: bw > 0.5,
            opacity,
        }
    }
}

/// Encodes linear-ish sRGB components the way the shader does before output.
pub fn encode_srgb(color: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (slot, &c) in out.iter_mut().zip(color.iter()) {
        *slot = mix(
            c * 12.92,
            1.055 * c.powf(1.0 / 2.4) - 0.055,
            step(0.003_130_8, c),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ripples::RippleBuffer;
    use crate::types::{RippleSettings, Shape};

    fn scenario_config() -> FieldConfig {
        FieldConfig {
            shape: Shape::Circle,
            pixel_size: 6.0,
            pattern_scale: 3.0,
            pattern_density: 0.25,
            ripples: RippleSettings {
                enabled: true,
                speed: 2.0,
                thickness: 0.12,
                intensity_scale: 1.0,
            },
            center_grow: 1.0,
            time_scale: 1.0,
            edge_fade: 0.0,
            ..FieldConfig::default()
        }
    }

    /// Counts lit samples (one per pixel-grid cell) whose cell-quantised
    /// distance from the ripple origin falls inside `[r_min, r_max)`.
    fn lit_in_annulus(
        config: &FieldConfig,
        clicks: &[[f32; 4]; MAX_RIPPLES],
        time: f32,
        r_min: f32,
        r_max: f32,
    ) -> usize {
        let (w, h) = (800.0, 600.0);
        let aspect = w / h;
        let cell_size = 8.0 * config.pixel_size;
        let frame = FieldFrame {
            config,
            width: w,
            height: h,
            pixel_size: config.pixel_size,
            time,
            clicks,
        };
        let cuv = [
            (clicks[0][0] - w * 0.5 - cell_size * 0.5) / w * aspect,
            (clicks[0][1] - h * 0.5 - cell_size * 0.5) / h,
        ];

        let mut lit = 0;
        let step_px = config.pixel_size;
        let mut y = step_px * 0.5;
        while y < h {
            let mut x = step_px * 0.5;
            while x < w {
                let frag = [x - w * 0.5, y - h * 0.5];
                // The same cell-quantised uv the shader derives the ring from.
                let cell = [
                    (frag[0] / cell_size).floor() * cell_size / w * aspect,
                    (frag[1] / cell_size).floor() * cell_size / h,
                ];
                let r = ((cell[0] - cuv[0]).powi(2) + (cell[1] - cuv[1]).powi(2)).sqrt();
                if r >= r_min && r < r_max && frame.shade(x, y).lit {
                    lit += 1;
                }
                x += step_px;
            }
            y += step_px;
        }
        lit
    }

    #[test]
    fn fbm_is_roughly_normalized() {
        for i in 0..64 {
            let v = fbm([i as f32 * 0.13, i as f32 * 0.07], 3.0, 0.4);
            assert!((-0.5..=1.5).contains(&v), "fbm out of range: {v}");
        }
    }

    #[test]
    fn bayer_thresholds_stay_in_unit_range() {
        for y in 0..8 {
            for x in 0..8 {
                let v = bayer8(x as f32, y as f32);
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn bayer_tiles_with_period_eight() {
        for y in 0..8 {
            for x in 0..8 {
                let a = bayer8(x as f32, y as f32);
                let b = bayer8(x as f32 + 8.0, y as f32 + 8.0);
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn dithering_decision_is_shape_independent() {
        let mut config = scenario_config();
        let clicks = RippleBuffer::new();
        let shapes = [Shape::Square, Shape::Circle, Shape::Triangle, Shape::Diamond];

        let mut reference: Option<Vec<bool>> = None;
        for shape in shapes {
            config.shape = shape;
            let frame = FieldFrame {
                config: &config,
                width: 320.0,
                height: 240.0,
                pixel_size: 6.0,
                time: 4.2,
                clicks: clicks.slots(),
            };
            let bitmap: Vec<bool> = (0..240)
                .flat_map(|y| {
                    (0..320).map(move |x| (x as f32 + 0.5, y as f32 + 0.5))
                })
                .map(|(x, y)| frame.shade(x, y).lit)
                .collect();
            match &reference {
                None => reference = Some(bitmap),
                Some(expected) => assert_eq!(&bitmap, expected),
            }
        }
    }

    #[test]
    fn ripple_ring_appears_at_the_expected_radius() {
        let config = scenario_config();
        let mut ripples = RippleBuffer::new();
        ripples.trigger(400.0, 300.0, 0.0);

        // rippleSpeed 2.0 × t 0.05 → ring at ~0.1 normalized distance units.
        let at_ring = lit_in_annulus(&config, ripples.slots(), 0.05, 0.05, 0.15);
        let at_start = lit_in_annulus(&config, ripples.slots(), 0.0, 0.05, 0.15);
        let far_out = lit_in_annulus(&config, ripples.slots(), 0.05, 0.35, 0.45);

        assert!(
            at_ring > at_start,
            "expected the ring to brighten the annulus over time ({at_ring} vs {at_start})"
        );
        assert!(
            at_ring > far_out,
            "expected the ring to out-shine a distant control annulus ({at_ring} vs {far_out})"
        );
    }

    #[test]
    fn ripples_never_darken_the_field() {
        let mut enabled = scenario_config();
        enabled.center_grow = 0.0;
        enabled.pattern_density = 1.2;
        let mut disabled = enabled.clone();
        disabled.ripples.enabled = false;

        let mut ripples = RippleBuffer::new();
        ripples.trigger(160.0, 120.0, 0.0);

        for y in (0..240).step_by(7) {
            for x in (0..320).step_by(7) {
                let with = FieldFrame {
                    config: &enabled,
                    width: 320.0,
                    height: 240.0,
                    pixel_size: 6.0,
                    time: 0.2,
                    clicks: ripples.slots(),
                }
                .shade(x as f32 + 0.5, y as f32 + 0.5);
                let without = FieldFrame {
                    config: &disabled,
                    width: 320.0,
                    height: 240.0,
                    pixel_size: 6.0,
                    time: 0.2,
                    clicks: ripples.slots(),
                }
                .shade(x as f32 + 0.5, y as f32 + 0.5);
                assert!(u8::from(with.lit) >= u8::from(without.lit));
            }
        }
    }

    #[test]
    fn center_grow_masks_distant_cells_early() {
        let mut config = scenario_config();
        config.ripples.enabled = false;
        config.pattern_density = 1.5;
        let clicks = RippleBuffer::new();

        // Shortly after start only a small disk near the center can be lit.
        let frame = FieldFrame {
            config: &config,
            width: 800.0,
            height: 600.0,
            pixel_size: 6.0,
            time: 0.1,
            clicks: clicks.slots(),
        };
        let corner = frame.shade(10.0, 10.0);
        assert_eq!(corner.opacity, 0.0);
    }

    #[test]
    fn edge_fade_zeroes_the_border() {
        let mut config = scenario_config();
        config.edge_fade = 0.25;
        config.pattern_density = 1.5;
        config.center_grow = 0.0;
        let clicks = RippleBuffer::new();
        let frame = FieldFrame {
            config: &config,
            width: 320.0,
            height: 240.0,
            pixel_size: 6.0,
            time: 3.0,
            clicks: clicks.slots(),
        };
        let sample = frame.shade(0.5, 120.0);
        assert!(sample.opacity.abs() < 1e-3);
    }

    #[test]
    fn srgb_encode_matches_reference_points() {
        let encoded = encode_srgb([0.0, 1.0, 0.5]);
        assert!(encoded[0].abs() < 1e-6);
        assert!((encoded[1] - 1.0).abs() < 1e-3);
        // 0.5 linear ≈ 0.7354 sRGB.
        assert!((encoded[2] - 0.7354).abs() < 1e-3);
    }
}
