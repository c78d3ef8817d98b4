use bytemuck::{Pod, Zeroable};

use crate::ripples::MAX_RIPPLES;
use crate::types::FieldConfig;

/// CPU-side mirror of the field shader's uniform block.
///
/// The layout must match the `FieldParams` block declared in
/// [`crate::shader`] and therefore observes std140 alignment rules: two
/// leading vec4s, twelve tightly packed scalars (a multiple of 16 bytes), and
/// a vec4 array with 16-byte stride.
#[repr(C, align(16))]
#[derive(Clone, Copy, PartialEq)]
pub(crate) struct FieldUniforms {
    pub resolution: [f32; 4],
    pub base_color: [f32; 4],
    pub time: f32,
    pub pixel_size: f32,
    pub pattern_scale: f32,
    pub pattern_density: f32,
    pub pixel_jitter: f32,
    pub edge_fade: f32,
    pub ripple_speed: f32,
    pub ripple_thickness: f32,
    pub ripple_intensity: f32,
    pub center_grow: f32,
    pub shape: i32,
    pub ripples_enabled: i32,
    pub clicks: [[f32; 4]; MAX_RIPPLES],
}

unsafe impl Zeroable for FieldUniforms {}
unsafe impl Pod for FieldUniforms {}

impl FieldUniforms {
    /// Seeds the uniform block from the immutable config; only time,
    /// resolution, and the click slots change after construction.
    pub fn new(config: &FieldConfig, width: u32, height: u32, pixel_size: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32, 0.0, 0.0],
            base_color: [
                config.base_color[0],
                config.base_color[1],
                config.base_color[2],
                1.0,
            ],
            time: 0.0,
            pixel_size: pixel_size.max(1.0),
            pattern_scale: config.pattern_scale,
            pattern_density: config.pattern_density,
            pixel_jitter: config.pixel_jitter,
            edge_fade: config.edge_fade,
            ripple_speed: config.ripples.speed,
            ripple_thickness: config.ripples.thickness,
            ripple_intensity: config.ripples.intensity_scale,
            center_grow: config.center_grow,
            shape: config.shape.tag(),
            ripples_enabled: i32::from(config.ripples.enabled),
            clicks: [[-1.0, -1.0, 0.0, 0.0]; MAX_RIPPLES],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution[0] = width;
        self.resolution[1] = height;
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn set_clicks(&mut self, slots: &[[f32; 4]; MAX_RIPPLES]) {
        self.clicks = *slots;
    }
}

/// Uniforms of the liquid displacement pass: `[strength, time, wobble, 0]`.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct LiquidUniforms {
    pub params: [f32; 4],
}

unsafe impl Zeroable for LiquidUniforms {}
unsafe impl Pod for LiquidUniforms {}

impl LiquidUniforms {
    pub fn new(strength: f32, wobble_speed: f32) -> Self {
        Self {
            params: [strength, 0.0, wobble_speed, 0.0],
        }
    }

    pub fn set_time(&mut self, time: f32) {
        self.params[1] = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shape;

    #[test]
    fn layout_matches_std140_expectations() {
        // 2 vec4 + 12 scalars + 10-element vec4 array.
        assert_eq!(std::mem::size_of::<FieldUniforms>(), 16 + 16 + 48 + 160);
        assert_eq!(std::mem::size_of::<FieldUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<LiquidUniforms>(), 16);
    }

    #[test]
    fn repeated_resize_is_idempotent() {
        let config = FieldConfig::default();
        let mut once = FieldUniforms::new(&config, 800, 600, 6.0);
        let mut many = once;
        once.set_resolution(1024.0, 768.0);
        for _ in 0..5 {
            many.set_resolution(1024.0, 768.0);
        }
        assert_eq!(bytemuck::bytes_of(&once), bytemuck::bytes_of(&many));
    }

    #[test]
    fn config_fields_land_in_the_block() {
        let config = FieldConfig {
            shape: Shape::Diamond,
            pixel_jitter: 0.4,
            ..FieldConfig::default()
        };
        let uniforms = FieldUniforms::new(&config, 320, 240, 3.0);
        assert_eq!(uniforms.shape, 3);
        assert_eq!(uniforms.pixel_jitter, 0.4);
        assert_eq!(uniforms.ripples_enabled, 1);
        assert!(uniforms.clicks.iter().all(|slot| slot[0] < 0.0));
    }
}
