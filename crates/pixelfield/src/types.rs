use anyhow::Result;

/// Per-cell coverage mask applied after the dithering decision.
///
/// The four variants are fixed at shader compile time; the fragment shader
/// branches on the integer tag rather than dispatching dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Square,
    Circle,
    Triangle,
    Diamond,
}

impl Shape {
    /// Integer tag handed to the fragment shader.
    pub(crate) fn tag(self) -> i32 {
        match self {
            Shape::Square => 0,
            Shape::Circle => 1,
            Shape::Triangle => 2,
            Shape::Diamond => 3,
        }
    }
}

/// Expanding click-feedback rings seeded through [`crate::PixelField::trigger_ripple`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleSettings {
    /// When false the shader ignores all recorded ripple slots.
    pub enabled: bool,
    /// Ring expansion rate in normalized distance units per second.
    pub speed: f32,
    /// Gaussian ring width in normalized distance units.
    pub thickness: f32,
    /// Brightness multiplier applied to every ring.
    pub intensity_scale: f32,
}

impl Default for RippleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 0.3,
            thickness: 0.1,
            intensity_scale: 1.0,
        }
    }
}

/// Optional pointer-trail displacement post-process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidSettings {
    /// Enables the second full-screen displacement pass and the trail texture.
    pub enabled: bool,
    /// Maximum texture-lookup offset in UV units.
    pub strength: f32,
    /// Scale applied to the trail brush radius.
    pub radius: f32,
    /// Frequency of the sine wobble modulating the displacement.
    pub wobble_speed: f32,
}

impl Default for LiquidSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.1,
            radius: 1.0,
            wobble_speed: 4.5,
        }
    }
}

/// Immutable visual configuration for one pixel-field instance.
///
/// A host that wants different parameters tears the instance down and builds a
/// new one; nothing here is mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    /// Coverage mask selecting how each lit cell is drawn.
    pub shape: Shape,
    /// Logical pixels per grid cell, before device-pixel-ratio scaling.
    pub pixel_size: f32,
    /// Base color as sRGB components in `[0, 1]`; the shader gamma-encodes it
    /// before blending.
    pub base_color: [f32; 3],
    /// Spatial frequency of the underlying noise field.
    pub pattern_scale: f32,
    /// Fill threshold offset; higher values light more cells.
    pub pattern_density: f32,
    /// Per-cell random coverage variance in `[0, 1]`.
    pub pixel_jitter: f32,
    /// Click-feedback ring configuration.
    pub ripples: RippleSettings,
    /// Screen-edge opacity falloff width in `[0, 1]`; 0 disables the fade.
    pub edge_fade: f32,
    /// Reveal-from-center expansion rate; 0 shows the full field immediately.
    pub center_grow: f32,
    /// Global animation speed multiplier; 0 freezes the clock, which is how a
    /// reduced-motion preference is honoured.
    pub time_scale: f32,
    /// Whether unlit cells are cleared to transparency or an opaque backdrop.
    pub transparent: bool,
    /// Liquid displacement post-process configuration.
    pub liquid: LiquidSettings,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            shape: Shape::default(),
            pixel_size: 3.0,
            base_color: [0.694, 0.620, 0.937],
            pattern_scale: 2.0,
            pattern_density: 1.0,
            pixel_jitter: 0.0,
            ripples: RippleSettings::default(),
            edge_fade: 0.5,
            center_grow: 0.0,
            time_scale: 0.5,
            transparent: true,
            liquid: LiquidSettings::default(),
        }
    }
}

/// Parses a `#RRGGBB` hex string into sRGB components in `[0, 1]`.
pub fn parse_hex_color(value: &str) -> Result<[f32; 3]> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("expected a color like `#RRGGBB`, got `{value}`");
    }
    let component = |range: std::ops::Range<usize>| -> f32 {
        u8::from_str_radix(&digits[range], 16).unwrap_or(0) as f32 / 255.0
    };
    Ok([component(0..2), component(2..4), component(4..6)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_tags_match_shader_branches() {
        assert_eq!(Shape::Square.tag(), 0);
        assert_eq!(Shape::Circle.tag(), 1);
        assert_eq!(Shape::Triangle.tag(), 2);
        assert_eq!(Shape::Diamond.tag(), 3);
    }

    #[test]
    fn hex_color_parses_with_and_without_hash() {
        let white = parse_hex_color("#ffffff").expect("color");
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));

        let blue = parse_hex_color("2196f3").expect("color");
        assert!((blue[0] - 0x21 as f32 / 255.0).abs() < 1e-6);
        assert!((blue[1] - 0x96 as f32 / 255.0).abs() < 1e-6);
        assert!((blue[2] - 0xf3 as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn hex_color_rejects_malformed_input() {
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("not-a-color").is_err());
        assert!(parse_hex_color("#12345g").is_err());
    }

    #[test]
    fn default_config_is_visible_and_animated() {
        let config = FieldConfig::default();
        assert!(config.pixel_size > 0.0);
        assert!(config.time_scale > 0.0);
        assert!(config.ripples.enabled);
        assert!(!config.liquid.enabled);
    }
}
