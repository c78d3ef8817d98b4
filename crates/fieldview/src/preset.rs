//! Layer preset files.
//!
//! A preset file is a TOML table of named layers, each describing one
//! pixel-field configuration. Hosts typically stack two layers, an opaque
//! background and a transparent accent, so the built-in preset ships both.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pixelfield::{parse_hex_color, FieldConfig, LiquidSettings, RippleSettings, Shape};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeName {
    Square,
    Circle,
    Triangle,
    Diamond,
}

impl From<ShapeName> for Shape {
    fn from(name: ShapeName) -> Self {
        match name {
            ShapeName::Square => Shape::Square,
            ShapeName::Circle => Shape::Circle,
            ShapeName::Triangle => Shape::Triangle,
            ShapeName::Diamond => Shape::Diamond,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerPreset {
    #[serde(default = "default_shape")]
    pub shape: ShapeName,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f32,
    /// Base color as `#RRGGBB`.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_pattern_scale")]
    pub pattern_scale: f32,
    #[serde(default = "default_pattern_density")]
    pub pattern_density: f32,
    #[serde(default)]
    pub pixel_jitter: f32,
    #[serde(default = "default_true")]
    pub ripples: bool,
    #[serde(default = "default_ripple_speed")]
    pub ripple_speed: f32,
    #[serde(default = "default_ripple_thickness")]
    pub ripple_thickness: f32,
    #[serde(default = "default_ripple_intensity")]
    pub ripple_intensity: f32,
    #[serde(default = "default_edge_fade")]
    pub edge_fade: f32,
    #[serde(default)]
    pub center_grow: f32,
    #[serde(default = "default_time_scale")]
    pub speed: f32,
    #[serde(default = "default_true")]
    pub transparent: bool,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default = "default_liquid_strength")]
    pub liquid_strength: f32,
    #[serde(default = "default_liquid_radius")]
    pub liquid_radius: f32,
    #[serde(default = "default_liquid_wobble")]
    pub liquid_wobble_speed: f32,
}

fn default_shape() -> ShapeName {
    ShapeName::Square
}
fn default_pixel_size() -> f32 {
    3.0
}
fn default_color() -> String {
    "#B19EEF".to_string()
}
fn default_pattern_scale() -> f32 {
    2.0
}
fn default_pattern_density() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_ripple_speed() -> f32 {
    0.3
}
fn default_ripple_thickness() -> f32 {
    0.1
}
fn default_ripple_intensity() -> f32 {
    1.0
}
fn default_edge_fade() -> f32 {
    0.5
}
fn default_time_scale() -> f32 {
    0.5
}
fn default_liquid_strength() -> f32 {
    0.1
}
fn default_liquid_radius() -> f32 {
    1.0
}
fn default_liquid_wobble() -> f32 {
    4.5
}

impl Default for LayerPreset {
    fn default() -> Self {
        Self {
            shape: default_shape(),
            pixel_size: default_pixel_size(),
            color: default_color(),
            pattern_scale: default_pattern_scale(),
            pattern_density: default_pattern_density(),
            pixel_jitter: 0.0,
            ripples: true,
            ripple_speed: default_ripple_speed(),
            ripple_thickness: default_ripple_thickness(),
            ripple_intensity: default_ripple_intensity(),
            edge_fade: default_edge_fade(),
            center_grow: 0.0,
            speed: default_time_scale(),
            transparent: true,
            liquid: false,
            liquid_strength: default_liquid_strength(),
            liquid_radius: default_liquid_radius(),
            liquid_wobble_speed: default_liquid_wobble(),
        }
    }
}

impl LayerPreset {
    pub fn to_config(&self) -> Result<FieldConfig> {
        let base_color = parse_hex_color(&self.color)
            .with_context(|| format!("invalid layer color `{}`", self.color))?;
        Ok(FieldConfig {
            shape: self.shape.into(),
            pixel_size: self.pixel_size,
            base_color,
            pattern_scale: self.pattern_scale,
            pattern_density: self.pattern_density,
            pixel_jitter: self.pixel_jitter,
            ripples: RippleSettings {
                enabled: self.ripples,
                speed: self.ripple_speed,
                thickness: self.ripple_thickness,
                intensity_scale: self.ripple_intensity,
            },
            edge_fade: self.edge_fade,
            center_grow: self.center_grow,
            time_scale: self.speed,
            transparent: self.transparent,
            liquid: LiquidSettings {
                enabled: self.liquid,
                strength: self.liquid_strength,
                radius: self.liquid_radius,
                wobble_speed: self.liquid_wobble_speed,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetFile {
    #[serde(flatten)]
    pub layers: BTreeMap<String, LayerPreset>,
}

impl PresetFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read preset file {}", path.display()))?;
        let file: PresetFile = toml::from_str(&text)
            .with_context(|| format!("failed to parse preset file {}", path.display()))?;
        if file.layers.is_empty() {
            bail!("preset file {} defines no layers", path.display());
        }
        Ok(file)
    }

    /// The stock duotone pairing: an opaque blue background with a slower,
    /// sparser transparent red accent on top.
    pub fn builtin() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(
            "background".to_string(),
            LayerPreset {
                shape: ShapeName::Circle,
                pixel_size: 6.0,
                color: "#2196F3".to_string(),
                pattern_scale: 3.0,
                pattern_density: 0.25,
                pixel_jitter: 0.15,
                ripple_speed: 2.0,
                ripple_thickness: 0.12,
                speed: 0.1,
                edge_fade: 0.25,
                center_grow: 1.0,
                transparent: false,
                ..LayerPreset::default()
            },
        );
        layers.insert(
            "accent".to_string(),
            LayerPreset {
                shape: ShapeName::Circle,
                pixel_size: 6.0,
                color: "#FF0057".to_string(),
                pattern_scale: 4.0,
                pattern_density: 0.15,
                pixel_jitter: 0.15,
                ripple_speed: 2.0,
                ripple_thickness: 0.12,
                speed: 0.08,
                edge_fade: 0.3,
                center_grow: 0.8,
                ..LayerPreset::default()
            },
        );
        Self { layers }
    }

    pub fn layer(&self, name: &str) -> Result<&LayerPreset> {
        self.layers.get(name).with_context(|| {
            let known: Vec<&str> = self.layers.keys().map(String::as_str).collect();
            format!("no layer named `{name}` (available: {})", known.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_layers_convert_to_configs() {
        let presets = PresetFile::builtin();
        let background = presets.layer("background").unwrap().to_config().unwrap();
        assert_eq!(background.shape, Shape::Circle);
        assert!(!background.transparent);
        assert_eq!(background.pixel_jitter, 0.15);
        assert_eq!(background.ripples.thickness, 0.12);
        assert_eq!(background.time_scale, 0.1);
        assert_eq!(background.edge_fade, 0.25);
        let accent = presets.layer("accent").unwrap().to_config().unwrap();
        assert!(accent.transparent);
        assert_eq!(accent.pixel_jitter, 0.15);
        assert_eq!(accent.ripples.thickness, 0.12);
        assert!(accent.time_scale < background.time_scale);
    }

    #[test]
    fn loads_preset_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[hero]\nshape = \"diamond\"\ncolor = \"#FF0057\"\nliquid = true\n"
        )
        .unwrap();
        let presets = PresetFile::load(file.path()).unwrap();
        let hero = presets.layer("hero").unwrap();
        assert_eq!(hero.shape, ShapeName::Diamond);
        assert!(hero.liquid);
        // Unspecified fields fall back to the documented defaults.
        assert_eq!(hero.pixel_size, 3.0);
        assert_eq!(hero.pattern_scale, 2.0);
        let config = hero.to_config().unwrap();
        assert!(config.liquid.enabled);
        assert_eq!(config.liquid.wobble_speed, 4.5);
    }

    #[test]
    fn rejects_unknown_layer_names_and_fields() {
        let presets = PresetFile::builtin();
        assert!(presets.layer("missing").is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hero]\nnot_a_field = 1\n").unwrap();
        assert!(PresetFile::load(file.path()).is_err());
    }

    #[test]
    fn rejects_malformed_colors() {
        let preset = LayerPreset {
            color: "blue".to_string(),
            ..LayerPreset::default()
        };
        assert!(preset.to_config().is_err());
    }
}
