//! Still-frame rendering through the CPU reference evaluator.
//!
//! Exports do not need a GPU context: the field math is evaluated per pixel
//! by [`crate::field`] and written out as PNG. The liquid post-process is not
//! applied; a still frame has no pointer trail to displace by.

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};

use crate::field::{encode_srgb, FieldFrame};
use crate::ripples::RippleBuffer;
use crate::types::FieldConfig;

/// Renders one frame at the given animation timestamp.
///
/// `transparent` configs produce straight-alpha output; opaque configs are
/// composited over black the way the GPU path clears the surface.
pub fn render_still(config: &FieldConfig, width: u32, height: u32, time: f32) -> RgbaImage {
    let ripples = RippleBuffer::new();
    let frame = FieldFrame {
        config,
        width: width.max(1) as f32,
        height: height.max(1) as f32,
        pixel_size: config.pixel_size.max(1.0),
        time,
        clicks: ripples.slots(),
    };
    let color = encode_srgb(config.base_color);

    RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
        // Image rows run top-down; the field uses a bottom-left origin.
        let screen_y = frame.height - (y as f32 + 0.5);
        let sample = frame.shade(x as f32 + 0.5, screen_y);
        let a = sample.opacity.clamp(0.0, 1.0);
        if config.transparent {
            Rgba([
                (color[0] * 255.0).round() as u8,
                (color[1] * 255.0).round() as u8,
                (color[2] * 255.0).round() as u8,
                (a * 255.0).round() as u8,
            ])
        } else {
            Rgba([
                (color[0] * a * 255.0).round() as u8,
                (color[1] * a * 255.0).round() as u8,
                (color[2] * a * 255.0).round() as u8,
                255,
            ])
        }
    })
}

/// Renders a still frame and writes it to `path` as PNG.
pub fn export_png(
    config: &FieldConfig,
    width: u32,
    height: u32,
    time: f32,
    path: &Path,
) -> Result<()> {
    let image = render_still(config, width, height, time);
    image
        .save(path)
        .with_context(|| format!("failed to write still frame to {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        width,
        height,
        time,
        "exported still frame"
    );
    Ok(())
}
