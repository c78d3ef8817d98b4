//! Procedural pixel-field renderer.
//!
//! A [`PixelField`] drives one animated layer of dithered pixel shapes on a
//! caller-provided surface target:
//!
//! ```text
//!   FieldConfig ──▶ PixelField ──▶ GpuState ──▶ field pass ──▶ surface
//!                      │                │
//!                      ├─ FieldClock    └─ liquid pass (optional)
//!                      ├─ RippleBuffer
//!                      └─ TouchTrail (optional)
//! ```
//!
//! The host owns the frame loop: it forwards pointer events through
//! [`PixelField::trigger_ripple`] and [`PixelField::feed_pointer_move`],
//! calls [`PixelField::resize`] on surface changes, and invokes
//! [`PixelField::render_frame`] once per frame. All coordinates use a
//! bottom-left origin in physical pixels unless noted otherwise.
//!
//! GPU initialisation failures degrade rather than abort: the instance
//! stays alive, logs a warning, and every render call becomes a no-op.
//! CPU-side rendering of the same field, for stills and tests, lives in
//! [`field`] and [`export`].

mod clock;
mod error;
mod export;
pub mod field;
mod gpu;
mod ripples;
mod shader;
mod trail;
mod types;
mod uniforms;

use std::time::Instant;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

pub use crate::error::FieldError;
pub use wgpu::SurfaceError;
pub use crate::export::{export_png, render_still};
pub use crate::ripples::MAX_RIPPLES;
pub use crate::types::{
    parse_hex_color, FieldConfig, LiquidSettings, RippleSettings, Shape,
};

use crate::clock::FieldClock;
use crate::gpu::GpuState;
use crate::ripples::RippleBuffer;
use crate::trail::TouchTrail;

/// Device pixel ratios above this add cost without visible benefit at the
/// cell sizes this renderer draws.
const MAX_PIXEL_RATIO: f64 = 2.0;

/// One animated pixel-field layer bound to a surface target.
pub struct PixelField {
    config: FieldConfig,
    clock: FieldClock,
    ripples: RippleBuffer,
    trail: Option<TouchTrail>,
    gpu: Option<GpuState>,
}

impl PixelField {
    /// Creates a field over the given surface target.
    ///
    /// If the GPU context cannot be established the returned instance is
    /// inert: it accepts events and render calls but draws nothing. The
    /// failure is logged once here rather than surfaced per frame.
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        scale_factor: f64,
        config: FieldConfig,
    ) -> Self
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let pixel_size = config.pixel_size * scale_factor.min(MAX_PIXEL_RATIO) as f32;
        let gpu = match GpuState::new(target, size, &config, pixel_size) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(error = %err, "pixel field disabled; rendering nothing");
                None
            }
        };
        let trail = if config.liquid.enabled {
            Some(TouchTrail::new(config.liquid.radius))
        } else {
            None
        };
        Self {
            clock: FieldClock::new(config.time_scale),
            ripples: RippleBuffer::new(),
            trail,
            config,
            gpu,
        }
    }

    /// Whether a GPU context was established.
    pub fn is_active(&self) -> bool {
        self.gpu.is_some()
    }

    /// Updates the surface size. Unchanged and zero-area sizes are no-ops.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(new_size);
        }
    }

    /// Rebuilds the swapchain after [`SurfaceError::Lost`] or
    /// [`SurfaceError::Outdated`].
    pub fn recover_surface(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.recover_surface();
        }
    }

    /// Records a ripple at the given position, in physical pixels from the
    /// bottom-left corner. Ignored while ripples are disabled in the config.
    pub fn trigger_ripple(&mut self, x: f32, y: f32) {
        if !self.config.ripples.enabled {
            return;
        }
        let time = self.clock.time();
        self.ripples.trigger(x, y, time);
        tracing::debug!(x, y, time, "ripple triggered");
    }

    /// Feeds a pointer position into the displacement trail, normalized to
    /// `[0, 1]` with the origin at the bottom-left. A no-op unless the
    /// liquid effect is enabled.
    pub fn feed_pointer_move(&mut self, x: f32, y: f32) {
        if let Some(trail) = self.trail.as_mut() {
            trail.add_touch(x, y);
        }
    }

    /// Advances the animation clock and draws one frame.
    ///
    /// Surface errors are returned to the host so it can apply its own
    /// recovery policy (reconfigure on loss, abort on out-of-memory).
    pub fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let time = self.clock.advance(Instant::now());
        if let Some(trail) = self.trail.as_mut() {
            trail.update();
        }
        match self.gpu.as_mut() {
            Some(gpu) => gpu.render_frame(time, self.ripples.slots(), self.trail.as_mut()),
            None => Ok(()),
        }
    }

    /// Current surface size, or zero if the GPU context is unavailable.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.gpu
            .as_ref()
            .map(GpuState::size)
            .unwrap_or(PhysicalSize::new(0, 0))
    }
}
