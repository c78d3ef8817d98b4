use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use pixelfield::{export_png, FieldConfig, PixelField, SurfaceError};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::cli::{parse_size, Args};
use crate::preset::PresetFile;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let presets = match args.preset.as_deref() {
        Some(path) => PresetFile::load(path)?,
        None => PresetFile::builtin(),
    };
    let mut config = presets.layer(&args.layer)?.to_config()?;
    if args.reduced_motion {
        config.time_scale = 0.0;
    }
    let (width, height) = parse_size(&args.size)?;

    if let Some(path) = args.export.as_ref() {
        tracing::info!(layer = %args.layer, width, height, time = args.time, "exporting still");
        export_png(&config, width, height, args.time, path)?;
        return Ok(());
    }

    run_windowed(config, width, height, &args.layer)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_windowed(config: FieldConfig, width: u32, height: u32, layer: &str) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(format!("fieldview: {layer}"))
        .with_inner_size(PhysicalSize::new(width, height))
        .with_transparent(config.transparent)
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let size = window.inner_size();
    let scale_factor = window.scale_factor();
    let mut field = PixelField::new(window.as_ref(), size, scale_factor, config);
    if !field.is_active() {
        tracing::warn!("GPU unavailable; window will stay blank");
    }

    let mut cursor: Option<(f64, f64)> = None;
    let loop_window = window.clone();
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { window_id, event } if window_id == loop_window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::Resized(new_size) => {
                            field.resize(new_size);
                        }
                        WindowEvent::ScaleFactorChanged {
                            mut inner_size_writer,
                            ..
                        } => {
                            let _ = inner_size_writer.request_inner_size(field.size());
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            cursor = Some((position.x, position.y));
                            let size = loop_window.inner_size();
                            if size.width > 0 && size.height > 0 {
                                let x = (position.x / size.width as f64) as f32;
                                let y = 1.0 - (position.y / size.height as f64) as f32;
                                field.feed_pointer_move(x, y);
                            }
                        }
                        WindowEvent::MouseInput {
                            state: ElementState::Pressed,
                            button: MouseButton::Left,
                            ..
                        } => {
                            if let Some((x, y)) = cursor {
                                let height = loop_window.inner_size().height as f32;
                                field.trigger_ripple(x as f32, height - y as f32);
                            }
                        }
                        WindowEvent::RedrawRequested => match field.render_frame() {
                            Ok(()) => {}
                            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                                field.recover_surface();
                                field.resize(loop_window.inner_size());
                            }
                            Err(SurfaceError::OutOfMemory) => {
                                tracing::error!("surface out of memory; exiting preview");
                                elwt.exit();
                            }
                            Err(SurfaceError::Timeout) => {
                                tracing::warn!("surface timeout; retrying next frame");
                            }
                            Err(other) => {
                                tracing::warn!(error = ?other, "surface error; retrying next frame");
                            }
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    loop_window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
