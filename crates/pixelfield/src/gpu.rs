//! GPU resources backing one pixel-field instance.
//!
//! ```text
//!   Surface target ─▶ Instance ─▶ Adapter ─▶ Device ─▶ Queue
//!                                               │
//!                                               ├─▶ field pipeline ─▶ surface (or scene target)
//!                                               ├─▶ liquid pipeline ─▶ surface   (optional)
//!                                               ├─▶ uniform buffers
//!                                               └─▶ trail texture             (optional)
//! ```
//!
//! Each instance owns the whole chain; two composited layers never share
//! state. The liquid post-process, when enabled, redirects the field pass
//! into an offscreen color target and adds a second full-screen pass that
//! displaces the scene lookup by the trail texture.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::error::FieldError;
use crate::ripples::MAX_RIPPLES;
use crate::shader::{compile_field_fragment, compile_liquid_fragment, compile_vertex_shader};
use crate::trail::{TouchTrail, TRAIL_SIZE};
use crate::types::FieldConfig;
use crate::uniforms::{FieldUniforms, LiquidUniforms};

pub(crate) struct GpuState {
    /// `wgpu` instance that produced the surface; kept alive for the surface lifetime.
    _instance: wgpu::Instance,
    /// Limits advertised by the adapter; used to validate resize requests.
    limits: wgpu::Limits,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    /// Backdrop behind unlit cells; transparent or opaque per the config.
    clear_color: wgpu::Color,
    field_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// CPU copy of the uniform block mirrored into the buffer each frame.
    uniforms: FieldUniforms,
    liquid: Option<LiquidPass>,
}

impl GpuState {
    pub fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        config: &FieldConfig,
        pixel_size: f32,
    ) -> Result<Self, FieldError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::default();
        let window_handle = target
            .window_handle()
            .map_err(|err| FieldError::SurfaceCreation(err.to_string()))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| FieldError::SurfaceCreation(err.to_string()))?;
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| FieldError::SurfaceCreation(err.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| FieldError::ContextUnavailable(err.to_string()))?;

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("pixelfield device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| FieldError::DeviceRequest(err.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader gamma-encodes its output itself, so prefer a non-sRGB
        // swapchain to avoid a double conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let alpha_mode = pick_alpha_mode(&surface_caps.alpha_modes, config.transparent);

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &surface_config);

        let vertex_module = compile_vertex_shader(&device);
        let fragment_module = compile_field_fragment(&device);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("field pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let field_pipeline = create_fullscreen_pipeline(
            &device,
            "field pipeline",
            &pipeline_layout,
            &vertex_module,
            &fragment_module,
            surface_format,
            wgpu::BlendState::ALPHA_BLENDING,
        );

        let uniforms = FieldUniforms::new(config, size.width, size.height, pixel_size);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("field uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let liquid = if config.liquid.enabled {
            Some(LiquidPass::new(
                &device,
                &uniform_layout,
                &vertex_module,
                surface_format,
                size,
                config,
            ))
        } else {
            None
        };

        let clear_color = if config.transparent {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color::BLACK
        };

        tracing::info!(
            width = size.width,
            height = size.height,
            format = ?surface_format,
            liquid = liquid.is_some(),
            "initialised pixel field GPU state"
        );

        Ok(Self {
            _instance: instance,
            limits,
            surface,
            device,
            queue,
            config: surface_config,
            size,
            clear_color,
            field_pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            liquid,
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the swapchain to match the new size.
    ///
    /// Calling with the current size, or with a zero-area size, is a no-op.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            tracing::debug!("ignoring zero-area resize");
            return;
        }
        if new_size == self.size {
            return;
        }

        let max_dimension = self.limits.max_texture_dimension_2d;
        if new_size.width > max_dimension || new_size.height > max_dimension {
            tracing::warn!(
                width = new_size.width,
                height = new_size.height,
                max_dimension,
                "resize exceeds GPU texture limits; keeping previous size"
            );
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.uniforms
            .set_resolution(new_size.width as f32, new_size.height as f32);
        if let Some(liquid) = self.liquid.as_mut() {
            liquid.resize(&self.device, self.config.format, new_size);
        }
    }

    /// Reconfigures the surface at its current size after the swapchain was
    /// reported lost or outdated.
    pub fn recover_surface(&mut self) {
        tracing::debug!("reconfiguring lost surface");
        self.surface.configure(&self.device, &self.config);
    }

    /// Records and submits one frame.
    pub fn render_frame(
        &mut self,
        time: f32,
        clicks: &[[f32; 4]; MAX_RIPPLES],
        trail: Option<&mut TouchTrail>,
    ) -> Result<(), wgpu::SurfaceError> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(());
        }

        self.uniforms.set_time(time);
        self.uniforms.set_clicks(clicks);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        if let (Some(liquid), Some(trail)) = (self.liquid.as_mut(), trail) {
            liquid.uniforms.set_time(time);
            self.queue.write_buffer(
                &liquid.uniform_buffer,
                0,
                bytemuck::bytes_of(&liquid.uniforms),
            );
            if trail.take_dirty() {
                liquid.upload_trail(&self.queue, trail.pixels());
            }
        }

        let frame = self.surface.get_current_texture()?;
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pixel field encoder"),
            });

        {
            let field_target = match &self.liquid {
                Some(liquid) => &liquid.scene_view,
                None => &frame_view,
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("field pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: field_target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.field_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        if let Some(liquid) = &self.liquid {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("liquid pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&liquid.pipeline);
            pass.set_bind_group(0, &liquid.uniform_bind_group, &[]);
            pass.set_bind_group(1, &liquid.texture_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            width = self.size.width,
            height = self.size.height,
            time,
            "presented frame"
        );
        Ok(())
    }
}

/// Resources of the optional displacement post-process.
struct LiquidPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: LiquidUniforms,
    texture_layout: wgpu::BindGroupLayout,
    texture_bind_group: wgpu::BindGroup,
    scene_texture: wgpu::Texture,
    scene_view: wgpu::TextureView,
    trail_texture: wgpu::Texture,
    trail_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl LiquidPass {
    fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        vertex_module: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        config: &FieldConfig,
    ) -> Self {
        let fragment_module = compile_liquid_fragment(device);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("liquid texture layout"),
            entries: &[
                texture_layout_entry(0),
                sampler_layout_entry(1),
                texture_layout_entry(2),
                sampler_layout_entry(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("liquid pipeline layout"),
            bind_group_layouts: &[uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let pipeline = create_fullscreen_pipeline(
            device,
            "liquid pipeline",
            &pipeline_layout,
            vertex_module,
            &fragment_module,
            format,
            wgpu::BlendState::REPLACE,
        );

        let uniforms = LiquidUniforms::new(config.liquid.strength, config.liquid.wobble_speed);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("liquid uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("liquid uniform bind group"),
            layout: uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let trail_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pointer trail texture"),
            size: wgpu::Extent3d {
                width: TRAIL_SIZE,
                height: TRAIL_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let trail_view = trail_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (scene_texture, scene_view) = create_scene_target(device, format, size);
        let texture_bind_group = create_texture_bind_group(
            device,
            &texture_layout,
            &scene_view,
            &trail_view,
            &sampler,
        );

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            texture_layout,
            texture_bind_group,
            scene_texture,
            scene_view,
            trail_texture,
            trail_view,
            sampler,
        }
    }

    /// Recreates the offscreen scene target and rebinds it.
    fn resize(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat, size: PhysicalSize<u32>) {
        let (scene_texture, scene_view) = create_scene_target(device, format, size);
        self.scene_texture = scene_texture;
        self.scene_view = scene_view;
        self.texture_bind_group = create_texture_bind_group(
            device,
            &self.texture_layout,
            &self.scene_view,
            &self.trail_view,
            &self.sampler,
        );
    }

    /// Pushes a freshly redrawn trail bitmap to the GPU.
    fn upload_trail(&self, queue: &wgpu::Queue, pixels: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.trail_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(TRAIL_SIZE * 4),
                rows_per_image: Some(TRAIL_SIZE),
            },
            wgpu::Extent3d {
                width: TRAIL_SIZE,
                height: TRAIL_SIZE,
                depth_or_array_layers: 1,
            },
        );
    }
}

fn pick_alpha_mode(
    available: &[wgpu::CompositeAlphaMode],
    transparent: bool,
) -> wgpu::CompositeAlphaMode {
    let preferred: &[wgpu::CompositeAlphaMode] = if transparent {
        &[
            wgpu::CompositeAlphaMode::PostMultiplied,
            wgpu::CompositeAlphaMode::PreMultiplied,
        ]
    } else {
        &[wgpu::CompositeAlphaMode::Opaque]
    };
    preferred
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(available[0])
}

fn texture_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_scene_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("liquid scene target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    scene_view: &wgpu::TextureView,
    trail_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("liquid texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(scene_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(trail_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}
