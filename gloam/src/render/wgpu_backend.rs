use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{
    vertex_attr_array, AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry,
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource,
    BindingType, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DeviceDescriptor, Extent3d, FilterMode, FragmentState, Instance,
    LoadOp, MultisampleState, Operations, Origin3d, PipelineLayoutDescriptor, PrimitiveState,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    RequestAdapterOptions, SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor,
    ShaderSource, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureView, TextureViewDescriptor, TextureViewDimension, VertexState,
};

use super::device::{DrawRun, GraphicsDevice};
use super::quad::{QuadVertex, TextureHandle, TextureInfo, VERTICES_PER_QUAD};
use crate::math::Camera;

/// Color used for handles the device does not know about.
const MISSING_TEXTURE_RGBA: [u8; 4] = [255, 0, 255, 255];

struct TextureEntry {
    /// The underlying GPU texture. Must be kept alive for the bind group to be valid.
    _texture: Texture,
    bind_group: BindGroup,
    size: (u32, u32),
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

/// [`GraphicsDevice`] backed by wgpu.
///
/// A single vertex transfer buffer is rewritten for every draw run, so each
/// run is uploaded and drawn in its own submission. Runs are drawn on top of
/// whatever the current target already holds.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    blended_pipeline: RenderPipeline,
    opaque_pipeline: RenderPipeline,
    texture_layout: BindGroupLayout,
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
    vertex_buffer: Buffer,
    vertex_capacity: usize,
    textures: HashMap<TextureHandle, TextureEntry>,
    missing_texture: TextureEntry,
    warned_handles: HashSet<TextureHandle>,
    next_texture_id: u32,
    target: Option<TextureView>,
    target_size: (u32, u32),
    offscreen: Option<Texture>,
    blending: bool,
}

impl WgpuDevice {
    /// Wrap an existing device. `format` is the format of the targets that
    /// will be passed to [`set_target`](Self::set_target).
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: TextureFormat,
        max_quads_per_batch: usize,
    ) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("quad-shader"),
            source: ShaderSource::Wgsl(include_str!("quad.wgsl").into()),
        });

        let camera_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("camera-bind-group-layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<CameraUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("quad-texture-bind-group-layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("quad-pipeline-layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            immediate_size: 0,
        });

        let blended_pipeline = create_quad_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::BlendState::ALPHA_BLENDING,
        );
        let opaque_pipeline = create_quad_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::BlendState::REPLACE,
        );

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera-uniform-buffer"),
            contents: bytemuck::bytes_of(&CameraUniforms {
                view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("camera-bind-group"),
            layout: &camera_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let vertex_capacity = max_quads_per_batch.max(1) * VERTICES_PER_QUAD;
        let vertex_buffer = create_vertex_buffer(&device, vertex_capacity);

        let missing_texture = upload_rgba(
            &device,
            &queue,
            &texture_layout,
            &MISSING_TEXTURE_RGBA,
            1,
            1,
        );

        Self {
            device,
            queue,
            blended_pipeline,
            opaque_pipeline,
            texture_layout,
            camera_buffer,
            camera_bind_group,
            vertex_buffer,
            vertex_capacity,
            textures: HashMap::new(),
            missing_texture,
            warned_handles: HashSet::new(),
            next_texture_id: 1,
            target: None,
            target_size: (1, 1),
            offscreen: None,
            blending: false,
        }
    }

    /// Create a device that renders into an offscreen RGBA texture.
    pub fn headless(width: u32, height: u32, max_quads_per_batch: usize) -> Result<Self> {
        let instance = Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("gloam-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        }))?;

        let format = TextureFormat::Rgba8UnormSrgb;
        let mut this = Self::new(device, queue, format, max_quads_per_batch);

        let (width, height) = (width.max(1), height.max(1));
        let target = this.device.create_texture(&TextureDescriptor {
            label: Some("offscreen-target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT
                | TextureUsages::COPY_SRC
                | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = target.create_view(&TextureViewDescriptor::default());
        this.set_target(view, width, height);
        this.offscreen = Some(target);
        Ok(this)
    }

    /// Render into `view` from now on.
    pub fn set_target(&mut self, view: TextureView, width: u32, height: u32) {
        self.target = Some(view);
        self.target_size = (width.max(1), height.max(1));
    }

    /// The offscreen texture of a headless device.
    pub fn offscreen_texture(&self) -> Option<&Texture> {
        self.offscreen.as_ref()
    }

    pub fn set_camera(&mut self, camera: &Camera) {
        let (width, height) = self.target_size;
        let uniforms = CameraUniforms {
            view_proj: camera.view_projection(width, height).to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn clear(&mut self, color: [f32; 4]) -> Result<()> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| anyhow!("No render target set"))?;
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("clear-encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("clear-pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Decode an encoded image (PNG) and upload it.
    pub fn load_texture_from_bytes(&mut self, bytes: &[u8]) -> Result<TextureInfo> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        self.load_texture_from_rgba(&image, width, height)
    }

    /// Upload raw RGBA8 pixels. `data` must be `width * height * 4` bytes.
    pub fn load_texture_from_rgba(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureInfo> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(anyhow!(
                "Texture data is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            ));
        }

        let entry = upload_rgba(
            &self.device,
            &self.queue,
            &self.texture_layout,
            data,
            width,
            height,
        );
        let handle = TextureHandle(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(handle, entry);
        Ok(TextureInfo::new(handle, width, height))
    }

    pub fn texture_info(&self, handle: TextureHandle) -> Option<TextureInfo> {
        self.textures
            .get(&handle)
            .map(|entry| TextureInfo::new(handle, entry.size.0, entry.size.1))
    }

    fn ensure_vertex_capacity(&mut self, vertices: usize) {
        if vertices <= self.vertex_capacity {
            return;
        }
        self.vertex_capacity = vertices.next_power_of_two();
        self.vertex_buffer = create_vertex_buffer(&self.device, self.vertex_capacity);
    }
}

impl GraphicsDevice for WgpuDevice {
    fn draw_run(&mut self, run: DrawRun<'_>) -> Result<()> {
        if run.vertices.is_empty() {
            return Ok(());
        }
        self.ensure_vertex_capacity(run.vertices.len());

        let target = self
            .target
            .as_ref()
            .ok_or_else(|| anyhow!("No render target set"))?;

        let texture = match self.textures.get(&run.texture) {
            Some(entry) => entry,
            None => {
                if self.warned_handles.insert(run.texture) {
                    log::warn!("{:?} is not loaded, drawing the missing texture", run.texture);
                }
                &self.missing_texture
            }
        };

        let bytes: &[u8] = bytemuck::cast_slice(run.vertices);
        self.queue.write_buffer(&self.vertex_buffer, 0, bytes);

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("quad-run-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("quad-run-pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let pipeline = if self.blending {
                &self.blended_pipeline
            } else {
                &self.opaque_pipeline
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_bind_group(1, &texture.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(0..bytes.len() as u64));
            pass.draw(0..run.vertices.len() as u32, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertices: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quad-vertex-buffer"),
        size: (vertices * std::mem::size_of::<QuadVertex>()) as u64,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &BindGroupLayout,
    data: &[u8],
    width: u32,
    height: u32,
) -> TextureEntry {
    let size = Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&TextureDescriptor {
        label: Some("quad-texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: Origin3d::ZERO,
            aspect: TextureAspect::All,
        },
        data,
        TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&TextureViewDescriptor::default());
    // Tiles are pixel art; nearest keeps their edges crisp.
    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some("quad-sampler"),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        address_mode_w: AddressMode::ClampToEdge,
        mag_filter: FilterMode::Nearest,
        min_filter: FilterMode::Nearest,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("quad-texture-bind-group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&view),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&sampler),
            },
        ],
    });

    TextureEntry {
        _texture: texture,
        bind_group,
        size: (width, height),
    }
}

fn create_quad_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: TextureFormat,
    blend: wgpu::BlendState,
) -> RenderPipeline {
    let attributes = vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x4];
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("quad-pipeline"),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
