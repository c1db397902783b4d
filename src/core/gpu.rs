//! GPU backend using wgpu for the shader field.
//!
//! The plasma quad is rendered by a full-screen pass into an offscreen
//! texture and read back into a [`Framebuffer`]. Any geometry in the frame is
//! composited over it by the software rasterizer.
//!
//! Enable with the `gpu` feature flag.

use std::borrow::Cow;
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::raster::{composite, Framebuffer};
use crate::render::{DrawPrimitive, Frame, RenderBackend};
use crate::shader::{ShaderUniforms, PLASMA_SHADER};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Error type for GPU operations.
#[derive(Debug)]
pub enum GpuError {
    /// No adapter matched the request.
    NoAdapter,
    /// The adapter refused to open a device.
    Device(wgpu::RequestDeviceError),
    /// Failed to receive result from GPU.
    ReceiveError,
    /// GPU buffer mapping failed.
    MapError(wgpu::BufferAsyncError),
    /// Requested target exceeds the device's texture limit.
    SizeExceeded { requested: u32, max: u32 },
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No GPU adapter available"),
            GpuError::Device(e) => write!(f, "GPU device request failed: {}", e),
            GpuError::ReceiveError => write!(f, "Failed to receive GPU result"),
            GpuError::MapError(e) => write!(f, "GPU buffer mapping failed: {:?}", e),
            GpuError::SizeExceeded { requested, max } => {
                write!(f, "Requested {}px target exceeds max {}px", requested, max)
            }
        }
    }
}

impl std::error::Error for GpuError {}

/// Device, queue and the plasma pipeline.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    max_dimension: u32,
}

impl GpuContext {
    /// Create a new GPU context. Blocks until GPU is ready.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Agesphere GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(GpuError::Device)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Plasma Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(PLASMA_SHADER)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Plasma Bind Group Layout"),
            entries: &[
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Plasma Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Plasma Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        let max_dimension = device.limits().max_texture_dimension_2d;

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            max_dimension,
        })
    }

    /// Render the plasma field at `width x height` and read it back as RGBA8.
    pub fn render_field(
        &self,
        uniforms: &ShaderUniforms,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, GpuError> {
        let largest = width.max(height);
        if largest > self.max_dimension {
            return Err(GpuError::SizeExceeded {
                requested: largest,
                max: self.max_dimension,
            });
        }
        let (width, height) = (width.max(1), height.max(1));

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Plasma Target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Plasma Uniforms"),
                contents: bytemuck::bytes_of(uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        // Rows in a texture-to-buffer copy must be 256-byte aligned.
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        // Staging buffer for readback
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Plasma Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Plasma Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Plasma Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            // Fullscreen triangle
            pass.draw(0..3, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        // Read back results
        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        let map_result = rx.recv().map_err(|_| GpuError::ReceiveError)?;
        map_result.map_err(GpuError::MapError)?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        staging_buffer.unmap();
        Ok(pixels)
    }
}

/// Shader field on the GPU, geometry on the CPU.
pub struct GpuBackend {
    ctx: GpuContext,
    framebuffer: Framebuffer,
}

impl GpuBackend {
    pub fn new(width: u32, height: u32) -> Result<Self, GpuError> {
        Ok(Self {
            ctx: GpuContext::new()?,
            framebuffer: Framebuffer::new(width, height),
        })
    }
}

impl RenderBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn submit(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let vp = frame.viewport();
        if vp.width != self.framebuffer.width || vp.height != self.framebuffer.height {
            self.framebuffer = Framebuffer::new(vp.width, vp.height);
        }
        self.framebuffer.clear(frame.clear);

        let mut geometry = frame.clone();
        geometry
            .primitives
            .retain(|p| !matches!(p, DrawPrimitive::FullscreenQuad { .. }));

        for prim in &frame.primitives {
            if let DrawPrimitive::FullscreenQuad { uniforms } = prim {
                let pixels = self.ctx.render_field(uniforms, vp.width, vp.height)?;
                accept_readback(&mut self.framebuffer, pixels)?;
            }
        }
        composite(&mut self.framebuffer, &geometry);
        Ok(())
    }

    fn framebuffer(&self) -> Option<&Framebuffer> {
        Some(&self.framebuffer)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.framebuffer.width, self.framebuffer.height) {
            self.framebuffer = Framebuffer::new(width, height);
        }
    }
}

/// Replace the framebuffer contents with a read-back field of the same size.
fn accept_readback(fb: &mut Framebuffer, pixels: Vec<u8>) -> Result<(), RenderError> {
    if pixels.len() != fb.pixels.len() {
        let actual = pixels.len() / 4;
        let actual_w = if fb.height > 0 { (actual / fb.height as usize) as u32 } else { 0 };
        return Err(RenderError::SizeMismatch {
            expected_w: fb.width,
            expected_h: fb.height,
            actual_w,
            actual_h: fb.height,
        });
    }
    fb.pixels = pixels;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use crate::params::ShaderParams;

    #[test]
    fn short_readback_is_a_size_mismatch() {
        let mut fb = Framebuffer::new(4, 2);
        fb.clear([0.0, 0.0, 1.0, 1.0]);
        let err = accept_readback(&mut fb, vec![0; 3 * 2 * 4]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::SizeMismatch {
                expected_w: 4,
                actual_w: 3,
                ..
            }
        ));
        assert_eq!(fb.pixel(0, 0), [0, 0, 255, 255]);

        accept_readback(&mut fb, vec![7; 4 * 2 * 4]).unwrap();
        assert_eq!(fb.pixel(3, 1), [7, 7, 7, 7]);
    }

    #[test]
    fn gpu_field_alpha_matches_opacity() {
        // This test may fail on systems without GPU support
        let ctx = match GpuContext::new() {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("No GPU available (expected in some CI environments): {e}");
                return;
            }
        };
        let uniforms = ShaderUniforms::new(&ShaderParams::default(), 1.0, Viewport::new(70, 9));
        let pixels = ctx.render_field(&uniforms, 70, 9).unwrap();
        assert_eq!(pixels.len(), 70 * 9 * 4);
        assert!(pixels.chunks_exact(4).all(|px| px[3] == 153));
    }
}
