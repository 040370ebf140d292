pub mod batch;
pub mod pipeline;

use std::sync::Arc;

use glam::{Mat4, Vec3};
use winit::window::Window;

use self::batch::QuadBatch;
use self::pipeline::{CoverPipeline, CoverTexture, DEPTH_FORMAT};
use crate::config::{ProjectionConfig, SliderConfig};
use crate::cover::CoverImage;
use crate::error::StartupError;
use crate::projection::{aspect_ratio, Frustum};
use crate::scene::Corner;

/// Region of the surface the covers are drawn into, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Clip to a `surface_w` x `surface_h` target, keeping at least one pixel.
    pub fn clamped(self, surface_w: u32, surface_h: u32) -> Self {
        let x = self.x.min(surface_w.saturating_sub(1));
        let y = self.y.min(surface_h.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.clamp(1, (surface_w - x).max(1)),
            height: self.height.clamp(1, (surface_h - y).max(1)),
        }
    }
}

/// Remembers which drawing area the projection and texture were last built
/// for. A surface resize forgets it, so the next request always reprojects.
#[derive(Debug, Clone, Copy)]
pub struct ViewportTracker {
    configured: Option<Viewport>,
    surface_w: u32,
    surface_h: u32,
}

impl ViewportTracker {
    pub fn new(surface_w: u32, surface_h: u32) -> Self {
        Self {
            configured: None,
            surface_w,
            surface_h,
        }
    }

    pub fn resize(&mut self, surface_w: u32, surface_h: u32) {
        self.surface_w = surface_w;
        self.surface_h = surface_h;
        self.configured = None;
    }

    pub fn invalidate(&mut self) {
        self.configured = None;
    }

    /// Clip `requested` to the surface. Returns the viewport to configure,
    /// or None when it matches the one already configured.
    pub fn update(&mut self, requested: Viewport) -> Option<Viewport> {
        let viewport = requested.clamped(self.surface_w, self.surface_h);
        if self.configured == Some(viewport) {
            return None;
        }
        self.configured = Some(viewport);
        Some(viewport)
    }

    pub fn current(&self) -> Option<Viewport> {
        self.configured
    }
}

/// Core GPU state — device, queue, surface, cover pipeline.
pub struct GpuState {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pipeline: CoverPipeline,
    texture: Option<CoverTexture>,
    depth_view: wgpu::TextureView,
    batch: QuadBatch,
    viewport: ViewportTracker,
    projection: ProjectionConfig,
    clear_pending: bool,
}

/// Intermediate frame state returned by `begin_frame`.
pub struct FrameContext {
    pub output: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl GpuState {
    /// Initialize wgpu and the cover pipeline for a cover of
    /// `cover_w` x `cover_h`.
    pub fn new(
        window: Arc<Window>,
        config: &SliderConfig,
        cover_w: u32,
        cover_h: u32,
    ) -> Result<Self, StartupError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        log::info!(
            "GPU adapter: {:?} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("coverslide_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
        ))?;

        let max = device.limits().max_texture_dimension_2d;
        if cover_w > max || cover_h > max {
            return Err(StartupError::CoverTooLarge {
                width: cover_w,
                height: cover_h,
                max,
            });
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| **f == wgpu::TextureFormat::Bgra8UnormSrgb)
            .or_else(|| surface_caps.formats.iter().find(|f| f.is_srgb()))
            .or(surface_caps.formats.first())
            .copied()
            .ok_or(StartupError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Surface: format={:?}, alpha_mode={:?}", format, alpha_mode);

        // Frames are only drawn on request, so vsync costs nothing here.
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let pipeline = CoverPipeline::new(&device, format, &config.lighting);
        let depth_view = create_depth_view(&device, surface_config.width, surface_config.height);

        let viewport = ViewportTracker::new(surface_config.width, surface_config.height);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            pipeline,
            texture: None,
            depth_view,
            batch: QuadBatch::new(),
            viewport,
            projection: config.projection,
            clear_pending: false,
        })
    }

    /// Resize the surface and its depth attachment.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, width, height);
        self.viewport.resize(width, height);
    }

    /// The drawing area changed: recompute projection and modelview, and
    /// reallocate the cover texture. No-op when nothing moved.
    pub fn configure_viewport(&mut self, viewport: Viewport, cover_w: u32, cover_h: u32) {
        if self.texture.is_none() {
            self.viewport.invalidate();
        }
        let Some(viewport) = self.viewport.update(viewport) else {
            return;
        };

        let p = self.projection;
        let frustum = Frustum::from_fov(
            p.fov_y,
            aspect_ratio(viewport.width, viewport.height),
            p.near,
            p.far,
        );
        self.pipeline.set_projection(frustum.to_matrix());
        self.batch
            .set_base(Mat4::from_translation(Vec3::new(0.0, 0.0, -p.eye_distance)));

        if let Some(old) = self.texture.take() {
            old.texture.destroy();
        }
        self.texture = Some(CoverTexture::new(&self.device, &self.pipeline, cover_w, cover_h));
        self.pipeline.set_texture_size(cover_w, cover_h);
        self.pipeline.write_uniforms(&self.queue);

        log::debug!(
            "Viewport {}x{} at ({}, {})",
            viewport.width,
            viewport.height,
            viewport.x,
            viewport.y
        );
    }

    /// Destroy the cover texture. Safe to call more than once; only the
    /// first call releases anything.
    pub fn release_texture(&mut self) {
        if let Some(tex) = self.texture.take() {
            tex.texture.destroy();
            self.viewport.invalidate();
            log::info!("Cover texture released");
        }
    }

    pub fn clear(&mut self) {
        self.clear_pending = true;
        self.batch.begin();
    }

    pub fn upload_texture(&mut self, cover: &CoverImage) {
        match &self.texture {
            Some(tex) if tex.width == cover.width && tex.height == cover.height => {
                tex.upload(&self.queue, cover);
            }
            Some(_) => log::warn!("Cover size changed without a viewport reconfigure"),
            None => log::warn!("No cover texture allocated yet, skipping upload"),
        }
    }

    pub fn push_matrix(&mut self) {
        self.batch.push_matrix();
    }

    pub fn pop_matrix(&mut self) {
        self.batch.pop_matrix();
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.batch.translate(offset);
    }

    pub fn rotate(&mut self, degrees: f32, axis: Vec3) {
        self.batch.rotate(degrees, axis);
    }

    pub fn quad(&mut self, corners: &[Corner; 4]) {
        self.batch.quad(corners);
    }

    /// Acquire the next surface texture and create a command encoder.
    /// Returns None if the surface is lost/outdated (caller should skip this frame).
    pub fn begin_frame(&self) -> Option<FrameContext> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface
                    .configure(&self.device, &self.surface_config);
                return None;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                return None;
            }
            Err(e) => {
                log::warn!("Surface error: {e:?}");
                return None;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        Some(FrameContext {
            output,
            view,
            encoder,
        })
    }

    /// Upload the batched quads and draw them into the drawing area.
    pub fn draw_covers(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        if self.batch.stack_depth() != 0 {
            log::warn!("Frame ended with {} pushed matrices", self.batch.stack_depth());
        }
        self.pipeline
            .update_geometry(&self.queue, self.batch.vertices(), self.batch.indices());

        let (color_load, depth_load) = if std::mem::take(&mut self.clear_pending) {
            (wgpu::LoadOp::Clear(wgpu::Color::BLACK), wgpu::LoadOp::Clear(1.0))
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cover_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let (Some(tex), Some(vp)) = (&self.texture, self.viewport.current()) else {
            return;
        };
        let p = &self.pipeline;
        if p.num_indices == 0 {
            return;
        }
        render_pass.set_viewport(
            vp.x as f32,
            vp.y as f32,
            vp.width as f32,
            vp.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_pipeline(&p.pipeline);
        render_pass.set_bind_group(0, &tex.bind_group, &[]);
        render_pass.set_vertex_buffer(0, p.vertex_buffer.slice(..));
        render_pass.set_index_buffer(p.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..p.num_indices, 0, 0..1);
    }

    /// Create an egui render pass that preserves existing content (LoadOp::Load).
    /// Returns a 'static render pass suitable for egui_wgpu::Renderer::render().
    pub fn begin_overlay_pass(
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'static> {
        let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("controls_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.forget_lifetime()
    }

    /// Submit the command encoder and present.
    pub fn finish_frame(
        &self,
        encoder: wgpu::CommandEncoder,
        output: wgpu::SurfaceTexture,
        extra_cmd_bufs: Vec<wgpu::CommandBuffer>,
    ) {
        self.queue.submit(
            extra_cmd_bufs
                .into_iter()
                .chain(std::iter::once(encoder.finish())),
        );
        output.present();
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_inside_surface_is_untouched() {
        let vp = Viewport {
            x: 0,
            y: 40,
            width: 320,
            height: 240,
        };
        assert_eq!(vp.clamped(320, 344), vp);
    }

    #[test]
    fn viewport_is_clipped_to_surface() {
        let vp = Viewport {
            x: 10,
            y: 40,
            width: 500,
            height: 500,
        };
        assert_eq!(
            vp.clamped(200, 100),
            Viewport {
                x: 10,
                y: 40,
                width: 190,
                height: 60,
            }
        );
    }

    #[test]
    fn viewport_never_collapses() {
        let vp = Viewport {
            x: 300,
            y: 300,
            width: 0,
            height: 0,
        };
        let clipped = vp.clamped(100, 100);
        assert_eq!((clipped.x, clipped.y), (99, 99));
        assert_eq!((clipped.width, clipped.height), (1, 1));
    }

    fn area(x: u32, y: u32, width: u32, height: u32) -> Viewport {
        Viewport {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn same_area_is_configured_once() {
        let mut tracker = ViewportTracker::new(320, 344);
        assert_eq!(tracker.update(area(0, 40, 320, 240)), Some(area(0, 40, 320, 240)));
        assert_eq!(tracker.update(area(0, 40, 320, 240)), None);
        assert_eq!(tracker.current(), Some(area(0, 40, 320, 240)));
    }

    #[test]
    fn width_only_shrink_reconfigures() {
        let mut tracker = ViewportTracker::new(320, 344);
        tracker.update(area(0, 40, 320, 240));

        tracker.resize(200, 344);
        let next = tracker.update(area(0, 40, 200, 240));
        assert_eq!(next, Some(area(0, 40, 200, 240)));

        let vp = next.unwrap();
        assert_eq!(aspect_ratio(vp.width, vp.height), 200.0 / 240.0);
    }

    #[test]
    fn height_only_change_reconfigures() {
        let mut tracker = ViewportTracker::new(320, 344);
        tracker.update(area(0, 40, 320, 240));

        tracker.resize(320, 424);
        assert_eq!(tracker.update(area(0, 40, 320, 320)), Some(area(0, 40, 320, 320)));
    }

    #[test]
    fn resize_forgets_even_an_unchanged_area() {
        let mut tracker = ViewportTracker::new(320, 344);
        tracker.update(area(0, 40, 320, 240));

        tracker.resize(320, 344);
        assert_eq!(tracker.current(), None);
        assert!(tracker.update(area(0, 40, 320, 240)).is_some());
    }

    #[test]
    fn invalidate_forces_reconfigure() {
        let mut tracker = ViewportTracker::new(320, 344);
        tracker.update(area(0, 40, 320, 240));
        tracker.invalidate();
        assert!(tracker.update(area(0, 40, 320, 240)).is_some());
    }
}
