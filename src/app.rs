use std::sync::Arc;

use glam::Vec3;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::animation::{Animator, Motion};
use crate::config::SliderConfig;
use crate::controls::{ControlAction, ControlPanel, OverlayPaint};
use crate::cover::CoverImage;
use crate::error::StartupError;
use crate::render::GpuState;
use crate::scene::{self, Canvas, Corner};

/// Top-level application state.
struct App {
    config: SliderConfig,
    cover: CoverImage,
    animator: Animator,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    controls: Option<ControlPanel>,

    /// Set when startup fails inside the event loop.
    fatal: Option<StartupError>,
}

impl App {
    fn new(config: SliderConfig, cover: CoverImage) -> Self {
        let animator = Animator::new(&config);
        Self {
            config,
            cover,
            animator,
            window: None,
            gpu: None,
            controls: None,
            fatal: None,
        }
    }

    /// Create the window, wgpu state and control panel.
    fn realize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), StartupError> {
        let monitor_scale = event_loop
            .primary_monitor()
            .map_or(1.0, |m| m.scale_factor());
        let attrs = WindowAttributes::default()
            .with_title(self.config.window_title.as_str())
            .with_visible(false)
            .with_inner_size(self.window_size(monitor_scale));

        let window = Arc::new(event_loop.create_window(attrs)?);
        if window.scale_factor() != monitor_scale {
            let _ = window.request_inner_size(self.window_size(window.scale_factor()));
        }
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        let gpu = GpuState::new(window.clone(), &self.config, self.cover.width, self.cover.height)?;
        log::info!("wgpu + cover pipeline initialized");

        let controls = ControlPanel::new(&window, &gpu, &self.config.window_title);

        window.set_visible(true);
        window.request_redraw();

        self.gpu = Some(gpu);
        self.controls = Some(controls);
        self.window = Some(window);
        Ok(())
    }

    fn window_size(&self, scale_factor: f64) -> PhysicalSize<u32> {
        window_size(
            self.cover.width,
            self.cover.height,
            self.config.title_height + self.config.controls_height,
            scale_factor,
        )
    }

    fn redraw(&mut self) {
        let (Some(window), Some(gpu), Some(controls)) =
            (&self.window, &mut self.gpu, &mut self.controls)
        else {
            return;
        };

        let frame = controls.run_frame(
            window,
            gpu.surface_config.width,
            gpu.surface_config.height,
        );

        let now = Instant::now();
        for action in &frame.actions {
            apply_action(&mut self.animator, *action, now);
        }

        gpu.configure_viewport(frame.drawing_area, self.cover.width, self.cover.height);

        let mut canvas = FrameCanvas {
            gpu,
            controls,
            overlay: Some(frame.paint),
        };
        scene::draw_frame(&mut canvas, &self.animator.state(), &self.cover);
    }

    /// Tear down on window close. The texture goes first, exactly once.
    fn close(&mut self) {
        if let Some(gpu) = &mut self.gpu {
            gpu.release_texture();
        }
        self.controls = None;
        self.gpu = None;
    }
}

/// Inner window size in physical pixels: the cover at one texel per pixel,
/// plus the panels' logical height scaled to the display.
fn window_size(
    cover_w: u32,
    cover_h: u32,
    panels_height: f64,
    scale_factor: f64,
) -> PhysicalSize<u32> {
    let panels = (panels_height * scale_factor).round() as u32;
    PhysicalSize::new(cover_w, cover_h + panels)
}

/// Route one button press into the animator.
fn apply_action(animator: &mut Animator, action: ControlAction, now: Instant) {
    match action {
        ControlAction::Rotate(direction) => animator.start(Motion::Rotation, direction, now),
        ControlAction::Translate(direction) => animator.start(Motion::Translation, direction, now),
        ControlAction::Center => animator.reset(),
    }
}

/// Canvas for one frame: geometry goes to the GPU batch, and `present`
/// draws the covers, lays the control panel over them and presents.
struct FrameCanvas<'a> {
    gpu: &'a mut GpuState,
    controls: &'a mut ControlPanel,
    overlay: Option<OverlayPaint>,
}

impl Canvas for FrameCanvas<'_> {
    fn clear(&mut self) {
        self.gpu.clear();
    }

    fn upload_texture(&mut self, cover: &CoverImage) {
        self.gpu.upload_texture(cover);
    }

    fn push_matrix(&mut self) {
        self.gpu.push_matrix();
    }

    fn pop_matrix(&mut self) {
        self.gpu.pop_matrix();
    }

    fn translate(&mut self, offset: Vec3) {
        self.gpu.translate(offset);
    }

    fn rotate(&mut self, degrees: f32, axis: Vec3) {
        self.gpu.rotate(degrees, axis);
    }

    fn quad(&mut self, corners: &[Corner; 4]) {
        self.gpu.quad(corners);
    }

    fn present(&mut self) {
        let Some(mut frame) = self.gpu.begin_frame() else {
            return;
        };

        self.gpu.draw_covers(&mut frame.encoder, &frame.view);

        let mut extra_cmd_bufs = Vec::new();
        if let Some(paint) = &self.overlay {
            extra_cmd_bufs = self.controls.prepare(
                &self.gpu.device,
                &self.gpu.queue,
                &mut frame.encoder,
                paint,
            );
            let mut pass = GpuState::begin_overlay_pass(&mut frame.encoder, &frame.view);
            self.controls.render(&mut pass, paint);
        }

        self.gpu
            .finish_frame(frame.encoder, frame.output, extra_cmd_bufs);

        if let Some(paint) = self.overlay.take() {
            self.controls.free_textures(&paint);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.realize(event_loop) {
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.animator.poll(Instant::now());

        if self.animator.take_redraw() {
            if let Some(w) = &self.window {
                w.request_redraw();
            }
        }

        match self.animator.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(window), Some(controls)) = (&self.window, &mut self.controls) {
            if controls.on_window_event(window, &event).repaint {
                window.request_redraw();
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                self.close();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Entry point — load the cover, create event loop and run.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = SliderConfig::default();
    let cover = CoverImage::load(&config.image_path)?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, cover);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.fatal.take() {
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Direction;

    #[test]
    fn buttons_drive_the_animator() {
        let mut anim = Animator::new(&SliderConfig::default());
        let now = Instant::now();

        apply_action(&mut anim, ControlAction::Rotate(Direction::LEFT), now);
        assert!(anim.is_animating());
        assert_eq!(anim.state().direction, Direction::Negative);

        apply_action(&mut anim, ControlAction::Translate(Direction::FORWARD), now);
        assert_eq!(anim.state().direction, Direction::Positive);

        anim.tick(Motion::Rotation);
        anim.tick(Motion::Translation);
        apply_action(&mut anim, ControlAction::Center, now);
        assert_eq!(anim.state().angle, 0.0);
        assert_eq!(anim.state().offset, 0.0);
        assert!(!anim.is_animating());
    }

    #[test]
    fn cover_keeps_its_pixel_size_on_hidpi() {
        assert_eq!(window_size(256, 256, 104.0, 1.0), PhysicalSize::new(256, 360));
        assert_eq!(window_size(256, 256, 104.0, 2.0), PhysicalSize::new(256, 464));
        assert_eq!(window_size(320, 240, 104.0, 1.5), PhysicalSize::new(320, 396));
    }
}
