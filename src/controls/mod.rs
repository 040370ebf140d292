use winit::window::Window;

use crate::animation::Direction;
use crate::render::{GpuState, Viewport};

/// What a button press asks the slider to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Rotate(Direction),
    Translate(Direction),
    /// Both "Center" buttons.
    Center,
}

/// Tessellated egui output waiting to be drawn over the covers.
pub struct OverlayPaint {
    pub primitives: Vec<egui::epaint::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub screen_descriptor: egui_wgpu::ScreenDescriptor,
}

/// Result of one control-panel frame.
pub struct ControlFrame {
    /// Buttons clicked this frame, in click order.
    pub actions: Vec<ControlAction>,
    /// Space left between the title and the button rows.
    pub drawing_area: Viewport,
    pub paint: OverlayPaint,
}

/// Title label and the rotation/translation button rows, powered by egui.
pub struct ControlPanel {
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    title: String,
}

impl ControlPanel {
    pub fn new(window: &Window, gpu: &GpuState, title: &str) -> Self {
        let egui_ctx = egui::Context::default();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            title: title.to_string(),
        }
    }

    /// Forward a winit event to egui.
    pub fn on_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Lay out the panels, collect clicks and tessellate.
    pub fn run_frame(&mut self, window: &Window, screen_w: u32, screen_h: u32) -> ControlFrame {
        let raw_input = self.egui_state.take_egui_input(window);

        let mut actions = Vec::new();
        let mut area = egui::Rect::NOTHING;
        let title = self.title.as_str();

        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| {
            actions.clear();
            area = draw_controls(ctx, title, &mut actions);
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(full_output.shapes, pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [screen_w, screen_h],
            pixels_per_point,
        };

        ControlFrame {
            actions,
            drawing_area: drawing_area(area, pixels_per_point),
            paint: OverlayPaint {
                primitives,
                textures_delta: full_output.textures_delta,
                screen_descriptor,
            },
        }
    }

    /// Upload egui textures and buffers. Call before the overlay render pass.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        paint: &OverlayPaint,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &paint.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            device,
            queue,
            encoder,
            &paint.primitives,
            &paint.screen_descriptor,
        )
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'static>, paint: &OverlayPaint) {
        self.egui_renderer
            .render(render_pass, &paint.primitives, &paint.screen_descriptor);
    }

    /// Free textures after present.
    pub fn free_textures(&mut self, paint: &OverlayPaint) {
        for id in &paint.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

/// Title on top, two button rows at the bottom. Returns the rect left for
/// the covers.
fn draw_controls(ctx: &egui::Context, title: &str, actions: &mut Vec<ControlAction>) -> egui::Rect {
    egui::TopBottomPanel::top("title").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(title).size(18.0).strong());
        });
    });

    egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
        for row in &ROWS {
            control_row(ui, row, actions);
        }
    });

    let mut area = egui::Rect::NOTHING;
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            area = ui.max_rect();
        });
    area
}

/// One button row and what its Left and Right buttons send.
struct ControlRow {
    label: &'static str,
    left: ControlAction,
    right: ControlAction,
}

const ROWS: [ControlRow; 2] = [
    ControlRow {
        label: "Rotation",
        left: ControlAction::Rotate(Direction::LEFT),
        right: ControlAction::Rotate(Direction::RIGHT),
    },
    ControlRow {
        label: "Translation",
        left: ControlAction::Translate(Direction::BACK),
        right: ControlAction::Translate(Direction::FORWARD),
    },
];

/// One homogeneous row: label, Left, Center, Right.
fn control_row(ui: &mut egui::Ui, row: &ControlRow, actions: &mut Vec<ControlAction>) {
    ui.columns(4, |cols| {
        cols[0].label(egui::RichText::new(row.label).strong());
        if cols[1].button("Left").clicked() {
            actions.push(row.left);
        }
        if cols[2].button("Center").clicked() {
            actions.push(ControlAction::Center);
        }
        if cols[3].button("Right").clicked() {
            actions.push(row.right);
        }
    });
}

/// Convert an egui rect in points to a pixel viewport.
fn drawing_area(rect: egui::Rect, pixels_per_point: f32) -> Viewport {
    if !rect.is_positive() {
        return Viewport {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
    }
    Viewport {
        x: (rect.min.x * pixels_per_point).round() as u32,
        y: (rect.min.y * pixels_per_point).round() as u32,
        width: (rect.width() * pixels_per_point).round().max(1.0) as u32,
        height: (rect.height() * pixels_per_point).round().max(1.0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_area_scales_by_pixels_per_point() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 40.0), egui::vec2(320.0, 240.0));
        assert_eq!(
            drawing_area(rect, 2.0),
            Viewport {
                x: 0,
                y: 80,
                width: 640,
                height: 480,
            }
        );
    }

    #[test]
    fn translation_row_moves_back_and_forward() {
        let [rotation, translation] = &ROWS;
        assert_eq!(rotation.left, ControlAction::Rotate(Direction::LEFT));
        assert_eq!(rotation.right, ControlAction::Rotate(Direction::RIGHT));
        assert_eq!(translation.left, ControlAction::Translate(Direction::BACK));
        assert_eq!(translation.right, ControlAction::Translate(Direction::FORWARD));
    }

    #[test]
    fn empty_area_becomes_one_pixel() {
        let vp = drawing_area(egui::Rect::NOTHING, 1.0);
        assert_eq!((vp.width, vp.height), (1, 1));
    }

    #[test]
    fn panels_leave_room_for_covers() {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(320.0, 344.0),
            )),
            ..Default::default()
        };

        let mut actions = Vec::new();
        let mut area = egui::Rect::NOTHING;
        let _ = ctx.run(input, |ctx| {
            actions.clear();
            area = draw_controls(ctx, "Animated cover slider", &mut actions);
        });

        assert!(actions.is_empty());
        assert!(area.top() > 0.0);
        assert!(area.bottom() < 344.0);
        assert!(area.width() >= 319.0);
    }
}
