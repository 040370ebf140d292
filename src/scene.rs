use glam::{Vec2, Vec3};

use crate::animation::AnimationState;
use crate::cover::CoverImage;

/// Number of static covers on each side of the foreground cover.
pub const COVERS_PER_SIDE: usize = 8;
/// Spacing between neighbouring static covers.
const COVER_SPACING: f32 = 0.1;
/// Static tilt of the side covers, degrees.
const SIDE_TILT: f32 = 45.0;
/// Foreground cover sits this far in front of the stack.
const FOREGROUND_DEPTH: f32 = 0.25;

/// One corner of a quad: texel coordinate and object-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub tex: Vec2,
    pub pos: Vec2,
}

/// Immediate-mode drawing surface the scene is issued against.
///
/// Transforms compose like a fixed-function modelview: each call
/// post-multiplies the current matrix.
pub trait Canvas {
    /// Clear colour and depth.
    fn clear(&mut self);
    /// Bind the cover texture and upload `cover` into it.
    fn upload_texture(&mut self, cover: &CoverImage);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn translate(&mut self, offset: Vec3);
    /// Rotate by `degrees` about `axis`.
    fn rotate(&mut self, degrees: f32, axis: Vec3);
    /// Emit one textured quad under the current transform.
    fn quad(&mut self, corners: &[Corner; 4]);
    /// Show the finished frame.
    fn present(&mut self);
}

/// Placement of one cover in the stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverPose {
    /// Sideways position.
    pub offset: f32,
    /// Fixed tilt about the vertical axis, degrees.
    pub static_angle: f32,
    /// Distance towards the viewer.
    pub depth: f32,
    /// Whether the live rotation applies on top of the static tilt.
    pub animated: bool,
}

/// Texel-space corners for a `width` x `height` cover.
///
/// The coordinates are raw texel positions (rectangle-texture style) with
/// the -0.5 edge values kept as-is, not normalised to [0, 1].
pub fn cover_corners(width: u32, height: u32) -> [Corner; 4] {
    let w = width as f32;
    let h = height as f32;
    [
        Corner {
            tex: Vec2::new(w, h),
            pos: Vec2::new(0.5, -0.5),
        },
        Corner {
            tex: Vec2::new(w, -0.5),
            pos: Vec2::new(0.5, 0.5),
        },
        Corner {
            tex: Vec2::new(-0.5, -0.5),
            pos: Vec2::new(-0.5, 0.5),
        },
        Corner {
            tex: Vec2::new(-0.5, h),
            pos: Vec2::new(-0.5, -0.5),
        },
    ]
}

/// Poses of every cover, back to front: the right-hand side tilted one way,
/// the left-hand side tilted the other, then the animated foreground cover.
pub fn stack_poses() -> impl Iterator<Item = CoverPose> {
    let right = (0..COVERS_PER_SIDE).map(|i| CoverPose {
        offset: 1.0 - i as f32 * COVER_SPACING,
        static_angle: -SIDE_TILT,
        depth: 0.0,
        animated: false,
    });
    let left = (0..COVERS_PER_SIDE).map(|i| CoverPose {
        offset: -1.0 + i as f32 * COVER_SPACING,
        static_angle: SIDE_TILT,
        depth: 0.0,
        animated: false,
    });
    let front = std::iter::once(CoverPose {
        offset: 0.0,
        static_angle: 0.0,
        depth: FOREGROUND_DEPTH,
        animated: true,
    });
    right.chain(left).chain(front)
}

/// Draw one cover at `pose`.
pub fn draw_quad<C: Canvas>(
    canvas: &mut C,
    pose: CoverPose,
    state: &AnimationState,
    width: u32,
    height: u32,
) {
    canvas.push_matrix();
    canvas.translate(Vec3::new(pose.offset, 0.0, pose.depth));
    canvas.rotate(pose.static_angle, Vec3::Y);
    if pose.animated {
        canvas.rotate(state.angle * state.direction.sign(), Vec3::Y);
    }
    canvas.quad(&cover_corners(width, height));
    canvas.pop_matrix();
}

/// Draw the whole stack, shifted by the live offset.
pub fn draw_covers_stack<C: Canvas>(
    canvas: &mut C,
    state: &AnimationState,
    width: u32,
    height: u32,
) {
    canvas.push_matrix();
    canvas.translate(Vec3::new(state.offset * state.direction.sign(), 0.0, 0.0));
    for pose in stack_poses() {
        draw_quad(canvas, pose, state, width, height);
    }
    canvas.pop_matrix();
}

/// Issue one complete frame.
pub fn draw_frame<C: Canvas>(canvas: &mut C, state: &AnimationState, cover: &CoverImage) {
    canvas.clear();
    canvas.upload_texture(cover);
    canvas.push_matrix();
    draw_covers_stack(canvas, state, cover.width, cover.height);
    canvas.pop_matrix();
    canvas.present();
}
