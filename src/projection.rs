use glam::{Mat4, Vec4};

/// Clip planes of a perspective viewing volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Symmetric frustum from a vertical field of view in degrees.
    pub fn from_fov(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let top = near * (std::f32::consts::PI / 180.0 * fov_y / 2.0).tan();
        let bottom = -top;
        let right = aspect * top;
        let left = -right;

        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// Right-handed projection matrix mapping depth to wgpu's [0, 1] range.
    pub fn to_matrix(&self) -> Mat4 {
        let Self {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;

        Mat4::from_cols(
            Vec4::new(2.0 * n / (r - l), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * n / (t - b), 0.0, 0.0),
            Vec4::new((r + l) / (r - l), (t + b) / (t - b), -f / (f - n), -1.0),
            Vec4::new(0.0, 0.0, -f * n / (f - n), 0.0),
        )
    }
}

/// Aspect ratio of a viewport, guarding against a zero height.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes_from_sixty_degrees() {
        let aspect = 4.0 / 3.0;
        let fr = Frustum::from_fov(60.0, aspect, 1.0, 30.0);
        let top = 30.0f32.to_radians().tan();

        assert!((fr.top - top).abs() < 1e-6);
        assert!((fr.bottom + top).abs() < 1e-6);
        assert!((fr.right - aspect * top).abs() < 1e-6);
        assert_eq!(fr.left, -fr.right);
        assert_eq!(fr.near, 1.0);
        assert_eq!(fr.far, 30.0);
    }

    #[test]
    fn matches_glam_perspective() {
        let aspect = 4.0 / 3.0;
        let ours = Frustum::from_fov(60.0, aspect, 1.0, 30.0).to_matrix();
        let expected = Mat4::perspective_rh(60.0f32.to_radians(), aspect, 1.0, 30.0);
        assert!(ours.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn near_plane_maps_to_zero_depth() {
        let m = Frustum::from_fov(60.0, 1.0, 1.0, 30.0).to_matrix();
        let near = m * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -30.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-6);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn aspect_survives_zero_height() {
        assert_eq!(aspect_ratio(640, 480), 640.0 / 480.0);
        assert_eq!(aspect_ratio(10, 0), 10.0);
    }
}
