use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::scene::Corner;

/// Eye-space vertex with raw texel coordinates.
/// Stride = 32 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CoverVertex {
    pub position: [f32; 3],
    /// Texel units; the shader divides by the texture size.
    pub texel: [f32; 2],
    pub normal: [f32; 3],
}

impl CoverVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
        1 => Float32x2,  // texel
        2 => Float32x3,  // normal
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CoverVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Two triangles per quad, relative to the quad's first vertex.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Maximum number of quads one frame can emit.
pub const MAX_QUADS: usize = 64;

/// CPU side of the immediate-mode canvas: a modelview matrix stack and the
/// quads emitted under it, flattened to eye space.
pub struct QuadBatch {
    /// Modelview loaded at the start of every frame.
    base: Mat4,
    current: Mat4,
    stack: Vec<Mat4>,
    vertices: Vec<CoverVertex>,
    indices: Vec<u16>,
}

impl QuadBatch {
    pub fn new() -> Self {
        Self {
            base: Mat4::IDENTITY,
            current: Mat4::IDENTITY,
            stack: Vec::with_capacity(8),
            vertices: Vec::with_capacity(MAX_QUADS * 4),
            indices: Vec::with_capacity(MAX_QUADS * QUAD_INDICES.len()),
        }
    }

    /// Replace the modelview every frame starts from.
    pub fn set_base(&mut self, modelview: Mat4) {
        self.base = modelview;
        self.current = modelview;
    }

    /// Drop last frame's geometry and reload the base modelview.
    pub fn begin(&mut self) {
        if !self.stack.is_empty() {
            log::warn!("{} unpopped matrices at frame start", self.stack.len());
            self.stack.clear();
        }
        self.current = self.base;
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn push_matrix(&mut self) {
        self.stack.push(self.current);
    }

    pub fn pop_matrix(&mut self) {
        match self.stack.pop() {
            Some(m) => self.current = m,
            None => log::warn!("Matrix stack underflow"),
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.current = self.current * Mat4::from_translation(offset);
    }

    pub fn rotate(&mut self, degrees: f32, axis: Vec3) {
        self.current = self.current * Mat4::from_axis_angle(axis.normalize(), degrees.to_radians());
    }

    /// Transform and append one quad. Quads past `MAX_QUADS` are dropped.
    pub fn quad(&mut self, corners: &[Corner; 4]) {
        if self.quad_count() >= MAX_QUADS {
            log::warn!("Quad batch full ({} quads), dropping quad", MAX_QUADS);
            return;
        }

        let first = self.vertices.len() as u16;
        let normal = self.current.transform_vector3(Vec3::Z).normalize_or_zero();
        for corner in corners {
            let position = self.current.transform_point3(corner.pos.extend(0.0));
            self.vertices.push(CoverVertex {
                position: position.into(),
                texel: corner.tex.into(),
                normal: normal.into(),
            });
        }
        self.indices
            .extend(QUAD_INDICES.iter().map(|&i| first + i));
    }

    pub fn vertices(&self) -> &[CoverVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::cover_corners;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn quad_emits_four_vertices_six_indices() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.quad(&cover_corners(16, 8));
        batch.quad(&cover_corners(16, 8));

        assert_eq!(batch.vertices().len(), 8);
        assert_eq!(batch.indices(), &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(batch.vertices()[0].texel, [16.0, 8.0]);
    }

    #[test]
    fn base_modelview_applies_to_every_frame() {
        let mut batch = QuadBatch::new();
        batch.set_base(Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)));
        batch.begin();
        batch.quad(&cover_corners(1, 1));

        assert!(close(batch.vertices()[0].position, [0.5, -0.5, -2.0]));
        assert!(close(batch.vertices()[0].normal, [0.0, 0.0, 1.0]));
    }

    #[test]
    fn pop_restores_pushed_matrix() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.push_matrix();
        batch.translate(Vec3::new(1.0, 0.0, 0.0));
        batch.pop_matrix();
        batch.quad(&cover_corners(1, 1));

        assert!(close(batch.vertices()[0].position, [0.5, -0.5, 0.0]));
        assert_eq!(batch.stack_depth(), 0);
    }

    #[test]
    fn rotation_turns_the_normal() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.rotate(90.0, Vec3::Y);
        batch.quad(&cover_corners(1, 1));

        assert!(close(batch.vertices()[0].normal, [1.0, 0.0, 0.0]));
        assert!(close(batch.vertices()[0].position, [0.0, -0.5, -0.5]));
    }

    #[test]
    fn translate_then_rotate_composes_like_modelview() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.translate(Vec3::new(1.0, 0.0, 0.0));
        batch.rotate(180.0, Vec3::Y);
        batch.quad(&cover_corners(1, 1));

        // Rotated in place, then moved: x = 1 - 0.5.
        assert!(close(batch.vertices()[0].position, [0.5, -0.5, 0.0]));
    }

    #[test]
    fn underflow_is_ignored() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.translate(Vec3::new(0.0, 2.0, 0.0));
        batch.pop_matrix();
        batch.quad(&cover_corners(1, 1));
        assert!(close(batch.vertices()[0].position, [0.5, 1.5, 0.0]));
    }

    #[test]
    fn batch_is_capped() {
        let mut batch = QuadBatch::new();
        batch.begin();
        for _ in 0..MAX_QUADS + 3 {
            batch.quad(&cover_corners(1, 1));
        }
        assert_eq!(batch.quad_count(), MAX_QUADS);
    }

    #[test]
    fn begin_clears_geometry_and_stack() {
        let mut batch = QuadBatch::new();
        batch.begin();
        batch.push_matrix();
        batch.quad(&cover_corners(1, 1));
        batch.begin();
        assert_eq!(batch.quad_count(), 0);
        assert_eq!(batch.stack_depth(), 0);
    }
}
