use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::device::{BufferId, DeviceError, Gl, Primitive, ProgramId, VertexArrayId, VertexAttrib};

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2], // NDC
    pub uv: [f32; 2],
}

/// Screen-covering triangle strip.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 1.0] },
];

const POSITION_ATTRIB: &str = "inPosition";
const TEX_COORD_ATTRIB: &str = "inTexCoord";

// ── fullscreen quad ───────────────────────────────────────────────────────

/// Vertex array + buffer holding [`QUAD_VERTICES`].
#[derive(Debug, PartialEq, Eq)]
pub struct FullscreenQuad {
    vao: VertexArrayId,
    vbo: BufferId,
}

impl FullscreenQuad {
    pub fn new(gl: &mut dyn Gl) -> Result<Self, DeviceError> {
        let vao = gl.create_vertex_array()?;
        let vbo = match gl.create_buffer() {
            Ok(vbo) => vbo,
            Err(err) => {
                gl.delete_vertex_array(vao);
                return Err(err);
            }
        };
        gl.upload_vertices(vao, vbo, bytemuck::cast_slice(&QUAD_VERTICES));
        Ok(Self { vao, vbo })
    }

    /// Points `program`'s `inPosition`/`inTexCoord` attributes at the quad
    /// buffer. Attributes the program does not declare are skipped.
    pub fn bind_attributes(&self, gl: &mut dyn Gl, program: ProgramId) {
        let stride = size_of::<QuadVertex>() as i32;
        let layout = [
            (POSITION_ATTRIB, offset_of!(QuadVertex, pos)),
            (TEX_COORD_ATTRIB, offset_of!(QuadVertex, uv)),
        ];

        for (name, offset) in layout {
            let Some(location) = gl.attrib_location(program, name) else {
                log::debug!("program {:?} has no attribute {name}", program.0);
                continue;
            };
            gl.vertex_attrib(
                self.vao,
                self.vbo,
                VertexAttrib {
                    location,
                    components: 2,
                    stride,
                    offset: offset as i32,
                },
            );
        }
    }

    /// One draw call, nothing else.
    pub fn draw(&self, gl: &mut dyn Gl) {
        gl.draw_arrays(self.vao, Primitive::TriangleStrip, 0, QUAD_VERTICES.len() as u32);
    }

    pub fn release(self, gl: &mut dyn Gl) {
        gl.delete_buffer(self.vbo);
        gl.delete_vertex_array(self.vao);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;

    const VS: &str = "
        #version 330 core
        in vec2 inPosition;
        in vec2 inTexCoord;
        out vec2 fragTexCoord;
        void main() { fragTexCoord = inTexCoord; gl_Position = vec4(inPosition, 0.0, 1.0); }
    ";
    const FS: &str = "
        #version 330 core
        out vec4 outColor;
        void main() { outColor = vec4(1.0); }
    ";

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(size_of::<QuadVertex>(), 16);
        assert_eq!(offset_of!(QuadVertex, uv), 8);
    }

    #[test]
    fn quad_spans_ndc() {
        let xs = QUAD_VERTICES.iter().map(|v| v.pos[0]);
        let ys = QUAD_VERTICES.iter().map(|v| v.pos[1]);
        assert_eq!(xs.clone().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.clone().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn draw_issues_one_strip() {
        let mut gl = HeadlessGl::new();
        let quad = FullscreenQuad::new(&mut gl).unwrap();
        let program = gl.compile_program(VS, FS).unwrap();
        quad.bind_attributes(&mut gl, program);
        gl.use_program(Some(program));
        gl.take_commands();

        quad.draw(&mut gl);
        assert_eq!(gl.draw_calls(), 1);
        assert_eq!(
            gl.take_commands(),
            vec![crate::device::headless::Command::Draw {
                program,
                framebuffer: None,
                count: 4
            }]
        );
        assert!(!gl.has_pending_errors());
    }

    #[test]
    fn release_frees_buffers() {
        let mut gl = HeadlessGl::new();
        let quad = FullscreenQuad::new(&mut gl).unwrap();
        quad.release(&mut gl);
        assert_eq!(gl.live_objects().total(), 0);
    }
}
