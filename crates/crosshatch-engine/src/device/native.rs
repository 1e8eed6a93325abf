use std::sync::Arc;

use glow::HasContext;

use crate::math::mat4_flat;
use crate::shader::ShaderError;
use crate::texture::TextureUnit;

use super::gl::{
    AttachmentPoint, BufferId, ClearMask, Filter, FramebufferId, FramebufferStatus, Gl,
    Primitive, ProgramId, Sampling, ShaderStage, TextureDesc, TextureFormat, TextureId,
    UniformLocation, UniformValue, VertexArrayId, VertexAttrib, Wrap,
};
use super::{DeviceError, DriverError};

/// [`Gl`] backed by a real OpenGL 3.3 core context through `glow`.
///
/// Context creation (window, loader) belongs to the host; this type only
/// issues calls on a context that is already current.
pub struct GlowDevice {
    gl: Arc<glow::Context>,
}

impl GlowDevice {
    /// Wraps an existing context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread for as long as the device is
    /// used, and every call must happen on that thread.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

/// Converts a pixel dimension to the `i32` GL expects, saturating.
fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn native_program(id: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(id.0)
}

fn native_texture(id: TextureId) -> glow::NativeTexture {
    glow::NativeTexture(id.0)
}

fn native_framebuffer(id: FramebufferId) -> glow::NativeFramebuffer {
    glow::NativeFramebuffer(id.0)
}

fn native_buffer(id: BufferId) -> glow::NativeBuffer {
    glow::NativeBuffer(id.0)
}

fn native_vertex_array(id: VertexArrayId) -> glow::NativeVertexArray {
    glow::NativeVertexArray(id.0)
}

/// `(internal_format, format, type)` triple for `glTexImage2D`.
fn texture_format(format: TextureFormat) -> (i32, u32, u32) {
    match format {
        TextureFormat::Rgba32F => (glow::RGBA32F as i32, glow::RGBA, glow::FLOAT),
        TextureFormat::Rgba16F => (glow::RGBA16F as i32, glow::RGBA, glow::FLOAT),
        TextureFormat::Rgb8 => (glow::RGB8 as i32, glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::Depth24 => (
            glow::DEPTH_COMPONENT24 as i32,
            glow::DEPTH_COMPONENT,
            glow::UNSIGNED_INT,
        ),
    }
}

/// `(wrap, min_filter, mag_filter)` for `glTexParameteri`.
fn sampling_params(sampling: Sampling) -> (u32, u32, u32) {
    let wrap = match sampling.wrap {
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        Wrap::Repeat => glow::REPEAT,
    };
    let (min, mag) = match (sampling.filter, sampling.mipmaps) {
        (Filter::Nearest, false) => (glow::NEAREST, glow::NEAREST),
        (Filter::Nearest, true) => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        (Filter::Linear, false) => (glow::LINEAR, glow::LINEAR),
        (Filter::Linear, true) => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
    };
    (wrap, min, mag)
}

/// Compiles one stage, returning the driver's info log on failure.
///
/// # Safety
///
/// `gl` must be current.
unsafe fn compile_stage(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::NativeShader, ShaderError> {
    let kind = match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    };
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|log| ShaderError::Compile { stage, log })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log });
        }
        Ok(shader)
    }
}

// SAFETY (all `unsafe` blocks below): `GlowDevice::new` requires the context
// to be current on this thread; handles passed in were created by this device.
impl Gl for GlowDevice {
    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderError> {
        let gl = &*self.gl;
        unsafe {
            let vertex = compile_stage(gl, ShaderStage::Vertex, vertex_src)?;
            let fragment = match compile_stage(gl, ShaderStage::Fragment, fragment_src) {
                Ok(shader) => shader,
                Err(err) => {
                    gl.delete_shader(vertex);
                    return Err(err);
                }
            };

            let program = match gl.create_program() {
                Ok(program) => program,
                Err(log) => {
                    gl.delete_shader(vertex);
                    gl.delete_shader(fragment);
                    return Err(ShaderError::Link { log });
                }
            };

            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);

            // Stage objects are no longer needed once linking ran.
            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);

            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(ShaderError::Link { log });
            }

            Ok(ProgramId(program.0))
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        unsafe { self.gl.delete_program(native_program(program)) };
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.map(native_program)) };
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(native_program(program), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(native_program(program), name) }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let gl = &*self.gl;
        unsafe {
            match value {
                UniformValue::I32(v) => gl.uniform_1_i32(Some(&loc), v),
                UniformValue::F32(v) => gl.uniform_1_f32(Some(&loc), v),
                UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(Some(&loc), x, y, z),
                UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(Some(&loc), x, y, z, w),
                UniformValue::Mat4(m) => {
                    gl.uniform_matrix_4_f32_slice(Some(&loc), false, &mat4_flat(&m))
                }
            }
        }
    }

    fn create_texture(&mut self) -> Result<TextureId, DeviceError> {
        unsafe { self.gl.create_texture() }
            .map(|t| TextureId(t.0))
            .map_err(DeviceError::new)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        unsafe { self.gl.delete_texture(native_texture(texture)) };
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: Option<TextureId>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit.index());
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.map(native_texture));
        }
    }

    fn tex_image_2d(&mut self, desc: TextureDesc, pixels: Option<&[u8]>) {
        let (internal, format, ty) = texture_format(desc.format);
        let gl = &*self.gl;
        unsafe {
            // RGB rows are not 4-byte aligned in general.
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                gl_size(desc.width),
                gl_size(desc.height),
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn tex_sampling(&mut self, sampling: Sampling) {
        let (wrap, min, mag) = sampling_params(sampling);
        let gl = &*self.gl;
        unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
            if sampling.mipmaps {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
        }
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError> {
        unsafe { self.gl.create_framebuffer() }
            .map(|f| FramebufferId(f.0))
            .map_err(DeviceError::new)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        unsafe { self.gl.delete_framebuffer(native_framebuffer(framebuffer)) };
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, framebuffer.map(native_framebuffer))
        };
    }

    fn framebuffer_texture(&mut self, point: AttachmentPoint, texture: Option<TextureId>) {
        let attachment = match point {
            AttachmentPoint::Color(i) => glow::COLOR_ATTACHMENT0 + i,
            AttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
        };
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                texture.map(native_texture),
                0,
            );
        }
    }

    fn draw_buffers(&mut self, count: u32) {
        let buffers: Vec<u32> = (0..count).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
        unsafe { self.gl.draw_buffers(&buffers) };
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        match unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) } {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => FramebufferStatus::IncompleteDrawBuffer,
            glow::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
            other => FramebufferStatus::Other(other),
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, DeviceError> {
        unsafe { self.gl.create_vertex_array() }
            .map(|v| VertexArrayId(v.0))
            .map_err(DeviceError::new)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        unsafe { self.gl.delete_vertex_array(native_vertex_array(vertex_array)) };
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        unsafe { self.gl.create_buffer() }
            .map(|b| BufferId(b.0))
            .map_err(DeviceError::new)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        unsafe { self.gl.delete_buffer(native_buffer(buffer)) };
    }

    fn upload_vertices(&mut self, vertex_array: VertexArrayId, buffer: BufferId, data: &[u8]) {
        let gl = &*self.gl;
        unsafe {
            gl.bind_vertex_array(Some(native_vertex_array(vertex_array)));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(native_buffer(buffer)));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            gl.bind_vertex_array(None);
        }
    }

    fn vertex_attrib(&mut self, vertex_array: VertexArrayId, buffer: BufferId, attrib: VertexAttrib) {
        let gl = &*self.gl;
        unsafe {
            gl.bind_vertex_array(Some(native_vertex_array(vertex_array)));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(native_buffer(buffer)));
            gl.enable_vertex_attrib_array(attrib.location);
            gl.vertex_attrib_pointer_f32(
                attrib.location,
                attrib.components,
                glow::FLOAT,
                false,
                attrib.stride,
                attrib.offset,
            );
            gl.bind_vertex_array(None);
        }
    }

    fn draw_arrays(&mut self, vertex_array: VertexArrayId, primitive: Primitive, first: u32, count: u32) {
        let mode = match primitive {
            Primitive::Triangles => glow::TRIANGLES,
            Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        };
        let gl = &*self.gl;
        unsafe {
            gl.bind_vertex_array(Some(native_vertex_array(vertex_array)));
            gl.draw_arrays(mode, gl_size(first), gl_size(count));
            gl.bind_vertex_array(None);
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, gl_size(width), gl_size(height)) };
    }

    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn clear(&mut self, color: [f32; 4], mask: ClearMask) {
        let mut bits = 0;
        if mask.color {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.depth {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        if mask.stencil {
            bits |= glow::STENCIL_BUFFER_BIT;
        }
        let [r, g, b, a] = color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(bits);
        }
    }

    fn poll_error(&mut self) -> Option<DriverError> {
        DriverError::from_code(unsafe { self.gl.get_error() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── texture formats ──

    #[test]
    fn color_formats_upload_as_rgba_floats() {
        assert_eq!(
            texture_format(TextureFormat::Rgba32F),
            (glow::RGBA32F as i32, glow::RGBA, glow::FLOAT)
        );
        assert_eq!(
            texture_format(TextureFormat::Rgba16F),
            (glow::RGBA16F as i32, glow::RGBA, glow::FLOAT)
        );
    }

    #[test]
    fn image_and_depth_formats() {
        assert_eq!(
            texture_format(TextureFormat::Rgb8),
            (glow::RGB8 as i32, glow::RGB, glow::UNSIGNED_BYTE)
        );
        assert_eq!(
            texture_format(TextureFormat::Depth24),
            (glow::DEPTH_COMPONENT24 as i32, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT)
        );
    }

    // ── sampling ──

    #[test]
    fn attachments_clamp_and_sample_nearest() {
        assert_eq!(
            sampling_params(Sampling::ATTACHMENT),
            (glow::CLAMP_TO_EDGE, glow::NEAREST, glow::NEAREST)
        );
    }

    #[test]
    fn assets_repeat_with_trilinear_minification() {
        assert_eq!(
            sampling_params(Sampling::ASSET),
            (glow::REPEAT, glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR)
        );
    }

    #[test]
    fn mipmapped_nearest_keeps_nearest_magnification() {
        let sampling = Sampling {
            wrap: Wrap::Repeat,
            filter: Filter::Nearest,
            mipmaps: true,
        };
        assert_eq!(
            sampling_params(sampling),
            (glow::REPEAT, glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST)
        );
    }

    // ── sizes ──

    #[test]
    fn sizes_saturate_at_i32_max() {
        assert_eq!(gl_size(1024), 1024);
        assert_eq!(gl_size(i32::MAX as u32), i32::MAX);
        assert_eq!(gl_size(u32::MAX), i32::MAX);
    }
}
