//! In-process model of the GL state machine.
//!
//! `HeadlessGl` keeps the state a real driver would (objects, bindings,
//! uniform values, framebuffer completeness, the error queue) without touching
//! a GPU. Shader "compilation" scans GLSL declarations: `uniform` names get
//! locations in declaration order across both stages, vertex-stage `in`
//! variables get attribute slots. Misuse raises the same error codes GL would,
//! so [`check_errors`](super::check_errors) behaves identically on both backends.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::num::NonZeroU32;

use crate::shader::ShaderError;
use crate::texture::TextureUnit;

use super::gl::{
    AttachmentPoint, BufferId, ClearMask, FramebufferId, FramebufferStatus, Gl, Primitive,
    ProgramId, Sampling, ShaderStage, TextureDesc, TextureId, UniformLocation, UniformValue,
    VertexArrayId, VertexAttrib,
};
use super::{DeviceError, DriverError};

/// Limits reported by the modeled driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HeadlessLimits {
    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_color_attachments: u32,
}

impl Default for HeadlessLimits {
    fn default() -> Self {
        // GL 3.3 core minimums.
        Self {
            max_texture_size: 1024,
            max_texture_units: 48,
            max_color_attachments: 8,
        }
    }
}

/// State-changing call recorded by [`HeadlessGl`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UseProgram(Option<ProgramId>),
    BindFramebuffer(Option<FramebufferId>),
    DepthTest(bool),
    Clear {
        framebuffer: Option<FramebufferId>,
        color: [f32; 4],
    },
    Draw {
        program: ProgramId,
        framebuffer: Option<FramebufferId>,
        count: u32,
    },
}

/// Number of live driver objects per kind.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LiveObjects {
    pub programs: usize,
    pub textures: usize,
    pub framebuffers: usize,
    pub buffers: usize,
    pub vertex_arrays: usize,
}

impl LiveObjects {
    pub fn total(&self) -> usize {
        self.programs + self.textures + self.framebuffers + self.buffers + self.vertex_arrays
    }
}

#[derive(Debug)]
struct ProgramInfo {
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

#[derive(Debug, Default)]
struct TextureInfo {
    storage: Option<TextureDesc>,
    sampling: Option<Sampling>,
}

#[derive(Debug, Default)]
struct FramebufferInfo {
    color: BTreeMap<u32, TextureId>,
    depth: Option<TextureId>,
    draw_buffers: u32,
}

/// GPU-free [`Gl`] implementation.
#[derive(Debug)]
pub struct HeadlessGl {
    limits: HeadlessLimits,
    next_name: u32,

    programs: HashMap<ProgramId, ProgramInfo>,
    textures: HashMap<TextureId, TextureInfo>,
    framebuffers: HashMap<FramebufferId, FramebufferInfo>,
    buffers: HashMap<BufferId, usize>,
    vertex_arrays: HashMap<VertexArrayId, HashSet<u32>>,

    current_program: Option<ProgramId>,
    current_framebuffer: Option<FramebufferId>,
    active_unit: u32,
    unit_bindings: HashMap<u32, TextureId>,
    depth_test: bool,
    viewport: (u32, u32),

    uniforms: HashMap<(ProgramId, UniformLocation), UniformValue>,
    errors: VecDeque<DriverError>,
    commands: Vec<Command>,
    draw_calls: usize,
}

impl Default for HeadlessGl {
    fn default() -> Self {
        Self::with_limits(HeadlessLimits::default())
    }
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: HeadlessLimits) -> Self {
        Self {
            limits,
            next_name: 0,
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            current_program: None,
            current_framebuffer: None,
            active_unit: 0,
            unit_bindings: HashMap::new(),
            depth_test: false,
            viewport: (0, 0),
            uniforms: HashMap::new(),
            errors: VecDeque::new(),
            commands: Vec::new(),
            draw_calls: 0,
        }
    }

    pub fn limits(&self) -> HeadlessLimits {
        self.limits
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Bound draw framebuffer; `None` is the default (screen) framebuffer.
    pub fn current_framebuffer(&self) -> Option<FramebufferId> {
        self.current_framebuffer
    }

    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn uniform(&self, program: ProgramId, location: UniformLocation) -> Option<UniformValue> {
        self.uniforms.get(&(program, location)).copied()
    }

    /// Last value written to the uniform called `name` in `program`.
    pub fn uniform_by_name(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let index = self
            .programs
            .get(&program)?
            .uniforms
            .iter()
            .position(|u| u == name)?;
        self.uniform(program, UniformLocation(index as u32))
    }

    pub fn texture_on_unit(&self, unit: TextureUnit) -> Option<TextureId> {
        self.unit_bindings.get(&unit.index()).copied()
    }

    pub fn texture_storage(&self, texture: TextureId) -> Option<TextureDesc> {
        self.textures.get(&texture).and_then(|t| t.storage)
    }

    pub fn texture_sampling(&self, texture: TextureId) -> Option<Sampling> {
        self.textures.get(&texture).and_then(|t| t.sampling)
    }

    pub fn framebuffer_attachment(
        &self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
    ) -> Option<TextureId> {
        let fb = self.framebuffers.get(&framebuffer)?;
        match point {
            AttachmentPoint::Color(i) => fb.color.get(&i).copied(),
            AttachmentPoint::Depth => fb.depth,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn has_pending_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn live_objects(&self) -> LiveObjects {
        LiveObjects {
            programs: self.programs.len(),
            textures: self.textures.len(),
            framebuffers: self.framebuffers.len(),
            buffers: self.buffers.len(),
            vertex_arrays: self.vertex_arrays.len(),
        }
    }

    /// Queues an error as if the driver had raised it.
    pub fn push_error(&mut self, err: DriverError) {
        self.errors.push_back(err);
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn next_name(&mut self) -> NonZeroU32 {
        let name = NonZeroU32::MIN.saturating_add(self.next_name);
        self.next_name = self.next_name.wrapping_add(1);
        name
    }

    fn raise(&mut self, err: DriverError) {
        log::trace!("headless: raised {err}");
        self.errors.push_back(err);
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.unit_bindings.get(&self.active_unit).copied()
    }

    fn status_of(&self, framebuffer: Option<FramebufferId>) -> FramebufferStatus {
        let Some(id) = framebuffer else {
            return FramebufferStatus::Complete;
        };
        let Some(fb) = self.framebuffers.get(&id) else {
            return FramebufferStatus::Unsupported;
        };

        if fb.color.is_empty() && fb.depth.is_none() {
            return FramebufferStatus::MissingAttachment;
        }

        let color_ok = fb.color.values().all(|t| {
            self.texture_storage(*t)
                .is_some_and(|desc| !desc.format.is_depth())
        });
        let depth_ok = fb.depth.is_none_or(|t| {
            self.texture_storage(t)
                .is_some_and(|desc| desc.format.is_depth())
        });
        if !color_ok || !depth_ok {
            return FramebufferStatus::IncompleteAttachment;
        }

        if (0..fb.draw_buffers).any(|i| !fb.color.contains_key(&i)) {
            return FramebufferStatus::IncompleteDrawBuffer;
        }

        FramebufferStatus::Complete
    }
}

impl Gl for HeadlessGl {
    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderError> {
        check_stage(ShaderStage::Vertex, vertex_src)?;
        check_stage(ShaderStage::Fragment, fragment_src)?;

        let mut uniforms = declarations(vertex_src, "uniform");
        for name in declarations(fragment_src, "uniform") {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
        let attributes = declarations(vertex_src, "in");

        let id = ProgramId(self.next_name());
        self.programs.insert(id, ProgramInfo { uniforms, attributes });
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            return;
        }
        self.uniforms.retain(|(p, _), _| *p != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(p) = program {
            if !self.programs.contains_key(&p) {
                self.raise(DriverError::InvalidOperation);
                return;
            }
        }
        self.current_program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let Some(info) = self.programs.get(&program) else {
            self.raise(DriverError::InvalidOperation);
            return None;
        };
        info.uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let Some(info) = self.programs.get(&program) else {
            self.raise(DriverError::InvalidOperation);
            return None;
        };
        info.attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current_program else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        let declared = self
            .programs
            .get(&program)
            .is_some_and(|info| (location.0 as usize) < info.uniforms.len());
        if !declared {
            self.raise(DriverError::InvalidOperation);
            return;
        }
        self.uniforms.insert((program, location), value);
    }

    fn create_texture(&mut self) -> Result<TextureId, DeviceError> {
        let id = TextureId(self.next_name());
        self.textures.insert(id, TextureInfo::default());
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            return;
        }
        // Deleting a texture unbinds it everywhere it is bound or attached.
        self.unit_bindings.retain(|_, t| *t != texture);
        for fb in self.framebuffers.values_mut() {
            fb.color.retain(|_, t| *t != texture);
            if fb.depth == Some(texture) {
                fb.depth = None;
            }
        }
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: Option<TextureId>) {
        if unit.index() >= self.limits.max_texture_units {
            self.raise(DriverError::InvalidEnum);
            return;
        }
        self.active_unit = unit.index();
        match texture {
            Some(t) if !self.textures.contains_key(&t) => {
                self.raise(DriverError::InvalidOperation);
            }
            Some(t) => {
                self.unit_bindings.insert(unit.index(), t);
            }
            None => {
                self.unit_bindings.remove(&unit.index());
            }
        }
    }

    fn tex_image_2d(&mut self, desc: TextureDesc, pixels: Option<&[u8]>) {
        let Some(texture) = self.bound_texture() else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        let max = self.limits.max_texture_size;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            self.raise(DriverError::InvalidValue);
            return;
        }
        if let Some(data) = pixels {
            let needed =
                desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
            if data.len() < needed {
                self.raise(DriverError::InvalidOperation);
                return;
            }
        }
        if let Some(info) = self.textures.get_mut(&texture) {
            info.storage = Some(desc);
        }
    }

    fn tex_sampling(&mut self, sampling: Sampling) {
        let Some(texture) = self.bound_texture() else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        let has_storage = self.texture_storage(texture).is_some();
        if sampling.mipmaps && !has_storage {
            // glGenerateMipmap on an empty level 0.
            self.raise(DriverError::InvalidOperation);
            return;
        }
        if let Some(info) = self.textures.get_mut(&texture) {
            info.sampling = Some(sampling);
        }
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError> {
        let id = FramebufferId(self.next_name());
        self.framebuffers.insert(id, FramebufferInfo::default());
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            return;
        }
        // Deleting the bound framebuffer reverts to the default one.
        if self.current_framebuffer == Some(framebuffer) {
            self.current_framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if let Some(fb) = framebuffer {
            if !self.framebuffers.contains_key(&fb) {
                self.raise(DriverError::InvalidOperation);
                return;
            }
        }
        self.current_framebuffer = framebuffer;
        self.commands.push(Command::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture(&mut self, point: AttachmentPoint, texture: Option<TextureId>) {
        let Some(id) = self.current_framebuffer else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        if let AttachmentPoint::Color(i) = point {
            if i >= self.limits.max_color_attachments {
                self.raise(DriverError::InvalidEnum);
                return;
            }
        }
        if let Some(t) = texture {
            if !self.textures.contains_key(&t) {
                self.raise(DriverError::InvalidOperation);
                return;
            }
        }
        let Some(fb) = self.framebuffers.get_mut(&id) else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        match (point, texture) {
            (AttachmentPoint::Color(i), Some(t)) => {
                fb.color.insert(i, t);
            }
            (AttachmentPoint::Color(i), None) => {
                fb.color.remove(&i);
            }
            (AttachmentPoint::Depth, t) => fb.depth = t,
        }
    }

    fn draw_buffers(&mut self, count: u32) {
        let Some(id) = self.current_framebuffer else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        if count > self.limits.max_color_attachments {
            self.raise(DriverError::InvalidValue);
            return;
        }
        if let Some(fb) = self.framebuffers.get_mut(&id) {
            fb.draw_buffers = count;
        }
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        self.status_of(self.current_framebuffer)
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, DeviceError> {
        let id = VertexArrayId(self.next_name());
        self.vertex_arrays.insert(id, HashSet::new());
        Ok(id)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        let id = BufferId(self.next_name());
        self.buffers.insert(id, 0);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn upload_vertices(&mut self, vertex_array: VertexArrayId, buffer: BufferId, data: &[u8]) {
        if !self.vertex_arrays.contains_key(&vertex_array) {
            self.raise(DriverError::InvalidOperation);
            return;
        }
        match self.buffers.get_mut(&buffer) {
            Some(len) => *len = data.len(),
            None => self.raise(DriverError::InvalidOperation),
        }
    }

    fn vertex_attrib(&mut self, vertex_array: VertexArrayId, buffer: BufferId, attrib: VertexAttrib) {
        if !self.buffers.contains_key(&buffer) || !(1..=4).contains(&attrib.components) {
            self.raise(DriverError::InvalidValue);
            return;
        }
        match self.vertex_arrays.get_mut(&vertex_array) {
            Some(enabled) => {
                enabled.insert(attrib.location);
            }
            None => self.raise(DriverError::InvalidOperation),
        }
    }

    fn draw_arrays(&mut self, vertex_array: VertexArrayId, primitive: Primitive, first: u32, count: u32) {
        let _ = (primitive, first);
        let Some(program) = self.current_program else {
            self.raise(DriverError::InvalidOperation);
            return;
        };
        if !self.vertex_arrays.contains_key(&vertex_array) {
            self.raise(DriverError::InvalidOperation);
            return;
        }
        if self.status_of(self.current_framebuffer) != FramebufferStatus::Complete {
            self.raise(DriverError::InvalidFramebufferOperation);
            return;
        }
        self.draw_calls += 1;
        self.commands.push(Command::Draw {
            program,
            framebuffer: self.current_framebuffer,
            count,
        });
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(Command::DepthTest(enabled));
    }

    fn clear(&mut self, color: [f32; 4], mask: ClearMask) {
        let _ = mask;
        if self.status_of(self.current_framebuffer) != FramebufferStatus::Complete {
            self.raise(DriverError::InvalidFramebufferOperation);
            return;
        }
        self.commands.push(Command::Clear {
            framebuffer: self.current_framebuffer,
            color,
        });
    }

    fn poll_error(&mut self) -> Option<DriverError> {
        self.errors.pop_front()
    }
}

/// Rejects sources a GLSL compiler certainly would.
fn check_stage(stage: ShaderStage, source: &str) -> Result<(), ShaderError> {
    let code = strip_comments(source);
    if !code.contains("void main") {
        return Err(ShaderError::Compile {
            stage,
            log: "0:1(1): error: no function with name 'main'".to_string(),
        });
    }
    let opened = code.matches('{').count();
    let closed = code.matches('}').count();
    if opened != closed {
        return Err(ShaderError::Compile {
            stage,
            log: format!("0:1(1): error: unbalanced braces ({opened} '{{' vs {closed} '}}')"),
        });
    }
    Ok(())
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("//") {
            rest = tail.find('\n').map_or("", |i| &tail[i..]);
        } else if let Some(tail) = rest.strip_prefix("/*") {
            rest = tail.find("*/").map_or("", |i| &tail[i + 2..]);
            out.push(' ');
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Names declared with `qualifier` (`uniform`, `in`) at global scope.
///
/// Handles `layout(..)` prefixes, precision/interpolation qualifiers, comma
/// lists and array suffixes.
fn declarations(source: &str, qualifier: &str) -> Vec<String> {
    const SKIPPED: [&str; 6] = ["lowp", "mediump", "highp", "flat", "smooth", "noperspective"];

    let mut names = Vec::new();
    for statement in strip_comments(source).split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let Some(pos) = tokens.iter().position(|t| *t == qualifier) else {
            continue;
        };
        // Declarations never follow an opening brace within the same statement.
        let nested = |t: &&str| t.contains('{') || (t.contains('(') && !t.starts_with("layout"));
        if tokens[..pos].iter().any(nested) {
            continue;
        }

        let mut rest = tokens[pos + 1..]
            .iter()
            .copied()
            .skip_while(|t| SKIPPED.contains(t));
        // Type name.
        if rest.next().is_none() {
            continue;
        }
        let declarators = rest.collect::<Vec<_>>().join(" ");
        for declarator in declarators.split(',') {
            let name = declarator
                .split(['[', '='])
                .next()
                .unwrap_or_default()
                .trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
