use std::collections::BTreeMap;
use std::fmt;

use crate::device::{Gl, ProgramId, UniformLocation, UniformValue};
use crate::math::{Mat4, Vec3};
use crate::texture::TextureUnit;

/// Semantic name of a uniform, independent of any program.
///
/// Each tag maps to one fixed GLSL identifier (see [`UniformTag::name`]).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum UniformTag {
    ModelTrans,
    ViewTrans,
    ProjTrans,
    UseTexture,
    Color,
    Texture,
    NumTiles,
    TilesTexture,
    LightDir,
    Positions,
    Normals,
    Depths,
    Uvs,
    InvViewTrans,
    InvProjTrans,
}

impl UniformTag {
    pub const ALL: [UniformTag; 15] = [
        UniformTag::ModelTrans,
        UniformTag::ViewTrans,
        UniformTag::ProjTrans,
        UniformTag::UseTexture,
        UniformTag::Color,
        UniformTag::Texture,
        UniformTag::NumTiles,
        UniformTag::TilesTexture,
        UniformTag::LightDir,
        UniformTag::Positions,
        UniformTag::Normals,
        UniformTag::Depths,
        UniformTag::Uvs,
        UniformTag::InvViewTrans,
        UniformTag::InvProjTrans,
    ];

    /// GLSL identifier the tag resolves to.
    pub const fn name(self) -> &'static str {
        match self {
            UniformTag::ModelTrans => "unifModelTrans",
            UniformTag::ViewTrans => "unifViewTrans",
            UniformTag::ProjTrans => "unifProjTrans",
            UniformTag::UseTexture => "unifUseTexture",
            UniformTag::Color => "unifColor",
            UniformTag::Texture => "unifTexture",
            UniformTag::NumTiles => "unifNumTiles",
            UniformTag::TilesTexture => "unifTilesTexture",
            UniformTag::LightDir => "unifLightDir",
            UniformTag::Positions => "unifPositions",
            UniformTag::Normals => "unifNormals",
            UniformTag::Depths => "unifDepths",
            UniformTag::Uvs => "unifUVs",
            UniformTag::InvViewTrans => "unifInvViewTrans",
            UniformTag::InvProjTrans => "unifInvProjTrans",
        }
    }
}

impl fmt::Display for UniformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag → location table for one program.
///
/// Locations only mean something while that program is active; the registry
/// never activates it. Setters are no-ops for tags without a location, the
/// way GL ignores location -1.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformRegistry {
    program: ProgramId,
    locations: BTreeMap<UniformTag, Option<UniformLocation>>,
}

impl UniformRegistry {
    /// Resolves the location of every tag in `tags` within `program`.
    pub fn register(gl: &mut dyn Gl, program: ProgramId, tags: &[UniformTag]) -> Self {
        let mut locations = BTreeMap::new();
        for &tag in tags {
            let location = gl.uniform_location(program, tag.name());
            match location {
                Some(loc) => log::debug!("program {:?}: {tag} -> {}", program.0, loc.0),
                None => log::warn!("program {:?} does not declare {tag}", program.0),
            }
            locations.insert(tag, location);
        }
        Self { program, locations }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Location of `tag`, or `None` when the tag was not registered or the
    /// program does not declare it.
    pub fn location_of(&self, tag: UniformTag) -> Option<UniformLocation> {
        self.locations.get(&tag).copied().flatten()
    }

    pub fn is_registered(&self, tag: UniformTag) -> bool {
        self.locations.contains_key(&tag)
    }

    /// Registered tags in tag order, with their locations.
    pub fn iter(&self) -> impl Iterator<Item = (UniformTag, Option<UniformLocation>)> + '_ {
        self.locations.iter().map(|(tag, loc)| (*tag, *loc))
    }

    pub fn set(&self, gl: &mut dyn Gl, tag: UniformTag, value: UniformValue) {
        if let Some(location) = self.location_of(tag) {
            gl.set_uniform(location, value);
        }
    }

    pub fn set_mat4(&self, gl: &mut dyn Gl, tag: UniformTag, value: &Mat4) {
        self.set(gl, tag, UniformValue::Mat4(*value));
    }

    pub fn set_vec3(&self, gl: &mut dyn Gl, tag: UniformTag, value: Vec3) {
        self.set(gl, tag, UniformValue::Vec3(value));
    }

    pub fn set_vec4(&self, gl: &mut dyn Gl, tag: UniformTag, value: [f32; 4]) {
        self.set(gl, tag, UniformValue::Vec4(value));
    }

    pub fn set_i32(&self, gl: &mut dyn Gl, tag: UniformTag, value: i32) {
        self.set(gl, tag, UniformValue::I32(value));
    }

    pub fn set_f32(&self, gl: &mut dyn Gl, tag: UniformTag, value: f32) {
        self.set(gl, tag, UniformValue::F32(value));
    }

    /// Points a sampler uniform at `unit`.
    pub fn set_sampler(&self, gl: &mut dyn Gl, tag: UniformTag, unit: TextureUnit) {
        self.set_i32(gl, tag, unit.sampler());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;
    use crate::math::MAT4_IDENTITY;

    const VS: &str = "
        #version 330 core
        in vec3 inPosition;
        uniform mat4 unifModelTrans;
        uniform mat4 unifViewTrans;
        void main() { gl_Position = unifViewTrans * unifModelTrans * vec4(inPosition, 1.0); }
    ";
    const FS: &str = "
        #version 330 core
        uniform vec4 unifColor;
        uniform sampler2D unifTexture;
        out vec4 outColor;
        void main() { outColor = unifColor; }
    ";

    fn program(gl: &mut HeadlessGl) -> ProgramId {
        gl.compile_program(VS, FS).unwrap()
    }

    // ── tag names ─────────────────────────────────────────────────────────

    #[test]
    fn tag_names_are_unique() {
        let mut names: Vec<_> = UniformTag::ALL.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), UniformTag::ALL.len());
    }

    #[test]
    fn uvs_keep_uppercase_suffix() {
        assert_eq!(UniformTag::Uvs.name(), "unifUVs");
        assert_eq!(UniformTag::InvProjTrans.to_string(), "unifInvProjTrans");
    }

    // ── registration ──────────────────────────────────────────────────────

    #[test]
    fn registered_declared_tags_resolve() {
        let mut gl = HeadlessGl::new();
        let p = program(&mut gl);
        let reg = UniformRegistry::register(&mut gl, p, &[UniformTag::ModelTrans, UniformTag::Color]);

        assert_eq!(reg.location_of(UniformTag::ModelTrans), Some(UniformLocation(0)));
        assert_eq!(reg.location_of(UniformTag::Color), Some(UniformLocation(2)));
        assert_eq!(reg.program(), p);
    }

    #[test]
    fn unregistered_tag_is_absent() {
        let mut gl = HeadlessGl::new();
        let p = program(&mut gl);
        let reg = UniformRegistry::register(&mut gl, p, &[UniformTag::ModelTrans]);

        // Declared by the program, but never registered.
        assert_eq!(reg.location_of(UniformTag::ViewTrans), None);
        assert!(!reg.is_registered(UniformTag::ViewTrans));
    }

    #[test]
    fn registered_undeclared_tag_has_no_location() {
        let mut gl = HeadlessGl::new();
        let p = program(&mut gl);
        let reg = UniformRegistry::register(&mut gl, p, &[UniformTag::LightDir]);

        assert!(reg.is_registered(UniformTag::LightDir));
        assert_eq!(reg.location_of(UniformTag::LightDir), None);
        assert_eq!(reg.iter().collect::<Vec<_>>(), vec![(UniformTag::LightDir, None)]);
    }

    // ── setters ───────────────────────────────────────────────────────────

    #[test]
    fn setters_write_active_program() {
        let mut gl = HeadlessGl::new();
        let p = program(&mut gl);
        let reg = UniformRegistry::register(
            &mut gl,
            p,
            &[UniformTag::ModelTrans, UniformTag::Color, UniformTag::Texture],
        );
        gl.use_program(Some(p));

        reg.set_mat4(&mut gl, UniformTag::ModelTrans, &MAT4_IDENTITY);
        reg.set_vec4(&mut gl, UniformTag::Color, [1.0, 0.5, 0.25, 1.0]);
        reg.set_sampler(&mut gl, UniformTag::Texture, TextureUnit::new(3));

        assert_eq!(
            gl.uniform_by_name(p, "unifModelTrans"),
            Some(UniformValue::Mat4(MAT4_IDENTITY))
        );
        assert_eq!(
            gl.uniform_by_name(p, "unifColor"),
            Some(UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
        );
        assert_eq!(gl.uniform_by_name(p, "unifTexture"), Some(UniformValue::I32(3)));
        assert!(!gl.has_pending_errors());
    }

    #[test]
    fn missing_location_is_silent_noop() {
        let mut gl = HeadlessGl::new();
        let p = program(&mut gl);
        let reg = UniformRegistry::register(&mut gl, p, &[UniformTag::LightDir]);

        // No program bound: a real write would raise INVALID_OPERATION.
        reg.set_vec3(&mut gl, UniformTag::LightDir, [0.0, 1.0, 0.0]);
        reg.set_f32(&mut gl, UniformTag::NumTiles, 6.0);
        assert!(!gl.has_pending_errors());
    }
}
