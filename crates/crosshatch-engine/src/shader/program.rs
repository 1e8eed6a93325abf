use crate::device::{Gl, ProgramId};

use super::{ShaderError, ShaderPair};

/// A linked program and the sources it was built from.
#[derive(Debug)]
pub struct Program {
    id: ProgramId,
    sources: ShaderPair,
}

impl Program {
    /// Reads, compiles and links `sources`.
    pub fn from_files(gl: &mut dyn Gl, sources: &ShaderPair) -> Result<Self, ShaderError> {
        let (vertex, fragment) = sources.read()?;
        let id = gl.compile_program(&vertex, &fragment).inspect_err(|err| {
            log::error!(
                "{} + {}: {err}",
                sources.vertex.display(),
                sources.fragment.display()
            );
        })?;

        log::debug!(
            "program {:?} linked from {} + {}",
            id.0,
            sources.vertex.display(),
            sources.fragment.display()
        );
        Ok(Self {
            id,
            sources: sources.clone(),
        })
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn sources(&self) -> &ShaderPair {
        &self.sources
    }

    /// Makes this the active program.
    pub fn activate(&self, gl: &mut dyn Gl) {
        gl.use_program(Some(self.id));
    }

    pub fn release(self, gl: &mut dyn Gl) {
        gl.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;
    use crate::testing::ShaderDir;

    #[test]
    fn builds_from_shipped_sources() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let pair = ShaderPair::in_dir(dir.path(), "gbuffer.vert", "gbuffer.frag");
        let program = Program::from_files(&mut gl, &pair).unwrap();

        program.activate(&mut gl);
        assert_eq!(gl.current_program(), Some(program.id()));
        assert_eq!(program.sources(), &pair);
    }

    #[test]
    fn compile_failure_surfaces_stage() {
        let dir = ShaderDir::new();
        dir.write("broken.frag", "#version 330 core\nout vec4 c;\n");
        let mut gl = HeadlessGl::new();
        let pair = ShaderPair::in_dir(dir.path(), "gbuffer.vert", "broken.frag");

        let err = Program::from_files(&mut gl, &pair).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert_eq!(gl.live_objects().programs, 0);
    }

    #[test]
    fn release_deletes_program() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let pair = ShaderPair::in_dir(dir.path(), "render_buffer.vert", "deferred_ssao.frag");
        let program = Program::from_files(&mut gl, &pair).unwrap();
        program.release(&mut gl);
        assert_eq!(gl.live_objects().programs, 0);
    }
}
